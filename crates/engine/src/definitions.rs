//! Per-object-type attribute definition cache and update building.
//!
//! Definitions are read-only to this toolkit and stable for a session,
//! so one fetch per object type is enough. The cache is a plain map with
//! interior mutability; the toolkit is single-threaded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use stocktake_core::{AttributeDefinition, AttributeUpdate};
use stocktake_store::RecordStore;

use crate::error::EngineError;

pub struct DefinitionCache<'a> {
    store: &'a dyn RecordStore,
    cache: RefCell<HashMap<u64, Rc<Vec<AttributeDefinition>>>>,
}

impl<'a> DefinitionCache<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        DefinitionCache {
            store,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Definitions for an object type, fetched once per session.
    pub fn definitions(
        &self,
        object_type_id: u64,
    ) -> Result<Rc<Vec<AttributeDefinition>>, EngineError> {
        if let Some(defs) = self.cache.borrow().get(&object_type_id) {
            debug!(object_type_id, "definition cache hit");
            return Ok(Rc::clone(defs));
        }
        let defs = Rc::new(self.store.get_attribute_definitions(object_type_id)?);
        self.cache
            .borrow_mut()
            .insert(object_type_id, Rc::clone(&defs));
        Ok(defs)
    }

    /// One definition by name, exact match.
    pub fn definition(
        &self,
        object_type_id: u64,
        name: &str,
    ) -> Result<AttributeDefinition, EngineError> {
        let defs = self.definitions(object_type_id)?;
        defs.iter()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| EngineError::AttributeNotFound {
                attribute: name.to_string(),
                object_type_id,
            })
    }

    pub fn definition_id(&self, object_type_id: u64, name: &str) -> Result<u64, EngineError> {
        Ok(self.definition(object_type_id, name)?.id)
    }

    /// Build a single-value update for the named attribute, with the
    /// value's string form. Fails `AttributeNotFound` when the object
    /// type has no definition with that name.
    pub fn build_update(
        &self,
        object_type_id: u64,
        name: &str,
        value: impl ToString,
    ) -> Result<AttributeUpdate, EngineError> {
        let id = self.definition_id(object_type_id, name)?;
        Ok(AttributeUpdate::single(id, value))
    }
}
