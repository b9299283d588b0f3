//! Collaborator contracts for the stocktake toolkit: the inventory
//! record store, the identity directory, and the time-boxed cache,
//! together with in-memory implementations for tests and fixtures.

mod cache;
mod error;
mod memory;
mod traits;

pub use cache::{scoped_key, Cache, MemoryCache};
pub use error::{IdentityError, StoreError};
pub use memory::{MemoryIdentity, MemoryStore};
pub use traits::{Account, IdentityStore, QueryPage, RecordStore};
