//! HTTP implementation of the inventory record store.
//!
//! Thin verb-per-endpoint mapping onto the workspace REST surface.
//! Every request passes the throttle first; status codes map onto the
//! store error taxonomy, with 404 translated per call site into the
//! specific not-found variant the caller can act on.

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use stocktake_core::{AttributeDefinition, AttributeUpdate, ObjectType, Record, Schema};
use stocktake_store::{QueryPage, RecordStore, StoreError};

use crate::connection::Connection;
use crate::dto;
use crate::throttle::Throttle;

/// Wait hint handed to callers on a 429. ureq surfaces status errors
/// without response headers, so the backend's own hint is unavailable.
const RETRY_AFTER_FALLBACK_SECS: u64 = 60;

/// Page size for the schema catalogue listing.
const SCHEMA_PAGE_SIZE: usize = 50;

pub struct InventoryClient {
    agent: ureq::Agent,
    root: String,
    authorization: String,
    throttle: Throttle,
}

impl InventoryClient {
    pub fn new(connection: &Connection) -> Self {
        debug!(workspace = %connection.workspace_id, "inventory client ready");
        InventoryClient {
            agent: ureq::Agent::new_with_defaults(),
            root: connection.inventory_root(),
            authorization: connection.authorization(),
            throttle: Throttle::from_rate(connection.max_requests_per_minute),
        }
    }

    /// Throttled GET. Status errors come back as `ureq::Error` for the
    /// call site to translate.
    fn get(&self, url: &str) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        self.throttle.pause();
        self.agent
            .get(url)
            .header("Authorization", &self.authorization)
            .header("Accept", "application/json")
            .call()
    }
}

fn read_json<T: DeserializeOwned>(
    response: ureq::http::Response<ureq::Body>,
    context: &str,
) -> Result<T, StoreError> {
    response
        .into_body()
        .read_json()
        .map_err(|err| StoreError::Backend {
            context: context.to_string(),
            message: format!("undecodable response body: {err}"),
        })
}

/// Map a transport or status error onto the store taxonomy. 404 is not
/// mapped here; call sites translate it into their specific not-found
/// variant first.
fn classify(err: ureq::Error, context: &str) -> StoreError {
    match err {
        ureq::Error::StatusCode(401) => {
            StoreError::Auth(format!("credential rejected during {context}"))
        }
        ureq::Error::StatusCode(403) => StoreError::PermissionDenied {
            context: context.to_string(),
        },
        ureq::Error::StatusCode(429) => StoreError::RateLimited {
            retry_after_secs: RETRY_AFTER_FALLBACK_SECS,
        },
        ureq::Error::StatusCode(code) => StoreError::Backend {
            context: context.to_string(),
            message: format!("unexpected status {code}"),
        },
        other => StoreError::Backend {
            context: context.to_string(),
            message: other.to_string(),
        },
    }
}

impl RecordStore for InventoryClient {
    fn get_by_key(&self, key: &str) -> Result<Record, StoreError> {
        let context = format!("get record {key}");
        let url = format!("{}/object/{}", self.root, key);
        debug!(%key, "fetching record");

        let response = self.get(&url).map_err(|err| match err {
            ureq::Error::StatusCode(404) => StoreError::RecordNotFound {
                key: key.to_string(),
            },
            other => classify(other, &context),
        })?;

        let entry: dto::ObjectEntry = read_json(response, &context)?;
        Ok(entry.into_record())
    }

    fn find_by_query(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<QueryPage, StoreError> {
        let context = format!("query \"{query}\"");
        let url = format!("{}/object/aql", self.root);
        self.throttle.pause();
        debug!(query, offset, limit, "running query");

        let response = self
            .agent
            .post(&url)
            .query("startAt", &offset.to_string())
            .query("maxResults", &limit.to_string())
            .query("includeAttributes", "true")
            .header("Authorization", &self.authorization)
            .send_json(&dto::QueryRequest { ql_query: query })
            .map_err(|err| classify(err, &context))?;

        let page: dto::QueryResponse = read_json(response, &context)?;
        Ok(page.into_page())
    }

    fn create(
        &self,
        object_type_id: u64,
        attributes: &[AttributeUpdate],
    ) -> Result<Record, StoreError> {
        let context = format!("create record of type {object_type_id}");
        let url = format!("{}/object/create", self.root);
        self.throttle.pause();
        info!(object_type_id, attribute_count = attributes.len(), "creating record");

        let body = dto::CreateRequest {
            object_type_id: object_type_id.to_string(),
            attributes: dto::update_entries(attributes),
        };
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &self.authorization)
            .send_json(&body)
            .map_err(|err| classify(err, &context))?;

        let entry: dto::ObjectEntry = read_json(response, &context)?;
        let record = entry.into_record();
        info!(key = %record.key, "record created");
        Ok(record)
    }

    fn update(&self, id: &str, updates: &[AttributeUpdate]) -> Result<Record, StoreError> {
        let context = format!("update record {id}");
        let url = format!("{}/object/{}", self.root, id);
        self.throttle.pause();
        info!(%id, update_count = updates.len(), "updating record");

        let body = dto::UpdateRequest {
            attributes: dto::update_entries(updates),
        };
        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.authorization)
            .send_json(&body)
            .map_err(|err| match err {
                ureq::Error::StatusCode(404) => StoreError::RecordNotFound {
                    key: id.to_string(),
                },
                other => classify(other, &context),
            })?;

        let entry: dto::ObjectEntry = read_json(response, &context)?;
        Ok(entry.into_record())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let context = format!("delete record {id}");
        let url = format!("{}/object/{}", self.root, id);
        self.throttle.pause();
        info!(%id, "deleting record");

        match self
            .agent
            .delete(&url)
            .header("Authorization", &self.authorization)
            .call()
        {
            Ok(_) => Ok(true),
            // Already gone; the contract reports that, not an error.
            Err(ureq::Error::StatusCode(404)) => Ok(false),
            Err(err) => Err(classify(err, &context)),
        }
    }

    fn get_schemas(&self) -> Result<Vec<Schema>, StoreError> {
        let context = "list schemas";
        let url = format!("{}/objectschema/list?maxResults={SCHEMA_PAGE_SIZE}", self.root);
        debug!("listing schemas");

        let response = self.get(&url).map_err(|err| classify(err, context))?;
        let listing: dto::Listing<dto::SchemaDto> = read_json(response, context)?;
        Ok(listing
            .into_vec()
            .into_iter()
            .map(|s| Schema { id: s.id, name: s.name })
            .collect())
    }

    fn get_object_types(&self, schema_id: u64) -> Result<Vec<ObjectType>, StoreError> {
        let context = format!("list object types of schema {schema_id}");
        let url = format!("{}/objectschema/{}/objecttypes", self.root, schema_id);
        debug!(schema_id, "listing object types");

        let response = self.get(&url).map_err(|err| match err {
            ureq::Error::StatusCode(404) => StoreError::SchemaNotFound {
                schema: schema_id.to_string(),
            },
            other => classify(other, &context),
        })?;

        let listing: dto::Listing<dto::ObjectTypeDto> = read_json(response, &context)?;
        Ok(listing
            .into_vec()
            .into_iter()
            .map(|t| ObjectType {
                id: t.id,
                name: t.name.unwrap_or_default(),
            })
            .collect())
    }

    fn get_attribute_definitions(
        &self,
        object_type_id: u64,
    ) -> Result<Vec<AttributeDefinition>, StoreError> {
        let context = format!("list attributes of object type {object_type_id}");
        let url = format!("{}/objecttype/{}/attributes", self.root, object_type_id);
        debug!(object_type_id, "listing attribute definitions");

        let response = self.get(&url).map_err(|err| match err {
            ureq::Error::StatusCode(404) => StoreError::ObjectTypeNotFound {
                object_type: object_type_id.to_string(),
            },
            other => classify(other, &context),
        })?;

        let listing: dto::Listing<dto::AttributeDefDto> = read_json(response, &context)?;
        Ok(listing
            .into_vec()
            .into_iter()
            .map(dto::AttributeDefDto::into_definition)
            .collect())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_maps_the_status_taxonomy() {
        assert!(matches!(
            classify(ureq::Error::StatusCode(401), "x"),
            StoreError::Auth(_)
        ));
        assert!(matches!(
            classify(ureq::Error::StatusCode(403), "x"),
            StoreError::PermissionDenied { .. }
        ));
        assert!(matches!(
            classify(ureq::Error::StatusCode(429), "x"),
            StoreError::RateLimited {
                retry_after_secs: RETRY_AFTER_FALLBACK_SECS
            }
        ));
    }

    #[test]
    fn unexpected_statuses_classify_as_backend_errors() {
        let err = classify(ureq::Error::StatusCode(503), "list schemas");
        match err {
            StoreError::Backend { context, message } => {
                assert_eq!(context, "list schemas");
                assert!(message.contains("503"));
            }
            other => panic!("expected a backend error, got {other:?}"),
        }
    }

    #[test]
    fn client_derives_its_root_from_the_connection() {
        let connection = Connection::new("https://example.atlassian.net", "ws-7", "tok");
        let client = InventoryClient::new(&connection);
        assert_eq!(
            client.root,
            "https://example.atlassian.net/gateway/api/jsm/assets/workspace/ws-7/v1"
        );
        assert_eq!(client.authorization, "Bearer tok");
    }
}
