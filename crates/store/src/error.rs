/// All errors that can be returned by a RecordStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with the given key (or id, for id-addressed calls).
    #[error("record not found: {key}")]
    RecordNotFound { key: String },

    /// No schema with the given name or id.
    #[error("schema not found: {schema}")]
    SchemaNotFound { schema: String },

    /// No object type with the given name or id.
    #[error("object type not found: {object_type}")]
    ObjectTypeNotFound { object_type: String },

    /// The credential was rejected outright.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The credential is valid but lacks access to the resource.
    #[error("permission denied: {context}")]
    PermissionDenied { context: String },

    /// The backend throttled the call.
    #[error("rate limited by backend (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// Any other backend failure (transport, unexpected status,
    /// undecodable body).
    #[error("backend error during {context}: {message}")]
    Backend { context: String, message: String },
}

/// All errors that can be returned by an IdentityStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// No account matches the email exactly.
    #[error("no account found for email: {email}")]
    AccountNotFound { email: String },

    /// Several accounts match the email exactly and none carries the
    /// preferred account type.
    #[error("{count} accounts found for email: {email}")]
    AmbiguousAccount { email: String, count: usize },

    /// Any other identity backend failure.
    #[error("identity backend error: {0}")]
    Backend(String),
}
