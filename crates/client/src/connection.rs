//! Connection settings shared by both HTTP clients.

use base64::Engine;

/// Default request budget, matching the backend's documented allowance.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 300;

/// Where and how to reach the backend APIs. One `Connection` serves both
/// the inventory client and the directory client; they derive their API
/// roots from it.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Site base URL, e.g. `https://example.atlassian.net`. A trailing
    /// slash is tolerated.
    pub base_url: String,
    /// Inventory workspace identifier. Also the tenant discriminator for
    /// cache keys.
    pub workspace_id: String,
    /// Account email for basic auth. When absent the token is sent as a
    /// bearer credential instead.
    pub email: Option<String>,
    /// API token or bearer token, depending on `email`.
    pub token: String,
    /// Request budget the throttle enforces, global per client.
    pub max_requests_per_minute: u32,
}

impl Connection {
    pub fn new(
        base_url: impl Into<String>,
        workspace_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Connection {
            base_url: base_url.into(),
            workspace_id: workspace_id.into(),
            email: None,
            token: token.into(),
            max_requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }

    /// Root of the inventory (assets) REST surface.
    pub fn inventory_root(&self) -> String {
        format!(
            "{}/gateway/api/jsm/assets/workspace/{}/v1",
            self.base_url.trim_end_matches('/'),
            self.workspace_id
        )
    }

    /// Root of the identity directory REST surface.
    pub fn directory_root(&self) -> String {
        format!("{}/rest/api/3", self.base_url.trim_end_matches('/'))
    }

    /// Value for the `Authorization` header: basic auth when an email is
    /// configured, bearer otherwise.
    pub fn authorization(&self) -> String {
        match &self.email {
            Some(email) => {
                let credentials = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", email, self.token));
                format!("Basic {credentials}")
            }
            None => format!("Bearer {}", self.token),
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_tolerate_a_trailing_slash() {
        let connection = Connection::new("https://example.atlassian.net/", "ws-1", "tok");
        assert_eq!(
            connection.inventory_root(),
            "https://example.atlassian.net/gateway/api/jsm/assets/workspace/ws-1/v1"
        );
        assert_eq!(
            connection.directory_root(),
            "https://example.atlassian.net/rest/api/3"
        );
    }

    #[test]
    fn basic_auth_when_email_is_configured() {
        let mut connection = Connection::new("https://x.example", "ws", "s3cret");
        connection.email = Some("ops@example.com".to_string());
        // base64("ops@example.com:s3cret")
        assert_eq!(
            connection.authorization(),
            "Basic b3BzQGV4YW1wbGUuY29tOnMzY3JldA=="
        );
    }

    #[test]
    fn bearer_auth_without_an_email() {
        let connection = Connection::new("https://x.example", "ws", "s3cret");
        assert_eq!(connection.authorization(), "Bearer s3cret");
    }
}
