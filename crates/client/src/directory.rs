//! HTTP implementation of the identity directory.
//!
//! Account search matches loosely on the backend side, so results are
//! filtered down to exact (case-insensitive) email matches here. Ties
//! between several exact matches break on a preferred account type;
//! anything still ambiguous is the caller's problem to report.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, info, warn};

use stocktake_store::{Account, IdentityError, IdentityStore};

use crate::connection::Connection;
use crate::throttle::Throttle;

/// Account type preferred when several directory entries share an
/// email. Directories commonly hold a staff account and a portal-only
/// account for the same address.
pub const PREFERRED_ACCOUNT_TYPE: &str = "atlassian";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDto {
    account_id: String,
    #[serde(default)]
    email_address: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    account_type: Option<String>,
    #[serde(default)]
    active: bool,
}

impl UserDto {
    fn into_account(self) -> Account {
        Account {
            account_id: self.account_id,
            display_name: self.display_name.unwrap_or_default(),
            email: self.email_address,
            active: self.active,
            account_type: self.account_type,
        }
    }
}

pub struct DirectoryClient {
    agent: ureq::Agent,
    root: String,
    authorization: String,
    throttle: Throttle,
    preferred_account_type: String,
    /// Resolved accounts by normalized email, for the life of the client.
    cache: RefCell<HashMap<String, Account>>,
}

impl DirectoryClient {
    pub fn new(connection: &Connection) -> Self {
        DirectoryClient {
            agent: ureq::Agent::new_with_defaults(),
            root: connection.directory_root(),
            authorization: connection.authorization(),
            throttle: Throttle::from_rate(connection.max_requests_per_minute),
            preferred_account_type: PREFERRED_ACCOUNT_TYPE.to_string(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Override the account type that breaks ties between several exact
    /// email matches.
    pub fn with_preferred_account_type(mut self, account_type: impl Into<String>) -> Self {
        self.preferred_account_type = account_type.into();
        self
    }

    fn search(&self, email: &str) -> Result<Vec<UserDto>, IdentityError> {
        self.throttle.pause();
        let url = format!("{}/user/search", self.root);
        debug!(email, "searching the directory");

        let response = self
            .agent
            .get(&url)
            .query("query", email)
            .header("Authorization", &self.authorization)
            .call()
            .map_err(|err| classify(err, "user search"))?;

        response.into_body().read_json().map_err(|err| {
            IdentityError::Backend(format!("undecodable user search response: {err}"))
        })
    }
}

fn classify(err: ureq::Error, context: &str) -> IdentityError {
    match err {
        ureq::Error::StatusCode(401) => {
            IdentityError::Backend(format!("authentication failed during {context}"))
        }
        ureq::Error::StatusCode(403) => {
            IdentityError::Backend(format!("permission denied during {context}"))
        }
        ureq::Error::StatusCode(429) => {
            IdentityError::Backend(format!("rate limited during {context}"))
        }
        ureq::Error::StatusCode(code) => {
            IdentityError::Backend(format!("unexpected status {code} during {context}"))
        }
        other => IdentityError::Backend(format!("{context} failed: {other}")),
    }
}

/// Pick the one account a normalized email resolves to, out of a loose
/// search result. Exact matches only; several exact matches fall back
/// to the preferred account type before giving up as ambiguous.
fn select_exact_match(
    users: Vec<UserDto>,
    email: &str,
    preferred_type: &str,
) -> Result<UserDto, IdentityError> {
    let mut exact: Vec<UserDto> = users
        .into_iter()
        .filter(|user| {
            user.email_address
                .as_deref()
                .map(|address| address.eq_ignore_ascii_case(email))
                .unwrap_or(false)
        })
        .collect();

    match exact.len() {
        0 => Err(IdentityError::AccountNotFound {
            email: email.to_string(),
        }),
        1 => Ok(exact.remove(0)),
        count => {
            let mut preferred: Vec<UserDto> = exact
                .into_iter()
                .filter(|user| user.account_type.as_deref() == Some(preferred_type))
                .collect();
            if preferred.len() == 1 {
                info!(email, account_type = preferred_type, "several exact matches, using the preferred account type");
                Ok(preferred.remove(0))
            } else {
                Err(IdentityError::AmbiguousAccount {
                    email: email.to_string(),
                    count,
                })
            }
        }
    }
}

impl IdentityStore for DirectoryClient {
    fn find_account_by_email(&self, email: &str) -> Result<Account, IdentityError> {
        let normalized = email.trim().to_lowercase();
        if let Some(account) = self.cache.borrow().get(&normalized) {
            debug!(email = %normalized, "directory cache hit");
            return Ok(account.clone());
        }

        let users = self.search(&normalized)?;
        let chosen = select_exact_match(users, &normalized, &self.preferred_account_type)?;

        let account = chosen.into_account();
        info!(email = %normalized, account_id = %account.account_id, "account resolved");
        self.cache
            .borrow_mut()
            .insert(normalized, account.clone());
        Ok(account)
    }

    fn is_account_active(&self, account_id: &str) -> Result<bool, IdentityError> {
        self.throttle.pause();
        let url = format!("{}/user", self.root);
        debug!(account_id, "validating account");

        let response = match self
            .agent
            .get(&url)
            .query("accountId", account_id)
            .header("Authorization", &self.authorization)
            .call()
        {
            Ok(response) => response,
            // Unknown id answers inactive, not an error.
            Err(ureq::Error::StatusCode(404)) => {
                warn!(account_id, "account id not found in the directory");
                return Ok(false);
            }
            Err(err) => return Err(classify(err, "account validation")),
        };

        let user: UserDto = response
            .into_body()
            .read_json()
            .map_err(|err| IdentityError::Backend(format!("undecodable user response: {err}")))?;
        Ok(user.active)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, account_type: &str) -> UserDto {
        UserDto {
            account_id: format!("acc-{email}"),
            email_address: Some(email.to_string()),
            display_name: Some("Somebody".to_string()),
            account_type: Some(account_type.to_string()),
            active: true,
        }
    }

    #[test]
    fn no_exact_match_is_not_found() {
        let users = vec![user("alice.backup@example.com", "atlassian")];
        let err = select_exact_match(users, "alice@example.com", "atlassian").unwrap_err();
        assert!(matches!(err, IdentityError::AccountNotFound { .. }));
    }

    #[test]
    fn single_exact_match_wins_regardless_of_type() {
        let users = vec![
            user("alice@example.com", "customer"),
            user("alice.other@example.com", "atlassian"),
        ];
        let chosen = select_exact_match(users, "alice@example.com", "atlassian").unwrap();
        assert_eq!(chosen.account_id, "acc-alice@example.com");
    }

    #[test]
    fn matching_ignores_directory_side_casing() {
        let users = vec![user("Alice@Example.COM", "atlassian")];
        let chosen = select_exact_match(users, "alice@example.com", "atlassian").unwrap();
        assert_eq!(chosen.email_address.as_deref(), Some("Alice@Example.COM"));
    }

    #[test]
    fn preferred_type_breaks_a_tie() {
        let mut staff = user("dev@example.com", "atlassian");
        staff.account_id = "acc-staff".to_string();
        let mut portal = user("dev@example.com", "customer");
        portal.account_id = "acc-portal".to_string();

        let chosen =
            select_exact_match(vec![portal, staff], "dev@example.com", "atlassian").unwrap();
        assert_eq!(chosen.account_id, "acc-staff");
    }

    #[test]
    fn tie_without_a_preferred_account_is_ambiguous() {
        let users = vec![
            user("dev@example.com", "customer"),
            user("dev@example.com", "customer"),
        ];
        let err = select_exact_match(users, "dev@example.com", "atlassian").unwrap_err();
        match err {
            IdentityError::AmbiguousAccount { count, .. } => assert_eq!(count, 2),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn two_preferred_accounts_stay_ambiguous() {
        let users = vec![
            user("dev@example.com", "atlassian"),
            user("dev@example.com", "atlassian"),
        ];
        let err = select_exact_match(users, "dev@example.com", "atlassian").unwrap_err();
        assert!(matches!(err, IdentityError::AmbiguousAccount { count: 2, .. }));
    }

    #[test]
    fn conversion_fills_account_fields() {
        let account = user("ops@example.com", "atlassian").into_account();
        assert_eq!(account.account_id, "acc-ops@example.com");
        assert_eq!(account.email.as_deref(), Some("ops@example.com"));
        assert!(account.active);
        assert_eq!(account.account_type.as_deref(), Some("atlassian"));
    }
}
