use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{AppError, Result};

/// Resolves a player display name to the opaque identifier the store keys
/// sellers by. External collaborator; we only consume `{id, name}` bodies.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Profile {
    id: String,
}

impl IdentityClient {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Look up `name` and return its identifier with hyphens stripped.
    /// Unknown names come back as 404 (historically 204) → `NotFound`.
    pub async fn resolve(&self, name: &str) -> Result<String> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), name);
        let resp = self.client.get(&url).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => {
                Err(AppError::NotFound(name.to_string()))
            }
            status if !status.is_success() => {
                Err(AppError::Upstream(format!("identity lookup returned {status}")))
            }
            _ => {
                let profile: Profile = resp.json().await?;
                Ok(normalize_id(&profile.id))
            }
        }
    }
}

/// Hyphens are presentation only; the store keys sellers by the bare form.
pub fn normalize_id(id: &str) -> String {
    id.replace('-', "")
}

/// True when `s` already looks like a bare identifier (32 hex chars), so
/// callers can skip the lookup entirely.
pub fn is_identifier(s: &str) -> bool {
    s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_hyphens() {
        assert_eq!(
            normalize_id("409a1e0f-261a-4984-9493-278d6cd9305a"),
            "409a1e0f261a49849493278d6cd9305a"
        );
        assert_eq!(normalize_id("already_bare"), "already_bare");
    }

    #[test]
    fn identifier_detection() {
        assert!(is_identifier("409a1e0f261a49849493278d6cd9305a"));
        // display names are shorter and may contain non-hex characters
        assert!(!is_identifier("Technoblade"));
        // hyphenated form must be normalized first
        assert!(!is_identifier("409a1e0f-261a-4984-9493-278d6cd9305a"));
        assert!(!is_identifier("zz9a1e0f261a49849493278d6cd9305a"));
    }
}
