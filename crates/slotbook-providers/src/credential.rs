//! Provider credentials.
//!
//! Acquiring and refreshing tokens happens outside this workspace; a
//! [`Credential`] is whatever the authorization step produced and is handed
//! to a provider as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An access credential for a calendar provider.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// True when there is no access token to present.
    pub fn is_empty(&self) -> bool {
        self.access_token.trim().is_empty()
    }

    /// True once the known expiry has passed. Credentials without an expiry
    /// never report expired; the provider rejects them instead.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Extracts the token from an `Authorization: Bearer <token>` value.
    pub fn from_bearer(header: &str) -> Option<Self> {
        let (scheme, token) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then(|| Self::new(token))
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn empty_credentials() {
        assert!(Credential::default().is_empty());
        assert!(Credential::new("   ").is_empty());
        assert!(!Credential::new("ya29.token").is_empty());
    }

    #[test]
    fn bearer_header() {
        assert_eq!(
            Credential::from_bearer("Bearer ya29.token"),
            Some(Credential::new("ya29.token"))
        );
        assert_eq!(
            Credential::from_bearer("bearer  abc "),
            Some(Credential::new("abc"))
        );
        assert_eq!(Credential::from_bearer("Basic dXNlcg=="), None);
        assert_eq!(Credential::from_bearer("Bearer "), None);
        assert_eq!(Credential::from_bearer("Bearer"), None);
    }

    #[test]
    fn expiry() {
        let now = Utc::now();
        let cred = Credential::new("t").with_expiry(now - Duration::minutes(1));
        assert!(cred.is_expired_at(now));
        let cred = Credential::new("t").with_expiry(now + Duration::minutes(1));
        assert!(!cred.is_expired_at(now));
        assert!(!Credential::new("t").is_expired_at(now));
    }

    #[test]
    fn debug_hides_token() {
        let cred = Credential::new("secret-token").with_refresh_token("refresh");
        let printed = format!("{cred:?}");
        assert!(!printed.contains("secret-token"));
        assert!(!printed.contains("refresh\""));
        assert!(printed.contains("has_refresh_token: true"));
    }
}
