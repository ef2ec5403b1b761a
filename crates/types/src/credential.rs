//! Key/secret credential model shared by both upstream providers.

use serde::{Deserialize, Serialize};

/// An immutable key/secret pair with an optional lifetime in seconds.
///
/// For the marketplace this is an OAuth1 token and token secret; for the
/// accounting provider it is an access token and refresh token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<i64>,
}

impl Credential {
    /// The anonymous credential used when no caller token is available.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A credential carrying only a key.
    pub fn of(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: None,
            expiry: None,
        }
    }

    /// A credential carrying a key and secret; the two-argument form of
    /// [`of`](Self::of).
    pub fn with_secret(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: Some(secret.into()),
            expiry: None,
        }
    }

    /// Attach a lifetime, in seconds.
    #[must_use]
    pub fn with_expiry(mut self, expires_in_secs: i64) -> Self {
        self.expiry = Some(expires_in_secs);
        self
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    #[must_use]
    pub fn expiry(&self) -> Option<i64> {
        self.expiry
    }

    /// `true` when the key is non-blank after trimming.
    #[must_use]
    pub fn has_key(&self) -> bool {
        has_text(Some(&self.key))
    }

    /// `true` when the secret is present and non-blank after trimming.
    #[must_use]
    pub fn has_secret(&self) -> bool {
        has_text(self.secret.as_deref())
    }

    /// `true` when either the key or the secret has text.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.has_key() || self.has_secret()
    }

    /// `true` when both the key and the secret have text.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.has_key() && self.has_secret()
    }
}

/// A credential issued before the user has authorized it, together with the
/// URL the user must visit out-of-band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCredential {
    #[serde(flatten)]
    credential: Credential,
    authorization_url: String,
}

impl RequestCredential {
    pub fn new(credential: Credential, authorization_url: impl Into<String>) -> Self {
        Self {
            credential,
            authorization_url: authorization_url.into(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        self.credential.key()
    }

    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.credential.secret()
    }

    #[must_use]
    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    #[must_use]
    pub fn into_credential(self) -> Credential {
        self.credential
    }
}

impl AsRef<Credential> for Credential {
    fn as_ref(&self) -> &Credential {
        self
    }
}

impl AsRef<Credential> for RequestCredential {
    fn as_ref(&self) -> &Credential {
        &self.credential
    }
}

/// `true` when `value` is present and contains non-whitespace characters.
#[must_use]
pub fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_key_only() {
        let c = Credential::of("abc");
        assert!(c.has_key());
        assert!(!c.has_secret());
        assert!(c.has_content());
        assert!(!c.is_complete());
    }

    #[test]
    fn test_complete() {
        let c = Credential::with_secret("abc", "def");
        assert!(c.is_complete());
        assert_eq!(c.key(), Credential::of("abc").key());
        assert_eq!(c.secret(), Some("def"));
    }

    #[test]
    fn test_blank_values_trimmed() {
        let c = Credential::with_secret("   ", "\t\n");
        assert!(!c.has_key());
        assert!(!c.has_secret());
        assert!(!c.has_content());
        assert!(!c.is_complete());
    }

    #[test]
    fn test_empty_has_no_content() {
        assert!(!Credential::empty().has_content());
    }

    #[test]
    fn test_is_complete_matches_predicates() {
        let samples = [
            Credential::empty(),
            Credential::of("k"),
            Credential::with_secret("", "s"),
            Credential::with_secret(" k ", " "),
            Credential::with_secret("k", "s"),
        ];
        for c in &samples {
            assert_eq!(
                c.is_complete(),
                has_text(Some(c.key())) && has_text(c.secret())
            );
        }
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(
            Credential::with_secret("k", "s"),
            Credential::with_secret("k", "s")
        );
        assert_ne!(
            Credential::with_secret("k", "s"),
            Credential::with_secret("k", "s").with_expiry(10)
        );
        assert_ne!(Credential::of("k"), Credential::with_secret("k", "s"));
    }

    #[test]
    fn test_request_credential_accessors() {
        let rc = RequestCredential::new(Credential::with_secret("t", "ts"), "https://x/auth");
        assert_eq!(rc.key(), "t");
        assert_eq!(rc.secret(), Some("ts"));
        assert_eq!(rc.authorization_url(), "https://x/auth");
        assert_eq!(rc.into_credential(), Credential::with_secret("t", "ts"));
    }

    #[test]
    fn test_serde_skips_none() {
        let json = serde_json::to_string(&Credential::of("k")).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("expiry"));
    }
}
