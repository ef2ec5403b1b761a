//! Unified error type for the longboard workspace.

use crate::classify::ErrorKind;
use thiserror::Error;

/// An error reported by the marketplace REST API, either as a non-2xx status
/// or as an `error`/`errors` object inside a 2xx body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[marketplace] message='{message}', reason='{reason}', code={code}")]
pub struct MarketplaceApiError {
    pub message: String,
    pub reason: String,
    pub code: i64,
}

impl MarketplaceApiError {
    pub fn new(message: impl Into<String>, reason: impl Into<String>, code: i64) -> Self {
        Self {
            message: message.into(),
            reason: reason.into(),
            code,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        if self.code == 401 {
            ErrorKind::Auth
        } else {
            ErrorKind::Upstream
        }
    }
}

/// An error reported by the accounting GraphQL API. Codes are strings there
/// (`"401"`, `"UNAUTHENTICATED"`, `"NOT_FOUND"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[accounting] message='{message}', reason='{reason}', code={code}")]
pub struct AccountingApiError {
    pub message: String,
    pub reason: String,
    pub code: String,
}

impl AccountingApiError {
    pub fn new(
        message: impl Into<String>,
        reason: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            reason: reason.into(),
            code: code.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self.code.as_str() {
            "401" | "UNAUTHENTICATED" => ErrorKind::Auth,
            _ => ErrorKind::Upstream,
        }
    }
}

/// A failed OAuth2 token exchange: the token endpoint answered non-2xx with
/// an RFC 6749 §5.2 error body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token exchange failed: status={status}, error={error}")]
pub struct TokenExchangeError {
    pub status: u16,
    pub error: String,
    pub description: Option<String>,
}

impl TokenExchangeError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        let rejected = matches!(
            self.error.as_str(),
            "invalid_grant"
                | "invalid_client"
                | "unauthorized_client"
                | "access_denied"
                | "invalid_token"
        );
        if rejected || matches!(self.status, 400 | 401) {
            ErrorKind::Auth
        } else {
            ErrorKind::Upstream
        }
    }
}

/// Enumerates all error kinds that can occur across longboard crates.
#[derive(Debug, Error)]
pub enum LongboardError {
    /// Invalid, expired or rejected credential or verifier.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Missing or malformed caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// An upstream response did not have the expected shape.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// The upstream provider returned a non-success status.
    #[error("upstream error: status={status}, body={body}")]
    Upstream { status: u16, body: String },

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(String),

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Marketplace API failure; the inner error is exposed as `source()`.
    #[error("{0}")]
    Marketplace(#[from] MarketplaceApiError),

    #[error("{0}")]
    Accounting(#[from] AccountingApiError),

    #[error("{0}")]
    TokenExchange(#[from] TokenExchangeError),
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for LongboardError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl LongboardError {
    /// The taxonomy bucket this error falls into.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Mapping(_) | Self::Serialization(_) => ErrorKind::Mapping,
            Self::Upstream { status: 401, .. } => ErrorKind::Auth,
            // Config failures are internal; they surface like upstream faults.
            Self::Upstream { .. } | Self::Http(_) | Self::Config(_) => ErrorKind::Upstream,
            Self::Marketplace(e) => e.kind(),
            Self::Accounting(e) => e.kind(),
            Self::TokenExchange(e) => e.kind(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, LongboardError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display_auth() {
        let err = LongboardError::Auth("bad verifier".to_string());
        assert_eq!(err.to_string(), "authentication error: bad verifier");
    }

    #[test]
    fn test_error_display_upstream() {
        let err = LongboardError::Upstream {
            status: 503,
            body: "unavailable".to_string(),
        };
        let s = err.to_string();
        assert!(s.contains("503"));
        assert!(s.contains("unavailable"));
    }

    #[test]
    fn test_marketplace_display() {
        let err = MarketplaceApiError::new("Token expired", "token_rejected", 401);
        assert_eq!(
            err.to_string(),
            "[marketplace] message='Token expired', reason='token_rejected', code=401"
        );
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid {{{").unwrap_err();
        let err: LongboardError = json_err.into();
        assert!(matches!(err, LongboardError::Serialization(_)));
        assert_eq!(err.kind(), ErrorKind::Mapping);
    }

    #[test]
    fn test_provider_variants_expose_source() {
        let err: LongboardError = MarketplaceApiError::new("m", "r", 500).into();
        let source = err.source().expect("provider variants keep the inner error as source");
        assert!(source.downcast_ref::<MarketplaceApiError>().is_some());
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(LongboardError::Auth("x".into()).kind(), ErrorKind::Auth);
        assert_eq!(
            LongboardError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(LongboardError::Http("x".into()).kind(), ErrorKind::Upstream);
        assert_eq!(
            LongboardError::Upstream {
                status: 401,
                body: String::new()
            }
            .kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            LongboardError::from(MarketplaceApiError::new("m", "r", 401)).kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            LongboardError::from(AccountingApiError::new("m", "r", "NOT_FOUND")).kind(),
            ErrorKind::Upstream
        );
    }

    #[test]
    fn test_token_exchange_kind() {
        let rejected = TokenExchangeError {
            status: 400,
            error: "invalid_grant".into(),
            description: None,
        };
        assert_eq!(rejected.kind(), ErrorKind::Auth);
        let outage = TokenExchangeError {
            status: 502,
            error: "bad_gateway".into(),
            description: None,
        };
        assert_eq!(outage.kind(), ErrorKind::Upstream);
    }
}
