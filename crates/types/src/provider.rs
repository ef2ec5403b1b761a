//! Upstream provider identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a supported upstream platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    /// The OAuth1 work marketplace.
    Marketplace,
    /// The OAuth2/GraphQL accounting platform.
    Accounting,
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Marketplace => write!(f, "marketplace"),
            Self::Accounting => write!(f, "accounting"),
        }
    }
}

impl std::str::FromStr for ProviderId {
    type Err = crate::LongboardError;

    /// Parse a provider name or well-known alias into a [`ProviderId`].
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`](crate::LongboardError::Validation)
    /// if the string does not match any known provider name or alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "marketplace" | "upwork" => Ok(Self::Marketplace),
            "accounting" | "wave" => Ok(Self::Accounting),
            other => Err(crate::LongboardError::Validation(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}
