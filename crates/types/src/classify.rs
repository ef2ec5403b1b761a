//! Classified errors and the classifier chain.
//!
//! Upstream failures arrive as heterogeneous error types. Each
//! [`ErrorClassifier`] recognises one family and maps it onto the small
//! [`ErrorKind`] taxonomy; a [`ClassifierChain`] composes them and walks the
//! `source()` chain innermost-first so the most specific cause wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{error::Error, fmt};

/// The uniform error taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Invalid, expired or rejected credential or verifier.
    #[serde(rename = "AuthError")]
    Auth,
    /// Missing required input.
    #[serde(rename = "ValidationError")]
    Validation,
    /// Non-auth provider failure, including transport faults.
    #[serde(rename = "UpstreamError")]
    Upstream,
    /// Response shape did not match expectations.
    #[serde(rename = "MappingError")]
    Mapping,
}

impl ErrorKind {
    /// Presentation type rendered to clients.
    #[must_use]
    pub fn error_type(self) -> &'static str {
        match self {
            Self::Auth => "FORBIDDEN",
            Self::Validation => "BAD_REQUEST",
            Self::Upstream | Self::Mapping => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => write!(f, "AuthError"),
            Self::Validation => write!(f, "ValidationError"),
            Self::Upstream => write!(f, "UpstreamError"),
            Self::Mapping => write!(f, "MappingError"),
        }
    }
}

/// Raw upstream code; the marketplace uses integers, the accounting provider strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Int(i64),
    Text(String),
}

impl From<ErrorCode> for Value {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Int(i) => Value::from(i),
            ErrorCode::Text(s) => Value::from(s),
        }
    }
}

/// A provider failure normalised for client consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default)]
    pub extensions: Map<String, Value>,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            extensions: Map::new(),
        }
    }

    /// Attach the raw upstream code and reason, mirrored into `extensions`.
    #[must_use]
    pub fn with_upstream(mut self, code: ErrorCode, reason: impl Into<String>) -> Self {
        self.extensions
            .insert("code".to_string(), Value::from(code.clone()));
        self.extensions
            .insert("reason".to_string(), Value::from(reason.into()));
        self.code = Some(code);
        self
    }

    /// The generic error shown when nothing in the chain recognised the failure.
    #[must_use]
    pub fn internal() -> Self {
        Self::new(ErrorKind::Upstream, "internal error")
    }

    #[must_use]
    pub fn error_type(&self) -> &'static str {
        self.kind.error_type()
    }
}

/// Recognises one family of upstream failures.
pub trait ErrorClassifier: Send + Sync {
    /// Classify `error` if it belongs to this classifier's family.
    ///
    /// Implementations inspect only `error` itself, never its sources; the
    /// chain handles walking.
    fn classify(&self, error: &(dyn Error + 'static)) -> Option<ClassifiedError>;
}

/// An ordered composition of classifiers.
#[derive(Default)]
pub struct ClassifierChain {
    classifiers: Vec<Box<dyn ErrorClassifier>>,
}

impl ClassifierChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a classifier; earlier classifiers take precedence on the same cause.
    #[must_use]
    pub fn with(mut self, classifier: impl ErrorClassifier + 'static) -> Self {
        self.classifiers.push(Box::new(classifier));
        self
    }

    /// Walk the cause chain innermost-first; the first recognised cause wins.
    ///
    /// Returns `None` when no classifier recognises any cause.
    #[must_use]
    pub fn classify(&self, error: &(dyn Error + 'static)) -> Option<ClassifiedError> {
        let mut causes = Vec::new();
        let mut current = Some(error);
        while let Some(e) = current {
            causes.push(e);
            current = e.source();
        }
        causes.iter().rev().find_map(|cause| {
            self.classifiers
                .iter()
                .find_map(|classifier| classifier.classify(*cause))
        })
    }

    /// Like [`classify`](Self::classify), but logs unrecognised failures in
    /// full and returns a generic internal error in their place.
    #[must_use]
    pub fn classify_or_internal(&self, error: &(dyn Error + 'static)) -> ClassifiedError {
        self.classify(error).unwrap_or_else(|| {
            tracing::error!(error = %error, debug = ?error, "unclassified upstream failure");
            ClassifiedError::internal()
        })
    }
}
