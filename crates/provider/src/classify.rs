//! Classifiers for each upstream error family.

use longboard_types::{
    AccountingApiError, ClassifiedError, ClassifierChain, ErrorClassifier, ErrorCode,
    LongboardError, MarketplaceApiError, TokenExchangeError,
};
use std::error::Error;

pub struct MarketplaceClassifier;

impl ErrorClassifier for MarketplaceClassifier {
    fn classify(&self, error: &(dyn Error + 'static)) -> Option<ClassifiedError> {
        let e = error.downcast_ref::<MarketplaceApiError>()?;
        Some(
            ClassifiedError::new(e.kind(), e.message.clone())
                .with_upstream(ErrorCode::Int(e.code), e.reason.clone()),
        )
    }
}

pub struct AccountingClassifier;

impl ErrorClassifier for AccountingClassifier {
    fn classify(&self, error: &(dyn Error + 'static)) -> Option<ClassifiedError> {
        let e = error.downcast_ref::<AccountingApiError>()?;
        Some(
            ClassifiedError::new(e.kind(), e.message.clone())
                .with_upstream(ErrorCode::Text(e.code.clone()), e.reason.clone()),
        )
    }
}

pub struct TokenExchangeClassifier;

impl ErrorClassifier for TokenExchangeClassifier {
    fn classify(&self, error: &(dyn Error + 'static)) -> Option<ClassifiedError> {
        let e = error.downcast_ref::<TokenExchangeError>()?;
        let message = e.description.clone().unwrap_or_else(|| e.error.clone());
        Some(
            ClassifiedError::new(e.kind(), message)
                .with_upstream(ErrorCode::Int(i64::from(e.status)), e.error.clone()),
        )
    }
}

/// The workspace's own failures that carry no provider cause.
///
/// Provider-wrapping variants are left to the classifier of their source.
pub struct CoreClassifier;

impl ErrorClassifier for CoreClassifier {
    fn classify(&self, error: &(dyn Error + 'static)) -> Option<ClassifiedError> {
        let e = error.downcast_ref::<LongboardError>()?;
        let message = match e {
            LongboardError::Marketplace(_)
            | LongboardError::Accounting(_)
            | LongboardError::TokenExchange(_)
            | LongboardError::Config(_) => return None,
            LongboardError::Auth(m)
            | LongboardError::Validation(m)
            | LongboardError::Mapping(m)
            | LongboardError::Http(m) => m.clone(),
            LongboardError::Upstream { status, body } => {
                return Some(
                    ClassifiedError::new(e.kind(), body.clone())
                        .with_upstream(ErrorCode::Int(i64::from(*status)), "upstream"),
                );
            }
            LongboardError::Serialization(inner) => inner.to_string(),
        };
        Some(ClassifiedError::new(e.kind(), message))
    }
}

/// Every classifier in this crate, provider families first.
#[must_use]
pub fn default_chain() -> ClassifierChain {
    ClassifierChain::new()
        .with(MarketplaceClassifier)
        .with(AccountingClassifier)
        .with(TokenExchangeClassifier)
        .with(CoreClassifier)
}
