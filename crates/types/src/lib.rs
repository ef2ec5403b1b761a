//! Core types and traits for the longboard workspace.
//!
//! This crate defines the shared abstractions used by every layer: the
//! credential model, provider identifiers, the unified error enum and its
//! classified form, and the client-provider seam each upstream implements.

pub mod classify;
pub mod credential;
pub mod error;
pub mod page;
pub mod provider;
pub mod traits;
pub mod validation;

pub use classify::{ClassifiedError, ClassifierChain, ErrorClassifier, ErrorCode, ErrorKind};
pub use credential::{Credential, RequestCredential, has_text};
pub use error::{
    AccountingApiError, LongboardError, MarketplaceApiError, Result, TokenExchangeError,
};
pub use page::{DataPage, Pagination};
pub use provider::ProviderId;
pub use traits::ClientProvider;
pub use validation::require_text;
