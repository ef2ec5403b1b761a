//! OAuth authentication flows for both upstream providers.
//!
//! [`oauth1`] signs marketplace requests; [`marketplace`] runs the
//! three-legged OAuth1 dance on top of it. [`accounting`] implements the
//! OAuth2 authorization-code and refresh grants.

pub mod accounting;
pub mod http;
pub mod marketplace;
pub mod oauth1;
pub mod state;

pub use accounting::AccountingFlow;
pub use marketplace::MarketplaceFlow;
pub use oauth1::{OAuth1Signer, SignRequest};
