//! API clients and domain services for both upstreams.
//!
//! Each provider builds one client per credential and keeps it in a
//! [`ClientCache`]. [`MarketplaceService`] and [`AccountingService`] sit on top
//! and expose the domain operations; [`classify::default_chain`] maps their
//! failures onto the shared error taxonomy.

pub mod accounting;
pub mod accounting_service;
pub mod cache;
pub mod classify;
pub mod http_log;
pub mod http_util;
pub mod marketplace;
pub mod marketplace_service;
pub mod models;

pub use accounting::{AccountingClient, AccountingClientProvider};
pub use accounting_service::{AccountingService, IdKind, decode_id, encode_id};
pub use cache::{CacheKey, ClientCache};
pub use classify::default_chain;
pub use http_log::HttpLogger;
pub use http_util::ProviderHttp;
pub use marketplace::{EntryPoint, MarketplaceClient, MarketplaceClientProvider};
pub use marketplace_service::MarketplaceService;
