//! Traits shared across all longboard crates.
//!
//! Cross-crate seams live here so that higher layers depend only on
//! `longboard-types`, not on each other.

use crate::{Credential, ProviderId};
use std::sync::Arc;

/// Hands out configured API clients, one per distinct credential.
///
/// Implementations cache clients so that equal credentials resolve to the
/// same `Arc`, and build a fresh client on first use of a new credential.
/// Construction never performs network I/O.
pub trait ClientProvider: Send + Sync {
    /// The client type handed out.
    type Client: Send + Sync;

    /// The upstream this provider serves.
    fn provider(&self) -> ProviderId;

    /// The client bound to `credential`, built on first use.
    fn client_for(&self, credential: &Credential) -> Arc<Self::Client>;

    /// The anonymous client, bound to [`Credential::empty`].
    fn client(&self) -> Arc<Self::Client> {
        self.client_for(&Credential::empty())
    }
}
