//! HTTP client construction shared by the flows and the API clients.

use longboard_types::Result;
use std::time::Duration;

/// Build a `reqwest` client with the given connect and overall request timeouts.
///
/// # Errors
///
/// Returns [`LongboardError::Http`](longboard_types::LongboardError::Http) if
/// the TLS backend cannot be initialised.
pub fn build_client(connect_timeout: Duration, timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        .build()?;
    Ok(client)
}
