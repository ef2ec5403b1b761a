//! Debug dumps of upstream HTTP traffic at TRACE level.

use http::HeaderMap;
use longboard_config::HttpDebugConfig;
use std::sync::atomic::{AtomicU64, Ordering};

const REDACTED: &str = "<redacted>";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Logs requests and responses with sensitive headers masked and bodies capped.
#[derive(Debug, Clone)]
pub struct HttpLogger {
    redact: Vec<String>,
    max_body_size: usize,
}

impl HttpLogger {
    pub fn new<I, S>(redact: I, max_body_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            redact: redact
                .into_iter()
                .map(|h| h.as_ref().trim().to_ascii_lowercase())
                .collect(),
            max_body_size,
        }
    }

    /// `None` unless `config.debug` is set.
    #[must_use]
    pub fn from_config(config: &HttpDebugConfig) -> Option<Self> {
        config
            .debug
            .then(|| Self::new(&config.redact_headers, config.max_body_size))
    }

    /// A fresh id pairing a request with its response in the log.
    #[must_use]
    pub fn next_id() -> u64 {
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_redacted(&self, name: &str) -> bool {
        self.redact.iter().any(|r| r.eq_ignore_ascii_case(name))
    }

    /// One `name: value` line per header.
    #[must_use]
    pub fn format_headers(&self, headers: &HeaderMap) -> String {
        headers
            .iter()
            .map(|(name, value)| {
                let shown = if self.is_redacted(name.as_str()) {
                    REDACTED.to_string()
                } else {
                    String::from_utf8_lossy(value.as_bytes()).into_owned()
                };
                format!("{name}: {shown}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The body as text, cut at `max_body_size` bytes.
    #[must_use]
    pub fn format_body(&self, body: &[u8]) -> String {
        if body.len() <= self.max_body_size {
            return String::from_utf8_lossy(body).into_owned();
        }
        let head = String::from_utf8_lossy(&body[..self.max_body_size]);
        format!(
            "{head}... ({} bytes truncated)",
            body.len() - self.max_body_size
        )
    }

    pub fn log_request(
        &self,
        id: u64,
        method: &str,
        url: &str,
        headers: &HeaderMap,
        body: Option<&[u8]>,
    ) {
        tracing::trace!(
            request_id = id,
            method,
            url,
            headers = %self.format_headers(headers),
            body = %body.map(|b| self.format_body(b)).unwrap_or_default(),
            "--> upstream request"
        );
    }

    pub fn log_response(&self, id: u64, status: u16, headers: &HeaderMap, body: &str) {
        tracing::trace!(
            request_id = id,
            status,
            headers = %self.format_headers(headers),
            body = %self.format_body(body.as_bytes()),
            "<-- upstream response"
        );
    }
}
