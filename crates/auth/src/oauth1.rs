//! OAuth 1.0a HMAC-SHA1 request signing (RFC 5849).
//!
//! The signer only ever sees query and `oauth_*` parameters. JSON request
//! bodies are not form-encoded and so never enter the signature base string.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use longboard_types::{Credential, LongboardError, Result};
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SIGNATURE_METHOD: &str = "HMAC-SHA1";
pub const VERSION: &str = "1.0";

/// RFC 3986 percent-encoding: everything but `A-Z a-z 0-9 - . _ ~`.
#[must_use]
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Encode `params` once into a query string. The result is both signed and sent.
#[must_use]
pub fn encode_query(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the signature base string from the method, the base URL (no query)
/// and every parameter that takes part in the signature.
#[must_use]
pub fn base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&normalize_url(url)),
        percent_encode(&normalized)
    )
}

/// Lower-case scheme and host, drop default ports, query and fragment.
fn normalize_url(url: &str) -> String {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let scheme = scheme.to_ascii_lowercase();
    let (authority, path) = rest.find('/').map_or((rest, "/"), |i| rest.split_at(i));
    let authority = authority.to_ascii_lowercase();
    let default_port = match scheme.as_str() {
        "http" => ":80",
        "https" => ":443",
        _ => "",
    };
    let host = if default_port.is_empty() {
        authority.as_str()
    } else {
        authority.strip_suffix(default_port).unwrap_or(&authority)
    };
    format!("{scheme}://{host}{path}")
}

/// HMAC-SHA1 over `base`, keyed by `consumer_secret&token_secret`, base64-encoded.
///
/// # Errors
///
/// Returns [`LongboardError::Auth`] if the MAC cannot be keyed.
pub fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> Result<String> {
    let key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac = <Hmac<Sha1>>::new_from_slice(key.as_bytes())
        .map_err(|e| LongboardError::Auth(format!("cannot key HMAC-SHA1: {e}")))?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Signs requests on behalf of one OAuth1 consumer.
#[derive(Debug, Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
}

/// One request to be signed.
#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    pub method: &'a str,
    pub url: &'a str,
    pub query: &'a [(String, String)],
    /// Token and token secret; absent for the request-token call.
    pub token: Option<&'a Credential>,
    /// Extra protocol parameters such as `oauth_callback` or `oauth_verifier`.
    pub extra: &'a [(&'a str, &'a str)],
}

impl OAuth1Signer {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    #[must_use]
    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    /// The `Authorization` header value for `request`, with a fresh nonce and
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Auth`] if signing fails.
    pub fn authorize(&self, request: &SignRequest<'_>) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        self.authorize_with(request, &crate::state::nonce(), timestamp)
    }

    /// Like [`authorize`](Self::authorize) with a fixed nonce and timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Auth`] if signing fails.
    pub fn authorize_with(
        &self,
        request: &SignRequest<'_>,
        nonce: &str,
        timestamp: u64,
    ) -> Result<String> {
        let mut oauth: Vec<(String, String)> = vec![
            ("oauth_consumer_key".into(), self.consumer_key.clone()),
            ("oauth_nonce".into(), nonce.to_string()),
            ("oauth_signature_method".into(), SIGNATURE_METHOD.into()),
            ("oauth_timestamp".into(), timestamp.to_string()),
            ("oauth_version".into(), VERSION.into()),
        ];
        if let Some(token) = request.token.filter(|t| t.has_key()) {
            oauth.push(("oauth_token".into(), token.key().to_string()));
        }
        for (k, v) in request.extra {
            oauth.push(((*k).to_string(), (*v).to_string()));
        }

        let mut all = oauth.clone();
        all.extend(request.query.iter().cloned());
        let base = base_string(request.method, request.url, &all);
        let token_secret = request.token.and_then(Credential::secret).unwrap_or("");
        let signature = sign(&base, &self.consumer_secret, token_secret)?;
        oauth.push(("oauth_signature".into(), signature));
        oauth.sort();

        let fields = oauth
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {fields}"))
    }
}
