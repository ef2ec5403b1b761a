//! Marketplace three-legged OAuth1 flow.
//!
//! 1. [`MarketplaceFlow::start_login`] obtains a request token and the URL the
//!    user must visit.
//! 2. The user authorizes and receives a verifier out-of-band.
//! 3. [`MarketplaceFlow::exchange`] trades request token + verifier for the
//!    long-lived access token.

use crate::oauth1::{OAuth1Signer, SignRequest};
use longboard_config::MarketplaceConfig;
use longboard_types::{Credential, LongboardError, RequestCredential, Result, require_text};
use std::collections::HashMap;

/// Request-token endpoint, relative to the site root.
pub const REQUEST_TOKEN_PATH: &str = "/api/auth/v1/oauth/token/request";

/// Access-token endpoint, relative to the site root.
pub const ACCESS_TOKEN_PATH: &str = "/api/auth/v1/oauth/token/access";

/// Page the user visits to authorize a request token.
pub const AUTHORIZE_PATH: &str = "/services/api/auth";

/// Build the authorization URL for a request token.
#[must_use]
pub fn build_auth_url(base_url: &str, request_token: &str) -> String {
    format!(
        "{}{AUTHORIZE_PATH}?oauth_token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(request_token)
    )
}

/// Parse a form-encoded token response into a key/secret credential.
///
/// # Errors
///
/// Returns [`LongboardError::Auth`] if the body is not form-encoded or lacks
/// `oauth_token` / `oauth_token_secret`.
pub fn parse_token_response(body: &str) -> Result<Credential> {
    let fields: HashMap<String, String> = serde_urlencoded::from_str(body.trim())
        .map_err(|e| LongboardError::Auth(format!("invalid token response: {e}")))?;
    let token = fields
        .get("oauth_token")
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| LongboardError::Auth("missing oauth_token in response".into()))?;
    let secret = fields
        .get("oauth_token_secret")
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| LongboardError::Auth("missing oauth_token_secret in response".into()))?;
    Ok(Credential::with_secret(token.as_str(), secret.as_str()))
}

/// Drives the OAuth1 dance for one consumer.
#[derive(Clone)]
pub struct MarketplaceFlow {
    http: reqwest::Client,
    signer: OAuth1Signer,
    base_url: String,
    callback_url: Option<String>,
}

impl MarketplaceFlow {
    /// Build a flow from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Config`] if the consumer key/secret or base URL
    /// are missing, or an HTTP error if the client cannot be built.
    pub fn new(config: &MarketplaceConfig) -> Result<Self> {
        config.validate()?;
        let http = crate::http::build_client(
            config.connect_timeout(),
            config.request_timeout(),
        )?;
        Ok(Self::with_client(http, config))
    }

    /// Build a flow around an existing client. Configuration is not validated.
    #[must_use]
    pub fn with_client(http: reqwest::Client, config: &MarketplaceConfig) -> Self {
        Self {
            http,
            signer: OAuth1Signer::new(
                config.client_id.clone().unwrap_or_default(),
                config.client_secret.clone().unwrap_or_default(),
            ),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            callback_url: config.callback_url.clone(),
        }
    }

    /// Obtain a request token and the authorization URL for it.
    ///
    /// `callback` overrides the configured callback URL.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Auth`] if the provider rejects the consumer or
    /// answers without a token, or a transport error.
    pub async fn start_login(&self, callback: Option<&str>) -> Result<RequestCredential> {
        let callback = callback
            .or(self.callback_url.as_deref())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("oob");
        let url = format!("{}{REQUEST_TOKEN_PATH}", self.base_url);
        let body = self
            .token_call(&url, None, &[("oauth_callback", callback)])
            .await?;
        let request_token = parse_token_response(&body)?;
        let auth_url = build_auth_url(&self.base_url, request_token.key());
        tracing::debug!(auth_url = %auth_url, "obtained marketplace request token");
        Ok(RequestCredential::new(request_token, auth_url))
    }

    /// Exchange an authorized request token and its verifier for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank verifier or request
    /// token, and [`LongboardError::Auth`] if the provider rejects the verifier
    /// or the request token has expired.
    pub async fn exchange(
        &self,
        request_token: &impl AsRef<Credential>,
        verifier: &str,
    ) -> Result<Credential> {
        let request_token = request_token.as_ref();
        require_text("request token", Some(request_token.key()))?;
        let verifier = require_text("verifier", Some(verifier))?;
        let url = format!("{}{ACCESS_TOKEN_PATH}", self.base_url);
        let body = self
            .token_call(&url, Some(request_token), &[("oauth_verifier", verifier)])
            .await?;
        let access = parse_token_response(&body)?;
        tracing::info!("marketplace access token issued");
        Ok(access)
    }

    async fn token_call(
        &self,
        url: &str,
        token: Option<&Credential>,
        extra: &[(&str, &str)],
    ) -> Result<String> {
        let authorization = self.signer.authorize(&SignRequest {
            method: "POST",
            url,
            query: &[],
            token,
            extra,
        })?;
        let resp = self
            .http
            .post(url)
            .header("Authorization", authorization)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), url, "marketplace token call rejected");
            return Err(LongboardError::Auth(format!(
                "token request rejected: status={}, body={}",
                status.as_u16(),
                text.trim()
            )));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn config(base: &str) -> MarketplaceConfig {
        MarketplaceConfig {
            base_url: base.to_string(),
            client_id: Some("consumer".into()),
            client_secret: Some("consumer-secret".into()),
            callback_url: Some("https://app.example/cb".into()),
            ..MarketplaceConfig::default()
        }
    }

    fn auth_header(req: &Request) -> String {
        req.headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn test_build_auth_url() {
        assert_eq!(
            build_auth_url("https://www.upwork.com/", "rt123"),
            "https://www.upwork.com/services/api/auth?oauth_token=rt123"
        );
    }

    #[test]
    fn test_parse_token_response() {
        let c = parse_token_response("oauth_token=abc&oauth_token_secret=def&extra=1").unwrap();
        assert_eq!(c, Credential::with_secret("abc", "def"));
    }

    #[test]
    fn test_parse_token_response_missing_secret() {
        let err = parse_token_response("oauth_token=abc").unwrap_err();
        assert!(matches!(err, LongboardError::Auth(_)));
    }

    #[test]
    fn test_new_requires_consumer() {
        let cfg = MarketplaceConfig::default();
        assert!(matches!(
            MarketplaceFlow::new(&cfg),
            Err(LongboardError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_start_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REQUEST_TOKEN_PATH))
            .and(header_exists("authorization"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("oauth_token=req-token&oauth_token_secret=req-secret"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let flow = MarketplaceFlow::new(&config(&server.uri())).unwrap();
        let rc = flow.start_login(None).await.unwrap();
        assert_eq!(rc.key(), "req-token");
        assert_eq!(rc.secret(), Some("req-secret"));
        assert_eq!(
            rc.authorization_url(),
            format!("{}/services/api/auth?oauth_token=req-token", server.uri())
        );

        let requests = server.received_requests().await.unwrap();
        let header = auth_header(&requests[0]);
        assert!(header.contains("oauth_callback=\"https%3A%2F%2Fapp.example%2Fcb\""));
        assert!(header.contains("oauth_consumer_key=\"consumer\""));
        assert!(!header.contains("oauth_token="));
    }

    #[tokio::test]
    async fn test_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ACCESS_TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("oauth_token=access&oauth_token_secret=access-secret"),
            )
            .mount(&server)
            .await;

        let flow = MarketplaceFlow::new(&config(&server.uri())).unwrap();
        let request = RequestCredential::new(
            Credential::with_secret("req-token", "req-secret"),
            "https://unused",
        );
        let access = flow.exchange(&request, "verifier-1").await.unwrap();
        assert_eq!(access, Credential::with_secret("access", "access-secret"));

        let requests = server.received_requests().await.unwrap();
        let header = auth_header(&requests[0]);
        assert!(header.contains("oauth_token=\"req-token\""));
        assert!(header.contains("oauth_verifier=\"verifier-1\""));
    }

    #[tokio::test]
    async fn test_exchange_rejected_verifier_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ACCESS_TOKEN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("oauth_problem=token_rejected"))
            .mount(&server)
            .await;

        let flow = MarketplaceFlow::new(&config(&server.uri())).unwrap();
        let err = flow
            .exchange(&Credential::with_secret("t", "s"), "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, LongboardError::Auth(_)));
    }

    #[tokio::test]
    async fn test_exchange_blank_verifier() {
        let flow = MarketplaceFlow::new(&config("http://127.0.0.1:9")).unwrap();
        let err = flow
            .exchange(&Credential::with_secret("t", "s"), "  ")
            .await
            .unwrap_err();
        assert!(matches!(err, LongboardError::Validation(_)));
    }
}
