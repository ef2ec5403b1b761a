//! Accounting platform OAuth2 authorization-code flow.
//!
//! The login URL carries a caller-chosen `state`; the authorization code the
//! user brings back is exchanged for an access/refresh token pair, and the
//! refresh token later renews it. Both exchanges go through one helper that
//! adds the client credentials and redirect URI.

use longboard_config::AccountingConfig;
use longboard_types::{
    Credential, LongboardError, RequestCredential, Result, TokenExchangeError, require_text,
};
use serde_json::Value;

/// Build the authorization URL the user is sent to.
#[must_use]
pub fn build_auth_url(
    login_url: &str,
    client_id: &str,
    scopes: &[String],
    redirect_uri: Option<&str>,
    state: &str,
) -> String {
    let scope = scopes.join(" ");
    let mut params = vec![
        ("response_type", "code"),
        ("state", state),
        ("client_id", client_id),
        ("scope", scope.as_str()),
    ];
    if let Some(uri) = redirect_uri.filter(|u| !u.trim().is_empty()) {
        params.push(("redirect_uri", uri.trim()));
    }
    let query = serde_urlencoded::to_string(&params).unwrap_or_default();
    let sep = if login_url.contains('?') { '&' } else { '?' };
    format!("{login_url}{sep}{query}")
}

/// Parse a successful token endpoint response.
///
/// The access token becomes the credential key, the refresh token its secret
/// and `expires_in` its expiry.
///
/// # Errors
///
/// Returns [`LongboardError::Mapping`] if `access_token`, `refresh_token` or
/// `expires_in` is missing.
pub fn parse_token_response(json: &Value) -> Result<Credential> {
    let field = |name: &str| {
        json.get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| LongboardError::Mapping(format!("missing {name} in token response")))
    };
    let access_token = field("access_token")?;
    let refresh_token = field("refresh_token")?;
    let expires_in = json
        .get("expires_in")
        .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .ok_or_else(|| LongboardError::Mapping("missing expires_in in token response".into()))?;
    Ok(Credential::with_secret(access_token, refresh_token).with_expiry(expires_in))
}

/// Parse an RFC 6749 §5.2 error body; anything else keeps its raw text.
#[must_use]
pub fn parse_error_response(status: u16, body: &str) -> TokenExchangeError {
    let json: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    match json.get("error").and_then(Value::as_str) {
        Some(error) => TokenExchangeError {
            status,
            error: error.to_string(),
            description: json
                .get("error_description")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        None => TokenExchangeError {
            status,
            error: "unknown_error".to_string(),
            description: Some(body.trim().to_string()).filter(|d| !d.is_empty()),
        },
    }
}

/// Drives the OAuth2 exchanges for one registered application.
#[derive(Clone)]
pub struct AccountingFlow {
    http: reqwest::Client,
    login_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: Option<String>,
    scopes: Vec<String>,
}

impl AccountingFlow {
    /// Build a flow from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Config`] if client credentials or endpoints
    /// are missing, or an HTTP error if the client cannot be built.
    pub fn new(config: &AccountingConfig) -> Result<Self> {
        config.validate()?;
        let http = crate::http::build_client(
            config.connect_timeout(),
            config.request_timeout(),
        )?;
        Ok(Self::with_client(http, config))
    }

    /// Build a flow around an existing client. Configuration is not validated.
    #[must_use]
    pub fn with_client(http: reqwest::Client, config: &AccountingConfig) -> Self {
        Self {
            http,
            login_url: config.login_url.clone(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone().unwrap_or_default(),
            client_secret: config.client_secret.clone().unwrap_or_default(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
        }
    }

    /// The login URL for `state`, packaged as a request credential whose key
    /// is the state.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] if `state` is blank.
    pub fn login_url(&self, state: &str) -> Result<RequestCredential> {
        let state = require_text("state", Some(state))?;
        let url = build_auth_url(
            &self.login_url,
            &self.client_id,
            &self.scopes,
            self.redirect_uri.as_deref(),
            state,
        );
        Ok(RequestCredential::new(Credential::of(state), url))
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Validation`] for a blank code,
    /// [`LongboardError::TokenExchange`] when the provider refuses the grant,
    /// and [`LongboardError::Mapping`] for an incomplete token response.
    pub async fn exchange(&self, code: &str) -> Result<Credential> {
        let code = require_text("code", Some(code))?;
        self.token_request(&[("grant_type", "authorization_code"), ("code", code)])
            .await
    }

    /// Renew tokens with a refresh token.
    ///
    /// # Errors
    ///
    /// Same as [`exchange`](Self::exchange).
    pub async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        let refresh_token = require_text("refresh token", Some(refresh_token))?;
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    /// Grant-specific fields plus the client credentials and redirect URI.
    #[must_use]
    pub fn token_form_params<'a>(&'a self, grant: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
        let mut params = grant.to_vec();
        params.push(("client_id", self.client_id.as_str()));
        params.push(("client_secret", self.client_secret.as_str()));
        params.push((
            "redirect_uri",
            self.redirect_uri.as_deref().map_or("", str::trim),
        ));
        params
    }

    async fn token_request(&self, grant: &[(&str, &str)]) -> Result<Credential> {
        let params = self.token_form_params(grant);
        let resp = self
            .http
            .post(self.token_url.as_str())
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            let err = parse_error_response(status.as_u16(), &text);
            tracing::warn!(status = err.status, error = %err.error, "token exchange refused");
            return Err(err.into());
        }
        let json: Value = serde_json::from_str(&text)
            .map_err(|e| LongboardError::Mapping(format!("token response is not JSON: {e}")))?;
        parse_token_response(&json)
    }
}
