//! Signed REST client for the marketplace and its per-token provider.

use crate::cache::ClientCache;
use crate::http_log::HttpLogger;
use crate::http_util::{ProviderHttp, Reply};
use longboard_auth::oauth1::encode_query;
use longboard_auth::{OAuth1Signer, SignRequest};
use longboard_config::MarketplaceConfig;
use longboard_types::{
    ClientProvider, Credential, LongboardError, MarketplaceApiError, ProviderId, Result,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Which half of the marketplace API a resource lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// REST resources, addressed as `<base>/api<resource>.json`.
    Api,
    /// Tabular reports, addressed as `<base>/gds<resource>`.
    Gds,
}

impl EntryPoint {
    #[must_use]
    pub fn url(self, base_url: &str, resource: &str) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            Self::Api => format!("{base}/api{resource}.json"),
            Self::Gds => format!("{base}/gds{resource}"),
        }
    }
}

/// Turn an `errors`/`error` object in a response into an API error.
///
/// Only the first entry of `errors` is considered. The message reads
/// `[reason] message`; the code comes from the object when it carries one and
/// from `status` otherwise.
#[must_use]
pub fn check_for_exception(json: &Value, status: u16) -> Option<MarketplaceApiError> {
    let error = match json.get("errors") {
        Some(errors) => errors.as_array()?.first()?,
        None => json.get("error")?,
    };
    if let Some(text) = error.as_str() {
        return Some(MarketplaceApiError::new(text, "", i64::from(status)));
    }
    let text = |name: &str| {
        error
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };
    let reason = text("reason");
    let message = text("message");
    let full = match (reason.is_empty(), message.is_empty()) {
        (false, false) => format!("[{reason}] {message}"),
        (false, true) => format!("[{reason}]"),
        _ => message,
    };
    let code = ["code", "status"]
        .iter()
        .filter_map(|k| error.get(*k))
        .find_map(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
        .unwrap_or_else(|| i64::from(status));
    Some(MarketplaceApiError::new(full, reason, code))
}

/// A marketplace client bound to one access token.
pub struct MarketplaceClient {
    http: ProviderHttp,
    signer: OAuth1Signer,
    token: Credential,
    base_url: String,
}

impl MarketplaceClient {
    #[must_use]
    pub fn new(
        http: ProviderHttp,
        signer: OAuth1Signer,
        token: Credential,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            signer,
            token,
            base_url: base_url.into(),
        }
    }

    #[must_use]
    pub fn token(&self) -> &Credential {
        &self.token
    }

    /// GET `resource` with `params` in the query string.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Marketplace`] for API errors, including
    /// `error`/`errors` objects in successful responses, and
    /// [`LongboardError::Mapping`] for a body that is not JSON.
    pub async fn get(
        &self,
        entry: EntryPoint,
        resource: &str,
        params: &[(String, String)],
    ) -> Result<Value> {
        self.call(http::Method::GET, entry, resource, params, None)
            .await
    }

    /// POST `body` as JSON to `resource`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub async fn post(
        &self,
        entry: EntryPoint,
        resource: &str,
        body: Map<String, Value>,
    ) -> Result<Value> {
        self.call(http::Method::POST, entry, resource, &[], Some(body))
            .await
    }

    /// PUT, tunnelled as POST with `http_method=put`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub async fn put(
        &self,
        entry: EntryPoint,
        resource: &str,
        mut body: Map<String, Value>,
    ) -> Result<Value> {
        body.insert("http_method".into(), Value::from("put"));
        self.post(entry, resource, body).await
    }

    /// DELETE, tunnelled as POST with `http_method=delete`.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub async fn delete(
        &self,
        entry: EntryPoint,
        resource: &str,
        mut body: Map<String, Value>,
    ) -> Result<Value> {
        body.insert("http_method".into(), Value::from("delete"));
        self.post(entry, resource, body).await
    }

    async fn call(
        &self,
        method: http::Method,
        entry: EntryPoint,
        resource: &str,
        params: &[(String, String)],
        body: Option<Map<String, Value>>,
    ) -> Result<Value> {
        let url = entry.url(&self.base_url, resource);
        let authorization = self.signer.authorize(&SignRequest {
            method: method.as_str(),
            url: &url,
            query: params,
            token: Some(&self.token),
            extra: &[],
        })?;
        let target = if params.is_empty() {
            url.clone()
        } else {
            format!("{url}?{}", encode_query(params))
        };

        let mut builder = self
            .http
            .client()
            .request(method.clone(), target.as_str())
            .header("Authorization", authorization)
            .header("Accept", "application/json");
        if let Some(body) = body {
            builder = builder
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&Value::Object(body))?);
        }

        let reply = self.http.send(builder).await?;
        tracing::debug!(%method, url = %url, status = reply.status, "marketplace call");
        interpret(&reply)
    }
}

fn interpret(reply: &Reply) -> Result<Value> {
    let json: Option<Value> = if reply.body.trim().is_empty() {
        Some(Value::Null)
    } else {
        serde_json::from_str(&reply.body).ok()
    };
    if let Some(err) = json
        .as_ref()
        .and_then(|j| check_for_exception(j, reply.status))
    {
        return Err(err.into());
    }
    if !reply.is_success() {
        let message = if reply.body.trim().is_empty() {
            format!("marketplace responded with status {}", reply.status)
        } else {
            reply.body.trim().to_string()
        };
        return Err(MarketplaceApiError::new(message, "", i64::from(reply.status)).into());
    }
    json.ok_or_else(|| LongboardError::Mapping("marketplace response is not JSON".into()))
}

/// Builds and caches one [`MarketplaceClient`] per access token.
pub struct MarketplaceClientProvider {
    cache: ClientCache<MarketplaceClient>,
    http: ProviderHttp,
    signer: OAuth1Signer,
    base_url: String,
}

impl MarketplaceClientProvider {
    /// # Errors
    ///
    /// Returns [`LongboardError::Config`] for a missing consumer key, secret
    /// or base URL.
    pub fn new(config: &MarketplaceConfig) -> Result<Self> {
        config.validate()?;
        let client = longboard_auth::http::build_client(
            config.connect_timeout(),
            config.request_timeout(),
        )?;
        Ok(Self::with_client(client, config))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &MarketplaceConfig) -> Self {
        Self {
            cache: ClientCache::new(ProviderId::Marketplace),
            http: ProviderHttp::new(client, HttpLogger::from_config(&config.http)),
            signer: OAuth1Signer::new(
                config.client_id.clone().unwrap_or_default(),
                config.client_secret.clone().unwrap_or_default(),
            ),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &ClientCache<MarketplaceClient> {
        &self.cache
    }
}

impl ClientProvider for MarketplaceClientProvider {
    type Client = MarketplaceClient;

    fn provider(&self) -> ProviderId {
        ProviderId::Marketplace
    }

    fn client_for(&self, credential: &Credential) -> Arc<MarketplaceClient> {
        self.cache.get_or_insert_with(credential, || {
            MarketplaceClient::new(
                self.http.clone(),
                self.signer.clone(),
                credential.clone(),
                self.base_url.clone(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longboard_types::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base: &str) -> MarketplaceClientProvider {
        MarketplaceClientProvider::new(&MarketplaceConfig {
            base_url: base.to_string(),
            client_id: Some("ck".into()),
            client_secret: Some("cs".into()),
            ..MarketplaceConfig::default()
        })
        .unwrap()
    }

    fn token() -> Credential {
        Credential::with_secret("tok", "tok-secret")
    }

    #[test]
    fn test_new_with_unbounded_read_timeout() {
        let provider = MarketplaceClientProvider::new(&MarketplaceConfig {
            client_id: Some("ck".into()),
            client_secret: Some("cs".into()),
            read_timeout_secs: u64::MAX,
            ..MarketplaceConfig::default()
        });
        assert!(provider.is_ok());
    }

    #[test]
    fn test_entry_point_urls() {
        assert_eq!(
            EntryPoint::Api.url("https://www.upwork.com/", "/hr/v2/users/me"),
            "https://www.upwork.com/api/hr/v2/users/me.json"
        );
        assert_eq!(
            EntryPoint::Gds.url("https://www.upwork.com", "/finreports/v2/providers/x/earnings"),
            "https://www.upwork.com/gds/finreports/v2/providers/x/earnings"
        );
    }

    #[test]
    fn test_check_for_exception_errors_array() {
        let json = json!({"errors": [
            {"reason": "token_rejected", "message": "Token expired", "code": "401"},
            {"message": "ignored"}
        ]});
        let err = check_for_exception(&json, 200).unwrap();
        assert_eq!(err.message, "[token_rejected] Token expired");
        assert_eq!(err.reason, "token_rejected");
        assert_eq!(err.code, 401);
    }

    #[test]
    fn test_check_for_exception_error_object_defaults_code() {
        let err = check_for_exception(&json!({"error": {"message": "boom"}}), 503).unwrap();
        assert_eq!(err.message, "boom");
        assert_eq!(err.code, 503);
    }

    #[test]
    fn test_check_for_exception_clean_body() {
        assert!(check_for_exception(&json!({"user": {}}), 200).is_none());
        assert!(check_for_exception(&json!({"errors": []}), 200).is_none());
    }

    #[test]
    fn test_client_for_same_token_is_cached() {
        let p = provider("https://example.com");
        let a = p.client_for(&token());
        let b = p.client_for(&token());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &p.client()));
        assert_eq!(p.client().token(), &Credential::empty());
    }

    #[test]
    fn test_new_requires_consumer() {
        assert!(matches!(
            MarketplaceClientProvider::new(&MarketplaceConfig::default()),
            Err(LongboardError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_get_signs_and_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gds/timereports/v1/companies/c1"))
            .and(query_param("tq", "SELECT hours WHERE worked_on >= '2024-01-01'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"table": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = provider(&server.uri()).client_for(&token());
        let params = vec![(
            "tq".to_string(),
            "SELECT hours WHERE worked_on >= '2024-01-01'".to_string(),
        )];
        let json = client
            .get(EntryPoint::Gds, "/timereports/v1/companies/c1", &params)
            .await
            .unwrap();
        assert_eq!(json, json!({"table": {}}));

        let requests = server.received_requests().await.unwrap();
        let auth = requests[0]
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(auth.contains("oauth_token=\"tok\""));
        assert!(auth.contains("oauth_signature=\""));
        assert!(!auth.contains("tq="));
    }

    #[tokio::test]
    async fn test_put_is_tunnelled_as_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/hr/v2/engagements/e1.json"))
            .and(header("content-type", "application/json"))
            .and(body_string_contains("\"http_method\":\"put\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = provider(&server.uri()).client_for(&token());
        let mut body = Map::new();
        body.insert("status".into(), Value::from("closed"));
        let json = client
            .put(EntryPoint::Api, "/hr/v2/engagements/e1", body)
            .await
            .unwrap();
        assert_eq!(json["ok"], true);
    }

    #[tokio::test]
    async fn test_delete_is_tunnelled_as_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/x.json"))
            .and(body_string_contains("\"http_method\":\"delete\""))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .expect(1)
            .mount(&server)
            .await;

        let client = provider(&server.uri()).client_for(&token());
        let json = client.delete(EntryPoint::Api, "/x", Map::new()).await.unwrap();
        assert!(json.is_null());
    }

    #[tokio::test]
    async fn test_error_in_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/hr/v2/users/me.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": {"reason": "forbidden", "message": "No access", "code": 403}
            })))
            .mount(&server)
            .await;

        let client = provider(&server.uri()).client_for(&token());
        let err = client
            .get(EntryPoint::Api, "/hr/v2/users/me", &[])
            .await
            .unwrap_err();
        match err {
            LongboardError::Marketplace(e) => {
                assert_eq!(e.code, 403);
                assert_eq!(e.message, "[forbidden] No access");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_status_is_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let client = provider(&server.uri()).client_for(&token());
        let err = client
            .get(EntryPoint::Api, "/hr/v2/users/me", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }
}
