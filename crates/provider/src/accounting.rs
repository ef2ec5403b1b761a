//! GraphQL client for the accounting platform and its per-token provider.

use crate::cache::ClientCache;
use crate::http_log::HttpLogger;
use crate::http_util::{ProviderHttp, Reply};
use longboard_config::AccountingConfig;
use longboard_types::{
    AccountingApiError, ClientProvider, Credential, LongboardError, ProviderId, Result,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

/// The first entry of a GraphQL `errors` array as an API error.
///
/// The code is `extensions.code` when present and the HTTP status otherwise.
#[must_use]
pub fn graphql_error(json: &Value, status: u16) -> Option<AccountingApiError> {
    let first = json.get("errors")?.as_array()?.first()?;
    let message = first
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("accounting API responded with an error");
    let code = first
        .pointer("/extensions/code")
        .and_then(|c| {
            c.as_str()
                .map(str::to_string)
                .or_else(|| c.as_i64().map(|i| i.to_string()))
        });
    let reason = code.clone().unwrap_or_else(|| message.to_string());
    Some(AccountingApiError::new(
        message,
        reason,
        code.unwrap_or_else(|| status.to_string()),
    ))
}

/// An accounting client bound to one access token.
pub struct AccountingClient {
    http: ProviderHttp,
    graphql_url: String,
    token: Credential,
    headers: Vec<(String, String)>,
}

impl AccountingClient {
    #[must_use]
    pub fn new(
        http: ProviderHttp,
        graphql_url: impl Into<String>,
        token: Credential,
        headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            http,
            graphql_url: graphql_url.into(),
            token,
            headers,
        }
    }

    #[must_use]
    pub fn token(&self) -> &Credential {
        &self.token
    }

    /// Run `query` and return its `data` object.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Accounting`] when the response carries
    /// GraphQL errors or a non-2xx status, and [`LongboardError::Mapping`]
    /// when it has no `data`.
    pub async fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        let mut builder = self
            .http
            .client()
            .post(self.graphql_url.as_str())
            .header("Accept", "application/json")
            .json(&json!({ "query": query, "variables": variables }));
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if self.token.has_key() {
            builder = builder.header("Authorization", format!("Bearer {}", self.token.key()));
        }
        let reply = self.http.send(builder).await?;
        tracing::debug!(status = reply.status, "accounting query");
        interpret(reply)
    }

    /// Like [`execute`](Self::execute), deserializing `data` into `T`.
    ///
    /// # Errors
    ///
    /// As for [`execute`](Self::execute), plus [`LongboardError::Mapping`]
    /// when `data` does not fit `T`.
    pub async fn query<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let data = self.execute(query, variables).await?;
        serde_json::from_value(data)
            .map_err(|e| LongboardError::Mapping(format!("unexpected accounting response: {e}")))
    }
}

fn interpret(reply: Reply) -> Result<Value> {
    let json: Value = serde_json::from_str(&reply.body).unwrap_or(Value::Null);
    if let Some(err) = graphql_error(&json, reply.status) {
        return Err(err.into());
    }
    if !reply.is_success() {
        let message = if reply.body.trim().is_empty() {
            format!("accounting API responded with status {}", reply.status)
        } else {
            reply.body.trim().to_string()
        };
        return Err(AccountingApiError::new(message, "", reply.status.to_string()).into());
    }
    match json {
        Value::Object(mut map) => map
            .remove("data")
            .filter(|d| !d.is_null())
            .ok_or_else(|| LongboardError::Mapping("accounting response has no data".into())),
        _ => Err(LongboardError::Mapping(
            "accounting response is not a JSON object".into(),
        )),
    }
}

/// Builds and caches one [`AccountingClient`] per access token.
pub struct AccountingClientProvider {
    cache: ClientCache<AccountingClient>,
    http: ProviderHttp,
    graphql_url: String,
    headers: Vec<(String, String)>,
}

impl AccountingClientProvider {
    /// # Errors
    ///
    /// Returns [`LongboardError::Config`] for missing client credentials or
    /// endpoints.
    pub fn new(config: &AccountingConfig) -> Result<Self> {
        config.validate()?;
        let client = longboard_auth::http::build_client(
            config.connect_timeout(),
            config.request_timeout(),
        )?;
        Ok(Self::with_client(client, config))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &AccountingConfig) -> Self {
        Self {
            cache: ClientCache::new(ProviderId::Accounting),
            http: ProviderHttp::new(client, HttpLogger::from_config(&config.http)),
            graphql_url: config.graphql_url.clone(),
            headers: config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &ClientCache<AccountingClient> {
        &self.cache
    }
}

impl ClientProvider for AccountingClientProvider {
    type Client = AccountingClient;

    fn provider(&self) -> ProviderId {
        ProviderId::Accounting
    }

    fn client_for(&self, credential: &Credential) -> Arc<AccountingClient> {
        self.cache.get_or_insert_with(credential, || {
            AccountingClient::new(
                self.http.clone(),
                self.graphql_url.clone(),
                credential.clone(),
                self.headers.clone(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longboard_types::ErrorKind;
    use std::collections::BTreeMap;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(graphql_url: &str) -> AccountingClientProvider {
        let mut headers = BTreeMap::new();
        headers.insert("X-Client".to_string(), "longboard".to_string());
        AccountingClientProvider::new(&AccountingConfig {
            graphql_url: graphql_url.to_string(),
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            headers,
            ..AccountingConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_graphql_error_with_extension_code() {
        let json = json!({"errors": [{"message": "Not signed in", "extensions": {"code": "UNAUTHENTICATED"}}]});
        let err = graphql_error(&json, 200).unwrap();
        assert_eq!(err.code, "UNAUTHENTICATED");
        assert_eq!(err.message, "Not signed in");
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn test_graphql_error_falls_back_to_status() {
        let err = graphql_error(&json!({"errors": [{"message": "x"}]}), 502).unwrap();
        assert_eq!(err.code, "502");
        assert!(graphql_error(&json!({"data": {}}), 200).is_none());
    }

    #[tokio::test]
    async fn test_bearer_and_default_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("authorization", "Bearer access"))
            .and(header("x-client", "longboard"))
            .and(body_string_contains("\"variables\":{\"id\":\"b1\"}"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"business": {"id": "b1"}}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let p = provider(&format!("{}/graphql", server.uri()));
        let client = p.client_for(&Credential::with_secret("access", "refresh"));
        let data = client
            .execute("query($id: ID!) { business(id: $id) { id } }", json!({"id": "b1"}))
            .await
            .unwrap();
        assert_eq!(data["business"]["id"], "b1");
    }

    #[tokio::test]
    async fn test_anonymous_client_sends_no_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"ok": 1}})))
            .mount(&server)
            .await;

        let p = provider(&server.uri());
        p.client().execute("{ ok }", json!({})).await.unwrap();
        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_graphql_errors_become_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{"message": "Business not found", "extensions": {"code": "NOT_FOUND"}}]
            })))
            .mount(&server)
            .await;

        let client = provider(&server.uri()).client_for(&Credential::of("t"));
        let err = client.execute("{ x }", json!({})).await.unwrap_err();
        assert!(matches!(err, LongboardError::Accounting(ref e) if e.code == "NOT_FOUND"));
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }

    #[tokio::test]
    async fn test_unauthorized_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
            .mount(&server)
            .await;

        let client = provider(&server.uri()).client_for(&Credential::of("t"));
        let err = client.execute("{ x }", json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[tokio::test]
    async fn test_missing_data_is_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = provider(&server.uri()).client_for(&Credential::of("t"));
        let err = client.execute("{ x }", json!({})).await.unwrap_err();
        assert!(matches!(err, LongboardError::Mapping(_)));
    }
}
