//! Shared HTTP plumbing for the API clients.
//!
//! One place that sends a request, optionally dumps it and its response
//! through the [`HttpLogger`], and reads the body as text.

use crate::http_log::HttpLogger;
use longboard_types::Result;
use reqwest::{Client, RequestBuilder};

/// Status and body text of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP helper shared by every client built from one provider.
#[derive(Clone)]
pub struct ProviderHttp {
    http: Client,
    logger: Option<HttpLogger>,
}

impl ProviderHttp {
    #[must_use]
    pub fn new(http: Client, logger: Option<HttpLogger>) -> Self {
        Self { http, logger }
    }

    /// The inner client, for building requests.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.http
    }

    /// Send `builder` and read the whole body, whatever the status.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Http`](longboard_types::LongboardError::Http)
    /// if the request cannot be built or sent, or the body cannot be read.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Reply> {
        let Some(logger) = &self.logger else {
            let resp = builder.send().await?;
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            return Ok(Reply { status, body });
        };

        let request = builder.build()?;
        let id = HttpLogger::next_id();
        logger.log_request(
            id,
            request.method().as_str(),
            request.url().as_str(),
            request.headers(),
            request.body().and_then(|b| b.as_bytes()),
        );
        let resp = self.http.execute(request).await?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.text().await?;
        logger.log_response(id, status, &headers, &body);
        Ok(Reply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longboard_types::{ErrorKind, LongboardError};
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serve one response that promises more body than it sends, then hang up.
    async fn truncated_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\nshort")
                .await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/x")
    }

    #[test]
    fn test_reply_success_range() {
        let ok = Reply {
            status: 204,
            body: String::new(),
        };
        let bad = Reply {
            status: 302,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }

    #[tokio::test]
    async fn test_send_returns_error_status_as_reply() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let http = ProviderHttp::new(Client::new(), Some(HttpLogger::new(["authorization"], 16)));
        let builder = http.client().get(format!("{}/x", server.uri()));
        let reply = http.send(builder).await.unwrap();
        assert_eq!(reply.status, 503);
        assert_eq!(reply.body, "down");
    }

    #[tokio::test]
    async fn test_send_surfaces_body_read_failure() {
        for logger in [None, Some(HttpLogger::new(["authorization"], 16))] {
            let url = truncated_server().await;
            let http = ProviderHttp::new(Client::new(), logger);
            let err = http.send(http.client().get(url)).await.unwrap_err();
            assert!(matches!(err, LongboardError::Http(_)));
            assert_eq!(err.kind(), ErrorKind::Upstream);
        }
    }
}
