use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;

use super::auth::TokenProvider;
use super::descriptor::HttpMethod;
use super::error::TransportError;

/// A fully rendered request, ready to put on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Base URL plus rendered path, without the query string
    pub url: String,
    /// Percent-encoded query pairs in wire order
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
            content_type: None,
        }
    }

    /// The URL as sent, query string included
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.url, query)
    }
}

/// Raw response handed back by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The narrow HTTP collaborator the executor depends on
///
/// Authentication, pooling and timeouts live behind this trait. A transport
/// must send exactly one request per call and must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

const MAX_REDIRECTS: usize = 5;

/// Production transport backed by `reqwest`
pub struct ReqwestTransport {
    http: Client,
    tokens: Option<Arc<dyn TokenProvider>>,
}

impl ReqwestTransport {
    pub fn new(
        timeout: Duration,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Result<Self, TransportError> {
        // Drive item downloads answer with a 302 to a pre-authenticated URL;
        // reqwest drops `Authorization` when the redirect changes host.
        let http = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self { http, tokens })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.full_url();
        let request_id = uuid::Uuid::new_v4().to_string();
        debug!(method = %request.method, %url, %request_id, "sending request");

        let mut builder = self
            .http
            .request(request.method.to_reqwest(), &url)
            .header("client-request-id", &request_id);

        if let Some(tokens) = &self.tokens {
            let token = tokens.bearer_token().await?;
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| TransportError::Auth(e.to_string()))?;
            builder = builder.header(AUTHORIZATION, value);
        }

        if let Some(content_type) = &request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let res = builder.send().await?;

        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = res.bytes().await?.to_vec();

        debug!(status, bytes = body.len(), %request_id, "received response");

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::StaticToken;
    use wiremock::matchers::{body_bytes, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(token: Option<&str>) -> ReqwestTransport {
        let tokens = token.map(|t| Arc::new(StaticToken::new(t)) as Arc<dyn TokenProvider>);
        ReqwestTransport::new(Duration::from_secs(5), tokens).unwrap()
    }

    #[test]
    fn test_full_url_without_query() {
        let request = HttpRequest::get("https://graph.microsoft.com/v1.0/teams/t1");
        assert_eq!(request.full_url(), "https://graph.microsoft.com/v1.0/teams/t1");
    }

    #[test]
    fn test_full_url_keeps_wire_names() {
        let mut request = HttpRequest::get("https://graph.microsoft.com/v1.0/groups/g1/team");
        request.query = vec![
            ("$select".to_string(), "displayName,id".to_string()),
            ("$top".to_string(), "5".to_string()),
        ];
        assert_eq!(
            request.full_url(),
            "https://graph.microsoft.com/v1.0/groups/g1/team?$select=displayName,id&$top=5"
        );
    }

    #[tokio::test]
    async fn test_send_injects_auth_and_request_id() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/groups/g1/team"))
            .and(query_param("$select", "displayName"))
            .and(header("authorization", "Bearer secret-token"))
            .and(header_exists("client-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"g1"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = HttpRequest::get(format!("{}/groups/g1/team", server.uri()));
        request.query = vec![("$select".to_string(), "displayName".to_string())];

        let res = transport(Some("secret-token")).send(request).await.unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.text(), r#"{"id":"g1"}"#);
    }

    #[tokio::test]
    async fn test_send_binary_body_verbatim() {
        let server = MockServer::start().await;
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00];

        Mock::given(method("PUT"))
            .and(path("/teams/t1/photo/$value"))
            .and(header("content-type", "application/octet-stream"))
            .and(body_bytes(bytes.clone()))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let request = HttpRequest {
            method: HttpMethod::Put,
            url: format!("{}/teams/t1/photo/$value", server.uri()),
            query: Vec::new(),
            body: Some(bytes),
            content_type: Some("application/octet-stream".to_string()),
        };

        let res = transport(None).send(request).await.unwrap();
        assert_eq!(res.status, 204);
        assert!(res.body.is_empty());
    }

    #[tokio::test]
    async fn test_send_returns_error_statuses_unmodified() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/teams/t1"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = HttpRequest::get(format!("{}/teams/t1", server.uri()));
        request.method = HttpMethod::Delete;

        let res = transport(None).send(request).await.unwrap();
        assert_eq!(res.status, 429);
        assert_eq!(res.text(), "slow down");
    }

    #[tokio::test]
    async fn test_send_follows_download_redirect() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drives/d1/items/i1/content"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/download/blob", server.uri())),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download/blob"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let request = HttpRequest::get(format!("{}/drives/d1/items/i1/content", server.uri()));
        let res = transport(Some("secret-token")).send(request).await.unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(res.body, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Port 9 (discard) is not expected to be listening locally
        let request = HttpRequest::get("http://127.0.0.1:9/teams");
        let err = transport(None).send(request).await.unwrap_err();

        assert!(matches!(
            err,
            TransportError::Connect(_) | TransportError::Http(_)
        ));
    }
}
