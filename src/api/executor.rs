//! Generic execution of endpoint descriptors.
//!
//! [`Executor::execute`] is the single entry point every Graph operation goes
//! through: it validates the call locally, renders one [`HttpRequest`], hands
//! it to the [`Transport`] and maps the response onto the descriptor's
//! declared shape. It keeps no state between calls and never retries.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, Span};

use super::descriptor::{BodyKind, EndpointDescriptor, ResponseKind, JSON_CONTENT_TYPE};
use super::error::{ApiStatusError, GraphError, ParameterError};
use super::request::{render_path, render_query, RequestBody, RequestParameters};
use super::transport::{HttpRequest, HttpResponse, Transport};
use crate::types::Page;

/// Decoded result of one successful call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(Value),
    Page(Page<Value>),
    Bytes(Vec<u8>),
    Empty,
}

impl ApiResponse {
    /// The response as a JSON value, for printing
    pub fn into_value(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Page(page) => serde_json::to_value(page).unwrap_or(Value::Null),
            Self::Bytes(bytes) => Value::from(bytes.len()),
            Self::Empty => Value::Null,
        }
    }
}

/// Stateless executor shared by every operation
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Renders the request without sending it
    ///
    /// Fails with [`ParameterError`] when a path parameter is missing, a query
    /// parameter is unknown, or the body does not match the descriptor.
    pub fn prepare(
        &self,
        descriptor: &EndpointDescriptor,
        params: &RequestParameters,
        body: Option<RequestBody>,
    ) -> Result<HttpRequest, GraphError> {
        let path = render_path(&descriptor.name, &descriptor.path, params)?;
        let query = render_query(descriptor, params)?;

        // A JSON operation always carries a JSON payload, `{}` when none is given
        let (body, content_type) = match (&descriptor.body, body) {
            (BodyKind::Json, None) => (
                Some(b"{}".to_vec()),
                Some(JSON_CONTENT_TYPE.to_string()),
            ),
            (_, None) => (None, None),
            (BodyKind::None, Some(_)) => {
                return Err(ParameterError::UnexpectedBody {
                    operation: descriptor.name.clone(),
                }
                .into())
            }
            (BodyKind::Json, Some(RequestBody::Json(value))) => {
                let bytes = serde_json::to_vec(&value).map_err(GraphError::Serialize)?;
                (Some(bytes), Some(JSON_CONTENT_TYPE.to_string()))
            }
            (BodyKind::Binary { content_type }, Some(RequestBody::Binary(bytes))) => {
                (Some(bytes), Some(content_type.clone()))
            }
            (expected, Some(actual)) => {
                return Err(ParameterError::BodyKindMismatch {
                    operation: descriptor.name.clone(),
                    expected: expected.label(),
                    actual: actual.label(),
                }
                .into())
            }
        };

        Ok(HttpRequest {
            method: descriptor.method,
            url: format!("{}{}", self.base_url, path),
            query,
            body,
            content_type,
        })
    }

    /// Executes one operation: exactly one request, no retries
    #[instrument(
        name = "graph_request",
        skip(self, descriptor, params, body),
        fields(
            operation = %descriptor.name,
            http.method = %descriptor.method,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
        )
    )]
    pub async fn execute(
        &self,
        descriptor: &EndpointDescriptor,
        params: &RequestParameters,
        body: Option<RequestBody>,
    ) -> Result<ApiResponse, GraphError> {
        let request = self.prepare(descriptor, params, body)?;
        Span::current().record("http.url", request.full_url().as_str());

        let response = self.transport.send(request).await?;
        Span::current().record("http.status_code", response.status);

        decode(&descriptor.name, descriptor.response, response)
    }

    /// Executes and deserializes a single-object response
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        descriptor: &EndpointDescriptor,
        params: &RequestParameters,
        body: Option<RequestBody>,
    ) -> Result<T, GraphError> {
        let value = match self.execute(descriptor, params, body).await? {
            ApiResponse::Json(value) => value,
            ApiResponse::Page(page) => serde_json::to_value(page).map_err(GraphError::Serialize)?,
            ApiResponse::Bytes(_) | ApiResponse::Empty => Value::Null,
        };
        serde_json::from_value(value).map_err(|source| GraphError::Decode {
            operation: descriptor.name.clone(),
            source,
        })
    }

    /// Executes and deserializes a collection envelope
    ///
    /// Only `collection` descriptors qualify; anything else fails before a
    /// request is made.
    pub async fn execute_page<T: DeserializeOwned>(
        &self,
        descriptor: &EndpointDescriptor,
        params: &RequestParameters,
    ) -> Result<Page<T>, GraphError> {
        if descriptor.response != ResponseKind::Collection {
            return Err(GraphError::NotACollection {
                operation: descriptor.name.clone(),
            });
        }
        let response = self.execute(descriptor, params, None).await?;
        page_of(&descriptor.name, response)
    }

    /// Executes a media endpoint and returns its bytes
    pub async fn execute_bytes(
        &self,
        descriptor: &EndpointDescriptor,
        params: &RequestParameters,
    ) -> Result<Vec<u8>, GraphError> {
        match self.execute(descriptor, params, None).await? {
            ApiResponse::Bytes(bytes) => Ok(bytes),
            ApiResponse::Empty => Ok(Vec::new()),
            ApiResponse::Json(value) => serde_json::to_vec(&value).map_err(GraphError::Serialize),
            ApiResponse::Page(page) => serde_json::to_vec(&page).map_err(GraphError::Serialize),
        }
    }

    /// Fetches the page behind an `@odata.nextLink`
    ///
    /// The link is absolute and already carries its query; it must point under
    /// the configured base URL so the bearer token never leaves it.
    pub async fn fetch_next_page(
        &self,
        operation: &str,
        link: &str,
    ) -> Result<Page<Value>, GraphError> {
        let under_base = link
            .strip_prefix(&self.base_url)
            .is_some_and(|rest| rest.starts_with('/'));
        if !under_base {
            return Err(GraphError::InvalidNextLink {
                link: link.to_string(),
                base_url: self.base_url.clone(),
            });
        }

        debug!(operation, link, "following next link");
        let response = self.transport.send(HttpRequest::get(link)).await?;
        let response = decode(operation, ResponseKind::Collection, response)?;
        page_of(operation, response)
    }
}

fn page_of<T: DeserializeOwned>(operation: &str, response: ApiResponse) -> Result<Page<T>, GraphError> {
    let value = match response {
        ApiResponse::Page(page) => serde_json::to_value(page).map_err(GraphError::Serialize)?,
        ApiResponse::Json(value) => value,
        ApiResponse::Bytes(_) | ApiResponse::Empty => return Ok(Page::default()),
    };
    serde_json::from_value(value).map_err(|source| GraphError::Decode {
        operation: operation.to_string(),
        source,
    })
}

/// Maps a raw response onto the declared shape, or onto [`ApiStatusError`]
fn decode(
    operation: &str,
    kind: ResponseKind,
    response: HttpResponse,
) -> Result<ApiResponse, GraphError> {
    if !response.is_success() {
        return Err(ApiStatusError::new(operation, response.status, response.text()).into());
    }

    let decode_err = |source| GraphError::Decode {
        operation: operation.to_string(),
        source,
    };

    match kind {
        ResponseKind::Binary => Ok(ApiResponse::Bytes(response.body)),
        _ if response.body.iter().all(u8::is_ascii_whitespace) => Ok(ApiResponse::Empty),
        ResponseKind::Empty => Ok(ApiResponse::Empty),
        ResponseKind::Object => serde_json::from_slice(&response.body)
            .map(ApiResponse::Json)
            .map_err(decode_err),
        ResponseKind::Collection => serde_json::from_slice(&response.body)
            .map(ApiResponse::Page)
            .map_err(decode_err),
    }
}
