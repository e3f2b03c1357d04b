pub mod auth;
pub mod catalog;
pub mod client;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod request;
pub mod transport;

pub use auth::{ClientCredentials, StaticToken, StoredToken, TokenProvider};
pub use catalog::Catalog;
pub use client::{load_catalog, TeamsClient};
pub use descriptor::{
    BodyKind, EndpointDescriptor, HttpMethod, ListStyle, PathTemplate, QueryParamSpec,
    ResponseKind,
};
pub use error::{ApiStatusError, CatalogError, GraphError, ParameterError, TransportError};
pub use executor::{ApiResponse, Executor};
pub use request::{strip_none, ODataQuery, QueryValue, RequestBody, RequestParameters};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

// Graph v1.0 endpoint and app-only scope
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const SCOPE_GRAPH: &str = "https://graph.microsoft.com/.default";

// Env var holding a raw bearer token
pub const TOKEN_ENV: &str = "TEAMS_GRAPH_TOKEN";
