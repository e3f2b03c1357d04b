//! Endpoint descriptors: the fixed shape of one Graph REST operation.
//!
//! A descriptor is data. It is loaded once from a catalog (or built in code)
//! and never mutated; the [`Executor`](super::Executor) renders it into a
//! concrete request on every call.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::CatalogError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").expect("placeholder pattern is valid")
});

/// HTTP verbs used by Graph operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// GET, PUT and DELETE are idempotent by convention; POST and PATCH are not
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Self::Post | Self::Patch)
    }

    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One piece of a parsed path template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A URL path with named `{placeholders}`, parsed once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, CatalogError> {
        let invalid = |reason: &str| CatalogError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        if !template.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut segments = Vec::new();
        let mut last = 0;
        let mut seen: Vec<&str> = Vec::new();

        for caps in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(template[last..whole.start()].to_string()));
            }
            if seen.contains(&name.as_str()) {
                return Err(invalid(&format!("placeholder `{}` appears twice", name.as_str())));
            }
            seen.push(name.as_str());
            segments.push(Segment::Placeholder(name.as_str().to_string()));
            last = whole.end();
        }
        if last < template.len() {
            segments.push(Segment::Literal(template[last..].to_string()));
        }

        // Anything brace-like left in a literal is a malformed placeholder
        let stray = segments.iter().any(|s| match s {
            Segment::Literal(text) => text.contains('{') || text.contains('}'),
            Segment::Placeholder(_) => false,
        });
        if stray {
            return Err(invalid("unbalanced or malformed placeholder"));
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in template order; these are the required parameters
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl FromStr for PathTemplate {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for PathTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PathTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// How a list value is put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStyle {
    /// `$select=a,b` (the OData convention)
    #[default]
    Comma,
    /// `key=a&key=b`
    Repeat,
}

/// A recognized query parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParamSpec {
    /// Name used by callers, e.g. `select`
    pub name: String,
    /// Name sent on the wire, e.g. `$select`
    pub wire: String,
    /// Set when the parameter takes a list of values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ListStyle>,
}

impl QueryParamSpec {
    pub fn new(name: impl Into<String>, wire: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            wire: wire.into(),
            list: None,
        }
    }

    pub fn list(mut self, style: ListStyle) -> Self {
        self.list = Some(style);
        self
    }

    /// The standard OData system query option named `name` (`select` -> `$select`)
    pub fn odata(name: &str) -> Self {
        let spec = Self::new(name, format!("${}", name));
        match name {
            "select" | "expand" | "orderby" => spec.list(ListStyle::Comma),
            _ => spec,
        }
    }

    pub fn is_list(&self) -> bool {
        self.list.is_some()
    }
}

/// Request body accepted by an operation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BodyKind {
    #[default]
    None,
    Json,
    Binary {
        #[serde(default = "default_binary_content_type")]
        content_type: String,
    },
}

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

fn default_binary_content_type() -> String {
    BINARY_CONTENT_TYPE.to_string()
}

impl BodyKind {
    pub fn binary() -> Self {
        Self::Binary {
            content_type: default_binary_content_type(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Json => "json",
            Self::Binary { .. } => "binary",
        }
    }
}

/// Declared success response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// A single JSON object (an empty body is tolerated as 204-style success)
    #[default]
    Object,
    /// A JSON array wrapped in an OData collection envelope
    Collection,
    /// Raw media bytes
    Binary,
    /// No content expected
    Empty,
}

/// Immutable description of one REST operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub name: String,
    pub method: HttpMethod,
    pub path: PathTemplate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<QueryParamSpec>,
    #[serde(default)]
    pub body: BodyKind,
    #[serde(default)]
    pub response: ResponseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl EndpointDescriptor {
    pub fn new(
        name: impl Into<String>,
        method: HttpMethod,
        path: &str,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            name: name.into(),
            method,
            path: PathTemplate::parse(path)?,
            query: Vec::new(),
            body: BodyKind::None,
            response: ResponseKind::Object,
            summary: None,
        })
    }

    pub fn with_query(mut self, spec: QueryParamSpec) -> Self {
        self.query.push(spec);
        self
    }

    /// Adds the OData options Graph accepts when reading a single entity
    pub fn with_entity_options(self) -> Self {
        ["select", "expand"]
            .into_iter()
            .fold(self, |d, name| d.with_query(QueryParamSpec::odata(name)))
    }

    /// Adds the OData options Graph accepts when listing a collection
    pub fn with_collection_options(self) -> Self {
        [
            "top", "skip", "search", "filter", "count", "orderby", "select", "expand",
        ]
        .into_iter()
        .fold(self, |d, name| d.with_query(QueryParamSpec::odata(name)))
    }

    pub fn with_body(mut self, body: BodyKind) -> Self {
        self.body = body;
        self
    }

    pub fn with_response(mut self, response: ResponseKind) -> Self {
        self.response = response;
        self
    }

    pub fn query_spec(&self, name: &str) -> Option<&QueryParamSpec> {
        self.query.iter().find(|q| q.name == name)
    }

    pub fn required_path_params(&self) -> impl Iterator<Item = &str> {
        self.path.placeholders()
    }
}
