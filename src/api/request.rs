//! Per-call request inputs and the helpers that render them.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::descriptor::{EndpointDescriptor, ListStyle, PathTemplate, Segment};
use super::error::{GraphError, ParameterError};

/// A query parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    List(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for QueryValue {
    fn from(value: &[&str]) -> Self {
        Self::List(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Path and query parameters supplied for one call
///
/// Absent values are simply never inserted, so there is nothing to filter
/// out later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    path: BTreeMap<String, String>,
    query: BTreeMap<String, QueryValue>,
}

impl RequestParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    pub fn path_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.path(name, value),
            None => self,
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn query_opt(self, name: impl Into<String>, value: Option<impl Into<QueryValue>>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    pub fn insert_path(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.path.insert(name.into(), value.into());
    }

    pub fn insert_query(&mut self, name: impl Into<String>, value: impl Into<QueryValue>) {
        self.query.insert(name.into(), value.into());
    }

    pub fn path_value(&self, name: &str) -> Option<&str> {
        self.path.get(name).map(String::as_str)
    }

    pub fn query_value(&self, name: &str) -> Option<&QueryValue> {
        self.query.get(name)
    }
}

/// The standard OData options, as one record instead of loose arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODataQuery {
    pub select: Option<Vec<String>>,
    pub expand: Option<Vec<String>>,
    pub filter: Option<String>,
    pub orderby: Option<Vec<String>>,
    pub search: Option<String>,
    pub top: Option<u32>,
    pub skip: Option<u32>,
    pub count: Option<bool>,
}

impl ODataQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn expand<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }

    /// Copies the set options into `params` as query parameters
    pub fn apply(&self, params: RequestParameters) -> RequestParameters {
        params
            .query_opt("select", self.select.clone())
            .query_opt("expand", self.expand.clone())
            .query_opt("filter", self.filter.clone())
            .query_opt("orderby", self.orderby.clone())
            .query_opt("search", self.search.clone())
            .query_opt("top", self.top)
            .query_opt("skip", self.skip)
            .query_opt("count", self.count)
    }

    /// Copies only the options the descriptor recognizes
    pub fn apply_for(
        &self,
        descriptor: &EndpointDescriptor,
        params: RequestParameters,
    ) -> RequestParameters {
        let mut all = self.apply(RequestParameters::new());
        all.query.retain(|name, _| descriptor.query_spec(name).is_some());
        all.path = params.path;
        all.query.extend(params.query);
        all
    }
}

/// A request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured payload, sent as `application/json`
    Json(Value),
    /// Opaque media payload, never JSON-encoded
    Binary(Vec<u8>),
}

impl RequestBody {
    /// Serializes `value`, dropping top-level members that are `null`
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, GraphError> {
        let value = serde_json::to_value(value).map_err(GraphError::Serialize)?;
        Ok(Self::Json(strip_none(value)))
    }

    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Binary(bytes.into())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Binary(_) => "binary",
        }
    }
}

/// Removes top-level `null` members of a JSON object
///
/// Nested objects are left as they are; only unset top-level fields are
/// omitted from the payload.
pub fn strip_none(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}

/// Substitutes every placeholder with its percent-encoded value
pub fn render_path(
    operation: &str,
    template: &PathTemplate,
    params: &RequestParameters,
) -> Result<String, ParameterError> {
    let mut rendered = String::with_capacity(template.as_str().len());

    for segment in template.segments() {
        match segment {
            Segment::Literal(text) => rendered.push_str(text),
            Segment::Placeholder(name) => match params.path_value(name) {
                Some(value) if !value.trim().is_empty() => {
                    rendered.push_str(&urlencoding::encode(value));
                }
                _ => {
                    return Err(ParameterError::MissingPath {
                        operation: operation.to_string(),
                        name: name.clone(),
                    })
                }
            },
        }
    }

    Ok(rendered)
}

/// Maps set query values to their wire names, in descriptor order
///
/// Returned pairs are already percent-encoded. Parameters that were not set
/// produce no pair at all.
pub fn render_query(
    descriptor: &EndpointDescriptor,
    params: &RequestParameters,
) -> Result<Vec<(String, String)>, ParameterError> {
    if let Some(unknown) = params
        .query
        .keys()
        .find(|name| descriptor.query_spec(name).is_none())
    {
        return Err(ParameterError::UnknownQuery {
            operation: descriptor.name.clone(),
            name: unknown.clone(),
        });
    }

    let mut pairs = Vec::new();
    for spec in &descriptor.query {
        let Some(value) = params.query.get(&spec.name) else {
            continue;
        };
        match value {
            QueryValue::Single(value) => {
                pairs.push((spec.wire.clone(), urlencoding::encode(value).into_owned()));
            }
            QueryValue::List(values) if values.is_empty() => {}
            QueryValue::List(values) => match spec.list.unwrap_or_default() {
                ListStyle::Comma => {
                    let joined = values
                        .iter()
                        .map(|v| urlencoding::encode(v).into_owned())
                        .collect::<Vec<_>>()
                        .join(",");
                    pairs.push((spec.wire.clone(), joined));
                }
                ListStyle::Repeat => {
                    for value in values {
                        pairs.push((spec.wire.clone(), urlencoding::encode(value).into_owned()));
                    }
                }
            },
        }
    }

    Ok(pairs)
}
