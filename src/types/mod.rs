mod team;

pub use team::*;

use serde::{Deserialize, Serialize};

/// Access token with expiration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub value: String,
    pub expires: u64,
}

/// Token storage persisted in the cache directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenStore {
    #[serde(default)]
    pub tokens: std::collections::HashMap<String, AccessToken>,
}

impl TokenStore {
    pub fn get(&self, scope: &str) -> Option<&AccessToken> {
        self.tokens.get(scope)
    }

    pub fn insert(&mut self, scope: String, token: AccessToken) {
        self.tokens.insert(scope, token);
    }

    pub fn graph_token(&self) -> Option<&AccessToken> {
        self.tokens.get("graph")
    }

    pub fn set_graph_token(&mut self, token: AccessToken) {
        self.insert("graph".to_string(), token);
    }
}

/// OData collection envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(
        rename = "@odata.nextLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_link: Option<String>,
    #[serde(
        rename = "@odata.deltaLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub delta_link: Option<String>,
    #[serde(
        rename = "@odata.count",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub count: Option<u64>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            value: Vec::new(),
            next_link: None,
            delta_link: None,
            count: None,
        }
    }
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next_link.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_page_envelope() {
        let page: Page<Value> = serde_json::from_value(json!({
            "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#teams('t1')/channels",
            "@odata.count": 2,
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/teams/t1/channels?$skiptoken=abc",
            "value": [{ "id": "c1" }, { "id": "c2" }]
        }))
        .unwrap();

        assert_eq!(page.value.len(), 2);
        assert_eq!(page.count, Some(2));
        assert!(page.has_next());
        assert_eq!(page.delta_link, None);
    }

    #[test]
    fn test_page_without_value() {
        let page: Page<Value> = serde_json::from_value(json!({})).unwrap();
        assert!(page.value.is_empty());
        assert!(!page.has_next());
    }
}
