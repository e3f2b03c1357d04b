//! Endpoint catalogs loaded from a machine-readable API description.
//!
//! The built-in Teams catalog is embedded at compile time. Additional or
//! replacement catalogs can be loaded from `.json` or `.toml` files with the
//! same shape:
//!
//! ```json
//! { "operations": [
//!     { "name": "teams.get", "method": "GET", "path": "/teams/{team_id}", "options": "entity" }
//! ] }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::descriptor::{
    BodyKind, EndpointDescriptor, HttpMethod, PathTemplate, QueryParamSpec, ResponseKind,
};
use super::error::CatalogError;

const BUILTIN_TEAMS: &str = include_str!("../../descriptors/teams.json");

/// Shorthand for the standard OData options an operation accepts
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum QueryPreset {
    Entity,
    Collection,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    method: HttpMethod,
    path: PathTemplate,
    #[serde(default)]
    options: Option<QueryPreset>,
    #[serde(default)]
    query: Vec<QueryParamSpec>,
    #[serde(default)]
    body: BodyKind,
    #[serde(default)]
    response: ResponseKind,
    #[serde(default)]
    summary: Option<String>,
}

impl From<CatalogEntry> for EndpointDescriptor {
    fn from(entry: CatalogEntry) -> Self {
        let descriptor = EndpointDescriptor {
            name: entry.name,
            method: entry.method,
            path: entry.path,
            query: Vec::new(),
            body: entry.body,
            response: entry.response,
            summary: entry.summary,
        };
        let descriptor = match entry.options {
            Some(QueryPreset::Entity) => descriptor.with_entity_options(),
            Some(QueryPreset::Collection) => descriptor.with_collection_options(),
            None => descriptor,
        };
        entry
            .query
            .into_iter()
            .fold(descriptor, |d, spec| d.with_query(spec))
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    operations: Vec<CatalogEntry>,
}

/// Named set of endpoint descriptors
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    operations: BTreeMap<String, EndpointDescriptor>,
}

impl Catalog {
    /// The Teams catalog shipped with the crate
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_TEAMS)
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_entries(file.operations)
    }

    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_entries(file.operations)
    }

    /// Loads a catalog file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.insert(entry.into())?;
        }
        Ok(catalog)
    }

    /// Adds a descriptor; names must be unique
    pub fn insert(&mut self, descriptor: EndpointDescriptor) -> Result<(), CatalogError> {
        if self.operations.contains_key(&descriptor.name) {
            return Err(CatalogError::DuplicateOperation(descriptor.name));
        }
        self.operations.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Adds every descriptor of `other`, rejecting name clashes
    pub fn merge(&mut self, other: Catalog) -> Result<(), CatalogError> {
        for descriptor in other.operations.into_values() {
            self.insert(descriptor)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.operations.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.operations.values()
    }

    /// Descriptors whose name or path contains `needle` (case-insensitive)
    pub fn search<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a EndpointDescriptor> {
        let needle = needle.to_lowercase();
        self.operations.values().filter(move |d| {
            d.name.to_lowercase().contains(&needle)
                || d.path.as_str().to_lowercase().contains(&needle)
        })
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.len() > 40);

        let get_team = catalog.get("groups.team.get").unwrap();
        assert_eq!(get_team.method, HttpMethod::Get);
        assert_eq!(get_team.path.as_str(), "/groups/{group_id}/team");
        assert!(get_team.query_spec("select").is_some());
        assert!(get_team.query_spec("top").is_none());
    }

    #[test]
    fn test_builtin_binary_endpoints() {
        let catalog = Catalog::builtin().unwrap();

        let put = catalog.get("teams.photo.content.put").unwrap();
        assert_eq!(put.body, BodyKind::binary());
        assert_eq!(put.response, ResponseKind::Empty);

        let get = catalog.get("teams.photo.content.get").unwrap();
        assert_eq!(get.response, ResponseKind::Binary);
    }

    #[test]
    fn test_builtin_collections_accept_paging_options() {
        let catalog = Catalog::builtin().unwrap();
        for descriptor in catalog.iter().filter(|d| d.response == ResponseKind::Collection) {
            assert_eq!(descriptor.method, HttpMethod::Get, "{}", descriptor.name);
            assert!(descriptor.query_spec("top").is_some(), "{}", descriptor.name);
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let json = r#"{ "operations": [
            { "name": "a", "method": "GET", "path": "/a" },
            { "name": "a", "method": "GET", "path": "/b" }
        ] }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateOperation(name) if name == "a"));
    }

    #[test]
    fn test_malformed_template_rejected() {
        let json = r#"{ "operations": [
            { "name": "a", "method": "GET", "path": "/teams/{team_id" }
        ] }"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_catalog() {
        let toml = r#"
            [[operations]]
            name = "chats.list"
            method = "GET"
            path = "/chats"
            options = "collection"
            response = "collection"

            [[operations]]
            name = "chats.messages.send"
            method = "POST"
            path = "/chats/{chat_id}/messages"
            body = { kind = "json" }

            [[operations.query]]
            name = "ids"
            wire = "id"
            list = "repeat"
        "#;
        let catalog = Catalog::from_toml(toml).unwrap();

        assert_eq!(catalog.len(), 2);
        let send = catalog.get("chats.messages.send").unwrap();
        assert_eq!(send.body, BodyKind::Json);
        assert_eq!(send.query.len(), 1);
    }

    #[test]
    fn test_load_from_file_and_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extra.json");
        fs::write(
            &path,
            r#"{ "operations": [ { "name": "chats.get", "method": "GET", "path": "/chats/{chat_id}" } ] }"#,
        )
        .unwrap();

        let mut catalog = Catalog::builtin().unwrap();
        let before = catalog.len();
        catalog.merge(Catalog::load(&path).unwrap()).unwrap();

        assert_eq!(catalog.len(), before + 1);
        assert!(catalog.merge(Catalog::load(&path).unwrap()).is_err());
    }

    #[test]
    fn test_search() {
        let catalog = Catalog::builtin().unwrap();
        let names: Vec<&str> = catalog.search("SHIFTS").map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "teams.schedule.shifts.create",
                "teams.schedule.shifts.delete",
                "teams.schedule.shifts.list"
            ]
        );
    }
}
