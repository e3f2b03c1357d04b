use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, Stream, TryStreamExt};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::auth::{ClientCredentials, StaticToken, StoredToken, TokenProvider};
use super::catalog::Catalog;
use super::descriptor::EndpointDescriptor;
use super::error::GraphError;
use super::executor::{ApiResponse, Executor};
use super::request::{ODataQuery, RequestBody, RequestParameters};
use super::transport::{ReqwestTransport, Transport};
use super::TOKEN_ENV;
use crate::cache::Cache;
use crate::config::Config;
use crate::types::*;

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Microsoft Graph Teams client
///
/// Every operation goes through the same [`Executor`]; the typed methods
/// below are thin wrappers over catalog descriptors.
#[derive(Clone)]
pub struct TeamsClient {
    executor: Executor,
    catalog: Arc<Catalog>,
}

impl TeamsClient {
    /// Create a client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let tokens = token_provider(config)?;
        let transport = ReqwestTransport::new(Duration::from_secs(config.api.timeout), Some(tokens))
            .context("Failed to build HTTP client")?;

        Ok(Self::with_transport(
            Arc::new(transport),
            &config.api.base_url,
            load_catalog(config)?,
        ))
    }

    /// Create a client over an arbitrary transport
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        base_url: &str,
        catalog: Catalog,
    ) -> Self {
        Self {
            executor: Executor::new(transport, base_url),
            catalog: Arc::new(catalog),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn descriptor(&self, name: &str) -> Result<&EndpointDescriptor, GraphError> {
        self.catalog
            .get(name)
            .ok_or_else(|| GraphError::UnknownOperation(name.to_string()))
    }

    /// Execute any catalog operation by name
    pub async fn call(
        &self,
        name: &str,
        params: &RequestParameters,
        body: Option<RequestBody>,
    ) -> Result<ApiResponse, GraphError> {
        let descriptor = self.descriptor(name)?;
        self.executor.execute(descriptor, params, body).await
    }

    async fn object<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        query: &ODataQuery,
        params: RequestParameters,
        body: Option<RequestBody>,
    ) -> Result<T, GraphError> {
        let descriptor = self.descriptor(name)?;
        let params = query.apply_for(descriptor, params);
        self.executor.execute_as(descriptor, &params, body).await
    }

    async fn page<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        query: &ODataQuery,
        params: RequestParameters,
    ) -> Result<Page<T>, GraphError> {
        let descriptor = self.descriptor(name)?;
        let params = query.apply_for(descriptor, params);
        self.executor.execute_page(descriptor, &params).await
    }

    async fn no_content(
        &self,
        name: &str,
        params: RequestParameters,
        body: Option<RequestBody>,
    ) -> Result<(), GraphError> {
        self.call(name, &params, body).await.map(|_| ())
    }

    /// Get the team of a Microsoft 365 group
    pub async fn get_team_from_group(&self, group_id: &str, query: &ODataQuery) -> Result<Team, GraphError> {
        let params = RequestParameters::new().path("group_id", group_id);
        self.object("groups.team.get", query, params, None).await
    }

    /// Get a team
    pub async fn get_team(&self, team_id: &str, query: &ODataQuery) -> Result<Team, GraphError> {
        let params = RequestParameters::new().path("team_id", team_id);
        self.object("teams.get", query, params, None).await
    }

    /// Archive a team, optionally making its SharePoint site read-only for members
    pub async fn archive_team(
        &self,
        team_id: &str,
        set_site_read_only: Option<bool>,
    ) -> Result<(), GraphError> {
        let params = RequestParameters::new().path("team_id", team_id);
        let body = RequestBody::json(&json!({
            "shouldSetSpoSiteReadOnlyForMembers": set_site_read_only,
        }))?;
        self.no_content("teams.archive", params, Some(body)).await
    }

    /// List channels of a team (first page)
    pub async fn list_channels(&self, team_id: &str, query: &ODataQuery) -> Result<Page<Channel>, GraphError> {
        let params = RequestParameters::new().path("team_id", team_id);
        self.page("teams.channels.list", query, params).await
    }

    /// Get a channel
    pub async fn get_channel(
        &self,
        team_id: &str,
        channel_id: &str,
        query: &ODataQuery,
    ) -> Result<Channel, GraphError> {
        let params = RequestParameters::new()
            .path("team_id", team_id)
            .path("channel_id", channel_id);
        self.object("teams.channels.get", query, params, None).await
    }

    /// Create a channel
    pub async fn create_channel(&self, team_id: &str, channel: &NewChannel) -> Result<Channel, GraphError> {
        let params = RequestParameters::new().path("team_id", team_id);
        let body = RequestBody::json(channel)?;
        self.object("teams.channels.create", &ODataQuery::default(), params, Some(body))
            .await
    }

    /// Delete a channel
    pub async fn delete_channel(&self, team_id: &str, channel_id: &str) -> Result<(), GraphError> {
        let params = RequestParameters::new()
            .path("team_id", team_id)
            .path("channel_id", channel_id);
        self.no_content("teams.channels.delete", params, None).await
    }

    /// List members of a channel (first page)
    pub async fn list_channel_members(
        &self,
        team_id: &str,
        channel_id: &str,
        query: &ODataQuery,
    ) -> Result<Page<ConversationMember>, GraphError> {
        let params = RequestParameters::new()
            .path("team_id", team_id)
            .path("channel_id", channel_id);
        self.page("teams.channels.members.list", query, params).await
    }

    /// Remove a member from a channel
    pub async fn delete_channel_member(
        &self,
        team_id: &str,
        channel_id: &str,
        member_id: &str,
    ) -> Result<(), GraphError> {
        let params = RequestParameters::new()
            .path("team_id", team_id)
            .path("channel_id", channel_id)
            .path("conversationMember_id", member_id);
        self.no_content("teams.channels.members.delete", params, None)
            .await
    }

    /// List messages of a channel (first page)
    pub async fn list_channel_messages(
        &self,
        team_id: &str,
        channel_id: &str,
        query: &ODataQuery,
    ) -> Result<Page<ChatMessage>, GraphError> {
        let params = RequestParameters::new()
            .path("team_id", team_id)
            .path("channel_id", channel_id);
        self.page("teams.channels.messages.list", query, params).await
    }

    /// Send a message to a channel; `content_type` is `text` or `html`
    pub async fn send_channel_message(
        &self,
        team_id: &str,
        channel_id: &str,
        content: &str,
        content_type: Option<&str>,
    ) -> Result<ChatMessage, GraphError> {
        let params = RequestParameters::new()
            .path("team_id", team_id)
            .path("channel_id", channel_id);
        let body = RequestBody::json(&json!({
            "body": { "contentType": content_type.unwrap_or("text"), "content": content }
        }))?;
        self.object("teams.channels.messages.send", &ODataQuery::default(), params, Some(body))
            .await
    }

    /// Download the team photo
    pub async fn get_team_photo(&self, team_id: &str) -> Result<Vec<u8>, GraphError> {
        let descriptor = self.descriptor("teams.photo.content.get")?;
        let params = RequestParameters::new().path("team_id", team_id);
        self.executor.execute_bytes(descriptor, &params).await
    }

    /// Upload the team photo
    pub async fn set_team_photo(&self, team_id: &str, photo: Vec<u8>) -> Result<(), GraphError> {
        let params = RequestParameters::new().path("team_id", team_id);
        self.no_content("teams.photo.content.put", params, Some(RequestBody::binary(photo)))
            .await
    }

    /// Lazily walks a collection, one request per page
    ///
    /// Stops when a page carries no next link or repeats the link it was
    /// fetched from.
    pub fn pages<'a>(
        &'a self,
        name: &'a str,
        params: RequestParameters,
    ) -> impl Stream<Item = Result<Page<Value>, GraphError>> + 'a {
        stream::try_unfold(Cursor::Start, move |cursor| {
            let params = params.clone();
            async move {
                let (page, previous) = match cursor {
                    Cursor::Done => return Ok(None),
                    Cursor::Start => {
                        let descriptor = self.descriptor(name)?;
                        let page = self.executor.execute_page::<Value>(descriptor, &params).await?;
                        (page, None)
                    }
                    Cursor::Next(link) => {
                        let page = self.executor.fetch_next_page(name, &link).await?;
                        (page, Some(link))
                    }
                };
                let next = match &page.next_link {
                    Some(link) if previous.as_ref() == Some(link) => {
                        warn!(operation = name, link = %link, "next link repeats itself, stopping");
                        Cursor::Done
                    }
                    Some(link) => Cursor::Next(link.clone()),
                    None => Cursor::Done,
                };
                Ok::<_, GraphError>(Some((page, next)))
            }
        })
    }

    /// Collects items across pages, stopping once `limit` items are gathered
    pub async fn collect_all(
        &self,
        name: &str,
        params: RequestParameters,
        limit: Option<usize>,
    ) -> Result<Vec<Value>, GraphError> {
        let mut items = Vec::new();
        let pages = self.pages(name, params);
        futures::pin_mut!(pages);

        while let Some(page) = pages.try_next().await? {
            items.extend(page.value);
            if let Some(limit) = limit {
                if items.len() >= limit {
                    items.truncate(limit);
                    break;
                }
            }
        }

        Ok(items)
    }
}

/// The configured catalog, or the built-in one when none is set
///
/// With `api.extend_builtin` the configured catalog is merged over the
/// built-in one instead, and name clashes are rejected. Needs no credentials.
pub fn load_catalog(config: &Config) -> Result<Catalog> {
    let Some(path) = &config.api.catalog else {
        return Catalog::builtin().context("Failed to load built-in catalog");
    };

    let configured =
        Catalog::load(path).with_context(|| format!("Failed to load catalog: {:?}", path))?;
    if !config.api.extend_builtin {
        return Ok(configured);
    }

    let mut catalog = Catalog::builtin().context("Failed to load built-in catalog")?;
    catalog.merge(configured)?;
    Ok(catalog)
}

/// Picks the token source: client credentials, then the env token, then the stored token
fn token_provider(config: &Config) -> Result<Arc<dyn TokenProvider>> {
    if let Some(client_id) = &config.auth.client_id {
        if let Ok(secret) = env::var(&config.auth.client_secret_env) {
            debug!(tenant = %config.auth.tenant, "using client credentials");
            let provider = ClientCredentials::new(&config.auth.tenant, client_id, secret)?;
            return Ok(Arc::new(provider));
        }
    }

    if let Ok(token) = env::var(TOKEN_ENV) {
        if !token.trim().is_empty() {
            debug!("using token from {}", TOKEN_ENV);
            return Ok(Arc::new(StaticToken::new(token.trim())));
        }
    }

    Ok(Arc::new(StoredToken::new(Cache::new()?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config_with_catalog(dir: &tempfile::TempDir, extend_builtin: bool) -> Config {
        let path = dir.path().join("teams.json");
        fs::write(
            &path,
            r#"{ "operations": [
                { "name": "teams.get", "method": "GET", "path": "/teams/{team_id}", "options": "entity" },
                { "name": "teams.primary_channel.get", "method": "GET", "path": "/teams/{team_id}/primaryChannel" }
            ] }"#,
        )
        .unwrap();

        let mut config = Config::default();
        config.api.catalog = Some(path);
        config.api.extend_builtin = extend_builtin;
        config
    }

    #[test]
    fn test_load_catalog_defaults_to_builtin() {
        let catalog = load_catalog(&Config::default()).unwrap();
        assert!(catalog.get("groups.team.get").is_some());
    }

    #[test]
    fn test_configured_catalog_replaces_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = load_catalog(&config_with_catalog(&dir, false)).unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("teams.get").is_some());
        assert!(catalog.get("teams.primary_channel.get").is_some());
        assert!(catalog.get("groups.team.get").is_none());
    }

    #[test]
    fn test_extending_builtin_rejects_name_clash() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_catalog(&config_with_catalog(&dir, true)).unwrap_err();
        assert!(format!("{:#}", err).contains("teams.get"));
    }
}
