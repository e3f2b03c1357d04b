use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::TransportError;
use super::SCOPE_GRAPH;
use crate::cache::{Cache, TOKENS_FILE};
use crate::types::{AccessToken, TokenStore};

/// Seconds of headroom before a token counts as expired
const EXPIRY_SKEW_S: u64 = 60;

fn get_epoch_s() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Supplies the bearer token for each request
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String, TransportError>;
}

/// A fixed token, e.g. from `TEAMS_GRAPH_TOKEN`
pub struct StaticToken {
    value: String,
}

impl StaticToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String, TransportError> {
        Ok(self.value.clone())
    }
}

/// The token saved by `auth set-token`, read from the cache on each use
pub struct StoredToken {
    cache: Cache,
}

impl StoredToken {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl TokenProvider for StoredToken {
    async fn bearer_token(&self) -> Result<String, TransportError> {
        let store: TokenStore = self
            .cache
            .load(TOKENS_FILE)
            .map_err(|e| TransportError::Auth(format!("{:#}", e)))?
            .unwrap_or_default();

        match store.graph_token() {
            Some(token) if token.expires > get_epoch_s() + EXPIRY_SKEW_S => {
                Ok(token.value.clone())
            }
            Some(_) => Err(TransportError::Auth(
                "Stored token has expired. Run 'teams-graph auth set-token' again.".to_string(),
            )),
            None => Err(TransportError::Unauthenticated),
        }
    }
}

/// OAuth2 client-credentials grant against Microsoft identity platform
pub struct ClientCredentials {
    tenant: String,
    client_id: String,
    client_secret: String,
    authority: String,
    http: Client,
    current: Mutex<Option<AccessToken>>,
}

impl ClientCredentials {
    pub fn new(
        tenant: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let http = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            tenant: tenant.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority: "https://login.microsoftonline.com".to_string(),
            http,
            current: Mutex::new(None),
        })
    }

    /// Overrides the identity endpoint, mostly for tests
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }
}

#[async_trait]
impl TokenProvider for ClientCredentials {
    async fn bearer_token(&self) -> Result<String, TransportError> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref() {
            if token.expires > get_epoch_s() + EXPIRY_SKEW_S {
                return Ok(token.value.clone());
            }
        }

        let token = gen_client_credentials_token(
            &self.http,
            &self.authority,
            &self.tenant,
            &self.client_id,
            &self.client_secret,
        )
        .await?;
        let value = token.value.clone();
        *current = Some(token);

        Ok(value)
    }
}

/// Request an app-only Graph token
pub async fn gen_client_credentials_token(
    http: &Client,
    authority: &str,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<AccessToken, TransportError> {
    let url = format!("{}/{}/oauth2/v2.0/token", authority, tenant_id);
    debug!(%url, "requesting client credentials token");

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("content-type"),
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );

    let body = format!(
        "client_id={}&client_secret={}&scope={}&grant_type=client_credentials",
        urlencoding::encode(client_id),
        urlencoding::encode(client_secret),
        urlencoding::encode(SCOPE_GRAPH)
    );

    let res = http.post(&url).headers(headers).body(body).send().await?;

    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await?;
        return Err(TransportError::Auth(format!(
            "Failed to generate token: {} - {}",
            status, body
        )));
    }

    let token_data: HashMap<String, Value> = res
        .json()
        .await
        .map_err(|e| TransportError::Auth(e.to_string()))?;

    let value = token_data
        .get("access_token")
        .and_then(|v| v.as_str())
        .ok_or_else(|| TransportError::Auth("No access_token in response".to_string()))?;

    let expires_in = token_data
        .get("expires_in")
        .and_then(|v| v.as_u64())
        .unwrap_or(3600);

    Ok(AccessToken {
        value: value.to_string(),
        expires: get_epoch_s() + expires_in,
    })
}

/// Reads the `exp` claim of a JWT without verifying it
pub fn jwt_expiry(token: &str) -> Option<u64> {
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("exp").and_then(|v| v.as_u64())
}

/// Wraps a raw bearer token, taking its expiry from the JWT when possible
pub fn access_token_from_raw(token: &str) -> AccessToken {
    AccessToken {
        value: token.to_string(),
        expires: jwt_expiry(token).unwrap_or_else(|| get_epoch_s() + 3600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fake_jwt(claims: &str) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.sig",
            engine.encode(r#"{"alg":"none"}"#),
            engine.encode(claims)
        )
    }

    #[test]
    fn test_jwt_expiry() {
        assert_eq!(jwt_expiry(&fake_jwt(r#"{"exp":1893456000}"#)), Some(1893456000));
        assert_eq!(jwt_expiry(&fake_jwt(r#"{"aud":"graph"}"#)), None);
        assert_eq!(jwt_expiry("not-a-jwt"), None);
    }

    #[test]
    fn test_access_token_from_opaque_token() {
        let token = access_token_from_raw("opaque");
        assert_eq!(token.value, "opaque");
        assert!(token.expires > get_epoch_s());
    }

    #[tokio::test]
    async fn test_stored_token_missing_is_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StoredToken::new(Cache::at(dir.path()).unwrap());

        let err = provider.bearer_token().await.unwrap_err();
        assert!(matches!(err, TransportError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_stored_token_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::at(dir.path()).unwrap();
        let mut store = TokenStore::default();
        store.set_graph_token(AccessToken {
            value: "stored".to_string(),
            expires: get_epoch_s() + 600,
        });
        cache.save(TOKENS_FILE, &store).unwrap();

        let provider = StoredToken::new(cache);
        assert_eq!(provider.bearer_token().await.unwrap(), "stored");
    }

    #[tokio::test]
    async fn test_stored_token_about_to_expire_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::at(dir.path()).unwrap();
        let mut store = TokenStore::default();
        store.set_graph_token(AccessToken {
            value: "stale".to_string(),
            expires: get_epoch_s() + EXPIRY_SKEW_S / 2,
        });
        cache.save(TOKENS_FILE, &store).unwrap();

        let err = StoredToken::new(cache).bearer_token().await.unwrap_err();
        assert!(matches!(err, TransportError::Auth(msg) if msg.contains("expired")));
    }

    #[tokio::test]
    async fn test_client_credentials_token_is_reused() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/contoso/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"access_token":"app-token","expires_in":3600,"token_type":"Bearer"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let provider = ClientCredentials::new("contoso", "app", "s3cret")
            .unwrap()
            .with_authority(server.uri());

        assert_eq!(provider.bearer_token().await.unwrap(), "app-token");
        assert_eq!(provider.bearer_token().await.unwrap(), "app-token");
    }

    #[tokio::test]
    async fn test_client_credentials_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let provider = ClientCredentials::new("contoso", "app", "wrong")
            .unwrap()
            .with_authority(server.uri());

        let err = provider.bearer_token().await.unwrap_err();
        assert!(matches!(err, TransportError::Auth(msg) if msg.contains("invalid_client")));
    }
}
