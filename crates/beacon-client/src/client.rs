use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use beacon_store::{Credentials, StorePaths};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as Json};
use tracing::{debug, warn};

use crate::error::ApiError;

const TIMEOUT: Duration = Duration::from_secs(30);

/// Token pair returned by the login and refresh endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<Json>,
}

impl TokenResponse {
    fn credentials(&self) -> Credentials {
        Credentials {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// Client for the remote values API.
///
/// Authenticated requests carry `Authorization: Bearer <access>`. A 401 on
/// such a request triggers one refresh-and-retry; if the refresh fails the
/// stored credentials are cleared.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    credentials: Mutex<Option<Credentials>>,
    /// Where refreshed credentials are persisted. `None` keeps them in memory.
    paths: Option<StorePaths>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            credentials: Mutex::new(None),
            paths: None,
        })
    }

    /// Load credentials from `paths` and persist any refreshed ones there.
    pub fn with_store(mut self, paths: StorePaths) -> Self {
        *self.lock_credentials() = Credentials::load(&paths);
        self.paths = Some(paths);
        self
    }

    pub fn is_logged_in(&self) -> bool {
        self.lock_credentials().is_some()
    }

    pub fn require_login(&self) -> Result<(), ApiError> {
        if self.is_logged_in() {
            Ok(())
        } else {
            Err(ApiError::NotLoggedIn)
        }
    }

    fn lock_credentials(&self) -> MutexGuard<'_, Option<Credentials>> {
        self.credentials.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn access_token(&self) -> Option<String> {
        self.lock_credentials()
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        self.lock_credentials()
            .as_ref()
            .and_then(|c| c.refresh_token.clone())
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn save_credentials(&self, credentials: Credentials) -> Result<(), ApiError> {
        if let Some(paths) = &self.paths {
            credentials.save(paths)?;
        }
        *self.lock_credentials() = Some(credentials);
        Ok(())
    }

    fn clear_credentials(&self) {
        *self.lock_credentials() = None;
        if let Some(paths) = &self.paths {
            if let Err(e) = Credentials::clear(paths) {
                warn!(error = %e, "failed to remove stored credentials");
            }
        }
    }

    // ── Transport ──

    /// One round trip. Empty bodies read as `{}`.
    async fn send_once(
        &self,
        method: &Method,
        endpoint: &str,
        body: Option<&Json>,
        bearer: Option<&str>,
    ) -> Result<(StatusCode, Json), ApiError> {
        let mut req = self.http.request(method.clone(), self.url(endpoint));
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        debug!(%method, endpoint, status = status.as_u16(), "api response");
        Ok((status, parse_body(&text)?))
    }

    /// Request that bypasses auth entirely (login, refresh).
    async fn request_public(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Json>,
    ) -> Result<Json, ApiError> {
        let (status, data) = self.send_once(&method, endpoint, body.as_ref(), None).await?;
        check_status(status, data)
    }

    /// Authenticated request with one refresh-and-retry on 401.
    pub(crate) async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Json>,
    ) -> Result<Json, ApiError> {
        let token = self.access_token();
        let (mut status, mut data) = self
            .send_once(&method, endpoint, body.as_ref(), token.as_deref())
            .await?;

        if status == StatusCode::UNAUTHORIZED {
            if !self.refresh_access_token().await {
                self.clear_credentials();
                return Err(ApiError::SessionExpired);
            }
            let token = self.access_token();
            (status, data) = self
                .send_once(&method, endpoint, body.as_ref(), token.as_deref())
                .await?;
        }

        check_status(status, data)
    }

    async fn refresh_access_token(&self) -> bool {
        let Some(refresh_token) = self.refresh_token() else {
            return false;
        };
        let result = self
            .request_public(
                Method::POST,
                "/auth/refresh",
                Some(json!({ "refresh_token": refresh_token })),
            )
            .await
            .and_then(decode::<TokenResponse>)
            .and_then(|tokens| self.save_credentials(tokens.credentials()));
        match result {
            Ok(()) => {
                debug!("access token refreshed");
                true
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                false
            }
        }
    }

    // ── Auth ──

    /// Development login: no credentials needed, tokens are stored.
    pub async fn dev_login(&self) -> Result<TokenResponse, ApiError> {
        let data = self
            .request_public(Method::POST, "/auth/dev-login", Some(json!({})))
            .await?;
        let tokens: TokenResponse = decode(data)?;
        self.save_credentials(tokens.credentials())?;
        Ok(tokens)
    }

    /// Revoke the refresh token (best effort) and forget credentials.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.refresh_token() {
            if let Err(e) = self
                .request(
                    Method::POST,
                    "/auth/logout",
                    Some(json!({ "refresh_token": refresh_token })),
                )
                .await
            {
                warn!(error = %e, "logout request failed");
            }
        }
        self.clear_credentials();
    }

    /// `GET /me`: the profile behind the stored credentials.
    pub async fn current_user(&self) -> Result<Json, ApiError> {
        self.request(Method::GET, "/me", None).await
    }
}

pub(crate) fn parse_body(text: &str) -> Result<Json, ApiError> {
    if text.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(text).map_err(|e| {
        warn!(error = %e, "unparseable response body");
        ApiError::InvalidResponse
    })
}

pub(crate) fn check_status(status: StatusCode, data: Json) -> Result<Json, ApiError> {
    if status.is_success() {
        return Ok(data);
    }
    let detail = data
        .get("detail")
        .and_then(|d| d.as_str())
        .unwrap_or("request failed")
        .to_string();
    Err(ApiError::Status {
        status: status.as_u16(),
        detail,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(data: Json) -> Result<T, ApiError> {
    serde_json::from_value(data).map_err(|e| {
        warn!(error = %e, "unexpected response shape");
        ApiError::InvalidResponse
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let client = ApiClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.url("/values"), "http://localhost:8000/values");
    }

    #[test]
    fn empty_body_is_empty_object() {
        assert_eq!(parse_body("").unwrap(), json!({}));
        assert_eq!(parse_body("  \n").unwrap(), json!({}));
        assert!(matches!(parse_body("<html>"), Err(ApiError::InvalidResponse)));
    }

    #[test]
    fn error_status_uses_detail() {
        let err = check_status(StatusCode::NOT_FOUND, json!({"detail": "Value not found"}))
            .unwrap_err();
        match err {
            ApiError::Status { status, detail } => {
                assert_eq!(status, 404);
                assert_eq!(detail, "Value not found");
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = check_status(StatusCode::INTERNAL_SERVER_ERROR, json!({})).unwrap_err();
        assert_eq!(err.to_string(), "request failed (HTTP 500)");
    }

    #[test]
    fn decode_reports_shape_mismatch() {
        let r: Result<TokenResponse, _> = decode(json!({"nope": 1}));
        assert!(matches!(r, Err(ApiError::InvalidResponse)));
    }

    #[test]
    fn store_backed_client_loads_credentials() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::at(tmp.path());
        Credentials {
            access_token: "acc".into(),
            refresh_token: None,
        }
        .save(&paths)
        .unwrap();
        let client = ApiClient::new("http://x").unwrap();
        assert!(matches!(client.require_login(), Err(ApiError::NotLoggedIn)));
        let client = client.with_store(paths);
        client.require_login().unwrap();
        assert_eq!(client.access_token().as_deref(), Some("acc"));
    }
}
