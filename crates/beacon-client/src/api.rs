use anyhow::Result;
use beacon_core::{
    AcceptOutcome, AssistantReply, ContextMode, MatchResult, NewValue, Recommendation, Revision,
    SessionId, SessionInfo, Value, ValueHistory, ValueId, ValueList, ValueUpdate,
};
use beacon_intent::AssistantBackend;
use reqwest::Method;
use serde_json::json;

use crate::client::{decode, ApiClient};

#[async_trait::async_trait]
impl AssistantBackend for ApiClient {
    async fn fetch_values(&self) -> Result<Vec<Value>> {
        let data = self.request(Method::GET, "/values", None).await?;
        let list: ValueList = decode(data)?;
        Ok(list.values)
    }

    async fn create_value(&self, value: &NewValue) -> Result<Value> {
        let body = serde_json::to_value(value)?;
        let data = self.request(Method::POST, "/values", Some(body)).await?;
        Ok(decode(data)?)
    }

    async fn delete_value(&self, value_id: &str) -> Result<()> {
        self.request(Method::DELETE, &format!("/values/{value_id}"), None)
            .await?;
        Ok(())
    }

    async fn update_value(&self, value_id: &str, update: &ValueUpdate) -> Result<Value> {
        let body = serde_json::to_value(update)?;
        let data = self
            .request(Method::PUT, &format!("/values/{value_id}"), Some(body))
            .await?;
        Ok(decode(data)?)
    }

    async fn value_history(&self, value_id: &str) -> Result<Vec<Revision>> {
        let data = self
            .request(Method::GET, &format!("/values/{value_id}/history"), None)
            .await?;
        let history: ValueHistory = decode(data)?;
        Ok(history.into_revisions())
    }

    async fn acknowledge_insight(&self, value_id: &str, revision_id: Option<&str>) -> Result<()> {
        self.request(
            Method::POST,
            &format!("/values/{value_id}/insights/acknowledge"),
            Some(json!({ "revision_id": revision_id })),
        )
        .await?;
        Ok(())
    }

    async fn match_value(&self, query: &str) -> Result<Option<ValueId>> {
        let data = self
            .request(Method::POST, "/values/match", Some(json!({ "query": query })))
            .await?;
        let found: MatchResult = decode(data)?;
        Ok(found.value_id)
    }

    async fn create_session(&self, mode: ContextMode) -> Result<SessionId> {
        let data = self
            .request(
                Method::POST,
                "/assistant/sessions",
                Some(json!({ "context_mode": mode.as_str() })),
            )
            .await?;
        let session: SessionInfo = decode(data)?;
        Ok(session.id)
    }

    async fn send_message(&self, session_id: &str, content: &str) -> Result<AssistantReply> {
        let data = self
            .request(
                Method::POST,
                &format!("/assistant/sessions/{session_id}/message"),
                Some(json!({ "content": content, "input_modality": "text" })),
            )
            .await?;
        Ok(decode(data)?)
    }

    async fn session_recommendations(&self, session_id: &str) -> Result<Vec<Recommendation>> {
        let data = self
            .request(
                Method::GET,
                &format!("/recommendations/session/{session_id}"),
                None,
            )
            .await?;
        Ok(decode(data)?)
    }

    async fn accept_recommendation(&self, recommendation_id: &str) -> Result<AcceptOutcome> {
        let data = self
            .request(
                Method::POST,
                &format!("/recommendations/{recommendation_id}/accept"),
                Some(json!({})),
            )
            .await?;
        Ok(decode(data)?)
    }

    async fn reject_recommendation(&self, recommendation_id: &str, reason: &str) -> Result<()> {
        self.request(
            Method::POST,
            &format!("/recommendations/{recommendation_id}/reject"),
            Some(json!({ "reason": reason })),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use beacon_store::{Credentials, StorePaths};
    use serde_json::Value as JsonValue;

    use super::*;
    use crate::ApiError;

    #[derive(Clone, Default)]
    struct Fake {
        /// Access token the server currently accepts.
        valid: Arc<std::sync::Mutex<String>>,
        refreshes: Arc<AtomicUsize>,
        refresh_ok: bool,
        acknowledged: Arc<std::sync::Mutex<Vec<(String, JsonValue)>>>,
    }

    fn authorized(fake: &Fake, headers: &HeaderMap) -> bool {
        let want = format!("Bearer {}", fake.valid.lock().unwrap());
        headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .is_some_and(|h| h == want)
    }

    async fn list_values(
        State(fake): State<Fake>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<JsonValue>) {
        if !authorized(&fake, &headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "expired"})));
        }
        (
            StatusCode::OK,
            Json(json!({"values": [{
                "id": "v1",
                "active_revision_id": "r1",
                "revisions": [{"id": "r1", "statement": "Family first", "weight_raw": 5.0}]
            }]})),
        )
    }

    async fn remove_value(Path(id): Path<String>) -> (StatusCode, String) {
        if id == "missing" {
            return (
                StatusCode::NOT_FOUND,
                json!({"detail": "Value not found"}).to_string(),
            );
        }
        (StatusCode::NO_CONTENT, String::new())
    }

    async fn match_value(Json(body): Json<JsonValue>) -> Json<JsonValue> {
        if body["query"] == "family" {
            Json(json!({"value_id": "v1"}))
        } else {
            Json(json!({"value_id": null}))
        }
    }

    async fn create_value(Json(body): Json<JsonValue>) -> (StatusCode, Json<JsonValue>) {
        (
            StatusCode::CREATED,
            Json(json!({
                "id": "v7",
                "active_revision_id": "r1",
                "revisions": [{"id": "r1", "statement": body["statement"], "origin": body["origin"]}],
                "insights": [{"message": "Close to another value", "similar_value_id": "v1"}]
            })),
        )
    }

    async fn history(Path(id): Path<String>) -> Json<JsonValue> {
        Json(json!([
            {"id": format!("{id}-r1"), "statement": "First wording", "created_at": "2026-01-01T00:00:00Z"},
            {"id": format!("{id}-r2"), "statement": "Second wording", "created_at": "2026-02-01T00:00:00Z"}
        ]))
    }

    async fn acknowledge(
        State(fake): State<Fake>,
        Path(id): Path<String>,
        Json(body): Json<JsonValue>,
    ) -> StatusCode {
        fake.acknowledged.lock().unwrap().push((id, body));
        StatusCode::NO_CONTENT
    }

    async fn me(State(fake): State<Fake>, headers: HeaderMap) -> (StatusCode, Json<JsonValue>) {
        if !authorized(&fake, &headers) {
            return (StatusCode::UNAUTHORIZED, Json(json!({})));
        }
        (StatusCode::OK, Json(json!({"id": "u1", "email": "dev@example.test"})))
    }

    async fn broken() -> &'static str {
        "<html>oops</html>"
    }

    async fn refresh(State(fake): State<Fake>) -> (StatusCode, Json<JsonValue>) {
        fake.refreshes.fetch_add(1, Ordering::SeqCst);
        if !fake.refresh_ok {
            return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "bad refresh"})));
        }
        *fake.valid.lock().unwrap() = "fresh".into();
        (
            StatusCode::OK,
            Json(json!({"access_token": "fresh", "refresh_token": "ref2"})),
        )
    }

    async fn dev_login() -> Json<JsonValue> {
        Json(json!({
            "access_token": "dev-acc",
            "refresh_token": "dev-ref",
            "user": {"id": "u1"}
        }))
    }

    async fn serve(fake: Fake) -> String {
        let app = Router::new()
            .route("/values", get(list_values).post(create_value))
            .route("/values/{id}", delete(remove_value))
            .route("/values/{id}/history", get(history))
            .route("/values/{id}/insights/acknowledge", post(acknowledge))
            .route("/values/match", post(match_value))
            .route("/me", get(me))
            .route("/broken", get(broken))
            .route("/auth/refresh", post(refresh))
            .route("/auth/dev-login", post(dev_login))
            .with_state(fake);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn stale_creds() -> Credentials {
        Credentials {
            access_token: "stale".into(),
            refresh_token: Some("ref1".into()),
        }
    }

    #[tokio::test]
    async fn refreshes_once_and_retries_on_401() {
        let fake = Fake {
            refresh_ok: true,
            ..Default::default()
        };
        *fake.valid.lock().unwrap() = "current".into();
        let url = serve(fake.clone()).await;

        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::at(tmp.path());
        stale_creds().save(&paths).unwrap();
        let client = ApiClient::new(&url).unwrap().with_store(paths.clone());

        let values = client.fetch_values().await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].active_statement(), Some("Family first"));
        assert_eq!(fake.refreshes.load(Ordering::SeqCst), 1);

        let stored = Credentials::load(&paths).unwrap();
        assert_eq!(stored.access_token, "fresh");
        assert_eq!(stored.refresh_token.as_deref(), Some("ref2"));
    }

    #[tokio::test]
    async fn failed_refresh_clears_credentials() {
        let fake = Fake::default();
        *fake.valid.lock().unwrap() = "current".into();
        let url = serve(fake.clone()).await;

        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::at(tmp.path());
        stale_creds().save(&paths).unwrap();
        let client = ApiClient::new(&url).unwrap().with_store(paths.clone());

        let err = client.fetch_values().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::SessionExpired)
        ));
        assert_eq!(err.to_string(), "session expired");
        assert!(!client.is_logged_in());
        assert!(Credentials::load(&paths).is_none());
    }

    #[tokio::test]
    async fn empty_body_and_detail_errors() {
        let url = serve(Fake::default()).await;
        let client = ApiClient::new(&url).unwrap();

        client.delete_value("v1").await.unwrap();

        let err = client.delete_value("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Value not found (HTTP 404)");

        let err = client
            .request(Method::GET, "/broken", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse));
    }

    #[tokio::test]
    async fn match_returns_optional_id() {
        let url = serve(Fake::default()).await;
        let client = ApiClient::new(&url).unwrap();
        assert_eq!(
            client.match_value("family").await.unwrap().as_deref(),
            Some("v1")
        );
        assert_eq!(client.match_value("weather").await.unwrap(), None);
    }

    #[tokio::test]
    async fn dev_login_persists_tokens() {
        let fake = Fake::default();
        *fake.valid.lock().unwrap() = "dev-acc".into();
        let url = serve(fake).await;
        let tmp = tempfile::tempdir().unwrap();
        let paths = StorePaths::at(tmp.path());
        let client = ApiClient::new(&url).unwrap().with_store(paths.clone());

        assert!(matches!(
            client.current_user().await,
            Err(ApiError::SessionExpired)
        ));

        let tokens = client.dev_login().await.unwrap();
        assert_eq!(tokens.user.unwrap()["id"], "u1");
        assert_eq!(
            Credentials::load(&paths).unwrap().access_token,
            "dev-acc"
        );
        let me = client.current_user().await.unwrap();
        assert_eq!(me["email"], "dev@example.test");

        // no /auth/logout route: the revoke fails but credentials still go
        client.logout().await;
        assert!(Credentials::load(&paths).is_none());
    }

    #[tokio::test]
    async fn value_crud_endpoints() {
        let fake = Fake::default();
        let url = serve(fake.clone()).await;
        let client = ApiClient::new(&url).unwrap();

        let created = client
            .create_value(&NewValue::declared("Rest well"))
            .await
            .unwrap();
        assert_eq!(created.id, "v7");
        assert_eq!(created.active_statement(), Some("Rest well"));
        assert_eq!(created.active_revision().unwrap().origin.as_deref(), Some("declared"));
        assert_eq!(created.insights[0].similar_value_id.as_deref(), Some("v1"));

        let revs = client.value_history("v7").await.unwrap();
        assert_eq!(
            revs.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            ["v7-r1", "v7-r2"]
        );

        client.acknowledge_insight("v7", None).await.unwrap();
        let acked = fake.acknowledged.lock().unwrap().clone();
        assert_eq!(acked, vec![("v7".to_string(), json!({"revision_id": null}))]);
    }
}
