use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use beacon_core::{
    AcceptOutcome, AssistantReply, ContextMode, NewValue, Recommendation, Revision, SessionId,
    Value, ValueId, ValueUpdate,
};

/// Remote collaborator of the resolver. Implemented by the HTTP client and
/// by [`MockBackend`] (tests).
#[async_trait::async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn fetch_values(&self) -> Result<Vec<Value>>;

    async fn create_value(&self, value: &NewValue) -> Result<Value>;

    async fn delete_value(&self, value_id: &str) -> Result<()>;

    async fn update_value(&self, value_id: &str, update: &ValueUpdate) -> Result<Value>;

    /// Every revision of a value, oldest first.
    async fn value_history(&self, value_id: &str) -> Result<Vec<Revision>>;

    /// Dismiss a value's pending insight ("keep both").
    async fn acknowledge_insight(&self, value_id: &str, revision_id: Option<&str>) -> Result<()>;

    /// Semantic match of free text to a value. `None` when nothing fits.
    async fn match_value(&self, query: &str) -> Result<Option<ValueId>>;

    async fn create_session(&self, mode: ContextMode) -> Result<SessionId>;

    async fn send_message(&self, session_id: &str, content: &str) -> Result<AssistantReply>;

    async fn session_recommendations(&self, session_id: &str) -> Result<Vec<Recommendation>>;

    async fn accept_recommendation(&self, recommendation_id: &str) -> Result<AcceptOutcome>;

    async fn reject_recommendation(&self, recommendation_id: &str, reason: &str) -> Result<()>;
}

// ── Mock ──

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchValues,
    Create(NewValue),
    Delete(ValueId),
    Update(ValueId, ValueUpdate),
    History(ValueId),
    Acknowledge(ValueId, Option<String>),
    Match(String),
    CreateSession(ContextMode),
    Send(SessionId, String),
    SessionRecommendations(SessionId),
    Accept(String),
    Reject(String, String),
}

#[derive(Default)]
struct MockState {
    values: Vec<Value>,
    calls: Vec<Call>,
    matches: HashMap<String, ValueId>,
    replies: Vec<AssistantReply>,
    recommendations: Vec<Recommendation>,
    accept_outcomes: HashMap<String, (AcceptOutcome, Option<Value>)>,
    fail: Vec<&'static str>,
    created: usize,
}

/// In-memory backend that applies mutations to its own value list and
/// records every call.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new(values: Vec<Value>) -> Self {
        let backend = Self::default();
        backend.lock().values = values;
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer `query` (exact text) with `value_id` on fuzzy match.
    pub fn set_match(&self, query: &str, value_id: &str) {
        self.lock()
            .matches
            .insert(query.to_string(), value_id.to_string());
    }

    /// Queue a reply for the next `send_message`.
    pub fn push_reply(&self, reply: AssistantReply) {
        self.lock().replies.push(reply);
    }

    pub fn set_recommendations(&self, recommendations: Vec<Recommendation>) {
        self.lock().recommendations = recommendations;
    }

    /// Accepting `recommendation_id` yields `outcome` and adds `created`.
    pub fn set_accept_outcome(
        &self,
        recommendation_id: &str,
        outcome: AcceptOutcome,
        created: Option<Value>,
    ) {
        self.lock()
            .accept_outcomes
            .insert(recommendation_id.to_string(), (outcome, created));
    }

    /// Make every call of `op` fail (`"create"`, `"delete"`, `"update"`,
    /// `"history"`, `"acknowledge"`, `"match"`, `"send"`, `"fetch"`,
    /// `"accept"`, `"reject"`, `"session"`, `"recommendations"`).
    pub fn fail_on(&self, op: &'static str) {
        self.lock().fail.push(op);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn values(&self) -> Vec<Value> {
        self.lock().values.clone()
    }

    fn record(&self, op: &'static str, call: Call) -> Result<std::sync::MutexGuard<'_, MockState>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.fail.contains(&op) {
            return Err(anyhow!("mock {op} failure"));
        }
        Ok(state)
    }
}

#[async_trait::async_trait]
impl AssistantBackend for MockBackend {
    async fn fetch_values(&self) -> Result<Vec<Value>> {
        let state = self.record("fetch", Call::FetchValues)?;
        Ok(state.values.clone())
    }

    async fn create_value(&self, value: &NewValue) -> Result<Value> {
        let mut state = self.record("create", Call::Create(value.clone()))?;
        state.created += 1;
        let id = format!("new-{}", state.created);
        let created = Value {
            id: id.clone(),
            revisions: vec![Revision {
                id: format!("{id}-r1"),
                statement: value.statement.clone(),
                weight_raw: Some(value.weight_raw),
                origin: Some(value.origin.clone()),
                created_at: None,
            }],
            active_revision_id: Some(format!("{id}-r1")),
            insights: Vec::new(),
        };
        state.values.push(created.clone());
        Ok(created)
    }

    async fn delete_value(&self, value_id: &str) -> Result<()> {
        let mut state = self.record("delete", Call::Delete(value_id.to_string()))?;
        let before = state.values.len();
        state.values.retain(|v| v.id != value_id);
        if state.values.len() == before {
            return Err(anyhow!("value not found: {value_id}"));
        }
        Ok(())
    }

    async fn update_value(&self, value_id: &str, update: &ValueUpdate) -> Result<Value> {
        let mut state =
            self.record("update", Call::Update(value_id.to_string(), update.clone()))?;
        let value = state
            .values
            .iter_mut()
            .find(|v| v.id == value_id)
            .ok_or_else(|| anyhow!("value not found: {value_id}"))?;
        let rev_id = format!("{value_id}-r{}", value.revisions.len() + 1);
        value.revisions.push(Revision {
            id: rev_id.clone(),
            statement: update.statement.clone(),
            weight_raw: update.weight_raw,
            origin: update.origin.clone(),
            created_at: None,
        });
        value.active_revision_id = Some(rev_id);
        Ok(value.clone())
    }

    async fn value_history(&self, value_id: &str) -> Result<Vec<Revision>> {
        let state = self.record("history", Call::History(value_id.to_string()))?;
        state
            .values
            .iter()
            .find(|v| v.id == value_id)
            .map(|v| v.revisions.clone())
            .ok_or_else(|| anyhow!("value not found: {value_id}"))
    }

    async fn acknowledge_insight(&self, value_id: &str, revision_id: Option<&str>) -> Result<()> {
        let mut state = self.record(
            "acknowledge",
            Call::Acknowledge(value_id.to_string(), revision_id.map(str::to_string)),
        )?;
        if let Some(value) = state.values.iter_mut().find(|v| v.id == value_id) {
            value.insights.clear();
        }
        Ok(())
    }

    async fn match_value(&self, query: &str) -> Result<Option<ValueId>> {
        let state = self.record("match", Call::Match(query.to_string()))?;
        Ok(state.matches.get(query).cloned())
    }

    async fn create_session(&self, mode: ContextMode) -> Result<SessionId> {
        let _state = self.record("session", Call::CreateSession(mode))?;
        Ok(format!("sess-{}", mode.as_str()))
    }

    async fn send_message(&self, session_id: &str, content: &str) -> Result<AssistantReply> {
        let mut state = self.record(
            "send",
            Call::Send(session_id.to_string(), content.to_string()),
        )?;
        if state.replies.is_empty() {
            return Ok(AssistantReply {
                response: format!("echo: {content}"),
                ..Default::default()
            });
        }
        Ok(state.replies.remove(0))
    }

    async fn session_recommendations(&self, session_id: &str) -> Result<Vec<Recommendation>> {
        let state = self.record(
            "recommendations",
            Call::SessionRecommendations(session_id.to_string()),
        )?;
        Ok(state.recommendations.clone())
    }

    async fn accept_recommendation(&self, recommendation_id: &str) -> Result<AcceptOutcome> {
        let mut state = self.record("accept", Call::Accept(recommendation_id.to_string()))?;
        let (outcome, created) = state
            .accept_outcomes
            .remove(recommendation_id)
            .ok_or_else(|| anyhow!("recommendation not found: {recommendation_id}"))?;
        if let Some(value) = created {
            state.values.push(value);
        }
        state.recommendations.retain(|r| r.id != recommendation_id);
        Ok(outcome)
    }

    async fn reject_recommendation(&self, recommendation_id: &str, reason: &str) -> Result<()> {
        let mut state = self.record(
            "reject",
            Call::Reject(recommendation_id.to_string(), reason.to_string()),
        )?;
        state.recommendations.retain(|r| r.id != recommendation_id);
        Ok(())
    }
}
