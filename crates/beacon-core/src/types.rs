use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value ID as issued by the backend.
pub type ValueId = String;

/// Revision ID as issued by the backend.
pub type RevisionId = String;

/// Assistant session ID as issued by the backend.
pub type SessionId = String;

/// Placeholder used wherever a value's statement is unavailable.
pub const FALLBACK_STATEMENT: &str = "that value";

/// Recommendation status meaning "awaiting a user decision".
pub const STATUS_PROPOSED: &str = "proposed";

/// An immutable version of a value's statement and weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Revision {
    pub id: RevisionId,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub weight_raw: Option<f64>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Backend-generated observation about a value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueInsight {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub message: String,
    /// Another value this one overlaps with, when the insight is a
    /// similarity warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similar_value_id: Option<ValueId>,
}

/// A user-authored statement of what matters to them, versioned via revisions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Value {
    pub id: ValueId,
    #[serde(default)]
    pub revisions: Vec<Revision>,
    #[serde(default)]
    pub active_revision_id: Option<RevisionId>,
    /// Newest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insights: Vec<ValueInsight>,
}

impl Value {
    /// The revision pointed at by `active_revision_id`, if any.
    pub fn active_revision(&self) -> Option<&Revision> {
        let active = self.active_revision_id.as_deref()?;
        self.revisions.iter().find(|rev| rev.id == active)
    }

    /// Current statement text. `None` when there is no active revision or
    /// its statement is empty; such values take no part in matching.
    pub fn active_statement(&self) -> Option<&str> {
        self.active_revision()
            .map(|rev| rev.statement.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Statement for user-facing messages.
    pub fn display_statement(&self) -> &str {
        self.active_statement().unwrap_or(FALLBACK_STATEMENT)
    }
}

/// Look a value up by id in a cached list.
pub fn find_value<'a>(values: &'a [Value], id: &str) -> Option<&'a Value> {
    values.iter().find(|v| v.id == id)
}

/// Body of a value update: a new statement that keeps weight and origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueUpdate {
    pub statement: String,
    pub weight_raw: Option<f64>,
    pub origin: Option<String>,
}

impl ValueUpdate {
    /// Replace the statement of `rev`, carrying its weight and origin forward.
    pub fn restate(rev: &Revision, statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            weight_raw: rev.weight_raw,
            origin: rev.origin.clone(),
        }
    }
}

/// Origin recorded for values the user types in directly.
pub const ORIGIN_DECLARED: &str = "declared";

/// Body of `POST /values`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewValue {
    pub statement: String,
    pub weight_raw: f64,
    pub origin: String,
}

impl NewValue {
    /// A user-declared value. The weight is a placeholder; the backend
    /// rebalances all weights equally.
    pub fn declared(statement: &str) -> Self {
        Self {
            statement: statement.trim().to_string(),
            weight_raw: 1.0,
            origin: ORIGIN_DECLARED.to_string(),
        }
    }
}

/// `GET /values/{id}/history` response: either a bare revision list or an
/// object wrapping one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValueHistory {
    Revisions(Vec<Revision>),
    Wrapped { revisions: Vec<Revision> },
}

impl ValueHistory {
    pub fn into_revisions(self) -> Vec<Revision> {
        match self {
            ValueHistory::Revisions(revs) | ValueHistory::Wrapped { revisions: revs } => revs,
        }
    }
}

/// `GET /values` envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueList {
    #[serde(default)]
    pub values: Vec<Value>,
}

/// `POST /values/match` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(default)]
    pub value_id: Option<ValueId>,
}

/// `POST /assistant/sessions` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
}

/// Reply from the remote conversational backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub recommendation_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecommendationPayload {
    #[serde(default)]
    pub statement: Option<String>,
}

/// A value proposed by the assistant, awaiting accept/reject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub payload: RecommendationPayload,
}

impl Recommendation {
    pub fn is_proposed(&self) -> bool {
        self.status == STATUS_PROPOSED
    }
}

/// `POST /recommendations/{id}/accept` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcceptOutcome {
    #[serde(default)]
    pub result_entity_id: Option<ValueId>,
}

// ── Context mode ──

/// Which conversation the assistant session is opened for.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    #[default]
    Values,
    Priorities,
}

impl ContextMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextMode::Values => "values",
            ContextMode::Priorities => "priorities",
        }
    }

    /// Greeting that opens a fresh transcript.
    pub fn welcome_message(&self) -> &'static str {
        match self {
            ContextMode::Values => {
                "Hello. I'm here to help you explore what matters to you right now.\n\n\
                 Before we begin, how are things feeling for you today? \
                 Are you on course, a bit off track, or feeling adrift?"
            }
            ContextMode::Priorities => "Hello. I'm here to help you navigate your priorities.",
        }
    }
}

impl fmt::Display for ContextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown context mode: {0} (expected `values` or `priorities`)")]
pub struct UnknownContextMode(pub String);

impl FromStr for ContextMode {
    type Err = UnknownContextMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "values" => Ok(ContextMode::Values),
            "priorities" => Ok(ContextMode::Priorities),
            other => Err(UnknownContextMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_json() -> &'static str {
        r#"{
            "id": "v1",
            "active_revision_id": "r2",
            "revisions": [
                {"id": "r1", "statement": "Old wording", "weight_raw": 3.0, "origin": "user"},
                {"id": "r2", "statement": "Being present with family", "weight_raw": 4.5, "origin": "assistant"}
            ],
            "insights": [{"message": "This one has shifted lately."}],
            "created_at": "2026-01-01T00:00:00Z"
        }"#
    }

    #[test]
    fn active_statement_follows_active_revision() {
        let v: Value = serde_json::from_str(value_json()).unwrap();
        assert_eq!(v.active_statement(), Some("Being present with family"));
        assert_eq!(v.active_revision().unwrap().weight_raw, Some(4.5));
        assert_eq!(v.insights[0].message, "This one has shifted lately.");
    }

    #[test]
    fn missing_active_revision_has_no_statement() {
        let v: Value = serde_json::from_str(
            r#"{"id": "v1", "active_revision_id": "gone", "revisions": [{"id": "r1", "statement": "x"}]}"#,
        )
        .unwrap();
        assert_eq!(v.active_statement(), None);
        assert_eq!(v.display_statement(), FALLBACK_STATEMENT);

        let bare: Value = serde_json::from_str(r#"{"id": "v2"}"#).unwrap();
        assert!(bare.active_revision().is_none());
    }

    #[test]
    fn empty_statement_is_treated_as_absent() {
        let v: Value = serde_json::from_str(
            r#"{"id": "v1", "active_revision_id": "r1", "revisions": [{"id": "r1", "statement": ""}]}"#,
        )
        .unwrap();
        assert_eq!(v.active_statement(), None);
    }

    #[test]
    fn restate_keeps_weight_and_origin() {
        let v: Value = serde_json::from_str(value_json()).unwrap();
        let update = ValueUpdate::restate(v.active_revision().unwrap(), "Showing up for family");
        assert_eq!(update.statement, "Showing up for family");
        assert_eq!(update.weight_raw, Some(4.5));
        assert_eq!(update.origin.as_deref(), Some("assistant"));
    }

    #[test]
    fn declared_value_body() {
        let body = serde_json::to_value(NewValue::declared("  Rest well ")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"statement": "Rest well", "weight_raw": 1.0, "origin": "declared"})
        );
    }

    #[test]
    fn history_accepts_both_shapes() {
        let bare: ValueHistory =
            serde_json::from_str(r#"[{"id": "r1", "statement": "a", "created_at": "2026-01-01T00:00:00Z"}]"#)
                .unwrap();
        let revs = bare.into_revisions();
        assert_eq!(revs[0].created_at.as_deref(), Some("2026-01-01T00:00:00Z"));

        let wrapped: ValueHistory =
            serde_json::from_str(r#"{"revisions": [{"id": "r1"}, {"id": "r2"}]}"#).unwrap();
        assert_eq!(wrapped.into_revisions().len(), 2);
    }

    #[test]
    fn insight_carries_similar_value() {
        let insight: ValueInsight = serde_json::from_str(
            r#"{"message": "Close to another value", "similar_value_id": "v2"}"#,
        )
        .unwrap();
        assert_eq!(insight.similar_value_id.as_deref(), Some("v2"));
    }

    #[test]
    fn context_mode_parse_and_welcome() {
        assert_eq!("values".parse::<ContextMode>().unwrap(), ContextMode::Values);
        assert_eq!(" Priorities ".parse::<ContextMode>().unwrap(), ContextMode::Priorities);
        assert!("goals".parse::<ContextMode>().is_err());
        assert!(ContextMode::Values.welcome_message().contains("what matters to you"));
        assert_eq!(
            serde_json::to_string(&ContextMode::Priorities).unwrap(),
            "\"priorities\""
        );
    }

    #[test]
    fn recommendation_status() {
        let rec: Recommendation = serde_json::from_str(
            r#"{"id": "rec1", "status": "proposed", "payload": {"statement": "Rest well"}}"#,
        )
        .unwrap();
        assert!(rec.is_proposed());
        assert_eq!(rec.payload.statement.as_deref(), Some("Rest well"));
    }
}
