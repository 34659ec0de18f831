//! The chat session and its ordered intent rules.
//!
//! Each user utterance is appended to the transcript, then offered to the
//! rules in [`RULES`] order until one handles it. Rules read and update the
//! session state and report what they did as a [`Turn`].

use anyhow::Context;
use beacon_core::{
    ContextMode, Message, Recommendation, SessionId, Transcript, Value, ValueUpdate,
};
use tracing::{debug, info, warn};

use crate::backend::AssistantBackend;
use crate::matching::{best_match, find_by_snippet};
use crate::patterns::{self, Reply};
use crate::replies;
use crate::session::{ActionKind, EditState, PendingAction, SessionState};
use crate::text::{clean_snippet, keywords, squash_whitespace, strip_phrases};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("utterance is empty")]
    EmptyUtterance,
}

// ── Rules ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// yes/no reply to a proposed edit or delete
    PendingConfirmation,
    /// replacement wording (or "discuss") for an open edit
    OpenEdit,
    /// "edit that", "remove the last one"
    VagueReference,
    /// "delete the one about ..."
    SnippetReference,
    /// edit/delete keywords anywhere in the text
    TriggerKeywords,
    /// everything else goes to the remote assistant
    Conversation,
}

/// Evaluation order. The first rule that handles an utterance wins.
pub const RULES: &[Rule] = &[
    Rule::PendingConfirmation,
    Rule::OpenEdit,
    Rule::VagueReference,
    Rule::SnippetReference,
    Rule::TriggerKeywords,
    Rule::Conversation,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Handled,
    Continue,
}

// ── Turn output ──

/// A user-visible error, shown out of band from the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

/// Side effect produced while handling one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Proposed(PendingAction),
    EditOpened(String),
    Deleted(String),
    Updated(String),
    Alert(Alert),
    RecommendationsRefreshed(usize),
    RecommendationAccepted(String),
    RecommendationRejected(String),
    InsightAcknowledged(String),
}

/// Everything one input produced, in order.
#[derive(Debug, Clone, Default)]
pub struct Turn {
    /// Rule that handled the utterance (none for recommendation actions).
    pub rule: Option<Rule>,
    /// Assistant messages appended to the transcript.
    pub messages: Vec<Message>,
    pub effects: Vec<Effect>,
}

impl Turn {
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.effects.iter().filter_map(|e| match e {
            Effect::Alert(alert) => Some(alert),
            _ => None,
        })
    }

    /// Content of the last assistant message, if any.
    pub fn reply(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }
}

struct Utterance {
    trimmed: String,
    normalized: String,
}

impl Utterance {
    fn parse(text: &str) -> Result<Self, ResolveError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::EmptyUtterance);
        }
        Ok(Self {
            trimmed: trimmed.to_string(),
            normalized: trimmed.to_lowercase(),
        })
    }
}

// ── Session ──

/// One assistant conversation: remote session id, dialogue state, value
/// cache, transcript, and proposed recommendations.
#[derive(Debug)]
pub struct ChatSession {
    session_id: SessionId,
    context_mode: ContextMode,
    state: SessionState,
    transcript: Transcript,
    recommendations: Vec<Recommendation>,
}

impl ChatSession {
    /// Fresh session with the mode's welcome message and empty state.
    pub fn new(session_id: SessionId, context_mode: ContextMode) -> Self {
        let mut transcript = Transcript::new();
        let mut welcome = Message::assistant(context_mode.welcome_message());
        welcome.id = "welcome".to_string();
        transcript.push(welcome);
        Self {
            session_id,
            context_mode,
            state: SessionState::default(),
            transcript,
            recommendations: Vec::new(),
        }
    }

    /// Seed the value cache.
    pub fn with_values(mut self, values: Vec<Value>) -> Self {
        self.state.values = values;
        self
    }

    /// Open a remote session for `mode` and load the value cache.
    pub async fn start(backend: &dyn AssistantBackend, mode: ContextMode) -> anyhow::Result<Self> {
        let session_id = backend
            .create_session(mode)
            .await
            .context("failed to start conversation")?;
        info!(session_id = %session_id, mode = %mode, "assistant session started");
        let mut session = Self::new(session_id, mode);
        session.refresh_values(backend).await;
        Ok(session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn context_mode(&self) -> ContextMode {
        self.context_mode
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn values(&self) -> &[Value] {
        &self.state.values
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    /// Reload the value cache. On failure the old cache stays.
    pub async fn refresh_values(&mut self, backend: &dyn AssistantBackend) {
        match backend.fetch_values().await {
            Ok(values) => {
                debug!(count = values.len(), "value cache refreshed");
                self.state.values = values;
            }
            Err(e) => warn!(error = %e, "failed to load values"),
        }
    }

    /// Reload proposed recommendations for this session.
    pub async fn load_recommendations(&mut self, backend: &dyn AssistantBackend, turn: &mut Turn) {
        match backend.session_recommendations(&self.session_id).await {
            Ok(recs) => {
                self.recommendations = recs.into_iter().filter(|r| r.is_proposed()).collect();
                turn.effects
                    .push(Effect::RecommendationsRefreshed(self.recommendations.len()));
            }
            Err(e) => warn!(error = %e, "failed to load recommendations"),
        }
    }

    /// Handle one user utterance. Empty input is rejected before anything
    /// is recorded; otherwise the utterance is appended to the transcript
    /// and the rules run.
    pub async fn handle_utterance(
        &mut self,
        backend: &dyn AssistantBackend,
        text: &str,
    ) -> Result<Turn, ResolveError> {
        let utterance = Utterance::parse(text)?;
        self.transcript.push(Message::user(&utterance.trimmed));

        let mut turn = Turn::default();
        for rule in RULES {
            if self.apply(*rule, backend, &utterance, &mut turn).await == Flow::Handled {
                debug!(rule = ?rule, "utterance handled");
                turn.rule = Some(*rule);
                break;
            }
        }
        Ok(turn)
    }

    async fn apply(
        &mut self,
        rule: Rule,
        backend: &dyn AssistantBackend,
        u: &Utterance,
        turn: &mut Turn,
    ) -> Flow {
        match rule {
            Rule::PendingConfirmation => self.pending_confirmation(backend, u, turn).await,
            Rule::OpenEdit => self.open_edit(backend, u, turn).await,
            Rule::VagueReference => self.vague_reference(u, turn),
            Rule::SnippetReference => self.snippet_reference(backend, u, turn).await,
            Rule::TriggerKeywords => self.trigger_keywords(backend, u, turn).await,
            Rule::Conversation => self.conversation(backend, u, turn).await,
        }
    }

    // ── Rule 1 ──

    async fn pending_confirmation(
        &mut self,
        backend: &dyn AssistantBackend,
        u: &Utterance,
        turn: &mut Turn,
    ) -> Flow {
        let Some(pending) = self.state.pending_action.clone() else {
            return Flow::Continue;
        };

        match patterns::classify_reply(&u.normalized) {
            Reply::Other => Flow::Continue,
            Reply::No => {
                self.state.pending_action = None;
                self.emit(turn, replies::CANCELLED);
                Flow::Handled
            }
            Reply::Yes => {
                let Some(value) = self.state.value(&pending.value_id).cloned() else {
                    debug!(value_id = %pending.value_id, "confirmed value no longer cached");
                    self.state.pending_action = None;
                    return Flow::Handled;
                };
                match pending.kind {
                    ActionKind::Delete => {
                        match backend.delete_value(&value.id).await {
                            Ok(()) => {
                                info!(value_id = %value.id, "value deleted");
                                self.refresh_values(backend).await;
                                turn.effects.push(Effect::Deleted(value.id.clone()));
                                self.emit(turn, &replies::deleted(value.display_statement()));
                            }
                            Err(e) => {
                                warn!(value_id = %value.id, error = %e, "failed to delete value");
                                push_alert(turn, replies::DELETE_FAILED);
                            }
                        }
                        self.state.pending_action = None;
                    }
                    ActionKind::Edit => {
                        self.state.edit_state = Some(EditState {
                            value_id: value.id.clone(),
                        });
                        turn.effects.push(Effect::EditOpened(value.id.clone()));
                        self.emit(turn, &replies::ask_new_wording(value.display_statement()));
                        self.state.pending_action = None;
                    }
                }
                Flow::Handled
            }
        }
    }

    // ── Rule 2 ──

    async fn open_edit(
        &mut self,
        backend: &dyn AssistantBackend,
        u: &Utterance,
        turn: &mut Turn,
    ) -> Flow {
        let Some(edit) = self.state.edit_state.clone() else {
            return Flow::Continue;
        };

        if u.normalized.contains("discuss") {
            self.state.edit_state = None;
            self.emit(turn, replies::DISCUSS);
            return Flow::Handled;
        }

        let Some(revision) = self
            .state
            .value(&edit.value_id)
            .and_then(|v| v.active_revision())
            .cloned()
        else {
            debug!(value_id = %edit.value_id, "edited value no longer cached; closing edit");
            self.state.edit_state = None;
            return Flow::Continue;
        };

        let update = ValueUpdate::restate(&revision, &u.trimmed);
        match backend.update_value(&edit.value_id, &update).await {
            Ok(_) => {
                info!(value_id = %edit.value_id, "value restated");
                self.refresh_values(backend).await;
                turn.effects.push(Effect::Updated(edit.value_id.clone()));
                self.emit(turn, &replies::updated(&u.trimmed));
            }
            Err(e) => {
                warn!(value_id = %edit.value_id, error = %e, "failed to update value");
                push_alert(turn, replies::UPDATE_FAILED);
            }
        }
        self.state.edit_state = None;
        Flow::Handled
    }

    // ── Rule 3 ──

    fn vague_reference(&mut self, u: &Utterance, turn: &mut Turn) -> Flow {
        let Some(kind) = patterns::vague_reference(&u.normalized) else {
            return Flow::Continue;
        };
        let Some(target) = self.state.last_mentioned().cloned() else {
            debug!(kind = kind.as_str(), "vague reference with nothing to refer to");
            return Flow::Continue;
        };
        self.propose(turn, kind, &target);
        Flow::Handled
    }

    // ── Rule 4 ──

    async fn snippet_reference(
        &mut self,
        backend: &dyn AssistantBackend,
        u: &Utterance,
        turn: &mut Turn,
    ) -> Flow {
        let Some(kind) = patterns::snippet_command(&u.normalized) else {
            return Flow::Continue;
        };
        let snippet = patterns::extract_snippet(&u.normalized);

        let mut target = find_by_snippet(&self.state.values, snippet).cloned();
        if target.is_none() {
            let cleaned = clean_snippet(snippet);
            let query = if cleaned.is_empty() {
                u.trimmed.as_str()
            } else {
                cleaned.as_str()
            };
            target = self.resolve_remote(backend, query).await;
        }

        self.propose_or_not_found(turn, kind, target);
        Flow::Handled
    }

    // ── Rule 5 ──

    async fn trigger_keywords(
        &mut self,
        backend: &dyn AssistantBackend,
        u: &Utterance,
        turn: &mut Turn,
    ) -> Flow {
        let Some(kind) = patterns::detect_trigger(&u.normalized) else {
            return Flow::Continue;
        };
        let residual = squash_whitespace(&strip_phrases(
            &u.normalized,
            patterns::trigger_regexes(kind),
        ));
        let mut target = best_match(&self.state.values, &residual)
            .or_else(|| best_match(&self.state.values, &u.normalized))
            .cloned();
        if target.is_none() {
            if keywords(&residual).is_empty() {
                debug!(kind = kind.as_str(), "trigger without a subject; treating as conversation");
                return Flow::Continue;
            }
            target = self.resolve_remote(backend, &clean_snippet(&residual)).await;
        }

        self.propose_or_not_found(turn, kind, target);
        Flow::Handled
    }

    // ── Rule 6 ──

    async fn conversation(
        &mut self,
        backend: &dyn AssistantBackend,
        u: &Utterance,
        turn: &mut Turn,
    ) -> Flow {
        match backend.send_message(&self.session_id, &u.trimmed).await {
            Ok(reply) => {
                let message = Message::from_reply(&reply);
                self.transcript.push(message.clone());
                turn.messages.push(message);
                if reply.recommendation_id.is_some() {
                    self.load_recommendations(backend, turn).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to send message");
                push_alert(turn, replies::SEND_FAILED);
            }
        }
        Flow::Handled
    }

    // ── Recommendations ──

    /// Accept a proposed recommendation; the created value becomes the
    /// last-mentioned one so "refine it" works right after.
    pub async fn accept_recommendation(
        &mut self,
        backend: &dyn AssistantBackend,
        recommendation_id: &str,
    ) -> Turn {
        let mut turn = Turn::default();
        let statement = self
            .recommendations
            .iter()
            .find(|r| r.id == recommendation_id)
            .and_then(|r| r.payload.statement.clone());

        let outcome = match backend.accept_recommendation(recommendation_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(recommendation_id, error = %e, "failed to accept recommendation");
                let message = e.to_string();
                let message = if message.is_empty() {
                    replies::ACCEPT_FAILED
                } else {
                    message.as_str()
                };
                push_alert(&mut turn, message);
                return turn;
            }
        };

        if let Some(id) = &outcome.result_entity_id {
            self.state.last_mentioned_value_id = Some(id.clone());
        }
        self.recommendations.retain(|r| r.id != recommendation_id);
        turn.effects
            .push(Effect::RecommendationAccepted(recommendation_id.to_string()));
        self.refresh_values(backend).await;

        let insight = outcome
            .result_entity_id
            .as_deref()
            .and_then(|id| self.state.value(id))
            .and_then(|v| v.insights.first())
            .map(|i| i.message.clone())
            .filter(|m| !m.is_empty());

        if let Some(statement) = statement {
            self.emit(&mut turn, &replies::saved(&statement));
            if let Some(insight) = insight {
                self.emit(&mut turn, &insight);
            }
        }
        turn
    }

    pub async fn reject_recommendation(
        &mut self,
        backend: &dyn AssistantBackend,
        recommendation_id: &str,
    ) -> Turn {
        let mut turn = Turn::default();
        match backend
            .reject_recommendation(recommendation_id, replies::REJECT_REASON)
            .await
        {
            Ok(()) => {
                self.recommendations.retain(|r| r.id != recommendation_id);
                turn.effects
                    .push(Effect::RecommendationRejected(recommendation_id.to_string()));
            }
            Err(e) => {
                warn!(recommendation_id, error = %e, "failed to reject recommendation");
                push_alert(&mut turn, replies::REJECT_FAILED);
            }
        }
        turn
    }

    // ── Insights ──

    /// "Keep both": dismiss the insight on `value_id`. The local insight is
    /// dropped even when the backend call fails.
    pub async fn keep_both(&mut self, backend: &dyn AssistantBackend, value_id: &str) -> Turn {
        let mut turn = Turn::default();
        if let Err(e) = backend.acknowledge_insight(value_id, None).await {
            warn!(value_id, error = %e, "failed to acknowledge insight");
        }
        if let Some(value) = self.state.values.iter_mut().find(|v| v.id == value_id) {
            value.insights.clear();
        }
        turn.effects
            .push(Effect::InsightAcknowledged(value_id.to_string()));
        turn
    }

    // ── Helpers ──

    /// Ask the remote matcher; only ids present in the cache count.
    async fn resolve_remote(&self, backend: &dyn AssistantBackend, query: &str) -> Option<Value> {
        match backend.match_value(query).await {
            Ok(Some(id)) => {
                let found = self.state.value(&id).cloned();
                if found.is_none() {
                    debug!(value_id = %id, "remote match names an unknown value");
                }
                found
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "failed to match value");
                None
            }
        }
    }

    fn propose(&mut self, turn: &mut Turn, kind: ActionKind, target: &Value) {
        debug!(kind = kind.as_str(), value_id = %target.id, "proposing action");
        self.state.propose(kind, &target.id);
        turn.effects.push(Effect::Proposed(PendingAction {
            kind,
            value_id: target.id.clone(),
        }));
        self.emit(turn, &replies::confirm(kind, target.display_statement()));
    }

    fn propose_or_not_found(&mut self, turn: &mut Turn, kind: ActionKind, target: Option<Value>) {
        match target {
            Some(target) => self.propose(turn, kind, &target),
            None => {
                debug!(kind = kind.as_str(), "no value matched");
                self.emit(turn, replies::NOT_FOUND);
            }
        }
    }

    fn emit(&mut self, turn: &mut Turn, content: &str) {
        let message = Message::assistant(content);
        self.transcript.push(message.clone());
        turn.messages.push(message);
    }
}

fn push_alert(turn: &mut Turn, message: &str) {
    turn.effects.push(Effect::Alert(Alert {
        title: replies::ALERT_TITLE.to_string(),
        message: message.to_string(),
    }));
}
