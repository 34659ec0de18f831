use beacon_core::{find_value, Value, ValueId};

/// What a confirmed action does to its target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Edit,
    Delete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Edit => "edit",
            ActionKind::Delete => "delete",
        }
    }
}

/// A proposed edit/delete awaiting a yes/no reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub value_id: ValueId,
}

/// An open edit: the next utterance becomes the value's new statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditState {
    pub value_id: ValueId,
}

/// Transient dialogue state plus the cached value list.
///
/// At most one pending action and one open edit exist at a time; setting a
/// new pending action replaces the old one.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub pending_action: Option<PendingAction>,
    pub edit_state: Option<EditState>,
    pub last_mentioned_value_id: Option<ValueId>,
    pub values: Vec<Value>,
}

impl SessionState {
    pub fn with_values(values: Vec<Value>) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }

    pub fn value(&self, id: &str) -> Option<&Value> {
        find_value(&self.values, id)
    }

    /// The last-mentioned value, if it is still in the cache.
    pub fn last_mentioned(&self) -> Option<&Value> {
        self.last_mentioned_value_id
            .as_deref()
            .and_then(|id| self.value(id))
    }

    /// Propose `kind` on `value_id`, making it the last-mentioned value.
    pub fn propose(&mut self, kind: ActionKind, value_id: &str) {
        self.pending_action = Some(PendingAction {
            kind,
            value_id: value_id.to_string(),
        });
        self.last_mentioned_value_id = Some(value_id.to_string());
    }

    /// Drop pending action, open edit and back-reference.
    pub fn reset_dialogue(&mut self) {
        self.pending_action = None;
        self.edit_state = None;
        self.last_mentioned_value_id = None;
    }
}
