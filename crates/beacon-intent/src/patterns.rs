//! Utterance classifiers: yes/no replies, vague references, explicit
//! "the one about ..." commands, and trigger keywords.
//!
//! Every function here takes the *normalised* utterance (trimmed and
//! lowercased) and is pure.

use std::sync::LazyLock;

use regex::Regex;

use crate::session::ActionKind;
use crate::text::phrase_regex;

// ── Yes / no ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Yes,
    No,
    Other,
}

/// Classify a reply to a pending confirmation.
pub fn classify_reply(normalized: &str) -> Reply {
    if normalized == "yes" || normalized == "y" || normalized.starts_with("yes ") {
        Reply::Yes
    } else if normalized == "no" || normalized == "n" || normalized.starts_with("no ") {
        Reply::No
    } else {
        Reply::Other
    }
}

// ── Vague references ("edit that", "remove the last one") ──

static VAGUE_EDIT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)^(let'?s\s+)?(refine|edit|update|change|revise|reword)\s+(it|that|this)(\s+now)?$").unwrap(),
        Regex::new(r"(?i)^(refine|edit|update|change|revise|reword)\s*$").unwrap(),
        Regex::new(r"(?i)^(let'?s\s+)?(refine|edit|update|change)\s+(the\s+)?(last|recent)\s+one$").unwrap(),
    ]
});

static VAGUE_DELETE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)^(let'?s\s+)?(delete|remove|drop|get\s+rid\s+of)\s+(it|that|this)(\s+now)?$").unwrap(),
        Regex::new(r"(?i)^(delete|remove|drop)\s*$").unwrap(),
        Regex::new(r"(?i)^(let'?s\s+)?(delete|remove)\s+(the\s+)?(last|recent)\s+one$").unwrap(),
    ]
});

/// Which action a vague reference asks for. Edit patterns are tried first.
pub fn vague_reference(normalized: &str) -> Option<ActionKind> {
    if VAGUE_EDIT.iter().any(|re| re.is_match(normalized)) {
        Some(ActionKind::Edit)
    } else if VAGUE_DELETE.iter().any(|re| re.is_match(normalized)) {
        Some(ActionKind::Delete)
    } else {
        None
    }
}

// ── Explicit snippet commands ("delete the one about family") ──

const EDIT_SNIPPET_CUES: &[&str] = &["edit the one about", "edit the one with"];
const DELETE_SNIPPET_CUES: &[&str] = &[
    "remove the one about",
    "delete the one about",
    "remove the one with",
    "delete the one with",
];

/// Action named by an explicit "the one about/with" command. Edit first.
pub fn snippet_command(normalized: &str) -> Option<ActionKind> {
    if EDIT_SNIPPET_CUES.iter().any(|c| normalized.contains(c)) {
        Some(ActionKind::Edit)
    } else if DELETE_SNIPPET_CUES.iter().any(|c| normalized.contains(c)) {
        Some(ActionKind::Delete)
    } else {
        None
    }
}

/// Text between the first and second occurrence of `sep`, or "" if `sep`
/// does not occur.
fn segment_after<'a>(text: &'a str, sep: &str) -> &'a str {
    text.split(sep).nth(1).unwrap_or("")
}

/// The snippet a command refers to: what follows "about", or failing that
/// what follows "with". Not cleaned.
pub fn extract_snippet(normalized: &str) -> &str {
    let about = segment_after(normalized, "about");
    if !about.is_empty() {
        return about;
    }
    segment_after(normalized, "with")
}

// ── Trigger keywords ──

pub const DELETE_TRIGGERS: &[&str] = &[
    "delete",
    "remove",
    "drop",
    "get rid of",
    "ditch",
    "eliminate",
    "dont want",
    "don't want",
];

pub const EDIT_TRIGGERS: &[&str] = &[
    "edit",
    "update",
    "change",
    "revise",
    "reword",
    "refine",
    "not crazy about",
    "not happy with",
    "not a fan",
    "dont like",
    "don't like",
];

static DELETE_TRIGGER_RES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| DELETE_TRIGGERS.iter().map(|t| phrase_regex(t)).collect());

static EDIT_TRIGGER_RES: LazyLock<Vec<Regex>> =
    LazyLock::new(|| EDIT_TRIGGERS.iter().map(|t| phrase_regex(t)).collect());

/// Trigger class present in the utterance. Delete wins when both are.
pub fn detect_trigger(normalized: &str) -> Option<ActionKind> {
    if DELETE_TRIGGERS.iter().any(|t| normalized.contains(t)) {
        Some(ActionKind::Delete)
    } else if EDIT_TRIGGERS.iter().any(|t| normalized.contains(t)) {
        Some(ActionKind::Edit)
    } else {
        None
    }
}

/// Case-insensitive matchers for the triggers of one class.
pub fn trigger_regexes(kind: ActionKind) -> &'static [Regex] {
    match kind {
        ActionKind::Delete => &DELETE_TRIGGER_RES,
        ActionKind::Edit => &EDIT_TRIGGER_RES,
    }
}
