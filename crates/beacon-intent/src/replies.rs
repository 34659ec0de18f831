//! Assistant wording. Anything that names a value quotes its statement.

use crate::session::ActionKind;

pub const CANCELLED: &str =
    "Okay, I won't change it. Want to add another value or explore further?";

pub const DISCUSS: &str = "Okay, let's talk it through. What's the heart of this value for you?";

pub const NOT_FOUND: &str =
    "I couldn't find a value matching that. Try a few exact words from the statement?";

pub fn confirm(kind: ActionKind, statement: &str) -> String {
    match kind {
        ActionKind::Edit => {
            format!("You want to edit \"{statement}\". Should I update that one? (yes/no)")
        }
        ActionKind::Delete => {
            format!("You want to remove \"{statement}\". Should I delete it? (yes/no)")
        }
    }
}

pub fn deleted(statement: &str) -> String {
    format!("Deleted \"{statement}\". Want to add another, or refine one?")
}

pub fn ask_new_wording(statement: &str) -> String {
    format!("Send the new wording for \"{statement}\", or say \"discuss\" to talk it through.")
}

pub fn updated(statement: &str) -> String {
    format!("Updated that value to: \"{statement}\". Want to add another, or refine this one?")
}

pub fn saved(statement: &str) -> String {
    format!("Saved \"{statement}\" as a value. Want to add another, or refine this one?")
}

// ── Alerts ──

pub const ALERT_TITLE: &str = "Error";
pub const DELETE_FAILED: &str = "Failed to delete value";
pub const UPDATE_FAILED: &str = "Failed to update value";
pub const SEND_FAILED: &str = "Failed to send message";
pub const ACCEPT_FAILED: &str = "Failed to add value";
pub const REJECT_FAILED: &str = "Failed to reject recommendation";

/// Reason sent with a rejected recommendation.
pub const REJECT_REASON: &str = "Not quite right for me";
