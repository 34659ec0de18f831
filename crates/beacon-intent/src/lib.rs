//! Intent resolution for the Beacon values assistant.
//!
//! Maps free-text chat input to edit/delete actions on the user's values,
//! confirms them with a yes/no round trip, and forwards everything else to
//! the remote assistant.

pub mod backend;
pub mod matching;
pub mod patterns;
pub mod replies;
pub mod resolver;
pub mod session;
pub mod text;

pub use backend::{AssistantBackend, Call, MockBackend};
pub use resolver::{Alert, ChatSession, Effect, ResolveError, Rule, Turn, RULES};
pub use session::{ActionKind, EditState, PendingAction, SessionState};
