#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Refresh failed after a 401; stored credentials have been cleared.
    #[error("session expired")]
    SessionExpired,
    /// No stored credentials; run `beacon login` first.
    #[error("not logged in")]
    NotLoggedIn,
    /// Body was present but not JSON, or not the expected shape.
    #[error("invalid response from server")]
    InvalidResponse,
    /// Non-2xx status. `detail` is the server's message or "request failed".
    #[error("{detail} (HTTP {status})")]
    Status { status: u16, detail: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
