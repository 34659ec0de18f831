//! HTTP client for the Beacon values API.
//!
//! [`ApiClient`] implements [`beacon_intent::AssistantBackend`], so a
//! [`beacon_intent::ChatSession`] can drive it directly.

mod api;
pub mod client;
pub mod error;

pub use client::{ApiClient, TokenResponse};
pub use error::ApiError;
