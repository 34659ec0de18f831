pub mod message;
pub mod types;

pub use message::*;
pub use types::*;

/// Current UTC time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    let now = time::OffsetDateTime::now_utc();
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
