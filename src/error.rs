use std::time::Duration;

use thiserror::Error;

use crate::request::RequestKind;

/// Everything that can go wrong between a user action and a rendered
/// result. All variants are recovered at the action site; none abort
/// the process.
#[derive(Debug, Error)]
pub enum TapeError {
    #[error("Please wait {} seconds before {}", whole_seconds(*remaining), kind.cooldown_label())]
    CooldownActive {
        kind: RequestKind,
        remaining: Duration,
    },
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Transport(String),
    #[error("API error {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("no content received from the API")]
    EmptyCompletion,
    #[error("malformed data in response: {0}")]
    Parse(String),
}

/// Remaining cooldown rounded up, so "1ms left" reads as "1 second".
pub fn whole_seconds(remaining: Duration) -> u64 {
    remaining.as_millis().div_ceil(1000) as u64
}

pub type Result<T> = std::result::Result<T, TapeError>;
