pub mod openai;
pub mod retry;

use std::time::Duration;

use thiserror::Error;

/// Failure modes of a single oracle call.
///
/// The variants separate transient conditions (worth another attempt after a
/// backoff) from terminal ones; see [`OracleError::is_retryable`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    #[error("rate limited by oracle")]
    RateLimited,

    #[error("oracle request timed out after {0}s")]
    Timeout(u64),

    #[error("could not reach oracle at {0}")]
    Connection(String),

    #[error("oracle returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("oracle rejected credentials (status {0})")]
    Unauthorized(u16),

    #[error("oracle response stopped abnormally (finish reason '{finish_reason}')")]
    Truncated { finish_reason: String },

    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("{0}")]
    Other(String),
}

impl OracleError {
    /// Rate limits, timeouts, connection drops, server-side faults and
    /// truncated answers are retried; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            OracleError::RateLimited
            | OracleError::Timeout(_)
            | OracleError::Connection(_)
            | OracleError::Truncated { .. } => true,
            OracleError::Api { status, .. } => *status >= 500,
            OracleError::Unauthorized(_) | OracleError::Malformed(_) | OracleError::Other(_) => {
                false
            }
        }
    }
}

/// The external text-extraction service.
///
/// One call is one system instruction plus one user text, answered with
/// plain text.
pub trait Oracle {
    fn call(&self, system_prompt: &str, user_text: &str, model: &str)
        -> Result<String, OracleError>;
}

/// Blocking delay used between oracle calls and between retry attempts.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Spaces out successive oracle calls with a fixed delay, skipping the delay
/// before the very first call.
pub struct Pacer<'a> {
    sleeper: &'a dyn Sleeper,
    delay: Duration,
    first: bool,
}

impl<'a> Pacer<'a> {
    pub fn new(sleeper: &'a dyn Sleeper, delay: Duration) -> Self {
        Self {
            sleeper,
            delay,
            first: true,
        }
    }

    pub fn before_call(&mut self) {
        if self.first {
            self.first = false;
        } else if !self.delay.is_zero() {
            self.sleeper.sleep(self.delay);
        }
    }
}
