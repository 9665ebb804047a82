use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Oracle, OracleError, Sleeper};
use crate::error::NyckeltalError;

/// Exponential backoff settings for oracle calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_delay_ms: u64,
    pub factor: f64,
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1500,
            factor: 2.0,
            max_attempts: 5,
        }
    }
}

/// Bounded exponential backoff around any fallible operation.
///
/// Which errors deserve another attempt is decided by the caller-supplied
/// predicate, so the policy knows nothing about the oracle itself.
pub struct RetryPolicy<'a> {
    config: RetryConfig,
    sleeper: &'a dyn Sleeper,
}

impl<'a> RetryPolicy<'a> {
    pub fn new(config: RetryConfig, sleeper: &'a dyn Sleeper) -> Self {
        Self { config, sleeper }
    }

    /// Delay before the given retry (1 = first retry).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16) as i32;
        let millis = self.config.initial_delay_ms as f64 * self.config.factor.powi(exponent);
        Duration::from_millis(millis.round() as u64)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    pub fn run<T, E, F, R>(&self, mut op: F, retryable: R) -> Result<T, Attempted<E>>
    where
        F: FnMut() -> Result<T, E>,
        R: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if !retryable(&e) => {
                    return Err(Attempted {
                        attempts: attempt,
                        error: e,
                        exhausted: false,
                    })
                }
                Err(e) if attempt >= max_attempts => {
                    tracing::error!(attempts = attempt, error = %e, "giving up after retries");
                    return Err(Attempted {
                        attempts: attempt,
                        error: e,
                        exhausted: true,
                    });
                }
                Err(e) => {
                    let delay = self.delay_for_retry(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off"
                    );
                    self.sleeper.sleep(delay);
                }
            }
        }
    }

    /// One oracle call under this policy.
    pub fn call(
        &self,
        oracle: &dyn Oracle,
        system_prompt: &str,
        user_text: &str,
        model: &str,
    ) -> Result<String, NyckeltalError> {
        self.run(
            || oracle.call(system_prompt, user_text, model),
            OracleError::is_retryable,
        )
        .map_err(NyckeltalError::from)
    }
}

/// The last error of a retried operation and how many attempts were made.
#[derive(Debug)]
pub struct Attempted<E> {
    pub attempts: u32,
    pub error: E,
    /// True when the error was retryable but the attempt budget ran out.
    pub exhausted: bool,
}

impl From<Attempted<OracleError>> for NyckeltalError {
    fn from(a: Attempted<OracleError>) -> Self {
        if a.exhausted {
            NyckeltalError::RetriesExhausted {
                attempts: a.attempts,
                last: a.error,
            }
        } else {
            NyckeltalError::Oracle(a.error)
        }
    }
}
