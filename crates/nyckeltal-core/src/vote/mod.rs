pub mod offset;
pub mod year;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::extraction::Page;
use crate::oracle::retry::RetryPolicy;
use crate::oracle::{Oracle, Pacer, Sleeper};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingConfig {
    /// Pages that must be sampled before an early stop is allowed.
    pub min_samples: usize,
    /// Share of accepted answers the leader needs for an early stop.
    pub agreement_threshold: f64,
    /// Largest accepted page offset magnitude.
    pub offset_limit: i32,
    pub year_floor: i32,
    pub year_ceiling: i32,
    /// Pause between two voting calls.
    pub delay_ms: u64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            min_samples: 5,
            agreement_threshold: 0.8,
            offset_limit: 99,
            year_floor: 1900,
            year_ceiling: 2100,
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VoteState {
    Sampling,
    /// The leader reached the agreement threshold after enough samples.
    Converged,
    /// Every unit was sampled (or sampling was abandoned) without converging.
    Exhausted,
}

/// Candidate tallies for one voting pass.
///
/// Counts are kept in first-seen order so that ties between equally
/// frequent candidates go to the one that appeared first.
#[derive(Debug, Clone)]
pub struct Ballot {
    counts: Vec<(i32, usize)>,
    sampled: usize,
    min_samples: usize,
    threshold: f64,
    state: VoteState,
}

impl Ballot {
    pub fn new(min_samples: usize, threshold: f64) -> Self {
        Self {
            counts: Vec::new(),
            sampled: 0,
            min_samples,
            threshold,
            state: VoteState::Sampling,
        }
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    pub fn sampled(&self) -> usize {
        self.sampled
    }

    /// Register one sampled unit. `None` marks an answer that was unparseable
    /// or out of range: it counts as sampled but casts no vote.
    pub fn record(&mut self, candidate: Option<i32>) -> VoteState {
        if self.state != VoteState::Sampling {
            return self.state;
        }
        self.sampled += 1;
        if let Some(candidate) = candidate {
            match self.counts.iter_mut().find(|(c, _)| *c == candidate) {
                Some((_, n)) => *n += 1,
                None => self.counts.push((candidate, 1)),
            }
            if self.sampled >= self.min_samples && self.agreement() >= self.threshold {
                self.state = VoteState::Converged;
            }
        }
        self.state
    }

    /// Most frequent candidate; the earliest seen wins a tie.
    pub fn leader(&self) -> Option<(i32, usize)> {
        self.counts
            .iter()
            .fold(None, |best: Option<(i32, usize)>, &(c, n)| match best {
                Some((_, top)) if top >= n => best,
                _ => Some((c, n)),
            })
    }

    /// Leader's share of all accepted votes, 0 when nothing was accepted.
    pub fn agreement(&self) -> f64 {
        let total: usize = self.counts.iter().map(|(_, n)| n).sum();
        match self.leader() {
            Some((_, n)) if total > 0 => n as f64 / total as f64,
            _ => 0.0,
        }
    }

    /// Stop sampling and report the result.
    pub fn finish(mut self) -> Estimate {
        if self.state == VoteState::Sampling {
            self.state = VoteState::Exhausted;
        }
        Estimate {
            value: self.leader().map(|(c, _)| c),
            agreement: self.agreement(),
            sampled: self.sampled,
            state: self.state,
        }
    }
}

/// Outcome of one voting pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    /// Leading candidate, `None` if no answer was ever accepted.
    pub value: Option<i32>,
    pub agreement: f64,
    pub sampled: usize,
    pub state: VoteState,
}

/// What a voter asks about each page and which answers it accepts.
pub trait Question {
    fn name(&self) -> &str;
    fn instructions(&self) -> &str;
    fn accepts(&self, candidate: i32) -> bool;

    fn request(&self, page: &Page) -> String {
        format!("[Sida {}]:\n{}", page.number, page.text)
    }
}

/// Runs a question against the pages of one document, one oracle call per
/// page, until the answers agree or the pages run out.
pub struct Voter<'a> {
    oracle: &'a dyn Oracle,
    sleeper: &'a dyn Sleeper,
    retry: &'a RetryPolicy<'a>,
    model: &'a str,
    config: &'a VotingConfig,
}

impl<'a> Voter<'a> {
    pub fn new(
        oracle: &'a dyn Oracle,
        sleeper: &'a dyn Sleeper,
        retry: &'a RetryPolicy<'a>,
        model: &'a str,
        config: &'a VotingConfig,
    ) -> Self {
        Self {
            oracle,
            sleeper,
            retry,
            model,
            config,
        }
    }

    pub fn config(&self) -> &VotingConfig {
        self.config
    }

    pub fn vote(&self, pages: &[Page], question: &dyn Question) -> Estimate {
        let mut ballot = Ballot::new(self.config.min_samples, self.config.agreement_threshold);
        let mut pacer = Pacer::new(self.sleeper, Duration::from_millis(self.config.delay_ms));

        for page in pages {
            pacer.before_call();
            let answer = match self.retry.call(
                self.oracle,
                question.instructions(),
                &question.request(page),
                self.model,
            ) {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!(
                        question = question.name(),
                        page = page.number,
                        error = %e,
                        "oracle failed during voting, abandoning vote"
                    );
                    return Estimate {
                        value: None,
                        agreement: 0.0,
                        sampled: ballot.sampled() + 1,
                        state: VoteState::Exhausted,
                    };
                }
            };

            let candidate = match answer.trim().parse::<i32>() {
                Ok(c) if question.accepts(c) => Some(c),
                Ok(c) => {
                    tracing::debug!(
                        question = question.name(),
                        page = page.number,
                        candidate = c,
                        "discarding out-of-range answer"
                    );
                    None
                }
                Err(_) => {
                    tracing::warn!(
                        question = question.name(),
                        page = page.number,
                        response = %answer,
                        "could not read a number from the response"
                    );
                    None
                }
            };

            if ballot.record(candidate) == VoteState::Converged {
                tracing::info!(
                    question = question.name(),
                    page = page.number,
                    agreement = ballot.agreement(),
                    "vote converged"
                );
                break;
            }
        }
        ballot.finish()
    }
}
