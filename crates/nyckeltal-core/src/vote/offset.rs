use super::{Question, Voter};
use crate::extraction::Page;
use crate::prompts;

/// Difference between physical and printed page numbers.
pub struct PageOffset {
    limit: i32,
}

impl PageOffset {
    pub fn new(limit: i32) -> Self {
        Self { limit }
    }
}

impl Question for PageOffset {
    fn name(&self) -> &str {
        "page_offset"
    }

    fn instructions(&self) -> &str {
        prompts::PAGE_OFFSET
    }

    fn accepts(&self, candidate: i32) -> bool {
        candidate.abs() <= self.limit
    }
}

/// Infer the page-numbering offset of a document, 0 when nothing usable came
/// back from the oracle.
pub fn infer_offset(voter: &Voter<'_>, pages: &[Page]) -> i32 {
    let question = PageOffset::new(voter.config().offset_limit);
    let estimate = voter.vote(pages, &question);
    let offset = estimate.value.unwrap_or(0);
    tracing::info!(
        offset,
        agreement = estimate.agreement,
        sampled = estimate.sampled,
        state = ?estimate.state,
        "page numbering offset"
    );
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::retry::{RetryConfig, RetryPolicy};
    use crate::oracle::testing::{RecordingSleeper, ScriptedOracle};
    use crate::vote::VotingConfig;

    fn infer(answers: &[&str], pages: usize) -> (i32, ScriptedOracle) {
        let oracle = ScriptedOracle::answering(answers);
        let sleeper = RecordingSleeper::default();
        let config = VotingConfig::default();
        let retry = RetryPolicy::new(RetryConfig::default(), &sleeper);
        let voter = Voter::new(&oracle, &sleeper, &retry, "m", &config);
        let pages: Vec<Page> = (1..=pages).map(|i| Page::new(i, "text")).collect();
        let offset = infer_offset(&voter, &pages);
        (offset, oracle)
    }

    #[test]
    fn test_offset_never_exceeds_limit() {
        let (offset, _) = infer(&["120", "-300", "100"], 3);
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_offset_limit_is_inclusive() {
        let (offset, _) = infer(&["99", "99", "99", "99", "99"], 5);
        assert_eq!(offset, 99);
    }

    #[test]
    fn test_offset_uses_page_offset_prompt() {
        let (offset, oracle) = infer(&["2", "2", "2", "2", "2", "2"], 8);
        assert_eq!(offset, 2);
        let calls = oracle.calls.borrow();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0].0, prompts::PAGE_OFFSET);
        assert!(calls[4].1.starts_with("[Sida 5]:\n"));
    }

    #[test]
    fn test_offset_falls_back_to_zero() {
        let (offset, _) = infer(&["vet ej", "?"], 2);
        assert_eq!(offset, 0);
    }
}
