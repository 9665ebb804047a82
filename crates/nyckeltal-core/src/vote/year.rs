use super::{Question, Voter};
use crate::extraction::Page;
use crate::prompts;

/// The fiscal year a report covers. Answers outside the plausible range
/// (including the "0" the prompt asks for when unsure) are discarded.
pub struct ReportingYear {
    floor: i32,
    ceiling: i32,
}

impl ReportingYear {
    pub fn new(floor: i32, ceiling: i32) -> Self {
        Self { floor, ceiling }
    }
}

impl Question for ReportingYear {
    fn name(&self) -> &str {
        "reporting_year"
    }

    fn instructions(&self) -> &str {
        prompts::REPORTING_YEAR
    }

    fn accepts(&self, candidate: i32) -> bool {
        (self.floor..=self.ceiling).contains(&candidate)
    }
}

/// Infer the dominant reporting year, or `None` when no page gave a
/// plausible answer.
pub fn infer_year(voter: &Voter<'_>, pages: &[Page]) -> Option<i32> {
    let config = voter.config();
    let question = ReportingYear::new(config.year_floor, config.year_ceiling);
    let estimate = voter.vote(pages, &question);
    match estimate.value {
        Some(year) => tracing::info!(
            year,
            agreement = estimate.agreement,
            sampled = estimate.sampled,
            "reporting year"
        ),
        None => tracing::info!(sampled = estimate.sampled, "no reporting year found"),
    }
    estimate.value
}
