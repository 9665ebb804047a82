use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    pub enabled: bool,
    /// Blank lines allowed between a label and its figures.
    pub max_gap_lines: usize,
    /// Inserted between the label and each joined line.
    pub separator: String,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_gap_lines: 3,
            separator: "  ".into(),
        }
    }
}

// Figures only: digits with grouping, sign, parentheses, percent or a
// currency unit.
static NUMERIC_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s\x{a0}]*[-\x{2212}+(]?\d[\d\s\x{a0}.,\-\x{2212}()%]*(?:t?kr|mkr|sek)?[\s\x{a0}]*$")
        .expect("valid numeric line regex")
});

/// Re-attach figures that the text layer split off from their label.
///
/// A line that starts with one of `labels` and carries no digits of its own
/// is joined with the numeric-only lines that follow it, skipping at most
/// `max_gap_lines` blank lines before each. Anything else (another label, a
/// page marker, prose) ends the run.
pub fn repair_broken_lines(text: &str, labels: &[String], config: &RepairConfig) -> String {
    if !config.enabled || labels.is_empty() {
        return text.to_string();
    }
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut repaired = 0usize;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        i += 1;
        if !is_label_line(line, labels) {
            out.push(line.to_string());
            continue;
        }

        let mut joined = line.trim_end().to_string();
        let mut taken = 0;
        loop {
            let mut j = i;
            let mut gap = 0;
            while j < lines.len() && lines[j].trim().is_empty() && gap < config.max_gap_lines {
                j += 1;
                gap += 1;
            }
            match lines.get(j) {
                Some(next) if NUMERIC_LINE.is_match(next) => {
                    joined.push_str(&config.separator);
                    joined.push_str(next.trim());
                    taken += 1;
                    i = j + 1;
                }
                _ => break,
            }
        }
        if taken > 0 {
            repaired += 1;
        }
        out.push(joined);
    }

    if repaired > 0 {
        tracing::debug!(repaired, "re-attached figures to metric labels");
    }
    out.join("\n")
}

fn is_label_line(line: &str, labels: &[String]) -> bool {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    let lower = trimmed.to_lowercase();
    labels.iter().any(|label| {
        let label = label.to_lowercase();
        !label.is_empty()
            && lower.starts_with(&label)
            && !lower[label.len()..]
                .chars()
                .next()
                .is_some_and(char::is_alphabetic)
    })
}
