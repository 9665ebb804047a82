use regex::Regex;
use std::ops::Range;

/// Places in running text where a segment can end without separating a
/// label from the figures that follow it.
pub struct SafeBreaks {
    patterns: Vec<Regex>,
}

impl SafeBreaks {
    /// Each pattern marks its cut with an empty `cut` group.
    pub fn new(page_marker: &str) -> Self {
        let sources = [
            // paragraph break: cut after the blank line(s)
            r"\n(?:[ \t]*\n)+(?P<cut>)".to_string(),
            // page marker: cut in front of it
            format!(r"(?P<cut>)\[{} ", regex::escape(page_marker)),
            // note heading at line start
            r"\n(?P<cut>)(?:Not|Note)[ \t]+\d+\b".to_string(),
            // sentence end followed by a capital letter
            r#"[.!?]["')\]]?[ \t]+(?P<cut>)\p{Lu}"#.to_string(),
        ];
        let patterns = sources
            .iter()
            .filter_map(|s| Regex::new(s).ok())
            .collect();
        Self { patterns }
    }

    /// Sorted absolute cut offsets inside `text[range]`.
    pub fn cuts(&self, text: &str, range: Range<usize>) -> Vec<usize> {
        let window = &text[range.clone()];
        let mut cuts: Vec<usize> = self
            .patterns
            .iter()
            .flat_map(|re| re.captures_iter(window))
            .filter_map(|caps| caps.name("cut"))
            .map(|m| range.start + m.start())
            .collect();
        cuts.sort_unstable();
        cuts.dedup();
        cuts
    }
}

/// Move each shared boundary between overlapping spans onto a safe break
/// when one lies within `window` characters of the raw cut.
///
/// The earlier span's tail is only trimmed back to a break the later span
/// still covers, and the later span's head only up to a break the earlier
/// span still covers, so no text drops out of every segment.
pub fn align_boundaries(
    text: &str,
    spans: &mut [Range<usize>],
    breaks: &SafeBreaks,
    window: usize,
) {
    for k in 0..spans.len().saturating_sub(1) {
        let earlier = spans[k].clone();
        let later = spans[k + 1].clone();

        let tail_from = back_chars(text, earlier.end, window).max(earlier.start);
        if let Some(cut) = breaks
            .cuts(text, tail_from..earlier.end)
            .into_iter()
            .filter(|&c| c > earlier.start && c >= later.start)
            .last()
        {
            spans[k].end = cut;
        }
        let kept_end = spans[k].end;

        let head_to = forward_chars(text, later.start, window).min(later.end);
        if let Some(cut) = breaks
            .cuts(text, later.start..head_to)
            .into_iter()
            .find(|&c| c > later.start && c < later.end && c <= kept_end)
        {
            spans[k + 1].start = cut;
        }
    }
}

/// Byte offset `n` characters before `pos`.
fn back_chars(text: &str, pos: usize, n: usize) -> usize {
    text[..pos]
        .char_indices()
        .rev()
        .nth(n.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Byte offset `n` characters after `pos`.
fn forward_chars(text: &str, pos: usize, n: usize) -> usize {
    text[pos..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| pos + i)
        .unwrap_or(text.len())
}
