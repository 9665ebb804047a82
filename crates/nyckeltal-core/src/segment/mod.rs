pub mod boundary;
pub mod tokenizer;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::NyckeltalError;
use boundary::{align_boundaries, SafeBreaks};
use tokenizer::Tokenizer;

/// How far each window steps back into its predecessor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlap {
    /// Absolute number of tokens.
    Tokens(usize),
    /// Share of `max_tokens`, strictly between 0 and 1.
    Fraction(f64),
}

impl Overlap {
    /// Overlap in tokens for windows of `max_tokens`.
    pub fn resolve(&self, max_tokens: usize) -> Result<usize, NyckeltalError> {
        if max_tokens == 0 {
            return Err(NyckeltalError::InvalidOverlap(
                "max_tokens must be positive".into(),
            ));
        }
        let tokens = match *self {
            Overlap::Fraction(f) => {
                if !(f > 0.0 && f < 1.0) {
                    return Err(NyckeltalError::InvalidOverlap(format!(
                        "fractional overlap {f} must lie strictly between 0 and 1"
                    )));
                }
                (max_tokens as f64 * f).floor() as usize
            }
            Overlap::Tokens(n) => n,
        };
        if tokens >= max_tokens {
            return Err(NyckeltalError::InvalidOverlap(format!(
                "overlap of {tokens} tokens must be smaller than max_tokens ({max_tokens})"
            )));
        }
        Ok(tokens)
    }
}

impl FromStr for Overlap {
    type Err = NyckeltalError;

    /// `"200"` is a token count, `"0.1"` or `"10%"` a fraction.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unsupported =
            || NyckeltalError::InvalidOverlap(format!("unsupported overlap type '{s}'"));
        if let Some(pct) = s.strip_suffix('%') {
            let pct: f64 = pct.trim().parse().map_err(|_| unsupported())?;
            return Ok(Overlap::Fraction(pct / 100.0));
        }
        if let Ok(n) = s.parse::<usize>() {
            return Ok(Overlap::Tokens(n));
        }
        if s.contains('.') {
            let f: f64 = s.parse().map_err(|_| unsupported())?;
            return Ok(Overlap::Fraction(f));
        }
        Err(unsupported())
    }
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overlap::Tokens(n) => write!(f, "{n}"),
            Overlap::Fraction(x) => write!(f, "{}%", x * 100.0),
        }
    }
}

impl Serialize for Overlap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Overlap::Tokens(n) => serializer.serialize_u64(*n as u64),
            Overlap::Fraction(x) => serializer.serialize_f64(*x),
        }
    }
}

impl<'de> Deserialize<'de> for Overlap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Fraction(f64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => Ok(Overlap::Tokens(n as usize)),
            Raw::Fraction(x) => Ok(Overlap::Fraction(x)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub max_tokens: usize,
    /// `None` selects greedy word packing without overlap.
    pub overlap: Option<Overlap>,
    /// Characters searched on each side of a boundary for a safe break.
    pub boundary_window: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            overlap: Some(Overlap::Fraction(0.1)),
            boundary_window: 200,
        }
    }
}

/// A bounded span of document text handed to the oracle in one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub index: usize,
    pub text: String,
    /// Byte range in the segmented text.
    pub span: Range<usize>,
    /// Where this segment stops repeating its predecessor.
    pub core_start: usize,
    pub token_count: usize,
}

impl Segment {
    /// The part of the span not shared with the previous segment.
    pub fn core(&self) -> Range<usize> {
        self.core_start..self.span.end
    }
}

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid word regex"));

/// Splits document text into segments sized for the oracle.
pub struct Segmenter<'a> {
    config: SegmenterConfig,
    tokenizer: &'a dyn Tokenizer,
    breaks: SafeBreaks,
}

impl<'a> Segmenter<'a> {
    pub fn new(
        config: SegmenterConfig,
        tokenizer: &'a dyn Tokenizer,
        page_marker: &str,
    ) -> Result<Self, NyckeltalError> {
        if config.max_tokens == 0 {
            return Err(NyckeltalError::Config("max_tokens must be positive".into()));
        }
        if let Some(overlap) = &config.overlap {
            overlap.resolve(config.max_tokens)?;
        }
        Ok(Self {
            config,
            tokenizer,
            breaks: SafeBreaks::new(page_marker),
        })
    }

    pub fn segment(&self, text: &str) -> Result<Vec<Segment>, NyckeltalError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let spans = match &self.config.overlap {
            None => self.word_spans(text),
            Some(overlap) => {
                let step_back = overlap.resolve(self.config.max_tokens)?;
                let mut spans = self.window_spans(text, step_back);
                align_boundaries(text, &mut spans, &self.breaks, self.config.boundary_window);
                spans
            }
        };

        let mut segments: Vec<Segment> = Vec::with_capacity(spans.len());
        let mut covered = 0;
        for (index, span) in spans.into_iter().enumerate() {
            let core_start = covered.clamp(span.start, span.end);
            covered = covered.max(span.end);
            let piece = &text[span.clone()];
            segments.push(Segment {
                index,
                text: piece.to_string(),
                token_count: self.tokenizer.count_tokens(piece),
                span,
                core_start,
            });
        }
        tracing::debug!(segments = segments.len(), "segmented text");
        Ok(segments)
    }

    /// Greedy packing of whitespace-delimited words; a segment is closed as
    /// soon as its running token count reaches `max_tokens`.
    fn word_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut current: Option<Range<usize>> = None;
        let mut count = 0;

        for word in WORD_RE.find_iter(text) {
            count += self.tokenizer.count_tokens(&format!("{} ", word.as_str()));
            let span = match current.take() {
                Some(open) => open.start..word.end(),
                None => word.range(),
            };
            if count >= self.config.max_tokens {
                spans.push(span);
                count = 0;
            } else {
                current = Some(span);
            }
        }
        spans.extend(current);
        spans
    }

    /// Token windows of `max_tokens`, each after the first starting
    /// `step_back` tokens before the previous one ended.
    fn window_spans(&self, text: &str, step_back: usize) -> Vec<Range<usize>> {
        let tokens = self.tokenizer.encode(text);
        let total = tokens.len();
        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.config.max_tokens).min(total);
            spans.push(tokens.byte_offset(start)..tokens.byte_offset(end));
            if end == total {
                break;
            }
            start = end - step_back;
        }
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::tokenizer::PieceTokenizer;
    use super::*;

    fn sample_text() -> String {
        let mut text = String::new();
        for page in 1..=6 {
            text.push_str(&format!("[Sida {page}]\n"));
            text.push_str("Medlemsavgifter uppgick till 12 345 tkr. Förvaltningskostnader ");
            text.push_str("ökade under året.\n\nNot 3 Avgifter\nSumma 98 765\n\n");
        }
        text
    }

    fn segmenter(max_tokens: usize, overlap: Option<Overlap>) -> Segmenter<'static> {
        let config = SegmenterConfig {
            max_tokens,
            overlap,
            boundary_window: 200,
        };
        Segmenter::new(config, &PieceTokenizer, "Sida").unwrap()
    }

    #[test]
    fn test_overlap_parse() {
        assert_eq!("200".parse::<Overlap>().unwrap(), Overlap::Tokens(200));
        assert_eq!("0.25".parse::<Overlap>().unwrap(), Overlap::Fraction(0.25));
        assert_eq!("10%".parse::<Overlap>().unwrap(), Overlap::Fraction(0.1));
        assert!(matches!(
            "lots".parse::<Overlap>(),
            Err(NyckeltalError::InvalidOverlap(_))
        ));
    }

    #[test]
    fn test_overlap_must_be_below_max_tokens() {
        assert!(Overlap::Tokens(100).resolve(100).is_err());
        assert!(Overlap::Tokens(150).resolve(100).is_err());
        assert_eq!(Overlap::Tokens(99).resolve(100).unwrap(), 99);
    }

    #[test]
    fn test_fraction_outside_open_interval_rejected() {
        for f in [0.0, 1.0, 1.5, -0.2] {
            assert!(
                Overlap::Fraction(f).resolve(100).is_err(),
                "fraction {f} accepted"
            );
        }
        assert_eq!(Overlap::Fraction(0.25).resolve(100).unwrap(), 25);
    }

    #[test]
    fn test_invalid_overlap_rejected_at_construction() {
        let config = SegmenterConfig {
            max_tokens: 10,
            overlap: Some(Overlap::Tokens(10)),
            boundary_window: 200,
        };
        assert!(matches!(
            Segmenter::new(config, &PieceTokenizer, "Sida"),
            Err(NyckeltalError::InvalidOverlap(_))
        ));
    }

    #[test]
    fn test_overlap_deserializes_from_number_or_string() {
        let cfg: SegmenterConfig =
            serde_json::from_str(r#"{"max_tokens": 500, "overlap": "20%"}"#).unwrap();
        assert_eq!(cfg.overlap, Some(Overlap::Fraction(0.2)));
        let cfg: SegmenterConfig = serde_json::from_str(r#"{"overlap": 50}"#).unwrap();
        assert_eq!(cfg.overlap, Some(Overlap::Tokens(50)));
        let cfg: SegmenterConfig = serde_json::from_str(r#"{"overlap": null}"#).unwrap();
        assert_eq!(cfg.overlap, None);
    }

    #[test]
    fn test_empty_text_has_no_segments() {
        assert!(segmenter(50, None).segment("  \n ").unwrap().is_empty());
    }

    #[test]
    fn test_word_mode_packs_whole_words() {
        let text = sample_text();
        let segments = segmenter(20, None).segment(&text).unwrap();
        assert!(segments.len() > 1);
        let words: Vec<&str> = text.split_whitespace().collect();
        let rejoined: Vec<&str> = segments
            .iter()
            .flat_map(|s| s.text.split_whitespace())
            .collect();
        assert_eq!(words, rejoined);
    }

    #[test]
    fn test_window_mode_cores_reconstruct_text() {
        let text = sample_text();
        for overlap in [Overlap::Tokens(0), Overlap::Tokens(7), Overlap::Fraction(0.3)] {
            let segments = segmenter(40, Some(overlap)).segment(&text).unwrap();
            assert!(segments.len() > 2);
            let rebuilt: String = segments
                .iter()
                .map(|s| &text[s.core()])
                .collect();
            assert_eq!(rebuilt, text, "overlap {overlap}");
        }
    }

    #[test]
    fn test_window_mode_respects_token_budget() {
        let text = sample_text();
        let segments = segmenter(40, Some(Overlap::Tokens(8))).segment(&text).unwrap();
        for s in &segments {
            assert!(s.token_count <= 40, "segment {} has {}", s.index, s.token_count);
        }
        assert_eq!(segments.first().unwrap().span.start, 0);
        assert_eq!(segments.last().unwrap().span.end, text.len());
    }

    #[test]
    fn test_boundaries_land_on_safe_breaks_when_near() {
        let text = sample_text();
        let segments = segmenter(40, Some(Overlap::Tokens(20))).segment(&text).unwrap();
        let breaks = SafeBreaks::new("Sida");
        let all_cuts = breaks.cuts(&text, 0..text.len());
        let moved = segments
            .windows(2)
            .filter(|pair| all_cuts.contains(&pair[0].span.end))
            .count();
        assert!(moved > 0);
    }
}
