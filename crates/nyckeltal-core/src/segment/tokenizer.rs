use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Splits text into tokens and reports them as byte spans.
///
/// Implementations must return spans that are contiguous and cover the whole
/// text, so that decoding any run of tokens is a plain slice of the input and
/// encode/decode round-trips losslessly.
pub trait Tokenizer {
    fn token_spans(&self, text: &str) -> Vec<Range<usize>>;

    fn count_tokens(&self, text: &str) -> usize {
        self.token_spans(text).len()
    }

    fn encode<'t>(&self, text: &'t str) -> Tokens<'t> {
        Tokens {
            text,
            spans: self.token_spans(text),
        }
    }
}

/// An encoded text.
#[derive(Debug, Clone)]
pub struct Tokens<'t> {
    text: &'t str,
    spans: Vec<Range<usize>>,
}

impl<'t> Tokens<'t> {
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Byte offset where token `index` starts; `len()` maps to the end of text.
    pub fn byte_offset(&self, index: usize) -> usize {
        self.spans
            .get(index)
            .map(|s| s.start)
            .unwrap_or(self.text.len())
    }

    /// Text of the tokens in `range`.
    pub fn decode(&self, range: Range<usize>) -> &'t str {
        &self.text[self.byte_offset(range.start)..self.byte_offset(range.end)]
    }
}

// Approximates BPE pre-tokenization: words with their leading space, numbers
// in groups of up to three digits, punctuation runs, whitespace runs.
static PIECE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" ?\p{L}+| ?\p{N}{1,3}| ?[^\s\p{L}\p{N}]+|\s+").expect("valid token regex")
});

/// Regex-based tokenizer whose counts track GPT-style BPE closely enough for
/// sizing segments.
#[derive(Debug, Default, Clone, Copy)]
pub struct PieceTokenizer;

impl Tokenizer for PieceTokenizer {
    fn token_spans(&self, text: &str) -> Vec<Range<usize>> {
        let starts: Vec<usize> = PIECE_RE.find_iter(text).map(|m| m.start()).collect();
        contiguous(&starts, text.len())
    }
}

/// Turn token start offsets into spans that tile `0..len`.
fn contiguous(starts: &[usize], len: usize) -> Vec<Range<usize>> {
    let mut spans = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let start = if i == 0 { 0 } else { start };
        let end = starts.get(i + 1).copied().unwrap_or(len);
        spans.push(start..end);
    }
    spans
}
