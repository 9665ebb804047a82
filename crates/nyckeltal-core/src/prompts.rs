//! Built-in oracle instructions.

/// System instructions for structured key-figure extraction.
pub const EXTRACTION: &str = include_str!("../../../prompts/instruktioner.md");

/// Asks for the difference between physical and printed page number.
pub const PAGE_OFFSET: &str = include_str!("../../../prompts/sidforskjutning.md");

/// Asks for the fiscal year a page reports on.
pub const REPORTING_YEAR: &str = include_str!("../../../prompts/rakenskapsar.md");
