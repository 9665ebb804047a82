use nyckeltal_core::error::NyckeltalError;
use nyckeltal_core::extraction::labels::label_pages;
use nyckeltal_core::extraction::pdftotext::PdftotextExtractor;
use nyckeltal_core::segment::tokenizer::PieceTokenizer;
use nyckeltal_core::segment::{Overlap, Segmenter, SegmenterConfig};
use std::path::PathBuf;

pub fn run(
    input_file: PathBuf,
    max_tokens: Option<usize>,
    overlap: Option<String>,
    full: bool,
) -> Result<(), NyckeltalError> {
    let is_pdf = input_file
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);

    let page_marker = "Sida";
    let text = if is_pdf {
        let document = nyckeltal_core::read_document(&input_file, &PdftotextExtractor::new())?;
        label_pages(&document.pages, 0, page_marker)
    } else {
        std::fs::read_to_string(&input_file)?
    };

    let mut config = SegmenterConfig::default();
    if let Some(n) = max_tokens {
        config.max_tokens = n;
    }
    if let Some(spec) = overlap {
        config.overlap = match spec.trim() {
            "none" => None,
            other => Some(other.parse::<Overlap>()?),
        };
    }

    let segmenter = Segmenter::new(config, &PieceTokenizer, page_marker)?;
    let segments = segmenter.segment(&text)?;

    println!("{} segment(s)\n", segments.len());
    for segment in &segments {
        println!(
            "=== Segment {} ({} tokens, bytes {}..{}, new from {}) ===",
            segment.index + 1,
            segment.token_count,
            segment.span.start,
            segment.span.end,
            segment.core_start
        );
        if full {
            println!("{}\n", segment.text);
        } else {
            println!("  starts: {}", preview(segment.text.trim_start()));
            println!("  ends:   {}\n", preview_tail(segment.text.trim_end()));
        }
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let line: String = text.chars().take(70).collect();
    line.replace('\n', " / ")
}

fn preview_tail(text: &str) -> String {
    let count = text.chars().count();
    let tail: String = text.chars().skip(count.saturating_sub(70)).collect();
    tail.replace('\n', " / ")
}
