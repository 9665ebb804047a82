//! Integration tests for the analyze_pdfs() end-to-end pipeline.
//!
//! Uses a MockExtractor keyed on file contents instead of pdftotext, a
//! scripted oracle instead of the HTTP client, and a sleeper that records
//! delays, so these tests run offline and without waiting.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nyckeltal_core::analysis::{Analyzer, DocumentOutcome};
use nyckeltal_core::config::AnalysisConfig;
use nyckeltal_core::error::NyckeltalError;
use nyckeltal_core::extraction::{Page, PdfExtractor};
use nyckeltal_core::metrics::builtin::builtin_metrics;
use nyckeltal_core::oracle::{Oracle, OracleError, Sleeper};
use nyckeltal_core::segment::tokenizer::PieceTokenizer;
use nyckeltal_core::{analyze_pdfs, discover_inputs};
use serde_json::json;

struct MockExtractor;

impl PdfExtractor for MockExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<Page>, NyckeltalError> {
        match pdf_bytes {
            b"fund-x" => Ok(vec![
                Page::new(1, "Fund X\nÅrsberättelse 2022"),
                Page::new(2, "Fondförmögenhet\n\n1 234\n\n[2]"),
            ]),
            b"fond-y" => Ok(vec![
                Page::new(1, "Fond Y\nÅrsberättelse 2023"),
                Page::new(2, "Förvaltningsavgift 0,65 %"),
            ]),
            b"scan" => Ok(vec![Page::new(1, "   "), Page::new(2, "\n")]),
            _ => Err(NyckeltalError::Extraction("not a PDF".into())),
        }
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

struct ScriptedOracle {
    replies: RefCell<VecDeque<Result<String, OracleError>>>,
    requests: RefCell<Vec<String>>,
}

impl ScriptedOracle {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: RefCell::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    fn remaining(&self) -> usize {
        self.replies.borrow().len()
    }
}

impl Oracle for ScriptedOracle {
    fn call(&self, _system: &str, user_text: &str, _model: &str) -> Result<String, OracleError> {
        self.requests.borrow_mut().push(user_text.to_string());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Other("script exhausted".into())))
    }
}

#[derive(Default)]
struct RecordingSleeper {
    slept: RefCell<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.borrow_mut().push(duration);
    }
}

fn config() -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.voting.min_samples = 2;
    config
}

fn write_inputs(files: &[(&str, &[u8])]) -> (tempfile::TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    for (name, bytes) in files {
        std::fs::write(dir.path().join(name), bytes).unwrap();
    }
    let paths = discover_inputs(&[dir.path().to_path_buf()]).unwrap();
    (dir, paths)
}

// ---------------------------------------------------------------------------
// Test 1: Two reports, entity aliases folded, results merged across files
// ---------------------------------------------------------------------------
#[test]
fn two_reports_merge_into_one_dataset() {
    let (_dir, paths) = write_inputs(&[("a_fund_x.pdf", b"fund-x"), ("b_fond_y.pdf", b"fond-y")]);

    let oracle = ScriptedOracle::new(&[
        // a_fund_x.pdf: year, year, offset, offset, one segment
        "2022",
        "2022",
        "0",
        "0",
        r#"```json
{
  "Fund X": {"2022": {"Fondförmögenhet": {"värde": 1234, "källa": "Sida 2"}}},
  "Fund X Extended": {"2022": {"Fondförmögenhet": {"värde": "1 234", "källa": "Sida 1"}}}
}
```"#,
        // b_fond_y.pdf
        "2023",
        "2023",
        "0",
        "0",
        r#"{"Fond Y": {"2023": {"Förvaltningsavgift": {"värde": 0.65, "källa": "Sida 2", "säkerhet": "hög"}}}}"#,
    ]);
    let sleeper = RecordingSleeper::default();
    let analyzer = Analyzer::new(
        &oracle,
        &PieceTokenizer,
        &sleeper,
        config(),
        builtin_metrics().unwrap(),
    )
    .unwrap();

    let outcome = analyze_pdfs(&paths, &MockExtractor, &analyzer).unwrap();
    assert_eq!(oracle.remaining(), 0);

    let dataset = outcome.dataset.as_ref().expect("dataset");
    assert_eq!(
        serde_json::to_value(dataset).unwrap(),
        json!({
            "Fond Y": {"2023": {"Förvaltningsavgift": {"value": 0.65, "source": "Sida 2", "certainty": "hög"}}},
            "Fund X Extended": {"2022": {"Fondförmögenhet": {"value": 1234, "source": "Sida 1, 2"}}}
        })
    );

    let reports: Vec<_> = outcome.analyzed().collect();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].name, "a_fund_x.pdf");
    assert_eq!(reports[0].conflicts, 1);
    assert_eq!(reports[0].merged, 1);
    assert_eq!(reports[1].year, Some(2023));

    // Voting pauses 1s between its own calls; extraction pauses 5s between
    // segments, but not before the first one of the run.
    let one = Duration::from_secs(1);
    assert_eq!(
        *sleeper.slept.borrow(),
        vec![one, one, one, one, Duration::from_secs(5)]
    );
}

// ---------------------------------------------------------------------------
// Test 2: Broken label/figure layout is repaired before segmentation
// ---------------------------------------------------------------------------
#[test]
fn split_figures_are_rejoined_before_extraction() {
    let (_dir, paths) = write_inputs(&[("fund_x.pdf", b"fund-x")]);
    let oracle = ScriptedOracle::new(&["0", "0", "1", "1", "{}"]);
    let sleeper = RecordingSleeper::default();
    let analyzer = Analyzer::new(
        &oracle,
        &PieceTokenizer,
        &sleeper,
        config(),
        builtin_metrics().unwrap(),
    )
    .unwrap();

    let outcome = analyze_pdfs(&paths, &MockExtractor, &analyzer).unwrap();

    let requests = oracle.requests.borrow();
    let extraction = requests.last().unwrap();
    // Offset 1: physical page 1 is preface (i), page 2 is printed page 1.
    assert!(extraction.contains("[Sida i]\nFund X"));
    assert!(extraction.contains("[Sida 1]\nFondförmögenhet  1 234\n\n[2]"));
    // Votes see physical page numbers.
    assert!(requests[0].starts_with("[Sida 1]:\n"));

    // An empty object is a parsed fragment with nothing in it.
    assert!(outcome.dataset.is_none());
    let report = outcome.analyzed().next().unwrap();
    assert_eq!(report.offset, 1);
    assert_eq!(report.year, None);
    assert_eq!(report.fragments, 1);
}

// ---------------------------------------------------------------------------
// Test 3: Unreadable and text-less files are skipped, the run continues
// ---------------------------------------------------------------------------
#[test]
fn bad_inputs_are_skipped() {
    let (_dir, paths) = write_inputs(&[
        ("a_broken.pdf", b"garbage"),
        ("b_scan.pdf", b"scan"),
        ("c_fond_y.pdf", b"fond-y"),
    ]);
    let oracle = ScriptedOracle::new(&[
        "2023",
        "2023",
        "0",
        "0",
        r#"{"Fond Y": {"2023": {"Förvaltningsavgift": {"value": 0.65, "source": "Sida 2"}}}}"#,
    ]);
    let sleeper = RecordingSleeper::default();
    let analyzer = Analyzer::new(
        &oracle,
        &PieceTokenizer,
        &sleeper,
        config(),
        builtin_metrics().unwrap(),
    )
    .unwrap();

    let outcome = analyze_pdfs(&paths, &MockExtractor, &analyzer).unwrap();
    assert_eq!(outcome.documents.len(), 3);
    assert!(matches!(
        &outcome.documents[0],
        DocumentOutcome::SkippedUnreadable { reason, .. } if reason.contains("not a PDF")
    ));
    assert_eq!(
        outcome.documents[1],
        DocumentOutcome::SkippedEmpty {
            name: "b_scan.pdf".into()
        }
    );
    assert_eq!(outcome.skipped(), 2);
    assert!(outcome.dataset.unwrap().entities.contains_key("Fond Y"));
}

// ---------------------------------------------------------------------------
// Test 4: Nothing extracted anywhere yields no dataset, not an empty one
// ---------------------------------------------------------------------------
#[test]
fn no_fragments_means_no_output() {
    let (_dir, paths) = write_inputs(&[("fond_y.pdf", b"fond-y")]);
    let oracle = ScriptedOracle::new(&["0", "0", "0", "0", "Tyvärr, inga nyckeltal hittades."]);
    let sleeper = RecordingSleeper::default();
    let analyzer = Analyzer::new(
        &oracle,
        &PieceTokenizer,
        &sleeper,
        config(),
        builtin_metrics().unwrap(),
    )
    .unwrap();

    let outcome = analyze_pdfs(&paths, &MockExtractor, &analyzer).unwrap();
    assert!(outcome.dataset.is_none());
    let report = outcome.analyzed().next().unwrap();
    assert_eq!(report.skipped_segments, 1);
    assert_eq!(report.entity, None);
}

// ---------------------------------------------------------------------------
// Test 5: Conflicts are reported through the log and kept in the data
// ---------------------------------------------------------------------------
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn conflicts_are_logged_and_preserved() {
    let (_dir, paths) = write_inputs(&[("fund_x.pdf", b"fund-x")]);
    let oracle = ScriptedOracle::new(&[
        "2022",
        "2022",
        "0",
        "0",
        r#"{
          "Fund": {"2022": {"Fondförmögenhet": {"value": 100, "source": "Sida 1"}}},
          "Fund X": {"2022": {"Fondförmögenhet": {"value": 120, "source": "Sida 2"}}}
        }"#,
    ]);
    let sleeper = RecordingSleeper::default();
    let analyzer = Analyzer::new(
        &oracle,
        &PieceTokenizer,
        &sleeper,
        config(),
        builtin_metrics().unwrap(),
    )
    .unwrap();

    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    let outcome = tracing::subscriber::with_default(subscriber, || {
        analyze_pdfs(&paths, &MockExtractor, &analyzer).unwrap()
    });

    let logs = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("merging fragments produced conflicts"));
    assert!(logs.contains("no conflicting values could be merged"));
    assert!(logs.contains("fund_x.pdf"));

    let dataset = outcome.dataset.unwrap();
    let entry = &dataset.entities["Fund X"]["2022"]["Fondförmögenhet"];
    assert!(entry.is_conflict());
    assert_eq!(entry.observations().len(), 2);
}
