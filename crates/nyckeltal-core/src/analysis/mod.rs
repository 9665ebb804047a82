pub mod outcome;
pub mod prompt;

pub use outcome::{DocumentOutcome, DocumentReport, RunOutcome};

use std::time::Duration;

use crate::config::{validate_config, AnalysisConfig};
use crate::consolidate::{consolidate_fragments, Dataset};
use crate::error::NyckeltalError;
use crate::extraction::labels::label_pages;
use crate::metrics::schema::MetricDictionary;
use crate::model::Document;
use crate::oracle::retry::RetryPolicy;
use crate::oracle::{Oracle, Pacer, Sleeper};
use crate::parsing::{parse_response, repair_broken_lines};
use crate::prompts;
use crate::segment::tokenizer::Tokenizer;
use crate::segment::Segmenter;
use crate::vote::offset::infer_offset;
use crate::vote::year::infer_year;
use crate::vote::Voter;
use prompt::{request_text, system_prompt};

/// Drives the extraction of key figures from a batch of documents.
///
/// Holds the collaborators (oracle, tokenizer, sleeper) by reference so
/// callers can substitute fakes in tests. Every oracle call is issued
/// sequentially.
pub struct Analyzer<'a> {
    oracle: &'a dyn Oracle,
    sleeper: &'a dyn Sleeper,
    segmenter: Segmenter<'a>,
    config: AnalysisConfig,
    metrics: MetricDictionary,
    metrics_json: String,
    labels: Vec<String>,
    instructions: String,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        oracle: &'a dyn Oracle,
        tokenizer: &'a dyn Tokenizer,
        sleeper: &'a dyn Sleeper,
        config: AnalysisConfig,
        metrics: MetricDictionary,
    ) -> Result<Self, NyckeltalError> {
        validate_config(&config)?;
        let segmenter = Segmenter::new(config.segmenter.clone(), tokenizer, &config.page_marker)?;
        let metrics_json = metrics.to_prompt_json()?;
        let labels = metrics.labels();
        Ok(Self {
            oracle,
            sleeper,
            segmenter,
            config,
            metrics,
            metrics_json,
            labels,
            instructions: prompts::EXTRACTION.to_string(),
        })
    }

    /// Replace the built-in extraction instructions.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricDictionary {
        &self.metrics
    }

    /// Begin a run. Documents are then fed in order with [`Run::add`].
    pub fn start(&self) -> Run<'_, 'a> {
        Run {
            analyzer: self,
            pacer: Pacer::new(
                self.sleeper,
                Duration::from_millis(self.config.pacing.segment_delay_ms),
            ),
            documents: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Analyze `documents` in order and merge their results.
    pub fn run(&self, documents: &[Document]) -> Result<RunOutcome, NyckeltalError> {
        let mut run = self.start();
        for document in documents {
            run.add(document)?;
        }
        Ok(run.finish())
    }

    fn analyze(
        &self,
        document: &Document,
        pacer: &mut Pacer<'_>,
    ) -> Result<(DocumentReport, Option<Dataset>), NyckeltalError> {
        let retry = RetryPolicy::new(self.config.retry.clone(), self.sleeper);
        let voter = Voter::new(
            self.oracle,
            self.sleeper,
            &retry,
            &self.config.model,
            &self.config.voting,
        );

        let year = infer_year(&voter, &document.pages);
        let offset = infer_offset(&voter, &document.pages);

        let text = label_pages(&document.pages, offset, &self.config.page_marker);
        let text = repair_broken_lines(&text, &self.labels, &self.config.repair);
        let segments = self.segmenter.segment(&text)?;
        tracing::info!(segments = segments.len(), "segmented document");

        let system = system_prompt(&self.instructions, &self.metrics_json, year);
        let mut fragments = Vec::new();
        let mut skipped_segments = 0;
        for segment in &segments {
            pacer.before_call();
            tracing::info!(
                segment = segment.index + 1,
                of = segments.len(),
                tokens = segment.token_count,
                "sending segment to oracle"
            );
            let response = match retry.call(
                self.oracle,
                &system,
                &request_text(&segment.text),
                &self.config.model,
            ) {
                Ok(response) => response,
                Err(e) if e.is_unusable_response() => {
                    skipped_segments += 1;
                    tracing::warn!(segment = segment.index + 1, error = %e, "no usable response, skipping segment");
                    continue;
                }
                Err(e) => return Err(e),
            };
            match parse_response(&response) {
                Ok(map) => fragments.push(Dataset::from_fragment(map)),
                Err(e) => {
                    skipped_segments += 1;
                    tracing::warn!(segment = segment.index + 1, error = %e, "skipping segment response");
                }
            }
        }

        let parsed = fragments.len();
        let consolidation = consolidate_fragments(fragments, &self.config.source_prefix);
        let report = DocumentReport {
            name: document.name.clone(),
            offset,
            year,
            segments: segments.len(),
            fragments: parsed,
            skipped_segments,
            conflicts: consolidation.as_ref().map_or(0, |c| c.conflicts.len()),
            merged: consolidation.as_ref().map_or(0, |c| c.merged),
            entity: consolidation
                .as_ref()
                .and_then(|c| c.dataset.entities.keys().next().cloned()),
        };
        Ok((report, consolidation.map(|c| c.dataset)))
    }
}

/// An analysis run in progress.
///
/// Extraction calls are paced across the whole run: the first call goes
/// out immediately, every later one waits `pacing.segment_delay_ms`.
pub struct Run<'r, 'a> {
    analyzer: &'r Analyzer<'a>,
    pacer: Pacer<'a>,
    documents: Vec<DocumentOutcome>,
    results: Vec<Dataset>,
}

impl<'r, 'a> Run<'r, 'a> {
    /// Analyze one document. A document without text is recorded as skipped.
    /// A segment whose response stays truncated or unreadable is skipped;
    /// any other oracle failure that survives the retry policy ends the run.
    pub fn add(&mut self, document: &Document) -> Result<(), NyckeltalError> {
        let span = tracing::info_span!("document", name = %document.name);
        let _guard = span.enter();

        if !document.has_text() {
            tracing::warn!("no retrievable text, skipping document");
            self.documents.push(DocumentOutcome::SkippedEmpty {
                name: document.name.clone(),
            });
            return Ok(());
        }

        let (report, dataset) = self.analyzer.analyze(document, &mut self.pacer)?;
        match dataset {
            Some(dataset) => self.results.push(dataset),
            None => tracing::warn!("document produced no key figures"),
        }
        self.documents.push(DocumentOutcome::Analyzed(report));
        Ok(())
    }

    /// Record a document that never made it to analysis.
    pub fn skip(&mut self, outcome: DocumentOutcome) {
        tracing::warn!(name = outcome.name(), "document skipped");
        self.documents.push(outcome);
    }

    /// Merge the per-document results in the order they were added.
    pub fn finish(self) -> RunOutcome {
        if self.results.is_empty() {
            tracing::warn!("no results were produced");
            return RunOutcome {
                dataset: None,
                documents: self.documents,
            };
        }
        let (dataset, conflicts) = Dataset::merge_all(self.results);
        if !conflicts.is_empty() {
            tracing::warn!(
                conflicts = conflicts.len(),
                "documents disagree on shared figures"
            );
        }
        tracing::info!(
            entities = dataset.entities.len(),
            observations = dataset.observation_count(),
            "run complete"
        );
        RunOutcome {
            dataset: Some(dataset),
            documents: self.documents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::Page;
    use crate::metrics::builtin::builtin_metrics;
    use crate::oracle::testing::{RecordingSleeper, ScriptedOracle};
    use crate::oracle::OracleError;
    use crate::segment::tokenizer::PieceTokenizer;
    use serde_json::json;

    fn quick_config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.voting.min_samples = 1;
        config.voting.agreement_threshold = 1.0;
        config
    }

    fn one_page_doc(name: &str) -> Document {
        Document::new(name, vec![Page::new(1, "Fondförmögenhet 1 234 tkr")])
    }

    #[test]
    fn test_single_document_flow() {
        // year vote, offset vote, one segment
        let oracle = ScriptedOracle::answering(&[
            "2023",
            "0",
            r#"```json
{"Fond A": {"2023": {"Fondförmögenhet": {"värde": 1234, "källa": "Sida 1"}}}}
```"#,
        ]);
        let sleeper = RecordingSleeper::default();
        let analyzer = Analyzer::new(
            &oracle,
            &PieceTokenizer,
            &sleeper,
            quick_config(),
            builtin_metrics().unwrap(),
        )
        .unwrap();

        let outcome = analyzer.run(&[one_page_doc("a.pdf")]).unwrap();
        let dataset = outcome.dataset.as_ref().unwrap();
        assert_eq!(
            serde_json::to_value(dataset).unwrap(),
            json!({"Fond A": {"2023": {"Fondförmögenhet": {"value": 1234, "source": "Sida 1"}}}})
        );
        let report = outcome.analyzed().next().unwrap();
        assert_eq!(report.year, Some(2023));
        assert_eq!(report.offset, 0);
        assert_eq!(report.entity.as_deref(), Some("Fond A"));

        let calls = oracle.calls.borrow();
        assert!(calls[2].0.contains("räkenskapsår är 2023"));
        assert!(calls[2].1.contains("[Sida 1]\nFondförmögenhet 1 234 tkr"));
        // No extraction delay before the first extraction call.
        assert!(sleeper.slept.borrow().is_empty());
    }

    #[test]
    fn test_unparseable_segment_is_skipped() {
        let oracle = ScriptedOracle::answering(&["0", "0", "Jag hittade inga nyckeltal."]);
        let sleeper = RecordingSleeper::default();
        let analyzer = Analyzer::new(
            &oracle,
            &PieceTokenizer,
            &sleeper,
            quick_config(),
            builtin_metrics().unwrap(),
        )
        .unwrap();
        let outcome = analyzer.run(&[one_page_doc("a.pdf")]).unwrap();
        assert!(outcome.dataset.is_none());
        let report = outcome.analyzed().next().unwrap();
        assert_eq!(report.skipped_segments, 1);
        assert_eq!(report.fragments, 0);
        assert_eq!(report.year, None);
    }

    #[test]
    fn test_empty_document_skipped_without_calls() {
        let oracle = ScriptedOracle::answering(&[]);
        let sleeper = RecordingSleeper::default();
        let analyzer = Analyzer::new(
            &oracle,
            &PieceTokenizer,
            &sleeper,
            quick_config(),
            builtin_metrics().unwrap(),
        )
        .unwrap();
        let doc = Document::new("scan.pdf", vec![Page::new(1, "  \n ")]);
        let outcome = analyzer.run(&[doc]).unwrap();
        assert!(outcome.dataset.is_none());
        assert_eq!(
            outcome.documents,
            vec![DocumentOutcome::SkippedEmpty {
                name: "scan.pdf".into()
            }]
        );
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn test_truncated_segment_is_skipped_and_run_continues() {
        let truncated = || -> Result<String, OracleError> {
            Err(OracleError::Truncated {
                finish_reason: "length".into(),
            })
        };
        // a.pdf: year, offset, then a segment that is always cut short
        let mut replies: Vec<Result<String, OracleError>> = vec![Ok("0".into()), Ok("0".into())];
        replies.extend((0..5).map(|_| truncated()));
        // b.pdf: year, offset, one good segment
        replies.extend([
            Ok("2023".into()),
            Ok("0".into()),
            Ok(r#"{"Fond B": {"2023": {"Förvaltningsavgift": {"value": 0.65, "source": "Sida 1"}}}}"#.into()),
        ]);
        let oracle = ScriptedOracle::new(replies);
        let sleeper = RecordingSleeper::default();
        let analyzer = Analyzer::new(
            &oracle,
            &PieceTokenizer,
            &sleeper,
            quick_config(),
            builtin_metrics().unwrap(),
        )
        .unwrap();

        let outcome = analyzer
            .run(&[one_page_doc("a.pdf"), one_page_doc("b.pdf")])
            .unwrap();
        let reports: Vec<_> = outcome.analyzed().collect();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].skipped_segments, 1);
        assert_eq!(reports[0].fragments, 0);
        assert_eq!(reports[1].fragments, 1);
        assert_eq!(oracle.call_count(), 10);

        let dataset = outcome.dataset.as_ref().unwrap();
        assert_eq!(dataset.entities.len(), 1);
        assert!(dataset.entities.contains_key("Fond B"));

        // Four backoffs for a.pdf's segment, then the pause before b.pdf's.
        let ms = Duration::from_millis;
        assert_eq!(
            *sleeper.slept.borrow(),
            vec![ms(1500), ms(3000), ms(6000), ms(12000), ms(5000)]
        );
    }

    #[test]
    fn test_terminal_oracle_error_ends_run() {
        let oracle = ScriptedOracle::new(vec![
            Ok("0".into()),
            Ok("0".into()),
            Err(OracleError::Unauthorized(401)),
        ]);
        let sleeper = RecordingSleeper::default();
        let analyzer = Analyzer::new(
            &oracle,
            &PieceTokenizer,
            &sleeper,
            quick_config(),
            builtin_metrics().unwrap(),
        )
        .unwrap();
        let err = analyzer.run(&[one_page_doc("a.pdf")]).unwrap_err();
        assert!(matches!(
            err,
            NyckeltalError::Oracle(OracleError::Unauthorized(401))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let oracle = ScriptedOracle::answering(&[]);
        let sleeper = RecordingSleeper::default();
        let mut config = AnalysisConfig::default();
        config.segmenter.overlap = Some(crate::segment::Overlap::Fraction(1.0));
        let result = Analyzer::new(
            &oracle,
            &PieceTokenizer,
            &sleeper,
            config,
            builtin_metrics().unwrap(),
        );
        assert!(matches!(result, Err(NyckeltalError::InvalidOverlap(_))));
    }
}
