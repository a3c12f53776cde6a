use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_logging::LogLevel;

use crate::{
    config::ClaimsConfig,
    corpus::ParagraphRecord,
    ensemble::EnsemblePredictor,
    matrix::ProbabilityMatrix,
    model::{vectorizer::tokenize, ProbabilisticClassifier},
    telemetry::{log, ClaimsTelemetry},
};

/// One predicted claim joined with its paragraph metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimReport {
    /// Source domain.
    pub domain: Value,
    /// Publication date.
    pub date: Value,
    /// Contrarian think-tank status of the source.
    pub ctt_status: Value,
    /// Paragraph identifier.
    pub pid: Value,
    /// Original paragraph text.
    pub text: String,
    /// Ensemble claim label.
    pub claim: String,
}

/// Counters describing an inference run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceSummary {
    /// Records read.
    pub records: usize,
    /// Records scored and reported.
    pub predicted: usize,
    /// Records dropped for having too few tokens.
    pub skipped: usize,
    /// Probability rows whose sums drifted from 1.0.
    pub drifted_rows: usize,
}

/// Scores paragraphs with a classifier, averages with the second model's
/// stored probabilities, and joins the ensemble label back to each record.
#[derive(Debug, Clone, Default)]
pub struct InferencePipeline {
    config: ClaimsConfig,
}

impl InferencePipeline {
    /// Creates a pipeline with the given settings.
    #[must_use]
    pub const fn new(config: ClaimsConfig) -> Self {
        Self { config }
    }

    /// Runs inference without telemetry.
    pub fn run<C: ProbabilisticClassifier>(
        &self,
        classifier: &C,
        records: &[ParagraphRecord],
    ) -> Result<(Vec<ClaimReport>, InferenceSummary)> {
        self.run_with_telemetry(classifier, records, None)
    }

    /// Runs inference with optional telemetry instrumentation.
    pub fn run_with_telemetry<C: ProbabilisticClassifier>(
        &self,
        classifier: &C,
        records: &[ParagraphRecord],
        telemetry: Option<&ClaimsTelemetry>,
    ) -> Result<(Vec<ClaimReport>, InferenceSummary)> {
        let min_tokens = self.config.inference.min_tokens.max(1);
        let log_every = self.config.inference.log_every.max(1);
        let mut summary = InferenceSummary {
            records: records.len(),
            ..InferenceSummary::default()
        };

        let mut kept = Vec::with_capacity(records.len());
        let mut inputs = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let input = model_input(record);
            if tokenize(&input).len() < min_tokens {
                summary.skipped += 1;
                log(
                    telemetry,
                    LogLevel::Debug,
                    "inference_record_skipped",
                    json!({ "pid": record.pid, "min_tokens": min_tokens }),
                );
            } else {
                kept.push(record);
                inputs.push(input);
            }
            if (index + 1) % log_every == 0 {
                log(
                    telemetry,
                    LogLevel::Info,
                    "inference_progress",
                    json!({ "processed": index + 1, "skipped": summary.skipped }),
                );
            }
        }

        let codec = classifier.codec();
        let texts: Vec<&str> = inputs.iter().map(String::as_str).collect();
        let probs_a = classifier.predict_proba(&texts)?;
        let second_rows: Vec<Vec<f64>> = kept
            .iter()
            .map(|record| record.ulmfit_probs.clone())
            .collect();
        let probs_b = ProbabilityMatrix::from_rows(&second_rows, codec.class_count())
            .context("second model probabilities do not match the codec")?;

        let predictor = EnsemblePredictor::new(self.config.ensemble.reviewer());
        let result = predictor.predict(&probs_a, &probs_b, codec)?;
        summary.drifted_rows = result.drifted_rows;
        if result.drifted_rows > 0 {
            log(
                telemetry,
                LogLevel::Warn,
                "inference_probability_drift",
                json!({ "rows": result.drifted_rows }),
            );
        }

        let reports: Vec<ClaimReport> = kept
            .into_iter()
            .zip(result.labels)
            .map(|(record, label)| ClaimReport {
                domain: record.domain.clone(),
                date: record.date.clone(),
                ctt_status: record.ctt_status.clone(),
                pid: record.pid.clone(),
                text: record.text.clone(),
                claim: label.into_inner(),
            })
            .collect();
        summary.predicted = reports.len();
        log(
            telemetry,
            LogLevel::Info,
            "inference_complete",
            json!({
                "records": summary.records,
                "predicted": summary.predicted,
                "skipped": summary.skipped,
            }),
        );
        Ok((reports, summary))
    }
}

/// Writes reports as pretty JSON with a trailing newline.
pub fn write_reports(path: impl AsRef<Path>, reports: &[ClaimReport]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file =
        fs::File::create(path).with_context(|| format!("creating report {}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, reports)?;
    file.write_all(b"\n")?;
    Ok(())
}

fn model_input(record: &ParagraphRecord) -> String {
    record.tokens.clone().unwrap_or_else(|| tokenize(&record.text).join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::InferenceConfig, label::LabelCodec};
    use shared_logging::MemoryLogger;
    use std::sync::Arc;
    use tempfile::tempdir;

    /// Scores every text by keyword: "ice" favors class 0, anything else class 1.
    struct KeywordClassifier {
        codec: LabelCodec,
    }

    impl ProbabilisticClassifier for KeywordClassifier {
        fn codec(&self) -> &LabelCodec {
            &self.codec
        }

        fn predict_proba(&self, texts: &[&str]) -> Result<ProbabilityMatrix> {
            let rows: Vec<Vec<f64>> = texts
                .iter()
                .map(|text| {
                    if text.contains("ice") {
                        vec![0.8, 0.2]
                    } else {
                        vec![0.3, 0.7]
                    }
                })
                .collect();
            Ok(ProbabilityMatrix::from_rows(&rows, 2)?)
        }
    }

    fn classifier() -> KeywordClassifier {
        KeywordClassifier {
            codec: LabelCodec::fit(["1_1", "3_3"]),
        }
    }

    fn record(pid: u64, text: &str, probs: Vec<f64>) -> ParagraphRecord {
        ParagraphRecord {
            pid: json!(pid),
            domain: json!("example.org"),
            date: json!("2020-01-01"),
            ctt_status: json!(false),
            text: text.into(),
            tokens: None,
            ulmfit_probs: probs,
        }
    }

    #[test]
    fn joins_ensemble_labels_with_metadata() {
        let records = vec![
            record(1, "Sea <b>ice</b> is back", vec![0.5, 0.5]),
            record(2, "CO2 is food", vec![0.9, 0.1]),
            record(3, "warming stopped", vec![0.1, 0.9]),
        ];
        let (reports, summary) = InferencePipeline::default()
            .run(&classifier(), &records)
            .unwrap();
        let claims: Vec<&str> = reports.iter().map(|r| r.claim.as_str()).collect();
        assert_eq!(claims, vec!["1_1", "1_1", "3_3"]);
        assert_eq!(reports[1].pid, json!(2));
        assert_eq!(reports[0].text, "Sea <b>ice</b> is back");
        assert_eq!(summary.predicted, 3);
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn skips_short_records_and_keeps_alignment() {
        let records = vec![
            record(1, "", vec![0.5, 0.5]),
            record(2, "ice", vec![0.0, 1.0]),
            record(3, "arctic ice melting fast", vec![0.4, 0.6]),
        ];
        let config = ClaimsConfig {
            inference: InferenceConfig {
                min_tokens: 2,
                ..InferenceConfig::default()
            },
            ..ClaimsConfig::default()
        };
        let (reports, summary) = InferencePipeline::new(config)
            .run(&classifier(), &records)
            .unwrap();
        assert_eq!(summary.skipped, 2);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].pid, json!(3));
        assert_eq!(reports[0].claim, "1_1");
    }

    #[test]
    fn second_model_width_must_match_codec() {
        let records = vec![record(1, "ice", vec![0.2, 0.3, 0.5])];
        let err = InferencePipeline::default()
            .run(&classifier(), &records)
            .unwrap_err();
        assert!(format!("{err:#}").contains("row width"));
    }

    #[test]
    fn empty_corpus_produces_empty_report() {
        let (reports, summary) = InferencePipeline::default()
            .run(&classifier(), &[])
            .unwrap();
        assert!(reports.is_empty());
        assert_eq!(summary, InferenceSummary::default());
    }

    #[test]
    fn logs_progress_and_completion() {
        let sink = Arc::new(MemoryLogger::new());
        let telemetry = ClaimsTelemetry::builder("cards.inference")
            .sink(sink.clone())
            .build()
            .unwrap();
        let config = ClaimsConfig {
            inference: InferenceConfig {
                log_every: 2,
                ..InferenceConfig::default()
            },
            ..ClaimsConfig::default()
        };
        let records = vec![
            record(1, "ice", vec![1.0, 0.0]),
            record(2, "ice", vec![1.0, 0.0]),
            record(3, "", vec![1.0, 0.0]),
        ];
        InferencePipeline::new(config)
            .run_with_telemetry(&classifier(), &records, Some(&telemetry))
            .unwrap();
        let messages = sink.messages();
        assert_eq!(messages.first().map(String::as_str), Some("inference_progress"));
        assert!(messages.contains(&"inference_record_skipped".to_owned()));
        assert_eq!(messages.last().map(String::as_str), Some("inference_complete"));
    }

    #[test]
    fn report_file_ends_with_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/cards_for_analysis.json");
        let report = ClaimReport {
            domain: json!("a.org"),
            date: json!(null),
            ctt_status: json!(true),
            pid: json!(9),
            text: "t".into(),
            claim: "5_1".into(),
        };
        write_reports(&path, &[report.clone()]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("]\n"));
        let parsed: Vec<ClaimReport> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, vec![report]);
    }
}
