use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use cards_claims::{
    train_validation_split, write_reports, ClaimModel, ClaimTrainingPipeline, ClaimsConfig,
    ClaimsTelemetry, CorpusLoader, InferencePipeline, ProbabilisticClassifier, TrainingSet,
};
use chrono::{Datelike, Local, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use shared_logging::LogLevel;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "cards", version, about = "CARDS claim classifier and ensemble inference")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fits the TF-IDF logistic model and writes the model bundle.
    Fit(FitArgs),
    /// Scores a corpus with the two-model ensemble and writes the claim report.
    Predict(PredictArgs),
    /// Prints the class order of a model bundle.
    Classes {
        #[arg(long)]
        model: PathBuf,
    },
}

#[derive(Args, Debug)]
struct FitArgs {
    /// JSON array of `{text, label}` training examples.
    #[arg(long)]
    train: PathBuf,
    #[arg(long, default_value = "classifiers/fitted_models/logistic.json")]
    out: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Fraction of examples held out to report validation accuracy.
    #[arg(long)]
    holdout: Option<f64>,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
    /// Only write warnings and errors to the run log.
    #[arg(long)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long)]
    model: PathBuf,
    /// Corpus JSON file, or a directory of JSON shards.
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value = "data/full_data/cards_for_analysis.json")]
    output: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
    /// Only write warnings and errors to the run log.
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Fit(args) => {
            let summary = handle_fit(&args)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Predict(args) => {
            let summary = handle_predict(&args)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Commands::Classes { model } => {
            let model = ClaimModel::load(&model)?;
            for (index, label) in model.codec().classes().iter().enumerate() {
                println!("{index}\t{label}");
            }
            Ok(())
        }
    }
}

fn handle_fit(args: &FitArgs) -> Result<Value> {
    anyhow::ensure!(
        args.train.exists(),
        "training data {} not found",
        args.train.display()
    );
    let config = ClaimsConfig::load_or_default(args.config.as_deref())?;
    let (run_id, telemetry) = open_run(&args.log_dir, "fit", args.quiet)?;
    log_event(
        &telemetry,
        LogLevel::Info,
        "fit started",
        json!({ "run_id": run_id, "train": args.train, "holdout": args.holdout }),
    );

    let result = fit_model(args, config, &telemetry);
    finish_run(&telemetry, &run_id, result)
}

fn fit_model(args: &FitArgs, config: ClaimsConfig, telemetry: &ClaimsTelemetry) -> Result<Value> {
    let dataset = TrainingSet::load(&args.train)?;
    let (train, validation) = match args.holdout {
        Some(ratio) if ratio > 0.0 => {
            let (train, validation) = train_validation_split(&dataset, ratio, args.seed);
            (train, Some(validation))
        }
        _ => (dataset, None),
    };

    let pipeline = ClaimTrainingPipeline::new(config);
    let (model, mut report) = pipeline.run_with_telemetry(&train, Some(telemetry))?;
    if let Some(validation) = validation.filter(|set| !set.is_empty()) {
        report.validation_accuracy = Some(ClaimTrainingPipeline::evaluate(&model, &validation)?);
    }
    model
        .save(&args.out)
        .with_context(|| format!("saving model to {}", args.out.display()))?;
    println!("{}", report.summary());
    Ok(json!({
        "event": "model_fitted",
        "model_id": model.id,
        "model_path": args.out,
        "report": report,
    }))
}

fn handle_predict(args: &PredictArgs) -> Result<Value> {
    anyhow::ensure!(
        args.model.exists(),
        "model bundle {} not found",
        args.model.display()
    );
    let config = ClaimsConfig::load_or_default(args.config.as_deref())?;
    let (run_id, telemetry) = open_run(&args.log_dir, "predict", args.quiet)?;
    log_event(
        &telemetry,
        LogLevel::Info,
        "predict started",
        json!({ "run_id": run_id, "model": args.model, "input": args.input }),
    );

    let result = predict_claims(args, config, &telemetry);
    finish_run(&telemetry, &run_id, result)
}

fn predict_claims(
    args: &PredictArgs,
    config: ClaimsConfig,
    telemetry: &ClaimsTelemetry,
) -> Result<Value> {
    let model = ClaimModel::load(&args.model)?;
    let records = CorpusLoader::new(&args.input).load()?;
    let (reports, summary) =
        InferencePipeline::new(config).run_with_telemetry(&model, &records, Some(telemetry))?;
    write_reports(&args.output, &reports)?;
    Ok(json!({
        "event": "claims_predicted",
        "model_id": model.id,
        "output": args.output,
        "summary": summary,
    }))
}

fn open_run(log_dir: &Path, command: &str, quiet: bool) -> Result<(String, ClaimsTelemetry)> {
    let run_id = format!("run-{}", Uuid::new_v4());
    let log_path = compute_log_path(log_dir, command)?;
    let min_level = if quiet { LogLevel::Warn } else { LogLevel::Debug };
    let telemetry = ClaimsTelemetry::builder(format!("cards.{command}"))
        .log_path(log_path)
        .min_level(min_level)
        .build()?;
    Ok((run_id, telemetry))
}

fn finish_run(telemetry: &ClaimsTelemetry, run_id: &str, result: Result<Value>) -> Result<Value> {
    match result {
        Ok(summary) => {
            log_event(
                telemetry,
                LogLevel::Info,
                "run completed",
                json!({ "run_id": run_id }),
            );
            Ok(summary)
        }
        Err(err) => {
            log_event(
                telemetry,
                LogLevel::Error,
                "run failed",
                json!({ "run_id": run_id, "error": format!("{err:#}") }),
            );
            Err(err)
        }
    }
}

fn log_event(telemetry: &ClaimsTelemetry, level: LogLevel, message: &str, metadata: Value) {
    if let Err(err) = telemetry.log(level, message, metadata) {
        eprintln!("failed to write run log: {err:?}");
    }
}

fn compute_log_path(base: &Path, command: &str) -> Result<PathBuf> {
    let now = Local::now();
    let dir = base
        .join(format!("{:04}", now.year()))
        .join(format!("{:02}", now.month()))
        .join(format!("{:02}", now.day()));
    fs::create_dir_all(&dir)?;
    Ok(dir.join(format!(
        "{command}-{}.log.jsonl",
        Utc::now().format("%Y%m%d-%H%M%S")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_predict_arguments() {
        let cli = Cli::try_parse_from([
            "cards",
            "predict",
            "--model",
            "m.json",
            "--input",
            "data/full_data",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict(args) => {
                assert_eq!(args.input, PathBuf::from("data/full_data"));
                assert_eq!(
                    args.output,
                    PathBuf::from("data/full_data/cards_for_analysis.json")
                );
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn log_path_is_dated() {
        let dir = tempdir().unwrap();
        let path = compute_log_path(dir.path(), "fit").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("fit-"));
        assert!(name.ends_with(".log.jsonl"));
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn fit_then_predict_writes_report() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("cards.toml"),
            "[vectorizer]\nmin_df = 1\nmax_ngram = 1\n",
        )
        .unwrap();
        fs::write(
            root.join("train.json"),
            json!([
                {"text": "arctic ice recovering", "label": "1_1"},
                {"text": "sea ice growing", "label": "1_1"},
                {"text": "co2 plant food", "label": "3_3"},
                {"text": "more co2 greens plants", "label": "3_3"}
            ])
            .to_string(),
        )
        .unwrap();
        let fit = FitArgs {
            train: root.join("train.json"),
            out: root.join("models/logistic.json"),
            config: Some(root.join("cards.toml")),
            holdout: None,
            seed: 1,
            log_dir: root.join("logs"),
            quiet: false,
        };
        handle_fit(&fit).unwrap();

        fs::create_dir_all(root.join("corpus")).unwrap();
        fs::write(
            root.join("corpus/shard-0.json"),
            json!([
                {"pid": 1, "domain": "a.org", "date": "2019", "ctt_status": true,
                 "text": "ice is recovering", "ulmfit_probs": [0.6, 0.4]},
                {"pid": 2, "domain": "b.org", "date": "2020", "ctt_status": false,
                 "text": "", "ulmfit_probs": [0.5, 0.5]}
            ])
            .to_string(),
        )
        .unwrap();
        let predict = PredictArgs {
            model: fit.out.clone(),
            input: root.join("corpus"),
            output: root.join("out/report.json"),
            config: Some(root.join("cards.toml")),
            log_dir: root.join("logs"),
            quiet: false,
        };
        let summary = handle_predict(&predict).unwrap();
        assert_eq!(summary["summary"]["predicted"], json!(1));
        assert_eq!(summary["summary"]["skipped"], json!(1));

        let report: Value =
            serde_json::from_str(&fs::read_to_string(&predict.output).unwrap()).unwrap();
        assert_eq!(report[0]["claim"], json!("1_1"));
        assert_eq!(report[0]["pid"], json!(1));
    }

    #[test]
    fn quiet_run_log_keeps_only_failures() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let (run_id, telemetry) = open_run(&log_dir, "predict", true).unwrap();
        log_event(&telemetry, LogLevel::Info, "predict started", json!({}));
        let result = finish_run(&telemetry, &run_id, Err(anyhow::anyhow!("boom")));
        assert!(result.is_err());

        let day_dir = compute_log_path(&log_dir, "predict")
            .unwrap()
            .parent()
            .unwrap()
            .to_path_buf();
        let lines: Vec<Value> = fs::read_dir(day_dir)
            .unwrap()
            .flat_map(|entry| {
                fs::read_to_string(entry.unwrap().path())
                    .unwrap()
                    .lines()
                    .map(|line| serde_json::from_str(line).unwrap())
                    .collect::<Vec<Value>>()
            })
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["message"], json!("run failed"));
    }

    #[test]
    fn missing_model_is_reported() {
        let dir = tempdir().unwrap();
        let args = PredictArgs {
            model: dir.path().join("missing.json"),
            input: dir.path().join("corpus"),
            output: dir.path().join("out.json"),
            config: None,
            log_dir: dir.path().join("logs"),
            quiet: false,
        };
        assert!(handle_predict(&args).is_err());
    }
}
