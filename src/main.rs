//! clineval command line
//!
//! ```bash
//! clineval evaluate --predictions pred.xlsx --ground-truth gt.xlsx --output eval.csv
//! clineval compare eval_a.xlsx eval_b.xlsx eval_c.xlsx --metric recall
//! clineval trials --predictions trial_predictions.csv --ground-truth trial_labels.csv
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use clineval::compare::{column_label, pretty_event_label};
use clineval::report::EXPORT_SHEET_NAME;
use clineval::trials::evaluate_trial_files;
use clineval::{
    ComparisonTable, EvaluationConfig, EvaluationReport, EvaluationRun, MetricKind,
    TrialEvaluationReport,
};

/// Evaluation metrics for clinical timeline extraction
#[derive(Parser)]
#[command(name = "clineval", author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON); defaults to the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a predictions sheet against a ground-truth sheet
    #[command(visible_alias = "e")]
    Evaluate {
        /// Predictions sheet (CSV, or XLSX with the `excel` feature)
        #[arg(short, long)]
        predictions: PathBuf,

        /// Ground-truth sheet
        #[arg(short, long)]
        ground_truth: PathBuf,

        /// Write the evaluation blocks to this CSV/XLSX file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Month tolerance, overriding the configuration
        #[arg(short, long)]
        tolerance: Option<u32>,

        /// Model name, overriding the one found in the predictions sheet
        #[arg(short, long)]
        model: Option<String>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare 2 to 4 exported evaluation sheets
    #[command(visible_alias = "c")]
    Compare {
        /// Exported evaluation files
        #[arg(required = true, num_args = 2..)]
        files: Vec<PathBuf>,

        /// Metric shown in the table: f1, precision, recall or accuracy
        #[arg(long, default_value = "f1")]
        metric: String,

        /// Write the comparison table to this CSV/XLSX file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use compact event labels in the printed table
        #[arg(long)]
        short_labels: bool,

        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score clinical-trial eligibility predictions
    #[command(visible_alias = "t")]
    Trials {
        /// Predictions: patient_id, trial_id, prediction, confidence, triage
        #[arg(short, long)]
        predictions: PathBuf,

        /// Labels: patient_id, trial_id, ground_truth
        #[arg(short, long)]
        ground_truth: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> clineval::Result<EvaluationConfig> {
    match path {
        Some(path) => EvaluationConfig::from_file(path),
        None => EvaluationConfig::load_default(),
    }
}

fn print_report(report: &EvaluationReport) {
    println!("Model: {}", report.display_name());
    println!("Tolerance: ±{} month(s)", report.tolerance_months);
    println!();
    println!(
        "{:<40} {:>4} {:>4} {:>4} {:>8} {:>8} {:>8} {:>8}",
        "Event", "TP", "FP", "FN", "Acc", "Prec", "Rec", "F1"
    );
    for e in &report.per_event {
        let m = &e.metrics;
        println!(
            "{:<40} {:>4} {:>4} {:>4} {:>8.4} {:>8.4} {:>8.4} {:>8.4}",
            pretty_event_label(&e.event),
            m.tp,
            m.fp,
            m.fn_,
            m.accuracy,
            m.precision,
            m.recall,
            m.f1
        );
    }
    println!();

    let avg = &report.timeline_averages;
    for (name, s) in [
        ("Macro avg overall", &avg.macro_avg),
        ("Micro avg overall", &avg.micro),
        ("Weighted avg overall", &avg.weighted),
    ] {
        println!(
            "{:<40} {:>8.4} {:>8.4} {:>8.4} {:>8.4}",
            name, s.accuracy, s.precision, s.recall, s.f1
        );
    }

    if let Some(recist) = &report.recist {
        println!();
        println!(
            "RECIST: {} pairs, agreement {:.1}%, weighted F1 {:.4}",
            recist.pairs,
            recist.agreement * 100.0,
            recist.averages.weighted.f1
        );
    }

    if report.dropped_predictions + report.dropped_ground_truth > 0 {
        println!(
            "Ignored events (identifier on one side only): {} predicted, {} ground truth",
            report.dropped_predictions, report.dropped_ground_truth
        );
    }
    if report.unparsed_predictions + report.unparsed_ground_truth > 0 {
        println!(
            "Skipped events (date without a month): {} predicted, {} ground truth",
            report.unparsed_predictions, report.unparsed_ground_truth
        );
    }
}

fn print_table(table: &ComparisonTable, metric: MetricKind, short_labels: bool) {
    let matrix = table.matrix(metric);
    print!("{:<24}", format!("Model \\ Event ({})", metric));
    for column in &matrix.columns {
        print!(" {:>22}", column_label(column, short_labels));
    }
    println!();
    for row in &matrix.rows {
        print!("{:<24}", row.model);
        for value in &row.values {
            print!(" {:>22.4}", value);
        }
        println!();
    }
}

fn print_trials(report: &TrialEvaluationReport) {
    let m = &report.matchable;
    println!("MATCHABLE PATIENTS");
    println!("N = {}", m.patients);
    println!("Top-1 accuracy: {:.3}", m.top1_accuracy);
    println!("Recall@3: {:.3}", m.recall_at_3);
    match m.mean_confidence_separation {
        Some(sep) => println!("Mean confidence separation: {:.3}", sep),
        None => println!("Mean confidence separation: N/A"),
    }
    println!("Triage GT distribution: {:?}", m.ground_truth_triage);
    println!();

    let n = &report.non_matchable;
    println!("NON-MATCHABLE PATIENTS");
    println!("N = {}", n.patients);
    println!("Mean false-positive rate: {:.3}", n.mean_false_positive_rate);
    println!("Triage distribution: {:?}", n.triage);

    if let Some(u) = &report.indeterminate {
        println!();
        println!("INDETERMINATE CASES (GT = UNKNOWN)");
        println!("Total unknown GT cases: {}", u.cases);
        println!("Appropriate deferral rate: {:.3}", u.appropriate_deferral_rate);
        println!("Unsafe automation rate: {:.3}", u.unsafe_automation_rate);
    }

    let e = &report.eligibility;
    println!();
    println!(
        "Eligibility: TP {} FP {} TN {} FN {}",
        e.counts.tp, e.counts.fp, e.counts.tn, e.counts.fn_
    );
    println!(
        "Sensitivity {:.3}  Specificity {:.3}  Precision {:.3}  F1 {:.3}",
        e.sensitivity, e.specificity, e.precision, e.f1
    );
}

fn run(cli: Cli) -> clineval::Result<()> {
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Evaluate {
            predictions,
            ground_truth,
            output,
            tolerance,
            model,
            json,
        } => {
            if let Some(months) = tolerance {
                config.tolerance_months = months;
            }
            let decimals = config.decimals;
            let mut run = EvaluationRun::new(config)?;
            if let Some(name) = model {
                run = run.with_model_name(name);
            }

            let report = run.evaluate_files(&predictions, &ground_truth)?;

            if let Some(path) = output {
                report.write_export(&path, decimals)?;
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Compare {
            files,
            metric,
            output,
            short_labels,
            json,
        } => {
            let metric = MetricKind::parse(&metric).ok_or_else(|| {
                clineval::Error::InvalidInput(format!("unknown metric '{}'", metric))
            })?;
            let table = ComparisonTable::from_files(&files, config.max_models)?;

            if let Some(path) = output {
                clineval::io::write_rows(
                    &path,
                    &table.to_export_rows(metric, config.decimals),
                    EXPORT_SHEET_NAME,
                )?;
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&table.matrix(metric))?);
            } else {
                print_table(&table, metric, short_labels);
            }
        }
        Commands::Trials {
            predictions,
            ground_truth,
            json,
        } => {
            let report = evaluate_trial_files(&predictions, &ground_truth)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_trials(&report);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
