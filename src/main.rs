use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use bosque_forest::{
    Dataset, ForestConfig, MaxFeatures, OobMode, OobScore, RandomForest, Task, accuracy,
    mean_squared_error,
};
use bosque_io::{ImputationReport, Table, TableReader};

#[derive(Parser)]
#[command(name = "bosque")]
#[command(about = "Bagged decision-tree ensembles for tabular classification and regression")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for tree construction (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Shared input and forest parameters.
#[derive(Args, Debug, Clone)]
struct TrainArgs {
    /// Path to the labelled training CSV file
    #[arg(long)]
    data: PathBuf,

    /// Learning task: "classification" or "regression"
    #[arg(long)]
    task: Task,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 10)]
    n_trees: usize,

    /// Maximum tree depth
    #[arg(long, default_value_t = 5)]
    max_depth: usize,

    /// Features drawn per split: a count, or "sqrt", "log2", "all"
    #[arg(long, default_value = "2")]
    max_features: String,

    /// Label column name (defaults to the last column)
    #[arg(long)]
    label_column: Option<String>,

    /// Cell text that marks a missing feature value
    #[arg(long, default_value = "?")]
    missing_token: String,

    /// Compute the out-of-bag score while training
    #[arg(long, default_value_t = false)]
    oob: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Train on the head of a dataset and score on the held-out tail
    Evaluate {
        #[command(flatten)]
        train: TrainArgs,

        /// Fraction of rows (from the top) used for training
        #[arg(long, default_value_t = 0.8)]
        train_fraction: f64,
    },

    /// Train on a dataset and predict every row of an unlabelled CSV file
    Predict {
        #[command(flatten)]
        train: TrainArgs,

        /// Path to the CSV file of samples to predict (no label column)
        #[arg(long)]
        samples: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct EvaluateOutput {
    task: Task,
    n_rows: usize,
    n_train: usize,
    n_test: usize,
    n_features: usize,
    n_trees: usize,
    n_imputed: usize,
    metric: &'static str,
    score: f64,
    oob: Option<OobScore>,
}

#[derive(Serialize)]
struct PredictOutput {
    task: Task,
    n_trees: usize,
    n_features: usize,
    n_samples: usize,
    predictions: Vec<RowPrediction>,
}

#[derive(Serialize)]
struct RowPrediction {
    row: usize,
    prediction: f64,
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other => other.parse::<usize>().map(MaxFeatures::Fixed).with_context(|| {
            format!("invalid max features: {other} (expected a count, sqrt, log2 or all)")
        }),
    }
}

fn read_table(args: &TrainArgs) -> Result<(Table, ImputationReport)> {
    let mut reader = TableReader::new(&args.data).with_missing_token(&args.missing_token);
    if let Some(name) = &args.label_column {
        reader = reader.with_label_column(name);
    }
    let mut table = reader
        .read()
        .with_context(|| format!("failed to read {}", args.data.display()))?;
    let report = table
        .impute_column_means()
        .context("mean imputation failed")?;
    info!(n_imputed = report.total(), "imputation complete");
    Ok((table, report))
}

fn to_dataset(table: Table) -> Result<Dataset> {
    let (features, labels) = table.into_parts();
    let labels = labels.context("table has no label column")?;
    Dataset::new(features, labels).context("invalid training data")
}

fn train_forest(
    args: &TrainArgs,
    seed: u64,
    threads: Option<usize>,
    dataset: &Dataset,
) -> Result<RandomForest> {
    let oob_mode = if args.oob {
        OobMode::Enabled
    } else {
        OobMode::Disabled
    };
    let config = ForestConfig::new(args.n_trees, args.task)
        .context("invalid forest configuration")?
        .with_max_depth(args.max_depth)
        .with_max_features(parse_max_features(&args.max_features)?)
        .with_seed(seed)
        .with_oob_mode(oob_mode)
        .with_n_threads(threads);
    config.fit(dataset).context("training failed")
}

/// Read unlabelled samples, filling missing cells with the training means.
fn read_samples(
    path: &Path,
    missing_token: &str,
    column_means: &[f64],
) -> Result<Vec<Vec<f64>>> {
    let table = TableReader::new(path)
        .with_missing_token(missing_token)
        .without_labels()
        .read()
        .with_context(|| format!("failed to read {}", path.display()))?;
    let (mut samples, _) = table.into_parts();
    for row in &mut samples {
        for (value, mean) in row.iter_mut().zip(column_means) {
            if value.is_nan() {
                *value = *mean;
            }
        }
    }
    Ok(samples)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Evaluate {
            train,
            train_fraction,
        } => {
            let (table, report) = read_table(&train)?;
            let n_rows = table.n_rows();
            let (train_table, test_table) = table
                .split(train_fraction)
                .context("train/test split failed")?;
            let n_train = train_table.n_rows();
            info!(n_train, n_test = test_table.n_rows(), "data split");

            let dataset = to_dataset(train_table)?;
            let forest = train_forest(&train, cli.seed, cli.threads, &dataset)?;

            let (test_features, test_labels) = test_table.into_parts();
            let test_labels = test_labels.context("table has no label column")?;
            let predictions = forest
                .predict_batch(&test_features)
                .context("prediction failed")?;
            let (metric, score) = match train.task {
                Task::Classification => ("accuracy", accuracy(&predictions, &test_labels)?),
                Task::Regression => (
                    "mean_squared_error",
                    mean_squared_error(&predictions, &test_labels)?,
                ),
            };
            info!(metric, score, "evaluation complete");

            let output = EvaluateOutput {
                task: train.task,
                n_rows,
                n_train,
                n_test: test_features.len(),
                n_features: forest.n_features(),
                n_trees: forest.n_trees(),
                n_imputed: report.total(),
                metric,
                score,
                oob: forest.oob_score().cloned(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict { train, samples } => {
            let (table, report) = read_table(&train)?;
            let dataset = to_dataset(table)?;
            let forest = train_forest(&train, cli.seed, cli.threads, &dataset)?;

            let rows = read_samples(&samples, &train.missing_token, &report.column_means)?;
            let predictions = forest
                .predict_batch(&rows)
                .context("prediction failed")?;
            info!(n_samples = rows.len(), "prediction complete");

            let output = PredictOutput {
                task: train.task,
                n_trees: forest.n_trees(),
                n_features: forest.n_features(),
                n_samples: rows.len(),
                predictions: predictions
                    .into_iter()
                    .enumerate()
                    .map(|(row, prediction)| RowPrediction { row, prediction })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
