//! Accuracy regression tests for bosque-forest.
//!
//! These tests verify that algorithmic changes do not degrade forest accuracy
//! on deterministic synthetic datasets.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use bosque_forest::{
    Dataset, ForestConfig, MaxFeatures, OobMetric, OobMode, Task, accuracy, mean_squared_error,
};

// ---------------------------------------------------------------------------
// Helpers: deterministic synthetic datasets
// ---------------------------------------------------------------------------

/// Generate a 300-sample, 10-feature, 3-class classification dataset.
///
/// Features 0-2 are informative (class * 3.0 + noise in [0, 0.5]).
/// Features 3-9 are pure noise in [0, 0.5].
/// Samples are assigned round-robin across classes.
fn make_classification() -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut features = Vec::with_capacity(300);
    let mut labels = Vec::with_capacity(300);
    for i in 0..300 {
        let class = (i % 3) as f64;
        labels.push(class);
        let row: Vec<f64> = (0..10)
            .map(|f| {
                let base = if f < 3 { class * 3.0 } else { 0.0 };
                base + rng.r#gen::<f64>() * 0.5
            })
            .collect();
        features.push(row);
    }
    (features, labels)
}

/// Generate a 200-sample, 4-feature regression dataset.
///
/// `y = 2 * x0 + noise in [0, 0.5]`; features 1-3 are irrelevant.
fn make_regression() -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut features = Vec::with_capacity(200);
    let mut targets = Vec::with_capacity(200);
    for _ in 0..200 {
        let row: Vec<f64> = (0..4).map(|_| rng.r#gen::<f64>() * 10.0).collect();
        targets.push(2.0 * row[0] + rng.r#gen::<f64>() * 0.5);
        features.push(row);
    }
    (features, targets)
}

fn variance(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Held-out accuracy on the last 60 rows must exceed 0.85.
///
/// Reference: observed accuracy = 1.0 with seed=42, 100 trees.
#[test]
fn holdout_accuracy_above_threshold() {
    let (features, labels) = make_classification();
    let train = Dataset::new(features[..240].to_vec(), labels[..240].to_vec()).unwrap();
    let forest = ForestConfig::new(100, Task::Classification)
        .unwrap()
        .fit(&train)
        .unwrap();

    let predictions = forest.predict_batch(&features[240..]).unwrap();
    let acc = accuracy(&predictions, &labels[240..]).unwrap();
    assert!(acc > 0.85, "holdout accuracy {acc} <= 0.85");
}

/// OOB accuracy with 100 trees must exceed 0.80.
///
/// Reference: observed OOB accuracy = 1.0 over all 240 rows.
#[test]
fn oob_accuracy_above_threshold() {
    let (features, labels) = make_classification();
    let train = Dataset::new(features[..240].to_vec(), labels[..240].to_vec()).unwrap();
    let forest = ForestConfig::new(100, Task::Classification)
        .unwrap()
        .with_oob_mode(OobMode::Enabled)
        .fit(&train)
        .unwrap();

    let oob = forest.oob_score().expect("OOB should be computed");
    assert_eq!(oob.metric, OobMetric::Accuracy);
    assert!(oob.value > 0.80, "oob accuracy {} <= 0.80", oob.value);
    assert!(oob.n_oob_samples > 200);
}

// ---------------------------------------------------------------------------
// Regression
// ---------------------------------------------------------------------------

/// Held-out MSE must stay well below the variance of the held-out targets.
///
/// Reference: observed MSE = 2.1 against a target variance of 38.1.
#[test]
fn holdout_mse_below_threshold() {
    let (features, targets) = make_regression();
    let train = Dataset::new(features[..160].to_vec(), targets[..160].to_vec()).unwrap();
    let forest = ForestConfig::new(50, Task::Regression)
        .unwrap()
        .with_max_depth(6)
        .fit(&train)
        .unwrap();

    let predictions = forest.predict_batch(&features[160..]).unwrap();
    let mse = mean_squared_error(&predictions, &targets[160..]).unwrap();
    let baseline = variance(&targets[160..]);
    assert!(mse < 0.2 * baseline, "mse {mse} >= 0.2 * {baseline}");
}

/// Drawing every feature at each split sharpens the fit.
///
/// Reference: observed MSE = 0.33, OOB MSE = 0.30.
#[test]
fn all_features_mse_and_oob() {
    let (features, targets) = make_regression();
    let train = Dataset::new(features[..160].to_vec(), targets[..160].to_vec()).unwrap();
    let forest = ForestConfig::new(50, Task::Regression)
        .unwrap()
        .with_max_depth(6)
        .with_max_features(MaxFeatures::All)
        .with_oob_mode(OobMode::Enabled)
        .fit(&train)
        .unwrap();

    let predictions = forest.predict_batch(&features[160..]).unwrap();
    let mse = mean_squared_error(&predictions, &targets[160..]).unwrap();
    let baseline = variance(&targets[160..]);
    assert!(mse < 0.05 * baseline, "mse {mse} >= 0.05 * {baseline}");

    let oob = forest.oob_score().expect("OOB should be computed");
    assert_eq!(oob.metric, OobMetric::MeanSquaredError);
    assert!(oob.value < 0.05 * variance(&targets[..160]), "oob mse {}", oob.value);
}
