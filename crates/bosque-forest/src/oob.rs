//! Out-of-bag (OOB) evaluation for the forest.

use tracing::warn;

use crate::dataset::{Dataset, LabelSet, Task};
use crate::metrics::{accuracy, mean_squared_error};
use crate::predict::aggregate;
use crate::tree::DecisionTree;

/// Metric reported by an [`OobScore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OobMetric {
    /// Fraction of OOB rows whose predicted label matches (classification).
    Accuracy,
    /// Mean squared error over OOB rows (regression).
    MeanSquaredError,
}

/// Out-of-bag evaluation result.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OobScore {
    /// Which metric `value` holds.
    pub metric: OobMetric,
    /// The metric value.
    pub value: f64,
    /// Number of rows that had at least one OOB tree.
    pub n_oob_samples: usize,
}

/// Score every training row on the trees whose bootstrap did not draw it.
///
/// Rows with no OOB tree are skipped. Returns `None` when no row has any.
pub(crate) fn compute_oob(
    trees: &[DecisionTree],
    dataset: &Dataset,
    task: Task,
    labels: &LabelSet,
    oob_rows_per_tree: &[Vec<usize>],
) -> Option<OobScore> {
    let mut oob_trees: Vec<Vec<usize>> = vec![Vec::new(); dataset.n_rows()];
    for (tree_idx, rows) in oob_rows_per_tree.iter().enumerate() {
        for &row in rows {
            oob_trees[row].push(tree_idx);
        }
    }

    let mut predicted = Vec::new();
    let mut actual = Vec::new();
    for (row, tree_ids) in oob_trees.iter().enumerate() {
        let sample = dataset.row(row);
        let votes = tree_ids.iter().map(|&t| trees[t].leaf_prediction(sample));
        if let Some(prediction) = aggregate(task, labels, votes) {
            predicted.push(prediction);
            actual.push(dataset.targets()[row]);
        }
    }

    if predicted.is_empty() {
        warn!("no training row is out-of-bag for any tree, skipping OOB score");
        return None;
    }

    let (metric, value) = match task {
        Task::Classification => (OobMetric::Accuracy, accuracy(&predicted, &actual).ok()?),
        Task::Regression => (
            OobMetric::MeanSquaredError,
            mean_squared_error(&predicted, &actual).ok()?,
        ),
    };

    Some(OobScore {
        metric,
        value,
        n_oob_samples: predicted.len(),
    })
}
