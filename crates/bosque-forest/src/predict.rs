//! Prediction methods for the random forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::config::ForestConfig;
use crate::dataset::{LabelSet, Task};
use crate::error::ForestError;
use crate::forest::RandomForest;
use crate::node::{ClassId, Prediction};
use crate::oob::OobScore;
use crate::tree::DecisionTree;

/// Combine per-tree leaf predictions into one output.
///
/// Classification takes the majority vote; regression takes the mean in
/// tree order. Returns `None` when `predictions` is empty.
pub(crate) fn aggregate(
    task: Task,
    labels: &LabelSet,
    predictions: impl Iterator<Item = Prediction>,
) -> Option<f64> {
    match task {
        Task::Classification => {
            let mut votes = vec![0usize; labels.len()];
            for prediction in predictions {
                if let Prediction::Class(class) = prediction {
                    votes[class.index()] += 1;
                }
            }
            majority_vote(&votes).map(|class| labels.value(class))
        }
        Task::Regression => {
            let (sum, n) = predictions.fold((0.0, 0usize), |(sum, n), prediction| {
                match prediction {
                    Prediction::Value(v) => (sum + v, n + 1),
                    Prediction::Class(_) => (sum, n),
                }
            });
            (n > 0).then(|| sum / n as f64)
        }
    }
}

/// Class with the most votes; ties go to the lowest class id.
fn majority_vote(votes: &[usize]) -> Option<ClassId> {
    let mut best: Option<(usize, usize)> = None;
    for (class, &count) in votes.iter().enumerate() {
        if count > 0 && best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((class, count));
        }
    }
    best.map(|(class, _)| ClassId::new(class))
}

impl RandomForest {
    /// Predict the label (classification) or value (regression) for one sample.
    ///
    /// # Errors
    ///
    /// | Variant                                    | When                               |
    /// |--------------------------------------------|------------------------------------|
    /// | [`ForestError::NotTrained`]                | the forest has no trees            |
    /// | [`ForestError::PredictionFeatureMismatch`] | `sample.len() != n_features`       |
    pub fn predict(&self, sample: &[f64]) -> Result<f64, ForestError> {
        if self.trees.is_empty() {
            return Err(ForestError::NotTrained);
        }
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let votes = self.trees.iter().map(|tree| tree.leaf_prediction(sample));
        aggregate(self.config.task, &self.labels, votes).ok_or(ForestError::NotTrained)
    }

    /// Predict a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Same as [`RandomForest::predict`], for the first failing sample.
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<f64>, ForestError> {
        samples
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return the fitted trees in training order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the number of trees in the ensemble (zero before training).
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the learning task.
    #[must_use]
    pub fn task(&self) -> Task {
        self.config.task
    }

    /// Return the interned class labels (empty for regression).
    #[must_use]
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Return the training configuration.
    #[must_use]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Return the OOB score, if it was computed.
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }
}
