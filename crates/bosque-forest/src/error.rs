use std::fmt;

/// Broad category of a [`ForestError`].
///
/// Callers that only care about *why* an operation failed (bad
/// hyperparameters vs. malformed data vs. an untrained model) can match on
/// this instead of the individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid hyperparameters or runtime configuration.
    Configuration,
    /// Inconsistent shapes between features, labels, or prediction inputs.
    DimensionMismatch,
    /// A tree build step received zero rows.
    EmptyPartition,
    /// Prediction requested on a forest with no trees.
    NotTrained,
    /// NaN or infinite values reached training.
    Numeric,
    /// Training stopped through a [`CancelToken`](crate::CancelToken).
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::DimensionMismatch => "dimension mismatch",
            ErrorKind::EmptyPartition => "empty partition",
            ErrorKind::NotTrained => "not trained",
            ErrorKind::Numeric => "numeric",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Errors from decision tree and forest operations.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when max_features resolves to 0 or exceeds n_features.
    #[error("max_features resolved to {max_features}, but must be in [1, {n_features}]")]
    InvalidMaxFeatures {
        /// The resolved max_features value.
        max_features: usize,
        /// The number of features in the dataset.
        n_features: usize,
    },

    /// Returned when a task name is neither classification nor regression.
    #[error("unsupported task \"{name}\" (expected classification or regression)")]
    UnsupportedTask {
        /// The task name that could not be parsed.
        name: String,
    },

    /// Returned when an explicit worker count of zero is requested.
    #[error("n_threads must be at least 1, got {n_threads}")]
    InvalidThreadCount {
        /// The invalid thread count.
        n_threads: usize,
    },

    /// Returned when the dedicated rayon pool cannot be created.
    #[error("failed to build training thread pool")]
    ThreadPool {
        /// The underlying rayon error.
        source: rayon::ThreadPoolBuildError,
    },

    /// Returned when the training dataset has zero samples.
    #[error("dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a row has a different number of features than the first row.
    #[error("row {row_index} has {got} features, expected {expected}")]
    RaggedRow {
        /// The feature count of the first row.
        expected: usize,
        /// The feature count of the offending row.
        got: usize,
        /// The zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when the label vector and the feature matrix disagree in length.
    #[error("{n_labels} labels supplied for {n_rows} feature rows")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when a prediction input has the wrong number of features.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a tree build step receives no rows.
    #[error("tree build step received an empty partition at remaining depth {depth}")]
    EmptyPartition {
        /// Remaining depth budget at the failing step.
        depth: usize,
    },

    /// Returned when predicting with a forest that holds no trees.
    #[error("forest has not been trained")]
    NotTrained,

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at row {row_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending row.
        row_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a label is NaN or infinite.
    #[error("non-finite label at row {row_index}")]
    NonFiniteLabel {
        /// The zero-based index of the offending row.
        row_index: usize,
    },

    /// Returned when training is stopped before every tree was built.
    #[error("training cancelled before all {n_trees} trees were built")]
    Cancelled {
        /// Number of trees requested.
        n_trees: usize,
    },
}

impl ForestError {
    /// Return the taxonomy category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForestError::InvalidTreeCount { .. }
            | ForestError::InvalidMaxFeatures { .. }
            | ForestError::UnsupportedTask { .. }
            | ForestError::InvalidThreadCount { .. }
            | ForestError::ThreadPool { .. } => ErrorKind::Configuration,
            ForestError::EmptyDataset
            | ForestError::ZeroFeatures
            | ForestError::RaggedRow { .. }
            | ForestError::LabelCountMismatch { .. }
            | ForestError::PredictionFeatureMismatch { .. } => ErrorKind::DimensionMismatch,
            ForestError::EmptyPartition { .. } => ErrorKind::EmptyPartition,
            ForestError::NotTrained => ErrorKind::NotTrained,
            ForestError::NonFiniteValue { .. } | ForestError::NonFiniteLabel { .. } => {
                ErrorKind::Numeric
            }
            ForestError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ForestError};

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            ForestError::InvalidTreeCount { n_trees: 0 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ForestError::LabelCountMismatch { n_rows: 5, n_labels: 4 }.kind(),
            ErrorKind::DimensionMismatch
        );
        assert_eq!(
            ForestError::EmptyPartition { depth: 2 }.kind(),
            ErrorKind::EmptyPartition
        );
        assert_eq!(ForestError::NotTrained.kind(), ErrorKind::NotTrained);
        assert_eq!(
            ForestError::NonFiniteLabel { row_index: 0 }.kind(),
            ErrorKind::Numeric
        );
    }

    #[test]
    fn display_mentions_offending_values() {
        let err = ForestError::InvalidMaxFeatures {
            max_features: 3,
            n_features: 2,
        };
        assert_eq!(
            err.to_string(),
            "max_features resolved to 3, but must be in [1, 2]"
        );
        assert_eq!(ErrorKind::DimensionMismatch.to_string(), "dimension mismatch");
    }
}
