//! In-memory tabular data with mean imputation and head/tail partitioning.

use tracing::{debug, warn};

use crate::IoError;

/// Feature rows (and optionally labels) read from a delimited file.
///
/// Missing feature cells are stored as `NaN` until
/// [`Table::impute_column_means`] fills them in.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
    labels: Option<Vec<f64>>,
}

/// How many cells [`Table::impute_column_means`] replaced, per feature column.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputationReport {
    /// Replaced cell count for each feature column, in column order.
    pub imputed: Vec<usize>,
    /// Mean substituted into each column (computed over observed cells).
    pub column_means: Vec<f64>,
}

impl ImputationReport {
    /// Total number of replaced cells.
    #[must_use]
    pub fn total(&self) -> usize {
        self.imputed.iter().sum()
    }
}

impl Table {
    pub(crate) fn new(
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
        labels: Option<Vec<f64>>,
    ) -> Self {
        Self {
            feature_names,
            features,
            labels,
        }
    }

    /// Return the feature column names, in column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature rows.
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the labels, if the table was read with a label column.
    #[must_use]
    pub fn labels(&self) -> Option<&[f64]> {
        self.labels.as_deref()
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.features.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the number of `NaN` feature cells.
    #[must_use]
    pub fn n_missing(&self) -> usize {
        self.features
            .iter()
            .flatten()
            .filter(|v| v.is_nan())
            .count()
    }

    /// Consume the table, returning the feature rows and labels.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Vec<f64>>, Option<Vec<f64>>) {
        (self.features, self.labels)
    }

    /// Replace every missing feature cell with the mean of its column's
    /// observed cells.
    ///
    /// The table is left unchanged on error.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::AllMissingColumn`] when a column has no observed cell.
    pub fn impute_column_means(&mut self) -> Result<ImputationReport, IoError> {
        let n_cols = self.n_features();
        let mut sums = vec![0.0f64; n_cols];
        let mut observed = vec![0usize; n_cols];
        for row in &self.features {
            for (col, &value) in row.iter().enumerate() {
                if !value.is_nan() {
                    sums[col] += value;
                    observed[col] += 1;
                }
            }
        }

        let mut column_means = Vec::with_capacity(n_cols);
        for (col, (&sum, &count)) in sums.iter().zip(&observed).enumerate() {
            if count == 0 {
                return Err(IoError::AllMissingColumn {
                    column: self.feature_names[col].clone(),
                });
            }
            column_means.push(sum / count as f64);
        }

        let imputed: Vec<usize> = observed.iter().map(|&count| self.n_rows() - count).collect();
        for row in &mut self.features {
            for (value, &mean) in row.iter_mut().zip(&column_means) {
                if value.is_nan() {
                    *value = mean;
                }
            }
        }

        for (col, &count) in imputed.iter().enumerate() {
            if count > 0 {
                warn!(
                    column = %self.feature_names[col],
                    n_imputed = count,
                    mean = column_means[col],
                    "imputed missing values with column mean"
                );
            }
        }

        Ok(ImputationReport {
            imputed,
            column_means,
        })
    }

    /// Split into a head of `floor(n_rows * train_fraction)` rows and the
    /// remaining tail, preserving row order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidSplitFraction`] unless `train_fraction` is in
    /// `(0, 1)` and both parts end up non-empty.
    pub fn split(&self, train_fraction: f64) -> Result<(Table, Table), IoError> {
        let n_rows = self.n_rows();
        let invalid = || IoError::InvalidSplitFraction {
            fraction: train_fraction,
            n_rows,
        };
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(invalid());
        }
        let n_train = (n_rows as f64 * train_fraction).floor() as usize;
        if n_train == 0 || n_train >= n_rows {
            return Err(invalid());
        }

        debug!(n_train, n_test = n_rows - n_train, "split table");

        let part = |range: std::ops::Range<usize>| Table {
            feature_names: self.feature_names.clone(),
            features: self.features[range.clone()].to_vec(),
            labels: self.labels.as_ref().map(|labels| labels[range].to_vec()),
        };
        Ok((part(0..n_train), part(n_train..n_rows)))
    }
}
