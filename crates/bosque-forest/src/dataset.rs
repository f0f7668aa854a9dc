//! Validated training data and label interning.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ForestError;
use crate::node::ClassId;

/// Learning task: decides the split criterion and the leaf/ensemble aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Discrete labels, Gini impurity, majority vote.
    Classification,
    /// Continuous targets, variance reduction, mean aggregation.
    Regression,
}

impl FromStr for Task {
    type Err = ForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "classification" => Ok(Task::Classification),
            "regression" => Ok(Task::Regression),
            other => Err(ForestError::UnsupportedTask {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Classification => f.write_str("classification"),
            Task::Regression => f.write_str("regression"),
        }
    }
}

/// Canonical hash key for a label value (`-0.0` and `0.0` are the same label).
fn label_key(value: f64) -> u64 {
    (value + 0.0).to_bits()
}

/// The distinct labels of a classification dataset, in first-appearance order.
///
/// [`ClassId`]s index into this set, so scanning ids in ascending order
/// visits classes in the order they first appeared in the training labels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelSet {
    values: Vec<f64>,
    lookup: HashMap<u64, ClassId>,
}

impl LabelSet {
    /// Intern `labels`, returning the set and the class id of every label.
    pub(crate) fn intern(labels: &[f64]) -> (Self, Vec<ClassId>) {
        let mut values = Vec::new();
        let mut lookup = HashMap::new();
        let ids = labels
            .iter()
            .map(|&label| {
                *lookup.entry(label_key(label)).or_insert_with(|| {
                    values.push(label);
                    ClassId::new(values.len() - 1)
                })
            })
            .collect();
        (Self { values, lookup }, ids)
    }

    /// Return the raw label value of a class.
    #[must_use]
    pub fn value(&self, class: ClassId) -> f64 {
        self.values[class.index()]
    }

    /// Return the class id of a raw label value, if it was seen in training.
    #[must_use]
    pub fn id_of(&self, value: f64) -> Option<ClassId> {
        self.lookup.get(&label_key(value)).copied()
    }

    /// Return the label values in class-id order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Return the number of distinct classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` when no labels were interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An immutable, validated feature matrix with one target per row.
///
/// Invariants (checked by [`Dataset::new`]): at least one row and one
/// feature, every row has the same width, one target per row, and every
/// feature value and target is finite.
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<Vec<f64>>,
    /// Column-major copy of `rows` for split search: `columns[feature][row]`.
    columns: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

impl Dataset {
    /// Validate and wrap a row-major feature matrix and its targets.
    ///
    /// # Errors
    ///
    /// | Variant                               | When                                   |
    /// |---------------------------------------|----------------------------------------|
    /// | [`ForestError::EmptyDataset`]         | `features` is empty                    |
    /// | [`ForestError::ZeroFeatures`]         | rows have zero feature columns         |
    /// | [`ForestError::RaggedRow`]            | rows have inconsistent lengths         |
    /// | [`ForestError::LabelCountMismatch`]   | `targets.len() != features.len()`      |
    /// | [`ForestError::NonFiniteValue`]       | a feature value is NaN or infinite     |
    /// | [`ForestError::NonFiniteLabel`]       | a target is NaN or infinite            |
    pub fn new(features: Vec<Vec<f64>>, targets: Vec<f64>) -> Result<Self, ForestError> {
        let Some(first) = features.first() else {
            return Err(ForestError::EmptyDataset);
        };
        let n_features = first.len();
        if n_features == 0 {
            return Err(ForestError::ZeroFeatures);
        }

        for (row_index, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(ForestError::RaggedRow {
                    expected: n_features,
                    got: row.len(),
                    row_index,
                });
            }
        }

        if targets.len() != features.len() {
            return Err(ForestError::LabelCountMismatch {
                n_rows: features.len(),
                n_labels: targets.len(),
            });
        }

        for (row_index, row) in features.iter().enumerate() {
            if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(ForestError::NonFiniteValue {
                    row_index,
                    feature_index,
                });
            }
        }

        if let Some(row_index) = targets.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFiniteLabel { row_index });
        }

        let columns = (0..n_features)
            .map(|f| features.iter().map(|row| row[f]).collect())
            .collect();

        Ok(Self {
            rows: features,
            columns,
            targets,
        })
    }

    /// Return the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Return a single feature row.
    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        &self.rows[index]
    }

    /// Return every value of one feature column, in row order.
    #[must_use]
    pub fn column(&self, feature: usize) -> &[f64] {
        &self.columns[feature]
    }

    /// Return the targets (labels or regression values).
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Copy the given rows (duplicates allowed) into a new dataset.
    pub(crate) fn select(&self, rows: &[usize]) -> Self {
        let features: Vec<Vec<f64>> = rows.iter().map(|&r| self.rows[r].clone()).collect();
        let targets = rows.iter().map(|&r| self.targets[r]).collect();
        let columns = (0..self.n_features())
            .map(|f| rows.iter().map(|&r| self.columns[f][r]).collect())
            .collect();
        Self {
            rows: features,
            columns,
            targets,
        }
    }

    /// Return `true` when every referenced row has identical feature values.
    pub(crate) fn rows_identical(&self, rows: &[usize]) -> bool {
        let Some((&first, rest)) = rows.split_first() else {
            return true;
        };
        self.columns.iter().all(|col| {
            let v = col[first];
            rest.iter().all(|&r| col[r] == v)
        })
    }
}
