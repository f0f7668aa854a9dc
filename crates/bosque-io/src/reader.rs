//! CSV table reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::table::Table;

/// Which header column holds the labels.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LabelColumn {
    Last,
    Named(String),
    Absent,
}

/// Reads a labelled feature table from a CSV file.
///
/// Expected CSV format:
/// - Header row required, one name per column
/// - `feature1,feature2,...,label` (label column last unless named)
/// - Every cell is a float or the missing token (feature columns only)
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | Header leaves no feature column |
/// | [`IoError::MissingLabelColumn`] | Named label column not in header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::InvalidValue`] | Cell is not the missing token nor a finite float |
/// | [`IoError::MissingLabel`] | Label cell holds the missing token |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
#[derive(Debug, Clone)]
pub struct TableReader {
    path: PathBuf,
    missing_token: String,
    label_column: LabelColumn,
}

impl TableReader {
    /// Create a new reader for the given CSV file path.
    ///
    /// Defaults: missing token `?`, labels in the last column.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            missing_token: "?".to_string(),
            label_column: LabelColumn::Last,
        }
    }

    /// Set the cell text that marks a missing feature value.
    #[must_use]
    pub fn with_missing_token(mut self, token: &str) -> Self {
        self.missing_token = token.to_string();
        self
    }

    /// Read labels from the column with this header name.
    #[must_use]
    pub fn with_label_column(mut self, name: &str) -> Self {
        self.label_column = LabelColumn::Named(name.to_string());
        self
    }

    /// Treat every column as a feature (for prediction inputs).
    #[must_use]
    pub fn without_labels(mut self) -> Self {
        self.label_column = LabelColumn::Absent;
        self
    }

    /// Read and validate the CSV file, returning a [`Table`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Table, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that short or long rows reach the
        // InconsistentRowLength check instead of failing inside the parser.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");

        let label_index = self.label_index(&header)?;
        let feature_cols: Vec<usize> = (0..expected_cols)
            .filter(|&col| Some(col) != label_index)
            .collect();
        if feature_cols.is_empty() {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
            });
        }
        let feature_names: Vec<String> = feature_cols
            .iter()
            .map(|&col| header[col].to_string())
            .collect();

        let mut features = Vec::new();
        let mut labels = label_index.map(|_| Vec::new());
        let mut n_missing = 0usize;

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            let mut row = Vec::with_capacity(feature_cols.len());
            for &col in &feature_cols {
                let raw = &record[col];
                if raw == self.missing_token {
                    n_missing += 1;
                    row.push(f64::NAN);
                } else {
                    row.push(self.parse_cell(raw, row_index, &header[col])?);
                }
            }
            features.push(row);

            if let (Some(col), Some(labels)) = (label_index, labels.as_mut()) {
                let raw = &record[col];
                if raw == self.missing_token {
                    return Err(IoError::MissingLabel {
                        path: self.path.clone(),
                        row_index,
                    });
                }
                labels.push(self.parse_cell(raw, row_index, &header[col])?);
            }
        }

        if features.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_rows = features.len(),
            n_features = feature_names.len(),
            n_missing,
            labelled = labels.is_some(),
            "table loaded"
        );

        Ok(Table::new(feature_names, features, labels))
    }

    fn label_index(&self, header: &csv::StringRecord) -> Result<Option<usize>, IoError> {
        match &self.label_column {
            LabelColumn::Last => Ok(header.len().checked_sub(1)),
            LabelColumn::Named(name) => header
                .iter()
                .position(|h| h == name)
                .map(Some)
                .ok_or_else(|| IoError::MissingLabelColumn {
                    path: self.path.clone(),
                    name: name.clone(),
                }),
            LabelColumn::Absent => Ok(None),
        }
    }

    fn parse_cell(&self, raw: &str, row_index: usize, column: &str) -> Result<f64, IoError> {
        let invalid = || IoError::InvalidValue {
            path: self.path.clone(),
            row_index,
            column: column.to_string(),
            raw: raw.to_string(),
        };
        let value: f64 = raw.parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        Ok(value)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}
