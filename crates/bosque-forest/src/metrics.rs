//! Evaluation metrics over predicted and actual targets.

use crate::error::ForestError;

fn check_lengths(predicted: &[f64], actual: &[f64]) -> Result<(), ForestError> {
    if predicted.len() != actual.len() {
        return Err(ForestError::LabelCountMismatch {
            n_rows: predicted.len(),
            n_labels: actual.len(),
        });
    }
    if predicted.is_empty() {
        return Err(ForestError::EmptyDataset);
    }
    Ok(())
}

/// Fraction of positions where the predicted label equals the actual label.
///
/// # Errors
///
/// | Variant                             | When                     |
/// |-------------------------------------|--------------------------|
/// | [`ForestError::LabelCountMismatch`] | lengths differ           |
/// | [`ForestError::EmptyDataset`]       | both slices are empty    |
pub fn accuracy(predicted: &[f64], actual: &[f64]) -> Result<f64, ForestError> {
    check_lengths(predicted, actual)?;
    let correct = predicted
        .iter()
        .zip(actual)
        .filter(|&(p, a)| p == a)
        .count();
    Ok(correct as f64 / actual.len() as f64)
}

/// Mean of squared differences between predicted and actual values.
///
/// # Errors
///
/// | Variant                             | When                     |
/// |-------------------------------------|--------------------------|
/// | [`ForestError::LabelCountMismatch`] | lengths differ           |
/// | [`ForestError::EmptyDataset`]       | both slices are empty    |
pub fn mean_squared_error(predicted: &[f64], actual: &[f64]) -> Result<f64, ForestError> {
    check_lengths(predicted, actual)?;
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a) * (p - a))
        .sum();
    Ok(sum / actual.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn accuracy_counts_exact_matches() {
        let acc = accuracy(&[1.0, 0.0, 1.0, 1.0], &[1.0, 1.0, 1.0, 0.0]).unwrap();
        assert!((acc - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn mse_of_known_errors() {
        let mse = mean_squared_error(&[1.0, 2.0, 3.0], &[1.0, 4.0, 2.0]).unwrap();
        assert!((mse - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_and_mismatched_inputs_rejected() {
        assert_eq!(
            accuracy(&[], &[]).unwrap_err().kind(),
            ErrorKind::DimensionMismatch
        );
        let err = mean_squared_error(&[1.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::LabelCountMismatch { n_rows: 1, n_labels: 2 }
        ));
    }
}
