//! Split quality criteria.
//!
//! [`Criterion`] scores raw label slices; tree growth reaches the same
//! statistics incrementally through the crate-private `Objective` trait.

use crate::dataset::{LabelSet, Task};
use crate::node::{ClassId, Impurity, Prediction};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity: 1 - Σ(p_c²). Used for classification.
    Gini,
    /// Variance about the mean (mean squared error). Used for regression.
    Variance,
}

impl Criterion {
    /// Return the criterion used for `task`.
    #[must_use]
    pub fn for_task(task: Task) -> Self {
        match task {
            Task::Classification => Criterion::Gini,
            Task::Regression => Criterion::Variance,
        }
    }

    /// Compute the impurity of a set of raw labels.
    ///
    /// Returns zero for an empty set.
    #[must_use]
    pub fn impurity(&self, labels: &[f64]) -> Impurity {
        if labels.is_empty() {
            return Impurity::new(0.0);
        }
        let rows: Vec<usize> = (0..labels.len()).collect();
        let value = match self {
            Criterion::Gini => {
                let (set, ids) = LabelSet::intern(labels);
                let objective = GiniObjective {
                    classes: &ids,
                    n_classes: set.len(),
                };
                objective.impurity(&objective.stats(&rows))
            }
            Criterion::Variance => {
                let objective = VarianceObjective { values: labels };
                objective.impurity(&objective.stats(&rows))
            }
        };
        Impurity::new(value)
    }

    /// Score a candidate partition; higher is better.
    ///
    /// The score is the negated impurity of both sides, each weighted by its
    /// share of the rows.
    #[must_use]
    pub fn score(&self, left: &[f64], right: &[f64]) -> f64 {
        if left.is_empty() && right.is_empty() {
            return 0.0;
        }
        let labels: Vec<f64> = left.iter().chain(right).copied().collect();
        let rows: Vec<usize> = (0..labels.len()).collect();
        let (left_rows, right_rows) = rows.split_at(left.len());
        match self {
            Criterion::Gini => {
                let (set, ids) = LabelSet::intern(&labels);
                let objective = GiniObjective {
                    classes: &ids,
                    n_classes: set.len(),
                };
                objective.score(&objective.stats(left_rows), &objective.stats(right_rows))
            }
            Criterion::Variance => {
                let objective = VarianceObjective { values: &labels };
                objective.score(&objective.stats(left_rows), &objective.stats(right_rows))
            }
        }
    }
}

pub(crate) fn gini(class_counts: &[usize], n_samples: usize) -> f64 {
    if n_samples == 0 {
        return 0.0;
    }
    let n = n_samples as f64;
    let sum_sq: f64 = class_counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum();
    1.0 - sum_sq
}

/// Population variance from sums of deviations taken about a fixed shift.
///
/// The shift must lie near the data: the result is `E[d²] - E[d]²`, which
/// loses precision as the mean deviation grows against the spread.
pub(crate) fn variance(n_samples: usize, sum: f64, sum_sq: f64) -> f64 {
    if n_samples == 0 {
        return 0.0;
    }
    let n = n_samples as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

/// Incremental node statistics for one criterion over rows of a dataset.
///
/// The split search moves rows one at a time from the right side to the
/// left side, so every threshold is scored without re-scanning the rows.
pub(crate) trait Objective: Sync {
    type Stats: Clone;

    fn criterion(&self) -> Criterion;

    fn empty(&self) -> Self::Stats;

    fn add(&self, stats: &mut Self::Stats, row: usize);

    fn remove(&self, stats: &mut Self::Stats, row: usize);

    fn count(&self, stats: &Self::Stats) -> usize;

    fn impurity(&self, stats: &Self::Stats) -> f64;

    /// `true` when every referenced row carries the same target.
    fn targets_identical(&self, rows: &[usize]) -> bool;

    /// Leaf value for a non-empty set of rows.
    fn leaf(&self, rows: &[usize]) -> Prediction;

    fn stats(&self, rows: &[usize]) -> Self::Stats {
        let mut stats = self.empty();
        for &row in rows {
            self.add(&mut stats, row);
        }
        stats
    }

    /// Negated size-weighted impurity of a left/right pair.
    fn score(&self, left: &Self::Stats, right: &Self::Stats) -> f64 {
        let n_left = self.count(left) as f64;
        let n_right = self.count(right) as f64;
        let n = n_left + n_right;
        -((n_left / n) * self.impurity(left) + (n_right / n) * self.impurity(right))
    }
}

/// Gini objective over interned class ids.
pub(crate) struct GiniObjective<'a> {
    pub(crate) classes: &'a [ClassId],
    pub(crate) n_classes: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct ClassCounts {
    counts: Vec<usize>,
    n: usize,
}

impl Objective for GiniObjective<'_> {
    type Stats = ClassCounts;

    fn criterion(&self) -> Criterion {
        Criterion::Gini
    }

    fn empty(&self) -> ClassCounts {
        ClassCounts {
            counts: vec![0; self.n_classes],
            n: 0,
        }
    }

    fn add(&self, stats: &mut ClassCounts, row: usize) {
        stats.counts[self.classes[row].index()] += 1;
        stats.n += 1;
    }

    fn remove(&self, stats: &mut ClassCounts, row: usize) {
        stats.counts[self.classes[row].index()] -= 1;
        stats.n -= 1;
    }

    fn count(&self, stats: &ClassCounts) -> usize {
        stats.n
    }

    fn impurity(&self, stats: &ClassCounts) -> f64 {
        gini(&stats.counts, stats.n)
    }

    fn targets_identical(&self, rows: &[usize]) -> bool {
        rows.split_first().is_none_or(|(&first, rest)| {
            let class = self.classes[first];
            rest.iter().all(|&r| self.classes[r] == class)
        })
    }

    /// Most frequent class; ties go to the class seen first in row order.
    fn leaf(&self, rows: &[usize]) -> Prediction {
        let mut counts = vec![0usize; self.n_classes];
        let mut first_seen = Vec::new();
        for &row in rows {
            let class = self.classes[row].index();
            if counts[class] == 0 {
                first_seen.push(class);
            }
            counts[class] += 1;
        }

        let mut best: Option<(usize, usize)> = None;
        for class in first_seen {
            if best.is_none_or(|(_, count)| counts[class] > count) {
                best = Some((class, counts[class]));
            }
        }
        Prediction::Class(ClassId::new(best.map_or(0, |(class, _)| class)))
    }
}

/// Variance objective over continuous targets.
pub(crate) struct VarianceObjective<'a> {
    pub(crate) values: &'a [f64],
}

/// Running moments of targets, as deviations from `shift`.
///
/// `shift` is the first target added to an empty accumulator; a right-hand
/// side cloned from its parent keeps the parent's shift.
#[derive(Debug, Clone)]
pub(crate) struct Moments {
    n: usize,
    shift: f64,
    sum: f64,
    sum_sq: f64,
}

impl Objective for VarianceObjective<'_> {
    type Stats = Moments;

    fn criterion(&self) -> Criterion {
        Criterion::Variance
    }

    fn empty(&self) -> Moments {
        Moments {
            n: 0,
            shift: 0.0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    fn add(&self, stats: &mut Moments, row: usize) {
        let v = self.values[row];
        if stats.n == 0 {
            stats.shift = v;
            stats.sum = 0.0;
            stats.sum_sq = 0.0;
        }
        let d = v - stats.shift;
        stats.n += 1;
        stats.sum += d;
        stats.sum_sq += d * d;
    }

    fn remove(&self, stats: &mut Moments, row: usize) {
        let d = self.values[row] - stats.shift;
        stats.n -= 1;
        stats.sum -= d;
        stats.sum_sq -= d * d;
    }

    fn count(&self, stats: &Moments) -> usize {
        stats.n
    }

    fn impurity(&self, stats: &Moments) -> f64 {
        variance(stats.n, stats.sum, stats.sum_sq)
    }

    fn targets_identical(&self, rows: &[usize]) -> bool {
        rows.split_first().is_none_or(|(&first, rest)| {
            let v = self.values[first];
            rest.iter().all(|&r| self.values[r] == v)
        })
    }

    /// Arithmetic mean, clamped to the observed range against rounding drift.
    fn leaf(&self, rows: &[usize]) -> Prediction {
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &row in rows {
            let v = self.values[row];
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        let mean = sum / rows.len() as f64;
        Prediction::Value(mean.clamp(min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gini_pure() {
        assert!((gini(&[10, 0, 0], 10) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_binary_balanced() {
        assert!((gini(&[5, 5], 10) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_three_class_uniform() {
        let imp = gini(&[100, 100, 100], 300);
        assert!((imp - (1.0 - 3.0 * (1.0 / 3.0_f64).powi(2))).abs() < 1e-10);
    }

    #[test]
    fn variance_of_constant_is_zero() {
        let imp = Criterion::Variance.impurity(&[2.5, 2.5, 2.5]);
        assert!(imp.value().abs() < 1e-12);
    }

    #[test]
    fn variance_matches_definition() {
        // mean 2.5, squared deviations 2.25 + 0.25 + 0.25 + 2.25 = 5, / 4
        let imp = Criterion::Variance.impurity(&[1.0, 2.0, 3.0, 4.0]);
        assert!((imp.value() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn gini_on_raw_labels() {
        let imp = Criterion::Gini.impurity(&[0.0, 1.0, 1.0, 1.0]);
        // 1 - (0.25² + 0.75²)
        assert!((imp.value() - 0.375).abs() < 1e-12);
    }

    #[test]
    fn empty_impurity_is_zero() {
        assert_eq!(Criterion::Gini.impurity(&[]).value(), 0.0);
        assert_eq!(Criterion::Variance.impurity(&[]).value(), 0.0);
    }

    #[test]
    fn pure_partition_scores_highest() {
        let pure = Criterion::Gini.score(&[0.0, 0.0], &[1.0, 1.0]);
        let mixed = Criterion::Gini.score(&[0.0, 1.0], &[0.0, 1.0]);
        assert_eq!(pure, 0.0);
        assert!(pure > mixed);
        assert!((mixed + 0.5).abs() < 1e-12);
    }

    #[test]
    fn criterion_for_task() {
        assert_eq!(Criterion::for_task(Task::Classification), Criterion::Gini);
        assert_eq!(Criterion::for_task(Task::Regression), Criterion::Variance);
    }

    #[test]
    fn incremental_gini_matches_direct_score() {
        let labels = [0.0, 1.0, 1.0, 0.0, 2.0];
        let (set, ids) = LabelSet::intern(&labels);
        let objective = GiniObjective {
            classes: &ids,
            n_classes: set.len(),
        };
        let mut left = objective.empty();
        let mut right = objective.stats(&[0, 1, 2, 3, 4]);
        for row in [0, 1] {
            objective.add(&mut left, row);
            objective.remove(&mut right, row);
        }
        let expected = Criterion::Gini.score(&labels[..2], &labels[2..]);
        assert!((objective.score(&left, &right) - expected).abs() < 1e-12);
    }

    #[test]
    fn incremental_variance_matches_direct_score() {
        let values = [1.0, 2.0, 4.0, 8.0];
        let objective = VarianceObjective { values: &values };
        let left = objective.stats(&[0]);
        let right = objective.stats(&[1, 2, 3]);
        let expected = Criterion::Variance.score(&values[..1], &values[1..]);
        assert!((objective.score(&left, &right) - expected).abs() < 1e-9);
    }

    #[test]
    fn majority_leaf_breaks_ties_by_row_order() {
        let labels = [5.0, 3.0, 3.0, 5.0];
        let (set, ids) = LabelSet::intern(&labels);
        let objective = GiniObjective {
            classes: &ids,
            n_classes: set.len(),
        };
        // rows 2, 0, 1, 3: class of 3.0 is seen first, counts tie at 2.
        let Prediction::Class(class) = objective.leaf(&[2, 0, 1, 3]) else {
            panic!("expected a class prediction");
        };
        assert_eq!(set.value(class), 3.0);

        let Prediction::Class(class) = objective.leaf(&[0, 1, 2]) else {
            panic!("expected a class prediction");
        };
        assert_eq!(set.value(class), 3.0);
    }

    #[test]
    fn variance_survives_large_offset() {
        let labels = [1e9, 1e9 + 1.0, 1e9 + 2.0, 1e9 + 3.0];
        let imp = Criterion::Variance.impurity(&labels);
        assert!((imp.value() - 1.25).abs() < 1e-9);

        let score = Criterion::Variance.score(&labels[..2], &labels[2..]);
        assert!((score + 0.25).abs() < 1e-9);
    }

    #[test]
    fn incremental_variance_with_offset_matches_small_targets() {
        let offset: Vec<f64> = [0.0, 1.0, 2.0, 3.0].iter().map(|v| 1e9 + v).collect();
        let objective = VarianceObjective { values: &offset };
        let mut left = objective.empty();
        let mut right = objective.stats(&[0, 1, 2, 3]);
        for row in [0, 1] {
            objective.add(&mut left, row);
            objective.remove(&mut right, row);
        }
        assert!((objective.score(&left, &right) + 0.25).abs() < 1e-9);
    }

    #[test]
    fn mean_leaf_stays_in_range() {
        let values = [0.1, 0.1, 0.1];
        let objective = VarianceObjective { values: &values };
        let Prediction::Value(v) = objective.leaf(&[0, 1, 2]) else {
            panic!("expected a value prediction");
        };
        assert!(v <= 0.1 && v >= 0.1);
    }
}
