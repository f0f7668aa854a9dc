use rand::Rng;

use crate::dataset::Dataset;
use crate::impurity::Objective;
use crate::node::FeatureIndex;

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct Split {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Rows with `value < threshold` go left, the rest go right.
    pub(crate) threshold: f64,
    /// Negated weighted impurity of the partition (higher is better).
    pub(crate) score: f64,
    /// Row indices going to the left child.
    pub(crate) left_rows: Vec<usize>,
    /// Row indices going to the right child.
    pub(crate) right_rows: Vec<usize>,
}

/// Draw `max_features` feature indices uniformly from `[0, n_features)`.
///
/// Draws are independent, so the same feature may appear more than once and
/// a node can end up with fewer than `max_features` distinct candidates.
pub(crate) fn draw_candidate_features(
    n_features: usize,
    max_features: usize,
    rng: &mut impl Rng,
) -> Vec<FeatureIndex> {
    (0..max_features)
        .map(|_| FeatureIndex::new(rng.gen_range(0..n_features)))
        .collect()
}

/// Find the best `(feature, threshold)` among the candidate features.
///
/// For each candidate, sorts the `(value, row)` pairs and scans them
/// left-to-right, moving one row at a time from the right statistics to the
/// left statistics. Every boundary between two distinct adjacent values is
/// scored with its midpoint as threshold; repeated values are skipped since
/// their midpoint reproduces a partition already scored earlier in the scan.
///
/// Ties keep the first candidate in feature order, then threshold order.
///
/// Returns `None` when no candidate yields a partition with both sides
/// non-empty (no candidates, or every candidate constant over `rows`).
pub(crate) fn find_best_split<O: Objective>(
    dataset: &Dataset,
    objective: &O,
    rows: &[usize],
    candidates: &[FeatureIndex],
) -> Option<Split> {
    let n_rows = rows.len();
    if n_rows < 2 {
        return None;
    }

    let parent = objective.stats(rows);
    let mut best: Option<(FeatureIndex, f64, f64)> = None;

    for &feature in candidates {
        let column = dataset.column(feature.index());

        let mut sorted: Vec<(f64, usize)> = rows.iter().map(|&r| (column[r], r)).collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left = objective.empty();
        let mut right = parent.clone();

        for i in 0..(n_rows - 1) {
            let (value, row) = sorted[i];
            objective.add(&mut left, row);
            objective.remove(&mut right, row);

            let next = sorted[i + 1].0;
            if value == next {
                continue;
            }

            let score = objective.score(&left, &right);
            if best.is_none_or(|(_, _, best_score)| score > best_score) {
                best = Some((feature, midpoint(value, next), score));
            }
        }
    }

    let (feature, threshold, score) = best?;

    let column = dataset.column(feature.index());
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.iter().copied().partition(|&r| column[r] < threshold);

    Some(Split {
        feature,
        threshold,
        score,
        left_rows,
        right_rows,
    })
}

/// Midpoint of two distinct sorted values that still separates them.
fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = (lower + upper) / 2.0;
    if mid > lower && mid.is_finite() { mid } else { upper }
}
