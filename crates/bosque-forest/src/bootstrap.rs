//! Bootstrap resampling for bagging.

use rand::Rng;

use crate::dataset::Dataset;

/// Row indices drawn with replacement for one ensemble member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSample {
    rows: Vec<usize>,
    out_of_bag: Vec<usize>,
}

impl BootstrapSample {
    /// Draw `size` row indices independently and uniformly from `[0, n_rows)`.
    ///
    /// Rows never drawn are recorded as out-of-bag, in ascending order.
    /// An empty population yields an empty sample.
    pub fn draw(n_rows: usize, size: usize, rng: &mut impl Rng) -> Self {
        if n_rows == 0 {
            return Self {
                rows: Vec::new(),
                out_of_bag: Vec::new(),
            };
        }

        let mut in_bag = vec![false; n_rows];
        let mut rows = Vec::with_capacity(size);
        for _ in 0..size {
            let idx = rng.gen_range(0..n_rows);
            rows.push(idx);
            in_bag[idx] = true;
        }
        let out_of_bag = (0..n_rows).filter(|&i| !in_bag[i]).collect();
        Self { rows, out_of_bag }
    }

    /// Return the drawn row indices in draw order (duplicates included).
    #[must_use]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Return the rows that were never drawn.
    #[must_use]
    pub fn out_of_bag(&self) -> &[usize] {
        &self.out_of_bag
    }

    /// Copy the drawn rows of `dataset` into a new dataset.
    #[must_use]
    pub fn materialize(&self, dataset: &Dataset) -> Dataset {
        dataset.select(&self.rows)
    }

    pub(crate) fn into_out_of_bag(self) -> Vec<usize> {
        self.out_of_bag
    }
}
