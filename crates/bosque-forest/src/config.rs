//! Configuration builder for random forest training.

use crate::dataset::{Dataset, Task};
use crate::error::ForestError;
use crate::forest::RandomForest;

/// Strategy for determining the number of features drawn at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Square root of total features, rounded up.
    Sqrt,
    /// Log base 2 of total features, rounded up (at least 1).
    Log2,
    /// A fraction of total features, rounded up (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// As many draws as there are features.
    All,
}

impl MaxFeatures {
    /// Resolve the strategy to a concrete draw count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMaxFeatures`] when the resolved count is
    /// outside `[1, n_features]`.
    pub fn resolve(self, n_features: usize) -> Result<usize, ForestError> {
        let resolved = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil().max(1.0) as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        if resolved == 0 || resolved > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features: resolved,
                n_features,
            });
        }
        Ok(resolved)
    }
}

/// Whether to compute out-of-bag evaluation during training.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    /// Score every row on the trees that did not see it.
    Enabled,
    /// Skip OOB evaluation.
    Disabled,
}

/// Configuration for random forest training.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter      | Default              |
/// |----------------|----------------------|
/// | `max_depth`    | 5                    |
/// | `max_features` | `Sqrt`               |
/// | `seed`         | 42                   |
/// | `oob_mode`     | `Disabled`           |
/// | `n_threads`    | `None` (global pool) |
#[derive(Debug, Clone, PartialEq)]
pub struct ForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) task: Task,
    pub(crate) max_depth: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) seed: u64,
    pub(crate) oob_mode: OobMode,
    pub(crate) n_threads: Option<usize>,
}

impl ForestConfig {
    /// Create a new config for `n_trees` trees solving `task`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize, task: Task) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            task,
            max_depth: 5,
            max_features: MaxFeatures::Sqrt,
            seed: 42,
            oob_mode: OobMode::Disabled,
            n_threads: None,
        })
    }

    // --- Setters ---

    /// Set the maximum number of edges on any root-to-leaf path.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the OOB evaluation mode.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Train inside a dedicated pool of `n_threads` workers.
    ///
    /// `None` uses the global rayon pool. Zero is rejected at training time.
    #[must_use]
    pub fn with_n_threads(mut self, n_threads: Option<usize>) -> Self {
        self.n_threads = n_threads;
        self
    }

    // --- Getters ---

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the learning task.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// Return the maximum depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the max features strategy.
    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the OOB evaluation mode.
    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Return the dedicated worker count, if any.
    #[must_use]
    pub fn n_threads(&self) -> Option<usize> {
        self.n_threads
    }

    /// Train a random forest on `dataset`.
    ///
    /// Shorthand for [`RandomForest::new`] followed by [`RandomForest::train`].
    ///
    /// # Errors
    ///
    /// See [`RandomForest::train`].
    pub fn fit(&self, dataset: &Dataset) -> Result<RandomForest, ForestError> {
        let mut forest = RandomForest::new(self.clone());
        forest.train(dataset)?;
        Ok(forest)
    }
}
