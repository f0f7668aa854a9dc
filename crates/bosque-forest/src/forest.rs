//! Random forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::bootstrap::BootstrapSample;
use crate::cancel::CancelToken;
use crate::config::{ForestConfig, OobMode};
use crate::dataset::{Dataset, LabelSet};
use crate::error::ForestError;
use crate::impurity::Criterion;
use crate::oob::{OobScore, compute_oob};
use crate::tree::{DecisionTree, Targets, grow_tree};

/// A bagged ensemble of decision trees.
///
/// Created untrained by [`RandomForest::new`]; [`RandomForest::train`]
/// replaces the whole ensemble on success and leaves it untouched on failure.
#[derive(Debug, Clone)]
pub struct RandomForest {
    pub(crate) config: ForestConfig,
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) labels: LabelSet,
    pub(crate) oob_score: Option<OobScore>,
}

impl RandomForest {
    /// Create an untrained forest.
    #[must_use]
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
            labels: LabelSet::default(),
            oob_score: None,
        }
    }

    /// Train the ensemble on `dataset`.
    ///
    /// # Errors
    ///
    /// See [`RandomForest::train_with_cancel`].
    pub fn train(&mut self, dataset: &Dataset) -> Result<(), ForestError> {
        self.train_with_cancel(dataset, &CancelToken::new())
    }

    /// Train the ensemble, giving up once `cancel` trips.
    ///
    /// Builds `n_trees` independent trees, each on its own bootstrap sample
    /// of `dataset.n_rows()` rows.
    ///
    /// # Errors
    ///
    /// | Variant                              | When                                             |
    /// |--------------------------------------|--------------------------------------------------|
    /// | [`ForestError::InvalidMaxFeatures`]  | resolved max_features is outside [1, n_features] |
    /// | [`ForestError::InvalidThreadCount`]  | `n_threads` is `Some(0)`                         |
    /// | [`ForestError::ThreadPool`]          | the dedicated pool cannot be built               |
    /// | [`ForestError::Cancelled`]           | `cancel` tripped before every tree started       |
    #[instrument(skip_all, fields(n_trees = self.config.n_trees, task = %self.config.task, n_rows = dataset.n_rows()))]
    pub fn train_with_cancel(
        &mut self,
        dataset: &Dataset,
        cancel: &CancelToken,
    ) -> Result<(), ForestError> {
        let config = &self.config;
        let n_rows = dataset.n_rows();
        let n_features = dataset.n_features();
        let max_features = config.max_features.resolve(n_features)?;

        let pool = match config.n_threads {
            Some(0) => return Err(ForestError::InvalidThreadCount { n_threads: 0 }),
            Some(n_threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n_threads)
                    .build()
                    .map_err(|source| ForestError::ThreadPool { source })?,
            ),
            None => None,
        };

        let targets = Targets::encode(config.task, dataset);

        info!(
            n_rows,
            n_features,
            n_classes = targets.labels().map(LabelSet::len),
            criterion = ?Criterion::for_task(config.task),
            max_features,
            max_depth = config.max_depth,
            "training random forest"
        );

        // Per-tree seeds come from one master stream so results do not depend
        // on which worker builds which tree.
        let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
        let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

        let n_trees = config.n_trees;
        let max_depth = config.max_depth;
        let targets_ref = &targets;

        let grow_all = move || -> Result<Vec<(DecisionTree, Vec<usize>)>, ForestError> {
            tree_seeds
                .into_par_iter()
                .enumerate()
                .map(|(tree_idx, seed)| {
                    if cancel.is_cancelled() {
                        return Err(ForestError::Cancelled { n_trees });
                    }
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    let sample = BootstrapSample::draw(n_rows, n_rows, &mut rng);
                    let tree = grow_tree(
                        dataset,
                        targets_ref,
                        sample.rows(),
                        max_depth,
                        max_features,
                        &mut rng,
                    )?;
                    debug!(
                        tree_idx,
                        n_nodes = tree.n_nodes(),
                        depth = tree.depth(),
                        n_oob = sample.out_of_bag().len(),
                        "tree built"
                    );
                    Ok((tree, sample.into_out_of_bag()))
                })
                .collect()
        };

        let grown = match &pool {
            Some(pool) => pool.install(grow_all),
            None => grow_all(),
        }?;

        let mut trees = Vec::with_capacity(n_trees);
        let mut oob_rows_per_tree = Vec::with_capacity(n_trees);
        for (tree, oob) in grown {
            trees.push(tree);
            oob_rows_per_tree.push(oob);
        }

        let labels = targets.labels().cloned().unwrap_or_default();

        let oob_score = match config.oob_mode {
            OobMode::Enabled => compute_oob(
                &trees,
                dataset,
                config.task,
                &labels,
                &oob_rows_per_tree,
            ),
            OobMode::Disabled => None,
        };

        info!(
            n_trees = trees.len(),
            oob_score = oob_score.as_ref().map(|s| s.value),
            "random forest training complete"
        );

        self.trees = trees;
        self.n_features = n_features;
        self.labels = labels;
        self.oob_score = oob_score;
        Ok(())
    }
}
