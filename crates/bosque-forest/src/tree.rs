use std::collections::VecDeque;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::dataset::{Dataset, LabelSet, Task};
use crate::error::ForestError;
use crate::impurity::{GiniObjective, Objective, VarianceObjective};
use crate::node::{ClassId, Impurity, Node, NodeIndex, Prediction};
use crate::split::{draw_candidate_features, find_best_split};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter      | Default               |
/// |----------------|-----------------------|
/// | `max_depth`    | 5                     |
/// | `max_features` | `None` (all features) |
/// | `seed`         | 42                    |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) task: Task,
    pub(crate) max_depth: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config for `task` with default values.
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self {
            task,
            max_depth: 5,
            max_features: None,
            seed: 42,
        }
    }

    /// Set the maximum number of edges on any root-to-leaf path.
    ///
    /// `0` produces a single leaf.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the number of features drawn (with replacement) at each split.
    ///
    /// `None` draws as many features as the dataset has.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
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

    /// Return the per-split feature draw count, if set.
    #[must_use]
    pub fn max_features(&self) -> Option<usize> {
        self.max_features
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a decision tree on every row of `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidMaxFeatures`] when `max_features` is
    /// outside `[1, n_features]`.
    #[instrument(skip_all, fields(task = %self.task, n_rows = dataset.n_rows()))]
    pub fn fit(&self, dataset: &Dataset) -> Result<DecisionTree, ForestError> {
        let n_features = dataset.n_features();
        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(ForestError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let targets = Targets::encode(self.task, dataset);
        let rows: Vec<usize> = (0..dataset.n_rows()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        grow_tree(
            dataset,
            &targets,
            &rows,
            self.max_depth,
            max_features,
            &mut rng,
        )
    }
}

/// Targets prepared once per dataset for the task at hand.
#[derive(Debug, Clone)]
pub(crate) enum Targets {
    /// Interned class labels.
    Classes { labels: LabelSet, ids: Vec<ClassId> },
    /// Regression targets are read straight from the dataset.
    Values,
}

impl Targets {
    pub(crate) fn encode(task: Task, dataset: &Dataset) -> Self {
        match task {
            Task::Classification => {
                let (labels, ids) = LabelSet::intern(dataset.targets());
                Targets::Classes { labels, ids }
            }
            Task::Regression => Targets::Values,
        }
    }

    pub(crate) fn labels(&self) -> Option<&LabelSet> {
        match self {
            Targets::Classes { labels, .. } => Some(labels),
            Targets::Values => None,
        }
    }
}

/// Grow one tree over `rows` (duplicates allowed) of `dataset`.
pub(crate) fn grow_tree(
    dataset: &Dataset,
    targets: &Targets,
    rows: &[usize],
    max_depth: usize,
    max_features: usize,
    rng: &mut impl Rng,
) -> Result<DecisionTree, ForestError> {
    let (nodes, task, labels) = match targets {
        Targets::Classes { labels, ids } => {
            let objective = GiniObjective {
                classes: ids,
                n_classes: labels.len(),
            };
            let nodes =
                TreeBuilder::new(dataset, &objective, max_features).run(rows, max_depth, rng)?;
            (nodes, Task::Classification, labels.clone())
        }
        Targets::Values => {
            let objective = VarianceObjective {
                values: dataset.targets(),
            };
            let nodes =
                TreeBuilder::new(dataset, &objective, max_features).run(rows, max_depth, rng)?;
            (nodes, Task::Regression, LabelSet::default())
        }
    };

    Ok(DecisionTree {
        nodes,
        n_features: dataset.n_features(),
        task,
        labels,
    })
}

/// Recursive arena builder for one tree.
struct TreeBuilder<'a, O> {
    dataset: &'a Dataset,
    objective: &'a O,
    max_features: usize,
    arena: Vec<Node>,
}

impl<'a, O: Objective> TreeBuilder<'a, O> {
    fn new(dataset: &'a Dataset, objective: &'a O, max_features: usize) -> Self {
        Self {
            dataset,
            objective,
            max_features,
            arena: Vec::new(),
        }
    }

    fn run(
        mut self,
        rows: &[usize],
        max_depth: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<Node>, ForestError> {
        let root = self.build(rows, max_depth, rng)?;
        debug!(
            criterion = ?self.objective.criterion(),
            root_index = root.index(),
            n_nodes = self.arena.len(),
            "decision tree built"
        );
        Ok(self.arena)
    }

    /// Build the subtree for `rows` with `depth` levels left.
    ///
    /// Returns the [`NodeIndex`] of the node just created in the arena.
    fn build(
        &mut self,
        rows: &[usize],
        depth: usize,
        rng: &mut impl Rng,
    ) -> Result<NodeIndex, ForestError> {
        if rows.is_empty() {
            return Err(ForestError::EmptyPartition { depth });
        }

        let n_samples = rows.len();
        let impurity = Impurity::new(self.objective.impurity(&self.objective.stats(rows)));

        if depth == 0
            || self.objective.targets_identical(rows)
            || self.dataset.rows_identical(rows)
        {
            return Ok(self.push_leaf(rows, impurity));
        }

        let candidates =
            draw_candidate_features(self.dataset.n_features(), self.max_features, rng);
        let Some(split) = find_best_split(self.dataset, self.objective, rows, &candidates) else {
            return Ok(self.push_leaf(rows, impurity));
        };

        // Reserve the parent slot so it precedes its children in the arena.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: Prediction::Value(0.0),
            impurity,
            n_samples,
        });

        let left = self.build(&split.left_rows, depth - 1, rng)?;
        let right = self.build(&split.right_rows, depth - 1, rng)?;

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
        };

        Ok(NodeIndex::new(node_idx))
    }

    fn push_leaf(&mut self, rows: &[usize], impurity: Impurity) -> NodeIndex {
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: self.objective.leaf(rows),
            impurity,
            n_samples: rows.len(),
        });
        NodeIndex::new(idx)
    }
}

/// A fitted CART decision tree.
///
/// Stored as an arena-based `Vec<Node>` with index references; the root is
/// index 0. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) task: Task,
    pub(crate) labels: LabelSet,
}

impl DecisionTree {
    /// Predict the label (classification) or value (regression) for one sample.
    ///
    /// Traverses from the root: at each `Split`, goes left when
    /// `sample[feature] < threshold`, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, ForestError> {
        self.check_width(sample)?;
        Ok(self.value_of(self.leaf_prediction(sample)))
    }

    /// Return the arena index of the leaf that `sample` lands in.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn leaf_index(&self, sample: &[f64]) -> Result<NodeIndex, ForestError> {
        self.check_width(sample)?;
        Ok(NodeIndex::new(self.traverse(sample).0))
    }

    /// Convert a leaf prediction into a raw label or value.
    #[must_use]
    pub fn value_of(&self, prediction: Prediction) -> f64 {
        match prediction {
            Prediction::Class(class) => self.labels.value(class),
            Prediction::Value(v) => v,
        }
    }

    /// Return the node arena (root at index 0).
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the learning task the tree was built for.
    #[must_use]
    pub fn task(&self) -> Task {
        self.task
    }

    /// Return the number of features the tree was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the total number of nodes in the tree (both splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum number of edges on any root-to-leaf path.
    ///
    /// A single-node tree (just a root leaf) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut queue = VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((node_idx, d)) = queue.pop_front() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    queue.push_back((left.index(), d + 1));
                    queue.push_back((right.index(), d + 1));
                }
            }
        }

        max_depth
    }

    /// Leaf prediction for a sample whose width was already checked.
    pub(crate) fn leaf_prediction(&self, sample: &[f64]) -> Prediction {
        self.traverse(sample).1
    }

    fn check_width(&self, sample: &[f64]) -> Result<(), ForestError> {
        if sample.len() != self.n_features {
            return Err(ForestError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        Ok(())
    }

    /// Walk from the root and return the leaf's arena index and prediction.
    fn traverse(&self, sample: &[f64]) -> (usize, Prediction) {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { prediction, .. } => return (idx, *prediction),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] < *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn dataset(features: Vec<Vec<f64>>, targets: Vec<f64>) -> Dataset {
        Dataset::new(features, targets).unwrap()
    }

    /// Rows of `dataset` that end in each leaf, keyed by leaf arena index.
    fn leaf_partitions(tree: &DecisionTree, dataset: &Dataset) -> Vec<(usize, Vec<usize>)> {
        let mut partitions: Vec<(usize, Vec<usize>)> = Vec::new();
        for (row, sample) in dataset.rows().iter().enumerate() {
            let leaf = tree.leaf_index(sample).unwrap().index();
            match partitions.iter_mut().find(|(idx, _)| *idx == leaf) {
                Some((_, rows)) => rows.push(row),
                None => partitions.push((leaf, vec![row])),
            }
        }
        partitions
    }

    #[test]
    fn pure_dataset_single_leaf() {
        let ds = dataset(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], vec![7.0; 3]);
        let tree = DecisionTreeConfig::new(Task::Classification).fit(&ds).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict(&[2.0, 3.0]).unwrap(), 7.0);
    }

    #[test]
    fn identical_rows_become_leaf() {
        let ds = dataset(vec![vec![1.0, 1.0]; 3], vec![0.0, 1.0, 1.0]);
        let tree = DecisionTreeConfig::new(Task::Classification).fit(&ds).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[1.0, 1.0]).unwrap(), 1.0);
    }

    #[test]
    fn zero_depth_is_majority_leaf() {
        let ds = dataset(
            vec![vec![0.0], vec![1.0], vec![2.0]],
            vec![4.0, 9.0, 9.0],
        );
        let tree = DecisionTreeConfig::new(Task::Classification)
            .with_max_depth(0)
            .fit(&ds)
            .unwrap();
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict(&[0.0]).unwrap(), 9.0);
    }

    #[test]
    fn linearly_separable_correct_split() {
        let ds = dataset(
            vec![
                vec![1.0, 0.0],
                vec![2.0, 0.0],
                vec![3.0, 0.0],
                vec![10.0, 5.0],
                vec![11.0, 5.0],
                vec![12.0, 5.0],
            ],
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        );
        let tree = DecisionTreeConfig::new(Task::Classification).fit(&ds).unwrap();
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.predict(&[2.0, 0.0]).unwrap(), 0.0);
        assert_eq!(tree.predict(&[11.0, 5.0]).unwrap(), 1.0);
    }

    #[test]
    fn three_classes_need_two_levels() {
        let ds = dataset(
            (1..=6).map(|v| vec![f64::from(v)]).collect(),
            vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0],
        );
        let tree = DecisionTreeConfig::new(Task::Classification).fit(&ds).unwrap();
        assert_eq!(tree.depth(), 2);
        // 2.5 and 4.5 score the same at the root; the lower threshold wins.
        let Node::Split { threshold, .. } = tree.nodes()[0] else {
            panic!("root should split");
        };
        assert!((threshold - 2.5).abs() < f64::EPSILON);
        for (sample, label) in ds.rows().iter().zip(ds.targets()) {
            assert_eq!(tree.predict(sample).unwrap(), *label);
        }
    }

    #[test]
    fn regression_tree_recovers_ordering() {
        let ds = dataset(
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
            vec![1.0, 2.0, 3.0, 4.0],
        );
        let tree = DecisionTreeConfig::new(Task::Regression)
            .with_max_depth(2)
            .with_max_features(Some(1))
            .fit(&ds)
            .unwrap();
        assert!((tree.predict(&[1.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((tree.predict(&[4.0]).unwrap() - 4.0).abs() < 1e-12);
        assert!(tree.predict(&[2.0]).unwrap() < tree.predict(&[3.0]).unwrap());
    }

    #[test]
    fn depth_bound_holds() {
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 7) as f64]).collect();
        let targets: Vec<f64> = (0..40).map(|i| (i % 3) as f64).collect();
        let ds = dataset(features, targets);
        for max_depth in 0..5 {
            let tree = DecisionTreeConfig::new(Task::Classification)
                .with_max_depth(max_depth)
                .fit(&ds)
                .unwrap();
            assert!(tree.depth() <= max_depth, "depth {} > {max_depth}", tree.depth());
        }
    }

    #[test]
    fn classification_leaves_contain_partition_labels() {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![(i * 7 % 11) as f64]).collect();
        let targets: Vec<f64> = (0..30).map(|i| (i % 4) as f64).collect();
        let ds = dataset(features, targets);
        let tree = DecisionTreeConfig::new(Task::Classification)
            .with_max_depth(2)
            .fit(&ds)
            .unwrap();
        for (leaf, rows) in leaf_partitions(&tree, &ds) {
            let Node::Leaf { prediction, .. } = tree.nodes()[leaf] else {
                panic!("leaf_index returned a split node");
            };
            let value = tree.value_of(prediction);
            assert!(rows.iter().any(|&r| ds.targets()[r] == value));
        }
    }

    #[test]
    fn regression_leaves_within_partition_range() {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![(i * 7 % 11) as f64]).collect();
        let targets: Vec<f64> = (0..30).map(|i| (i as f64).sin() * 10.0).collect();
        let ds = dataset(features, targets);
        let tree = DecisionTreeConfig::new(Task::Regression)
            .with_max_depth(3)
            .fit(&ds)
            .unwrap();
        for (leaf, rows) in leaf_partitions(&tree, &ds) {
            let Node::Leaf { prediction: Prediction::Value(v), .. } = tree.nodes()[leaf] else {
                panic!("expected a regression leaf");
            };
            let min = rows.iter().map(|&r| ds.targets()[r]).fold(f64::INFINITY, f64::min);
            let max = rows.iter().map(|&r| ds.targets()[r]).fold(f64::NEG_INFINITY, f64::max);
            assert!(v >= min && v <= max, "{v} outside [{min}, {max}]");
        }
    }

    #[test]
    fn split_nodes_always_have_two_children() {
        let features: Vec<Vec<f64>> = (0..25).map(|i| vec![i as f64, (25 - i) as f64]).collect();
        let targets: Vec<f64> = (0..25).map(|i| (i / 5) as f64).collect();
        let ds = dataset(features, targets);
        let tree = DecisionTreeConfig::new(Task::Classification).fit(&ds).unwrap();
        for node in tree.nodes() {
            if let Node::Split { left, right, n_samples, .. } = node {
                assert_ne!(left, right);
                let children = tree.nodes()[left.index()].n_samples()
                    + tree.nodes()[right.index()].n_samples();
                assert_eq!(children, *n_samples);
            }
        }
    }

    #[test]
    fn deterministic_with_same_seed() {
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i * 3 % 5) as f64]).collect();
        let targets: Vec<f64> = (0..20).map(|i| (i % 2) as f64).collect();
        let ds = dataset(features, targets);
        let config = DecisionTreeConfig::new(Task::Classification)
            .with_max_features(Some(1))
            .with_seed(123);
        assert_eq!(config.fit(&ds).unwrap(), config.fit(&ds).unwrap());
    }

    #[test]
    fn prediction_feature_mismatch() {
        let ds = dataset(vec![vec![1.0, 2.0], vec![3.0, 4.0]], vec![0.0, 1.0]);
        let tree = DecisionTreeConfig::new(Task::Classification).fit(&ds).unwrap();
        let err = tree.predict(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            ForestError::PredictionFeatureMismatch { expected: 2, got: 1 }
        ));
    }

    #[test]
    fn invalid_max_features() {
        let ds = dataset(vec![vec![1.0], vec![2.0]], vec![0.0, 1.0]);
        for max_features in [0, 2] {
            let err = DecisionTreeConfig::new(Task::Classification)
                .with_max_features(Some(max_features))
                .fit(&ds)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
        }
    }

    #[test]
    fn empty_partition_fails_fast() {
        let ds = dataset(vec![vec![1.0], vec![2.0]], vec![0.0, 1.0]);
        let targets = Targets::encode(Task::Classification, &ds);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = grow_tree(&ds, &targets, &[], 3, 1, &mut rng).unwrap_err();
        assert!(matches!(err, ForestError::EmptyPartition { depth: 3 }));
    }
}
