//! Random forests for classification and regression: train, predict, evaluate.
//!
//! Grows CART decision trees on bootstrap samples with per-node random
//! feature subsampling, builds the trees in parallel via rayon, and
//! aggregates them by majority vote (classification) or mean (regression).
//! Out-of-bag scoring and simple evaluation metrics are included.

mod bootstrap;
mod cancel;
mod config;
mod dataset;
mod error;
mod forest;
mod impurity;
mod metrics;
mod node;
mod oob;
mod predict;
mod split;
mod tree;

pub use bootstrap::BootstrapSample;
pub use cancel::CancelToken;
pub use config::{ForestConfig, MaxFeatures, OobMode};
pub use dataset::{Dataset, LabelSet, Task};
pub use error::{ErrorKind, ForestError};
pub use forest::RandomForest;
pub use impurity::Criterion;
pub use metrics::{accuracy, mean_squared_error};
pub use node::{ClassId, FeatureIndex, Impurity, Node, NodeIndex, Prediction};
pub use oob::{OobMetric, OobScore};
pub use tree::{DecisionTree, DecisionTreeConfig};
