//! Random-forest classification over windowed sensor features.

use super::tree::{DecisionTree, Node, TreeParams};
use super::Model;
use crate::error::{Error, Result};
use crate::parsing::{Dataset, NUM_CLASSES};
use crate::vector::{add_vectors, mul_vector_number};
use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Forest hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// An ensemble of CART trees trained on bootstrap samples.
///
/// Prediction averages the per-tree leaf distributions with the same vector
/// kernels the exported C code uses.
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    feature_names: Vec<String>,
    num_features: usize,
    num_classes: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams) -> RandomForest {
        RandomForest {
            params,
            trees: Vec::new(),
            feature_names: Vec::new(),
            num_features: 0,
            num_classes: NUM_CLASSES,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Mean-decrease-in-impurity importances paired with feature names,
    /// sorted descending.
    pub fn feature_importances(&self) -> Result<Vec<(String, f64)>> {
        if !self.is_fitted() {
            return Err(Error::NotFitted);
        }

        let mut total = vec![0f64; self.num_features];

        // Normalize per tree, sum over the forest, then normalize the sum so
        // it is 1 even when some trees never split.
        for tree in &self.trees {
            let sum: f64 = tree.importances().iter().sum();
            if sum > 0.0 {
                for (acc, &imp) in total.iter_mut().zip(tree.importances()) {
                    *acc += imp / sum;
                }
            }
        }

        let mut scaled = vec![0f64; self.num_features];
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            mul_vector_number(&total, 1.0 / sum, &mut scaled);
        }

        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(scaled)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ranked)
    }

    /// Write the fitted forest as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load a forest previously written by [`RandomForest::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RandomForest> {
        let file = File::open(path)?;
        let forest: RandomForest = serde_json::from_reader(BufReader::new(file))?;
        forest.validate()?;

        Ok(forest)
    }

    /// Check the structural invariants a fitted forest upholds, so a
    /// truncated or hand-edited model file fails at load time instead of
    /// panicking inside prediction.
    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidModel(msg));

        for (idx, tree) in self.trees.iter().enumerate() {
            let nodes = tree.nodes();

            if nodes.is_empty() {
                return invalid(format!("tree {idx} has no nodes"));
            }

            for node in nodes {
                match node {
                    Node::Leaf { distribution } => {
                        if distribution.len() != self.num_classes {
                            return invalid(format!(
                                "tree {idx}: leaf distribution has {} classes, expected {}",
                                distribution.len(),
                                self.num_classes
                            ));
                        }
                    }
                    Node::Split {
                        feature,
                        left,
                        right,
                        ..
                    } => {
                        if *feature >= self.num_features {
                            return invalid(format!(
                                "tree {idx}: split on feature {feature} of {}",
                                self.num_features
                            ));
                        }
                        if *left as usize >= nodes.len() || *right as usize >= nodes.len() {
                            return invalid(format!("tree {idx}: child index out of range"));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl Model for RandomForest {
    /// Fit the forest: one tree per bootstrap sample, with `sqrt(features)`
    /// candidate features per split.
    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        if dataset.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let n = dataset.len();
        let num_features = dataset.num_features();
        let max_features = (num_features as f64).sqrt().round().max(1.0) as usize;
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            max_features: Some(max_features),
        };

        let mut rng = StdRng::seed_from_u64(self.params.seed);

        self.trees.clear();
        self.feature_names = dataset.feature_names.clone();
        self.num_features = num_features;

        for i in 0..self.params.n_estimators {
            let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let sample = dataset.data.select(Axis(0), &indices);
            let sample_target: Vec<usize> =
                indices.iter().map(|&idx| dataset.target[idx]).collect();

            let tree = DecisionTree::fit(
                &sample.view(),
                &sample_target,
                self.num_classes,
                &tree_params,
                &mut rng,
            )?;

            log::debug!("fitted tree {} with {} nodes", i, tree.nodes().len());
            self.trees.push(tree);
        }

        log::info!(
            "fitted {} trees on {} instances with {} features",
            self.trees.len(),
            n,
            num_features
        );

        Ok(())
    }

    fn predict_proba(&self, inputs: &ArrayView2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(Error::NotFitted);
        }
        if inputs.ncols() != self.num_features {
            return Err(Error::FeatureCountMismatch {
                expected: self.num_features,
                got: inputs.ncols(),
            });
        }

        let k = self.num_classes;
        let inv_trees = 1.0 / self.trees.len() as f64;
        let mut flat = Vec::with_capacity(inputs.nrows() * k);

        for row in inputs.axis_iter(Axis(0)) {
            let mut acc = vec![0f64; k];
            let mut scratch = vec![0f64; k];

            for tree in &self.trees {
                add_vectors(&acc, tree.predict_row(&row), &mut scratch);
                std::mem::swap(&mut acc, &mut scratch);
            }

            mul_vector_number(&acc, inv_trees, &mut scratch);
            flat.extend_from_slice(&scratch);
        }

        Ok(Array2::from_shape_vec((inputs.nrows(), k), flat)?)
    }
}
