//! CART classification trees with Gini impurity splits.

use crate::error::{Error, Result};
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// A node in a fitted tree. Children are indices into the node arena.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        /// Go left when `value <= threshold`.
        threshold: f64,
        left: u32,
        right: u32,
    },
    Leaf {
        /// Class-probability distribution at this leaf.
        distribution: Vec<f64>,
    },
}

/// Per-tree hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Number of features considered per split. `None` means all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

/// A fitted decision tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    num_classes: usize,
    /// Total impurity decrease attributed to each feature during fitting.
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Fit a tree on the given instances. `target` holds class indices below
    /// `num_classes`, one per row of `data`.
    pub fn fit(
        data: &ArrayView2<f64>,
        target: &[usize],
        num_classes: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Result<DecisionTree> {
        if data.nrows() == 0 {
            return Err(Error::EmptyDataset);
        }
        assert_eq!(data.nrows(), target.len());
        assert!(target.iter().all(|&c| c < num_classes));

        let mut builder = TreeBuilder {
            data,
            target,
            num_classes,
            params,
            total_samples: data.nrows() as f64,
            nodes: Vec::new(),
            importances: vec![0f64; data.ncols()],
        };

        let indices: Vec<usize> = (0..data.nrows()).collect();
        builder.build(indices, 0, rng);

        Ok(DecisionTree {
            nodes: builder.nodes,
            num_classes,
            importances: builder.importances,
        })
    }

    /// Walk the tree for one instance and return its leaf distribution.
    pub fn predict_row(&self, row: &ArrayView1<f64>) -> &[f64] {
        let mut node = 0usize;

        loop {
            match &self.nodes[node] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Raw (unnormalized) impurity-decrease importances, one per feature.
    pub fn importances(&self) -> &[f64] {
        &self.importances
    }
}

/// A candidate split found for one node.
struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Impurity decrease relative to the parent, not yet weighted by the
    /// node's sample fraction.
    gain: f64,
}

struct TreeBuilder<'a, 'b> {
    data: &'a ArrayView2<'b, f64>,
    target: &'a [usize],
    num_classes: usize,
    params: &'a TreeParams,
    total_samples: f64,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl TreeBuilder<'_, '_> {
    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.num_classes];
        for &idx in indices {
            counts[self.target[idx]] += 1;
        }
        counts
    }

    fn push_leaf(&mut self, counts: &[usize], total: usize) -> u32 {
        let distribution = counts
            .iter()
            .map(|&c| c as f64 / total as f64)
            .collect();
        let id = self.nodes.len() as u32;
        self.nodes.push(Node::Leaf { distribution });
        id
    }

    /// Build the subtree over `indices`, returning its root's arena index.
    fn build(&mut self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> u32 {
        let counts = self.class_counts(&indices);
        let n = indices.len();

        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_capped = self.params.max_depth.map_or(false, |d| depth >= d);

        if is_pure || depth_capped || n < self.params.min_samples_split {
            return self.push_leaf(&counts, n);
        }

        let split = match self.find_best_split(&indices, &counts, rng) {
            Some(split) => split,
            None => return self.push_leaf(&counts, n),
        };

        // Mean decrease in impurity, weighted by this node's sample fraction.
        self.importances[split.feature] += n as f64 / self.total_samples * split.gain;

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&idx| self.data[[idx, split.feature]] <= split.threshold);

        let id = self.nodes.len() as u32;
        self.nodes.push(Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: 0,
            right: 0,
        });

        let left = self.build(left_indices, depth + 1, rng);
        let right = self.build(right_indices, depth + 1, rng);

        if let Node::Split {
            left: l, right: r, ..
        } = &mut self.nodes[id as usize]
        {
            *l = left;
            *r = right;
        }

        id
    }

    /// Scan candidate features for the threshold with the best weighted-Gini
    /// decrease. Returns `None` when no split improves on the parent.
    fn find_best_split(
        &self,
        indices: &[usize],
        counts: &[usize],
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let num_features = self.data.ncols();
        let candidates: Vec<usize> = match self.params.max_features {
            Some(k) if k < num_features => index::sample(rng, num_features, k).into_vec(),
            _ => (0..num_features).collect(),
        };

        let n = indices.len();
        let parent_gini = gini(counts, n);
        let mut best: Option<BestSplit> = None;

        for feature in candidates {
            let mut values: Vec<(f64, usize)> = indices
                .iter()
                .map(|&idx| (self.data[[idx, feature]], self.target[idx]))
                .collect();
            values.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_counts = vec![0usize; self.num_classes];
            let mut right_counts = counts.to_vec();

            for i in 0..n - 1 {
                let (value, class) = values[i];
                left_counts[class] += 1;
                right_counts[class] -= 1;

                // Only cut between distinct values.
                if value == values[i + 1].0 {
                    continue;
                }

                let num_left = i + 1;
                let num_right = n - num_left;
                let weighted = (num_left as f64 * gini(&left_counts, num_left)
                    + num_right as f64 * gini(&right_counts, num_right))
                    / n as f64;
                let gain = parent_gini - weighted;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (value + values[i + 1].0) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Gini impurity of a class-count vector.
fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    let sum_squared: f64 = counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total as f64;
            p * p
        })
        .sum();

    1.0 - sum_squared
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0)
    }

    #[test]
    fn gini_of_pure_and_even_counts() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[0, 0], 0), 0.0);
    }

    #[test]
    fn fits_a_separable_threshold() {
        let data = array![[0.0], [1.0], [2.0], [10.0], [11.0], [12.0]];
        let target = [0, 0, 0, 1, 1, 1];

        let tree = DecisionTree::fit(
            &data.view(),
            &target,
            2,
            &TreeParams::default(),
            &mut rng(),
        )
        .unwrap();

        assert_eq!(tree.predict_row(&array![1.5].view()), &[1.0, 0.0]);
        assert_eq!(tree.predict_row(&array![11.0].view()), &[0.0, 1.0]);
        // One split, two leaves.
        assert_eq!(tree.nodes().len(), 3);
    }

    #[test]
    fn pure_targets_give_a_single_leaf() {
        let data = array![[0.0], [5.0], [9.0]];
        let target = [1, 1, 1];

        let tree = DecisionTree::fit(
            &data.view(),
            &target,
            3,
            &TreeParams::default(),
            &mut rng(),
        )
        .unwrap();

        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.predict_row(&array![7.0].view()), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn max_depth_zero_never_splits() {
        let data = array![[0.0], [10.0]];
        let target = [0, 1];
        let params = TreeParams {
            max_depth: Some(0),
            ..TreeParams::default()
        };

        let tree = DecisionTree::fit(&data.view(), &target, 2, &params, &mut rng()).unwrap();

        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.predict_row(&array![0.0].view()), &[0.5, 0.5]);
    }

    #[test]
    fn importance_lands_on_the_informative_feature() {
        // Feature 1 separates the classes, feature 0 is constant.
        let data = array![[3.0, 0.0], [3.0, 1.0], [3.0, 8.0], [3.0, 9.0]];
        let target = [0, 0, 1, 1];

        let tree = DecisionTree::fit(
            &data.view(),
            &target,
            2,
            &TreeParams::default(),
            &mut rng(),
        )
        .unwrap();

        assert_eq!(tree.importances()[0], 0.0);
        assert!(tree.importances()[1] > 0.0);
    }

    #[test]
    fn empty_data_is_an_error() {
        let data = ndarray::Array2::<f64>::zeros((0, 4));
        assert!(matches!(
            DecisionTree::fit(&data.view(), &[], 2, &TreeParams::default(), &mut rng()),
            Err(Error::EmptyDataset)
        ));
    }
}
