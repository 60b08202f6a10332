use ndarray::{Array2, ArrayView2, Axis};

use crate::error::Result;
use crate::parsing::Dataset;

pub mod forest;
pub mod metrics;
pub mod tree;

pub use forest::RandomForest;
pub use tree::DecisionTree;

pub trait Model {
    /// Fit the model to the dataset.
    fn fit(&mut self, dataset: &Dataset) -> Result<()>;

    /// Class probabilities, one row per instance in `inputs`.
    fn predict_proba(&self, inputs: &ArrayView2<f64>) -> Result<Array2<f64>>;

    /// Hard predictions: the per-row argmax of the class probabilities.
    /// Ties go to the lowest class index.
    fn predict(&self, inputs: &ArrayView2<f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(inputs)?;

        Ok(proba
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |best, (idx, &p)| {
                        if p > best.1 {
                            (idx, p)
                        } else {
                            best
                        }
                    })
                    .0
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    struct FixedProba(Array2<f64>);

    impl Model for FixedProba {
        fn fit(&mut self, _dataset: &Dataset) -> Result<()> {
            Ok(())
        }

        fn predict_proba(&self, _inputs: &ArrayView2<f64>) -> Result<Array2<f64>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn probability_ties_resolve_to_the_lowest_class() {
        let model = FixedProba(array![
            [0.25, 0.25, 0.25, 0.25],
            [0.1, 0.45, 0.45, 0.0],
            [0.0, 0.2, 0.2, 0.6]
        ]);
        let inputs = Array2::zeros((3, 1));

        assert_eq!(model.predict(&inputs.view()).unwrap(), vec![0, 1, 3]);
    }
}
