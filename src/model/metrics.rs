//! Classification metrics for model evaluation.

use crate::error::Result;
use crate::parsing::class_to_position;
use json::object;
use ndarray::{Array2, Axis};
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Precision, recall and F1 for one class, plus its support.
#[derive(Debug, Clone, Copy)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// The full metric set for one evaluation run. Precision, recall and F1 are
/// support-weighted averages over the classes.
#[derive(Debug)]
pub struct Metrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub mcc: f64,
    /// Rows are actual classes, columns predicted classes.
    pub confusion: Array2<usize>,
    pub per_class: Vec<ClassMetrics>,
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Compute the metric set from actual and predicted class indices.
pub fn evaluate(actual: &[usize], predicted: &[usize], num_classes: usize) -> Metrics {
    assert_eq!(actual.len(), predicted.len());
    assert!(!actual.is_empty());

    let mut confusion = Array2::zeros((num_classes, num_classes));
    for (&a, &p) in actual.iter().zip(predicted.iter()) {
        confusion[[a, p]] += 1;
    }

    let total = actual.len() as f64;
    let correct: usize = (0..num_classes).map(|k| confusion[[k, k]]).sum();

    let mut per_class = Vec::with_capacity(num_classes);
    let mut precision = 0.0;
    let mut recall = 0.0;
    let mut f1 = 0.0;

    for k in 0..num_classes {
        let tp = confusion[[k, k]] as f64;
        let support = confusion.row(k).sum();
        let predicted_k = confusion.column(k).sum() as f64;

        let class_precision = ratio(tp, predicted_k);
        let class_recall = ratio(tp, support as f64);
        let class = ClassMetrics {
            precision: class_precision,
            recall: class_recall,
            f1: ratio(
                2.0 * class_precision * class_recall,
                class_precision + class_recall,
            ),
            support,
        };

        precision += support as f64 * class.precision;
        recall += support as f64 * class.recall;
        f1 += support as f64 * class.f1;
        per_class.push(class);
    }

    Metrics {
        accuracy: correct as f64 / total,
        precision: precision / total,
        recall: recall / total,
        f1: f1 / total,
        mcc: matthews_corrcoef(&confusion),
        confusion,
        per_class,
    }
}

/// Multiclass Matthews correlation coefficient, straight from the confusion
/// matrix.
fn matthews_corrcoef(confusion: &Array2<usize>) -> f64 {
    let s: f64 = confusion.sum() as f64;
    let c: f64 = confusion.diag().sum() as f64;
    let t: Vec<f64> = confusion
        .axis_iter(Axis(0))
        .map(|row| row.sum() as f64)
        .collect();
    let p: Vec<f64> = confusion
        .axis_iter(Axis(1))
        .map(|col| col.sum() as f64)
        .collect();

    let covariance = c * s - t.iter().zip(p.iter()).map(|(a, b)| a * b).sum::<f64>();
    let denom_t = s * s - t.iter().map(|x| x * x).sum::<f64>();
    let denom_p = s * s - p.iter().map(|x| x * x).sum::<f64>();

    ratio(covariance, (denom_t * denom_p).sqrt())
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy: {:.4}", self.accuracy)?;
        writeln!(f, "Precision: {:.4}", self.precision)?;
        writeln!(f, "Recall: {:.4}", self.recall)?;
        writeln!(f, "F1 Score: {:.4}", self.f1)?;
        writeln!(f, "Matthews Correlation Coefficient (MCC): {:.4}", self.mcc)?;

        writeln!(f, "Confusion Matrix:")?;
        for row in self.confusion.axis_iter(Axis(0)) {
            writeln!(
                f,
                "  {}",
                row.iter()
                    .map(|c| format!("{c:>5}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            )?;
        }

        writeln!(f, "Classification Report:")?;
        writeln!(
            f,
            "  {:>8} {:>10} {:>8} {:>8} {:>8}",
            "position", "precision", "recall", "f1", "support"
        )?;
        for (k, class) in self.per_class.iter().enumerate() {
            let label = class_to_position(k)
                .map(|p| p.to_string())
                .unwrap_or_else(|| k.to_string());
            writeln!(
                f,
                "  {:>8} {:>10.4} {:>8.4} {:>8.4} {:>8}",
                label, class.precision, class.recall, class.f1, class.support
            )?;
        }

        Ok(())
    }
}

/// Write the metrics as a JSON report.
/// The keys mirror the printed report: overall scores, the confusion matrix
/// as an array of rows, and one object per class.
pub fn write_report<P: AsRef<Path>>(path: P, metrics: &Metrics) -> Result<()> {
    let mut data = object! {};
    let mut file = File::create(path)?;

    data["accuracy"] = metrics.accuracy.into();
    data["precision"] = metrics.precision.into();
    data["recall"] = metrics.recall.into();
    data["f1_score"] = metrics.f1.into();
    data["mcc"] = metrics.mcc.into();

    let confusion: Vec<Vec<u64>> = metrics
        .confusion
        .axis_iter(Axis(0))
        .map(|row| row.iter().map(|&c| c as u64).collect())
        .collect();
    data["confusion_matrix"] = confusion.into();

    let mut classes = object! {};
    for (k, class) in metrics.per_class.iter().enumerate() {
        let label = class_to_position(k)
            .map(|p| p.to_string())
            .unwrap_or_else(|| k.to_string());
        classes[label.as_str()] = object! {
            precision: class.precision,
            recall: class.recall,
            f1_score: class.f1,
            support: class.support as u64,
        };
    }
    data["classes"] = classes;

    file.write_all(data.dump().as_bytes())?;

    Ok(())
}
