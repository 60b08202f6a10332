use clap::{Parser, Subcommand};
use gesture_forest::export;
use gesture_forest::model::forest::ForestParams;
use gesture_forest::model::{metrics, Model, RandomForest};
use gesture_forest::parsing::{class_to_position, gesture, windows, Dataset, NUM_CLASSES, WINDOW_SIZE};
use gesture_forest::Result;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cut a raw capture CSV into sliding-window features
    Format {
        /// The path of the raw capture
        input: String,

        /// Where to write the processed windows
        output: String,

        /// Samples per window
        #[arg(short, long, default_value_t = WINDOW_SIZE)]
        window_size: usize,

        /// Samples to advance between windows
        #[arg(short, long, default_value_t = 1)]
        step_size: usize,
    },

    /// Concatenate processed CSVs with identical headers
    Combine {
        /// The processed CSVs to merge
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Where to write the merged file
        #[arg(short, long)]
        output: String,
    },

    /// Train a random forest on a processed CSV
    Train {
        /// The path of the training dataset
        #[arg(short, long)]
        train_path: String,

        /// The path of the validation dataset
        #[arg(short, long)]
        validation_path: Option<String>,

        /// Number of trees in the forest
        #[arg(short, long, default_value_t = 100)]
        n_estimators: usize,

        /// Maximum tree depth; unbounded if not provided
        #[arg(long)]
        max_depth: Option<usize>,

        /// Minimum samples required to split a node
        #[arg(long, default_value_t = 2)]
        min_samples_split: usize,

        /// Seed for bootstrap and feature sampling
        #[arg(short, long, default_value_t = 42)]
        seed: u64,

        /// Where to write the fitted model (JSON)
        #[arg(short, long, default_value = "forest.json")]
        model_path: String,

        /// Export the fitted forest as C source (header written alongside)
        #[arg(long)]
        c_path: Option<String>,

        /// Write the validation metrics as a JSON report
        #[arg(long, requires = "validation_path")]
        report_path: Option<String>,

        /// Print per-feature importances
        #[arg(long)]
        importances: bool,
    },

    /// Evaluate a saved model on a processed CSV
    Eval {
        /// The path of the model file
        #[arg(short, long)]
        model_path: String,

        /// The path of the dataset to evaluate
        #[arg(short, long)]
        data_path: String,
    },

    /// Print predictions for each window of a processed CSV
    Predict {
        /// The path of the model file
        #[arg(short, long)]
        model_path: String,

        /// The path of the dataset to classify
        #[arg(short, long)]
        data_path: String,
    },
}

/// Evaluate the model on a dataset and return the metric set.
fn test_model(model: &RandomForest, dataset: &Dataset) -> Result<metrics::Metrics> {
    let predictions = model.predict(&dataset.data.view())?;

    Ok(metrics::evaluate(&dataset.target, &predictions, NUM_CLASSES))
}

#[allow(clippy::too_many_arguments)]
fn train(
    train_path: &str,
    validation_path: Option<&str>,
    params: ForestParams,
    model_path: &str,
    c_path: Option<&str>,
    report_path: Option<&str>,
    importances: bool,
) -> Result<()> {
    let dataset = gesture::parse_dataset(train_path)?;
    log::info!(
        "training on {} windows with {} features",
        dataset.len(),
        dataset.num_features()
    );

    let mut forest = RandomForest::new(params);
    forest.fit(&dataset)?;
    forest.save(model_path)?;
    log::info!("model written to {model_path}");

    if let Some(validation_path) = validation_path {
        let validation = gesture::parse_dataset(validation_path)?;
        let metrics = test_model(&forest, &validation)?;
        println!("{metrics}");

        if let Some(report_path) = report_path {
            metrics::write_report(report_path, &metrics)?;
            log::info!("report written to {report_path}");
        }
    }

    if let Some(c_path) = c_path {
        export::write_c_export(c_path, &forest, "predict")?;
        log::info!("C export written to {c_path}");
    }

    if importances {
        println!("Feature Importances:");
        for (name, importance) in forest.feature_importances()? {
            println!("{name}: {importance}");
        }
    }

    Ok(())
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Format {
            input,
            output,
            window_size,
            step_size,
        } => {
            let count = windows::format_recording(&input, &output, window_size, step_size)?;
            println!("Wrote {count} windows to {output}");
        }
        Command::Combine { inputs, output } => {
            let rows = windows::combine(&inputs, &output)?;
            println!("Wrote {rows} rows to {output}");
        }
        Command::Train {
            train_path,
            validation_path,
            n_estimators,
            max_depth,
            min_samples_split,
            seed,
            model_path,
            c_path,
            report_path,
            importances,
        } => {
            let params = ForestParams {
                n_estimators,
                max_depth,
                min_samples_split,
                seed,
            };
            train(
                &train_path,
                validation_path.as_deref(),
                params,
                &model_path,
                c_path.as_deref(),
                report_path.as_deref(),
                importances,
            )?;
        }
        Command::Eval {
            model_path,
            data_path,
        } => {
            let forest = RandomForest::load(&model_path)?;
            let dataset = gesture::parse_dataset(&data_path)?;
            let metrics = test_model(&forest, &dataset)?;
            println!("{metrics}");
        }
        Command::Predict {
            model_path,
            data_path,
        } => {
            let forest = RandomForest::load(&model_path)?;
            let dataset = gesture::parse_dataset(&data_path)?;
            let proba = forest.predict_proba(&dataset.data.view())?;
            let predictions = forest.predict(&dataset.data.view())?;

            for (idx, (&class, row)) in predictions
                .iter()
                .zip(proba.axis_iter(ndarray::Axis(0)))
                .enumerate()
            {
                let position = class_to_position(class).unwrap_or_default();
                println!("{idx}: position {position} (p = {:.4})", row[class]);
            }
        }
    }

    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_path_requires_validation_data() {
        // A metrics report only exists for a held-out evaluation.
        assert!(Args::try_parse_from([
            "gesture_forest",
            "train",
            "--train-path",
            "train.csv",
            "--report-path",
            "report.json",
        ])
        .is_err());

        assert!(Args::try_parse_from([
            "gesture_forest",
            "train",
            "--train-path",
            "train.csv",
            "--validation-path",
            "validation.csv",
            "--report-path",
            "report.json",
        ])
        .is_ok());
    }
}
