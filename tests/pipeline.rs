//! End-to-end checks: raw capture -> windows -> training -> prediction,
//! model persistence, and the C export.

use gesture_forest::export;
use gesture_forest::model::forest::ForestParams;
use gesture_forest::model::{metrics, Model, RandomForest};
use gesture_forest::parsing::{gesture, windows, Dataset, CHANNELS, NUM_CHANNELS, NUM_CLASSES};
use ndarray::{Array, ArrayView, Axis};
use std::path::PathBuf;

/// Three separable classes over four features. Feature 0 carries the class,
/// the rest wiggle deterministically.
fn synthetic_dataset() -> Dataset {
    let mut data = Array::zeros((0, 4));
    let mut target = Vec::new();

    for class in 0..3usize {
        for i in 0..15 {
            let wiggle = i as f64 * 0.01;
            let row = [
                class as f64 * 5.0 + wiggle,
                1.0 + wiggle,
                -2.0,
                i as f64 % 3.0,
            ];
            data.push_row(ArrayView::from(&row)).unwrap();
            target.push(class);
        }
    }

    Dataset {
        data,
        target,
        feature_names: (0..4).map(|i| format!("f{i}")).collect(),
    }
}

/// A raw capture: two recording runs of 30 samples, positions 0 and 1.
/// Every channel is offset by the position, so any feature separates them.
fn raw_capture() -> String {
    let mut text = String::from("Timestamp,");
    text.push_str(&CHANNELS.join(","));
    text.push_str(",Position,Orientation\n");

    for position in [0i64, 1] {
        for sample in 0..30 {
            text.push_str(&format!("00:00:00.{sample}"));
            for channel in 0..NUM_CHANNELS {
                let value = position as f64 * 100.0 + channel as f64 + (sample % 3) as f64 * 0.1;
                text.push_str(&format!(",{value}"));
            }
            text.push_str(&format!(",{position},0\n"));
        }
    }

    text
}

fn temp_model_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("gesture_forest_{tag}_{}.json", std::process::id()))
}

#[test]
fn train_save_load_predict() {
    let dataset = synthetic_dataset();
    let mut forest = RandomForest::new(ForestParams {
        n_estimators: 15,
        seed: 42,
        ..ForestParams::default()
    });
    forest.fit(&dataset).unwrap();

    let predictions = forest.predict(&dataset.data.view()).unwrap();
    let metrics = metrics::evaluate(&dataset.target, &predictions, NUM_CLASSES);
    assert_eq!(metrics.accuracy, 1.0);
    assert!((metrics.mcc - 1.0).abs() < 1e-12);

    let path = temp_model_path("roundtrip");
    forest.save(&path).unwrap();
    let reloaded = RandomForest::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(
        forest.predict_proba(&dataset.data.view()).unwrap(),
        reloaded.predict_proba(&dataset.data.view()).unwrap()
    );
}

#[test]
fn windows_feed_training() {
    let text = raw_capture();
    let mut rdr = csv::Reader::from_reader(text.as_bytes());
    let cut = windows::make_windows(&mut rdr, 15, 1).unwrap();

    // Two runs of 30 samples each give 16 windows apiece.
    assert_eq!(cut.len(), 32);

    let mut wtr = csv::Writer::from_writer(Vec::new());
    windows::write_windows(&mut wtr, 15, &cut).unwrap();
    let processed = wtr.into_inner().unwrap();

    let dataset = gesture::read_dataset(csv::Reader::from_reader(processed.as_slice())).unwrap();
    assert_eq!(dataset.len(), 32);
    assert_eq!(dataset.num_features(), 15 * NUM_CHANNELS);
    assert_eq!(dataset.feature_names[0], "xaccel_1");

    let mut forest = RandomForest::new(ForestParams {
        n_estimators: 5,
        ..ForestParams::default()
    });
    forest.fit(&dataset).unwrap();

    let predictions = forest.predict(&dataset.data.view()).unwrap();
    assert_eq!(predictions, dataset.target);
}

#[test]
fn exported_c_covers_every_tree() {
    let dataset = synthetic_dataset();
    let mut forest = RandomForest::new(ForestParams {
        n_estimators: 4,
        ..ForestParams::default()
    });
    forest.fit(&dataset).unwrap();

    let source = export::export_to_c(&forest, "predict").unwrap();

    assert!(source.contains("void predict(double * input, double * output) {"));
    for idx in 0..4 {
        assert!(source.contains(&format!("double var{idx}[{NUM_CLASSES}];")));
    }
    assert!(source.contains(&format!("add_vectors(var0, var3, {NUM_CLASSES}, var0);")));

    let proba = forest.predict_proba(&dataset.data.view()).unwrap();
    for row in proba.axis_iter(Axis(0)) {
        assert!((row.sum() - 1.0).abs() < 1e-9);
    }
}
