//! Sliding-window feature extraction from raw capture CSVs.
//!
//! A raw capture has one row per sensor sample: `Timestamp`, the ten channel
//! columns, then `Position` and `Orientation`. Windows are cut from contiguous
//! runs with equal `(Position, Orientation)` so a window never mixes samples
//! from two recordings.

use super::{CHANNELS, NUM_CHANNELS};
use crate::error::{Error, Result};
use std::io::{Read, Write};
use std::path::Path;

const POSITION_COLUMN: &str = "Position";
const ORIENTATION_COLUMN: &str = "Orientation";

/// One sensor sample tagged with its recording run.
struct Sample {
    channels: [f64; NUM_CHANNELS],
    position: i64,
    orientation: i64,
}

/// A flattened window and its position label.
pub struct Window {
    pub features: Vec<f64>,
    pub position: i64,
}

/// Column names of a processed-data CSV for the given window size.
pub fn feature_header(window_size: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(window_size * NUM_CHANNELS + 1);

    for i in 1..=window_size {
        for channel in CHANNELS {
            names.push(format!("{channel}_{i}"));
        }
    }
    names.push(POSITION_COLUMN.to_string());

    names
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| Error::MissingColumn(name.to_string()))
}

fn parse_samples<R: Read>(rdr: &mut csv::Reader<R>) -> Result<Vec<Sample>> {
    let headers = rdr.headers()?.clone();

    let channel_cols: Vec<usize> = CHANNELS
        .iter()
        .map(|name| column_index(&headers, name))
        .collect::<Result<_>>()?;
    let position_col = column_index(&headers, POSITION_COLUMN)?;
    let orientation_col = column_index(&headers, ORIENTATION_COLUMN)?;

    let mut samples = Vec::new();

    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let field = |col: usize, what: &str| -> Result<&str> {
            record.get(col).ok_or_else(|| Error::MalformedRecord {
                record: idx,
                msg: format!("missing {what} field"),
            })
        };

        let mut channels = [0f64; NUM_CHANNELS];
        for (value, &col) in channels.iter_mut().zip(channel_cols.iter()) {
            let raw = field(col, "channel")?;
            *value = raw.trim().parse().map_err(|_| Error::MalformedRecord {
                record: idx,
                msg: format!("non-numeric channel value {raw:?}"),
            })?;
        }

        let parse_int = |raw: &str| -> Result<i64> {
            raw.trim().parse().map_err(|_| Error::MalformedRecord {
                record: idx,
                msg: format!("non-integer label {raw:?}"),
            })
        };
        let position = parse_int(field(position_col, "position")?)?;
        let orientation = parse_int(field(orientation_col, "orientation")?)?;

        samples.push(Sample {
            channels,
            position,
            orientation,
        });
    }

    Ok(samples)
}

/// Cut sliding windows out of a raw capture.
///
/// Windows of `window_size` samples advance by `step_size` within each
/// contiguous `(Position, Orientation)` run; runs shorter than a window yield
/// nothing. Features are flattened sample-major: all channels of the oldest
/// sample first.
pub fn make_windows<R: Read>(
    rdr: &mut csv::Reader<R>,
    window_size: usize,
    step_size: usize,
) -> Result<Vec<Window>> {
    if window_size == 0 || step_size == 0 {
        return Err(Error::InvalidWindowing);
    }

    let samples = parse_samples(rdr)?;
    let mut windows = Vec::new();
    let mut run_start = 0;

    while run_start < samples.len() {
        let key = (
            samples[run_start].position,
            samples[run_start].orientation,
        );
        let run_end = samples[run_start..]
            .iter()
            .position(|s| (s.position, s.orientation) != key)
            .map(|offset| run_start + offset)
            .unwrap_or(samples.len());

        let run = &samples[run_start..run_end];

        if run.len() >= window_size {
            for start in (0..=run.len() - window_size).step_by(step_size) {
                let mut features = Vec::with_capacity(window_size * NUM_CHANNELS);
                for sample in &run[start..start + window_size] {
                    features.extend_from_slice(&sample.channels);
                }
                windows.push(Window {
                    features,
                    position: key.0,
                });
            }
        }

        run_start = run_end;
    }

    Ok(windows)
}

/// Write windows in the processed-data CSV format.
pub fn write_windows<W: Write>(
    wtr: &mut csv::Writer<W>,
    window_size: usize,
    windows: &[Window],
) -> Result<()> {
    wtr.write_record(feature_header(window_size))?;

    for window in windows {
        let mut record: Vec<String> = window.features.iter().map(|x| x.to_string()).collect();
        record.push(window.position.to_string());
        wtr.write_record(record)?;
    }
    wtr.flush()?;

    Ok(())
}

/// Convert a raw capture CSV into a processed-data CSV.
/// Returns the number of windows produced.
pub fn format_recording<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    window_size: usize,
    step_size: usize,
) -> Result<usize> {
    let mut rdr = csv::Reader::from_path(input)?;
    let windows = make_windows(&mut rdr, window_size, step_size)?;

    let mut wtr = csv::Writer::from_path(output)?;
    write_windows(&mut wtr, window_size, &windows)?;

    Ok(windows.len())
}

/// Concatenate processed-data CSVs into one file.
/// All inputs must share an identical header. Returns the number of rows.
pub fn combine<P: AsRef<Path>, Q: AsRef<Path>>(inputs: &[P], output: Q) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(output)?;
    let mut expected: Option<(String, csv::StringRecord)> = None;
    let mut rows = 0;

    for input in inputs {
        let name = input.as_ref().display().to_string();
        let mut rdr = csv::Reader::from_path(input)?;
        let headers = rdr.headers()?.clone();

        match &expected {
            None => {
                wtr.write_record(&headers)?;
                expected = Some((name, headers));
            }
            Some((first, expected_headers)) => {
                if &headers != expected_headers {
                    return Err(Error::HeaderMismatch {
                        first: first.clone(),
                        second: name,
                    });
                }
            }
        }

        for record in rdr.records() {
            wtr.write_record(&record?)?;
            rows += 1;
        }
    }

    wtr.flush()?;

    Ok(rows)
}
