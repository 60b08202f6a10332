//! Parsing of processed-window CSV files.
//!
//! The format is produced by [`super::windows`]: a header of feature columns
//! (`<channel>_<i>`) followed by `Position`, then one row of floats plus an
//! integer position label per window.

use super::{position_to_class, Dataset};
use crate::error::{Error, Result};
use ndarray::{Array, ArrayView};
use std::io::Read;
use std::path::Path;

const LABEL_COLUMN: &str = "Position";

/// Parse a processed-data CSV into a [`Dataset`].
pub fn parse_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    read_dataset(csv::Reader::from_path(path)?)
}

fn malformed(record: usize, msg: impl Into<String>) -> Error {
    Error::MalformedRecord {
        record,
        msg: msg.into(),
    }
}

/// Parse a processed-data CSV from any reader.
pub fn read_dataset<R: Read>(mut rdr: csv::Reader<R>) -> Result<Dataset> {
    let headers = rdr.headers()?.clone();

    if headers.iter().last() != Some(LABEL_COLUMN) {
        return Err(Error::MissingColumn(LABEL_COLUMN.to_string()));
    }

    let num_features = headers.len() - 1;
    if num_features == 0 {
        return Err(Error::EmptyDataset);
    }

    let feature_names: Vec<String> = headers
        .iter()
        .take(num_features)
        .map(|s| s.to_string())
        .collect();

    let mut data = Array::zeros((0, num_features));
    let mut target = Vec::new();

    for (idx, record) in rdr.records().enumerate() {
        let record = record?;

        if record.len() != headers.len() {
            return Err(malformed(
                idx,
                format!("expected {} fields, got {}", headers.len(), record.len()),
            ));
        }

        let mut features = Vec::with_capacity(num_features);

        for field in record.iter().take(num_features) {
            let value: f64 = field
                .trim()
                .parse()
                .map_err(|_| malformed(idx, format!("non-numeric feature {field:?}")))?;
            features.push(value);
        }

        let position: i64 = record[num_features]
            .trim()
            .parse()
            .map_err(|_| malformed(idx, format!("non-integer position {:?}", &record[num_features])))?;
        let class = position_to_class(position).ok_or(Error::UnknownPosition(position))?;

        data.push_row(ArrayView::from(&features))
            .map_err(|e| malformed(idx, e.to_string()))?;
        target.push(class);
    }

    if target.is_empty() {
        return Err(Error::EmptyDataset);
    }

    Ok(Dataset {
        data,
        target,
        feature_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(text: &str) -> csv::Reader<&[u8]> {
        csv::Reader::from_reader(text.as_bytes())
    }

    #[test]
    fn parses_features_and_labels() {
        let csv = "\
xaccel_1,yaccel_1,Position
0.5,-1.25,0
2.0,3.0,123
";
        let dataset = read_dataset(reader(csv)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.num_features(), 2);
        assert_eq!(dataset.feature_names, vec!["xaccel_1", "yaccel_1"]);
        assert_eq!(dataset.data.row(0).to_vec(), vec![0.5, -1.25]);
        assert_eq!(dataset.target, vec![0, 7]);
    }

    #[test]
    fn rejects_unknown_position() {
        let csv = "a,Position\n1.0,5\n";
        assert!(matches!(
            read_dataset(reader(csv)),
            Err(Error::UnknownPosition(5))
        ));
    }

    #[test]
    fn rejects_non_numeric_feature() {
        let csv = "a,Position\nabc,0\n";
        assert!(matches!(
            read_dataset(reader(csv)),
            Err(Error::MalformedRecord { record: 0, .. })
        ));
    }

    #[test]
    fn rejects_missing_label_column() {
        let csv = "a,b\n1.0,2.0\n";
        assert!(matches!(
            read_dataset(reader(csv)),
            Err(Error::MissingColumn(_))
        ));
    }

    #[test]
    fn rejects_empty_file() {
        let csv = "a,Position\n";
        assert!(matches!(read_dataset(reader(csv)), Err(Error::EmptyDataset)));
    }
}
