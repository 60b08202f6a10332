use ndarray::Array2;

pub mod gesture;
pub mod windows;

/// Sensor channels in capture order: accelerometer, gyroscope, EMG, pulse.
pub const CHANNELS: [&str; 10] = [
    "xaccel", "yaccel", "zaccel", "xrot", "yrot", "zrot", "emg1", "emg2", "emg3", "pulse",
];
pub const NUM_CHANNELS: usize = CHANNELS.len();

/// Samples per sliding window in the shipped model.
pub const WINDOW_SIZE: usize = 15;
pub const NUM_FEATURES: usize = WINDOW_SIZE * NUM_CHANNELS;

/// The recordable hand positions. A position's class index is its index here.
pub const POSITIONS: [i64; 8] = [0, 1, 2, 3, 12, 13, 23, 123];
pub const NUM_CLASSES: usize = POSITIONS.len();

/// Map a position label to its class index.
pub fn position_to_class(position: i64) -> Option<usize> {
    POSITIONS.iter().position(|&p| p == position)
}

/// Map a class index back to its position label.
pub fn class_to_position(class: usize) -> Option<i64> {
    POSITIONS.get(class).copied()
}

/// A set of windowed instances: one row of features per window, one class
/// index per row.
pub struct Dataset {
    pub data: Array2<f64>,
    pub target: Vec<usize>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.data.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_class_mapping_roundtrips() {
        for (idx, &pos) in POSITIONS.iter().enumerate() {
            assert_eq!(position_to_class(pos), Some(idx));
            assert_eq!(class_to_position(idx), Some(pos));
        }
        assert_eq!(position_to_class(4), None);
        assert_eq!(class_to_position(NUM_CLASSES), None);
    }
}
