//! OccupancyAggregator - Detection to Occupancy Reduction
//!
//! ## Responsibilities
//!
//! - Reduce a set of spot detections to a `{free, occupied, total}` summary
//! - Apply the confidence threshold
//! - Map model class labels to spot status

use serde::{Deserialize, Serialize};

/// Default confidence threshold applied when none is configured
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// One detection returned by the inference service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Model class label (e.g. "free", "car")
    #[serde(rename = "class")]
    pub class_label: String,
    /// Model confidence in [0, 1]
    pub confidence: f32,
    /// Bounding box center x in pixels
    #[serde(default)]
    pub x: f32,
    /// Bounding box center y in pixels
    #[serde(default)]
    pub y: f32,
    /// Bounding box width in pixels
    #[serde(default)]
    pub width: f32,
    /// Bounding box height in pixels
    #[serde(default)]
    pub height: f32,
}

/// Status of a single parking spot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotStatus {
    Free,
    Occupied,
}

/// Occupancy summary for one classified frame
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub free: u32,
    pub occupied: u32,
    pub total: u32,
}

/// Map a model class label to a spot status.
///
/// Labels are matched case-insensitively with surrounding whitespace
/// trimmed. Any label not explicitly recognized as free-equivalent counts
/// as occupied, so an unknown label can never inflate the free count.
pub fn classify_label(label: &str) -> SpotStatus {
    match label.trim().to_ascii_lowercase().as_str() {
        "free" | "empty" => SpotStatus::Free,
        _ => SpotStatus::Occupied,
    }
}

/// Reduce detections to an occupancy snapshot.
///
/// Detections below `confidence_threshold` are discarded. Empty input
/// yields an all-zero snapshot.
pub fn aggregate(detections: &[Detection], confidence_threshold: f32) -> OccupancySnapshot {
    let mut free = 0u32;
    let mut occupied = 0u32;

    for detection in detections {
        if detection.confidence < confidence_threshold {
            continue;
        }
        match classify_label(&detection.class_label) {
            SpotStatus::Free => free += 1,
            SpotStatus::Occupied => occupied += 1,
        }
    }

    OccupancySnapshot {
        free,
        occupied,
        total: free + occupied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(label: &str, confidence: f32) -> Detection {
        Detection {
            class_label: label.to_string(),
            confidence,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }

    #[test]
    fn test_empty_input_is_all_zeros() {
        let snapshot = aggregate(&[], 0.5);
        assert_eq!(snapshot.free, 0);
        assert_eq!(snapshot.occupied, 0);
        assert_eq!(snapshot.total, 0);
    }

    #[test]
    fn test_counts_sum_to_total() {
        let detections = vec![
            detection("free", 0.9),
            detection("car", 0.8),
            detection("free", 0.7),
            detection("car", 0.95),
        ];
        let snapshot = aggregate(&detections, 0.5);
        assert_eq!(snapshot.free + snapshot.occupied, snapshot.total);
        assert_eq!(snapshot.free, 2);
        assert_eq!(snapshot.occupied, 2);
    }

    #[test]
    fn test_below_threshold_detections_are_dropped() {
        let detections = vec![detection("free", 0.1), detection("car", 0.9)];
        let snapshot = aggregate(&detections, 0.28);
        assert_eq!(snapshot.free, 0);
        assert_eq!(snapshot.occupied, 1);
        assert_eq!(snapshot.total, 1);
    }

    #[test]
    fn test_unknown_label_counts_as_occupied() {
        let detections = vec![detection("truck", 0.9)];
        let snapshot = aggregate(&detections, 0.5);
        assert_eq!(snapshot.occupied, 1);
        assert_eq!(snapshot.free, 0);
    }

    #[test]
    fn test_label_matching_is_case_insensitive_and_trimmed() {
        assert_eq!(classify_label(" Free "), SpotStatus::Free);
        assert_eq!(classify_label("EMPTY"), SpotStatus::Free);
        assert_eq!(classify_label("Car"), SpotStatus::Occupied);
        assert_eq!(classify_label(""), SpotStatus::Occupied);
    }
}
