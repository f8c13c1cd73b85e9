// src/detection.rs
//
// Boundary to the external object-detection model. Detections arrive as
// per-frame JSON sidecar files; the core only selects the best box for the
// target anatomical structure. A frame with no qualifying detection is a
// valid "undetected" outcome, never an error.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    /// [x1, y1, x2, y2] in frame pixel coordinates.
    pub bbox: [f32; 4],
}

/// Load the detection list for one frame. A missing sidecar means the
/// detector saw nothing — an empty list, not a failure.
pub fn load_detections(path: &Path) -> Result<Vec<Detection>> {
    if !path.exists() {
        debug!("no detection sidecar at {}", path.display());
        return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading detections {}", path.display()))?;
    let detections: Vec<Detection> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing detections {}", path.display()))?;
    Ok(detections)
}

/// Highest-confidence detection whose class id matches the target set.
pub fn select_target<'a>(
    detections: &'a [Detection],
    target_class_ids: &[usize],
) -> Option<&'a Detection> {
    detections
        .iter()
        .filter(|d| target_class_ids.contains(&d.class_id))
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
