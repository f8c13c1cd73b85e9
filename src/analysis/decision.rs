// src/analysis/decision.rs
//
// The three ratio-based decision rules. Each is a stateless function from
// scalar magnitudes to a label plus the ratio that produced it; thresholds
// come from configuration, never derived at runtime.

use crate::types::{LoopState, LvState};

/// Denominators at or below this are treated as "no signal".
const EPSILON: f64 = 1e-6;

/// Chordae connectivity: ratio of secondary-region intensity to primary
/// (valve) intensity. No valve signal ⇒ ratio 0, label 0. The threshold is
/// inclusive: a ratio exactly at it counts as connected.
pub fn connectivity_ratio(primary_sum: f64, secondary_sum: f64, threshold: f64) -> (u8, f64) {
    if primary_sum <= EPSILON {
        return (0, 0.0);
    }
    let ratio = secondary_sum / primary_sum;
    let label = if ratio >= threshold { 1 } else { 0 };
    (label, ratio)
}

/// Loop state from the largest depth-1 contour area. Strictly greater than
/// the threshold ⇒ an enclosed cavity large enough to call the loop closed.
pub fn loop_state(max_depth1_area: f64, area_threshold: f64) -> LoopState {
    if max_depth1_area > area_threshold {
        LoopState::Close
    } else {
        LoopState::Open
    }
}

/// Symmetric area-overlap agreement between the AI mask and the geometric
/// mask: min/max of the two areas, 0 when either is empty. Strictly greater
/// than the threshold ⇒ detected.
pub fn overlap_ratio(area_a: u64, area_b: u64, threshold: f64) -> (LvState, f64) {
    let ratio = if area_a > 0 && area_b > 0 {
        area_a.min(area_b) as f64 / area_a.max(area_b) as f64
    } else {
        0.0
    };
    let state = if ratio > threshold {
        LvState::Detected
    } else {
        LvState::NotDetected
    };
    (state, ratio)
}
