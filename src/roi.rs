// src/roi.rs
//
// Region-of-interest derivation from a detector bounding box. The primary
// region is the bbox clipped to the frame; the secondary region sits
// immediately to its left, narrowed horizontally and extended downward by
// proportional rules — the tissue just outside the detected structure.

use serde::{Deserialize, Serialize};

/// Half-open pixel rectangle [x1, x2) × [y1, y2) with positive extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RoiRules {
    /// Fraction of bbox width removed from the secondary region.
    pub shrink_x: f32,
    /// Fraction of bbox height added below the secondary region.
    pub extend_y: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct RoiPair {
    pub primary: Region,
    pub secondary: Region,
}

/// Derive the analysis regions for a frame of `w`×`h` pixels from a raw
/// detector bbox `[x1, y1, x2, y2]`.
///
/// Returns `None` when the bbox is malformed or collapses to zero extent
/// after clipping — downstream analysis must short-circuit, not crash.
pub fn derive_regions(w: u32, h: u32, bbox: &[f32; 4], rules: &RoiRules) -> Option<RoiPair> {
    if bbox.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let x1 = (bbox[0] as i64).clamp(0, w as i64) as u32;
    let x2 = (bbox[2] as i64).clamp(0, w as i64) as u32;
    let y1 = (bbox[1] as i64).clamp(0, h as i64) as u32;
    let y2 = (bbox[3] as i64).clamp(0, h as i64) as u32;

    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    let primary = Region { x1, y1, x2, y2 };
    let width = primary.width();
    let height = primary.height();

    // Effective secondary width: bbox width minus the shrink fraction,
    // never below one pixel.
    let shrink_px = (width as f32 * rules.shrink_x) as u32;
    let eff_w = width.saturating_sub(shrink_px).max(1);
    let extend_px = (height as f32 * rules.extend_y) as u32;

    let sx1 = x1.saturating_sub(eff_w);
    let sx2 = (sx1 + 1).max(x1);
    let sy2 = (y2 + extend_px).min(h);

    let secondary = Region {
        x1: sx1,
        y1,
        x2: sx2,
        y2: sy2,
    };

    Some(RoiPair { primary, secondary })
}
