// src/chordae_analyzer.rs
//
// Chordae (valve-leaflet support) connectivity classification: intensity in
// the tissue region left of the detected valve, relative to intensity in
// the valve region itself. Both regions go through the fixed preprocessing
// pipeline before summation so the ratio compares structure, not noise.

use crate::analysis::decision::connectivity_ratio;
use crate::preprocessing::{crop, intensity_sum, process_region};
use crate::roi::{derive_regions, RoiPair, RoiRules};
use crate::types::{ChordaeConfig, ChordaeResult};
use image::GrayImage;
use tracing::debug;

pub struct ChordaeAnalyzer {
    config: ChordaeConfig,
}

impl ChordaeAnalyzer {
    pub fn new(config: ChordaeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChordaeConfig {
        &self.config
    }

    pub fn roi_rules(&self) -> RoiRules {
        RoiRules {
            shrink_x: self.config.box_shrink_x,
            extend_y: self.config.box_extend_y,
        }
    }

    /// Derive the analysis regions for a detector bbox, or `None` when the
    /// bbox is degenerate after clipping.
    pub fn regions(&self, gray: &GrayImage, bbox: &[f32; 4]) -> Option<RoiPair> {
        let (w, h) = gray.dimensions();
        derive_regions(w, h, bbox, &self.roi_rules())
    }

    /// Preprocessed valve (primary) region.
    pub fn processed_primary(&self, gray: &GrayImage, rois: &RoiPair) -> GrayImage {
        let r = rois.primary;
        process_region(
            &crop(gray, r.x1, r.y1, r.x2, r.y2),
            self.config.noise_thresh_valve,
            self.config.gaussian_kernel,
            self.config.binarization_thresh,
        )
    }

    /// Preprocessed secondary (left-of-valve) region.
    pub fn processed_secondary(&self, gray: &GrayImage, rois: &RoiPair) -> GrayImage {
        let r = rois.secondary;
        process_region(
            &crop(gray, r.x1, r.y1, r.x2, r.y2),
            self.config.noise_thresh_left,
            self.config.gaussian_kernel,
            self.config.binarization_thresh,
        )
    }

    /// Classify one frame given the selected detection bbox. Returns `None`
    /// when the regions are undefined (degenerate bbox).
    pub fn analyze(&self, gray: &GrayImage, bbox: &[f32; 4]) -> Option<ChordaeResult> {
        let rois = self.regions(gray, bbox)?;

        let valve_sum = intensity_sum(&self.processed_primary(gray, &rois));
        let left_sum = intensity_sum(&self.processed_secondary(gray, &rois));

        let (label, ratio) =
            connectivity_ratio(valve_sum, left_sum, self.config.intensity_ratio_thresh);
        debug!(
            valve_sum,
            left_sum, ratio, label, "chordae connectivity ratio"
        );
        Some(ChordaeResult { label, ratio })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn analyzer() -> ChordaeAnalyzer {
        ChordaeAnalyzer::new(ChordaeConfig::default())
    }

    fn frame_with_blocks(valve_bright: bool, left_bright: bool) -> GrayImage {
        let mut img = GrayImage::new(200, 200);
        if valve_bright {
            // Inside the bbox [100, 50, 160, 110].
            for y in 60..100 {
                for x in 110..150 {
                    img.put_pixel(x, y, image::Luma([200]));
                }
            }
        }
        if left_bright {
            // Left of the bbox.
            for y in 60..100 {
                for x in 70..95 {
                    img.put_pixel(x, y, image::Luma([200]));
                }
            }
        }
        img
    }

    const BBOX: [f32; 4] = [100.0, 50.0, 160.0, 110.0];

    #[test]
    fn test_connected_when_left_tissue_present() {
        let img = frame_with_blocks(true, true);
        let result = analyzer().analyze(&img, &BBOX).unwrap();
        assert_eq!(result.label, 1);
        assert!(result.ratio >= 0.21);
    }

    #[test]
    fn test_not_connected_when_left_region_dark() {
        let img = frame_with_blocks(true, false);
        let result = analyzer().analyze(&img, &BBOX).unwrap();
        assert_eq!(result.label, 0);
        assert!(result.ratio < 0.21);
    }

    #[test]
    fn test_no_valve_signal_yields_zero() {
        let img = frame_with_blocks(false, true);
        let result = analyzer().analyze(&img, &BBOX).unwrap();
        assert_eq!(result.label, 0);
        assert_eq!(result.ratio, 0.0);
    }

    #[test]
    fn test_degenerate_bbox_short_circuits() {
        let img = frame_with_blocks(true, true);
        assert!(analyzer().analyze(&img, &[500.0, 500.0, 600.0, 600.0]).is_none());
    }
}
