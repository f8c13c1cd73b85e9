// src/lv_analyzer.rs
//
// Left-ventricle detection confidence: agreement between the AI
// segmentation mask and a geometric mask built by fitting a quadratic
// boundary to bright external contours in the lower part of the sector.

use crate::analysis::contour::ContourForest;
use crate::analysis::curve_fitter::{
    fit_boundary_curve, rasterize_curve_mask, select_boundary_points, CurveFit,
};
use crate::analysis::decision::overlap_ratio;
use crate::analysis::sector_mask::fan_mask_curved;
use crate::preprocessing::{
    apply_mask, count_nonzero, dilate, erode, gaussian_blur, threshold_binary, to_gray,
};
use crate::types::{LvConfig, LvResult};
use image::{GrayImage, RgbImage};
use tracing::debug;

pub struct LvAnalyzer {
    config: LvConfig,
    fan: GrayImage,
}

impl LvAnalyzer {
    pub fn new(config: LvConfig, frame_w: u32, frame_h: u32) -> Self {
        let fan = fan_mask_curved(frame_w, frame_h, &config.sector);
        Self { config, fan }
    }

    /// Geometric LV mask: sector pixels above the fitted boundary curve.
    /// Fit failure of either kind degrades to an empty mask.
    pub fn geometric_mask(&self, frame: &RgbImage) -> GrayImage {
        let (_, h) = frame.dimensions();
        let gray = apply_mask(&to_gray(frame), &self.fan);
        let blurred = gaussian_blur(&gray, self.config.blur_ksize);
        let binary = threshold_binary(&blurred, self.config.threshold);
        // Open small speckle before contouring.
        let binary = dilate(&erode(&binary, self.config.morph_ksize), self.config.morph_ksize);

        let forest = ContourForest::extract(&binary);
        let points =
            select_boundary_points(&forest, h, self.config.min_area, self.config.pos_ratio);

        match fit_boundary_curve(&points, self.config.min_fit_points) {
            CurveFit::Fitted(curve) => rasterize_curve_mask(&curve, &self.fan, true),
            CurveFit::InsufficientPoints { found, required } => {
                debug!(found, required, "lv boundary fit: insufficient points");
                GrayImage::new(self.fan.width(), self.fan.height())
            }
            CurveFit::Singular => {
                debug!("lv boundary fit: singular system");
                GrayImage::new(self.fan.width(), self.fan.height())
            }
        }
    }

    /// Classify one frame against the AI segmentation mask supplied by the
    /// external segmenter (consumed only as an area).
    pub fn analyze(&self, frame: &RgbImage, ai_mask: &GrayImage) -> LvResult {
        let geo_mask = self.geometric_mask(frame);
        let geo_area = count_nonzero(&geo_mask);
        let ai_area = count_nonzero(ai_mask);
        let (state, ratio) = overlap_ratio(ai_area, geo_area, self.config.ratio_threshold);
        debug!(ai_area, geo_area, ratio, %state, "lv overlap analysis");
        LvResult {
            state,
            ratio,
            ai_area,
            geo_area,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LvState, SectorConfig};

    fn config() -> LvConfig {
        LvConfig {
            blur_ksize: 3,
            threshold: 120,
            morph_ksize: 3,
            min_area: 20.0,
            pos_ratio: 0.3,
            min_fit_points: 6,
            ratio_threshold: 0.8,
            sector: SectorConfig {
                center_x: 60.0,
                center_y: 2.0,
                r_min: 0.0,
                r_max: 150.0,
                slope_left: -1.2,
                slope_right: 1.1,
            },
            truth_csv: None,
        }
    }

    fn frame_with_band(y0: u32, y1: u32) -> RgbImage {
        // Bright horizontal band across the lower sector.
        let mut frame = RgbImage::new(120, 100);
        for y in y0..y1 {
            for x in 0..120 {
                frame.put_pixel(x, y, image::Rgb([220, 220, 220]));
            }
        }
        frame
    }

    #[test]
    fn test_geometric_mask_above_bright_band() {
        let analyzer = LvAnalyzer::new(config(), 120, 100);
        let frame = frame_with_band(60, 80);
        let mask = analyzer.geometric_mask(&frame);
        assert!(count_nonzero(&mask) > 0);
        // The mask must stay inside the fan and above the band's top edge
        // region; pixels well below the band are excluded.
        for y in 90..100u32 {
            for x in 0..120u32 {
                assert_eq!(mask.get_pixel(x, y).0[0], 0, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_dark_frame_degrades_to_empty_mask() {
        let analyzer = LvAnalyzer::new(config(), 120, 100);
        let frame = RgbImage::new(120, 100);
        let mask = analyzer.geometric_mask(&frame);
        assert_eq!(count_nonzero(&mask), 0);
    }

    #[test]
    fn test_agreeing_masks_detected() {
        let analyzer = LvAnalyzer::new(config(), 120, 100);
        let frame = frame_with_band(60, 80);
        // AI mask equal to the geometric mask → ratio 1.0.
        let geo = analyzer.geometric_mask(&frame);
        let result = analyzer.analyze(&frame, &geo);
        assert_eq!(result.state, LvState::Detected);
        assert!((result.ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_ai_mask_not_detected() {
        let analyzer = LvAnalyzer::new(config(), 120, 100);
        let frame = frame_with_band(60, 80);
        let empty = GrayImage::new(120, 100);
        let result = analyzer.analyze(&frame, &empty);
        assert_eq!(result.state, LvState::NotDetected);
        assert_eq!(result.ratio, 0.0);
        assert_eq!(result.ai_area, 0);
    }
}
