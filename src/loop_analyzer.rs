// src/loop_analyzer.rs
//
// Anatomical loop open/closed classification inside the sector
// field-of-view. The fan and open-region masks are frame-size constants
// built once; per frame the pipeline is mask → blur → binarize → close →
// seal the open boundary → contour hierarchy → depth-1 max area.

use crate::analysis::contour::ContourForest;
use crate::analysis::decision::loop_state;
use crate::analysis::sector_mask::{draw_line, SectorMask};
use crate::preprocessing::{apply_mask, box_blur, threshold_binary, to_gray};
use crate::types::{LoopConfig, LoopResult};
use image::{GrayImage, RgbImage};
use tracing::debug;

pub struct LoopAnalyzer {
    config: LoopConfig,
    masks: SectorMask,
    apex: (i32, i32),
}

impl LoopAnalyzer {
    /// Build the analyzer for a fixed frame size. Masks never change after
    /// construction.
    pub fn new(config: LoopConfig, frame_w: u32, frame_h: u32) -> Self {
        let masks = SectorMask::build(
            frame_w,
            frame_h,
            &config.sector,
            config.open_boundary_slope,
        );
        let apex = (config.sector.center_x as i32, config.sector.center_y as i32);
        Self {
            config,
            masks,
            apex,
        }
    }

    /// Binary mask after the full per-frame pipeline; what the contour
    /// hierarchy sees.
    pub fn closed_mask(&self, frame: &RgbImage) -> GrayImage {
        let gray = apply_mask(&to_gray(frame), &self.masks.fan);
        let blurred = box_blur(&gray, self.config.blur_ksize);
        let binary = threshold_binary(&blurred, self.config.threshold);
        let mut closed = crate::preprocessing::morph_close(
            &binary,
            self.config.morph_ksize,
            self.config.iterations,
        );
        // Seal the open mitral-valve gap so it is not read as two disjoint
        // regions, then restrict to the anatomically open subregion.
        draw_line(&mut closed, self.apex, self.masks.boundary_point, 3, 255);
        apply_mask(&closed, &self.masks.open_region)
    }

    pub fn analyze(&self, frame: &RgbImage) -> LoopResult {
        let mask = self.closed_mask(frame);
        self.analyze_mask(&mask)
    }

    /// Classification from an already-processed binary mask.
    pub fn analyze_mask(&self, mask: &GrayImage) -> LoopResult {
        let forest = ContourForest::extract(mask);
        let max_area = forest.max_area_at_depth(1);
        let state = loop_state(max_area, self.config.area_thr);
        debug!(max_area, %state, "loop contour analysis");
        LoopResult {
            state,
            max_depth1_area: max_area,
        }
    }
}
