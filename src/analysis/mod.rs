// src/analysis/mod.rs
//
// Geometric analysis engine modules.
//
// Signal flow:
//   Frame + SectorConfig → sector_mask ──────────┐
//   Frame + bbox ROIs    → preprocessing ────────┼→ contour / decision
//   Binary mask          → contour → curve_fitter ┘
//
// Composed per clinical question by chordae_analyzer, loop_analyzer and
// lv_analyzer.

pub mod contour;
pub mod curve_fitter;
pub mod decision;
pub mod sector_mask;

pub use contour::{ContourForest, ContourNode};
pub use curve_fitter::{fit_boundary_curve, rasterize_curve_mask, CurveFit, Quadratic};
pub use decision::{connectivity_ratio, loop_state, overlap_ratio};
pub use sector_mask::SectorMask;
