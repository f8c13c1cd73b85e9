// src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub io: IoConfig,
    pub chordae: Option<ChordaeConfig>,
    #[serde(rename = "loop")]
    pub loop_: Option<LoopConfig>,
    pub lv: Option<LvConfig>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    pub frames_dir: String,
    pub output_dir: String,
    /// Per-frame detector sidecar JSON files (chordae analysis).
    pub detections_dir: Option<String>,
    /// Per-frame AI segmentation masks (LV analysis).
    pub masks_dir: Option<String>,
    pub save_overlays: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Sector (fan) field-of-view geometry: apex, radius range and the two
/// boundary-line slopes. A pixel is inside iff its radial distance from the
/// apex lies in [r_min, r_max] and it sits below both boundary lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SectorConfig {
    pub center_x: f32,
    pub center_y: f32,
    pub r_min: f32,
    pub r_max: f32,
    pub slope_left: f32,
    pub slope_right: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChordaeConfig {
    /// Detector class ids treated as the mitral valve structure.
    pub target_class_ids: Vec<usize>,
    pub intensity_ratio_thresh: f64,
    pub noise_thresh_left: u8,
    pub noise_thresh_valve: u8,
    pub gaussian_kernel: u32,
    pub binarization_thresh: u8,
    pub box_extend_y: f32,
    pub box_shrink_x: f32,
    pub truth_csv: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    pub blur_ksize: u32,
    pub threshold: u8,
    pub morph_ksize: u32,
    pub iterations: u32,
    pub area_thr: f64,
    pub sector: SectorConfig,
    pub open_boundary_slope: f32,
    pub truth_csv: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LvConfig {
    pub blur_ksize: u32,
    pub threshold: u8,
    pub morph_ksize: u32,
    pub min_area: f64,
    /// Contours whose centroid lies above this fraction of frame height are
    /// excluded from the boundary fit.
    pub pos_ratio: f32,
    pub min_fit_points: usize,
    pub ratio_threshold: f64,
    pub sector: SectorConfig,
    pub truth_csv: Option<String>,
}

impl Default for ChordaeConfig {
    fn default() -> Self {
        Self {
            target_class_ids: vec![0],
            intensity_ratio_thresh: 0.21,
            noise_thresh_left: 30,
            noise_thresh_valve: 30,
            gaussian_kernel: 3,
            binarization_thresh: 35,
            box_extend_y: 0.3,
            box_shrink_x: 0.3,
            truth_csv: None,
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            blur_ksize: 7,
            threshold: 20,
            morph_ksize: 7,
            iterations: 4,
            area_thr: 2600.0,
            sector: SectorConfig {
                center_x: 315.0,
                center_y: 62.0,
                r_min: 0.0,
                r_max: 280.0,
                slope_left: -300.0 / 259.0,
                slope_right: 287.0 / 274.0,
            },
            open_boundary_slope: 6.0,
            truth_csv: None,
        }
    }
}

impl Default for LvConfig {
    fn default() -> Self {
        Self {
            blur_ksize: 21,
            threshold: 120,
            morph_ksize: 7,
            min_area: 300.0,
            pos_ratio: 0.45,
            min_fit_points: 6,
            ratio_threshold: 0.8,
            sector: SectorConfig {
                center_x: 315.0,
                center_y: 62.0,
                r_min: 0.0,
                r_max: 310.0,
                slope_left: -300.0 / 259.0,
                slope_right: 287.0 / 274.0,
            },
            truth_csv: None,
        }
    }
}

/// Loop open/closed state. `Close` means a depth-1 contour (an enclosed
/// cavity) exceeded the area threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopState {
    Open,
    Close,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Open => write!(f, "Open"),
            LoopState::Close => write!(f, "Close"),
        }
    }
}

/// Agreement between the AI segmentation mask and the geometric mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LvState {
    Detected,
    NotDetected,
}

impl std::fmt::Display for LvState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LvState::Detected => write!(f, "Detected"),
            LvState::NotDetected => write!(f, "Not Detected"),
        }
    }
}

/// Chordae connectivity decision. Label 1 = connected. The ratio that
/// produced the label is kept for audit logging.
#[derive(Debug, Clone, Copy)]
pub struct ChordaeResult {
    pub label: u8,
    pub ratio: f64,
}

#[derive(Debug, Clone)]
pub struct LoopResult {
    pub state: LoopState,
    pub max_depth1_area: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct LvResult {
    pub state: LvState,
    pub ratio: f64,
    pub ai_area: u64,
    pub geo_area: u64,
}
