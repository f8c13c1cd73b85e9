// src/main.rs

mod analysis;
mod chordae_analyzer;
mod config;
mod detection;
mod evaluation;
mod loop_analyzer;
mod lv_analyzer;
mod overlay;
mod preprocessing;
mod report;
mod roi;
mod types;

use anyhow::{Context, Result};
use chordae_analyzer::ChordaeAnalyzer;
use image::{GrayImage, RgbImage};
use loop_analyzer::LoopAnalyzer;
use lv_analyzer::LvAnalyzer;
use report::{format_ratio, CsvLog};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use types::Config;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

fn main() -> Result<()> {
    let config_path =
        std::env::var("ECHO_ANALYSIS_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!("echo_analysis={}", config.logging.level))
        .init();

    info!("🫀 Echo Analysis Starting");
    info!("✓ Configuration loaded from {}", config_path);

    if !Path::new(&config.io.frames_dir).is_dir() {
        error!("Frames directory not found: {}", config.io.frames_dir);
        anyhow::bail!("frames directory not found: {}", config.io.frames_dir);
    }
    std::fs::create_dir_all(&config.io.output_dir)
        .with_context(|| format!("creating output dir {}", config.io.output_dir))?;

    let frames = find_frame_files(&config.io.frames_dir);
    if frames.is_empty() {
        error!("No frames found in {}", config.io.frames_dir);
        return Ok(());
    }
    info!("Found {} frame(s) to process", frames.len());

    let stats = process_frames(&config, &frames)?;

    info!("\n✓ Batch complete");
    info!("  Frames processed: {}", stats.processed);
    info!("  Frames skipped:   {}", stats.skipped);
    if config.chordae.is_some() {
        info!(
            "  Chordae: {} connected, {} none, {} undetected",
            stats.chordae_connected, stats.chordae_none, stats.chordae_undetected
        );
    }
    if config.loop_.is_some() {
        info!("  Loop: {} close, {} open", stats.loop_close, stats.loop_open);
    }
    if config.lv.is_some() {
        info!(
            "  LV: {} detected, {} not detected",
            stats.lv_detected, stats.lv_not_detected
        );
    }

    Ok(())
}

#[derive(Default)]
struct BatchStats {
    processed: usize,
    skipped: usize,
    chordae_connected: usize,
    chordae_none: usize,
    chordae_undetected: usize,
    loop_close: usize,
    loop_open: usize,
    lv_detected: usize,
    lv_not_detected: usize,
}

fn find_frame_files(dir: &str) -> Vec<PathBuf> {
    let mut frames: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    frames.sort();
    frames
}

fn process_frames(config: &Config, frames: &[PathBuf]) -> Result<BatchStats> {
    let out_dir = Path::new(&config.io.output_dir);
    let overlay_dir = out_dir.join("overlays");
    if config.io.save_overlays {
        std::fs::create_dir_all(&overlay_dir)?;
    }

    let mut stats = BatchStats::default();

    // Analyzers are built against the first readable frame's dimensions;
    // the sector masks are constants after that.
    let mut chordae: Option<(ChordaeAnalyzer, CsvLog)> = None;
    let mut loop_: Option<(LoopAnalyzer, CsvLog)> = None;
    let mut lv: Option<(LvAnalyzer, CsvLog)> = None;
    let mut frame_dims: Option<(u32, u32)> = None;

    let mut chordae_preds: Vec<String> = Vec::new();
    let mut loop_preds: Vec<String> = Vec::new();
    let mut lv_preds: Vec<String> = Vec::new();

    for (idx, path) in frames.iter().enumerate() {
        let frame = match image::open(path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                warn!("Skipping unreadable frame {}: {}", path.display(), e);
                stats.skipped += 1;
                continue;
            }
        };
        let (w, h) = frame.dimensions();

        match frame_dims {
            None => {
                frame_dims = Some((w, h));
                if let Some(cfg) = &config.chordae {
                    let log = CsvLog::create(&out_dir.join("log_chordae.csv"), &["Frame", "Label", "Ratio"])?;
                    chordae = Some((ChordaeAnalyzer::new(cfg.clone()), log));
                }
                if let Some(cfg) = &config.loop_ {
                    let log = CsvLog::create(
                        &out_dir.join("log_loop.csv"),
                        &["Frame", "State", "MaxArea_Depth1"],
                    )?;
                    loop_ = Some((LoopAnalyzer::new(cfg.clone(), w, h), log));
                }
                if let Some(cfg) = &config.lv {
                    let log = CsvLog::create(
                        &out_dir.join("log_lv.csv"),
                        &["Frame", "AI_Area", "Geo_Area", "Ratio", "State"],
                    )?;
                    lv = Some((LvAnalyzer::new(cfg.clone(), w, h), log));
                }
            }
            Some(dims) if dims != (w, h) => {
                warn!(
                    "Skipping frame {} with mismatched size {}x{} (expected {}x{})",
                    path.display(),
                    w,
                    h,
                    dims.0,
                    dims.1
                );
                stats.skipped += 1;
                continue;
            }
            Some(_) => {}
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("frame")
            .to_string();

        if let Some((analyzer, log)) = chordae.as_mut() {
            run_chordae(
                config, analyzer, log, &frame, idx, &stem, &overlay_dir, &mut stats,
                &mut chordae_preds,
            )?;
        }

        if let Some((analyzer, log)) = loop_.as_mut() {
            let result = analyzer.analyze(&frame);
            match result.state {
                types::LoopState::Close => stats.loop_close += 1,
                types::LoopState::Open => stats.loop_open += 1,
            }
            log.write_row(&[
                idx.to_string(),
                result.state.to_string(),
                format!("{:.1}", result.max_depth1_area),
            ])?;
            loop_preds.push(result.state.to_string());

            if config.io.save_overlays {
                let mask = analyzer.closed_mask(&frame);
                let forest = analysis::contour::ContourForest::extract(&mask);
                let vis = overlay::loop_overlay(&mask, &forest, result.state);
                save_overlay(&vis, &overlay_dir.join(format!("loop_{}.png", stem)));
            }
        }

        if let Some((analyzer, log)) = lv.as_mut() {
            let ai_mask = load_ai_mask(config, &stem, path, w, h);
            let result = analyzer.analyze(&frame, &ai_mask);
            match result.state {
                types::LvState::Detected => stats.lv_detected += 1,
                types::LvState::NotDetected => stats.lv_not_detected += 1,
            }
            log.write_row(&[
                idx.to_string(),
                result.ai_area.to_string(),
                result.geo_area.to_string(),
                format_ratio(result.ratio),
                result.state.to_string(),
            ])?;
            lv_preds.push(result.state.to_string());

            if config.io.save_overlays {
                let geo = analyzer.geometric_mask(&frame);
                let vis = overlay::lv_overlay(&frame, &geo, result.state);
                save_overlay(&vis, &overlay_dir.join(format!("lv_{}.png", stem)));
            }
        }

        stats.processed += 1;
        if idx % 50 == 0 {
            debug!("Frame {}/{}", idx, frames.len());
        }
    }

    for log in [
        chordae.as_mut().map(|(_, l)| l),
        loop_.as_mut().map(|(_, l)| l),
        lv.as_mut().map(|(_, l)| l),
    ]
    .into_iter()
    .flatten()
    {
        log.flush()?;
    }

    // Accuracy evaluation where ground truth is configured.
    if let Some(cfg) = &config.chordae {
        if let Some(truth) = &cfg.truth_csv {
            evaluation::evaluate("chordae", &chordae_preds, Path::new(truth), "1")?;
        }
    }
    if let Some(cfg) = &config.loop_ {
        if let Some(truth) = &cfg.truth_csv {
            evaluation::evaluate("loop", &loop_preds, Path::new(truth), "Close")?;
        }
    }
    if let Some(cfg) = &config.lv {
        if let Some(truth) = &cfg.truth_csv {
            evaluation::evaluate("lv", &lv_preds, Path::new(truth), "Detected")?;
        }
    }

    Ok(stats)
}

#[allow(clippy::too_many_arguments)]
fn run_chordae(
    config: &Config,
    analyzer: &ChordaeAnalyzer,
    log: &mut CsvLog,
    frame: &RgbImage,
    idx: usize,
    stem: &str,
    overlay_dir: &Path,
    stats: &mut BatchStats,
    preds: &mut Vec<String>,
) -> Result<()> {
    let gray = preprocessing::to_gray(frame);

    let detections = match &config.io.detections_dir {
        Some(dir) => match detection::load_detections(&Path::new(dir).join(format!("{}.json", stem)))
        {
            Ok(dets) => dets,
            Err(e) => {
                warn!("Frame {}: bad detection sidecar: {:#}", idx, e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let best = detection::select_target(&detections, &analyzer.config().target_class_ids);
    let outcome = best.and_then(|det| analyzer.analyze(&gray, &det.bbox));

    match outcome {
        Some(result) => {
            if result.label == 1 {
                stats.chordae_connected += 1;
            } else {
                stats.chordae_none += 1;
            }
            log.write_row(&[
                idx.to_string(),
                result.label.to_string(),
                format_ratio(result.ratio),
            ])?;
            preds.push(result.label.to_string());
        }
        None => {
            stats.chordae_undetected += 1;
            log.write_row(&[idx.to_string(), "Undetected".to_string(), format_ratio(0.0)])?;
            preds.push("Undetected".to_string());
        }
    }

    if config.io.save_overlays {
        if let Some(rois) = best.and_then(|det| analyzer.regions(&gray, &det.bbox)) {
            let primary = analyzer.processed_primary(&gray, &rois);
            let secondary = analyzer.processed_secondary(&gray, &rois);
            let vis = overlay::chordae_overlay(
                frame,
                (&rois.primary, &primary),
                (&rois.secondary, &secondary),
                outcome.map(|r| r.label),
            );
            save_overlay(&vis, &overlay_dir.join(format!("chordae_{}.png", stem)));
        }
    }

    Ok(())
}

/// AI segmentation mask for one frame, or an empty mask when the segmenter
/// produced nothing. Sized to the frame; a mismatched mask is rejected.
fn load_ai_mask(config: &Config, stem: &str, frame_path: &Path, w: u32, h: u32) -> GrayImage {
    let Some(dir) = &config.io.masks_dir else {
        return GrayImage::new(w, h);
    };
    let path = Path::new(dir).join(format!("{}.png", stem));
    if !path.exists() {
        debug!("no AI mask for {}", frame_path.display());
        return GrayImage::new(w, h);
    }
    match image::open(&path) {
        Ok(img) => {
            let mask = img.to_luma8();
            if mask.dimensions() != (w, h) {
                warn!(
                    "AI mask {} has wrong size {}x{}, ignoring",
                    path.display(),
                    mask.width(),
                    mask.height()
                );
                GrayImage::new(w, h)
            } else {
                mask
            }
        }
        Err(e) => {
            warn!("Unreadable AI mask {}: {}", path.display(), e);
            GrayImage::new(w, h)
        }
    }
}

fn save_overlay(vis: &RgbImage, path: &Path) {
    if let Err(e) = vis.save(path) {
        warn!("Failed to save overlay {}: {}", path.display(), e);
    }
}
