// src/preprocessing.rs
//
// Raster primitives shared by the analyzers, plus the fixed ROI
// preprocessing pipeline (noise suppression → Gaussian smoothing →
// binarization). Everything operates on `image` gray buffers with plain
// pixel loops; borders are clamped.

use image::{GrayImage, RgbImage};

/// Convert an RGB frame to grayscale using the standard luma weights.
pub fn to_gray(frame: &RgbImage) -> GrayImage {
    let (w, h) = frame.dimensions();
    let mut gray = GrayImage::new(w, h);
    for (src, dst) in frame.pixels().zip(gray.pixels_mut()) {
        let [r, g, b] = src.0;
        let v = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        dst.0[0] = v.round().min(255.0) as u8;
    }
    gray
}

/// Extract a rectangular sub-image. Caller guarantees the rectangle is
/// inside the source bounds.
pub fn crop(src: &GrayImage, x1: u32, y1: u32, x2: u32, y2: u32) -> GrayImage {
    let mut out = GrayImage::new(x2 - x1, y2 - y1);
    for y in y1..y2 {
        for x in x1..x2 {
            out.put_pixel(x - x1, y - y1, *src.get_pixel(x, y));
        }
    }
    out
}

/// Fixed preprocessing pipeline for an analysis region.
///
/// Order is load-bearing: suppressing the noise floor before the blur keeps
/// it from biasing the smoothed values, and smoothing before the threshold
/// keeps isolated bright noise pixels from surviving as disconnected
/// contours.
///
/// Reprocessing an already-binarized region is stable only where the bright
/// structure is sparse; along the edge of a solid block the blur leaks more
/// than the binarization threshold, so each pass grows the block by one
/// pixel.
pub fn process_region(
    roi: &GrayImage,
    noise_thresh: u8,
    blur_kernel: u32,
    binarize_thresh: u8,
) -> GrayImage {
    let mut processed = roi.clone();
    if noise_thresh > 0 {
        for p in processed.pixels_mut() {
            if p.0[0] <= noise_thresh {
                p.0[0] = 0;
            }
        }
    }
    let k = blur_kernel | 1; // kernel size must be odd
    let processed = gaussian_blur(&processed, k);
    threshold_binary(&processed, binarize_thresh)
}

/// Separable Gaussian smoothing with an odd kernel size. Sigma follows the
/// usual ksize-derived formula: 0.3·((k−1)/2 − 1) + 0.8.
pub fn gaussian_blur(src: &GrayImage, ksize: u32) -> GrayImage {
    let k = (ksize | 1) as i32;
    let r = k / 2;
    let sigma = 0.3 * ((k - 1) as f32 * 0.5 - 1.0) + 0.8;

    let mut kernel = Vec::with_capacity(k as usize);
    let mut sum = 0.0f32;
    for i in -r..=r {
        let w = (-(i * i) as f32 / (2.0 * sigma * sigma)).exp();
        kernel.push(w);
        sum += w;
    }
    for w in kernel.iter_mut() {
        *w /= sum;
    }

    let (w, h) = src.dimensions();
    if w == 0 || h == 0 {
        return src.clone();
    }

    // Horizontal pass into f32, vertical pass back to u8.
    let mut tmp = vec![0.0f32; (w * h) as usize];
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut acc = 0.0f32;
            for (i, wk) in kernel.iter().enumerate() {
                let sx = (x + i as i32 - r).clamp(0, w as i32 - 1);
                acc += wk * src.get_pixel(sx as u32, y as u32).0[0] as f32;
            }
            tmp[(y as u32 * w + x as u32) as usize] = acc;
        }
    }

    let mut out = GrayImage::new(w, h);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut acc = 0.0f32;
            for (i, wk) in kernel.iter().enumerate() {
                let sy = (y + i as i32 - r).clamp(0, h as i32 - 1);
                acc += wk * tmp[(sy as u32 * w + x as u32) as usize];
            }
            out.put_pixel(x as u32, y as u32, image::Luma([acc.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Normalized k×k mean filter with clamped borders.
pub fn box_blur(src: &GrayImage, ksize: u32) -> GrayImage {
    let k = ksize.max(1) as i32;
    let r0 = k / 2;
    // Even kernels are anchored at the upper-left of center.
    let lo = -r0 + if k % 2 == 0 { 1 } else { 0 };
    let hi = r0;
    let (w, h) = src.dimensions();
    let mut out = GrayImage::new(w, h);
    let norm = 1.0 / (k * k) as f32;
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut acc = 0.0f32;
            for dy in lo..=hi {
                for dx in lo..=hi {
                    let sx = (x + dx).clamp(0, w as i32 - 1);
                    let sy = (y + dy).clamp(0, h as i32 - 1);
                    acc += src.get_pixel(sx as u32, sy as u32).0[0] as f32;
                }
            }
            out.put_pixel(x as u32, y as u32, image::Luma([(acc * norm).round() as u8]));
        }
    }
    out
}

/// Binary threshold: pixels strictly above `thresh` become 255, the rest 0.
pub fn threshold_binary(src: &GrayImage, thresh: u8) -> GrayImage {
    let mut out = src.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > thresh { 255 } else { 0 };
    }
    out
}

/// Offsets of an elliptical (disk) structuring element of the given size.
fn ellipse_offsets(ksize: u32) -> Vec<(i32, i32)> {
    let k = (ksize | 1) as i32;
    let r = k / 2;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

fn dilate_with(src: &GrayImage, offsets: &[(i32, i32)]) -> GrayImage {
    let (w, h) = src.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut v = 0u8;
            for &(dx, dy) in offsets {
                let sx = x + dx;
                let sy = y + dy;
                if sx >= 0 && sx < w as i32 && sy >= 0 && sy < h as i32 {
                    v = v.max(src.get_pixel(sx as u32, sy as u32).0[0]);
                    if v == 255 {
                        break;
                    }
                }
            }
            out.put_pixel(x as u32, y as u32, image::Luma([v]));
        }
    }
    out
}

fn erode_with(src: &GrayImage, offsets: &[(i32, i32)]) -> GrayImage {
    let (w, h) = src.dimensions();
    let mut out = GrayImage::new(w, h);
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut v = 255u8;
            for &(dx, dy) in offsets {
                let sx = x + dx;
                let sy = y + dy;
                // Outside the image counts as background for erosion.
                if sx < 0 || sx >= w as i32 || sy < 0 || sy >= h as i32 {
                    v = 0;
                    break;
                }
                v = v.min(src.get_pixel(sx as u32, sy as u32).0[0]);
                if v == 0 {
                    break;
                }
            }
            out.put_pixel(x as u32, y as u32, image::Luma([v]));
        }
    }
    out
}

pub fn dilate(src: &GrayImage, ksize: u32) -> GrayImage {
    dilate_with(src, &ellipse_offsets(ksize))
}

pub fn erode(src: &GrayImage, ksize: u32) -> GrayImage {
    erode_with(src, &ellipse_offsets(ksize))
}

/// Morphological closing (dilate ×n then erode ×n) with an elliptical
/// kernel. Bridges small gaps between bright structures.
pub fn morph_close(src: &GrayImage, ksize: u32, iterations: u32) -> GrayImage {
    let offsets = ellipse_offsets(ksize);
    let mut img = src.clone();
    for _ in 0..iterations {
        img = dilate_with(&img, &offsets);
    }
    for _ in 0..iterations {
        img = erode_with(&img, &offsets);
    }
    img
}

/// Keep only pixels where `mask` is nonzero.
pub fn apply_mask(src: &GrayImage, mask: &GrayImage) -> GrayImage {
    let mut out = src.clone();
    for (p, m) in out.pixels_mut().zip(mask.pixels()) {
        if m.0[0] == 0 {
            p.0[0] = 0;
        }
    }
    out
}

pub fn count_nonzero(img: &GrayImage) -> u64 {
    img.pixels().filter(|p| p.0[0] != 0).count() as u64
}

pub fn intensity_sum(img: &GrayImage) -> f64 {
    img.pixels().map(|p| p.0[0] as f64).sum()
}
