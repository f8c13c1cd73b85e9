// src/overlay.rs
//
// Diagnostic overlays: the analyzed regions pasted over a darkened copy of
// the frame, rectangles around region boundaries, and the decision text in
// a label-matched color. Text uses a built-in 5×7 glyph set so rendering
// needs no font assets.

use crate::analysis::contour::ContourForest;
use crate::roi::Region;
use crate::types::{LoopState, LvState};
use image::{GrayImage, Rgb, RgbImage};

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Uniformly darken a frame (factor in [0, 1]).
pub fn darken(frame: &RgbImage, factor: f32) -> RgbImage {
    let mut out = frame.clone();
    for p in out.pixels_mut() {
        for c in p.0.iter_mut() {
            *c = (*c as f32 * factor) as u8;
        }
    }
    out
}

/// Paste a gray region into an RGB frame at the region's position.
pub fn paste_gray(dst: &mut RgbImage, src: &GrayImage, region: &Region) {
    let (w, h) = dst.dimensions();
    for sy in 0..src.height() {
        for sx in 0..src.width() {
            let x = region.x1 + sx;
            let y = region.y1 + sy;
            if x < w && y < h {
                let v = src.get_pixel(sx, sy).0[0];
                dst.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
    }
}

/// Rectangle outline of the given thickness, clipped to the frame.
pub fn draw_rect(dst: &mut RgbImage, region: &Region, color: Rgb<u8>, thickness: u32) {
    let (w, h) = dst.dimensions();
    for t in 0..thickness {
        let x1 = region.x1.saturating_sub(t);
        let y1 = region.y1.saturating_sub(t);
        let x2 = (region.x2 + t).min(w);
        let y2 = (region.y2 + t).min(h);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }
        for x in x1..x2 {
            dst.put_pixel(x, y1, color);
            dst.put_pixel(x, y2 - 1, color);
        }
        for y in y1..y2 {
            dst.put_pixel(x1, y, color);
            dst.put_pixel(x2 - 1, y, color);
        }
    }
}

// 5×7 glyphs, one bitmask row per byte, bit 4 = leftmost column.
const GLYPHS: [[u8; 7]; 26] = [
    [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // A
    [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E], // B
    [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E], // C
    [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E], // D
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F], // E
    [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10], // F
    [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F], // G
    [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11], // H
    [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E], // I
    [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C], // J
    [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11], // K
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F], // L
    [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11], // M
    [0x11, 0x19, 0x15, 0x13, 0x11, 0x11, 0x11], // N
    [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // O
    [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10], // P
    [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D], // Q
    [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11], // R
    [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E], // S
    [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04], // T
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E], // U
    [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04], // V
    [0x11, 0x11, 0x11, 0x15, 0x15, 0x1B, 0x11], // W
    [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11], // X
    [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04], // Y
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F], // Z
];
const GLYPH_COLON: [u8; 7] = [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00];

fn glyph_for(c: char) -> Option<&'static [u8; 7]> {
    match c {
        'A'..='Z' => Some(&GLYPHS[(c as usize) - ('A' as usize)]),
        ':' => Some(&GLYPH_COLON),
        _ => None,
    }
}

/// Draw uppercase text at the given origin; a black outline pass keeps the
/// label legible over bright regions.
pub fn draw_text(dst: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    for (dx, dy) in [(-1, -1), (1, -1), (-1, 1), (1, 1), (0, -1), (0, 1), (-1, 0), (1, 0)] {
        draw_text_pass(dst, text, x + dx, y + dy, scale, BLACK);
    }
    draw_text_pass(dst, text, x, y, scale, color);
}

fn draw_text_pass(dst: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let (w, h) = dst.dimensions();
    let mut cursor = x;
    let advance = (6 * scale) as i32;
    for c in text.to_uppercase().chars() {
        if let Some(glyph) = glyph_for(c) {
            for (row, bits) in glyph.iter().enumerate() {
                for col in 0..5 {
                    if bits & (0x10 >> col) == 0 {
                        continue;
                    }
                    for sy in 0..scale {
                        for sx in 0..scale {
                            let px = cursor + (col * scale + sx) as i32;
                            let py = y + (row as u32 * scale + sy) as i32;
                            if px >= 0 && py >= 0 && (px as u32) < w && (py as u32) < h {
                                dst.put_pixel(px as u32, py as u32, color);
                            }
                        }
                    }
                }
            }
        }
        cursor += advance;
    }
}

/// Chordae overlay: darkened frame with both processed regions pasted in
/// place, rectangles marking the region boundaries, and the decision text.
pub fn chordae_overlay(
    frame: &RgbImage,
    primary: (&Region, &GrayImage),
    secondary: (&Region, &GrayImage),
    label: Option<u8>,
) -> RgbImage {
    let mut vis = darken(frame, 0.4);
    paste_gray(&mut vis, primary.1, primary.0);
    paste_gray(&mut vis, secondary.1, secondary.0);
    draw_rect(&mut vis, primary.0, RED, 2);
    draw_rect(&mut vis, secondary.0, YELLOW, 2);

    if let Some(label) = label {
        let (text, color) = if label == 1 {
            ("CHORDAE: CONNECTED", RED)
        } else {
            ("CHORDAE: NONE", YELLOW)
        };
        let y = frame.height() as i32 - 30;
        draw_text(&mut vis, text, 20, y, 2, color);
    }
    vis
}

/// Loop overlay: the processed binary mask with contour outlines and the
/// open/closed state.
pub fn loop_overlay(mask: &GrayImage, forest: &ContourForest, state: LoopState) -> RgbImage {
    let mut vis = RgbImage::new(mask.width(), mask.height());
    for (src, dst) in mask.pixels().zip(vis.pixels_mut()) {
        let v = src.0[0];
        dst.0 = [v, v, v];
    }
    for node in forest.nodes() {
        for &(x, y) in &node.points {
            if x >= 0 && y >= 0 && (x as u32) < vis.width() && (y as u32) < vis.height() {
                vis.put_pixel(x as u32, y as u32, GREEN);
            }
        }
    }
    let (text, color) = match state {
        LoopState::Close => ("STATE: CLOSE", RED),
        LoopState::Open => ("STATE: OPEN", YELLOW),
    };
    draw_text(&mut vis, text, 20, 20, 2, color);
    vis
}

/// LV overlay: darkened frame with the geometric mask tinted in.
pub fn lv_overlay(frame: &RgbImage, geo_mask: &GrayImage, state: LvState) -> RgbImage {
    let mut vis = darken(frame, 0.4);
    for (m, p) in geo_mask.pixels().zip(vis.pixels_mut()) {
        if m.0[0] != 0 {
            p.0[1] = p.0[1].saturating_add(90);
        }
    }
    let (text, color) = match state {
        LvState::Detected => ("LV: DETECTED", GREEN),
        LvState::NotDetected => ("LV: NOT DETECTED", YELLOW),
    };
    let y = frame.height() as i32 - 30;
    draw_text(&mut vis, text, 20, y, 2, color);
    vis
}
