// src/analysis/sector_mask.rs
//
// Sector (fan) field-of-view masks for the annulus-wedge acquisition
// geometry of an ultrasound probe. Membership is a closed-form per-pixel
// test — radial distance within [r_min, r_max] and below both boundary
// lines through the apex — so masks are exact and reproducible.

use crate::types::SectorConfig;
use image::GrayImage;

/// Precomputed masks for one sector geometry at a fixed frame size.
#[derive(Debug, Clone)]
pub struct SectorMask {
    /// 255 inside the ring ∩ wedge, 0 elsewhere.
    pub fan: GrayImage,
    /// Same ring, with the right boundary replaced by the open-boundary
    /// slope; marks the subregion considered anatomically open.
    pub open_region: GrayImage,
    /// Point at distance r_max along the open-boundary slope from the apex;
    /// endpoint of the closing line drawn across the open valve gap.
    pub boundary_point: (i32, i32),
}

impl SectorMask {
    pub fn build(w: u32, h: u32, sector: &SectorConfig, open_slope: f32) -> Self {
        let fan = fan_mask(w, h, sector);
        let open_region = wedge_ring_mask(w, h, sector, sector.slope_left, open_slope);

        let (cx, cy) = (sector.center_x, sector.center_y);
        let dx = sector.r_max / (1.0 + open_slope * open_slope).sqrt();
        let boundary_point = ((cx + dx) as i32, (cy + open_slope * dx) as i32);

        Self {
            fan,
            open_region,
            boundary_point,
        }
    }
}

/// Fan mask from the radial formulation: ring test on the Euclidean
/// distance from the apex, wedge test against both boundary lines.
pub fn fan_mask(w: u32, h: u32, sector: &SectorConfig) -> GrayImage {
    wedge_ring_mask(w, h, sector, sector.slope_left, sector.slope_right)
}

fn wedge_ring_mask(
    w: u32,
    h: u32,
    sector: &SectorConfig,
    slope_a: f32,
    slope_b: f32,
) -> GrayImage {
    let (cx, cy) = (sector.center_x, sector.center_y);
    let (r_min, r_max) = (sector.r_min, sector.r_max);
    let mut mask = GrayImage::new(w, h);
    for y in 0..h {
        let yf = y as f32;
        for x in 0..w {
            let dx = x as f32 - cx;
            let dy = yf - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            let in_ring = dist >= r_min && dist <= r_max;
            let in_wedge = yf >= slope_a * dx + cy && yf >= slope_b * dx + cy;
            if in_ring && in_wedge {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
    }
    mask
}

/// Fan mask from the curved-boundary formulation used by the LV geometry
/// flavor: the ring bounds are expressed as y = cy + sqrt(r² − X²), clipped
/// at zero. Equivalent to the radial test inside the wedge for consistent
/// parameters.
pub fn fan_mask_curved(w: u32, h: u32, sector: &SectorConfig) -> GrayImage {
    let (cx, cy) = (sector.center_x, sector.center_y);
    let (r_min, r_max) = (sector.r_min, sector.r_max);
    let (a_l, a_r) = (sector.slope_left, sector.slope_right);
    let mut mask = GrayImage::new(w, h);
    for y in 0..h {
        let yf = y as f32;
        for x in 0..w {
            let dx = x as f32 - cx;
            let inside_lines = yf >= a_l * dx + cy && yf >= a_r * dx + cy;
            let y_lo = (r_min * r_min - dx * dx).max(0.0).sqrt() + cy;
            let y_hi = (r_max * r_max - dx * dx).max(0.0).sqrt() + cy;
            if inside_lines && yf >= y_lo && yf <= y_hi {
                mask.put_pixel(x, y, image::Luma([255]));
            }
        }
    }
    mask
}

/// Stamp a straight line of the given thickness onto a mask. Used to close
/// the open mitral-valve gap before contour extraction so the gap is not
/// misread as two disjoint regions.
pub fn draw_line(mask: &mut GrayImage, from: (i32, i32), to: (i32, i32), thickness: i32, value: u8) {
    let (w, h) = mask.dimensions();
    let r = (thickness / 2).max(0);
    let dx = (to.0 - from.0).abs();
    let dy = -(to.1 - from.1).abs();
    let sx = if from.0 < to.0 { 1 } else { -1 };
    let sy = if from.1 < to.1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = from;
    loop {
        for oy in -r..=r {
            for ox in -r..=r {
                let px = x + ox;
                let py = y + oy;
                if px >= 0 && px < w as i32 && py >= 0 && py < h as i32 {
                    mask.put_pixel(px as u32, py as u32, image::Luma([value]));
                }
            }
        }
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector() -> SectorConfig {
        SectorConfig {
            center_x: 50.0,
            center_y: 10.0,
            r_min: 5.0,
            r_max: 40.0,
            slope_left: -1.2,
            slope_right: 1.1,
        }
    }

    #[test]
    fn test_fan_mask_membership_is_exact() {
        let s = sector();
        let mask = fan_mask(100, 80, &s);
        for y in 0..80u32 {
            for x in 0..100u32 {
                let dx = x as f32 - s.center_x;
                let dy = y as f32 - s.center_y;
                let dist = (dx * dx + dy * dy).sqrt();
                let inside = dist >= s.r_min
                    && dist <= s.r_max
                    && y as f32 >= s.slope_left * dx + s.center_y
                    && y as f32 >= s.slope_right * dx + s.center_y;
                let flagged = mask.get_pixel(x, y).0[0] == 255;
                assert_eq!(flagged, inside, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_r_min_zero_includes_inner_disk() {
        let mut s = sector();
        s.r_min = 0.0;
        let mask = fan_mask(100, 80, &s);
        // Just below the apex, inside the wedge and the full disk.
        assert_eq!(mask.get_pixel(50, 12).0[0], 255);
    }

    #[test]
    fn test_curved_variant_matches_radial_inside_wedge() {
        // With r_min = 0 the two formulations agree below the apex row.
        let mut s = sector();
        s.r_min = 0.0;
        let radial = fan_mask(100, 80, &s);
        let curved = fan_mask_curved(100, 80, &s);
        for y in (s.center_y as u32 + 1)..80 {
            for x in 0..100u32 {
                assert_eq!(
                    radial.get_pixel(x, y).0[0],
                    curved.get_pixel(x, y).0[0],
                    "pixel ({}, {})",
                    x,
                    y
                );
            }
        }
    }

    #[test]
    fn test_open_region_and_boundary_point() {
        let s = sector();
        let open_slope = 6.0;
        let sm = SectorMask::build(100, 80, &s, open_slope);
        // Boundary point lies at distance r_max along the open slope.
        let (bx, by) = sm.boundary_point;
        let dx = bx as f32 - s.center_x;
        let dy = by as f32 - s.center_y;
        let dist = (dx * dx + dy * dy).sqrt();
        assert!((dist - s.r_max).abs() < 2.0);
        // The open region excludes pixels right of the open boundary that
        // the full fan still contains.
        let open_count: u32 = sm.open_region.pixels().filter(|p| p.0[0] == 255).count() as u32;
        let fan_count: u32 = sm.fan.pixels().filter(|p| p.0[0] == 255).count() as u32;
        assert!(open_count < fan_count);
        assert!(open_count > 0);
    }

    #[test]
    fn test_degenerate_slopes_tolerated() {
        // Equal boundary slopes collapse the wedge to a half-plane; the
        // builder must still produce a well-formed mask.
        let s = SectorConfig {
            center_x: 50.0,
            center_y: 10.0,
            r_min: 100.0,
            r_max: 100.0,
            slope_left: 1.0,
            slope_right: 1.0,
        };
        let mask = fan_mask(60, 40, &s);
        // r_min == r_max beyond the frame: nothing can satisfy the ring test.
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_draw_line_thickness() {
        let mut mask = GrayImage::new(20, 20);
        draw_line(&mut mask, (2, 10), (17, 10), 3, 255);
        assert_eq!(mask.get_pixel(10, 9).0[0], 255);
        assert_eq!(mask.get_pixel(10, 10).0[0], 255);
        assert_eq!(mask.get_pixel(10, 11).0[0], 255);
        assert_eq!(mask.get_pixel(10, 13).0[0], 0);
    }
}
