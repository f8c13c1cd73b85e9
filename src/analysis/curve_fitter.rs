// src/analysis/curve_fitter.rs
//
// Least-squares quadratic boundary fit over selected contour points, and
// rasterization of the region above/below the fitted curve inside the
// sector mask. Fit failure is an explicit outcome, not a silent empty
// result: callers can tell "too few points" from "singular system".

use crate::analysis::contour::ContourForest;
use image::GrayImage;

/// y = a·x² + b·x + c in frame pixel coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Quadratic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Quadratic {
    pub fn eval(&self, x: f64) -> f64 {
        self.a * x * x + self.b * x + self.c
    }
}

/// Outcome of a boundary fit attempt.
#[derive(Debug, Clone, Copy)]
pub enum CurveFit {
    Fitted(Quadratic),
    /// Fewer usable boundary points than the configured minimum.
    InsufficientPoints { found: usize, required: usize },
    /// Normal equations were singular (e.g. all points share one x).
    Singular,
}

impl CurveFit {
    pub fn curve(&self) -> Option<Quadratic> {
        match self {
            CurveFit::Fitted(q) => Some(*q),
            _ => None,
        }
    }
}

/// Collect boundary points from external contours that pass the area and
/// centroid-position gates: area above `min_area` and centroid below
/// `pos_ratio` of the frame height (the anatomically relevant lower
/// region).
pub fn select_boundary_points(
    forest: &ContourForest,
    frame_height: u32,
    min_area: f64,
    pos_ratio: f32,
) -> Vec<(i32, i32)> {
    let search_limit_y = frame_height as f32 * pos_ratio;
    let mut points = Vec::new();
    for node in forest.external() {
        if node.area > min_area && node.centroid.1 > search_limit_y {
            points.extend_from_slice(&node.points);
        }
    }
    points
}

/// Fit y = f(x) of degree 2 by least squares over the given points.
pub fn fit_boundary_curve(points: &[(i32, i32)], min_points: usize) -> CurveFit {
    if points.len() < min_points {
        return CurveFit::InsufficientPoints {
            found: points.len(),
            required: min_points,
        };
    }

    // Normal equations for the quadratic: accumulate power sums of x and
    // the mixed x·y moments.
    let mut s0 = 0.0f64;
    let mut s1 = 0.0f64;
    let mut s2 = 0.0f64;
    let mut s3 = 0.0f64;
    let mut s4 = 0.0f64;
    let mut sy0 = 0.0f64;
    let mut sy1 = 0.0f64;
    let mut sy2 = 0.0f64;
    for &(x, y) in points {
        let xd = x as f64;
        let yd = y as f64;
        let x2 = xd * xd;
        s0 += 1.0;
        s1 += xd;
        s2 += x2;
        s3 += x2 * xd;
        s4 += x2 * x2;
        sy0 += yd;
        sy1 += yd * xd;
        sy2 += yd * x2;
    }

    match solve_3x3([s4, s3, s2, s3, s2, s1, s2, s1, s0], [sy2, sy1, sy0]) {
        Some((a, b, c)) => CurveFit::Fitted(Quadratic { a, b, c }),
        None => CurveFit::Singular,
    }
}

/// Rasterize the sector-mask pixels on one side of the curve. `above` keeps
/// pixels with y strictly less than the curve (upward in image
/// coordinates).
pub fn rasterize_curve_mask(curve: &Quadratic, sector_mask: &GrayImage, above: bool) -> GrayImage {
    let (w, h) = sector_mask.dimensions();
    let mut out = GrayImage::new(w, h);
    for x in 0..w {
        let y_curve = curve.eval(x as f64);
        for y in 0..h {
            if sector_mask.get_pixel(x, y).0[0] == 0 {
                continue;
            }
            let side = if above {
                (y as f64) < y_curve
            } else {
                (y as f64) > y_curve
            };
            if side {
                out.put_pixel(x, y, image::Luma([255]));
            }
        }
    }
    out
}

/// Solve a 3×3 linear system Ax = b by Gaussian elimination with partial
/// pivoting. Matrix is row-major. Returns None when singular.
fn solve_3x3(mat: [f64; 9], rhs: [f64; 3]) -> Option<(f64, f64, f64)> {
    let mut m = [
        [mat[0], mat[1], mat[2], rhs[0]],
        [mat[3], mat[4], mat[5], rhs[1]],
        [mat[6], mat[7], mat[8], rhs[2]],
    ];

    for col in 0..3 {
        let mut max_val = m[col][col].abs();
        let mut max_row = col;
        for row in (col + 1)..3 {
            if m[row][col].abs() > max_val {
                max_val = m[row][col].abs();
                max_row = row;
            }
        }

        if max_val < 1e-12 {
            return None;
        }

        if max_row != col {
            m.swap(col, max_row);
        }

        for row in (col + 1)..3 {
            let factor = m[row][col] / m[col][col];
            for j in col..4 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    if m[2][2].abs() < 1e-12 {
        return None;
    }
    let c = m[2][3] / m[2][2];
    let b = (m[1][3] - m[1][2] * c) / m[1][1];
    let a = (m[0][3] - m[0][2] * c - m[0][1] * b) / m[0][0];

    if a.is_finite() && b.is_finite() && c.is_finite() {
        Some((a, b, c))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn test_solve_3x3_identity() {
        let (a, b, c) = solve_3x3(
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            [1.0, 2.0, 3.0],
        )
        .unwrap();
        assert!((a - 1.0).abs() < 1e-10);
        assert!((b - 2.0).abs() < 1e-10);
        assert!((c - 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_solve_3x3_singular() {
        let result = solve_3x3(
            [1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            [1.0, 1.0, 2.0],
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_fit_exact_parabola() {
        // y = 0.05·x² − 2·x + 40
        let points: Vec<(i32, i32)> = (0..40)
            .map(|i| {
                let x = i * 5;
                let y = (0.05 * (x * x) as f64 - 2.0 * x as f64 + 40.0).round() as i32;
                (x, y)
            })
            .collect();
        let q = fit_boundary_curve(&points, 6).curve().unwrap();
        assert!((q.a - 0.05).abs() < 1e-3, "a = {}", q.a);
        assert!((q.b + 2.0).abs() < 0.2, "b = {}", q.b);
    }

    #[test]
    fn test_insufficient_points_is_explicit() {
        let points = vec![(0, 0), (1, 1), (2, 2)];
        match fit_boundary_curve(&points, 6) {
            CurveFit::InsufficientPoints { found, required } => {
                assert_eq!(found, 3);
                assert_eq!(required, 6);
            }
            other => panic!("expected InsufficientPoints, got {:?}", other),
        }
    }

    #[test]
    fn test_all_points_share_one_x_is_singular() {
        let points: Vec<(i32, i32)> = (0..20).map(|y| (7, y)).collect();
        assert!(matches!(
            fit_boundary_curve(&points, 6),
            CurveFit::Singular
        ));
    }

    #[test]
    fn test_rasterize_above_curve_inside_mask() {
        // Flat curve y = 5 over a fully-set mask: above keeps rows 0..=4.
        let q = Quadratic {
            a: 0.0,
            b: 0.0,
            c: 5.0,
        };
        let mask = GrayImage::from_pixel(10, 10, image::Luma([255]));
        let above = rasterize_curve_mask(&q, &mask, true);
        assert_eq!(above.get_pixel(3, 4).0[0], 255);
        assert_eq!(above.get_pixel(3, 5).0[0], 0);
        let below = rasterize_curve_mask(&q, &mask, false);
        assert_eq!(below.get_pixel(3, 5).0[0], 0);
        assert_eq!(below.get_pixel(3, 6).0[0], 255);
    }

    #[test]
    fn test_rasterize_respects_mask() {
        let q = Quadratic {
            a: 0.0,
            b: 0.0,
            c: 100.0,
        };
        let mask = GrayImage::new(10, 10); // all zero
        let out = rasterize_curve_mask(&q, &mask, true);
        assert!(out.pixels().all(|p| p.0[0] == 0));
    }
}
