// src/analysis/contour.rs
//
// Contour extraction with full nesting hierarchy from a binary mask.
//
// Regions are labeled first (foreground 8-connected, background
// 4-connected, with the border-touching background as the root), then each
// region's outer border is traced into an ordered polyline. Nesting gives
// the parent links: a foreground region's parent contour is the hole it
// sits in, a hole's parent is the foreground region enclosing it. Depth 0
// is an outermost silhouette, depth 1 an enclosed cavity inside it, and so
// on — the depth-1 level is what the loop open/closed rule inspects.

use image::GrayImage;
use tracing::warn;

/// One contour: ordered boundary polyline plus derived scalars and the
/// index of the immediately enclosing contour, if any.
#[derive(Debug, Clone)]
pub struct ContourNode {
    pub points: Vec<(i32, i32)>,
    /// Polygon (shoelace) area of the traced boundary.
    pub area: f64,
    /// Polygon centroid; falls back to (0, 0) for degenerate contours, which
    /// keeps them out of position-gated filters.
    pub centroid: (f32, f32),
    pub parent: Option<usize>,
    /// True when this contour bounds a hole rather than a silhouette.
    pub is_hole: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ContourForest {
    nodes: Vec<ContourNode>,
}

// Region ids in the label map. 0 is reserved for the outside background.
const UNLABELED: u32 = u32::MAX;
const OUTER_BG: u32 = 0;

struct LabelMap {
    labels: Vec<u32>,
    w: i32,
    h: i32,
}

impl LabelMap {
    fn at(&self, x: i32, y: i32) -> u32 {
        if x < 0 || y < 0 || x >= self.w || y >= self.h {
            OUTER_BG
        } else {
            self.labels[(y * self.w + x) as usize]
        }
    }
}

struct RegionInfo {
    foreground: bool,
    /// Topmost-leftmost pixel, in scan order.
    seed: (i32, i32),
}

impl ContourForest {
    /// Extract the contour forest of a binary (0/255) mask.
    pub fn extract(mask: &GrayImage) -> Self {
        let (w, h) = mask.dimensions();
        if w == 0 || h == 0 {
            return Self::default();
        }
        let (labels, regions) = label_regions(mask);

        // Region id → immediate enclosing region id, via the pixel directly
        // above each region's topmost pixel. Regions alternate
        // foreground/background along any ancestor chain.
        let mut nodes = Vec::with_capacity(regions.len());
        let mut region_to_node = vec![usize::MAX; regions.len() + 1];
        for (idx, info) in regions.iter().enumerate() {
            let region_id = idx as u32 + 1;
            let points = trace_border(&labels, region_id, info.seed);
            let area = polygon_area(&points);
            let centroid = polygon_centroid(&points).unwrap_or((0.0, 0.0));
            nodes.push(ContourNode {
                points,
                area,
                centroid,
                parent: None,
                is_hole: !info.foreground,
            });
            region_to_node[region_id as usize] = idx;
        }
        for (idx, info) in regions.iter().enumerate() {
            let (sx, sy) = info.seed;
            let above = labels.at(sx, sy - 1);
            if above != OUTER_BG {
                nodes[idx].parent = Some(region_to_node[above as usize]);
            }
        }

        Self { nodes }
    }

    pub fn nodes(&self) -> &[ContourNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nesting depth of a contour: the number of ancestors above it. The
    /// parent walk is bounded by the node count so a malformed hierarchy
    /// degrades to a warning instead of an unbounded loop.
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.nodes[index].parent;
        while let Some(p) = current {
            depth += 1;
            if depth > self.nodes.len() {
                warn!("contour hierarchy contains a cycle at node {}", index);
                return depth;
            }
            current = self.nodes[p].parent;
        }
        depth
    }

    /// Largest contour area at the given nesting depth, or 0.0 when the
    /// level is empty.
    pub fn max_area_at_depth(&self, target_depth: usize) -> f64 {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| self.depth(*i) == target_depth)
            .map(|(_, n)| n.area)
            .fold(0.0, f64::max)
    }

    /// Outermost (depth-0) contours, the external-retrieval view.
    pub fn external(&self) -> impl Iterator<Item = &ContourNode> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| self.depth(*i) == 0)
            .map(|(_, n)| n)
    }
}

/// Label connected regions. Foreground (nonzero) regions use
/// 8-connectivity, background uses 4-connectivity; all background reachable
/// from the image border becomes the outside region (id 0). Interior
/// background components are holes. Returns the label map and per-region
/// info, region id = index + 1.
fn label_regions(mask: &GrayImage) -> (LabelMap, Vec<RegionInfo>) {
    let (w, h) = mask.dimensions();
    let (wi, hi) = (w as i32, h as i32);
    let mut labels = vec![UNLABELED; (w * h) as usize];
    let idx = |x: i32, y: i32| (y * wi + x) as usize;
    let fg = |x: i32, y: i32| mask.get_pixel(x as u32, y as u32).0[0] != 0;

    // Outside background, seeded from every border background pixel.
    let mut queue: Vec<(i32, i32)> = Vec::new();
    for x in 0..wi {
        for y in [0, hi - 1] {
            if !fg(x, y) && labels[idx(x, y)] == UNLABELED {
                labels[idx(x, y)] = OUTER_BG;
                queue.push((x, y));
            }
        }
    }
    for y in 0..hi {
        for x in [0, wi - 1] {
            if !fg(x, y) && labels[idx(x, y)] == UNLABELED {
                labels[idx(x, y)] = OUTER_BG;
                queue.push((x, y));
            }
        }
    }
    flood(&mut labels, &mut queue, wi, hi, OUTER_BG, false, &fg);

    // Remaining components, in scan order so each region's first pixel is
    // its topmost-leftmost one.
    let mut regions: Vec<RegionInfo> = Vec::new();
    for y in 0..hi {
        for x in 0..wi {
            if labels[idx(x, y)] != UNLABELED {
                continue;
            }
            let foreground = fg(x, y);
            let region_id = regions.len() as u32 + 1;
            labels[idx(x, y)] = region_id;
            let mut queue = vec![(x, y)];
            flood(&mut labels, &mut queue, wi, hi, region_id, foreground, &fg);
            regions.push(RegionInfo {
                foreground,
                seed: (x, y),
            });
        }
    }

    (
        LabelMap {
            labels,
            w: wi,
            h: hi,
        },
        regions,
    )
}

/// Breadth-first fill of one region. Foreground spreads over 8 neighbors,
/// background over 4.
fn flood(
    labels: &mut [u32],
    queue: &mut Vec<(i32, i32)>,
    w: i32,
    h: i32,
    region_id: u32,
    foreground: bool,
    fg: &dyn Fn(i32, i32) -> bool,
) {
    const N4: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    const N8: [(i32, i32); 8] = [
        (1, 0),
        (-1, 0),
        (0, 1),
        (0, -1),
        (1, 1),
        (1, -1),
        (-1, 1),
        (-1, -1),
    ];
    let neighbors: &[(i32, i32)] = if foreground { &N8 } else { &N4 };
    while let Some((x, y)) = queue.pop() {
        for &(dx, dy) in neighbors {
            let nx = x + dx;
            let ny = y + dy;
            if nx < 0 || ny < 0 || nx >= w || ny >= h {
                continue;
            }
            let i = (ny * w + nx) as usize;
            if labels[i] == UNLABELED && fg(nx, ny) == foreground {
                labels[i] = region_id;
                queue.push((nx, ny));
            }
        }
    }
}

/// Moore-neighbor border trace of one region's outer boundary, starting at
/// its topmost-leftmost pixel. Returns an ordered closed polyline of pixel
/// coordinates (the start point is not repeated at the end, though it may
/// recur mid-trace where the boundary pinches through it diagonally).
fn trace_border(labels: &LabelMap, region_id: u32, start: (i32, i32)) -> Vec<(i32, i32)> {
    // Clockwise Moore neighborhood, starting west.
    const DIRS: [(i32, i32); 8] = [
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
    ];
    let inside = |x: i32, y: i32| labels.at(x, y) == region_id;
    let first_move_from = |pos: (i32, i32), bdir: usize| -> Option<(i32, i32)> {
        for step in 1..=8 {
            let (dx, dy) = DIRS[(bdir + step) % 8];
            let n = (pos.0 + dx, pos.1 + dy);
            if inside(n.0, n.1) {
                return Some(n);
            }
        }
        None
    };

    let mut points = vec![start];
    // Entered the start pixel coming from the west (nothing of this region
    // lies left of the topmost-leftmost pixel on its row).
    let mut current = start;
    let mut backtrack_dir = 0usize;
    let area_bound = (labels.w as usize * labels.h as usize).max(8) * 4;

    for _ in 0..area_bound {
        let mut found = None;
        for step in 1..=8 {
            let dir = (backtrack_dir + step) % 8;
            let (dx, dy) = DIRS[dir];
            let nx = current.0 + dx;
            let ny = current.1 + dy;
            if inside(nx, ny) {
                found = Some((dir, (nx, ny)));
                break;
            }
        }
        match found {
            None => return points, // isolated pixel
            Some((dir, next)) => {
                let next_backtrack = (dir + 5) % 8;
                if next == start && points.len() > 1 {
                    // Jacob's stopping criterion: the trace is closed only
                    // when re-entering the start pixel leads to the same
                    // second pixel as the first move. Otherwise the boundary
                    // merely passes through the start and continues.
                    if first_move_from(start, next_backtrack) == Some(points[1]) {
                        break;
                    }
                }
                points.push(next);
                current = next;
                // Re-enter the scan from the neighbor just before the move
                // direction (the last background position seen).
                backtrack_dir = next_backtrack;
            }
        }
    }
    points
}

/// Shoelace area of a closed polyline in pixel coordinates.
fn polygon_area(points: &[(i32, i32)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0i64;
    for i in 0..points.len() {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % points.len()];
        sum += x1 as i64 * y2 as i64 - x2 as i64 * y1 as i64;
    }
    (sum.abs() as f64) / 2.0
}

/// Polygon centroid via the shoelace moments; `None` when the polygon is
/// degenerate (zero signed area).
fn polygon_centroid(points: &[(i32, i32)]) -> Option<(f32, f32)> {
    if points.len() < 3 {
        return None;
    }
    let mut a = 0.0f64;
    let mut cx = 0.0f64;
    let mut cy = 0.0f64;
    for i in 0..points.len() {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % points.len()];
        let cross = x1 as f64 * y2 as f64 - x2 as f64 * y1 as f64;
        a += cross;
        cx += (x1 + x2) as f64 * cross;
        cy += (y1 + y2) as f64 * cross;
    }
    if a.abs() < 1e-9 {
        return None;
    }
    Some(((cx / (3.0 * a)) as f32, (cy / (3.0 * a)) as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    fn mask_from(rows: &[&str]) -> GrayImage {
        let h = rows.len() as u32;
        let w = rows[0].len() as u32;
        let mut img = GrayImage::new(w, h);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == '#' {
                    img.put_pixel(x as u32, y as u32, image::Luma([255]));
                }
            }
        }
        img
    }

    #[test]
    fn test_empty_mask_has_no_contours() {
        let forest = ContourForest::extract(&GrayImage::new(16, 16));
        assert!(forest.is_empty());
        assert_eq!(forest.max_area_at_depth(1), 0.0);
    }

    #[test]
    fn test_single_blob_is_depth_zero() {
        let mask = mask_from(&[
            "........",
            ".####...",
            ".####...",
            ".####...",
            "........",
        ]);
        let forest = ContourForest::extract(&mask);
        assert_eq!(forest.nodes().len(), 1);
        assert_eq!(forest.depth(0), 0);
        assert!(forest.nodes()[0].parent.is_none());
        assert!(!forest.nodes()[0].is_hole);
        // 4×3 pixel block → 3×2 polygon over pixel centers.
        assert_eq!(forest.nodes()[0].area, 6.0);
    }

    #[test]
    fn test_ring_produces_depth_one_hole() {
        let mask = mask_from(&[
            "..........",
            ".########.",
            ".#......#.",
            ".#......#.",
            ".#......#.",
            ".########.",
            "..........",
        ]);
        let forest = ContourForest::extract(&mask);
        assert_eq!(forest.nodes().len(), 2);
        let hole = forest
            .nodes()
            .iter()
            .position(|n| n.is_hole)
            .expect("hole contour");
        let outer = 1 - hole;
        assert_eq!(forest.depth(outer), 0);
        assert_eq!(forest.depth(hole), 1);
        assert_eq!(forest.nodes()[hole].parent, Some(outer));
        assert!(forest.max_area_at_depth(1) > 0.0);
    }

    #[test]
    fn test_depth_matches_parent_plus_one() {
        // Ring with a blob inside the hole: depths 0, 1, 2.
        let mask = mask_from(&[
            "............",
            ".##########.",
            ".#........#.",
            ".#..####..#.",
            ".#..####..#.",
            ".#........#.",
            ".##########.",
            "............",
        ]);
        let forest = ContourForest::extract(&mask);
        assert_eq!(forest.nodes().len(), 3);
        for (i, node) in forest.nodes().iter().enumerate() {
            match node.parent {
                None => assert_eq!(forest.depth(i), 0),
                Some(p) => assert_eq!(forest.depth(i), forest.depth(p) + 1),
            }
        }
        let mut depths: Vec<usize> = (0..3).map(|i| forest.depth(i)).collect();
        depths.sort_unstable();
        assert_eq!(depths, vec![0, 1, 2]);
    }

    #[test]
    fn test_two_disjoint_blobs_are_siblings() {
        let mask = mask_from(&[
            "..........",
            ".##...##..",
            ".##...##..",
            "..........",
        ]);
        let forest = ContourForest::extract(&mask);
        assert_eq!(forest.nodes().len(), 2);
        assert_eq!(forest.depth(0), 0);
        assert_eq!(forest.depth(1), 0);
        assert_eq!(forest.external().count(), 2);
    }

    #[test]
    fn test_blob_touching_border() {
        let mask = mask_from(&[
            "##......",
            "##......",
            "........",
        ]);
        let forest = ContourForest::extract(&mask);
        assert_eq!(forest.nodes().len(), 1);
        assert_eq!(forest.depth(0), 0);
    }

    #[test]
    fn test_centroid_of_square() {
        let mask = mask_from(&[
            ".......",
            ".#####.",
            ".#####.",
            ".#####.",
            ".#####.",
            ".#####.",
            ".......",
        ]);
        let forest = ContourForest::extract(&mask);
        let (cx, cy) = forest.nodes()[0].centroid;
        assert!((cx - 3.0).abs() < 0.01);
        assert!((cy - 3.0).abs() < 0.01);
    }

    #[test]
    fn test_single_pixel_contour() {
        let mask = mask_from(&["....", ".#..", "...."]);
        let forest = ContourForest::extract(&mask);
        assert_eq!(forest.nodes().len(), 1);
        assert_eq!(forest.nodes()[0].points, vec![(1, 1)]);
        assert_eq!(forest.nodes()[0].area, 0.0);
    }

    #[test]
    fn test_trace_continues_through_start_pinch() {
        // Two arms joined only diagonally through the topmost-leftmost
        // pixel. The first return to the start must not end the trace; both
        // arms belong to one boundary.
        let mask = mask_from(&[
            ".#.",
            "#.#",
        ]);
        let forest = ContourForest::extract(&mask);
        assert_eq!(forest.nodes().len(), 1);
        let points = &forest.nodes()[0].points;
        for p in [(1, 0), (0, 1), (2, 1)] {
            assert!(points.contains(&p), "missing boundary pixel {:?}", p);
        }
    }

    #[test]
    fn test_cycle_guard_terminates() {
        let mask = mask_from(&["....", ".##.", "...."]);
        let mut forest = ContourForest::extract(&mask);
        // Force a malformed self-parent; the walk must stop, not hang.
        forest.nodes[0].parent = Some(0);
        let d = forest.depth(0);
        assert!(d > 0);
    }
}
