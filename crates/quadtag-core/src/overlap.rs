//! Footprint comparison between two pixel-space quadrilaterals.
//!
//! The classifier runs in two stages:
//! 1. A cheap center-distance rejection scaled by the larger circumradius.
//! 2. The exact intersection area of the two quads (convex clipping) relative
//!    to the smaller quad's area.
//!
//! Pairs are put in a canonical order before clipping so the result is exactly
//! symmetric, not merely symmetric up to rounding.

use std::cmp::Ordering;

/// Centers farther apart than this multiple of the larger circumradius never overlap.
pub const OVERLAP_REJECT_FACTOR: f64 = 2.0;

/// Minimum intersection / smaller-area ratio for two quads to count as duplicates.
pub const OVERLAP_AREA_FRACTION: f64 = 0.5;

/// Areas at or below this (pixels²) are treated as degenerate.
const MIN_AREA: f64 = 1e-9;

/// Signed shoelace area. Positive for counter-clockwise order in pixel coordinates.
#[must_use]
pub fn signed_area(points: &[[f64; 2]]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let [x0, y0] = points[i];
        let [x1, y1] = points[(i + 1) % n];
        area += x0 * y1 - x1 * y0;
    }
    area * 0.5
}

/// Maximum corner-to-center distance.
#[must_use]
pub fn characteristic_size(center: [f64; 2], corners: &[[f64; 2]; 4]) -> f64 {
    corners
        .iter()
        .map(|c| distance(*c, center))
        .fold(0.0, f64::max)
}

/// Sum of the four edge lengths.
#[must_use]
pub fn perimeter(corners: &[[f64; 2]; 4]) -> f64 {
    (0..4).map(|i| distance(corners[i], corners[(i + 1) % 4])).sum()
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

/// Decide whether two quads describe the same physical target.
#[must_use]
pub fn quads_overlap(
    center_a: [f64; 2],
    corners_a: &[[f64; 2]; 4],
    center_b: [f64; 2],
    corners_b: &[[f64; 2]; 4],
) -> bool {
    let (center_a, corners_a, center_b, corners_b) =
        if canonical_cmp(center_a, corners_a, center_b, corners_b) == Ordering::Greater {
            (center_b, corners_b, center_a, corners_a)
        } else {
            (center_a, corners_a, center_b, corners_b)
        };

    let radius =
        characteristic_size(center_a, corners_a).max(characteristic_size(center_b, corners_b));
    let dist = distance(center_a, center_b);
    if dist > OVERLAP_REJECT_FACTOR * radius {
        return false;
    }

    let poly_a = ccw(corners_a);
    let poly_b = ccw(corners_b);
    let min_area = signed_area(&poly_a).min(signed_area(&poly_b));

    if min_area <= MIN_AREA {
        // Mean half edge length of the two quads.
        let half_edge = (perimeter(corners_a) + perimeter(corners_b)) / 16.0;
        return dist < half_edge;
    }

    let fraction = intersection_area(&poly_a, &poly_b) / min_area;
    fraction > OVERLAP_AREA_FRACTION
}

fn canonical_cmp(
    center_a: [f64; 2],
    corners_a: &[[f64; 2]; 4],
    center_b: [f64; 2],
    corners_b: &[[f64; 2]; 4],
) -> Ordering {
    let key_a = corners_a.iter().chain(std::iter::once(&center_a)).flatten();
    let key_b = corners_b.iter().chain(std::iter::once(&center_b)).flatten();
    key_a
        .zip(key_b)
        .map(|(a, b)| a.total_cmp(b))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn ccw(corners: &[[f64; 2]; 4]) -> [[f64; 2]; 4] {
    let mut out = *corners;
    if signed_area(&out) < 0.0 {
        out.reverse();
    }
    out
}

/// Intersection area of `subject` clipped by `clip` (Sutherland-Hodgman).
///
/// Both polygons must be counter-clockwise and `clip` must be convex; a concave
/// `clip` under-approximates the area.
fn intersection_area(subject: &[[f64; 2]], clip: &[[f64; 2]]) -> f64 {
    let mut output: Vec<[f64; 2]> = subject.to_vec();

    for i in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % clip.len()];
        let input = std::mem::take(&mut output);

        for j in 0..input.len() {
            let cur = input[j];
            let prev = input[(j + input.len() - 1) % input.len()];
            let cur_in = side(a, b, cur) >= 0.0;
            let prev_in = side(a, b, prev) >= 0.0;

            if cur_in {
                if !prev_in {
                    output.push(line_intersection(prev, cur, a, b));
                }
                output.push(cur);
            } else if prev_in {
                output.push(line_intersection(prev, cur, a, b));
            }
        }
    }

    signed_area(&output).max(0.0)
}

/// Cross product of `b - a` and `p - a`. Non-negative means `p` is left of (inside) `a -> b`.
fn side(a: [f64; 2], b: [f64; 2], p: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

fn line_intersection(p: [f64; 2], q: [f64; 2], a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    let sp = side(a, b, p);
    let sq = side(a, b, q);
    let denom = sp - sq;
    if denom.abs() < f64::EPSILON {
        return q;
    }
    let t = sp / denom;
    [p[0] + t * (q[0] - p[0]), p[1] + t * (q[1] - p[1])]
}
