//! Area-based representative points
//!
//! Centroids use signed ring areas (holes subtract). Label points come from
//! earcut triangulation so they always land inside the polygon, which a
//! centroid does not guarantee for concave shapes.

use super::types::{Patch, Point, PolygonPart};

/// Signed shoelace area and first moments of an open ring
fn ring_moments(ring: &[Point]) -> (f64, f64, f64) {
    if ring.len() < 3 {
        return (0.0, 0.0, 0.0);
    }
    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        let cross = a.x * b.y - b.x * a.y;
        area2 += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    (area2 / 2.0, cx / 6.0, cy / 6.0)
}

/// Unsigned planar area of a polygon part
pub fn part_area(part: &PolygonPart) -> f64 {
    let outer = ring_moments(&part.outer_ring).0.abs();
    let holes: f64 = part.holes.iter().map(|h| ring_moments(h).0.abs()).sum();
    (outer - holes).max(0.0)
}

/// Area-weighted centroid of polygon parts; `None` when the area is zero
pub fn polygon_centroid(parts: &[PolygonPart]) -> Option<Point> {
    let mut area = 0.0;
    let mut mx = 0.0;
    let mut my = 0.0;
    for part in parts {
        // Normalise orientation: outer rings add, holes subtract
        for (i, ring) in part.rings().enumerate() {
            let (a, x, y) = ring_moments(ring);
            if a == 0.0 {
                continue;
            }
            let sign = if i == 0 { 1.0 } else { -1.0 };
            area += sign * a.abs();
            mx += sign * x * a.signum();
            my += sign * y * a.signum();
        }
    }
    if area.abs() < f64::EPSILON {
        return None;
    }
    Some(Point::new(mx / area, my / area))
}

fn triangle_area(t: &[Point; 3]) -> f64 {
    ((t[1].x - t[0].x) * (t[2].y - t[0].y) - (t[2].x - t[0].x) * (t[1].y - t[0].y)).abs() / 2.0
}

fn triangle_centroid(t: &[Point; 3]) -> Point {
    Point::new(
        (t[0].x + t[1].x + t[2].x) / 3.0,
        (t[0].y + t[1].y + t[2].y) / 3.0,
    )
}

/// Triangulate a polygon part with earcut
pub fn triangulate_part(part: &PolygonPart) -> Vec<[Point; 3]> {
    let mut flat_coords: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();
    let mut vertices: Vec<Point> = Vec::new();

    for p in &part.outer_ring {
        flat_coords.push(p.x);
        flat_coords.push(p.y);
        vertices.push(*p);
    }
    for hole in &part.holes {
        if hole.len() < 3 {
            continue;
        }
        hole_indices.push(flat_coords.len() / 2);
        for p in hole {
            flat_coords.push(p.x);
            flat_coords.push(p.y);
            vertices.push(*p);
        }
    }

    let indices = earcutr::earcut(&flat_coords, &hole_indices, 2).unwrap_or_default();
    indices
        .chunks_exact(3)
        .map(|c| [vertices[c[0]], vertices[c[1]], vertices[c[2]]])
        .collect()
}

/// Centroid of the largest triangle; `None` when nothing has area
fn largest_triangle_centroid(triangles: impl IntoIterator<Item = [Point; 3]>) -> Option<Point> {
    let mut best: Option<([Point; 3], f64)> = None;
    for t in triangles {
        let a = triangle_area(&t);
        if a <= 0.0 {
            continue;
        }
        if best.as_ref().map_or(true, |(_, ba)| a > *ba) {
            best = Some((t, a));
        }
    }
    best.map(|(t, _)| triangle_centroid(&t))
}

/// A point guaranteed to lie inside the polygon
pub fn polygon_label_point(parts: &[PolygonPart]) -> Option<Point> {
    largest_triangle_centroid(parts.iter().flat_map(triangulate_part))
}

/// Area-weighted centroid of the multipatch footprint
pub fn multipatch_centroid(patches: &[Patch]) -> Option<Point> {
    let mut area = 0.0;
    let mut mx = 0.0;
    let mut my = 0.0;
    for t in patches.iter().flat_map(multipatch_triangles) {
        let a = triangle_area(&t);
        let c = triangle_centroid(&t);
        area += a;
        mx += c.x * a;
        my += c.y * a;
    }
    if area < f64::EPSILON {
        return None;
    }
    Some(Point::new(mx / area, my / area))
}

pub fn multipatch_label_point(patches: &[Patch]) -> Option<Point> {
    largest_triangle_centroid(patches.iter().flat_map(multipatch_triangles))
}

/// Footprint triangles; ring patches are triangulated like polygon rings
fn multipatch_triangles(patch: &Patch) -> Vec<[Point; 3]> {
    match patch.kind {
        super::types::PatchKind::Ring => triangulate_part(&PolygonPart::new(patch.points.clone())),
        _ => patch.triangles(),
    }
}
