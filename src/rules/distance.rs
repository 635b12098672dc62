//! Distance calculations used by the reference rules

use crate::geometry::{extract, Geometry, GeometryComponent, Point, Shape};

/// Point-to-segment minimum distance and the closest point on the segment
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> (f64, Point) {
    let ab = [b.x - a.x, b.y - a.y];
    let ap = [p.x - a.x, p.y - a.y];
    let ab_len2 = ab[0] * ab[0] + ab[1] * ab[1];

    if ab_len2 < 1e-20 {
        // Degenerate segment
        return (p.distance(&a), a);
    }

    let t = ((ap[0] * ab[0] + ap[1] * ab[1]) / ab_len2).clamp(0.0, 1.0);
    let closest = Point::new(a.x + t * ab[0], a.y + t * ab[1]);
    (p.distance(&closest), closest)
}

/// Minimum planar distance from `p` to the linework (or points) of `geometry`.
/// Polygons are measured to their boundary. `None` for empty geometries.
pub fn point_geometry_distance(p: Point, geometry: &Geometry) -> Option<f64> {
    let paths: Vec<Vec<Point>> = match &geometry.shape {
        Shape::Polyline(paths) => paths.clone(),
        Shape::Polygon(_) | Shape::Multipatch(_) => match extract(geometry, GeometryComponent::Boundary).shape {
            Shape::Polyline(paths) => paths,
            _ => Vec::new(),
        },
        Shape::Point(_) | Shape::Multipoint(_) => {
            return geometry
                .vertices()
                .iter()
                .map(|v| p.distance(v))
                .min_by(f64::total_cmp);
        }
    };

    let mut best: Option<f64> = None;
    for path in &paths {
        if let [only] = path.as_slice() {
            let d = p.distance(only);
            best = Some(best.map_or(d, |b| b.min(d)));
        }
        for w in path.windows(2) {
            let (d, _) = point_segment_distance(p, w[0], w[1]);
            best = Some(best.map_or(d, |b| b.min(d)));
        }
    }
    best
}
