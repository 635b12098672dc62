//! Geometry component extraction
//!
//! Maps a geometry and a [`GeometryComponent`] selector to the sub-geometry
//! used to localize an error. Extraction is a lookup on
//! `(ShapeKind, GeometryComponent)`; a combination without an entry yields an
//! empty geometry of the selector's result shape, never an error.
//! The input is never modified and every result carries the input's spatial
//! reference.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::label;
use super::types::{Geometry, Point, Shape, ShapeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GeometryComponent {
    EntireGeometry,
    Boundary,
    Centroid,
    LabelPoint,
    Vertices,
    InteriorVertices,
    LineStartPoint,
    LineEndPoint,
}

impl GeometryComponent {
    pub const ALL: [GeometryComponent; 8] = [
        GeometryComponent::EntireGeometry,
        GeometryComponent::Boundary,
        GeometryComponent::Centroid,
        GeometryComponent::LabelPoint,
        GeometryComponent::Vertices,
        GeometryComponent::InteriorVertices,
        GeometryComponent::LineStartPoint,
        GeometryComponent::LineEndPoint,
    ];

    /// Shape of the result when extracting from a geometry of `kind`
    pub fn result_kind(self, kind: ShapeKind) -> ShapeKind {
        match self {
            GeometryComponent::EntireGeometry => kind,
            GeometryComponent::Boundary => match kind {
                ShapeKind::Polygon | ShapeKind::Multipatch => ShapeKind::Polyline,
                _ => ShapeKind::Multipoint,
            },
            GeometryComponent::Centroid
            | GeometryComponent::LabelPoint
            | GeometryComponent::LineStartPoint
            | GeometryComponent::LineEndPoint => ShapeKind::Point,
            GeometryComponent::Vertices | GeometryComponent::InteriorVertices => ShapeKind::Multipoint,
        }
    }
}

type Extraction = fn(&Geometry) -> Shape;

fn strategy(kind: ShapeKind, component: GeometryComponent) -> Option<Extraction> {
    use GeometryComponent as C;
    use ShapeKind as K;

    let f: Extraction = match (kind, component) {
        (_, C::EntireGeometry) => |g| g.shape.clone(),
        (_, C::Vertices) => |g| Shape::Multipoint(g.vertices()),

        (K::Polyline, C::Boundary) => polyline_boundary,
        (K::Polygon, C::Boundary) => polygon_boundary,
        (K::Multipatch, C::Boundary) => multipatch_boundary,

        (K::Polygon, C::Centroid) => |g| match &g.shape {
            Shape::Polygon(parts) => Shape::Point(label::polygon_centroid(parts)),
            _ => Shape::Point(None),
        },
        (K::Multipatch, C::Centroid) => |g| match &g.shape {
            Shape::Multipatch(patches) => Shape::Point(label::multipatch_centroid(patches)),
            _ => Shape::Point(None),
        },
        (K::Polygon, C::LabelPoint) => |g| match &g.shape {
            Shape::Polygon(parts) => Shape::Point(label::polygon_label_point(parts)),
            _ => Shape::Point(None),
        },
        (K::Multipatch, C::LabelPoint) => |g| match &g.shape {
            Shape::Multipatch(patches) => Shape::Point(label::multipatch_label_point(patches)),
            _ => Shape::Point(None),
        },

        (K::Polyline | K::Polygon, C::InteriorVertices) => interior_vertices,
        (K::Polyline | K::Polygon, C::LineStartPoint) => |g| Shape::Point(closed_paths(g).first().and_then(|p| p.first().copied())),
        (K::Polyline | K::Polygon, C::LineEndPoint) => |g| Shape::Point(closed_paths(g).last().and_then(|p| p.last().copied())),

        _ => return None,
    };
    Some(f)
}

/// Extract a component of `geometry`
pub fn extract(geometry: &Geometry, component: GeometryComponent) -> Geometry {
    let kind = geometry.kind();
    let shape = match strategy(kind, component) {
        Some(f) => f(geometry),
        None => Geometry::empty(component.result_kind(kind)).shape,
    };
    Geometry::new(shape).with_spatial_reference(geometry.spatial_reference.clone())
}

/// Paths of a line-like geometry; polygon rings are returned closed
fn closed_paths(g: &Geometry) -> Vec<Vec<Point>> {
    match &g.shape {
        Shape::Polyline(paths) => paths.iter().filter(|p| !p.is_empty()).cloned().collect(),
        Shape::Polygon(parts) => parts
            .iter()
            .flat_map(|part| part.rings())
            .filter_map(|ring| close_ring(ring))
            .collect(),
        _ => Vec::new(),
    }
}

fn close_ring(ring: &[Point]) -> Option<Vec<Point>> {
    let first = *ring.first()?;
    let mut path = ring.to_vec();
    path.push(first);
    Some(path)
}

fn interior_vertices(g: &Geometry) -> Shape {
    let points = closed_paths(g)
        .into_iter()
        .filter(|path| path.len() > 2)
        .flat_map(|path| path[1..path.len() - 1].to_vec())
        .collect();
    Shape::Multipoint(points)
}

fn point_key(p: &Point) -> (u64, u64) {
    (p.x.to_bits(), p.y.to_bits())
}

/// Endpoints of open paths, kept when they occur an odd number of times
fn polyline_boundary(g: &Geometry) -> Shape {
    let Shape::Polyline(paths) = &g.shape else {
        return Shape::Multipoint(Vec::new());
    };
    let mut counts: IndexMap<(u64, u64), (Point, usize)> = IndexMap::new();
    for path in paths {
        let (Some(first), Some(last)) = (path.first(), path.last()) else {
            continue;
        };
        if path.len() < 2 || point_key(first) == point_key(last) {
            continue;
        }
        for p in [first, last] {
            counts.entry(point_key(p)).or_insert((*p, 0)).1 += 1;
        }
    }
    Shape::Multipoint(
        counts
            .into_values()
            .filter(|(_, n)| n % 2 == 1)
            .map(|(p, _)| p)
            .collect(),
    )
}

fn polygon_boundary(g: &Geometry) -> Shape {
    Shape::Polyline(closed_paths(g))
}

/// Ring outlines plus mesh edges used by exactly one triangle
fn multipatch_boundary(g: &Geometry) -> Shape {
    let Shape::Multipatch(patches) = &g.shape else {
        return Shape::Polyline(Vec::new());
    };
    let mut paths: Vec<Vec<Point>> = patches
        .iter()
        .filter(|p| p.kind == super::types::PatchKind::Ring)
        .filter_map(|p| close_ring(&p.points))
        .collect();

    let mut edges: IndexMap<((u64, u64), (u64, u64)), (Point, Point, usize)> = IndexMap::new();
    for tri in patches.iter().flat_map(|p| p.triangles()) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let (ka, kb) = (point_key(&a), point_key(&b));
            if ka == kb {
                continue;
            }
            let key = if ka < kb { (ka, kb) } else { (kb, ka) };
            edges.entry(key).or_insert((a, b, 0)).2 += 1;
        }
    }
    paths.extend(
        edges
            .into_values()
            .filter(|(_, _, n)| *n == 1)
            .map(|(a, b, _)| vec![a, b]),
    );
    Shape::Polyline(paths)
}
