//! Core geometry types for feature data
//!
//! Points, paths, polygon parts and multipatch patches, wrapped in a
//! [`Geometry`] that carries the spatial reference of its source table.

use serde::{Deserialize, Serialize};

use super::envelope::Envelope;

/// A vertex, optionally z-aware
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Planar (XY) distance
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Coordinate system metadata inherited by every derived geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialReference {
    pub wkid: u32,
    #[serde(default)]
    pub xy_tolerance: f64,
}

impl SpatialReference {
    pub fn new(wkid: u32) -> Self {
        Self { wkid, xy_tolerance: 0.0 }
    }
}

/// One polygon part: an outer ring plus optional holes.
/// Rings are stored open; the closing vertex is implied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonPart {
    pub outer_ring: Vec<Point>,
    #[serde(default)]
    pub holes: Vec<Vec<Point>>,
}

impl PolygonPart {
    pub fn new(outer_ring: Vec<Point>) -> Self {
        Self { outer_ring, holes: Vec::new() }
    }

    pub fn rings(&self) -> impl Iterator<Item = &Vec<Point>> {
        std::iter::once(&self.outer_ring).chain(self.holes.iter())
    }
}

/// How the points of a multipatch patch are assembled into surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchKind {
    Ring,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub kind: PatchKind,
    pub points: Vec<Point>,
}

impl Patch {
    pub fn new(kind: PatchKind, points: Vec<Point>) -> Self {
        Self { kind, points }
    }

    /// Triangles described by this patch. Ring patches yield none.
    pub fn triangles(&self) -> Vec<[Point; 3]> {
        let p = &self.points;
        match self.kind {
            PatchKind::Ring => Vec::new(),
            PatchKind::Triangles => p
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
            PatchKind::TriangleStrip => p
                .windows(3)
                .map(|w| [w[0], w[1], w[2]])
                .collect(),
            PatchKind::TriangleFan => {
                if p.len() < 3 {
                    return Vec::new();
                }
                p[1..].windows(2).map(|w| [p[0], w[0], w[1]]).collect()
            }
        }
    }
}

/// Shape-specific content of a geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Point(Option<Point>),
    Multipoint(Vec<Point>),
    Polyline(Vec<Vec<Point>>),
    Polygon(Vec<PolygonPart>),
    Multipatch(Vec<Patch>),
}

/// Discriminant of [`Shape`], used as the dispatch key for component extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Point,
    Multipoint,
    Polyline,
    Polygon,
    Multipatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_reference: Option<SpatialReference>,
}

impl Geometry {
    pub fn new(shape: Shape) -> Self {
        Self { shape, spatial_reference: None }
    }

    pub fn point(p: Point) -> Self {
        Self::new(Shape::Point(Some(p)))
    }

    pub fn multipoint(points: Vec<Point>) -> Self {
        Self::new(Shape::Multipoint(points))
    }

    pub fn polyline(paths: Vec<Vec<Point>>) -> Self {
        Self::new(Shape::Polyline(paths))
    }

    pub fn line(points: Vec<Point>) -> Self {
        Self::polyline(vec![points])
    }

    pub fn polygon(parts: Vec<PolygonPart>) -> Self {
        Self::new(Shape::Polygon(parts))
    }

    pub fn multipatch(patches: Vec<Patch>) -> Self {
        Self::new(Shape::Multipatch(patches))
    }

    /// An empty geometry of the given kind
    pub fn empty(kind: ShapeKind) -> Self {
        Self::new(match kind {
            ShapeKind::Point => Shape::Point(None),
            ShapeKind::Multipoint => Shape::Multipoint(Vec::new()),
            ShapeKind::Polyline => Shape::Polyline(Vec::new()),
            ShapeKind::Polygon => Shape::Polygon(Vec::new()),
            ShapeKind::Multipatch => Shape::Multipatch(Vec::new()),
        })
    }

    pub fn with_spatial_reference(mut self, sr: Option<SpatialReference>) -> Self {
        self.spatial_reference = sr;
        self
    }

    pub fn kind(&self) -> ShapeKind {
        match &self.shape {
            Shape::Point(_) => ShapeKind::Point,
            Shape::Multipoint(_) => ShapeKind::Multipoint,
            Shape::Polyline(_) => ShapeKind::Polyline,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::Multipatch(_) => ShapeKind::Multipatch,
        }
    }

    /// Every stored vertex, in storage order
    pub fn vertices(&self) -> Vec<Point> {
        match &self.shape {
            Shape::Point(p) => p.iter().copied().collect(),
            Shape::Multipoint(points) => points.clone(),
            Shape::Polyline(paths) => paths.iter().flatten().copied().collect(),
            Shape::Polygon(parts) => parts
                .iter()
                .flat_map(|part| part.rings().flatten().copied())
                .collect(),
            Shape::Multipatch(patches) => {
                patches.iter().flat_map(|p| p.points.iter().copied()).collect()
            }
        }
    }

    pub fn vertex_count(&self) -> usize {
        match &self.shape {
            Shape::Point(p) => usize::from(p.is_some()),
            Shape::Multipoint(points) => points.len(),
            Shape::Polyline(paths) => paths.iter().map(Vec::len).sum(),
            Shape::Polygon(parts) => parts.iter().flat_map(|p| p.rings()).map(Vec::len).sum(),
            Shape::Multipatch(patches) => patches.iter().map(|p| p.points.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count() == 0
    }

    /// Bounding box, or `None` for an empty geometry
    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::from_points(&self.vertices())
    }
}
