//! Geometry model and component extraction
//!
//! # Submodules
//! - `types` - Points, polygon parts, multipatch patches and [`Geometry`]
//! - `envelope` - Axis-aligned bounding boxes
//! - `components` - Component selectors and the extraction dispatch table
//! - `label` - Centroid and label-point computation

mod types;
mod envelope;
mod components;
mod label;

pub use types::{
    Point,
    SpatialReference,
    PolygonPart,
    PatchKind,
    Patch,
    Shape,
    ShapeKind,
    Geometry,
};

pub use envelope::Envelope;

pub use components::{
    GeometryComponent,
    extract,
};

pub use label::part_area;
