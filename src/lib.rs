//! Tiled spatial quality-assurance engine
//!
//! Rules ([`rules::QaRule`]) are run tile by tile over tables served by a
//! [`engine::DataSource`]; errors found across tiles are attributed to one
//! canonical tile each and reported once.
//!
//! ```ignore
//! let source = MemoryDataSource::new().with_table("points", points).with_table("lines", lines);
//! let rules: Vec<Box<dyn QaRule>> = vec![Box::new(PointNotNearLine::new("points", "lines", 0.5))];
//! let report = TestRunner::new(&source, RunConfig::default().with_tile_size(1000.0)).run(&rules)?;
//! ```

pub mod geometry;
pub mod engine;
pub mod rules;
pub mod util;

pub use geometry::{extract, Envelope, Geometry, GeometryComponent, Point};
pub use engine::{
    CancellationToken, DataSource, ErrorReport, MemoryDataSource, QaEngineError, QaError,
    QaResult, Row, RowRef, RunConfig, RunStatus, TableId, TestRunner,
};
pub use rules::QaRule;
