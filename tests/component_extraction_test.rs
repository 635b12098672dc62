// Component extraction scenarios on lines, polygons and empty inputs
use tiled_qa::geometry::{
    extract, Geometry, GeometryComponent, Patch, PatchKind, Point, PolygonPart, Shape, ShapeKind,
    SpatialReference,
};

#[test]
fn test_interior_vertices_of_two_point_line_is_empty() {
    let line = Geometry::line(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
    let interior = extract(&line, GeometryComponent::InteriorVertices);
    assert_eq!(interior.kind(), ShapeKind::Multipoint);
    assert!(interior.is_empty());
}

#[test]
fn test_interior_vertices_of_three_point_line_keeps_z() {
    let line = Geometry::line(vec![
        Point::with_z(100.0, 1000.0, 10.0),
        Point::with_z(200.0, 2000.0, 20.0),
        Point::with_z(300.0, 3000.0, 30.0),
    ]);
    let interior = extract(&line, GeometryComponent::InteriorVertices);
    assert_eq!(interior.vertices(), vec![Point::with_z(200.0, 2000.0, 20.0)]);
}

#[test]
fn test_empty_inputs_give_empty_results() {
    let kinds = [
        ShapeKind::Polygon,
        ShapeKind::Polyline,
        ShapeKind::Point,
        ShapeKind::Multipoint,
        ShapeKind::Multipatch,
    ];
    for kind in kinds {
        let empty = Geometry::empty(kind);
        for component in GeometryComponent::ALL {
            let result = extract(&empty, component);
            assert!(result.is_empty(), "{:?} of empty {:?} should be empty", component, kind);
            assert_eq!(result.kind(), component.result_kind(kind));
        }
    }
}

#[test]
fn test_results_inherit_spatial_reference() {
    let sr = Some(SpatialReference::new(2056));
    let square = Geometry::polygon(vec![PolygonPart::new(vec![
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(10.0, 10.0),
        Point::new(0.0, 10.0),
    ])])
    .with_spatial_reference(sr.clone());

    for component in GeometryComponent::ALL {
        assert_eq!(extract(&square, component).spatial_reference, sr, "{:?}", component);
    }
    // Unsupported combination still carries it
    let empty = extract(&Geometry::empty(ShapeKind::Point).with_spatial_reference(sr.clone()), GeometryComponent::Boundary);
    assert_eq!(empty.spatial_reference, sr);
}

#[test]
fn test_polygon_components() {
    let square = Geometry::polygon(vec![PolygonPart::new(vec![
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(10.0, 10.0),
        Point::new(0.0, 10.0),
    ])]);

    let centroid = extract(&square, GeometryComponent::Centroid).vertices();
    assert_eq!(centroid.len(), 1);
    assert!((centroid[0].x - 5.0).abs() < 1e-9 && (centroid[0].y - 5.0).abs() < 1e-9);

    let label = extract(&square, GeometryComponent::LabelPoint).vertices();
    assert_eq!(label.len(), 1);
    assert!(label[0].x > 0.0 && label[0].x < 10.0 && label[0].y > 0.0 && label[0].y < 10.0);

    match extract(&square, GeometryComponent::Boundary).shape {
        Shape::Polyline(paths) => {
            assert_eq!(paths.len(), 1);
            assert_eq!(paths[0].len(), 5);
            assert_eq!(paths[0].first(), paths[0].last());
        }
        other => panic!("expected polyline boundary, got {:?}", other),
    }

    assert_eq!(
        extract(&square, GeometryComponent::LineStartPoint).vertices(),
        vec![Point::new(0.0, 0.0)]
    );
}

#[test]
fn test_line_boundary_and_end_points() {
    let line = Geometry::line(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 0.0)]);
    assert_eq!(
        extract(&line, GeometryComponent::Boundary).vertices(),
        vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]
    );
    assert_eq!(
        extract(&line, GeometryComponent::LineEndPoint).vertices(),
        vec![Point::new(10.0, 0.0)]
    );

    // A closed path has no boundary
    let ring = Geometry::line(vec![
        Point::new(0.0, 0.0),
        Point::new(5.0, 5.0),
        Point::new(10.0, 0.0),
        Point::new(0.0, 0.0),
    ]);
    assert!(extract(&ring, GeometryComponent::Boundary).is_empty());
}

#[test]
fn test_multipatch_footprint_components() {
    let patch = Patch::new(
        PatchKind::Triangles,
        vec![
            Point::with_z(0.0, 0.0, 5.0),
            Point::with_z(4.0, 0.0, 5.0),
            Point::with_z(0.0, 4.0, 5.0),
        ],
    );
    let mesh = Geometry::multipatch(vec![patch]);

    let boundary = extract(&mesh, GeometryComponent::Boundary);
    assert_eq!(boundary.kind(), ShapeKind::Polyline);
    assert!(!boundary.is_empty());

    let label = extract(&mesh, GeometryComponent::LabelPoint).vertices();
    assert_eq!(label.len(), 1);
    assert!(label[0].x > 0.0 && label[0].y > 0.0 && label[0].x + label[0].y < 4.0);
}
