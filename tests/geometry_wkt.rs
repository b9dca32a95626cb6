use mapcompose::data::{
    CompositeData, CsvColumns, Datum, Feature, LineData, MultiLineData, MultiPointData,
    MultiPolygonData, PointData, PolygonData,
};
use mapcompose::error::MapError;
use std::io::Write;

#[test]
fn point_from_wkt() {
    let p = PointData::from_wkt("POINT(4.35 50.85)").unwrap();
    assert_eq!((p.lon, p.lat), (4.35, 50.85));
    assert!(p.value.is_none());
}

#[test]
fn multipoint_accepts_a_single_point() {
    let pts = MultiPointData::from_wkt("POINT(1 2)").unwrap();
    assert_eq!(pts.len(), 1);
    let pts = MultiPointData::from_wkt("MULTIPOINT((1 2),(3 4),(5 6))").unwrap();
    assert_eq!(pts.len(), 3);
    assert_eq!(pts.items()[2].lon, 5.0);
}

#[test]
fn multipoint_round_trips_through_wkt() {
    let pts = MultiPointData::from_coords(&[1.5, -2.0], &[10.0, 20.25]).unwrap();
    let back = MultiPointData::from_wkt(&pts.to_wkt()).unwrap();
    let coords: Vec<(f64, f64)> = back.iter().map(|p| (p.lon, p.lat)).collect();
    assert_eq!(coords, vec![(1.5, 10.0), (-2.0, 20.25)]);
}

#[test]
fn linestring_needs_two_vertices() {
    let line = LineData::from_wkt("LINESTRING(0 0, 1 1, 2 0)").unwrap();
    assert_eq!(line.coords.len(), 3);
    assert!(!line.is_closed());
    assert!(matches!(
        LineData::from_wkt("LINESTRING(0 0)"),
        Err(MapError::InvalidGeometry { .. })
    ));
}

#[test]
fn multilinestring_keeps_every_part() {
    let lines = MultiLineData::from_wkt("MULTILINESTRING((0 0, 1 1),(2 2, 3 3, 4 2))").unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines.items()[1].coords.len(), 3);
}

#[test]
fn polygon_with_hole() {
    let poly = PolygonData::from_wkt(
        "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0),(4 4, 6 4, 6 6, 4 6, 4 4))",
    )
    .unwrap();
    assert_eq!(poly.exterior.len(), 5);
    assert_eq!(poly.interiors.len(), 1);
    let (cx, cy) = poly.centroid();
    assert!((cx - 5.0).abs() < 1e-9 && (cy - 5.0).abs() < 1e-9);
}

#[test]
fn polygon_wkt_text_is_closed() {
    let poly = PolygonData::new(vec![(0.0, 0.0), (2.0, 0.0), (1.0, 1.0)], vec![]).unwrap();
    let text = poly.to_wkt();
    assert!(text.starts_with("POLYGON"));
    let back = PolygonData::from_wkt(&text).unwrap();
    assert_eq!(back.exterior, poly.exterior);
}

#[test]
fn polygon_with_hole_survives_wkt_text() {
    let poly = PolygonData::new(
        vec![(3.0, 50.0), (6.5, 50.0), (6.5, 52.0), (3.0, 52.0)],
        vec![
            vec![(4.0, 50.5), (5.0, 50.5), (5.0, 51.0), (4.0, 51.0)],
            vec![(5.5, 51.2), (6.0, 51.2), (5.8, 51.6)],
        ],
    )
    .unwrap();
    let back = PolygonData::from_wkt(&poly.to_wkt()).unwrap();
    assert_eq!(back.exterior, poly.exterior);
    assert_eq!(back.interiors, poly.interiors);
    assert_eq!(back.interiors[1].len(), 4);

    let lakes: MultiPolygonData = [
        poly,
        PolygonData::new(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)], vec![]).unwrap(),
    ]
    .into_iter()
    .collect();
    let again = MultiPolygonData::from_wkt(&lakes.to_wkt()).unwrap();
    assert_eq!(again.len(), 2);
    for (a, b) in again.iter().zip(lakes.iter()) {
        assert_eq!(a.exterior, b.exterior);
        assert_eq!(a.interiors, b.interiors);
    }
}

#[test]
fn multipolygon_explodes_into_polygons() {
    let polys = MultiPolygonData::from_wkt(
        "MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)),((5 5, 6 5, 6 6, 5 5)))",
    )
    .unwrap();
    assert_eq!(polys.len(), 2);
    let bbox = polys.bbox().unwrap();
    assert_eq!((bbox.lon_min, bbox.lon_max), (0.0, 6.0));
}

#[test]
fn collection_sorts_parts_by_kind() {
    let data = CompositeData::from_wkt(
        "GEOMETRYCOLLECTION(POINT(1 1), LINESTRING(0 0, 2 2), POLYGON((0 0, 3 0, 3 3, 0 0)), MULTIPOINT((4 4),(5 5)))",
    )
    .unwrap();
    assert_eq!(data.points.len(), 3);
    assert_eq!(data.lines.len(), 1);
    assert_eq!(data.polygons.len(), 1);
    assert!(!data.is_empty());

    let again = CompositeData::from_wkt(&data.to_wkt()).unwrap();
    assert_eq!(again.points.len(), 3);
    assert_eq!(again.polygons.len(), 1);
}

#[test]
fn malformed_wkt_is_reported() {
    assert!(matches!(
        PointData::from_wkt("POINT(1)"),
        Err(MapError::Wkt(_))
    ));
    assert!(matches!(
        CompositeData::from_wkt("CIRCLE(0 0, 1)"),
        Err(MapError::Wkt(_))
    ));
    assert!(matches!(
        PolygonData::from_wkt("POINT(1 2)"),
        Err(MapError::Wkt(msg)) if msg.contains("expected POLYGON")
    ));
}

#[test]
fn csv_points_with_labels_and_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name,longitude,latitude,mw,kind").unwrap();
    writeln!(file, "Doel,4.26,51.32,2.9,pwr").unwrap();
    writeln!(file, "Tihange,5.27,50.53,3.0,pwr").unwrap();
    file.flush().unwrap();

    let columns = CsvColumns {
        lon: "longitude".into(),
        lat: "latitude".into(),
        label: Some("name".into()),
        values: vec!["mw".into(), "kind".into()],
    };
    let pts = MultiPointData::from_csv(file.path(), &columns).unwrap();
    assert_eq!(pts.len(), 2);
    let doel = &pts.items()[0];
    assert_eq!(doel.label.as_deref(), Some("Doel"));
    let value = doel.value.as_ref().unwrap();
    assert_eq!(value.get("mw"), Some(&Datum::Number(2.9)));
    assert_eq!(value.get("kind"), Some(&Datum::Text("pwr".into())));
}

#[test]
fn csv_missing_column_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "x,y").unwrap();
    writeln!(file, "1,2").unwrap();
    file.flush().unwrap();
    let err = MultiPointData::from_csv(file.path(), &CsvColumns::default()).unwrap_err();
    assert!(matches!(err, MapError::Config { .. }));
}
