//! Live WMS tests. Run with: `cargo test --features online -- --nocapture`
#![cfg(feature = "online")]

use mapcompose::data::{MultiPointData, PointData};
use mapcompose::style::PointStyle;
use mapcompose::wms::{WmsClient, WmsRequest};
use mapcompose::{LayeredMap, MapLayer, Projection, Region};

const OSM_WMS: &str = "https://ows.terrestris.de/osm/service";

fn benelux() -> Region {
    Region::new(2.5, 7.0, 49.5, 53.0).unwrap()
}

#[test]
fn fetch_plate_carree_image() {
    let client = WmsClient::new(OSM_WMS).unwrap();
    let img = client
        .get_map(
            &WmsRequest::new(["OSM-WMS"]),
            &benelux(),
            Projection::PlateCarree,
            (256, 200),
        )
        .unwrap();
    assert_eq!(img.pixels.dimensions(), (256, 200));
    assert_eq!(img.bounds, benelux());
}

#[test]
fn fetch_mercator_image() {
    let client = WmsClient::new(OSM_WMS).unwrap();
    let img = client
        .get_map(
            &WmsRequest::new(["OSM-WMS"]),
            &benelux(),
            Projection::Mercator,
            (300, 300),
        )
        .unwrap();
    assert_eq!(img.pixels.dimensions(), (300, 300));
}

#[test]
fn basemap_under_points_renders_to_png() {
    let client = WmsClient::new(OSM_WMS).unwrap();
    let cities: MultiPointData = [
        PointData::new(4.35, 50.85).with_label("Brussels"),
        PointData::new(4.90, 52.37).with_label("Amsterdam"),
    ]
    .into_iter()
    .collect();
    let map = LayeredMap::new()
        .with_region(benelux())
        .with_layer(MapLayer::wms(client, WmsRequest::new(["OSM-WMS"])).with_name("osm"))
        .with_layer(MapLayer::points(cities, PointStyle::new()).with_label("cities"));

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("benelux.png");
    let summary = map.plot(&out, 640, 480).unwrap();
    assert!(summary.skipped.is_empty(), "{:?}", summary.skipped);
    assert_eq!(summary.layers_drawn, 2);
    assert!(std::fs::metadata(&out).unwrap().len() > 0);
}
