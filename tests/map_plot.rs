use mapcompose::color::Rgba;
use mapcompose::data::{
    GeoImage, LineData, MeshGridData, MultiLineData, MultiPointData, MultiPolygonData, PointData,
    PolygonData,
};
use mapcompose::error::MapError;
use mapcompose::style::{
    FrontStyle, GraticuleStyle, GridStyle, LegendStyle, LineStyle, PointStyle, PolygonStyle,
};
use mapcompose::viz::LegendMode;
use mapcompose::{LayeredMap, MapLayer, Projection, Region, ThematicStyle};
use std::fs;
use std::path::{Path, PathBuf};

fn color(name: &str) -> Rgba {
    Rgba::parse(name).unwrap()
}

fn sample_map() -> LayeredMap {
    let reactors: MultiPointData = [
        (4.26, 51.32, 2.9, "Doel"),
        (5.27, 50.53, 3.0, "Tihange"),
        (3.72, 51.43, 0.5, "Borssele"),
    ]
    .into_iter()
    .map(|(lon, lat, gw, name)| PointData::new(lon, lat).with_value(gw).with_label(name))
    .collect();
    let sizes = ThematicStyle::gradient(vec![0.0, 3.0], vec![6.0, 18.0]).unwrap();
    let fills = ThematicStyle::ranges(
        vec![0.0, 1.0, 5.0],
        vec![color("gold"), color("crimson")],
    )
    .unwrap()
    .with_legend(true)
    .with_legend_title("Capacity (GW)");

    let coast: MultiLineData = [LineData::new(vec![(2.5, 51.1), (3.4, 51.4), (4.2, 51.5)]).unwrap()]
        .into_iter()
        .collect();
    let front: MultiLineData = [LineData::new(vec![(1.0, 49.5), (3.0, 50.5), (6.5, 50.0)]).unwrap()]
        .into_iter()
        .collect();
    let lake: MultiPolygonData = [PolygonData::new(
        vec![(5.8, 50.9), (6.4, 50.9), (6.4, 51.3), (5.8, 51.3)],
        vec![vec![(6.0, 51.0), (6.2, 51.0), (6.2, 51.2), (6.0, 51.2)]],
    )
    .unwrap()]
    .into_iter()
    .collect();

    LayeredMap::new()
        .with_region(Region::new(1.0, 7.0, 49.3, 52.0).unwrap())
        .with_title("Reactors")
        .with_graticule(GraticuleStyle::default())
        .with_layer(
            MapLayer::polygons(lake, PolygonStyle::new().with_fill_color(color("lightblue")))
                .with_label("lake"),
        )
        .with_layer(MapLayer::lines(coast, LineStyle::new()).with_label("coast"))
        .with_layer(
            MapLayer::lines(
                front,
                LineStyle::new()
                    .with_line_color(color("blue"))
                    .with_front(FrontStyle::default()),
            )
            .with_label("cold front"),
        )
        .with_layer(
            MapLayer::points(
                reactors,
                PointStyle::new().with_size(sizes).with_fill_color(fills),
            )
            .with_label("reactors"),
        )
}

fn write_and_check<F: Fn(&Path)>(dir: &Path, name: &str, maker: F) -> PathBuf {
    let path = dir.join(name);
    maker(&path);
    let meta = fs::metadata(&path).expect("file created");
    assert!(meta.len() > 0, "{name} has content");
    path
}

#[test]
fn svg_output_contains_title_and_legend() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_and_check(dir.path(), "reactors.svg", |p| {
        let summary = sample_map().plot(p, 900, 600).unwrap();
        assert_eq!(summary.layers_drawn, 4);
        assert!(summary.skipped.is_empty());
    });
    let svg = fs::read_to_string(&path).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("Reactors"));
    assert!(svg.contains("Capacity (GW)"));
    assert!(svg.contains("cold front"));
}

#[test]
fn png_output_has_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_and_check(dir.path(), "reactors.png", |p| {
        sample_map().plot(p, 640, 480).unwrap();
    });
    assert_eq!(image::image_dimensions(&path).unwrap(), (640, 480));
}

#[test]
fn every_legend_mode_renders() {
    let dir = tempfile::tempdir().unwrap();
    for mode in [
        LegendMode::Inside,
        LegendMode::Right,
        LegendMode::Top,
        LegendMode::Bottom,
    ] {
        let map = sample_map().with_legend_style(LegendStyle {
            mode,
            ..LegendStyle::default()
        });
        write_and_check(dir.path(), &format!("legend_{mode:?}.svg"), |p| {
            map.plot(p, 800, 500).unwrap();
        });
    }
}

#[test]
fn grid_with_colorbar_renders_in_mercator() {
    let grid = MeshGridData::from_fn(
        (0..=20).map(|i| 1.0 + i as f64 * 0.3).collect(),
        (0..=10).map(|i| 49.0 + i as f64 * 0.3).collect(),
        |lon, lat| (lon - 4.0).hypot(lat - 50.5),
    )
    .unwrap();
    let mut style = GridStyle::default().with_contours(vec![1.0, 2.0], Default::default());
    style.color = style.color.with_legend(true);
    style.pixelated = false;
    let map = LayeredMap::new()
        .with_projection(Projection::Mercator)
        .with_layer(MapLayer::grid(grid, style));
    let dir = tempfile::tempdir().unwrap();
    write_and_check(dir.path(), "grid.png", |p| {
        let summary = map.plot(p, 700, 500).unwrap();
        assert_eq!(summary.colorbars, 1);
    });
}

#[test]
fn image_layer_is_stretched_over_its_bounds() {
    let pixels = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 30, 30, 255]));
    let image = GeoImage {
        pixels,
        bounds: Region::new(2.0, 4.0, 50.0, 51.0).unwrap(),
    };
    let map = LayeredMap::new().with_layer(MapLayer::image(image, 0.5).with_label("overlay"));
    let dir = tempfile::tempdir().unwrap();
    write_and_check(dir.path(), "overlay.png", |p| {
        map.plot(p, 300, 200).unwrap();
    });
}

#[test]
fn tiny_figures_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = sample_map()
        .plot(dir.path().join("tiny.svg"), 32, 32)
        .unwrap_err();
    assert!(matches!(err, MapError::Config { .. }));
}

#[test]
fn map_without_region_or_layers_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = LayeredMap::new()
        .plot(dir.path().join("empty.svg"), 400, 300)
        .unwrap_err();
    assert!(matches!(err, MapError::Config { .. }));
}

#[test]
fn mercator_map_of_the_pole_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = sample_map()
        .with_region(Region::new(-20.0, 20.0, 86.0, 90.0).unwrap())
        .with_projection(Projection::Mercator)
        .plot(dir.path().join("pole.svg"), 400, 300)
        .unwrap_err();
    assert!(matches!(err, MapError::Config { .. }));
}
