use mapcompose::color::Rgba;
use mapcompose::data::{
    FocmecData, LineData, MeshGridData, MultiFocmecData, MultiLineData, MultiPointData,
    MultiPolygonData, MultiTextData, PointData, PolygonData, TextData,
};
use mapcompose::error::MapError;
use mapcompose::style::{
    ConcreteLineStyle, FocmecStyle, FrontStyle, GridStyle, LineStyle, MarkerShape, ParamValue,
    PointStyle, PolygonStyle, TextStyle,
};
use mapcompose::wms::{WmsClient, WmsRequest};
use mapcompose::{LayeredMap, LegendLabel, MapLayer, RecordingCanvas, Region, ThematicStyle};
use ndarray::Array2;

fn color(name: &str) -> Rgba {
    Rgba::parse(name).unwrap()
}

fn belgium() -> Region {
    Region::new(0.0, 8.0, 49.0, 52.0).unwrap()
}

fn reactors() -> MultiPointData {
    [
        (4.26, 51.32, 3.0),
        (5.27, 50.53, 7.0),
        (4.95, 50.90, 12.0),
        (3.70, 51.05, 14.0),
    ]
    .into_iter()
    .map(|(lon, lat, v)| PointData::new(lon, lat).with_value(v))
    .collect()
}

fn ranges() -> ThematicStyle<Rgba> {
    ThematicStyle::ranges(
        vec![0.0, 5.0, 10.0, 20.0, 40.0],
        vec![color("yellow"), color("orange"), color("red"), color("purple")],
    )
    .unwrap()
    .with_legend(true)
}

fn render(map: &LayeredMap) -> RecordingCanvas {
    let mut canvas = RecordingCanvas::new(800, 400);
    map.render(&mut canvas).unwrap();
    canvas
}

#[test]
fn uniform_points_draw_one_scatter_and_one_entry() {
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::points(reactors(), PointStyle::new()).with_label("reactors"));
    let mut canvas = RecordingCanvas::new(800, 400);
    let summary = map.render(&mut canvas).unwrap();
    assert_eq!(canvas.count("scatter"), 1);
    let scatter = canvas.calls_of("scatter").next().unwrap();
    assert_eq!(scatter.features, 4);
    assert_eq!(scatter.kwargs.len(), 1);
    assert_eq!(summary.legend_entries, 1);
}

#[test]
fn same_layer_twice_gives_two_entries() {
    let layer = MapLayer::points(reactors(), PointStyle::new()).with_label("reactors");
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(layer.clone())
        .with_layer(layer);
    let mut canvas = RecordingCanvas::new(800, 400);
    let summary = map.render(&mut canvas).unwrap();
    assert_eq!(summary.legend_entries, 2);
    let legend = canvas.calls_of("legend").next().unwrap();
    assert_eq!(legend.features, 2);
}

#[test]
fn nolegend_sentinel_hides_the_layer() {
    let map = LayeredMap::new().with_region(belgium()).with_layer(
        MapLayer::points(reactors(), PointStyle::new()).with_legend(LegendLabel::none()),
    );
    let mut canvas = RecordingCanvas::new(800, 400);
    let summary = map.render(&mut canvas).unwrap();
    assert_eq!(summary.legend_entries, 0);
    assert_eq!(canvas.count("legend"), 0);
}

#[test]
fn thematic_legend_lists_only_present_classes() {
    let map = LayeredMap::new().with_region(belgium()).with_layer(
        MapLayer::points(reactors(), PointStyle::new().with_fill_color(ranges()))
            .with_label("reactors"),
    );
    let legend = map.legend_preview().unwrap();
    let labels: Vec<&str> = legend.groups()[0]
        .entries
        .iter()
        .map(|e| e.label.as_str())
        .collect();
    // 3 -> first class, 7 -> second, 12 and 14 -> third; the fourth class is unused
    assert_eq!(labels, vec!["0 - 5", "5 - 10", "10 - 20"]);
}

#[test]
fn thematic_points_carry_per_feature_styles() {
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::points(reactors(), PointStyle::new().with_fill_color(ranges())));
    let canvas = render(&map);
    let scatter = canvas.calls_of("scatter").next().unwrap();
    assert_eq!(scatter.kwargs.len(), 4);
    assert_eq!(
        scatter.kwargs[1].get("fill_color"),
        Some(&ParamValue::Color(color("orange")))
    );
}

#[test]
fn marker_shape_theme_splits_scatter_calls() {
    let points: MultiPointData = [
        PointData::new(4.0, 50.0).with_value("pwr"),
        PointData::new(5.0, 51.0).with_value("bwr"),
        PointData::new(6.0, 50.5).with_value("pwr"),
    ]
    .into_iter()
    .collect();
    let shapes = ThematicStyle::individual(
        vec!["pwr".into(), "bwr".into()],
        vec![MarkerShape::Circle, MarkerShape::Triangle],
    )
    .unwrap();
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::points(points, PointStyle::new().with_shape(shapes)));
    let canvas = render(&map);
    let sizes: Vec<usize> = canvas.calls_of("scatter").map(|c| c.features).collect();
    assert_eq!(sizes, vec![2, 1]);
}

#[test]
fn unmapped_value_fails_the_render() {
    let points: MultiPointData = [PointData::new(4.0, 50.0).with_value("candu")]
        .into_iter()
        .collect();
    let shapes = ThematicStyle::individual(vec!["pwr".into()], vec![MarkerShape::Circle]).unwrap();
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::points(points, PointStyle::new().with_shape(shapes)));
    let mut canvas = RecordingCanvas::new(800, 400);
    let err = map.render(&mut canvas).unwrap_err();
    assert!(matches!(err, MapError::UnmappedValue { .. }));
}

#[test]
fn feature_overrides_beat_the_layer_style() {
    let points: MultiPointData = [
        PointData::new(4.0, 50.0),
        PointData::new(5.0, 51.0).with_style_param("size", ParamValue::Number(20.0)),
    ]
    .into_iter()
    .collect();
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::points(points, PointStyle::new().with_size(6.0)));
    let canvas = render(&map);
    let scatter = canvas.calls_of("scatter").next().unwrap();
    assert_eq!(scatter.kwargs[0].get("size"), Some(&ParamValue::Number(6.0)));
    assert_eq!(scatter.kwargs[1].get("size"), Some(&ParamValue::Number(20.0)));
}

#[test]
fn labels_are_drawn_only_with_a_label_style() {
    let points: MultiPointData = [PointData::new(4.35, 50.85).with_label("Brussels")]
        .into_iter()
        .collect();
    let plain = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::points(points.clone(), PointStyle::new()));
    assert_eq!(render(&plain).count("text"), 0);

    let labelled = LayeredMap::new().with_region(belgium()).with_layer(MapLayer::points(
        points,
        PointStyle::new().with_label_style(TextStyle::default()),
    ));
    let canvas = render(&labelled);
    let text = canvas.calls_of("text").next().unwrap();
    assert_eq!(text.text.as_deref(), Some("Brussels"));
}

#[test]
fn fronts_draw_each_line_separately() {
    let lines: MultiLineData = [
        LineData::new(vec![(1.0, 50.0), (3.0, 51.0)]).unwrap(),
        LineData::new(vec![(4.0, 50.0), (6.0, 51.5)]).unwrap(),
    ]
    .into_iter()
    .collect();
    let map = LayeredMap::new().with_region(belgium()).with_layer(MapLayer::lines(
        lines,
        LineStyle::new().with_front(FrontStyle::default()),
    ));
    let canvas = render(&map);
    // the frame border is its own primitive
    assert_eq!(canvas.count("polylines"), 2);
    assert!(canvas
        .calls_of("polylines")
        .all(|c| c.features == 1 && c.kwargs[0].contains_key("front")));
}

#[test]
fn polygon_labels_sit_at_centroids() {
    let square = PolygonData::new(
        vec![(2.0, 50.0), (4.0, 50.0), (4.0, 51.0), (2.0, 51.0)],
        vec![],
    )
    .unwrap()
    .with_label("block")
    .with_value(15.0);
    let polys: MultiPolygonData = [square].into_iter().collect();
    let map = LayeredMap::new().with_region(belgium()).with_layer(
        MapLayer::polygons(
            polys,
            PolygonStyle::new()
                .with_fill_color(ranges())
                .with_label_style(TextStyle::default()),
        )
        .with_label("blocks"),
    );
    let mut canvas = RecordingCanvas::new(800, 400);
    let summary = map.render(&mut canvas).unwrap();
    assert_eq!(canvas.count("polygons"), 1);
    assert_eq!(canvas.count("text"), 1);
    assert_eq!(summary.legend_entries, 1);
}

#[test]
fn texts_apply_per_feature_overrides() {
    let texts: MultiTextData = [
        TextData::new(4.0, 50.5, "a"),
        TextData::new(5.0, 50.5, "b").with_style_param("font_size", ParamValue::Number(24.0)),
    ]
    .into_iter()
    .collect();
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::texts(texts, TextStyle::default()));
    let canvas = render(&map);
    let sizes: Vec<Option<&ParamValue>> = canvas
        .calls_of("text")
        .map(|c| c.kwargs[0].get("font_size"))
        .collect();
    assert_eq!(sizes.len(), 2);
    assert_eq!(sizes[1], Some(&ParamValue::Number(24.0)));
    assert_ne!(sizes[0], sizes[1]);
}

#[test]
fn continuous_grid_adds_a_colorbar() {
    let grid = MeshGridData::new(
        vec![1.0, 3.0, 5.0, 7.0],
        vec![49.5, 50.5, 51.5],
        Array2::from_shape_fn((3, 4), |(i, j)| (i * 4 + j) as f64),
    )
    .unwrap();
    let mut style = GridStyle::default().with_contours(vec![5.5], ConcreteLineStyle::default());
    style.color = style.color.with_legend(true);
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::grid(grid, style));
    let mut canvas = RecordingCanvas::new(800, 400);
    let summary = map.render(&mut canvas).unwrap();
    assert_eq!(canvas.count("mesh"), 1);
    assert_eq!(canvas.count("colorbar"), 1);
    assert_eq!(summary.colorbars, 1);
    assert_eq!(canvas.count("polylines"), 1);
}

#[test]
fn beachballs_follow_magnitude_sizes() {
    let events: MultiFocmecData = [
        FocmecData::new(4.0, 50.5, 30.0, 60.0, 90.0)
            .unwrap()
            .with_value(3.0),
        FocmecData::new(6.0, 51.0, 120.0, 45.0, -90.0)
            .unwrap()
            .with_value(5.0),
    ]
    .into_iter()
    .collect();
    let sizes = ThematicStyle::gradient(vec![3.0, 5.0], vec![10.0, 30.0]).unwrap();
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::focmec(events, FocmecStyle::new().with_size(sizes)));
    let canvas = render(&map);
    let sizes: Vec<Option<&ParamValue>> = canvas
        .calls_of("beachball")
        .map(|c| c.kwargs[0].get("size"))
        .collect();
    assert_eq!(
        sizes,
        vec![
            Some(&ParamValue::Number(10.0)),
            Some(&ParamValue::Number(30.0))
        ]
    );
}

#[test]
fn layers_stack_in_insertion_order() {
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::points(reactors(), PointStyle::new()))
        .with_layer(MapLayer::texts(
            [TextData::new(4.0, 50.0, "x")].into_iter().collect(),
            TextStyle::default(),
        ));
    let canvas = render(&map);
    let scatter = canvas.calls_of("scatter").next().unwrap().zorder;
    let text = canvas.calls_of("text").next().unwrap().zorder;
    assert!(scatter < text);
}

#[test]
fn unreachable_wms_layer_is_skipped() {
    let client = WmsClient::new("http://127.0.0.1:9/wms").unwrap();
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::points(reactors(), PointStyle::new()).with_label("below"))
        .with_layer(MapLayer::wms(client, WmsRequest::new(["relief"])).with_name("basemap"))
        .with_layer(MapLayer::points(reactors(), PointStyle::new()).with_label("above"));
    let mut canvas = RecordingCanvas::new(800, 400);
    let summary = map.render(&mut canvas).unwrap();

    assert_eq!(summary.layers_drawn, 2);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].0, "basemap");
    assert_eq!(canvas.count("image"), 0);
    // the skipped layer still takes its slot in the stack
    let z: Vec<u32> = canvas.calls_of("scatter").map(|c| c.zorder).collect();
    assert_eq!(z.len(), 2);
    assert_eq!(z[1] - z[0], 2);
}

#[test]
fn non_finite_point_fails_the_render() {
    let points: MultiPointData = [PointData::new(4.0, 50.0), PointData::new(f64::NAN, 51.0)]
        .into_iter()
        .collect();
    let map = LayeredMap::new()
        .with_region(belgium())
        .with_layer(MapLayer::points(points, PointStyle::new()));
    let mut canvas = RecordingCanvas::new(800, 400);
    let err = map.render(&mut canvas).unwrap_err();
    assert!(matches!(err, MapError::InvalidGeometry { .. }));
    assert_eq!(canvas.count("scatter"), 0);
}
