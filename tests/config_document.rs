use mapcompose::color::Rgba;
use mapcompose::error::MapError;
use mapcompose::map::LayerKind;
use mapcompose::viz::LegendMode;
use mapcompose::{MapDocument, Projection, RecordingCanvas};
use std::fs;
use std::path::Path;

const PLANTS_CSV: &str = "\
name,lon,lat,gw,type
Doel,4.26,51.32,2.9,pwr
Tihange,5.27,50.53,3.0,pwr
Borssele,3.72,51.43,0.5,pwr
Dodewaard,5.64,51.90,0.06,bwr
";

const TOPO_CPT: &str = "\
0 white 1 yellow
1 yellow 2 orange
2 orange 4 red
N gray
";

const DOC: &str = r#"{
  "region": [2.5, 7.0, 49.5, 52.5],
  "projection": "mercator",
  "width": 800,
  "height": 600,
  "output": "plants.svg",
  "title": "Power plants",
  "legend": {"mode": "bottom", "title": "Legend"},
  "graticule": {"lon_step": 1.0, "lat_step": 1.0},
  "layers": [
    {
      "kind": "grid",
      "name": "hazard",
      "data": {"scattered": {
        "lons": [3.0, 6.5, 3.0, 6.5, 4.8],
        "lats": [50.0, 50.0, 52.0, 52.0, 51.0],
        "values": [0.2, 1.5, 0.8, 3.5, 2.2],
        "nlon": 12, "nlat": 10,
        "gridding": {"method": "nearest"}
      }},
      "style": {"color": {"type": "colormap", "cpt": "hazard.cpt"}, "contour_levels": [1.0]}
    },
    {
      "kind": "points",
      "legend_label": "Reactors",
      "legend_group": "plants",
      "data": {"csv": {"path": "plants.csv", "label": "name", "values": ["gw", "type"]}},
      "style": {
        "shape": {"type": "individual", "values": ["pwr", "bwr"], "styles": ["o", "s"],
                  "value_key": "type", "legend_title": "Reactor type"},
        "size": {"type": "gradient", "breakpoints": [0, 3], "styles": [4, 16],
                 "value_key": "gw", "add_legend": false},
        "fill_color": "crimson"
      }
    },
    {
      "kind": "lines",
      "legend_label": "_nolegend_",
      "data": {"features": [{"coords": [[3.0, 51.0], [4.0, 51.2], [5.0, 50.8]]}]},
      "style": {"line_color": "navy", "front": {"symbol": "triangle"}}
    }
  ]
}"#;

fn write_fixture(dir: &Path) -> std::path::PathBuf {
    fs::write(dir.join("plants.csv"), PLANTS_CSV).unwrap();
    fs::write(dir.join("hazard.cpt"), TOPO_CPT).unwrap();
    let doc = dir.join("plants.json");
    fs::write(&doc, DOC).unwrap();
    doc
}

#[test]
fn document_resolves_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let doc = MapDocument::load(write_fixture(dir.path())).unwrap();
    assert_eq!(doc.base_dir, dir.path());
    assert_eq!((doc.width, doc.height), (800, 600));
    assert_eq!(doc.legend.mode, LegendMode::Bottom);

    let map = doc.into_map().unwrap();
    assert_eq!(map.projection, Projection::Mercator);
    assert_eq!(map.layers.len(), 3);
    match &map.layers[1].kind {
        LayerKind::Points { data, .. } => {
            assert_eq!(data.len(), 4);
            assert_eq!(data.items()[3].label.as_deref(), Some("Dodewaard"));
        }
        other => panic!("expected points, got {}", other.kind_name()),
    }
    assert_eq!(map.layers[1].legend_label.group, "plants");
    assert_eq!(map.layers[2].legend_label.visible_text(), None);
}

#[test]
fn document_renders_with_legend_groups() {
    let dir = tempfile::tempdir().unwrap();
    let map = MapDocument::load(write_fixture(dir.path()))
        .unwrap()
        .into_map()
        .unwrap();
    let mut canvas = RecordingCanvas::new(800, 600);
    let summary = map.render(&mut canvas).unwrap();
    assert_eq!(summary.layers_drawn, 3);
    // the CPT colormap becomes a colorbar, the shape theme one legend group
    assert_eq!(summary.colorbars, 1);
    let titles: Vec<Option<String>> = canvas.calls_of("legend").map(|c| c.text.clone()).collect();
    assert_eq!(titles, vec![Some("Reactor type".to_string())]);
    let legend = canvas.calls_of("legend").next().unwrap();
    assert_eq!(legend.features, 2);
    assert_eq!(canvas.count("title"), 1);
}

#[test]
fn document_plots_to_its_output() {
    let dir = tempfile::tempdir().unwrap();
    let doc = MapDocument::load(write_fixture(dir.path())).unwrap();
    let out = doc.base_dir.join(doc.output.clone().unwrap());
    let (w, h) = (doc.width, doc.height);
    doc.into_map().unwrap().plot(&out, w, h).unwrap();
    let svg = fs::read_to_string(out).unwrap();
    assert!(svg.contains("Power plants"));
    assert!(svg.contains("Reactor type"));
}

#[test]
fn layer_errors_name_the_layer() {
    let err = MapDocument::from_json_str(
        r#"{"layers": [
            {"kind": "texts", "texts": []},
            {"kind": "points", "data": {"csv": {"path": "missing.csv"}}}
        ]}"#,
    )
    .unwrap()
    .into_map()
    .unwrap_err();
    assert!(err.to_string().contains("layer 1"), "{err}");
}

#[test]
fn invalid_theme_is_rejected() {
    let err = MapDocument::from_json_str(
        r#"{"region": [0, 1, 0, 1], "layers": [
            {"kind": "points", "data": {"wkt": "POINT(0.5 0.5)"},
             "style": {"fill_color": {"type": "ranges", "breakpoints": [0, 1], "styles": ["red", "blue"]}}}
        ]}"#,
    )
    .unwrap()
    .into_map()
    .unwrap_err();
    assert!(matches!(err, MapError::Config { .. }));
}

#[test]
fn background_and_border_overrides() {
    let doc = MapDocument::from_json_str(
        r##"{"region": [0, 1, 0, 1], "background": "#eeeeee", "border": null}"##,
    )
    .unwrap();
    let map = doc.into_map().unwrap();
    assert_eq!(map.background, Rgba::rgb(0xee, 0xee, 0xee));
    assert!(map.border_style.is_none());
}

#[test]
fn zero_sized_figures_are_rejected() {
    assert!(MapDocument::from_json_str(r#"{"width": 0}"#).is_err());
}
