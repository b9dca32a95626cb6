use mapcompose::color::Rgba;
use mapcompose::cpt::{ColorModel, CptFile};
use mapcompose::error::MapError;
use std::io::Write;

const TOPO: &str = "\
# bathymetry and land
# COLOR_MODEL = RGB
-200 0 0 128 -100 0 0 255
-100 0/0/255 0 cyan ; shelf
0 green 500 brown
B black
F white
N 128
";

fn write_cpt(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".cpt").tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_segments_and_special_colors() {
    let file = write_cpt(TOPO);
    let cpt = CptFile::load(file.path()).unwrap();
    assert_eq!(cpt.model, ColorModel::Rgb);
    assert_eq!(cpt.segments.len(), 3);
    assert_eq!(cpt.segments[1].label.as_deref(), Some("shelf"));
    assert_eq!(cpt.segments[2].color1, Rgba::parse("brown").unwrap());
    assert_eq!(cpt.z_range(), Some((-200.0, 500.0)));
    assert_eq!(cpt.boundaries(), vec![-200.0, -100.0, 0.0, 500.0]);
    assert_eq!(cpt.foreground, Some(Rgba::WHITE));
}

#[test]
fn mappable_uses_table_range_and_fallbacks() {
    let cpt = CptFile::parse(TOPO).unwrap();
    let sm = cpt.to_mappable("topo").unwrap();
    assert_eq!(sm.to_rgba(-200.0), Rgba::rgb(0, 0, 128));
    assert_eq!(sm.to_rgba(500.0), Rgba::parse("brown").unwrap());
    assert_eq!(sm.to_rgba(-300.0), Rgba::BLACK);
    assert_eq!(sm.to_rgba(900.0), Rgba::WHITE);
    assert_eq!(sm.to_rgba(f64::NAN), Rgba::rgb(128, 128, 128));
}

#[test]
fn overlapping_segments_are_rejected() {
    let err = CptFile::parse("0 red 10 blue\n5 blue 20 green\n").unwrap_err();
    assert!(matches!(err, MapError::Cpt { line: 2, .. }));
}

#[test]
fn bad_color_reports_its_line() {
    let err = CptFile::parse("# header\n0 red 10 blue\n10 nosuchcolor 20 green\n").unwrap_err();
    assert!(matches!(err, MapError::Cpt { line: 3, .. }));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CptFile::load(dir.path().join("absent.cpt")).unwrap_err();
    assert!(matches!(err, MapError::Io(_)));
}
