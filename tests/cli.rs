use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

#[test]
fn cli_shows_help() {
    let mut cmd = Command::cargo_bin("mapc").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("cpt"))
        .stdout(predicate::str::contains("wkt"));
}

#[test]
fn wkt_summary_counts_parts() {
    let mut cmd = Command::cargo_bin("mapc").unwrap();
    cmd.args([
        "wkt",
        "GEOMETRYCOLLECTION(POINT(4 50), LINESTRING(3 50, 5 51), POLYGON((3 50, 6 50, 6 52, 3 50)))",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1 points, 1 lines, 1 polygons"))
        .stdout(predicate::str::contains("bbox: lon 3 .. 6, lat 50 .. 52"));
}

#[test]
fn wkt_reads_files_and_prints_geojson() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pts.wkt");
    fs::write(&path, "MULTIPOINT((1 2),(3 4))\n").unwrap();
    let mut cmd = Command::cargo_bin("mapc").unwrap();
    cmd.args(["wkt", &format!("@{}", path.display()), "--geojson"]);
    let out = cmd.output().unwrap();
    assert!(out.status.success());
    let fc: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(fc["type"], "FeatureCollection");
    assert_eq!(fc["features"].as_array().unwrap().len(), 2);
}

#[test]
fn wkt_rejects_garbage() {
    let mut cmd = Command::cargo_bin("mapc").unwrap();
    cmd.args(["wkt", "NOT WKT"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("parsing WKT"));
}

#[test]
fn cpt_lists_segments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.cpt");
    fs::write(&path, "0 black 10 white ; low\n10 255/0/0 25.5 blue\nN gray\n").unwrap();

    let mut cmd = Command::cargo_bin("mapc").unwrap();
    cmd.arg("cpt").arg(&path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 segments, z 0 .. 25.5"))
        .stdout(predicate::str::contains("(low)"))
        .stdout(predicate::str::contains("  N #"));

    let mut cmd = Command::cargo_bin("mapc").unwrap();
    cmd.arg("cpt").arg(&path).arg("--json");
    let out = cmd.output().unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["model"], "rgb");
    assert_eq!(v["segments"].as_array().unwrap().len(), 2);
    assert_eq!(v["segments"][0]["label"], "low");
}

#[test]
fn render_writes_the_requested_file() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("map.json");
    fs::write(
        &doc,
        r#"{
            "region": [2, 7, 49, 52],
            "title": "Belgium",
            "layers": [
                {"kind": "points", "legend_label": "cities",
                 "data": {"features": [{"lon": 4.35, "lat": 50.85, "label": "Brussels"}]}}
            ]
        }"#,
    )
    .unwrap();
    let out = dir.path().join("map.png");

    let mut cmd = Command::cargo_bin("mapc").unwrap();
    cmd.arg("render")
        .arg(&doc)
        .arg("--out")
        .arg(&out)
        .args(["--width", "500", "--height", "400", "--legend", "inside"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Wrote map to"));
    assert!(fs::metadata(&out).unwrap().len() > 0);
}

#[test]
fn render_needs_an_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("map.json");
    fs::write(&doc, r#"{"region": [0, 1, 0, 1]}"#).unwrap();
    let mut cmd = Command::cargo_bin("mapc").unwrap();
    cmd.arg("render").arg(&doc);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no output path"));
}

#[test]
fn render_reports_bad_documents() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("bad.json");
    fs::write(&doc, r#"{"layers": [{"kind": "volcano"}]}"#).unwrap();
    let mut cmd = Command::cargo_bin("mapc").unwrap();
    cmd.arg("render").arg(&doc).args(["--out", "x.svg"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("reading map document"));
}
