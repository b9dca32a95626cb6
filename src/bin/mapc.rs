use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use mapcompose::config::MapDocument;
use mapcompose::cpt::{ColorModel, CptFile};
use mapcompose::data::CompositeData;
use mapcompose::gis::GisLayers;
use mapcompose::viz::LegendMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mapc",
    version,
    about = "Compose layered thematic maps from JSON documents and render them to SVG/PNG"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a map document to an image.
    Render(RenderArgs),
    /// Inspect a GMT color palette table.
    Cpt(CptArgs),
    /// Parse WKT and report its geometries (optionally as GeoJSON).
    Wkt(WktArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LegendArg {
    Inside,
    Right,
    Top,
    Bottom,
}

impl From<LegendArg> for LegendMode {
    fn from(v: LegendArg) -> Self {
        match v {
            LegendArg::Inside => LegendMode::Inside,
            LegendArg::Right => LegendMode::Right,
            LegendArg::Top => LegendMode::Top,
            LegendArg::Bottom => LegendMode::Bottom,
        }
    }
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Map document (JSON).
    doc: PathBuf,
    /// Output image (.svg, .png or .jpg); overrides the document's `output`.
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Figure width in pixels; overrides the document.
    #[arg(long)]
    width: Option<u32>,
    /// Figure height in pixels; overrides the document.
    #[arg(long)]
    height: Option<u32>,
    /// Legend placement; overrides the document.
    #[arg(long, value_enum)]
    legend: Option<LegendArg>,
}

#[derive(Args, Debug)]
struct CptArgs {
    /// CPT file.
    file: PathBuf,
    /// Print the parsed table as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct WktArgs {
    /// WKT text, or `@path` to read it from a file.
    input: String,
    /// Print a GeoJSON FeatureCollection instead of a summary.
    #[arg(long, default_value_t = false)]
    geojson: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Cpt(args) => cmd_cpt(args),
        Command::Wkt(args) => cmd_wkt(args),
    }
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let mut doc = MapDocument::load(&args.doc)
        .with_context(|| format!("reading map document {}", args.doc.display()))?;
    if let Some(mode) = args.legend {
        doc.legend.mode = mode.into();
    }
    let out = args
        .out
        .or_else(|| doc.output.as_ref().map(|p| doc.base_dir.join(p)))
        .context("no output path: pass --out or set `output` in the document")?;
    let width = args.width.unwrap_or(doc.width);
    let height = args.height.unwrap_or(doc.height);

    let map = doc
        .into_map()
        .with_context(|| format!("building map from {}", args.doc.display()))?;
    let summary = map
        .plot(&out, width, height)
        .with_context(|| format!("rendering {}", out.display()))?;

    for (layer, reason) in &summary.skipped {
        eprintln!("Skipped layer {layer}: {reason}");
    }
    eprintln!(
        "Wrote map to {} ({} layers, {} legend entries, {} colorbars)",
        out.display(),
        summary.layers_drawn,
        summary.legend_entries,
        summary.colorbars
    );
    Ok(())
}

fn fmt_z(v: f64) -> String {
    let s = format!("{:.4}", v);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn cmd_cpt(args: CptArgs) -> Result<()> {
    let cpt = CptFile::load(&args.file)
        .with_context(|| format!("parsing {}", args.file.display()))?;
    if args.json {
        let segments: Vec<serde_json::Value> = cpt
            .segments
            .iter()
            .map(|s| {
                serde_json::json!({
                    "z0": s.z0,
                    "color0": s.color0.to_hex(),
                    "z1": s.z1,
                    "color1": s.color1.to_hex(),
                    "label": s.label,
                })
            })
            .collect();
        let out = serde_json::json!({
            "model": if cpt.model == ColorModel::Hsv { "hsv" } else { "rgb" },
            "segments": segments,
            "background": cpt.background.map(|c| c.to_hex()),
            "foreground": cpt.foreground.map(|c| c.to_hex()),
            "nan": cpt.nan_color.map(|c| c.to_hex()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let (zmin, zmax) = cpt
        .z_range()
        .context("the table has no color segments")?;
    println!(
        "{} segments, z {} .. {}",
        cpt.segments.len(),
        fmt_z(zmin),
        fmt_z(zmax)
    );
    for s in &cpt.segments {
        println!(
            "  {:>10} {}  ->  {:>10} {}{}",
            fmt_z(s.z0),
            s.color0.to_hex(),
            fmt_z(s.z1),
            s.color1.to_hex(),
            s.label.as_deref().map(|l| format!("  ({l})")).unwrap_or_default()
        );
    }
    for (name, color) in [
        ("B", cpt.background),
        ("F", cpt.foreground),
        ("N", cpt.nan_color),
    ] {
        if let Some(c) = color {
            println!("  {name} {}", c.to_hex());
        }
    }
    Ok(())
}

fn cmd_wkt(args: WktArgs) -> Result<()> {
    let text = match args.input.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?,
        None => args.input.clone(),
    };
    let data = CompositeData::from_wkt(text.trim()).context("parsing WKT")?;
    let layers = GisLayers {
        points: data.points,
        lines: data.lines,
        polygons: data.polygons,
    };
    if args.geojson {
        let fc = layers.to_feature_collection();
        println!("{}", serde_json::to_string_pretty(&fc)?);
        return Ok(());
    }
    println!(
        "{} points, {} lines, {} polygons",
        layers.points.len(),
        layers.lines.len(),
        layers.polygons.len()
    );
    if let Some(r) = layers.bbox() {
        println!(
            "bbox: lon {} .. {}, lat {} .. {}",
            fmt_z(r.lon_min),
            fmt_z(r.lon_max),
            fmt_z(r.lat_min),
            fmt_z(r.lat_max)
        );
    }
    Ok(())
}
