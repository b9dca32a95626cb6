//! JSON map documents.
//!
//! A document describes one figure: extent, projection, size, decorations and an ordered
//! list of layers. Every style attribute that the library accepts as thematic may be
//! given either as a fixed value or as an object tagged by `"type"`:
//!
//! ```json
//! {
//!   "region": [2.0, 7.0, 49.0, 52.0],
//!   "title": "Nuclear power plants",
//!   "layers": [
//!     {
//!       "kind": "points",
//!       "legend_label": "Plants",
//!       "data": { "features": [ { "lon": 4.26, "lat": 51.32, "value": "Doel" } ] },
//!       "style": {
//!         "shape": { "type": "individual", "values": ["Doel"], "styles": ["o"] },
//!         "fill_color": "red"
//!       }
//!     }
//!   ]
//! }
//! ```
//!
//! Relative file paths (CSV, GeoJSON, images, CPT files) resolve against the directory of
//! the document.

use crate::color::Rgba;
use crate::colormap::{Colormap, Norm, ScalarMappable};
use crate::cpt::CptFile;
use crate::data::{
    CompositeData, CsvColumns, Datum, FeatureValue, FocmecData, GeoImage, Gridding, LineData,
    MeshGridData, MultiFocmecData, MultiLineData, MultiPointData, MultiPolygonData, MultiTextData,
    PointData, PolygonData, TextData, UnstructuredGridData,
};
use crate::error::{MapError, Result};
use crate::gis::GisData;
use crate::legend::{LegendLabel, MAIN_GROUP};
use crate::map::{LayerKind, LayeredMap, MapLayer};
use crate::projection::{Projection, Region};
use crate::style::{
    ColorbarStyle, CompositeStyle, ConcreteLineStyle, FocmecStyle, FrontStyle, GraticuleStyle,
    GridStyle, LayerStyle, LegendStyle, LineDash, LineStyle, MarkerShape, PointStyle,
    PolygonStyle, StyleOverrides, StyleParam, TextStyle,
};
use crate::thematic::{StyleOutput, ThematicStyle};
use crate::wms::{WmsClient, WmsRequest};

use ndarray::Array2;
use serde::Deserialize;
use std::path::{Path, PathBuf};

fn default_width() -> u32 {
    1000
}

fn default_height() -> u32 {
    700
}

fn default_true() -> bool {
    true
}

fn default_alpha() -> f64 {
    1.0
}

fn default_border() -> Option<ConcreteLineStyle> {
    Some(ConcreteLineStyle::default())
}

/// A complete map figure.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapDocument {
    /// `[lon_min, lon_max, lat_min, lat_max]`; derived from the layers when unset.
    #[serde(default)]
    pub region: Option<[f64; 4]>,
    #[serde(default)]
    pub projection: Projection,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Output file; the CLI flag takes precedence.
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_style: Option<TextStyle>,
    #[serde(default)]
    pub legend: LegendStyle,
    #[serde(default)]
    pub graticule: Option<GraticuleStyle>,
    /// Frame outline; `null` disables it.
    #[serde(default = "default_border")]
    pub border: Option<ConcreteLineStyle>,
    #[serde(default)]
    pub background: Option<Rgba>,
    #[serde(default)]
    pub layers: Vec<LayerDoc>,

    /// Directory relative paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// One layer: where its data comes from, how it is styled and its legend label.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerDoc {
    #[serde(default)]
    pub name: Option<String>,
    /// Legend text; `"_nolegend_"` suppresses the entry.
    #[serde(default)]
    pub legend_label: Option<String>,
    #[serde(default)]
    pub legend_group: Option<String>,
    #[serde(flatten)]
    pub source: SourceDoc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDoc {
    Points {
        data: PointsSource,
        #[serde(default)]
        style: PointStyleDoc,
    },
    Lines {
        data: GeometrySource,
        #[serde(default)]
        style: LineStyleDoc,
    },
    Polygons {
        data: GeometrySource,
        #[serde(default)]
        style: PolygonStyleDoc,
    },
    Texts {
        texts: Vec<TextDoc>,
        #[serde(default)]
        style: TextStyle,
    },
    Grid {
        data: GridSource,
        #[serde(default)]
        style: GridStyleDoc,
    },
    Focmec {
        events: Vec<FocmecDoc>,
        #[serde(default)]
        style: FocmecStyleDoc,
    },
    /// Mixed geometries given as one WKT string (usually a `GEOMETRYCOLLECTION`).
    Composite {
        wkt: String,
        #[serde(default)]
        style: CompositeStyleDoc,
    },
    Gis {
        gis: GisData,
        #[serde(default)]
        style: CompositeStyleDoc,
    },
    Image {
        path: PathBuf,
        bounds: [f64; 4],
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    Wms {
        url: String,
        request: WmsRequest,
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
}

/// A single feature of an inline data source.
///
/// Geometry is given by `lon`/`lat` (points), `coords` (a line, or a polygon's exterior
/// ring) plus optional `holes`, or `wkt`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureDoc {
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    pub coords: Option<Vec<[f64; 2]>>,
    pub holes: Vec<Vec<[f64; 2]>>,
    pub wkt: Option<String>,
    pub value: Option<FeatureValue>,
    pub label: Option<String>,
    /// Per-feature style overrides, e.g. `{"fill_color": "blue"}`.
    pub style: StyleOverrides,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsSource {
    Features(Vec<FeatureDoc>),
    Wkt(String),
    Csv(CsvDoc),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometrySource {
    Features(Vec<FeatureDoc>),
    Wkt(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsvDoc {
    pub path: PathBuf,
    #[serde(default)]
    pub lon: Option<String>,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// Columns attached as the value mapping.
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextDoc {
    pub lon: f64,
    pub lat: f64,
    pub text: String,
    #[serde(default)]
    pub style: StyleOverrides,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FocmecDoc {
    pub lon: f64,
    pub lat: f64,
    pub strike: f64,
    pub dip: f64,
    pub rake: f64,
    #[serde(default)]
    pub magnitude: Option<f64>,
    #[serde(default)]
    pub value: Option<FeatureValue>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSource {
    /// Values on a regular mesh; `values[row][col]` with rows following `lats`. `null`
    /// marks a missing value.
    Mesh {
        lons: Vec<f64>,
        lats: Vec<f64>,
        values: Vec<Vec<Option<f64>>>,
    },
    /// Scattered samples gridded onto an `nlon` x `nlat` mesh.
    Scattered {
        lons: Vec<f64>,
        lats: Vec<f64>,
        values: Vec<f64>,
        nlon: usize,
        nlat: usize,
        #[serde(default)]
        gridding: Gridding,
    },
}

// ------------------------ Styles ------------------------

/// A style attribute: a fixed value or a thematic rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParamDoc<T> {
    Fixed(T),
    Thematic(ThemeDoc<T>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    Individual,
    Ranges,
    Gradient,
    Colormap,
}

/// A thematic rule. Which fields apply depends on `type`:
/// `individual` takes `values` + `styles`, `ranges` and `gradient` take `breakpoints` +
/// `styles`, `colormap` takes `cmap` (or `cpt`) with optional `vmin`, `vmax`, `log` and
/// `boundaries`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, bound(deserialize = "T: Deserialize<'de>"))]
pub struct ThemeDoc<T> {
    #[serde(rename = "type")]
    pub kind: ThemeKind,
    #[serde(default)]
    pub values: Vec<Datum>,
    #[serde(default)]
    pub breakpoints: Vec<f64>,
    #[serde(default)]
    pub styles: Vec<T>,
    #[serde(default)]
    pub value_key: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "default_true")]
    pub add_legend: bool,
    #[serde(default)]
    pub legend_title: Option<String>,
    #[serde(default)]
    pub colorbar: Option<ColorbarStyle>,
    #[serde(default)]
    pub style_under: Option<T>,
    #[serde(default)]
    pub style_over: Option<T>,
    #[serde(default)]
    pub style_bad: Option<T>,
    #[serde(default)]
    pub cmap: Option<String>,
    #[serde(default)]
    pub cpt: Option<PathBuf>,
    #[serde(default)]
    pub vmin: Option<f64>,
    #[serde(default)]
    pub vmax: Option<f64>,
    #[serde(default)]
    pub log: bool,
    #[serde(default)]
    pub boundaries: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PointStyleDoc {
    pub shape: Option<ParamDoc<MarkerShape>>,
    pub size: Option<ParamDoc<f64>>,
    pub fill_color: Option<ParamDoc<Rgba>>,
    pub line_color: Option<ParamDoc<Rgba>>,
    pub line_width: Option<f64>,
    pub alpha: Option<f64>,
    pub label_style: Option<TextStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineStyleDoc {
    pub line_color: Option<ParamDoc<Rgba>>,
    pub line_width: Option<ParamDoc<f64>>,
    pub line_pattern: Option<ParamDoc<LineDash>>,
    pub alpha: Option<f64>,
    pub front: Option<FrontStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolygonStyleDoc {
    pub line_color: Option<ParamDoc<Rgba>>,
    pub line_width: Option<ParamDoc<f64>>,
    pub line_pattern: Option<LineDash>,
    pub fill_color: Option<ParamDoc<Rgba>>,
    pub alpha: Option<ParamDoc<f64>>,
    pub label_style: Option<TextStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FocmecStyleDoc {
    pub size: Option<ParamDoc<f64>>,
    pub line_width: Option<f64>,
    pub line_color: Option<ParamDoc<Rgba>>,
    pub fill_color: Option<ParamDoc<Rgba>>,
    pub bg_color: Option<Rgba>,
    pub alpha: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridStyleDoc {
    pub color: Option<ThemeDoc<Rgba>>,
    pub pixelated: Option<bool>,
    pub alpha: Option<f64>,
    pub contour_levels: Vec<f64>,
    pub contour_line: Option<ConcreteLineStyle>,
    pub contour_labels: bool,
    pub contour_label_style: Option<TextStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositeStyleDoc {
    pub point: PointStyleDoc,
    pub line: LineStyleDoc,
    pub polygon: PolygonStyleDoc,
    pub text: Option<TextStyle>,
}

impl MapDocument {
    /// Read a document from a JSON file; relative paths resolve against its directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut doc = Self::from_json_str(&content)?;
        doc.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(doc)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let doc: MapDocument = serde_json::from_str(s)?;
        if doc.width == 0 || doc.height == 0 {
            return Err(MapError::config("width and height must be positive"));
        }
        Ok(doc)
    }

    /// Build the layered map the document describes.
    pub fn into_map(self) -> Result<LayeredMap> {
        let base = self.base_dir;
        let mut map = LayeredMap::new()
            .with_projection(self.projection)
            .with_legend_style(self.legend)
            .with_border(self.border);
        if let Some([lon_min, lon_max, lat_min, lat_max]) = self.region {
            map = map.with_region(Region::new(lon_min, lon_max, lat_min, lat_max)?);
        }
        if let Some(title) = self.title {
            map = map.with_title(title);
        }
        if let Some(style) = self.title_style {
            map.title_style = style;
        }
        if let Some(g) = self.graticule {
            map = map.with_graticule(g);
        }
        if let Some(bg) = self.background {
            map = map.with_background(bg);
        }
        for (i, layer) in self.layers.into_iter().enumerate() {
            let built = layer
                .build(&base)
                .map_err(|e| MapError::config(format!("layer {i}: {e}")))?;
            map.push(built);
        }
        log::debug!("map document built with {} layers", map.layers.len());
        Ok(map)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn region_of(b: [f64; 4]) -> Result<Region> {
    Region::new(b[0], b[1], b[2], b[3])
}

impl LayerDoc {
    pub fn build(self, base: &Path) -> Result<MapLayer> {
        let kind = self.source.build(base)?;
        let mut layer = MapLayer::new(kind);
        if let Some(text) = self.legend_label {
            let group = self.legend_group.unwrap_or_else(|| MAIN_GROUP.to_string());
            layer = layer.with_legend(LegendLabel::in_group(group, text));
        }
        if let Some(name) = self.name {
            layer = layer.with_name(name);
        }
        Ok(layer)
    }
}

impl SourceDoc {
    fn build(self, base: &Path) -> Result<LayerKind> {
        Ok(match self {
            SourceDoc::Points { data, style } => LayerKind::Points {
                data: data.build(base)?,
                style: style.build(base)?,
            },
            SourceDoc::Lines { data, style } => LayerKind::Lines {
                data: data.lines()?,
                style: style.build(base)?,
            },
            SourceDoc::Polygons { data, style } => LayerKind::Polygons {
                data: data.polygons()?,
                style: style.build(base)?,
            },
            SourceDoc::Texts { texts, style } => LayerKind::Texts {
                data: texts
                    .into_iter()
                    .map(|t| {
                        let mut item = TextData::new(t.lon, t.lat, t.text);
                        item.style_params = t.style;
                        item
                    })
                    .collect::<MultiTextData>(),
                style,
            },
            SourceDoc::Grid { data, style } => LayerKind::Grid {
                data: data.build()?,
                style: style.build(base)?,
            },
            SourceDoc::Focmec { events, style } => LayerKind::Focmec {
                data: events
                    .into_iter()
                    .map(FocmecDoc::build)
                    .collect::<Result<MultiFocmecData>>()?,
                style: style.build(base)?,
            },
            SourceDoc::Composite { wkt, style } => LayerKind::Composite {
                data: CompositeData::from_wkt(&wkt)?,
                style: style.build(base)?,
            },
            SourceDoc::Gis { mut gis, style } => {
                gis.path = resolve(base, &gis.path);
                LayerKind::Gis {
                    data: gis,
                    style: style.build(base)?,
                }
            }
            SourceDoc::Image {
                path,
                bounds,
                alpha,
            } => LayerKind::Image {
                data: GeoImage::open(resolve(base, &path), region_of(bounds)?)?,
                alpha,
            },
            SourceDoc::Wms {
                url,
                request,
                alpha,
            } => LayerKind::Wms {
                client: WmsClient::new(url)?,
                request,
                alpha,
            },
        })
    }
}

fn coords_of(c: &[[f64; 2]]) -> Vec<(f64, f64)> {
    c.iter().map(|&[x, y]| (x, y)).collect()
}

impl FeatureDoc {
    fn point(self) -> Result<PointData> {
        let mut p = match (self.lon, self.lat, &self.wkt) {
            (Some(lon), Some(lat), None) => PointData::new(lon, lat),
            (None, None, Some(wkt)) => PointData::from_wkt(wkt)?,
            _ => {
                return Err(MapError::config("a point feature needs either lon/lat or wkt"));
            }
        };
        p.value = self.value;
        p.label = self.label;
        p.style_params = self.style;
        Ok(p)
    }

    fn line(self) -> Result<LineData> {
        let mut l = match (&self.coords, &self.wkt) {
            (Some(c), None) => LineData::new(coords_of(c))?,
            (None, Some(wkt)) => LineData::from_wkt(wkt)?,
            _ => return Err(MapError::config("a line feature needs either coords or wkt")),
        };
        l.value = self.value;
        l.label = self.label;
        l.style_params = self.style;
        Ok(l)
    }

    fn polygon(self) -> Result<PolygonData> {
        let mut p = match (&self.coords, &self.wkt) {
            (Some(c), None) => {
                PolygonData::new(coords_of(c), self.holes.iter().map(|h| coords_of(h)).collect())?
            }
            (None, Some(wkt)) => PolygonData::from_wkt(wkt)?,
            _ => return Err(MapError::config("a polygon feature needs either coords or wkt")),
        };
        p.value = self.value;
        p.label = self.label;
        p.style_params = self.style;
        Ok(p)
    }
}

impl PointsSource {
    fn build(self, base: &Path) -> Result<MultiPointData> {
        match self {
            PointsSource::Features(f) => f.into_iter().map(FeatureDoc::point).collect(),
            PointsSource::Wkt(s) => MultiPointData::from_wkt(&s),
            PointsSource::Csv(csv) => {
                let defaults = CsvColumns::default();
                let columns = CsvColumns {
                    lon: csv.lon.unwrap_or(defaults.lon),
                    lat: csv.lat.unwrap_or(defaults.lat),
                    label: csv.label,
                    values: csv.values,
                };
                MultiPointData::from_csv(resolve(base, &csv.path), &columns)
            }
        }
    }
}

impl GeometrySource {
    fn lines(self) -> Result<MultiLineData> {
        match self {
            GeometrySource::Features(f) => f.into_iter().map(FeatureDoc::line).collect(),
            GeometrySource::Wkt(s) => MultiLineData::from_wkt(&s),
        }
    }

    fn polygons(self) -> Result<MultiPolygonData> {
        match self {
            GeometrySource::Features(f) => f.into_iter().map(FeatureDoc::polygon).collect(),
            GeometrySource::Wkt(s) => MultiPolygonData::from_wkt(&s),
        }
    }
}

impl GridSource {
    fn build(self) -> Result<MeshGridData> {
        match self {
            GridSource::Mesh { lons, lats, values } => {
                let (rows, cols) = (values.len(), lons.len());
                if rows != lats.len() {
                    return Err(MapError::config(format!(
                        "grid has {rows} rows but {} latitudes",
                        lats.len()
                    )));
                }
                if let Some(bad) = values.iter().position(|r| r.len() != cols) {
                    return Err(MapError::config(format!(
                        "grid row {bad} has {} values, expected {cols}",
                        values[bad].len()
                    )));
                }
                let flat: Vec<f64> = values
                    .into_iter()
                    .flatten()
                    .map(|v| v.unwrap_or(f64::NAN))
                    .collect();
                let array = Array2::from_shape_vec((rows, cols), flat)
                    .map_err(|e| MapError::config(e.to_string()))?;
                MeshGridData::new(lons, lats, array)
            }
            GridSource::Scattered {
                lons,
                lats,
                values,
                nlon,
                nlat,
                gridding,
            } => UnstructuredGridData::new(lons, lats, values)?.to_mesh(nlon, nlat, gridding),
        }
    }
}

impl FocmecDoc {
    fn build(self) -> Result<FocmecData> {
        let mut f = FocmecData::new(self.lon, self.lat, self.strike, self.dip, self.rake)?;
        f.magnitude = self.magnitude;
        f.value = self.value;
        f.label = self.label;
        Ok(f)
    }
}

impl<T: StyleOutput> ThemeDoc<T> {
    fn mappable(&self, base: &Path) -> Result<ScalarMappable> {
        if let Some(cpt) = &self.cpt {
            let path = resolve(base, cpt);
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("cpt")
                .to_string();
            let mut sm = CptFile::load(&path)?.to_mappable(&name)?;
            if self.vmin.is_some() || self.vmax.is_some() {
                if let Some((lo, hi)) = sm.norm.limits() {
                    sm.norm = Norm::linear(self.vmin.unwrap_or(lo), self.vmax.unwrap_or(hi));
                }
            }
            return Ok(sm);
        }
        let cmap = Colormap::from_name(self.cmap.as_deref().unwrap_or("viridis"))?;
        let norm = match &self.boundaries {
            Some(b) => Norm::boundary(b.clone())?,
            None if self.log => Norm::Log {
                vmin: self.vmin,
                vmax: self.vmax,
            },
            None => Norm::Linear {
                vmin: self.vmin,
                vmax: self.vmax,
            },
        };
        Ok(ScalarMappable::new(norm, cmap))
    }

    pub fn build(self, base: &Path) -> Result<ThematicStyle<T>> {
        let mut theme = match self.kind {
            ThemeKind::Colormap => ThematicStyle::colormap(self.mappable(base)?)?,
            ThemeKind::Individual => ThematicStyle::individual(self.values, self.styles)?,
            ThemeKind::Ranges => ThematicStyle::ranges(self.breakpoints, self.styles)?,
            ThemeKind::Gradient => ThematicStyle::gradient(self.breakpoints, self.styles)?,
        };
        if let Some(key) = self.value_key {
            theme = theme.with_value_key(key);
        }
        theme = theme.with_labels(self.labels)?.with_legend(self.add_legend);
        if let Some(title) = self.legend_title {
            theme = theme.with_legend_title(title);
        }
        if let Some(cb) = self.colorbar {
            theme = theme.with_colorbar_style(cb);
        }
        if let Some(s) = self.style_under {
            theme = theme.with_under(s);
        }
        if let Some(s) = self.style_over {
            theme = theme.with_over(s);
        }
        if let Some(s) = self.style_bad {
            theme = theme.with_bad(s);
        }
        Ok(theme)
    }
}

impl<T: StyleOutput> ParamDoc<T> {
    pub fn build(self, base: &Path) -> Result<StyleParam<T>> {
        Ok(match self {
            ParamDoc::Fixed(v) => StyleParam::Fixed(v),
            ParamDoc::Thematic(t) => StyleParam::Thematic(t.build(base)?),
        })
    }
}

fn param<T: StyleOutput>(
    doc: Option<ParamDoc<T>>,
    base: &Path,
    slot: &mut StyleParam<T>,
) -> Result<()> {
    if let Some(d) = doc {
        *slot = d.build(base)?;
    }
    Ok(())
}

impl PointStyleDoc {
    pub fn build(self, base: &Path) -> Result<PointStyle> {
        let mut s = PointStyle::default();
        param(self.shape, base, &mut s.shape)?;
        param(self.size, base, &mut s.size)?;
        param(self.fill_color, base, &mut s.fill_color)?;
        param(self.line_color, base, &mut s.line_color)?;
        if let Some(w) = self.line_width {
            s.line_width = w;
        }
        if let Some(a) = self.alpha {
            s.alpha = a;
        }
        s.label_style = self.label_style;
        s.validate()?;
        Ok(s)
    }
}

impl LineStyleDoc {
    pub fn build(self, base: &Path) -> Result<LineStyle> {
        let mut s = LineStyle::default();
        param(self.line_color, base, &mut s.line_color)?;
        param(self.line_width, base, &mut s.line_width)?;
        param(self.line_pattern, base, &mut s.line_pattern)?;
        if let Some(a) = self.alpha {
            s.alpha = a;
        }
        s.front = self.front;
        s.validate()?;
        Ok(s)
    }
}

impl PolygonStyleDoc {
    pub fn build(self, base: &Path) -> Result<PolygonStyle> {
        let mut s = PolygonStyle::default();
        param(self.line_color, base, &mut s.line_color)?;
        param(self.line_width, base, &mut s.line_width)?;
        param(self.fill_color, base, &mut s.fill_color)?;
        param(self.alpha, base, &mut s.alpha)?;
        if let Some(p) = self.line_pattern {
            s.line_pattern = p;
        }
        s.label_style = self.label_style;
        s.validate()?;
        Ok(s)
    }
}

impl FocmecStyleDoc {
    pub fn build(self, base: &Path) -> Result<FocmecStyle> {
        let mut s = FocmecStyle::default();
        param(self.size, base, &mut s.size)?;
        param(self.line_color, base, &mut s.line_color)?;
        param(self.fill_color, base, &mut s.fill_color)?;
        if let Some(w) = self.line_width {
            s.line_width = w;
        }
        if let Some(c) = self.bg_color {
            s.bg_color = c;
        }
        if let Some(a) = self.alpha {
            s.alpha = a;
        }
        s.validate()?;
        Ok(s)
    }
}

impl GridStyleDoc {
    pub fn build(self, base: &Path) -> Result<GridStyle> {
        let mut s = GridStyle::default();
        if let Some(theme) = self.color {
            s = s.with_color(theme.build(base)?);
        }
        if let Some(p) = self.pixelated {
            s.pixelated = p;
        }
        if let Some(a) = self.alpha {
            s.alpha = a;
        }
        s.contour_levels = self.contour_levels;
        if let Some(line) = self.contour_line {
            s.contour_line = line;
        }
        s.contour_labels = self.contour_labels;
        if let Some(ts) = self.contour_label_style {
            s.contour_label_style = ts;
        }
        Ok(s)
    }
}

impl CompositeStyleDoc {
    pub fn build(self, base: &Path) -> Result<CompositeStyle> {
        Ok(CompositeStyle {
            point: self.point.build(base)?,
            line: self.line.build(base)?,
            polygon: self.polygon.build(base)?,
            text: self.text.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thematic::ThemeClass;

    #[test]
    fn fixed_and_thematic_params() {
        let doc: PointStyleDoc = serde_json::from_str(
            r#"{
                "fill_color": {"type": "ranges", "breakpoints": [0, 1, 10], "styles": ["red", "blue"]},
                "size": 8,
                "shape": "s"
            }"#,
        )
        .unwrap();
        let style = doc.build(Path::new(".")).unwrap();
        assert_eq!(style.size, StyleParam::Fixed(8.0));
        assert_eq!(style.shape, StyleParam::Fixed(MarkerShape::Square));
        let theme = style.fill_color.theme().unwrap();
        let (class, color) = theme.resolve(Some(&Datum::Number(5.0))).unwrap();
        assert_eq!(class, ThemeClass::Index(1));
        assert_eq!(color, Rgba::parse("blue").unwrap());
    }

    #[test]
    fn document_builds_layers_in_order() {
        let doc = MapDocument::from_json_str(
            r#"{
                "region": [2, 7, 49, 52],
                "title": "Belgium",
                "layers": [
                    {"kind": "polygons", "data": {"wkt": "POLYGON((3 50, 6 50, 6 51, 3 51, 3 50))"}},
                    {"kind": "points", "legend_label": "Plants",
                     "data": {"features": [{"lon": 4.26, "lat": 51.32, "label": "Doel"}]}},
                    {"kind": "texts", "texts": [{"lon": 4.35, "lat": 50.85, "text": "Brussels"}]}
                ]
            }"#,
        )
        .unwrap();
        let map = doc.into_map().unwrap();
        let kinds: Vec<&str> = map.layers.iter().map(|l| l.kind.kind_name()).collect();
        assert_eq!(kinds, vec!["polygons", "points", "texts"]);
        assert_eq!(map.layers[1].legend_label.visible_text(), Some("Plants"));
        assert_eq!(map.title.as_deref(), Some("Belgium"));
    }

    #[test]
    fn ragged_grid_rows_are_rejected() {
        let src: GridSource = serde_json::from_str(
            r#"{"mesh": {"lons": [0, 1], "lats": [0, 1], "values": [[1, 2], [3]]}}"#,
        )
        .unwrap();
        assert!(src.build().is_err());
    }

    #[test]
    fn null_grid_values_become_nan() {
        let src: GridSource = serde_json::from_str(
            r#"{"mesh": {"lons": [0, 1], "lats": [0, 1], "values": [[1, null], [3, 4]]}}"#,
        )
        .unwrap();
        let grid = src.build().unwrap();
        assert!(grid.values()[[0, 1]].is_nan());
        assert_eq!(grid.values()[[1, 0]], 3.0);
    }

    #[test]
    fn colormap_rejected_for_sizes() {
        let doc: PointStyleDoc =
            serde_json::from_str(r#"{"size": {"type": "colormap", "cmap": "viridis"}}"#).unwrap();
        assert!(doc.build(Path::new(".")).is_err());
    }

    #[test]
    fn unknown_fields_fail() {
        assert!(MapDocument::from_json_str(r#"{"regoin": [0, 1, 0, 1]}"#).is_err());
    }
}
