//! mapcompose
//!
//! A Rust library for composing layered thematic maps: geometry and raster layers whose
//! colors, sizes, shapes and patterns are driven by data, with legends and colorbars
//! synthesized from the same rules. Pairs with the `mapc` CLI.
//!
//! ### Features
//! - Thematic styles: individual values, ranges, gradients and colormaps (incl. GMT CPT files)
//! - Points, lines (with weather-front decoration), polygons, texts, grids with contours,
//!   focal-mechanism beachballs, georeferenced images and WMS layers
//! - GeoJSON input through a GIS adapter, WKT round-trip, CSV point import
//! - Render to SVG or PNG with legend panels, colorbars, graticule and title
//!
//! ### Example
//! ```no_run
//! use mapcompose::{LayeredMap, MapLayer, Region, ThematicStyle};
//! use mapcompose::data::{MultiPointData, PointData};
//! use mapcompose::style::PointStyle;
//! use mapcompose::color::Rgba;
//!
//! let points: MultiPointData = [(4.26, 51.32, 3.0), (5.27, 50.53, 7.0)]
//!     .into_iter()
//!     .map(|(lon, lat, v)| PointData::new(lon, lat).with_value(v))
//!     .collect();
//! let colors = ThematicStyle::ranges(
//!     vec![0.0, 5.0, 10.0],
//!     vec![Rgba::parse("orange")?, Rgba::parse("red")?],
//! )?
//! .with_legend(true);
//! let map = LayeredMap::new()
//!     .with_region(Region::new(2.0, 7.0, 49.0, 52.0)?)
//!     .with_title("Reactors")
//!     .with_layer(MapLayer::points(points, PointStyle::new().with_fill_color(colors)));
//! map.plot("reactors.svg", 900, 700)?;
//! # Ok::<(), mapcompose::MapError>(())
//! ```

pub mod color;
pub mod colormap;
pub mod config;
pub mod cpt;
pub mod data;
pub mod error;
pub mod gis;
pub mod legend;
pub mod map;
pub mod projection;
pub mod render;
pub mod style;
pub mod thematic;
pub mod viz;
pub mod wms;

pub use color::Rgba;
pub use config::MapDocument;
pub use error::{MapError, Result};
pub use legend::{LegendAccumulator, LegendLabel};
pub use map::{LayerKind, LayeredMap, MapLayer, RenderSummary};
pub use projection::{Projection, Region};
pub use render::{Canvas, RecordingCanvas};
pub use thematic::ThematicStyle;
