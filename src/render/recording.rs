//! A canvas that records draw calls instead of drawing.

use super::Canvas;
use crate::color::Rgba;
use crate::data::{Beachball, GeoImage, MeshGridData, PolygonData};
use crate::error::Result;
use crate::legend::{ColorbarSpec, LegendGroup};
use crate::style::{
    ConcreteFocmecStyle, ConcreteLineStyle, ConcretePointStyle, ConcretePolygonStyle,
    ConcreteStyle, FrontStyle, Kwargs, LegendStyle, ParamValue, TextStyle,
};
use ndarray::Array2;

/// One recorded primitive call.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub op: &'static str,
    pub zorder: u32,
    /// Number of features (markers, lines, polygons, cells) in the call.
    pub features: usize,
    /// Style arguments; one entry for a uniform call, otherwise one per feature.
    pub kwargs: Vec<Kwargs>,
    pub text: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct RecordingCanvas {
    size: (u32, u32),
    pub calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            calls: Vec::new(),
        }
    }

    /// Number of calls of one kind.
    pub fn count(&self, op: &str) -> usize {
        self.calls.iter().filter(|c| c.op == op).count()
    }

    pub fn calls_of<'a>(&'a self, op: &'a str) -> impl Iterator<Item = &'a DrawCall> + 'a {
        self.calls.iter().filter(move |c| c.op == op)
    }

    fn record(
        &mut self,
        op: &'static str,
        zorder: u32,
        features: usize,
        kwargs: Vec<Kwargs>,
        text: Option<String>,
    ) {
        log::trace!("{op} z={zorder} n={features}");
        self.calls.push(DrawCall {
            op,
            zorder,
            features,
            kwargs,
            text,
        });
    }
}

fn all_kwargs<S: ConcreteStyle>(styles: &[S]) -> Vec<Kwargs> {
    styles.iter().map(|s| s.to_kwargs()).collect()
}

impl Canvas for RecordingCanvas {
    fn map_size_px(&self) -> (u32, u32) {
        self.size
    }

    fn background(&mut self, color: Rgba) -> Result<()> {
        let kw = Kwargs::from([("color".to_string(), ParamValue::Color(color))]);
        self.record("background", 0, 0, vec![kw], None);
        Ok(())
    }

    fn scatter(
        &mut self,
        coords: &[(f64, f64)],
        styles: &[ConcretePointStyle],
        zorder: u32,
    ) -> Result<()> {
        self.record("scatter", zorder, coords.len(), all_kwargs(styles), None);
        Ok(())
    }

    fn polylines(
        &mut self,
        lines: &[&[(f64, f64)]],
        styles: &[ConcreteLineStyle],
        front: Option<&FrontStyle>,
        zorder: u32,
    ) -> Result<()> {
        let mut kwargs = all_kwargs(styles);
        if let Some(front) = front {
            for kw in &mut kwargs {
                kw.insert(
                    "front".to_string(),
                    ParamValue::Text(format!("{:?}", front.symbol).to_lowercase()),
                );
            }
        }
        self.record("polylines", zorder, lines.len(), kwargs, None);
        Ok(())
    }

    fn polygons(
        &mut self,
        polygons: &[&PolygonData],
        styles: &[ConcretePolygonStyle],
        zorder: u32,
    ) -> Result<()> {
        self.record("polygons", zorder, polygons.len(), all_kwargs(styles), None);
        Ok(())
    }

    fn text(&mut self, _lon: f64, _lat: f64, text: &str, style: &TextStyle, zorder: u32) -> Result<()> {
        self.record("text", zorder, 1, vec![style.to_kwargs()], Some(text.to_string()));
        Ok(())
    }

    fn mesh(&mut self, grid: &MeshGridData, _colors: &Array2<Rgba>, zorder: u32) -> Result<()> {
        self.record("mesh", zorder, grid.values().len(), Vec::new(), None);
        Ok(())
    }

    fn beachball(
        &mut self,
        _lon: f64,
        _lat: f64,
        _ball: &Beachball,
        style: &ConcreteFocmecStyle,
        zorder: u32,
    ) -> Result<()> {
        self.record("beachball", zorder, 1, vec![style.to_kwargs()], None);
        Ok(())
    }

    fn image(&mut self, image: &GeoImage, alpha: f64, zorder: u32) -> Result<()> {
        let kw = Kwargs::from([("alpha".to_string(), ParamValue::Number(alpha))]);
        let n = (image.pixels.width() * image.pixels.height()) as usize;
        self.record("image", zorder, n, vec![kw], None);
        Ok(())
    }

    fn border(&mut self, style: &ConcreteLineStyle, zorder: u32) -> Result<()> {
        self.record("border", zorder, 1, vec![style.to_kwargs()], None);
        Ok(())
    }

    fn legend(&mut self, group: &LegendGroup, _style: &LegendStyle, _slot: usize) -> Result<()> {
        self.record("legend", u32::MAX, group.entries.len(), Vec::new(), group.title.clone());
        Ok(())
    }

    fn colorbar(&mut self, spec: &ColorbarSpec, _slot: usize) -> Result<()> {
        self.record("colorbar", u32::MAX, spec.ticks.len(), Vec::new(), spec.style.label.clone());
        Ok(())
    }

    fn title(&mut self, text: &str, style: &TextStyle) -> Result<()> {
        self.record("title", u32::MAX, 1, vec![style.to_kwargs()], Some(text.to_string()));
        Ok(())
    }
}
