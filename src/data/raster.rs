//! Georeferenced RGBA images.

use crate::error::{MapError, Result};
use crate::projection::Region;
use image::RgbaImage;
use std::path::Path;

/// An image stretched over a lon/lat extent.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoImage {
    pub pixels: RgbaImage,
    pub bounds: Region,
}

impl GeoImage {
    pub fn new(pixels: RgbaImage, bounds: Region) -> Result<Self> {
        bounds.validate()?;
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(MapError::config("image has no pixels"));
        }
        Ok(Self { pixels, bounds })
    }

    /// Decode a PNG or JPEG file.
    pub fn open<P: AsRef<Path>>(path: P, bounds: Region) -> Result<Self> {
        Self::new(image::open(path)?.to_rgba8(), bounds)
    }

    /// Decode an in-memory PNG or JPEG.
    pub fn from_bytes(bytes: &[u8], bounds: Region) -> Result<Self> {
        Self::new(image::load_from_memory(bytes)?.to_rgba8(), bounds)
    }

    /// Pixel covering a lon/lat in the image's linear lon/lat grid.
    pub fn pixel_at(&self, lon: f64, lat: f64) -> Option<&image::Rgba<u8>> {
        if !self.bounds.contains(lon, lat) {
            return None;
        }
        let b = &self.bounds;
        let fx = (lon - b.lon_min) / (b.lon_max - b.lon_min);
        let fy = (b.lat_max - lat) / (b.lat_max - b.lat_min);
        let x = ((fx * self.pixels.width() as f64) as u32).min(self.pixels.width() - 1);
        let y = ((fy * self.pixels.height() as f64) as u32).min(self.pixels.height() - 1);
        Some(self.pixels.get_pixel(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_lookup_is_north_up() {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        let geo = GeoImage::new(img, Region::new(0.0, 2.0, 0.0, 2.0).unwrap()).unwrap();
        assert_eq!(geo.pixel_at(0.5, 1.5).unwrap().0, [255, 0, 0, 255]);
        assert_eq!(geo.pixel_at(0.5, 0.5).unwrap().0, [0, 0, 0, 0]);
        assert!(geo.pixel_at(3.0, 0.5).is_none());
    }
}
