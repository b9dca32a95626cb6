//! Blocking client for OGC **Web Map Service** `GetMap` requests.
//!
//! The map extent and pixel size come from the map being rendered; the response image is
//! decoded into a [`GeoImage`] covering that extent. Server errors (HTTP 5xx, transport
//! failures) are retried briefly; anything else fails fast. Callers rendering a map skip
//! the layer on failure.
//!
//! ```no_run
//! # use mapcompose::wms::{WmsClient, WmsRequest};
//! # use mapcompose::projection::{Projection, Region};
//! let client = WmsClient::new("https://ows.terrestris.de/osm/service")?;
//! let req = WmsRequest::new(["OSM-WMS"]);
//! let region = Region::new(0.0, 8.0, 49.0, 52.0)?;
//! let img = client.get_map(&req, &region, Projection::PlateCarree, (800, 300))?;
//! # Ok::<(), mapcompose::MapError>(())
//! ```

use crate::data::GeoImage;
use crate::error::{MapError, Result};
use crate::projection::{Projection, Region};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Allow -, _, ., : unescaped (layer names and CRS codes)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b':');

fn enc_join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(|s| percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Layers and rendering options of one `GetMap` request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WmsRequest {
    pub layers: Vec<String>,
    pub styles: Vec<String>,
    /// `image/png` or `image/jpeg`.
    pub format: String,
    pub transparent: bool,
    pub version: String,
}

impl Default for WmsRequest {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            styles: Vec::new(),
            format: "image/png".into(),
            transparent: true,
            version: "1.3.0".into(),
        }
    }
}

impl WmsRequest {
    pub fn new<I, S>(layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            layers: layers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct WmsClient {
    pub base_url: String,
    http: HttpClient,
}

impl WmsClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(5))
            .user_agent(concat!("mapcompose/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// `GetMap` URL for a region and pixel size.
    pub fn get_map_url(
        &self,
        req: &WmsRequest,
        region: &Region,
        projection: Projection,
        size: (u32, u32),
    ) -> Result<String> {
        if req.layers.is_empty() {
            return Err(MapError::config("WMS request needs at least one layer"));
        }
        let (crs, bbox) = match projection {
            // WMS 1.3.0 uses lat/lon axis order for EPSG:4326
            Projection::PlateCarree if req.version == "1.3.0" => (
                "EPSG:4326",
                [region.lat_min, region.lon_min, region.lat_max, region.lon_max],
            ),
            Projection::PlateCarree => (
                "EPSG:4326",
                [region.lon_min, region.lat_min, region.lon_max, region.lat_max],
            ),
            Projection::Mercator => {
                const R: f64 = 6_378_137.0;
                let (x0, y0) = projection.forward(region.lon_min, region.lat_min);
                let (x1, y1) = projection.forward(region.lon_max, region.lat_max);
                ("EPSG:3857", [x0 * R, y0 * R, x1 * R, y1 * R])
            }
        };
        let crs_key = if req.version == "1.3.0" { "CRS" } else { "SRS" };
        let sep = if self.base_url.contains('?') { '&' } else { '?' };
        Ok(format!(
            "{}{sep}SERVICE=WMS&VERSION={}&REQUEST=GetMap&LAYERS={}&STYLES={}&{crs_key}={crs}\
             &BBOX={},{},{},{}&WIDTH={}&HEIGHT={}&FORMAT={}&TRANSPARENT={}",
            self.base_url,
            req.version,
            enc_join(req.layers.iter().map(|s| s.as_str())),
            enc_join(req.styles.iter().map(|s| s.as_str())),
            bbox[0],
            bbox[1],
            bbox[2],
            bbox[3],
            size.0,
            size.1,
            percent_encoding::utf8_percent_encode(&req.format, SAFE),
            if req.transparent { "TRUE" } else { "FALSE" },
        ))
    }

    /// Fetch and decode the map image covering `region`.
    pub fn get_map(
        &self,
        req: &WmsRequest,
        region: &Region,
        projection: Projection,
        size: (u32, u32),
    ) -> Result<GeoImage> {
        let url = self.get_map_url(req, region, projection, size)?;
        log::debug!("GET {url}");

        // Small retry for transient failures (5xx / network errors)
        let mut last_err: Option<String> = None;
        for backoff_ms in [100u64, 300, 700] {
            match self.http.get(&url).send() {
                Ok(r) if r.status().is_success() => {
                    let content_type = r
                        .headers()
                        .get(reqwest::header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    let bytes = r.bytes()?;
                    if !content_type.starts_with("image/") {
                        // service exceptions come back as XML with HTTP 200
                        let body = String::from_utf8_lossy(&bytes);
                        return Err(MapError::Unavailable {
                            message: format!(
                                "WMS returned {content_type}: {}",
                                body.chars().take(200).collect::<String>()
                            ),
                        });
                    }
                    return GeoImage::from_bytes(&bytes, *region);
                }
                Ok(r) if r.status().is_server_error() => {
                    last_err = Some(format!("HTTP {}", r.status()));
                }
                Ok(r) => {
                    return Err(MapError::Unavailable {
                        message: format!("WMS request failed with HTTP {}", r.status()),
                    });
                }
                Err(e) => last_err = Some(e.to_string()),
            }
            std::thread::sleep(Duration::from_millis(backoff_ms));
        }
        Err(MapError::Unavailable {
            message: format!(
                "WMS {} unreachable: {}",
                self.base_url,
                last_err.unwrap_or_default()
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_uses_lat_lon_order_for_130() {
        let client = WmsClient::new("https://example.org/wms").unwrap();
        let region = Region::new(0.0, 8.0, 49.0, 52.0).unwrap();
        let url = client
            .get_map_url(
                &WmsRequest::new(["base map"]),
                &region,
                Projection::PlateCarree,
                (800, 300),
            )
            .unwrap();
        assert!(url.starts_with("https://example.org/wms?SERVICE=WMS"));
        assert!(url.contains("LAYERS=base%20map"));
        assert!(url.contains("CRS=EPSG:4326&BBOX=49,0,52,8"));
        assert!(url.contains("WIDTH=800&HEIGHT=300"));
    }

    #[test]
    fn empty_layers_rejected() {
        let client = WmsClient::new("https://example.org/wms?map=x").unwrap();
        let region = Region::new(0.0, 1.0, 0.0, 1.0).unwrap();
        let err = client
            .get_map_url(&WmsRequest::default(), &region, Projection::Mercator, (10, 10))
            .unwrap_err();
        assert!(matches!(err, MapError::Config { .. }));
    }

    #[test]
    fn unreachable_server_is_unavailable() {
        let client = WmsClient::new("http://127.0.0.1:9/wms").unwrap();
        let region = Region::new(0.0, 1.0, 0.0, 1.0).unwrap();
        let err = client
            .get_map(&WmsRequest::new(["x"]), &region, Projection::PlateCarree, (10, 10))
            .unwrap_err();
        assert!(matches!(err, MapError::Unavailable { .. }));
    }
}
