//! Error types for map composition.
//!
//! Configuration problems (mismatched breakpoints, conflicting thematic attributes,
//! malformed geometry) surface at construction time; classification misses surface
//! when a layer is rendered. Nothing here is retried.

use thiserror::Error;

/// The main error type for mapcompose operations.
#[derive(Error, Debug)]
pub enum MapError {
    /// Invalid style, data or document configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Geometry that cannot be represented (too few vertices, wrong kind)
    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// A value with no entry in an individual lookup table
    #[error("Value {value} is not mapped by the thematic style")]
    UnmappedValue { value: String },

    /// A value that cannot be placed in any class (e.g. NaN without a bad-value style)
    #[error("Unclassified value: {message}")]
    Unclassified { message: String },

    /// A thematic style needs a named value that the feature does not carry
    #[error("Missing value key: {key}")]
    MissingValueKey { key: String },

    /// WKT parsing/conversion errors
    #[error("WKT error: {0}")]
    Wkt(String),

    /// Malformed color palette table
    #[error("CPT error on line {line}: {message}")]
    Cpt { line: usize, message: String },

    /// Drawing backend failures
    #[error("Backend error: {0}")]
    Backend(String),

    /// Remote resource could not be obtained
    #[error("Unavailable: {message}")]
    Unavailable { message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// GeoJSON decoding errors
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Image decoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl MapError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        MapError::Config {
            message: message.into(),
        }
    }

    /// Shorthand for an invalid-geometry error.
    pub fn geometry(message: impl Into<String>) -> Self {
        MapError::InvalidGeometry {
            message: message.into(),
        }
    }

    /// Wrap a plotters drawing error.
    pub fn backend<E: std::fmt::Debug>(e: E) -> Self {
        MapError::Backend(format!("{:?}", e))
    }
}

/// Convenience type alias for Results with MapError
pub type Result<T> = std::result::Result<T, MapError>;
