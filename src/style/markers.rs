//! Marker shapes and line patterns.
//!
//! Both parse the short matplotlib-style codes as well as long names:
//! markers `o s ^ v D d + x * .`, patterns `-`/`solid`, `--`/`dashed`, `:`/`dotted`,
//! `-.`/`dashdot`.

use crate::error::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MarkerShape {
    Circle,
    Square,
    Triangle,
    TriangleDown,
    Diamond,
    Cross,
    X,
    Star,
    Dot,
}

impl MarkerShape {
    pub fn code(&self) -> &'static str {
        match self {
            MarkerShape::Circle => "o",
            MarkerShape::Square => "s",
            MarkerShape::Triangle => "^",
            MarkerShape::TriangleDown => "v",
            MarkerShape::Diamond => "D",
            MarkerShape::Cross => "+",
            MarkerShape::X => "x",
            MarkerShape::Star => "*",
            MarkerShape::Dot => ".",
        }
    }

    /// Shapes drawn with strokes only; their color comes from the line color.
    pub fn is_stroked(&self) -> bool {
        matches!(self, MarkerShape::Cross | MarkerShape::X)
    }
}

impl FromStr for MarkerShape {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        let shape = match t {
            "o" => MarkerShape::Circle,
            "s" => MarkerShape::Square,
            "^" => MarkerShape::Triangle,
            "v" => MarkerShape::TriangleDown,
            "D" | "d" => MarkerShape::Diamond,
            "+" => MarkerShape::Cross,
            "x" => MarkerShape::X,
            "*" => MarkerShape::Star,
            "." => MarkerShape::Dot,
            _ => match t.to_ascii_lowercase().as_str() {
                "circle" => MarkerShape::Circle,
                "square" => MarkerShape::Square,
                "triangle" | "triangle_up" => MarkerShape::Triangle,
                "triangle_down" => MarkerShape::TriangleDown,
                "diamond" => MarkerShape::Diamond,
                "cross" | "plus" => MarkerShape::Cross,
                "star" => MarkerShape::Star,
                "dot" | "point" => MarkerShape::Dot,
                _ => return Err(MapError::config(format!("unknown marker shape: {s:?}"))),
            },
        };
        Ok(shape)
    }
}

impl TryFrom<String> for MarkerShape {
    type Error = MapError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<MarkerShape> for String {
    fn from(m: MarkerShape) -> String {
        m.code().to_string()
    }
}

impl fmt::Display for MarkerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LineDash {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
}

impl LineDash {
    pub fn code(&self) -> &'static str {
        match self {
            LineDash::Solid => "-",
            LineDash::Dash => "--",
            LineDash::Dot => ":",
            LineDash::DashDot => "-.",
        }
    }

    /// On/off lengths in units of line width; `None` for solid lines.
    pub fn pattern(&self) -> Option<&'static [f64]> {
        match self {
            LineDash::Solid => None,
            LineDash::Dash => Some(&[3.7, 1.6]),
            LineDash::Dot => Some(&[1.0, 1.65]),
            LineDash::DashDot => Some(&[6.4, 1.6, 1.0, 1.6]),
        }
    }
}

impl FromStr for LineDash {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "-" | "solid" => LineDash::Solid,
            "--" | "dashed" | "dash" => LineDash::Dash,
            ":" | "dotted" | "dot" => LineDash::Dot,
            "-." | "dashdot" | "dash_dot" => LineDash::DashDot,
            _ => return Err(MapError::config(format!("unknown line pattern: {s:?}"))),
        })
    }
}

impl TryFrom<String> for LineDash {
    type Error = MapError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<LineDash> for String {
    fn from(d: LineDash) -> String {
        d.code().to_string()
    }
}

impl fmt::Display for LineDash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_codes() {
        assert_eq!("o".parse::<MarkerShape>().unwrap(), MarkerShape::Circle);
        assert_eq!("d".parse::<MarkerShape>().unwrap(), MarkerShape::Diamond);
        assert_eq!("Square".parse::<MarkerShape>().unwrap(), MarkerShape::Square);
        assert!("?".parse::<MarkerShape>().is_err());
    }

    #[test]
    fn dash_codes() {
        assert_eq!("--".parse::<LineDash>().unwrap(), LineDash::Dash);
        assert_eq!("dotted".parse::<LineDash>().unwrap(), LineDash::Dot);
        assert!(LineDash::Solid.pattern().is_none());
    }
}
