//! Unit and number formatting utilities
//!
//! Handles the machine units of a job (mm or inch) and the fixed-precision
//! number formatting used when writing G-code words.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Machine units of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Millimeters (G21)
    #[default]
    Mm,
    /// Inches (G20)
    In,
}

impl Units {
    /// G-code word selecting these units
    pub fn gcode(&self) -> &'static str {
        match self {
            Self::Mm => "G21",
            Self::In => "G20",
        }
    }

    /// Short label ("mm" or "in")
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mm => "mm",
            Self::In => "in",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mm" | "metric" => Ok(Self::Mm),
            "in" | "inch" | "imperial" => Ok(Self::In),
            _ => Err(format!("Unknown units: {}", s)),
        }
    }
}

/// Format a number with a fixed number of decimals
///
/// Values that round to zero are written without a sign so that the same
/// motion always produces the same text.
pub fn format_number(value: f64, decimals: usize) -> String {
    let text = format!("{:.*}", decimals, value);
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_gcode() {
        assert_eq!(Units::Mm.gcode(), "G21");
        assert_eq!(Units::In.gcode(), "G20");
    }

    #[test]
    fn test_units_parse() {
        assert_eq!("mm".parse::<Units>().unwrap(), Units::Mm);
        assert_eq!(" Inch ".parse::<Units>().unwrap(), Units::In);
        assert!("furlong".parse::<Units>().is_err());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1.23456, 4), "1.2346");
        assert_eq!(format_number(-0.5, 2), "-0.50");
        assert_eq!(format_number(-0.00001, 4), "0.0000");
        assert_eq!(format_number(120.0, 0), "120");
        assert_eq!(format_number(-0.0, 0), "0");
    }
}
