//! Angular quantities used to size a cutout

use std::{fmt, str::FromStr};

use regex::Regex;
use std::sync::LazyLock;

use crate::coords::ParseError;

static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*([a-zA-Z\x22']*)\s*$")
        .expect("valid quantity regex")
});

/// Angle units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnit {
    Degree,
    #[default]
    ArcMinute,
    ArcSecond,
}
impl AngleUnit {
    /// Number of degrees in one unit
    pub fn in_degrees(self) -> f64 {
        match self {
            AngleUnit::Degree => 1f64,
            AngleUnit::ArcMinute => 1f64 / 60f64,
            AngleUnit::ArcSecond => 1f64 / 3600f64,
        }
    }
}
impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AngleUnit::Degree => write!(f, "deg"),
            AngleUnit::ArcMinute => write!(f, "arcmin"),
            AngleUnit::ArcSecond => write!(f, "arcsec"),
        }
    }
}
impl FromStr for AngleUnit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "d" | "deg" | "degree" | "degrees" => Ok(AngleUnit::Degree),
            "'" | "m" | "arcmin" | "arcminute" | "arcminutes" => Ok(AngleUnit::ArcMinute),
            "\"" | "s" | "arcsec" | "arcsecond" | "arcseconds" => Ok(AngleUnit::ArcSecond),
            _ => Err(ParseError::Unit(s.to_string())),
        }
    }
}

/// An angular extent: value and unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngularSize {
    pub value: f64,
    pub unit: AngleUnit,
}
impl AngularSize {
    pub fn new(value: f64, unit: AngleUnit) -> Self {
        Self { value, unit }
    }
    pub fn arcmin(value: f64) -> Self {
        Self::new(value, AngleUnit::ArcMinute)
    }
    pub fn arcsec(value: f64) -> Self {
        Self::new(value, AngleUnit::ArcSecond)
    }
    pub fn degrees(value: f64) -> Self {
        Self::new(value, AngleUnit::Degree)
    }
    /// The extent in degrees
    pub fn to_degrees(&self) -> f64 {
        self.value * self.unit.in_degrees()
    }
}
impl fmt::Display for AngularSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}
/// Parses `5`, `5arcmin`, `30"`, `0.1deg`; bare numbers are arc-minutes
impl FromStr for AngularSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = QUANTITY
            .captures(s)
            .ok_or_else(|| ParseError::Quantity(s.to_string()))?;
        let value: f64 = caps[1]
            .parse()
            .map_err(|_| ParseError::Quantity(s.to_string()))?;
        let unit = match &caps[2] {
            "" => AngleUnit::default(),
            unit => unit.parse()?,
        };
        Ok(Self { value, unit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_number_is_arcmin() {
        let size: AngularSize = "5".parse().unwrap();
        assert_eq!(size, AngularSize::arcmin(5.));
        assert!((size.to_degrees() - 5. / 60.).abs() < 1e-15);
    }

    #[test]
    fn explicit_units() {
        assert_eq!(
            "30arcsec".parse::<AngularSize>().unwrap(),
            AngularSize::arcsec(30.)
        );
        assert_eq!(
            "0.25 deg".parse::<AngularSize>().unwrap(),
            AngularSize::degrees(0.25)
        );
        assert_eq!(
            "2'".parse::<AngularSize>().unwrap(),
            AngularSize::arcmin(2.)
        );
    }

    #[test]
    fn bad_quantity() {
        assert!("five".parse::<AngularSize>().is_err());
        assert!(matches!(
            "5 parsec".parse::<AngularSize>(),
            Err(ParseError::Unit(_))
        ));
    }
}
