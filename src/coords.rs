//! Celestial and pixel positions
//!
//! Sky positions are parsed from the usual sexagesimal or decimal notations
//! (`00h42m44.3s +41d16m09s`, `00:42:44.3 +41:16:09`, `10.6846 41.2692`)
//! into a [SkyCoord] in a named reference [Frame].

use std::{fmt, str::FromStr, sync::LazyLock};

use nalgebra::Vector3;
use regex::Regex;
use ::wcs::{LonLat, WCSParams, WCS};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("expected two coordinate components, found {0} in {1:?}")]
    Components(usize, String),
    #[error("invalid angle {0:?}")]
    Angle(String),
    #[error("hour angle units are not allowed for latitude {0:?}")]
    HourLatitude(String),
    #[error("{0} field out of range in {1:?}")]
    Field(&'static str, String),
    #[error("latitude {0}deg is outside [-90, 90]")]
    Latitude(f64),
    #[error("invalid pixel coordinate pair {0:?}")]
    PixelPair(String),
    #[error("unknown reference frame {0:?}")]
    Frame(String),
    #[error("invalid angular quantity {0:?}")]
    Quantity(String),
    #[error("unknown angle unit {0:?}")]
    Unit(String),
}
type Result<T> = std::result::Result<T, ParseError>;

static HMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?)(\d+(?:\.\d*)?)h(?:(\d+(?:\.\d*)?)m(?:(\d+(?:\.\d*)?)s)?)?$")
        .expect("valid hms regex")
});
static DMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?)(\d+(?:\.\d*)?)d(?:(\d+(?:\.\d*)?)m(?:(\d+(?:\.\d*)?)s)?)?$")
        .expect("valid dms regex")
});
static COLON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?)(\d+):(\d+(?:\.\d*)?)(?::(\d+(?:\.\d*)?))?$").expect("valid colon regex")
});
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)(?:d|deg)?$")
        .expect("valid decimal regex")
});

/// Celestial reference frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frame {
    #[default]
    Icrs,
    /// FK5 at J2000, taken as coincident with ICRS
    Fk5,
    Galactic,
}
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Icrs => write!(f, "icrs"),
            Frame::Fk5 => write!(f, "fk5"),
            Frame::Galactic => write!(f, "galactic"),
        }
    }
}
impl FromStr for Frame {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "icrs" => Ok(Frame::Icrs),
            "fk5" => Ok(Frame::Fk5),
            "galactic" | "gal" => Ok(Frame::Galactic),
            _ => Err(ParseError::Frame(s.to_string())),
        }
    }
}

/// One pixel galactic image whose coordinate system rotates ICRS positions
static GALACTIC: LazyLock<WCS> = LazyLock::new(|| {
    WCS::new(&WCSParams {
        naxis: 2,
        naxis1: Some(1),
        naxis2: Some(1),
        ctype1: "GLON-TAN".to_string(),
        ctype2: Some("GLAT-TAN".to_string()),
        crpix1: Some(1f64),
        crpix2: Some(1f64),
        crval1: Some(0f64),
        crval2: Some(0f64),
        cdelt1: Some(-1f64),
        cdelt2: Some(1f64),
        ..crate::wcs::blank_params()
    })
    .expect("valid galactic header")
});

/// A position on the sky
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyCoord {
    /// longitude (RA or l) in degrees, in [0, 360)
    pub lon: f64,
    /// latitude (Dec or b) in degrees
    pub lat: f64,
    pub frame: Frame,
}
impl SkyCoord {
    pub fn new(lon: f64, lat: f64, frame: Frame) -> Self {
        Self {
            lon: lon.rem_euclid(360f64),
            lat,
            frame,
        }
    }
    /// Parses a two component sky position in the given frame
    pub fn parse(input: &str, frame: Frame) -> Result<Self> {
        let cleaned = input.replace(',', " ");
        let tokens: Vec<&str> = cleaned.split_whitespace().collect();
        let (lon, lat) = match tokens.as_slice() {
            [lon, lat] => (lon.to_string(), lat.to_string()),
            [h, m, s, d, am, asec] => (format!("{h}:{m}:{s}"), format!("{d}:{am}:{asec}")),
            _ => return Err(ParseError::Components(tokens.len(), input.to_string())),
        };
        let lon = parse_angle(&lon, true)?;
        let lat = parse_angle(&lat, false)?;
        if !(-90f64..=90f64).contains(&lat) {
            return Err(ParseError::Latitude(lat));
        }
        Ok(Self::new(lon, lat, frame))
    }
    fn to_unit_vector(&self) -> Vector3<f64> {
        let (lon, lat) = (self.lon.to_radians(), self.lat.to_radians());
        Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
    }
    fn to_lonlat(self) -> LonLat {
        LonLat::new(self.lon.to_radians(), self.lat.to_radians())
    }
    fn from_lonlat(lonlat: LonLat, frame: Frame) -> Self {
        Self::new(lonlat.lon().to_degrees(), lonlat.lat().to_degrees(), frame)
    }
    /// Transforms the coordinate into another frame
    ///
    /// FK5 (J2000) and ICRS are not told apart.
    pub fn transform_to(&self, frame: Frame) -> Self {
        use Frame::*;
        let system = GALACTIC.coo_system();
        match (self.frame, frame) {
            (Galactic, Galactic) => *self,
            (Icrs | Fk5, Icrs | Fk5) => Self { frame, ..*self },
            (Icrs | Fk5, Galactic) => Self::from_lonlat(system.from_icrs(self.to_lonlat()), frame),
            (Galactic, Icrs | Fk5) => Self::from_lonlat(system.to_icrs(self.to_lonlat()), frame),
        }
    }
    /// Angular separation to another coordinate in degrees
    pub fn separation(&self, other: &SkyCoord) -> f64 {
        let a = self.to_unit_vector();
        let b = other.transform_to(self.frame).to_unit_vector();
        a.cross(&b).norm().atan2(a.dot(&b)).to_degrees()
    }
}
impl fmt::Display for SkyCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:+.6}) {}", self.lon, self.lat, self.frame)
    }
}

fn field(caps: &regex::Captures, i: usize, name: &'static str, input: &str) -> Result<f64> {
    let Some(m) = caps.get(i) else {
        return Ok(0f64);
    };
    let value: f64 = m
        .as_str()
        .parse()
        .map_err(|_| ParseError::Angle(input.to_string()))?;
    if i > 2 && value >= 60f64 {
        return Err(ParseError::Field(name, input.to_string()));
    }
    Ok(value)
}

fn sexagesimal(caps: &regex::Captures, input: &str) -> Result<f64> {
    let sign = if &caps[1] == "-" { -1f64 } else { 1f64 };
    let units = field(caps, 2, "units", input)?;
    let minutes = field(caps, 3, "minutes", input)?;
    let seconds = field(caps, 4, "seconds", input)?;
    Ok(sign * (units + minutes / 60f64 + seconds / 3600f64))
}

/// Parses a single angle into degrees; sexagesimal longitudes without explicit
/// units are hours
fn parse_angle(token: &str, longitude: bool) -> Result<f64> {
    let token = token.trim().to_ascii_lowercase();
    if let Some(caps) = HMS.captures(&token) {
        if !longitude {
            return Err(ParseError::HourLatitude(token.clone()));
        }
        return Ok(15f64 * sexagesimal(&caps, &token)?);
    }
    if let Some(caps) = DMS.captures(&token) {
        return sexagesimal(&caps, &token);
    }
    if let Some(caps) = COLON.captures(&token) {
        let value = sexagesimal(&caps, &token)?;
        return Ok(if longitude { 15f64 * value } else { value });
    }
    if let Some(caps) = DECIMAL.captures(&token) {
        return caps[1]
            .parse::<f64>()
            .map_err(|_| ParseError::Angle(token.clone()));
    }
    Err(ParseError::Angle(token))
}

/// A 0-based pixel position (x along NAXIS1, y along NAXIS2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelCoord {
    pub x: f64,
    pub y: f64,
}
impl PixelCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
impl From<(f64, f64)> for PixelCoord {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}
/// Parses `x y`, `x,y` or `(x, y)`
impl FromStr for PixelCoord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self> {
        let cleaned = s.trim().trim_start_matches('(').trim_end_matches(')');
        let values = cleaned
            .replace(',', " ")
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|_| ParseError::PixelPair(s.to_string()))?;
        match values.as_slice() {
            &[x, y] if x.is_finite() && y.is_finite() => Ok(Self { x, y }),
            _ => Err(ParseError::PixelPair(s.to_string())),
        }
    }
}
impl fmt::Display for PixelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}) px", self.x, self.y)
    }
}

/// A cutout center, either on the sky or in pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    Sky(SkyCoord),
    Pixel(PixelCoord),
}
impl Position {
    /// Interprets `input` as a celestial coordinate in `frame` if `sky_coords`
    /// is set, as a raw pixel pair otherwise
    pub fn parse(input: &str, sky_coords: bool, frame: Frame) -> Result<Self> {
        if sky_coords {
            SkyCoord::parse(input, frame).map(Position::Sky)
        } else {
            input.parse().map(Position::Pixel)
        }
    }
}
impl From<SkyCoord> for Position {
    fn from(value: SkyCoord) -> Self {
        Position::Sky(value)
    }
}
impl From<PixelCoord> for Position {
    fn from(value: PixelCoord) -> Self {
        Position::Pixel(value)
    }
}
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Sky(c) => c.fmt(f),
            Position::Pixel(p) => p.fmt(f),
        }
    }
}
