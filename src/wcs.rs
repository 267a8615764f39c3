//! World Coordinate System of the primary image
//!
//! [Wcs] forwards the celestial header cards to the `wcs` crate, which
//! implements the FITS projections, the `CDi_j`, `PCi_j`+`CDELTi` and
//! `CROTA2` linear conventions and the SIP distortions.
//!
//! Pixel coordinates are 0-based here: pixel `(0, 0)` is the center of the
//! first stored pixel, which is `(1, 1)` in the FITS convention.

use std::{fmt, sync::Arc};

use ::wcs::{ImgXY, LonLat, WCSParams, WCS};

use crate::{
    coords::{Frame, PixelCoord, SkyCoord},
    fits::Header,
};

#[derive(Debug, thiserror::Error)]
pub enum WcsError {
    #[error("missing WCS keyword {0}")]
    MissingKeyword(&'static str),
    #[error("axes {0:?} and {1:?} are not a (longitude, latitude) celestial pair")]
    NotCelestial(String, String),
    #[error("unsupported celestial axis unit {0:?}")]
    Unit(String),
    #[error("invalid WCS header")]
    Header(#[from] ::wcs::error::Error),
    #[error("no sky position at the reference pixel ({0}, {1})")]
    Reference(f64, f64),
    #[error("degenerate pixel scales ({0}, {1}) deg")]
    Scale(f64, f64),
}
type Result<T> = std::result::Result<T, WcsError>;

/// Forwards real valued cards into the matching `WCSParams` fields
macro_rules! real_cards {
    ($params:ident, $header:ident; $($field:ident)+) => {
        $($params.$field = $header.real(&stringify!($field).to_uppercase());)+
    };
}

/// Celestial coordinate mapping of the image pixels
#[derive(Debug, Clone)]
pub struct Wcs {
    inner: Arc<WCS>,
    /// pixel of the parent image at this mapping (0, 0)
    origin: (f64, f64),
    /// 0-based reference pixel
    crpix: (f64, f64),
    projection: String,
    frame: Frame,
    /// degrees per pixel along x and y at the reference pixel
    scales: (f64, f64),
}
impl Wcs {
    pub fn from_header(header: &Header) -> Result<Self> {
        let ctype1 = header
            .text("CTYPE1")
            .ok_or(WcsError::MissingKeyword("CTYPE1"))?;
        let ctype2 = header
            .text("CTYPE2")
            .ok_or(WcsError::MissingKeyword("CTYPE2"))?;
        let not_celestial = || WcsError::NotCelestial(ctype1.to_string(), ctype2.to_string());
        let (lon, lat, code) = match (ctype1.get(..4), ctype2.get(..4), ctype1.get(5..)) {
            (Some(lon), Some(lat), Some(code)) if code.len() >= 3 => (lon, lat, code),
            _ => return Err(not_celestial()),
        };
        if ctype2.get(5..) != Some(code) {
            return Err(not_celestial());
        }
        let frame = match (lon, lat) {
            ("RA--", "DEC-") => match header.text("RADESYS") {
                Some(system) if system.eq_ignore_ascii_case("FK5") => Frame::Fk5,
                Some(system) if system.eq_ignore_ascii_case("ICRS") => Frame::Icrs,
                other => {
                    log::warn!("RADESYS {other:?} read as ICRS");
                    Frame::Icrs
                }
            },
            ("GLON", "GLAT") => Frame::Galactic,
            _ => return Err(not_celestial()),
        };
        for key in ["CUNIT1", "CUNIT2"] {
            match header.text(key) {
                None => (),
                Some(unit) if unit.is_empty() || unit.eq_ignore_ascii_case("deg") => (),
                Some(unit) => return Err(WcsError::Unit(unit.to_string())),
            }
        }
        for key in ["CRPIX1", "CRPIX2", "CRVAL1", "CRVAL2"] {
            if header.real(key).is_none() {
                return Err(WcsError::MissingKeyword(key));
            }
        }
        let naxis1 = header
            .real("NAXIS1")
            .ok_or(WcsError::MissingKeyword("NAXIS1"))?;
        let naxis2 = header
            .real("NAXIS2")
            .ok_or(WcsError::MissingKeyword("NAXIS2"))?;

        let mut params = WCSParams {
            naxis: 2,
            naxis1: Some(naxis1 as i64),
            naxis2: Some(naxis2 as i64),
            ctype1: ctype1.to_string(),
            ctype2: Some(ctype2.to_string()),
            radesys: header.text("RADESYS").map(str::to_string),
            a_order: header.real("A_ORDER").map(|order| order as i64),
            b_order: header.real("B_ORDER").map(|order| order as i64),
            ap_order: header.real("AP_ORDER").map(|order| order as i64),
            bp_order: header.real("BP_ORDER").map(|order| order as i64),
            ..blank_params()
        };
        real_cards!(params, header;
            crpix1 crpix2 crval1 crval2 cdelt1 cdelt2 crota2
            cd1_1 cd1_2 cd2_1 cd2_2 pc1_1 pc1_2 pc2_1 pc2_2
            lonpole latpole equinox
        );
        if params.a_order.is_some() {
            real_cards!(params, header;
                a_0_0 a_0_1 a_0_2 a_0_3 a_0_4 a_0_5 a_0_6 a_1_0 a_1_1 a_1_2 a_1_3 a_1_4 a_1_5 a_2_0
                a_2_1 a_2_2 a_2_3 a_2_4 a_3_0 a_3_1 a_3_2 a_3_3 a_4_0 a_4_1 a_4_2 a_5_0 a_5_1 a_6_0
                b_0_0 b_0_1 b_0_2 b_0_3 b_0_4 b_0_5 b_0_6 b_1_0 b_1_1 b_1_2 b_1_3 b_1_4 b_1_5 b_2_0
                b_2_1 b_2_2 b_2_3 b_2_4 b_3_0 b_3_1 b_3_2 b_3_3 b_4_0 b_4_1 b_4_2 b_5_0 b_5_1 b_6_0
            );
        }
        if params.ap_order.is_some() {
            real_cards!(params, header;
                ap_0_0 ap_0_1 ap_0_2 ap_0_3 ap_0_4 ap_0_5 ap_0_6 ap_1_0 ap_1_1 ap_1_2 ap_1_3 ap_1_4
                ap_1_5 ap_2_0 ap_2_1 ap_2_2 ap_2_3 ap_2_4 ap_3_0 ap_3_1 ap_3_2 ap_3_3 ap_4_0 ap_4_1
                ap_4_2 ap_5_0 ap_5_1 ap_6_0
                bp_0_0 bp_0_1 bp_0_2 bp_0_3 bp_0_4 bp_0_5 bp_0_6 bp_1_0 bp_1_1 bp_1_2 bp_1_3 bp_1_4
                bp_1_5 bp_2_0 bp_2_1 bp_2_2 bp_2_3 bp_2_4 bp_3_0 bp_3_1 bp_3_2 bp_3_3 bp_4_0 bp_4_1
                bp_4_2 bp_5_0 bp_5_1 bp_6_0
            );
        }
        let inner = WCS::new(&params)?;

        let crpix = (
            params.crpix1.unwrap_or_default() - 1f64,
            params.crpix2.unwrap_or_default() - 1f64,
        );
        let mut wcs = Self {
            inner: Arc::new(inner),
            origin: (0f64, 0f64),
            crpix,
            projection: code.to_string(),
            frame,
            scales: (0f64, 0f64),
        };
        wcs.scales = wcs.measure_scales()?;
        Ok(wcs)
    }
    /// Gnomonic mapping with square pixels of `scale` degrees, east to the left
    pub fn tan(crpix: (f64, f64), crval: (f64, f64), scale: f64, frame: Frame) -> Result<Self> {
        let (lon, lat) = match frame {
            Frame::Galactic => ("GLON-TAN", "GLAT-TAN"),
            Frame::Icrs | Frame::Fk5 => ("RA---TAN", "DEC--TAN"),
        };
        let radesys = if frame == Frame::Fk5 { "FK5" } else { "ICRS" };
        let header = Header::new()
            .with_text("CTYPE1", lon)
            .with_text("CTYPE2", lat)
            .with_text("RADESYS", radesys)
            .with_real("NAXIS1", (2f64 * crpix.0).ceil().max(1f64))
            .with_real("NAXIS2", (2f64 * crpix.1).ceil().max(1f64))
            .with_real("CRPIX1", crpix.0)
            .with_real("CRPIX2", crpix.1)
            .with_real("CRVAL1", crval.0)
            .with_real("CRVAL2", crval.1)
            .with_real("CD1_1", -scale)
            .with_real("CD1_2", 0f64)
            .with_real("CD2_1", 0f64)
            .with_real("CD2_2", scale);
        Self::from_header(&header)
    }
    /// Reference frame of the image axes
    pub fn frame(&self) -> Frame {
        self.frame
    }
    /// Projection code of the axes, e.g. `TAN` or `TAN-SIP`
    pub fn projection(&self) -> &str {
        &self.projection
    }
    /// 0-based reference pixel
    pub fn crpix(&self) -> (f64, f64) {
        (self.crpix.0 - self.origin.0, self.crpix.1 - self.origin.1)
    }
    /// Angular size in degrees of a pixel along x and y at the reference pixel
    pub fn pixel_scales(&self) -> (f64, f64) {
        self.scales
    }
    /// Mapping of a sub-image whose pixel (0, 0) is `origin` in this image
    pub fn shifted(&self, origin: (f64, f64)) -> Self {
        Self {
            origin: (self.origin.0 + origin.0, self.origin.1 + origin.1),
            ..self.clone()
        }
    }
    /// Sky position of a 0-based pixel, in ICRS
    pub fn pixel_to_world(&self, pixel: PixelCoord) -> Option<SkyCoord> {
        let lonlat = self.inner.unproj(&ImgXY::new(
            pixel.x + self.origin.0 + 1f64,
            pixel.y + self.origin.1 + 1f64,
        ))?;
        let (lon, lat) = (lonlat.lon().to_degrees(), lonlat.lat().to_degrees());
        (lon.is_finite() && lat.is_finite()).then(|| SkyCoord::new(lon, lat, Frame::Icrs))
    }
    /// 0-based pixel of a sky position, `None` if it has no image in the projection
    pub fn world_to_pixel(&self, coord: &SkyCoord) -> Option<PixelCoord> {
        let icrs = coord.transform_to(Frame::Icrs);
        let xy = self.inner.proj(&LonLat::new(
            icrs.lon.to_radians(),
            icrs.lat.to_radians(),
        ))?;
        let (x, y) = (
            xy.x() - 1f64 - self.origin.0,
            xy.y() - 1f64 - self.origin.1,
        );
        (x.is_finite() && y.is_finite()).then(|| PixelCoord::new(x, y))
    }
    fn measure_scales(&self) -> Result<(f64, f64)> {
        let (x, y) = self.crpix;
        let at = |dx: f64, dy: f64| self.pixel_to_world(PixelCoord::new(x + dx, y + dy));
        let (Some(left), Some(right), Some(bottom), Some(top)) =
            (at(-0.5, 0f64), at(0.5, 0f64), at(0f64, -0.5), at(0f64, 0.5))
        else {
            return Err(WcsError::Reference(x, y));
        };
        let scales = (left.separation(&right), bottom.separation(&top));
        if scales.0 > 0f64 && scales.1 > 0f64 {
            Ok(scales)
        } else {
            Err(WcsError::Scale(scales.0, scales.1))
        }
    }
}
impl fmt::Display for Wcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.crpix();
        write!(
            f,
            "{} {} crpix=({x:.2}, {y:.2}) scale=({:.3}\", {:.3}\")/px",
            self.frame,
            self.projection,
            self.scales.0 * 3600f64,
            self.scales.1 * 3600f64
        )
    }
}


/// `WCSParams` with every optional card unset, as `#[derive(Default)]`
/// would build it (the `wcs` crate does not implement `Default`)
pub(crate) fn blank_params() -> WCSParams {
    WCSParams {
        ctype1: String::new(),
        naxis: 0,
        naxis1: None,
        naxis2: None,
        naxis3: None,
        naxis4: None,
        znaxis1: None,
        znaxis2: None,
        znaxis3: None,
        znaxis4: None,
        crpix1: None,
        crpix2: None,
        crpix3: None,
        crval1: None,
        crval2: None,
        crval3: None,
        cd1_1: None,
        cd1_2: None,
        cd1_3: None,
        cd2_1: None,
        cd2_2: None,
        cd2_3: None,
        cd3_1: None,
        cd3_2: None,
        cd3_3: None,
        pc1_1: None,
        pc1_2: None,
        pc1_3: None,
        pc2_1: None,
        pc2_2: None,
        pc2_3: None,
        pc3_1: None,
        pc3_2: None,
        pc3_3: None,
        cdelt1: None,
        cdelt2: None,
        cdelt3: None,
        crota1: None,
        crota2: None,
        crota3: None,
        ctype2: None,
        ctype3: None,
        pv1_0: None,
        pv1_1: None,
        pv1_2: None,
        pv2_0: None,
        pv2_1: None,
        pv2_2: None,
        pv2_3: None,
        pv2_4: None,
        pv2_5: None,
        pv2_6: None,
        pv2_7: None,
        pv2_8: None,
        pv2_9: None,
        pv2_10: None,
        pv2_11: None,
        pv2_12: None,
        pv2_13: None,
        pv2_14: None,
        pv2_15: None,
        pv2_16: None,
        pv2_17: None,
        pv2_18: None,
        pv2_19: None,
        pv2_20: None,
        epoch: None,
        equinox: None,
        radesys: None,
        lonpole: None,
        latpole: None,
        a_order: None,
        a_0_0: None,
        a_0_1: None,
        a_0_2: None,
        a_0_3: None,
        a_0_4: None,
        a_0_5: None,
        a_0_6: None,
        a_1_0: None,
        a_1_1: None,
        a_1_2: None,
        a_1_3: None,
        a_1_4: None,
        a_1_5: None,
        a_2_0: None,
        a_2_1: None,
        a_2_2: None,
        a_2_3: None,
        a_2_4: None,
        a_3_0: None,
        a_3_1: None,
        a_3_2: None,
        a_3_3: None,
        a_4_0: None,
        a_4_1: None,
        a_4_2: None,
        a_5_0: None,
        a_5_1: None,
        a_6_0: None,
        b_order: None,
        b_0_0: None,
        b_0_1: None,
        b_0_2: None,
        b_0_3: None,
        b_0_4: None,
        b_0_5: None,
        b_0_6: None,
        b_1_0: None,
        b_1_1: None,
        b_1_2: None,
        b_1_3: None,
        b_1_4: None,
        b_1_5: None,
        b_2_0: None,
        b_2_1: None,
        b_2_2: None,
        b_2_3: None,
        b_2_4: None,
        b_3_0: None,
        b_3_1: None,
        b_3_2: None,
        b_3_3: None,
        b_4_0: None,
        b_4_1: None,
        b_4_2: None,
        b_5_0: None,
        b_5_1: None,
        b_6_0: None,
        ap_order: None,
        ap_0_0: None,
        ap_0_1: None,
        ap_0_2: None,
        ap_0_3: None,
        ap_0_4: None,
        ap_0_5: None,
        ap_0_6: None,
        ap_1_0: None,
        ap_1_1: None,
        ap_1_2: None,
        ap_1_3: None,
        ap_1_4: None,
        ap_1_5: None,
        ap_2_0: None,
        ap_2_1: None,
        ap_2_2: None,
        ap_2_3: None,
        ap_2_4: None,
        ap_3_0: None,
        ap_3_1: None,
        ap_3_2: None,
        ap_3_3: None,
        ap_4_0: None,
        ap_4_1: None,
        ap_4_2: None,
        ap_5_0: None,
        ap_5_1: None,
        ap_6_0: None,
        bp_order: None,
        bp_0_0: None,
        bp_0_1: None,
        bp_0_2: None,
        bp_0_3: None,
        bp_0_4: None,
        bp_0_5: None,
        bp_0_6: None,
        bp_1_0: None,
        bp_1_1: None,
        bp_1_2: None,
        bp_1_3: None,
        bp_1_4: None,
        bp_1_5: None,
        bp_2_0: None,
        bp_2_1: None,
        bp_2_2: None,
        bp_2_3: None,
        bp_2_4: None,
        bp_3_0: None,
        bp_3_1: None,
        bp_3_2: None,
        bp_3_3: None,
        bp_4_0: None,
        bp_4_1: None,
        bp_4_2: None,
        bp_5_0: None,
        bp_5_1: None,
        bp_6_0: None,
    }
}
