//! Rectangular cutouts of 2D images
//!
//! A cutout of shape `(ny, nx)` centered on `(x, y)` spans the pixels
//! `ceil(x - nx/2)..ceil(x + nx/2)` and `ceil(y - ny/2)..ceil(y + ny/2)` of the
//! original image. What happens where that window leaves the image is set by
//! [ExtractMode].

use std::fmt;

use ndarray::{s, Array2};

use crate::{
    angle::AngularSize,
    coords::{PixelCoord, SkyCoord},
    wcs::Wcs,
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BoundsError {
    #[error("cutout of shape {shape:?} at {position} does not overlap the {image:?} image")]
    NoOverlap {
        position: PixelCoord,
        shape: (usize, usize),
        image: (usize, usize),
    },
    #[error("cutout of shape {shape:?} at {position} extends beyond the {image:?} image")]
    PartialOverlap {
        position: PixelCoord,
        shape: (usize, usize),
        image: (usize, usize),
    },
    #[error("cutout size {0} does not span a single pixel")]
    Size(AngularSize),
    #[error("empty cutout shape {0:?}")]
    EmptyShape((usize, usize)),
    #[error("cutout position {0} is not finite")]
    NonFinite(PixelCoord),
    #[error("sky position {0} cannot be projected onto the image")]
    Unprojectable(SkyCoord),
}
type Result<T> = std::result::Result<T, BoundsError>;

/// Edge policy of the extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractMode {
    /// keep only the part of the cutout inside the image
    #[default]
    Trim,
    /// keep the requested shape, filling outside pixels with NaN
    Partial,
    /// reject cutouts that are not fully inside the image
    Strict,
}
impl fmt::Display for ExtractMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractMode::Trim => write!(f, "trim"),
            ExtractMode::Partial => write!(f, "partial"),
            ExtractMode::Strict => write!(f, "strict"),
        }
    }
}

/// Crosshair index along an axis of `len` pixels
///
/// Odd lengths put the crosshair on the central pixel, even lengths offset it
/// by half a pixel onto a pixel boundary.
pub fn center_index(len: usize) -> f64 {
    let center = (len / 2) as f64;
    if len % 2 == 0 {
        center + 0.5
    } else {
        center
    }
}

/// Cutout shape `(ny, nx)` covering `size` on both axes at the WCS pixel scales
pub fn shape_from_size(size: &AngularSize, wcs: &Wcs) -> Result<(usize, usize)> {
    let (scale_x, scale_y) = wcs.pixel_scales();
    let deg = size.to_degrees();
    let nx = (deg / scale_x).round();
    let ny = (deg / scale_y).round();
    if !(nx >= 1f64 && ny >= 1f64) {
        return Err(BoundsError::Size(*size));
    }
    Ok((ny as usize, nx as usize))
}

/// Half open pixel window `[min, min + len)` along one axis
fn window(position: f64, len: usize) -> (i64, i64) {
    let min = (position - len as f64 / 2f64).ceil() as i64;
    (min, min + len as i64)
}

/// A sub-array of an image with its own coordinate mapping
#[derive(Debug, Clone)]
pub struct Cutout {
    pub data: Array2<f64>,
    /// WCS of the cutout pixels
    pub wcs: Option<Wcs>,
    /// original pixel (x, y) of the cutout pixel (0, 0)
    origin_original: (i64, i64),
    /// requested center in the original image
    position_original: PixelCoord,
    /// requested shape (ny, nx)
    shape_input: (usize, usize),
    mode: ExtractMode,
}
impl Cutout {
    /// Extracts a cutout of shape `(ny, nx)` centered on `position`
    pub fn new(
        data: &Array2<f64>,
        position: PixelCoord,
        shape: (usize, usize),
        wcs: Option<&Wcs>,
        mode: ExtractMode,
    ) -> Result<Self> {
        let (ny, nx) = data.dim();
        if shape.0 == 0 || shape.1 == 0 {
            return Err(BoundsError::EmptyShape(shape));
        }
        if !(position.x.is_finite() && position.y.is_finite()) {
            return Err(BoundsError::NonFinite(position));
        }
        let (x_min, x_max) = window(position.x, shape.1);
        let (y_min, y_max) = window(position.y, shape.0);
        log::debug!(
            "cutout window x: [{x_min}, {x_max}), y: [{y_min}, {y_max}) in {nx}x{ny} image"
        );

        if x_max <= 0 || y_max <= 0 || x_min >= nx as i64 || y_min >= ny as i64 {
            return Err(BoundsError::NoOverlap {
                position,
                shape,
                image: (ny, nx),
            });
        }
        let inside = x_min >= 0 && y_min >= 0 && x_max <= nx as i64 && y_max <= ny as i64;
        if mode == ExtractMode::Strict && !inside {
            return Err(BoundsError::PartialOverlap {
                position,
                shape,
                image: (ny, nx),
            });
        }

        let (x0, x1) = (x_min.max(0) as usize, x_max.min(nx as i64) as usize);
        let (y0, y1) = (y_min.max(0) as usize, y_max.min(ny as i64) as usize);
        let overlap = data.slice(s![y0..y1, x0..x1]);

        let (cutout, origin) = match mode {
            ExtractMode::Trim | ExtractMode::Strict => {
                (overlap.to_owned(), (x0 as i64, y0 as i64))
            }
            ExtractMode::Partial => {
                let mut cutout = Array2::from_elem(shape, f64::NAN);
                let (dx, dy) = ((x0 as i64 - x_min) as usize, (y0 as i64 - y_min) as usize);
                cutout
                    .slice_mut(s![dy..dy + (y1 - y0), dx..dx + (x1 - x0)])
                    .assign(&overlap);
                (cutout, (x_min, y_min))
            }
        };
        if cutout.dim() != shape {
            log::info!(
                "cutout trimmed from {:?} to {:?} at the image edge",
                shape,
                cutout.dim()
            );
        }

        Ok(Self {
            data: cutout,
            wcs: wcs.map(|wcs| wcs.shifted((origin.0 as f64, origin.1 as f64))),
            origin_original: origin,
            position_original: position,
            shape_input: shape,
            mode,
        })
    }
    /// Cutout shape (ny, nx)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
    /// Requested shape (ny, nx)
    pub fn shape_input(&self) -> (usize, usize) {
        self.shape_input
    }
    pub fn mode(&self) -> ExtractMode {
        self.mode
    }
    /// Original image pixel (x, y) of the cutout pixel (0, 0)
    pub fn origin_original(&self) -> (i64, i64) {
        self.origin_original
    }
    /// Requested center in original image pixels
    pub fn position_original(&self) -> PixelCoord {
        self.position_original
    }
    /// Requested center in cutout pixels
    pub fn position_cutout(&self) -> PixelCoord {
        self.to_cutout_position(self.position_original)
    }
    pub fn to_cutout_position(&self, original: PixelCoord) -> PixelCoord {
        PixelCoord::new(
            original.x - self.origin_original.0 as f64,
            original.y - self.origin_original.1 as f64,
        )
    }
    pub fn to_original_position(&self, cutout: PixelCoord) -> PixelCoord {
        PixelCoord::new(
            cutout.x + self.origin_original.0 as f64,
            cutout.y + self.origin_original.1 as f64,
        )
    }
    /// Crosshair position (x, y) in cutout pixels
    pub fn crosshair(&self) -> PixelCoord {
        let (ny, nx) = self.shape();
        PixelCoord::new(center_index(nx), center_index(ny))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Frame;

    fn ramp(ny: usize, nx: usize) -> Array2<f64> {
        Array2::from_shape_fn((ny, nx), |(y, x)| (y * 1000 + x) as f64)
    }

    #[test]
    fn odd_and_even_centers() {
        for k in 0..20 {
            assert_eq!(center_index(2 * k + 1), k as f64);
        }
        for k in 1..20 {
            assert_eq!(center_index(2 * k), k as f64 + 0.5);
        }
    }

    #[test]
    fn centered_odd_cutout() {
        let data = ramp(100, 100);
        let cutout = Cutout::new(
            &data,
            PixelCoord::new(50., 40.),
            (11, 11),
            None,
            ExtractMode::Trim,
        )
        .unwrap();
        assert_eq!(cutout.shape(), (11, 11));
        assert_eq!(cutout.origin_original(), (45, 35));
        assert_eq!(cutout.data[[5, 5]], data[[40, 50]]);
        assert_eq!(cutout.position_cutout(), PixelCoord::new(5., 5.));
        assert_eq!(cutout.crosshair(), PixelCoord::new(5., 5.));
    }

    #[test]
    fn even_cutout() {
        let data = ramp(100, 100);
        let cutout = Cutout::new(
            &data,
            PixelCoord::new(50., 50.),
            (10, 10),
            None,
            ExtractMode::Trim,
        )
        .unwrap();
        assert_eq!(cutout.origin_original(), (45, 45));
        assert_eq!(cutout.crosshair(), PixelCoord::new(5.5, 5.5));
    }

    #[test]
    fn trimmed_at_edge() {
        let data = ramp(50, 60);
        let cutout = Cutout::new(
            &data,
            PixelCoord::new(2., 48.),
            (11, 11),
            None,
            ExtractMode::Trim,
        )
        .unwrap();
        // x: [-3, 8) -> [0, 8), y: [43, 54) -> [43, 50)
        assert_eq!(cutout.shape(), (7, 8));
        assert_eq!(cutout.shape_input(), (11, 11));
        assert_eq!(cutout.origin_original(), (0, 43));
        assert_eq!(cutout.data[[0, 0]], data[[43, 0]]);
        assert_eq!(cutout.crosshair(), PixelCoord::new(4.5, 3.));
    }

    #[test]
    fn partial_fills_with_nan() {
        let data = ramp(50, 60);
        let cutout = Cutout::new(
            &data,
            PixelCoord::new(2., 48.),
            (11, 11),
            None,
            ExtractMode::Partial,
        )
        .unwrap();
        assert_eq!(cutout.shape(), (11, 11));
        assert_eq!(cutout.origin_original(), (-3, 43));
        assert!(cutout.data[[0, 0]].is_nan());
        assert!(cutout.data[[10, 10]].is_nan());
        assert_eq!(cutout.data[[0, 3]], data[[43, 0]]);
        assert_eq!(cutout.data[[5, 5]], data[[48, 2]]);
        assert_eq!(
            cutout.to_original_position(PixelCoord::new(5., 5.)),
            PixelCoord::new(2., 48.)
        );
    }

    #[test]
    fn window_length_under_rounding() {
        // x - 5 rounds to exactly -8 while x + 5 stays above 2
        let x = -3. + 2f64.powi(-51);
        let data = Array2::<f64>::zeros((50, 50));
        let partial = Cutout::new(
            &data,
            PixelCoord::new(x, 20.),
            (10, 10),
            None,
            ExtractMode::Partial,
        )
        .unwrap();
        assert_eq!(partial.shape(), (10, 10));
        assert_eq!(partial.origin_original(), (-8, 15));
        assert_eq!(partial.data.iter().filter(|v| v.is_nan()).count(), 80);
        let trimmed = Cutout::new(
            &data,
            PixelCoord::new(x, 20.),
            (10, 10),
            None,
            ExtractMode::Trim,
        )
        .unwrap();
        assert_eq!(trimmed.shape(), (10, 2));
        assert_eq!(trimmed.origin_original(), (0, 15));
    }

    #[test]
    fn strict_and_no_overlap() {
        let data = ramp(50, 60);
        assert!(matches!(
            Cutout::new(
                &data,
                PixelCoord::new(2., 48.),
                (11, 11),
                None,
                ExtractMode::Strict
            ),
            Err(BoundsError::PartialOverlap { .. })
        ));
        assert!(Cutout::new(
            &data,
            PixelCoord::new(30., 25.),
            (11, 11),
            None,
            ExtractMode::Strict
        )
        .is_ok());
        for position in [PixelCoord::new(-10., 25.), PixelCoord::new(30., 80.)] {
            assert!(matches!(
                Cutout::new(&data, position, (11, 11), None, ExtractMode::Trim),
                Err(BoundsError::NoOverlap { .. })
            ));
        }
        assert!(matches!(
            Cutout::new(
                &data,
                PixelCoord::new(f64::NAN, 1.),
                (3, 3),
                None,
                ExtractMode::Trim
            ),
            Err(BoundsError::NonFinite(_))
        ));
        assert_eq!(
            Cutout::new(
                &data,
                PixelCoord::new(30., 25.),
                (0, 3),
                None,
                ExtractMode::Trim
            )
            .unwrap_err(),
            BoundsError::EmptyShape((0, 3))
        );
    }

    #[test]
    fn shifted_wcs_follows_the_cutout() {
        let wcs = Wcs::tan((50.5, 50.5), (10., 41.), 1. / 3600., Frame::Icrs).unwrap();
        let target = wcs.pixel_to_world(PixelCoord::new(30., 60.)).unwrap();
        let data = ramp(100, 100);
        let cutout = Cutout::new(
            &data,
            PixelCoord::new(30., 60.),
            (21, 21),
            Some(&wcs),
            ExtractMode::Trim,
        )
        .unwrap();
        let p = cutout.wcs.as_ref().unwrap().world_to_pixel(&target).unwrap();
        assert!((p.x - 10.).abs() < 1e-7 && (p.y - 10.).abs() < 1e-7, "{p}");
    }

    #[test]
    fn shape_from_angular_size() {
        let wcs = Wcs::tan((50.5, 50.5), (10., 41.), 1.5 / 3600., Frame::Icrs).unwrap();
        assert_eq!(
            shape_from_size(&AngularSize::arcmin(5.), &wcs).unwrap(),
            (200, 200)
        );
        assert_eq!(
            shape_from_size(&AngularSize::arcsec(16.), &wcs).unwrap(),
            (11, 11)
        );
        assert_eq!(
            shape_from_size(&AngularSize::arcsec(0.5), &wcs),
            Err(BoundsError::Size(AngularSize::arcsec(0.5)))
        );
    }
}
