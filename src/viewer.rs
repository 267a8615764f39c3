//! The cutout viewer
//!
//! [CutoutViewer::display] runs the whole operation: load the FITS primary
//! image, build its WCS, resolve the requested position into pixels, extract
//! the cutout and wrap it into a [Figure]. Nothing is rendered on failure.

use std::path::Path;

use crate::{
    angle::AngularSize,
    coords::{Frame, PixelCoord, Position},
    cutout::{shape_from_size, BoundsError, Cutout, ExtractMode},
    fits::{FitsImage, FormatError},
    render::{Colormap, Figure, RenderOptions},
    wcs::Wcs,
    Result,
};

/// Viewer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub(crate) sky_coords: bool,
    pub(crate) frame: Frame,
    pub(crate) mode: ExtractMode,
    pub(crate) render: RenderOptions,
}
impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            sky_coords: true,
            frame: Frame::default(),
            mode: ExtractMode::default(),
            render: RenderOptions::default(),
        }
    }
}
impl ViewerConfig {
    pub fn new() -> Self {
        Default::default()
    }
    /// Interprets positions as celestial coordinates (default) or as pixel pairs
    pub fn sky_coords(mut self, value: bool) -> Self {
        self.sky_coords = value;
        self
    }
    /// Reference frame of celestial positions
    pub fn frame(mut self, value: Frame) -> Self {
        self.frame = value;
        self
    }
    /// Display intensity bounds, not validated
    pub fn intensity(mut self, vmin: f64, vmax: f64) -> Self {
        self.render.vmin = vmin;
        self.render.vmax = vmax;
        self
    }
    pub fn mode(mut self, value: ExtractMode) -> Self {
        self.mode = value;
        self
    }
    pub fn colormap(mut self, value: Colormap) -> Self {
        self.render.colormap = value;
        self
    }
    pub fn scale(mut self, value: u32) -> Self {
        self.render.scale = Some(value.max(1));
        self
    }
    pub fn crosshair_color(mut self, value: [u8; 3]) -> Self {
        self.render.crosshair_color = value;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CutoutViewer {
    config: ViewerConfig,
}
impl CutoutViewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }
    /// Cutout of `size_arcmin` arc-minutes around `position`
    ///
    /// `position` is a celestial coordinate string or a pixel pair depending
    /// on [ViewerConfig::sky_coords].
    pub fn display(
        &self,
        path: impl AsRef<Path>,
        position: &str,
        size_arcmin: f64,
    ) -> Result<Figure> {
        self.display_sized(path, position, AngularSize::arcmin(size_arcmin))
    }
    /// Same as [CutoutViewer::display] with the cutout size in any angle unit
    ///
    /// The position is parsed once the image and its WCS are loaded.
    pub fn display_sized(
        &self,
        path: impl AsRef<Path>,
        position: &str,
        size: AngularSize,
    ) -> Result<Figure> {
        let ViewerConfig {
            sky_coords, frame, ..
        } = self.config;
        self.run(path.as_ref(), size, || {
            Ok(Position::parse(position, sky_coords, frame)?)
        })
    }
    /// Cutout of `size` around an already resolved position
    pub fn display_at(
        &self,
        path: impl AsRef<Path>,
        position: Position,
        size: AngularSize,
    ) -> Result<Figure> {
        self.run(path.as_ref(), size, || Ok(position))
    }
    fn run<F>(&self, path: &Path, size: AngularSize, position: F) -> Result<Figure>
    where
        F: FnOnce() -> Result<Position>,
    {
        log::info!("loading {path:?}");
        let FitsImage { data, header } = FitsImage::load(path)?;

        let wcs = Wcs::from_header(&header).map_err(FormatError::from)?;
        log::debug!("WCS: {wcs}");

        let position = position()?;
        let center = match position {
            Position::Sky(coord) => wcs
                .world_to_pixel(&coord)
                .ok_or(BoundsError::Unprojectable(coord))?,
            Position::Pixel(pixel) => pixel,
        };
        log::info!("cutout of {size} at {position} -> {center}");

        let shape = shape_from_size(&size, &wcs)?;
        let cutout = Cutout::new(&data, center, shape, Some(&wcs), self.config.mode)?;
        drop(data);
        let PixelCoord { x, y } = cutout.crosshair();
        log::debug!(
            "cutout {:?} ({} mode), crosshair at ({x}, {y})",
            cutout.shape(),
            cutout.mode()
        );

        Ok(Figure::new(&cutout, self.config.render.clone()))
    }
}

/// Cutout of `size_arcmin` arc-minutes around `position`, displayed within `[vmin, vmax]`
///
/// `position` is parsed as an ICRS coordinate if `sky_coords` is set, as a
/// `x y` pixel pair otherwise.
pub fn display(
    path: impl AsRef<Path>,
    position: &str,
    size_arcmin: f64,
    sky_coords: bool,
    vmin: f64,
    vmax: f64,
) -> Result<Figure> {
    CutoutViewer::new(
        ViewerConfig::new()
            .sky_coords(sky_coords)
            .intensity(vmin, vmax),
    )
    .display(path, position, size_arcmin)
}
