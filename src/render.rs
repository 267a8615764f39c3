/*!
# Cutout figures

A [Figure] is the renderable artifact of a cutout: the negated cutout data,
so that bright sources appear dark on a light background, the display
intensity bounds, the colormap and the crosshair marking the cutout center.
Rendering follows the astronomical convention of an image origin at the
lower left corner.
*/

use std::path::{Path, PathBuf};

use image::{ImageBuffer, ImageError, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use ndarray::Array2;

use crate::{coords::PixelCoord, cutout::Cutout};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create a {0}x{1} image buffer")]
    Image(u32, u32),
    #[error("a {0}x{1} figure magnified {2} times exceeds the image size limit")]
    Scale(u32, u32, u32),
    #[error("failed to save figure to png file {1:?}")]
    Save(#[source] ImageError, PathBuf),
}
type Result<T> = std::result::Result<T, RenderError>;

/// Rendered side length the automatic scale aims for, in pixels
const TARGET_SIDE: usize = 800;
/// matplotlib default line color
pub const CROSSHAIR_COLOR: [u8; 3] = [0x1f, 0x77, 0xb4];

/// Colormaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colormap {
    /// black to white
    #[default]
    Gray,
    Cubehelix,
    Viridis,
}
impl Colormap {
    /// Color for a value normalized to [0, 1]
    pub fn eval(&self, value: f64) -> [u8; 3] {
        match self {
            Colormap::Gray => {
                let level = (value * 255f64).round() as u8;
                [level, level, level]
            }
            Colormap::Cubehelix => {
                let color = colorous::CUBEHELIX.eval_continuous(value);
                [color.r, color.g, color.b]
            }
            Colormap::Viridis => {
                let color = colorous::VIRIDIS.eval_continuous(value);
                [color.r, color.g, color.b]
            }
        }
    }
}

/// Rendering options
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub vmin: f64,
    pub vmax: f64,
    pub colormap: Colormap,
    pub crosshair_color: [u8; 3],
    /// color of NaN pixels
    pub bad_color: [u8; 3],
    /// integer magnification, `None` scales the cutout to about 800 pixels
    pub scale: Option<u32>,
}
impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            vmin: -15f64,
            vmax: 5f64,
            colormap: Colormap::default(),
            crosshair_color: CROSSHAIR_COLOR,
            bad_color: [255u8; 3],
            scale: None,
        }
    }
}

/// A cutout ready to be rendered
#[derive(Debug, Clone)]
pub struct Figure {
    data: Array2<f64>,
    crosshair: PixelCoord,
    options: RenderOptions,
}
impl Figure {
    /// Creates the figure of a cutout, negating its values
    pub fn new(cutout: &Cutout, options: RenderOptions) -> Self {
        Self {
            data: cutout.data.mapv(|x| -x),
            crosshair: cutout.crosshair(),
            options,
        }
    }
    /// Displayed values, indexed `[y, x]` with row 0 at the bottom
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }
    /// Crosshair position in data pixels
    pub fn crosshair(&self) -> PixelCoord {
        self.crosshair
    }
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }
    /// Integer magnification applied when rendering
    pub fn scale(&self) -> u32 {
        self.options.scale.unwrap_or_else(|| {
            let (ny, nx) = self.data.dim();
            (TARGET_SIDE / nx.max(ny).max(1)).max(1) as u32
        })
    }
    /// Maps a value into [0, 1] within the intensity bounds
    pub fn normalize(&self, value: f64) -> f64 {
        let RenderOptions { vmin, vmax, .. } = self.options;
        let range = vmax - vmin;
        if range > 0f64 {
            ((value - vmin) / range).clamp(0f64, 1f64)
        } else if value < vmin {
            0f64
        } else {
            1f64
        }
    }
    /// Normalize the displayed data and apply the colormap
    fn data_to_rgb(&self) -> Vec<u8> {
        let (ny, nx) = self.data.dim();
        (0..ny)
            .rev()
            .flat_map(|y| (0..nx).map(move |x| (y, x)))
            .flat_map(|(y, x)| {
                let value = self.data[[y, x]];
                if value.is_nan() {
                    self.options.bad_color
                } else {
                    self.options.colormap.eval(self.normalize(value))
                }
            })
            .collect()
    }
    /// Renders the figure with the crosshair overlay
    pub fn to_image(&self) -> Result<RgbImage> {
        let (ny, nx) = self.data.dim();
        let (width, height) = (nx as u32, ny as u32);
        let scale = self.scale();
        let (scaled_width, scaled_height) = width
            .checked_mul(scale)
            .zip(height.checked_mul(scale))
            .ok_or(RenderError::Scale(width, height, scale))?;
        let image = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(width, height, self.data_to_rgb())
            .ok_or(RenderError::Image(width, height))?;

        let mut image = if scale > 1 {
            image::imageops::resize(
                &image,
                scaled_width,
                scaled_height,
                image::imageops::FilterType::Nearest,
            )
        } else {
            image
        };
        let (w, h) = (image.width() as i64, image.height() as i64);

        // data pixel i covers [i - 0.5, i + 0.5], i.e. image pixels [i * scale, (i + 1) * scale)
        let s = scale as f64;
        let column = ((self.crosshair.x + 0.5) * s).floor() as i64;
        let row = ((self.crosshair.y + 0.5) * s).floor() as i64;
        let x = column.clamp(0, w - 1) as f32;
        let y = (h - 1 - row).clamp(0, h - 1) as f32;
        let (w, h) = ((w - 1) as f32, (h - 1) as f32);
        let color = Rgb(self.options.crosshair_color);
        draw_line_segment_mut(&mut image, (x, 0f32), (x, h), color);
        draw_line_segment_mut(&mut image, (0f32, y), (w, y), color);

        Ok(image)
    }
    /// Renders the figure and saves it as a PNG file
    pub fn save(&self, filename: impl AsRef<Path>) -> Result<()> {
        let image = self.to_image()?;
        image
            .save(&filename)
            .map_err(|e| RenderError::Save(e, filename.as_ref().to_path_buf()))?;
        log::info!("figure saved to {:?}", filename.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutout::ExtractMode;

    fn cutout(n: usize) -> Cutout {
        let data = Array2::from_shape_fn((n, n), |(y, x)| x as f64 - y as f64);
        Cutout::new(
            &data,
            PixelCoord::new((n / 2) as f64, (n / 2) as f64),
            (n, n),
            None,
            ExtractMode::Trim,
        )
        .unwrap()
    }

    #[test]
    fn data_is_negated() {
        let cutout = cutout(9);
        let figure = Figure::new(&cutout, RenderOptions::default());
        for (shown, raw) in figure.data().iter().zip(cutout.data.iter()) {
            assert_eq!(*shown, -*raw);
        }
    }

    #[test]
    fn clipping() {
        let figure = Figure::new(&cutout(3), RenderOptions::default());
        assert_eq!(figure.normalize(-100.), 0.);
        assert_eq!(figure.normalize(100.), 1.);
        assert_eq!(figure.normalize(-5.), 0.5);
    }

    #[test]
    fn empty_intensity_range() {
        for (vmin, vmax) in [(0., 0.), (5., -5.)] {
            let figure = Figure::new(
                &cutout(3),
                RenderOptions {
                    vmin,
                    vmax,
                    ..Default::default()
                },
            );
            assert_eq!(figure.normalize(vmin - 1.), 0.);
            assert_eq!(figure.normalize(vmin), 1.);
            assert_eq!(figure.normalize(vmin + 1.), 1.);
        }
        // two levels only: the cutout ramp x - y is negated and thresholded at 0
        let figure = Figure::new(
            &cutout(3),
            RenderOptions {
                vmin: 0.,
                vmax: 0.,
                scale: Some(1),
                crosshair_color: [255, 0, 0],
                ..Default::default()
            },
        );
        let image = figure.to_image().unwrap();
        for pixel in image.pixels().filter(|p| p.0 != [255, 0, 0]) {
            assert!(pixel.0 == [0, 0, 0] || pixel.0 == [255, 255, 255], "{pixel:?}");
        }
        // data (x=2, y=0) = 2, shown as -2, below vmin: black in the bottom right
        assert_eq!(image.get_pixel(2, 2).0, [0, 0, 0]);
        // data (x=0, y=2) = -2, shown as 2: white in the top left
        assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn oversized_scale() {
        let figure = Figure::new(
            &cutout(3),
            RenderOptions {
                scale: Some(u32::MAX),
                ..Default::default()
            },
        );
        let err = figure.to_image().unwrap_err();
        assert!(matches!(err, RenderError::Scale(3, 3, u32::MAX)), "{err:?}");
    }

    #[test]
    fn origin_lower_left() {
        let mut data = Array2::zeros((3, 3));
        data[[0, 0]] = -100.;
        let cutout = Cutout::new(
            &data,
            PixelCoord::new(1., 1.),
            (3, 3),
            None,
            ExtractMode::Trim,
        )
        .unwrap();
        let figure = Figure::new(
            &cutout,
            RenderOptions {
                scale: Some(1),
                crosshair_color: [255, 0, 0],
                ..Default::default()
            },
        );
        let image = figure.to_image().unwrap();
        // data[0, 0] negated to +100, clipped to white, bottom left
        assert_eq!(image.get_pixel(0, 2).0, [255, 255, 255]);
        // 0 maps to (0 + 15) / 20
        let level = (0.75f64 * 255.).round() as u8;
        assert_eq!(image.get_pixel(2, 0).0, [level; 3]);
        // crosshair through the central pixel
        assert_eq!(image.get_pixel(1, 0).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(0, 1).0, [255, 0, 0]);
    }

    #[test]
    fn scaled_crosshair_on_boundary_for_even_sizes() {
        let figure = Figure::new(
            &cutout(10),
            RenderOptions {
                scale: Some(4),
                ..Default::default()
            },
        );
        assert_eq!(figure.crosshair(), PixelCoord::new(5.5, 5.5));
        let image = figure.to_image().unwrap();
        assert_eq!(image.dimensions(), (40, 40));
        // (5.5 + 0.5) * 4 = 24 image pixels from the left and from the bottom
        assert_eq!(image.get_pixel(24, 0).0, CROSSHAIR_COLOR);
        assert_eq!(image.get_pixel(0, 15).0, CROSSHAIR_COLOR);
        assert_ne!(image.get_pixel(23, 1).0, CROSSHAIR_COLOR);
    }

    #[test]
    fn automatic_scale() {
        let figure = Figure::new(&cutout(99), RenderOptions::default());
        assert_eq!(figure.scale(), 8);
        let figure = Figure::new(&cutout(1001), RenderOptions::default());
        assert_eq!(figure.scale(), 1);
    }

    #[test]
    fn nan_uses_bad_color() {
        let data = Array2::from_elem((2, 2), f64::NAN);
        let cutout = Cutout::new(
            &data,
            PixelCoord::new(0.5, 0.5),
            (2, 2),
            None,
            ExtractMode::Trim,
        )
        .unwrap();
        let figure = Figure::new(
            &cutout,
            RenderOptions {
                scale: Some(1),
                bad_color: [1, 2, 3],
                crosshair_color: [9, 9, 9],
                ..Default::default()
            },
        );
        let image = figure.to_image().unwrap();
        // the crosshair is clamped to the last column and the top row
        assert_eq!(image.get_pixel(0, 1).0, [1, 2, 3]);
        assert_eq!(image.get_pixel(1, 1).0, [9, 9, 9]);
        assert_eq!(image.get_pixel(0, 0).0, [9, 9, 9]);
    }
}
