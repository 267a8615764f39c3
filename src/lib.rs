/*!
# FITS cutouts

Extracts a square cutout around a sky (or pixel) position from the primary
image of a FITS file and turns it into a [Figure]: the negated cutout shown
in grayscale within fixed intensity bounds, with crosshairs through the
cutout center.

```rust,no_run
use fits_cutout::display;

let figure = display("m31.fits", "00h42m44.3s +41d16m09s", 5., true, -15., 5.)?;
figure.save("m31_cutout.png")?;
# Ok::<(), Box<dyn std::error::Error>>(())
```

The [CutoutViewer] exposes the same operation with the full set of
[ViewerConfig] options (reference frame, edge handling, colormap, ...).
*/

pub mod angle;
pub mod coords;
pub mod cutout;
mod error;
pub mod fits;
pub mod render;
pub mod viewer;
pub mod wcs;

pub use angle::{AngleUnit, AngularSize};
pub use coords::{Frame, PixelCoord, Position, SkyCoord};
pub use cutout::{center_index, Cutout, ExtractMode};
pub use error::Error;
pub use render::{Colormap, Figure, RenderOptions};
pub use viewer::{display, CutoutViewer, ViewerConfig};
pub use wcs::Wcs;

pub type Result<T> = std::result::Result<T, Error>;
