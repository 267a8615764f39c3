use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use fits_cutout::{
    AngleUnit, AngularSize, Colormap, CutoutViewer, ExtractMode, Frame, ViewerConfig,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Unit {
    Deg,
    Arcmin,
    Arcsec,
}
impl From<Unit> for AngleUnit {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::Deg => AngleUnit::Degree,
            Unit::Arcmin => AngleUnit::ArcMinute,
            Unit::Arcsec => AngleUnit::ArcSecond,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SkyFrame {
    Icrs,
    Fk5,
    Galactic,
}
impl From<SkyFrame> for Frame {
    fn from(frame: SkyFrame) -> Self {
        match frame {
            SkyFrame::Icrs => Frame::Icrs,
            SkyFrame::Fk5 => Frame::Fk5,
            SkyFrame::Galactic => Frame::Galactic,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Trim,
    Partial,
    Strict,
}
impl From<Mode> for ExtractMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Trim => ExtractMode::Trim,
            Mode::Partial => ExtractMode::Partial,
            Mode::Strict => ExtractMode::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Cmap {
    Gray,
    Cubehelix,
    Viridis,
}
impl From<Cmap> for Colormap {
    fn from(cmap: Cmap) -> Self {
        match cmap {
            Cmap::Gray => Colormap::Gray,
            Cmap::Cubehelix => Colormap::Cubehelix,
            Cmap::Viridis => Colormap::Viridis,
        }
    }
}

#[derive(Parser)]
#[command(name = "fits-cutout")]
#[command(about = "Render a FITS image cutout centered on a sky position")]
struct Args {
    /// FITS image file
    file: PathBuf,

    /// Cutout center: sky coordinates (e.g. "00h42m44.3s +41d16m09s") or,
    /// with --pixel, a "x y" pixel pair
    #[arg(allow_hyphen_values = true)]
    position: String,

    /// Cutout side length
    #[arg(short, long, default_value_t = 5.0)]
    size: f64,

    /// Unit of the cutout side length
    #[arg(long, value_enum, default_value_t = Unit::Arcmin)]
    unit: Unit,

    /// Interpret the position as 0-based pixel coordinates
    #[arg(long)]
    pixel: bool,

    /// Reference frame of the sky coordinates
    #[arg(long, value_enum, default_value_t = SkyFrame::Icrs)]
    frame: SkyFrame,

    /// Lower display intensity bound
    #[arg(long, default_value_t = -15.0, allow_negative_numbers = true)]
    vmin: f64,

    /// Upper display intensity bound
    #[arg(long, default_value_t = 5.0, allow_negative_numbers = true)]
    vmax: f64,

    /// Handling of cutouts crossing the image edges
    #[arg(long, value_enum, default_value_t = Mode::Trim)]
    mode: Mode,

    /// Colormap
    #[arg(long, value_enum, default_value_t = Cmap::Gray)]
    cmap: Cmap,

    /// Integer magnification of the rendered cutout (default: about 800 pixels wide)
    #[arg(long)]
    scale: Option<u32>,

    /// Output PNG file
    #[arg(short, long, default_value = "cutout.png")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    if args.vmin >= args.vmax {
        log::warn!(
            "vmin ({}) is not below vmax ({}), the cutout renders as a flat image",
            args.vmin,
            args.vmax
        );
    }

    let mut config = ViewerConfig::new()
        .sky_coords(!args.pixel)
        .frame(args.frame.into())
        .intensity(args.vmin, args.vmax)
        .mode(args.mode.into())
        .colormap(args.cmap.into());
    if let Some(scale) = args.scale {
        config = config.scale(scale);
    }
    let viewer = CutoutViewer::new(config);

    let size = AngularSize::new(args.size, args.unit.into());
    let figure = viewer
        .display_sized(&args.file, &args.position, size)
        .with_context(|| format!("failed to cut {:?} out of {:?}", args.position, args.file))?;

    let (ny, nx) = figure.data().dim();
    figure
        .save(&args.output)
        .with_context(|| format!("failed to write {:?}", args.output))?;
    println!(
        "{nx}x{ny} pixels cutout centered on {:?} saved to {:?}",
        args.position, args.output
    );

    Ok(())
}
