use crate::{
    coords::ParseError,
    cutout::BoundsError,
    fits::{FileAccessError, FormatError},
    render::RenderError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("FITS file cannot be accessed")]
    FileAccess(#[from] FileAccessError),
    #[error("FITS file cannot be parsed")]
    Format(#[from] FormatError),
    #[error("position cannot be parsed")]
    Parse(#[from] ParseError),
    #[error("cutout is out of the image bounds")]
    Bounds(#[from] BoundsError),
    #[error("figure cannot be rendered")]
    Render(#[from] RenderError),
}
