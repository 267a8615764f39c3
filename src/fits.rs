//! Read-only access to the primary HDU of a FITS image
//!
//! The primary array is loaded as `f64` (cfitsio applies `BSCALE`/`BZERO`)
//! into an [Array2] indexed `[y, x]`, row 0 being the first image row of the
//! file, i.e. the bottom of the sky image. The WCS related cards are read
//! alongside so that the file can be closed as soon as [FitsImage::load]
//! returns.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use fitsio::{errors::Error as FitsioError, hdu::HduInfo, FitsFile};
use ndarray::Array2;

/// The file cannot be accessed
#[derive(Debug, thiserror::Error)]
#[error("cannot access {path:?}")]
pub struct FileAccessError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// The file does not hold a parsable 2D primary image
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("failed to open FITS file {1:?}")]
    Open(#[source] FitsioError, PathBuf),
    #[error("failed to read the primary HDU")]
    Read(#[from] FitsioError),
    #[error("primary HDU is not an image")]
    NotAnImage,
    #[error("expected a 2D primary image, found NAXIS={0} with shape {1:?}")]
    Dimensions(i64, Vec<usize>),
    #[error("primary image holds {0} values for a {1}x{2} array")]
    Shape(usize, usize, usize),
    #[error("invalid world coordinate system")]
    Wcs(#[from] crate::wcs::WcsError),
}

/// Real valued WCS keywords read from the header
const REAL_KEYWORDS: &[&str] = &[
    "CRPIX1", "CRPIX2", "CRVAL1", "CRVAL2", "CDELT1", "CDELT2", "CROTA2", "CD1_1", "CD1_2",
    "CD2_1", "CD2_2", "PC1_1", "PC1_2", "PC2_1", "PC2_2", "LONPOLE", "LATPOLE", "EQUINOX",
    "A_ORDER", "B_ORDER", "AP_ORDER", "BP_ORDER",
];
/// String valued WCS keywords read from the header
const TEXT_KEYWORDS: &[&str] = &["CTYPE1", "CTYPE2", "CUNIT1", "CUNIT2", "RADESYS"];
/// Highest total degree of the SIP distortion coefficients
const SIP_DEGREE: usize = 6;

/// SIP coefficient keywords `{prefix}_i_j` with `i + j <= 6`
fn sip_keywords(prefix: &str) -> impl Iterator<Item = String> + '_ {
    (0..=SIP_DEGREE)
        .flat_map(|i| (0..=SIP_DEGREE - i).map(move |j| (i, j)))
        .map(move |(i, j)| format!("{prefix}_{i}_{j}"))
}

/// Header card value
#[derive(Debug, Clone, PartialEq)]
pub enum Card {
    Real(f64),
    Text(String),
}

/// The subset of header cards needed to rebuild the coordinate mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: BTreeMap<String, Card>,
}
impl Header {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn with_real(mut self, key: impl ToString, value: f64) -> Self {
        self.cards.insert(key.to_string(), Card::Real(value));
        self
    }
    pub fn with_text(mut self, key: impl ToString, value: impl ToString) -> Self {
        self.cards.insert(key.to_string(), Card::Text(value.to_string()));
        self
    }
    /// Returns a real valued card
    pub fn real(&self, key: &str) -> Option<f64> {
        match self.cards.get(key)? {
            Card::Real(value) => Some(*value),
            Card::Text(value) => value.trim().parse().ok(),
        }
    }
    /// Returns a string valued card with the FITS padding removed
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.cards.get(key)? {
            Card::Text(value) => Some(value.trim()),
            Card::Real(_) => None,
        }
    }
    pub fn contains(&self, key: &str) -> bool {
        self.cards.contains_key(key)
    }
    pub fn len(&self) -> usize {
        self.cards.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// FITS primary image and its WCS header cards
#[derive(Debug, Clone)]
pub struct FitsImage {
    pub data: Array2<f64>,
    pub header: Header,
}
impl FitsImage {
    /// Loads the primary HDU of a FITS file
    ///
    /// Images with more than 2 axes are accepted only if every extra axis has
    /// length 1.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let access_error = |source| FileAccessError {
            path: path.to_path_buf(),
            source,
        };
        let metadata = fs::metadata(path).map_err(access_error)?;
        if !metadata.is_file() {
            return Err(access_error(io::Error::other("not a regular file")).into());
        }

        let mut fptr =
            FitsFile::open(path).map_err(|e| FormatError::Open(e, path.to_path_buf()))?;
        let hdu = fptr.primary_hdu().map_err(FormatError::from)?;
        let shape = match &hdu.info {
            HduInfo::ImageInfo { shape, .. } => shape.clone(),
            _ => return Err(FormatError::NotAnImage.into()),
        };
        let naxis: i64 = hdu
            .read_key(&mut fptr, "NAXIS")
            .map_err(FormatError::from)?;
        let mut axes = Vec::with_capacity(naxis.max(0) as usize);
        for i in 1..=naxis {
            let n: i64 = hdu
                .read_key(&mut fptr, &format!("NAXIS{i}"))
                .map_err(FormatError::from)?;
            axes.push(n.max(0) as usize);
        }
        let (nx, ny) = match axes.as_slice() {
            [nx, ny, rest @ ..] if *nx > 0 && *ny > 0 && rest.iter().all(|&n| n == 1) => {
                (*nx, *ny)
            }
            _ => return Err(FormatError::Dimensions(naxis, shape).into()),
        };
        log::debug!("{path:?}: primary image {nx}x{ny} (NAXIS={naxis})");

        let values: Vec<f64> = hdu.read_image(&mut fptr).map_err(FormatError::from)?;
        let n_values = values.len();
        let data = Array2::from_shape_vec((ny, nx), values)
            .map_err(|_| FormatError::Shape(n_values, nx, ny))?;

        let mut header = Header::new()
            .with_real("NAXIS1", nx as f64)
            .with_real("NAXIS2", ny as f64);
        for &key in REAL_KEYWORDS {
            if let Ok(value) = hdu.read_key::<f64>(&mut fptr, key) {
                header = header.with_real(key, value);
            }
        }
        for prefix in ["A", "B", "AP", "BP"] {
            if !header.contains(&format!("{prefix}_ORDER")) {
                continue;
            }
            for key in sip_keywords(prefix) {
                if let Ok(value) = hdu.read_key::<f64>(&mut fptr, &key) {
                    header = header.with_real(key, value);
                }
            }
        }
        for &key in TEXT_KEYWORDS {
            if let Ok(value) = hdu.read_key::<String>(&mut fptr, key) {
                header = header.with_text(key, value);
            }
        }
        log::debug!("{path:?}: {} WCS cards", header.len());

        Ok(Self { data, header })
    }
    /// Image width (NAXIS1)
    pub fn width(&self) -> usize {
        self.data.ncols()
    }
    /// Image height (NAXIS2)
    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_accessors() {
        let header = Header::new()
            .with_real("CRPIX1", 50.5)
            .with_text("CTYPE1", "RA---TAN  ")
            .with_text("EQUINOX", " 2000.0");
        assert_eq!(header.real("CRPIX1"), Some(50.5));
        assert_eq!(header.text("CTYPE1"), Some("RA---TAN"));
        assert_eq!(header.real("EQUINOX"), Some(2000.));
        assert_eq!(header.text("CRPIX1"), None);
        assert_eq!(header.real("CRPIX2"), None);
        assert!(header.contains("CTYPE1"));
        assert_eq!(header.len(), 3);
    }

    #[test]
    fn sip_coefficient_names() {
        let keys: Vec<String> = sip_keywords("AP").collect();
        assert_eq!(keys.len(), 28);
        assert_eq!(keys[0], "AP_0_0");
        assert!(keys.contains(&"AP_2_4".to_string()));
        assert!(!keys.contains(&"AP_4_3".to_string()));
        assert_eq!(keys.last().map(String::as_str), Some("AP_6_0"));
    }

    #[test]
    fn missing_file() {
        let err = FitsImage::load("does/not/exist.fits").unwrap_err();
        assert!(matches!(err, crate::Error::FileAccess(_)), "{err:?}");
    }

    #[test]
    fn directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FitsImage::load(dir.path()).unwrap_err();
        assert!(matches!(err, crate::Error::FileAccess(_)), "{err:?}");
    }
}
