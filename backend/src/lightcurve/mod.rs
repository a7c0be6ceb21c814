//! Light-curve acquisition.
//!
//! [`LightCurveProvider`] is the seam between the pipeline and the archive
//! that serves time-series products. [`MastClient`] implements it against the
//! MAST portal API and reads the downloaded Kepler FITS files with cfitsio.

pub mod fits;
pub mod mast;

pub use fits::{read_light_curve, FitsReadOptions};
pub use mast::MastClient;

use serde::{Deserialize, Serialize};

use crate::models::{LightCurve, LightCurveError};

/// Errors from searching or downloading light curves.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request to light-curve archive timed out")]
    Timeout,

    #[error("light-curve archive request failed: {0}")]
    Http(String),

    #[error("light-curve archive returned HTTP {0}")]
    Status(u16),

    #[error("failed to decode archive response: {0}")]
    Decode(String),

    #[error("failed to read FITS light curve: {0}")]
    Fits(String),

    #[error("I/O error while staging download: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed light curve: {0}")]
    MalformedCurve(#[from] LightCurveError),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Decode(err.to_string())
        } else {
            ProviderError::Http(err.to_string())
        }
    }
}

impl From<fitsio::errors::Error> for ProviderError {
    fn from(err: fitsio::errors::Error) -> Self {
        ProviderError::Fits(err.to_string())
    }
}

/// Cadence of a Kepler light-curve product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// ~30 minute sampling (`LLC`)
    Long,
    /// ~1 minute sampling (`SLC`)
    Short,
}

/// A downloadable light-curve data product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightCurveProduct {
    pub obs_id: String,
    pub target_name: String,
    pub mission: String,
    pub data_uri: String,
    pub filename: String,
    pub cadence: Cadence,
}

/// Source of light-curve products.
pub trait LightCurveProvider: Send + Sync {
    /// Products for `target` restricted to `mission`, in the archive's order.
    fn search(
        &self,
        target: &str,
        mission: &str,
    ) -> Result<Vec<LightCurveProduct>, ProviderError>;

    /// Download one product into a light curve.
    fn download(&self, product: &LightCurveProduct) -> Result<LightCurve, ProviderError>;
}
