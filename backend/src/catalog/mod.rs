//! Exoplanet catalog queries.
//!
//! Host-name resolution and the confirmed-planet lookup are both optional
//! steps of the pipeline: any [`CatalogError`] is absorbed by the caller and
//! turned into an empty result.

pub mod tap;

pub use tap::ExoplanetArchiveClient;

use crate::models::PlanetRecord;

/// Errors from the catalog service.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request timed out")]
    Timeout,

    #[error("catalog request failed: {0}")]
    Http(String),

    #[error("catalog returned HTTP {0}")]
    Status(u16),

    #[error("failed to decode catalog response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout
        } else if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Http(err.to_string())
        }
    }
}

/// Catalog operations the pipeline depends on.
pub trait ExoplanetCatalog: Send + Sync {
    /// Map a partial identifier to a canonical host star name.
    ///
    /// `Ok(None)` means the catalog had no match.
    fn resolve_host(&self, star_id: &str) -> Result<Option<String>, CatalogError>;

    /// Confirmed planets orbiting exactly `host`.
    fn confirmed_planets(&self, host: &str) -> Result<Vec<PlanetRecord>, CatalogError>;
}
