//! # Exotransit
//!
//! Transit screening for Kepler light curves.
//!
//! A submission names a star and a dip threshold. The pipeline downloads the
//! star's light curve from MAST, normalizes it to a median of 1.0, flags every
//! sample below the threshold, renders a PNG plot of the result and lists the
//! confirmed planets the NASA Exoplanet Archive has for the host star.
//!
//! ## Architecture
//!
//! - [`models`]: light curves, thresholds, planet records and the result report
//! - [`lightcurve`]: the [`LightCurveProvider`](lightcurve::LightCurveProvider)
//!   seam, the MAST client and the FITS reader
//! - [`catalog`]: Exoplanet Archive TAP queries
//! - [`services`]: dip detection, plot rendering/storage and the pipeline
//! - [`config`]: TOML + environment configuration
//! - [`http`]: axum adapter (feature `http-server`)

pub mod catalog;
pub mod config;
pub mod error;
pub mod lightcurve;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;

pub use config::AppConfig;
pub use error::PipelineError;
pub use services::{Submission, TransitPipeline};
