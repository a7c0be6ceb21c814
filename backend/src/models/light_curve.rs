//! Light-curve time series and flux normalization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building or normalizing a light curve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LightCurveError {
    #[error("time and flux columns differ in length ({time} vs {flux})")]
    LengthMismatch { time: usize, flux: usize },

    #[error("flux and flux_err columns differ in length ({flux} vs {flux_err})")]
    ErrorLengthMismatch { flux: usize, flux_err: usize },

    #[error("light curve has no finite flux values")]
    NoFiniteFlux,

    #[error("median flux {0} is not strictly positive")]
    NonPositiveMedian(f64),
}

/// Descriptive metadata carried alongside the samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightCurveMeta {
    /// Target name as reported by the data product (FITS `OBJECT`)
    pub target: String,
    /// Mission that produced the data (e.g. "Kepler")
    pub mission: String,
    /// Product description, e.g. the file name or quarter
    pub label: Option<String>,
}

/// Ordered brightness samples, one per cadence.
///
/// Flux may contain NaN for missing observations.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCurve {
    time: Vec<f64>,
    flux: Vec<f64>,
    flux_err: Option<Vec<f64>>,
    pub meta: LightCurveMeta,
}

impl LightCurve {
    /// Build a light curve, enforcing equal column lengths.
    pub fn new(time: Vec<f64>, flux: Vec<f64>) -> Result<Self, LightCurveError> {
        if time.len() != flux.len() {
            return Err(LightCurveError::LengthMismatch {
                time: time.len(),
                flux: flux.len(),
            });
        }
        Ok(Self {
            time,
            flux,
            flux_err: None,
            meta: LightCurveMeta::default(),
        })
    }

    /// Attach a per-sample flux uncertainty column.
    pub fn with_flux_err(mut self, flux_err: Vec<f64>) -> Result<Self, LightCurveError> {
        if flux_err.len() != self.flux.len() {
            return Err(LightCurveError::ErrorLengthMismatch {
                flux: self.flux.len(),
                flux_err: flux_err.len(),
            });
        }
        self.flux_err = Some(flux_err);
        Ok(self)
    }

    pub fn with_meta(mut self, meta: LightCurveMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn flux_err(&self) -> Option<&[f64]> {
        self.flux_err.as_deref()
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Library normalization: divide flux (and its uncertainty) by the median flux.
    ///
    /// Refuses curves without finite flux and curves whose median is not a
    /// strictly positive number, since dividing by those would not centre the
    /// series on 1.0.
    pub fn normalize(&self) -> Result<NormalizedLightCurve, LightCurveError> {
        let median = nan_median(&self.flux).ok_or(LightCurveError::NoFiniteFlux)?;
        if !(median.is_finite() && median > 0.0) {
            return Err(LightCurveError::NonPositiveMedian(median));
        }
        Ok(NormalizedLightCurve {
            curve: self.scaled_by(median),
            path: NormalizationPath::Primary,
        })
    }

    /// Normalize, falling back to a plain median division when the library
    /// path refuses. Never fails.
    pub fn normalize_or_fallback(&self) -> NormalizedLightCurve {
        match self.normalize() {
            Ok(normalized) => normalized,
            Err(reason) => {
                tracing::warn!(%reason, "primary normalization refused, using median fallback");
                let median = nan_median(&self.flux).unwrap_or(f64::NAN);
                NormalizedLightCurve {
                    curve: self.scaled_by(median),
                    path: NormalizationPath::MedianFallback {
                        reason: reason.to_string(),
                    },
                }
            }
        }
    }

    fn scaled_by(&self, divisor: f64) -> LightCurve {
        LightCurve {
            time: self.time.clone(),
            flux: self.flux.iter().map(|f| f / divisor).collect(),
            flux_err: self
                .flux_err
                .as_ref()
                .map(|errs| errs.iter().map(|e| e / divisor).collect()),
            meta: self.meta.clone(),
        }
    }
}

/// Which normalization branch produced a [`NormalizedLightCurve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizationPath {
    Primary,
    MedianFallback { reason: String },
}

impl NormalizationPath {
    pub fn is_fallback(&self) -> bool {
        matches!(self, NormalizationPath::MedianFallback { .. })
    }
}

/// A light curve whose flux is centred on a median of 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLightCurve {
    curve: LightCurve,
    path: NormalizationPath,
}

impl NormalizedLightCurve {
    pub fn curve(&self) -> &LightCurve {
        &self.curve
    }

    pub fn time(&self) -> &[f64] {
        self.curve.time()
    }

    pub fn flux(&self) -> &[f64] {
        self.curve.flux()
    }

    pub fn path(&self) -> &NormalizationPath {
        &self.path
    }
}

/// Median of the non-NaN values, or `None` when every value is NaN.
pub fn nan_median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(f64::total_cmp);
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        Some((finite[mid - 1] + finite[mid]) / 2.0)
    } else {
        Some(finite[mid])
    }
}
