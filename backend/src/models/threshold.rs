//! Dip threshold parsing.

use serde::{Deserialize, Serialize};

/// Flux level below which a normalized sample is flagged as a candidate dip.
pub const DEFAULT_THRESHOLD: f64 = 0.995;

/// Where the effective threshold value came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdSource {
    /// Parsed from user input
    Supplied,
    /// No value was submitted
    Default,
    /// A value was submitted but could not be used
    Fallback { raw: String },
}

/// Effective threshold plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    pub source: ThresholdSource,
}

impl Threshold {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            source: ThresholdSource::Supplied,
        }
    }

    /// Best-effort parse of a submitted threshold.
    ///
    /// Missing, blank, unparsable and non-finite inputs all resolve to
    /// `default` without surfacing an error.
    pub fn parse(raw: Option<&str>, default: f64) -> Self {
        let Some(raw) = raw else {
            return Self {
                value: default,
                source: ThresholdSource::Default,
            };
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self {
                value: default,
                source: ThresholdSource::Default,
            };
        }

        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Self::new(value),
            _ => {
                tracing::debug!(raw = %raw, default, "unusable threshold, using default");
                Self {
                    value: default,
                    source: ThresholdSource::Fallback {
                        raw: raw.to_string(),
                    },
                }
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, ThresholdSource::Fallback { .. })
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self {
            value: DEFAULT_THRESHOLD,
            source: ThresholdSource::Default,
        }
    }
}
