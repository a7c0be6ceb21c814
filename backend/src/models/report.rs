//! Result payload assembled by the transit pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::light_curve::NormalizationPath;
use super::planet::PlanetRecord;
use super::threshold::Threshold;

/// Pipeline states, in execution order.
///
/// `Failed` is terminal and only reachable from `Fetching`, `Normalizing`,
/// `Detecting` and `Rendering`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Resolving,
    Fetching,
    Normalizing,
    Detecting,
    Rendering,
    CatalogLookup,
    Done,
    Failed,
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    MissingIdentifier,
    NotFound,
    Completed,
    Failed,
}

/// Summary of the dip mask, kept small enough to serialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub samples: usize,
    pub dip_count: usize,
    pub has_dip: bool,
}

/// Everything the presentation layer needs to show one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitReport {
    pub request_id: Uuid,
    /// Identifier as submitted (trimmed)
    pub star_id: String,
    /// Host name used for the confirmed-planet query
    pub host_name: Option<String>,
    pub threshold: Threshold,
    pub message: String,
    /// Root-relative URL of the rendered plot
    pub plot_url: Option<String>,
    pub planets: Vec<PlanetRecord>,
    pub detection: Option<DetectionSummary>,
    pub normalization: Option<NormalizationPath>,
    pub outcome: OutcomeKind,
    pub stages: Vec<PipelineStage>,
    pub catalog_degraded: bool,
    pub generated_at: DateTime<Utc>,
}

impl TransitReport {
    pub(crate) fn new(request_id: Uuid, star_id: String, threshold: Threshold) -> Self {
        Self {
            request_id,
            star_id,
            host_name: None,
            threshold,
            message: String::new(),
            plot_url: None,
            planets: Vec::new(),
            detection: None,
            normalization: None,
            outcome: OutcomeKind::Completed,
            stages: vec![PipelineStage::Idle],
            catalog_degraded: false,
            generated_at: Utc::now(),
        }
    }

    pub fn final_stage(&self) -> PipelineStage {
        self.stages.last().copied().unwrap_or(PipelineStage::Idle)
    }

    pub fn has_dip(&self) -> bool {
        self.detection.map(|d| d.has_dip).unwrap_or(false)
    }
}
