//! Transit screening pipeline.
//!
//! One [`TransitPipeline::run`] call handles one submission end to end:
//! resolve the host name, fetch and normalize a light curve, flag dips,
//! render the plot and look up confirmed planets. The run is synchronous;
//! callers on an async runtime should move it to a blocking thread.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dip_detector::detect_dips;
use super::plot_renderer::{PlotRenderer, PlotRequest, PngPlotRenderer};
use super::plot_store::PlotStore;
use crate::catalog::{ExoplanetArchiveClient, ExoplanetCatalog};
use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::lightcurve::{FitsReadOptions, LightCurveProvider, MastClient};
use crate::models::{OutcomeKind, PipelineStage, Threshold, TransitReport};

/// Appended to the headline when the planet query fails.
pub const CATALOG_UNAVAILABLE_NOTICE: &str = " Confirmed planet data is currently unavailable.";

/// A user submission, as received.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Submission {
    pub star_id: String,
    /// Raw threshold text; parsed leniently
    #[serde(default)]
    pub threshold: Option<String>,
}

impl Submission {
    pub fn new(star_id: impl Into<String>, threshold: Option<&str>) -> Self {
        Self {
            star_id: star_id.into(),
            threshold: threshold.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Mission the light-curve search is restricted to
    pub mission: String,
    pub default_threshold: f64,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            mission: config.lightcurve.mission.clone(),
            default_threshold: config.detection.default_threshold,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Orchestrates the collaborators for a single request.
pub struct TransitPipeline {
    provider: Box<dyn LightCurveProvider>,
    catalog: Box<dyn ExoplanetCatalog>,
    renderer: Box<dyn PlotRenderer>,
    settings: PipelineSettings,
}

impl TransitPipeline {
    pub fn new(
        provider: Box<dyn LightCurveProvider>,
        catalog: Box<dyn ExoplanetCatalog>,
        renderer: Box<dyn PlotRenderer>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            catalog,
            renderer,
            settings,
        }
    }

    /// Pipeline wired to MAST and the Exoplanet Archive.
    ///
    /// The HTTP clients are created here, so build one pipeline per request
    /// on the thread that will run it.
    pub fn from_config(config: &AppConfig, store: PlotStore) -> Result<Self, PipelineError> {
        let timeout = config.remote.timeout();
        let read_options = FitsReadOptions {
            flux_column: config.lightcurve.flux_column.clone(),
            quality_bitmask: config.lightcurve.quality_bitmask,
        };

        let provider = MastClient::new(
            &config.remote.mast_url,
            timeout,
            config.remote.search_radius_deg,
            read_options,
        )
        .map_err(PipelineError::Search)?;
        let catalog = ExoplanetArchiveClient::new(&config.remote.tap_url, timeout)
            .map_err(|e| PipelineError::Unexpected(format!("catalog client: {}", e)))?;
        let renderer = PngPlotRenderer::new(store, config.plots.width, config.plots.height);

        Ok(Self::new(
            Box::new(provider),
            Box::new(catalog),
            Box::new(renderer),
            PipelineSettings::from_config(config),
        ))
    }

    /// Process one submission. Never fails: every outcome is a report.
    pub fn run(&self, submission: &Submission) -> TransitReport {
        let request_id = Uuid::new_v4();
        let star_id = submission.star_id.trim().to_string();
        let threshold = Threshold::parse(
            submission.threshold.as_deref(),
            self.settings.default_threshold,
        );

        let span = tracing::info_span!("transit_pipeline", %request_id, star_id = %star_id);
        let _entered = span.enter();

        let mut report = TransitReport::new(request_id, star_id.clone(), threshold);

        if star_id.is_empty() {
            self.finish_with(&mut report, PipelineError::MissingIdentifier);
            return report;
        }

        if report.threshold.is_fallback() {
            warn!(
                threshold = report.threshold.value,
                "submitted threshold unusable, using default"
            );
        }
        info!(
            threshold = report.threshold.value,
            mission = %self.settings.mission,
            "processing submission"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(&mut report)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.finish_with(&mut report, err),
            Err(payload) => self.finish_with(&mut report, PipelineError::from_panic(payload)),
        }

        info!(
            outcome = ?report.outcome,
            has_dip = report.has_dip(),
            catalog_degraded = report.catalog_degraded,
            "submission processed"
        );
        report
    }

    fn execute(&self, report: &mut TransitReport) -> Result<(), PipelineError> {
        let star_id = report.star_id.clone();
        let threshold = report.threshold.value;

        advance(report, PipelineStage::Resolving);
        let host = self.resolve_host(&star_id).unwrap_or_else(|| star_id.clone());
        report.host_name = Some(host.clone());

        advance(report, PipelineStage::Fetching);
        let products = self
            .provider
            .search(&star_id, &self.settings.mission)
            .map_err(PipelineError::Search)?;
        let Some(product) = products.first() else {
            return Err(PipelineError::NotFound {
                star_id,
                mission: self.settings.mission.clone(),
            });
        };
        debug!(
            products = products.len(),
            filename = %product.filename,
            "downloading first light-curve product"
        );
        let curve = self
            .provider
            .download(product)
            .map_err(PipelineError::Download)?;

        advance(report, PipelineStage::Normalizing);
        let normalized = curve.normalize_or_fallback();
        report.normalization = Some(normalized.path().clone());

        advance(report, PipelineStage::Detecting);
        let detection = detect_dips(normalized.flux(), threshold);
        report.detection = Some(detection.summary());

        advance(report, PipelineStage::Rendering);
        let title = format!("Light Curve for {}", star_id);
        let artifact = self.renderer.render(&PlotRequest {
            request_id: report.request_id,
            star_id: &star_id,
            title: &title,
            time: normalized.time(),
            flux: normalized.flux(),
            mask: &detection.mask,
            threshold,
        })?;
        report.plot_url = Some(artifact.url);

        report.message = if detection.has_dip {
            format!("Possible transit event(s) detected in {}!", star_id)
        } else {
            format!("No clear transit found for {}.", star_id)
        };

        advance(report, PipelineStage::CatalogLookup);
        match self.catalog.confirmed_planets(&host) {
            Ok(planets) => report.planets = planets,
            Err(e) => {
                warn!(error = %e, host = %host, "confirmed-planet lookup failed");
                report.catalog_degraded = true;
                report.message.push_str(CATALOG_UNAVAILABLE_NOTICE);
            }
        }

        report.outcome = OutcomeKind::Completed;
        advance(report, PipelineStage::Done);
        Ok(())
    }

    /// Best-effort host lookup; `None` means "use the submitted id".
    fn resolve_host(&self, star_id: &str) -> Option<String> {
        match self.catalog.resolve_host(star_id) {
            Ok(Some(host)) => {
                debug!(host = %host, "resolved host name");
                Some(host)
            }
            Ok(None) => {
                debug!("no catalog match, using submitted identifier");
                None
            }
            Err(e) => {
                warn!(error = %e, "host resolution failed, using submitted identifier");
                None
            }
        }
    }

    fn finish_with(&self, report: &mut TransitReport, err: PipelineError) {
        report.message = err.user_message(&report.star_id);
        match err {
            PipelineError::MissingIdentifier => {
                report.outcome = OutcomeKind::MissingIdentifier;
                advance(report, PipelineStage::Done);
            }
            PipelineError::NotFound { .. } => {
                info!(mission = %self.settings.mission, "no light curve found");
                report.outcome = OutcomeKind::NotFound;
                advance(report, PipelineStage::Done);
            }
            err => {
                warn!(error = %err, stage = ?report.final_stage(), "pipeline failed");
                report.outcome = OutcomeKind::Failed;
                report.plot_url = None;
                advance(report, PipelineStage::Failed);
            }
        }
    }
}

fn advance(report: &mut TransitReport, stage: PipelineStage) {
    debug!(from = ?report.final_stage(), to = ?stage, "stage transition");
    report.stages.push(stage);
}
