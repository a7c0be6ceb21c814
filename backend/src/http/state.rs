//! Application state for the HTTP server.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::services::{PlotStore, TransitPipeline};

/// Builds a fresh pipeline for each request.
///
/// Called on the blocking thread that runs the request, so implementations
/// may create blocking HTTP clients.
pub trait PipelineFactory: Send + Sync {
    fn build(&self) -> Result<TransitPipeline, PipelineError>;
}

/// Factory for pipelines backed by MAST and the Exoplanet Archive.
pub struct RemotePipelineFactory {
    config: Arc<AppConfig>,
    store: PlotStore,
}

impl RemotePipelineFactory {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let store = PlotStore::from_settings(&config.plots);
        Self { config, store }
    }
}

impl PipelineFactory for RemotePipelineFactory {
    fn build(&self) -> Result<TransitPipeline, PipelineError> {
        TransitPipeline::from_config(&self.config, self.store.clone())
    }
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipelines: Arc<dyn PipelineFactory>,
}

impl AppState {
    /// State wired to the remote services named in `config`.
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let pipelines = Arc::new(RemotePipelineFactory::new(Arc::clone(&config)));
        Self { config, pipelines }
    }

    pub fn with_factory(config: AppConfig, pipelines: Arc<dyn PipelineFactory>) -> Self {
        Self {
            config: Arc::new(config),
            pipelines,
        }
    }
}
