//! Service layer: dip detection, plot rendering and the pipeline that ties
//! them to the remote collaborators.

pub mod dip_detector;
mod glyphs;
pub mod pipeline;
pub mod plot_renderer;
pub mod plot_store;

pub use dip_detector::{detect_dips, DipDetection};
pub use pipeline::{PipelineSettings, Submission, TransitPipeline};
pub use plot_renderer::{PlotRenderer, PlotRequest, PngPlotRenderer};
pub use plot_store::{PlotArtifact, PlotStore, RenderError, SHARED_PLOT_KEY};
