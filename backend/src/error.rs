//! Pipeline error taxonomy.

use crate::lightcurve::ProviderError;
use crate::services::plot_store::RenderError;

/// Every way a pipeline run can end without a completed report.
///
/// Catalog failures are absent on purpose: the pipeline absorbs them and
/// degrades to an empty planet list.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no star identifier was provided")]
    MissingIdentifier,

    #[error("no {mission} light curve found for '{star_id}'")]
    NotFound { star_id: String, mission: String },

    #[error("light-curve search failed: {0}")]
    Search(#[source] ProviderError),

    #[error("light-curve download failed: {0}")]
    Download(#[source] ProviderError),

    #[error("plot rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Message shown to the user for this outcome.
    pub fn user_message(&self, star_id: &str) -> String {
        match self {
            PipelineError::MissingIdentifier => {
                "Please enter a star ID (e.g. KIC 11446443).".to_string()
            }
            PipelineError::NotFound { star_id, mission } => {
                format!("No {} light curve found for '{}'. Try another ID.", mission, star_id)
            }
            other => format!("Error while processing '{}': {}", star_id, other),
        }
    }

    /// Build an [`Unexpected`](PipelineError::Unexpected) from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "worker panicked".to_string());
        PipelineError::Unexpected(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_identifier_message() {
        assert_eq!(
            PipelineError::MissingIdentifier.user_message(""),
            "Please enter a star ID (e.g. KIC 11446443)."
        );
    }

    #[test]
    fn test_not_found_message_names_mission() {
        let err = PipelineError::NotFound {
            star_id: "KIC 0".to_string(),
            mission: "Kepler".to_string(),
        };
        assert_eq!(
            err.user_message("KIC 0"),
            "No Kepler light curve found for 'KIC 0'. Try another ID."
        );
    }

    #[test]
    fn test_processing_failure_message() {
        let err = PipelineError::Download(ProviderError::Timeout);
        assert_eq!(
            err.user_message("KIC 1"),
            "Error while processing 'KIC 1': light-curve download failed: \
             request to light-curve archive timed out"
        );
    }

    #[test]
    fn test_from_panic_payloads() {
        let err = PipelineError::from_panic(Box::new("boom"));
        assert!(matches!(err, PipelineError::Unexpected(ref s) if s == "boom"));

        let err = PipelineError::from_panic(Box::new(String::from("owned")));
        assert!(matches!(err, PipelineError::Unexpected(ref s) if s == "owned"));

        let err = PipelineError::from_panic(Box::new(7u8));
        assert!(matches!(err, PipelineError::Unexpected(ref s) if s == "worker panicked"));
    }
}
