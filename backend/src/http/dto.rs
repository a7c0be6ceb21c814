//! Request and response bodies for the HTTP adapter.

use serde::{Deserialize, Serialize};

use crate::services::Submission;

/// Form fields posted by the index page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub star_id: String,
    #[serde(default)]
    pub threshold: Option<String>,
}

impl From<SubmitForm> for Submission {
    fn from(form: SubmitForm) -> Self {
        Submission {
            star_id: form.star_id,
            threshold: form.threshold,
        }
    }
}

/// Threshold as sent by JSON clients: either `0.99` or `"0.99"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdInput {
    Number(f64),
    Text(String),
}

impl ThresholdInput {
    fn into_raw(self) -> String {
        match self {
            ThresholdInput::Number(value) => value.to_string(),
            ThresholdInput::Text(text) => text,
        }
    }
}

/// Body of `POST /v1/transits`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub star_id: String,
    #[serde(default)]
    pub threshold: Option<ThresholdInput>,
}

impl From<AnalyzeRequest> for Submission {
    fn from(request: AnalyzeRequest) -> Self {
        Submission {
            star_id: request.star_id,
            threshold: request.threshold.map(ThresholdInput::into_raw),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
