//! Threshold dip detection.

use crate::models::DetectionSummary;

/// Per-sample dip classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DipDetection {
    /// `true` where the sample lies strictly below the threshold
    pub mask: Vec<bool>,
    pub has_dip: bool,
}

impl DipDetection {
    pub fn dip_count(&self) -> usize {
        self.mask.iter().filter(|&&dip| dip).count()
    }

    pub fn dip_indices(&self) -> Vec<usize> {
        self.mask
            .iter()
            .enumerate()
            .filter_map(|(i, &dip)| dip.then_some(i))
            .collect()
    }

    pub fn summary(&self) -> DetectionSummary {
        DetectionSummary {
            samples: self.mask.len(),
            dip_count: self.dip_count(),
            has_dip: self.has_dip,
        }
    }
}

/// Flag every sample with `flux < threshold`.
///
/// Equality is not a dip, and NaN never compares below anything.
pub fn detect_dips(flux: &[f64], threshold: f64) -> DipDetection {
    let mask: Vec<bool> = flux.iter().map(|&f| f < threshold).collect();
    let has_dip = mask.iter().any(|&dip| dip);
    DipDetection { mask, has_dip }
}
