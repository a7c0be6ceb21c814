//! Kepler light-curve FITS reader.

use fitsio::hdu::FitsHdu;
use fitsio::FitsFile;
use std::path::Path;

use super::ProviderError;
use crate::models::{LightCurve, LightCurveMeta};

/// Column selection and cadence filtering for [`read_light_curve`].
#[derive(Debug, Clone)]
pub struct FitsReadOptions {
    /// Flux column, e.g. `PDCSAP_FLUX` or `SAP_FLUX`
    pub flux_column: String,
    /// Cadences whose quality word intersects this mask are dropped
    pub quality_bitmask: u32,
}

impl Default for FitsReadOptions {
    fn default() -> Self {
        Self {
            flux_column: "PDCSAP_FLUX".to_string(),
            quality_bitmask: 1130799,
        }
    }
}

/// Load the `LIGHTCURVE` extension of a Kepler/K2 light-curve file.
pub fn read_light_curve(
    path: &Path,
    options: &FitsReadOptions,
) -> Result<LightCurve, ProviderError> {
    let mut fptr = FitsFile::open(path)?;

    let primary = fptr.primary_hdu()?;
    let target = read_key_optional::<String>(&primary, &mut fptr, "OBJECT").unwrap_or_default();
    let mission = read_key_optional::<String>(&primary, &mut fptr, "TELESCOP")
        .or_else(|| read_key_optional(&primary, &mut fptr, "MISSION"))
        .unwrap_or_default();

    let hdu = match fptr.hdu("LIGHTCURVE") {
        Ok(hdu) => hdu,
        Err(_) => fptr.hdu(1)?,
    };

    let time: Vec<f64> = hdu.read_col(&mut fptr, "TIME")?;
    let flux: Vec<f64> = hdu.read_col(&mut fptr, &options.flux_column)?;
    let flux_err: Option<Vec<f64>> = hdu
        .read_col(&mut fptr, &format!("{}_ERR", options.flux_column))
        .ok();
    let quality: Option<Vec<i32>> = hdu
        .read_col(&mut fptr, "SAP_QUALITY")
        .or_else(|_| hdu.read_col(&mut fptr, "QUALITY"))
        .ok();

    if time.len() != flux.len() {
        return Err(ProviderError::MalformedCurve(
            crate::models::LightCurveError::LengthMismatch {
                time: time.len(),
                flux: flux.len(),
            },
        ));
    }

    let keep = select_cadences(&time, quality.as_deref(), options.quality_bitmask);
    tracing::debug!(
        cadences = time.len(),
        kept = keep.len(),
        flux_column = %options.flux_column,
        "read light-curve table"
    );

    let pick = |column: &[f64]| keep.iter().map(|&i| column[i]).collect::<Vec<_>>();
    let mut curve = LightCurve::new(pick(&time), pick(&flux))?;
    if let Some(errs) = flux_err.filter(|e| e.len() == flux.len()) {
        curve = curve.with_flux_err(pick(&errs))?;
    }

    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());

    Ok(curve.with_meta(LightCurveMeta {
        target,
        mission,
        label,
    }))
}

/// Indices of cadences with a finite timestamp and no masked quality flags.
pub fn select_cadences(time: &[f64], quality: Option<&[i32]>, bitmask: u32) -> Vec<usize> {
    time.iter()
        .enumerate()
        .filter(|(i, t)| {
            let flagged = quality
                .and_then(|q| q.get(*i))
                .map(|&q| (q as u32) & bitmask != 0)
                .unwrap_or(false);
            t.is_finite() && !flagged
        })
        .map(|(i, _)| i)
        .collect()
}

fn read_key_optional<T: fitsio::headers::ReadsKey>(
    hdu: &FitsHdu,
    fptr: &mut FitsFile,
    key: &str,
) -> Option<T> {
    hdu.read_key::<T>(fptr, key).ok()
}
