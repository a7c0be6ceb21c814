//! MAST portal client for Kepler/K2 light-curve products.
//!
//! A search is three portal calls: resolve the name to coordinates, list
//! time-series observations of the mission around that position, then list
//! the light-curve files attached to those observations.

use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use std::time::Duration;

use super::fits::{read_light_curve, FitsReadOptions};
use super::{Cadence, LightCurveProduct, LightCurveProvider, ProviderError};
use crate::models::LightCurve;

/// Blocking MAST client.
#[derive(Debug, Clone)]
pub struct MastClient {
    client: reqwest::blocking::Client,
    invoke_url: String,
    download_url: String,
    search_radius_deg: f64,
    read_options: FitsReadOptions,
}

impl MastClient {
    /// Create a client rooted at `base_url` (e.g. `https://mast.stsci.edu`).
    pub fn new(
        base_url: &str,
        timeout: Duration,
        search_radius_deg: f64,
        read_options: FitsReadOptions,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Http(format!("failed to build HTTP client: {}", e)))?;

        let root = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            invoke_url: format!("{}/api/v0/invoke", root),
            download_url: format!("{}/api/v0.1/Download/file", root),
            search_radius_deg,
            read_options,
        })
    }

    /// POST a portal service request and decode its JSON reply.
    fn invoke<T: for<'de> Deserialize<'de>>(
        &self,
        request: serde_json::Value,
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(&self.invoke_url)
            .form(&[("request", request.to_string())])
            .send()?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    fn resolve_position(&self, target: &str) -> Result<Option<(f64, f64)>, ProviderError> {
        let reply: NameLookupResponse = self.invoke(json!({
            "service": "Mast.Name.Lookup",
            "params": { "input": target, "format": "json" },
            "format": "json",
        }))?;

        Ok(reply
            .resolved_coordinate
            .into_iter()
            .find_map(|c| Some((c.ra?, c.decl?))))
    }

    fn observations(
        &self,
        ra: f64,
        dec: f64,
        mission: &str,
    ) -> Result<Vec<ObservationRow>, ProviderError> {
        let reply: TableResponse<ObservationRow> = self.invoke(json!({
            "service": "Mast.Caom.Filtered.Position",
            "format": "json",
            "params": {
                "columns": "obsid,obs_id,target_name,obs_collection,t_min",
                "filters": [
                    { "paramName": "obs_collection", "values": [mission] },
                    { "paramName": "dataproduct_type", "values": ["timeseries"] },
                ],
                "position": format!("{}, {}, {}", ra, dec, self.search_radius_deg),
            },
        }))?;

        let mut rows = reply.data;
        rows.sort_by(|a, b| {
            a.t_min
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.t_min.unwrap_or(f64::INFINITY))
        });
        Ok(rows)
    }

    fn products(&self, observations: &[ObservationRow]) -> Result<Vec<ProductRow>, ProviderError> {
        let obsids = observations
            .iter()
            .map(|o| id_key(&o.obsid))
            .collect::<Vec<_>>()
            .join(",");

        let reply: TableResponse<ProductRow> = self.invoke(json!({
            "service": "Mast.Caom.Products",
            "params": { "obsid": obsids },
            "format": "json",
        }))?;
        Ok(reply.data)
    }
}

impl LightCurveProvider for MastClient {
    fn search(
        &self,
        target: &str,
        mission: &str,
    ) -> Result<Vec<LightCurveProduct>, ProviderError> {
        let Some((ra, dec)) = self.resolve_position(target)? else {
            tracing::info!(target, "MAST could not resolve target name");
            return Ok(Vec::new());
        };

        let observations = self.observations(ra, dec, mission)?;
        if observations.is_empty() {
            return Ok(Vec::new());
        }

        let products = self.products(&observations)?;
        let found = light_curve_products(&observations, products, mission);
        tracing::debug!(
            target,
            mission,
            observations = observations.len(),
            products = found.len(),
            "MAST search finished"
        );
        Ok(found)
    }

    fn download(&self, product: &LightCurveProduct) -> Result<LightCurve, ProviderError> {
        let response = self
            .client
            .get(&self.download_url)
            .query(&[("uri", product.data_uri.as_str())])
            .send()?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }
        let bytes = response.bytes()?;

        // cfitsio reads from a path, so stage the payload in a temp file
        let mut staged = tempfile::Builder::new()
            .prefix("exotransit-")
            .suffix(".fits")
            .tempfile()?;
        staged.write_all(&bytes)?;
        staged.flush()?;

        let mut curve = read_light_curve(staged.path(), &self.read_options)?;
        curve.meta.label = Some(product.filename.clone());
        if curve.meta.target.is_empty() {
            curve.meta.target = product.target_name.clone();
        }
        if curve.meta.mission.is_empty() {
            curve.meta.mission = product.mission.clone();
        }
        Ok(curve)
    }
}

/// Keep light-curve files, ordered by observation, long cadence first.
fn light_curve_products(
    observations: &[ObservationRow],
    products: Vec<ProductRow>,
    mission: &str,
) -> Vec<LightCurveProduct> {
    let rank = |obsid: &str| {
        observations
            .iter()
            .position(|o| id_key(&o.obsid) == obsid)
            .unwrap_or(usize::MAX)
    };

    let mut found: Vec<(usize, LightCurveProduct)> = products
        .into_iter()
        .filter_map(|p| {
            let cadence = match p.product_sub_group_description.as_deref() {
                Some("LLC") => Cadence::Long,
                Some("SLC") => Cadence::Short,
                _ => return None,
            };
            let filename = p.product_filename?;
            if !filename.ends_with("lc.fits") {
                return None;
            }
            let obs_key = p.obs_id.as_ref().map(id_key).unwrap_or_default();
            let observation = observations.iter().find(|o| id_key(&o.obsid) == obs_key);
            Some((
                rank(&obs_key),
                LightCurveProduct {
                    obs_id: observation
                        .and_then(|o| o.obs_id.clone())
                        .unwrap_or_else(|| obs_key.clone()),
                    target_name: observation
                        .and_then(|o| o.target_name.clone())
                        .unwrap_or_default(),
                    mission: mission.to_string(),
                    data_uri: p.data_uri?,
                    filename,
                    cadence,
                },
            ))
        })
        .collect();

    found.sort_by(|(ra, a), (rb, b)| a.cadence.cmp(&b.cadence).then(ra.cmp(rb)));
    found.into_iter().map(|(_, product)| product).collect()
}

/// MAST returns observation ids as numbers in some services and strings in others.
fn id_key(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NameLookupResponse {
    #[serde(default)]
    resolved_coordinate: Vec<ResolvedCoordinate>,
}

#[derive(Debug, Deserialize)]
struct ResolvedCoordinate {
    ra: Option<f64>,
    decl: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TableResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct ObservationRow {
    obsid: serde_json::Value,
    obs_id: Option<String>,
    target_name: Option<String>,
    t_min: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    #[serde(rename = "obsID")]
    obs_id: Option<serde_json::Value>,
    #[serde(rename = "dataURI")]
    data_uri: Option<String>,
    #[serde(rename = "productFilename")]
    product_filename: Option<String>,
    #[serde(rename = "productSubGroupDescription")]
    product_sub_group_description: Option<String>,
}
