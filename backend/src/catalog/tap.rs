//! NASA Exoplanet Archive client over the TAP `sync` endpoint.

use serde::Deserialize;
use std::time::Duration;

use super::{CatalogError, ExoplanetCatalog};
use crate::models::PlanetRecord;

/// Blocking TAP client for the Exoplanet Archive.
#[derive(Debug, Clone)]
pub struct ExoplanetArchiveClient {
    client: reqwest::blocking::Client,
    sync_url: String,
}

impl ExoplanetArchiveClient {
    /// Create a client for `base_url` (e.g. `https://exoplanetarchive.ipac.caltech.edu/TAP`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            sync_url: format!("{}/sync", base_url.trim_end_matches('/')),
        })
    }

    /// Run an ADQL query and decode the JSON row list.
    fn query<T: for<'de> Deserialize<'de>>(&self, adql: &str) -> Result<Vec<T>, CatalogError> {
        let response = self
            .client
            .get(&self.sync_url)
            .query(&[("query", adql), ("format", "json")])
            .send()?;

        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status().as_u16()));
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

impl ExoplanetCatalog for ExoplanetArchiveClient {
    fn resolve_host(&self, star_id: &str) -> Result<Option<String>, CatalogError> {
        let rows: Vec<HostRow> = self.query(&host_lookup_query(star_id))?;
        Ok(rows.into_iter().find_map(|row| row.hostname))
    }

    fn confirmed_planets(&self, host: &str) -> Result<Vec<PlanetRecord>, CatalogError> {
        self.query(&planet_query(host))
    }
}

#[derive(Debug, Deserialize)]
struct HostRow {
    hostname: Option<String>,
}

/// Quote text for inclusion inside an ADQL string literal.
pub fn escape_adql(text: &str) -> String {
    text.replace('\'', "''")
}

/// Kepler/K2 hosts whose stellar id contains `star_id`.
pub fn host_lookup_query(star_id: &str) -> String {
    format!(
        "select distinct hostname from ps \
         where (hostname like 'Kepler%' or hostname like 'K2%') \
         and st_id like '%{}%'",
        escape_adql(star_id)
    )
}

/// Planet rows for an exact host name.
pub fn planet_query(host: &str) -> String {
    format!(
        "select pl_name,hostname,pl_orbper,pl_rade from ps where hostname='{}'",
        escape_adql(host)
    )
}
