use serde::{Deserialize, Serialize};

/// A confirmed planet row from the Exoplanet Archive `ps` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetRecord {
    #[serde(rename = "pl_name")]
    pub name: String,
    #[serde(rename = "hostname")]
    pub host: String,
    /// Orbital period in days
    #[serde(rename = "pl_orbper", default)]
    pub orbital_period_days: Option<f64>,
    /// Planet radius in Earth radii
    #[serde(rename = "pl_rade", default)]
    pub radius_earth: Option<f64>,
}
