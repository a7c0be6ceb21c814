#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use exotransit::catalog::{CatalogError, ExoplanetCatalog};
use exotransit::lightcurve::{Cadence, LightCurveProduct, LightCurveProvider, ProviderError};
use exotransit::models::{LightCurve, PlanetRecord};
use exotransit::services::{
    PipelineSettings, PlotArtifact, PlotRenderer, PlotRequest, RenderError, TransitPipeline,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the previous values on unwind and serializes access to the
/// process environment across parallel tests.
///
/// `Some(v)` sets the variable, `None` removes it.
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// Call counters shared between a test and its fakes.
#[derive(Debug, Default)]
pub struct Calls {
    pub search: AtomicUsize,
    pub download: AtomicUsize,
    pub resolve: AtomicUsize,
    pub planets: AtomicUsize,
    pub render: AtomicUsize,
    /// Host names passed to the planet query
    pub planet_hosts: Mutex<Vec<String>>,
    /// Masks handed to the renderer
    pub masks: Mutex<Vec<Vec<bool>>>,
}

impl Calls {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        [&self.search, &self.download, &self.resolve, &self.planets, &self.render]
            .iter()
            .map(|c| Self::count(c))
            .sum()
    }
}

pub fn product(target: &str) -> LightCurveProduct {
    LightCurveProduct {
        obs_id: "kplr011446443_lc_Q111111110111011101".to_string(),
        target_name: target.to_string(),
        mission: "Kepler".to_string(),
        data_uri: "mast:KEPLER/url/missions/kepler/lightcurves/kplr011446443_llc.fits".to_string(),
        filename: "kplr011446443-2009131110544_llc.fits".to_string(),
        cadence: Cadence::Long,
    }
}

/// Provider returning one product whose light curve has the given flux.
pub struct FakeProvider {
    pub calls: Arc<Calls>,
    pub products: usize,
    pub flux: Vec<f64>,
    pub search_error: bool,
    pub download_error: bool,
}

impl FakeProvider {
    pub fn with_flux(calls: Arc<Calls>, flux: Vec<f64>) -> Self {
        Self {
            calls,
            products: 1,
            flux,
            search_error: false,
            download_error: false,
        }
    }

    pub fn empty(calls: Arc<Calls>) -> Self {
        Self {
            calls,
            products: 0,
            flux: Vec::new(),
            search_error: false,
            download_error: false,
        }
    }
}

impl LightCurveProvider for FakeProvider {
    fn search(
        &self,
        target: &str,
        _mission: &str,
    ) -> Result<Vec<LightCurveProduct>, ProviderError> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);
        if self.search_error {
            return Err(ProviderError::Timeout);
        }
        Ok((0..self.products).map(|_| product(target)).collect())
    }

    fn download(&self, _product: &LightCurveProduct) -> Result<LightCurve, ProviderError> {
        self.calls.download.fetch_add(1, Ordering::SeqCst);
        if self.download_error {
            return Err(ProviderError::Status(404));
        }
        let time = (0..self.flux.len()).map(|i| 131.5 + i as f64 * 0.02).collect();
        Ok(LightCurve::new(time, self.flux.clone())?)
    }
}

/// Provider whose search panics.
pub struct PanickingProvider;

impl LightCurveProvider for PanickingProvider {
    fn search(
        &self,
        _target: &str,
        _mission: &str,
    ) -> Result<Vec<LightCurveProduct>, ProviderError> {
        panic!("index out of range in fake provider");
    }

    fn download(&self, _product: &LightCurveProduct) -> Result<LightCurve, ProviderError> {
        unreachable!()
    }
}

pub struct FakeCatalog {
    pub calls: Arc<Calls>,
    pub host: Result<Option<String>, ()>,
    pub planets: Result<Vec<PlanetRecord>, ()>,
}

impl FakeCatalog {
    pub fn resolving(calls: Arc<Calls>, host: &str, planets: Vec<PlanetRecord>) -> Self {
        Self {
            calls,
            host: Ok(Some(host.to_string())),
            planets: Ok(planets),
        }
    }
}

impl ExoplanetCatalog for FakeCatalog {
    fn resolve_host(&self, _star_id: &str) -> Result<Option<String>, CatalogError> {
        self.calls.resolve.fetch_add(1, Ordering::SeqCst);
        self.host.clone().map_err(|_| CatalogError::Status(503))
    }

    fn confirmed_planets(&self, host: &str) -> Result<Vec<PlanetRecord>, CatalogError> {
        self.calls.planets.fetch_add(1, Ordering::SeqCst);
        self.calls
            .planet_hosts
            .lock()
            .unwrap()
            .push(host.to_string());
        self.planets.clone().map_err(|_| CatalogError::Timeout)
    }
}

/// Renderer that records its input and writes nothing.
pub struct RecordingRenderer {
    pub calls: Arc<Calls>,
}

impl PlotRenderer for RecordingRenderer {
    fn render(&self, request: &PlotRequest<'_>) -> Result<PlotArtifact, RenderError> {
        self.calls.render.fetch_add(1, Ordering::SeqCst);
        self.calls.masks.lock().unwrap().push(request.mask.to_vec());
        Ok(PlotArtifact {
            key: "recorded".to_string(),
            path: "recorded.png".into(),
            url: "/static/plots/recorded.png".to_string(),
        })
    }
}

pub fn kepler_1_b() -> PlanetRecord {
    PlanetRecord {
        name: "Kepler-1 b".to_string(),
        host: "Kepler-1".to_string(),
        orbital_period_days: Some(2.470613377),
        radius_earth: Some(14.2),
    }
}

pub fn pipeline(
    provider: impl LightCurveProvider + 'static,
    catalog: impl ExoplanetCatalog + 'static,
    renderer: impl PlotRenderer + 'static,
) -> TransitPipeline {
    TransitPipeline::new(
        Box::new(provider),
        Box::new(catalog),
        Box::new(renderer),
        PipelineSettings::default(),
    )
}
