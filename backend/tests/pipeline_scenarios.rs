mod support;

use std::sync::Arc;

use exotransit::config::ArtifactNaming;
use exotransit::models::{NormalizationPath, OutcomeKind, PipelineStage, ThresholdSource};
use exotransit::services::pipeline::CATALOG_UNAVAILABLE_NOTICE;
use exotransit::services::{PlotStore, PngPlotRenderer, Submission};
use support::{
    kepler_1_b, pipeline, Calls, FakeCatalog, FakeProvider, PanickingProvider, RecordingRenderer,
};

fn calls() -> Arc<Calls> {
    Arc::new(Calls::default())
}

#[test]
fn test_blank_identifier_makes_no_calls() {
    let calls = calls();
    let pipeline = pipeline(
        FakeProvider::with_flux(calls.clone(), vec![1.0]),
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![]),
        RecordingRenderer { calls: calls.clone() },
    );

    for raw in ["", "   ", "\t\n"] {
        let report = pipeline.run(&Submission::new(raw, Some("0.99")));
        assert_eq!(report.message, "Please enter a star ID (e.g. KIC 11446443).");
        assert_eq!(report.outcome, OutcomeKind::MissingIdentifier);
        assert_eq!(report.plot_url, None);
        assert!(report.planets.is_empty());
    }
    assert_eq!(calls.total(), 0);
}

#[test]
fn test_no_products_reports_not_found_and_skips_rendering() {
    let calls = calls();
    let dir = tempfile::tempdir().unwrap();
    let store = PlotStore::new(dir.path(), "/static/plots", ArtifactNaming::Shared);
    let previous = dir.path().join("latest_plot.png");
    std::fs::write(&previous, b"previous plot").unwrap();

    let pipeline = pipeline(
        FakeProvider::empty(calls.clone()),
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![kepler_1_b()]),
        PngPlotRenderer::new(store, 1000, 500),
    );

    let report = pipeline.run(&Submission::new("KIC 0000000", None));

    assert_eq!(
        report.message,
        "No Kepler light curve found for 'KIC 0000000'. Try another ID."
    );
    assert_eq!(report.outcome, OutcomeKind::NotFound);
    assert_eq!(report.plot_url, None);
    assert!(report.planets.is_empty());
    assert_eq!(Calls::count(&calls.download), 0);
    assert_eq!(Calls::count(&calls.planets), 0);
    assert_eq!(
        &report.stages[report.stages.len() - 2..],
        &[PipelineStage::Fetching, PipelineStage::Done]
    );
    assert_eq!(std::fs::read(&previous).unwrap(), b"previous plot");
}

#[test]
fn test_single_dip_is_detected() {
    let calls = calls();
    let pipeline = pipeline(
        FakeProvider::with_flux(calls.clone(), vec![1.0, 0.99, 1.0, 1.0]),
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![kepler_1_b()]),
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new("KIC 11446443", Some("0.995")));

    assert_eq!(report.message, "Possible transit event(s) detected in KIC 11446443!");
    assert_eq!(report.outcome, OutcomeKind::Completed);
    assert_eq!(report.plot_url.as_deref(), Some("/static/plots/recorded.png"));
    assert_eq!(report.planets, vec![kepler_1_b()]);
    assert_eq!(report.normalization, Some(NormalizationPath::Primary));
    let detection = report.detection.unwrap();
    assert_eq!(detection.dip_count, 1);
    assert!(detection.has_dip);
    assert_eq!(
        calls.masks.lock().unwrap().as_slice(),
        &[vec![false, true, false, false]]
    );
}

#[test]
fn test_flat_curve_has_no_transit() {
    let calls = calls();
    let pipeline = pipeline(
        FakeProvider::with_flux(calls.clone(), vec![1.0, 1.0, 1.0]),
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![]),
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new("KIC 11446443", Some("0.995")));

    assert_eq!(report.message, "No clear transit found for KIC 11446443.");
    assert!(!report.has_dip());
    assert_eq!(Calls::count(&calls.render), 1);
    assert_eq!(
        calls.masks.lock().unwrap().as_slice(),
        &[vec![false, false, false]]
    );
}

#[test]
fn test_unparsable_threshold_uses_default() {
    let calls = calls();
    let pipeline = pipeline(
        FakeProvider::with_flux(calls.clone(), vec![1.0, 0.996, 1.0, 1.0]),
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![]),
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new("KIC 11446443", Some("abc")));

    assert_eq!(report.threshold.value, 0.995);
    assert_eq!(
        report.threshold.source,
        ThresholdSource::Fallback {
            raw: "abc".to_string()
        }
    );
    assert_eq!(report.outcome, OutcomeKind::Completed);
}

#[test]
fn test_resolver_failure_uses_submitted_id_for_planets() {
    let calls = calls();
    let catalog = FakeCatalog {
        calls: calls.clone(),
        host: Err(()),
        planets: Ok(vec![]),
    };
    let pipeline = pipeline(
        FakeProvider::with_flux(calls.clone(), vec![1.0, 1.0]),
        catalog,
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new(" Kepler-1 ", None));

    assert_eq!(report.outcome, OutcomeKind::Completed);
    assert_eq!(
        calls.planet_hosts.lock().unwrap().as_slice(),
        &["Kepler-1".to_string()]
    );
    assert!(!report.catalog_degraded);
}

#[test]
fn test_both_catalog_calls_failing_still_completes() {
    let calls = calls();
    let catalog = FakeCatalog {
        calls: calls.clone(),
        host: Err(()),
        planets: Err(()),
    };
    let pipeline = pipeline(
        FakeProvider::with_flux(calls.clone(), vec![1.0, 1.0, 1.0]),
        catalog,
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new("KIC 11446443", None));

    assert_eq!(
        calls.planet_hosts.lock().unwrap().as_slice(),
        &["KIC 11446443".to_string()]
    );
    assert_eq!(
        report.message,
        format!("No clear transit found for KIC 11446443.{}", CATALOG_UNAVAILABLE_NOTICE)
    );
    assert!(report.catalog_degraded);
    assert!(report.planets.is_empty());
    assert_eq!(report.outcome, OutcomeKind::Completed);
    assert_eq!(report.plot_url.as_deref(), Some("/static/plots/recorded.png"));
}

#[test]
fn test_resolved_host_is_used_for_planets() {
    let calls = calls();
    let pipeline = pipeline(
        FakeProvider::with_flux(calls.clone(), vec![1.0, 1.0]),
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![kepler_1_b()]),
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new("11446443", None));

    assert_eq!(report.host_name.as_deref(), Some("Kepler-1"));
    assert_eq!(
        calls.planet_hosts.lock().unwrap().as_slice(),
        &["Kepler-1".to_string()]
    );
    // the headline keeps the submitted identifier
    assert_eq!(report.message, "No clear transit found for 11446443.");
}

#[test]
fn test_planet_failure_appends_notice() {
    let calls = calls();
    let catalog = FakeCatalog {
        calls: calls.clone(),
        host: Ok(None),
        planets: Err(()),
    };
    let pipeline = pipeline(
        FakeProvider::with_flux(calls.clone(), vec![1.0, 0.9, 1.0]),
        catalog,
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new("KIC 11446443", None));

    assert_eq!(
        report.message,
        "Possible transit event(s) detected in KIC 11446443! \
         Confirmed planet data is currently unavailable."
    );
    assert!(report.planets.is_empty());
    assert!(report.catalog_degraded);
    assert_eq!(report.outcome, OutcomeKind::Completed);
    assert!(report.plot_url.is_some());
    assert_eq!(report.final_stage(), PipelineStage::Done);
}

#[test]
fn test_search_failure_is_a_processing_error() {
    let calls = calls();
    let provider = FakeProvider {
        search_error: true,
        ..FakeProvider::with_flux(calls.clone(), vec![1.0])
    };
    let pipeline = pipeline(
        provider,
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![]),
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new("KIC 1", None));

    assert_eq!(report.outcome, OutcomeKind::Failed);
    assert!(report.message.starts_with("Error while processing 'KIC 1': "));
    assert!(report.message.contains("timed out"));
    assert_eq!(Calls::count(&calls.render), 0);
    assert_eq!(Calls::count(&calls.planets), 0);
    assert_eq!(report.final_stage(), PipelineStage::Failed);
}

#[test]
fn test_download_failure_is_a_processing_error() {
    let calls = calls();
    let provider = FakeProvider {
        download_error: true,
        ..FakeProvider::with_flux(calls.clone(), vec![1.0])
    };
    let pipeline = pipeline(
        provider,
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![kepler_1_b()]),
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new("KIC 1", None));

    assert_eq!(report.outcome, OutcomeKind::Failed);
    assert_eq!(report.final_stage(), PipelineStage::Failed);
    assert_eq!(
        report.message,
        "Error while processing 'KIC 1': light-curve download failed: \
         light-curve archive returned HTTP 404"
    );
    assert_eq!(Calls::count(&calls.download), 1);
    assert_eq!(Calls::count(&calls.render), 0);
    assert_eq!(Calls::count(&calls.planets), 0);
    assert_eq!(report.plot_url, None);
    assert!(report.planets.is_empty());
}

#[test]
fn test_panic_in_collaborator_is_contained() {
    let calls = calls();
    let pipeline = pipeline(
        PanickingProvider,
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![]),
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new("KIC 1", None));

    assert_eq!(report.outcome, OutcomeKind::Failed);
    assert!(report.message.contains("index out of range in fake provider"));
}

#[test]
fn test_all_nan_flux_takes_fallback_normalization() {
    let calls = calls();
    let pipeline = pipeline(
        FakeProvider::with_flux(calls.clone(), vec![f64::NAN, f64::NAN]),
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![]),
        RecordingRenderer { calls: calls.clone() },
    );

    let report = pipeline.run(&Submission::new("KIC 1", None));

    assert!(report.normalization.as_ref().unwrap().is_fallback());
    assert!(!report.has_dip());
    assert_eq!(report.outcome, OutcomeKind::Completed);
}

#[test]
fn test_per_request_plots_do_not_collide() {
    let calls = calls();
    let dir = tempfile::tempdir().unwrap();
    let store = PlotStore::new(dir.path(), "/static/plots", ArtifactNaming::PerRequest);
    let pipeline = pipeline(
        FakeProvider::with_flux(calls.clone(), vec![1.0, 0.99, 1.0]),
        FakeCatalog::resolving(calls.clone(), "Kepler-1", vec![]),
        PngPlotRenderer::new(store, 1000, 500),
    );

    let first = pipeline.run(&Submission::new("KIC 11446443", None));
    let second = pipeline.run(&Submission::new("KIC 11446443", None));

    let (a, b) = (first.plot_url.unwrap(), second.plot_url.unwrap());
    assert_ne!(a, b);
    for url in [a, b] {
        let file = url.trim_start_matches("/static/plots/");
        assert!(dir.path().join(file).exists(), "{file}");
    }
}
