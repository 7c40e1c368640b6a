mod common;

use common::*;
use eba_core::{Decision, ReportConfig, Trait, TraitScores};
use eba_render::compose::fallback;
use eba_render::flow::FOOTER_RESERVE_MM;
use eba_render::surface::DrawOp;
use eba_render::{RecordingSurface, ReportComposer, SECTION_TITLES, no_charts};
use std::sync::{Arc, Mutex};

fn composer(backend: Box<dyn eba_render::RasterBackend>) -> ReportComposer {
    ReportComposer::with_backend(ReportConfig::default(), backend)
}

#[test]
fn recommended_candidate_splits_competencies_by_threshold() {
    let payload = recommended_payload();
    assert_eq!(payload.compatibility, Some(82.0));
    assert_eq!(payload.decision, Some(Decision::Recommended));

    let out = composer(Box::new(FixedJpegBackend))
        .compose_with(RecordingSurface::new(), &request(payload))
        .unwrap();

    let strengths = bullets(&section_texts(&out.output, "Strengths", Some("Risk Points")));
    assert_eq!(strengths, vec!["Communication (70)"]);
    let critical = bullets(&section_texts(
        &out.output,
        "Risk Points",
        Some("Development Recommendations"),
    ));
    assert_eq!(critical, vec!["Planning (30)"]);

    let texts = all_texts(&out.output);
    assert!(texts.iter().any(|t| t == "RECOMMENDED"));
    assert!(texts.iter().any(|t| t == "Compatibility: 82/100"));
    assert!(texts.iter().all(|t| !t.contains("Teamwork (50)")));
}

#[test]
fn all_three_charts_are_placed() {
    let out = composer(Box::new(FixedJpegBackend))
        .compose_with(RecordingSurface::new(), &request(recommended_payload()))
        .unwrap();
    let images: usize = out.output.iter().map(|p| p.images().count()).sum();
    assert_eq!(images, 3);
}

#[test]
fn each_chart_file_is_deleted_before_the_next_is_rendered() {
    let dir = tempfile::tempdir().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let backend = DirCountingBackend {
        dir: dir.path().to_path_buf(),
        seen: Arc::clone(&seen),
    };
    let config = ReportConfig {
        chart_dir: Some(dir.path().to_path_buf()),
        ..ReportConfig::default()
    };
    let composer = ReportComposer::with_backend(config, Box::new(backend));

    let out = composer
        .compose_with(RecordingSurface::new(), &request(recommended_payload()))
        .unwrap();
    assert_eq!(out.output.iter().map(|p| p.images().count()).sum::<usize>(), 3);
    assert_eq!(*seen.lock().unwrap(), vec![0, 0, 0]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    let report = composer.compose(&request(recommended_payload()));
    assert!(!report.degraded);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn config_file_cannot_move_the_competency_thresholds() {
    let config =
        ReportConfig::from_json_str(r#"{"thresholds": {"strength": 80, "critical": 20}}"#).unwrap();
    let out = ReportComposer::with_backend(config, no_charts())
        .compose_with(RecordingSurface::new(), &request(recommended_payload()))
        .unwrap();
    let strengths = bullets(&section_texts(&out.output, "Strengths", Some("Risk Points")));
    assert_eq!(strengths, vec!["Communication (70)"]);
    let critical = bullets(&section_texts(
        &out.output,
        "Risk Points",
        Some("Development Recommendations"),
    ));
    assert_eq!(critical, vec!["Planning (30)"]);

    let buckets = recommended_payload().classify_competencies().neutral.len();
    assert_eq!(buckets, 1);
}

#[test]
fn missing_traits_render_as_not_available_in_canonical_order() {
    let mut payload = recommended_payload();
    let mut traits = TraitScores::new();
    traits.insert(Trait::Neuroticism, 2.0);
    traits.insert(Trait::Openness, 7.0);
    payload.traits = traits;

    let out = composer(no_charts())
        .compose_with(RecordingSurface::new(), &request(payload))
        .unwrap();
    let section = section_texts(&out.output, "Personality Profile", Some("Visualizations"));

    let position = |label: &str| {
        section
            .iter()
            .position(|t| t.starts_with(&format!("{label}:")))
            .unwrap_or_else(|| panic!("{label} not rendered"))
    };
    let positions: Vec<usize> = Trait::CANONICAL.iter().map(|t| position(t.label())).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");

    assert_eq!(section[positions[0]], "Openness: 7/10");
    for t in [Trait::Conscientiousness, Trait::Extraversion, Trait::Agreeableness] {
        assert_eq!(section[position(t.label())], format!("{}: not available", t.label()));
    }
    assert_eq!(section[positions[4]], "Neuroticism: 2/10");
}

#[test]
fn empty_recommendations_render_the_fallback_sentence() {
    let mut payload = recommended_payload();
    payload.recommendations.clear();
    let out = composer(no_charts())
        .compose_with(RecordingSurface::new(), &request(payload))
        .unwrap();
    let section = section_texts(
        &out.output,
        "Development Recommendations",
        Some("Alternative Roles"),
    );
    let body = section.join(" ");
    assert!(body.contains(fallback::NO_RECOMMENDATIONS), "{section:?}");
}

#[test]
fn failing_rasterizer_still_produces_every_section() {
    let composer = composer(Box::new(FailingBackend));
    let out = composer
        .compose_with(RecordingSurface::new(), &request(recommended_payload()))
        .unwrap();

    let titles: Vec<&str> = out.outline.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, SECTION_TITLES);
    assert_eq!(out.output.iter().map(|p| p.images().count()).sum::<usize>(), 0);

    let visuals = section_texts(&out.output, "Visualizations", Some("Emotional Health")).join(" ");
    for sentence in [fallback::NO_RADAR, fallback::NO_GAUGE, fallback::NO_BARS] {
        assert!(visuals.contains(sentence), "missing {sentence:?}");
    }

    let report = composer.compose(&request(recommended_payload()));
    assert!(!report.degraded);
    assert!(report.pdf.starts_with(b"%PDF-"));
    assert_eq!(report.outline.len(), 11);
}

#[test]
fn blocks_never_cross_the_content_band() {
    let mut payload = recommended_payload();
    payload.strengths = (0..40)
        .map(|i| format!("Observation {i}: consistently documents analysis steps and shares them"))
        .collect();
    payload.recommendations = (0..10)
        .map(|i| format!("Recommendation {i} with enough words to wrap across the content width of the page"))
        .collect();

    let config = ReportConfig::default();
    let page = config.page;
    let composer = ReportComposer::with_backend(config, Box::new(FixedJpegBackend));
    let out = composer
        .compose_with(RecordingSurface::new(), &request(payload))
        .unwrap();
    assert!(out.page_count > 3);

    let bottom = page.height_mm - page.margin_bottom_mm - FOOTER_RESERVE_MM + 0.01;
    for (n, recorded) in out.output.iter().enumerate() {
        for op in &recorded.ops {
            let rect = match op {
                DrawOp::Box { rect, .. } | DrawOp::Image { rect, .. } | DrawOp::Rect { rect, .. } => {
                    *rect
                }
                _ => continue,
            };
            assert!(rect.y >= page.margin_top_mm - 0.01, "page {}: {rect:?}", n + 1);
            assert!(rect.bottom() <= bottom, "page {}: {rect:?} below {bottom}", n + 1);
        }
    }
}

#[test]
fn composing_twice_is_byte_identical() {
    let composer = composer(Box::new(FixedJpegBackend));
    let first = composer.compose(&request(recommended_payload()));
    let second = composer.compose(&request(recommended_payload()));
    assert!(!first.degraded);
    assert!(!first.pdf.is_empty());
    assert_eq!(first.pdf, second.pdf);
    assert_eq!(first.page_count, second.page_count);
}

#[test]
fn text_the_surface_rejects_degrades_instead_of_failing() {
    let out = composer(no_charts())
        .compose_with(RecordingSurface::with_text_limit(30), &request(recommended_payload()))
        .unwrap();
    assert!(out.text_fallbacks > 0);
    assert_eq!(out.outline.len(), 11);
}

#[test]
fn panicking_backend_yields_a_minimal_document() {
    let report = composer(Box::new(PanickingBackend)).compose(&request(recommended_payload()));
    assert!(report.degraded);
    assert!(report.outline.is_empty());
    assert_eq!(report.page_count, 1);
    assert!(report.pdf.starts_with(b"%PDF-"));
}

#[test]
fn save_failures_are_reported_without_losing_the_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let composer = composer(no_charts());

    let mut ok = request(recommended_payload());
    ok.save_to = Some(dir.path().join("report.pdf"));
    let report = composer.compose(&ok);
    assert!(report.save_error.is_none());
    assert_eq!(std::fs::read(dir.path().join("report.pdf")).unwrap(), report.pdf);

    let mut bad = request(recommended_payload());
    bad.save_to = Some(dir.path().join("missing").join("report.pdf"));
    let report = composer.compose(&bad);
    assert!(report.save_error.is_some());
    assert!(report.pdf.starts_with(b"%PDF-"));
}

#[test]
fn unreadable_brand_image_is_ignored() {
    let mut req = request(recommended_payload());
    req.brand_image = Some("/nonexistent/logo.png".into());
    let out = composer(no_charts())
        .compose_with(RecordingSurface::new(), &req)
        .unwrap();
    assert_eq!(out.output[0].images().count(), 0);
    assert_eq!(out.outline.len(), 11);
}
