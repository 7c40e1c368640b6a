//! Report composition: one fixed section order over a [`PageFlow`].
//!
//! [`ReportComposer::compose`] never fails. Chart and brand-image problems degrade to fallback
//! sentences; anything worse (an error or a panic) is caught at the top and replaced by a
//! one-page summary, and if even that cannot be produced, by a blank page.

use crate::chart::{
    BarItem, ChartDimensions, ChartRasterizer, ChartSpec, RadarAxis, RasterBackend,
    UnavailableBackend, tier_color,
};
use crate::flow::{PageChrome, PageFlow};
use crate::fonts::{BuiltinFonts, FontProvider, FontStyle};
use crate::primitives::{
    BODY_LINE_MM, BODY_PT, body_text, bullet_lines, card, centered_image, chart_fallback,
    fmt_score, labeled_bar, section_title,
};
use crate::surface::{
    DocumentInfo, ImageData, PdfSurface, RasterImage, RenderSurface, TextStyle, blank_pdf,
};
use crate::{Error, Result};
use chrono::NaiveDateTime;
use eba_core::config::{CRITICAL_THRESHOLD, STRENGTH_THRESHOLD};
use eba_core::model::{SCORE_SCALE_MAX, TRAIT_SCALE_MAX};
use eba_core::{
    AnalysisPayload, CompetencyBuckets, IndicatorPolarity, ReportConfig, Thresholds, Trait,
};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Section headings in output order. The cover page is not a section.
pub const SECTION_TITLES: [&str; 11] = [
    "Candidate",
    "Decision and Compatibility",
    "Executive Summary",
    "Personality Profile",
    "Visualizations",
    "Emotional Health",
    "Strengths",
    "Risk Points",
    "Development Recommendations",
    "Alternative Roles",
    "Closing Notes",
];

/// Sentences drawn in place of missing data or charts.
pub mod fallback {
    pub const NOT_INFORMED: &str = "Not informed";
    pub const NOT_AVAILABLE: &str = "not available";
    pub const NO_DECISION: &str = "No decision was provided by the analysis.";
    pub const NO_JUSTIFICATION: &str = "No justification was provided for this decision.";
    pub const NO_SUMMARY: &str = "No executive summary was provided for this candidate.";
    pub const NO_RADAR: &str =
        "The personality radar chart is unavailable; see the trait scores in the personality profile.";
    pub const NO_GAUGE: &str =
        "The compatibility gauge is unavailable; see the compatibility score in the decision section.";
    pub const NO_BARS: &str =
        "The competency chart is unavailable; see the strengths and risk points sections.";
    pub const NO_EMOTIONAL_HEALTH: &str =
        "No emotional-health indicators were available for this assessment.";
    pub const NO_STRENGTHS: &str =
        "No strengths identified at or above the configured threshold.";
    pub const NO_CRITICAL_POINTS: &str =
        "No critical points identified below the configured threshold.";
    pub const NO_RECOMMENDATIONS: &str =
        "No development recommendations were provided for this candidate.";
    pub const NO_ALTERNATIVE_ROLES: &str = "No alternative roles were suggested.";
    pub const MINIMAL_NOTICE: &str =
        "The full report could not be generated. This page summarizes the decision only.";
}

const RADAR_MAX_H_MM: f32 = 120.0;
const GAUGE_MAX_H_MM: f32 = 70.0;
const BARS_MAX_H_MM: f32 = 130.0;
const LOGO_MAX_W_MM: f32 = 60.0;
const LOGO_MAX_H_MM: f32 = 30.0;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub payload: AnalysisPayload,
    /// Display title of the evaluated role. Falls back to the payload's candidate role.
    pub role: Option<String>,
    /// Cover logo. A missing or unreadable file is logged and skipped.
    pub brand_image: Option<PathBuf>,
    /// Timestamp printed on the cover and written to the document info. Defaults to now.
    pub generated_at: Option<NaiveDateTime>,
    /// Also write the finished document here.
    pub save_to: Option<PathBuf>,
}

impl ReportRequest {
    pub fn new(payload: AnalysisPayload) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    fn role_title(&self) -> Option<&str> {
        self.role
            .as_deref()
            .or(self.payload.candidate.role.as_deref())
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }

    fn candidate_name(&self) -> &str {
        self.payload
            .candidate
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(fallback::NOT_INFORMED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub title: String,
    /// 1-based page the section heading landed on.
    pub page: usize,
}

#[derive(Debug, Clone)]
pub struct ComposedReport {
    pub pdf: Vec<u8>,
    pub page_count: usize,
    pub outline: Vec<OutlineEntry>,
    /// Set when the full report failed and a minimal or blank document was returned.
    pub degraded: bool,
    /// Why `save_to` could not be written, if it could not.
    pub save_error: Option<String>,
}

/// Surface output plus what the composer learned while laying it out.
#[derive(Debug)]
pub struct Composition<T> {
    pub output: T,
    pub page_count: usize,
    pub outline: Vec<OutlineEntry>,
    /// Lines that had to be chunked or replaced by a placeholder.
    pub text_fallbacks: usize,
}

pub struct ReportComposer {
    config: ReportConfig,
    fonts: Arc<dyn FontProvider>,
    rasterizer: ChartRasterizer,
}

impl std::fmt::Debug for ReportComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportComposer")
            .field("config", &self.config)
            .field("rasterizer", &self.rasterizer)
            .finish_non_exhaustive()
    }
}

impl ReportComposer {
    /// Composer with the default raster backend for this build.
    pub fn new(config: ReportConfig) -> Self {
        let backend = default_backend(&config);
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: ReportConfig, backend: Box<dyn RasterBackend>) -> Self {
        let mut rasterizer = ChartRasterizer::new(backend, config.palette.clone());
        if let Some(dir) = config.chart_dir.as_deref() {
            rasterizer = rasterizer.with_temp_dir(dir);
        }
        Self {
            config,
            fonts: Arc::new(BuiltinFonts),
            rasterizer,
        }
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Composes the PDF. Always returns a non-empty, structurally valid document.
    pub fn compose(&self, request: &ReportRequest) -> ComposedReport {
        let generated = resolve_timestamp(request);
        let attempt = catch_unwind(AssertUnwindSafe(|| {
            let surface = self.pdf_surface(request, generated);
            self.compose_at(surface, request, generated)
        }));

        let failure = match attempt {
            Ok(Ok(composition)) => {
                info!(
                    pages = composition.page_count,
                    bytes = composition.output.len(),
                    text_fallbacks = composition.text_fallbacks,
                    "report composed"
                );
                return self.finalize(
                    request,
                    ComposedReport {
                        pdf: composition.output,
                        page_count: composition.page_count,
                        outline: composition.outline,
                        degraded: false,
                        save_error: None,
                    },
                );
            }
            Ok(Err(err)) => err.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };
        error!(error = %failure, "report composition failed; emitting minimal document");

        let minimal = catch_unwind(AssertUnwindSafe(|| {
            self.minimal_document(request, generated)
        }));
        let (pdf, page_count) = match minimal {
            Ok(Ok(done)) => done,
            Ok(Err(err)) => {
                error!(error = %err, "minimal document failed; emitting blank page");
                self.blank()
            }
            Err(panic) => {
                error!(error = %panic_message(panic.as_ref()), "minimal document failed; emitting blank page");
                self.blank()
            }
        };
        self.finalize(
            request,
            ComposedReport {
                pdf,
                page_count,
                outline: Vec::new(),
                degraded: true,
                save_error: None,
            },
        )
    }

    /// Lays the report out on an arbitrary surface. Errors are returned, not recovered.
    pub fn compose_with<S: RenderSurface>(
        &self,
        surface: S,
        request: &ReportRequest,
    ) -> Result<Composition<S::Output>> {
        self.compose_at(surface, request, resolve_timestamp(request))
    }

    fn compose_at<S: RenderSurface>(
        &self,
        surface: S,
        request: &ReportRequest,
        generated: NaiveDateTime,
    ) -> Result<Composition<S::Output>> {
        let mut report = SectionWriter {
            flow: self.flow(surface),
            config: &self.config,
            outline: Vec::with_capacity(SECTION_TITLES.len()),
        };
        let payload = &request.payload;
        let buckets = payload.classify_competencies();
        debug!(
            strengths = buckets.strengths.len(),
            critical = buckets.critical.len(),
            neutral = buckets.neutral.len(),
            unscored = buckets.unscored.len(),
            "competencies classified"
        );

        self.cover(&mut report, request, generated);
        candidate_section(&mut report, request);
        decision_section(&mut report, payload);
        summary_section(&mut report, payload);
        personality_section(&mut report, payload);
        self.visualizations_section(&mut report, payload);
        emotional_health_section(&mut report, payload);
        strengths_section(&mut report, payload, &buckets);
        risks_section(&mut report, payload, &buckets);
        recommendations_section(&mut report, payload);
        alternative_roles_section(&mut report, payload);
        closing_section(&mut report, generated);

        let page_count = report.flow.cursor().page;
        let text_fallbacks = report.flow.text_fallbacks();
        let outline = report.outline;
        let output = report.flow.finish()?;
        Ok(Composition {
            output,
            page_count,
            outline,
            text_fallbacks,
        })
    }

    fn flow<S: RenderSurface>(&self, surface: S) -> PageFlow<S> {
        PageFlow::new(
            surface,
            self.config.page,
            self.fonts.clone(),
            PageChrome::from_config(&self.config),
            self.config.sanitize_options(),
        )
    }

    fn pdf_surface(&self, request: &ReportRequest, generated: NaiveDateTime) -> PdfSurface {
        PdfSurface::new(
            self.config.page.width_mm,
            self.config.page.height_mm,
            self.fonts.clone(),
            self.config.compress,
            DocumentInfo {
                title: format!("{} - {}", self.config.title, request.candidate_name()),
                author: self.config.brand.clone(),
                creator: format!("{} {}", self.config.app_name, self.config.app_version),
                created: Some(generated),
            },
        )
    }

    fn cover<S: RenderSurface>(
        &self,
        report: &mut SectionWriter<'_, S>,
        request: &ReportRequest,
        generated: NaiveDateTime,
    ) {
        let flow = &mut report.flow;
        let palette = flow.palette().clone();
        flow.new_page();
        flow.advance(20.0);
        flow.write_line(
            14.0,
            &self.config.title,
            &TextStyle::new(FontStyle::Bold, 24.0, palette.primary),
        );
        flow.advance(4.0);

        if let Some(path) = request.brand_image.as_deref() {
            match load_brand_image(path) {
                Ok(logo) => {
                    if let Err(err) = centered_image(flow, &logo, LOGO_MAX_W_MM, LOGO_MAX_H_MM) {
                        warn!(path = %path.display(), error = %err, "brand image could not be placed");
                    }
                }
                Err(err) => warn!(error = %err, "brand image skipped"),
            }
        }

        let role = request.role_title().unwrap_or(fallback::NOT_INFORMED);
        let heading = TextStyle::new(FontStyle::Bold, 14.0, palette.dark);
        let muted = TextStyle::new(FontStyle::Regular, BODY_PT, palette.muted);
        flow.paragraph(&format!("{} - {role}", self.config.brand), 8.0, &heading);
        flow.write_line(
            BODY_LINE_MM,
            &format!("{} {}", self.config.app_name, self.config.app_version),
            &muted,
        );
        flow.write_line(
            BODY_LINE_MM,
            &format!("Generated on {}", generated.format(TIMESTAMP_FORMAT)),
            &muted,
        );
        flow.advance(8.0);

        let payload = &request.payload;
        card(
            flow,
            "Overview",
            &[
                format!("Candidate: {}", request.candidate_name()),
                format!("Decision: {}", decision_text(payload)),
                format!("Compatibility: {}", compatibility_text(payload)),
                "Confidential. Intended for the hiring team only.".to_string(),
            ],
        );
    }

    fn visualizations_section<S: RenderSurface>(
        &self,
        report: &mut SectionWriter<'_, S>,
        payload: &AnalysisPayload,
    ) {
        report.section(SECTION_TITLES[4], Some("Charts are generated from the scores above."));
        let ideal = payload.ideal_profile();
        let radar = ChartSpec::Radar {
            axes: payload
                .traits
                .canonical()
                .map(|(t, value)| RadarAxis {
                    label: t.label().to_string(),
                    value,
                    ideal: ideal.range(t),
                })
                .collect(),
            max: TRAIT_SCALE_MAX,
        };
        let gauge = ChartSpec::Gauge {
            value: payload.compatibility.unwrap_or(f64::NAN),
            bands: self.config.gauge_bands,
        };

        let mut items: Vec<BarItem> = payload
            .competencies
            .iter()
            .filter(|c| !c.name.trim().is_empty())
            .filter_map(|c| {
                Some(BarItem {
                    label: c.name.trim().to_string(),
                    value: c.score?,
                })
            })
            .collect();
        items.sort_by(|a, b| b.value.total_cmp(&a.value));
        items.truncate(self.config.limits.chart_competencies);
        let bars = ChartSpec::Bars {
            items,
            thresholds: Thresholds::FIXED,
        };

        let charts = &self.config.charts;
        for (spec, dims, max_h, sentence) in [
            (&radar, charts.radar, RADAR_MAX_H_MM, fallback::NO_RADAR),
            (&gauge, charts.gauge, GAUGE_MAX_H_MM, fallback::NO_GAUGE),
            (&bars, charts.bars, BARS_MAX_H_MM, fallback::NO_BARS),
        ] {
            self.place_chart(&mut report.flow, spec, dims.into(), max_h, sentence);
        }
    }

    /// Renders one chart, places it, and deletes its file before returning.
    fn place_chart<S: RenderSurface>(
        &self,
        flow: &mut PageFlow<S>,
        spec: &ChartSpec,
        dims: ChartDimensions,
        max_h: f32,
        sentence: &str,
    ) {
        let kind = spec.kind().label();
        if spec.is_empty() {
            debug!(chart = kind, "no data for chart");
            chart_fallback(flow, sentence);
            return;
        }
        let Some(chart) = self.rasterizer.render(spec, dims) else {
            chart_fallback(flow, sentence);
            return;
        };

        let max_w = flow.cursor().content_width();
        let placed = chart
            .load()
            .map_err(Error::from)
            .and_then(|image| centered_image(flow, &image, max_w, max_h).map_err(Error::from));
        if let Err(err) = placed {
            warn!(chart = kind, error = %err, "chart could not be placed");
            chart_fallback(flow, sentence);
        }
        if let Err(err) = chart.release() {
            warn!(chart = kind, error = %err, "failed to delete chart file");
        }
    }

    fn minimal_document(
        &self,
        request: &ReportRequest,
        generated: NaiveDateTime,
    ) -> Result<(Vec<u8>, usize)> {
        let mut flow = self.flow(self.pdf_surface(request, generated));
        flow.new_page();
        section_title(&mut flow, &self.config.title, Some(fallback::MINIMAL_NOTICE));
        let payload = &request.payload;
        for line in [
            format!("Candidate: {}", request.candidate_name()),
            format!("Decision: {}", decision_text(payload)),
            format!("Compatibility: {}", compatibility_text(payload)),
        ] {
            body_text(&mut flow, &line);
        }
        let pages = flow.cursor().page;
        Ok((flow.finish()?, pages))
    }

    fn blank(&self) -> (Vec<u8>, usize) {
        (blank_pdf(self.config.page.width_mm, self.config.page.height_mm), 1)
    }

    fn finalize(&self, request: &ReportRequest, mut report: ComposedReport) -> ComposedReport {
        if let Some(path) = request.save_to.as_deref() {
            match std::fs::write(path, &report.pdf) {
                Ok(()) => info!(path = %path.display(), "report saved"),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to save report");
                    report.save_error = Some(format!("{}: {err}", path.display()));
                }
            }
        }
        report
    }
}

#[cfg(feature = "raster")]
fn default_backend(config: &ReportConfig) -> Box<dyn RasterBackend> {
    Box::new(crate::raster::ResvgBackend::new(config.font_dir.clone()))
}

#[cfg(not(feature = "raster"))]
fn default_backend(_config: &ReportConfig) -> Box<dyn RasterBackend> {
    Box::new(UnavailableBackend)
}

/// Composer backend that skips chart rendering entirely.
pub fn no_charts() -> Box<dyn RasterBackend> {
    Box::new(UnavailableBackend)
}

struct SectionWriter<'a, S: RenderSurface> {
    flow: PageFlow<S>,
    config: &'a ReportConfig,
    outline: Vec<OutlineEntry>,
}

impl<S: RenderSurface> SectionWriter<'_, S> {
    fn section(&mut self, title: &str, subtitle: Option<&str>) {
        section_title(&mut self.flow, title, subtitle);
        let page = self.flow.cursor().page;
        debug!(section = title, page, "section started");
        self.outline.push(OutlineEntry {
            title: title.to_string(),
            page,
        });
    }

    fn missing(&mut self, label: &str) {
        let style = TextStyle::new(FontStyle::Regular, BODY_PT, self.flow.palette().muted);
        self.flow.write_line(
            BODY_LINE_MM + 1.0,
            &format!("{label}: {}", fallback::NOT_AVAILABLE),
            &style,
        );
    }
}

fn candidate_section<S: RenderSurface>(report: &mut SectionWriter<'_, S>, request: &ReportRequest) {
    report.section(SECTION_TITLES[0], None);
    let candidate = &request.payload.candidate;
    let or_missing = |v: Option<&str>| {
        v.map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback::NOT_INFORMED)
            .to_string()
    };
    let mut lines = vec![
        format!("Name: {}", request.candidate_name()),
        format!("Company: {}", or_missing(candidate.company.as_deref())),
        format!("Evaluated role: {}", or_missing(request.role_title())),
    ];
    if let Some(leadership) = request.payload.leadership_potential.as_deref() {
        lines.push(format!("Leadership potential: {leadership}"));
    }
    if let Some(integrity) = request.payload.integrity {
        lines.push(format!("Integrity: {}/100", fmt_score(integrity)));
    }
    card(&mut report.flow, "Identity", &lines);
}

fn decision_section<S: RenderSurface>(report: &mut SectionWriter<'_, S>, payload: &AnalysisPayload) {
    report.section(SECTION_TITLES[1], None);
    let palette = report.flow.palette().clone();
    let decision_color = match payload.decision {
        Some(eba_core::Decision::Recommended) => palette.good,
        Some(eba_core::Decision::RecommendedWithReservations) => palette.warn,
        Some(eba_core::Decision::NotRecommended) => palette.bad,
        None => palette.muted,
    };
    report.flow.write_line(
        8.0,
        &decision_text(payload),
        &TextStyle::new(FontStyle::Bold, 13.0, decision_color),
    );
    report.flow.advance(2.0);

    match payload.compatibility {
        Some(score) => {
            let bands = &report.config.gauge_bands;
            let color = if score < bands.warn_from {
                palette.bad
            } else if score < bands.good_from {
                palette.warn
            } else {
                palette.good
            };
            labeled_bar(&mut report.flow, "Compatibility", score, SCORE_SCALE_MAX, color);
        }
        None => report.missing("Compatibility"),
    }

    match payload.justification.as_deref() {
        Some(text) => body_text(&mut report.flow, text),
        None => chart_fallback(&mut report.flow, fallback::NO_JUSTIFICATION),
    }

    if !payload.critical_competencies.is_empty() {
        let lines: Vec<String> = payload
            .critical_competencies
            .iter()
            .map(|c| {
                let status = c.status.map(|s| s.label()).unwrap_or("Not assessed");
                match c.assessment.as_deref() {
                    Some(note) => format!("{}: {status}. {note}", c.competency),
                    None => format!("{}: {status}", c.competency),
                }
            })
            .collect();
        card(&mut report.flow, "Role-critical competencies", &lines);
    }
}

fn summary_section<S: RenderSurface>(report: &mut SectionWriter<'_, S>, payload: &AnalysisPayload) {
    report.section(SECTION_TITLES[2], None);
    match payload.executive_summary.as_deref() {
        Some(text) => body_text(&mut report.flow, text),
        None => chart_fallback(&mut report.flow, fallback::NO_SUMMARY),
    }
}

fn personality_section<S: RenderSurface>(
    report: &mut SectionWriter<'_, S>,
    payload: &AnalysisPayload,
) {
    report.section(SECTION_TITLES[3], Some("Big Five traits, scale 0-10."));
    let palette = report.flow.palette().clone();
    let ideal = payload.ideal_profile();
    for (t, value) in payload.traits.canonical() {
        let Some(value) = value else {
            report.missing(t.label());
            continue;
        };
        let color = match ideal.contains(t, value) {
            Some(true) => palette.good,
            Some(false) => palette.warn,
            None => palette.primary,
        };
        labeled_bar(&mut report.flow, t.label(), value, TRAIT_SCALE_MAX, color);
    }

    let ranges: Vec<String> = Trait::CANONICAL
        .iter()
        .filter_map(|t| {
            let (lo, hi) = ideal.range(*t)?;
            Some(format!("{}: {} to {}", t.label(), fmt_score(lo), fmt_score(hi)))
        })
        .collect();
    if !ranges.is_empty() {
        card(&mut report.flow, "Ideal range for the role", &ranges);
    }

    let notes: Vec<String> = Trait::CANONICAL
        .iter()
        .filter_map(|t| {
            let note = payload.trait_analysis.get(t)?;
            Some(format!("{}: {note}", t.label()))
        })
        .collect();
    if !notes.is_empty() {
        card(&mut report.flow, "Trait analysis", &notes);
    }
}

fn emotional_health_section<S: RenderSurface>(
    report: &mut SectionWriter<'_, S>,
    payload: &AnalysisPayload,
) {
    report.section(SECTION_TITLES[5], Some("Indicators on a 0-100 scale."));
    if let Some(context) = payload.emotional_health_context.as_deref() {
        body_text(&mut report.flow, context);
    }
    if payload.emotional_health.is_empty() {
        chart_fallback(&mut report.flow, fallback::NO_EMOTIONAL_HEALTH);
        return;
    }
    let palette = report.flow.palette().clone();
    let thresholds = Thresholds::FIXED;
    for indicator in payload.emotional_health.indicators() {
        let label = indicator.label();
        let Some(score) = indicator.score else {
            report.missing(&label);
            continue;
        };
        let color = match indicator.polarity() {
            IndicatorPolarity::HigherIsBetter => tier_color(score, &thresholds, &palette),
            // Mirror the scale so a high concern reads as bad.
            IndicatorPolarity::HigherIsWorse => {
                tier_color(SCORE_SCALE_MAX - score, &thresholds, &palette)
            }
            IndicatorPolarity::Unknown => palette.primary,
        };
        labeled_bar(&mut report.flow, &label, score, SCORE_SCALE_MAX, color);
    }
}

fn strengths_section<S: RenderSurface>(
    report: &mut SectionWriter<'_, S>,
    payload: &AnalysisPayload,
    buckets: &CompetencyBuckets<'_>,
) {
    let subtitle = format!(
        "Competencies scoring {} or more.",
        fmt_score(STRENGTH_THRESHOLD)
    );
    report.section(SECTION_TITLES[6], Some(subtitle.as_str()));
    let items = competency_lines(&buckets.strengths, report.config.limits.strengths);
    bullet_lines(&mut report.flow, &items, fallback::NO_STRENGTHS);
    if !payload.strengths.is_empty() {
        card(&mut report.flow, "Highlights from the analysis", &payload.strengths);
    }
}

fn risks_section<S: RenderSurface>(
    report: &mut SectionWriter<'_, S>,
    payload: &AnalysisPayload,
    buckets: &CompetencyBuckets<'_>,
) {
    let subtitle = format!(
        "Competencies scoring below {}.",
        fmt_score(CRITICAL_THRESHOLD)
    );
    report.section(SECTION_TITLES[7], Some(subtitle.as_str()));
    let items = competency_lines(&buckets.critical, report.config.limits.critical_points);
    bullet_lines(&mut report.flow, &items, fallback::NO_CRITICAL_POINTS);
    if !payload.risks.is_empty() {
        card(&mut report.flow, "Points of attention", &payload.risks);
    }
}

fn recommendations_section<S: RenderSurface>(
    report: &mut SectionWriter<'_, S>,
    payload: &AnalysisPayload,
) {
    report.section(SECTION_TITLES[8], None);
    if payload.recommendations.is_empty() {
        chart_fallback(&mut report.flow, fallback::NO_RECOMMENDATIONS);
        return;
    }
    let style = TextStyle::new(FontStyle::Regular, BODY_PT, report.flow.palette().dark);
    for (i, item) in payload
        .recommendations
        .iter()
        .take(report.config.limits.recommendations)
        .enumerate()
    {
        report
            .flow
            .paragraph(&format!("{}. {item}", i + 1), BODY_LINE_MM, &style);
    }
    report.flow.advance(2.0);
}

fn alternative_roles_section<S: RenderSurface>(
    report: &mut SectionWriter<'_, S>,
    payload: &AnalysisPayload,
) {
    report.section(SECTION_TITLES[9], None);
    let items: Vec<String> = payload
        .alternative_roles
        .iter()
        .filter(|r| !r.name.trim().is_empty())
        .take(report.config.limits.alternative_roles)
        .map(|r| match r.justification.as_deref() {
            Some(why) => format!("{}: {why}", r.name.trim()),
            None => r.name.trim().to_string(),
        })
        .collect();
    bullet_lines(&mut report.flow, &items, fallback::NO_ALTERNATIVE_ROLES);
}

fn closing_section<S: RenderSurface>(report: &mut SectionWriter<'_, S>, generated: NaiveDateTime) {
    report.section(SECTION_TITLES[10], None);
    body_text(&mut report.flow, &report.config.disclaimer);
    let muted = TextStyle::new(FontStyle::Regular, BODY_PT - 1.0, report.flow.palette().muted);
    let line = format!(
        "{} {} - generated on {}",
        report.config.app_name,
        report.config.app_version,
        generated.format(TIMESTAMP_FORMAT)
    );
    report.flow.write_line(BODY_LINE_MM, &line, &muted);
}

fn competency_lines(entries: &[&eba_core::Competency], cap: usize) -> Vec<String> {
    entries
        .iter()
        .take(cap)
        .filter_map(|c| Some(format!("{} ({})", c.name.trim(), fmt_score(c.score?))))
        .collect()
}

fn decision_text(payload: &AnalysisPayload) -> String {
    payload
        .decision
        .map(|d| d.label().to_string())
        .unwrap_or_else(|| fallback::NO_DECISION.to_string())
}

fn compatibility_text(payload: &AnalysisPayload) -> String {
    payload
        .compatibility
        .map(|c| format!("{}%", fmt_score(c)))
        .unwrap_or_else(|| fallback::NOT_AVAILABLE.to_string())
}

fn resolve_timestamp(request: &ReportRequest) -> NaiveDateTime {
    request
        .generated_at
        .unwrap_or_else(|| chrono::Local::now().naive_local())
}

fn load_brand_image(path: &Path) -> Result<RasterImage> {
    let brand_error = |message: String| Error::BrandImage {
        path: path.display().to_string(),
        message,
    };
    let decoded = image::open(path).map_err(|e| brand_error(e.to_string()))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(brand_error("empty image".to_string()));
    }
    Ok(RasterImage {
        width,
        height,
        data: ImageData::Rgb(rgb.into_raw()),
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
