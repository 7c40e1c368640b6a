#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use eba_core::AnalysisPayload;
use eba_render::{
    ChartDimensions, ChartError, EncodedChart, RasterBackend, RecordedPage, ReportRequest,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Smallest byte sequence the PDF writer accepts as a JPEG stream.
pub const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

/// Returns the same bytes for every chart.
pub struct FixedJpegBackend;

impl RasterBackend for FixedJpegBackend {
    fn name(&self) -> &'static str {
        "fixed-jpeg"
    }

    fn export(&self, _svg: &str, dims: ChartDimensions) -> Result<EncodedChart, ChartError> {
        let (width, height) = dims.pixel_size();
        Ok(EncodedChart {
            width,
            height,
            jpeg: FAKE_JPEG.to_vec(),
        })
    }
}

pub struct FailingBackend;

impl RasterBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn export(&self, _svg: &str, _dims: ChartDimensions) -> Result<EncodedChart, ChartError> {
        Err(ChartError::SvgParse("forced failure".to_string()))
    }
}

/// Records how many files sit in `dir` each time a chart is exported.
pub struct DirCountingBackend {
    pub dir: PathBuf,
    pub seen: Arc<Mutex<Vec<usize>>>,
}

impl RasterBackend for DirCountingBackend {
    fn name(&self) -> &'static str {
        "dir-counting"
    }

    fn export(&self, svg: &str, dims: ChartDimensions) -> Result<EncodedChart, ChartError> {
        let count = std::fs::read_dir(&self.dir)?.count();
        self.seen.lock().expect("seen lock").push(count);
        FixedJpegBackend.export(svg, dims)
    }
}

pub struct PanickingBackend;

impl RasterBackend for PanickingBackend {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn export(&self, _svg: &str, _dims: ChartDimensions) -> Result<EncodedChart, ChartError> {
        panic!("rasterizer exploded")
    }
}

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .join("fixtures")
        .join("payloads")
        .join(name)
}

pub fn recommended_payload() -> AnalysisPayload {
    let text = std::fs::read_to_string(fixture_path("recommended.json")).expect("read fixture");
    AnalysisPayload::from_json_str(&text).expect("parse fixture")
}

pub fn generated_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .expect("valid timestamp")
}

pub fn request(payload: AnalysisPayload) -> ReportRequest {
    ReportRequest {
        payload,
        role: Some("Data Analyst".to_string()),
        generated_at: Some(generated_at()),
        ..ReportRequest::default()
    }
}

pub fn all_texts(pages: &[RecordedPage]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|p| p.texts().map(str::to_string).collect::<Vec<_>>())
        .collect()
}

/// Texts drawn after the heading `title` and before the heading `next`.
pub fn section_texts(pages: &[RecordedPage], title: &str, next: Option<&str>) -> Vec<String> {
    let texts = all_texts(pages);
    let start = texts
        .iter()
        .position(|t| t == title)
        .unwrap_or_else(|| panic!("section {title:?} not found"));
    let end = next
        .and_then(|n| texts[start + 1..].iter().position(|t| t == n).map(|i| start + 1 + i))
        .unwrap_or(texts.len());
    texts[start + 1..end].to_vec()
}

pub fn bullets(texts: &[String]) -> Vec<String> {
    texts
        .iter()
        .filter_map(|t| t.strip_prefix("- ").map(str::to_string))
        .collect()
}
