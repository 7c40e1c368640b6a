//! Report configuration.
//!
//! Every field has a default, so an empty JSON object (or no config file at all) yields the
//! stock report. Unknown keys are ignored to keep older config files loadable.

use crate::sanitize::{DEFAULT_MAX_TOKEN_LEN, SanitizeOptions};
use crate::theme::Palette;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Competencies scoring at or above this value are listed as strengths.
pub const STRENGTH_THRESHOLD: f64 = 55.0;
/// Competencies scoring strictly below this value are listed as critical points.
pub const CRITICAL_THRESHOLD: f64 = 45.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub brand: String,
    pub app_name: String,
    pub app_version: String,
    pub title: String,
    /// Printed on the closing page and, when `footer_disclaimer` is set, on every footer.
    pub disclaimer: String,
    pub footer_disclaimer: bool,
    pub page: PageGeometry,
    pub max_token_len: usize,
    pub gauge_bands: GaugeBands,
    pub limits: ListLimits,
    pub charts: ChartSizes,
    /// Deflate page content streams. Disable to get greppable output when debugging.
    pub compress: bool,
    /// Extra directory scanned for chart fonts in addition to the system fonts.
    pub font_dir: Option<PathBuf>,
    /// Where chart images are parked between rasterization and placement. Defaults to the
    /// system temp directory.
    pub chart_dir: Option<PathBuf>,
    pub palette: Palette,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            brand: "Elder Brain Analytics".to_string(),
            app_name: "Elder Brain Analytics - Corporate".to_string(),
            app_version: "V9.1-PROD".to_string(),
            title: "Corporate Report".to_string(),
            disclaimer: "This report supports, and does not replace, a professional hiring \
                         decision. Scores derive from a behavioral assessment and an automated \
                         analysis; interpret them together with interviews and references."
                .to_string(),
            footer_disclaimer: false,
            page: PageGeometry::default(),
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
            gauge_bands: GaugeBands::default(),
            limits: ListLimits::default(),
            charts: ChartSizes::default(),
            compress: true,
            font_dir: None,
            chart_dir: None,
            palette: Palette::default(),
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(Error::ConfigJson)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn sanitize_options(&self) -> SanitizeOptions {
        SanitizeOptions::with_max_token_len(self.max_token_len)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::InvalidConfig { message });

        let g = &self.gauge_bands;
        if !(0.0..=100.0).contains(&g.warn_from)
            || !(0.0..=100.0).contains(&g.good_from)
            || g.warn_from > g.good_from
        {
            return invalid(format!(
                "gauge bands must satisfy 0 <= warn_from ({}) <= good_from ({}) <= 100",
                g.warn_from, g.good_from
            ));
        }

        let p = &self.page;
        let usable_w = p.width_mm - p.margin_left_mm - p.margin_right_mm;
        let usable_h = p.height_mm - p.margin_top_mm - p.margin_bottom_mm;
        if !(usable_w > 40.0 && usable_h > 60.0) {
            return invalid(format!(
                "page geometry leaves no room for content ({usable_w:.1} x {usable_h:.1} mm)"
            ));
        }
        if self.max_token_len == 0 {
            return invalid("max_token_len must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Page size and margins in millimetres. Defaults to portrait A4.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_left_mm: f32,
    pub margin_top_mm: f32,
    pub margin_right_mm: f32,
    pub margin_bottom_mm: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_left_mm: 15.0,
            margin_top_mm: 16.0,
            margin_right_mm: 15.0,
            margin_bottom_mm: 16.0,
        }
    }
}

/// Competency classification cut-offs. Not configurable: every report and `validate` run
/// classifies with [`Thresholds::FIXED`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub strength: f64,
    pub critical: f64,
}

impl Thresholds {
    pub const FIXED: Self = Self {
        strength: STRENGTH_THRESHOLD,
        critical: CRITICAL_THRESHOLD,
    };
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::FIXED
    }
}

/// Compatibility gauge color bands: `[0, warn_from)` bad, `[warn_from, good_from)` warn,
/// `[good_from, 100]` good.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeBands {
    pub warn_from: f64,
    pub good_from: f64,
}

impl Default for GaugeBands {
    fn default() -> Self {
        Self {
            warn_from: 50.0,
            good_from: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListLimits {
    pub strengths: usize,
    pub critical_points: usize,
    pub recommendations: usize,
    pub alternative_roles: usize,
    pub chart_competencies: usize,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            strengths: 12,
            critical_points: 12,
            recommendations: 10,
            alternative_roles: 6,
            chart_competencies: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSize {
    pub width_px: u32,
    pub height_px: u32,
    pub scale: f32,
}

impl Default for ChartSize {
    fn default() -> Self {
        Self {
            width_px: 1100,
            height_px: 700,
            scale: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSizes {
    pub radar: ChartSize,
    pub bars: ChartSize,
    pub gauge: ChartSize,
}

impl Default for ChartSizes {
    fn default() -> Self {
        Self {
            radar: ChartSize {
                width_px: 900,
                height_px: 700,
                scale: 2.0,
            },
            bars: ChartSize::default(),
            gauge: ChartSize {
                width_px: 1000,
                height_px: 420,
                scale: 2.0,
            },
        }
    }
}
