//! Chart construction and rasterization.
//!
//! A [`ChartSpec`] is turned into an SVG document here; a [`RasterBackend`] turns that SVG
//! into a JPEG. The result is parked in an ephemeral file until the caller has placed it and
//! calls [`RenderedChart::release`].

mod bars;
mod gauge;
mod radar;
mod svg;

pub use bars::tier_color;

use crate::surface::{ImageData, RasterImage};
use eba_core::{ChartSize, GaugeBands, Palette, Thresholds};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const MIN_CHART_PX: u32 = 64;
pub const MAX_CHART_PX: u32 = 4096;
pub const MIN_SCALE: f32 = 0.25;
pub const MAX_SCALE: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Radar,
    Bars,
    Gauge,
}

impl ChartKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Radar => "radar",
            Self::Bars => "bars",
            Self::Gauge => "gauge",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarAxis {
    pub label: String,
    pub value: Option<f64>,
    /// Inclusive ideal range on the same scale as `value`.
    pub ideal: Option<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarItem {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartSpec {
    Radar { axes: Vec<RadarAxis>, max: f64 },
    Bars { items: Vec<BarItem>, thresholds: Thresholds },
    Gauge { value: f64, bands: GaugeBands },
}

impl ChartSpec {
    pub fn kind(&self) -> ChartKind {
        match self {
            Self::Radar { .. } => ChartKind::Radar,
            Self::Bars { .. } => ChartKind::Bars,
            Self::Gauge { .. } => ChartKind::Gauge,
        }
    }

    /// A chart with nothing to plot. Radar needs at least one present value.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Radar { axes, .. } => axes.iter().all(|a| a.value.is_none()),
            Self::Bars { items, .. } => items.is_empty(),
            Self::Gauge { value, .. } => !value.is_finite(),
        }
    }

    pub fn to_svg(&self, palette: &Palette, dims: ChartDimensions) -> String {
        let (w, h) = (dims.width_px, dims.height_px);
        match self {
            Self::Radar { axes, max } => radar::radar_svg(axes, *max, palette, w, h),
            Self::Bars { items, thresholds } => bars::bars_svg(items, thresholds, palette, w, h),
            Self::Gauge { value, bands } => gauge::gauge_svg(*value, bands, palette, w, h),
        }
    }
}

/// Logical chart size in SVG units plus the raster scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartDimensions {
    pub width_px: u32,
    pub height_px: u32,
    pub scale: f32,
}

impl ChartDimensions {
    pub fn new(width_px: u32, height_px: u32, scale: f32) -> Self {
        Self {
            width_px,
            height_px,
            scale,
        }
        .normalized()
    }

    pub fn normalized(self) -> Self {
        let scale = if self.scale.is_finite() && self.scale > 0.0 {
            self.scale.clamp(MIN_SCALE, MAX_SCALE)
        } else {
            1.0
        };
        Self {
            width_px: self.width_px.clamp(MIN_CHART_PX, MAX_CHART_PX),
            height_px: self.height_px.clamp(MIN_CHART_PX, MAX_CHART_PX),
            scale,
        }
    }

    /// Output pixel size after scaling.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |v: u32| ((v as f32) * self.scale).ceil().max(1.0) as u32;
        (px(self.width_px), px(self.height_px))
    }
}

impl From<ChartSize> for ChartDimensions {
    fn from(size: ChartSize) -> Self {
        Self::new(size.width_px, size.height_px, size.scale)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChart {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("no raster backend is available")]
    Unavailable,
    #[error("chart has no data to plot")]
    Empty,
    #[error("failed to parse chart SVG: {0}")]
    SvgParse(String),
    #[error("failed to allocate a {width}x{height} pixmap")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("failed to encode JPEG: {0}")]
    JpegEncode(String),
    #[error("chart image is unreadable: {0}")]
    Decode(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Converts chart SVG into JPEG bytes.
pub trait RasterBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn export(&self, svg: &str, dims: ChartDimensions) -> Result<EncodedChart, ChartError>;
}

/// Backend used when the crate is built without rasterization support.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBackend;

impl RasterBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn export(&self, _svg: &str, _dims: ChartDimensions) -> Result<EncodedChart, ChartError> {
        Err(ChartError::Unavailable)
    }
}

/// A chart image waiting on disk to be placed.
#[derive(Debug)]
pub struct RenderedChart {
    path: tempfile::TempPath,
    pub kind: ChartKind,
    pub width: u32,
    pub height: u32,
}

impl RenderedChart {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<RasterImage, ChartError> {
        let jpeg = std::fs::read(&self.path)?;
        if jpeg.is_empty() {
            return Err(ChartError::Decode("empty file".to_string()));
        }
        Ok(RasterImage {
            width: self.width,
            height: self.height,
            data: ImageData::Jpeg(jpeg),
        })
    }

    /// Deletes the backing file.
    pub fn release(self) -> std::io::Result<()> {
        self.path.close()
    }
}

pub struct ChartRasterizer {
    backend: Box<dyn RasterBackend>,
    palette: Palette,
    temp_dir: Option<PathBuf>,
}

impl std::fmt::Debug for ChartRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartRasterizer")
            .field("backend", &self.backend.name())
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl ChartRasterizer {
    pub fn new(backend: Box<dyn RasterBackend>, palette: Palette) -> Self {
        Self {
            backend,
            palette,
            temp_dir: None,
        }
    }

    /// Parks chart files in `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Renders `spec` to an ephemeral JPEG file. Every failure is logged and yields `None`.
    pub fn render(&self, spec: &ChartSpec, dims: ChartDimensions) -> Option<RenderedChart> {
        let kind = spec.kind();
        match self.try_render(spec, dims.normalized()) {
            Ok(chart) => {
                debug!(
                    chart = kind.label(),
                    width = chart.width,
                    height = chart.height,
                    "chart rendered"
                );
                Some(chart)
            }
            Err(err) => {
                warn!(
                    chart = kind.label(),
                    backend = self.backend.name(),
                    error = %err,
                    "chart unavailable"
                );
                None
            }
        }
    }

    fn try_render(&self, spec: &ChartSpec, dims: ChartDimensions) -> Result<RenderedChart, ChartError> {
        if spec.is_empty() {
            return Err(ChartError::Empty);
        }
        let svg = spec.to_svg(&self.palette, dims);
        let encoded = self.backend.export(&svg, dims)?;
        if encoded.jpeg.is_empty() || encoded.width == 0 || encoded.height == 0 {
            return Err(ChartError::JpegEncode("backend returned an empty image".to_string()));
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("eba-chart-").suffix(".jpg");
        let mut file = match self.temp_dir.as_deref() {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(&encoded.jpeg)?;
        file.flush()?;
        Ok(RenderedChart {
            path: file.into_temp_path(),
            kind: spec.kind(),
            width: encoded.width,
            height: encoded.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedBackend;

    impl RasterBackend for FixedBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn export(&self, svg: &str, dims: ChartDimensions) -> Result<EncodedChart, ChartError> {
            assert!(svg.starts_with("<svg"));
            let (width, height) = dims.pixel_size();
            Ok(EncodedChart {
                width,
                height,
                jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
            })
        }
    }

    fn gauge(value: f64) -> ChartSpec {
        ChartSpec::Gauge {
            value,
            bands: GaugeBands::default(),
        }
    }

    #[test]
    fn dimensions_are_clamped() {
        let d = ChartDimensions::new(10, 10_000, 9.0);
        assert_eq!((d.width_px, d.height_px, d.scale), (64, 4096, 4.0));
        assert_eq!(ChartDimensions::new(800, 600, f32::NAN).scale, 1.0);
        assert_eq!(ChartDimensions::new(800, 600, -2.0).scale, 1.0);
        assert_eq!(ChartDimensions::new(800, 600, 0.1).scale, 0.25);
        assert_eq!(ChartDimensions::new(800, 600, 2.0).pixel_size(), (1600, 1200));
    }

    #[test]
    fn config_sizes_convert() {
        let d = ChartDimensions::from(ChartSize {
            width_px: 1000,
            height_px: 420,
            scale: 2.0,
        });
        assert_eq!(d.pixel_size(), (2000, 840));
    }

    #[test]
    fn unavailable_backend_yields_none() {
        let r = ChartRasterizer::new(Box::new(UnavailableBackend), Palette::default());
        assert!(r.render(&gauge(82.0), ChartDimensions::new(1000, 420, 1.0)).is_none());
    }

    #[test]
    fn empty_specs_are_not_rendered() {
        let r = ChartRasterizer::new(Box::new(FixedBackend), Palette::default());
        let bars = ChartSpec::Bars {
            items: Vec::new(),
            thresholds: Thresholds::FIXED,
        };
        assert!(r.render(&bars, ChartDimensions::new(1100, 700, 1.0)).is_none());
        assert!(r.render(&gauge(f64::NAN), ChartDimensions::new(1000, 420, 1.0)).is_none());
    }

    #[test]
    fn rendered_chart_lives_until_released() {
        let r = ChartRasterizer::new(Box::new(FixedBackend), Palette::default());
        let chart = r
            .render(&gauge(82.0), ChartDimensions::new(1000, 420, 1.0))
            .unwrap();
        let path = chart.path().to_path_buf();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("eba-chart-") && name.ends_with(".jpg"));

        let image = chart.load().unwrap();
        assert_eq!((image.width, image.height), (1000, 420));
        chart.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn chart_files_go_to_the_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let r = ChartRasterizer::new(Box::new(FixedBackend), Palette::default())
            .with_temp_dir(dir.path());
        let chart = r
            .render(&gauge(40.0), ChartDimensions::new(1000, 420, 1.0))
            .unwrap();
        assert_eq!(chart.path().parent(), Some(dir.path()));
        chart.release().unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_temp_dir_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let r = ChartRasterizer::new(Box::new(FixedBackend), Palette::default())
            .with_temp_dir(dir.path().join("absent"));
        assert!(r.render(&gauge(40.0), ChartDimensions::new(1000, 420, 1.0)).is_none());
    }
}
