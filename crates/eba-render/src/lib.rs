#![forbid(unsafe_code)]

//! Report composition for behavioral-assessment reports.
//!
//! The pipeline is one-directional: [`ReportComposer`] sequences sections, drawing them
//! through [`primitives`] and the [`PageFlow`] cursor onto a [`RenderSurface`]. Charts are
//! built as SVG and rasterized by a [`RasterBackend`] before being placed as images.

pub mod chart;
pub mod compose;
pub mod flow;
pub mod fonts;
pub mod primitives;
#[cfg(feature = "raster")]
pub mod raster;
pub mod surface;

pub use chart::{
    ChartDimensions, ChartError, ChartKind, ChartRasterizer, ChartSpec, EncodedChart,
    RasterBackend, RenderedChart, UnavailableBackend,
};
pub use compose::{
    ComposedReport, Composition, OutlineEntry, ReportComposer, ReportRequest, SECTION_TITLES,
    no_charts,
};
pub use flow::{DocumentCursor, PageChrome, PageFlow};
pub use fonts::{BuiltinFonts, FontProvider, FontStyle};
#[cfg(feature = "raster")]
pub use raster::ResvgBackend;
pub use surface::{
    BoxStyle, DocumentInfo, DrawOp, ImageData, PdfSurface, RasterImage, RecordedPage,
    RecordingSurface, Rect, RenderSurface, SurfaceError, TextStyle, blank_pdf,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] eba_core::Error),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("failed to load brand image {path}: {message}")]
    BrandImage { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
