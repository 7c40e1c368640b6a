//! Rendering-surface abstraction and its PDF implementation.
//!
//! Surfaces work in millimetres with the origin at the top-left corner of the page, the way the
//! page flow reasons about layout. [`PdfSurface`] converts to PDF user space (points, origin at
//! the bottom-left) at the boundary.

use crate::fonts::{FontProvider, FontStyle, MM_PER_PT};
use chrono::{Datelike, NaiveDateTime, Timelike};
use eba_core::Rgb;
use pdf_writer::{Content, Date, Filter, Name, Pdf, Rect as PdfRect, Ref, Str, TextStr};
use std::sync::Arc;

/// Axis-aligned rectangle in millimetres, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: FontStyle,
    pub size_pt: f32,
    pub color: Rgb,
}

impl TextStyle {
    pub const fn new(font: FontStyle, size_pt: f32, color: Rgb) -> Self {
        Self {
            font,
            size_pt,
            color,
        }
    }

    pub fn size_mm(&self) -> f32 {
        self.size_pt * MM_PER_PT
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStyle {
    pub fill: Option<Rgb>,
    pub stroke: Option<Rgb>,
    pub stroke_width_mm: f32,
    /// Corner radius; surfaces without rounded corners ignore it.
    pub radius_mm: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// Baseline JPEG, embedded as-is.
    Jpeg(Vec<u8>),
    /// Packed 8-bit RGB samples, `width * height * 3` bytes.
    Rgb(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub data: ImageData,
}

impl RasterImage {
    /// Height over width, or `None` for a degenerate image.
    pub fn aspect_ratio(&self) -> Option<f32> {
        (self.width > 0 && self.height > 0).then(|| self.height as f32 / self.width as f32)
    }

    fn validate(&self) -> Result<(), SurfaceError> {
        if self.width == 0 || self.height == 0 {
            return Err(SurfaceError::Image {
                message: format!("degenerate size {}x{}", self.width, self.height),
            });
        }
        match &self.data {
            ImageData::Jpeg(bytes) if bytes.is_empty() => Err(SurfaceError::Image {
                message: "empty JPEG stream".to_string(),
            }),
            ImageData::Rgb(bytes)
                if bytes.len() != (self.width as usize) * (self.height as usize) * 3 =>
            {
                Err(SurfaceError::Image {
                    message: format!(
                        "expected {} RGB bytes, got {}",
                        (self.width as usize) * (self.height as usize) * 3,
                        bytes.len()
                    ),
                })
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("character {ch:?} cannot be encoded in {font}")]
    Unencodable { ch: char, font: &'static str },
    #[error("text runs past the page edge ({width_mm:.1} mm wide, {available_mm:.1} mm available)")]
    Overflow { width_mm: f32, available_mm: f32 },
    #[error("no page is open")]
    NoPage,
    #[error("invalid image: {message}")]
    Image { message: String },
}

/// Drawing operations the page flow and primitives rely on.
pub trait RenderSurface {
    type Output;

    fn begin_page(&mut self);

    fn page_count(&self) -> usize;

    /// Plain rectangle, filled and/or stroked.
    fn rect(&mut self, rect: Rect, fill: Option<Rgb>, stroke: Option<(Rgb, f32)>);

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width_mm: f32);

    /// Background box for cards. Surfaces that can round corners override this.
    fn draw_box(&mut self, rect: Rect, style: &BoxStyle) {
        self.rect(
            rect,
            style.fill,
            style.stroke.map(|color| (color, style.stroke_width_mm)),
        );
    }

    /// Draws one line of text with its baseline at `baseline_y`.
    fn text(
        &mut self,
        x: f32,
        baseline_y: f32,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), SurfaceError>;

    fn image(&mut self, image: &RasterImage, rect: Rect) -> Result<(), SurfaceError>;

    fn finish(self) -> Result<Self::Output, SurfaceError>;
}

/// Metadata written to the PDF document information dictionary.
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub creator: String,
    pub created: Option<NaiveDateTime>,
}

struct PageRecord {
    page_id: Ref,
    content_id: Ref,
    images: Vec<(String, Ref)>,
    content: Vec<u8>,
}

/// Writes pages straight into a [`pdf_writer::Pdf`] using the standard Helvetica faces.
pub struct PdfSurface {
    pdf: Pdf,
    next_id: i32,
    catalog_id: Ref,
    pages_id: Ref,
    regular_font: Ref,
    bold_font: Ref,
    width_mm: f32,
    height_mm: f32,
    fonts: Arc<dyn FontProvider>,
    compress: bool,
    pages: Vec<PageRecord>,
    current: Option<Content>,
    image_count: usize,
    info: DocumentInfo,
}

const REGULAR: Name<'static> = Name(b"F1");
const BOLD: Name<'static> = Name(b"F2");
/// Bezier control-point factor for quarter circles.
const KAPPA: f32 = 0.552_284_8;

fn pt(mm: f32) -> f32 {
    mm / MM_PER_PT
}

impl PdfSurface {
    pub fn new(
        width_mm: f32,
        height_mm: f32,
        fonts: Arc<dyn FontProvider>,
        compress: bool,
        info: DocumentInfo,
    ) -> Self {
        let mut surface = Self {
            pdf: Pdf::new(),
            next_id: 1,
            catalog_id: Ref::new(1),
            pages_id: Ref::new(1),
            regular_font: Ref::new(1),
            bold_font: Ref::new(1),
            width_mm,
            height_mm,
            fonts,
            compress,
            pages: Vec::new(),
            current: None,
            image_count: 0,
            info,
        };
        surface.catalog_id = surface.alloc();
        surface.pages_id = surface.alloc();
        surface.regular_font = surface.alloc();
        surface.bold_font = surface.alloc();

        for (id, style) in [
            (surface.regular_font, FontStyle::Regular),
            (surface.bold_font, FontStyle::Bold),
        ] {
            surface
                .pdf
                .type1_font(id)
                .base_font(Name(style.base_font().as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }
        surface
    }

    fn alloc(&mut self) -> Ref {
        let id = Ref::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn content(&mut self) -> Result<&mut Content, SurfaceError> {
        self.current.as_mut().ok_or(SurfaceError::NoPage)
    }

    fn flush_page(&mut self) {
        if let (Some(content), Some(page)) = (self.current.take(), self.pages.last_mut()) {
            page.content = content.finish().as_slice().to_vec();
        }
    }

    /// PDF y coordinate of a top-origin millimetre position.
    fn y(&self, y_mm: f32) -> f32 {
        pt(self.height_mm - y_mm)
    }

    fn encode(&self, text: &str, font: FontStyle) -> Result<Vec<u8>, SurfaceError> {
        text.chars()
            .map(|ch| {
                if self.fonts.can_encode(font, ch) {
                    // WinAnsi matches Latin-1 for every character the font provider accepts.
                    Ok(ch as u32 as u8)
                } else {
                    Err(SurfaceError::Unencodable {
                        ch,
                        font: font.base_font(),
                    })
                }
            })
            .collect()
    }

    fn write_info(&mut self) {
        let info_id = self.alloc();
        let info = self.info.clone();
        let mut dict = self.pdf.document_info(info_id);
        if !info.title.is_empty() {
            dict.title(TextStr(&info.title));
        }
        if !info.author.is_empty() {
            dict.author(TextStr(&info.author));
        }
        if !info.creator.is_empty() {
            dict.creator(TextStr(&info.creator));
        }
        dict.producer(TextStr(concat!("eba-render ", env!("CARGO_PKG_VERSION"))));
        if let Some(at) = info.created {
            let date = Date::new(u16::try_from(at.year()).unwrap_or(2000))
                .month(at.month() as u8)
                .day(at.day() as u8)
                .hour(at.hour() as u8)
                .minute(at.minute() as u8)
                .second(at.second() as u8);
            dict.creation_date(date);
        }
    }
}

impl RenderSurface for PdfSurface {
    type Output = Vec<u8>;

    fn begin_page(&mut self) {
        self.flush_page();
        let page_id = self.alloc();
        let content_id = self.alloc();
        self.pages.push(PageRecord {
            page_id,
            content_id,
            images: Vec::new(),
            content: Vec::new(),
        });
        self.current = Some(Content::new());
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn rect(&mut self, rect: Rect, fill: Option<Rgb>, stroke: Option<(Rgb, f32)>) {
        if fill.is_none() && stroke.is_none() {
            return;
        }
        let (x, y) = (pt(rect.x), self.y(rect.bottom()));
        let Ok(content) = self.content() else {
            return;
        };
        content.save_state();
        if let Some(color) = fill {
            let (r, g, b) = color.to_unit();
            content.set_fill_rgb(r, g, b);
        }
        if let Some((color, width)) = stroke {
            let (r, g, b) = color.to_unit();
            content.set_stroke_rgb(r, g, b);
            content.set_line_width(pt(width));
        }
        content.rect(x, y, pt(rect.w), pt(rect.h));
        match (fill.is_some(), stroke.is_some()) {
            (true, true) => content.fill_nonzero_and_stroke(),
            (true, false) => content.fill_nonzero(),
            _ => content.stroke(),
        };
        content.restore_state();
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width_mm: f32) {
        let (x0, y0) = (pt(from.0), self.y(from.1));
        let (x1, y1) = (pt(to.0), self.y(to.1));
        let Ok(content) = self.content() else {
            return;
        };
        let (r, g, b) = color.to_unit();
        content.save_state();
        content.set_stroke_rgb(r, g, b);
        content.set_line_width(pt(width_mm));
        content.move_to(x0, y0);
        content.line_to(x1, y1);
        content.stroke();
        content.restore_state();
    }

    fn draw_box(&mut self, rect: Rect, style: &BoxStyle) {
        let radius = style.radius_mm.min(rect.w / 2.0).min(rect.h / 2.0);
        if radius <= 0.0 || (style.fill.is_none() && style.stroke.is_none()) {
            self.rect(
                rect,
                style.fill,
                style.stroke.map(|c| (c, style.stroke_width_mm)),
            );
            return;
        }

        let (left, right) = (pt(rect.x), pt(rect.right()));
        let (top, bottom) = (self.y(rect.y), self.y(rect.bottom()));
        let r = pt(radius);
        let k = r * KAPPA;
        let Ok(content) = self.content() else {
            return;
        };
        content.save_state();
        if let Some(color) = style.fill {
            let (cr, cg, cb) = color.to_unit();
            content.set_fill_rgb(cr, cg, cb);
        }
        if let Some(color) = style.stroke {
            let (cr, cg, cb) = color.to_unit();
            content.set_stroke_rgb(cr, cg, cb);
            content.set_line_width(pt(style.stroke_width_mm));
        }
        content.move_to(left + r, bottom);
        content.line_to(right - r, bottom);
        content.cubic_to(right - r + k, bottom, right, bottom + r - k, right, bottom + r);
        content.line_to(right, top - r);
        content.cubic_to(right, top - r + k, right - r + k, top, right - r, top);
        content.line_to(left + r, top);
        content.cubic_to(left + r - k, top, left, top - r + k, left, top - r);
        content.line_to(left, bottom + r);
        content.cubic_to(left, bottom + r - k, left + r - k, bottom, left + r, bottom);
        content.close_path();
        match (style.fill.is_some(), style.stroke.is_some()) {
            (true, true) => content.fill_nonzero_and_stroke(),
            (true, false) => content.fill_nonzero(),
            _ => content.stroke(),
        };
        content.restore_state();
    }

    fn text(
        &mut self,
        x: f32,
        baseline_y: f32,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), SurfaceError> {
        if text.is_empty() {
            return Ok(());
        }
        let bytes = self.encode(text, style.font)?;
        let width_mm = self.fonts.text_width_mm(text, style.font, style.size_pt);
        let available_mm = self.width_mm - x;
        if width_mm > available_mm + 0.01 {
            return Err(SurfaceError::Overflow {
                width_mm,
                available_mm,
            });
        }

        let font = match style.font {
            FontStyle::Regular => REGULAR,
            FontStyle::Bold => BOLD,
        };
        let (px, py) = (pt(x), self.y(baseline_y));
        let (r, g, b) = style.color.to_unit();
        let content = self.content()?;
        content.set_fill_rgb(r, g, b);
        content
            .begin_text()
            .set_font(font, style.size_pt)
            .next_line(px, py)
            .show(Str(&bytes))
            .end_text();
        Ok(())
    }

    fn image(&mut self, image: &RasterImage, rect: Rect) -> Result<(), SurfaceError> {
        image.validate()?;
        if self.current.is_none() {
            return Err(SurfaceError::NoPage);
        }

        let xobj_id = self.alloc();
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        match &image.data {
            ImageData::Jpeg(bytes) => {
                let mut xobj = self.pdf.image_xobject(xobj_id, bytes);
                xobj.filter(Filter::DctDecode);
                xobj.width(image.width as i32);
                xobj.height(image.height as i32);
                xobj.color_space().device_rgb();
                xobj.bits_per_component(8);
            }
            ImageData::Rgb(samples) => {
                let compressed = miniz_oxide::deflate::compress_to_vec_zlib(samples, 6);
                let mut xobj = self.pdf.image_xobject(xobj_id, &compressed);
                xobj.filter(Filter::FlateDecode);
                xobj.width(image.width as i32);
                xobj.height(image.height as i32);
                xobj.color_space().device_rgb();
                xobj.bits_per_component(8);
            }
        }

        let (x, y) = (pt(rect.x), self.y(rect.bottom()));
        let (w, h) = (pt(rect.w), pt(rect.h));
        let content = self.content()?;
        content.save_state();
        content.transform([w, 0.0, 0.0, h, x, y]);
        content.x_object(Name(name.as_bytes()));
        content.restore_state();
        if let Some(page) = self.pages.last_mut() {
            page.images.push((name, xobj_id));
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, SurfaceError> {
        if self.pages.is_empty() {
            self.begin_page();
        }
        self.flush_page();
        self.write_info();

        let media = PdfRect::new(0.0, 0.0, pt(self.width_mm), pt(self.height_mm));
        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        self.pdf
            .pages(self.pages_id)
            .kids(self.pages.iter().map(|p| p.page_id))
            .count(self.pages.len() as i32);

        for page in &self.pages {
            let mut obj = self.pdf.page(page.page_id);
            obj.media_box(media)
                .parent(self.pages_id)
                .contents(page.content_id);
            let mut resources = obj.resources();
            resources
                .fonts()
                .pair(REGULAR, self.regular_font)
                .pair(BOLD, self.bold_font);
            if !page.images.is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, id) in &page.images {
                    xobjects.pair(Name(name.as_bytes()), *id);
                }
            }
        }

        for page in &self.pages {
            if self.compress {
                let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&page.content, 6);
                self.pdf
                    .stream(page.content_id, &compressed)
                    .filter(Filter::FlateDecode);
            } else {
                self.pdf.stream(page.content_id, &page.content);
            }
        }

        Ok(self.pdf.finish())
    }
}

/// A valid single-page PDF with nothing on it.
pub fn blank_pdf(width_mm: f32, height_mm: f32) -> Vec<u8> {
    let mut pdf = Pdf::new();
    let (catalog, pages, page, content) = (Ref::new(1), Ref::new(2), Ref::new(3), Ref::new(4));
    pdf.catalog(catalog).pages(pages);
    pdf.pages(pages).kids([page]).count(1);
    pdf.page(page)
        .media_box(PdfRect::new(0.0, 0.0, pt(width_mm), pt(height_mm)))
        .parent(pages)
        .contents(content);
    pdf.stream(content, &[]);
    pdf.finish()
}

/// One drawing operation captured by [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        rect: Rect,
        fill: Option<Rgb>,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
    },
    Box {
        rect: Rect,
        style: BoxStyle,
    },
    Text {
        x: f32,
        baseline_y: f32,
        text: String,
        style: TextStyle,
    },
    Image {
        rect: Rect,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedPage {
    pub ops: Vec<DrawOp>,
}

impl RecordedPage {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn boxes(&self) -> impl Iterator<Item = Rect> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Box { rect, .. } => Some(*rect),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = Rect> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Image { rect, .. } => Some(*rect),
            _ => None,
        })
    }
}

/// Surface that records operations instead of producing bytes. Useful for layout dry runs.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pages: Vec<RecordedPage>,
    max_text_chars: Option<usize>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every text draw longer than `max_chars` fail, to exercise fallbacks.
    pub fn with_text_limit(max_chars: usize) -> Self {
        Self {
            pages: Vec::new(),
            max_text_chars: Some(max_chars),
        }
    }

    pub fn pages(&self) -> &[RecordedPage] {
        &self.pages
    }

    fn push(&mut self, op: DrawOp) -> Result<(), SurfaceError> {
        let page = self.pages.last_mut().ok_or(SurfaceError::NoPage)?;
        page.ops.push(op);
        Ok(())
    }
}

impl RenderSurface for RecordingSurface {
    type Output = Vec<RecordedPage>;

    fn begin_page(&mut self) {
        self.pages.push(RecordedPage::default());
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn rect(&mut self, rect: Rect, fill: Option<Rgb>, _stroke: Option<(Rgb, f32)>) {
        let _ = self.push(DrawOp::Rect { rect, fill });
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), _color: Rgb, _width_mm: f32) {
        let _ = self.push(DrawOp::Line { from, to });
    }

    fn draw_box(&mut self, rect: Rect, style: &BoxStyle) {
        let _ = self.push(DrawOp::Box {
            rect,
            style: *style,
        });
    }

    fn text(
        &mut self,
        x: f32,
        baseline_y: f32,
        text: &str,
        style: &TextStyle,
    ) -> Result<(), SurfaceError> {
        let chars = text.chars().count();
        if let Some(max) = self.max_text_chars.filter(|max| chars > *max) {
            return Err(SurfaceError::Overflow {
                width_mm: chars as f32,
                available_mm: max as f32,
            });
        }
        self.push(DrawOp::Text {
            x,
            baseline_y,
            text: text.to_string(),
            style: *style,
        })
    }

    fn image(&mut self, image: &RasterImage, rect: Rect) -> Result<(), SurfaceError> {
        image.validate()?;
        self.push(DrawOp::Image {
            rect,
            width: image.width,
            height: image.height,
        })
    }

    fn finish(self) -> Result<Vec<RecordedPage>, SurfaceError> {
        Ok(self.pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::BuiltinFonts;

    fn surface(compress: bool) -> PdfSurface {
        PdfSurface::new(
            210.0,
            297.0,
            Arc::new(BuiltinFonts),
            compress,
            DocumentInfo {
                title: "Test".to_string(),
                ..DocumentInfo::default()
            },
        )
    }

    fn style() -> TextStyle {
        TextStyle::new(FontStyle::Regular, 11.0, Rgb::new(0, 0, 0))
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn page_objects(pdf: &[u8]) -> usize {
        count(pdf, b"/Type /Page") - count(pdf, b"/Type /Pages")
    }

    #[test]
    fn writes_one_page_object_per_begun_page() {
        let mut s = surface(false);
        s.begin_page();
        s.text(15.0, 20.0, "Hello", &style()).unwrap();
        s.begin_page();
        s.text(15.0, 20.0, "Página 2", &style()).unwrap();
        assert_eq!(s.page_count(), 2);

        let bytes = s.finish().unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(page_objects(&bytes), 2);
        assert_eq!(count(&bytes, b"(Hello) Tj"), 1);
        assert_eq!(count(&bytes, b" Tj"), 2);
        assert_eq!(count(&bytes, b"/WinAnsiEncoding"), 2);
    }

    #[test]
    fn rejects_unencodable_text_and_overflow() {
        let mut s = surface(false);
        assert!(matches!(s.text(0.0, 10.0, "x", &style()), Err(SurfaceError::NoPage)));
        s.begin_page();
        let err = s.text(15.0, 20.0, "em\u{2014}dash", &style()).unwrap_err();
        assert!(matches!(err, SurfaceError::Unencodable { ch: '\u{2014}', .. }));
        let long = "W".repeat(200);
        let err = s.text(15.0, 20.0, &long, &style()).unwrap_err();
        assert!(matches!(err, SurfaceError::Overflow { .. }));
    }

    #[test]
    fn embeds_images_as_page_xobjects() {
        let mut s = surface(true);
        s.begin_page();
        let image = RasterImage {
            width: 2,
            height: 1,
            data: ImageData::Rgb(vec![255, 0, 0, 0, 0, 255]),
        };
        s.image(&image, Rect::new(10.0, 10.0, 20.0, 10.0)).unwrap();
        let bad = RasterImage {
            width: 2,
            height: 2,
            data: ImageData::Rgb(vec![0; 3]),
        };
        assert!(s.image(&bad, Rect::new(0.0, 0.0, 1.0, 1.0)).is_err());

        let bytes = s.finish().unwrap();
        assert_eq!(count(&bytes, b"/Subtype /Image"), 1);
        assert_eq!(count(&bytes, b"/Im1"), 1);
    }

    #[test]
    fn finish_without_pages_still_yields_a_page() {
        let bytes = surface(true).finish().unwrap();
        assert_eq!(page_objects(&bytes), 1);
        assert!(blank_pdf(210.0, 297.0).starts_with(b"%PDF-"));
    }
}
