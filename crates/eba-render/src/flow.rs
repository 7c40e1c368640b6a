//! Page flow: a single vertical cursor over a [`RenderSurface`].
//!
//! Every text entry point sanitizes its input before measuring or drawing it. Lines are never
//! split across pages: a line, card or image that does not fit in the remaining band starts a
//! new page first.

use crate::fonts::{FontProvider, FontStyle};
use crate::surface::{RenderSurface, SurfaceError, TextStyle};
use eba_core::{PageGeometry, Palette, ReportConfig, SanitizeOptions, sanitize_with};
use std::sync::Arc;

/// Size of the pieces a line is cut into when the surface refuses to draw it whole.
pub const TEXT_CHUNK_CHARS: usize = 120;
/// Drawn in place of text the surface cannot draw even in chunks.
pub const TRUNCATED_PLACEHOLDER: &str = "[content truncated]";

/// Space below the top margin reserved for the running header.
pub const HEADER_RESERVE_MM: f32 = 4.0;
/// Space above the bottom margin reserved for the running footer.
pub const FOOTER_RESERVE_MM: f32 = 4.0;

const EPSILON_MM: f32 = 0.01;
/// Baseline position within a line box, as a fraction of the line height.
const BASELINE_RATIO: f32 = 0.72;

/// Current write position and content band of the open page. Reset on every new page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentCursor {
    /// 1-based page number; 0 before the first page is opened.
    pub page: usize,
    pub y: f32,
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
    pub page_width: f32,
    pub page_height: f32,
}

impl DocumentCursor {
    fn new(geometry: &PageGeometry) -> Self {
        Self {
            page: 0,
            y: geometry.margin_top_mm,
            top: geometry.margin_top_mm,
            bottom: content_bottom(geometry),
            left: geometry.margin_left_mm,
            right: geometry.width_mm - geometry.margin_right_mm,
            page_width: geometry.width_mm,
            page_height: geometry.height_mm,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.right - self.left
    }

    pub fn remaining(&self) -> f32 {
        (self.bottom - self.y).max(0.0)
    }

    /// Height available to a block that starts at the top of a continuation page.
    pub fn band_height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn at_top(&self) -> bool {
        self.y <= self.top + EPSILON_MM
    }
}

fn content_bottom(geometry: &PageGeometry) -> f32 {
    geometry.height_mm - geometry.margin_bottom_mm - FOOTER_RESERVE_MM
}

/// Running header/footer content. Not drawn on the cover page.
#[derive(Debug, Clone)]
pub struct PageChrome {
    pub brand: String,
    pub app_label: String,
    pub footer_note: Option<String>,
    pub palette: Palette,
}

impl PageChrome {
    pub fn from_config(config: &ReportConfig) -> Self {
        Self {
            brand: config.brand.clone(),
            app_label: format!("{} {}", config.app_name, config.app_version),
            footer_note: config
                .footer_disclaimer
                .then(|| config.disclaimer.clone()),
            palette: config.palette.clone(),
        }
    }
}

pub struct PageFlow<S: RenderSurface> {
    surface: S,
    cursor: DocumentCursor,
    geometry: PageGeometry,
    fonts: Arc<dyn FontProvider>,
    chrome: PageChrome,
    sanitize: SanitizeOptions,
    text_fallbacks: usize,
}

impl<S: RenderSurface> PageFlow<S> {
    pub fn new(
        surface: S,
        geometry: PageGeometry,
        fonts: Arc<dyn FontProvider>,
        chrome: PageChrome,
        sanitize: SanitizeOptions,
    ) -> Self {
        Self {
            surface,
            cursor: DocumentCursor::new(&geometry),
            geometry,
            fonts,
            chrome,
            sanitize,
            text_fallbacks: 0,
        }
    }

    pub fn cursor(&self) -> &DocumentCursor {
        &self.cursor
    }

    pub fn fonts(&self) -> &dyn FontProvider {
        self.fonts.as_ref()
    }

    pub fn palette(&self) -> &Palette {
        &self.chrome.palette
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Number of lines that needed the chunked or placeholder fallback.
    pub fn text_fallbacks(&self) -> usize {
        self.text_fallbacks
    }

    pub fn sanitize(&self, text: &str) -> String {
        sanitize_with(text, &self.sanitize)
    }

    /// Opens a new page and resets the cursor to the top of its content band.
    pub fn new_page(&mut self) {
        self.surface.begin_page();
        let page = self.surface.page_count();
        let chrome_reserve = if page > 1 { HEADER_RESERVE_MM } else { 0.0 };
        self.cursor = DocumentCursor {
            page,
            y: self.geometry.margin_top_mm + chrome_reserve,
            top: self.geometry.margin_top_mm + chrome_reserve,
            ..DocumentCursor::new(&self.geometry)
        };
        if page > 1 {
            self.draw_header();
            self.draw_footer();
        }
        tracing::trace!(page, "opened page");
    }

    /// Starts a new page when less than `required` millimetres remain. Returns whether it did.
    ///
    /// A block taller than the whole band is placed at the top of a fresh page rather than
    /// paging forever.
    pub fn ensure_space(&mut self, required: f32) -> bool {
        if self.cursor.page == 0 {
            self.new_page();
            return true;
        }
        if self.cursor.y + required > self.cursor.bottom + EPSILON_MM && !self.cursor.at_top() {
            self.new_page();
            return true;
        }
        false
    }

    pub fn advance(&mut self, dy: f32) {
        self.cursor.y = (self.cursor.y + dy).min(self.cursor.bottom);
    }

    pub fn set_y(&mut self, y: f32) {
        self.cursor.y = y.clamp(self.cursor.top, self.cursor.bottom);
    }

    /// Horizontal rule across the content width at the cursor.
    pub fn rule(&mut self, gap_after: f32) {
        self.ensure_space(gap_after);
        let y = self.cursor.y;
        let color = self.chrome.palette.line;
        self.surface
            .line((self.cursor.left, y), (self.cursor.right, y), color, 0.3);
        self.advance(gap_after);
    }

    /// Sanitizes and draws one line of `height` mm at the left margin.
    pub fn write_line(&mut self, height: f32, text: &str, style: &TextStyle) {
        let clean = self.sanitize(text);
        let x = self.cursor.left;
        self.write_clean_line(x, height, &clean, style);
    }

    /// Sanitizes, wraps to the content width and writes `text`. Returns the number of lines.
    pub fn paragraph(&mut self, text: &str, line_height: f32, style: &TextStyle) -> usize {
        self.paragraph_at(0.0, text, line_height, style)
    }

    /// Like [`Self::paragraph`], indented by `indent` mm.
    pub fn paragraph_at(
        &mut self,
        indent: f32,
        text: &str,
        line_height: f32,
        style: &TextStyle,
    ) -> usize {
        let clean = self.sanitize(text);
        let width = self.cursor.content_width() - indent;
        let lines = self.wrap(&clean, width, style);
        let x = self.cursor.left + indent;
        for line in &lines {
            self.write_clean_line(x, line_height, line, style);
        }
        lines.len()
    }

    /// Sanitizes and draws `text` at an absolute position without moving the cursor.
    pub fn place_text(&mut self, x: f32, baseline_y: f32, text: &str, style: &TextStyle) {
        let clean = self.sanitize(text);
        let Err(err) = self.surface.text(x, baseline_y, &clean, style) else {
            return;
        };
        tracing::warn!(error = %err, "text draw failed; retrying in chunks");
        self.text_fallbacks += 1;
        let step = style.size_mm() * 1.25;
        for (i, chunk) in chunk_chars(&clean, TEXT_CHUNK_CHARS).iter().enumerate() {
            let baseline = baseline_y + step * i as f32;
            if let Err(err) = self.surface.text(x, baseline, chunk, style) {
                tracing::warn!(error = %err, "text chunk failed; drawing placeholder");
                let _ = self.surface.text(x, baseline, TRUNCATED_PLACEHOLDER, style);
                break;
            }
        }
    }

    /// Greedy word wrap of already-sanitized text to `width` mm. Tokens wider than a whole line
    /// are split by characters. Always returns at least one line.
    pub fn wrap(&self, text: &str, width: f32, style: &TextStyle) -> Vec<String> {
        let measure = |s: &str| self.fonts.text_width_mm(s, style.font, style.size_pt);
        let mut out = Vec::new();
        for line in text.split('\n') {
            let mut cur = String::new();
            for word in line.split_whitespace() {
                let candidate = if cur.is_empty() {
                    word.to_string()
                } else {
                    format!("{cur} {word}")
                };
                if measure(&candidate) <= width {
                    cur = candidate;
                    continue;
                }
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
                // The word alone may still be too wide; split it by characters.
                let mut rest: Vec<char> = word.chars().collect();
                while !rest.is_empty() {
                    let mut cut = 1usize;
                    while cut < rest.len() {
                        let head: String = rest[..=cut].iter().collect();
                        if measure(&head) > width {
                            break;
                        }
                        cut += 1;
                    }
                    let head: String = rest[..cut].iter().collect();
                    rest.drain(..cut);
                    if rest.is_empty() {
                        cur = head;
                    } else {
                        out.push(head);
                    }
                }
            }
            out.push(cur);
        }
        if out.is_empty() {
            out.push(String::new());
        }
        out
    }

    pub fn finish(self) -> Result<S::Output, SurfaceError> {
        self.surface.finish()
    }

    fn baseline(&self, height: f32) -> f32 {
        self.cursor.y + height * BASELINE_RATIO
    }

    fn write_clean_line(&mut self, x: f32, height: f32, text: &str, style: &TextStyle) {
        self.ensure_space(height);
        let baseline = self.baseline(height);
        let Err(err) = self.surface.text(x, baseline, text, style) else {
            self.cursor.y += height;
            return;
        };

        tracing::warn!(error = %err, page = self.cursor.page, "text draw failed; retrying in chunks");
        self.text_fallbacks += 1;
        for chunk in chunk_chars(text, TEXT_CHUNK_CHARS) {
            self.ensure_space(height);
            let baseline = self.baseline(height);
            let drawn = self.surface.text(x, baseline, &chunk, style);
            if let Err(err) = drawn {
                tracing::warn!(error = %err, "text chunk failed; drawing placeholder");
                let _ = self.surface.text(x, baseline, TRUNCATED_PLACEHOLDER, style);
                self.cursor.y += height;
                return;
            }
            self.cursor.y += height;
        }
    }

    fn draw_header(&mut self) {
        let palette = self.chrome.palette.clone();
        let top = self.geometry.margin_top_mm;
        let (left, right) = (self.cursor.left, self.cursor.right);

        let brand = self.sanitize(&self.chrome.brand);
        let brand_style = TextStyle::new(FontStyle::Bold, 9.0, palette.primary);
        self.chrome_text(left, top - 6.0, &brand, &brand_style);

        let label = self.sanitize(&self.chrome.app_label);
        let label_style = TextStyle::new(FontStyle::Regular, 8.0, palette.muted);
        let width = self
            .fonts
            .text_width_mm(&label, label_style.font, label_style.size_pt);
        self.chrome_text(right - width, top - 6.0, &label, &label_style);

        self.surface
            .line((left, top + 1.0), (right, top + 1.0), palette.line, 0.3);
    }

    fn draw_footer(&mut self) {
        let palette = self.chrome.palette.clone();
        let rule_y = self.geometry.height_mm - self.geometry.margin_bottom_mm;
        let (left, right) = (self.cursor.left, self.cursor.right);
        self.surface
            .line((left, rule_y), (right, rule_y), palette.line, 0.3);

        let label = format!("Page {}", self.cursor.page);
        let style = TextStyle::new(FontStyle::Regular, 8.0, palette.muted);
        let width = self.fonts.text_width_mm(&label, style.font, style.size_pt);
        self.chrome_text(left + (right - left - width) / 2.0, rule_y + 4.5, &label, &style);

        if let Some(note) = self.chrome.footer_note.clone() {
            let note_style = TextStyle::new(FontStyle::Regular, 6.5, palette.muted);
            let clean = self.sanitize(&note);
            let first = self
                .wrap(&clean, right - left, &note_style)
                .into_iter()
                .next()
                .unwrap_or_default();
            let width = self
                .fonts
                .text_width_mm(&first, note_style.font, note_style.size_pt);
            self.chrome_text(
                left + (right - left - width) / 2.0,
                rule_y + 8.5,
                &first,
                &note_style,
            );
        }
    }

    fn chrome_text(&mut self, x: f32, baseline: f32, text: &str, style: &TextStyle) {
        if let Err(err) = self.surface.text(x.max(0.0), baseline, text, style) {
            tracing::debug!(error = %err, "skipping page chrome text");
        }
    }
}

/// Splits `text` into pieces of at most `size` characters.
pub fn chunk_chars(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::BuiltinFonts;
    use crate::surface::{DrawOp, RecordingSurface};
    use eba_core::Rgb;

    fn flow_with(surface: RecordingSurface) -> PageFlow<RecordingSurface> {
        PageFlow::new(
            surface,
            PageGeometry::default(),
            Arc::new(BuiltinFonts),
            PageChrome::from_config(&ReportConfig::default()),
            SanitizeOptions::default(),
        )
    }

    fn body() -> TextStyle {
        TextStyle::new(FontStyle::Regular, 10.0, Rgb::new(0, 0, 0))
    }

    #[test]
    fn cover_page_has_no_chrome_and_later_pages_do() {
        let mut flow = flow_with(RecordingSurface::new());
        flow.new_page();
        flow.new_page();
        let pages = flow.finish().unwrap();
        assert_eq!(pages[0].ops.len(), 0);
        let texts: Vec<_> = pages[1].texts().collect();
        assert!(texts.contains(&"Elder Brain Analytics"));
        assert!(texts.contains(&"Page 2"));
    }

    #[test]
    fn lines_that_do_not_fit_move_to_the_next_page() {
        let mut flow = flow_with(RecordingSurface::new());
        flow.new_page();
        let bottom = flow.cursor().bottom;
        flow.set_y(bottom - 3.0);
        flow.write_line(5.0, "overflowing line", &body());
        assert_eq!(flow.cursor().page, 2);
        let pages = flow.finish().unwrap();
        assert!(pages[1].texts().any(|t| t == "overflowing line"));
        assert!(!pages[0].texts().any(|t| t == "overflowing line"));
    }

    #[test]
    fn ensure_space_only_breaks_when_needed() {
        let mut flow = flow_with(RecordingSurface::new());
        assert!(flow.ensure_space(10.0));
        assert!(!flow.ensure_space(10.0));
        let remaining = flow.cursor().remaining();
        assert!(!flow.ensure_space(remaining));
        flow.advance(1.0);
        assert!(flow.ensure_space(remaining));
        // Taller than the band: placed at the top of the fresh page, no second break.
        assert!(!flow.ensure_space(10_000.0));
    }

    #[test]
    fn wrap_respects_width_and_splits_long_tokens() {
        let flow = flow_with(RecordingSurface::new());
        let style = body();
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
        let lines = flow.wrap(text, 40.0, &style);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(BuiltinFonts.text_width_mm(line, style.font, style.size_pt) <= 40.0);
        }
        assert_eq!(lines.join(" "), text);

        let long = "W".repeat(80);
        let lines = flow.wrap(&long, 30.0, &style);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), long);
        assert_eq!(flow.wrap("", 30.0, &style), vec![String::new()]);
    }

    #[test]
    fn paragraph_sanitizes_before_drawing() {
        let mut flow = flow_with(RecordingSurface::new());
        flow.new_page();
        flow.paragraph("smart \u{201C}quotes\u{201D} \u{2014} ok", 5.0, &body());
        let pages = flow.finish().unwrap();
        assert!(pages[0].texts().any(|t| t == "smart \"quotes\" - ok"));
    }

    #[test]
    fn failed_draw_is_retried_in_chunks() {
        let mut flow = flow_with(RecordingSurface::with_text_limit(TEXT_CHUNK_CHARS));
        flow.new_page();
        // Many short words so the sanitizer does not break anything, 130 chars in total.
        let text = "ab ".repeat(43) + "a";
        let lines = flow.wrap(&text, 1_000.0, &body());
        assert_eq!(lines.len(), 1);
        flow.write_line(5.0, &text, &body());
        assert_eq!(flow.text_fallbacks(), 1);
        let pages = flow.finish().unwrap();
        let drawn: Vec<_> = pages[0].texts().collect();
        assert_eq!(drawn.len(), 2);
        assert_eq!(drawn.concat(), text);
    }

    #[test]
    fn chunk_failure_draws_placeholder_and_continues() {
        let mut flow = flow_with(RecordingSurface::with_text_limit(20));
        flow.new_page();
        flow.write_line(5.0, &"word ".repeat(30), &body());
        flow.write_line(5.0, "short", &body());
        let pages = flow.finish().unwrap();
        let drawn: Vec<_> = pages[0].texts().collect();
        assert_eq!(drawn, vec![TRUNCATED_PLACEHOLDER, "short"]);
    }

    #[test]
    fn placed_text_does_not_move_the_cursor() {
        let mut flow = flow_with(RecordingSurface::new());
        flow.new_page();
        let y = flow.cursor().y;
        flow.place_text(20.0, 50.0, "label", &body());
        assert_eq!(flow.cursor().y, y);
        let pages = flow.finish().unwrap();
        assert!(matches!(
            &pages[0].ops[0],
            DrawOp::Text { x, baseline_y, .. } if *x == 20.0 && *baseline_y == 50.0
        ));
    }
}
