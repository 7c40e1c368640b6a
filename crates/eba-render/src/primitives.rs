//! Reusable blocks drawn through the page flow: section titles, cards, bars, images.
//!
//! Each primitive computes its own height and calls [`PageFlow::ensure_space`] with it before
//! drawing anything, so a block never straddles a page break.

use crate::flow::{HEADER_RESERVE_MM, PageFlow};
use crate::fonts::FontStyle;
use crate::surface::{BoxStyle, RasterImage, Rect, RenderSurface, SurfaceError, TextStyle};
use eba_core::Rgb;

pub const SECTION_TITLE_PT: f32 = 14.0;
pub const BODY_PT: f32 = 10.0;
pub const BODY_LINE_MM: f32 = 5.0;

pub const CARD_TITLE_BAND_MM: f32 = 8.0;
pub const CARD_LINE_MM: f32 = 5.3;
pub const CARD_PADDING_MM: f32 = 6.0;
pub const CARD_GAP_MM: f32 = 4.0;
const CARD_INSET_MM: f32 = 6.0;

const BAR_LABEL_MM: f32 = 5.0;
const BAR_TRACK_MM: f32 = 3.0;
const BAR_GAP_MM: f32 = 3.0;

/// Height of a card with `lines` body lines.
pub fn card_height(lines: usize) -> f32 {
    CARD_TITLE_BAND_MM + lines.max(1) as f32 * CARD_LINE_MM + CARD_PADDING_MM
}

/// Bold section heading followed by a rule and an optional muted subtitle.
pub fn section_title<S: RenderSurface>(flow: &mut PageFlow<S>, title: &str, subtitle: Option<&str>) {
    let palette = flow.palette().clone();
    // Keep the heading together with at least a card title below it.
    flow.ensure_space(8.0 + 3.0 + CARD_TITLE_BAND_MM + CARD_LINE_MM);
    let style = TextStyle::new(FontStyle::Bold, SECTION_TITLE_PT, palette.primary);
    flow.write_line(8.0, title, &style);
    flow.rule(3.0);
    if let Some(subtitle) = subtitle.filter(|s| !s.trim().is_empty()) {
        let style = TextStyle::new(FontStyle::Regular, BODY_PT, palette.muted);
        flow.paragraph(subtitle, BODY_LINE_MM, &style);
        flow.advance(2.0);
    }
}

/// Wrapped body paragraph followed by a small gap.
pub fn body_text<S: RenderSurface>(flow: &mut PageFlow<S>, text: &str) {
    let style = TextStyle::new(FontStyle::Regular, BODY_PT, flow.palette().dark);
    flow.paragraph(text, BODY_LINE_MM, &style);
    flow.advance(2.0);
}

/// Titled box of body lines. Returns the number of fragments drawn: a card taller than a
/// full content band is split into `"<title> (cont.)"` continuations that each fit a page.
pub fn card<S: RenderSurface>(flow: &mut PageFlow<S>, title: &str, lines: &[String]) -> usize {
    let palette = flow.palette().clone();
    let body = TextStyle::new(FontStyle::Regular, BODY_PT, palette.dark);
    let heading = TextStyle::new(FontStyle::Bold, 11.0, palette.primary);

    if flow.cursor().page == 0 {
        flow.new_page();
    }
    let inner_width = flow.cursor().content_width() - 2.0 * CARD_INSET_MM;
    let mut wrapped = Vec::new();
    for line in lines {
        let clean = flow.sanitize(line);
        wrapped.extend(flow.wrap(&clean, inner_width, &body));
    }

    // Continuation pages lose the header reserve that the cover page does not have.
    let band = flow.cursor().band_height()
        - if flow.cursor().page == 1 {
            HEADER_RESERVE_MM
        } else {
            0.0
        };
    let per_fragment =
        (((band - CARD_TITLE_BAND_MM - CARD_PADDING_MM) / CARD_LINE_MM).floor() as usize).max(1);
    let fragments: Vec<&[String]> = if wrapped.is_empty() {
        vec![&wrapped[..]]
    } else {
        wrapped.chunks(per_fragment).collect()
    };

    for (i, fragment) in fragments.iter().enumerate() {
        let height = card_height(fragment.len());
        flow.ensure_space(height);
        let cursor = *flow.cursor();
        let rect = Rect::new(cursor.left, cursor.y, cursor.content_width(), height);
        flow.surface_mut().draw_box(
            rect,
            &BoxStyle {
                fill: Some(palette.card_background),
                stroke: Some(palette.line),
                stroke_width_mm: 0.3,
                radius_mm: 3.0,
            },
        );

        let title = if i == 0 {
            title.to_string()
        } else {
            format!("{title} (cont.)")
        };
        let x = rect.x + CARD_INSET_MM;
        flow.place_text(x, rect.y + 5.5, &title, &heading);
        for (n, line) in fragment.iter().enumerate() {
            let baseline = rect.y + CARD_TITLE_BAND_MM + (n as f32 + 1.0) * CARD_LINE_MM - 1.3;
            flow.place_text(x, baseline, line, &body);
        }
        flow.set_y(rect.bottom());
        flow.advance(CARD_GAP_MM);
    }
    fragments.len()
}

/// `label: value/max` line above a track with a proportional fill.
pub fn labeled_bar<S: RenderSurface>(
    flow: &mut PageFlow<S>,
    label: &str,
    value: f64,
    max_value: f64,
    color: Rgb,
) {
    let palette = flow.palette().clone();
    let max_value = if max_value.is_finite() && max_value > 0.0 {
        max_value
    } else {
        100.0
    };
    let value = if value.is_finite() {
        value.clamp(0.0, max_value)
    } else {
        0.0
    };

    let style = TextStyle::new(FontStyle::Regular, BODY_PT, palette.dark);
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = flow.sanitize(&format!("{label}: {}/{}", fmt_score(value), fmt_score(max_value)));
    let lines = flow.wrap(&text, flow.cursor().content_width(), &style);
    flow.ensure_space(lines.len() as f32 * BAR_LABEL_MM + BAR_TRACK_MM + BAR_GAP_MM);
    for line in &lines {
        flow.write_line(BAR_LABEL_MM, line, &style);
    }

    let cursor = *flow.cursor();
    let width = cursor.content_width();
    let track = Rect::new(cursor.left, cursor.y, width, BAR_TRACK_MM);
    let fill = Rect::new(
        cursor.left,
        cursor.y,
        width * (value / max_value) as f32,
        BAR_TRACK_MM,
    );
    let surface = flow.surface_mut();
    surface.rect(track, Some(palette.track), None);
    if fill.w > 0.0 {
        surface.rect(fill, Some(color), None);
    }
    flow.advance(BAR_TRACK_MM + BAR_GAP_MM);
}

/// Dash-prefixed list, or `fallback` when `items` is empty.
pub fn bullet_lines<S: RenderSurface>(flow: &mut PageFlow<S>, items: &[String], fallback: &str) {
    if items.is_empty() {
        chart_fallback(flow, fallback);
        return;
    }
    let style = TextStyle::new(FontStyle::Regular, BODY_PT, flow.palette().dark);
    for item in items {
        flow.paragraph(&format!("- {item}"), BODY_LINE_MM, &style);
    }
    flow.advance(2.0);
}

/// Places `image` centred on the content width, scaled to fit `max_w` x `max_h` mm while
/// keeping its aspect ratio.
pub fn centered_image<S: RenderSurface>(
    flow: &mut PageFlow<S>,
    image: &RasterImage,
    max_w: f32,
    max_h: f32,
) -> Result<Rect, SurfaceError> {
    let aspect = image.aspect_ratio().ok_or_else(|| SurfaceError::Image {
        message: format!("degenerate size {}x{}", image.width, image.height),
    })?;
    if flow.cursor().page == 0 {
        flow.new_page();
    }
    let cursor = *flow.cursor();
    let max_h = max_h.min(cursor.band_height() - HEADER_RESERVE_MM);
    let mut w = max_w.min(cursor.content_width());
    let mut h = w * aspect;
    if h > max_h {
        h = max_h;
        w = h / aspect;
    }

    flow.ensure_space(h);
    let cursor = *flow.cursor();
    let rect = Rect::new(cursor.left + (cursor.content_width() - w) / 2.0, cursor.y, w, h);
    flow.surface_mut().image(image, rect)?;
    flow.set_y(rect.bottom());
    flow.advance(3.0);
    Ok(rect)
}

/// Fixed sentence drawn where data or a chart is unavailable.
pub fn chart_fallback<S: RenderSurface>(flow: &mut PageFlow<S>, sentence: &str) {
    let style = TextStyle::new(FontStyle::Regular, BODY_PT, flow.palette().muted);
    flow.paragraph(sentence, BODY_LINE_MM, &style);
    flow.advance(2.0);
}

/// `82`, `7.5`: whole numbers without decimals, everything else truncated to one.
///
/// Truncation keeps a printed score on the same side of a classification threshold as the
/// score itself (`44.96` prints as `44.9`, never `45.0`).
pub fn fmt_score(v: f64) -> String {
    let t = (v * 10.0 + 1e-9).floor() / 10.0;
    if (t - t.round()).abs() < 1e-9 {
        format!("{t:.0}")
    } else {
        format!("{t:.1}")
    }
}
