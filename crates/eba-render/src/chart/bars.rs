//! Horizontal competency bars with three-tier colors and dashed threshold guides.

use super::BarItem;
use super::svg::{fmt_number, open_svg, text};
use eba_core::{Palette, Rgb, Thresholds};
use std::fmt::Write as _;

/// Bar color for a 0–100 score.
pub fn tier_color(value: f64, thresholds: &Thresholds, palette: &Palette) -> Rgb {
    if value < thresholds.critical {
        palette.bad
    } else if value < thresholds.strength {
        palette.warn
    } else {
        palette.good
    }
}

pub(super) fn bars_svg(
    items: &[BarItem],
    thresholds: &Thresholds,
    palette: &Palette,
    width: u32,
    height: u32,
) -> String {
    let (w, h) = (f64::from(width), f64::from(height));
    let font = (h * 0.022).clamp(9.0, 24.0);
    let top = font * 3.2;
    let bottom = font * 2.6;
    let left = w * 0.36;
    let right = w - font * 3.5;
    let plot_w = (right - left).max(1.0);
    let row = (h - top - bottom) / items.len().max(1) as f64;
    let thickness = (row * 0.62).min(font * 2.2);
    let x_of = |v: f64| left + plot_w * v.clamp(0.0, 100.0) / 100.0;

    let mut out = String::new();
    open_svg(&mut out, width, height);
    text(
        &mut out,
        w / 2.0,
        font * 1.6,
        font * 1.2,
        "middle",
        palette.dark,
        true,
        "Competencies (0-100)",
    );

    for tick in (0..=100).step_by(20) {
        let x = x_of(f64::from(tick));
        let _ = write!(
            &mut out,
            r#"<line x1="{x}" y1="{}" x2="{x}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            fmt_number(top),
            fmt_number(h - bottom),
            palette.line,
            x = fmt_number(x)
        );
        text(
            &mut out,
            x,
            h - bottom + font * 1.3,
            font * 0.85,
            "middle",
            palette.muted,
            false,
            &tick.to_string(),
        );
    }

    for (i, item) in items.iter().enumerate() {
        let y = top + row * i as f64 + (row - thickness) / 2.0;
        let color = tier_color(item.value, thresholds, palette);
        let _ = write!(
            &mut out,
            r#"<rect class="bar" x="{}" y="{}" width="{}" height="{}" fill="{}"/>"#,
            fmt_number(left),
            fmt_number(y),
            fmt_number(x_of(item.value) - left),
            fmt_number(thickness),
            color
        );
        let mid = y + thickness / 2.0 + font * 0.35;
        text(&mut out, left - font * 0.6, mid, font, "end", palette.dark, false, &item.label);
        text(
            &mut out,
            x_of(item.value) + font * 0.4,
            mid,
            font * 0.9,
            "start",
            palette.dark,
            false,
            &fmt_number(item.value.round()),
        );
    }

    for (value, color) in [
        (thresholds.critical, palette.bad),
        (thresholds.strength, palette.good),
    ] {
        let x = fmt_number(x_of(value));
        let _ = write!(
            &mut out,
            r#"<line class="guide" x1="{x}" y1="{}" x2="{x}" y2="{}" stroke="{}" stroke-width="1.5" stroke-dasharray="6,4"/>"#,
            fmt_number(top - font * 0.5),
            fmt_number(h - bottom),
            color
        );
    }

    out.push_str("</svg>");
    out
}
