//! Semicircular 0–100 compatibility gauge.

use super::svg::{fmt_number, open_svg, text};
use eba_core::{GaugeBands, Palette};
use std::f64::consts::PI;
use std::fmt::Write as _;

/// Angle of `value` on the dial: 0 at the left end (pi), 100 at the right end (0).
pub(super) fn dial_angle(value: f64) -> f64 {
    PI * (1.0 - value.clamp(0.0, 100.0) / 100.0)
}

fn dial_point(cx: f64, cy: f64, r: f64, value: f64) -> (f64, f64) {
    let a = dial_angle(value);
    (cx + r * a.cos(), cy - r * a.sin())
}

pub(super) fn gauge_svg(
    value: f64,
    bands: &GaugeBands,
    palette: &Palette,
    width: u32,
    height: u32,
) -> String {
    let (w, h) = (f64::from(width), f64::from(height));
    let value = value.clamp(0.0, 100.0);
    let cx = w / 2.0;
    let cy = h * 0.8;
    let radius = (w / 2.0 - 40.0).min(h * 0.62).max(10.0);
    let stroke = radius * 0.18;
    let font = (h * 0.05).clamp(10.0, 40.0);

    let mut out = String::new();
    open_svg(&mut out, width, height);

    for (from, to, color) in [
        (0.0, bands.warn_from, palette.bad),
        (bands.warn_from, bands.good_from, palette.warn),
        (bands.good_from, 100.0, palette.good),
    ] {
        if to <= from {
            continue;
        }
        let (x0, y0) = dial_point(cx, cy, radius, from);
        let (x1, y1) = dial_point(cx, cy, radius, to);
        let _ = write!(
            &mut out,
            r#"<path class="band" d="M{},{} A{r},{r} 0 0 1 {},{}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            fmt_number(x0),
            fmt_number(y0),
            fmt_number(x1),
            fmt_number(y1),
            color,
            fmt_number(stroke),
            r = fmt_number(radius)
        );
    }

    let (nx, ny) = dial_point(cx, cy, radius * 0.88, value);
    let _ = write!(
        &mut out,
        r#"<line class="needle" x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}" stroke-linecap="round"/>"#,
        fmt_number(cx),
        fmt_number(cy),
        fmt_number(nx),
        fmt_number(ny),
        palette.dark,
        fmt_number(stroke * 0.22)
    );
    let _ = write!(
        &mut out,
        r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
        fmt_number(cx),
        fmt_number(cy),
        fmt_number(stroke * 0.35),
        palette.dark
    );

    for tick in [0.0, 50.0, 100.0] {
        let (x, y) = dial_point(cx, cy, radius + stroke * 0.5 + font * 0.8, tick);
        text(&mut out, x, y + font * 0.3, font * 0.7, "middle", palette.muted, false, &fmt_number(tick));
    }
    text(
        &mut out,
        cx,
        cy - radius * 0.3,
        font * 1.6,
        "middle",
        palette.dark,
        true,
        &format!("{}%", fmt_number(value.round())),
    );
    text(&mut out, cx, cy + font * 1.2, font * 0.8, "middle", palette.muted, false, "Role compatibility");
    out.push_str("</svg>");
    out
}
