//! Five-axis trait profile with the ideal range drawn as a band.

use super::RadarAxis;
use super::svg::{fmt_number, open_svg, points_attr, polar_xy, text};
use eba_core::Palette;
use std::fmt::Write as _;

const RINGS: usize = 5;

fn axis_angle(i: usize, n: usize) -> f64 {
    -std::f64::consts::FRAC_PI_2 + (i as f64) * (std::f64::consts::TAU / (n as f64))
}

pub(super) fn radar_svg(
    axes: &[RadarAxis],
    max: f64,
    palette: &Palette,
    width: u32,
    height: u32,
) -> String {
    let (w, h) = (f64::from(width), f64::from(height));
    let n = axes.len().max(3);
    let max = if max.is_finite() && max > 0.0 { max } else { 10.0 };
    let cx = w / 2.0;
    let cy = h / 2.0 + h * 0.03;
    let radius = (w.min(h) * 0.34).max(10.0);
    let scaled = |v: f64| radius * (v.clamp(0.0, max) / max);

    let mut out = String::new();
    open_svg(&mut out, width, height);

    // Graticule rings and axis spokes.
    for ring in 1..=RINGS {
        let r = radius * ring as f64 / RINGS as f64;
        let ring_points: Vec<_> = (0..n).map(|i| polar_xy(cx, cy, r, axis_angle(i, n))).collect();
        let _ = write!(
            &mut out,
            r#"<polygon points="{}" fill="none" stroke="{}" stroke-width="1"/>"#,
            points_attr(&ring_points),
            palette.line
        );
    }
    for i in 0..n {
        let (x, y) = polar_xy(cx, cy, radius, axis_angle(i, n));
        let _ = write!(
            &mut out,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            fmt_number(cx),
            fmt_number(cy),
            fmt_number(x),
            fmt_number(y),
            palette.line
        );
    }

    // Ideal band: outer polygon at the range maxima with the minima cut out.
    if !axes.is_empty() && axes.iter().all(|a| a.ideal.is_some()) {
        let outer: Vec<_> = axes
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let (_, hi) = a.ideal.unwrap_or_default();
                polar_xy(cx, cy, scaled(hi), axis_angle(i, n))
            })
            .collect();
        let inner: Vec<_> = axes
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let (lo, _) = a.ideal.unwrap_or_default();
                polar_xy(cx, cy, scaled(lo), axis_angle(i, n))
            })
            .collect();
        let _ = write!(
            &mut out,
            r#"<path class="ideal-band" d="M{}Z M{}Z" fill="{}" fill-opacity="0.15" fill-rule="evenodd" stroke="{}" stroke-dasharray="6,4" stroke-width="1.5"/>"#,
            points_attr(&outer).replace(' ', " L"),
            points_attr(&inner).replace(' ', " L"),
            palette.good,
            palette.good
        );
    }

    // Candidate profile over measured traits only; an absent trait is not a zero.
    let profile: Vec<_> = axes
        .iter()
        .enumerate()
        .filter_map(|(i, a)| Some(polar_xy(cx, cy, scaled(a.value?), axis_angle(i, n))))
        .collect();
    if profile.len() >= 2 {
        let _ = write!(
            &mut out,
            r#"<polygon class="candidate" points="{}" fill="{}" fill-opacity="0.25" stroke="{}" stroke-width="2.5"/>"#,
            points_attr(&profile),
            palette.primary,
            palette.primary
        );
    }
    for (x, y) in &profile {
        let _ = write!(
            &mut out,
            r#"<circle cx="{}" cy="{}" r="4" fill="{}"/>"#,
            fmt_number(*x),
            fmt_number(*y),
            palette.primary
        );
    }

    let font = (h * 0.028).clamp(10.0, 28.0);
    for (i, axis) in axes.iter().enumerate() {
        let angle = axis_angle(i, n);
        let (x, y) = polar_xy(cx, cy, radius + font * 1.4, angle);
        let anchor = if angle.cos().abs() < 0.2 {
            "middle"
        } else if angle.cos() > 0.0 {
            "start"
        } else {
            "end"
        };
        let value = axis
            .value
            .map(|v| format!("{} ({})", axis.label, fmt_number((v * 10.0).round() / 10.0)))
            .unwrap_or_else(|| format!("{} (n/a)", axis.label));
        text(&mut out, x, y + font * 0.35, font, anchor, palette.dark, false, &value);
    }

    text(
        &mut out,
        w / 2.0,
        font * 1.8,
        font * 1.2,
        "middle",
        palette.dark,
        true,
        &format!("Personality profile (0-{})", fmt_number(max)),
    );
    out.push_str("</svg>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes(values: [Option<f64>; 5], ideal: bool) -> Vec<RadarAxis> {
        ["Openness", "Conscientiousness", "Extraversion", "Agreeableness", "Neuroticism"]
            .iter()
            .zip(values)
            .map(|(label, value)| RadarAxis {
                label: label.to_string(),
                value,
                ideal: ideal.then_some((4.0, 8.0)),
            })
            .collect()
    }

    #[test]
    fn draws_every_axis_label_and_marks_missing_values() {
        let svg = radar_svg(
            &axes([Some(7.0), None, Some(5.5), Some(6.0), Some(3.0)], true),
            10.0,
            &Palette::default(),
            900,
            700,
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Openness (7)"));
        assert!(svg.contains("Conscientiousness (n/a)"));
        assert!(svg.contains("Extraversion (5.5)"));
        assert_eq!(svg.matches("<circle").count(), 4);
        assert!(svg.contains(r#"class="ideal-band""#));
    }

    #[test]
    fn missing_traits_are_left_out_of_the_candidate_polygon() {
        let (w, h) = (900, 700);
        let svg = radar_svg(
            &axes([Some(7.0), None, Some(5.5), None, Some(3.0)], false),
            10.0,
            &Palette::default(),
            w,
            h,
        );
        let start = svg.find(r#"class="candidate" points=""#).unwrap() + 26;
        let end = start + svg[start..].find('"').unwrap();
        let points: Vec<(f64, f64)> = svg[start..end]
            .split(' ')
            .map(|p| {
                let (x, y) = p.split_once(',').unwrap();
                (x.parse().unwrap(), y.parse().unwrap())
            })
            .collect();
        assert_eq!(points.len(), 3);

        let (cx, cy) = (f64::from(w) / 2.0, f64::from(h) / 2.0 + f64::from(h) * 0.03);
        for (x, y) in points {
            assert!((x - cx).hypot(y - cy) > 1.0, "vertex at centre: {x},{y}");
        }
    }

    #[test]
    fn band_is_omitted_without_a_complete_ideal_profile() {
        let svg = radar_svg(&axes([Some(5.0); 5], false), 10.0, &Palette::default(), 900, 700);
        assert!(!svg.contains("ideal-band"));
        assert!(svg.contains(r#"class="candidate""#));
    }

    #[test]
    fn first_axis_points_straight_up() {
        let (x, y) = polar_xy(0.0, 0.0, 1.0, axis_angle(0, 5));
        assert!(x.abs() < 1e-9);
        assert!((y + 1.0).abs() < 1e-9);
    }
}
