//! SVG → JPEG through usvg, resvg and tiny-skia.

use crate::chart::{ChartDimensions, ChartError, EncodedChart, RasterBackend};
use crate::fonts::chart_font_database;
use std::path::PathBuf;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone)]
pub struct ResvgBackend {
    /// Extra font directory. Only the first backend to touch the font database gets to add it.
    pub font_dir: Option<PathBuf>,
    pub jpeg_quality: u8,
}

impl Default for ResvgBackend {
    fn default() -> Self {
        Self {
            font_dir: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ResvgBackend {
    pub fn new(font_dir: Option<PathBuf>) -> Self {
        Self {
            font_dir,
            ..Self::default()
        }
    }

    fn pixmap(&self, svg: &str, dims: ChartDimensions) -> Result<tiny_skia::Pixmap, ChartError> {
        let mut opt = usvg::Options::default();
        opt.fontdb = chart_font_database(self.font_dir.as_deref());
        opt.font_family = "Helvetica".to_string();

        let tree =
            usvg::Tree::from_str(svg, &opt).map_err(|e| ChartError::SvgParse(e.to_string()))?;

        let (width, height) = dims.pixel_size();
        let mut pixmap = tiny_skia::Pixmap::new(width, height)
            .ok_or(ChartError::PixmapAlloc { width, height })?;
        // JPEG has no alpha; paint the canvas first.
        pixmap.fill(tiny_skia::Color::WHITE);

        let size = tree.size();
        let sx = width as f32 / size.width().max(1.0);
        let sy = height as f32 / size.height().max(1.0);
        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(sx, sy),
            &mut pixmap.as_mut(),
        );
        Ok(pixmap)
    }
}

impl RasterBackend for ResvgBackend {
    fn name(&self) -> &'static str {
        "resvg"
    }

    fn export(&self, svg: &str, dims: ChartDimensions) -> Result<EncodedChart, ChartError> {
        let pixmap = self.pixmap(svg, dims.normalized())?;
        let (w, h) = (pixmap.width(), pixmap.height());

        let rgb: Vec<u8> = pixmap
            .data()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();

        let mut jpeg = Vec::new();
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality);
        encoder
            .encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
            .map_err(|e| ChartError::JpegEncode(e.to_string()))?;
        Ok(EncodedChart {
            width: w,
            height: h,
            jpeg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="80" height="80" viewBox="0 0 80 80"><rect width="80" height="80" fill="black"/></svg>"#;

    #[test]
    fn exports_a_jpeg_at_the_scaled_size() {
        let chart = ResvgBackend::default()
            .export(SQUARE, ChartDimensions::new(80, 80, 2.0))
            .unwrap();
        assert_eq!((chart.width, chart.height), (160, 160));
        assert!(chart.jpeg.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn malformed_svg_is_reported() {
        let err = ResvgBackend::default()
            .export("<svg", ChartDimensions::new(80, 80, 1.0))
            .unwrap_err();
        assert!(matches!(err, ChartError::SvgParse(_)));
    }
}
