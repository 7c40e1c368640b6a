//! Font capability for the page flow, and the process-wide font database used for chart text.
//!
//! Body text is set in the 14 standard PDF faces (Helvetica / Helvetica-Bold, WinAnsi
//! encoding), which every PDF viewer provides. Widths come from the Adobe AFM tables so line
//! wrapping matches what the viewer draws; no kerning is applied.

use eba_core::sanitize::is_safe_char;

/// Millimetres per PostScript point.
pub const MM_PER_PT: f32 = 25.4 / 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
}

impl FontStyle {
    pub fn base_font(self) -> &'static str {
        match self {
            FontStyle::Regular => "Helvetica",
            FontStyle::Bold => "Helvetica-Bold",
        }
    }
}

/// Glyph metrics for the faces a surface draws with.
pub trait FontProvider: Send + Sync {
    /// Advance width of `ch` in 1/1000 em, or `None` when the face cannot encode it.
    fn glyph_width(&self, style: FontStyle, ch: char) -> Option<u16>;

    fn can_encode(&self, style: FontStyle, ch: char) -> bool {
        self.glyph_width(style, ch).is_some()
    }

    /// Width of a single line of `text` in millimetres. Unencodable characters count as zero.
    fn text_width_mm(&self, text: &str, style: FontStyle, size_pt: f32) -> f32 {
        let units: u32 = text
            .chars()
            .filter_map(|ch| self.glyph_width(style, ch))
            .map(u32::from)
            .sum();
        units as f32 / 1000.0 * size_pt * MM_PER_PT
    }
}

/// Metrics for the built-in Helvetica faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFonts;

// AFM widths for 0x20..=0x7E.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Latin-1 letters share the advance of their unaccented base letter.
fn latin1_base(ch: char) -> Option<char> {
    let base = match ch {
        'À'..='Å' => 'A',
        'Ç' => 'C',
        'È'..='Ë' => 'E',
        'Ì'..='Ï' => 'I',
        'Ð' => 'D',
        'Ñ' => 'N',
        'Ò'..='Ö' | 'Ø' => 'O',
        'Ù'..='Ü' => 'U',
        'Ý' => 'Y',
        'Þ' => 'P',
        'à'..='å' => 'a',
        'ç' => 'c',
        'è'..='ë' => 'e',
        'ð' | 'ò'..='ö' | 'ø' => 'o',
        'ñ' => 'n',
        'ù'..='ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'þ' => 'p',
        _ => return None,
    };
    Some(base)
}

impl FontProvider for BuiltinFonts {
    fn glyph_width(&self, style: FontStyle, ch: char) -> Option<u16> {
        if ch == '\n' || !is_safe_char(ch) {
            return None;
        }
        let table = match style {
            FontStyle::Regular => &HELVETICA,
            FontStyle::Bold => &HELVETICA_BOLD,
        };
        let ascii = |c: char| table[(c as usize) - 0x20];
        if (' '..='~').contains(&ch) {
            return Some(ascii(ch));
        }
        if let Some(base) = latin1_base(ch) {
            return Some(ascii(base));
        }
        Some(match ch {
            'Æ' => 1000,
            'æ' => 889,
            'ì'..='ï' => 278,
            'ß' => 611,
            '×' | '÷' | '±' | '¬' => 584,
            _ => 556,
        })
    }
}

/// Process-wide font database for chart text, loaded on first use.
///
/// The first caller's `font_dir` wins; later calls reuse the same database.
#[cfg(feature = "raster")]
pub fn chart_font_database(
    font_dir: Option<&std::path::Path>,
) -> std::sync::Arc<usvg::fontdb::Database> {
    use std::sync::{Arc, OnceLock};

    static DB: OnceLock<Arc<usvg::fontdb::Database>> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        if let Some(dir) = font_dir {
            db.load_fonts_dir(dir);
        }
        if db.is_empty() {
            tracing::warn!("no fonts found for chart text; chart labels will not be drawn");
        } else {
            tracing::debug!(faces = db.len(), "loaded chart font database");
        }
        Arc::new(db)
    })
    .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_widths_follow_afm_tables() {
        let f = BuiltinFonts;
        assert_eq!(f.glyph_width(FontStyle::Regular, ' '), Some(278));
        assert_eq!(f.glyph_width(FontStyle::Regular, 'W'), Some(944));
        assert_eq!(f.glyph_width(FontStyle::Regular, 'i'), Some(222));
        assert_eq!(f.glyph_width(FontStyle::Bold, 'i'), Some(278));
        assert_eq!(f.glyph_width(FontStyle::Bold, '~'), Some(584));
    }

    #[test]
    fn latin1_is_encodable_and_the_rest_is_not() {
        let f = BuiltinFonts;
        assert_eq!(f.glyph_width(FontStyle::Regular, 'ã'), Some(556));
        assert!(f.can_encode(FontStyle::Regular, 'Ç'));
        assert!(!f.can_encode(FontStyle::Regular, '\u{2014}'));
        assert!(!f.can_encode(FontStyle::Regular, '\n'));
    }

    #[test]
    fn no_break_space_is_rejected_like_the_sanitizer_does() {
        let f = BuiltinFonts;
        assert!(!eba_core::sanitize::is_safe_char('\u{A0}'));
        assert_eq!(f.glyph_width(FontStyle::Regular, '\u{A0}'), None);
    }

    #[test]
    fn width_scales_with_point_size() {
        let f = BuiltinFonts;
        let w10 = f.text_width_mm("Report", FontStyle::Regular, 10.0);
        let w20 = f.text_width_mm("Report", FontStyle::Regular, 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-4);
        // "M" is 833 units: 833/1000 * 12pt in mm.
        let m = f.text_width_mm("M", FontStyle::Regular, 12.0);
        assert!((m - 0.833 * 12.0 * MM_PER_PT).abs() < 1e-4);
    }
}
