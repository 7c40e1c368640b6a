//! Text sanitizer applied at the boundary of every text-drawing primitive.
//!
//! The report surface draws with the standard Helvetica faces under WinAnsi encoding, so the
//! safe repertoire is printable ASCII, the printable Latin-1 supplement and `\n`. Everything
//! else is mapped to a plain equivalent or dropped. The sanitizer is pure and total: it never
//! fails, whatever the input.

pub const DEFAULT_MAX_TOKEN_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Longest run of non-whitespace characters kept unbroken. Longer runs get a space
    /// inserted every `max_token_len` characters so the layout can wrap them.
    pub max_token_len: usize,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
        }
    }
}

impl SanitizeOptions {
    pub fn with_max_token_len(max_token_len: usize) -> Self {
        Self {
            max_token_len: max_token_len.max(1),
        }
    }
}

/// Returns `true` when `ch` can be drawn by the report surface as-is.
pub fn is_safe_char(ch: char) -> bool {
    ch == '\n' || (' '..='~').contains(&ch) || (('\u{A1}'..='\u{FF}').contains(&ch) && ch != '\u{AD}')
}

fn replacement(ch: char) -> Option<&'static str> {
    let rep = match ch {
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}'
        | '\u{2212}' => "-",
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => "\"",
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => "'",
        '\u{2026}' => "...",
        '\u{2022}' | '\u{2023}' | '\u{2043}' | '\u{25AA}' | '\u{25CF}' | '\u{25E6}' => "-",
        '\u{2192}' => "->",
        '\u{2190}' => "<-",
        '\u{2194}' => "<->",
        '\u{21D2}' => "=>",
        '\u{2264}' => "<=",
        '\u{2265}' => ">=",
        '\u{2260}' => "!=",
        '\u{2122}' => "(TM)",
        '\u{20AC}' => "EUR",
        '\t' | '\u{A0}' | '\u{2002}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}' => " ",
        '\u{AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => "",
        _ => return None,
    };
    Some(rep)
}

/// Sanitizes `text` with the default options.
pub fn sanitize(text: &str) -> String {
    sanitize_with(text, &SanitizeOptions::default())
}

/// Sanitizes an optional string; `None` maps to an empty string.
pub fn sanitize_opt(text: Option<&str>) -> String {
    text.map(sanitize).unwrap_or_default()
}

pub fn sanitize_with(text: &str, options: &SanitizeOptions) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut mapped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            if chars.peek() != Some(&'\n') {
                mapped.push('\n');
            }
            continue;
        }
        if let Some(rep) = replacement(ch) {
            mapped.push_str(rep);
            continue;
        }
        if is_safe_char(ch) {
            mapped.push(ch);
        }
    }

    break_long_tokens(&mapped, options.max_token_len)
}

/// Inserts a space inside every run of non-whitespace characters longer than `max_len`.
pub fn break_long_tokens(text: &str, max_len: usize) -> String {
    let max_len = max_len.max(1);
    let mut out = String::with_capacity(text.len() + text.len() / max_len);
    let mut run = 0usize;
    for ch in text.chars() {
        if ch.is_whitespace() {
            run = 0;
            out.push(ch);
            continue;
        }
        if run == max_len {
            out.push(' ');
            run = 0;
        }
        out.push(ch);
        run += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn longest_token(s: &str) -> usize {
        s.split_whitespace()
            .map(|t| t.chars().count())
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn maps_typographic_punctuation_to_ascii() {
        let out = sanitize("\u{201C}Quoted\u{201D} \u{2014} it\u{2019}s fine\u{2026}");
        assert_eq!(out, "\"Quoted\" - it's fine...");

        let out = sanitize("\u{2022} item\u{A0}one \u{2192} next");
        assert_eq!(out, "- item one -> next");
    }

    #[test]
    fn none_and_empty_map_to_empty_string() {
        assert_eq!(sanitize_opt(None), "");
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize_opt(Some("ok")), "ok");
    }

    #[test]
    fn keeps_latin1_letters_and_drops_the_rest() {
        assert_eq!(sanitize("Resumé de Conceição 😀 ok"), "Resumé de Conceição  ok");
        assert_eq!(sanitize("漢字abc"), "abc");
        assert_eq!(sanitize("a\u{0007}b\u{200B}c"), "abc");
    }

    #[test]
    fn normalizes_line_endings_and_tabs() {
        assert_eq!(sanitize("a\r\nb\rc\td"), "a\nb\nc d");
    }

    #[test]
    fn breaks_long_tokens_without_losing_characters() {
        let token = "x".repeat(101);
        let out = sanitize(&token);
        assert_eq!(longest_token(&out), DEFAULT_MAX_TOKEN_LEN);
        assert_eq!(out.replace(' ', ""), token);
        assert_eq!(out.split(' ').count(), 3);
    }

    #[test]
    fn token_of_exactly_threshold_length_is_untouched() {
        let token = "y".repeat(DEFAULT_MAX_TOKEN_LEN);
        assert_eq!(sanitize(&token), token);
    }

    #[test]
    fn zero_threshold_is_treated_as_one() {
        let out = sanitize_with("abc", &SanitizeOptions { max_token_len: 0 });
        assert_eq!(out, "a b c");
    }

    #[test]
    fn output_stays_in_repertoire_for_hostile_inputs() {
        let inputs = [
            "plain ascii text",
            "\u{FEFF}BOM prefixed",
            "mixed \u{1F600}\u{1F680} emoji and \u{0301}combining",
            "https://example.com/a/very/long/path/that/keeps/going/and/going/forever?x=1&y=2",
            "\u{2014}\u{2014}\u{2014}\u{2026}\u{2026}",
            "Ελληνικά και кириллица",
            "tabs\t\tand\r\nnewlines\n\n",
            "\u{0000}\u{0001}\u{001F}\u{007F}\u{0080}\u{009F}",
        ];
        for (i, input) in inputs.iter().enumerate() {
            for max in [1usize, 5, 12, 40] {
                let out = sanitize_with(input, &SanitizeOptions::with_max_token_len(max));
                assert!(
                    out.chars().all(is_safe_char),
                    "case {i} max {max}: unsafe char in {out:?}"
                );
                assert!(
                    longest_token(&out) <= max,
                    "case {i} max {max}: token too long in {out:?}"
                );
            }
        }
    }
}
