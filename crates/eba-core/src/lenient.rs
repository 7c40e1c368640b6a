//! Tolerant deserializers for upstream JSON.
//!
//! The extraction/analysis services are language models; their JSON is well-formed but the
//! value types drift (numbers as strings, `null` lists, decimal commas). These helpers turn
//! every such drift into either a clean value or an explicit absence.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let t = s.trim().trim_end_matches('%').trim_end();
            t.replace(',', ".").parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// A finite number clamped into `[0, max]`, or `None`.
pub(crate) fn score(value: &Value, max: f64) -> Option<f64> {
    number(value).map(|n| n.clamp(0.0, max))
}

pub(crate) fn text_of(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

pub(crate) fn opt_score_100<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(|v| score(v, 100.0)))
}

pub(crate) fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(text_of))
}

pub(crate) fn text_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    opt_text(d).map(Option::unwrap_or_default)
}

/// A list of strings; `null` is empty, scalar items are stringified, blanks and nested values
/// are skipped.
pub(crate) fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Array(items)) => items.iter().filter_map(text_of).collect(),
        Some(other) => text_of(&other).into_iter().collect(),
        None => Vec::new(),
    })
}

/// A list of records; `null` is empty and records that fail to deserialize are dropped.
pub(crate) fn record_list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Option::<Value>::deserialize(d)?;
    let Some(Value::Array(items)) = v else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<T>(item) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::debug!(index = idx, error = %err, "skipping malformed payload record");
                None
            }
        })
        .collect())
}

/// A single record; anything that fails to deserialize falls back to the default.
pub(crate) fn record_or_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.and_then(|v| serde_json::from_value(v).ok()).unwrap_or_default())
}

/// The entries of a JSON object in document order; other values yield an empty map.
pub(crate) fn object(value: Option<Value>) -> serde_json::Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

/// Lowercases and strips accents and punctuation so `"Extroversão"`, `"extroversao"` and
/// `"EXTROVERSAO "` compare equal.
pub(crate) fn fold_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.trim().chars().flat_map(char::to_lowercase) {
        let base = match ch {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'ç' => 'c',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ñ' => 'n',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'ý' | 'ÿ' => 'y',
            ' ' | '-' | '_' => '_',
            c if c.is_ascii_alphanumeric() => c,
            _ => continue,
        };
        if base == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(base);
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_accept_strings_and_decimal_commas() {
        assert_eq!(number(&json!(7.5)), Some(7.5));
        assert_eq!(number(&json!("7,5")), Some(7.5));
        assert_eq!(number(&json!(" 82% ")), Some(82.0));
        assert_eq!(number(&json!("n/a")), None);
        assert_eq!(number(&json!(null)), None);
        assert_eq!(number(&json!([1])), None);
    }

    #[test]
    fn scores_are_clamped_into_range() {
        assert_eq!(score(&json!(130), 100.0), Some(100.0));
        assert_eq!(score(&json!(-4), 10.0), Some(0.0));
    }

    #[test]
    fn fold_key_strips_accents_case_and_separators() {
        assert_eq!(fold_key("Extroversão"), "extroversao");
        assert_eq!(fold_key("  Estado de Ânimo "), "estado_de_animo");
        assert_eq!(fold_key("estado_animo"), "estado_animo");
        assert_eq!(fold_key("NÃO RECOMENDADO"), "nao_recomendado");
    }
}
