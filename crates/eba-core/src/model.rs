//! The assessment payload consumed by the report composer.
//!
//! Field names are English; the keys emitted by the upstream extraction/analysis prompts
//! (Portuguese) are accepted as aliases. Numeric scores are normalized on ingestion: a score
//! is either a finite number inside its declared range or `None`.

use crate::config::Thresholds;
use crate::lenient::{self, fold_key};
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const TRAIT_SCALE_MAX: f64 = 10.0;
pub const SCORE_SCALE_MAX: f64 = 100.0;

/// The five personality traits, in canonical report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl Trait {
    pub const CANONICAL: [Trait; 5] = [
        Trait::Openness,
        Trait::Conscientiousness,
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Neuroticism,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Trait::Openness => "Openness",
            Trait::Conscientiousness => "Conscientiousness",
            Trait::Extraversion => "Extraversion",
            Trait::Agreeableness => "Agreeableness",
            Trait::Neuroticism => "Neuroticism",
        }
    }

    /// Resolves English or Portuguese trait names, ignoring case and accents.
    pub fn from_key(key: &str) -> Option<Self> {
        match fold_key(key).as_str() {
            "openness" | "abertura" | "openness_to_experience" => Some(Trait::Openness),
            "conscientiousness" | "conscienciosidade" => Some(Trait::Conscientiousness),
            "extraversion" | "extroversion" | "extroversao" | "extraversao" => {
                Some(Trait::Extraversion)
            }
            "agreeableness" | "amabilidade" => Some(Trait::Agreeableness),
            "neuroticism" | "neuroticismo" => Some(Trait::Neuroticism),
            _ => None,
        }
    }
}

/// Trait scores on a 0–10 scale. Traits that were not measured are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TraitScores(BTreeMap<Trait, f64>);

impl TraitScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a score, clamping it into `[0, 10]`. Non-finite scores are ignored.
    pub fn insert(&mut self, t: Trait, score: f64) {
        if score.is_finite() {
            self.0.insert(t, score.clamp(0.0, TRAIT_SCALE_MAX));
        }
    }

    pub fn get(&self, t: Trait) -> Option<f64> {
        self.0.get(&t).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All five traits in canonical order, whatever order the payload used.
    pub fn canonical(&self) -> impl Iterator<Item = (Trait, Option<f64>)> + '_ {
        Trait::CANONICAL.into_iter().map(|t| (t, self.get(t)))
    }
}

impl<'de> Deserialize<'de> for TraitScores {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = lenient::object(Option::<Value>::deserialize(d)?);
        let mut scores = TraitScores::new();
        for (key, value) in &raw {
            let Some(t) = Trait::from_key(key) else {
                tracing::debug!(key = %key, "ignoring unknown trait key");
                continue;
            };
            if let Some(v) = lenient::score(value, TRAIT_SCALE_MAX) {
                scores.insert(t, v);
            }
        }
        Ok(scores)
    }
}

/// Expected trait ranges for the evaluated role, drawn as the radar overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IdealProfile(BTreeMap<Trait, (f64, f64)>);

impl IdealProfile {
    /// The generic role profile used when the analysis carries none.
    pub fn generic() -> Self {
        let mut ranges = BTreeMap::new();
        ranges.insert(Trait::Openness, (5.0, 8.0));
        ranges.insert(Trait::Conscientiousness, (6.0, 9.0));
        ranges.insert(Trait::Extraversion, (4.0, 8.0));
        ranges.insert(Trait::Agreeableness, (5.0, 8.0));
        ranges.insert(Trait::Neuroticism, (0.0, 5.0));
        Self(ranges)
    }

    pub fn range(&self, t: Trait) -> Option<(f64, f64)> {
        self.0.get(&t).copied()
    }

    /// `Some(true)` when `score` falls inside the trait's ideal range.
    pub fn contains(&self, t: Trait, score: f64) -> Option<bool> {
        self.range(t).map(|(lo, hi)| (lo..=hi).contains(&score))
    }
}

impl<'de> Deserialize<'de> for IdealProfile {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = lenient::object(Option::<Value>::deserialize(d)?);
        let mut ranges = BTreeMap::new();
        for (key, value) in &raw {
            let Some(t) = Trait::from_key(key) else {
                continue;
            };
            let bounds = match value {
                Value::Array(items) if items.len() == 2 => (
                    lenient::score(&items[0], TRAIT_SCALE_MAX),
                    lenient::score(&items[1], TRAIT_SCALE_MAX),
                ),
                Value::Object(map) => (
                    map.get("min").and_then(|v| lenient::score(v, TRAIT_SCALE_MAX)),
                    map.get("max").and_then(|v| lenient::score(v, TRAIT_SCALE_MAX)),
                ),
                _ => (None, None),
            };
            if let (Some(a), Some(b)) = bounds {
                ranges.insert(t, (a.min(b), a.max(b)));
            }
        }
        Ok(Self(ranges))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Candidate {
    #[serde(alias = "nome", deserialize_with = "lenient::opt_text")]
    pub name: Option<String>,
    #[serde(alias = "empresa", deserialize_with = "lenient::opt_text")]
    pub company: Option<String>,
    #[serde(alias = "cargo_avaliado", deserialize_with = "lenient::opt_text")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Competency {
    #[serde(alias = "nome", deserialize_with = "lenient::text_or_empty")]
    pub name: String,
    #[serde(alias = "nota", deserialize_with = "lenient::opt_score_100")]
    pub score: Option<f64>,
    #[serde(
        alias = "classificacao",
        alias = "classification",
        deserialize_with = "lenient::opt_text"
    )]
    pub category: Option<String>,
}

impl Competency {
    pub fn new(name: impl Into<String>, score: Option<f64>) -> Self {
        Self {
            name: name.into(),
            score: score.filter(|s| s.is_finite()).map(|s| s.clamp(0.0, SCORE_SCALE_MAX)),
            category: None,
        }
    }
}

/// Competencies split by the composer's fixed thresholds.
///
/// `strengths` and `critical` never share an entry; `neutral` only feeds the chart. Entries
/// without a name or a score land in `unscored`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompetencyBuckets<'a> {
    pub strengths: Vec<&'a Competency>,
    pub critical: Vec<&'a Competency>,
    pub neutral: Vec<&'a Competency>,
    pub unscored: Vec<&'a Competency>,
}

impl<'a> CompetencyBuckets<'a> {
    pub fn classify(competencies: &'a [Competency], thresholds: &Thresholds) -> Self {
        let mut buckets = Self::default();
        for c in competencies {
            match c.score {
                Some(_) if c.name.trim().is_empty() => buckets.unscored.push(c),
                None => buckets.unscored.push(c),
                Some(s) if s >= thresholds.strength => buckets.strengths.push(c),
                Some(s) if s < thresholds.critical => buckets.critical.push(c),
                Some(_) => buckets.neutral.push(c),
            }
        }
        buckets
    }
}

/// How an emotional-health indicator should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPolarity {
    /// High values signal a concern (anxiety, irritability, impulsivity).
    HigherIsWorse,
    /// High values signal well-being (mood, resilience).
    HigherIsBetter,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    pub key: String,
    pub score: Option<f64>,
}

impl Indicator {
    /// `"estado_animo"` → `"Estado animo"`.
    pub fn label(&self) -> String {
        let spaced = self
            .key
            .replace('_', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    }

    pub fn polarity(&self) -> IndicatorPolarity {
        let key = fold_key(&self.key);
        const WORSE: [&str; 8] = [
            "ansiedade", "anxiety", "irritabilidade", "irritability", "impulsividade",
            "impulsivity", "estresse", "stress",
        ];
        const BETTER: [&str; 7] = [
            "estado_animo", "estado_de_animo", "mood", "humor", "resiliencia", "resilience",
            "wellbeing",
        ];
        if WORSE.contains(&key.as_str()) {
            IndicatorPolarity::HigherIsWorse
        } else if BETTER.contains(&key.as_str()) {
            IndicatorPolarity::HigherIsBetter
        } else {
            IndicatorPolarity::Unknown
        }
    }
}

/// Emotional-health indicators (0–100) in payload order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EmotionalHealth(Vec<Indicator>);

impl EmotionalHealth {
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<f64>)>,
        K: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(key, score)| Indicator {
                    key: key.into(),
                    score: score
                        .filter(|s| s.is_finite())
                        .map(|s| s.clamp(0.0, SCORE_SCALE_MAX)),
                })
                .collect(),
        )
    }

    pub fn indicators(&self) -> &[Indicator] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for EmotionalHealth {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = lenient::object(Option::<Value>::deserialize(d)?);
        Ok(Self(
            raw.iter()
                .filter(|(key, _)| !key.trim().is_empty())
                .map(|(key, value)| Indicator {
                    key: key.trim().to_string(),
                    score: lenient::score(value, SCORE_SCALE_MAX),
                })
                .collect(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Recommended,
    RecommendedWithReservations,
    NotRecommended,
}

impl Decision {
    pub fn label(self) -> &'static str {
        match self {
            Decision::Recommended => "RECOMMENDED",
            Decision::RecommendedWithReservations => "RECOMMENDED WITH RESERVATIONS",
            Decision::NotRecommended => "NOT RECOMMENDED",
        }
    }

    /// Parses English or Portuguese labels (`"NÃO RECOMENDADO"`, `"recommended with reservations"`).
    pub fn parse(text: &str) -> Option<Self> {
        let key = fold_key(text);
        if key.is_empty() {
            return None;
        }
        if key.starts_with("nao") || key.starts_with("not") {
            return Some(Decision::NotRecommended);
        }
        if key.contains("ressalva") || key.contains("reservation") {
            return Some(Decision::RecommendedWithReservations);
        }
        if key.starts_with("recomendado") || key.starts_with("recommended") {
            return Some(Decision::Recommended);
        }
        None
    }
}

impl Serialize for Decision {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.label())
    }
}

fn opt_decision<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<Decision>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    let text = v.as_ref().and_then(lenient::text_of);
    let decision = text.as_deref().and_then(Decision::parse);
    if decision.is_none() {
        if let Some(text) = text {
            tracing::debug!(value = %text, "unrecognized decision label");
        }
    }
    Ok(decision)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementStatus {
    Meets,
    Partial,
    DoesNotMeet,
}

impl RequirementStatus {
    pub fn label(self) -> &'static str {
        match self {
            RequirementStatus::Meets => "MEETS",
            RequirementStatus::Partial => "PARTIAL",
            RequirementStatus::DoesNotMeet => "DOES NOT MEET",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let key = fold_key(text);
        if key.starts_with("nao") || key.starts_with("does_not") || key.starts_with("not") {
            Some(RequirementStatus::DoesNotMeet)
        } else if key.starts_with("parc") || key.starts_with("partial") {
            Some(RequirementStatus::Partial)
        } else if key.starts_with("atende") || key.starts_with("meets") {
            Some(RequirementStatus::Meets)
        } else {
            None
        }
    }
}

impl Serialize for RequirementStatus {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.label())
    }
}

fn opt_requirement_status<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<RequirementStatus>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref()
        .and_then(lenient::text_of)
        .as_deref()
        .and_then(RequirementStatus::parse))
}

/// How the candidate measures against one competency the role depends on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetencyAssessment {
    #[serde(alias = "competencia", deserialize_with = "lenient::text_or_empty")]
    pub competency: String,
    #[serde(alias = "avaliacao", deserialize_with = "lenient::opt_text")]
    pub assessment: Option<String>,
    #[serde(deserialize_with = "opt_requirement_status")]
    pub status: Option<RequirementStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlternativeRole {
    #[serde(alias = "cargo", alias = "role", deserialize_with = "lenient::text_or_empty")]
    pub name: String,
    #[serde(alias = "justificativa", deserialize_with = "lenient::opt_text")]
    pub justification: Option<String>,
}

fn trait_notes<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<BTreeMap<Trait, String>, D::Error> {
    let raw = lenient::object(Option::<Value>::deserialize(d)?);
    Ok(raw
        .iter()
        .filter_map(|(key, value)| Some((Trait::from_key(key)?, lenient::text_of(value)?)))
        .collect())
}

fn opt_ideal_profile<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<IdealProfile>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(v @ Value::Object(_)) => serde_json::from_value::<IdealProfile>(v)
            .ok()
            .filter(|p| !p.0.is_empty()),
        _ => None,
    })
}

/// Everything the composer needs for one report. Read-only during composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPayload {
    #[serde(alias = "candidato", deserialize_with = "lenient::record_or_default")]
    pub candidate: Candidate,
    #[serde(alias = "traits_bfa")]
    pub traits: TraitScores,
    #[serde(alias = "competencias_ms", deserialize_with = "lenient::record_list")]
    pub competencies: Vec<Competency>,
    #[serde(alias = "indicadores_saude_emocional")]
    pub emotional_health: EmotionalHealth,
    #[serde(alias = "decisao", deserialize_with = "opt_decision")]
    pub decision: Option<Decision>,
    #[serde(alias = "compatibilidade_geral", deserialize_with = "lenient::opt_score_100")]
    pub compatibility: Option<f64>,
    #[serde(alias = "justificativa_decisao", deserialize_with = "lenient::opt_text")]
    pub justification: Option<String>,
    #[serde(alias = "resumo_executivo", deserialize_with = "lenient::opt_text")]
    pub executive_summary: Option<String>,
    #[serde(alias = "saude_emocional_contexto", deserialize_with = "lenient::opt_text")]
    pub emotional_health_context: Option<String>,
    #[serde(alias = "pontos_fortes", deserialize_with = "lenient::text_list")]
    pub strengths: Vec<String>,
    #[serde(alias = "pontos_atencao", deserialize_with = "lenient::text_list")]
    pub risks: Vec<String>,
    #[serde(alias = "recomendacoes_desenvolvimento", deserialize_with = "lenient::text_list")]
    pub recommendations: Vec<String>,
    #[serde(alias = "cargos_alternativos", deserialize_with = "lenient::record_list")]
    pub alternative_roles: Vec<AlternativeRole>,
    #[serde(alias = "analise_tracos", deserialize_with = "trait_notes")]
    pub trait_analysis: BTreeMap<Trait, String>,
    #[serde(alias = "competencias_criticas", deserialize_with = "lenient::record_list")]
    pub critical_competencies: Vec<CompetencyAssessment>,
    #[serde(alias = "potencial_lideranca", deserialize_with = "lenient::opt_text")]
    pub leadership_potential: Option<String>,
    #[serde(alias = "integridade_fgi", deserialize_with = "lenient::opt_score_100")]
    pub integrity: Option<f64>,
    #[serde(alias = "traits_ideais", deserialize_with = "opt_ideal_profile")]
    pub ideal_traits: Option<IdealProfile>,
}

impl AnalysisPayload {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(Error::PayloadJson)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(Error::PayloadJson)
    }

    /// Builds a payload from the two upstream documents: the structured extraction and the
    /// role analysis. Keys present in both are taken from the analysis.
    pub fn from_parts(extraction: Value, analysis: Value) -> Result<Self> {
        let mut merged = match extraction {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                return Self::from_value(other);
            }
        };
        if let Value::Object(map) = analysis {
            for (key, value) in map {
                merged.insert(key, value);
            }
        }
        Self::from_value(Value::Object(merged))
    }

    /// Splits competencies by [`Thresholds::FIXED`].
    pub fn classify_competencies(&self) -> CompetencyBuckets<'_> {
        CompetencyBuckets::classify(&self.competencies, &Thresholds::FIXED)
    }

    /// The ideal profile from the analysis, or the generic role profile.
    pub fn ideal_profile(&self) -> IdealProfile {
        self.ideal_traits.clone().unwrap_or_else(IdealProfile::generic)
    }
}
