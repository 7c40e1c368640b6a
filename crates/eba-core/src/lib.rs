#![forbid(unsafe_code)]

//! Data model and text handling for the behavioral-assessment report engine.
//!
//! This crate is renderer-agnostic: it owns the [`AnalysisPayload`] ingested from upstream
//! extraction/analysis services, the [`sanitize`] boundary every drawn string passes through,
//! and the [`ReportConfig`] knobs shared by the renderer and the CLI.

pub mod config;
pub mod error;
mod lenient;
pub mod model;
pub mod sanitize;
pub mod theme;

pub use config::{ChartSize, ChartSizes, GaugeBands, ListLimits, PageGeometry, ReportConfig, Thresholds};
pub use error::{Error, Result};
pub use model::{
    AlternativeRole, AnalysisPayload, Candidate, Competency, CompetencyAssessment,
    CompetencyBuckets, Decision, EmotionalHealth, IdealProfile, Indicator, IndicatorPolarity,
    RequirementStatus, Trait, TraitScores,
};
pub use sanitize::{SanitizeOptions, sanitize, sanitize_opt, sanitize_with};
pub use theme::{Palette, Rgb};
