//! Language support for guide localization.
//!
//! - `registry`: supported languages and which one guides are authored in
//! - `language`: validated `Language` type
//! - `metrics`: translation cache and provider counters

mod language;
mod metrics;
mod registry;

pub use language::Language;
pub use metrics::{MetricsReport, TranslationMetrics};
pub use registry::{LanguageConfig, LanguageRegistry};
