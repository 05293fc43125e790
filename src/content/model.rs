//! Guide content as authored on disk and as served after resolution.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `source_template` value for guides that do not inherit from a template.
pub const STANDALONE_SOURCE: &str = "STANDALONE";

/// Headline facts about a visa. Every field is optional so the same type
/// serves as a template baseline and as a field-level override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisaMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Authored fields this type does not name explicitly.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VisaMetadata {
    /// Shallow merge: a field present in `overrides` replaces the same field
    /// here, everything else is inherited.
    pub fn merged_with(&self, overrides: &VisaMetadata) -> VisaMetadata {
        let mut extra = self.extra.clone();
        for (key, value) in &overrides.extra {
            extra.insert(key.clone(), value.clone());
        }

        VisaMetadata {
            title: overrides.title.clone().or_else(|| self.title.clone()),
            description: overrides
                .description
                .clone()
                .or_else(|| self.description.clone()),
            processing_time: overrides
                .processing_time
                .clone()
                .or_else(|| self.processing_time.clone()),
            validity: overrides.validity.clone().or_else(|| self.validity.clone()),
            fee: overrides.fee.clone().or_else(|| self.fee.clone()),
            currency: overrides.currency.clone().or_else(|| self.currency.clone()),
            url: overrides.url.clone().or_else(|| self.url.clone()),
            extra,
        }
    }
}

/// One document an applicant has to provide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementBlock {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Partial update for the requirement with the same `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementPatch {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl RequirementPatch {
    pub fn apply_to(&self, block: &mut RequirementBlock) {
        if let Some(title) = &self.title {
            block.title = title.clone();
        }
        if let Some(description) = &self.description {
            block.description = description.clone();
        }
        if let Some(category) = &self.category {
            block.category = category.clone();
        }
        if let Some(is_premium) = self.is_premium {
            block.is_premium = is_premium;
        }
        if let Some(note) = &self.note {
            block.note = Some(note.clone());
        }
        if let Some(link) = &self.link {
            block.link = Some(link.clone());
        }
    }
}

/// Structured edit of a template's requirement list.
///
/// Applied as remove, then modify, then add.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentDelta {
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub modify: Vec<RequirementPatch>,
    #[serde(default)]
    pub add: Vec<RequirementBlock>,
}

/// A country's requirement override: either a whole new list or a delta.
/// The shape is decided when the configuration is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentOverride {
    ReplaceAll(Vec<RequirementBlock>),
    Delta(DocumentDelta),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessStep {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Baseline content shared by every country using the same visa class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub metadata: VisaMetadata,
    #[serde(default)]
    pub documents: Vec<RequirementBlock>,
    #[serde(default)]
    pub steps: Vec<ProcessStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overrides {
    #[serde(default)]
    pub metadata: Option<VisaMetadata>,
    #[serde(default)]
    pub documents: Option<DocumentOverride>,
    /// Replaces the template's steps wholesale when present.
    #[serde(default)]
    pub steps: Option<Vec<ProcessStep>>,
}

/// Complete guide content for a country that does not use a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandaloneData {
    #[serde(default)]
    pub metadata: VisaMetadata,
    #[serde(default)]
    pub documents: Vec<RequirementBlock>,
    #[serde(default)]
    pub steps: Vec<ProcessStep>,
}

/// Per-country, per-visa-type content record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryConfig {
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub visa_type: String,
    #[serde(default)]
    pub template_ref: Option<String>,
    #[serde(default)]
    pub overrides: Overrides,
    #[serde(default)]
    pub standalone_data: Option<StandaloneData>,
    #[serde(default)]
    pub eligibility_criteria: Option<Value>,
    #[serde(default)]
    pub university_guide: Option<Value>,
}

/// The merged guide handed to localization and rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDocument {
    pub country_code: String,
    pub visa_type: String,
    /// Template id the guide inherits from, or [`STANDALONE_SOURCE`].
    pub source_template: String,
    pub metadata: VisaMetadata,
    pub documents: Vec<RequirementBlock>,
    pub steps: Vec<ProcessStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligibility_criteria: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub university_guide: Option<Value>,
}

impl ResolvedDocument {
    pub fn is_standalone(&self) -> bool {
        self.source_template == STANDALONE_SOURCE
    }
}

/// A `(country, visa type)` pair with stored content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GuideKey {
    pub country_code: String,
    pub visa_type: String,
}
