//! Template inheritance: turns a country configuration plus its template
//! into one [`ResolvedDocument`].

use crate::content::model::{
    CountryConfig, DocumentDelta, DocumentOverride, RequirementBlock, ResolvedDocument, Template,
    STANDALONE_SOURCE,
};
use crate::content::store::ContentStore;
use crate::error::ResolveError;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Resolver {
    store: Arc<dyn ContentStore>,
}

impl Resolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    /// Build the guide for `(country_code, visa_type)`.
    ///
    /// A missing configuration is an error. A template reference that points
    /// at nothing resolves against an empty base instead.
    pub async fn resolve(
        &self,
        country_code: &str,
        visa_type: &str,
    ) -> Result<ResolvedDocument, ResolveError> {
        let config = self
            .store
            .load_country_config(country_code, visa_type)
            .await?
            .ok_or_else(|| ResolveError::NotFound {
                country_code: country_code.to_string(),
                visa_type: visa_type.to_string(),
            })?;

        let country_code = non_empty_or(&config.country_code, country_code).to_ascii_uppercase();
        let visa_type = non_empty_or(&config.visa_type, visa_type).to_ascii_uppercase();

        if config.standalone_data.is_some() {
            debug!("{}/{} is standalone", country_code, visa_type);
            return Ok(resolve_standalone(config, country_code, visa_type));
        }

        let (source_template, template) = match config.template_ref.as_deref() {
            Some(template_id) => {
                let template = self.store.load_template(template_id).await?;
                if template.is_none() {
                    warn!(
                        "{}/{} references missing template '{}', resolving against an empty base",
                        country_code, visa_type, template_id
                    );
                }
                (template_id.to_string(), template.unwrap_or_default())
            }
            None => {
                warn!(
                    "{}/{} has neither standalone data nor a template reference",
                    country_code, visa_type
                );
                (String::new(), Template::default())
            }
        };

        let resolved =
            merge_with_template(config, template, source_template, country_code, visa_type);
        info!(
            "Resolved {}/{} from '{}' ({} documents, {} steps)",
            resolved.country_code,
            resolved.visa_type,
            resolved.source_template,
            resolved.documents.len(),
            resolved.steps.len()
        );
        Ok(resolved)
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

fn resolve_standalone(
    config: CountryConfig,
    country_code: String,
    visa_type: String,
) -> ResolvedDocument {
    let standalone = config.standalone_data.unwrap_or_default();

    ResolvedDocument {
        country_code,
        visa_type,
        source_template: STANDALONE_SOURCE.to_string(),
        metadata: standalone.metadata,
        documents: standalone.documents,
        steps: standalone.steps,
        eligibility_criteria: config.eligibility_criteria,
        university_guide: config.university_guide,
    }
}

fn merge_with_template(
    config: CountryConfig,
    template: Template,
    source_template: String,
    country_code: String,
    visa_type: String,
) -> ResolvedDocument {
    let overrides = config.overrides;

    let metadata = match &overrides.metadata {
        Some(meta) => template.metadata.merged_with(meta),
        None => template.metadata,
    };

    let documents = match overrides.documents {
        Some(doc_override) => apply_document_override(template.documents, doc_override),
        None => template.documents,
    };

    let steps = overrides.steps.unwrap_or(template.steps);

    ResolvedDocument {
        country_code,
        visa_type,
        source_template,
        metadata,
        documents,
        steps,
        eligibility_criteria: config.eligibility_criteria,
        university_guide: config.university_guide,
    }
}

pub fn apply_document_override(
    base: Vec<RequirementBlock>,
    doc_override: DocumentOverride,
) -> Vec<RequirementBlock> {
    match doc_override {
        DocumentOverride::ReplaceAll(documents) => documents,
        DocumentOverride::Delta(delta) => apply_delta(base, delta),
    }
}

/// Remove, then modify, then add. `add` entries are appended as authored,
/// even when their id is already present; duplicates are not collapsed.
pub fn apply_delta(base: Vec<RequirementBlock>, delta: DocumentDelta) -> Vec<RequirementBlock> {
    let removed: HashSet<&str> = delta.remove.iter().map(String::as_str).collect();

    let mut documents: Vec<RequirementBlock> = base
        .into_iter()
        .filter(|doc| !removed.contains(doc.id.as_str()))
        .collect();

    for patch in &delta.modify {
        let mut matched = false;
        for doc in documents.iter_mut().filter(|doc| doc.id == patch.id) {
            patch.apply_to(doc);
            matched = true;
        }
        if !matched {
            debug!("modify entry '{}' matches no document, ignoring", patch.id);
        }
    }

    documents.extend(delta.add);
    documents
}
