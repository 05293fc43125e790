//! On-demand localization of guide documents.
//!
//! `localize` never fails: any error inside the pipeline is logged and the
//! caller gets the untranslated input back.

use crate::config::Config;
use crate::content::ResolvedDocument;
use crate::error::{LocalizationError, ProviderError};
use crate::i18n::{Language, TranslationMetrics};
use crate::localization::cache::{CacheTier, MemoryTier, RestKvTier, TieredCache};
use crate::localization::extract::StringExtractor;
use crate::localization::provider::{DisabledProvider, OpenAiProvider, TranslationProvider};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Localizer {
    extractor: StringExtractor,
    cache: TieredCache,
    provider: Arc<dyn TranslationProvider>,
    base_language: Language,
}

impl Localizer {
    pub fn new(
        extractor: StringExtractor,
        cache: TieredCache,
        provider: Arc<dyn TranslationProvider>,
        base_language: Language,
    ) -> Self {
        Self {
            extractor,
            cache,
            provider,
            base_language,
        }
    }

    /// Wire the pipeline from configuration: an in-process tier, the shared
    /// tier when `SHARED_CACHE_URL` is set, and the OpenAI provider when an
    /// API key is set.
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let mut tiers: Vec<Arc<dyn CacheTier>> = vec![Arc::new(MemoryTier::new(
            config.local_cache_capacity,
            config.local_cache_ttl,
        ))];

        match &config.shared_cache_url {
            Some(url) => {
                info!("Shared translation cache enabled at {}", url);
                tiers.push(Arc::new(RestKvTier::new(
                    client.clone(),
                    url.clone(),
                    config.shared_cache_token.clone(),
                    config.shared_cache_ttl,
                    config.shared_cache_timeout,
                )));
            }
            None => info!("SHARED_CACHE_URL not set, using the in-process cache only"),
        }

        let provider: Arc<dyn TranslationProvider> =
            match OpenAiProvider::from_config(client, config) {
                Some(provider) => Arc::new(provider),
                None => {
                    warn!(
                        "OPENAI_API_KEY not set, guides will be served in {} only",
                        config.base_language.name()
                    );
                    Arc::new(DisabledProvider)
                }
            };

        let cache = TieredCache::new(tiers, config.base_language);
        info!(
            "Translating with {} through cache tiers [{}]",
            provider.name(),
            cache.tier_names().join(", ")
        );

        Self::new(
            StringExtractor::new(config.skip_fields.clone()),
            cache,
            provider,
            config.base_language,
        )
    }

    pub fn base_language(&self) -> Language {
        self.base_language
    }

    /// Translate every eligible string in `document` into `target_language`.
    /// Returns a copy of `document` unchanged if anything goes wrong.
    pub async fn localize(&self, document: &Value, target_language: Language) -> Value {
        match self.try_localize(document, target_language).await {
            Ok(localized) => localized,
            Err(e) => {
                warn!(
                    "Localization to {} failed, serving original content: {}",
                    target_language, e
                );
                TranslationMetrics::global().record_fallback();
                document.clone()
            }
        }
    }

    /// Typed variant of [`Localizer::localize`] for resolved guides.
    pub async fn localize_document(
        &self,
        document: &ResolvedDocument,
        target_language: Language,
    ) -> ResolvedDocument {
        if target_language == self.base_language {
            return document.clone();
        }

        match self.try_localize_document(document, target_language).await {
            Ok(localized) => localized,
            Err(e) => {
                warn!(
                    "Localization of {}/{} to {} failed, serving original content: {}",
                    document.country_code, document.visa_type, target_language, e
                );
                TranslationMetrics::global().record_fallback();
                document.clone()
            }
        }
    }

    async fn try_localize_document(
        &self,
        document: &ResolvedDocument,
        target_language: Language,
    ) -> Result<ResolvedDocument, LocalizationError> {
        let value = serde_json::to_value(document).map_err(LocalizationError::Serialize)?;
        let localized = self.try_localize(&value, target_language).await?;
        serde_json::from_value(localized).map_err(LocalizationError::Deserialize)
    }

    /// The pipeline behind `localize`, with failures surfaced.
    pub async fn try_localize(
        &self,
        document: &Value,
        target_language: Language,
    ) -> Result<Value, LocalizationError> {
        if target_language == self.base_language {
            return Ok(document.clone());
        }

        let strings = self.extractor.extract(document);
        if strings.is_empty() {
            return Ok(document.clone());
        }

        let lookup = self.cache.get_many(&strings, target_language).await;
        debug!(
            "Localizing {} strings to {}: {} cached, {} to translate",
            strings.len(),
            target_language,
            lookup.hits.len(),
            lookup.misses.len()
        );

        let mut translations = lookup.hits;
        if !lookup.misses.is_empty() {
            let fresh = self.translate_misses(&lookup.misses, target_language).await?;
            self.cache.set_many(&fresh, target_language).await;
            translations.extend(fresh);
        }

        Ok(self.extractor.rehydrate(document, &translations))
    }

    async fn translate_misses(
        &self,
        misses: &[String],
        target_language: Language,
    ) -> Result<HashMap<String, String>, LocalizationError> {
        let metrics = TranslationMetrics::global();
        metrics.record_provider_call();

        let translated = match self.provider.translate(misses, target_language).await {
            Ok(translated) => translated,
            Err(e) => {
                metrics.record_provider_failure();
                return Err(e.into());
            }
        };

        if translated.len() != misses.len() {
            metrics.record_provider_failure();
            return Err(ProviderError::LengthMismatch {
                expected: misses.len(),
                actual: translated.len(),
            }
            .into());
        }

        Ok(misses.iter().cloned().zip(translated).collect())
    }
}
