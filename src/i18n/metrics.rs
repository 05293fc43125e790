//! Translation metrics and observability module.
//!
//! Process-wide counters for the localization pipeline: which cache tier
//! answered, how often the provider was called and failed, and how often a
//! guide was served untranslated because the pipeline fell back.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Global translation metrics singleton.
pub struct TranslationMetrics {
    /// Strings answered by the in-process tier
    local_hits: AtomicUsize,

    /// Strings answered by the shared tier (and back-filled locally)
    shared_hits: AtomicUsize,

    /// Strings no tier could answer
    cache_misses: AtomicUsize,

    /// Batches sent to the translation provider
    provider_calls: AtomicUsize,

    /// Batches the provider failed to translate
    provider_failures: AtomicUsize,

    /// Localize calls that returned the original document because of an error
    fallbacks: AtomicUsize,
}

static METRICS: OnceLock<TranslationMetrics> = OnceLock::new();

impl TranslationMetrics {
    /// Get the global translation metrics instance.
    pub fn global() -> &'static TranslationMetrics {
        METRICS.get_or_init(|| TranslationMetrics {
            local_hits: AtomicUsize::new(0),
            shared_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
            provider_calls: AtomicUsize::new(0),
            provider_failures: AtomicUsize::new(0),
            fallbacks: AtomicUsize::new(0),
        })
    }

    pub fn record_local_hits(&self, count: usize) {
        self.local_hits.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_shared_hits(&self, count: usize) {
        self.shared_hits.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_cache_misses(&self, count: usize) {
        self.cache_misses.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_provider_call(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn local_hits(&self) -> usize {
        self.local_hits.load(Ordering::Relaxed)
    }

    pub fn shared_hits(&self) -> usize {
        self.shared_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::Relaxed)
    }

    pub fn provider_failures(&self) -> usize {
        self.provider_failures.load(Ordering::Relaxed)
    }

    pub fn fallbacks(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let local_hits = self.local_hits();
        let shared_hits = self.shared_hits();
        let misses = self.cache_misses();
        let total_lookups = local_hits + shared_hits + misses;
        let cache_hit_rate = if total_lookups > 0 {
            ((local_hits + shared_hits) as f64 / total_lookups as f64) * 100.0
        } else {
            0.0
        };

        let calls = self.provider_calls();
        let failures = self.provider_failures();
        let provider_success_rate = if calls > 0 {
            (calls.saturating_sub(failures) as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            local_hits,
            shared_hits,
            cache_misses: misses,
            cache_hit_rate,
            provider_calls: calls,
            provider_failures: failures,
            provider_success_rate,
            fallbacks: self.fallbacks(),
        }
    }

    /// Reset all metrics to zero (useful for testing).
    #[cfg(test)]
    pub fn reset(&self) {
        self.local_hits.store(0, Ordering::Relaxed);
        self.shared_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.provider_calls.store(0, Ordering::Relaxed);
        self.provider_failures.store(0, Ordering::Relaxed);
        self.fallbacks.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of the translation counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub local_hits: usize,
    pub shared_hits: usize,
    pub cache_misses: usize,

    /// Share of looked-up strings answered by either tier, as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub provider_calls: usize,
    pub provider_failures: usize,

    /// Share of provider batches that succeeded, as a percentage (0-100)
    pub provider_success_rate: f64,

    pub fallbacks: usize,
}
