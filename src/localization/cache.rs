//! Two-tier translation cache.
//!
//! Entries are keyed by target language plus a SHA-256 of the source string.
//! The in-process tier is consulted first, then the shared tier; a shared hit
//! is copied into the in-process tier before it is reported. Shared-tier
//! failures degrade to misses.

use crate::error::CacheError;
use crate::i18n::{Language, TranslationMetrics};
use async_trait::async_trait;
use futures::future::join_all;
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cache key for `source` translated into `language`.
pub fn cache_key(language: Language, source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    format!("translation:{}:{:x}", language.code(), digest)
}

/// One storage layer of the translation cache.
#[async_trait]
pub trait CacheTier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Values for `keys`, in the same order. `None` for absent or expired keys.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), CacheError>;
}

// ==================== In-process tier ====================

struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Bounded LRU map with a fixed time-to-live per entry.
pub struct MemoryTier {
    entries: Mutex<LruCache<String, MemoryEntry>>,
    ttl: Duration,
}

impl MemoryTier {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, MemoryEntry>> {
        // Entries are written whole, so a panic elsewhere cannot leave one half-updated.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value for a single key, if present and not expired.
    pub fn peek(&self, key: &str) -> Option<String> {
        let entries = self.lock();
        entries
            .peek(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }
}

#[async_trait]
impl CacheTier for MemoryTier {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        let now = Instant::now();
        let mut entries = self.lock();

        let values = keys
            .iter()
            .map(|key| {
                let live = entries
                    .get(key)
                    .map(|entry| (entry.expires_at > now, entry.value.clone()));
                match live {
                    Some((true, value)) => Some(value),
                    Some((false, _)) => {
                        entries.pop(key);
                        None
                    }
                    None => None,
                }
            })
            .collect();

        Ok(values)
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
        let expires_at = Instant::now() + self.ttl;
        let mut cache = self.lock();
        for (key, value) in entries {
            cache.put(
                key.clone(),
                MemoryEntry {
                    value: value.clone(),
                    expires_at,
                },
            );
        }
        Ok(())
    }
}

// ==================== Shared tier ====================

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Redis-compatible store reached over a REST gateway: `POST {url}` with a
/// single command, `POST {url}/pipeline` with a batch.
pub struct RestKvTier {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    ttl: Duration,
    timeout: Duration,
}

impl RestKvTier {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            ttl,
            timeout,
        }
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, CacheError> {
        tokio::time::timeout(self.timeout, self.send(path, body))
            .await
            .map_err(|_| CacheError::Timeout(self.timeout))?
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, CacheError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(CacheError::Status { status, body });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CacheError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CacheTier for RestKvTier {
    fn name(&self) -> &'static str {
        "shared"
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut command = vec![Value::from("MGET")];
        command.extend(keys.iter().map(|k| Value::from(k.as_str())));

        let reply: CommandReply = self.post("", &Value::Array(command)).await?;
        if let Some(error) = reply.error {
            return Err(CacheError::Decode(error));
        }

        let values = match reply.result {
            Value::Array(values) => values,
            other => {
                return Err(CacheError::Decode(format!(
                    "MGET returned a non-array result: {}",
                    other
                )))
            }
        };
        if values.len() != keys.len() {
            return Err(CacheError::Decode(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }

        Ok(values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect())
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
        if entries.is_empty() {
            return Ok(());
        }

        let ttl = self.ttl.as_secs().max(1).to_string();
        let commands: Vec<Value> = entries
            .iter()
            .map(|(key, value)| {
                Value::from(vec![
                    "SET",
                    key.as_str(),
                    value.as_str(),
                    "EX",
                    ttl.as_str(),
                ])
            })
            .collect();

        let replies: Vec<CommandReply> = self.post("/pipeline", &Value::Array(commands)).await?;
        if let Some(error) = replies.iter().find_map(|r| r.error.as_deref()) {
            return Err(CacheError::Decode(format!("SET failed: {}", error)));
        }
        Ok(())
    }
}

// ==================== Tiered cache ====================

/// Outcome of a batch lookup.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheLookup {
    pub hits: HashMap<String, String>,
    /// Strings no tier could answer, in input order.
    pub misses: Vec<String>,
}

/// Tiers ordered fastest first.
#[derive(Clone)]
pub struct TieredCache {
    tiers: Vec<Arc<dyn CacheTier>>,
    base_language: Language,
}

impl TieredCache {
    pub fn new(tiers: Vec<Arc<dyn CacheTier>>, base_language: Language) -> Self {
        Self {
            tiers,
            base_language,
        }
    }

    pub fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    pub async fn get_many(&self, strings: &[String], language: Language) -> CacheLookup {
        if language == self.base_language {
            return CacheLookup {
                hits: strings.iter().map(|s| (s.clone(), s.clone())).collect(),
                misses: Vec::new(),
            };
        }

        let mut hits = HashMap::new();
        let mut pending: Vec<(&String, String)> =
            strings.iter().map(|s| (s, cache_key(language, s))).collect();

        for (depth, tier) in self.tiers.iter().enumerate() {
            if pending.is_empty() {
                break;
            }

            let keys: Vec<String> = pending.iter().map(|(_, key)| key.clone()).collect();
            let values = match tier.get_many(&keys).await {
                Ok(values) if values.len() == keys.len() => values,
                Ok(values) => {
                    warn!(
                        "{} cache tier returned {} values for {} keys, treating as misses",
                        tier.name(),
                        values.len(),
                        keys.len()
                    );
                    continue;
                }
                Err(e) => {
                    warn!("{} cache tier unavailable, treating as misses: {}", tier.name(), e);
                    continue;
                }
            };

            let mut found = Vec::new();
            let mut still_pending = Vec::new();
            for ((source, key), value) in pending.into_iter().zip(values) {
                match value {
                    Some(translated) => {
                        hits.insert(source.clone(), translated.clone());
                        found.push((key, translated));
                    }
                    None => still_pending.push((source, key)),
                }
            }
            pending = still_pending;

            if found.is_empty() {
                continue;
            }
            debug!("{} cache tier answered {} strings", tier.name(), found.len());
            if depth == 0 {
                TranslationMetrics::global().record_local_hits(found.len());
            } else {
                TranslationMetrics::global().record_shared_hits(found.len());
                let backfills = self.tiers[..depth].iter().map(|faster| {
                    let found = &found;
                    async move {
                        if let Err(e) = faster.set_many(found).await {
                            warn!("Failed to back-fill {} cache tier: {}", faster.name(), e);
                        }
                    }
                });
                join_all(backfills).await;
            }
        }

        let misses: Vec<String> = pending.into_iter().map(|(s, _)| s.clone()).collect();
        TranslationMetrics::global().record_cache_misses(misses.len());

        CacheLookup { hits, misses }
    }

    /// Store `translations` (source -> translated) for `language`.
    ///
    /// The fastest tier is written before this returns; slower tiers are
    /// written from background tasks whose failures are only logged.
    pub async fn set_many(&self, translations: &HashMap<String, String>, language: Language) {
        if language == self.base_language || translations.is_empty() {
            return;
        }

        let entries: Arc<Vec<(String, String)>> = Arc::new(
            translations
                .iter()
                .map(|(source, translated)| (cache_key(language, source), translated.clone()))
                .collect(),
        );

        let Some((first, rest)) = self.tiers.split_first() else {
            return;
        };

        if let Err(e) = first.set_many(&entries).await {
            warn!("Failed to write {} cache tier: {}", first.name(), e);
        }

        for tier in rest {
            let tier = Arc::clone(tier);
            let entries = Arc::clone(&entries);
            tokio::spawn(async move {
                if let Err(e) = tier.set_many(&entries).await {
                    warn!("Failed to write {} cache tier: {}", tier.name(), e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use wiremock::{
        matchers::{body_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn rest_tier(uri: &str) -> RestKvTier {
        RestKvTier::new(
            reqwest::Client::new(),
            uri,
            Some("test-token".to_string()),
            Duration::from_secs(604_800),
            Duration::from_secs(2),
        )
    }

    /// Tier that fails every call.
    struct DownTier;

    #[async_trait]
    impl CacheTier for DownTier {
        fn name(&self) -> &'static str {
            "down"
        }

        async fn get_many(&self, _keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
            Err(CacheError::Timeout(Duration::from_millis(1)))
        }

        async fn set_many(&self, _entries: &[(String, String)]) -> Result<(), CacheError> {
            Err(CacheError::Timeout(Duration::from_millis(1)))
        }
    }

    // ==================== Key Tests ====================

    #[test]
    fn test_cache_key_separates_languages() {
        let hi = cache_key(Language::HINDI, "Apply Now");
        let es = cache_key(Language::SPANISH, "Apply Now");
        assert_ne!(hi, es);
        assert!(hi.starts_with("translation:hi:"));
        assert_eq!(hi.len(), "translation:hi:".len() + 64);
    }

    #[test]
    fn test_cache_key_is_stable() {
        assert_eq!(
            cache_key(Language::HINDI, "Apply Now"),
            cache_key(Language::HINDI, "Apply Now")
        );
        assert_ne!(
            cache_key(Language::HINDI, "Apply Now"),
            cache_key(Language::HINDI, "Apply now")
        );
    }

    // ==================== Memory Tier Tests ====================

    #[tokio::test]
    #[serial]
    async fn test_memory_tier_roundtrip() {
        let tier = MemoryTier::new(10, Duration::from_secs(60));
        let entries = [("k1".to_string(), "v1".to_string())];
        tier.set_many(&entries).await.unwrap();

        let values = tier.get_many(&strings(&["k1", "k2"])).await.unwrap();
        assert_eq!(values, vec![Some("v1".to_string()), None]);
    }

    #[tokio::test]
    #[serial]
    async fn test_memory_tier_expires_entries() {
        let tier = MemoryTier::new(10, Duration::from_millis(20));
        let entries = [("k1".to_string(), "v1".to_string())];
        tier.set_many(&entries).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(tier.get_many(&strings(&["k1"])).await.unwrap(), vec![None]);
        assert!(tier.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_memory_tier_is_bounded() {
        let tier = MemoryTier::new(2, Duration::from_secs(60));
        tier.set_many(&[
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("c".to_string(), "3".to_string()),
        ])
        .await
        .unwrap();

        assert_eq!(tier.len(), 2);
        assert!(tier.peek("a").is_none());
        assert_eq!(tier.peek("c").as_deref(), Some("3"));
    }

    #[test]
    fn test_memory_tier_zero_capacity_holds_one() {
        let tier = MemoryTier::new(0, Duration::from_secs(60));
        assert!(tier.is_empty());
    }

    // ==================== Shared Tier Tests ====================

    #[tokio::test]
    #[serial]
    async fn test_rest_tier_mget() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!(["MGET", "k1", "k2"])))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"result": ["v1", null]})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let values = rest_tier(&mock_server.uri())
            .get_many(&strings(&["k1", "k2"]))
            .await
            .expect("should succeed");
        assert_eq!(values, vec![Some("v1".to_string()), None]);
    }

    #[tokio::test]
    #[serial]
    async fn test_rest_tier_pipelined_set_with_expiry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pipeline"))
            .and(body_json(serde_json::json!([
                ["SET", "k1", "v1", "EX", "604800"]
            ])))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{"result": "OK"}])),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        rest_tier(&mock_server.uri())
            .set_many(&[("k1".to_string(), "v1".to_string())])
            .await
            .expect("should succeed");
    }

    #[tokio::test]
    #[serial]
    async fn test_rest_tier_status_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let result = rest_tier(&mock_server.uri())
            .get_many(&strings(&["k1"]))
            .await;
        assert!(matches!(result, Err(CacheError::Status { status: 500, .. })));
    }

    #[tokio::test]
    #[serial]
    async fn test_rest_tier_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"result": [null]}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let tier = RestKvTier::new(
            reqwest::Client::new(),
            mock_server.uri(),
            None,
            Duration::from_secs(60),
            Duration::from_millis(50),
        );
        let result = tier.get_many(&strings(&["k1"])).await;
        assert!(matches!(result, Err(CacheError::Timeout(_))));
    }

    #[tokio::test]
    #[serial]
    async fn test_rest_tier_empty_batch_makes_no_request() {
        // No server listening: any request would fail
        let tier = rest_tier("http://127.0.0.1:9");
        assert!(tier.get_many(&[]).await.unwrap().is_empty());
        assert!(tier.set_many(&[]).await.is_ok());
    }

    // ==================== Tiered Cache Tests ====================

    #[tokio::test]
    #[serial]
    async fn test_base_language_bypasses_every_tier() {
        let cache = TieredCache::new(vec![Arc::new(DownTier)], Language::ENGLISH);

        let lookup = cache
            .get_many(&strings(&["Passport"]), Language::ENGLISH)
            .await;
        assert_eq!(lookup.hits["Passport"], "Passport");
        assert!(lookup.misses.is_empty());
    }

    #[tokio::test]
    #[serial]
    async fn test_local_hit_and_miss_partition() {
        let local = Arc::new(MemoryTier::new(100, Duration::from_secs(60)));
        let cache = TieredCache::new(vec![local.clone()], Language::ENGLISH);

        let translations: HashMap<String, String> =
            [("Passport".to_string(), "पासपोर्ट".to_string())].into();
        cache.set_many(&translations, Language::HINDI).await;

        let lookup = cache
            .get_many(&strings(&["Passport", "Visa fee"]), Language::HINDI)
            .await;
        assert_eq!(lookup.hits.len(), 1);
        assert_eq!(lookup.hits["Passport"], "पासपोर्ट");
        assert_eq!(lookup.misses, vec!["Visa fee"]);

        // Same source under another language is a separate entry
        let other = cache.get_many(&strings(&["Passport"]), Language::SPANISH).await;
        assert_eq!(other.misses, vec!["Passport"]);
    }

    #[tokio::test]
    #[serial]
    async fn test_shared_hit_back_fills_local() {
        let shared = Arc::new(MemoryTier::new(100, Duration::from_secs(600)));
        let entry = (cache_key(Language::HINDI, "Passport"), "पासपोर्ट".to_string());
        shared.set_many(&[entry]).await.unwrap();
        let local = Arc::new(MemoryTier::new(100, Duration::from_secs(60)));
        let cache = TieredCache::new(vec![local.clone(), shared], Language::ENGLISH);

        assert!(local.peek(&cache_key(Language::HINDI, "Passport")).is_none());

        let lookup = cache.get_many(&strings(&["Passport"]), Language::HINDI).await;
        assert_eq!(lookup.hits["Passport"], "पासपोर्ट");
        assert_eq!(
            local
                .peek(&cache_key(Language::HINDI, "Passport"))
                .as_deref(),
            Some("पासपोर्ट")
        );
    }

    #[test]
    fn test_tier_names_fastest_first() {
        let local = Arc::new(MemoryTier::new(100, Duration::from_secs(60)));
        let cache = TieredCache::new(vec![local, Arc::new(DownTier)], Language::ENGLISH);
        assert_eq!(cache.tier_names(), vec!["local", "down"]);
    }

    #[tokio::test]
    #[serial]
    async fn test_unavailable_shared_tier_degrades_to_miss() {
        let local = Arc::new(MemoryTier::new(100, Duration::from_secs(60)));
        let cache = TieredCache::new(vec![local, Arc::new(DownTier)], Language::ENGLISH);

        let lookup = cache.get_many(&strings(&["Passport"]), Language::HINDI).await;
        assert!(lookup.hits.is_empty());
        assert_eq!(lookup.misses, vec!["Passport"]);

        // Writes to the broken tier are swallowed too
        let translations: HashMap<String, String> =
            [("Passport".to_string(), "पासपोर्ट".to_string())].into();
        cache.set_many(&translations, Language::HINDI).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_set_many_skips_base_language() {
        let local = Arc::new(MemoryTier::new(100, Duration::from_secs(60)));
        let cache = TieredCache::new(vec![local.clone()], Language::ENGLISH);

        let translations: HashMap<String, String> =
            [("Passport".to_string(), "Passport".to_string())].into();
        cache.set_many(&translations, Language::ENGLISH).await;

        assert!(local.is_empty());
    }
}
