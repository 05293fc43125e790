use crate::i18n::Language;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Field names whose values are identifiers or codes and never go to the
/// translation provider.
pub const DEFAULT_SKIP_FIELDS: &[&str] = &[
    "id",
    "country_code",
    "visa_type",
    "template_ref",
    "source_template",
    "slug",
    "filename",
    "code",
    "category",
    "url",
    "link",
    "href",
    "icon",
    "image",
    "currency",
    "language",
];

#[derive(Debug, Clone)]
pub struct Config {
    // Content
    pub content_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub base_language: Language,

    // Translation provider (OpenAI-compatible)
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,
    pub provider_timeout: Duration,

    // Shared cache (REST key-value store)
    pub shared_cache_url: Option<String>,
    pub shared_cache_token: Option<String>,
    pub shared_cache_timeout: Duration,

    // Cache lifetimes
    pub local_cache_ttl: Duration,
    pub shared_cache_ttl: Duration,
    pub local_cache_capacity: usize,

    // Extraction
    pub skip_fields: HashSet<String>,

    // Server
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let base_language = match std::env::var("BASE_LANGUAGE") {
            Ok(code) => Language::from_code(&code).context("BASE_LANGUAGE is not supported")?,
            Err(_) => Language::canonical(),
        };

        Ok(Self {
            content_dir: env_or("CONTENT_DIR", "content/countries").into(),
            templates_dir: env_or("TEMPLATES_DIR", "content/templates").into(),
            base_language,

            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            openai_api_url: env_or(
                "OPENAI_API_URL",
                "https://api.openai.com/v1/chat/completions",
            ),
            provider_timeout: Duration::from_secs(env_parse("PROVIDER_TIMEOUT_SECS", 30)),

            shared_cache_url: env_opt("SHARED_CACHE_URL"),
            shared_cache_token: env_opt("SHARED_CACHE_TOKEN"),
            shared_cache_timeout: Duration::from_millis(env_parse("SHARED_CACHE_TIMEOUT_MS", 750)),

            local_cache_ttl: Duration::from_secs(env_parse("LOCAL_CACHE_TTL_SECS", 86_400)),
            shared_cache_ttl: Duration::from_secs(env_parse("SHARED_CACHE_TTL_SECS", 604_800)),
            local_cache_capacity: env_parse("LOCAL_CACHE_CAPACITY", 10_000),

            skip_fields: std::env::var("SKIP_FIELDS")
                .map(|v| parse_skip_fields(&v))
                .unwrap_or_else(|_| default_skip_fields()),

            port: env_parse("PORT", 8080),
        })
    }
}

pub fn default_skip_fields() -> HashSet<String> {
    DEFAULT_SKIP_FIELDS.iter().map(|s| s.to_string()).collect()
}

fn parse_skip_fields(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "CONTENT_DIR",
        "TEMPLATES_DIR",
        "BASE_LANGUAGE",
        "OPENAI_API_KEY",
        "SHARED_CACHE_URL",
        "LOCAL_CACHE_TTL_SECS",
        "SHARED_CACHE_TTL_SECS",
        "SKIP_FIELDS",
        "PORT",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().expect("defaults should load");

        assert_eq!(config.content_dir, PathBuf::from("content/countries"));
        assert_eq!(config.templates_dir, PathBuf::from("content/templates"));
        assert_eq!(config.base_language, Language::ENGLISH);
        assert!(config.openai_api_key.is_none());
        assert!(config.shared_cache_url.is_none());
        assert_eq!(config.local_cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.shared_cache_ttl, Duration::from_secs(604_800));
        assert!(config.skip_fields.contains("id"));
        assert!(config.skip_fields.contains("template_ref"));
        assert_eq!(config.port, 8080);
    }

    #[test]
    #[serial]
    fn test_overrides_from_env() {
        clear_env();
        std::env::set_var("LOCAL_CACHE_TTL_SECS", "60");
        std::env::set_var("SKIP_FIELDS", "id, slug ,,code");
        std::env::set_var("PORT", "9090");

        let config = Config::from_env().expect("should load");
        assert_eq!(config.local_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.skip_fields.len(), 3);
        assert!(config.skip_fields.contains("slug"));
        assert_eq!(config.port, 9090);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparseable_number_falls_back_to_default() {
        clear_env();
        std::env::set_var("PORT", "not-a-port");

        let config = Config::from_env().expect("should load");
        assert_eq!(config.port, 8080);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_blank_api_key_is_unset() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "   ");

        let config = Config::from_env().expect("should load");
        assert!(config.openai_api_key.is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_base_language_is_an_error() {
        clear_env();
        std::env::set_var("BASE_LANGUAGE", "xx");

        assert!(Config::from_env().is_err());

        clear_env();
    }
}
