//! Read-only access to authored guide content.
//!
//! Country configurations live in one directory as `{COUNTRY}_{VISA_TYPE}.json`,
//! templates in another as `{template_id}.json`.

use crate::content::model::{CountryConfig, GuideKey, Template};
use crate::error::ResolveError;
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Source of country configurations and templates.
///
/// `Ok(None)` means the record does not exist; errors are reserved for
/// content that exists but cannot be read.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn load_country_config(
        &self,
        country_code: &str,
        visa_type: &str,
    ) -> Result<Option<CountryConfig>, ResolveError>;

    async fn load_template(&self, template_id: &str) -> Result<Option<Template>, ResolveError>;

    async fn list_guides(&self) -> Result<Vec<GuideKey>, ResolveError>;
}

/// Identifiers become file names, so they are restricted to a safe alphabet.
pub fn validate_identifier(id: &str) -> Result<&str, ResolveError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("identifier regex is valid"));

    if pattern.is_match(id) {
        Ok(id)
    } else {
        Err(ResolveError::InvalidIdentifier(id.to_string()))
    }
}

pub fn country_config_file_name(country_code: &str, visa_type: &str) -> String {
    format!(
        "{}_{}.json",
        country_code.to_ascii_uppercase(),
        visa_type.to_ascii_uppercase()
    )
}

/// Content store over two directories on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    countries_dir: PathBuf,
    templates_dir: PathBuf,
}

impl FsContentStore {
    pub fn new(countries_dir: impl Into<PathBuf>, templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            countries_dir: countries_dir.into(),
            templates_dir: templates_dir.into(),
        }
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn load_country_config(
        &self,
        country_code: &str,
        visa_type: &str,
    ) -> Result<Option<CountryConfig>, ResolveError> {
        validate_identifier(country_code)?;
        validate_identifier(visa_type)?;

        let path = self
            .countries_dir
            .join(country_config_file_name(country_code, visa_type));
        read_json(&path).await
    }

    async fn load_template(&self, template_id: &str) -> Result<Option<Template>, ResolveError> {
        // A reference that cannot name a file cannot name a template either.
        if let Err(e) = validate_identifier(template_id) {
            debug!("{}, treating template as missing", e);
            return Ok(None);
        }

        let path = self.templates_dir.join(format!("{}.json", template_id));
        read_json(&path).await
    }

    async fn list_guides(&self) -> Result<Vec<GuideKey>, ResolveError> {
        let mut entries = match tokio::fs::read_dir(&self.countries_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(ResolveError::Io {
                    path: self.countries_dir.clone(),
                    source,
                })
            }
        };

        let mut guides = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|source| ResolveError::Io {
                    path: self.countries_dir.clone(),
                    source,
                })?;
            let Some(entry) = entry else { break };

            if let Some(key) = guide_key_from_path(&entry.path()) {
                guides.push(key);
            }
        }

        guides.sort();
        Ok(guides)
    }
}

/// `US_STUDENT.json` -> (US, STUDENT). The country code is everything before
/// the first underscore, so visa types may themselves contain underscores.
fn guide_key_from_path(path: &Path) -> Option<GuideKey> {
    if path.extension()? != "json" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (country_code, visa_type) = stem.split_once('_')?;
    if country_code.is_empty() || visa_type.is_empty() {
        return None;
    }

    Some(GuideKey {
        country_code: country_code.to_string(),
        visa_type: visa_type.to_string(),
    })
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ResolveError> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No content at {}", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(ResolveError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| ResolveError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (FsContentStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir_all(temp_dir.path().join("countries")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("templates")).unwrap();
        let store = FsContentStore::new(
            temp_dir.path().join("countries"),
            temp_dir.path().join("templates"),
        );
        (store, temp_dir)
    }

    fn write(dir: &TempDir, rel: &str, value: serde_json::Value) {
        std::fs::write(dir.path().join(rel), value.to_string()).unwrap();
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("US").is_ok());
        assert!(validate_identifier("F1_BASE").is_ok());
        assert!(validate_identifier("schengen-tourist").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("../secrets").is_err());
        assert!(validate_identifier("US/STUDENT").is_err());
        assert!(validate_identifier("a b").is_err());
    }

    #[test]
    fn test_country_config_file_name_is_uppercased() {
        assert_eq!(country_config_file_name("us", "student"), "US_STUDENT.json");
    }

    #[tokio::test]
    async fn test_load_country_config() {
        let (store, dir) = create_test_store();
        write(
            &dir,
            "countries/US_STUDENT.json",
            json!({"country_code": "US", "visa_type": "STUDENT", "template_ref": "F1_BASE"}),
        );

        let config = store
            .load_country_config("us", "student")
            .await
            .expect("should read")
            .expect("should exist");
        assert_eq!(config.template_ref.as_deref(), Some("F1_BASE"));
    }

    #[tokio::test]
    async fn test_missing_config_is_none() {
        let (store, _dir) = create_test_store();
        let config = store.load_country_config("FR", "WORK").await.unwrap();
        assert!(config.is_none());
    }

    #[tokio::test]
    async fn test_traversal_is_rejected_before_reading() {
        let (store, _dir) = create_test_store();
        let result = store.load_country_config("../countries", "STUDENT").await;
        assert!(matches!(result, Err(ResolveError::InvalidIdentifier(_))));
    }

    #[tokio::test]
    async fn test_unsafe_template_ref_is_missing() {
        let (store, dir) = create_test_store();
        write(&dir, "countries/US_STUDENT.json", json!({}));

        let traversal = store.load_template("../countries/US_STUDENT").await;
        assert!(matches!(traversal, Ok(None)));

        let spaced = store.load_template("Schengen Tourist").await;
        assert!(matches!(spaced, Ok(None)));
    }

    #[tokio::test]
    async fn test_malformed_template_is_parse_error() {
        let (store, dir) = create_test_store();
        std::fs::write(dir.path().join("templates/BROKEN.json"), "{not json").unwrap();

        let result = store.load_template("BROKEN").await;
        assert!(matches!(result, Err(ResolveError::Parse { .. })));
    }

    #[tokio::test]
    async fn test_list_guides_sorted_and_filtered() {
        let (store, dir) = create_test_store();
        write(&dir, "countries/US_STUDENT.json", json!({}));
        write(&dir, "countries/DE_JOB_SEEKER.json", json!({}));
        std::fs::write(dir.path().join("countries/README.md"), "notes").unwrap();
        std::fs::write(dir.path().join("countries/NOUNDERSCORE.json"), "{}").unwrap();

        let guides = store.list_guides().await.unwrap();
        assert_eq!(
            guides,
            vec![
                GuideKey {
                    country_code: "DE".to_string(),
                    visa_type: "JOB_SEEKER".to_string()
                },
                GuideKey {
                    country_code: "US".to_string(),
                    visa_type: "STUDENT".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_list_guides_missing_dir_is_empty() {
        let store = FsContentStore::new("/nonexistent/countries", "/nonexistent/templates");
        assert!(store.list_guides().await.unwrap().is_empty());
    }
}
