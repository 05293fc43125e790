//! Collects translatable strings from a JSON tree and writes translations back.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://\S+$").expect("url regex is valid")
    })
}

fn uuid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
        )
        .expect("uuid regex is valid")
    })
}

/// Whether a string leaf is human-readable text worth translating.
///
/// Blank strings, URLs, UUIDs and bare digit runs are left alone.
pub fn is_translatable(s: &str) -> bool {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return false;
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    !(url_pattern().is_match(trimmed) || uuid_pattern().is_match(trimmed))
}

/// Walks JSON values, skipping the values of structural fields.
#[derive(Debug, Clone)]
pub struct StringExtractor {
    skip_fields: HashSet<String>,
}

impl StringExtractor {
    pub fn new(skip_fields: HashSet<String>) -> Self {
        Self { skip_fields }
    }

    pub fn skips(&self, field: &str) -> bool {
        self.skip_fields.contains(field)
    }

    /// Every translatable string in document order, each listed once.
    pub fn extract(&self, value: &Value) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut strings = Vec::new();
        self.collect(value, &mut seen, &mut strings);
        strings
    }

    fn collect<'a>(&self, value: &'a Value, seen: &mut HashSet<&'a str>, out: &mut Vec<String>) {
        match value {
            Value::String(s) => {
                if is_translatable(s) && seen.insert(s.as_str()) {
                    out.push(s.clone());
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.collect(item, seen, out);
                }
            }
            Value::Object(map) => {
                for (key, item) in map {
                    if !self.skips(key) {
                        self.collect(item, seen, out);
                    }
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    /// Copy of `value` with every translatable string replaced by its entry in
    /// `translations`. Strings without an entry are kept as they are.
    pub fn rehydrate(&self, value: &Value, translations: &HashMap<String, String>) -> Value {
        match value {
            Value::String(s) if is_translatable(s) => match translations.get(s) {
                Some(translated) => Value::String(translated.clone()),
                None => value.clone(),
            },
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.rehydrate(item, translations))
                    .collect(),
            ),
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (key, item) in map {
                    let item = if self.skips(key) {
                        item.clone()
                    } else {
                        self.rehydrate(item, translations)
                    };
                    out.insert(key.clone(), item);
                }
                Value::Object(out)
            }
            Value::String(_) | Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        }
    }
}

impl Default for StringExtractor {
    fn default() -> Self {
        Self::new(crate::config::default_skip_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_only_keeps_prose() {
        let inputs = [
            "",
            "   ",
            "https://x.com/y",
            "123e4567-e89b-12d3-a456-426614174000",
            "42",
            "Hello World",
        ];
        let eligible: Vec<_> = inputs.iter().filter(|s| is_translatable(s)).collect();
        assert_eq!(eligible, vec![&"Hello World"]);
    }

    #[test]
    fn test_filter_keeps_text_with_digits() {
        assert!(is_translatable("3-5 weeks"));
        assert!(is_translatable("160 USD"));
        assert!(!is_translatable(" 2024 "));
    }

    #[test]
    fn test_filter_url_must_be_whole_string() {
        assert!(!is_translatable("ftp://files.example.org/form.pdf"));
        assert!(is_translatable("Apply at https://travel.state.gov today"));
    }

    #[test]
    fn test_extract_dedupes_in_document_order() {
        let doc = json!({
            "title": "Passport",
            "steps": [{"title": "Book interview"}, {"title": "Passport"}],
            "note": "Book interview"
        });

        let strings = StringExtractor::default().extract(&doc);
        assert_eq!(strings, vec!["Passport", "Book interview"]);
    }

    #[test]
    fn test_extract_skips_structural_fields_at_any_depth() {
        let doc = json!({
            "id": "Passport copy",
            "documents": [{"id": "doc1", "title": "Passport", "category": "identity"}],
            "template_ref": {"name": "Nested under a skipped key"}
        });

        let strings = StringExtractor::default().extract(&doc);
        assert_eq!(strings, vec!["Passport"]);
    }

    #[test]
    fn test_custom_skip_list() {
        let extractor = StringExtractor::new(["title".to_string()].into_iter().collect());
        let doc = json!({"title": "Kept", "id": "Translated now"});

        assert_eq!(extractor.extract(&doc), vec!["Translated now"]);
    }

    #[test]
    fn test_extract_ignores_non_strings() {
        let doc = json!({"count": 5, "premium": true, "note": null, "tags": [1, 2.5]});
        assert!(StringExtractor::default().extract(&doc).is_empty());
    }

    #[test]
    fn test_rehydrate_replaces_every_occurrence() {
        let doc = json!({
            "title": "Passport",
            "items": ["Passport", {"label": "Passport"}],
        });
        let translations: HashMap<String, String> =
            [("Passport".to_string(), "पासपोर्ट".to_string())].into();

        let out = StringExtractor::default().rehydrate(&doc, &translations);
        assert_eq!(
            out,
            json!({"title": "पासपोर्ट", "items": ["पासपोर्ट", {"label": "पासपोर्ट"}]})
        );
    }

    #[test]
    fn test_rehydrate_leaves_skipped_fields_and_unknown_strings() {
        let doc = json!({"id": "Passport", "title": "Passport", "note": "Untranslated"});
        let translations: HashMap<String, String> =
            [("Passport".to_string(), "Pasaporte".to_string())].into();

        let out = StringExtractor::default().rehydrate(&doc, &translations);
        assert_eq!(
            out,
            json!({"id": "Passport", "title": "Pasaporte", "note": "Untranslated"})
        );
    }

    #[test]
    fn test_rehydrate_preserves_key_order() {
        let doc = json!({"b": "Second", "a": "First"});
        let out = StringExtractor::default().rehydrate(&doc, &HashMap::new());
        assert_eq!(out, doc);
    }
}
