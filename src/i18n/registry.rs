//! Language registry: Single source of truth for all guide languages.
//!
//! Guides are authored in exactly one base language. Every other entry in
//! the registry is a machine-translation target. The registry is a lazily
//! initialised singleton backed by `OnceLock`.

use std::sync::OnceLock;

/// Configuration for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// BCP-47 primary language subtag (e.g., "en", "hi")
    pub code: &'static str,

    /// English name of the language (e.g., "English", "Hindi")
    pub name: &'static str,

    /// Native name of the language (e.g., "English", "हिन्दी")
    pub native_name: &'static str,

    /// Whether guide content is authored in this language (only one should be true)
    pub is_canonical: bool,

    /// Whether this language is offered to readers
    pub enabled: bool,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code.
    ///
    /// Lookup is case-insensitive so that `"HI"` and `"hi"` resolve to the
    /// same entry.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(code))
    }

    /// Get all enabled languages.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// Get the base (authoring) language configuration.
    ///
    /// # Panics
    /// Panics if the built-in table does not contain exactly one canonical
    /// language.
    pub fn canonical(&self) -> &LanguageConfig {
        let canonical_langs: Vec<_> = self
            .languages
            .iter()
            .filter(|lang| lang.is_canonical)
            .collect();

        match canonical_langs.len() {
            0 => panic!("No canonical language found in registry"),
            1 => canonical_langs[0],
            _ => panic!("Multiple canonical languages found in registry"),
        }
    }
}

fn lang(
    code: &'static str,
    name: &'static str,
    native_name: &'static str,
    is_canonical: bool,
) -> LanguageConfig {
    LanguageConfig {
        code,
        name,
        native_name,
        is_canonical,
        enabled: true,
    }
}

/// Languages guides can be rendered in. English is the authoring language.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        lang("en", "English", "English", true),
        lang("hi", "Hindi", "हिन्दी", false),
        lang("es", "Spanish", "Español", false),
        lang("fr", "French", "Français", false),
        lang("de", "German", "Deutsch", false),
        lang("zh", "Chinese", "中文", false),
        lang("ar", "Arabic", "العربية", false),
        lang("pt", "Portuguese", "Português", false),
        lang("ru", "Russian", "Русский", false),
        lang("ja", "Japanese", "日本語", false),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_hindi() {
        let config = LanguageRegistry::get()
            .get_by_code("hi")
            .expect("Hindi should be registered");

        assert_eq!(config.name, "Hindi");
        assert_eq!(config.native_name, "हिन्दी");
        assert!(!config.is_canonical);
        assert!(config.enabled);
    }

    #[test]
    fn test_get_by_code_is_case_insensitive() {
        let registry = LanguageRegistry::get();
        let upper = registry.get_by_code("HI").expect("HI should resolve");
        assert_eq!(upper.code, "hi");
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        assert!(LanguageRegistry::get().get_by_code("xx").is_none());
        assert!(LanguageRegistry::get().get_by_code("").is_none());
    }

    #[test]
    fn test_canonical_is_english() {
        let canonical = LanguageRegistry::get().canonical();

        assert_eq!(canonical.code, "en");
        assert!(canonical.is_canonical);
    }

    #[test]
    fn test_exactly_one_canonical_language() {
        let count = default_languages()
            .iter()
            .filter(|lang| lang.is_canonical)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_codes_are_unique() {
        let languages = default_languages();
        let mut codes: Vec<_> = languages.iter().map(|l| l.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), languages.len());
    }

    #[test]
    fn test_list_enabled_includes_every_default() {
        let enabled = LanguageRegistry::get().list_enabled();
        assert_eq!(enabled.len(), default_languages().len());
        assert!(enabled.iter().any(|lang| lang.code == "ja"));
    }
}
