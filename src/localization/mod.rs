//! Guide localization: string extraction, the two-tier translation cache,
//! translation providers and the orchestrating [`Localizer`].

pub mod cache;
pub mod extract;
pub mod localizer;
pub mod provider;

pub use cache::{cache_key, CacheLookup, CacheTier, MemoryTier, RestKvTier, TieredCache};
pub use extract::{is_translatable, StringExtractor};
pub use localizer::Localizer;
pub use provider::{DisabledProvider, OpenAiProvider, TranslationProvider};
