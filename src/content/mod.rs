//! Guide content: data model, storage and template resolution.

pub mod model;
pub mod resolver;
pub mod store;

pub use model::{
    CountryConfig, DocumentDelta, DocumentOverride, GuideKey, Overrides, ProcessStep,
    RequirementBlock, RequirementPatch, ResolvedDocument, StandaloneData, Template, VisaMetadata,
    STANDALONE_SOURCE,
};
pub use resolver::Resolver;
pub use store::{ContentStore, FsContentStore};
