pub mod config;
pub mod content;
pub mod error;
pub mod i18n;
pub mod localization;
pub mod retry;
pub mod server;
