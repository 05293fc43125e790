//! HTTP surface for guides.

use crate::content::{GuideKey, ResolvedDocument, Resolver};
use crate::error::ResolveError;
use crate::i18n::{Language, LanguageRegistry, MetricsReport, TranslationMetrics};
use crate::localization::Localizer;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub localizer: Arc<Localizer>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/languages", get(list_languages))
        .route("/api/guides", get(list_guides))
        .route("/api/guides/:country/:visa_type", get(get_guide))
        .route("/api/translation-metrics", get(translation_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct GuideQuery {
    pub lang: Option<String>,
}

/// Requested language, or the base language when absent or unsupported.
pub fn requested_language(lang: Option<&str>, base_language: Language) -> Language {
    match lang.map(str::trim).filter(|l| !l.is_empty()) {
        Some(code) => Language::from_code(code).unwrap_or_else(|e| {
            debug!("{}, serving {}", e, base_language);
            base_language
        }),
        None => base_language,
    }
}

async fn health() -> &'static str {
    "OK"
}

/// A language guides can be requested in.
#[derive(Debug, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    /// Guides are authored in this language and served without translation.
    pub is_base: bool,
}

async fn list_languages(State(state): State<AppState>) -> Json<Vec<LanguageInfo>> {
    let base_language = state.localizer.base_language();
    let languages = LanguageRegistry::get()
        .list_enabled()
        .into_iter()
        .map(|lang| LanguageInfo {
            code: lang.code,
            name: lang.name,
            native_name: lang.native_name,
            is_base: lang.code == base_language.code(),
        })
        .collect();

    Json(languages)
}

async fn list_guides(State(state): State<AppState>) -> Result<Json<Vec<GuideKey>>, ApiError> {
    let guides = state.resolver.store().list_guides().await?;
    Ok(Json(guides))
}

async fn get_guide(
    State(state): State<AppState>,
    Path((country, visa_type)): Path<(String, String)>,
    Query(query): Query<GuideQuery>,
) -> Result<Json<ResolvedDocument>, ApiError> {
    let language = requested_language(query.lang.as_deref(), state.localizer.base_language());

    let resolved = state.resolver.resolve(&country, &visa_type).await?;
    let localized = state.localizer.localize_document(&resolved, language).await;

    Ok(Json(localized))
}

async fn translation_metrics() -> Json<MetricsReport> {
    Json(TranslationMetrics::global().report())
}

/// Maps resolution failures to HTTP responses.
pub struct ApiError(ResolveError);

impl From<ResolveError> for ApiError {
    fn from(e: ResolveError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = if self.0.is_not_found() {
            debug!("{}", self.0);
            (StatusCode::NOT_FOUND, "content not found")
        } else {
            error!("Failed to load guide content: {:?}", self.0);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to load content")
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
