//! Static JSON served from the content directory.
//!
//! Files are read on every request, so editing them takes effect without a restart.
//!
//! - `GET /api/config/defaults` → `defaults.json`
//! - `GET /api/config/models`   → `models.json`
//! - `GET /api/config/examples` → `examples.json` (also used as few-shot examples for generation)
//! - `GET /api/config/sounds`   → `sound-catalog.json`, filterable by `category` and `q`
//!   (also searched for sounds that fit a generation prompt)

use crate::error::{AppError, AppResult};
use crate::health::capability_report;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFile {
    Defaults,
    Models,
    Examples,
    Sounds,
}

impl ContentFile {
    pub const ALL: [ContentFile; 4] = [
        ContentFile::Defaults,
        ContentFile::Models,
        ContentFile::Examples,
        ContentFile::Sounds,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ContentFile::Defaults => "defaults.json",
            ContentFile::Models => "models.json",
            ContentFile::Examples => "examples.json",
            ContentFile::Sounds => "sound-catalog.json",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            ContentFile::Defaults => "defaults",
            ContentFile::Models => "models",
            ContentFile::Examples => "examples",
            ContentFile::Sounds => "sounds",
        }
    }
}

/// Read and parse one content file.
///
/// A missing file is a 404; a file that exists but isn't valid JSON is our problem (500).
pub async fn load_content(dir: &Path, file: ContentFile) -> AppResult<Value> {
    let path = dir.join(file.file_name());
    let raw = tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::NotFound(format!("{} is not available", file.file_name())),
        _ => AppError::Internal(format!("failed to read {}: {}", path.display(), e)),
    })?;

    serde_json::from_str(&raw)
        .map_err(|e| AppError::ConfigError(format!("{} is not valid JSON: {}", path.display(), e)))
}

/// One prompt/code pair used to show the model what good output looks like.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FewShotExample {
    pub prompt: String,
    pub code: String,
}

/// Few-shot examples for generation. Missing or malformed files just mean no examples.
pub async fn few_shot_examples(dir: &Path) -> Vec<FewShotExample> {
    let value = match load_content(dir, ContentFile::Examples).await {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "No few-shot examples available");
            return Vec::new();
        }
    };

    // Either a bare array or { "examples": [...] }
    let list = match value {
        Value::Object(mut map) => map.remove("examples").unwrap_or(Value::Null),
        other => other,
    };

    match list {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// One entry of `sound-catalog.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SoundEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub example: Option<String>,
}

// Either a bare array or { "sounds": [...] }
fn catalog_items(catalog: Value) -> Vec<Value> {
    match catalog {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("sounds") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// The sound catalog as typed entries, for prompt building. Unreadable means empty.
pub async fn sound_catalog(dir: &Path) -> Vec<SoundEntry> {
    match load_content(dir, ContentFile::Sounds).await {
        Ok(catalog) => catalog_items(catalog)
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Err(err) => {
            debug!(error = %err, "No sound catalog available");
            Vec::new()
        }
    }
}

async fn serve(state: &AppState, file: ContentFile) -> AppResult<HttpResponse> {
    let data = load_content(&state.config.config_dir(), file).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
}

pub async fn get_defaults(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    serve(&state, ContentFile::Defaults).await
}

pub async fn get_models(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    serve(&state, ContentFile::Models).await
}

pub async fn get_examples(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    serve(&state, ContentFile::Examples).await
}

#[derive(Debug, Deserialize)]
pub struct SoundQuery {
    pub category: Option<String>,
    /// Free-text match against name, description and tags
    pub q: Option<String>,
}

pub async fn get_sounds(
    state: web::Data<AppState>,
    query: web::Query<SoundQuery>,
) -> AppResult<HttpResponse> {
    let catalog = load_content(&state.config.config_dir(), ContentFile::Sounds).await?;
    let sounds = catalog_items(catalog);

    let category = query.category.as_deref().map(str::to_lowercase);
    let needle = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let filtered: Vec<Value> = sounds
        .into_iter()
        .filter(|sound| match &category {
            Some(category) => sound["category"]
                .as_str()
                .is_some_and(|c| c.eq_ignore_ascii_case(category)),
            None => true,
        })
        .filter(|sound| match &needle {
            Some(needle) => sound_matches(sound, needle),
            None => true,
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": filtered,
        "count": filtered.len()
    })))
}

fn sound_matches(sound: &Value, needle: &str) -> bool {
    let text_hit = ["name", "id", "description"].iter().any(|key| {
        sound[*key]
            .as_str()
            .is_some_and(|text| text.to_lowercase().contains(needle))
    });
    let tag_hit = sound["tags"].as_array().is_some_and(|tags| {
        tags.iter()
            .filter_map(Value::as_str)
            .any(|tag| tag.to_lowercase() == needle)
    });
    text_hit || tag_hit
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let dir = state.config.config_dir();
    let mut files = serde_json::Map::new();
    for file in ContentFile::ALL {
        files.insert(file.key().to_string(), json!(dir.join(file.file_name()).is_file()));
    }

    capability_report(
        "config",
        dir.is_dir(),
        json!({ "configDir": dir.display().to_string(), "files": files }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, Credentials};
    use crate::handlers::{configure_routes, test_support};
    use actix_web::{http::StatusCode, test, App};
    use std::fs;

    fn content_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("defaults.json"), r#"{"tempo": 120, "model": "grok-4-fast"}"#)
            .unwrap();
        fs::write(dir.path().join("models.json"), r#"[{"id": "grok-4-fast"}]"#).unwrap();
        fs::write(
            dir.path().join("examples.json"),
            r#"{"examples": [{"prompt": "four on the floor", "code": "s(\"bd*4\")"}, {"bogus": true}]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("sound-catalog.json"),
            r#"[
                {"id": "bd", "name": "bd", "category": "drums", "description": "Bass drum", "tags": ["kick"]},
                {"id": "gm_epiano1", "name": "gm_epiano1", "category": "keyboards", "description": "Rhodes-like electric piano", "tags": ["piano", "soul"]}
            ]"#,
        )
        .unwrap();
        dir
    }

    fn state_for(dir: &Path) -> web::Data<AppState> {
        let mut config = AppConfig::default();
        config.content.config_dir = dir.display().to_string();
        test_support::state_with_config(config, Credentials::default())
    }

    #[actix_web::test]
    async fn test_serves_defaults() {
        let dir = content_dir();
        let app = test::init_service(
            App::new().app_data(state_for(dir.path())).configure(configure_routes),
        )
        .await;

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/config/defaults").to_request(),
        )
        .await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["tempo"], 120);
    }

    #[actix_web::test]
    async fn test_missing_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(
            App::new().app_data(state_for(dir.path())).configure(configure_routes),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/config/models").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_broken_json_is_500() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("defaults.json"), "{ not json").unwrap();
        let app = test::init_service(
            App::new().app_data(state_for(dir.path())).configure(configure_routes),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/config/defaults").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_sound_filters() {
        let dir = content_dir();
        let app = test::init_service(
            App::new().app_data(state_for(dir.path())).configure(configure_routes),
        )
        .await;

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/config/sounds?category=Drums").to_request(),
        )
        .await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["id"], "bd");

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/config/sounds?q=rhodes").to_request(),
        )
        .await;
        assert_eq!(body["count"], 1);
        assert_eq!(body["data"][0]["id"], "gm_epiano1");

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/config/sounds").to_request(),
        )
        .await;
        assert_eq!(body["count"], 2);
    }

    #[actix_web::test]
    async fn test_few_shot_examples_skip_malformed_entries() {
        let dir = content_dir();
        let examples = few_shot_examples(dir.path()).await;
        assert_eq!(examples.len(), 1);
        assert_eq!(examples[0].prompt, "four on the floor");

        let empty = tempfile::tempdir().unwrap();
        assert!(few_shot_examples(empty.path()).await.is_empty());
    }

    #[actix_web::test]
    async fn test_sound_catalog_entries() {
        let dir = content_dir();
        let sounds = sound_catalog(dir.path()).await;
        assert_eq!(sounds.len(), 2);
        assert_eq!(sounds[1].name, "gm_epiano1");
        assert_eq!(sounds[1].tags, vec!["piano", "soul"]);

        let empty = tempfile::tempdir().unwrap();
        assert!(sound_catalog(empty.path()).await.is_empty());
    }

    #[actix_web::test]
    async fn test_shipped_catalog_loads() {
        let sounds = sound_catalog(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/content"))).await;
        assert!(sounds.len() > 500);
        assert!(sounds.iter().any(|s| s.name == "gm_epiano1" && s.category == "keyboards"));
    }

    #[actix_web::test]
    async fn test_health_lists_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("models.json"), "[]").unwrap();
        let app = test::init_service(
            App::new().app_data(state_for(dir.path())).configure(configure_routes),
        )
        .await;

        let body: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::get().uri("/api/config/health").to_request(),
        )
        .await;
        assert_eq!(body["configured"], true);
        assert_eq!(body["files"]["models"], true);
        assert_eq!(body["files"]["defaults"], false);
    }
}
