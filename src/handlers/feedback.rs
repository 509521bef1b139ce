//! Track feedback, stored as documents in the preferences collection.
//!
//! Submissions are uploaded through the management API; searches go through the regular
//! document search API and come back reshaped into a block the generator can be primed with.

use crate::error::{AppError, AppResult};
use crate::health::capability_report;
use crate::providers::collections::CollectionDocument;
use crate::providers::xai::SearchMatch;
use crate::state::AppState;
use crate::validation::{validated, Validate, Validator, MAX_PROMPT_CHARS};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;
use uuid::Uuid;

const MAX_TRACK_ID_CHARS: usize = 200;
const MAX_COMMENT_CHARS: usize = 2000;
const MAX_CODE_CHARS: usize = 50_000;
const MAX_TAGS: usize = 20;
const MAX_TAG_CHARS: usize = 50;
const MAX_QUERY_CHARS: usize = 1000;
const DEFAULT_SEARCH_LIMIT: u32 = 5;
const MAX_SEARCH_LIMIT: u32 = 20;
/// Longest excerpt of a match quoted in the context block
const EXCERPT_CHARS: usize = 280;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub track_id: String,
    /// Kept wide so out-of-range values are reported as validation errors
    pub rating: i64,
    #[serde(default)]
    pub comments: Option<String>,
    pub prompt_used: String,
    #[serde(default)]
    pub generated_code: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Validate for FeedbackRequest {
    fn validate(&self) -> AppResult<()> {
        let mut v = Validator::new();
        v.str_len("trackId", &self.track_id, 1, MAX_TRACK_ID_CHARS);
        v.range("rating", self.rating, 1, 5);
        v.opt_str_len("comments", self.comments.as_deref(), 0, MAX_COMMENT_CHARS);
        v.str_len("promptUsed", &self.prompt_used, 1, MAX_PROMPT_CHARS);
        v.opt_str_len("generatedCode", self.generated_code.as_deref(), 0, MAX_CODE_CHARS);
        v.max_items("tags", &self.tags, MAX_TAGS);
        for (i, tag) in self.tags.iter().enumerate() {
            v.str_len(&format!("tags[{}]", i), tag, 1, MAX_TAG_CHARS);
        }
        v.finish()
    }
}

impl FeedbackRequest {
    /// Text body indexed for search. Search hits return chunks of this.
    fn document_text(&self) -> String {
        let mut text = String::new();
        text.push_str(&format!("Rating: {}/5\n", self.rating));
        text.push_str(&format!("Prompt: {}\n", self.prompt_used.trim()));
        if let Some(comments) = self.comments.as_deref().filter(|c| !c.trim().is_empty()) {
            text.push_str(&format!("Comments: {}\n", comments.trim()));
        }
        if !self.tags.is_empty() {
            text.push_str(&format!("Tags: {}\n", self.tags.join(", ")));
        }
        if let Some(code) = self.generated_code.as_deref().filter(|c| !c.trim().is_empty()) {
            text.push_str(&format!("Code:\n{}\n", code.trim_end()));
        }
        text
    }

    fn into_document(self, feedback_id: &str, created_at: &str) -> CollectionDocument {
        let content = self.document_text();
        let mut fields = BTreeMap::new();
        fields.insert("feedback_id".to_string(), feedback_id.to_string());
        fields.insert("track_id".to_string(), self.track_id);
        fields.insert("rating".to_string(), self.rating.to_string());
        fields.insert("tags".to_string(), self.tags.join(","));
        fields.insert("created_at".to_string(), created_at.to_string());

        CollectionDocument {
            name: format!("feedback-{}", feedback_id),
            content,
            fields,
        }
    }
}

pub async fn submit_feedback(
    state: web::Data<AppState>,
    body: web::Json<FeedbackRequest>,
) -> AppResult<HttpResponse> {
    let request = validated(body.into_inner())?;

    let feedback_id = Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().to_rfc3339();
    let rating = request.rating;
    let track_id = request.track_id.clone();

    let file_id = state
        .providers
        .collections
        .upload_document(request.into_document(&feedback_id, &created_at))
        .await?;

    info!(
        feedback_id = %feedback_id,
        track_id = %track_id,
        rating,
        "Feedback stored"
    );

    let mut data = json!({ "feedbackId": feedback_id, "createdAt": created_at });
    if let Some(file_id) = file_id {
        data["fileId"] = json!(file_id);
    }
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

impl Validate for SearchRequest {
    fn validate(&self) -> AppResult<()> {
        let mut v = Validator::new();
        v.str_len("query", &self.query, 1, MAX_QUERY_CHARS);
        v.check(!self.query.trim().is_empty(), "query", "must not be blank");
        v.opt_range("limit", self.limit, 1, MAX_SEARCH_LIMIT);
        v.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preference {
    pub content: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceSummary {
    pub preferences: Vec<Preference>,
    pub summary: String,
    pub context_block: String,
    pub count: usize,
}

/// Ratings are stored as strings in document fields, but accept numbers too.
fn field_rating(fields: &std::collections::HashMap<String, Value>) -> Option<u8> {
    let rating = match fields.get("rating")? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (1..=5).contains(&rating).then_some(rating as u8)
}

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    cut.push_str("...");
    cut
}

/// Turn raw search hits into preferences plus a prompt-ready summary.
pub fn shape_preferences(matches: Vec<SearchMatch>) -> PreferenceSummary {
    let preferences: Vec<Preference> = matches
        .into_iter()
        .filter(|m| !m.chunk_content.trim().is_empty())
        .map(|m| Preference {
            rating: field_rating(&m.fields),
            track_id: m
                .fields
                .get("track_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            content: m.chunk_content.trim().to_string(),
            score: m.score,
        })
        .collect();

    let count = preferences.len();
    let ratings: Vec<f64> = preferences
        .iter()
        .filter_map(|p| p.rating.map(f64::from))
        .collect();

    let summary = match (count, ratings.is_empty()) {
        (0, _) => "No matching feedback found.".to_string(),
        (n, true) => format!("Found {} related feedback entries", n),
        (n, false) => format!(
            "Found {} related feedback entries (average rating {:.1}/5)",
            n,
            ratings.iter().sum::<f64>() / ratings.len() as f64
        ),
    };

    let context_block = if preferences.is_empty() {
        String::new()
    } else {
        let mut block = String::from("User preferences from past feedback:");
        for preference in &preferences {
            block.push_str(&format!("\n- {}", excerpt(&preference.content)));
            if let Some(rating) = preference.rating {
                block.push_str(&format!(" (rated {}/5)", rating));
            }
        }
        block
    };

    PreferenceSummary {
        preferences,
        summary,
        context_block,
        count,
    }
}

pub async fn search_feedback(
    state: web::Data<AppState>,
    body: web::Json<SearchRequest>,
) -> AppResult<HttpResponse> {
    let request = validated(body.into_inner())?;
    let collection_id = state
        .providers
        .collections
        .collection_id()
        .ok_or(AppError::NotConfigured("Preferences collection"))?;
    let limit = request.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    let matches = state
        .providers
        .xai
        .search_documents(collection_id, request.query.trim(), limit)
        .await?;

    let shaped = shape_preferences(matches);
    info!(count = shaped.count, limit, "Feedback search completed");

    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": shaped })))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    capability_report(
        "feedback",
        state.providers.collections.is_configured(),
        json!({ "searchConfigured": state.credentials.feedback_search_configured() }),
    )
}
