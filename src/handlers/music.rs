//! Music generation: prompt in, Strudel code out.
//!
//! `POST /api/music/generate`
//!
//! ```json
//! {
//!   "prompt": "lofi beat with dusty drums",
//!   "context": { "location": "Lisbon", "timezone": "Europe/Lisbon", "localTime": "2025-10-17T21:00:00+01:00" },
//!   "currentCode": "s(\"bd sd\")",
//!   "temperature": 0.7
//! }
//! ```
//!
//! The optional context is folded into the prompt (see [`crate::context`]); if that fails
//! the original prompt is used and the request carries on. Catalog sounds whose tags,
//! category or name match words in the prompt are listed in the system message.

use crate::context::{self, GenerationContext};
use crate::error::AppResult;
use crate::handlers::config::{few_shot_examples, sound_catalog, FewShotExample, SoundEntry};
use crate::health::capability_report;
use crate::providers::xai::{ChatCompletionRequest, ChatMessage, TokenUsage};
use crate::state::AppState;
use crate::validation::{validated, Validate, Validator, MAX_PROMPT_CHARS};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;
use tracing::info;

const MAX_CODE_CHARS: usize = 50_000;
const MAX_HISTORY_MESSAGES: usize = 20;
const MAX_FEW_SHOT_EXAMPLES: usize = 8;
const MAX_CATALOG_SOUNDS: usize = 12;

// Prompt words too common to say anything about the sound
const IGNORED_WORDS: &[&str] = &[
    "and", "the", "with", "for", "some", "that", "this", "make", "give", "want", "song", "music",
];

// Bare language words a single-line fence may open with
const FENCE_LANGUAGES: &[&str] = &["javascript", "js", "strudel", "typescript", "ts"];

const SYSTEM_PROMPT: &str = "You are a music producer who writes Strudel live-coding patterns \
(https://strudel.cc). Reply with a single runnable Strudel program in one ```javascript code \
block. Use only built-in Strudel functions, samples from the default sample banks (e.g. bd, sd, \
hh, cp, gm_* soundfonts) and built-in synths (sine, sawtooth, square, triangle). Combine layers \
with stack(), set the tempo with setcpm(), and keep patterns musical and loopable. After the code \
block you may add one or two sentences describing what you made.";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub context: Option<GenerationContext>,
    /// Existing pattern the user wants changed
    #[serde(default)]
    pub current_code: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub conversation_history: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

impl Validate for GenerateRequest {
    fn validate(&self) -> AppResult<()> {
        let mut v = Validator::new();
        v.str_len("prompt", &self.prompt, 1, MAX_PROMPT_CHARS);
        v.opt_str_len("currentCode", self.current_code.as_deref(), 0, MAX_CODE_CHARS);
        v.opt_str_len("model", self.model.as_deref(), 1, 100);
        v.opt_range("temperature", self.temperature, 0.0, 2.0);
        v.opt_range("maxTokens", self.max_tokens, 1, 8192);
        v.max_items("conversationHistory", &self.conversation_history, MAX_HISTORY_MESSAGES);
        for (i, message) in self.conversation_history.iter().enumerate() {
            v.check(
                message.role == "user" || message.role == "assistant",
                &format!("conversationHistory[{}].role", i),
                "must be \"user\" or \"assistant\"",
            );
            v.str_len(
                &format!("conversationHistory[{}].content", i),
                &message.content,
                1,
                MAX_PROMPT_CHARS,
            );
        }
        v.finish()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<TokenUsage> for Usage {
    fn from(usage: TokenUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub generated_at: String,
    pub duration_ms: u64,
    pub enhanced_prompt: bool,
}

fn prompt_words(prompt: &str) -> Vec<String> {
    prompt
        .split(|c: char| !c.is_alphanumeric() && c != '&')
        .filter(|word| word.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|word| !IGNORED_WORDS.contains(&word.as_str()))
        .collect()
}

fn sound_score(sound: &SoundEntry, words: &[String]) -> usize {
    let category = sound.category.to_lowercase();
    let name = sound.name.to_lowercase();
    words
        .iter()
        .map(|word| {
            let mut score = 0;
            if sound.tags.iter().any(|tag| tag.eq_ignore_ascii_case(word)) {
                score += 3;
            }
            if category == *word || category.split('_').any(|part| part == word.as_str()) {
                score += 2;
            }
            if word.len() >= 3 && name.contains(word.as_str()) {
                score += 1;
            }
            score
        })
        .sum()
}

/// Catalog entries that fit the prompt, best match first, at most [`MAX_CATALOG_SOUNDS`].
///
/// Ties keep catalog order.
pub fn relevant_sounds<'a>(catalog: &'a [SoundEntry], prompt: &str) -> Vec<&'a SoundEntry> {
    let words = prompt_words(prompt);
    if words.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &SoundEntry)> = catalog
        .iter()
        .map(|sound| (sound_score(sound, &words), sound))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .take(MAX_CATALOG_SOUNDS)
        .map(|(_, sound)| sound)
        .collect()
}

fn system_message(sounds: &[&SoundEntry]) -> String {
    if sounds.is_empty() {
        return SYSTEM_PROMPT.to_string();
    }

    let mut text = format!("{}\n\nSounds from the catalog that fit this request:", SYSTEM_PROMPT);
    for sound in sounds {
        text.push_str(&format!("\n- {} ({})", sound.name, sound.category));
        if !sound.description.is_empty() {
            text.push_str(&format!(": {}", sound.description));
        }
        if let Some(example) = sound.example.as_deref() {
            text.push_str(&format!(" Example: {}", example));
        }
    }
    text
}

/// Assemble the chat messages for one generation call.
pub fn build_messages(
    examples: &[FewShotExample],
    sounds: &[&SoundEntry],
    history: &[HistoryMessage],
    current_code: Option<&str>,
    prompt: &str,
) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(system_message(sounds))];

    for example in examples.iter().take(MAX_FEW_SHOT_EXAMPLES) {
        messages.push(ChatMessage::user(&example.prompt));
        messages.push(ChatMessage::assistant(format!("```javascript\n{}\n```", example.code)));
    }

    for message in history {
        messages.push(ChatMessage {
            role: message.role.clone(),
            content: message.content.clone(),
        });
    }

    let user = match current_code.map(str::trim).filter(|code| !code.is_empty()) {
        Some(code) => format!(
            "Here is the current pattern:\n```javascript\n{}\n```\n\nChange it as follows: {}",
            code, prompt
        ),
        None => prompt.to_string(),
    };
    messages.push(ChatMessage::user(user));
    messages
}

/// Drop the language tag from the start of a fenced block.
///
/// On a multi-line block the tag is the whole first line. A single-line block such as
/// ```` ```javascript s("hh*8")``` ```` only loses a known language word.
fn strip_language_tag(block: &str) -> &str {
    if let Some((first, rest)) = block.split_once('\n') {
        let first = first.trim();
        let is_tag = first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'));
        return if is_tag { rest } else { block };
    }

    let trimmed = block.trim_start();
    match trimmed.split_once(char::is_whitespace) {
        Some((word, rest))
            if FENCE_LANGUAGES.iter().any(|lang| lang.eq_ignore_ascii_case(word)) =>
        {
            rest
        }
        _ => block,
    }
}

/// Split a model reply into code and the prose around it.
///
/// Takes the first fenced block; without one, or when the block is empty, the whole reply
/// is treated as code.
pub fn split_code(reply: &str) -> (String, Option<String>) {
    let Some(open) = reply.find("```") else {
        return (reply.trim().to_string(), None);
    };
    let after_fence = &reply[open + 3..];
    let (block, rest) = match after_fence.find("```") {
        Some(close) => (&after_fence[..close], &after_fence[close + 3..]),
        None => (after_fence, ""),
    };

    let code = strip_language_tag(block).trim();
    if code.is_empty() {
        return (reply.trim().to_string(), None);
    }

    let prose = format!("{} {}", reply[..open].trim(), rest.trim());
    let prose = prose.trim();
    let explanation = (!prose.is_empty()).then(|| prose.to_string());
    (code.to_string(), explanation)
}

pub async fn generate(
    state: web::Data<AppState>,
    body: web::Json<GenerateRequest>,
) -> AppResult<HttpResponse> {
    let request = validated(body.into_inner())?;
    let started = Instant::now();

    let enrichment = context::enrich(&request.prompt, request.context.as_ref());
    let config_dir = state.config.config_dir();
    let examples = few_shot_examples(&config_dir).await;
    let catalog = sound_catalog(&config_dir).await;
    let sounds = relevant_sounds(&catalog, &request.prompt);
    let model = request
        .model
        .clone()
        .unwrap_or_else(|| state.config.providers.generation_model.clone());

    let completion_request = ChatCompletionRequest {
        model,
        messages: build_messages(
            &examples,
            &sounds,
            &request.conversation_history,
            request.current_code.as_deref(),
            &enrichment.prompt,
        ),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    };

    let completion = state.providers.xai.chat_completion(&completion_request).await?;
    let (code, explanation) = split_code(&completion.content);
    let duration_ms = started.elapsed().as_millis() as u64;

    info!(
        model = %completion.model,
        enhanced = enrichment.enhanced,
        catalog_sounds = sounds.len(),
        code_chars = code.len(),
        duration_ms,
        "Music generated"
    );

    let result = GenerationResult {
        code,
        explanation,
        model: completion.model,
        usage: completion.usage.map(Usage::from),
        metadata: GenerationMetadata {
            generated_at: chrono::Utc::now().to_rfc3339(),
            duration_ms,
            enhanced_prompt: enrichment.enhanced,
        },
    };

    let mut context_info = json!({
        "enhanced": enrichment.enhanced,
        "summary": enrichment.summary,
    });
    if let Some(error) = enrichment.error {
        context_info["error"] = json!(error);
    }

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": result,
        "context": context_info
    })))
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    capability_report(
        "music",
        state.providers.xai.is_configured(),
        json!({ "model": state.config.providers.generation_model }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::handlers::{configure_routes, test_support};
    use actix_web::{http::StatusCode, test as actix_test, App};
    use serde_json::Value;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "model": "grok-test",
            "choices": [{ "message": { "role": "assistant", "content": content } }],
            "usage": { "prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120 }
        }))
    }

    #[test]
    fn test_split_code_with_fence() {
        let reply = "Here you go:\n```javascript\nsetcpm(30)\ns(\"bd sd\")\n```\nA simple backbeat.";
        let (code, explanation) = split_code(reply);
        assert_eq!(code, "setcpm(30)\ns(\"bd sd\")");
        assert_eq!(explanation.as_deref(), Some("Here you go: A simple backbeat."));
    }

    #[test]
    fn test_split_code_without_fence() {
        let (code, explanation) = split_code("  s(\"hh*8\")  ");
        assert_eq!(code, "s(\"hh*8\")");
        assert!(explanation.is_none());
    }

    #[test]
    fn test_split_code_unclosed_fence() {
        let (code, _) = split_code("```js\nnote(\"c e g\")");
        assert_eq!(code, "note(\"c e g\")");
    }

    #[test]
    fn test_split_code_single_line_fence() {
        let (code, explanation) = split_code("```s(\"bd sd\")```");
        assert_eq!(code, "s(\"bd sd\")");
        assert!(explanation.is_none());

        let (code, explanation) = split_code("Try this: ```javascript s(\"hh*8\")``` enjoy");
        assert_eq!(code, "s(\"hh*8\")");
        assert_eq!(explanation.as_deref(), Some("Try this: enjoy"));
    }

    #[test]
    fn test_split_code_keeps_code_on_first_line() {
        let (code, _) = split_code("```note(\"c e g\")\n  .s(\"piano\")\n```");
        assert_eq!(code, "note(\"c e g\")\n  .s(\"piano\")");
    }

    #[test]
    fn test_split_code_empty_fence_falls_back_to_reply() {
        let (code, explanation) = split_code("```javascript\n```");
        assert_eq!(code, "```javascript\n```");
        assert!(explanation.is_none());
    }

    fn sound(name: &str, category: &str, tags: &[&str]) -> SoundEntry {
        SoundEntry {
            id: name.to_string(),
            name: name.to_string(),
            description: format!("{} sound", name),
            category: category.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            example: Some(format!("s(\"{}\")", name)),
        }
    }

    #[test]
    fn test_relevant_sounds_match_tags_and_category() {
        let catalog = vec![
            sound("bd", "drums", &["kick", "punchy"]),
            sound("gm_epiano1", "keyboards", &["piano", "soul", "rhodes"]),
            sound("gm_acoustic_grand_piano", "keyboards", &["piano", "classical"]),
            sound("sawtooth", "synth", &["bright"]),
        ];

        let picked = relevant_sounds(&catalog, "Soul piano with a kick");
        let names: Vec<&str> = picked.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["gm_epiano1", "gm_acoustic_grand_piano", "bd"]);

        let by_category = relevant_sounds(&catalog, "only drums");
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].name, "bd");

        assert!(relevant_sounds(&catalog, "the and with").is_empty());
    }

    #[test]
    fn test_relevant_sounds_are_capped() {
        let catalog: Vec<SoundEntry> = (0..30)
            .map(|i| sound(&format!("perc{}", i), "percussion", &["tribal"]))
            .collect();
        let picked = relevant_sounds(&catalog, "tribal percussion");
        assert_eq!(picked.len(), MAX_CATALOG_SOUNDS);
        assert_eq!(picked[0].name, "perc0");
    }

    #[test]
    fn test_build_messages_lists_catalog_sounds() {
        let epiano = sound("gm_epiano1", "keyboards", &["piano"]);
        let messages = build_messages(&[], &[&epiano], &[], None, "piano chords");

        assert!(messages[0].content.starts_with(SYSTEM_PROMPT));
        assert!(messages[0]
            .content
            .contains("- gm_epiano1 (keyboards): gm_epiano1 sound Example: s(\"gm_epiano1\")"));
        assert_eq!(messages.len(), 2);

        let plain = build_messages(&[], &[], &[], None, "piano chords");
        assert_eq!(plain[0].content, SYSTEM_PROMPT);
    }

    #[test]
    fn test_build_messages_with_current_code() {
        let examples = vec![FewShotExample {
            prompt: "kick".to_string(),
            code: "s(\"bd*4\")".to_string(),
        }];
        let history = vec![HistoryMessage {
            role: "user".to_string(),
            content: "earlier".to_string(),
        }];
        let messages = build_messages(&examples, &[], &history, Some("s(\"bd\")"), "add hats");

        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "kick");
        assert_eq!(messages[2].role, "assistant");
        assert_eq!(messages[3].content, "earlier");
        let last = messages.last().unwrap();
        assert!(last.content.contains("s(\"bd\")"));
        assert!(last.content.ends_with("add hats"));
    }

    #[test]
    fn test_prompt_length_bounds() {
        let request = |prompt: String| GenerateRequest {
            prompt,
            context: None,
            current_code: None,
            model: None,
            temperature: None,
            max_tokens: None,
            conversation_history: Vec::new(),
        };
        assert!(request(String::new()).validate().is_err());
        assert!(request("x".repeat(MAX_PROMPT_CHARS + 1)).validate().is_err());
        assert!(request("x".repeat(MAX_PROMPT_CHARS)).validate().is_ok());
        assert!(request("x".to_string()).validate().is_ok());
    }

    #[actix_web::test]
    async fn test_invalid_prompt_never_reaches_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(completion("x")).expect(0).mount(&server).await;

        let state = test_support::state_with(&server.uri(), test_support::full_credentials());
        let app = actix_test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        for prompt in [String::new(), "a".repeat(10_001)] {
            let req = actix_test::TestRequest::post()
                .uri("/api/music/generate")
                .set_json(json!({ "prompt": prompt }))
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = actix_test::read_body_json(resp).await;
            assert_eq!(body["details"][0]["field"], "prompt");
        }
    }

    #[actix_web::test]
    async fn test_generate_with_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Listener context"))
            .respond_with(completion("```javascript\ns(\"bd sd\")\n```"))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_support::state_with(&server.uri(), test_support::full_credentials());
        let app = actix_test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/music/generate")
            .set_json(json!({
                "prompt": "late night jazz",
                "context": { "location": "Tokyo", "localTime": "2025-03-01T23:10:00+09:00" }
            }))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["code"], "s(\"bd sd\")");
        assert_eq!(body["data"]["usage"]["totalTokens"], 120);
        assert_eq!(body["context"]["enhanced"], true);
        assert_eq!(body["context"]["summary"], "Saturday night in spring, Tokyo");
    }

    #[actix_web::test]
    async fn test_generate_offers_matching_catalog_sounds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("gm_epiano1 (keyboards)"))
            .respond_with(completion("```javascript\nnote(\"c e g\").s(\"gm_epiano1\")\n```"))
            .expect(1)
            .mount(&server)
            .await;

        let content = tempfile::tempdir().unwrap();
        std::fs::write(
            content.path().join("sound-catalog.json"),
            r#"[
                {"id": "bd", "name": "bd", "category": "drums", "description": "Bass drum", "tags": ["kick"]},
                {"id": "gm_epiano1", "name": "gm_epiano1", "category": "keyboards", "description": "Rhodes-like electric piano", "tags": ["piano", "soul"]}
            ]"#,
        )
        .unwrap();

        let mut config = (*test_support::state_with(&server.uri(), Credentials::default()).config).clone();
        config.content.config_dir = content.path().to_string_lossy().into_owned();
        let state = test_support::state_with_config(config, test_support::full_credentials());
        let app = actix_test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/music/generate")
            .set_json(json!({ "prompt": "mellow soul piano" }))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["code"], "note(\"c e g\").s(\"gm_epiano1\")");

        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let system = sent["messages"][0]["content"].as_str().unwrap();
        assert!(!system.contains("- bd (drums)"));
    }

    #[actix_web::test]
    async fn test_context_failure_still_generates_with_original_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(completion("s(\"hh*8\")"))
            .expect(1)
            .mount(&server)
            .await;

        let state = test_support::state_with(&server.uri(), test_support::full_credentials());
        let app = actix_test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/music/generate")
            .set_json(json!({
                "prompt": "minimal techno",
                "context": { "localTime": "not a time" }
            }))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["code"], "s(\"hh*8\")");
        assert_eq!(body["context"]["enhanced"], false);
        assert!(body["context"]["error"].as_str().unwrap().contains("not a time"));

        let requests = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let last = sent["messages"].as_array().unwrap().last().unwrap().clone();
        assert_eq!(last["content"], "minimal techno");
    }

    #[actix_web::test]
    async fn test_provider_failure_is_500() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let state = test_support::state_with(&server.uri(), test_support::full_credentials());
        let app = actix_test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/music/generate")
            .set_json(json!({ "prompt": "drum and bass" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_unconfigured_generation_is_500() {
        let state = test_support::state_with("http://127.0.0.1:9", Credentials::default());
        let app = actix_test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/music/generate")
            .set_json(json!({ "prompt": "drum and bass" }))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["code"], "not_configured");
    }

    #[actix_web::test]
    async fn test_malformed_json_is_400() {
        let state = test_support::state_with("http://127.0.0.1:9", Credentials::default());
        let app = actix_test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/music/generate")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"prompt\": ")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_health_reflects_credentials() {
        let state = test_support::state_with("http://127.0.0.1:9", Credentials::default());
        let app = actix_test::init_service(App::new().app_data(state).configure(configure_routes)).await;
        let body: Value = actix_test::call_and_read_body_json(
            &app,
            actix_test::TestRequest::get().uri("/api/music/health").to_request(),
        )
        .await;
        assert_eq!(body["service"], "music");
        assert_eq!(body["configured"], false);
    }
}
