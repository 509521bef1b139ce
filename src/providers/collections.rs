//! xAI management API client for collection document uploads.
//!
//! Feedback records are stored as small text documents in a single collection. The
//! management API accepts a multipart upload; searchable metadata travels in the
//! `fields` part as a JSON object of strings.

use super::{endpoint, read_json, ProviderError};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

const SERVICE: &str = "Preferences collection";

/// A text document destined for the collection.
#[derive(Debug, Clone)]
pub struct CollectionDocument {
    pub name: String,
    pub content: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct CollectionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection_id: Option<String>,
}

impl CollectionsClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        collection_id: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
            api_key,
            collection_id,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.collection_id.is_some()
    }

    pub fn collection_id(&self) -> Option<&str> {
        self.collection_id.as_deref()
    }

    /// Upload a document and return the provider's file id, when it reports one.
    pub async fn upload_document(
        &self,
        document: CollectionDocument,
    ) -> Result<Option<String>, ProviderError> {
        let (api_key, collection_id) = match (&self.api_key, &self.collection_id) {
            (Some(key), Some(id)) => (key, id),
            _ => return Err(ProviderError::NotConfigured(SERVICE)),
        };

        let fields = serde_json::to_string(&document.fields)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let file_name = format!("{}.txt", document.name);
        let data = Part::bytes(document.content.into_bytes())
            .file_name(file_name)
            .mime_str("text/plain")?;

        let form = Form::new()
            .text("name", document.name.clone())
            .text("content_type", "text/plain")
            .text("fields", fields)
            .part("data", data);

        debug!(collection_id = %collection_id, name = %document.name, "Uploading collection document");

        let response = self
            .http
            .post(endpoint(
                &self.base_url,
                &format!("collections/{}/documents", collection_id),
            ))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let body: Value = read_json(response).await?;
        Ok(extract_file_id(&body))
    }
}

/// The upload response has carried the id both at the top level and nested under
/// `file_metadata`; accept either.
fn extract_file_id(body: &Value) -> Option<String> {
    body.get("file_id")
        .or_else(|| body.get("file_metadata").and_then(|m| m.get("file_id")))
        .and_then(Value::as_str)
        .map(str::to_string)
}
