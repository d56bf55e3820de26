//! services/api/src/adapters/gemini_text.rs
//!
//! This module contains the adapter for lesson generation on Gemini.
//! It implements the `ContentGenerationService` port from the `core` crate.

use async_trait::async_trait;
use lesson_core::domain::{ContentBundle, SearchParams};
use lesson_core::ports::{ContentGenerationService, PortResult};
use serde_json::json;
use tracing::info;

use crate::adapters::gemini::GeminiClient;
use crate::adapters::lesson_prompt::{build_prompt, parse_sections, response_schema, SchemaDialect};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentGenerationService` with a schema-constrained Gemini call.
#[derive(Clone)]
pub struct GeminiContentAdapter {
    client: GeminiClient,
    model: String,
}

impl GeminiContentAdapter {
    /// Creates a new `GeminiContentAdapter`.
    pub fn new(client: GeminiClient, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `ContentGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentGenerationService for GeminiContentAdapter {
    async fn generate_content(&self, params: &SearchParams) -> PortResult<ContentBundle> {
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(params) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(SchemaDialect::Gemini)
            }
        });

        let response = self.client.generate_content(&self.model, &body).await?;
        let sections = parse_sections(&response.text())?;
        let bundle = ContentBundle::assemble(params, sections);

        info!(model = %self.model, bundle_id = %bundle.id, "Gemini lesson generated");
        Ok(bundle)
    }
}
