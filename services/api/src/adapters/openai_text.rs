//! services/api/src/adapters/openai_text.rs
//!
//! This module contains the adapter for lesson generation on an
//! OpenAI-compatible chat endpoint. It implements the `ContentGenerationService`
//! port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
    },
    Client, error::OpenAIError,
};
use async_trait::async_trait;
use lesson_core::domain::{ContentBundle, SearchParams};
use lesson_core::ports::{ContentGenerationService, PortError, PortResult};
use tracing::info;

use crate::adapters::lesson_prompt::{build_prompt, parse_sections, response_schema, SchemaDialect};

const SYSTEM_INSTRUCTIONS: &str = "You are a lesson-planning assistant for school teachers. Reply with a single JSON object matching the provided schema and nothing else.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiContentAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiContentAdapter {
    /// Creates a new `OpenAiContentAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Rate-limit and exhausted-quota responses become `QuotaExceeded`.
fn map_openai_error(e: OpenAIError) -> PortError {
    let message = e.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("rate limit") || lowered.contains("rate_limit") || lowered.contains("quota") {
        PortError::QuotaExceeded
    } else {
        PortError::GenerationFailed(message)
    }
}

//=========================================================================================
// `ContentGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentGenerationService for OpenAiContentAdapter {
    async fn generate_content(&self, params: &SearchParams) -> PortResult<ContentBundle> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(build_prompt(params))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some("Lesson materials".to_string()),
                    name: "lesson_materials".to_string(),
                    schema: Some(response_schema(SchemaDialect::JsonSchema)),
                    strict: Some(false),
                },
            })
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        // Extract the text content from the first choice in the response.
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::GenerationFailed("Model response contained no text content.".to_string())
            })?;

        let sections = parse_sections(&content)?;
        let bundle = ContentBundle::assemble(params, sections);
        info!(model = %self.model, bundle_id = %bundle.id, "OpenAI-compatible lesson generated");
        Ok(bundle)
    }
}
