//! services/api/src/adapters/gemini_image.rs
//!
//! This module contains the adapter for slide illustrations.
//! It implements the `ImageGenerationService` port from the `core` crate.

use async_trait::async_trait;
use lesson_core::ports::{ImageGenerationService, PortError, PortResult};
use serde_json::json;
use tracing::warn;

use crate::adapters::gemini::GeminiClient;

pub const ASPECT_RATIO: &str = "16:9";

pub fn styled_prompt(prompt: &str) -> String {
    format!(
        "Educational illustration for a classroom presentation slide. Subject: {}. Style: minimalist, bright, 3d render style, professional, high quality.",
        prompt
    )
}

/// An adapter that implements `ImageGenerationService` with a Gemini image model.
#[derive(Clone)]
pub struct GeminiImageAdapter {
    client: GeminiClient,
    model: String,
}

impl GeminiImageAdapter {
    pub fn new(client: GeminiClient, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl ImageGenerationService for GeminiImageAdapter {
    /// Returns the first inline image as a data URI. Everything except a quota
    /// error is logged and reported as "no image".
    async fn generate_slide_image(&self, prompt: &str) -> PortResult<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": styled_prompt(prompt) }] }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": ASPECT_RATIO }
            }
        });

        match self.client.generate_content(&self.model, &body).await {
            Ok(response) => Ok(response
                .first_inline_data()
                .map(|inline| {
                    format!(
                        "data:{};base64,{}",
                        inline.mime_type.as_deref().unwrap_or("image/png"),
                        inline.data
                    )
                })
                .unwrap_or_default()),
            Err(PortError::QuotaExceeded) => Err(PortError::QuotaExceeded),
            Err(e) => {
                warn!("Image generation error: {}", e);
                Ok(String::new())
            }
        }
    }
}
