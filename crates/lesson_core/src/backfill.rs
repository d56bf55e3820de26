//! crates/lesson_core/src/backfill.rs
//!
//! Fills in slide illustrations after a bundle has been generated.
//!
//! Slides are processed strictly one after another. The first
//! `QuotaExceeded` ends all calls to the image model for this bundle and every
//! remaining slide without an image gets a placeholder URL instead.

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::Slide;
use crate::ports::{ImageGenerationService, PortError};

const PLACEHOLDER_BASE_URL: &str = "https://picsum.photos/seed";

/// Deterministic placeholder for slide `index`, seeded by its title (or the
/// bundle subject when the title is empty).
pub fn fallback_image_url(seed: &str, index: usize) -> String {
    format!(
        "{}/{}{}/800/450",
        PLACEHOLDER_BASE_URL,
        urlencoding::encode(seed),
        index
    )
}

/// What a backfill run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    /// Calls made to the image model.
    pub requested: usize,
    /// Slides that received a generated image.
    pub generated: usize,
    /// Slides that received a placeholder.
    pub fallback: usize,
    pub quota_exceeded: bool,
}

pub async fn backfill_images(
    slides: &mut [Slide],
    subject: &str,
    images: &dyn ImageGenerationService,
) -> BackfillReport {
    let mut report = BackfillReport::default();

    for index in 0..slides.len() {
        if slides[index].has_image() {
            continue;
        }
        let Some(prompt) = slides[index].image_prompt.clone().filter(|p| !p.trim().is_empty()) else {
            continue;
        };

        report.requested += 1;
        match images.generate_slide_image(&prompt).await {
            Ok(url) if !url.is_empty() => {
                slides[index].image_url = Some(url);
                report.generated += 1;
            }
            Ok(_) => {}
            Err(PortError::QuotaExceeded) => {
                warn!(slide = index + 1, "Image quota exhausted, using placeholders for the rest");
                report.quota_exceeded = true;
                report.fallback = apply_fallbacks(&mut slides[index..], index, subject);
                break;
            }
            Err(e) => {
                warn!(slide = index + 1, "Image generation failed: {}", e);
            }
        }
    }

    info!(
        requested = report.requested,
        generated = report.generated,
        fallback = report.fallback,
        "Slide image backfill finished"
    );
    report
}

/// `offset` is the index of `slides[0]` within the whole presentation.
fn apply_fallbacks(slides: &mut [Slide], offset: usize, subject: &str) -> usize {
    let mut applied = 0;
    for (i, slide) in slides.iter_mut().enumerate() {
        if slide.has_image() {
            continue;
        }
        let seed = if slide.title.trim().is_empty() {
            subject
        } else {
            slide.title.as_str()
        };
        slide.image_url = Some(fallback_image_url(seed, offset + i));
        applied += 1;
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers each call from a script; records the prompts it saw.
    struct ScriptedImages {
        script: Mutex<Vec<PortResult<String>>>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedImages {
        fn new(mut script: Vec<PortResult<String>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ImageGenerationService for ScriptedImages {
        async fn generate_slide_image(&self, prompt: &str) -> PortResult<String> {
            self.seen.lock().unwrap().push(prompt.to_string());
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok("data:image/png;base64,QQ==".to_string()))
        }
    }

    fn slides(n: usize) -> Vec<Slide> {
        (0..n)
            .map(|i| Slide {
                title: format!("Slayd {}", i),
                content: String::new(),
                image_prompt: Some(format!("prompt {}", i)),
                image_url: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn every_prompted_slide_gets_an_image() {
        let images = ScriptedImages::new(vec![]);
        let mut deck = slides(3);
        let report = backfill_images(&mut deck, "Biologiya", &images).await;

        assert_eq!(report.generated, 3);
        assert!(!report.quota_exceeded);
        assert!(deck.iter().all(Slide::has_generated_image));
        assert_eq!(*images.seen.lock().unwrap(), vec!["prompt 0", "prompt 1", "prompt 2"]);
    }

    #[tokio::test]
    async fn quota_at_k_falls_back_for_the_rest_and_stops_calling() {
        let images = ScriptedImages::new(vec![
            Ok("data:image/png;base64,AA==".to_string()),
            Ok("data:image/png;base64,BB==".to_string()),
            Err(PortError::QuotaExceeded),
        ]);
        let mut deck = slides(6);
        let report = backfill_images(&mut deck, "Biologiya", &images).await;

        assert_eq!(images.calls(), 3);
        assert!(report.quota_exceeded);
        assert_eq!(report.generated, 2);
        assert_eq!(report.fallback, 4);
        assert!(deck[..2].iter().all(Slide::has_generated_image));
        for (i, slide) in deck.iter().enumerate().skip(2) {
            let url = slide.image_url.as_deref().unwrap();
            assert!(!url.is_empty());
            assert_eq!(url, fallback_image_url(&format!("Slayd {}", i), i));
        }
    }

    #[tokio::test]
    async fn slides_without_prompts_or_with_images_are_skipped() {
        let images = ScriptedImages::new(vec![]);
        let mut deck = slides(3);
        deck[0].image_prompt = None;
        deck[1].image_url = Some("data:image/png;base64,OLD=".to_string());

        backfill_images(&mut deck, "Tarix", &images).await;

        assert_eq!(images.calls(), 1);
        assert_eq!(deck[0].image_url, None);
        assert_eq!(deck[1].image_url.as_deref(), Some("data:image/png;base64,OLD="));
    }

    #[tokio::test]
    async fn empty_result_and_other_errors_leave_the_slide_imageless() {
        let images = ScriptedImages::new(vec![
            Ok(String::new()),
            Err(PortError::Unexpected("boom".to_string())),
        ]);
        let mut deck = slides(3);
        let report = backfill_images(&mut deck, "Tarix", &images).await;

        assert_eq!(images.calls(), 3);
        assert_eq!(report.generated, 1);
        assert!(deck[0].image_url.is_none() && deck[1].image_url.is_none());
        assert!(deck[2].has_generated_image());
    }

    #[test]
    fn fallback_uses_subject_when_title_is_empty() {
        let mut deck = vec![Slide::default(), Slide::default()];
        apply_fallbacks(&mut deck, 4, "Ona tili");
        assert_eq!(
            deck[1].image_url.as_deref(),
            Some("https://picsum.photos/seed/Ona%20tili5/800/450")
        );
    }
}
