//! crates/lesson_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! Field names serialize in camelCase so persisted history keeps the same
//! layout the browser client has always read and written.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Users
//=========================================================================================

/// Represents a signed-in user - used throughout the app and persisted as the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

// Only used internally for login/registration - contains sensitive data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCredentials {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
}

impl UserCredentials {
    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
        }
    }
}

//=========================================================================================
// Generation Parameters
//=========================================================================================

/// What to generate material for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub subject: String,
    pub topic: String,
    pub grade: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_lesson_type")]
    pub lesson_type: String,
}

fn default_language() -> String {
    "Uzbek".to_string()
}

fn default_lesson_type() -> String {
    "new topic".to_string()
}

impl SearchParams {
    pub fn new(subject: &str, topic: &str, grade: &str) -> Self {
        Self {
            subject: subject.to_string(),
            topic: topic.to_string(),
            grade: grade.to_string(),
            language: default_language(),
            lesson_type: default_lesson_type(),
        }
    }

    /// Subject and topic are the two fields the prompt cannot do without.
    pub fn is_complete(&self) -> bool {
        !self.subject.trim().is_empty() && !self.topic.trim().is_empty()
    }
}

//=========================================================================================
// Generated Content
//=========================================================================================

/// One presentation slide. `image_url` is the only field that changes after generation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Slide {
    pub fn has_image(&self) -> bool {
        self.image_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    /// True when the image is inline data produced by the image model,
    /// as opposed to a placeholder URL.
    pub fn has_generated_image(&self) -> bool {
        self.image_url
            .as_deref()
            .is_some_and(|url| url.starts_with("data:"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::ShortAnswer => "short_answer",
        }
    }
}

// The model only sees `type` as a free string, so anything unrecognised is
// treated as a short answer rather than failing the whole bundle.
impl From<String> for QuestionKind {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "multiple_choice" => QuestionKind::MultipleChoice,
            "true_false" => QuestionKind::TrueFalse,
            _ => QuestionKind::ShortAnswer,
        }
    }
}

impl From<QuestionKind> for String {
    fn from(kind: QuestionKind) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosswordEntry {
    pub clue: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicPuzzle {
    pub puzzle: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniGame {
    pub title: String,
    pub description: String,
    pub rules: Vec<String>,
}

/// Exactly what the text model returns: the five sections, nothing stamped locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSections {
    pub presentation: Vec<Slide>,
    pub tests: Vec<Question>,
    pub qa: Vec<QaEntry>,
    pub crossword: Vec<CrosswordEntry>,
    pub logic_puzzle: LogicPuzzle,
    pub mini_game: MiniGame,
}

/// The full generated output for one topic request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBundle {
    pub id: String,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
    pub subject: String,
    pub topic: String,
    pub presentation: Vec<Slide>,
    pub tests: Vec<Question>,
    pub qa: Vec<QaEntry>,
    pub crossword: Vec<CrosswordEntry>,
    pub logic_puzzle: LogicPuzzle,
    pub mini_game: MiniGame,
}

impl ContentBundle {
    /// Stamps freshly generated sections with a new id, the current time and
    /// the subject/topic echoed from the request.
    pub fn assemble(params: &SearchParams, sections: GeneratedSections) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            subject: params.subject.clone(),
            topic: params.topic.clone(),
            presentation: sections.presentation,
            tests: sections.tests,
            qa: sections.qa,
            crossword: sections.crossword,
            logic_puzzle: sections.logic_puzzle,
            mini_game: sections.mini_game,
        }
    }

    /// A copy safe to persist: every slide image reference removed.
    pub fn without_images(&self) -> Self {
        let mut stripped = self.clone();
        for slide in &mut stripped.presentation {
            slide.image_url = None;
        }
        stripped
    }
}
