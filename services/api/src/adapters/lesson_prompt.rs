//! services/api/src/adapters/lesson_prompt.rs
//!
//! The lesson-generation instruction, its output schema, and parsing of the
//! model's JSON reply. Shared by every text-generation adapter.

use lesson_core::domain::{GeneratedSections, SearchParams};
use lesson_core::ports::{PortError, PortResult};
use serde_json::{json, Value};

const PROMPT_TEMPLATE: &str = r#"Siz 20 yillik tajribaga ega bo'lgan tajribali O'qituvchi AI Ta'lim Yordamchisisiz. Quyidagi ma'lumotlar asosida dars materiallarini tayyorlang:
  Fan: {subject}
  Mavzu: {topic}
  Sinf: {grade}
  Til: {language}
  Dars turi: {lesson_type}

  Quyidagilarni o'z ichiga olsin:
  A) Taqdimot rejasi (8-10 slaydda, sarlavha va asosiy matn). Har bir slayd uchun "imagePrompt" maydonida ingliz tilida o'sha slaydga mos vizual rasm uchun qisqa ta'rif bering.
  B) 10-15 ta test savollari.
  C) 10 ta Savol-javob materiallari.
  D) 1 ta krossvord.
  E) 1 ta mantiqiy jumboq.
  F) 1 ta o'quvchilar uchun mini-o'yin g'oyasi.

  Javobni FAQAT JSON formatida qaytaring."#;

pub fn build_prompt(params: &SearchParams) -> String {
    PROMPT_TEMPLATE
        .replace("{subject}", &params.subject)
        .replace("{topic}", &params.topic)
        .replace("{grade}", &params.grade)
        .replace("{language}", &params.language)
        .replace("{lesson_type}", &params.lesson_type)
}

/// Type names differ between Gemini (`OBJECT`) and JSON Schema (`object`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaDialect {
    Gemini,
    JsonSchema,
}

impl SchemaDialect {
    fn ty(self, name: &str) -> Value {
        match self {
            SchemaDialect::Gemini => Value::String(name.to_uppercase()),
            SchemaDialect::JsonSchema => Value::String(name.to_string()),
        }
    }
}

/// The object shape the model must return: six required sections.
pub fn response_schema(dialect: SchemaDialect) -> Value {
    let string = || json!({ "type": dialect.ty("string") });
    let object = |properties: Value, required: &[&str]| {
        json!({ "type": dialect.ty("object"), "properties": properties, "required": required })
    };
    let array = |items: Value| json!({ "type": dialect.ty("array"), "items": items });

    object(
        json!({
            "presentation": array(object(
                json!({ "title": string(), "content": string(), "imagePrompt": string() }),
                &["title", "content", "imagePrompt"],
            )),
            "tests": array(object(
                json!({
                    "type": string(),
                    "question": string(),
                    "options": array(string()),
                    "answer": string()
                }),
                &["type", "question", "answer"],
            )),
            "qa": array(object(
                json!({ "question": string(), "answer": string() }),
                &["question", "answer"],
            )),
            "crossword": array(object(
                json!({ "clue": string(), "answer": string() }),
                &["clue", "answer"],
            )),
            "logicPuzzle": object(
                json!({ "puzzle": string(), "answer": string() }),
                &["puzzle", "answer"],
            ),
            "miniGame": object(
                json!({ "title": string(), "description": string(), "rules": array(string()) }),
                &["title", "description", "rules"],
            )
        }),
        &["presentation", "tests", "qa", "crossword", "logicPuzzle", "miniGame"],
    )
}

/// Parses the model's reply. A stray markdown code fence is tolerated; any
/// other deviation from the schema fails the request.
pub fn parse_sections(raw: &str) -> PortResult<GeneratedSections> {
    let trimmed = strip_code_fence(raw.trim());
    serde_json::from_str(trimmed)
        .map_err(|e| PortError::GenerationFailed(format!("Model returned invalid JSON: {}", e)))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
