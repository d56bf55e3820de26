pub mod file_store;
pub mod gemini;
pub mod gemini_image;
pub mod gemini_text;
pub mod lesson_prompt;
pub mod openai_text;

pub use file_store::FileStore;
pub use gemini::GeminiClient;
pub use gemini_image::GeminiImageAdapter;
pub use gemini_text::GeminiContentAdapter;
pub use openai_text::OpenAiContentAdapter;
