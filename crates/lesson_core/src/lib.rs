pub mod backfill;
pub mod controller;
pub mod credentials;
pub mod domain;
pub mod history;
pub mod memory_store;
pub mod ports;
pub mod presentation;

pub use controller::{Controller, ControllerError, Phase, View};
pub use credentials::{AuthError, CredentialStore};
pub use domain::{
    ContentBundle, CrosswordEntry, GeneratedSections, LogicPuzzle, MiniGame, QaEntry, Question,
    QuestionKind, SearchParams, Slide, User, UserCredentials,
};
pub use history::HistoryStore;
pub use memory_store::MemoryStore;
pub use ports::{
    ContentGenerationService, ImageGenerationService, KeyValueStore, PortError, PortResult,
};
pub use presentation::{Presentation, PresentationError};
