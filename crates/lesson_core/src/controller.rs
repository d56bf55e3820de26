//! crates/lesson_core/src/controller.rs
//!
//! The application state machine: `Initializing -> Unauthenticated -> Authenticated`.
//!
//! The controller owns the session, the in-memory history and the current
//! presentation. Persistence only happens through explicit calls into the
//! credential and history stores.
//!
//! Model calls run outside the controller: `begin_*` hands out the work and
//! `finish_*` installs the outcome, so callers can release their lock while
//! the model is busy.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::backfill::BackfillReport;
use crate::credentials::{AuthError, CredentialStore};
use crate::domain::{ContentBundle, SearchParams, Slide, User};
use crate::history::HistoryStore;
use crate::ports::{KeyValueStore, PortError, PortResult};
use crate::presentation::{Presentation, PresentationError};

pub const RATE_LIMIT_MESSAGE: &str = "AI xizmatining so'rovlar limiti tugadi. Iltimos, 1 daqiqa kutib qayta urinib ko'ring yoki boshqa mavzu tanlang.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Material yaratishda xatolik yuz berdi. Internet aloqasini tekshiring va qaytadan urinib ko'ring.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    Unauthenticated,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Create,
    History,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("Still starting up")]
    Initializing,
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Already signed in")]
    AlreadyAuthenticated,
    #[error("Subject and topic are required")]
    MissingParams,
    #[error("A newer request or another session replaced this generation")]
    Superseded,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Port(#[from] PortError),
    #[error("No content has been generated or selected")]
    NoContent,
    #[error("No history entry with id {0}")]
    UnknownHistoryEntry(String),
    #[error(transparent)]
    Presentation(#[from] PresentationError),
}

/// One line per history entry, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub id: String,
    pub subject: String,
    pub topic: String,
    pub timestamp: i64,
    pub slide_count: usize,
}

impl From<&ContentBundle> for HistorySummary {
    fn from(bundle: &ContentBundle) -> Self {
        Self {
            id: bundle.id.clone(),
            subject: bundle.subject.clone(),
            topic: bundle.topic.clone(),
            timestamp: bundle.timestamp,
            slide_count: bundle.presentation.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub phase: Phase,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
    pub view: View,
    pub history_count: usize,
    pub current_bundle_id: Option<String>,
}

/// Issued by `begin_generation`. A result is only accepted for the user who
/// asked for it, and only from the most recent request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    user_id: String,
    sequence: u64,
}

impl GenerationTicket {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Work handed out for an image backfill run that happens outside the controller.
#[derive(Debug, Clone)]
pub struct BackfillJob {
    pub user_id: String,
    pub bundle_id: String,
    pub subject: String,
    pub slides: Vec<Slide>,
}

pub struct Controller {
    credentials: CredentialStore,
    history_store: HistoryStore,
    phase: Phase,
    user: Option<User>,
    loading: bool,
    error: Option<String>,
    view: View,
    history: Vec<ContentBundle>,
    current: Option<Presentation>,
    generation_sequence: u64,
}

impl Controller {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            credentials: CredentialStore::new(store.clone()),
            history_store: HistoryStore::new(store),
            phase: Phase::Initializing,
            user: None,
            loading: false,
            error: None,
            view: View::Create,
            history: Vec::new(),
            current: None,
            generation_sequence: 0,
        }
    }

    //=====================================================================================
    // Startup
    //=====================================================================================

    /// Called once the splash interval is over. Leaves `Initializing`. Never fails: an unusable stored session is discarded.
    pub fn complete_initialization(&mut self) {
        if self.phase != Phase::Initializing {
            return;
        }
        match self.credentials.restore_session() {
            Some(user) => {
                info!(user_id = %user.id, "Restored stored session");
                self.sign_in(user);
            }
            None => self.phase = Phase::Unauthenticated,
        }
    }

    //=====================================================================================
    // Authentication
    //=====================================================================================

    /// Registers a new account and signs straight into it.
    pub fn register(&mut self, full_name: &str, email: &str, password: &str) -> Result<User, ControllerError> {
        self.require_unauthenticated()?;
        let user = self.credentials.register(full_name, email, password)?;
        self.persist_and_sign_in(user.clone())?;
        Ok(user)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<User, ControllerError> {
        self.require_unauthenticated()?;
        let user = self.credentials.authenticate(email, password)?;
        self.persist_and_sign_in(user.clone())?;
        info!(user_id = %user.id, "User logged in");
        Ok(user)
    }

    /// Signs out and forgets everything held in memory for the user.
    pub fn logout(&mut self) -> Result<(), ControllerError> {
        self.require_authenticated()?;
        self.credentials.clear_session()?;
        if let Some(user) = self.user.take() {
            info!(user_id = %user.id, "User logged out");
        }
        self.phase = Phase::Unauthenticated;
        self.current = None;
        self.history.clear();
        self.view = View::Create;
        self.loading = false;
        self.error = None;
        // Results of requests still in flight must not land in the next session.
        self.generation_sequence += 1;
        Ok(())
    }

    fn persist_and_sign_in(&mut self, user: User) -> Result<(), ControllerError> {
        self.credentials.save_session(&user)?;
        self.sign_in(user);
        Ok(())
    }

    fn sign_in(&mut self, user: User) {
        self.history = self.history_store.load(&user.id);
        self.user = Some(user);
        self.phase = Phase::Authenticated;
    }

    //=====================================================================================
    // Generation
    //=====================================================================================

    /// Raises the loading flag, clears any previous error and issues the
    /// ticket the result must be handed back with.
    pub fn begin_generation(&mut self, params: &SearchParams) -> Result<GenerationTicket, ControllerError> {
        self.require_authenticated()?;
        let user_id = self.user.as_ref().map(|u| u.id.clone()).ok_or(ControllerError::NotAuthenticated)?;
        if !params.is_complete() {
            return Err(ControllerError::MissingParams);
        }
        info!(subject = %params.subject, topic = %params.topic, grade = %params.grade, "Generating lesson materials");
        self.loading = true;
        self.error = None;
        self.generation_sequence += 1;
        Ok(GenerationTicket {
            user_id,
            sequence: self.generation_sequence,
        })
    }

    /// Stores a successful bundle as current content and in history, or
    /// records the user-facing error.
    ///
    /// A ticket from another session, or one overtaken by a newer request, is
    /// rejected with `Superseded` and leaves history, content and the error
    /// banner untouched. Only the newest ticket clears the loading flag.
    pub fn finish_generation(
        &mut self,
        ticket: GenerationTicket,
        result: PortResult<ContentBundle>,
    ) -> Result<ContentBundle, ControllerError> {
        let is_latest = ticket.sequence == self.generation_sequence;
        if is_latest {
            self.loading = false;
        }
        let same_user = self.user.as_ref().is_some_and(|u| u.id == ticket.user_id);
        if !is_latest || !same_user {
            info!(
                user_id = %ticket.user_id,
                sequence = ticket.sequence,
                "Discarding result of a superseded generation"
            );
            return Err(ControllerError::Superseded);
        }
        let user_id = ticket.user_id;

        match result {
            Ok(bundle) => {
                info!(bundle_id = %bundle.id, slides = bundle.presentation.len(), "Lesson materials generated");
                self.current = Some(Presentation::new(bundle.clone()));
                match self.history_store.append(&user_id, &bundle) {
                    Ok(saved) => self.history = saved,
                    Err(e) => warn!(user_id, "Could not save history: {}", e),
                }
                Ok(bundle)
            }
            Err(PortError::QuotaExceeded) => {
                warn!("Generation rejected: quota exceeded");
                self.error = Some(RATE_LIMIT_MESSAGE.to_string());
                Err(PortError::QuotaExceeded.into())
            }
            Err(e) => {
                error!("Generation failed: {}", e);
                self.error = Some(GENERIC_FAILURE_MESSAGE.to_string());
                let e = match e {
                    PortError::GenerationFailed(_) => e,
                    other => PortError::GenerationFailed(other.to_string()),
                };
                Err(e.into())
            }
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    //=====================================================================================
    // Slide images
    //=====================================================================================

    /// Marks the current presentation as loading images and hands out its
    /// slides. Returns `None` when nothing needs an image.
    pub fn begin_backfill(&mut self) -> Result<Option<BackfillJob>, ControllerError> {
        self.require_authenticated()?;
        let presentation = self.current.as_mut().ok_or(ControllerError::NoContent)?;
        if !presentation.needs_images() {
            return Ok(None);
        }
        presentation.begin_image_backfill();
        let bundle = presentation.bundle();
        let user_id = self.user.as_ref().map(|u| u.id.clone()).unwrap_or_default();
        Ok(Some(BackfillJob {
            user_id,
            bundle_id: bundle.id.clone(),
            subject: bundle.subject.clone(),
            slides: bundle.presentation.clone(),
        }))
    }

    /// Installs backfilled slides, unless the user has moved on to other
    /// content or signed out in the meantime.
    pub fn finish_backfill(&mut self, job: BackfillJob, report: &BackfillReport) {
        let same_user = self.user.as_ref().is_some_and(|u| u.id == job.user_id);
        match self.current.as_mut() {
            Some(presentation) if same_user && presentation.bundle().id == job.bundle_id => {
                presentation.finish_image_backfill(job.slides, report);
            }
            _ => info!(bundle_id = %job.bundle_id, "Discarding images for content no longer shown"),
        }
    }

    //=====================================================================================
    // Views and history
    //=====================================================================================

    pub fn set_view(&mut self, view: View) -> Result<(), ControllerError> {
        self.require_authenticated()?;
        self.view = view;
        Ok(())
    }

    /// Makes a history entry the current content and switches to `View::Create`.
    pub fn select_from_history(&mut self, bundle_id: &str) -> Result<ContentBundle, ControllerError> {
        self.require_authenticated()?;
        let bundle = self
            .history
            .iter()
            .find(|b| b.id == bundle_id)
            .cloned()
            .ok_or_else(|| ControllerError::UnknownHistoryEntry(bundle_id.to_string()))?;
        self.current = Some(Presentation::new(bundle.clone()));
        self.view = View::Create;
        Ok(bundle)
    }

    /// Removes all stored history, but only when `confirmed`. Returns whether
    /// anything was cleared.
    pub fn clear_history(&mut self, confirmed: bool) -> Result<bool, ControllerError> {
        self.require_authenticated()?;
        if !confirmed {
            return Ok(false);
        }
        if let Some(user) = &self.user {
            self.history_store.clear(&user.id)?;
            info!(user_id = %user.id, "History cleared");
        }
        self.history.clear();
        Ok(true)
    }

    pub fn history_summaries(&self) -> Vec<HistorySummary> {
        self.history.iter().map(HistorySummary::from).collect()
    }

    //=====================================================================================
    // Accessors
    //=====================================================================================

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn history(&self) -> &[ContentBundle] {
        &self.history
    }

    pub fn current(&self) -> Option<&Presentation> {
        self.current.as_ref()
    }

    /// The current presentation, for quiz and Q&A interaction.
    pub fn current_mut(&mut self) -> Result<&mut Presentation, ControllerError> {
        self.require_authenticated()?;
        self.current.as_mut().ok_or(ControllerError::NoContent)
    }

    pub fn status(&self) -> Status {
        Status {
            phase: self.phase,
            user: self.user.clone(),
            loading: self.loading,
            error: self.error.clone(),
            view: self.view,
            history_count: self.history.len(),
            current_bundle_id: self.current.as_ref().map(|p| p.bundle().id.clone()),
        }
    }

    pub fn require_authenticated(&self) -> Result<(), ControllerError> {
        match self.phase {
            Phase::Authenticated => Ok(()),
            Phase::Initializing => Err(ControllerError::Initializing),
            Phase::Unauthenticated => Err(ControllerError::NotAuthenticated),
        }
    }

    fn require_unauthenticated(&self) -> Result<(), ControllerError> {
        match self.phase {
            Phase::Unauthenticated => Ok(()),
            Phase::Initializing => Err(ControllerError::Initializing),
            Phase::Authenticated => Err(ControllerError::AlreadyAuthenticated),
        }
    }
}
