use std::fmt;
use std::path::Path;
use std::time::Instant;

use amzlisting_contracts::events::{EventLog, SessionEvent};
use amzlisting_contracts::image::UploadedImage;
use amzlisting_contracts::listing::GeneratedListing;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::credentials::{
    indicates_expired_session, CredentialGate, CredentialStatus, SESSION_EXPIRED_MESSAGE,
};
use crate::error::{GenerateRejected, GenerationError, UploadError};
use crate::generator::{ListingGenerator, ListingRequest};
use crate::upload::FileSelection;

pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate listing. Please try again.";

/// The single source of truth for one session.
///
/// `listing` and `error` never describe the same attempt, and `is_loading` implies no listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationState {
    pub image: Option<UploadedImage>,
    pub listing: Option<GeneratedListing>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionView {
    Idle,
    ImageSelected,
    Generating,
    Listed,
    Errored,
}

impl SessionView {
    pub fn of(state: &ApplicationState) -> Self {
        if state.is_loading {
            SessionView::Generating
        } else if state.listing.is_some() {
            SessionView::Listed
        } else if state.error.is_some() {
            SessionView::Errored
        } else if state.image.is_some() {
            SessionView::ImageSelected
        } else {
            SessionView::Idle
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionView::Idle => "idle",
            SessionView::ImageSelected => "image_selected",
            SessionView::Generating => "generating",
            SessionView::Listed => "listed",
            SessionView::Errored => "errored",
        }
    }
}

impl fmt::Display for SessionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to run one generation away from the session.
///
/// Hand it back through [`ListingSession::complete_generation`]; a ticket issued before the
/// last reset or upload is discarded there.
pub struct GenerationTicket {
    pub generation: u64,
    pub image: UploadedImage,
    pub model: String,
    api_key: Option<String>,
    started: Instant,
}

impl GenerationTicket {
    pub fn request(&self) -> ListingRequest<'_> {
        ListingRequest {
            image: &self.image,
            model: &self.model,
            api_key: self.api_key.as_deref(),
        }
    }
}

impl fmt::Debug for GenerationTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationTicket")
            .field("generation", &self.generation)
            .field("image", &self.image)
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied(SessionView),
    Discarded,
}

pub struct ListingSession {
    state: ApplicationState,
    credentials: CredentialGate,
    events: EventLog,
    model: String,
    generation: u64,
    in_flight: Option<u64>,
    started_generations: u64,
}

impl ListingSession {
    pub fn new(credentials: CredentialGate, events: EventLog, model: impl Into<String>) -> Self {
        Self {
            state: ApplicationState::default(),
            credentials,
            events,
            model: model.into(),
            generation: 0,
            in_flight: None,
            started_generations: 0,
        }
    }

    pub fn state(&self) -> &ApplicationState {
        &self.state
    }

    pub fn view(&self) -> SessionView {
        SessionView::of(&self.state)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
        info!(model = %self.model, "listing model changed");
    }

    pub fn credential_status(&self) -> CredentialStatus {
        self.credentials.status()
    }

    pub fn credential_source(&self) -> &str {
        self.credentials.source_name()
    }

    pub fn check_credentials(&mut self) -> CredentialStatus {
        let status = self.credentials.check_available();
        self.emit_credential_status();
        status
    }

    pub fn connect_credentials(&mut self) -> bool {
        let connected = self.credentials.request_connect();
        self.emit_credential_status();
        connected
    }

    /// A new upload always supersedes prior state, including an in-flight request.
    pub fn select_file(&mut self, selection: FileSelection) -> SessionView {
        let bytes = selection.bytes.len();
        match selection.into_uploaded_image() {
            Ok(image) => {
                let mime_type = image.mime_type.clone();
                self.supersede_in_flight();
                self.state.image = Some(image);
                self.state.listing = None;
                self.state.error = None;
                self.state.is_loading = false;
                debug!(%mime_type, bytes, "image selected");
                self.emit(SessionEvent::ImageSelected {
                    mime_type,
                    bytes,
                    view: self.view().as_str().to_string(),
                });
            }
            Err(err) => {
                let mime_type = match &err {
                    UploadError::NotAnImage { mime_type } => mime_type.clone(),
                    UploadError::Read { .. } => String::new(),
                };
                warn!(%mime_type, "rejected non-image upload");
                self.state.error = Some(err.to_string());
                self.emit(SessionEvent::ImageRejected {
                    mime_type,
                    reason: err.to_string(),
                    view: self.view().as_str().to_string(),
                });
            }
        }
        self.view()
    }

    /// Reads `path` and selects it. A read failure leaves the state untouched.
    pub fn select_path(&mut self, path: &Path) -> Result<SessionView, UploadError> {
        let selection = FileSelection::from_path(path)?;
        Ok(self.select_file(selection))
    }

    pub fn begin_generation(
        &mut self,
        generator: &dyn ListingGenerator,
    ) -> Result<GenerationTicket, GenerateRejected> {
        let Some(image) = self.state.image.clone() else {
            return Err(GenerateRejected::NoImage);
        };
        if self.state.is_loading {
            return Err(GenerateRejected::AlreadyLoading);
        }
        if generator.requires_credential() && self.credentials.status().blocks_generation() {
            return Err(GenerateRejected::CredentialAbsent);
        }

        self.generation += 1;
        self.started_generations += 1;
        self.in_flight = Some(self.generation);
        self.state.is_loading = true;
        self.state.listing = None;
        self.state.error = None;
        info!(
            generation = self.generation,
            generator = generator.name(),
            model = %self.model,
            "generation started"
        );
        self.emit(SessionEvent::GenerationStarted {
            generation: self.generation,
            model: self.model.clone(),
            view: self.view().as_str().to_string(),
        });

        Ok(GenerationTicket {
            generation: self.generation,
            image,
            model: self.model.clone(),
            api_key: self.credentials.api_key(),
            started: Instant::now(),
        })
    }

    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<GeneratedListing, GenerationError>,
    ) -> Completion {
        if self.in_flight != Some(ticket.generation) {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                "discarding stale generation result"
            );
            self.emit(SessionEvent::GenerationDiscarded {
                generation: ticket.generation,
                current: self.generation,
            });
            return Completion::Discarded;
        }

        self.in_flight = None;
        self.state.is_loading = false;
        let latency_ms = ticket.started.elapsed().as_millis() as u64;
        match result {
            Ok(listing) => {
                let search_terms_bytes = listing.search_terms_bytes();
                if !listing.search_terms_within_budget() {
                    warn!(search_terms_bytes, "backend search terms exceed the byte guidance");
                }
                self.state.listing = Some(listing);
                self.state.error = None;
                info!(generation = ticket.generation, latency_ms, "generation succeeded");
                self.emit(SessionEvent::GenerationSucceeded {
                    generation: ticket.generation,
                    latency_ms,
                    search_terms_bytes,
                    view: self.view().as_str().to_string(),
                });
            }
            Err(err) => {
                let (message, credential_expired) = self.failure_message(&err);
                if let GenerationError::Format { detail } = &err {
                    warn!(generation = ticket.generation, %detail, "generation returned an invalid format");
                } else {
                    warn!(generation = ticket.generation, "generation failed: {err}");
                }
                self.state.listing = None;
                self.state.error = Some(message.clone());
                self.emit(SessionEvent::GenerationFailed {
                    generation: ticket.generation,
                    kind: err.kind().to_string(),
                    message,
                    credential_expired,
                    view: self.view().as_str().to_string(),
                });
                if credential_expired {
                    self.emit_credential_status();
                }
            }
        }
        Completion::Applied(self.view())
    }

    /// Runs the whole attempt inline: begin, one generator call, complete.
    pub fn generate(
        &mut self,
        generator: &dyn ListingGenerator,
    ) -> Result<SessionView, GenerateRejected> {
        let ticket = self.begin_generation(generator)?;
        let result = generator.generate(&ticket.request());
        match self.complete_generation(ticket, result) {
            Completion::Applied(view) => Ok(view),
            Completion::Discarded => Ok(self.view()),
        }
    }

    pub fn reset(&mut self) -> SessionView {
        self.supersede_in_flight();
        self.state = ApplicationState::default();
        info!("session reset");
        self.emit(SessionEvent::SessionReset {
            view: self.view().as_str().to_string(),
        });
        self.view()
    }

    pub fn generations(&self) -> u64 {
        self.started_generations
    }

    pub fn finish(&self) {
        self.emit(SessionEvent::SessionFinished {
            generations: self.started_generations,
        });
    }

    fn supersede_in_flight(&mut self) {
        self.generation += 1;
        if let Some(previous) = self.in_flight.take() {
            debug!(previous, current = self.generation, "in-flight generation superseded");
        }
    }

    /// Maps a failure to the user-facing text, downgrading the credential on expiry.
    fn failure_message(&mut self, err: &GenerationError) -> (String, bool) {
        let raw = err.to_string();
        let expired = matches!(err, GenerationError::MissingCredential)
            || indicates_expired_session(&raw);
        if expired {
            self.credentials.mark_expired();
        }
        if indicates_expired_session(&raw) {
            return (SESSION_EXPIRED_MESSAGE.to_string(), true);
        }
        if raw.trim().is_empty() {
            return (GENERATION_FAILED_MESSAGE.to_string(), expired);
        }
        (raw, expired)
    }

    fn emit_credential_status(&self) {
        self.emit(SessionEvent::CredentialStatus {
            status: self.credentials.status().as_str().to_string(),
            source: self.credentials.source_name().to_string(),
        });
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(err) = self.events.emit(&event) {
            warn!("failed to write session event: {err:#}");
        }
    }
}
