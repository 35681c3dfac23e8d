mod config;
mod credentials;
mod dryrun;
mod error;
mod gemini;
mod generator;
mod loading;
mod session;
mod upload;

pub use config::{EngineConfig, DEFAULT_GEMINI_API_BASE, DEFAULT_REQUEST_TIMEOUT_SECONDS};
pub use credentials::{
    indicates_expired_session, CredentialCapability, CredentialGate, CredentialStatus,
    EnvCredentialSource, InteractiveCredentialSource, KeyPrompt, CREDENTIAL_ENV_VARS,
    SESSION_EXPIRED_MESSAGE, SESSION_EXPIRED_SIGNATURE,
};
pub use dryrun::DryrunListingGenerator;
pub use error::{GenerateRejected, GenerationError, UploadError, INVALID_FORMAT_MESSAGE};
pub use gemini::{GeminiListingGenerator, LISTING_INSTRUCTION};
pub use generator::{default_generator_registry, GeneratorRegistry, ListingGenerator, ListingRequest};
pub use loading::{LoadingMessages, LoadingTicker, LOADING_MESSAGES, LOADING_MESSAGE_INTERVAL};
pub use session::{
    ApplicationState, Completion, GenerationTicket, ListingSession, SessionView,
    GENERATION_FAILED_MESSAGE,
};
pub use upload::{sniff_mime, FileSelection};
