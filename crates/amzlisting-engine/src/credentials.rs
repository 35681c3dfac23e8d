use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::config::non_empty_env;

/// Substring the generation service returns once a selected key is no longer valid.
///
/// Matching on message text is a weak heuristic: other expiry shapes are not detected.
pub const SESSION_EXPIRED_SIGNATURE: &str = "Requested entity was not found";
pub const SESSION_EXPIRED_MESSAGE: &str = "API key session expired. Please re-connect your key.";

/// Checked in order by [`EnvCredentialSource`].
pub const CREDENTIAL_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

pub fn indicates_expired_session(message: &str) -> bool {
    message.contains(SESSION_EXPIRED_SIGNATURE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialStatus {
    #[default]
    Unknown,
    Present,
    Absent,
}

impl CredentialStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CredentialStatus::Unknown => "unknown",
            CredentialStatus::Present => "present",
            CredentialStatus::Absent => "absent",
        }
    }

    /// Only a known-absent key disables generation; `Unknown` lets the attempt proceed.
    pub fn blocks_generation(self) -> bool {
        self == CredentialStatus::Absent
    }
}

/// Where the opaque API key comes from. Selected once at startup.
pub trait CredentialCapability {
    fn name(&self) -> &str;
    fn has_selected_key(&mut self) -> Result<bool>;
    /// Interactive flow letting the user supply a key.
    fn open_select_key(&mut self) -> Result<()>;
    fn api_key(&self) -> Option<String>;
    /// Drops a key the service rejected. Sources that cannot forget keep it.
    fn forget_key(&mut self) {}
}

/// Process-wide configuration fallback: the first non-empty variable wins.
#[derive(Debug, Clone)]
pub struct EnvCredentialSource {
    vars: Vec<String>,
}

impl EnvCredentialSource {
    pub fn new() -> Self {
        Self::with_vars(CREDENTIAL_ENV_VARS)
    }

    pub fn with_vars(vars: &[&str]) -> Self {
        Self {
            vars: vars.iter().map(|var| (*var).to_string()).collect(),
        }
    }
}

impl Default for EnvCredentialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialCapability for EnvCredentialSource {
    fn name(&self) -> &str {
        "environment"
    }

    fn has_selected_key(&mut self) -> Result<bool> {
        Ok(self.api_key().is_some())
    }

    fn open_select_key(&mut self) -> Result<()> {
        bail!(
            "interactive key selection is unavailable; set one of {}",
            self.vars.join(", ")
        )
    }

    fn api_key(&self) -> Option<String> {
        self.vars.iter().find_map(|var| non_empty_env(var))
    }
}

/// Asks the user for a key. `Ok(None)` means the prompt was dismissed.
pub trait KeyPrompt {
    fn prompt_for_key(&mut self) -> Result<Option<String>>;
}

impl<F> KeyPrompt for F
where
    F: FnMut() -> Result<Option<String>>,
{
    fn prompt_for_key(&mut self) -> Result<Option<String>> {
        self()
    }
}

/// Host-backed capability: the key is entered interactively and held in memory only.
pub struct InteractiveCredentialSource<P> {
    prompt: P,
    selected: Option<String>,
}

impl<P: KeyPrompt> InteractiveCredentialSource<P> {
    pub fn new(prompt: P) -> Self {
        Self {
            prompt,
            selected: None,
        }
    }

    pub fn with_initial_key(mut self, key: Option<String>) -> Self {
        self.selected = key
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }
}

impl<P: KeyPrompt> CredentialCapability for InteractiveCredentialSource<P> {
    fn name(&self) -> &str {
        "interactive"
    }

    fn has_selected_key(&mut self) -> Result<bool> {
        Ok(self.selected.is_some())
    }

    fn open_select_key(&mut self) -> Result<()> {
        let entered = self
            .prompt
            .prompt_for_key()?
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let Some(key) = entered else {
            bail!("no API key entered");
        };
        self.selected = Some(key);
        Ok(())
    }

    fn api_key(&self) -> Option<String> {
        self.selected.clone()
    }

    fn forget_key(&mut self) {
        self.selected = None;
    }
}

/// Decides whether generation may be attempted and how the user supplies a key.
///
/// Once a key is marked expired the gate stays `Absent` until a connect succeeds.
pub struct CredentialGate {
    capability: Box<dyn CredentialCapability>,
    status: CredentialStatus,
    expired: bool,
}

impl CredentialGate {
    pub fn new(capability: Box<dyn CredentialCapability>) -> Self {
        Self {
            capability,
            status: CredentialStatus::Unknown,
            expired: false,
        }
    }

    pub fn from_capability(capability: impl CredentialCapability + 'static) -> Self {
        Self::new(Box::new(capability))
    }

    pub fn source_name(&self) -> &str {
        self.capability.name()
    }

    pub fn status(&self) -> CredentialStatus {
        self.status
    }

    pub fn check_available(&mut self) -> CredentialStatus {
        if self.expired {
            self.status = CredentialStatus::Absent;
            return self.status;
        }
        self.status = match self.capability.has_selected_key() {
            Ok(true) => CredentialStatus::Present,
            Ok(false) => CredentialStatus::Absent,
            Err(err) => {
                warn!(source = self.capability.name(), "error checking for API key: {err:#}");
                CredentialStatus::Absent
            }
        };
        self.status
    }

    /// One attempt, no retry. Success is assumed to mean a usable key.
    pub fn request_connect(&mut self) -> bool {
        match self.capability.open_select_key() {
            Ok(()) => {
                info!(source = self.capability.name(), "API key connected");
                self.expired = false;
                self.status = CredentialStatus::Present;
                true
            }
            Err(err) => {
                warn!(source = self.capability.name(), "error opening key selection: {err:#}");
                false
            }
        }
    }

    pub fn mark_expired(&mut self) {
        self.capability.forget_key();
        self.expired = true;
        self.status = CredentialStatus::Absent;
    }

    pub fn api_key(&self) -> Option<String> {
        self.capability.api_key()
    }
}
