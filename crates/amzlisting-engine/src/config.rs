use std::env;
use std::time::Duration;

use amzlisting_contracts::models::{ModelSelection, ModelSelector, LISTING_CAPABILITY};

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: f64 = 90.0;

const MIN_REQUEST_TIMEOUT_SECONDS: f64 = 15.0;
const MAX_REQUEST_TIMEOUT_SECONDS: f64 = 300.0;

/// Runtime settings resolved from the environment, then overridden by CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub provider: String,
    pub model: Option<String>,
    pub api_base: String,
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_SECONDS),
        }
    }
}

impl EngineConfig {
    /// Reads `GEMINI_API_BASE`, `AMZLISTING_MODEL` and `AMZLISTING_REQUEST_TIMEOUT`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            provider: defaults.provider,
            model: non_empty_env("AMZLISTING_MODEL"),
            api_base: non_empty_env("GEMINI_API_BASE")
                .map(|value| normalize_api_base(&value))
                .unwrap_or(defaults.api_base),
            request_timeout: Duration::from_secs_f64(parse_timeout_seconds(
                non_empty_env("AMZLISTING_REQUEST_TIMEOUT").as_deref(),
            )),
        }
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        if let Some(provider) = provider.filter(|value| !value.trim().is_empty()) {
            self.provider = provider.trim().to_ascii_lowercase();
        }
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model.filter(|value| !value.trim().is_empty()) {
            self.model = Some(model.trim().to_string());
        }
        self
    }

    pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
        if let Some(api_base) = api_base.filter(|value| !value.trim().is_empty()) {
            self.api_base = normalize_api_base(&api_base);
        }
        self
    }

    /// Picks the model for the configured provider, falling back to its default.
    pub fn resolve_model(&self) -> Result<ModelSelection, String> {
        ModelSelector::new(None).select(
            self.model.as_deref(),
            LISTING_CAPABILITY,
            Some(self.provider.as_str()),
        )
    }
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn normalize_api_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_timeout_seconds(raw: Option<&str>) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS)
        .clamp(MIN_REQUEST_TIMEOUT_SECONDS, MAX_REQUEST_TIMEOUT_SECONDS)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{parse_timeout_seconds, EngineConfig, DEFAULT_REQUEST_TIMEOUT_SECONDS};

    #[test]
    fn timeout_is_clamped() {
        assert_eq!(parse_timeout_seconds(None), DEFAULT_REQUEST_TIMEOUT_SECONDS);
        assert_eq!(parse_timeout_seconds(Some("5")), 15.0);
        assert_eq!(parse_timeout_seconds(Some("120")), 120.0);
        assert_eq!(parse_timeout_seconds(Some("9000")), 300.0);
        assert_eq!(parse_timeout_seconds(Some("soon")), DEFAULT_REQUEST_TIMEOUT_SECONDS);
    }

    #[test]
    fn flag_overrides_normalize_values() {
        let config = EngineConfig::default()
            .with_provider(Some(" DryRun ".to_string()))
            .with_model(Some("  ".to_string()))
            .with_api_base(Some("http://127.0.0.1:9999/v1beta/".to_string()));
        assert_eq!(config.provider, "dryrun");
        assert_eq!(config.model, None);
        assert_eq!(config.api_base, "http://127.0.0.1:9999/v1beta");
        assert_eq!(config.request_timeout, Duration::from_secs(90));
    }

    #[test]
    fn resolve_model_respects_provider() {
        let gemini = EngineConfig::default().resolve_model().unwrap();
        assert_eq!(gemini.model.name, "gemini-3-flash-preview");

        let dryrun = EngineConfig::default()
            .with_provider(Some("dryrun".to_string()))
            .resolve_model()
            .unwrap();
        assert_eq!(dryrun.model.name, "dryrun-listing-1");
        assert_eq!(dryrun.model.provider, "dryrun");
    }
}
