use super::registry::{ModelRegistry, ModelSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: ModelSpec,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_else(|| ModelRegistry::new(None)),
        }
    }

    /// Resolves `requested` for `capability`, optionally restricted to one provider.
    ///
    /// An unknown or incapable request falls back to the first capable model and says why.
    pub fn select(
        &self,
        requested: Option<&str>,
        capability: &str,
        provider: Option<&str>,
    ) -> Result<ModelSelection, String> {
        let matches_provider =
            |model: &ModelSpec| provider.map(|name| model.provider == name).unwrap_or(true);

        let (fallback_reason, requested_text) = match requested.map(str::trim) {
            Some(requested_value) if !requested_value.is_empty() => {
                if let Some(model) = self
                    .registry
                    .ensure(requested_value, capability)
                    .filter(|model| matches_provider(model))
                {
                    return Ok(ModelSelection {
                        model,
                        requested: Some(requested_value.to_string()),
                        fallback_reason: None,
                    });
                }
                (
                    Some(format!(
                        "Requested model '{requested_value}' unavailable for capability '{capability}'."
                    )),
                    Some(requested_value.to_string()),
                )
            }
            _ => (Some("No model specified; using default.".to_string()), None),
        };

        let Some(model) = self
            .registry
            .by_capability(capability)
            .into_iter()
            .find(|model| matches_provider(model))
        else {
            return Err(format!(
                "No models available for capability '{capability}'."
            ));
        };
        Ok(ModelSelection {
            model,
            requested: requested_text,
            fallback_reason,
        })
    }
}
