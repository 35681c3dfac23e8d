use indexmap::IndexMap;

/// Capability required to turn an image into a schema-constrained listing.
pub const LISTING_CAPABILITY: &str = "listing";

pub const DEFAULT_LISTING_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
    pub context_window: Option<u64>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name.trim().trim_start_matches("models/"))
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn by_capability(&self, capability: &str) -> Vec<ModelSpec> {
        self.models
            .values()
            .filter(|model| model.supports(capability))
            .cloned()
            .collect()
    }

    pub fn ensure(&self, name: &str, capability: &str) -> Option<ModelSpec> {
        let model = self.get(name)?;
        if model.supports(capability) {
            return Some(model.clone());
        }
        None
    }
}

// Insertion order is the fallback order: the first listing-capable entry is the default.
fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, provider: &str, capabilities: &[&str], context_window: Option<u64>| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                provider: provider.to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
                context_window,
            },
        );
    };

    insert(
        DEFAULT_LISTING_MODEL,
        "gemini",
        &["text", "vision", LISTING_CAPABILITY],
        Some(1_048_576),
    );
    insert(
        "gemini-3-pro-preview",
        "gemini",
        &["text", "vision", LISTING_CAPABILITY],
        Some(1_048_576),
    );
    insert(
        "gemini-2.5-flash",
        "gemini",
        &["text", "vision", LISTING_CAPABILITY],
        Some(1_048_576),
    );
    insert(
        "gemini-2.5-pro",
        "gemini",
        &["text", "vision", LISTING_CAPABILITY],
        Some(1_048_576),
    );
    insert("gemini-2.5-flash-image", "gemini", &["image"], None);
    insert(
        "dryrun-listing-1",
        "dryrun",
        &["text", LISTING_CAPABILITY],
        Some(8192),
    );

    map
}
