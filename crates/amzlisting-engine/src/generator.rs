use std::collections::BTreeMap;

use amzlisting_contracts::image::UploadedImage;
use amzlisting_contracts::listing::GeneratedListing;

use crate::config::EngineConfig;
use crate::dryrun::DryrunListingGenerator;
use crate::error::GenerationError;
use crate::gemini::GeminiListingGenerator;

#[derive(Debug, Clone, Copy)]
pub struct ListingRequest<'a> {
    pub image: &'a UploadedImage,
    pub model: &'a str,
    pub api_key: Option<&'a str>,
}

/// Turns one uploaded image into one listing with exactly one upstream call.
pub trait ListingGenerator {
    fn name(&self) -> &str;
    fn requires_credential(&self) -> bool {
        true
    }
    fn generate(&self, request: &ListingRequest<'_>) -> Result<GeneratedListing, GenerationError>;
}

#[derive(Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, Box<dyn ListingGenerator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<G: ListingGenerator + 'static>(&mut self, generator: G) {
        self.generators
            .insert(generator.name().to_string(), Box::new(generator));
    }

    pub fn get(&self, name: &str) -> Option<&dyn ListingGenerator> {
        self.generators.get(name).map(|generator| generator.as_ref())
    }

    pub fn names(&self) -> Vec<String> {
        self.generators.keys().cloned().collect()
    }
}

pub fn default_generator_registry(config: &EngineConfig) -> GeneratorRegistry {
    let mut registry = GeneratorRegistry::new();
    registry.register(GeminiListingGenerator::from_config(config));
    registry.register(DryrunListingGenerator);
    registry
}
