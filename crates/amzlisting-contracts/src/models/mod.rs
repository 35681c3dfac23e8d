mod registry;
mod selectors;

pub use registry::{ModelRegistry, ModelSpec, DEFAULT_LISTING_MODEL, LISTING_CAPABILITY};
pub use selectors::{ModelSelection, ModelSelector};
