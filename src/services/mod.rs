//! Service layer modules for external integrations.

pub mod model_client;

pub use model_client::{ModelClient, ModelError, PromptPart, TextModel};
