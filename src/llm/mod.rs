pub mod client;
pub mod distractors;
pub mod error;
pub mod response;
pub mod secrets;

pub use client::{ensure_client, test_configured_api_key};
pub use distractors::{DistractorSet, GENERATION_TEMPERATURE, OpenAiDistractorSource};
pub use error::GenerationError;
pub use secrets::{clear_api_key, store_api_key};
