use async_openai::error::OpenAIError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("OpenAI request failed: {0}")]
    Api(#[from] OpenAIError),
    #[error("model response is not the expected JSON shape: {0}")]
    MalformedResponse(String),
}
