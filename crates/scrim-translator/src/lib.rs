use scrim_capture::Frame;

mod gemini;
mod orchestrator;

pub use gemini::{GeminiTranslator, SUPPORTED_MODELS};
pub use orchestrator::{FailureReason, JobEvent, JobId, JobOutcome, Submission, TranslationOrchestrator};

pub type LanguageCode = String;

/// Image translation provider interface
#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate the text visible in `image` into the configured target language
    async fn translate(&self, image: &Frame) -> Result<Translation, TranslateError>;

    /// Cheap round trip to check credentials and reachability
    async fn test_connection(&self) -> bool;

    /// Target languages as (code, display name)
    fn supported_languages(&self) -> Vec<(LanguageCode, String)>;

    /// Provider metadata
    fn metadata(&self) -> ProviderMetadata;
}

#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub to: LanguageCode,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    pub name: String,
    pub model: String,
    pub requires_api_key: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Response contained no text")]
    EmptyResponse,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Authentication error")]
    AuthenticationError,
}
