use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use scrim_capture::Frame;
use serde::{Deserialize, Serialize};

use crate::{LanguageCode, ProviderMetadata, TranslateError, Translation, Translator};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const SUPPORTED_MODELS: [&str; 2] = ["gemini-2.5-flash", "gemini-2.5-flash-lite"];

const LANGUAGES: &[(&str, &str)] = &[
    ("ko", "Korean"),
    ("en", "English"),
    ("ja", "Japanese"),
    ("zh", "Chinese"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("ru", "Russian"),
    ("ar", "Arabic"),
    ("pt", "Portuguese"),
];

#[derive(Clone)]
pub struct GeminiTranslator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    target_language: LanguageCode,
}

impl GeminiTranslator {
    pub fn new(api_key: String) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: SUPPORTED_MODELS[0].to_string(),
            target_language: "ko".to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Only the models in [`SUPPORTED_MODELS`] are accepted
    pub fn set_model(&mut self, model: &str) -> Result<(), TranslateError> {
        if !SUPPORTED_MODELS.contains(&model) {
            return Err(TranslateError::UnsupportedModel(model.to_string()));
        }
        self.model = model.to_string();
        Ok(())
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub fn set_target_language(&mut self, language: &str) {
        if !LANGUAGES.iter().any(|(code, _)| *code == language) {
            tracing::warn!("target language {} is not in the known list", language);
        }
        self.target_language = language.to_string();
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn prompt(&self) -> String {
        let language = LANGUAGES
            .iter()
            .find(|(code, _)| *code == self.target_language)
            .map(|(_, name)| *name)
            .unwrap_or(self.target_language.as_str());
        format!(
            "Translate all text in this image into {language}. Ignore UI elements and window \
             titles and translate only the actual content text. Return only the translation."
        )
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, TranslateError> {
        if self.api_key.is_empty() {
            return Err(TranslateError::AuthenticationError);
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == 429 {
            return Err(TranslateError::RateLimitExceeded);
        }
        if status == 401 || status == 403 {
            return Err(TranslateError::AuthenticationError);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::ApiError(format!("HTTP {status}: {body}")));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| TranslateError::ApiError(format!("Failed to parse response: {}", e)))?;
        body.text()
    }
}

#[async_trait]
impl Translator for GeminiTranslator {
    async fn translate(&self, image: &Frame) -> Result<Translation, TranslateError> {
        let frame = image.clone();
        let png = tokio::task::spawn_blocking(move || frame.to_png())
            .await
            .map_err(|e| TranslateError::Encode(e.to_string()))?
            .map_err(|e| TranslateError::Encode(e.to_string()))?;

        tracing::debug!(
            "sending {}x{} frame ({} bytes png) to {}",
            image.width(),
            image.height(),
            png.len(),
            self.model
        );

        let request = GenerateRequest::with_image(self.prompt(), &png);
        let text = self.generate(&request).await?;

        Ok(Translation {
            text: text.trim().to_string(),
            to: self.target_language.clone(),
            provider: "gemini".to_string(),
            model: self.model.clone(),
        })
    }

    async fn test_connection(&self) -> bool {
        match self.generate(&GenerateRequest::text("Hello")).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("Gemini connection test failed: {}", e);
                false
            }
        }
    }

    fn supported_languages(&self) -> Vec<(LanguageCode, String)> {
        LANGUAGES
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect()
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "Gemini".to_string(),
            model: self.model.clone(),
            requires_api_key: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

impl GenerateRequest {
    fn text(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: prompt.to_string(),
                }],
            }],
        }
    }

    fn with_image(prompt: String, png: &[u8]) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type: "image/png".to_string(),
                            data: STANDARD.encode(png),
                        },
                    },
                ],
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    /// Part kinds this client does not use
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, joined
    fn text(self) -> Result<String, TranslateError> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| match part {
                        Part::Text { text } => Some(text),
                        Part::InlineData { .. } | Part::Other(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            Err(TranslateError::EmptyResponse)
        } else {
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn translator() -> GeminiTranslator {
        GeminiTranslator::new("key".to_string()).unwrap()
    }

    #[test]
    fn request_carries_prompt_and_inline_png() {
        let request = GenerateRequest::with_image("translate".to_string(), &[1, 2, 3]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "parts": [
                        { "text": "translate" },
                        { "inlineData": { "mimeType": "image/png", "data": "AQID" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn response_text_parts_are_joined() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hel" }, { "text": "lo" }], "role": "model" },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.text().unwrap(), "Hello");
    }

    #[test]
    fn response_without_text_is_empty() {
        for body in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] }),
        ] {
            let response: GenerateResponse = serde_json::from_value(body).unwrap();
            assert!(matches!(response.text(), Err(TranslateError::EmptyResponse)));
        }
    }

    #[test]
    fn only_supported_models_are_accepted() {
        let mut t = translator();
        assert_eq!(t.model(), "gemini-2.5-flash");
        t.set_model("gemini-2.5-flash-lite").unwrap();
        assert!(t.endpoint().ends_with("/models/gemini-2.5-flash-lite:generateContent"));

        assert!(matches!(
            t.set_model("gemini-1.0-pro"),
            Err(TranslateError::UnsupportedModel(_))
        ));
        assert_eq!(t.model(), "gemini-2.5-flash-lite");
    }

    #[test]
    fn prompt_names_target_language() {
        let mut t = translator();
        assert!(t.prompt().contains("Korean"));
        t.set_target_language("ja");
        assert!(t.prompt().contains("Japanese"));
        t.set_target_language("xx");
        assert!(t.prompt().contains("into xx."));
    }

    #[test]
    fn base_url_is_normalized() {
        let t = translator().with_base_url("http://localhost:8080/v1/");
        assert_eq!(t.endpoint(), "http://localhost:8080/v1/models/gemini-2.5-flash:generateContent");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let t = GeminiTranslator::new(String::new()).unwrap();
        let frame = Frame::solid(4, 4, [0, 0, 0, 255]).unwrap();
        assert!(matches!(
            t.translate(&frame).await,
            Err(TranslateError::AuthenticationError)
        ));
        assert!(!t.test_connection().await);
    }
}
