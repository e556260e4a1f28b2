//! Image classification client
//!
//! One blocking chat-completion request per image. The reply is returned as
//! raw text; parsing lives in [`crate::reply`].
//!
//! ```rust
//! use objectscan_core::vision::build_prompt;
//!
//! let prompt = build_prompt(&["Meubels", "Keukengerei"]);
//! assert!(prompt.contains("Meubels, Keukengerei"));
//! assert!(prompt.contains("Categorie:"));
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::error::{ObjectScanError, Result};

/// Reply substituted when the API call fails
pub const DEGRADED_REPLY: &str = "Beschrijving: Analyse mislukt\nScore: 0\nCategorie: Onbekend";

const SYSTEM_PROMPT: &str = "Je bent een behulpzame AI-assistent.";

/// Something that can describe an image given an instruction prompt
pub trait VisionClient {
    fn describe(&self, image: &Path, prompt: &str) -> Result<String>;
}

/// Instruction prompt asking for description, 0-5 score and one category
pub fn build_prompt(categories: &[&str]) -> String {
    format!(
        "Je bent een AI-assistent die objecten categoriseert voor hergebruik. \
         Bekijk de foto, beschrijf kort wat het object is en in welke staat het verkeert \
         (0 = zeer slecht, 5 = nieuwstaat). Kies daarna de BESTE categorie voor dit object \
         uit de volgende lijst (kies er MAAR ÉÉN): {}. \
         Geef het antwoord strikt in dit formaat:\n\n\
         Beschrijving: <korte beschrijving>\n\
         Score: <0-5>\n\
         Categorie: <exact 1 categorie uit de lijst>",
        categories.join(", ")
    )
}

/// Client for an OpenAI-compatible chat-completion endpoint
pub struct ChatCompletionClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: String,
}

impl ChatCompletionClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(api_error)?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key,
        })
    }

    fn request_body(&self, image_data_url: &str, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt },
                        { "type": "image_url", "image_url": { "url": image_data_url } }
                    ]
                }
            ],
            "max_tokens": self.max_tokens
        })
    }
}

impl VisionClient for ChatCompletionClient {
    fn describe(&self, image: &Path, prompt: &str) -> Result<String> {
        let data_url = image_data_url(image)?;
        let body = self.request_body(&data_url, prompt);

        tracing::info!(
            endpoint = %self.endpoint,
            model = %self.model,
            "sending image for analysis"
        );
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(api_error)?;

        let status = response.status();
        let value: Value = response.json().map_err(api_error)?;

        if !status.is_success() {
            return Err(ObjectScanError::Api {
                message: format!("HTTP {}: {}", status.as_u16(), error_message(&value)),
            });
        }

        extract_content(&value)
    }
}

/// Read an image and encode it as a `data:` URL
pub fn image_data_url(image: &Path) -> Result<String> {
    if !image.exists() {
        return Err(ObjectScanError::ImageNotFound {
            path: image.to_path_buf(),
        });
    }
    let bytes = fs::read(image)?;
    Ok(format!("data:{};base64,{}", mime_type(image), STANDARD.encode(bytes)))
}

fn mime_type(image: &Path) -> &'static str {
    let ext = image
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// `choices[0].message.content` of a chat-completion response
pub fn extract_content(value: &Value) -> Result<String> {
    value["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ObjectScanError::Api {
            message: format!("unexpected response: {}", error_message(value)),
        })
}

fn error_message(value: &Value) -> String {
    value["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| {
            let text = value.to_string();
            text.chars().take(200).collect()
        })
}

fn api_error(err: reqwest::Error) -> ObjectScanError {
    ObjectScanError::Api {
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn client() -> ChatCompletionClient {
        let config = ApiConfig {
            key: Some("sk-test".to_string()),
            ..ApiConfig::default()
        };
        ChatCompletionClient::new(&config).unwrap()
    }

    #[test]
    fn test_prompt_lists_categories() {
        let prompt = build_prompt(&["Meubels", "Textiel", "Fietsen"]);
        assert!(prompt.contains("Meubels, Textiel, Fietsen"));
        assert!(prompt.contains("Score: <0-5>"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = client().request_body("data:image/jpeg;base64,AAAA", "Wat is dit?");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 400);
        assert_eq!(body["messages"][0]["role"], "system");
        let content = &body["messages"][1]["content"];
        assert_eq!(content[0]["text"], "Wat is dit?");
        assert_eq!(
            content[1]["image_url"]["url"],
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[test]
    fn test_extract_content() {
        let value = json!({
            "choices": [{ "message": { "role": "assistant", "content": "Score: 4" } }]
        });
        assert_eq!(extract_content(&value).unwrap(), "Score: 4");
    }

    #[test]
    fn test_extract_content_from_error_response() {
        let value = json!({ "error": { "message": "Incorrect API key provided" } });
        let err = extract_content(&value).unwrap_err();
        assert!(err.to_string().contains("Incorrect API key provided"));
    }

    #[test]
    fn test_image_data_url() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("object.JPG");
        fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

        let url = image_data_url(&path).unwrap();
        assert_eq!(url, "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_image_data_url_missing() {
        let err = image_data_url(Path::new("/nonexistent/object.jpg")).unwrap_err();
        assert!(matches!(err, ObjectScanError::ImageNotFound { .. }));
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type(Path::new("a.png")), "image/png");
        assert_eq!(mime_type(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_type(Path::new("noext")), "image/jpeg");
    }
}
