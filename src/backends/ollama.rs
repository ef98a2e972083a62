use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::http::{check_status, encode_image};
use crate::Result;
use crate::backend::VisionBackend;
use crate::retry::{AttemptError, RetryPolicy, run_with_backoff};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llava-llama3";

/// Connection and sampling settings for an Ollama server.
#[derive(Debug, Clone, PartialEq)]
pub struct OllamaConfig {
    /// Base URL of the server, without the `/api/...` path.
    pub endpoint: String,

    /// A vision-capable model tag.
    pub model: String,

    pub temperature: f32,

    /// How long the server keeps the model loaded after a request (Ollama duration string).
    pub keep_alive: String,

    /// Per-request timeout. Vision models on CPU can take minutes per photo.
    pub timeout: Duration,

    pub retry: RetryPolicy,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            temperature: 0.2,
            keep_alive: "1s".to_owned(),
            timeout: Duration::from_secs(300),
            retry: RetryPolicy::default(),
        }
    }
}

/// Queries `POST /api/generate` with the photo attached as a base64 image.
pub struct OllamaBackend {
    config: OllamaConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
    keep_alive: &'a str,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'))
    }

    fn request<'a>(&'a self, prompt: &'a str, image_b64: String) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.model,
            prompt,
            images: vec![image_b64],
            stream: false,
            keep_alive: &self.config.keep_alive,
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        }
    }
}

impl VisionBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    fn query(&self, prompt: &str, image_path: &Path) -> Result<String> {
        let body = self.request(prompt, encode_image(image_path)?);
        let url = self.generate_url();

        debug!(model = %self.config.model, image = %image_path.display(), "querying ollama");

        let generated = run_with_backoff(&self.config.retry, || {
            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .map_err(AttemptError::fatal)?;
            check_status(resp)?
                .json::<GenerateResponse>()
                .map_err(AttemptError::fatal)
        })?;

        Ok(generated.response)
    }
}
