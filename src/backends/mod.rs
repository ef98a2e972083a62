//! Built-in HTTP vision backends.

mod http;

/// Local models served by Ollama.
pub mod ollama;

/// OpenAI chat completions.
pub mod openai;
