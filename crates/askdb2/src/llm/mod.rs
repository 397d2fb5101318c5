pub mod ollama;
pub mod prompt;

use anyhow::Result;
use serde::Serialize;

pub use ollama::{GENERATE_TIMEOUT, OllamaClient};
pub use prompt::{PromptInput, build_sql_prompt};

/// Sampling options sent with every generation request. Low temperature and
/// a short output cap keep the model to one short statement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub num_predict: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.9,
            num_predict: 80,
        }
    }
}

/// Text completion: prompt in, raw model text out.
pub trait SqlGenerator {
    fn generate(&self, prompt: &str) -> Result<String>;
}
