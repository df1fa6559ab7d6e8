pub mod mock;
pub mod openai;

pub use mock::ScriptedOracle;
pub use openai::OpenAiOracle;

use alma_core::config::LlmConfig;
use alma_core::Oracle;
use anyhow::Result;
use std::sync::Arc;

/// Build the oracle named by `config.provider`.
pub fn create_oracle(config: &LlmConfig) -> Result<Arc<dyn Oracle>> {
    match config.provider.trim().to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAiOracle::openai(config)?)),
        "ollama" => Ok(Arc::new(OpenAiOracle::ollama(config)?)),
        "mock" => {
            tracing::warn!("Using the scripted mock oracle; replies are canned");
            Ok(Arc::new(ScriptedOracle::demo()))
        }
        other => anyhow::bail!("Unknown LLM provider: {}", other),
    }
}
