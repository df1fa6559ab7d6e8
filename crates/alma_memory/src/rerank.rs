//! Reranking judge: a second oracle opinion on borderline intense memories.

use alma_core::json::parse_lenient;
use alma_core::text::truncate_chars;
use alma_core::{NarrativeMemory, Oracle};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const JUDGE_PROMPT: &str = r#"Eres un juez de relevancia de recuerdos. Decide si el recuerdo guarda relación emocional real con el mensaje actual del usuario, no solo parecido de palabras.

Responde SOLO con JSON estricto:
{"use": true, "reason": "motivo breve"}"#;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JudgeVerdict {
    #[serde(rename = "use")]
    pub use_memory: bool,
    #[serde(default)]
    pub reason: String,
}

pub struct RerankJudge {
    oracle: Arc<dyn Oracle>,
    timeout: Option<Duration>,
}

impl RerankJudge {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ask whether `memory` belongs in the context for `utterance`.
    /// Errors on oracle failure or a reply without the verdict object.
    pub async fn judge(&self, utterance: &str, memory: &NarrativeMemory) -> Result<JudgeVerdict> {
        let prompt = format!(
            "{}\n\nMensaje actual:\n\"\"\"{}\"\"\"\n\nRecuerdo (emoción {}, intensidad {:.0}):\n\"\"\"{}\"\"\"",
            JUDGE_PROMPT,
            utterance,
            memory.emotion_category,
            memory.emotional_intensity,
            truncate_chars(&memory.content, 600),
        );

        let call = self.oracle.generate(&prompt);
        let reply = match self.timeout {
            Some(t) => tokio::time::timeout(t, call)
                .await
                .context("Rerank judge timed out")?,
            None => call.await,
        }
        .context("Rerank judge call failed")?;

        let verdict: JudgeVerdict =
            parse_lenient(&reply).context("Rerank judge reply had no verdict")?;
        tracing::debug!(
            "Judge on memory {}: use={} ({})",
            memory.id,
            verdict.use_memory,
            verdict.reason
        );
        Ok(verdict)
    }
}
