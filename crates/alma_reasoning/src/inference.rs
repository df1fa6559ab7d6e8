//! Trait inference: post-turn oracle call nudging the Big-Five profile.
//!
//! Runs detached after the reply has been produced. Each trait moves at most
//! [`MAX_NUDGE`] points per turn, so personality drifts instead of jumping.
//! Failures are logged and otherwise ignored.

use alma_core::json::parse_lenient;
use alma_core::{Oracle, PersonalityProfile, Trait, TraitKind, TraitStore};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const MAX_NUDGE: f32 = 5.0;

const INFERENCE_PROMPT: &str = r#"Eres un módulo de ajuste de personalidad. A partir del último intercambio, decide si la personalidad del personaje debería moverse un poco.

Rasgos (0-100): openness, conscientiousness, extraversion, agreeableness, neuroticism.
Cada ajuste va de -5 a 5. Omite los rasgos que no cambian. La mayoría de los intercambios no cambian nada.

Responde SOLO con JSON:
{"nudges": {"neuroticism": 1}, "reason": "motivo breve"}"#;

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    nudges: HashMap<String, serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
}

/// Parse the oracle's answer into clamped per-trait nudges. Unknown trait
/// names and non-numeric values are skipped.
pub fn parse_nudges(reply: &str) -> Result<Vec<(TraitKind, f32)>> {
    let parsed: InferenceResponse =
        parse_lenient(reply).context("Trait inference reply was not valid JSON")?;
    if let Some(reason) = parsed.reason.as_deref().filter(|r| !r.is_empty()) {
        tracing::debug!("Trait inference reason: {}", reason);
    }

    let mut nudges: Vec<(TraitKind, f32)> = parsed
        .nudges
        .iter()
        .filter_map(|(name, value)| {
            let kind = TraitKind::parse_str(name)?;
            let delta = match value {
                serde_json::Value::Number(n) => n.as_f64()? as f32,
                serde_json::Value::String(s) => s.trim().trim_start_matches('+').parse().ok()?,
                _ => return None,
            };
            delta
                .is_finite()
                .then(|| (kind, delta.clamp(-MAX_NUDGE, MAX_NUDGE)))
        })
        .filter(|(_, d)| *d != 0.0)
        .collect();
    nudges.sort_by_key(|(k, _)| TraitKind::ALL.iter().position(|x| x == k));
    Ok(nudges)
}

pub struct TraitInference {
    oracle: Arc<dyn Oracle>,
    traits: Arc<dyn TraitStore>,
    timeout: Option<Duration>,
}

impl TraitInference {
    pub fn new(oracle: Arc<dyn Oracle>, traits: Arc<dyn TraitStore>) -> Self {
        Self {
            oracle,
            traits,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ask for nudges and upsert the changed traits. Returns what was written.
    pub async fn run(
        &self,
        profile_id: Uuid,
        current: PersonalityProfile,
        utterance: &str,
        reply: &str,
    ) -> Result<Vec<Trait>> {
        let prompt = format!(
            "{}\n\nPersonalidad actual: {}\n\nUsuario:\n\"\"\"{}\"\"\"\n\nPersonaje:\n\"\"\"{}\"\"\"",
            INFERENCE_PROMPT,
            TraitKind::ALL
                .iter()
                .map(|k| format!("{}={:.0}", k.as_str(), current.get(*k)))
                .collect::<Vec<_>>()
                .join(", "),
            utterance,
            reply
        );

        let call = self.oracle.generate(&prompt);
        let answer = match self.timeout {
            Some(t) => tokio::time::timeout(t, call)
                .await
                .context("Trait inference timed out")?,
            None => call.await,
        }
        .context("Trait inference call failed")?;

        let mut written = Vec::new();
        for (kind, delta) in parse_nudges(&answer)? {
            let before = current.get(kind);
            let after = (before + delta).clamp(0.0, 100.0);
            if after == before {
                continue;
            }
            let t = Trait::new(kind, after);
            self.traits
                .upsert(profile_id, t.clone())
                .await
                .with_context(|| format!("Failed to upsert trait {}", kind.as_str()))?;
            tracing::info!("Trait {} {:.0} -> {:.0}", kind.as_str(), before, after);
            written.push(t);
        }
        Ok(written)
    }

    /// Fire-and-forget [`run`](Self::run). Errors only reach the log.
    pub fn spawn(
        self: Arc<Self>,
        profile_id: Uuid,
        current: PersonalityProfile,
        utterance: String,
        reply: String,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run(profile_id, current, &utterance, &reply).await {
                tracing::warn!("Trait inference failed (non-fatal): {:#}", e);
            }
        })
    }
}
