//! Emotion analysis: rubric-scored intensity plus a resilience-scaled noise gate.
//!
//! The oracle does the scoring; this module owns the rubric, the lenient
//! parsing of its answer and the gate that decides whether the stimulus is
//! worth reacting to at all.

use alma_core::config::LimbicConfig;
use alma_core::json::parse_lenient;
use alma_core::{Oracle, PersonalityProfile};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;

pub const NEUTRAL_CATEGORY: &str = "NEUTRAL";

const EMOTION_RUBRIC: &str = r#"Eres un módulo de análisis emocional. Evalúa la intensidad emocional del mensaje del usuario.

Escala de intensidad (0-100):
- 0-20: trivial (saludos, charla ligera, logística)
- 21-50: opinión (gustos, quejas menores, comentarios personales)
- 51-80: discusión (desacuerdo, preocupación real, tema personal importante)
- 81-100: severo (crisis, pérdida, abandono, agresión, amenaza)

Categoría: una sola palabra en mayúsculas (ALEGRIA, TRISTEZA, IRA, MIEDO, CELOS, CULPA, NEUTRAL, ...).
Marca "extreme": true solo ante peligro inmediato o autolesión.

Responde SOLO con JSON:
{"intensity": 0, "category": "NEUTRAL", "extreme": false}"#;

/// Result of one analysis after the noise gate ran.
#[derive(Debug, Clone, PartialEq)]
pub struct EmotionReading {
    /// Rubric score as the oracle gave it (clamped to 0-100).
    pub raw_intensity: f32,
    /// Intensity after damping and gating. 0 when gated out.
    pub intensity: f32,
    pub category: String,
    /// True when the gate forced the reading to neutral.
    pub gated: bool,
}

impl EmotionReading {
    /// Reading used when analysis fails: low, neutral, never gated.
    pub fn fallback(config: &LimbicConfig) -> Self {
        Self {
            raw_intensity: config.default_intensity,
            intensity: config.default_intensity,
            category: NEUTRAL_CATEGORY.to_string(),
            gated: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RubricAnswer {
    intensity: f32,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    extreme: bool,
}

pub struct EmotionAnalyzer {
    oracle: Arc<dyn Oracle>,
    config: LimbicConfig,
}

impl EmotionAnalyzer {
    pub fn new(oracle: Arc<dyn Oracle>, config: LimbicConfig) -> Self {
        Self { oracle, config }
    }

    pub fn config(&self) -> &LimbicConfig {
        &self.config
    }

    /// Score `text` for `profile`. Fails on oracle error or unparsable reply;
    /// callers degrade to [`EmotionReading::fallback`].
    pub async fn analyze(&self, profile: &PersonalityProfile, text: &str) -> Result<EmotionReading> {
        let prompt = format!("{}\n\nMensaje del usuario:\n\"\"\"{}\"\"\"", EMOTION_RUBRIC, text);
        let reply = self
            .oracle
            .generate(&prompt)
            .await
            .context("Emotion analysis call failed")?;
        let answer: RubricAnswer =
            parse_lenient(&reply).context("Emotion analysis reply was not valid JSON")?;

        let raw = if answer.intensity.is_finite() {
            answer.intensity.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let category = answer
            .category
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| NEUTRAL_CATEGORY.to_string());
        let extreme = answer.extreme || category.starts_with("EXTREM");

        let (intensity, category, gated) =
            apply_noise_gate(raw, &category, extreme, profile.resilience(), &self.config);

        tracing::debug!(
            "Emotion: raw={:.1} gated={:.1} category={} (gate={})",
            raw,
            intensity,
            category,
            gated
        );

        Ok(EmotionReading {
            raw_intensity: raw,
            intensity,
            category,
            gated,
        })
    }
}

/// Damp `intensity` by resilience and drop it to neutral if it stays under the
/// resilience-scaled floor. Extreme readings pass regardless of the floor.
///
/// Returns `(effective, category, gated)`.
pub fn apply_noise_gate(
    intensity: f32,
    category: &str,
    extreme: bool,
    resilience: f32,
    config: &LimbicConfig,
) -> (f32, String, bool) {
    let effective = intensity * (1.0 - resilience * config.damping);
    let floor = config.noise_floor + resilience * config.noise_resilience_span;
    if effective < floor && !extreme {
        return (0.0, NEUTRAL_CATEGORY.to_string(), true);
    }
    (effective.clamp(0.0, 100.0), category.to_string(), false)
}
