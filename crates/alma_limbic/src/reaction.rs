//! Reaction engine: a resilience-gated ReLU over emotional intensity.
//!
//! ```text
//! resilience = clamp((100 - neuroticism) / 100, 0, 1)
//! threshold  = max_threshold * resilience
//! effective  = max(0, raw - threshold)
//! ```
//!
//! Stateless. The same raw input against a more resilient personality can
//! only produce the same or a lower effective intensity.

use alma_core::{InteractionDebug, PersonalityProfile};

/// Threshold reached at full resilience.
pub const DEFAULT_MAX_THRESHOLD: f32 = 30.0;

#[derive(Debug, Clone, Copy)]
pub struct ReactionEngine {
    max_threshold: f32,
}

impl Default for ReactionEngine {
    fn default() -> Self {
        Self {
            max_threshold: DEFAULT_MAX_THRESHOLD,
        }
    }
}

impl ReactionEngine {
    pub fn new(max_threshold: f32) -> Self {
        Self {
            max_threshold: max_threshold.max(0.0),
        }
    }

    /// Resilience as the reaction engine sees it: emotional stability only.
    pub fn resilience(traits: &PersonalityProfile) -> f32 {
        let r = (100.0 - traits.neuroticism) / 100.0;
        if r.is_finite() {
            r.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn calculate(&self, raw: f32, traits: &PersonalityProfile) -> (f32, InteractionDebug) {
        let raw = if raw.is_finite() { raw.max(0.0) } else { 0.0 };
        let resilience = Self::resilience(traits);
        let threshold = self.max_threshold * resilience;
        let effective = (raw - threshold).max(0.0);

        let trace = InteractionDebug {
            input_intensity: raw,
            resilience,
            activation_threshold: threshold,
            effective_intensity: effective,
            is_triggered: effective > 0.0,
        };
        (effective, trace)
    }
}

/// [`ReactionEngine::calculate`] with the default threshold.
pub fn calculate_reaction(raw: f32, traits: &PersonalityProfile) -> (f32, InteractionDebug) {
    ReactionEngine::default().calculate(raw, traits)
}
