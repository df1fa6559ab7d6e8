use serde::{Deserialize, Serialize};

/// Per-turn record of how raw emotional intensity turned into a reaction.
///
/// Produced once per turn and handed back to the caller. Nothing in the
/// pipeline reads it back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionDebug {
    pub input_intensity: f32,
    pub resilience: f32,
    pub activation_threshold: f32,
    pub effective_intensity: f32,
    pub is_triggered: bool,
}
