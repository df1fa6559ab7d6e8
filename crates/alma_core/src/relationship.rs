use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trust / intimacy / respect toward one counterpart, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationshipVector {
    pub trust: f32,
    pub intimacy: f32,
    pub respect: f32,
}

impl Default for RelationshipVector {
    fn default() -> Self {
        Self {
            trust: 50.0,
            intimacy: 30.0,
            respect: 50.0,
        }
    }
}

impl RelationshipVector {
    pub fn new(trust: f32, intimacy: f32, respect: f32) -> Self {
        Self {
            trust,
            intimacy,
            respect,
        }
    }

    /// Same vector with every component forced into [0, 100].
    /// Non-finite components collapse to 0.
    pub fn clamped(&self) -> Self {
        fn c(v: f32) -> f32 {
            if v.is_finite() {
                v.clamp(0.0, 100.0)
            } else {
                0.0
            }
        }
        Self {
            trust: c(self.trust),
            intimacy: c(self.intimacy),
            respect: c(self.respect),
        }
    }
}

/// Per-turn change proposed by the oracle's structured reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDelta {
    pub trust: f32,
    pub intimacy: f32,
    pub respect: f32,
}

impl RelationshipDelta {
    pub fn is_zero(&self) -> bool {
        self.trust == 0.0 && self.intimacy == 0.0 && self.respect == 0.0
    }

    /// Apply to `base`, limiting each component's step to `max_step` and the
    /// result to the 0-100 range. This is the only validation the core does on
    /// oracle-proposed deltas.
    pub fn apply(&self, base: &RelationshipVector, max_step: f32) -> RelationshipVector {
        let step = |d: f32| {
            if d.is_finite() {
                d.clamp(-max_step, max_step)
            } else {
                0.0
            }
        };
        RelationshipVector {
            trust: base.trust + step(self.trust),
            intimacy: base.intimacy + step(self.intimacy),
            respect: base.respect + step(self.respect),
        }
        .clamped()
    }
}

/// A person the companion knows about (family, friends, exes, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    pub relationship: RelationshipVector,
    pub created_at: DateTime<Utc>,
}

impl Character {
    pub fn new(profile_id: Uuid, name: &str, relationship: RelationshipVector) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id,
            name: name.to_string(),
            relationship,
            created_at: Utc::now(),
        }
    }
}
