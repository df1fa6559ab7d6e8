use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::relationship::RelationshipVector;

/// Value assumed for a Big-Five trait the store has no row for.
pub const NEUTRAL_TRAIT: f32 = 50.0;

/// The companion persona owned by a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    /// Free-form identity text written by the user ("who you are").
    pub identity: String,
    /// Bond toward the user.
    pub relationship: RelationshipVector,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: &str, name: &str, identity: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            identity: identity.to_string(),
            relationship: RelationshipVector::default(),
            created_at: Utc::now(),
        }
    }
}

/// One persisted trait row, as the trait store hands it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trait {
    pub name: String,
    pub value: f32,
}

impl Trait {
    pub fn new(kind: TraitKind, value: f32) -> Self {
        Self {
            name: kind.as_str().to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitKind {
    Openness,
    Conscientiousness,
    Extraversion,
    Agreeableness,
    Neuroticism,
}

impl TraitKind {
    pub const ALL: [TraitKind; 5] = [
        TraitKind::Openness,
        TraitKind::Conscientiousness,
        TraitKind::Extraversion,
        TraitKind::Agreeableness,
        TraitKind::Neuroticism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TraitKind::Openness => "openness",
            TraitKind::Conscientiousness => "conscientiousness",
            TraitKind::Extraversion => "extraversion",
            TraitKind::Agreeableness => "agreeableness",
            TraitKind::Neuroticism => "neuroticism",
        }
    }

    /// Accepts the English names and the Spanish ones older rows were written with.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openness" | "apertura" => Some(TraitKind::Openness),
            "conscientiousness" | "responsabilidad" | "escrupulosidad" => {
                Some(TraitKind::Conscientiousness)
            }
            "extraversion" | "extroversion" | "extraversión" | "extroversión" => {
                Some(TraitKind::Extraversion)
            }
            "agreeableness" | "amabilidad" => Some(TraitKind::Agreeableness),
            "neuroticism" | "neuroticismo" => Some(TraitKind::Neuroticism),
            _ => None,
        }
    }
}

/// Big-Five personality on a 0-100 scale.
///
/// Immutable for the duration of a turn; only the background trait-inference
/// job writes new values, and only through the trait store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    pub openness: f32,
    pub conscientiousness: f32,
    pub extraversion: f32,
    pub agreeableness: f32,
    pub neuroticism: f32,
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self::uniform(NEUTRAL_TRAIT)
    }
}

impl PersonalityProfile {
    pub fn uniform(value: f32) -> Self {
        Self {
            openness: value,
            conscientiousness: value,
            extraversion: value,
            agreeableness: value,
            neuroticism: value,
        }
    }

    /// Build from store rows. Unknown names are ignored, missing traits stay
    /// at [`NEUTRAL_TRAIT`]. Later rows win over earlier ones.
    pub fn from_traits(traits: &[Trait]) -> Self {
        let mut profile = Self::default();
        for t in traits {
            match TraitKind::parse_str(&t.name) {
                Some(kind) => profile.set(kind, t.value),
                None => tracing::debug!("Ignoring unknown trait '{}'", t.name),
            }
        }
        profile
    }

    pub fn get(&self, kind: TraitKind) -> f32 {
        match kind {
            TraitKind::Openness => self.openness,
            TraitKind::Conscientiousness => self.conscientiousness,
            TraitKind::Extraversion => self.extraversion,
            TraitKind::Agreeableness => self.agreeableness,
            TraitKind::Neuroticism => self.neuroticism,
        }
    }

    pub fn set(&mut self, kind: TraitKind, value: f32) {
        match kind {
            TraitKind::Openness => self.openness = value,
            TraitKind::Conscientiousness => self.conscientiousness = value,
            TraitKind::Extraversion => self.extraversion = value,
            TraitKind::Agreeableness => self.agreeableness = value,
            TraitKind::Neuroticism => self.neuroticism = value,
        }
    }

    /// How much emotional stimulus this personality absorbs before reacting.
    ///
    /// Weighted blend of emotional stability, conscientiousness and
    /// extraversion, scaled to [0, 1] for in-range traits. Inputs are not
    /// clamped: out-of-range traits produce out-of-range resilience.
    pub fn resilience(&self) -> f32 {
        (0.6 * (100.0 - self.neuroticism)
            + 0.25 * self.conscientiousness
            + 0.15 * self.extraversion)
            / 100.0
    }

    pub fn to_traits(&self) -> Vec<Trait> {
        TraitKind::ALL
            .iter()
            .map(|k| Trait::new(*k, self.get(*k)))
            .collect()
    }
}
