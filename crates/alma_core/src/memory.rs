use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An emotionally weighted episode the companion remembers.
///
/// Append-only: once created it is never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeMemory {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub content: String,
    pub embedding: Vec<f32>,
    /// 1-10
    pub importance: u8,
    /// 1-10
    pub emotional_weight: u8,
    /// 0-100
    pub emotional_intensity: f32,
    pub emotion_category: String,
    pub happened_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Unvalidated memory fields. [`NewMemory::into_memory`] is the only way the
/// pipeline produces a [`NarrativeMemory`], so the range invariants hold for
/// everything it writes.
#[derive(Debug, Clone, Default)]
pub struct NewMemory {
    pub profile_id: Uuid,
    pub content: String,
    pub embedding: Vec<f32>,
    pub importance: i32,
    pub emotional_weight: i32,
    /// `None` falls back to `emotional_weight * 10`.
    pub emotional_intensity: Option<f32>,
    pub emotion_category: String,
    pub happened_at: Option<DateTime<Utc>>,
}

impl NewMemory {
    pub fn into_memory(self) -> NarrativeMemory {
        let importance = self.importance.clamp(1, 10) as u8;
        let emotional_weight = self.emotional_weight.clamp(1, 10) as u8;
        let intensity = match self.emotional_intensity {
            Some(v) if v.is_finite() => v,
            Some(_) => 0.0,
            None => emotional_weight as f32 * 10.0,
        }
        .clamp(0.0, 100.0);
        let category = if self.emotion_category.trim().is_empty() {
            "NEUTRAL".to_string()
        } else {
            self.emotion_category.trim().to_uppercase()
        };
        let now = Utc::now();

        NarrativeMemory {
            id: Uuid::new_v4(),
            profile_id: self.profile_id,
            content: self.content,
            embedding: self.embedding,
            importance,
            emotional_weight,
            emotional_intensity: intensity,
            emotion_category: category,
            happened_at: self.happened_at.unwrap_or(now),
            created_at: now,
        }
    }
}

/// A search hit: the memory plus its cosine similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMemory {
    pub memory: NarrativeMemory,
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_defaults_to_weight_times_ten() {
        let m = NewMemory {
            emotional_weight: 7,
            importance: 5,
            ..Default::default()
        }
        .into_memory();
        assert_eq!(m.emotional_intensity, 70.0);
        assert_eq!(m.emotion_category, "NEUTRAL");
    }

    #[test]
    fn test_ranges_are_clamped() {
        let m = NewMemory {
            importance: 42,
            emotional_weight: -3,
            emotional_intensity: Some(250.0),
            emotion_category: "ira".into(),
            ..Default::default()
        }
        .into_memory();
        assert_eq!(m.importance, 10);
        assert_eq!(m.emotional_weight, 1);
        assert_eq!(m.emotional_intensity, 100.0);
        assert_eq!(m.emotion_category, "IRA");
    }

    #[test]
    fn test_nan_intensity_becomes_zero() {
        let m = NewMemory {
            importance: 5,
            emotional_weight: 5,
            emotional_intensity: Some(f32::NAN),
            ..Default::default()
        }
        .into_memory();
        assert_eq!(m.emotional_intensity, 0.0);
    }
}
