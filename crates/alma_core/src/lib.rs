//! # Alma core
//!
//! Shared data model and the collaborator contracts the turn pipeline talks to.
//! Storage, transport and the generative model all live behind the traits
//! declared here; the pipeline crates only ever see `Arc<dyn ...>` handles.

pub mod config;
pub mod error;
pub mod json;
pub mod memory;
pub mod message;
pub mod persona;
pub mod relationship;
pub mod text;
pub mod trace;

pub use config::AlmaConfig;
pub use error::TurnError;
pub use memory::{NarrativeMemory, NewMemory, ScoredMemory};
pub use message::{Message, Role};
pub use persona::{PersonalityProfile, Profile, Trait, TraitKind};
pub use relationship::{Character, RelationshipDelta, RelationshipVector};
pub use trace::InteractionDebug;

use async_trait::async_trait;
use uuid::Uuid;

/// The backing generative model. Everything the pipeline asks of it goes
/// through these two calls.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Free-form generation for a fully assembled prompt.
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;

    /// Fixed-length embedding for similarity search.
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_by_user_id(&self, user_id: &str) -> anyhow::Result<Option<Profile>>;

    /// Persist the bond toward the user after a turn's deltas were applied.
    async fn update_relationship(
        &self,
        profile_id: Uuid,
        relationship: RelationshipVector,
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait TraitStore: Send + Sync {
    async fn find_by_profile_id(&self, profile_id: Uuid) -> anyhow::Result<Vec<Trait>>;

    async fn upsert(&self, profile_id: Uuid, t: Trait) -> anyhow::Result<()>;
}

#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Nearest-neighbour search. `emotional_weight_factor` scales how much a
    /// memory's emotional intensity may lift it in the ranking (0 = pure
    /// similarity).
    async fn search(
        &self,
        profile_id: Uuid,
        query: &[f32],
        k: usize,
        emotional_weight_factor: f32,
    ) -> anyhow::Result<Vec<ScoredMemory>>;

    async fn create(&self, memory: NarrativeMemory) -> anyhow::Result<NarrativeMemory>;

    /// Most recent memories at or above both cutoffs, newest first.
    async fn get_recent_high_impact(
        &self,
        profile_id: Uuid,
        limit: usize,
        min_importance: u8,
        min_intensity: f32,
    ) -> anyhow::Result<Vec<NarrativeMemory>>;
}

#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn list_by_profile(&self, profile_id: Uuid) -> anyhow::Result<Vec<Character>>;

    async fn create(&self, character: Character) -> anyhow::Result<Character>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Chronological (oldest first). Callers truncate.
    async fn list_by_session(&self, session_id: &str) -> anyhow::Result<Vec<Message>>;

    async fn create(&self, message: Message) -> anyhow::Result<Message>;
}
