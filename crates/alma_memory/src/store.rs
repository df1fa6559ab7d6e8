//! In-process reference adapters for every store contract.
//!
//! Brute-force cosine search over a `Vec`, good for tests, the CLI and small
//! personal deployments. Nothing here coordinates concurrent turns: two turns
//! for the same profile still read-then-write independently.

use alma_core::{
    Character, CharacterStore, MemoryStore, Message, MessageStore, NarrativeMemory, Profile,
    ProfileStore, RelationshipVector, ScoredMemory, Trait, TraitStore,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::embedding::cosine_similarity;

/// Ranking lift for a memory at full intensity and weight factor 1.
const INTENSITY_BIAS: f32 = 0.2;

#[derive(Default)]
pub struct InMemoryStore {
    profiles: RwLock<HashMap<Uuid, Profile>>,
    traits: RwLock<HashMap<Uuid, Vec<Trait>>>,
    memories: RwLock<Vec<NarrativeMemory>>,
    characters: RwLock<Vec<Character>>,
    messages: RwLock<Vec<Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, profile: Profile) -> Profile {
        self.profiles.write().await.insert(profile.id, profile.clone());
        profile
    }

    pub async fn profile(&self, profile_id: Uuid) -> Option<Profile> {
        self.profiles.read().await.get(&profile_id).cloned()
    }

    pub async fn set_traits(&self, profile_id: Uuid, traits: Vec<Trait>) {
        self.traits.write().await.insert(profile_id, traits);
    }

    pub async fn insert_memory(&self, memory: NarrativeMemory) -> NarrativeMemory {
        self.memories.write().await.push(memory.clone());
        memory
    }

    /// Every memory of `profile_id`, oldest first.
    pub async fn memories_of(&self, profile_id: Uuid) -> Vec<NarrativeMemory> {
        self.memories
            .read()
            .await
            .iter()
            .filter(|m| m.profile_id == profile_id)
            .cloned()
            .collect()
    }

    pub async fn insert_character(&self, character: Character) -> Character {
        self.characters.write().await.push(character.clone());
        character
    }

    pub async fn messages_of(&self, session_id: &str) -> Vec<Message> {
        self.messages
            .read()
            .await
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_by_user_id(&self, user_id: &str) -> Result<Option<Profile>> {
        Ok(self
            .profiles
            .read()
            .await
            .values()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn update_relationship(
        &self,
        profile_id: Uuid,
        relationship: RelationshipVector,
    ) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(&profile_id)
            .ok_or_else(|| anyhow::anyhow!("Profile {} not found", profile_id))?;
        profile.relationship = relationship.clamped();
        Ok(())
    }
}

#[async_trait]
impl TraitStore for InMemoryStore {
    async fn find_by_profile_id(&self, profile_id: Uuid) -> Result<Vec<Trait>> {
        Ok(self
            .traits
            .read()
            .await
            .get(&profile_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert(&self, profile_id: Uuid, t: Trait) -> Result<()> {
        let mut traits = self.traits.write().await;
        let rows = traits.entry(profile_id).or_default();
        match rows.iter_mut().find(|r| r.name.eq_ignore_ascii_case(&t.name)) {
            Some(row) => row.value = t.value,
            None => rows.push(t),
        }
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn search(
        &self,
        profile_id: Uuid,
        query: &[f32],
        k: usize,
        emotional_weight_factor: f32,
    ) -> Result<Vec<ScoredMemory>> {
        let memories = self.memories.read().await;
        let mut scored: Vec<(f32, ScoredMemory)> = memories
            .iter()
            .filter(|m| m.profile_id == profile_id && m.embedding.len() == query.len())
            .map(|m| {
                let similarity = cosine_similarity(query, &m.embedding);
                let rank = similarity
                    + emotional_weight_factor * (m.emotional_intensity / 100.0) * INTENSITY_BIAS;
                (
                    rank,
                    ScoredMemory {
                        memory: m.clone(),
                        similarity,
                    },
                )
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, s)| s).collect())
    }

    async fn create(&self, memory: NarrativeMemory) -> Result<NarrativeMemory> {
        Ok(self.insert_memory(memory).await)
    }

    async fn get_recent_high_impact(
        &self,
        profile_id: Uuid,
        limit: usize,
        min_importance: u8,
        min_intensity: f32,
    ) -> Result<Vec<NarrativeMemory>> {
        let mut hits: Vec<NarrativeMemory> = self
            .memories
            .read()
            .await
            .iter()
            .filter(|m| {
                m.profile_id == profile_id
                    && m.importance >= min_importance
                    && m.emotional_intensity >= min_intensity
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait]
impl CharacterStore for InMemoryStore {
    async fn list_by_profile(&self, profile_id: Uuid) -> Result<Vec<Character>> {
        Ok(self
            .characters
            .read()
            .await
            .iter()
            .filter(|c| c.profile_id == profile_id)
            .cloned()
            .collect())
    }

    async fn create(&self, character: Character) -> Result<Character> {
        Ok(self.insert_character(character).await)
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn list_by_session(&self, session_id: &str) -> Result<Vec<Message>> {
        let mut messages = self.messages_of(session_id).await;
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn create(&self, message: Message) -> Result<Message> {
        self.messages.write().await.push(message.clone());
        Ok(message)
    }
}
