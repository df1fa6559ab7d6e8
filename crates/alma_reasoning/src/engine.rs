//! The turn orchestrator: one utterance in, one sanitized reply out.
//!
//! Order of a turn:
//!
//! 1. validate input, resolve collaborators, load profile / traits / recent chat
//! 2. persist the user message
//! 3. emotion analysis → noise gate → reaction (effective intensity, trace)
//! 4. narrative retrieval
//! 5. prompt assembly and generation
//! 6. reply parsing, relationship deltas, reply persistence
//! 7. memory write (only when the turn moved the companion), trait inference
//!
//! Only profile lookup, generation, parsing and reply persistence can fail a
//! turn. Everything else logs a warning and degrades.

use crate::inference::TraitInference;
use crate::prompts::PromptAssembler;
use crate::reply::{parse_reply, parse_structured};
use alma_core::{
    AlmaConfig, CharacterStore, InteractionDebug, MemoryStore, Message, MessageStore, NewMemory,
    Oracle, PersonalityProfile, Profile, ProfileStore, Role, TraitStore, TurnError,
};
use alma_limbic::{EmotionAnalyzer, EmotionReading, ReactionEngine};
use alma_memory::{InMemoryStore, NarrativeRetriever};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct TurnOrchestrator {
    config: AlmaConfig,
    oracle: Option<Arc<dyn Oracle>>,
    profiles: Option<Arc<dyn ProfileStore>>,
    traits: Option<Arc<dyn TraitStore>>,
    memories: Option<Arc<dyn MemoryStore>>,
    characters: Option<Arc<dyn CharacterStore>>,
    messages: Option<Arc<dyn MessageStore>>,
    reaction: ReactionEngine,
    assembler: PromptAssembler,
}

impl TurnOrchestrator {
    pub fn new(config: AlmaConfig) -> Self {
        Self {
            reaction: ReactionEngine::new(config.limbic.reaction_max_threshold),
            assembler: PromptAssembler::new(config.prompt.clone(), config.bond.clone())
                .with_goals(config.goals.clone()),
            config,
            oracle: None,
            profiles: None,
            traits: None,
            memories: None,
            characters: None,
            messages: None,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn with_traits(mut self, traits: Arc<dyn TraitStore>) -> Self {
        self.traits = Some(traits);
        self
    }

    /// Optional: without it turns run with no narrative context and write no memories.
    pub fn with_memories(mut self, memories: Arc<dyn MemoryStore>) -> Self {
        self.memories = Some(memories);
        self
    }

    /// Optional: without it no counterparts are detected.
    pub fn with_characters(mut self, characters: Arc<dyn CharacterStore>) -> Self {
        self.characters = Some(characters);
        self
    }

    pub fn with_messages(mut self, messages: Arc<dyn MessageStore>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Wire every store slot to one in-memory store.
    pub fn with_store(self, store: Arc<InMemoryStore>) -> Self {
        self.with_profiles(store.clone())
            .with_traits(store.clone())
            .with_memories(store.clone())
            .with_characters(store.clone())
            .with_messages(store)
    }

    pub fn config(&self) -> &AlmaConfig {
        &self.config
    }

    fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.config.turn.oracle_timeout_secs)
    }

    /// Run one turn and return the persisted reply with the reaction trace.
    #[tracing::instrument(skip(self, utterance))]
    pub async fn chat(
        &self,
        user_id: &str,
        session_id: &str,
        utterance: &str,
    ) -> Result<(Message, InteractionDebug), TurnError> {
        if user_id.trim().is_empty() {
            return Err(TurnError::InvalidInput("user id is blank".into()));
        }
        if utterance.trim().is_empty() {
            return Err(TurnError::InvalidInput("utterance is blank".into()));
        }

        let budget = Duration::from_secs(self.config.turn.turn_timeout_secs);
        match tokio::time::timeout(budget, self.run_turn(user_id, session_id, utterance)).await {
            Ok(result) => {
                if let Err(e) = &result {
                    tracing::error!("Turn failed: {}", e);
                }
                result
            }
            Err(_) => {
                tracing::error!("Turn exceeded {}s", budget.as_secs());
                Err(TurnError::Timeout { stage: "turn" })
            }
        }
    }

    async fn run_turn(
        &self,
        user_id: &str,
        session_id: &str,
        utterance: &str,
    ) -> Result<(Message, InteractionDebug), TurnError> {
        let oracle = self.oracle.as_ref().ok_or(TurnError::NotConfigured("oracle"))?;
        let profiles = self
            .profiles
            .as_ref()
            .ok_or(TurnError::NotConfigured("profile store"))?;
        let trait_store = self
            .traits
            .as_ref()
            .ok_or(TurnError::NotConfigured("trait store"))?;
        let messages = self
            .messages
            .as_ref()
            .ok_or(TurnError::NotConfigured("message store"))?;

        let profile = profiles
            .get_by_user_id(user_id)
            .await
            .map_err(|e| TurnError::upstream("profile_lookup", e))?
            .ok_or_else(|| TurnError::ProfileNotFound(user_id.to_string()))?;

        let traits = match trait_store.find_by_profile_id(profile.id).await {
            Ok(rows) => PersonalityProfile::from_traits(&rows),
            Err(e) => {
                tracing::warn!("Trait lookup failed, using neutral traits: {:#}", e);
                PersonalityProfile::default()
            }
        };

        let recent = self.recent_messages(messages.as_ref(), session_id).await;

        if let Err(e) = messages
            .create(Message::new(user_id, session_id, Role::User, utterance))
            .await
        {
            tracing::warn!("Failed to persist user message: {:#}", e);
        }

        let reading = self.analyze_emotion(oracle, &traits, utterance).await;
        let (effective, trace) = self.reaction.calculate(reading.intensity, &traits);
        let is_trivial = effective <= 0.0;
        tracing::info!(
            "Reaction: intensity={:.1} effective={:.1} category={} trivial={}",
            reading.intensity,
            effective,
            reading.category,
            is_trivial
        );

        let narrative = self.narrative_context(oracle, &profile, utterance).await;

        let assembled =
            self.assembler
                .assemble(&profile, &traits, &recent, &narrative, utterance, is_trivial);
        tracing::debug!(
            "Goal: {:?}, bond: {}",
            assembled.goal.trigger,
            assembled.bond.labels()
        );

        let raw = match tokio::time::timeout(self.oracle_timeout(), oracle.generate(&assembled.text))
            .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(TurnError::upstream("generation", e)),
            Err(_) => return Err(TurnError::Timeout { stage: "generation" }),
        };

        let (text, ok) = parse_reply(&raw);
        if !ok {
            return Err(TurnError::MalformedOutput);
        }

        self.apply_relationship_delta(profiles.as_ref(), &profile, &raw)
            .await;

        let reply = messages
            .create(Message::new(user_id, session_id, Role::Assistant, &text))
            .await
            .map_err(|e| TurnError::upstream("reply_persistence", e))?;

        if effective > 0.0 {
            if let Err(e) = self
                .remember(oracle, profile.id, utterance, effective, &reading)
                .await
            {
                tracing::warn!("Failed to write memory: {:#}", e);
            }
        }

        if self.config.turn.trait_inference {
            Arc::new(
                TraitInference::new(oracle.clone(), trait_store.clone())
                    .with_timeout(self.oracle_timeout()),
            )
            .spawn(profile.id, traits, utterance.to_string(), text);
        }

        tracing::info!("Turn complete for profile {}", profile.id);
        Ok((reply, trace))
    }

    async fn recent_messages(&self, messages: &dyn MessageStore, session_id: &str) -> Vec<Message> {
        match messages.list_by_session(session_id).await {
            Ok(mut all) => {
                let keep = self.config.turn.recent_messages;
                if all.len() > keep {
                    all.drain(..all.len() - keep);
                }
                all
            }
            Err(e) => {
                tracing::warn!("Failed to load recent messages: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn analyze_emotion(
        &self,
        oracle: &Arc<dyn Oracle>,
        traits: &PersonalityProfile,
        utterance: &str,
    ) -> EmotionReading {
        let analyzer = EmotionAnalyzer::new(oracle.clone(), self.config.limbic.clone());
        match tokio::time::timeout(self.oracle_timeout(), analyzer.analyze(traits, utterance)).await {
            Ok(Ok(reading)) => reading,
            Ok(Err(e)) => {
                tracing::warn!("Emotion analysis failed, using default intensity: {:#}", e);
                EmotionReading::fallback(&self.config.limbic)
            }
            Err(_) => {
                tracing::warn!("Emotion analysis timed out, using default intensity");
                EmotionReading::fallback(&self.config.limbic)
            }
        }
    }

    async fn narrative_context(
        &self,
        oracle: &Arc<dyn Oracle>,
        profile: &Profile,
        utterance: &str,
    ) -> String {
        let Some(memories) = &self.memories else {
            tracing::debug!("No memory store configured, skipping narrative retrieval");
            return String::new();
        };

        let mut retriever = NarrativeRetriever::new(
            oracle.clone(),
            memories.clone(),
            self.config.retrieval.clone(),
            self.config.bond.clone(),
        )
        .with_oracle_timeout(self.oracle_timeout());
        if let Some(characters) = &self.characters {
            retriever = retriever.with_characters(characters.clone());
        }

        match retriever.build_context(profile.id, utterance).await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!("Narrative retrieval failed, continuing without memories: {:#}", e);
                String::new()
            }
        }
    }

    async fn apply_relationship_delta(
        &self,
        profiles: &dyn ProfileStore,
        profile: &Profile,
        raw: &str,
    ) {
        let Some(structured) = parse_structured(raw) else {
            return;
        };
        if !structured.new_state.is_empty() {
            tracing::debug!("New state: {}", structured.new_state);
        }
        let delta = structured.delta();
        if delta.is_zero() {
            return;
        }

        let updated = delta.apply(&profile.relationship, self.config.bond.max_delta_per_turn);
        tracing::debug!(
            "Relationship: trust {:.0}->{:.0} intimacy {:.0}->{:.0} respect {:.0}->{:.0}",
            profile.relationship.trust,
            updated.trust,
            profile.relationship.intimacy,
            updated.intimacy,
            profile.relationship.respect,
            updated.respect
        );
        if let Err(e) = profiles.update_relationship(profile.id, updated).await {
            tracing::warn!("Failed to update relationship: {:#}", e);
        }
    }

    async fn remember(
        &self,
        oracle: &Arc<dyn Oracle>,
        profile_id: Uuid,
        utterance: &str,
        effective: f32,
        reading: &EmotionReading,
    ) -> anyhow::Result<()> {
        let Some(memories) = &self.memories else {
            return Ok(());
        };

        let embedding = tokio::time::timeout(self.oracle_timeout(), oracle.embed(utterance))
            .await
            .context("Memory embedding timed out")?
            .context("Memory embedding failed")?;

        let weight = (effective / 10.0).ceil() as i32;
        let memory = NewMemory {
            profile_id,
            content: utterance.to_string(),
            embedding,
            importance: weight,
            emotional_weight: weight,
            emotional_intensity: Some(effective),
            emotion_category: reading.category.clone(),
            happened_at: None,
        }
        .into_memory();

        let stored = memories.create(memory).await.context("Memory store rejected write")?;
        tracing::info!(
            "Memory written: weight={} intensity={:.0} category={}",
            stored.emotional_weight,
            stored.emotional_intensity,
            stored.emotion_category
        );
        Ok(())
    }
}
