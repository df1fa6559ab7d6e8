//! Narrative retrieval: which past memories and which people belong in this
//! turn's prompt.
//!
//! Pipeline per utterance:
//! - detect the counterparts the user names
//! - classify intent and explicit negation
//! - rewrite into an evocation query, embed it, search
//! - split hits into high-impact / related, asking the judge on borderline
//!   intense memories
//! - force in recent conflict memories, however trivial the message looks
//! - render the labelled sections
//!
//! Counterpart listing, the rewrite and the judge degrade on failure.
//! Embedding and search failures propagate; the orchestrator then continues
//! the turn without narrative context.

use alma_core::config::{BondConfig, RetrievalConfig};
use alma_core::text::contains_word;
use alma_core::{Character, CharacterStore, MemoryStore, NarrativeMemory, Oracle};
use alma_limbic::{derive_bond_dynamics, BondDirective};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::evocation::{EvocationQuery, EvocationRewriter};
use crate::intent::{is_conflict_category, mentions_any, IntentClass, IntentClassifier, KeywordClassifier};
use crate::rerank::RerankJudge;

pub const HIGH_IMPACT_HEADER: &str = "== MEMORIAS DE ALTO IMPACTO ==";
pub const RELATED_HEADER: &str = "== RECUERDOS RELACIONADOS ==";
pub const BOND_STATE_HEADER: &str = "== ESTADO DEL VÍNCULO ==";

/// Carried by every high-impact line.
pub const RESIDUAL_EMOTION_MARKER: &str = "emoción residual";
/// Carried by bond-state lines whose counterpart is in a tense mode.
pub const CONFLICT_MARKER: &str = "conflicto activo";

/// Whether rendered narrative text carries a conflict or residual-emotion
/// marker. Drives the prompt's tension rule.
pub fn narrative_has_tension(text: &str) -> bool {
    text.contains(RESIDUAL_EMOTION_MARKER) || text.contains(CONFLICT_MARKER)
}

/// How a memory made it into the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallSource {
    /// Intense and above the high-similarity cutoff.
    Automatic,
    /// Intense, borderline similarity, approved by the judge.
    Judged,
    /// Recent high-intensity conflict, added regardless of the query.
    RecentConflict,
    Related,
}

#[derive(Debug, Clone)]
pub struct RecalledMemory {
    pub memory: NarrativeMemory,
    /// `None` for memories that did not come from the similarity search.
    pub similarity: Option<f32>,
    pub source: RecallSource,
}

#[derive(Debug, Clone)]
pub struct Counterpart {
    pub character: Character,
    pub bond: BondDirective,
}

/// Everything retrieval decided for one utterance.
#[derive(Debug, Clone)]
pub struct NarrativeContext {
    pub high_impact: Vec<RecalledMemory>,
    pub related: Vec<RecalledMemory>,
    pub counterparts: Vec<Counterpart>,
    pub intent: IntentClass,
    /// Passed to the store's search.
    pub weight_factor: f32,
    pub query: EvocationQuery,
    pub negated_topics: Vec<String>,
}

impl NarrativeContext {
    pub fn is_empty(&self) -> bool {
        self.high_impact.is_empty() && self.related.is_empty() && self.counterparts.is_empty()
    }

    /// Labelled sections, or an empty string when nothing is relevant.
    pub fn render(&self) -> String {
        self.render_at(Utc::now())
    }

    pub fn render_at(&self, now: DateTime<Utc>) -> String {
        let mut sections = Vec::new();

        if !self.high_impact.is_empty() {
            let mut s = String::from(HIGH_IMPACT_HEADER);
            for r in &self.high_impact {
                let m = &r.memory;
                s.push_str(&format!(
                    "\n- [{}] {} ({}: {}, intensidad {:.0})",
                    relative_age(m.happened_at, now),
                    m.content.trim(),
                    RESIDUAL_EMOTION_MARKER,
                    m.emotion_category,
                    m.emotional_intensity
                ));
            }
            sections.push(s);
        }

        if !self.related.is_empty() {
            let mut s = String::from(RELATED_HEADER);
            for r in &self.related {
                s.push_str(&format!(
                    "\n- [{}] {}",
                    relative_age(r.memory.happened_at, now),
                    r.memory.content.trim()
                ));
            }
            sections.push(s);
        }

        if !self.counterparts.is_empty() {
            let mut s = String::from(BOND_STATE_HEADER);
            for c in &self.counterparts {
                let rel = &c.character.relationship;
                let mood = if c.bond.is_tense() {
                    format!("{} ({})", CONFLICT_MARKER, c.bond.labels())
                } else {
                    "estable".to_string()
                };
                s.push_str(&format!(
                    "\n- {}: confianza {:.0}, intimidad {:.0}, respeto {:.0} → {}",
                    c.character.name, rel.trust, rel.intimacy, rel.respect, mood
                ));
            }
            sections.push(s);
        }

        sections.join("\n\n")
    }
}

/// "hace 3 días", "hace 2 horas", ...
pub fn relative_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(then);
    let minutes = age.num_minutes();
    let hours = age.num_hours();
    let days = age.num_days();
    match () {
        _ if minutes < 1 => "hace un momento".to_string(),
        _ if minutes < 60 => plural(minutes, "minuto", "minutos"),
        _ if hours < 24 => plural(hours, "hora", "horas"),
        _ if days < 60 => plural(days, "día", "días"),
        _ if days < 730 => plural(days / 30, "mes", "meses"),
        _ => plural(days / 365, "año", "años"),
    }
}

fn plural(n: i64, one: &str, many: &str) -> String {
    if n == 1 {
        format!("hace 1 {}", one)
    } else {
        format!("hace {} {}", n, many)
    }
}

pub struct NarrativeRetriever {
    oracle: Arc<dyn Oracle>,
    memories: Arc<dyn MemoryStore>,
    characters: Option<Arc<dyn CharacterStore>>,
    classifier: Arc<dyn IntentClassifier>,
    rewriter: EvocationRewriter,
    judge: RerankJudge,
    config: RetrievalConfig,
    bond: BondConfig,
    oracle_timeout: Option<Duration>,
}

impl NarrativeRetriever {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        memories: Arc<dyn MemoryStore>,
        config: RetrievalConfig,
        bond: BondConfig,
    ) -> Self {
        Self {
            rewriter: EvocationRewriter::new(oracle.clone(), config.max_concepts),
            judge: RerankJudge::new(oracle.clone()),
            oracle,
            memories,
            characters: None,
            classifier: Arc::new(KeywordClassifier),
            config,
            bond,
            oracle_timeout: None,
        }
    }

    pub fn with_characters(mut self, characters: Arc<dyn CharacterStore>) -> Self {
        self.characters = Some(characters);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Bound every oracle round-trip made during retrieval.
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = Some(timeout);
        self.rewriter = EvocationRewriter::new(self.oracle.clone(), self.config.max_concepts)
            .with_timeout(timeout);
        self.judge = RerankJudge::new(self.oracle.clone()).with_timeout(timeout);
        self
    }

    /// Rendered context for the prompt. Empty when nothing is relevant.
    pub async fn build_context(&self, profile_id: Uuid, utterance: &str) -> Result<String> {
        Ok(self.retrieve(profile_id, utterance).await?.render())
    }

    pub async fn retrieve(&self, profile_id: Uuid, utterance: &str) -> Result<NarrativeContext> {
        let counterparts = self.detect_counterparts(profile_id, utterance).await;

        let intent = self.classifier.classify(utterance);
        let negated = self.classifier.negated_topics(utterance);
        let keep = if intent == IntentClass::BenignDesire {
            self.classifier.benign_objects(utterance)
        } else {
            Vec::new()
        };
        let weight_factor = match intent {
            IntentClass::BenignDesire => self.config.benign_weight_factor,
            IntentClass::Mixed => self.config.mixed_weight_factor,
            IntentClass::Neutral => self.config.default_weight_factor,
        };

        let query = self.rewriter.rewrite(utterance, &negated, &keep).await;

        let embed = self.oracle.embed(&query.text);
        let embedding = match self.oracle_timeout {
            Some(t) => tokio::time::timeout(t, embed)
                .await
                .context("Embedding the evocation query timed out")?,
            None => embed.await,
        }
        .context("Failed to embed evocation query")?;

        let hits = self
            .memories
            .search(profile_id, &embedding, self.config.top_k, weight_factor)
            .await
            .context("Memory search failed")?;

        let mut high_impact = Vec::new();
        let mut related = Vec::new();
        let mut judge_calls = 0usize;

        for hit in hits {
            let memory = hit.memory;
            let sim = hit.similarity;

            if mentions_any(&memory.content, &negated) {
                continue;
            }
            let intense = memory.emotional_intensity >= self.config.high_intensity;
            if intent == IntentClass::BenignDesire
                && (intense || self.classifier.is_traumatic(&memory.content))
            {
                tracing::debug!("Benign desire: suppressing memory {}", memory.id);
                continue;
            }

            if intense && sim >= self.config.high_similarity {
                high_impact.push(recalled(memory, sim, RecallSource::Automatic));
            } else if intense && sim >= self.config.borderline_similarity {
                if self.config.judge_enabled && judge_calls < self.config.max_judge_calls {
                    judge_calls += 1;
                    match self.judge.judge(utterance, &memory).await {
                        Ok(v) if v.use_memory => {
                            high_impact.push(recalled(memory, sim, RecallSource::Judged))
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!("Rerank judge failed, skipping memory: {:#}", e),
                    }
                } else if sim >= self.config.min_similarity {
                    related.push(recalled(memory, sim, RecallSource::Related));
                }
            } else if sim >= self.config.min_similarity {
                related.push(recalled(memory, sim, RecallSource::Related));
            }
        }

        self.add_recent_conflicts(profile_id, &negated, &mut high_impact, &mut related)
            .await;

        tracing::debug!(
            "Narrative: intent={} weight={} high_impact={} related={} counterparts={}",
            intent.as_str(),
            weight_factor,
            high_impact.len(),
            related.len(),
            counterparts.len()
        );

        Ok(NarrativeContext {
            high_impact,
            related,
            counterparts,
            intent,
            weight_factor,
            query,
            negated_topics: negated,
        })
    }

    async fn detect_counterparts(&self, profile_id: Uuid, utterance: &str) -> Vec<Counterpart> {
        let Some(store) = &self.characters else {
            return Vec::new();
        };
        let characters = match store.list_by_profile(profile_id).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to list counterparts: {:#}", e);
                return Vec::new();
            }
        };
        characters
            .into_iter()
            .filter(|c| contains_word(utterance, &c.name))
            .map(|character| Counterpart {
                bond: derive_bond_dynamics(&character.relationship, &self.bond),
                character,
            })
            .collect()
    }

    /// Recent intense conflict memories always surface, independent of the
    /// query. Only an explicit negation keeps them out.
    async fn add_recent_conflicts(
        &self,
        profile_id: Uuid,
        negated: &[String],
        high_impact: &mut Vec<RecalledMemory>,
        related: &mut Vec<RecalledMemory>,
    ) {
        let recent = match self
            .memories
            .get_recent_high_impact(
                profile_id,
                self.config.recent_high_impact_limit,
                self.config.recent_min_importance,
                self.config.high_intensity,
            )
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Failed to load recent high-impact memories: {:#}", e);
                return;
            }
        };

        // None: the window reaches past the earliest representable time.
        let cutoff = ChronoDuration::try_hours(self.config.recent_window_hours.max(0))
            .and_then(|window| Utc::now().checked_sub_signed(window));
        for memory in recent {
            if cutoff.is_some_and(|cutoff| memory.created_at < cutoff) {
                continue;
            }
            let conflict = is_conflict_category(&memory.emotion_category)
                || self.classifier.is_conflict(&memory.content);
            if !conflict || mentions_any(&memory.content, negated) {
                continue;
            }
            if high_impact.iter().any(|r| r.memory.id == memory.id) {
                continue;
            }
            if let Some(pos) = related.iter().position(|r| r.memory.id == memory.id) {
                let hit = related.remove(pos);
                high_impact.push(RecalledMemory {
                    source: RecallSource::RecentConflict,
                    ..hit
                });
                continue;
            }
            high_impact.push(RecalledMemory {
                memory,
                similarity: None,
                source: RecallSource::RecentConflict,
            });
        }
    }
}

fn recalled(memory: NarrativeMemory, similarity: f32, source: RecallSource) -> RecalledMemory {
    RecalledMemory {
        memory,
        similarity: Some(similarity),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alma_core::{NewMemory, RelationshipVector};

    fn memory(content: &str, intensity: f32, category: &str, days_ago: i64) -> NarrativeMemory {
        NewMemory {
            profile_id: Uuid::nil(),
            content: content.into(),
            importance: 8,
            emotional_weight: 8,
            emotional_intensity: Some(intensity),
            emotion_category: category.into(),
            happened_at: Some(Utc::now() - ChronoDuration::days(days_ago)),
            ..Default::default()
        }
        .into_memory()
    }

    fn context() -> NarrativeContext {
        NarrativeContext {
            high_impact: vec![],
            related: vec![],
            counterparts: vec![],
            intent: IntentClass::Neutral,
            weight_factor: 1.0,
            query: EvocationQuery {
                concepts: vec![],
                text: String::new(),
                rewritten: false,
            },
            negated_topics: vec![],
        }
    }

    #[test]
    fn test_empty_context_renders_empty() {
        assert_eq!(context().render(), "");
        assert!(context().is_empty());
    }

    #[test]
    fn test_render_sections_in_order() {
        let mut ctx = context();
        ctx.high_impact.push(RecalledMemory {
            memory: memory("mi padre me abandonó", 90.0, "tristeza", 3),
            similarity: Some(0.8),
            source: RecallSource::Automatic,
        });
        ctx.related.push(RecalledMemory {
            memory: memory("me encanta la pizza", 20.0, "alegria", 1),
            similarity: Some(0.5),
            source: RecallSource::Related,
        });
        let jorge = Character::new(Uuid::nil(), "Jorge", RelationshipVector::new(20.0, 80.0, 50.0));
        ctx.counterparts.push(Counterpart {
            bond: derive_bond_dynamics(&jorge.relationship, &BondConfig::default()),
            character: jorge,
        });

        let text = ctx.render();
        let hi = text.find(HIGH_IMPACT_HEADER).unwrap();
        let rel = text.find(RELATED_HEADER).unwrap();
        let bond = text.find(BOND_STATE_HEADER).unwrap();
        assert!(hi < rel && rel < bond);
        assert!(text.contains("[hace 3 días] mi padre me abandonó (emoción residual: TRISTEZA, intensidad 90)"));
        assert!(text.contains("[hace 1 día] me encanta la pizza"));
        assert!(text.contains("Jorge: confianza 20, intimidad 80, respeto 50 → conflicto activo (celos)"));
        assert!(narrative_has_tension(&text));
    }

    #[test]
    fn test_related_only_has_no_tension() {
        let mut ctx = context();
        ctx.related.push(RecalledMemory {
            memory: memory("fuimos a la playa", 30.0, "alegria", 10),
            similarity: Some(0.6),
            source: RecallSource::Related,
        });
        let text = ctx.render();
        assert!(text.starts_with(RELATED_HEADER));
        assert!(!narrative_has_tension(&text));
    }

    #[test]
    fn test_relative_age() {
        let now = Utc::now();
        assert_eq!(relative_age(now, now), "hace un momento");
        assert_eq!(relative_age(now - ChronoDuration::minutes(5), now), "hace 5 minutos");
        assert_eq!(relative_age(now - ChronoDuration::hours(1), now), "hace 1 hora");
        assert_eq!(relative_age(now - ChronoDuration::days(90), now), "hace 3 meses");
        assert_eq!(relative_age(now - ChronoDuration::days(800), now), "hace 2 años");
    }
}
