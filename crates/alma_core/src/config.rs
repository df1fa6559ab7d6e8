use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

/// Every tuning knob of the turn pipeline.
///
/// The numeric thresholds have no derivation beyond "this behaves well"; they
/// are config rather than constants so they can be tuned per deployment.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlmaConfig {
    pub llm: LlmConfig,
    pub limbic: LimbicConfig,
    pub bond: BondConfig,
    pub retrieval: RetrievalConfig,
    pub prompt: PromptConfig,
    pub goals: GoalConfig,
    pub turn: TurnConfig,
}

impl AlmaConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: AlmaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("ALMA_LLM_PROVIDER") {
            self.llm.provider = v;
        }
        if let Ok(v) = std::env::var("ALMA_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("ALMA_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("ALMA_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("ALMA_LLM_MAX_TOKENS") {
            if let Ok(n) = v.parse() {
                self.llm.max_tokens = n;
            }
        }
        if let Ok(v) = std::env::var("ALMA_LLM_TEMPERATURE") {
            if let Ok(n) = v.parse() {
                self.llm.temperature = n;
            }
        }
        if let Ok(v) = std::env::var("ALMA_TURN_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                self.turn.turn_timeout_secs = n;
            }
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// "openai", "ollama" or "mock".
    pub provider: String,
    pub model: String,
    pub embedding_model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// HTTP request timeout of the provider client.
    pub request_timeout_secs: u64,
    /// Attempts per request on 408/429/5xx, including the first.
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: None,
            max_tokens: 1024,
            temperature: 0.8,
            request_timeout_secs: 60,
            max_attempts: 3,
        }
    }
}

/// Emotion noise gate and reaction threshold.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimbicConfig {
    /// How much resilience damps the analyzed intensity (`1 - r * damping`).
    pub damping: f32,
    /// Gate floor for a resilience of 0.
    pub noise_floor: f32,
    /// Extra gate height at resilience 1.
    pub noise_resilience_span: f32,
    /// Reaction threshold at resilience 1.
    pub reaction_max_threshold: f32,
    /// Intensity used when emotion analysis fails.
    pub default_intensity: f32,
}

impl Default for LimbicConfig {
    fn default() -> Self {
        Self {
            damping: 0.5,
            noise_floor: 20.0,
            noise_resilience_span: 30.0,
            reaction_max_threshold: 30.0,
            default_intensity: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BondConfig {
    pub jealousy_min_intimacy: f32,
    pub jealousy_max_trust: f32,
    pub hostility_max_respect: f32,
    /// Largest per-turn change applied from an oracle-proposed delta.
    pub max_delta_per_turn: f32,
}

impl Default for BondConfig {
    fn default() -> Self {
        Self {
            jealousy_min_intimacy: 70.0,
            jealousy_max_trust: 40.0,
            hostility_max_respect: 35.0,
            max_delta_per_turn: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Below this similarity a hit is discarded outright.
    pub min_similarity: f32,
    /// At or above this, an intense memory is high-impact without a judge.
    pub high_similarity: f32,
    /// Intense memories between this and `high_similarity` go to the judge.
    pub borderline_similarity: f32,
    /// Intensity from which a memory counts as high-impact / traumatic.
    pub high_intensity: f32,
    pub benign_weight_factor: f32,
    pub mixed_weight_factor: f32,
    pub default_weight_factor: f32,
    pub judge_enabled: bool,
    pub max_judge_calls: usize,
    pub recent_high_impact_limit: usize,
    pub recent_min_importance: u8,
    pub recent_window_hours: i64,
    pub max_concepts: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            min_similarity: 0.30,
            high_similarity: 0.75,
            borderline_similarity: 0.45,
            high_intensity: 70.0,
            benign_weight_factor: 0.0,
            mixed_weight_factor: 0.3,
            default_weight_factor: 1.0,
            judge_enabled: true,
            max_judge_calls: 3,
            recent_high_impact_limit: 3,
            recent_min_importance: 7,
            recent_window_hours: 72,
            max_concepts: 6,
        }
    }
}

/// Resilience bands of the prompt's guidance block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub thick_skinned_above: f32,
    pub fragile_below: f32,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            thick_skinned_above: 0.7,
            fragile_below: 0.4,
        }
    }
}

/// Trait and relationship cut-offs of the hidden-goal table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    /// Trivial turns: at or above this extraversion the companion takes the lead.
    pub extravert_from: f32,
    pub close_trust_from: f32,
    pub close_intimacy_from: f32,
    pub anxious_from: f32,
    pub curious_from: f32,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            extravert_from: 50.0,
            close_trust_from: 70.0,
            close_intimacy_from: 60.0,
            anxious_from: 70.0,
            curious_from: 70.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// How many trailing session messages go into the recent-context block.
    pub recent_messages: usize,
    pub turn_timeout_secs: u64,
    pub oracle_timeout_secs: u64,
    pub trait_inference: bool,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            recent_messages: 12,
            turn_timeout_secs: 120,
            oracle_timeout_secs: 45,
            trait_inference: true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
