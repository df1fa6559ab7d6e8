//! # Alma reasoning
//!
//! Everything after the limbic layer: the hidden goal, the generation prompt,
//! the oracle providers, reply sanitation and the orchestrator that strings a
//! turn together.

pub mod engine;
pub mod goals;
pub mod inference;
pub mod prompts;
pub mod providers;
pub mod reply;
pub mod retry;

pub use engine::TurnOrchestrator;
pub use goals::{select_goal, Goal, GoalTrigger};
pub use inference::TraitInference;
pub use prompts::{AssembledPrompt, PromptAssembler};
pub use providers::{create_oracle, OpenAiOracle, ScriptedOracle};
pub use reply::{parse_reply, parse_structured, OracleReply};
