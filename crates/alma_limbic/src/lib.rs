//! # Alma limbic layer
//!
//! The fast, non-verbal part of a turn. Everything here reduces a fuzzy signal
//! to a number or a mode before the prompt is written:
//!
//! - **emotion**: one oracle call scores the utterance against a fixed rubric,
//!   then a resilience-scaled noise gate drops low-grade stimuli.
//! - **reaction**: a ReLU threshold turns the gated intensity into the
//!   effective intensity and the per-turn debug trace.
//! - **bond**: trust / intimacy / respect collapse into relational modes and
//!   the directive text that steers tone.
//!
//! Reaction and bond are pure; only the analyzer suspends.

pub mod bond;
pub mod emotion;
pub mod reaction;

pub use bond::{derive_bond_dynamics, BondDirective, BondMode};
pub use emotion::{apply_noise_gate, EmotionAnalyzer, EmotionReading, NEUTRAL_CATEGORY};
pub use reaction::{calculate_reaction, ReactionEngine};
