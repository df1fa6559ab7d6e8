pub mod embedding;
pub mod evocation;
pub mod intent;
pub mod narrative;
pub mod rerank;
pub mod store;

pub use embedding::cosine_similarity;
pub use evocation::{EvocationQuery, EvocationRewriter};
pub use intent::{IntentClass, IntentClassifier, KeywordClassifier};
pub use narrative::{narrative_has_tension, NarrativeContext, NarrativeRetriever};
pub use rerank::{JudgeVerdict, RerankJudge};
pub use store::InMemoryStore;

#[cfg(test)]
mod tests;
