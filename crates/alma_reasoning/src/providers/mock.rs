//! Scripted oracle: deterministic replies for tests and offline runs.
//!
//! Replies come from, in order: the queue, the first rule whose needle the
//! prompt contains, then the default reply. Embeddings are a hashed
//! bag-of-words, so texts sharing words are similar and nothing else is.

use alma_core::text::words;
use alma_core::Oracle;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

pub const MOCK_EMBEDDING_DIM: usize = 64;

type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

struct Rule {
    needle: String,
    respond: Responder,
}

pub struct ScriptedOracle {
    rules: Vec<Rule>,
    queue: Mutex<VecDeque<Result<String, String>>>,
    default_reply: String,
    calls: Mutex<Vec<String>>,
    fail_embeddings: bool,
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new("")
    }
}

impl ScriptedOracle {
    pub fn new(default_reply: &str) -> Self {
        Self {
            rules: Vec::new(),
            queue: Mutex::new(VecDeque::new()),
            default_reply: default_reply.to_string(),
            calls: Mutex::new(Vec::new()),
            fail_embeddings: false,
        }
    }

    /// Answer `reply` to any prompt containing `needle`.
    pub fn on(self, needle: &str, reply: &str) -> Self {
        let reply = reply.to_string();
        self.on_with(needle, move |_| reply.clone())
    }

    /// Answer prompts containing `needle` with `respond(prompt)`.
    pub fn on_with<F>(mut self, needle: &str, respond: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            needle: needle.to_string(),
            respond: Box::new(respond),
        });
        self
    }

    pub fn failing_embeddings(mut self) -> Self {
        self.fail_embeddings = true;
        self
    }

    /// Next `generate` returns `reply`, whatever the prompt.
    pub fn push_reply(&self, reply: &str) {
        lock(&self.queue).push_back(Ok(reply.to_string()));
    }

    /// Next `generate` fails with `message`.
    pub fn push_error(&self, message: &str) {
        lock(&self.queue).push_back(Err(message.to_string()));
    }

    /// Every prompt `generate` has seen, oldest first.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Oracle for offline demos: answers every prompt the pipeline sends.
    pub fn demo() -> Self {
        Self::new(r#"{"public_response": "Mm, cuéntame más."}"#)
            .on_with("módulo de análisis emocional", |prompt| {
                demo_emotion(&quoted_message(prompt))
            })
            .on_with("consulta de evocación", |prompt| {
                let concepts: Vec<String> = words(&quoted_message(prompt))
                    .into_iter()
                    .filter(|w| w.chars().count() > 3)
                    .take(4)
                    .collect();
                concepts.join(", ")
            })
            .on("juez de relevancia", r#"{"use": true, "reason": "tema compartido"}"#)
            .on("ajuste de personalidad", "{}")
            .on(
                "== FORMATO DE RESPUESTA ==",
                r#"{"inner_monologue": "Escucho con atención.", "public_response": "Te escucho. ¿Qué más pasó?", "trust_delta": 1, "intimacy_delta": 1, "respect_delta": 0, "new_state": "atenta"}"#,
            )
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Text between the last pair of triple quotes, or the whole prompt.
fn quoted_message(prompt: &str) -> String {
    let parts: Vec<&str> = prompt.split("\"\"\"").collect();
    if parts.len() >= 3 {
        parts[parts.len() - 2].to_string()
    } else {
        prompt.to_string()
    }
}

fn demo_emotion(message: &str) -> String {
    const HEAVY: &[&str] = &["muri", "perd", "odio", "miedo", "trist", "llor", "dejo", "abandon"];
    let folded = words(message);
    let heavy = folded
        .iter()
        .any(|w| HEAVY.iter().any(|stem| w.starts_with(stem)));
    if heavy {
        r#"{"intensity": 85, "category": "TRISTEZA", "extreme": false}"#.to_string()
    } else {
        r#"{"intensity": 10, "category": "NEUTRAL", "extreme": false}"#.to_string()
    }
}

/// FNV-1a of each folded word, bucketed and L2-normalized.
pub fn hashed_embedding(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; MOCK_EMBEDDING_DIM];
    for word in words(text) {
        let mut hash: u64 = 0xcbf29ce484222325;
        for b in word.bytes() {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        v[(hash % MOCK_EMBEDDING_DIM as u64) as usize] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate(&self, prompt: &str) -> Result<String> {
        lock(&self.calls).push(prompt.to_string());

        if let Some(next) = lock(&self.queue).pop_front() {
            return next.map_err(|e| anyhow::anyhow!(e));
        }
        if let Some(rule) = self.rules.iter().find(|r| prompt.contains(&r.needle)) {
            return Ok((rule.respond)(prompt));
        }
        Ok(self.default_reply.clone())
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail_embeddings {
            anyhow::bail!("embedding backend unavailable");
        }
        Ok(hashed_embedding(text))
    }
}
