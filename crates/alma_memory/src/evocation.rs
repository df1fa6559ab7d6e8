//! Evocation rewrite: the raw utterance → a handful of abstract concepts.
//!
//! Searching with the literal utterance matches small talk against small
//! talk. The oracle instead names what the message *evokes* ("llevo horas
//! esperando" → "espera, abandono"), and that is what gets embedded.

use alma_core::json::strip_code_fences;
use alma_core::text::{contains_stem, fold, words};
use alma_core::Oracle;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::intent::{is_stopword, mentions_any};

const EVOCATION_PROMPT: &str = "Convierte el mensaje del usuario en una consulta de evocación: \
entre 1 y {max} conceptos abstractos, separados por comas, que sirvan para buscar recuerdos relacionados.

Reglas:
- Si el usuario pide NO hablar de un tema, ese tema no aparece en la consulta.
- El mensaje puede mezclar español e inglés; escribe los conceptos en español.
- Si el usuario expresa un antojo o deseo inofensivo, conserva el objeto del deseo aunque aparezcan palabras tristes.
- Responde SOLO con la lista, en una línea, sin explicaciones.";

/// Labels models like to put in front of the list.
const LABELS: &[&str] = &["consulta", "conceptos", "concepts", "query", "evocacion", "evocation"];

/// Rewritten search query.
#[derive(Debug, Clone, PartialEq)]
pub struct EvocationQuery {
    pub concepts: Vec<String>,
    /// What actually gets embedded.
    pub text: String,
    /// False when the oracle failed and the folded utterance was used instead.
    pub rewritten: bool,
}

pub struct EvocationRewriter {
    oracle: Arc<dyn Oracle>,
    max_concepts: usize,
    timeout: Option<Duration>,
}

impl EvocationRewriter {
    pub fn new(oracle: Arc<dyn Oracle>, max_concepts: usize) -> Self {
        Self {
            oracle,
            max_concepts: max_concepts.max(1),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Rewrite `utterance`, dropping `negated` topics and guaranteeing every
    /// concept in `keep` survives. Never fails: on any oracle problem the
    /// folded utterance (minus negated topics) is the query.
    pub async fn rewrite(&self, utterance: &str, negated: &[String], keep: &[String]) -> EvocationQuery {
        match self.ask(utterance, negated, keep).await {
            Ok(concepts) => {
                let text = concepts.join(", ");
                tracing::debug!("Evocation query: {}", text);
                EvocationQuery {
                    concepts,
                    text,
                    rewritten: true,
                }
            }
            Err(e) => {
                tracing::warn!("Evocation rewrite failed, searching with the utterance: {:#}", e);
                fallback_query(utterance, negated, keep)
            }
        }
    }

    async fn ask(&self, utterance: &str, negated: &[String], keep: &[String]) -> Result<Vec<String>> {
        let mut prompt = EVOCATION_PROMPT.replace("{max}", &self.max_concepts.to_string());
        if !negated.is_empty() {
            prompt.push_str(&format!("\n\nTemas vetados: {}", negated.join(", ")));
        }
        if !keep.is_empty() {
            prompt.push_str(&format!("\nObjetos que deben aparecer: {}", keep.join(", ")));
        }
        prompt.push_str(&format!("\n\nMensaje:\n\"\"\"{}\"\"\"", utterance));

        let call = self.oracle.generate(&prompt);
        let reply = match self.timeout {
            Some(t) => tokio::time::timeout(t, call)
                .await
                .context("Evocation rewrite timed out")?,
            None => call.await,
        }
        .context("Evocation rewrite call failed")?;

        let concepts = parse_concepts(&reply, negated, keep, self.max_concepts);
        if concepts.is_empty() {
            anyhow::bail!("Evocation rewrite returned no usable concepts: {:?}", reply);
        }
        Ok(concepts)
    }
}

/// Turn the oracle's answer into a clean, capped concept list.
///
/// Negated topics are filtered out even if the model ignored the rule, and
/// `keep` concepts lead the list whether or not the model returned them.
pub fn parse_concepts(reply: &str, negated: &[String], keep: &[String], max: usize) -> Vec<String> {
    let cleaned = strip_code_fences(reply);
    let line = cleaned
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let line = strip_label(line);

    let mut parsed: Vec<String> = Vec::new();
    for raw in line.split([',', ';', '|']) {
        let concept = fold(raw.trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, '"' | '\'' | '-' | '*' | '.' | '[' | ']' | '`')
        }));
        if concept.is_empty() || mentions_any(&concept, negated) || parsed.contains(&concept) {
            continue;
        }
        parsed.push(concept);
    }

    let mut out: Vec<String> = keep.iter().map(|k| fold(k)).collect();
    out.dedup();
    for c in parsed {
        if !out.iter().any(|k| contains_stem(&c, k) || *k == c) {
            out.push(c);
        }
    }
    out.truncate(max.max(1));
    out
}

fn strip_label(line: &str) -> &str {
    if let Some((head, tail)) = line.split_once(':') {
        let head = fold(head.trim());
        if LABELS.iter().any(|l| head.ends_with(l)) {
            return tail.trim();
        }
    }
    line
}

/// Query used when the rewrite fails: the folded utterance with negated
/// topics removed.
pub fn fallback_query(utterance: &str, negated: &[String], keep: &[String]) -> EvocationQuery {
    let kept: Vec<String> = words(utterance)
        .into_iter()
        .filter(|w| !mentions_any(w, negated))
        .collect();
    let mut concepts: Vec<String> = keep.iter().map(|k| fold(k)).collect();
    for w in &kept {
        if !is_stopword(w) && !concepts.contains(w) {
            concepts.push(w.clone());
        }
    }
    EvocationQuery {
        concepts,
        text: kept.join(" "),
        rewritten: false,
    }
}
