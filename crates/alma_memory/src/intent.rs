//! Keyword heuristics over the user's utterance.
//!
//! These stand in for real intent classification. Each one is a pure function
//! of the text; [`IntentClassifier`] is the seam where a learned model can
//! replace the keyword tables without touching retrieval.
//!
//! All matching runs on folded text (lowercase, accents stripped) and on word
//! prefixes, so "abandonó", "abandonado" and "abandoned" all hit `abandon`.

use alma_core::text::{contains_any_stem, contains_word, fold, matching_stems};
use regex::Regex;
use std::sync::LazyLock;

// ============================================================================
// Keyword tables
// ============================================================================

/// Wanting or craving something.
const COMFORT_MARKERS: &[&str] = &[
    "quiero", "quisiera", "me apetece", "se me antoja", "antoj", "ganas de", "me encant",
    "necesito un", "necesito una", "want", "wanna", "craving", "crave", "i feel like",
];

/// Harmless objects of desire.
const BENIGN_OBJECTS: &[&str] = &[
    "pizza", "helado", "chocolate", "cafe", "pelicula", "serie", "musica", "cancion", "paseo",
    "pasear", "playa", "taco", "hamburguesa", "pastel", "galleta", "abrazo", "siesta",
    "videojuego", "libro", "sushi", "ice cream", "coffee", "movie", "music", "song", "walk",
    "beach", "cake", "cookie", "hug", "nap", "book", "burger",
];

/// Loss, abandonment, loneliness, harm.
const TRAUMA_MARKERS: &[&str] = &[
    "abandon", "soledad", "lonely", "alone", "muri", "muerte", "muerto", "golpe", "pegaba",
    "maltrat", "abus", "trauma", "traicion", "traicio", "engano", "engana", "divorci", "llor",
    "deprim", "ansiedad", "miedo", "dolor", "triste", "no vino", "me dejo", "me dejaron",
    "nunca volvio", "died", "death", "betray", "cheat", "hurt", "depress", "scared", "grief",
    "funeral", "hospital", "left me",
];

/// Trauma words too short to match as prefixes ("cry" is not "crystal").
const TRAUMA_WORDS: &[&str] = &[
    "solo", "sola", "perdi", "perdio", "perdimos", "perdida", "perdido", "cry", "cried", "cries",
    "crying",
];

/// Open conflict: fights, insults, anger.
const CONFLICT_MARKERS: &[&str] = &[
    "pelea", "pele", "discusi", "discut", "grit", "insult", "odio", "enfad", "enoj", "furi",
    "rabia", "conflict", "fight", "argu", "yell", "angry", "hate",
];

/// Emotion categories that count as conflict when stored on a memory.
const CONFLICT_CATEGORIES: &[&str] = &[
    "IRA", "ENOJO", "RABIA", "CONFLICTO", "DESPRECIO", "CELOS", "ASCO", "ANGER", "CONFLICT",
    "CONTEMPT", "JEALOUSY", "DISGUST",
];

/// Words dropped from a negated topic and from fallback queries.
const STOPWORDS: &[&str] = &[
    "el", "la", "los", "las", "un", "una", "unos", "unas", "mi", "mis", "tu", "tus", "su", "sus",
    "de", "del", "al", "a", "en", "con", "por", "para", "que", "y", "o", "me", "te", "se", "lo",
    "le", "es", "eso", "esto", "ya", "muy", "the", "a", "an", "my", "your", "of", "to", "and",
    "or", "in", "on", "with", "is", "it", "that", "this", "i", "yo", "aunque", "pero", "but",
];

/// Words that end a negated topic phrase.
const TOPIC_BREAKERS: &[&str] = &["y", "pero", "porque", "que", "aunque", "and", "but", "because"];

static RE_NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:no quiero hablar (?:de|sobre)|no me hables (?:de|sobre)|no hablemos (?:de|sobre)|prefiero no hablar (?:de|sobre)|ni me menciones|no (?:me )?menciones|don'?t want to talk about|do not want to talk about|let'?s not talk about|don'?t mention|do not mention|stop talking about)\s+([^.,;:!?¡¿\n]+)",
    )
    .unwrap()
});

// ============================================================================
// Pure classifiers
// ============================================================================

/// Coarse intent of an utterance, used to protect harmless cravings from
/// surfacing traumatic memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentClass {
    /// A comfort marker together with a benign object ("quiero pizza").
    /// Wins over any co-occurring distress words.
    BenignDesire,
    /// A benign marker together with a trauma marker, without a full craving.
    Mixed,
    Neutral,
}

impl IntentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentClass::BenignDesire => "benign_desire",
            IntentClass::Mixed => "mixed",
            IntentClass::Neutral => "neutral",
        }
    }
}

pub fn classify_intent(text: &str) -> IntentClass {
    let comfort = contains_any_stem(text, COMFORT_MARKERS);
    let object = contains_any_stem(text, BENIGN_OBJECTS);
    if comfort && object {
        return IntentClass::BenignDesire;
    }
    if (comfort || object) && is_traumatic(text) {
        return IntentClass::Mixed;
    }
    IntentClass::Neutral
}

/// Benign objects named in `text`, in table order.
pub fn benign_objects(text: &str) -> Vec<&'static str> {
    matching_stems(text, BENIGN_OBJECTS)
}

pub fn is_traumatic(text: &str) -> bool {
    contains_any_stem(text, TRAUMA_MARKERS) || TRAUMA_WORDS.iter().any(|w| contains_word(text, w))
}

pub fn is_conflict(text: &str) -> bool {
    contains_any_stem(text, CONFLICT_MARKERS)
}

pub fn is_conflict_category(category: &str) -> bool {
    let c = fold(category.trim()).to_uppercase();
    CONFLICT_CATEGORIES.iter().any(|k| c == *k)
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Topics the user explicitly asked not to talk about, as folded content words.
///
/// "no quiero hablar de mi padre, pero sí de pizza" → `["padre"]`.
pub fn negated_topics(text: &str) -> Vec<String> {
    let folded = fold(text);
    let mut topics = Vec::new();
    for caps in RE_NEGATION.captures_iter(&folded) {
        let phrase = caps.get(1).map_or("", |m| m.as_str());
        let mut taken = 0;
        for word in phrase
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            if TOPIC_BREAKERS.contains(&word) {
                break;
            }
            if is_stopword(word) {
                continue;
            }
            if !topics.iter().any(|t| t == word) {
                topics.push(word.to_string());
            }
            taken += 1;
            if taken == 3 {
                break;
            }
        }
    }
    topics
}

/// Whether `text` touches any of the negated topics.
pub fn mentions_any(text: &str, topics: &[String]) -> bool {
    let stems: Vec<&str> = topics.iter().map(String::as_str).collect();
    contains_any_stem(text, &stems)
}

// ============================================================================
// Classifier seam
// ============================================================================

/// Text heuristics the retriever depends on.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> IntentClass;
    fn benign_objects(&self, text: &str) -> Vec<String>;
    fn negated_topics(&self, text: &str) -> Vec<String>;
    fn is_traumatic(&self, text: &str) -> bool;
    fn is_conflict(&self, text: &str) -> bool;
}

/// Keyword-table implementation of [`IntentClassifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> IntentClass {
        classify_intent(text)
    }

    fn benign_objects(&self, text: &str) -> Vec<String> {
        benign_objects(text).into_iter().map(str::to_string).collect()
    }

    fn negated_topics(&self, text: &str) -> Vec<String> {
        negated_topics(text)
    }

    fn is_traumatic(&self, text: &str) -> bool {
        is_traumatic(text)
    }

    fn is_conflict(&self, text: &str) -> bool {
        is_conflict(text)
    }
}
