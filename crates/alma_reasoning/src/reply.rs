//! Oracle reply parsing.
//!
//! The model is asked for a six-field JSON object, and it mostly complies.
//! When it doesn't, the public text is recovered through progressively
//! looser layers:
//!
//! 1. strip BOM and markdown fences
//! 2. decode the first balanced JSON object, keep `public_response`
//! 3. regex `public_response` out of malformed JSON
//! 4. plain text, minus the private value and any object residue around it
//!
//! Once a layer recognizes the reply fields, its answer stands, even when the
//! public text is empty.
//!
//! Whatever path wins, `inner_monologue` never leaves this module.

use alma_core::json::{find_json_object, strip_code_fences};
use alma_core::RelationshipDelta;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::sync::LazyLock;

/// Name of the private field. Lines mentioning it never reach the user.
pub const PRIVATE_FIELD: &str = "inner_monologue";
pub const PUBLIC_FIELD: &str = "public_response";

static RE_PUBLIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""public_response"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap()
});

/// The private value, up to its closing quote or the end of the text.
static RE_PRIVATE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)"inner_monologue"\s*:\s*"(?:[^"\\]|\\.)*(?:"|\z)"#).unwrap()
});

/// Output cut off inside the public string.
static RE_PUBLIC_TRUNCATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"public_response"\s*:\s*"(.+)$"#).unwrap()
});

/// The structured reply the final prompt asks for.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OracleReply {
    #[serde(default, deserialize_with = "lenient_string")]
    pub inner_monologue: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub public_response: String,
    #[serde(default, deserialize_with = "lenient_f32")]
    pub trust_delta: f32,
    #[serde(default, deserialize_with = "lenient_f32")]
    pub intimacy_delta: f32,
    #[serde(default, deserialize_with = "lenient_f32")]
    pub respect_delta: f32,
    #[serde(default, deserialize_with = "lenient_string")]
    pub new_state: String,
}

impl OracleReply {
    pub fn delta(&self) -> RelationshipDelta {
        RelationshipDelta {
            trust: self.trust_delta,
            intimacy: self.intimacy_delta,
            respect: self.respect_delta,
        }
    }
}

/// Strings, numbers, objects... anything but null becomes text.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Numbers or numeric strings ("+5"); anything else is 0.
fn lenient_f32<'de, D: Deserializer<'de>>(d: D) -> Result<f32, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0) as f32,
        serde_json::Value::String(s) => s.trim().trim_start_matches('+').parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

/// The full structured reply, when layer 2 decodes.
pub fn parse_structured(raw: &str) -> Option<OracleReply> {
    let cleaned = strip_code_fences(raw);
    let object = find_json_object(&cleaned)?;
    serde_json::from_str(object).ok()
}

/// Public text of a reply and whether any layer produced some.
pub fn parse_reply(raw: &str) -> (String, bool) {
    let text = scrub(&extract_public(raw));
    let ok = !text.is_empty();
    (text, ok)
}

fn extract_public(raw: &str) -> String {
    let cleaned = strip_code_fences(raw);

    if let Some(public) = structured_or_regex(&cleaned) {
        return public;
    }

    // The whole object was serialized into a string: \"public_response\": \"...\"
    if cleaned.contains(r#"\"public_response\""#) {
        if let Some(public) = structured_or_regex(&unescape_json(&cleaned)) {
            return public;
        }
    }

    if !RE_PUBLIC.is_match(&cleaned) {
        if let Some(c) = RE_PUBLIC_TRUNCATED.captures(&cleaned) {
            let public = unescape_json(c[1].trim_end_matches(['"', '}', '\n', ' ']));
            if !public.trim().is_empty() {
                return public.trim().to_string();
            }
        }
    }

    match strip_private(&cleaned) {
        Some(residue) => plain_text(&residue),
        None => plain_text(&cleaned),
    }
}

/// Layers 2 and 3 over one candidate text. `Some("")` means the reply was
/// recognized and its public text is empty.
fn structured_or_regex(text: &str) -> Option<String> {
    if let Some(value) = find_json_object(text)
        .and_then(|object| serde_json::from_str::<serde_json::Value>(object).ok())
    {
        let recognized = value.get(PUBLIC_FIELD).is_some() || value.get(PRIVATE_FIELD).is_some();
        if recognized {
            if let Ok(reply) = serde_json::from_value::<OracleReply>(value) {
                return Some(reply.public_response.trim().to_string());
            }
        }
    }

    let c = RE_PUBLIC.captures(text)?;
    let mut public = unescape_json(&c[1]);
    if public.contains("\\n") || public.contains("\\\"") {
        public = unescape_json(&public);
    }
    Some(public.trim().to_string())
}

/// Cut every private value out of `text`. When one was found, whatever is
/// left inside braces is the rest of the object, not prose.
fn strip_private(text: &str) -> Option<String> {
    if !RE_PRIVATE_VALUE.is_match(text) {
        return None;
    }
    Some(drop_object_residue(&RE_PRIVATE_VALUE.replace_all(text, "")))
}

fn drop_object_residue(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn plain_text(text: &str) -> String {
    text.lines()
        .filter(|l| !mentions_private(l))
        .filter(|l| !l.trim().chars().all(|c| matches!(c, '{' | '}' | '[' | ']' | ',')) || l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Last line of defence: drop any line that still names the private field.
fn scrub(text: &str) -> String {
    if !mentions_private(text) {
        return text.trim().to_string();
    }
    text.lines()
        .filter(|l| !mentions_private(l))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn mentions_private(text: &str) -> bool {
    text.to_lowercase().contains(PRIVATE_FIELD)
}

/// Decode JSON string escapes. Unknown escapes are kept verbatim.
pub fn unescape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_json() {
        let (text, ok) = parse_reply(r#"{"inner_monologue":"secret","public_response":"hola"}"#);
        assert_eq!(text, "hola");
        assert!(ok);
    }

    #[test]
    fn test_fenced_json_with_prose() {
        let raw = "```json\n{\"inner_monologue\": \"no le digas {nada}\", \"public_response\": \"¡Qué bueno verte!\", \"trust_delta\": 2}\n```";
        assert_eq!(parse_reply(raw).0, "¡Qué bueno verte!");
    }

    #[test]
    fn test_malformed_json_regex_path() {
        // Trailing comma and a missing brace
        let raw = r#"{"inner_monologue": "secret", "public_response": "Te extrañé.\nMucho.", "trust_delta": 1,"#;
        let (text, ok) = parse_reply(raw);
        assert_eq!(text, "Te extrañé.\nMucho.");
        assert!(ok);
    }

    #[test]
    fn test_doubly_escaped_json() {
        let raw = r#""{\"inner_monologue\": \"secret\", \"public_response\": \"dijo \\\"adiós\\\"\"}""#;
        let (text, _) = parse_reply(raw);
        assert_eq!(text, "dijo \"adiós\"");
        assert!(!text.contains("secret"));
    }

    #[test]
    fn test_truncated_public_string() {
        let raw = r#"{"inner_monologue": "x", "public_response": "Estoy aquí, cuéntame"#;
        assert_eq!(parse_reply(raw).0, "Estoy aquí, cuéntame");
    }

    #[test]
    fn test_plain_text_strips_private_lines() {
        let raw = "inner_monologue: me cae mal\nClaro, te escucho.";
        assert_eq!(parse_reply(raw), ("Claro, te escucho.".to_string(), true));
    }

    #[test]
    fn test_only_private_field_is_not_ok() {
        let (text, ok) = parse_reply(r#"{"inner_monologue": "secret"}"#);
        assert!(text.is_empty());
        assert!(!ok);
        assert!(!parse_reply("   ").1);
    }

    #[test]
    fn test_multiline_private_value_without_public_field() {
        let (text, ok) = parse_reply("{\"inner_monologue\": \"Lo odio.\nNo soporto su voz.\"}");
        assert_eq!(text, "");
        assert!(!ok);

        let raw = "{\"inner_monologue\": \"Lo odio.\nNo soporto su voz.\", \"trust_delta\": -4}";
        assert_eq!(parse_reply(raw), (String::new(), false));
    }

    #[test]
    fn test_multiline_private_value_cut_off() {
        let raw = "Vale.\n{\"inner_monologue\": \"Lo odio.\nNo soporto";
        assert_eq!(parse_reply(raw), ("Vale.".to_string(), true));
    }

    #[test]
    fn test_multiline_private_value_before_public() {
        let raw = "{\"inner_monologue\": \"Lo odio.\nNo soporto su voz.\", \"public_response\": \"Claro, dime.\"}";
        assert_eq!(parse_reply(raw).0, "Claro, dime.");
    }

    #[test]
    fn test_empty_public_field_is_not_ok() {
        let raw = "{\n  \"inner_monologue\": \"secreto\",\n  \"public_response\": \"\",\n  \"trust_delta\": -3,\n  \"new_state\": \"fria\"\n}";
        assert_eq!(parse_reply(raw), (String::new(), false));

        // Same reply, malformed by a trailing comma
        let raw = "{\n  \"inner_monologue\": \"secreto\",\n  \"public_response\": \"\",\n  \"trust_delta\": -3,\n";
        assert_eq!(parse_reply(raw), (String::new(), false));
    }

    #[test]
    fn test_unrelated_object_falls_back_to_text() {
        let (text, ok) = parse_reply(r#"Claro. {"mood": "bien"}"#);
        assert!(ok);
        assert!(text.starts_with("Claro."));
    }

    #[test]
    fn test_structured_deltas_are_lenient() {
        let r = parse_structured(
            r#"{"public_response":"ok","trust_delta":"+5","intimacy_delta":-3.5,"respect_delta":null,"new_state":{"mood":"calm"}}"#,
        )
        .unwrap();
        assert_eq!(r.trust_delta, 5.0);
        assert_eq!(r.intimacy_delta, -3.5);
        assert_eq!(r.respect_delta, 0.0);
        assert!(r.new_state.contains("calm"));
        assert!(!r.delta().is_zero());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_json(r#"a\nb\t\"c\" á \q"#), "a\nb\t\"c\" á \\q");
    }
}
