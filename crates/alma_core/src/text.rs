//! Case- and accent-insensitive text helpers shared by the keyword classifiers.
//!
//! Users mix Spanish and English and type accents inconsistently
//! ("abandonó" / "abandono"), so every comparison runs on folded text.

/// Lowercase and strip the diacritics that show up in Spanish, Portuguese,
/// French and German input. Characters outside that set pass through.
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Folded alphanumeric words of `text`, in order.
pub fn words(text: &str) -> Vec<String> {
    fold(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whole-word (or whole-phrase) containment on folded text.
///
/// `needle` may contain spaces; it must start and end on word boundaries.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    let hay = fold(haystack);
    let needle = fold(needle.trim());
    if needle.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(pos) = hay[start..].find(&needle) {
        let begin = start + pos;
        let end = begin + needle.len();
        let before_ok = hay[..begin]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = hay[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = begin + needle.chars().next().map_or(1, char::len_utf8);
    }
    false
}

/// Prefix match on folded words, so a stem like "abandon" catches
/// "abandonó", "abandonado", "abandoned".
pub fn contains_stem(haystack: &str, stem: &str) -> bool {
    let stem = fold(stem.trim());
    if stem.is_empty() {
        return false;
    }
    if stem.contains(' ') {
        return contains_word(haystack, &stem);
    }
    words(haystack).iter().any(|w| w.starts_with(&stem))
}

/// Every entry of `stems` that occurs in `text` (see [`contains_stem`]).
pub fn matching_stems<'a>(text: &str, stems: &[&'a str]) -> Vec<&'a str> {
    stems
        .iter()
        .copied()
        .filter(|s| contains_stem(text, s))
        .collect()
}

pub fn contains_any_stem(text: &str, stems: &[&str]) -> bool {
    stems.iter().any(|s| contains_stem(text, s))
}

/// Truncate to at most `max_chars` characters, appending an ellipsis if cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_accents_and_case() {
        assert_eq!(fold("Mi PADRE me abandonó"), "mi padre me abandono");
        assert_eq!(fold("Ñoño"), "nono");
    }

    #[test]
    fn test_contains_word_respects_boundaries() {
        assert!(contains_word("Hablé con Ana ayer", "ana"));
        assert!(!contains_word("Hablé con Mariana ayer", "ana"));
        assert!(contains_word("¿Y JOSÉ?", "jose"));
        assert!(contains_word("fui con mi ex novia", "ex novia"));
    }

    #[test]
    fn test_contains_stem_prefix() {
        assert!(contains_stem("me abandonaron", "abandon"));
        assert!(contains_stem("I was abandoned", "abandon"));
        assert!(!contains_stem("bandoneón", "abandon"));
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("canción", 4), "canc…");
        assert_eq!(truncate_chars("hola", 10), "hola");
    }
}
