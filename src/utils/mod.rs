pub mod cancellation;
pub mod chunker;
pub mod identity;
pub mod languages;
pub mod translation_limiter;

/// Separator between the parts of a cache key; never appears in a language code
const KEY_SEPARATOR: char = '|';

/// Trim the text and collapse every internal whitespace run to one space
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cache key identifying one translation request
pub fn cache_key(source_lang: &str, target_lang: &str, normalized_text: &str) -> String {
    format!("{source_lang}{KEY_SEPARATOR}{target_lang}{KEY_SEPARATOR}{normalized_text}")
}

#[test]
fn test_normalize_text() {
    assert_eq!(normalize_text("  Hola   mundo "), "Hola mundo");
    assert_eq!(normalize_text("line\n\tbreak\r\n end"), "line break end");
    assert_eq!(normalize_text(" \t\n "), "");
    assert_eq!(normalize_text(""), "");
}

#[test]
fn test_cache_key() {
    assert_eq!(cache_key("es", "en", "Hola mundo"), "es|en|Hola mundo");
    assert_ne!(cache_key("es", "en", "Hola"), cache_key("en", "es", "Hola"));
}
