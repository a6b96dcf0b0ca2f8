/// All language codes supported by Google Translate
const GOOGLE_TRANSLATE_LANG_CODES: [&str; 198] = [
    "ab", "ace", "ach", "af", "sq", "alz", "am", "ar", "hy", "as", "awa", "ay", "az", "ban", "bm",
    "ba", "eu", "btx", "bts", "bbc", "be", "bem", "bn", "bew", "bho", "bik", "bs", "br", "bg",
    "bua", "yue", "ca", "ceb", "ny", "zh-CN", "zh", "zh-TW", "cv", "co", "crh", "hr", "cs", "da",
    "din", "dv", "doi", "dov", "nl", "dz", "en", "eo", "es", "et", "ee", "fj", "fil", "tl", "fi",
    "fr", "fr-FR", "fr-CA", "fy", "ff", "gaa", "gl", "lg", "ka", "de", "el", "gn", "gu", "ht",
    "cnh", "ha", "haw", "iw", "he", "hil", "hi", "hmn", "hu", "hrx", "is", "ig", "ilo", "id", "ga",
    "it", "ja", "jw", "jv", "kn", "pam", "kk", "km", "cgg", "rw", "ktu", "gom", "ko", "kri", "ku",
    "ckb", "ky", "lo", "ltg", "la", "lv", "lij", "li", "ln", "lt", "lmo", "luo", "lb", "mk", "mai",
    "mak", "mg", "ms", "ms-Arab", "ml", "mt", "mi", "mr", "chm", "mni-Mtei", "min", "lus", "mn",
    "my", "nr", "new", "ne", "nso", "no", "nus", "oc", "or", "om", "pag", "pap", "ps", "fa", "pl",
    "pt", "pt-PT", "pt-BR", "pa", "pa-Arab", "qu", "rom", "ro", "rn", "ru", "sm", "sg", "sa", "gd",
    "sr", "st", "crs", "shn", "sn", "scn", "szl", "sd", "si", "sk", "sl", "so", "su", "sw", "ss",
    "sv", "tg", "ta", "tt", "te", "tet", "th", "ti", "ts", "tn", "tr", "tk", "ak", "uk", "ur", "ug",
    "uz", "vi", "cy", "xh", "yi", "yo", "yua", "zu",
];

/// Source code asking the upstream to detect the language itself
pub const AUTO_DETECT: &str = "auto";

use thiserror::Error;

/// Language code rejected by the normalizer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LanguageError {
    /// Neither the code nor its primary subtag is supported
    #[error("the language `{0}` is not supported")]
    Unsupported(String),
}

/// Map a language code onto one the upstream accepts.
///
/// Exact matches pass through. Otherwise the primary subtag is looked up,
/// eg: `en-US` -> `en`, `zh-HK` -> `zh-CN`.
pub fn normalize_lang(lang_code: &str) -> Result<String, LanguageError> {
    let code = lang_code.trim();
    if code.eq_ignore_ascii_case(AUTO_DETECT) {
        return Ok(AUTO_DETECT.to_string());
    }

    if GOOGLE_TRANSLATE_LANG_CODES.contains(&code) {
        return Ok(code.to_string());
    }

    let primary = code
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase();

    if primary.is_empty() {
        return Err(LanguageError::Unsupported(lang_code.to_string()));
    }

    let region_prefix = format!("{primary}-");
    GOOGLE_TRANSLATE_LANG_CODES
        .iter()
        .find(|c| **c == primary || c.starts_with(&region_prefix))
        .map(|c| c.to_string())
        .ok_or_else(|| LanguageError::Unsupported(lang_code.to_string()))
}
