use std::fmt::Debug;

use html_escape::decode_html_entities;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ResponseFormat;

pub mod executor;
pub mod google_translate;

#[cfg(test)]
pub(crate) mod testing;

/// One logical upstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    /// Source language code, `auto` to let the upstream detect it
    pub source_lang: String,
    /// Target language code
    pub target_lang: String,
    /// Texts to translate, in order
    pub texts: Vec<String>,
}

impl UpstreamRequest {
    /// Request carrying a single text
    pub fn single(source_lang: &str, target_lang: &str, text: &str) -> Self {
        Self::batch(source_lang, target_lang, vec![text.to_string()])
    }

    /// Request carrying several texts
    pub fn batch(source_lang: &str, target_lang: &str, texts: Vec<String>) -> Self {
        Self {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            texts,
        }
    }
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl RawResponse {
    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure to complete an HTTP exchange at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The attempt ran past its timeout
    Timeout,
    /// Any other connection-level failure
    Network(String),
}

/// Sends one attempt of an upstream call.
///
/// Implementations must not retry; the executor owns retries.
pub trait Transport: Send + Sync + Debug {
    /// Perform the exchange, attaching `headers` when possible
    fn send(
        &self,
        request: &UpstreamRequest,
        headers: &[(String, String)],
    ) -> Result<RawResponse, TransportError>;
}

/// Decoded upstream response, one variant per supported shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    /// One translation per requested text
    Structured {
        /// Translations in request order
        translations: Vec<String>,
        /// Language detected for the first text, if reported
        detected_language: Option<String>,
    },
    /// Sentence fragments of a single translation
    NestedArray {
        /// Fragments in order
        fragments: Vec<String>,
        /// Language detected by the upstream, if reported
        detected_language: Option<String>,
    },
}

impl ParsedResponse {
    /// Translations in request order
    pub fn into_translations(self) -> Vec<String> {
        match self {
            ParsedResponse::Structured { translations, .. } => translations,
            ParsedResponse::NestedArray { fragments, .. } => vec![fragments.join(" ")],
        }
    }

    /// Language detected by the upstream
    pub fn detected_language(&self) -> Option<&str> {
        match self {
            ParsedResponse::Structured {
                detected_language, ..
            }
            | ParsedResponse::NestedArray {
                detected_language, ..
            } => detected_language.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
    #[serde(default)]
    detected_source_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Data {
    translations: Vec<Translation>,
}

/// Parse a 2xx body in the configured shape.
///
/// The error string says what was missing; the executor turns it into a
/// malformed-response error.
pub fn parse_response(format: ResponseFormat, body: &str) -> Result<ParsedResponse, String> {
    match format {
        ResponseFormat::Structured => parse_structured(body),
        ResponseFormat::NestedArray => parse_nested_array(body),
    }
}

fn parse_structured(body: &str) -> Result<ParsedResponse, String> {
    let mut parsed: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;

    // serde would read a struct from a sequence, so only objects get that far
    let object = parsed.get_mut("data").map(Value::take).unwrap_or(parsed);
    if !object.is_object() {
        return Err("expected an object with a `translations` list".to_string());
    }
    let data = Data::deserialize(object).map_err(|e| e.to_string())?;

    let detected_language = data
        .translations
        .first()
        .and_then(|t| t.detected_source_language.clone());

    let translations = data
        .translations
        .into_iter()
        .map(|t| decode(&t.translated_text))
        .collect();

    Ok(ParsedResponse::Structured {
        translations,
        detected_language,
    })
}

fn parse_nested_array(body: &str) -> Result<ParsedResponse, String> {
    let parsed: Value = serde_json::from_str(body).map_err(|e| e.to_string())?;

    let sentences = parsed
        .get(0)
        .and_then(Value::as_array)
        .ok_or("expected an array of sentences at position 0")?;

    // entries without a string head carry transliterations, not text
    let fragments: Vec<String> = sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
        .map(decode)
        .filter(|fragment| !fragment.is_empty())
        .collect();

    if fragments.is_empty() {
        return Err("no translated fragments in response".to_string());
    }

    let detected_language = parsed.get(2).and_then(Value::as_str).map(str::to_string);

    Ok(ParsedResponse::NestedArray {
        fragments,
        detected_language,
    })
}

fn decode(text: &str) -> String {
    decode_html_entities(text).trim().to_string()
}
