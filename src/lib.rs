#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

//! # voice-translate-client
//!
//! The `voice-translate-client` crate is the translation core behind a speak-or-type
//! translation UI: it takes a string, sends it to a public translation endpoint and
//! hands back the translated text.
//!
//!## Features
//! - Normalizes whitespace before anything else, so `"  Hola   mundo "` and
//!   `"Hola mundo"` are the same request.
//! - Caches results per `(source, target, text)` with a size bound and optional TTL.
//! - Splits long input on sentence, then word boundaries and translates the
//!   pieces concurrently.
//! - Caps the number of calls in flight with a fair (FIFO) semaphore.
//! - Retries timeouts, `429` and `5xx` with exponential backoff plus jitter.
//! - Rotates user-agent identities on outbound calls.
//! - Batches short strings into a single call, sending duplicates once.
//!
//! # Current support
//!  - Google Translate web (`translate_a/single`, nested-array responses, no key)
//!  - Google Cloud Translate v2 (structured responses, needs `GOOGLE_API_KEY`)
//!
//! # Usage
//!
//! The crate can read its settings from env variables, a `.env` file in the
//! working directory is loaded first:
//!
//!- **GOOGLE_API_KEY = "xyz"** switches to the cloud endpoint
//!- **TRANSLATE_ENDPOINT**, **TRANSLATE_MAX_CONCURRENCY**, **TRANSLATE_MAX_RETRIES**,
//!  **TRANSLATE_TIMEOUT_MS**, **TRANSLATE_CACHE_SIZE**
//!
//! ## Language codes need to be in [ISO-639](<https://wikipedia.org/wiki/ISO_639>) format
//!
//! ```rust,no_run
//!use voice_translate_client::{Config, TranslationClient};
//!
//!fn main() {
//!    env_logger::init();
//!
//!    let cfg = Config::new()
//!        .max_concurrency(4)
//!        .max_retries(3)
//!        .build()
//!        .unwrap();
//!
//!    let client = TranslationClient::new(cfg).unwrap();
//!
//!    let hello = client.translate("en", "es", "Hola mundo").unwrap();
//!    let many = client
//!        .translate_multiple(&["Hola", "Adiós"], "en", "es")
//!        .unwrap();
//!    let lang = client.detect_language("Bonjour tout le monde").unwrap();
//!
//!    println!("{hello} {many:?} {lang}");
//!}
//! ```
//!

mod api;
mod cache;
mod client;
pub mod config;
mod error;
mod utils;

pub use api::{
    ParsedResponse, RawResponse, Transport, TransportError, UpstreamRequest,
    executor::{CallExecutor, RetryPolicy},
    google_translate::UreqTransport,
    parse_response,
};
pub use cache::ResultCache;
pub use client::{TranslateOptions, TranslationClient};
pub use config::{Config, ConfigError, ResponseFormat};
pub use error::{TranslateError, TranslateResult, TransportFailure};
pub use utils::{
    cache_key,
    cancellation::CancelToken,
    chunker::split as split_into_chunks,
    identity::{DEFAULT_IDENTITIES, IdentityRotator},
    languages::{AUTO_DETECT, LanguageError, normalize_lang},
    normalize_text,
    translation_limiter::{Semaphore, SemaphorePermit},
};
