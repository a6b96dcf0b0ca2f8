//!
//! _Config builder_
//!
//! Helps build the configuration for the translation client
//!

use std::{env, num::NonZeroUsize, str::FromStr, time::Duration};

use thiserror::Error;

use crate::utils::identity::DEFAULT_IDENTITIES;

/// Public web endpoint answering with the nested-array shape
pub const WEB_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
/// Cloud endpoint answering with the structured shape, needs an api key
pub const CLOUD_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

/// Errors for the Config Builder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A numeric limit that must be positive was zero
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
    /// The endpoint is empty
    #[error("endpoint must not be empty")]
    MissingEndpoint,
    /// An environment variable could not be parsed
    #[error("environment variable {name} has invalid value `{value}`")]
    InvalidEnv {
        /// Variable name
        name: &'static str,
        /// Raw value found
        value: String,
    },
}

/// Shape of the upstream response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// `{"translations": [{"translatedText": ...}]}`, optionally wrapped in `data`.
    /// Carries many texts per call.
    Structured,
    /// `[[[fragment, ...], ...], _, detected]`, one text per call
    #[default]
    NestedArray,
}

/// Settings of the translation client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    ///Translation endpoint url
    pub endpoint: String,
    ///Response shape the endpoint answers with
    pub response_format: ResponseFormat,
    ///Api key sent as the `key` query parameter (structured endpoint only)
    pub api_key: Option<String>,
    ///Longest text, in chars, sent in one call. Longer input is chunked
    pub max_chunk_length: usize,
    ///Most texts carried by one combined call
    pub max_batch_size: usize,
    ///Most upstream calls in flight at once
    pub max_concurrency: usize,
    ///Retries after the first attempt
    pub max_retries: u32,
    ///Backoff before the first retry; doubles for every further retry
    pub base_delay: Duration,
    ///Upper bound (exclusive) of the random jitter added to each backoff
    pub jitter_ceiling: Duration,
    ///Budget of a single attempt
    pub request_timeout: Duration,
    ///Most entries kept in the result cache
    pub cache_max_size: usize,
    ///Age after which a cached translation is ignored. `None` keeps it forever
    pub cache_ttl: Option<Duration>,
    ///Identity strings rotated through the `User-Agent` header
    pub identities: Vec<String>,
    ///Set outbound identity headers. Off for contexts that cannot set headers
    pub send_identity_headers: bool,
    ///Map language codes onto supported ones before calling
    pub normalize_languages: bool,
    ///Target language used for detection calls
    pub detect_target_lang: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Return the defaults for the config
    pub fn new() -> Self {
        Self {
            endpoint: WEB_ENDPOINT.to_string(),
            response_format: ResponseFormat::NestedArray,
            api_key: None,
            max_chunk_length: 5000,
            max_batch_size: 120,
            max_concurrency: 4,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            jitter_ceiling: Duration::from_millis(250),
            request_timeout: Duration::from_secs(8),
            cache_max_size: 500,
            cache_ttl: Some(Duration::from_secs(60 * 60)),
            identities: DEFAULT_IDENTITIES.iter().map(|s| s.to_string()).collect(),
            send_identity_headers: true,
            normalize_languages: true,
            detect_target_lang: "en".to_string(),
        }
    }

    /// Defaults overridden from the environment.
    ///
    /// Loads a `.env` file first, if there is one.
    ///
    /// _Environment Variables:_
    ///- GOOGLE_API_KEY="xxx" switches to the cloud endpoint
    ///- TRANSLATE_ENDPOINT
    ///- TRANSLATE_MAX_CONCURRENCY
    ///- TRANSLATE_MAX_RETRIES
    ///- TRANSLATE_TIMEOUT_MS
    ///- TRANSLATE_CACHE_SIZE
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = Self::new();

        if let Ok(key) = env::var("GOOGLE_API_KEY")
            && !key.is_empty()
        {
            config
                .endpoint(CLOUD_ENDPOINT)
                .response_format(ResponseFormat::Structured)
                .api_key(key);
        }
        if let Ok(endpoint) = env::var("TRANSLATE_ENDPOINT")
            && !endpoint.is_empty()
        {
            config.endpoint(endpoint);
        }
        if let Some(n) = parse_env("TRANSLATE_MAX_CONCURRENCY")? {
            config.max_concurrency(n);
        }
        if let Some(n) = parse_env("TRANSLATE_MAX_RETRIES")? {
            config.max_retries(n);
        }
        if let Some(ms) = parse_env("TRANSLATE_TIMEOUT_MS")? {
            config.request_timeout(Duration::from_millis(ms));
        }
        if let Some(n) = parse_env("TRANSLATE_CACHE_SIZE")? {
            config.cache_max_size(n);
        }

        config.build()
    }

    /// Translation endpoint
    pub fn endpoint<S: Into<String>>(&mut self, url: S) -> &mut Self {
        self.endpoint = url.into();
        self
    }

    /// Response shape of the endpoint
    pub fn response_format(&mut self, format: ResponseFormat) -> &mut Self {
        self.response_format = format;
        self
    }

    /// Api key for the structured endpoint
    pub fn api_key<S: Into<String>>(&mut self, key: S) -> &mut Self {
        self.api_key = Some(key.into());
        self
    }

    /// Longest text sent in one call
    pub fn max_chunk_length(&mut self, chars: usize) -> &mut Self {
        self.max_chunk_length = chars;
        self
    }

    /// Most texts in one combined call
    pub fn max_batch_size(&mut self, texts: usize) -> &mut Self {
        self.max_batch_size = texts;
        self
    }

    /// Most calls in flight
    pub fn max_concurrency(&mut self, calls: usize) -> &mut Self {
        self.max_concurrency = calls;
        self
    }

    /// Retries after the first attempt
    pub fn max_retries(&mut self, retries: u32) -> &mut Self {
        self.max_retries = retries;
        self
    }

    /// Base backoff and jitter ceiling
    pub fn backoff(&mut self, base_delay: Duration, jitter_ceiling: Duration) -> &mut Self {
        self.base_delay = base_delay;
        self.jitter_ceiling = jitter_ceiling;
        self
    }

    /// Budget of one attempt
    pub fn request_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.request_timeout = timeout;
        self
    }

    /// Cache capacity
    pub fn cache_max_size(&mut self, entries: usize) -> &mut Self {
        self.cache_max_size = entries;
        self
    }

    /// Cache expiry, `None` to keep entries until evicted
    pub fn cache_ttl(&mut self, ttl: Option<Duration>) -> &mut Self {
        self.cache_ttl = ttl;
        self
    }

    /// Replace the identity pool
    pub fn identities<S: Into<String>>(&mut self, pool: Vec<S>) -> &mut Self {
        self.identities = pool.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Whether outbound identity headers are set
    pub fn send_identity_headers(&mut self, send: bool) -> &mut Self {
        self.send_identity_headers = send;
        self
    }

    /// Whether language codes are normalized
    pub fn normalize_languages(&mut self, normalize: bool) -> &mut Self {
        self.normalize_languages = normalize;
        self
    }

    /// Target language of detection calls
    pub fn detect_target_lang<S: Into<String>>(&mut self, lang: S) -> &mut Self {
        self.detect_target_lang = lang.into();
        self
    }

    /// Validate and build the config
    pub fn build(&self) -> Result<Self, ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        for (name, value) in [
            ("max_chunk_length", self.max_chunk_length),
            ("max_batch_size", self.max_batch_size),
            ("max_concurrency", self.max_concurrency),
            ("cache_max_size", self.cache_max_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        Ok(self.clone())
    }

    pub(crate) fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.cache_max_size).unwrap_or(NonZeroUsize::MIN)
    }
}

fn parse_env<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let cfg = Config::new().build().unwrap();
        assert_eq!(cfg.response_format, ResponseFormat::NestedArray);
        assert_eq!(cfg.endpoint, WEB_ENDPOINT);
        assert_eq!(cfg.identities.len(), DEFAULT_IDENTITIES.len());
    }

    #[test]
    fn builder_chains() {
        let cfg = Config::new()
            .response_format(ResponseFormat::Structured)
            .endpoint("http://127.0.0.1:5001/translate")
            .max_concurrency(2)
            .max_retries(5)
            .backoff(Duration::from_millis(10), Duration::ZERO)
            .cache_ttl(None)
            .build()
            .unwrap();

        assert_eq!(cfg.response_format, ResponseFormat::Structured);
        assert_eq!(cfg.max_concurrency, 2);
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.base_delay, Duration::from_millis(10));
        assert_eq!(cfg.cache_ttl, None);
    }

    #[test]
    fn zero_limits_are_rejected() {
        assert_eq!(
            Config::new().max_concurrency(0).build(),
            Err(ConfigError::Zero("max_concurrency"))
        );
        assert_eq!(
            Config::new().cache_max_size(0).build(),
            Err(ConfigError::Zero("cache_max_size"))
        );
        assert_eq!(
            Config::new().endpoint(" ").build(),
            Err(ConfigError::MissingEndpoint)
        );
    }
}
