use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, ScopedJoinHandle},
};

use log::{debug, info};

use crate::{
    api::{Transport, UpstreamRequest, executor::CallExecutor, google_translate::UreqTransport},
    cache::ResultCache,
    config::{Config, ConfigError, ResponseFormat},
    error::{TranslateError, TranslateResult},
    utils::{
        cache_key,
        cancellation::CancelToken,
        chunker,
        identity::IdentityRotator,
        languages::{AUTO_DETECT, normalize_lang},
        normalize_text,
        translation_limiter::Semaphore,
    },
};

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Abort signal; a cancelled request ends with [`TranslateError::Cancelled`].
    ///
    /// The signal is seen between attempts, while waiting for a permit and
    /// while backing off. An HTTP call already on the wire is not
    /// interrupted: it keeps its permit until the response or
    /// the configured `request_timeout` arrives, then its result is discarded.
    /// Lower the timeout if a cancelled UI must free its slots sooner.
    pub cancel: Option<CancelToken>,
}

impl TranslateOptions {
    /// Options carrying `token` as the abort signal
    pub fn with_cancel(token: CancelToken) -> Self {
        Self {
            cancel: Some(token),
        }
    }
}

/// Unique short text waiting for a combined call, with every index it fills
type PendingText = (String, Vec<usize>);

/// Unit of work handed to the worker pool during a batch
enum BatchJob<'a> {
    Group(&'a [PendingText]),
    Chunk(&'a str),
}

/// Public entry point: normalizes, caches, chunks, and calls the upstream.
///
/// The client is `Sync`; share one behind an `Arc` so every caller goes
/// through the same cache, limiter and identity pool.
#[derive(Debug)]
pub struct TranslationClient {
    config: Config,
    cache: Arc<ResultCache>,
    executor: CallExecutor,
}

impl TranslationClient {
    /// Client talking HTTP to the configured endpoint
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let config = config.build()?;
        let transport = Arc::new(UreqTransport::new(&config));
        Self::with_transport(config, transport)
    }

    /// Client over a caller-supplied transport
    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let config = config.build()?;
        let cache = Arc::new(ResultCache::new(config.cache_capacity(), config.cache_ttl));
        let limiter = Arc::new(Semaphore::new(config.max_concurrency));
        let rotator = Arc::new(IdentityRotator::new(config.identities.clone()));
        Ok(Self::from_parts(config, transport, cache, limiter, rotator))
    }

    /// Client over explicitly shared parts.
    ///
    /// Lets several clients use one cache, one concurrency budget, or one
    /// identity pool.
    pub fn from_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        cache: Arc<ResultCache>,
        limiter: Arc<Semaphore>,
        rotator: Arc<IdentityRotator>,
    ) -> Self {
        info!(
            "Translation client ready: {} ({:?}), {} concurrent calls, {} retries",
            config.endpoint,
            config.response_format,
            limiter.max_permits(),
            config.max_retries
        );
        let executor = CallExecutor::new(&config, transport, limiter, rotator);
        Self {
            config,
            cache,
            executor,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared result cache
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Translate `text` from `source_lang` into `target_lang`.
    ///
    /// Whitespace is normalized first. Text longer than the chunk limit is
    /// split, the pieces are translated concurrently and joined back with
    /// single spaces.
    ///
    /// ```rust,no_run
    /// use voice_translate_client::{Config, TranslationClient};
    ///
    /// let client = TranslationClient::new(Config::new()).unwrap();
    /// let english = client.translate("en", "es", "  Hola   mundo ").unwrap();
    /// println!("{english}");
    /// ```
    pub fn translate(
        &self,
        target_lang: &str,
        source_lang: &str,
        text: &str,
    ) -> TranslateResult<String> {
        self.translate_with_options(target_lang, source_lang, text, &TranslateOptions::default())
    }

    /// [`TranslationClient::translate`] with a cancellation signal
    pub fn translate_with_options(
        &self,
        target_lang: &str,
        source_lang: &str,
        text: &str,
        options: &TranslateOptions,
    ) -> TranslateResult<String> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        self.languages(source_lang, target_lang)
            .and_then(|(source, target)| {
                self.translate_normalized(&source, &target, &normalized, options.cancel.as_ref())
            })
            .map_err(|e| e.with_context("translate", &normalized))
    }

    /// Translate many texts at once; the output matches the input in length
    /// and order.
    ///
    /// Short uncached texts travel together in as few calls as the format
    /// allows, identical texts only once. Long texts take the chunked single
    /// path concurrently. Empty entries come back as empty strings.
    pub fn translate_multiple<S: AsRef<str>>(
        &self,
        texts: &[S],
        target_lang: &str,
        source_lang: &str,
    ) -> TranslateResult<Vec<String>> {
        self.translate_multiple_with_options(
            texts,
            target_lang,
            source_lang,
            &TranslateOptions::default(),
        )
    }

    /// [`TranslationClient::translate_multiple`] with a cancellation signal
    pub fn translate_multiple_with_options<S: AsRef<str>>(
        &self,
        texts: &[S],
        target_lang: &str,
        source_lang: &str,
        options: &TranslateOptions,
    ) -> TranslateResult<Vec<String>> {
        let summary = format!("{} texts", texts.len());
        self.languages(source_lang, target_lang)
            .and_then(|(source, target)| {
                self.translate_batch(&source, &target, texts, options.cancel.as_ref())
            })
            .map_err(|e| e.with_context("translate_multiple", &summary))
    }

    /// Language code the upstream detects for `text`
    pub fn detect_language(&self, text: &str) -> TranslateResult<String> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        // a leading sample is enough to detect the language
        let sample: String = normalized
            .chars()
            .take(self.config.max_chunk_length)
            .collect();
        let request = UpstreamRequest::single(AUTO_DETECT, &self.config.detect_target_lang, &sample);

        let detected = self.executor.call(&request, None).and_then(|parsed| {
            match parsed.detected_language() {
                Some(lang) if !lang.is_empty() => Ok(lang.to_string()),
                _ => Err(TranslateError::Detection(
                    "response carried no detected language".to_string(),
                )),
            }
        });

        match detected {
            Ok(lang) => {
                info!("Detected language: {lang}");
                Ok(lang)
            }
            Err(e) => Err(e.with_context("detect_language", &normalized)),
        }
    }

    fn languages(&self, source: &str, target: &str) -> TranslateResult<(String, String)> {
        if !self.config.normalize_languages {
            return Ok((source.trim().to_string(), target.trim().to_string()));
        }
        Ok((normalize_lang(source)?, normalize_lang(target)?))
    }

    fn fits_one_call(&self, normalized: &str) -> bool {
        normalized.chars().count() <= self.config.max_chunk_length
    }

    /// Single-string path for text that is already normalized and non-empty
    fn translate_normalized(
        &self,
        source: &str,
        target: &str,
        normalized: &str,
        cancel: Option<&CancelToken>,
    ) -> TranslateResult<String> {
        if let Some(hit) = self.cache.get(&cache_key(source, target, normalized)) {
            debug!("Cache hit: {normalized}");
            return Ok(hit);
        }

        if self.fits_one_call(normalized) {
            return self.translate_short(source, target, normalized, cancel);
        }

        // chunks are cached one by one, the joined result is not
        let chunks = chunker::split(normalized, self.config.max_chunk_length);
        debug!(
            "Split {} chars into {} chunks",
            normalized.chars().count(),
            chunks.len()
        );

        let translated =
            self.fan_out(&chunks, |chunk| self.translate_short(source, target, chunk, cancel))?;

        Ok(translated.join(" "))
    }

    fn translate_short(
        &self,
        source: &str,
        target: &str,
        text: &str,
        cancel: Option<&CancelToken>,
    ) -> TranslateResult<String> {
        if let Some(hit) = self.cache.get(&cache_key(source, target, text)) {
            debug!("Cache hit: {text}");
            return Ok(hit);
        }

        let mut translations = self.fetch(source, target, vec![text.to_string()], cancel)?;
        translations
            .pop()
            .ok_or_else(|| TranslateError::MalformedResponse("no translation returned".into()))
    }

    /// One upstream call for `texts`; every result is cached under its own text
    fn fetch(
        &self,
        source: &str,
        target: &str,
        texts: Vec<String>,
        cancel: Option<&CancelToken>,
    ) -> TranslateResult<Vec<String>> {
        let request = UpstreamRequest::batch(source, target, texts);
        let translations = self.executor.call(&request, cancel)?.into_translations();

        if translations.len() != request.texts.len() {
            return Err(TranslateError::MalformedResponse(format!(
                "expected {} translations, got {}",
                request.texts.len(),
                translations.len()
            )));
        }

        for (text, translation) in request.texts.iter().zip(&translations) {
            self.cache
                .set(cache_key(source, target, text), translation.clone());
        }

        Ok(translations)
    }

    fn translate_batch<S: AsRef<str>>(
        &self,
        source: &str,
        target: &str,
        texts: &[S],
        cancel: Option<&CancelToken>,
    ) -> TranslateResult<Vec<String>> {
        let mut results: Vec<Option<String>> = vec![None; texts.len()];
        let mut pending: Vec<PendingText> = Vec::new();
        let mut pending_slots: HashMap<String, usize> = HashMap::new();
        let mut long: Vec<(usize, Vec<String>)> = Vec::new();
        let mut duplicates = 0;

        for (idx, text) in texts.iter().enumerate() {
            let normalized = normalize_text(text.as_ref());

            if normalized.is_empty() {
                results[idx] = Some(String::new());
            } else if let Some(hit) = self.cache.get(&cache_key(source, target, &normalized)) {
                results[idx] = Some(hit);
            } else if !self.fits_one_call(&normalized) {
                long.push((idx, chunker::split(&normalized, self.config.max_chunk_length)));
            } else if let Some(&slot) = pending_slots.get(&normalized) {
                //same text already queued, fan its translation out later
                pending[slot].1.push(idx);
                duplicates += 1;
            } else {
                pending_slots.insert(normalized.clone(), pending.len());
                pending.push((normalized, vec![idx]));
            }
        }

        debug!(
            "Batch of {}: {} to fetch, {} long, duplicates found: {duplicates}",
            texts.len(),
            pending.len(),
            long.len()
        );

        let group_size = match self.executor.format() {
            ResponseFormat::Structured => self.config.max_batch_size,
            ResponseFormat::NestedArray => 1,
        };
        let groups: Vec<&[PendingText]> = pending.chunks(group_size).collect();

        let mut jobs: Vec<BatchJob<'_>> = groups.iter().map(|g| BatchJob::Group(g)).collect();
        for (_, chunks) in &long {
            jobs.extend(chunks.iter().map(|chunk| BatchJob::Chunk(chunk)));
        }

        let outputs = self.fan_out(&jobs, |job| match job {
            BatchJob::Group(group) => {
                let texts = group.iter().map(|(text, _)| text.clone()).collect();
                self.fetch(source, target, texts, cancel)
            }
            BatchJob::Chunk(chunk) => self
                .translate_short(source, target, chunk, cancel)
                .map(|translation| vec![translation]),
        })?;

        // outputs follow job order: groups first, then every long text's chunks
        let mut outputs = outputs.into_iter();
        for group in &groups {
            let translations = outputs.next().unwrap_or_default();
            for ((_, indices), translation) in group.iter().zip(translations) {
                for &idx in indices {
                    results[idx] = Some(translation.clone());
                }
            }
        }
        for (idx, chunks) in &long {
            let pieces: Vec<String> = outputs.by_ref().take(chunks.len()).flatten().collect();
            results[*idx] = Some(pieces.join(" "));
        }

        Ok(results
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect())
    }

    /// Run `work` over `jobs` on at most `max_concurrency` scoped threads.
    ///
    /// Results come back in job order. After the first failure no new job
    /// is started, and the earliest failed job's error is returned.
    fn fan_out<T, R, F>(&self, jobs: &[T], work: F) -> TranslateResult<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> TranslateResult<R> + Sync,
    {
        let workers = self.config.max_concurrency.min(jobs.len());
        let cursor = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let (cursor, failed, work) = (&cursor, &failed, &work);

        let finished: Vec<Vec<(usize, TranslateResult<R>)>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        while !failed.load(Ordering::Acquire) {
                            let idx = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some(job) = jobs.get(idx) else {
                                break;
                            };
                            let outcome = work(job);
                            if outcome.is_err() {
                                failed.store(true, Ordering::Release);
                            }
                            done.push((idx, outcome));
                        }
                        done
                    })
                })
                .collect();
            handles.into_iter().map(join).collect()
        });

        let mut slots: Vec<Option<TranslateResult<R>>> = (0..jobs.len()).map(|_| None).collect();
        for (idx, outcome) in finished.into_iter().flatten() {
            slots[idx] = Some(outcome);
        }
        // jobs are claimed in order, so unclaimed slots only trail a failure
        slots.into_iter().flatten().collect()
    }
}

fn join<T>(handle: ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
