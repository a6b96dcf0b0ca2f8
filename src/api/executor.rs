use std::{sync::Arc, thread, time::Duration};

use log::warn;
use rand::Rng;

use super::{
    ParsedResponse, RawResponse, Transport, TransportError, UpstreamRequest, parse_response,
};
use crate::{
    config::{Config, ResponseFormat},
    error::{TranslateError, TranslateResult, TransportFailure},
    utils::{cancellation::CancelToken, identity::IdentityRotator, translation_limiter::Semaphore},
};

/// When and how long to wait between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Exclusive upper bound of the random jitter
    pub jitter_ceiling: Duration,
}

impl RetryPolicy {
    /// Policy taken from the config
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay,
            jitter_ceiling: config.jitter_ceiling,
        }
    }

    /// `base_delay * 2^retry + jitter`, jitter uniform in `[0, jitter_ceiling)`
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        let exponential = self.base_delay.saturating_mul(factor);

        let ceiling_ns = u64::try_from(self.jitter_ceiling.as_nanos()).unwrap_or(u64::MAX);
        let jitter = if ceiling_ns == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(rand::thread_rng().gen_range(0..ceiling_ns))
        };

        exponential.saturating_add(jitter)
    }
}

/// Runs upstream calls under the shared limiter, retrying transient failures
#[derive(Debug)]
pub struct CallExecutor {
    transport: Arc<dyn Transport>,
    limiter: Arc<Semaphore>,
    rotator: Arc<IdentityRotator>,
    policy: RetryPolicy,
    format: ResponseFormat,
    send_identity_headers: bool,
}

impl CallExecutor {
    /// Executor over the given shared parts
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        limiter: Arc<Semaphore>,
        rotator: Arc<IdentityRotator>,
    ) -> Self {
        Self {
            transport,
            limiter,
            rotator,
            policy: RetryPolicy::from_config(config),
            format: config.response_format,
            send_identity_headers: config.send_identity_headers,
        }
    }

    /// Response shape this executor parses
    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    /// Perform `request`, retrying timeouts, 429 and 5xx with backoff.
    ///
    /// Every attempt holds its own permit, so retries respect the
    /// concurrency bound too. The permit is not held while backing off.
    pub fn call(
        &self,
        request: &UpstreamRequest,
        cancel: Option<&CancelToken>,
    ) -> TranslateResult<ParsedResponse> {
        let is_cancelled = || cancel.is_some_and(CancelToken::is_cancelled);
        let mut attempt: u32 = 0;

        loop {
            if is_cancelled() {
                return Err(TranslateError::Cancelled);
            }

            let outcome = {
                let _permit = self.limiter.acquire();
                if is_cancelled() {
                    return Err(TranslateError::Cancelled);
                }
                let headers = self.outbound_headers();
                self.transport.send(request, &headers)
            };

            // a result arriving after cancellation is dropped
            if is_cancelled() {
                return Err(TranslateError::Cancelled);
            }

            let failure = match classify(outcome)? {
                Ok(response) => {
                    return parse_response(self.format, &response.body)
                        .map_err(TranslateError::MalformedResponse);
                }
                Err(failure) => failure,
            };

            if attempt >= self.policy.max_retries {
                return Err(TranslateError::RetriesExhausted {
                    attempts: attempt + 1,
                    last: failure,
                });
            }

            let delay = self.policy.backoff_delay(attempt);
            warn!(
                "Attempt {} of {} failed ({failure}), retrying in {delay:?}",
                attempt + 1,
                self.policy.max_retries + 1
            );

            match cancel {
                Some(token) => {
                    if token.sleep(delay) {
                        return Err(TranslateError::Cancelled);
                    }
                }
                None => thread::sleep(delay),
            }

            attempt += 1;
        }
    }

    fn outbound_headers(&self) -> Vec<(String, String)> {
        if !self.send_identity_headers {
            return Vec::new();
        }

        let mut headers = vec![
            ("Accept".to_string(), "*/*".to_string()),
            ("Accept-Language".to_string(), "en-US,en;q=0.9".to_string()),
            ("Connection".to_string(), "keep-alive".to_string()),
        ];
        if let Some(identity) = self.rotator.next() {
            headers.push(("User-Agent".to_string(), identity.to_string()));
        }
        headers
    }
}

/// Split an attempt outcome into success, retryable failure, or a terminal error
fn classify(
    outcome: Result<RawResponse, TransportError>,
) -> TranslateResult<Result<RawResponse, TransportFailure>> {
    match outcome {
        Ok(response) if response.is_success() => Ok(Ok(response)),
        Ok(response) if response.status == 429 || response.status >= 500 => {
            Ok(Err(TransportFailure::Status {
                status: response.status,
                body: response.body,
            }))
        }
        Ok(response) => Err(TranslateError::NonRetryable {
            status: response.status,
            body: response.body,
        }),
        Err(TransportError::Timeout) => Ok(Err(TransportFailure::Timeout)),
        Err(TransportError::Network(message)) => Err(TranslateError::Network(message)),
    }
}
