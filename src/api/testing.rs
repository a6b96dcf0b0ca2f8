//! Scripted transport for unit tests.

use std::{collections::VecDeque, fmt, time::Instant};

use parking_lot::Mutex;

use super::{RawResponse, Transport, TransportError, UpstreamRequest};

type Responder = dyn Fn(&UpstreamRequest) -> Result<RawResponse, TransportError> + Send + Sync;

/// What the fake saw for one attempt
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: UpstreamRequest,
    pub headers: Vec<(String, String)>,
    pub at: Instant,
}

/// Replays queued outcomes first, then falls back to a responder
pub struct FakeTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    responder: Box<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl fmt::Debug for FakeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeTransport")
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&UpstreamRequest) -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answers every text with `<target>:<text>` in the nested-array shape
    pub fn echo_nested() -> Self {
        Self::new(|req| Ok(ok(nested_body(&echo(req)[0], Some(req.source_lang.as_str())))))
    }

    /// Answers every text with `<target>:<text>` in the structured shape
    pub fn echo_structured() -> Self {
        Self::new(|req| Ok(ok(structured_body(&echo(req)))))
    }

    pub fn then(self, outcome: Result<RawResponse, TransportError>) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Transport for FakeTransport {
    fn send(
        &self,
        request: &UpstreamRequest,
        headers: &[(String, String)],
    ) -> Result<RawResponse, TransportError> {
        self.calls.lock().push(RecordedCall {
            request: request.clone(),
            headers: headers.to_vec(),
            at: Instant::now(),
        });
        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => (self.responder)(request),
        }
    }
}

pub fn echo(req: &UpstreamRequest) -> Vec<String> {
    req.texts
        .iter()
        .map(|t| format!("{}:{}", req.target_lang, t))
        .collect()
}

pub fn ok(body: String) -> RawResponse {
    RawResponse { status: 200, body }
}

pub fn status(status: u16) -> RawResponse {
    RawResponse {
        status,
        body: format!("status {status}"),
    }
}

pub fn nested_body(text: &str, detected: Option<&str>) -> String {
    serde_json::json!([[[text, "source", null, null, 10]], null, detected]).to_string()
}

pub fn structured_body(texts: &[String]) -> String {
    let translations: Vec<_> = texts
        .iter()
        .map(|t| serde_json::json!({ "translatedText": t }))
        .collect();
    serde_json::json!({ "data": { "translations": translations } }).to_string()
}
