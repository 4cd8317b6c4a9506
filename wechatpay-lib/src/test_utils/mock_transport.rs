//! In-memory [`Transport`] for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::{Result, WechatPayError};

/// Transport that serves canned responses and records what it was sent.
///
/// Queued responses are served first, in order; once the queue is empty every
/// call gets the fallback response. An optional delay keeps a request in
/// flight long enough for concurrency tests to pile up behind it.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<MockState>,
}

#[derive(Default)]
struct MockState {
    calls: AtomicUsize,
    queue: Mutex<VecDeque<Result<HttpResponse>>>,
    fallback: Mutex<Option<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl MockTransport {
    /// Empty transport; every call fails until a response is configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport answering every call with `status` and `body`.
    pub fn always(status: u16, body: impl Into<String>) -> Self {
        let transport = Self::new();
        transport.set_fallback(HttpResponse::new(status, Vec::<(String, String)>::new(), body));
        transport
    }

    /// Answer every call with `response` once the queue is drained.
    pub fn set_fallback(&self, response: HttpResponse) {
        *self.inner.fallback.lock().unwrap() = Some(response);
    }

    /// Queue one response.
    pub fn push_response(&self, response: HttpResponse) {
        self.inner.queue.lock().unwrap().push_back(Ok(response));
    }

    /// Queue one transport failure.
    pub fn push_error(&self, error: WechatPayError) {
        self.inner.queue.lock().unwrap().push_back(Err(error));
    }

    /// Sleep before answering each call.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.inner.delay.lock().unwrap() = Some(delay);
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.requests.lock().unwrap().push(request);

        let delay = *self.inner.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(next) = self.inner.queue.lock().unwrap().pop_front() {
            return next;
        }
        self.inner
            .fallback
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| WechatPayError::Transport("no mock response configured".into()))
    }
}
