//! Scripted HTTP transport that records every call.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use ows_protocol::{HttpResponse, HttpTransport, Method, TransportError, Url};

/// One request seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub url: Url,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedCall {
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }

    /// First query value for `key` (case-insensitive).
    pub fn query_value(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.into_owned())
    }

    /// Query keys in the order they appear in the URL.
    pub fn query_keys(&self) -> Vec<String> {
        self.url.query_pairs().map(|(k, _)| k.into_owned()).collect()
    }
}

/// Transport double: answers from a queue and counts calls.
///
/// An exhausted queue answers with `TransportError::Request`, so a test that
/// expects zero calls fails loudly if one slips through.
#[derive(Debug, Default)]
pub struct MockTransport {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a `200 text/xml` response.
    pub fn with_xml(self, body: impl Into<String>) -> Self {
        self.with_response(HttpResponse::new(200, body.into()).with_content_type("text/xml"))
    }

    pub fn with_status(self, status: u16, body: impl Into<String>) -> Self {
        self.with_response(HttpResponse::new(status, body.into()))
    }

    pub fn with_response(self, response: HttpResponse) -> Self {
        lock(&self.responses).push_back(Ok(response));
        self
    }

    pub fn with_error(self, error: TransportError) -> Self {
        lock(&self.responses).push_back(Err(error));
        self
    }

    /// Queue a response on a transport already handed to a client.
    pub fn push_xml(&self, body: impl Into<String>) {
        lock(&self.responses)
            .push_back(Ok(HttpResponse::new(200, body.into()).with_content_type("text/xml")));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        lock(&self.calls).last().cloned()
    }

    pub fn pending_responses(&self) -> usize {
        lock(&self.responses).len()
    }

    fn answer(&self, call: RecordedCall) -> Result<HttpResponse, TransportError> {
        let url = call.url.to_string();
        lock(&self.calls).push(call);
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Request {
                    url,
                    message: "no scripted response left".to_string(),
                })
            })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        self.answer(RecordedCall {
            method: Method::Get,
            url: url.clone(),
            content_type: None,
            body: Vec::new(),
        })
    }

    async fn post(
        &self,
        url: &Url,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<HttpResponse, TransportError> {
        self.answer(RecordedCall {
            method: Method::Post,
            url: url.clone(),
            content_type: Some(content_type.to_string()),
            body,
        })
    }
}
