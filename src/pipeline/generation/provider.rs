use std::collections::VecDeque;
use std::sync::Mutex;

use thiserror::Error;

/// Transport-level failure of a single provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider unreachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Rate limit exceeded (status 429): {0}")]
    RateLimited(String),

    #[error("Provider returned error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Provider returned no candidates")]
    EmptyResponse,
}

/// "Generate text from prompt" capability (allows mocking).
pub trait TextProvider {
    fn generate(&self, credential: &str, system: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// One recorded call to a `MockProvider`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub credential: String,
    pub system: String,
    pub prompt: String,
}

type Responder = dyn Fn(&ProviderCall) -> Result<String, ProviderError> + Send + Sync;

/// Mock provider for testing: answers from a closure and records every call.
pub struct MockProvider {
    responder: Box<Responder>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl MockProvider {
    /// Always answer with `response`.
    pub fn new(response: &str) -> Self {
        let response = response.to_string();
        Self::from_fn(move |_| Ok(response.clone()))
    }

    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&ProviderCall) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer with `responses` in order, then `EmptyResponse` once drained.
    pub fn scripted(responses: Vec<Result<String, ProviderError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(responses));
        Self::from_fn(move |_| {
            queue
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .unwrap_or(Err(ProviderError::EmptyResponse))
        })
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl TextProvider for MockProvider {
    fn generate(&self, credential: &str, system: &str, prompt: &str) -> Result<String, ProviderError> {
        let call = ProviderCall {
            credential: credential.to_string(),
            system: system.to_string(),
            prompt: prompt.to_string(),
        };
        let result = (self.responder)(&call);
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_returns_configured_response() {
        let mock = MockProvider::new("hello");
        assert_eq!(mock.generate("k", "sys", "prompt").unwrap(), "hello");
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn mock_records_credentials_in_call_order() {
        let mock = MockProvider::new("ok");
        mock.generate("k1", "s", "p").unwrap();
        mock.generate("k2", "s", "p").unwrap();
        let used: Vec<String> = mock.calls().into_iter().map(|c| c.credential).collect();
        assert_eq!(used, vec!["k1", "k2"]);
    }

    #[test]
    fn scripted_mock_drains_then_reports_empty() {
        let mock = MockProvider::scripted(vec![
            Err(ProviderError::RateLimited("slow down".into())),
            Ok("second".into()),
        ]);
        assert!(mock.generate("k", "s", "p").is_err());
        assert_eq!(mock.generate("k", "s", "p").unwrap(), "second");
        assert_eq!(mock.generate("k", "s", "p"), Err(ProviderError::EmptyResponse));
    }

    #[test]
    fn rate_limited_display_carries_quota_signature() {
        let text = ProviderError::RateLimited("Resource exhausted".into()).to_string();
        assert!(super::super::is_quota_signature(&text));
    }
}
