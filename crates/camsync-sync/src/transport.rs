//! Sink abstraction for stream URL delivery.
//!
//! The sink accepts `{"set_urls": [{"name": .., "url": ..}, ..]}` over HTTP
//! POST. Implementations report what happened as a [`SendOutcome`]; deciding
//! whether that means retry, fallback or give up is the policy's job.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use camsync_core::StreamEndpoint;

/// Maximum number of response body characters kept for logging.
pub const BODY_LOG_LIMIT: usize = 1000;

/// Wire body of one delivery request.
#[derive(Debug, Serialize)]
pub struct SetUrls<'a> {
    pub set_urls: &'a [StreamEndpoint],
}

impl<'a> SetUrls<'a> {
    pub fn new(items: &'a [StreamEndpoint]) -> Self {
        Self { set_urls: items }
    }
}

/// Result of a single POST to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The sink answered with an HTTP status.
    Status { code: u16, body: String },
    /// No HTTP status: connect error, timeout, reset.
    Transport(String),
}

impl SendOutcome {
    pub fn status(code: u16) -> Self {
        SendOutcome::Status {
            code,
            body: String::new(),
        }
    }

    /// Build a status outcome, truncating the body for logging.
    pub fn with_body(code: u16, body: &str) -> Self {
        SendOutcome::Status {
            code,
            body: body.chars().take(BODY_LOG_LIMIT).collect(),
        }
    }

    pub fn code(&self) -> Option<u16> {
        match self {
            SendOutcome::Status { code, .. } => Some(*code),
            SendOutcome::Transport(_) => None,
        }
    }

    /// 2xx.
    pub fn is_success(&self) -> bool {
        matches!(self.code(), Some(200..=299))
    }
}

impl fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendOutcome::Status { code, body } if body.is_empty() => write!(f, "status={code}"),
            SendOutcome::Status { code, body } => write!(f, "status={code} body={body:?}"),
            SendOutcome::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

/// The downstream ingestion endpoint.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait HttpSink: Send + Sync {
    /// Deliver `items` in one request.
    async fn post(&self, items: &[StreamEndpoint]) -> SendOutcome;
}

#[async_trait]
impl<T: HttpSink + ?Sized> HttpSink for std::sync::Arc<T> {
    async fn post(&self, items: &[StreamEndpoint]) -> SendOutcome {
        (**self).post(items).await
    }
}

/// A scriptable in-memory sink for testing.
///
/// Every request is recorded; the response is decided by a closure over the
/// request items.
pub mod memory {
    use super::*;
    use std::sync::Mutex;

    type Responder = dyn Fn(&[StreamEndpoint]) -> SendOutcome + Send + Sync;

    /// In-memory sink implementation.
    pub struct MemorySink {
        responder: Box<Responder>,
        requests: Mutex<Vec<Vec<StreamEndpoint>>>,
    }

    impl MemorySink {
        /// A sink answering every request with `responder(items)`.
        pub fn new<F>(responder: F) -> Self
        where
            F: Fn(&[StreamEndpoint]) -> SendOutcome + Send + Sync + 'static,
        {
            Self {
                responder: Box::new(responder),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// A sink that accepts everything with 200.
        pub fn accepting() -> Self {
            Self::new(|_| SendOutcome::status(200))
        }

        /// Every request received so far, in order.
        pub fn requests(&self) -> Vec<Vec<StreamEndpoint>> {
            self.requests.lock().unwrap().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpSink for MemorySink {
        async fn post(&self, items: &[StreamEndpoint]) -> SendOutcome {
            self.requests.lock().unwrap().push(items.to_vec());
            (self.responder)(items)
        }
    }
}
