//! HTTP sink: POSTs `{"set_urls": [...]}` to the ingestion endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use camsync_core::StreamEndpoint;
use camsync_sync::{HttpSink, SendOutcome, SetUrls};

use crate::error::Result;

/// reqwest-backed [`HttpSink`].
///
/// Every request is a fresh connection (`Connection: close`); the sink is
/// often a small embedded server that mishandles keep-alive.
#[derive(Clone)]
pub struct HttpSinkClient {
    client: Client,
    endpoint: String,
}

impl HttpSinkClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl HttpSink for HttpSinkClient {
    async fn post(&self, items: &[StreamEndpoint]) -> SendOutcome {
        debug!(count = items.len(), endpoint = %self.endpoint, "POST set_urls");

        let result = self
            .client
            .post(&self.endpoint)
            .header("Connection", "close")
            .header("Accept", "*/*")
            .json(&SetUrls::new(items))
            .send()
            .await;

        match result {
            Ok(resp) => {
                let code = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                SendOutcome::with_body(code, &body)
            }
            Err(e) => SendOutcome::Transport(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn items() -> Vec<StreamEndpoint> {
        vec![
            StreamEndpoint::new("Cam1", "rtmp://h:6604/3/3?Channel=0"),
            StreamEndpoint::new("Cam2", "rtmp://h:6604/3/3?Channel=1"),
        ]
    }

    #[tokio::test]
    async fn test_post_sends_set_urls_body() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/run"))
            .and(matchers::header("content-type", "application/json"))
            .and(matchers::header("connection", "close"))
            .and(matchers::body_json(json!({
                "set_urls": [
                    {"name": "Cam1", "url": "rtmp://h:6604/3/3?Channel=0"},
                    {"name": "Cam2", "url": "rtmp://h:6604/3/3?Channel=1"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let sink = HttpSinkClient::new(format!("{}/run", server.uri()), Duration::from_secs(2)).unwrap();
        let outcome = sink.post(&items()).await;

        assert!(outcome.is_success());
        assert_eq!(outcome, SendOutcome::with_body(200, "ok"));
    }

    #[tokio::test]
    async fn test_error_status_keeps_truncated_body() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("e".repeat(3000)))
            .mount(&server)
            .await;

        let sink = HttpSinkClient::new(server.uri(), Duration::from_secs(2)).unwrap();
        match sink.post(&items()).await {
            SendOutcome::Status { code, body } => {
                assert_eq!(code, 500);
                assert_eq!(body.len(), camsync_sync::BODY_LOG_LIMIT);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_outcome() {
        let sink = HttpSinkClient::new("http://127.0.0.1:9/run", Duration::from_millis(500)).unwrap();
        let outcome = sink.post(&items()).await;
        assert!(matches!(outcome, SendOutcome::Transport(_)));
    }
}
