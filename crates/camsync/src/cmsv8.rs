//! HTTP client for the CMSV8 video platform.
//!
//! Wraps reqwest for `login`, `getDeviceOlStatus` and `getDeviceStatus`.
//! Every GET is retried on 5xx and transport errors with the same backoff
//! rules as sink delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use camsync_core::Session;
use camsync_sync::{
    Decision, DeviceDirectory, IdSpace, RetryPolicy, SendOutcome, SessionProvider, SyncError,
};

use crate::config::{CmsConfig, Secret};
use crate::error::Result;

const LOGIN: &str = "StandardApiAction_login.action";
const ONLINE_STATUS: &str = "StandardApiAction_getDeviceOlStatus.action";
const DEVICE_STATUS: &str = "StandardApiAction_getDeviceStatus.action";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    result: Option<i64>,
    #[serde(rename = "JSESSIONID")]
    jsessionid: Option<String>,
    jsession: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OnlineResponse {
    #[serde(default)]
    result: Option<i64>,
    #[serde(default)]
    onlines: Option<Vec<OnlineEntry>>,
}

#[derive(Debug, Deserialize)]
struct OnlineEntry {
    did: Option<String>,
    #[serde(default)]
    online: Value,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    result: Option<i64>,
    #[serde(default)]
    status: Option<Vec<StatusEntry>>,
}

#[derive(Debug, Deserialize)]
struct StatusEntry {
    id: Option<String>,
    #[serde(default)]
    ol: Value,
}

/// The platform encodes "online" as either `1` or `"1"`.
fn is_one(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s.trim() == "1",
        _ => false,
    }
}

fn non_empty(id: Option<String>) -> Option<String> {
    id.filter(|s| !s.is_empty())
}

/// CMSV8 platform client.
#[derive(Clone)]
pub struct CmsClient {
    client: Client,
    base_url: String,
    account: String,
    password: Secret,
    retry: RetryPolicy,
}

impl CmsClient {
    /// Default GET retry rules: three retries, 0.5s doubling backoff.
    pub fn default_retry() -> RetryPolicy {
        RetryPolicy {
            max_retry: 3,
            initial_backoff: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(5),
            fallback_split: false,
        }
    }

    pub fn new(config: &CmsConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base(),
            account: config.account.clone(),
            password: config.password.clone(),
            retry: Self::default_retry(),
        })
    }

    /// Point at a different API base (for testing).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `action` and decode the JSON body, retrying server-side failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        action: &str,
        query: &[(&str, &str)],
    ) -> std::result::Result<T, String> {
        let url = format!("{}/{}", self.base_url, action);
        let mut attempt = 0u32;

        loop {
            let outcome = match self.client.get(&url).query(query).send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<T>()
                        .await
                        .map_err(|e| format!("{action}: invalid response: {e}"));
                }
                Ok(resp) => {
                    let code = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();
                    SendOutcome::with_body(code, &body)
                }
                Err(e) => SendOutcome::Transport(e.to_string()),
            };

            match self.retry.classify(&outcome, attempt, 1) {
                Decision::Retry { retry } => {
                    let delay = self.retry.delay(retry);
                    debug!(action, %outcome, retry = retry + 1, "platform request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                _ => return Err(format!("{action}: {outcome}")),
            }
        }
    }

    async fn online_by(&self, session: &Session, param: &str, key: &str) -> std::result::Result<Vec<String>, String> {
        let resp: OnlineResponse = self
            .get_json(
                ONLINE_STATUS,
                &[("jsession", session.token()), ("status", "1"), (param, key)],
            )
            .await?;
        if resp.result != Some(0) {
            debug!(key, param, result = ?resp.result, "online query returned non-zero result");
            return Ok(Vec::new());
        }
        Ok(resp
            .onlines
            .unwrap_or_default()
            .into_iter()
            .filter(|e| is_one(&e.online))
            .filter_map(|e| non_empty(e.did))
            .collect())
    }
}

#[async_trait]
impl SessionProvider for CmsClient {
    async fn login(&self, now: i64) -> camsync_sync::Result<Session> {
        let resp: LoginResponse = self
            .get_json(
                LOGIN,
                &[("account", self.account.as_str()), ("password", self.password.expose())],
            )
            .await
            .map_err(SyncError::Auth)?;

        let token = non_empty(resp.jsessionid).or_else(|| non_empty(resp.jsession));
        match (resp.result, token) {
            (Some(0), Some(token)) => Ok(Session::new(token, now)),
            (result, _) => {
                let message = resp.message.unwrap_or_default();
                warn!(?result, %message, "login rejected");
                Err(SyncError::Auth(format!("result={result:?} {message}")))
            }
        }
    }
}

#[async_trait]
impl DeviceDirectory for CmsClient {
    async fn query_online(&self, session: &Session, space: IdSpace, key: &str) -> camsync_sync::Result<Vec<String>> {
        let param = match space {
            IdSpace::Device => "devIdno",
            IdSpace::Vehicle => "vehiIdno",
        };
        self.online_by(session, param, key)
            .await
            .map_err(|message| SyncError::Directory {
                key: key.to_string(),
                message,
            })
    }

    async fn query_status(&self, session: &Session, key: &str) -> camsync_sync::Result<Vec<String>> {
        for param in ["devIdno", "vehiIdno"] {
            let resp: StatusResponse = self
                .get_json(DEVICE_STATUS, &[("jsession", session.token()), (param, key)])
                .await
                .map_err(|message| SyncError::Directory {
                    key: key.to_string(),
                    message,
                })?;
            if resp.result != Some(0) {
                continue;
            }
            let ids: Vec<String> = resp
                .status
                .unwrap_or_default()
                .into_iter()
                .filter(|e| is_one(&e.ol))
                .filter_map(|e| non_empty(e.id))
                .collect();
            if !ids.is_empty() {
                return Ok(ids);
            }
        }
        Ok(Vec::new())
    }
}
