//! Authenticated JSON calls against the Azure DevOps REST surface.

use std::time::Duration;

use reqwest::{StatusCode, header};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use upkg_core::client::{ClientSetting, ClientSettingError};
use upkg_core::task_pool::POOL;

use crate::credential::Credential;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Failure reported by, or on the way to, the artifact service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("authentication failed for {url}: {message}")]
    Unauthorized { url: Url, message: String },

    #[error("access denied to {url}: {message}")]
    Forbidden { url: Url, message: String },

    #[error("not found: {url}: {message}")]
    NotFound { url: Url, message: String },

    #[error("{url} returned {status}: {message}")]
    Status {
        url: Url,
        status: StatusCode,
        message: String,
    },

    #[error("could not reach {url}: {message}")]
    Unreachable { url: Url, message: String },

    #[error("unexpected response from {url}: {message}")]
    InvalidResponse { url: Url, message: String },

    #[error(transparent)]
    Client(#[from] ClientSettingError),
}

impl ServiceError {
    /// True when the service could not be contacted at all, as opposed to
    /// answering with an error.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ServiceError::Unreachable { .. })
    }

    pub fn from_status(url: Url, status: StatusCode, body: &str) -> Self {
        let message = error_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        match status {
            StatusCode::UNAUTHORIZED => ServiceError::Unauthorized { url, message },
            StatusCode::FORBIDDEN => ServiceError::Forbidden { url, message },
            StatusCode::NOT_FOUND => ServiceError::NotFound { url, message },
            _ => ServiceError::Status {
                url,
                status,
                message,
            },
        }
    }
}

/// The service wraps failures as `{"message": "...", "typeKey": "..."}`.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub trait DevOpsService {
    fn get_json(&self, url: &Url, credential: Option<&Credential>) -> Result<Value, ServiceError>;
}

#[derive(Debug, Clone, Default)]
pub struct RestClient {
    setting: ClientSetting,
}

impl RestClient {
    pub fn new(setting: ClientSetting) -> Self {
        Self { setting }
    }
}

impl DevOpsService for RestClient {
    fn get_json(&self, url: &Url, credential: Option<&Credential>) -> Result<Value, ServiceError> {
        let client = self.setting.clone().with_timeout(REQUEST_TIMEOUT).build()?;
        let unreachable = |e: reqwest::Error| ServiceError::Unreachable {
            url: url.clone(),
            message: e.to_string(),
        };

        POOL.block_on(async {
            let mut req = client
                .get(url.clone())
                .header(header::ACCEPT, "application/json");
            if let Some(credential) = credential {
                req = req.basic_auth("", Some(credential.token()));
            }

            debug!(%url, "GET");
            let res = req.send().await.map_err(unreachable)?;
            let status = res.status();
            let body = res.text().await.map_err(unreachable)?;

            if !status.is_success() {
                return Err(ServiceError::from_status(url.clone(), status, &body));
            }

            serde_json::from_str(&body).map_err(|e| ServiceError::InvalidResponse {
                url: url.clone(),
                message: e.to_string(),
            })
        })
    }
}
