//! Response classification against an accepted status-code set.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Body as JSON, or as a JSON string when it is not JSON. Empty bodies become `null`.
    pub fn value(&self) -> serde_json::Value {
        if self.body.is_empty() {
            return serde_json::Value::Null;
        }
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|_| serde_json::Value::String(self.text()))
    }
}

/// Pass the response through when its status is accepted, otherwise turn it into an error.
pub fn classify(response: ApiResponse, accepted: &[u16]) -> Result<ApiResponse> {
    if accepted.contains(&response.status) {
        return Ok(response);
    }
    Err(Error::Transport {
        status: response.status,
        body: response.text(),
    })
}
