//! HTTP handlers for notabene-api.

pub mod auth;
pub mod health;
pub mod notes;
pub mod tags;
pub mod tasks;

/// Body for simple acknowledgements such as deletions.
#[derive(Debug, serde::Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
