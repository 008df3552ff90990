//! Chat Gateway
//!
//! Sends a user message to the conversational assistant and returns the
//! reply together with the authoritative message history for the thread.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::decode;
use crate::error::ApiError;
use crate::transport::{ApiRequest, Transport};

/// One entry of the thread history as the backend records it
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HistoryMessage {
    /// Backend-assigned message id
    pub id: String,
    /// Thread this message belongs to
    #[serde(default)]
    pub thread_id: String,
    /// `"user"` or `"assistant"`
    pub role: String,
    /// Message text
    pub content: String,
    /// ISO-8601 creation time
    #[serde(default)]
    pub timestamp: String,
}

/// Response to a chat send
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChatResponse {
    /// Thread the message was posted to
    pub thread_id: String,
    /// The assistant's reply text
    pub response: String,
    /// Authoritative history for the thread, oldest first
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

/// Gateway for the conversational assistant
#[derive(Clone)]
pub struct ChatGateway {
    transport: Arc<dyn Transport>,
}

impl ChatGateway {
    /// Create a gateway over the given transport
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Post `user_input` to the thread and return the reply with history
    pub async fn send_message(
        &self,
        thread_id: &str,
        user_input: &str,
    ) -> Result<ChatResponse, ApiError> {
        let path = format!("/students/chat/{thread_id}");
        let request = ApiRequest::post(&path).with_body(json!({ "user_input": user_input }));
        let payload = self.transport.send(&request).await?;
        decode(&path, payload)
    }
}
