//! Per-request selection context.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Advisory request data handed to a selection algorithm.
///
/// Created per selection and discarded afterwards. Round robin ignores it;
/// it is threaded through so affinity-aware algorithms can use it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionContext {
    pub client_ip: Option<String>,
    pub session_id: Option<String>,
    pub request_path: String,
    pub request_method: String,
    pub headers: HashMap<String, String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub previous_server: Option<String>,
    pub retry_count: u32,
}

impl Default for SelectionContext {
    fn default() -> Self {
        Self {
            client_ip: None,
            session_id: None,
            request_path: String::new(),
            request_method: "GET".to_string(),
            headers: HashMap::new(),
            metadata: HashMap::new(),
            previous_server: None,
            retry_count: 0,
        }
    }
}

impl SelectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    pub fn with_request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.request_method = method.into();
        self.request_path = path.into();
        self
    }

    /// Context for a retry after `server_id` failed.
    pub fn retry_after(mut self, server_id: impl Into<String>) -> Self {
        self.previous_server = Some(server_id.into());
        self.retry_count += 1;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_tracks_previous_server() {
        let ctx = SelectionContext::new()
            .with_client_ip("10.0.0.7")
            .with_request("POST", "/orders")
            .retry_after("s1")
            .retry_after("s2");
        assert_eq!(ctx.previous_server.as_deref(), Some("s2"));
        assert_eq!(ctx.retry_count, 2);
        assert_eq!(ctx.client_ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(ctx.request_method, "POST");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let ctx: SelectionContext = serde_json::from_str(r#"{"session_id": "abc"}"#).unwrap();
        assert_eq!(ctx.request_method, "GET");
        assert_eq!(ctx.retry_count, 0);
        assert_eq!(ctx.session_id.as_deref(), Some("abc"));
    }
}
