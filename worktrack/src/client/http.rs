//! JSON-over-HTTP client for the work service.

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;

use super::WorkService;
use crate::error::{Error, Result};
use crate::models::{
    Card, CardRecord, HistoryEntry, HistoryWindow, NewWorkSession, SessionPatch, WorkSession,
};

/// Talks to a work service rooted at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpWorkService {
    client: Client,
    base_url: String,
}

impl HttpWorkService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and return its JSON body.
    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Value> {
        let resp = request.send().await.map_err(|source| Error::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = resp.status();
        debug!(%url, %status, "work service responded");
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| Error::MalformedResponse(format!("{url}: {e}")))
    }

    fn expect_array(url: &str, body: Value) -> Result<Vec<Value>> {
        match body {
            Value::Array(items) => Ok(items),
            other => Err(Error::MalformedResponse(format!(
                "{url}: expected an array, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn expect_session(url: &str, body: Value) -> Result<WorkSession> {
        serde_json::from_value(body).map_err(|e| Error::MalformedResponse(format!("{url}: {e}")))
    }
}

impl WorkService for HttpWorkService {
    async fn list_cards(&self) -> Result<Vec<Card>> {
        let url = self.url("cards");
        let body = self.send(&url, self.client.get(&url)).await?;

        Ok(Self::expect_array(&url, body)?
            .into_iter()
            .map(|v| Card::from(serde_json::from_value::<CardRecord>(v).unwrap_or_default()))
            .collect())
    }

    async fn create_session(&self, session: &NewWorkSession) -> Result<WorkSession> {
        let url = self.url("work");
        let body = self.send(&url, self.client.post(&url).json(session)).await?;
        Self::expect_session(&url, body)
    }

    async fn update_session(&self, id: &str, patch: &SessionPatch) -> Result<WorkSession> {
        let url = self.url(&format!("work/{}", urlencoding::encode(id)));
        let body = self.send(&url, self.client.patch(&url).json(patch)).await?;
        Self::expect_session(&url, body)
    }

    async fn fetch_window(&self, window: &HistoryWindow) -> Result<Vec<HistoryEntry>> {
        let url = self.url(&window.endpoint());
        let body = self.send(&url, self.client.get(&url)).await?;

        Ok(Self::expect_array(&url, body)?
            .into_iter()
            .map(HistoryEntry::from_value)
            .collect())
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_base_url() {
        let service = HttpWorkService::new("http://127.0.0.1:58231/");
        assert_eq!(service.base_url(), "http://127.0.0.1:58231");
        assert_eq!(service.url("/work/today"), "http://127.0.0.1:58231/work/today");
        assert_eq!(service.url("cards"), "http://127.0.0.1:58231/cards");
    }

    #[test]
    fn non_array_bodies_are_malformed() {
        let err = HttpWorkService::expect_array("u", serde_json::json!({"error": "nope"}))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(msg) if msg.contains("an object")));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        // Port 9 (discard) is essentially never listening on loopback.
        let service = HttpWorkService::new("http://127.0.0.1:9");
        let err = service.list_cards().await.unwrap_err();
        assert!(err.is_transport());
    }
}
