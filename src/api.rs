use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::Config;
use crate::error::{BoardError, Result};
use crate::models::{WireApplication, WireDraft, WirePatch};

// --- Backend trait ---

/// Wire-level access to the applications resource. Status fields are raw
/// ordinals here; decoding happens in the store.
#[async_trait]
pub trait ApplicationBackend: Send + Sync {
    async fn list(&self, status: Option<i64>, page: Option<u32>, limit: Option<u32>)
    -> Result<Vec<WireApplication>>;
    async fn list_by_status(&self, status: i64) -> Result<Vec<WireApplication>>;
    async fn get(&self, id: &str) -> Result<WireApplication>;
    async fn create(&self, draft: &WireDraft) -> Result<WireApplication>;
    async fn replace(&self, id: &str, draft: &WireDraft) -> Result<WireApplication>;
    async fn patch(&self, id: &str, patch: &WirePatch) -> Result<WireApplication>;
    async fn delete(&self, id: &str) -> Result<()>;
}

// --- HTTP backend ---

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let raw = base_url.as_ref();
        let base_url = Url::parse(raw)
            .map_err(|e| BoardError::Config(format!("base_url '{}': {}", raw, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BoardError::Config(format!("base_url '{}' cannot carry a path", raw)));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.base_url.clone(), Duration::from_secs(config.timeout_secs))
    }

    /// `{base_url}/applications/{segments...}`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BoardError::Config(format!("base_url '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .push("applications")
            .extend(segments);
        Ok(url)
    }

    fn item_url(&self, id: &str) -> Result<Url> {
        // Dot segments would be dropped or resolved, escaping the resource.
        if id.is_empty() || id == "." || id == ".." {
            return Err(BoardError::validation("id", format!("'{}' is not an application id", id)));
        }
        self.url(&[id])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(%method, %url, "backend request");
        self.client.request(method, url)
    }

    async fn send(&self, request: RequestBuilder, id: Option<&str>) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(BoardError::NotFound { id: id.to_string() });
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), %body, "backend request failed");
            return Err(BoardError::NetworkFailure {
                status: Some(status.as_u16()),
                message: if body.is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body
                },
            });
        }
        Ok(response)
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder, id: Option<&str>) -> Result<T> {
        let response = self.send(request, id).await?;
        response
            .json()
            .await
            .map_err(|e| BoardError::network(format!("Failed to parse backend response: {}", e)))
    }
}

#[async_trait]
impl ApplicationBackend for HttpBackend {
    async fn list(
        &self,
        status: Option<i64>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Vec<WireApplication>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(s) = status {
            query.push(("status", s.to_string()));
        }
        if let Some(p) = page {
            query.push(("page", p.to_string()));
        }
        if let Some(l) = limit {
            query.push(("limit", l.to_string()));
        }
        let request = self.request(Method::GET, self.url(&[])?).query(&query);
        self.json(request, None).await
    }

    async fn list_by_status(&self, status: i64) -> Result<Vec<WireApplication>> {
        let ordinal = status.to_string();
        let url = self.url(&["status", ordinal.as_str()])?;
        self.json(self.request(Method::GET, url), None).await
    }

    async fn get(&self, id: &str) -> Result<WireApplication> {
        let request = self.request(Method::GET, self.item_url(id)?);
        self.json(request, Some(id)).await
    }

    async fn create(&self, draft: &WireDraft) -> Result<WireApplication> {
        let request = self.request(Method::POST, self.url(&[])?).json(draft);
        self.json(request, None).await
    }

    async fn replace(&self, id: &str, draft: &WireDraft) -> Result<WireApplication> {
        let request = self.request(Method::PUT, self.item_url(id)?).json(draft);
        self.json(request, Some(id)).await
    }

    async fn patch(&self, id: &str, patch: &WirePatch) -> Result<WireApplication> {
        let request = self.request(Method::PATCH, self.item_url(id)?).json(patch);
        self.json(request, Some(id)).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let request = self.request(Method::DELETE, self.item_url(id)?);
        self.send(request, Some(id)).await?;
        Ok(())
    }
}
