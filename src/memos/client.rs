//! HTTP client for the Memos v1 API.

use reqwest::StatusCode;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::MemoRecord;

use super::api::{MemoQuery, MemosApi, MemosUser};

const SERVICE: &str = "Memos";

/// Memos REST client authenticated with a bearer access token.
pub struct MemosClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MemosClient {
    /// Create a client for `base_url` (a trailing `/` is tolerated).
    #[must_use]
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.access_token)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|source| Error::Request {
            service: SERVICE,
            source,
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized { service: SERVICE });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl MemosApi for MemosClient {
    async fn ping(&self) -> Result<()> {
        self.send(self.get("/api/v1/ping")).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<MemosUser> {
        let response = self.send(self.get("/api/v1/user/me")).await?;
        response.json().await.map_err(|source| Error::Request {
            service: SERVICE,
            source,
        })
    }

    async fn list_memos(&self, query: MemoQuery) -> Result<Vec<MemoRecord>> {
        debug!(limit = query.limit, offset = query.offset, "Fetching memo page");

        let request = self.get("/api/v1/memo").query(&[
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
            ("rowStatus", query.row_status.as_str().to_string()),
        ]);

        let response = self.send(request).await?;
        response.json().await.map_err(|source| Error::Request {
            service: SERVICE,
            source,
        })
    }

    async fn download_resource(&self, key: &str) -> Result<Vec<u8>> {
        let response = self.send(self.get(&format!("/o/r/{key}"))).await?;
        let bytes = response.bytes().await.map_err(|source| Error::Request {
            service: SERVICE,
            source,
        })?;
        Ok(bytes.to_vec())
    }
}
