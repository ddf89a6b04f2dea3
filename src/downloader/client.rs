// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::{self, Category};
use crate::downloader::{traits::Fetcher, urls::UrlTemplates};
use crate::error::ResourceError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Fetches catalog resources over HTTP with a single GET per call
pub struct HttpFetcher {
    client: Client,
    urls: UrlTemplates,
}

impl HttpFetcher {
    pub fn new(urls: UrlTemplates, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("genka/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, urls })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, id: &str, category: Category) -> Result<Vec<u8>, ResourceError> {
        if !catalog::is_valid(id, category) {
            return Err(ResourceError::Validation {
                id: id.to_string(),
                category,
            });
        }

        let url = self
            .urls
            .resource_url(category, id)
            .map_err(|source| ResourceError::Request {
                id: id.to_string(),
                source,
            })?;

        debug!(id, %category, url = %url, "Requesting resource");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ResourceError::Transport {
                id: id.to_string(),
                source,
            })?;

        // The response owns the connection; every early return below drops it.
        let status = response.status();
        if !status.is_success() {
            warn!(id, %category, url = %url, %status, "Resource request rejected");
            return Err(ResourceError::Status {
                id: id.to_string(),
                status,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| ResourceError::Decode {
                id: id.to_string(),
                source,
            })?;

        info!(id, %category, bytes = body.len(), "Resource downloaded");
        Ok(body.to_vec())
    }
}
