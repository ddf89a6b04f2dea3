// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::catalog::Category;
use crate::config::Config;
use crate::downloader::Fetcher;
use crate::error::ResourceError;

enum Scripted {
    Body(Vec<u8>),
    Status(reqwest::StatusCode),
}

/// In-memory [`Fetcher`] with scripted responses and call accounting
pub struct StubFetcher {
    responses: HashMap<String, (Scripted, Duration)>,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answer `id` with `body` after `delay`
    pub fn with_body(mut self, id: &str, body: &str, delay: Duration) -> Self {
        self.responses
            .insert(id.to_string(), (Scripted::Body(body.as_bytes().to_vec()), delay));
        self
    }

    /// Answer `id` immediately with an HTTP error status
    pub fn with_status(self, id: &str, status: reqwest::StatusCode) -> Self {
        self.with_delayed_status(id, status, Duration::ZERO)
    }

    pub fn with_delayed_status(
        mut self,
        id: &str,
        status: reqwest::StatusCode,
        delay: Duration,
    ) -> Self {
        self.responses
            .insert(id.to_string(), (Scripted::Status(status), delay));
        self
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, id: &str, _category: Category) -> Result<Vec<u8>, ResourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let outcome = match self.responses.get(id) {
            Some((scripted, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                match scripted {
                    Scripted::Body(body) => Ok(body.clone()),
                    Scripted::Status(status) => Err(ResourceError::Status {
                        id: id.to_string(),
                        status: *status,
                    }),
                }
            }
            None => Err(ResourceError::Status {
                id: id.to_string(),
                status: reqwest::StatusCode::NOT_FOUND,
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

/// Create a test configuration mirroring into `root`
pub fn create_test_config(root: &Path) -> Config {
    Config {
        data_root: root.to_path_buf(),
        log_level: "error".to_string(), // Reduce log noise in tests
        ..Config::default()
    }
}
