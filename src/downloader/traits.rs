// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;

use crate::catalog::Category;
use crate::error::ResourceError;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the raw bytes of one resource, without retrying
    async fn fetch(&self, id: &str, category: Category) -> Result<Vec<u8>, ResourceError>;
}
