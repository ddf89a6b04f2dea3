// SPDX-License-Identifier: GPL-3.0-only
pub mod traits;
pub mod client;
pub mod urls;
pub mod batch;

pub use traits::Fetcher;
pub use client::HttpFetcher;
pub use urls::UrlTemplates;
pub use batch::{BatchFetcher, BatchOptions};
