// SPDX-License-Identifier: GPL-3.0-only
//! Local mirror of game text maps and Excel config data.
//!
//! [`downloader::BatchFetcher`] downloads a batch of catalog resources
//! concurrently, [`store::FileStore`] validates and writes them under
//! `<root>/langs` and `<root>/data`, and [`loader::ResourceLoader`] ties the two
//! together.

pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod logging;
pub mod store;

#[cfg(test)]
mod test_helpers;

pub use catalog::{Category, DataFile, Language};
pub use error::{BatchError, ErrorKind, LoadError, ResourceError};
