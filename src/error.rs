// SPDX-License-Identifier: GPL-3.0-only
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::Category;

/// Coarse classification of a [`ResourceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Decode,
    MalformedPayload,
    Io,
    Cancelled,
    Internal,
}

/// Failure of a single resource within a fetch or persist operation
#[derive(thiserror::Error, Debug)]
pub enum ResourceError {
    #[error("'{id}' is not a known {category}")]
    Validation { id: String, category: Category },

    #[error("Failed to build request URL for '{id}': {source}")]
    Request {
        id: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Transport failure while fetching '{id}': {source}")]
    Transport {
        id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server answered HTTP {status} for '{id}'")]
    Status { id: String, status: reqwest::StatusCode },

    #[error("Failed to read response body for '{id}': {source}")]
    Decode {
        id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Payload for '{id}' is not well-formed JSON")]
    MalformedPayload { id: String },

    #[error("I/O error for '{id}' at {}: {source}", .path.display())]
    Io {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fetch of '{id}' was cancelled")]
    Cancelled { id: String },

    #[error("Fetch of '{id}' did not finish within {after:?}")]
    DeadlineElapsed { id: String, after: Duration },

    #[error("Task for '{id}' failed: {message}")]
    TaskFailed { id: String, message: String },

    #[error("Batch has {identifiers} identifiers but {payloads} payloads")]
    PayloadCountMismatch { identifiers: usize, payloads: usize },
}

impl ResourceError {
    /// Identifier this error is about, if it concerns a single resource
    pub fn id(&self) -> Option<&str> {
        match self {
            ResourceError::Validation { id, .. }
            | ResourceError::Request { id, .. }
            | ResourceError::Transport { id, .. }
            | ResourceError::Status { id, .. }
            | ResourceError::Decode { id, .. }
            | ResourceError::MalformedPayload { id }
            | ResourceError::Io { id, .. }
            | ResourceError::Cancelled { id }
            | ResourceError::DeadlineElapsed { id, .. }
            | ResourceError::TaskFailed { id, .. } => Some(id.as_str()),
            ResourceError::CreateDir { .. } | ResourceError::PayloadCountMismatch { .. } => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ResourceError::Validation { .. } | ResourceError::PayloadCountMismatch { .. } => {
                ErrorKind::Validation
            }
            ResourceError::Request { .. }
            | ResourceError::Transport { .. }
            | ResourceError::Status { .. }
            | ResourceError::DeadlineElapsed { .. } => ErrorKind::Transport,
            ResourceError::Decode { .. } => ErrorKind::Decode,
            ResourceError::MalformedPayload { .. } => ErrorKind::MalformedPayload,
            ResourceError::Io { .. } | ResourceError::CreateDir { .. } => ErrorKind::Io,
            ResourceError::Cancelled { .. } => ErrorKind::Cancelled,
            ResourceError::TaskFailed { .. } => ErrorKind::Internal,
        }
    }
}

/// Aggregate failure of a batch, naming every offending identifier
#[derive(Debug)]
pub struct BatchError {
    pub category: Category,
    /// Failures in identifier order
    pub failures: Vec<ResourceError>,
    /// Files written before the batch failed (best-effort persistence only)
    pub committed: BTreeMap<String, PathBuf>,
}

impl BatchError {
    pub fn new(category: Category, failures: Vec<ResourceError>) -> Self {
        Self {
            category,
            failures,
            committed: BTreeMap::new(),
        }
    }

    pub fn single(category: Category, failure: ResourceError) -> Self {
        Self::new(category, vec![failure])
    }

    pub fn with_committed(mut self, committed: BTreeMap<String, PathBuf>) -> Self {
        self.committed = committed;
        self
    }

    /// The first failure in identifier order
    pub fn primary(&self) -> Option<&ResourceError> {
        self.failures.first()
    }

    /// Identifiers named by the failures, in identifier order
    pub fn identifiers(&self) -> Vec<&str> {
        self.failures.iter().filter_map(ResourceError::id).collect()
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primary() {
            Some(primary) => write!(
                f,
                "{} batch failed for [{}]: {}",
                self.category,
                self.identifiers().join(", "),
                primary
            ),
            None => write!(f, "{} batch failed", self.category),
        }
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.primary()
            .map(|primary| primary as &(dyn std::error::Error + 'static))
    }
}

/// Errors surfaced by the resource loader
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Failed to fetch: {0}")]
    Fetch(#[source] BatchError),

    #[error("Failed to save: {0}")]
    Persist(#[source] BatchError),

    #[error("Failed to read {category} '{id}' from disk: {source}")]
    Read {
        id: String,
        category: Category,
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// The underlying batch error, if any stage of a batch failed
    pub fn batch(&self) -> Option<&BatchError> {
        match self {
            LoadError::Fetch(e) | LoadError::Persist(e) => Some(e),
            LoadError::Read { .. } => None,
        }
    }
}
