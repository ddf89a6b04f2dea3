// SPDX-License-Identifier: GPL-3.0-only
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::Category;
use crate::error::{BatchError, ResourceError};
use crate::store::validator::is_well_formed;

pub const DEFAULT_MAX_OPEN_FILES: usize = 8;

/// What a batch write commits when some of its items fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// Nothing from the batch stays on disk unless every item is written
    #[default]
    AllOrNothing,
    /// Each item is written independently; failures are reported together
    BestEffort,
}

/// Directory-scoped JSON file store, one subdirectory per category
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    policy: PersistPolicy,
    max_open_files: usize,
}

impl FileStore {
    /// Create a store rooted at `root`, which is made absolute but not created yet
    pub fn new(root: impl AsRef<Path>, policy: PersistPolicy) -> std::io::Result<Self> {
        Ok(Self {
            root: std::path::absolute(root.as_ref())?,
            policy,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
        })
    }

    pub fn with_max_open_files(mut self, max_open_files: usize) -> Self {
        self.max_open_files = max_open_files.clamp(1, Semaphore::MAX_PERMITS);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> PersistPolicy {
        self.policy
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    pub fn lang_dir(&self) -> PathBuf {
        self.category_dir(Category::LanguageFile)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.category_dir(Category::DataFile)
    }

    /// Path `id` is stored at, whether or not it exists yet
    pub fn file_path(&self, category: Category, id: &str) -> PathBuf {
        self.category_dir(category).join(format!("{}.json", id))
    }

    /// Create the category directory and its parents; existing directories are fine
    pub async fn ensure_dir(&self, category: Category) -> Result<PathBuf, ResourceError> {
        let dir = self.category_dir(category);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ResourceError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }

    /// Read back a previously mirrored file
    pub async fn load_file(&self, category: Category, id: &str) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.file_path(category, id)).await
    }

    /// Validate and write one `<id>.json` per payload
    ///
    /// Returns the absolute path of every written file. Which files survive a
    /// partial failure is decided by the store's [`PersistPolicy`].
    pub async fn save_batch<S>(
        &self,
        category: Category,
        ids: &[S],
        payloads: Vec<Vec<u8>>,
    ) -> Result<BTreeMap<String, PathBuf>, BatchError>
    where
        S: AsRef<str>,
    {
        if ids.len() != payloads.len() {
            return Err(BatchError::single(
                category,
                ResourceError::PayloadCountMismatch {
                    identifiers: ids.len(),
                    payloads: payloads.len(),
                },
            ));
        }

        let ids: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
        let unsafe_names: Vec<ResourceError> = ids
            .iter()
            .filter(|id| !is_plain_file_stem(id))
            .map(|id| ResourceError::Validation {
                id: id.clone(),
                category,
            })
            .collect();
        if !unsafe_names.is_empty() {
            return Err(BatchError::new(category, unsafe_names));
        }

        let dir = self
            .ensure_dir(category)
            .await
            .map_err(|e| BatchError::single(category, e))?;

        info!(
            %category,
            count = ids.len(),
            policy = ?self.policy,
            dir = %dir.display(),
            "Saving batch"
        );

        let result = match self.policy {
            PersistPolicy::AllOrNothing => {
                self.save_all_or_nothing(category, &dir, ids, payloads).await
            }
            PersistPolicy::BestEffort => {
                self.save_best_effort(category, &dir, ids, payloads).await
            }
        };

        match &result {
            Ok(paths) => info!(%category, count = paths.len(), "Batch saved"),
            Err(e) => warn!(
                %category,
                error = %e,
                committed = e.committed.len(),
                "Batch save failed"
            ),
        }
        result
    }

    async fn save_all_or_nothing(
        &self,
        category: Category,
        dir: &Path,
        ids: Vec<String>,
        payloads: Vec<Vec<u8>>,
    ) -> Result<BTreeMap<String, PathBuf>, BatchError> {
        let validated = self.run_per_item(&ids, payloads, validate).await;
        let (valid, failures) = split_outcomes(&ids, validated);
        if !failures.is_empty() {
            return Err(BatchError::new(category, failures));
        }

        let valid: Vec<Vec<u8>> = valid.into_iter().map(|(_, payload)| payload).collect();
        let staged = self
            .run_per_item(&ids, valid, |id, payload| stage(id, dir.to_path_buf(), payload))
            .await;
        let (staged, failures) = split_outcomes(&ids, staged);
        if !failures.is_empty() {
            discard(staged.iter().map(|(_, path)| path.clone())).await;
            return Err(BatchError::new(category, failures));
        }

        let targets: Vec<(PathBuf, PathBuf)> = staged
            .into_iter()
            .map(|(id, staged)| (staged, dir.join(format!("{}.json", id))))
            .collect();
        let committed = self
            .run_per_item(&ids, targets.clone(), |id, (staged, target)| {
                replace(id, staged, target)
            })
            .await;
        let (committed, failures) = split_outcomes(&ids, committed);
        if !failures.is_empty() {
            warn!(%category, "Rolling back partially committed batch");
            for (_, replaced) in committed {
                revert(replaced).await;
            }
            discard(targets.into_iter().map(|(staged, _)| staged)).await;
            return Err(BatchError::new(category, failures));
        }

        discard(committed.iter().filter_map(|(_, replaced)| replaced.backup.clone())).await;
        Ok(committed
            .into_iter()
            .map(|(id, replaced)| (id, replaced.target))
            .collect())
    }

    async fn save_best_effort(
        &self,
        category: Category,
        dir: &Path,
        ids: Vec<String>,
        payloads: Vec<Vec<u8>>,
    ) -> Result<BTreeMap<String, PathBuf>, BatchError> {
        let outcomes = self
            .run_per_item(&ids, payloads, |id, payload| {
                let dir = dir.to_path_buf();
                async move {
                    let payload = validate(id.clone(), payload).await?;
                    let target = dir.join(format!("{}.json", id));
                    let staged = stage(id.clone(), dir, payload).await?;
                    commit(id, staged, target).await
                }
            })
            .await;

        let (written, failures) = split_outcomes(&ids, outcomes);
        let written: BTreeMap<String, PathBuf> = written.into_iter().collect();
        if failures.is_empty() {
            Ok(written)
        } else {
            Err(BatchError::new(category, failures).with_committed(written))
        }
    }

    /// Run `task` once per item on its own tokio task and join them
    ///
    /// The returned outcomes line up with `ids`.
    async fn run_per_item<I, T, F, Fut>(
        &self,
        ids: &[String],
        inputs: Vec<I>,
        task: F,
    ) -> Vec<Result<T, ResourceError>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(String, I) -> Fut,
        Fut: Future<Output = Result<T, ResourceError>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_open_files));

        let handles: Vec<_> = ids
            .iter()
            .cloned()
            .zip(inputs)
            .map(|(id, input)| {
                let semaphore = Arc::clone(&semaphore);
                let work = task(id, input);
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    work.await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(ids)
            .map(|(joined, id)| {
                joined.unwrap_or_else(|e| {
                    Err(ResourceError::TaskFailed {
                        id: id.clone(),
                        message: e.to_string(),
                    })
                })
            })
            .collect()
    }
}

/// An identifier must map to exactly one file inside the category directory
fn is_plain_file_stem(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(['/', '\\'])
        && !id.chars().any(char::is_control)
}

fn split_outcomes<T>(
    ids: &[String],
    outcomes: Vec<Result<T, ResourceError>>,
) -> (Vec<(String, T)>, Vec<ResourceError>) {
    let mut ok = Vec::new();
    let mut failures = Vec::new();
    for (id, outcome) in ids.iter().zip(outcomes) {
        match outcome {
            Ok(value) => ok.push((id.clone(), value)),
            Err(e) => failures.push(e),
        }
    }
    (ok, failures)
}

async fn validate(id: String, payload: Vec<u8>) -> Result<Vec<u8>, ResourceError> {
    let (well_formed, payload) =
        tokio::task::spawn_blocking(move || (is_well_formed(&payload), payload))
            .await
            .map_err(|e| ResourceError::TaskFailed {
                id: id.clone(),
                message: e.to_string(),
            })?;

    if well_formed {
        Ok(payload)
    } else {
        debug!(id = %id, "Rejecting malformed payload");
        Err(ResourceError::MalformedPayload { id })
    }
}

/// Write `payload` next to its destination under a unique temporary name
async fn stage(id: String, dir: PathBuf, payload: Vec<u8>) -> Result<PathBuf, ResourceError> {
    let staged = dir.join(format!(".{}.json.{}.part", id, Uuid::new_v4()));
    if let Err(source) = tokio::fs::write(&staged, &payload).await {
        let _ = tokio::fs::remove_file(&staged).await;
        return Err(ResourceError::Io {
            id,
            path: staged,
            source,
        });
    }
    Ok(staged)
}

async fn commit(id: String, staged: PathBuf, target: PathBuf) -> Result<PathBuf, ResourceError> {
    if let Err(source) = tokio::fs::rename(&staged, &target).await {
        let _ = tokio::fs::remove_file(&staged).await;
        return Err(ResourceError::Io {
            id,
            path: target,
            source,
        });
    }
    debug!(id = %id, path = %target.display(), "File written");
    Ok(target)
}

/// A file renamed into place, and where the file it replaced was moved to
struct Replaced {
    target: PathBuf,
    backup: Option<PathBuf>,
}

/// Like [`commit`], but an existing file at `target` is moved aside first so
/// the commit can be undone with [`revert`]
async fn replace(id: String, staged: PathBuf, target: PathBuf) -> Result<Replaced, ResourceError> {
    let backup = match move_aside(&id, &target).await {
        Ok(backup) => backup,
        Err(e) => {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(e);
        }
    };

    match commit(id, staged, target.clone()).await {
        Ok(target) => Ok(Replaced { target, backup }),
        Err(e) => {
            if let Some(backup) = backup {
                restore(&backup, &target).await;
            }
            Err(e)
        }
    }
}

/// Rename a regular file at `target` to a unique hidden name next to it
///
/// Anything other than a regular file is left where it is.
async fn move_aside(id: &str, target: &Path) -> Result<Option<PathBuf>, ResourceError> {
    let io_error = |source| ResourceError::Io {
        id: id.to_string(),
        path: target.to_path_buf(),
        source,
    };

    match tokio::fs::symlink_metadata(target).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(e)),
    }

    let backup = target.with_file_name(format!(".{}.json.{}.bak", id, Uuid::new_v4()));
    tokio::fs::rename(target, &backup).await.map_err(io_error)?;
    Ok(Some(backup))
}

/// Undo a [`replace`]: put the previous file back, or remove the new one
async fn revert(replaced: Replaced) {
    match replaced.backup {
        Some(backup) => restore(&backup, &replaced.target).await,
        None => discard(std::iter::once(replaced.target)).await,
    }
}

async fn restore(backup: &Path, target: &Path) {
    match tokio::fs::rename(backup, target).await {
        Ok(()) => debug!(path = %target.display(), "Restored previous file"),
        Err(e) => warn!(
            path = %target.display(),
            backup = %backup.display(),
            error = %e,
            "Failed to restore previous file"
        ),
    }
}

async fn discard(paths: impl Iterator<Item = PathBuf>) {
    for path in paths {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Removed leftover file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove leftover file"
            ),
        }
    }
}
