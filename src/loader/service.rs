// SPDX-License-Identifier: GPL-3.0-only
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::catalog::{self, Category, DataFile, Language};
use crate::downloader::BatchFetcher;
use crate::error::{BatchError, LoadError, ResourceError};
use crate::store::FileStore;

/// Downloads catalog resources and mirrors them into a [`FileStore`]
pub struct ResourceLoader {
    fetcher: BatchFetcher,
    store: FileStore,
    cancel: CancellationToken,
}

impl ResourceLoader {
    pub fn new(fetcher: BatchFetcher, store: FileStore) -> Self {
        Self {
            fetcher,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts every in-flight download of this loader when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn lang_dir_path(&self) -> PathBuf {
        self.store.lang_dir()
    }

    pub fn data_dir_path(&self) -> PathBuf {
        self.store.data_dir()
    }

    /// Fetch every identifier, then save the whole batch
    ///
    /// Nothing is written unless every fetch succeeded.
    pub async fn load<S>(
        &self,
        category: Category,
        ids: &[S],
    ) -> Result<BTreeMap<String, PathBuf>, LoadError>
    where
        S: AsRef<str>,
    {
        info!(%category, count = ids.len(), "Loading resources");

        let payloads = self
            .fetcher
            .fetch_all_with_cancel(ids, category, self.cancel.clone())
            .await
            .map_err(LoadError::Fetch)?;

        let paths = self
            .store
            .save_batch(category, ids, payloads)
            .await
            .map_err(LoadError::Persist)?;

        info!(
            %category,
            count = paths.len(),
            dir = %self.store.category_dir(category).display(),
            "Resources mirrored"
        );
        Ok(paths)
    }

    pub async fn load_lang_files(
        &self,
        langs: &[Language],
    ) -> Result<BTreeMap<Language, PathBuf>, LoadError> {
        let ids: Vec<&str> = langs.iter().map(|l| l.as_str()).collect();
        let paths = self.load(Category::LanguageFile, &ids).await?;
        Ok(retype(langs, paths))
    }

    pub async fn load_data_files(
        &self,
        files: &[DataFile],
    ) -> Result<BTreeMap<DataFile, PathBuf>, LoadError> {
        let ids: Vec<&str> = files.iter().map(|f| f.as_str()).collect();
        let paths = self.load(Category::DataFile, &ids).await?;
        Ok(retype(files, paths))
    }

    pub async fn download_all_language_files(
        &self,
    ) -> Result<BTreeMap<String, PathBuf>, LoadError> {
        self.load(Category::LanguageFile, &catalog::all_identifiers(Category::LanguageFile))
            .await
    }

    pub async fn download_all_data_files(&self) -> Result<BTreeMap<String, PathBuf>, LoadError> {
        self.load(Category::DataFile, &catalog::all_identifiers(Category::DataFile))
            .await
    }

    /// Read a data file from the mirror, fetching it first if it is missing
    /// and `download_if_missing` is set
    pub async fn get_file(
        &self,
        file: DataFile,
        download_if_missing: bool,
    ) -> Result<Vec<u8>, LoadError> {
        let category = Category::DataFile;
        let read_error = |source| LoadError::Read {
            id: file.to_string(),
            category,
            source,
        };

        match self.store.load_file(category, file.as_str()).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && download_if_missing => {
                info!(file = %file, "Data file missing from mirror, downloading");
                let mut payloads = self
                    .fetcher
                    .fetch_all_with_cancel(&[file.as_str()], category, self.cancel.clone())
                    .await
                    .map_err(LoadError::Fetch)?;
                let bytes = payloads.pop().ok_or_else(|| {
                    LoadError::Fetch(BatchError::single(
                        category,
                        ResourceError::TaskFailed {
                            id: file.to_string(),
                            message: "fetch returned no payload".to_string(),
                        },
                    ))
                })?;
                self.store
                    .save_batch(category, &[file.as_str()], vec![bytes.clone()])
                    .await
                    .map_err(LoadError::Persist)?;
                Ok(bytes)
            }
            Err(e) => Err(read_error(e)),
        }
    }
}

/// Re-key a path map by the typed catalog entries it was built from
fn retype<K>(keys: &[K], mut paths: BTreeMap<String, PathBuf>) -> BTreeMap<K, PathBuf>
where
    K: Copy + Ord + std::fmt::Display,
{
    keys.iter()
        .filter_map(|key| paths.remove(&key.to_string()).map(|path| (*key, path)))
        .collect()
}
