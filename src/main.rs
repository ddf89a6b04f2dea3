// SPDX-License-Identifier: GPL-3.0-only
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use genka::catalog::Category;
use genka::config::Config;
use genka::downloader::{BatchFetcher, HttpFetcher};
use genka::loader::ResourceLoader;
use genka::logging::setup_logging;
use genka::store::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    setup_logging(&config.log_level, config.log_format)?;

    info!("Starting genka v{}", env!("CARGO_PKG_VERSION"));

    let fetcher = HttpFetcher::new(config.url_templates()?, config.request_timeout())?;
    let store = FileStore::new(&config.data_root, config.persist_policy)?
        .with_max_open_files(config.max_concurrency);
    info!(root = %store.root().display(), policy = ?store.policy(), "Mirror initialized");

    let loader = ResourceLoader::new(
        BatchFetcher::new(Arc::new(fetcher), config.batch_options()),
        store,
    );

    let cancel = loader.cancellation_token();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received shutdown signal (Ctrl+C), cancelling downloads");
                cancel.cancel();
            }
            Err(err) => {
                error!(error = %err, "Unable to listen for shutdown signal");
            }
        }
    });

    let mut failed = 0;
    for category in [Category::LanguageFile, Category::DataFile] {
        let ids = config.selected(category);
        if ids.is_empty() {
            info!(%category, "Nothing selected, skipping");
            continue;
        }

        match loader.load(category, &ids).await {
            Ok(paths) => {
                for (id, path) in &paths {
                    info!(%category, id = %id, path = %path.display(), "Mirrored");
                }
            }
            Err(e) => {
                error!(%category, error = %e, "Failed to mirror resources");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of the selected categories could not be mirrored", failed);
    }

    info!("Mirror complete");
    Ok(())
}
