//! The `cache` command - inspect and maintain the persistent bundle cache.

use std::process::ExitCode;
use std::sync::Arc;

use formulate::{CacheManager, FormulateConfig, Sandbox};

use crate::cli::{CacheAction, CacheArgs};
use crate::common::file_store::FileStore;
use crate::common::http::HttpFetcher;
use crate::common::{CliError, CliResult, block_on};

/// Run the cache command.
pub fn run(args: CacheArgs, config: FormulateConfig) -> CliResult<ExitCode> {
    let store = FileStore::open(&args.cache_dir)?;
    let cache = CacheManager::new(
        Arc::new(store),
        Arc::new(HttpFetcher::new()),
        Arc::new(Sandbox::new(config.sandbox)),
        config.cache,
    );

    block_on(async {
        match args.action {
            CacheAction::Stats => {
                let stats = cache.stats().await?;
                println!("entries: {}", stats.entries);
                println!("total bytes: {}", stats.total_bytes);
                for entry in cache.entries().await? {
                    println!("  {} <- {} ({})", entry.id, entry.source_url, entry.fetched_at.to_rfc3339());
                }
            }
            CacheAction::Prune { id, keep } => {
                let keep = keep.unwrap_or(cache.options().keep_latest);
                let removed = cache.prune_versions(&id, keep).await?;
                println!("removed {} version(s) of {}", removed, id);
            }
            CacheAction::Clear => {
                let removed = cache.clear_all().await?;
                println!("removed {} bundle(s)", removed);
            }
        }
        Ok::<_, CliError>(ExitCode::SUCCESS)
    })?
}
