//! Two-level cache of remote script bundles.
//!
//! Lookups go memory first, then the persistent [`RecordStore`], then the
//! network. A persisted record is only trusted when its integrity hash still
//! matches its text; otherwise it is treated as absent and the bundle is
//! fetched again.
//!
//! Concurrent callers for the same `formula_id:version` share one outstanding
//! load. The shared part ends at the compiled module: each caller extracts
//! its function with its own allow-list.

mod entry;

pub use entry::{BUNDLE_PREFIX, RemoteBundleCacheEntry, integrity_hash};

use crate::callable::Callable;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, fetch_text};
use crate::options::CacheOptions;
use crate::sandbox::{AllowedModules, CompiledModule, Fingerprint, Sandbox, fingerprint};
use crate::store::RecordStore;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

type SharedLoad = Shared<BoxFuture<'static, Result<CompiledModule>>>;

/// Size of the persistent bundle cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
}

/// The remote bundle cache. Cheap to clone.
#[derive(Clone)]
pub struct CacheManager {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn RecordStore>,
    fetcher: Arc<dyn Fetcher>,
    sandbox: Arc<Sandbox>,
    options: CacheOptions,
    /// (`formula_id:version`, allow-list) to extracted function.
    memory: RwLock<HashMap<(String, Fingerprint), Callable>>,
    /// `formula_id:version` to the load in progress.
    in_flight: Mutex<HashMap<String, SharedLoad>>,
}

/// Owned arguments of one load, so the shared future can be `'static`.
struct BundleRequest {
    source_url: String,
    function_name: String,
    formula_id: String,
    version: String,
}

impl BundleRequest {
    fn cache_key(&self) -> String {
        format!("{}:{}", self.formula_id, self.version)
    }

    fn store_key(&self) -> String {
        RemoteBundleCacheEntry::store_key(&self.formula_id, &self.version)
    }
}

impl CacheManager {
    pub fn new(
        store: Arc<dyn RecordStore>,
        fetcher: Arc<dyn Fetcher>,
        sandbox: Arc<Sandbox>,
        options: CacheOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                fetcher,
                sandbox,
                options,
                memory: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    /// Resolve `function_name` from the bundle at `source_url`.
    ///
    /// An empty `function_name` selects the first callable export.
    pub async fn get_or_load(
        &self,
        source_url: &str,
        function_name: &str,
        formula_id: &str,
        version: &str,
        allowed: &AllowedModules,
    ) -> Result<Callable> {
        let memory_key = (format!("{}:{}", formula_id, version), fingerprint(allowed));
        if let Some(callable) = self.inner.memory.read().get(&memory_key).cloned() {
            debug!(key = %memory_key.0, "bundle memory cache hit");
            return Ok(callable);
        }

        let request = BundleRequest {
            source_url: source_url.to_string(),
            function_name: function_name.to_string(),
            formula_id: formula_id.to_string(),
            version: version.to_string(),
        };
        let module = self.shared_load(request).await?;

        let name = (!function_name.is_empty()).then_some(function_name);
        let callable = self
            .inner
            .sandbox
            .extract_function(&module, name, allowed)
            .await?;
        self.inner
            .memory
            .write()
            .insert(memory_key, callable.clone());
        Ok(callable)
    }

    /// Join the outstanding load for the request's bundle, or start one.
    ///
    /// The in-flight entry is registered before anything is awaited, so every
    /// caller that arrives while the load runs finds it.
    fn shared_load(&self, request: BundleRequest) -> SharedLoad {
        let key = request.cache_key();
        let mut in_flight = self.inner.in_flight.lock();
        if let Some(load) = in_flight.get(&key) {
            debug!(key = %key, "joining in-flight bundle load");
            return load.clone();
        }

        let inner = self.inner.clone();
        let load = async move {
            let result = inner.load_module(&request).await;
            inner.in_flight.lock().remove(&request.cache_key());
            result
        }
        .boxed()
        .shared();
        in_flight.insert(key, load.clone());
        load
    }

    /// Delete all but the `keep_latest` most recently fetched versions of
    /// `formula_id`. Returns how many were deleted.
    pub async fn prune_versions(&self, formula_id: &str, keep_latest: usize) -> Result<usize> {
        let prefix = format!("{}{}:", BUNDLE_PREFIX, formula_id);
        let mut entries = self.inner.read_entries(&prefix).await?;
        // Ids may contain `:`, so the prefix also matches `{formula_id}:*` ids.
        entries.retain(|(_, entry)| entry.formula_id == formula_id);
        entries.sort_by(|a, b| b.1.fetched_at.cmp(&a.1.fetched_at));

        let mut removed = 0;
        for (key, entry) in entries.into_iter().skip(keep_latest) {
            self.inner.store.delete(&key).await?;
            self.inner.forget(&entry.id);
            removed += 1;
        }
        info!(formula_id, keep_latest, removed, "pruned bundle versions");
        Ok(removed)
    }

    /// Delete every bundle record and empty the in-memory caches.
    ///
    /// Records outside the bundle namespace are left alone.
    pub async fn clear_all(&self) -> Result<usize> {
        let records = self.inner.store.scan_prefix(BUNDLE_PREFIX).await?;
        for (key, _) in &records {
            self.inner.store.delete(key).await?;
            if let Some(id) = key.strip_prefix(BUNDLE_PREFIX) {
                self.inner.sandbox.forget(id);
            }
        }
        self.inner.memory.write().clear();
        info!(removed = records.len(), "cleared bundle cache");
        Ok(records.len())
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let records = self.inner.store.scan_prefix(BUNDLE_PREFIX).await?;
        let mut stats = CacheStats::default();
        for (key, bytes) in records {
            match serde_json::from_slice::<RemoteBundleCacheEntry>(&bytes) {
                Ok(entry) => {
                    stats.entries += 1;
                    stats.total_bytes += entry.source_text.len();
                }
                Err(err) => warn!(key = %key, error = %err, "unreadable bundle record"),
            }
        }
        Ok(stats)
    }

    /// Every readable bundle record, ordered by store key.
    pub async fn entries(&self) -> Result<Vec<RemoteBundleCacheEntry>> {
        Ok(self
            .inner
            .read_entries(BUNDLE_PREFIX)
            .await?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect())
    }

    /// Number of functions held in memory.
    pub fn memory_entries(&self) -> usize {
        self.inner.memory.read().len()
    }
}

impl Inner {
    async fn load_module(&self, request: &BundleRequest) -> Result<CompiledModule> {
        let cache_key = request.cache_key();
        let store_key = request.store_key();

        if let Some(entry) = self.read_trusted(&store_key, request).await {
            debug!(key = %store_key, "bundle persistent cache hit");
            return self
                .sandbox
                .compile(&entry.source_text, Some(&cache_key))
                .await;
        }

        info!(url = %request.source_url, key = %cache_key, "fetching remote bundle");
        let source = fetch_text(self.fetcher.as_ref(), &request.source_url).await?;
        let module = self.sandbox.compile(&source, Some(&cache_key)).await?;

        if self.options.persist {
            let entry = RemoteBundleCacheEntry::new(
                &request.formula_id,
                &request.version,
                &request.source_url,
                source,
                &request.function_name,
            );
            if let Err(err) = self.persist(&store_key, &entry).await {
                warn!(key = %store_key, error = %err, "failed to persist bundle");
            }
        }
        Ok(module)
    }

    /// The persisted entry for `store_key`, if present, intact and fetched
    /// from the same URL.
    async fn read_trusted(
        &self,
        store_key: &str,
        request: &BundleRequest,
    ) -> Option<RemoteBundleCacheEntry> {
        let bytes = match self.store.get(store_key).await {
            Ok(bytes) => bytes?,
            Err(err) => {
                warn!(key = %store_key, error = %err, "failed to read bundle record");
                return None;
            }
        };
        let entry: RemoteBundleCacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key = %store_key, error = %err, "unreadable bundle record");
                return None;
            }
        };
        if let Err(err) = entry.verify() {
            warn!(key = %store_key, error = %err, "discarding bundle record");
            return None;
        }
        if entry.source_url != request.source_url {
            debug!(key = %store_key, "bundle source url changed");
            return None;
        }
        Some(entry)
    }

    async fn persist(&self, store_key: &str, entry: &RemoteBundleCacheEntry) -> Result<()> {
        let bytes = serde_json::to_vec(entry).map_err(Error::storage)?;
        self.store.put(store_key, bytes).await
    }

    async fn read_entries(&self, prefix: &str) -> Result<Vec<(String, RemoteBundleCacheEntry)>> {
        let records = self.store.scan_prefix(prefix).await?;
        Ok(records
            .into_iter()
            .filter_map(|(key, bytes)| match serde_json::from_slice(&bytes) {
                Ok(entry) => Some((key, entry)),
                Err(err) => {
                    warn!(key = %key, error = %err, "unreadable bundle record");
                    None
                }
            })
            .collect())
    }

    /// Drop every in-memory trace of bundle `id` (`formula_id:version`).
    fn forget(&self, id: &str) {
        self.memory.write().retain(|(key, _), _| key != id);
        self.sandbox.forget(id);
    }
}
