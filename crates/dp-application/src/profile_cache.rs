//! Per-path cache of data profiles and previews.

use dp_core::epoch::ProjectScope;
use dp_core::error::{DpError, Result};
use dp_core::profile::{DataGateway, DataProfile, PreviewRow};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Profile and preview of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSnapshot {
    pub path: String,
    pub profile: DataProfile,
    pub preview: Vec<PreviewRow>,
}

/// What callers observe for a path.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileStatus {
    Idle,
    Loading,
    Ready(Arc<ProfileSnapshot>),
    Error(DpError),
}

impl ProfileStatus {
    pub fn snapshot(&self) -> Option<&Arc<ProfileSnapshot>> {
        match self {
            Self::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<ProfileSnapshot>>>>;

enum CacheEntry {
    /// One fetch per path; later callers await the same future.
    Loading { generation: u64, fetch: SharedFetch },
    Ready(Arc<ProfileSnapshot>),
    /// Not a cached value: the next `ensure_profile` retries.
    Failed(DpError),
}

/// Caches profiles by file path.
///
/// Entries are only dropped by [`invalidate`](Self::invalidate) (re-upload)
/// or [`refresh`](Self::refresh). A fetch that completes after its entry was
/// invalidated is not stored.
pub struct DataProfileCache {
    scope: ProjectScope,
    gateway: Arc<dyn DataGateway>,
    preview_limit: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
    generation: AtomicU64,
}

impl DataProfileCache {
    pub fn new(scope: ProjectScope, gateway: Arc<dyn DataGateway>, preview_limit: usize) -> Self {
        Self {
            scope,
            gateway,
            preview_limit,
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn preview_limit(&self) -> usize {
        self.preview_limit
    }

    fn start_fetch(&self, path: &str) -> SharedFetch {
        let gateway = Arc::clone(&self.gateway);
        let path = path.to_string();
        let limit = self.preview_limit;
        async move {
            tracing::debug!("[ProfileCache] Fetching profile of {}", path);
            let (profile, preview) =
                futures::try_join!(gateway.profile(&path), gateway.preview(&path, limit))?;
            Ok(Arc::new(ProfileSnapshot {
                path,
                profile,
                preview,
            }))
        }
        .boxed()
        .shared()
    }

    /// Returns the cached profile of `path`, fetching it if needed.
    ///
    /// Concurrent calls for the same path share one fetch. Errors are
    /// reported as [`ProfileStatus::Error`], never returned.
    pub async fn ensure_profile(&self, path: &str) -> ProfileStatus {
        let (generation, fetch) = {
            let mut entries = self.entries.lock().await;
            match entries.get(path) {
                Some(CacheEntry::Ready(snapshot)) => return ProfileStatus::Ready(snapshot.clone()),
                Some(CacheEntry::Loading { generation, fetch }) => (*generation, fetch.clone()),
                Some(CacheEntry::Failed(_)) | None => {
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    let fetch = self.start_fetch(path);
                    entries.insert(
                        path.to_string(),
                        CacheEntry::Loading {
                            generation,
                            fetch: fetch.clone(),
                        },
                    );
                    (generation, fetch)
                }
            }
        };

        let result = fetch.await;

        let mut entries = self.entries.lock().await;
        let owns_entry = matches!(
            entries.get(path),
            Some(CacheEntry::Loading { generation: g, .. }) if *g == generation
        );
        if owns_entry && self.scope.is_current() {
            let entry = match &result {
                Ok(snapshot) => CacheEntry::Ready(snapshot.clone()),
                Err(e) => {
                    tracing::warn!("[ProfileCache] Profile of {} failed: {}", path, e);
                    CacheEntry::Failed(e.clone())
                }
            };
            entries.insert(path.to_string(), entry);
        } else if entries.get(path).is_none() {
            tracing::debug!("[ProfileCache] Discarding profile of invalidated {}", path);
        }
        Self::status_of(entries.get(path))
    }

    /// Drops the entry of `path`. Returns whether one existed.
    pub async fn invalidate(&self, path: &str) -> bool {
        let removed = self.entries.lock().await.remove(path).is_some();
        if removed {
            tracing::debug!("[ProfileCache] Invalidated {}", path);
        }
        removed
    }

    /// Invalidates and fetches again.
    pub async fn refresh(&self, path: &str) -> ProfileStatus {
        self.invalidate(path).await;
        self.ensure_profile(path).await
    }

    /// Current status without triggering a fetch.
    pub async fn status(&self, path: &str) -> ProfileStatus {
        Self::status_of(self.entries.lock().await.get(path))
    }

    fn status_of(entry: Option<&CacheEntry>) -> ProfileStatus {
        match entry {
            None => ProfileStatus::Idle,
            Some(CacheEntry::Loading { .. }) => ProfileStatus::Loading,
            Some(CacheEntry::Ready(snapshot)) => ProfileStatus::Ready(snapshot.clone()),
            Some(CacheEntry::Failed(e)) => ProfileStatus::Error(e.clone()),
        }
    }
}
