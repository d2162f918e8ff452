//! Exam catalog cache.
//!
//! The catalog is fetched once from the backend and memoized for the
//! process lifetime (no TTL — invalidated only by restart). Loading is
//! single-flight: concurrent callers share one in-flight fetch, a failure
//! propagates to every waiter, and the next call after a failure retries.
//!
//! Flat backend items are grouped into categorized sections for display;
//! the section title comes from the first item seen for each category.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::bridge::{BackendClient, ExamCatalogItemDto};
use crate::models::{ExamCatalogItem, ExamCatalogSection};
use crate::version::RequestVersion;

// ═══════════════════════════════════════════════════════════
// CatalogCache
// ═══════════════════════════════════════════════════════════

/// A catalog item plus the category title needed for grouping.
/// The title never leaves the cache — public lookups return the bare item.
#[derive(Debug, Clone, PartialEq)]
struct CachedItem {
    item: ExamCatalogItem,
    category_title: String,
}

type LoadOutcome = Result<Arc<Vec<CachedItem>>, String>;

#[derive(Default)]
struct Inner {
    cache: Option<Arc<Vec<CachedItem>>>,
    inflight: Option<watch::Receiver<Option<LoadOutcome>>>,
}

/// What a `load()` caller should do, decided under the lock.
enum Plan {
    Hit(Arc<Vec<CachedItem>>),
    Wait(watch::Receiver<Option<LoadOutcome>>),
    Fetch(watch::Sender<Option<LoadOutcome>>),
}

/// Errors from catalog operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    Load(String),
    #[error("Internal lock error")]
    LockPoisoned,
}

/// Process-wide exam catalog cache.
///
/// Explicitly constructed and owned by the application root — never a
/// module-level singleton.
pub struct CatalogCache {
    backend: Arc<dyn BackendClient>,
    inner: Mutex<Inner>,
}

impl CatalogCache {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Cached sections filtered by a case-insensitive substring match on
    /// item name. An empty or whitespace query returns all sections.
    pub async fn list(&self, query: &str) -> Result<Vec<ExamCatalogSection>, CatalogError> {
        let entries = self.load().await?;
        let normalized = query.trim().to_lowercase();

        if normalized.is_empty() {
            return Ok(group_by_category(&entries));
        }

        let filtered: Vec<CachedItem> = entries
            .iter()
            .filter(|entry| entry.item.name.to_lowercase().contains(&normalized))
            .cloned()
            .collect();
        Ok(group_by_category(&filtered))
    }

    /// Lookup within the cache only; `None` before the first successful load.
    pub fn find_by_id(&self, id: &str) -> Option<ExamCatalogItem> {
        let inner = self.inner.lock().ok()?;
        inner
            .cache
            .as_ref()?
            .iter()
            .find(|entry| entry.item.id == id)
            .map(|entry| entry.item.clone())
    }

    /// Load the catalog, deduplicating concurrent fetches.
    ///
    /// Exactly one caller performs the backend fetch; everyone else awaits
    /// the shared outcome on a watch channel. On failure the cache stays
    /// empty so the next call retries.
    async fn load(&self) -> Result<Arc<Vec<CachedItem>>, CatalogError> {
        let plan = {
            let mut inner = self.inner.lock().map_err(|_| CatalogError::LockPoisoned)?;
            if let Some(items) = &inner.cache {
                Plan::Hit(items.clone())
            } else if let Some(rx) = &inner.inflight {
                Plan::Wait(rx.clone())
            } else {
                let (tx, rx) = watch::channel(None);
                inner.inflight = Some(rx);
                Plan::Fetch(tx)
            }
        };

        match plan {
            Plan::Hit(items) => Ok(items),
            Plan::Wait(mut rx) => loop {
                let outcome = rx.borrow().clone();
                if let Some(outcome) = outcome {
                    return outcome.map_err(CatalogError::Load);
                }
                if rx.changed().await.is_err() {
                    // Fetcher dropped without publishing — treat as a failed
                    // load; the next call starts a fresh fetch.
                    return Err(CatalogError::Load(
                        crate::bridge::GENERIC_FAILURE.to_string(),
                    ));
                }
            },
            Plan::Fetch(tx) => {
                tracing::debug!("Loading exam catalog from backend");
                let outcome: LoadOutcome = match self.backend.list_exam_catalog().await {
                    Ok(dtos) => {
                        let entries: Vec<CachedItem> =
                            dtos.into_iter().map(map_cached_item).collect();
                        tracing::info!(items = entries.len(), "Exam catalog loaded");
                        Ok(Arc::new(entries))
                    }
                    Err(err) => {
                        let message = err.user_message();
                        tracing::warn!(error = %message, "Exam catalog load failed");
                        Err(message)
                    }
                };

                if let Ok(mut inner) = self.inner.lock() {
                    inner.inflight = None;
                    if let Ok(items) = &outcome {
                        inner.cache = Some(items.clone());
                    }
                }
                let _ = tx.send(Some(outcome.clone()));
                outcome.map_err(CatalogError::Load)
            }
        }
    }
}

fn map_cached_item(dto: ExamCatalogItemDto) -> CachedItem {
    CachedItem {
        item: ExamCatalogItem {
            id: dto.id,
            name: dto.name,
            price: dto.price_cents as f64 / 100.0,
            category_id: dto.category_id,
        },
        category_title: dto.category_title,
    }
}

/// Group flat items into sections keyed by category id, preserving the
/// order in which categories first appear.
fn group_by_category(entries: &[CachedItem]) -> Vec<ExamCatalogSection> {
    let mut sections: Vec<ExamCatalogSection> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        match index.get(&entry.item.category_id) {
            Some(&at) => sections[at].items.push(entry.item.clone()),
            None => {
                index.insert(entry.item.category_id.clone(), sections.len());
                sections.push(ExamCatalogSection {
                    id: entry.item.category_id.clone(),
                    title: entry.category_title.clone(),
                    items: vec![entry.item.clone()],
                });
            }
        }
    }

    sections
}

// ═══════════════════════════════════════════════════════════
// CatalogSearchView — version-guarded search state
// ═══════════════════════════════════════════════════════════

/// Search state for the new-attendance dialog's catalog panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSearchState {
    pub sections: Vec<ExamCatalogSection>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Version-guarded catalog search.
///
/// A stale response (a search dispatched before a newer one) is discarded
/// on arrival instead of overwriting fresher sections — last-request-wins,
/// not cancellation.
pub struct CatalogSearchView {
    catalog: Arc<CatalogCache>,
    version: RequestVersion,
    state: Mutex<CatalogSearchState>,
}

impl CatalogSearchView {
    pub fn new(catalog: Arc<CatalogCache>) -> Self {
        Self {
            catalog,
            version: RequestVersion::new(),
            state: Mutex::new(CatalogSearchState::default()),
        }
    }

    /// Run a search and store the outcome unless a newer search started.
    pub async fn search(&self, query: &str) {
        let token = self.version.begin();
        if let Ok(mut state) = self.state.lock() {
            state.loading = true;
        }

        let result = self.catalog.list(query).await;

        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if !self.version.is_current(token) {
            return;
        }
        state.loading = false;
        match result {
            Ok(sections) => {
                state.sections = sections;
                state.error = None;
            }
            Err(err) => {
                state.sections = Vec::new();
                state.error = Some(err.to_string());
            }
        }
    }

    /// Current snapshot for rendering.
    pub fn state(&self) -> CatalogSearchState {
        self.state.lock().map(|state| state.clone()).unwrap_or_default()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
