//! Application root state.
//!
//! `AppState` explicitly constructs and owns every service and the catalog
//! cache — there are no module-level singletons. The app shell builds one
//! `AppState` around its backend bridge at startup and hands `Arc`s to the
//! screens; tests build one around a scripted stub.

use std::sync::Arc;

use crate::bridge::BackendClient;
use crate::catalog::{CatalogCache, CatalogSearchView};
use crate::patients::{DirectoryView, PatientDirectory};
use crate::queue::{AttendanceQueueService, QueueView};
use crate::record::PatientRecordService;
use crate::toast::ToastQueue;

/// Shared application state.
pub struct AppState {
    backend: Arc<dyn BackendClient>,
    pub catalog: Arc<CatalogCache>,
    pub records: Arc<PatientRecordService>,
    pub queue: Arc<AttendanceQueueService>,
    pub directory: Arc<PatientDirectory>,
    pub toasts: ToastQueue,
}

impl AppState {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        tracing::debug!("Building application state");
        Self {
            catalog: Arc::new(CatalogCache::new(backend.clone())),
            records: Arc::new(PatientRecordService::new(backend.clone())),
            queue: Arc::new(AttendanceQueueService::new(backend.clone())),
            directory: Arc::new(PatientDirectory::new(backend.clone())),
            toasts: ToastQueue::new(),
            backend,
        }
    }

    /// The raw backend handle, for collaborators not covered by a service.
    pub fn backend(&self) -> Arc<dyn BackendClient> {
        self.backend.clone()
    }

    /// Fresh queue screen state, scoped to today.
    pub fn queue_view(&self) -> QueueView {
        QueueView::new(self.queue.clone())
    }

    /// Fresh patients screen state.
    pub fn directory_view(&self) -> DirectoryView {
        DirectoryView::new(self.directory.clone())
    }

    /// Fresh catalog search state for the new-attendance dialog.
    pub fn catalog_search(&self) -> CatalogSearchView {
        CatalogSearchView::new(self.catalog.clone())
    }
}
