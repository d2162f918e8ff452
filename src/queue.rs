//! Attendance queue — filtering, status transitions, server-backed state.
//!
//! The pure half of this module is a set of list transforms: date, tab and
//! free-text scoping, date-scoped tab counts, and the `mark_as_done`
//! transition. All of them produce new collections; nothing is mutated in
//! place, so a reader holding a previous snapshot always sees consistent
//! data.
//!
//! The other half talks to the backend. `AttendanceQueueService` lists and
//! completes attendances; `QueueView` is the screen's state machine, with
//! the reload-after-complete policy: after a completion the queue is
//! refetched and the server response is the sole source of truth — the
//! local `mark_as_done` projection is never applied in this path.

use std::sync::{Arc, LazyLock, Mutex};

use regex::Regex;

use crate::bridge::{
    AttendanceQueueItemDto, AttendanceQueueQuery, BackendClient, CompleteAttendanceInput,
    InvokeError,
};
use crate::models::{
    AttendanceItem, AttendanceStatus, AttendanceTab, AttendanceTabCounts, AttendanceUrgency,
};
use crate::record::derive_protocol;
use crate::version::RequestVersion;

// ═══════════════════════════════════════════════════════════
// Pure transforms
// ═══════════════════════════════════════════════════════════

/// Keep items scheduled on `date_iso` (`YYYY-MM-DD`), comparing the date
/// part of the scheduling timestamp.
pub fn filter_by_date(items: &[AttendanceItem], date_iso: &str) -> Vec<AttendanceItem> {
    items
        .iter()
        .filter(|item| item.scheduled_at.get(0..10) == Some(date_iso))
        .cloned()
        .collect()
}

/// Keep items matching the tab's status. The two tabs partition the
/// queue: scheduled ⇔ waiting, completed ⇔ done.
pub fn filter_by_tab(items: &[AttendanceItem], tab: AttendanceTab) -> Vec<AttendanceItem> {
    let status = tab.status();
    items
        .iter()
        .filter(|item| item.status == status)
        .cloned()
        .collect()
}

/// Case-insensitive substring match over patient name, protocol and the
/// space-joined exam names. An empty or whitespace query is the identity.
pub fn filter_by_query(items: &[AttendanceItem], query: &str) -> Vec<AttendanceItem> {
    let normalized = query.trim().to_lowercase();
    if normalized.is_empty() {
        return items.to_vec();
    }

    items
        .iter()
        .filter(|item| {
            let haystack = format!(
                "{} {} {}",
                item.patient_name,
                item.protocol,
                item.exams.join(" ")
            )
            .to_lowercase();
            haystack.contains(&normalized)
        })
        .cloned()
        .collect()
}

/// Tab counts within the date-filtered subset only — never global.
pub fn count_by_tab(items: &[AttendanceItem], date_iso: &str) -> AttendanceTabCounts {
    let in_date = filter_by_date(items, date_iso);
    AttendanceTabCounts {
        scheduled: in_date
            .iter()
            .filter(|item| item.status == AttendanceStatus::Waiting)
            .count(),
        completed: in_date
            .iter()
            .filter(|item| item.status == AttendanceStatus::Done)
            .count(),
    }
}

/// Transition the matching item to done, stamping `completed_at`.
///
/// Non-mutating: returns a new list. Items already done are left
/// untouched, which makes a double completion a no-op.
pub fn mark_as_done(items: &[AttendanceItem], id: &str, when_iso: &str) -> Vec<AttendanceItem> {
    items
        .iter()
        .map(|item| {
            if item.id != id || item.status == AttendanceStatus::Done {
                return item.clone();
            }
            AttendanceItem {
                status: AttendanceStatus::Done,
                completed_at: Some(when_iso.to_string()),
                ..item.clone()
            }
        })
        .collect()
}

pub fn find_by_id<'a>(items: &'a [AttendanceItem], id: &str) -> Option<&'a AttendanceItem> {
    items.iter().find(|item| item.id == id)
}

// ═══════════════════════════════════════════════════════════
// Backend DTO mapping
// ═══════════════════════════════════════════════════════════

static CIVIL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Map one backend queue row to the UI item.
///
/// The queue DTO carries neither protocol nor urgency: the protocol is
/// derived from the attendance id, urgency defaults to normal.
/// `completed_at` mirrors the server's update timestamp only for
/// completed rows.
pub fn map_queue_item(dto: AttendanceQueueItemDto) -> AttendanceItem {
    let done = dto.status.eq_ignore_ascii_case("completed");
    AttendanceItem {
        protocol: derive_protocol(&dto.attendance_id),
        id: dto.attendance_id,
        patient_name: dto.patient_name,
        exams: dto.exam_names,
        urgency: AttendanceUrgency::Normal,
        status: if done {
            AttendanceStatus::Done
        } else {
            AttendanceStatus::Waiting
        },
        scheduled_at: coerce_to_datetime(&dto.exam_date),
        completed_at: done.then_some(dto.updated_at),
    }
}

/// Pad a bare civil date to a full timestamp (`T00:00:00`); anything else
/// passes through unchanged.
fn coerce_to_datetime(value: &str) -> String {
    let raw = value.trim();
    if CIVIL_DATE.is_match(raw) {
        format!("{raw}T00:00:00")
    } else {
        raw.to_string()
    }
}

/// Today as `YYYY-MM-DD` in local time — the queue's default date scope.
pub fn today_iso() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

// ═══════════════════════════════════════════════════════════
// AttendanceQueueService
// ═══════════════════════════════════════════════════════════

/// Errors from queue operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("{0}")]
    Backend(String),
}

impl From<InvokeError> for QueueError {
    fn from(err: InvokeError) -> Self {
        QueueError::Backend(err.user_message())
    }
}

/// Backend-synchronized queue access.
pub struct AttendanceQueueService {
    backend: Arc<dyn BackendClient>,
}

impl AttendanceQueueService {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    /// List the queue for a date, with an optional free-text query.
    /// A blank query is omitted from the backend call entirely.
    pub async fn load(&self, date: &str, query: &str) -> Result<Vec<AttendanceItem>, QueueError> {
        let trimmed = query.trim();
        let input = AttendanceQueueQuery {
            date: Some(date.to_string()),
            status: None,
            query: (!trimmed.is_empty()).then(|| trimmed.to_string()),
        };

        let rows = self.backend.list_attendance_queue(input).await?;
        tracing::debug!(date, rows = rows.len(), "Attendance queue loaded");
        Ok(rows.into_iter().map(map_queue_item).collect())
    }

    /// Complete one attendance and return the server's updated row.
    ///
    /// Callers must reload the queue afterwards; the reload, not this
    /// return value, is the source of truth.
    pub async fn complete(&self, attendance_id: &str) -> Result<AttendanceItem, QueueError> {
        let dto = self
            .backend
            .complete_attendance(CompleteAttendanceInput {
                attendance_id: attendance_id.to_string(),
            })
            .await?;
        tracing::info!(attendance_id, "Attendance completed");
        Ok(map_queue_item(dto))
    }
}

// ═══════════════════════════════════════════════════════════
// QueueView — the attendance screen state machine
// ═══════════════════════════════════════════════════════════

/// Snapshot of the queue screen state.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueState {
    pub items: Vec<AttendanceItem>,
    pub selected_tab: AttendanceTab,
    pub selected_date: String,
    pub query: String,
    pub loading: bool,
    pub loaded_once: bool,
    pub error: Option<String>,
}

impl QueueState {
    fn new(selected_date: String) -> Self {
        Self {
            items: Vec::new(),
            selected_tab: AttendanceTab::Scheduled,
            selected_date,
            query: String::new(),
            loading: false,
            loaded_once: false,
            error: None,
        }
    }
}

/// Version-guarded queue screen state.
///
/// Reloads are last-request-wins: a stale response is discarded rather
/// than overwriting a newer one. Completion is sequential — the backend
/// call is awaited before the reload starts, so the two never overlap.
pub struct QueueView {
    service: Arc<AttendanceQueueService>,
    version: RequestVersion,
    state: Mutex<QueueState>,
}

impl QueueView {
    /// A view scoped to today's date.
    pub fn new(service: Arc<AttendanceQueueService>) -> Self {
        Self::with_date(service, today_iso())
    }

    /// A view scoped to an explicit date (also used by tests for
    /// deterministic fixtures).
    pub fn with_date(service: Arc<AttendanceQueueService>, date_iso: String) -> Self {
        Self {
            service,
            version: RequestVersion::new(),
            state: Mutex::new(QueueState::new(date_iso)),
        }
    }

    /// Refetch the queue for the current date/query.
    pub async fn reload(&self) {
        let (token, date, query) = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            state.loading = true;
            state.error = None;
            (
                self.version.begin(),
                state.selected_date.clone(),
                state.query.clone(),
            )
        };

        let result = self.service.load(&date, &query).await;

        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if !self.version.is_current(token) {
            return;
        }
        state.loading = false;
        state.loaded_once = true;
        match result {
            Ok(items) => state.items = items,
            Err(err) => {
                state.items = Vec::new();
                state.error = Some(err.to_string());
            }
        }
    }

    /// Switch tab. Purely local — tabs partition already-loaded items.
    pub fn set_tab(&self, tab: AttendanceTab) {
        if let Ok(mut state) = self.state.lock() {
            state.selected_tab = tab;
        }
    }

    /// Change the free-text query and refetch.
    pub async fn set_query(&self, query: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.query = query.to_string();
        }
        self.reload().await;
    }

    /// Change the date scope and refetch.
    pub async fn set_date(&self, date_iso: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.selected_date = date_iso.to_string();
        }
        self.reload().await;
    }

    /// Complete an attendance, then reload.
    ///
    /// No optimistic update: the refetched queue is the only way the
    /// completion becomes visible.
    pub async fn complete(&self, attendance_id: &str) -> Result<(), QueueError> {
        if let Ok(mut state) = self.state.lock() {
            state.loading = true;
            state.error = None;
        }

        match self.service.complete(attendance_id).await {
            Ok(_) => {
                self.reload().await;
                Ok(())
            }
            Err(err) => {
                if let Ok(mut state) = self.state.lock() {
                    state.loading = false;
                    state.error = Some(err.to_string());
                }
                Err(err)
            }
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> QueueState {
        self.state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_else(|_| QueueState::new(String::new()))
    }

    /// Items visible under the current date, tab and query.
    pub fn visible_items(&self) -> Vec<AttendanceItem> {
        let state = self.state();
        let in_date = filter_by_date(&state.items, &state.selected_date);
        let in_tab = filter_by_tab(&in_date, state.selected_tab);
        filter_by_query(&in_tab, &state.query)
    }

    /// Date-scoped tab counts for the tab strip.
    pub fn counts(&self) -> AttendanceTabCounts {
        let state = self.state();
        count_by_tab(&state.items, &state.selected_date)
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const DATE: &str = "2026-02-13";
    const OTHER_DATE: &str = "2026-02-14";

    fn item(
        id: &str,
        name: &str,
        protocol: &str,
        exams: &[&str],
        status: AttendanceStatus,
        scheduled_at: &str,
    ) -> AttendanceItem {
        AttendanceItem {
            id: id.to_string(),
            patient_name: name.to_string(),
            protocol: protocol.to_string(),
            exams: exams.iter().map(|e| e.to_string()).collect(),
            urgency: AttendanceUrgency::Normal,
            status,
            scheduled_at: scheduled_at.to_string(),
            completed_at: (status == AttendanceStatus::Done)
                .then(|| format!("{DATE}T10:00:00")),
        }
    }

    fn fixture() -> Vec<AttendanceItem> {
        vec![
            item(
                "1",
                "Maria",
                "#100",
                &["GLICOSE"],
                AttendanceStatus::Waiting,
                &format!("{DATE}T08:00:00"),
            ),
            item(
                "2",
                "Joao",
                "#101",
                &["BETA HCG"],
                AttendanceStatus::Done,
                &format!("{DATE}T09:00:00"),
            ),
            item(
                "3",
                "Ana",
                "#102",
                &["COLESTEROL"],
                AttendanceStatus::Waiting,
                &format!("{OTHER_DATE}T11:00:00"),
            ),
        ]
    }

    // ── Filtering laws ───────────────────────────────────

    #[test]
    fn tabs_partition_the_queue() {
        let items = fixture();
        let scheduled = filter_by_tab(&items, AttendanceTab::Scheduled);
        let completed = filter_by_tab(&items, AttendanceTab::Completed);

        assert_eq!(scheduled.len() + completed.len(), items.len());
        assert!(scheduled.iter().all(|i| i.status == AttendanceStatus::Waiting));
        assert!(completed.iter().all(|i| i.status == AttendanceStatus::Done));
        assert!(scheduled.iter().all(|s| !completed.iter().any(|c| c.id == s.id)));
    }

    #[test]
    fn filters_by_date_on_the_timestamp_prefix() {
        let in_date = filter_by_date(&fixture(), DATE);
        assert_eq!(in_date.len(), 2);
        assert_eq!(
            in_date.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            ["1", "2"]
        );
    }

    #[test]
    fn date_filter_survives_short_timestamps() {
        let mut items = fixture();
        items[0].scheduled_at = "bad".into();
        assert_eq!(filter_by_date(&items, DATE).len(), 1);
    }

    #[test]
    fn query_matches_name_protocol_and_exams() {
        let items = fixture();
        assert_eq!(filter_by_query(&items, "maria").len(), 1);
        assert_eq!(filter_by_query(&items, "#101").len(), 1);
        assert_eq!(filter_by_query(&items, "beta").len(), 1);
        assert_eq!(filter_by_query(&items, "nobody").len(), 0);
    }

    #[test]
    fn blank_query_is_identity() {
        let items = fixture();
        assert_eq!(filter_by_query(&items, ""), items);
        assert_eq!(filter_by_query(&items, "   "), items);
    }

    #[test]
    fn counts_are_scoped_to_the_date() {
        let counts = count_by_tab(&fixture(), DATE);
        assert_eq!(counts.scheduled, 1);
        assert_eq!(counts.completed, 1);

        // Item 3 is waiting on another date and must not leak in.
        let other = count_by_tab(&fixture(), OTHER_DATE);
        assert_eq!(other.scheduled, 1);
        assert_eq!(other.completed, 0);
    }

    #[test]
    fn counts_agree_with_composed_filters() {
        let items = fixture();
        let counts = count_by_tab(&items, DATE);
        let in_date = filter_by_date(&items, DATE);
        assert_eq!(
            counts.scheduled,
            filter_by_tab(&in_date, AttendanceTab::Scheduled).len()
        );
        assert_eq!(
            counts.completed,
            filter_by_tab(&in_date, AttendanceTab::Completed).len()
        );
    }

    // ── mark_as_done ─────────────────────────────────────

    #[test]
    fn mark_as_done_transitions_and_stamps() {
        let when = format!("{DATE}T12:30:00");
        let updated = mark_as_done(&fixture(), "1", &when);

        let done = find_by_id(&updated, "1").unwrap();
        assert_eq!(done.status, AttendanceStatus::Done);
        assert_eq!(done.completed_at.as_deref(), Some(when.as_str()));
        assert_eq!(done.patient_name, "Maria");

        let untouched = find_by_id(&updated, "3").unwrap();
        assert_eq!(untouched.status, AttendanceStatus::Waiting);
    }

    #[test]
    fn mark_as_done_is_idempotent() {
        let items = fixture();
        let once = mark_as_done(&items, "1", "2026-02-13T12:30:00");
        let twice = mark_as_done(&once, "1", "2026-02-13T23:59:59");
        assert_eq!(once, twice);
    }

    #[test]
    fn mark_as_done_leaves_already_done_items_alone() {
        let items = fixture();
        let updated = mark_as_done(&items, "2", "2026-02-13T23:00:00");
        assert_eq!(updated, items);
    }

    #[test]
    fn mark_as_done_with_unknown_id_is_noop() {
        let items = fixture();
        assert_eq!(mark_as_done(&items, "zzz", "2026-02-13T12:00:00"), items);
    }

    // ── DTO mapping ──────────────────────────────────────

    fn queue_dto(status: &str) -> AttendanceQueueItemDto {
        AttendanceQueueItemDto {
            attendance_id: "att-1".into(),
            patient_id: "pt-1".into(),
            patient_name: "Maria".into(),
            patient_cpf: "12345678900".into(),
            exam_date: "2026-02-13".into(),
            status: status.into(),
            exam_names: vec!["Glicose".into()],
            updated_at: "2026-02-13T09:00:00".into(),
        }
    }

    #[test]
    fn maps_waiting_row() {
        let mapped = map_queue_item(queue_dto("waiting"));
        assert_eq!(mapped.id, "att-1");
        assert_eq!(mapped.status, AttendanceStatus::Waiting);
        assert_eq!(mapped.scheduled_at, "2026-02-13T00:00:00");
        assert_eq!(mapped.completed_at, None);
        assert_eq!(mapped.protocol, "ATT-1");
        assert_eq!(mapped.urgency, AttendanceUrgency::Normal);
    }

    #[test]
    fn maps_completed_row_with_update_timestamp() {
        let mapped = map_queue_item(queue_dto("completed"));
        assert_eq!(mapped.status, AttendanceStatus::Done);
        assert_eq!(mapped.completed_at.as_deref(), Some("2026-02-13T09:00:00"));
    }

    #[test]
    fn status_fold_is_case_insensitive() {
        let mapped = map_queue_item(queue_dto("Completed"));
        assert_eq!(mapped.status, AttendanceStatus::Done);
    }

    #[test]
    fn full_timestamps_are_not_coerced() {
        let mut dto = queue_dto("waiting");
        dto.exam_date = "2026-02-13T14:30:00".into();
        let mapped = map_queue_item(dto);
        assert_eq!(mapped.scheduled_at, "2026-02-13T14:30:00");
    }

    #[test]
    fn today_iso_is_a_civil_date() {
        assert!(CIVIL_DATE.is_match(&today_iso()));
    }
}
