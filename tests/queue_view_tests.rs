use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use labdesk::bridge::{
    AttendanceQueueItemDto, AttendanceQueueQuery, BackendClient, CompleteAttendanceInput,
    CreateAttendanceInput, CreatePatientInput, ExamCatalogItemDto, InvokeError,
    PatientRecordDto, PatientRecordEntryDto, PatientView,
};
use labdesk::models::{AttendanceStatus, AttendanceTab};
use labdesk::queue::{AttendanceQueueService, QueueView};

const DATE: &str = "2026-02-13";

fn queue_dto(id: &str, name: &str, date: &str, status: &str, exams: &[&str]) -> AttendanceQueueItemDto {
    AttendanceQueueItemDto {
        attendance_id: id.to_string(),
        patient_id: format!("pt-{id}"),
        patient_name: name.to_string(),
        patient_cpf: "12345678900".to_string(),
        exam_date: date.to_string(),
        status: status.to_string(),
        exam_names: exams.iter().map(|e| e.to_string()).collect(),
        updated_at: format!("{date}T09:00:00"),
    }
}

/// Pops one scripted response per queue load; records every query.
struct ScriptedQueueBackend {
    loads: Mutex<VecDeque<Result<Vec<AttendanceQueueItemDto>, InvokeError>>>,
    queries: Mutex<Vec<AttendanceQueueQuery>>,
    complete: Mutex<Option<Result<AttendanceQueueItemDto, InvokeError>>>,
    completions: Mutex<Vec<String>>,
}

impl ScriptedQueueBackend {
    fn new(loads: Vec<Result<Vec<AttendanceQueueItemDto>, InvokeError>>) -> Self {
        Self {
            loads: Mutex::new(loads.into()),
            queries: Mutex::new(Vec::new()),
            complete: Mutex::new(None),
            completions: Mutex::new(Vec::new()),
        }
    }

    fn with_completion(self, result: Result<AttendanceQueueItemDto, InvokeError>) -> Self {
        *self.complete.lock().unwrap() = Some(result);
        self
    }

    fn recorded_queries(&self) -> Vec<AttendanceQueueQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendClient for ScriptedQueueBackend {
    async fn get_patient_record(&self, _: &str) -> Result<PatientRecordDto, InvokeError> {
        unimplemented!()
    }

    async fn list_exam_catalog(&self) -> Result<Vec<ExamCatalogItemDto>, InvokeError> {
        unimplemented!()
    }

    async fn create_attendance(
        &self,
        _: CreateAttendanceInput,
    ) -> Result<PatientRecordEntryDto, InvokeError> {
        unimplemented!()
    }

    async fn list_attendance_queue(
        &self,
        query: AttendanceQueueQuery,
    ) -> Result<Vec<AttendanceQueueItemDto>, InvokeError> {
        self.queries.lock().unwrap().push(query);
        self.loads
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected queue load")
    }

    async fn complete_attendance(
        &self,
        input: CompleteAttendanceInput,
    ) -> Result<AttendanceQueueItemDto, InvokeError> {
        self.completions.lock().unwrap().push(input.attendance_id);
        self.complete
            .lock()
            .unwrap()
            .clone()
            .expect("unexpected completion")
    }

    async fn create_patient(&self, _: CreatePatientInput) -> Result<PatientView, InvokeError> {
        unimplemented!()
    }

    async fn list_patients(&self, _: Option<String>) -> Result<Vec<PatientView>, InvokeError> {
        unimplemented!()
    }
}

/// First load blocks at a gate and returns the stale row; later loads
/// return the fresh row immediately.
struct RacingQueueBackend {
    calls: AtomicUsize,
    gate: Notify,
}

#[async_trait]
impl BackendClient for RacingQueueBackend {
    async fn get_patient_record(&self, _: &str) -> Result<PatientRecordDto, InvokeError> {
        unimplemented!()
    }

    async fn list_exam_catalog(&self) -> Result<Vec<ExamCatalogItemDto>, InvokeError> {
        unimplemented!()
    }

    async fn create_attendance(
        &self,
        _: CreateAttendanceInput,
    ) -> Result<PatientRecordEntryDto, InvokeError> {
        unimplemented!()
    }

    async fn list_attendance_queue(
        &self,
        _: AttendanceQueueQuery,
    ) -> Result<Vec<AttendanceQueueItemDto>, InvokeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            self.gate.notified().await;
            Ok(vec![queue_dto("att-stale", "Stale", DATE, "waiting", &["GLICOSE"])])
        } else {
            Ok(vec![queue_dto("att-fresh", "Fresh", DATE, "waiting", &["GLICOSE"])])
        }
    }

    async fn complete_attendance(
        &self,
        _: CompleteAttendanceInput,
    ) -> Result<AttendanceQueueItemDto, InvokeError> {
        unimplemented!()
    }

    async fn create_patient(&self, _: CreatePatientInput) -> Result<PatientView, InvokeError> {
        unimplemented!()
    }

    async fn list_patients(&self, _: Option<String>) -> Result<Vec<PatientView>, InvokeError> {
        unimplemented!()
    }
}

fn view_over(backend: Arc<dyn BackendClient>) -> QueueView {
    QueueView::with_date(
        Arc::new(AttendanceQueueService::new(backend)),
        DATE.to_string(),
    )
}

#[tokio::test]
async fn reload_maps_rows_and_sets_flags() {
    let backend = Arc::new(ScriptedQueueBackend::new(vec![Ok(vec![queue_dto(
        "att-1",
        "Maria",
        DATE,
        "waiting",
        &["Glicose"],
    )])]));
    let view = view_over(backend.clone());

    view.reload().await;

    let state = view.state();
    assert!(!state.loading);
    assert!(state.loaded_once);
    assert!(state.error.is_none());
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].status, AttendanceStatus::Waiting);
    assert_eq!(state.items[0].scheduled_at, format!("{DATE}T00:00:00"));
    assert_eq!(state.items[0].completed_at, None);

    let queries = backend.recorded_queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].date.as_deref(), Some(DATE));
    assert_eq!(queries[0].query, None);
    assert_eq!(queries[0].status, None);
}

#[tokio::test]
async fn blank_query_is_omitted_and_text_is_trimmed() {
    let backend = Arc::new(ScriptedQueueBackend::new(vec![
        Ok(Vec::new()),
        Ok(Vec::new()),
    ]));
    let view = view_over(backend.clone());

    view.set_query("   ").await;
    view.set_query("  glicose ").await;

    let queries = backend.recorded_queries();
    assert_eq!(queries[0].query, None);
    assert_eq!(queries[1].query.as_deref(), Some("glicose"));
}

#[tokio::test]
async fn completion_refetches_and_reflects_server_state() {
    let waiting = queue_dto("att-1", "Maria", DATE, "waiting", &["Glicose"]);
    let completed = queue_dto("att-1", "Maria", DATE, "completed", &["Glicose"]);

    let backend = Arc::new(
        ScriptedQueueBackend::new(vec![
            Ok(vec![waiting]),
            Ok(vec![completed.clone()]),
        ])
        .with_completion(Ok(completed.clone())),
    );
    let view = view_over(backend.clone());

    view.reload().await;
    view.complete("att-1").await.unwrap();

    let state = view.state();
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].status, AttendanceStatus::Done);
    assert_eq!(
        state.items[0].completed_at.as_deref(),
        Some(completed.updated_at.as_str())
    );
    assert!(state.error.is_none());

    // One completion call, two loads — the reload is what made the
    // completion visible.
    assert_eq!(*backend.completions.lock().unwrap(), ["att-1"]);
    assert_eq!(backend.recorded_queries().len(), 2);
}

#[tokio::test]
async fn failed_completion_keeps_items_and_surfaces_curated_message() {
    let backend = Arc::new(
        ScriptedQueueBackend::new(vec![Ok(vec![queue_dto(
            "att-1",
            "Maria",
            DATE,
            "waiting",
            &["Glicose"],
        )])])
        .with_completion(Err(InvokeError::text("attendance not found"))),
    );
    let view = view_over(backend.clone());

    view.reload().await;
    let result = view.complete("att-1").await;

    assert!(result.is_err());
    let state = view.state();
    assert!(!state.loading);
    assert_eq!(state.error.as_deref(), Some("Registro nao encontrado."));
    // The queue was not refetched and the row is still visible.
    assert_eq!(state.items.len(), 1);
    assert_eq!(backend.recorded_queries().len(), 1);
}

#[tokio::test]
async fn failed_reload_clears_items_and_sets_error() {
    let backend = Arc::new(ScriptedQueueBackend::new(vec![
        Ok(vec![queue_dto("att-1", "Maria", DATE, "waiting", &["Glicose"])]),
        Err(InvokeError::structured("queue unavailable")),
    ]));
    let view = view_over(backend);

    view.reload().await;
    assert_eq!(view.state().items.len(), 1);

    view.reload().await;
    let state = view.state();
    assert!(state.items.is_empty());
    assert_eq!(state.error.as_deref(), Some("queue unavailable"));
    assert!(state.loaded_once);
}

#[tokio::test]
async fn stale_reload_result_is_discarded() {
    let backend = Arc::new(RacingQueueBackend {
        calls: AtomicUsize::new(0),
        gate: Notify::new(),
    });
    let view = Arc::new(view_over(backend.clone()));

    // First reload parks at the gate inside the backend.
    let stale = {
        let view = view.clone();
        tokio::spawn(async move { view.reload().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A newer request completes while the first is still in flight.
    view.set_query("fresh").await;
    assert_eq!(view.state().items[0].id, "att-fresh");

    // Release the stale response; it must not overwrite the newer state.
    backend.gate.notify_one();
    stale.await.unwrap();

    let state = view.state();
    assert_eq!(state.items.len(), 1);
    assert_eq!(state.items[0].id, "att-fresh");
    assert_eq!(state.query, "fresh");
    assert!(!state.loading);
}

#[tokio::test]
async fn visible_items_compose_date_tab_and_query() {
    let backend = Arc::new(ScriptedQueueBackend::new(vec![Ok(vec![
        queue_dto("att-1", "Maria", DATE, "waiting", &["Glicose"]),
        queue_dto("att-2", "Joao", DATE, "completed", &["Beta HCG"]),
        queue_dto("att-3", "Ana", "2026-02-14", "waiting", &["Colesterol"]),
    ])]));
    let view = view_over(backend);

    view.reload().await;

    // Scheduled tab: only the waiting item on the selected date.
    let visible = view.visible_items();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, "att-1");

    view.set_tab(AttendanceTab::Completed);
    let visible = view.visible_items();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, "att-2");

    // Counts are date-scoped: the other-date row never shows up.
    let counts = view.counts();
    assert_eq!(counts.scheduled, 1);
    assert_eq!(counts.completed, 1);
}
