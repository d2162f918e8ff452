//! Patient clinical record — mapping and attendance creation.
//!
//! `map_record` turns the raw backend payload (snake_case, backend-native)
//! into a UI-ready view: dates reformatted for display, a protocol code
//! derived from each item id, the exam status normalized, and a synthetic
//! email derived from the patient name. The mapping is total — no
//! well-formed DTO makes it fail.
//!
//! `PatientRecordService` fetches records and creates new attendances,
//! resolving the selected exam ids against the backend catalog.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::bridge::{
    BackendClient, CreateAttendanceInput, CreateAttendanceItemInput, InvokeError,
    PatientRecordDto, PatientRecordEntryDto, PatientRecordExamItemDto,
};
use crate::catalog::CatalogCache;
use crate::config;
use crate::models::{
    ExamCatalogItem, Patient, PatientRecordEntry, PatientRecordExam,
    PatientRecordExamStatus, PatientRecordView,
};

// ═══════════════════════════════════════════════════════════
// Pure mapping
// ═══════════════════════════════════════════════════════════

static ISO_DATE_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static ISO_DATE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})T").unwrap());

/// Map a raw record payload into the UI view model.
pub fn map_record(dto: PatientRecordDto) -> PatientRecordView {
    let email = derive_email(&dto.patient.full_name);
    PatientRecordView {
        patient: Patient::from(dto.patient),
        email,
        entries: dto.entries.iter().map(map_entry).collect(),
    }
}

/// Map one attendance entry; the entry-level status applies to every exam.
pub fn map_entry(dto: &PatientRecordEntryDto) -> PatientRecordEntry {
    PatientRecordEntry {
        id: dto.exam_id.clone(),
        date: format_display_date(&dto.exam_date),
        exams: dto
            .items
            .iter()
            .map(|item| map_exam(item, &dto.status))
            .collect(),
    }
}

fn map_exam(item: &PatientRecordExamItemDto, status: &str) -> PatientRecordExam {
    PatientRecordExam {
        id: item.exam_item_id.clone(),
        name: item.name.clone(),
        protocol: derive_protocol(&item.exam_item_id),
        status: map_exam_status(status),
        report_available: item.report_available,
    }
}

/// Case-insensitive fold: `"completed"` and nothing else maps to completed.
pub fn map_exam_status(status: &str) -> PatientRecordExamStatus {
    if status.eq_ignore_ascii_case("completed") {
        PatientRecordExamStatus::Completed
    } else {
        PatientRecordExamStatus::Pending
    }
}

/// Rewrite `YYYY-MM-DD` / `YYYY-MM-DDTHH:MM:SS` to `DD/MM/YYYY`.
///
/// exam_date is a civil date — no timezone-aware parsing. Any other shape
/// passes through unchanged (trimmed), never an error.
pub fn format_display_date(value: &str) -> String {
    let raw = value.trim();

    if let Some(caps) = ISO_DATE_ONLY
        .captures(raw)
        .or_else(|| ISO_DATE_TIME.captures(raw))
    {
        return format!("{}/{}/{}", &caps[3], &caps[2], &caps[1]);
    }

    raw.to_string()
}

/// Display code: first 8 characters of the identifier, upper-cased.
/// Only as unique as the identifier prefix itself.
pub fn derive_protocol(id: &str) -> String {
    id.chars().take(8).collect::<String>().to_uppercase()
}

/// Synthetic display email derived from the patient name.
///
/// Diacritics folded, lower-cased, whitespace runs collapsed to single
/// dots, everything outside `[a-z.]` dropped, fixed domain appended. An
/// empty result falls back to the placeholder address.
pub fn derive_email(name: &str) -> String {
    let folded: String = name.chars().map(fold_diacritic).collect();
    let dotted = folded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".");
    let cleaned: String = dotted
        .chars()
        .filter(|ch| matches!(ch, 'a'..='z' | '.'))
        .collect();

    if cleaned.is_empty() {
        config::FALLBACK_EMAIL.to_string()
    } else {
        format!("{}@{}", cleaned, config::EMAIL_DOMAIN)
    }
}

/// Fold the accented Latin characters that occur in pt-BR names onto
/// their base letters. Anything unmapped is handled by the caller's
/// `[a-z.]` filter.
fn fold_diacritic(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ñ' => 'n',
        'Ñ' => 'N',
        other => other,
    }
}

// ═══════════════════════════════════════════════════════════
// ExamSelection — the new-attendance dialog's selection model
// ═══════════════════════════════════════════════════════════

/// Ordered set of selected catalog item ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExamSelection {
    ids: Vec<String>,
}

impl ExamSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.ids.iter().any(|selected| selected == id)
    }

    /// Select the id, or deselect it when already present.
    pub fn toggle(&mut self, id: &str) {
        if self.is_selected(id) {
            self.remove(id);
        } else {
            self.ids.push(id.to_string());
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.ids.retain(|selected| selected != id);
    }

    /// Resolve ids against the cache, silently dropping unknown ones
    /// (an id can go stale if the dialog outlives a catalog reload).
    pub fn resolve(&self, catalog: &CatalogCache) -> Vec<ExamCatalogItem> {
        self.ids
            .iter()
            .filter_map(|id| catalog.find_by_id(id))
            .collect()
    }

    /// Sum of resolved item prices, in reais.
    pub fn total(&self, catalog: &CatalogCache) -> f64 {
        self.resolve(catalog).iter().map(|item| item.price).sum()
    }
}

// ═══════════════════════════════════════════════════════════
// PatientRecordService
// ═══════════════════════════════════════════════════════════

/// Payload for creating a new attendance from the record screen.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateAttendancePayload {
    pub patient_id: String,
    /// Civil date `YYYY-MM-DD`.
    pub exam_date: String,
    pub requester_id: Option<String>,
    pub exam_ids: Vec<String>,
}

/// Errors from record operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("Selecione ao menos um exame.")]
    EmptySelection,
    #[error("Exame invalido para criacao do atendimento.")]
    UnknownExam,
    #[error("{0}")]
    Backend(String),
}

impl From<InvokeError> for RecordError {
    fn from(err: InvokeError) -> Self {
        RecordError::Backend(err.user_message())
    }
}

/// Backend-integrated record access.
///
/// The record is fetched fresh per lookup; after any mutating action the
/// caller refetches wholesale — there is no incremental update path.
pub struct PatientRecordService {
    backend: Arc<dyn BackendClient>,
}

impl PatientRecordService {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    pub async fn record_by_patient_id(
        &self,
        patient_id: &str,
    ) -> Result<PatientRecordView, RecordError> {
        let dto = self.backend.get_patient_record(patient_id).await?;
        Ok(map_record(dto))
    }

    /// Create an attendance from a catalog selection.
    ///
    /// Every selected id must resolve against the backend catalog; exam
    /// names (not ids) travel in the creation input.
    pub async fn create_attendance(
        &self,
        payload: CreateAttendancePayload,
    ) -> Result<PatientRecordEntry, RecordError> {
        if payload.exam_ids.is_empty() {
            return Err(RecordError::EmptySelection);
        }

        let catalog = self.backend.list_exam_catalog().await?;
        let by_id: HashMap<&str, &str> = catalog
            .iter()
            .map(|item| (item.id.as_str(), item.name.as_str()))
            .collect();

        let mut items = Vec::with_capacity(payload.exam_ids.len());
        for exam_id in &payload.exam_ids {
            let name = by_id
                .get(exam_id.as_str())
                .ok_or(RecordError::UnknownExam)?;
            items.push(CreateAttendanceItemInput {
                name: (*name).to_string(),
                unit: None,
                method: None,
                reference_range: None,
            });
        }

        let input = CreateAttendanceInput {
            patient_id: payload.patient_id.clone(),
            exam_date: payload.exam_date.clone(),
            requester_id: payload.requester_id.clone(),
            status: None,
            procedure_type: None,
            delivered_to: None,
            notes: None,
            items,
        };

        let created = self.backend.create_attendance(input).await?;
        tracing::info!(
            patient_id = %payload.patient_id,
            exams = payload.exam_ids.len(),
            "Attendance created"
        );
        Ok(map_entry(&created))
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
