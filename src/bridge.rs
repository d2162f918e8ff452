//! Backend command bridge.
//!
//! The native backend exposes a small command surface (`get_patient_record`,
//! `list_exam_catalog`, ...) consumed — never implemented — by this crate.
//! `BackendClient` abstracts that surface as an object-safe async trait so
//! services can be driven by the real invoke plumbing in the app shell and
//! by scripted stubs in tests.
//!
//! Backend failures arrive as either a bare string or an object with a
//! `message` field. `InvokeError` models both shapes and normalizes them
//! into one human-readable string; `user_message()` additionally folds the
//! known failure classes (duplicate CPF, missing record) into curated
//! pt-BR messages by case-insensitive substring sniffing — the backend
//! offers no structured error codes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Shown when a failure carries no extractable message.
pub const GENERIC_FAILURE: &str = "Nao foi possivel concluir a operacao.";

/// Curated message for unique-constraint/conflict failures on patient save.
pub const DUPLICATE_PATIENT: &str = "CPF ja cadastrado.";

/// Curated message for not-found failures.
pub const NOT_FOUND: &str = "Registro nao encontrado.";

// ═══════════════════════════════════════════════════════════
// Error payload
// ═══════════════════════════════════════════════════════════

/// Duck-typed backend error payload.
///
/// `Structured` must precede `Text` so untagged deserialization tries the
/// object shape first; a JSON string then falls through to `Text`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Deserialize)]
#[serde(untagged)]
pub enum InvokeError {
    #[error("{message}")]
    Structured { message: String },
    #[error("{0}")]
    Text(String),
}

impl InvokeError {
    pub fn text(message: impl Into<String>) -> Self {
        InvokeError::Text(message.into())
    }

    pub fn structured(message: impl Into<String>) -> Self {
        InvokeError::Structured {
            message: message.into(),
        }
    }

    /// The raw message, trimmed; [`GENERIC_FAILURE`] when blank.
    pub fn normalized(&self) -> String {
        let raw = match self {
            InvokeError::Structured { message } => message,
            InvokeError::Text(text) => text,
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Normalized message with known failure classes folded into curated
    /// user-facing text. Everything unrecognized passes through raw.
    pub fn user_message(&self) -> String {
        let normalized = self.normalized();
        let lower = normalized.to_lowercase();
        if lower.contains("unique constraint") || lower.contains("conflict while saving patient")
        {
            return DUPLICATE_PATIENT.to_string();
        }
        if lower.contains("not found") {
            return NOT_FOUND.to_string();
        }
        normalized
    }
}

// ═══════════════════════════════════════════════════════════
// Wire DTOs (snake_case, backend-native)
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamCatalogItemDto {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub category_title: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientView {
    pub id: String,
    pub full_name: String,
    pub cpf: String,
    pub birth_date: String,
    pub sex: String,
    pub phone: String,
    pub address: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecordExamItemDto {
    pub exam_item_id: String,
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub reference_range: Option<String>,
    #[serde(default)]
    pub result_value: Option<String>,
    #[serde(default)]
    pub result_flag: Option<String>,
    pub report_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecordEntryDto {
    pub exam_id: String,
    /// Civil date (`YYYY-MM-DD`) or full timestamp.
    pub exam_date: String,
    pub status: String,
    #[serde(default)]
    pub requester_name: Option<String>,
    pub items: Vec<PatientRecordExamItemDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecordDto {
    pub patient: PatientView,
    pub entries: Vec<PatientRecordEntryDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceQueueItemDto {
    pub attendance_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub patient_cpf: String,
    /// Civil date (`YYYY-MM-DD`) or full timestamp.
    pub exam_date: String,
    pub status: String,
    pub exam_names: Vec<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceQueueQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteAttendanceInput {
    pub attendance_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAttendanceItemInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAttendanceInput {
    pub patient_id: String,
    pub exam_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedure_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub items: Vec<CreateAttendanceItemInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePatientInput {
    pub full_name: String,
    /// Exactly 11 digits after normalization.
    pub cpf: String,
    /// ISO `YYYY-MM-DD`.
    pub birth_date: String,
    pub sex: String,
    pub phone: String,
    pub address: String,
}

// ═══════════════════════════════════════════════════════════
// BackendClient
// ═══════════════════════════════════════════════════════════

/// The native backend's command surface.
///
/// Implementations wrap the app shell's invoke plumbing; tests use
/// scripted stubs. All calls are async and non-blocking.
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn get_patient_record(&self, patient_id: &str)
        -> Result<PatientRecordDto, InvokeError>;

    async fn list_exam_catalog(&self) -> Result<Vec<ExamCatalogItemDto>, InvokeError>;

    async fn create_attendance(
        &self,
        input: CreateAttendanceInput,
    ) -> Result<PatientRecordEntryDto, InvokeError>;

    async fn list_attendance_queue(
        &self,
        query: AttendanceQueueQuery,
    ) -> Result<Vec<AttendanceQueueItemDto>, InvokeError>;

    async fn complete_attendance(
        &self,
        input: CompleteAttendanceInput,
    ) -> Result<AttendanceQueueItemDto, InvokeError>;

    async fn create_patient(&self, input: CreatePatientInput)
        -> Result<PatientView, InvokeError>;

    async fn list_patients(&self, query: Option<String>)
        -> Result<Vec<PatientView>, InvokeError>;
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
