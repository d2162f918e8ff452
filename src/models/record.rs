use serde::{Deserialize, Serialize};

use super::patient::Patient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientRecordExamStatus {
    Pending,
    Completed,
}

impl PatientRecordExamStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PatientRecordExamStatus::Pending => "pending",
            PatientRecordExamStatus::Completed => "completed",
        }
    }
}

/// One exam inside a record entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecordExam {
    pub id: String,
    pub name: String,
    /// Display code: first 8 chars of the item id, upper-cased.
    pub protocol: String,
    pub status: PatientRecordExamStatus,
    pub report_available: bool,
}

/// One attendance entry in the clinical record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecordEntry {
    pub id: String,
    /// Display-formatted date (`DD/MM/YYYY` when the source parses).
    pub date: String,
    pub exams: Vec<PatientRecordExam>,
}

/// Denormalized, UI-ready clinical record for one patient.
///
/// Fetched wholesale per lookup and reloaded after any mutating action;
/// there is no partial update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecordView {
    pub patient: Patient,
    /// Derived from the full name — display data, not authoritative.
    pub email: String,
    pub entries: Vec<PatientRecordEntry>,
}
