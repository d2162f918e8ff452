use serde::{Deserialize, Serialize};

/// Queue view partition. Tabs are derived purely from item status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceTab {
    Scheduled,
    Completed,
}

impl AttendanceTab {
    /// The item status this tab selects.
    pub fn status(self) -> AttendanceStatus {
        match self {
            AttendanceTab::Scheduled => AttendanceStatus::Waiting,
            AttendanceTab::Completed => AttendanceStatus::Done,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceTab::Scheduled => "scheduled",
            AttendanceTab::Completed => "completed",
        }
    }
}

/// Attendance lifecycle. The only transition is waiting → done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Waiting,
    Done,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Waiting => "waiting",
            AttendanceStatus::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceUrgency {
    Normal,
    Urgent,
    Emergency,
}

/// One attendance as shown in the queue.
///
/// Invariant: `completed_at` is present iff `status == Done`. Items are
/// never mutated in place — `queue::mark_as_done` produces a new list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceItem {
    pub id: String,
    pub patient_name: String,
    /// Short display code derived from the attendance id.
    pub protocol: String,
    pub exams: Vec<String>,
    pub urgency: AttendanceUrgency,
    pub status: AttendanceStatus,
    /// ISO datetime (`YYYY-MM-DDTHH:MM:SS`).
    pub scheduled_at: String,
    pub completed_at: Option<String>,
}

/// Per-tab item counts, scoped to the selected date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceTabCounts {
    pub scheduled: usize,
    pub completed: usize,
}
