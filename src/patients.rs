//! Patient registration and directory.
//!
//! `validate_draft` is the create pipeline: field checks run in a fixed
//! order and the first failure aborts with a field-named message (the UI
//! shows these verbatim). CPF is normalized to bare digits and checked by
//! length only — the check-digit algorithm is deliberately not applied.
//! Birth dates arrive in three shapes (ISO, Brazilian, bare digits) and
//! normalize to ISO after a calendar-validity check.
//!
//! `PatientDirectory` wraps the backend listing/creation commands;
//! `DirectoryView` holds the version-guarded search state of the patients
//! screen. Search debouncing is the caller's concern.

use std::sync::{Arc, LazyLock, Mutex};

use chrono::NaiveDate;
use regex::Regex;

use crate::bridge::{BackendClient, CreatePatientInput, InvokeError};
use crate::config;
use crate::models::{Patient, PatientDraft};
use crate::version::RequestVersion;

// ═══════════════════════════════════════════════════════════
// Validation pipeline
// ═══════════════════════════════════════════════════════════

/// Field-named validation failures, in the order the rules run.
/// Messages are user-facing and never reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Nome e obrigatorio.")]
    FullNameRequired,
    #[error("CPF e obrigatorio.")]
    CpfRequired,
    #[error("CPF invalido.")]
    CpfInvalid,
    #[error("Nascimento e obrigatorio.")]
    BirthDateRequired,
    #[error("Nascimento invalido.")]
    BirthDateInvalid,
    #[error("Telefone e obrigatorio.")]
    PhoneRequired,
    #[error("Endereco e obrigatorio.")]
    AddressRequired,
}

/// Validate a registration submission into a backend-ready input.
///
/// Rule order is significant for UX consistency: name, CPF presence, CPF
/// shape, birth presence, birth shape, phone, address. The first failing
/// rule wins.
pub fn validate_draft(draft: &PatientDraft) -> Result<CreatePatientInput, ValidationError> {
    let full_name = draft.full_name.trim();
    if full_name.is_empty() {
        return Err(ValidationError::FullNameRequired);
    }

    if draft.cpf.trim().is_empty() {
        return Err(ValidationError::CpfRequired);
    }
    let cpf = cpf_digits(&draft.cpf);
    if cpf.len() != 11 {
        return Err(ValidationError::CpfInvalid);
    }

    let birth_raw = draft.birth_date.trim();
    if birth_raw.is_empty() {
        return Err(ValidationError::BirthDateRequired);
    }
    let birth_date =
        normalize_birth_date(birth_raw).ok_or(ValidationError::BirthDateInvalid)?;

    let phone = draft.phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::PhoneRequired);
    }

    let address = draft.address.trim();
    if address.is_empty() {
        return Err(ValidationError::AddressRequired);
    }

    Ok(CreatePatientInput {
        full_name: full_name.to_string(),
        cpf,
        birth_date,
        // The registration form has no sex field yet; the backend expects
        // a value, so the sentinel goes out until the field lands.
        sex: config::SEX_PENDING.to_string(),
        phone: phone.to_string(),
        address: address.to_string(),
    })
}

/// Strip everything but digits. `123.456.789-00` → `12345678900`.
pub fn cpf_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

static BIRTH_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());
static BIRTH_BR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").unwrap());
static BIRTH_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})(\d{2})(\d{4})$").unwrap());

/// Parse a birth date in any accepted shape and render it as ISO
/// `YYYY-MM-DD`. Returns `None` for unrecognized shapes and
/// calendar-invalid dates (no silent fallback).
pub fn normalize_birth_date(raw: &str) -> Option<String> {
    let value = raw.trim();

    let (year, month, day) = if let Some(caps) = BIRTH_ISO.captures(value) {
        (caps[1].to_string(), caps[2].to_string(), caps[3].to_string())
    } else if let Some(caps) = BIRTH_BR.captures(value) {
        (caps[3].to_string(), caps[2].to_string(), caps[1].to_string())
    } else if let Some(caps) = BIRTH_DIGITS.captures(value) {
        (caps[3].to_string(), caps[2].to_string(), caps[1].to_string())
    } else {
        return None;
    };

    build_civil_date(&year, &month, &day)
}

/// Bounds-check the components and reconstruct the date; `from_ymd_opt`
/// rejects impossible calendar dates such as Feb 30.
fn build_civil_date(year: &str, month: &str, day: &str) -> Option<String> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;

    if !(1900..=2100).contains(&year) || !(1..=12).contains(&month) || !(1..=31).contains(&day)
    {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.format("%Y-%m-%d").to_string())
}

// ═══════════════════════════════════════════════════════════
// PatientDirectory
// ═══════════════════════════════════════════════════════════

/// Errors from directory operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatientsError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Backend(String),
}

impl From<InvokeError> for PatientsError {
    fn from(err: InvokeError) -> Self {
        PatientsError::Backend(err.user_message())
    }
}

/// Backend-integrated patient listing and creation.
pub struct PatientDirectory {
    backend: Arc<dyn BackendClient>,
}

impl PatientDirectory {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    /// List patients, optionally filtered by a free-text query.
    /// A blank query is omitted from the backend call entirely.
    pub async fn list(&self, query: &str) -> Result<Vec<Patient>, PatientsError> {
        let trimmed = query.trim();
        let query = (!trimmed.is_empty()).then(|| trimmed.to_string());
        let views = self.backend.list_patients(query).await?;
        Ok(views.into_iter().map(Patient::from).collect())
    }

    /// Validate and create a patient. Validation failures never reach the
    /// backend.
    pub async fn create(&self, draft: &PatientDraft) -> Result<Patient, PatientsError> {
        let input = validate_draft(draft)?;
        let view = self.backend.create_patient(input).await?;
        tracing::info!(patient_id = %view.id, "Patient created");
        Ok(Patient::from(view))
    }
}

// ═══════════════════════════════════════════════════════════
// DirectoryView — the patients screen state machine
// ═══════════════════════════════════════════════════════════

/// Snapshot of the patients screen state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryState {
    pub patients: Vec<Patient>,
    pub query: String,
    pub loading: bool,
    pub loaded_once: bool,
    pub error: Option<String>,
}

/// Version-guarded patient search.
///
/// Searches are last-request-wins: a stale result never overwrites the
/// outcome of a newer search. Debouncing happens upstream.
pub struct DirectoryView {
    directory: Arc<PatientDirectory>,
    version: RequestVersion,
    state: Mutex<DirectoryState>,
}

impl DirectoryView {
    pub fn new(directory: Arc<PatientDirectory>) -> Self {
        Self {
            directory,
            version: RequestVersion::new(),
            state: Mutex::new(DirectoryState::default()),
        }
    }

    /// Run a search and store the outcome unless a newer search started.
    pub async fn search(&self, query: &str) {
        let token = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            state.query = query.to_string();
            state.loading = true;
            state.error = None;
            self.version.begin()
        };

        let result = self.directory.list(query).await;

        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if !self.version.is_current(token) {
            return;
        }
        state.loading = false;
        state.loaded_once = true;
        match result {
            Ok(patients) => state.patients = patients,
            Err(err) => {
                state.patients = Vec::new();
                state.error = Some(err.to_string());
            }
        }
    }

    /// Re-run the current query (e.g. after a creation).
    pub async fn refresh(&self) {
        let query = self
            .state
            .lock()
            .map(|state| state.query.clone())
            .unwrap_or_default();
        self.search(&query).await;
    }

    /// Current snapshot.
    pub fn state(&self) -> DirectoryState {
        self.state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
