use serde::{Deserialize, Serialize};

/// A registered patient, mapped from the backend view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
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

impl From<crate::bridge::PatientView> for Patient {
    fn from(view: crate::bridge::PatientView) -> Self {
        Self {
            id: view.id,
            full_name: view.full_name,
            cpf: view.cpf,
            birth_date: view.birth_date,
            sex: view.sex,
            phone: view.phone,
            address: view.address,
            created_at: view.created_at,
            updated_at: view.updated_at,
        }
    }
}

/// Raw registration form submission, prior to validation.
///
/// `birth_date` may arrive as ISO (`1990-10-01`), Brazilian
/// (`01/10/1990`) or bare digits (`01101990`); `cpf` may carry
/// punctuation. `patients::validate_draft` normalizes both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientDraft {
    pub full_name: String,
    pub cpf: String,
    pub birth_date: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}
