//! Patient registry models.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::identity::generate_patient_id;

/// A person in the patient registry.
///
/// Records point at patients through [`crate::models::Record::patient_ref`];
/// patients never hold their records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Generated token (`PAT-...`)
    #[serde(rename = "id")]
    pub patient_id: String,
    /// Full name
    #[serde(default)]
    pub name: String,
    /// Date of birth, as entered
    #[serde(default)]
    pub dob: String,
    /// Sex
    #[serde(default)]
    pub sex: String,
    /// Phone, email or address
    #[serde(default)]
    pub contact: String,
    /// Session notes, oldest first
    #[serde(default)]
    pub notes: Vec<SessionNote>,
    /// Creation timestamp (empty for registries written before it existed)
    #[serde(default)]
    pub created_at: String,
}

/// Registry details supplied when creating or editing a patient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPatient {
    pub name: String,
    pub dob: String,
    pub sex: String,
    pub contact: String,
}

impl NewPatient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A dated free-text session note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionNote {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub text: String,
}

impl Patient {
    /// Create a patient with a freshly generated ID.
    pub fn new(details: NewPatient) -> Self {
        Self {
            patient_id: generate_patient_id(),
            name: details.name,
            dob: details.dob,
            sex: details.sex,
            contact: details.contact,
            notes: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Case-insensitive name comparison, ignoring surrounding whitespace.
    pub fn has_name(&self, name: &str) -> bool {
        canonical_name(&self.name) == canonical_name(name)
    }

    /// Replace the registry details, keeping ID and notes.
    pub fn apply_details(&mut self, details: NewPatient) {
        self.name = details.name;
        self.dob = details.dob;
        self.sex = details.sex;
        self.contact = details.contact;
    }
}

/// Lowercase, trimmed form of a name used for matching.
pub fn canonical_name(name: &str) -> String {
    name.trim().to_lowercase()
}
