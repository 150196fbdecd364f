//! MSE Records Core Library
//!
//! Local-first store for Mental Status Examination records and a patient
//! registry.
//!
//! # Architecture
//!
//! ```text
//!   Host form (FormAdapter) ──collect_fields──► SaveRecord
//!                                                  │
//!                                       derive_record_id(name, age, sex)
//!                                                  │
//!                              ┌───────────────────▼───────────────────┐
//!                              │              RecordStore              │
//!                              │  upsert / find / delete records       │
//!                              │  patient registry, cascade, notes     │
//!                              └───────────────────┬───────────────────┘
//!                                                  │ read → edit → CAS write
//!                              ┌───────────────────▼───────────────────┐
//!                              │    StorageBackend (key → JSON text)   │
//!                              │    "mseRecords"     "msePatients"     │
//!                              └───────────────────────────────────────┘
//!
//!   Record + FormSchema ──► Report ──► ExportRenderer (text, HTML, host PDF/DOCX)
//! ```
//!
//! # Core Principle
//!
//! **A record's identifier is fixed when it is first saved.** Editing name,
//! age or sex later never re-keys the record.
//!
//! # Modules
//!
//! - [`identity`]: record ID derivation and patient ID generation
//! - [`models`]: Domain types (Record, FieldValue, Patient, SessionNote)
//! - [`schema`]: Ordered section/field layout shared by form and export
//! - [`backend`]: Key-value storage with compare-and-swap (memory, SQLite)
//! - [`store`]: Record store, patient registry and session notes
//! - [`config`]: Storage keys and identity field names
//! - [`form`]: Form adapter contract
//! - [`export`]: Report layout and renderers

pub mod backend;
pub mod config;
pub mod export;
pub mod form;
pub mod identity;
pub mod models;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use backend::{MemoryBackend, SqliteBackend, StorageBackend};
pub use crate::config::StoreConfig;
pub use export::{report_filename, ExportFormat, ExportRenderer, Report};
pub use models::{CustomField, FieldValue, Fields, NewPatient, Patient, Record, SessionNote};
pub use schema::FormSchema;
pub use store::{RecordStore, SaveRecord, StoreError, StoreResult};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use export::{HtmlReportRenderer, TextReportRenderer};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MseRecordsError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Conflict: {0}")]
    ConflictError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Export error: {0}")]
    ExportError(String),
}

impl From<StoreError> for MseRecordsError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => MseRecordsError::ValidationError(msg),
            StoreError::Conflict(key) => MseRecordsError::ConflictError(key),
            StoreError::Json(e) => MseRecordsError::SerializationError(e.to_string()),
            StoreError::Config(e) => MseRecordsError::InvalidInput(e.to_string()),
            e @ (StoreError::StorageUnavailable(_) | StoreError::Sqlite(_)) => {
                MseRecordsError::StorageError(e.to_string())
            }
        }
    }
}

impl From<export::ExportError> for MseRecordsError {
    fn from(e: export::ExportError) -> Self {
        MseRecordsError::ExportError(e.to_string())
    }
}

impl From<serde_json::Error> for MseRecordsError {
    fn from(e: serde_json::Error) -> Self {
        MseRecordsError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for MseRecordsError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        MseRecordsError::StorageError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a store backed by the SQLite file at `path`.
#[uniffi::export]
pub fn open_store(path: String) -> Result<Arc<MseRecordsCore>, MseRecordsError> {
    let backend = SqliteBackend::open(&path)?;
    Ok(MseRecordsCore::wrap(RecordStore::new(backend)))
}

/// Open a store described by a configuration file (plus `MSE_*` variables).
#[uniffi::export]
pub fn open_store_from_config(config_path: String) -> Result<Arc<MseRecordsCore>, MseRecordsError> {
    let config = StoreConfig::load(Some(std::path::Path::new(&config_path)))?;
    let path = config.database_path.clone().ok_or_else(|| {
        MseRecordsError::InvalidInput("database_path is not configured".into())
    })?;

    let backend = SqliteBackend::open(&path)?;
    Ok(MseRecordsCore::wrap(RecordStore::with_config(backend, config)))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_store_in_memory() -> Result<Arc<MseRecordsCore>, MseRecordsError> {
    let backend = SqliteBackend::open_in_memory()?;
    Ok(MseRecordsCore::wrap(RecordStore::new(backend)))
}

/// The identifier a record with these details would get.
#[uniffi::export]
pub fn preview_record_id(name: String, age: String, sex: String) -> Option<String> {
    identity::derive_record_id(&name, &age, &sex)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe store wrapper for FFI.
#[derive(uniffi::Object)]
pub struct MseRecordsCore {
    store: Mutex<RecordStore<SqliteBackend>>,
    schema: FormSchema,
}

impl MseRecordsCore {
    fn wrap(store: RecordStore<SqliteBackend>) -> Arc<Self> {
        Arc::new(Self {
            store: Mutex::new(store),
            schema: FormSchema::mental_status_exam(),
        })
    }
}

#[uniffi::export]
impl MseRecordsCore {
    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Save a form submission, returning the stored record.
    pub fn save_record(&self, request: FfiSaveRecord) -> Result<FfiRecord, MseRecordsError> {
        let store = self.store.lock()?;
        let record = store.upsert_record(request.into())?;
        Ok(record.into())
    }

    /// Get a record by identifier.
    pub fn get_record(&self, record_id: String) -> Result<Option<FfiRecord>, MseRecordsError> {
        let store = self.store.lock()?;
        let record = store.find_record(&record_id)?;
        Ok(record.map(|r| r.into()))
    }

    /// List all records in saved order.
    pub fn list_records(&self) -> Result<Vec<FfiRecord>, MseRecordsError> {
        let store = self.store.lock()?;
        let records = store.list_records()?;
        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    /// Delete a record. Returns false if it did not exist.
    pub fn delete_record(&self, record_id: String) -> Result<bool, MseRecordsError> {
        let store = self.store.lock()?;
        Ok(store.delete_record(&record_id)?)
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a new patient.
    pub fn create_patient(&self, details: FfiNewPatient) -> Result<FfiPatient, MseRecordsError> {
        let store = self.store.lock()?;
        let patient = store.create_patient(details.into())?;
        Ok(patient.into())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: String) -> Result<Option<FfiPatient>, MseRecordsError> {
        let store = self.store.lock()?;
        let patient = store.find_patient(&patient_id)?;
        Ok(patient.map(|p| p.into()))
    }

    /// List all patients.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, MseRecordsError> {
        let store = self.store.lock()?;
        let patients = store.list_patients()?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Search patients by name.
    pub fn search_patients(
        &self,
        query: String,
        limit: u32,
    ) -> Result<Vec<FfiPatient>, MseRecordsError> {
        let store = self.store.lock()?;
        let patients = store.search_patients(&query, limit as usize)?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    /// Edit a patient's registry details.
    pub fn update_patient(
        &self,
        patient_id: String,
        details: FfiNewPatient,
    ) -> Result<Option<FfiPatient>, MseRecordsError> {
        let store = self.store.lock()?;
        let patient = store.update_patient_details(&patient_id, details.into())?;
        Ok(patient.map(|p| p.into()))
    }

    /// Delete a patient and their records. Returns the number of records removed.
    pub fn delete_patient(&self, patient_id: String) -> Result<u32, MseRecordsError> {
        let store = self.store.lock()?;
        let removed = store.delete_patient_cascade(&patient_id)?;
        Ok(removed as u32)
    }

    /// List a patient's records.
    pub fn records_for_patient(&self, patient_id: String) -> Result<Vec<FfiRecord>, MseRecordsError> {
        let store = self.store.lock()?;
        let records = store.records_for_patient(&patient_id)?;
        Ok(records.into_iter().map(|r| r.into()).collect())
    }

    /// Append a session note to a patient.
    pub fn add_note(
        &self,
        patient_id: String,
        date: String,
        text: String,
    ) -> Result<Option<FfiPatient>, MseRecordsError> {
        let store = self.store.lock()?;
        let patient = store.add_note(&patient_id, &date, &text)?;
        Ok(patient.map(|p| p.into()))
    }

    // =========================================================================
    // Form & Export Operations
    // =========================================================================

    /// The form layout as JSON, for hosts that render the form from it.
    pub fn form_schema_json(&self) -> Result<String, MseRecordsError> {
        Ok(serde_json::to_string(&self.schema)?)
    }

    /// Render a saved record as a text or HTML report.
    pub fn export_report(
        &self,
        record_id: String,
        format: FfiReportFormat,
    ) -> Result<Option<FfiReportFile>, MseRecordsError> {
        let store = self.store.lock()?;
        let Some(record) = store.find_record(&record_id)? else {
            return Ok(None);
        };

        let report = Report::build(&self.schema, &record);
        let renderer: Box<dyn ExportRenderer> = match format {
            FfiReportFormat::Text => Box::new(TextReportRenderer::new()),
            FfiReportFormat::Html => Box::new(HtmlReportRenderer::new()),
        };

        Ok(Some(FfiReportFile {
            filename: report_filename(Some(record.record_id.as_str()), renderer.format()),
            content: renderer.render(&report)?,
        }))
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe field value.
#[derive(Debug, Clone, PartialEq, uniffi::Enum)]
pub enum FfiFieldValue {
    Text { value: String },
    Flag { value: bool },
}

impl From<FieldValue> for FfiFieldValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(value) => FfiFieldValue::Text { value },
            FieldValue::Flag(value) => FfiFieldValue::Flag { value },
        }
    }
}

impl From<FfiFieldValue> for FieldValue {
    fn from(value: FfiFieldValue) -> Self {
        match value {
            FfiFieldValue::Text { value } => FieldValue::Text(value),
            FfiFieldValue::Flag { value } => FieldValue::Flag(value),
        }
    }
}

/// FFI-safe custom field.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCustomField {
    pub field_key: String,
    pub label: String,
    pub value: String,
}

impl From<CustomField> for FfiCustomField {
    fn from(field: CustomField) -> Self {
        Self {
            field_key: field.field_key,
            label: field.label,
            value: field.value,
        }
    }
}

impl From<FfiCustomField> for CustomField {
    fn from(field: FfiCustomField) -> Self {
        CustomField {
            field_key: field.field_key,
            label: field.label,
            value: field.value,
        }
    }
}

/// FFI-safe save request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSaveRecord {
    pub fields: HashMap<String, FfiFieldValue>,
    pub custom_fields: Vec<FfiCustomField>,
    pub existing_id: Option<String>,
}

impl From<FfiSaveRecord> for SaveRecord {
    fn from(request: FfiSaveRecord) -> Self {
        SaveRecord {
            fields: request
                .fields
                .into_iter()
                .map(|(k, v)| (k, v.into()))
                .collect(),
            custom_fields: request.custom_fields.into_iter().map(|f| f.into()).collect(),
            existing_id: request.existing_id,
        }
    }
}

/// FFI-safe record.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRecord {
    pub record_id: String,
    pub fields: HashMap<String, FfiFieldValue>,
    pub observation_timestamp: String,
    pub patient_ref: Option<String>,
    pub custom_fields: Vec<FfiCustomField>,
}

impl From<Record> for FfiRecord {
    fn from(record: Record) -> Self {
        Self {
            record_id: record.record_id,
            fields: record
                .fields
                .into_iter()
                .map(|(k, v)| (k, v.into()))
                .collect(),
            observation_timestamp: record.observation_timestamp,
            patient_ref: record.patient_ref,
            custom_fields: record.custom_fields.into_iter().map(|f| f.into()).collect(),
        }
    }
}

/// FFI-safe session note.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSessionNote {
    pub date: String,
    pub text: String,
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub patient_id: String,
    pub name: String,
    pub dob: String,
    pub sex: String,
    pub contact: String,
    pub notes: Vec<FfiSessionNote>,
    pub created_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            patient_id: patient.patient_id,
            name: patient.name,
            dob: patient.dob,
            sex: patient.sex,
            contact: patient.contact,
            notes: patient
                .notes
                .into_iter()
                .map(|n| FfiSessionNote {
                    date: n.date,
                    text: n.text,
                })
                .collect(),
            created_at: patient.created_at,
        }
    }
}

/// FFI-safe patient details.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewPatient {
    pub name: String,
    pub dob: String,
    pub sex: String,
    pub contact: String,
}

impl From<FfiNewPatient> for NewPatient {
    fn from(details: FfiNewPatient) -> Self {
        NewPatient {
            name: details.name,
            dob: details.dob,
            sex: details.sex,
            contact: details.contact,
        }
    }
}

/// Report formats rendered in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiReportFormat {
    Text,
    Html,
}

/// A rendered report ready to download.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReportFile {
    pub filename: String,
    pub content: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(name: &str, age: &str, sex: &str) -> FfiSaveRecord {
        let mut fields = HashMap::new();
        for (key, value) in [("patient-name", name), ("age", age), ("sex", sex)] {
            fields.insert(
                key.to_string(),
                FfiFieldValue::Text {
                    value: value.to_string(),
                },
            );
        }
        FfiSaveRecord {
            fields,
            custom_fields: Vec::new(),
            existing_id: None,
        }
    }

    #[test]
    fn test_ffi_save_and_export() {
        let core = open_store_in_memory().unwrap();
        let saved = core.save_record(make_request("Jane Smith", "29", "Female")).unwrap();
        assert_eq!(saved.record_id, "JS29F");

        let file = core
            .export_report("JS29F".into(), FfiReportFormat::Html)
            .unwrap()
            .unwrap();
        assert_eq!(file.filename, "JS29F-Report.html");
        assert!(String::from_utf8(file.content).unwrap().contains("Jane Smith"));

        assert!(core
            .export_report("ZZ1F".into(), FfiReportFormat::Text)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_ffi_validation_error() {
        let core = open_store_in_memory().unwrap();
        let result = core.save_record(make_request("", "29", "Female"));
        assert!(matches!(result, Err(MseRecordsError::ValidationError(_))));
    }

    #[test]
    fn test_ffi_patient_cascade() {
        let core = open_store_in_memory().unwrap();
        let saved = core.save_record(make_request("Jane Smith", "29", "Female")).unwrap();
        let patient_id = saved.patient_ref.unwrap();

        core.add_note(patient_id.clone(), "2024-02-01".into(), "Intake".into())
            .unwrap();
        assert_eq!(core.records_for_patient(patient_id.clone()).unwrap().len(), 1);

        assert_eq!(core.delete_patient(patient_id.clone()).unwrap(), 1);
        assert!(core.get_patient(patient_id).unwrap().is_none());
        assert!(core.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_preview_record_id() {
        assert_eq!(
            preview_record_id("John Doe".into(), "34".into(), "Male".into()),
            Some("JD34M".into())
        );
        assert_eq!(preview_record_id("".into(), "34".into(), "Male".into()), None);
    }

    #[test]
    fn test_schema_json_round_trips() {
        let core = open_store_in_memory().unwrap();
        let json = core.form_schema_json().unwrap();
        assert_eq!(FormSchema::from_json(&json).unwrap(), FormSchema::mental_status_exam());
    }
}
