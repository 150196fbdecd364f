//! Record operations: save (upsert), find, list, delete.

use chrono::SecondsFormat;

use super::{RecordStore, StoreError, StoreResult};
use crate::backend::StorageBackend;
use crate::identity::derive_record_id;
use crate::models::{CustomField, FieldValue, Fields, NewPatient, Patient, Record};

/// A form submission to be saved as a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveRecord {
    /// Form field values, including name, age and sex
    pub fields: Fields,
    /// User-defined extension fields
    pub custom_fields: Vec<CustomField>,
    /// Identifier of the record being edited, if any
    pub existing_id: Option<String>,
}

impl SaveRecord {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Save as an edit of an existing record, keeping its identifier.
    pub fn editing(mut self, record_id: impl Into<String>) -> Self {
        self.existing_id = Some(record_id.into());
        self
    }

    pub fn with_custom_fields(mut self, custom_fields: Vec<CustomField>) -> Self {
        self.custom_fields = custom_fields;
        self
    }
}

impl<B: StorageBackend> RecordStore<B> {
    /// Insert or replace a record.
    ///
    /// The identifier is derived from the name, age and sex fields unless
    /// `existing_id` is set, in which case it is kept as-is. Saving links the
    /// record to the registry patient with the same name (case-insensitive),
    /// creating that patient on first sight.
    pub fn upsert_record(&self, request: SaveRecord) -> StoreResult<Record> {
        let SaveRecord {
            fields,
            custom_fields,
            existing_id,
        } = request;

        let name = field_text(&fields, &self.config.name_field).to_string();
        let age = field_text(&fields, &self.config.age_field);
        let sex = field_text(&fields, &self.config.sex_field).to_string();

        let candidate_id = derive_record_id(&name, age, &sex).ok_or_else(|| {
            StoreError::Validation("name, age, and sex are required".into())
        })?;

        let (record_id, editing) = match existing_id {
            Some(id) if !id.trim().is_empty() => (id, true),
            _ => (candidate_id, false),
        };

        let observation_timestamp = match field_text(&fields, &self.config.timestamp_field) {
            ts if !ts.trim().is_empty() => ts.to_string(),
            _ => now_iso(),
        };

        let mut records = self.load::<Record>(&self.config.records_key)?;
        let mut patients = self.load::<Patient>(&self.config.patients_key)?;

        let existing_index = records.items.iter().position(|r| r.record_id == record_id);
        // Only an edit inherits the stored link; a fresh save that lands on an
        // existing ID may be a different person with the same initials.
        let previous_ref = existing_index
            .filter(|_| editing)
            .and_then(|i| records.items[i].patient_ref.clone());

        let (patient_ref, patient_created) =
            link_patient(&mut patients.items, &name, &sex, previous_ref);

        let record = Record {
            record_id,
            fields,
            observation_timestamp,
            patient_ref: Some(patient_ref),
            custom_fields,
        };

        match existing_index {
            Some(index) => records.items[index] = record.clone(),
            None => records.items.push(record.clone()),
        }

        let mut writes = vec![self.stage(&self.config.records_key, &records)?];
        if patient_created {
            writes.push(self.stage(&self.config.patients_key, &patients)?);
        }
        self.backend.write_batch(&writes)?;

        tracing::info!(
            record_id = %record.record_id,
            patient_id = record.patient_ref.as_deref().unwrap_or_default(),
            updated = existing_index.is_some(),
            patient_created,
            "record saved"
        );

        Ok(record)
    }

    /// Get a record by identifier.
    pub fn find_record(&self, record_id: &str) -> StoreResult<Option<Record>> {
        let records = self.load::<Record>(&self.config.records_key)?;
        Ok(records.items.into_iter().find(|r| r.record_id == record_id))
    }

    /// List all records in saved order.
    pub fn list_records(&self) -> StoreResult<Vec<Record>> {
        Ok(self.load::<Record>(&self.config.records_key)?.items)
    }

    /// List the records linked to a patient, in saved order.
    pub fn records_for_patient(&self, patient_id: &str) -> StoreResult<Vec<Record>> {
        let records = self.load::<Record>(&self.config.records_key)?;
        Ok(records
            .items
            .into_iter()
            .filter(|r| r.belongs_to(patient_id))
            .collect())
    }

    /// Delete a record. Returns `false` (and writes nothing) if it was absent.
    pub fn delete_record(&self, record_id: &str) -> StoreResult<bool> {
        let mut records = self.load::<Record>(&self.config.records_key)?;

        let Some(index) = records.items.iter().position(|r| r.record_id == record_id) else {
            tracing::debug!(record_id, "delete of absent record ignored");
            return Ok(false);
        };

        records.items.remove(index);
        let write = self.stage(&self.config.records_key, &records)?;
        self.backend.write_batch(&[write])?;

        tracing::info!(record_id, "record deleted");
        Ok(true)
    }
}

/// Text of a field; flags and missing fields read as empty.
fn field_text<'a>(fields: &'a Fields, key: &str) -> &'a str {
    fields
        .get(key)
        .and_then(FieldValue::as_text)
        .unwrap_or_default()
}

/// Resolve the patient a saved record belongs to.
///
/// Keeps a still-valid previous link, else matches by name, else registers a
/// new patient. Returns the patient ID and whether the registry changed.
fn link_patient(
    patients: &mut Vec<Patient>,
    name: &str,
    sex: &str,
    previous_ref: Option<String>,
) -> (String, bool) {
    if let Some(id) = previous_ref {
        if patients.iter().any(|p| p.patient_id == id) {
            return (id, false);
        }
    }

    if let Some(existing) = patients.iter().find(|p| p.has_name(name)) {
        return (existing.patient_id.clone(), false);
    }

    let patient = Patient::new(NewPatient {
        name: name.trim().to_string(),
        sex: sex.to_string(),
        ..NewPatient::default()
    });
    let id = patient.patient_id.clone();
    tracing::info!(patient_id = %id, "patient registered from record");
    patients.push(patient);
    (id, true)
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
