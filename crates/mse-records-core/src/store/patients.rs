//! Patient registry operations, cascade delete and session notes.

use strsim::jaro_winkler;

use super::{RecordStore, StoreError, StoreResult};
use crate::backend::StorageBackend;
use crate::models::{canonical_name, NewPatient, Patient, Record, SessionNote};

/// Minimum similarity for a patient to appear in search results.
const MIN_SEARCH_SCORE: f64 = 0.60;

/// Score for a query that prefixes one of the name's words.
const WORD_PREFIX_SCORE: f64 = 0.90;

impl<B: StorageBackend> RecordStore<B> {
    /// Register a patient explicitly.
    pub fn create_patient(&self, details: NewPatient) -> StoreResult<Patient> {
        require_name(&details)?;

        let mut patients = self.load::<Patient>(&self.config.patients_key)?;
        let patient = Patient::new(details);
        patients.items.push(patient.clone());

        let write = self.stage(&self.config.patients_key, &patients)?;
        self.backend.write_batch(&[write])?;

        tracing::info!(patient_id = %patient.patient_id, "patient created");
        Ok(patient)
    }

    /// Get a patient by ID.
    pub fn find_patient(&self, patient_id: &str) -> StoreResult<Option<Patient>> {
        let patients = self.load::<Patient>(&self.config.patients_key)?;
        Ok(patients
            .items
            .into_iter()
            .find(|p| p.patient_id == patient_id))
    }

    /// List all patients in registration order.
    pub fn list_patients(&self) -> StoreResult<Vec<Patient>> {
        Ok(self.load::<Patient>(&self.config.patients_key)?.items)
    }

    /// Edit a patient's registry details. Notes and ID are untouched.
    pub fn update_patient_details(
        &self,
        patient_id: &str,
        details: NewPatient,
    ) -> StoreResult<Option<Patient>> {
        require_name(&details)?;

        let mut patients = self.load::<Patient>(&self.config.patients_key)?;
        let Some(patient) = patients.items.iter_mut().find(|p| p.patient_id == patient_id) else {
            return Ok(None);
        };

        patient.apply_details(details);
        let updated = patient.clone();

        let write = self.stage(&self.config.patients_key, &patients)?;
        self.backend.write_batch(&[write])?;

        tracing::info!(patient_id, "patient details updated");
        Ok(Some(updated))
    }

    /// Delete a patient and every record linked to it.
    ///
    /// Both collections are written in one batch. Returns the number of
    /// records removed.
    pub fn delete_patient_cascade(&self, patient_id: &str) -> StoreResult<usize> {
        let mut patients = self.load::<Patient>(&self.config.patients_key)?;
        let mut records = self.load::<Record>(&self.config.records_key)?;

        let patients_before = patients.items.len();
        patients.items.retain(|p| p.patient_id != patient_id);

        let records_before = records.items.len();
        records.items.retain(|r| !r.belongs_to(patient_id));
        let removed_records = records_before - records.items.len();

        if patients.items.len() == patients_before && removed_records == 0 {
            tracing::debug!(patient_id, "cascade delete found nothing to remove");
            return Ok(0);
        }

        let writes = [
            self.stage(&self.config.patients_key, &patients)?,
            self.stage(&self.config.records_key, &records)?,
        ];
        self.backend.write_batch(&writes)?;

        tracing::info!(patient_id, removed_records, "patient deleted with records");
        Ok(removed_records)
    }

    /// Append a session note to a patient.
    ///
    /// Returns `None` if the patient does not exist.
    pub fn add_note(&self, patient_id: &str, date: &str, text: &str) -> StoreResult<Option<Patient>> {
        if date.trim().is_empty() || text.trim().is_empty() {
            return Err(StoreError::Validation(
                "note date and text are required".into(),
            ));
        }

        let mut patients = self.load::<Patient>(&self.config.patients_key)?;
        let Some(patient) = patients.items.iter_mut().find(|p| p.patient_id == patient_id) else {
            tracing::debug!(patient_id, "note for unknown patient ignored");
            return Ok(None);
        };

        patient.notes.push(SessionNote {
            date: date.to_string(),
            text: text.to_string(),
        });
        let updated = patient.clone();

        let write = self.stage(&self.config.patients_key, &patients)?;
        self.backend.write_batch(&[write])?;

        tracing::info!(patient_id, notes = updated.notes.len(), "session note added");
        Ok(Some(updated))
    }

    /// Search the registry by name, best matches first.
    pub fn search_patients(&self, query: &str, limit: usize) -> StoreResult<Vec<Patient>> {
        let query = canonical_name(query);
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let patients = self.load::<Patient>(&self.config.patients_key)?;
        let mut scored: Vec<(f64, Patient)> = patients
            .items
            .into_iter()
            .map(|p| (name_score(&p.name, &query), p))
            .filter(|(score, _)| *score >= MIN_SEARCH_SCORE)
            .collect();

        scored.sort_by(|(a, pa), (b, pb)| {
            b.partial_cmp(a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| pa.name.cmp(&pb.name))
        });

        Ok(scored.into_iter().take(limit).map(|(_, p)| p).collect())
    }
}

fn require_name(details: &NewPatient) -> StoreResult<()> {
    if details.name.trim().is_empty() {
        return Err(StoreError::Validation("patient name is required".into()));
    }
    Ok(())
}

/// Similarity of a patient name to an already-canonical query.
fn name_score(name: &str, query: &str) -> f64 {
    let name = canonical_name(name);
    if name.starts_with(query) {
        return 1.0;
    }
    if name.split_whitespace().any(|word| word.starts_with(query)) {
        return WORD_PREFIX_SCORE;
    }

    name.split_whitespace()
        .map(|word| jaro_winkler(word, query))
        .fold(jaro_winkler(&name, query), f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::models::Fields;
    use crate::store::SaveRecord;

    fn setup_store() -> RecordStore<MemoryBackend> {
        RecordStore::new(MemoryBackend::new())
    }

    fn save(store: &RecordStore<MemoryBackend>, name: &str, age: &str, sex: &str) -> Record {
        let mut fields = Fields::new();
        fields.insert("patient-name".into(), name.into());
        fields.insert("age".into(), age.into());
        fields.insert("sex".into(), sex.into());
        store.upsert_record(SaveRecord::new(fields)).unwrap()
    }

    #[test]
    fn test_create_and_find() {
        let store = setup_store();
        let patient = store
            .create_patient(NewPatient {
                name: "Ann Lee".into(),
                dob: "1990-04-12".into(),
                sex: "Female".into(),
                contact: "555-0100".into(),
            })
            .unwrap();

        let found = store.find_patient(&patient.patient_id).unwrap().unwrap();
        assert_eq!(found, patient);
        assert_eq!(found.dob, "1990-04-12");
    }

    #[test]
    fn test_create_requires_name() {
        let store = setup_store();
        let result = store.create_patient(NewPatient::named("  "));
        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert!(store.list_patients().unwrap().is_empty());
    }

    #[test]
    fn test_record_links_to_existing_patient_case_insensitively() {
        let store = setup_store();
        let patient = store.create_patient(NewPatient::named("Jane Smith")).unwrap();

        let record = save(&store, "JANE SMITH", "29", "Female");

        assert_eq!(record.patient_ref, Some(patient.patient_id.clone()));
        let patients = store.list_patients().unwrap();
        assert_eq!(patients.len(), 1);
        // Linking leaves the registry entry as it was
        assert_eq!(patients[0], patient);
    }

    #[test]
    fn test_update_details() {
        let store = setup_store();
        let patient = store.create_patient(NewPatient::named("Ann Lee")).unwrap();
        store.add_note(&patient.patient_id, "2024-02-01", "Intake").unwrap();

        let updated = store
            .update_patient_details(
                &patient.patient_id,
                NewPatient {
                    name: "Ann Lee".into(),
                    contact: "ann@example.org".into(),
                    ..NewPatient::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.contact, "ann@example.org");
        assert_eq!(updated.notes.len(), 1);
        assert_eq!(store.update_patient_details("PAT-missing", NewPatient::named("X")).unwrap(), None);
    }

    #[test]
    fn test_cascade_removes_only_linked_records() {
        let store = setup_store();
        let a = save(&store, "John Doe", "34", "Male");
        save(&store, "John Doe", "35", "Male");
        let other = save(&store, "Ann Lee", "5", "F");

        let patient_id = a.patient_ref.clone().unwrap();
        let removed = store.delete_patient_cascade(&patient_id).unwrap();

        assert_eq!(removed, 2);
        assert_eq!(store.find_patient(&patient_id).unwrap(), None);
        assert!(store.records_for_patient(&patient_id).unwrap().is_empty());
        assert_eq!(store.list_records().unwrap(), vec![other]);
    }

    #[test]
    fn test_cascade_on_unknown_patient_is_noop() {
        let store = setup_store();
        save(&store, "John Doe", "34", "Male");

        assert_eq!(store.delete_patient_cascade("PAT-missing").unwrap(), 0);
        assert_eq!(store.list_records().unwrap().len(), 1);
        assert_eq!(store.list_patients().unwrap().len(), 1);
    }

    #[test]
    fn test_notes_append_in_order() {
        let store = setup_store();
        let patient = store.create_patient(NewPatient::named("Ann Lee")).unwrap();

        store.add_note(&patient.patient_id, "2024-02-01", "Intake").unwrap();
        let updated = store
            .add_note(&patient.patient_id, "2024-01-15", "Earlier session, entered late")
            .unwrap()
            .unwrap();

        let texts: Vec<_> = updated.notes.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["Intake", "Earlier session, entered late"]);

        let stored = store.find_patient(&patient.patient_id).unwrap().unwrap();
        assert_eq!(stored.notes, updated.notes);
    }

    #[test]
    fn test_note_validation() {
        let store = setup_store();
        let patient = store.create_patient(NewPatient::named("Ann Lee")).unwrap();

        assert!(matches!(
            store.add_note(&patient.patient_id, "", "text"),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            store.add_note(&patient.patient_id, "2024-02-01", "   "),
            Err(StoreError::Validation(_))
        ));
        assert!(store.find_patient(&patient.patient_id).unwrap().unwrap().notes.is_empty());
    }

    #[test]
    fn test_note_for_unknown_patient() {
        let store = setup_store();
        assert_eq!(store.add_note("PAT-missing", "2024-02-01", "text").unwrap(), None);
    }

    #[test]
    fn test_search_patients() {
        let store = setup_store();
        store.create_patient(NewPatient::named("Jane Smith")).unwrap();
        store.create_patient(NewPatient::named("Janet Smythe")).unwrap();
        store.create_patient(NewPatient::named("Luis Ortega")).unwrap();

        let results = store.search_patients("jane", 10).unwrap();
        let names: Vec<_> = results.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Jane Smith", "Janet Smythe"]);

        let by_surname = store.search_patients("Smith", 10).unwrap();
        assert_eq!(by_surname[0].name, "Jane Smith");

        assert!(store.search_patients("  ", 10).unwrap().is_empty());
        assert_eq!(store.search_patients("jane", 1).unwrap().len(), 1);
    }
}
