//! Store configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::store::StoreResult;

/// Storage keys and the form fields the store reads identity from.
///
/// Every field has a default, so an empty configuration is valid.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Entry holding the record collection
    pub records_key: String,
    /// Entry holding the patient registry
    pub patients_key: String,
    /// Field key of the patient's name
    pub name_field: String,
    /// Field key of the patient's age
    pub age_field: String,
    /// Field key of the patient's sex
    pub sex_field: String,
    /// Field key of the examination timestamp
    pub timestamp_field: String,
    /// SQLite file for [`crate::backend::SqliteBackend`]
    pub database_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            records_key: "mseRecords".to_string(),
            patients_key: "msePatients".to_string(),
            name_field: "patient-name".to_string(),
            age_field: "age".to_string(),
            sex_field: "sex".to_string(),
            timestamp_field: "observation-date".to_string(),
            database_path: None,
        }
    }
}

impl StoreConfig {
    /// Load configuration from an optional file, then `MSE_*` environment
    /// variables (e.g. `MSE_RECORDS_KEY`).
    pub fn load(path: Option<&Path>) -> StoreResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("MSE"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
