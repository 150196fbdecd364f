//! Examination record models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field values keyed by form field key (e.g. `"age"`, `"chief-complaints"`).
pub type Fields = BTreeMap<String, FieldValue>;

/// A single form field value.
///
/// Stored untagged so the persisted JSON stays `"key": "text"` or
/// `"key": true`. Dates and timestamps are text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldValue {
    /// Checkbox state
    Flag(bool),
    /// Free text, select values, dates
    Text(String),
}

impl FieldValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Flag(_) => None,
        }
    }

    /// Checkbox state, if this is a flag value.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(flag) => Some(*flag),
            FieldValue::Text(_) => None,
        }
    }

    /// Whether this value would show nothing on a form or report.
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.trim().is_empty(),
            FieldValue::Flag(_) => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<bool> for FieldValue {
    fn from(flag: bool) -> Self {
        FieldValue::Flag(flag)
    }
}

/// A user-defined field appended to a record outside the form schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    /// Key unique within the record's custom fields
    pub field_key: String,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Entered value
    #[serde(default)]
    pub value: String,
}

impl CustomField {
    pub fn new(field_key: impl Into<String>, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_key: field_key.into(),
            label: label.into(),
            value: value.into(),
        }
    }
}

/// One persisted examination.
///
/// The JSON layout matches what the browser app wrote to local storage:
/// `{"id", "date", "data", "patientId"?, "customFields"?}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    /// Derived identifier (see [`crate::identity::derive_record_id`])
    #[serde(rename = "id")]
    pub record_id: String,
    /// Form field values
    #[serde(rename = "data", default)]
    pub fields: Fields,
    /// ISO-8601 observation instant
    #[serde(rename = "date", default)]
    pub observation_timestamp: String,
    /// Weak link to [`crate::models::Patient::patient_id`]
    #[serde(rename = "patientId", default, skip_serializing_if = "Option::is_none")]
    pub patient_ref: Option<String>,
    /// User-defined extension fields, in entry order
    #[serde(rename = "customFields", default, skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,
}

impl Record {
    /// Text value of a field, if present and textual.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FieldValue::as_text)
    }

    /// Whether this record is linked to the given patient.
    pub fn belongs_to(&self, patient_id: &str) -> bool {
        self.patient_ref.as_deref() == Some(patient_id)
    }
}
