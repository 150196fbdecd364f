//! Form schema: the ordered section → field layout shared by form and export.
//!
//! Both the form adapter and the report builder walk the same schema, so a
//! field added here shows up on the form and in exports together.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::store::{StoreError, StoreResult};

/// How a field is entered and displayed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line input or select
    Text,
    /// Multi-line textarea
    LongText,
    /// Checkbox
    Flag,
    /// Date or date-time input (stored as text)
    Date,
}

/// A single field declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field key used in [`crate::models::Fields`]
    pub key: String,
    /// Display label on the form and in reports
    pub label: String,
    #[serde(default = "default_kind")]
    pub kind: FieldKind,
}

fn default_kind() -> FieldKind {
    FieldKind::Text
}

/// A titled group of fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub fields: Vec<FieldSpec>,
}

/// Ordered list of sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormSchema {
    pub sections: Vec<Section>,
}

impl FormSchema {
    /// Parse and validate a schema from JSON configuration.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        let schema: FormSchema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check the schema has sections and unique, non-empty keys.
    pub fn validate(&self) -> StoreResult<()> {
        if self.sections.is_empty() {
            return Err(StoreError::Validation("schema has no sections".into()));
        }

        let mut seen = HashSet::new();
        for field in self.fields() {
            if field.key.trim().is_empty() {
                return Err(StoreError::Validation(format!(
                    "empty field key in schema (label {:?})",
                    field.label
                )));
            }
            if !seen.insert(field.key.as_str()) {
                return Err(StoreError::Validation(format!(
                    "duplicate field key in schema: {}",
                    field.key
                )));
            }
        }
        Ok(())
    }

    /// All fields in section order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }

    /// All field keys in section order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields().map(|f| f.key.as_str())
    }

    /// Look up a field declaration by key.
    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields().find(|f| f.key == key)
    }

    /// The built-in Mental Status Examination layout.
    pub fn mental_status_exam() -> Self {
        use FieldKind::*;

        let section = |title: &str, fields: &[(&str, &str, FieldKind)]| Section {
            title: title.to_string(),
            fields: fields
                .iter()
                .map(|(key, label, kind)| FieldSpec {
                    key: key.to_string(),
                    label: label.to_string(),
                    kind: *kind,
                })
                .collect(),
        };

        Self {
            sections: vec![
                section(
                    "Patient Information",
                    &[
                        ("patient-name", "Patient Name", Text),
                        ("age", "Age", Text),
                        ("sex", "Sex", Text),
                        ("observation-date", "Date of Examination", Date),
                        ("examined-by", "Examined By", Text),
                        ("informant", "Informant", Text),
                    ],
                ),
                section(
                    "Presenting Problem",
                    &[
                        ("chief-complaints", "Chief Complaints", LongText),
                        ("history-present-illness", "History of Present Illness", LongText),
                        ("past-psychiatric-history", "Past Psychiatric History", LongText),
                    ],
                ),
                section(
                    "Appearance and Behaviour",
                    &[
                        ("appearance", "Appearance", LongText),
                        ("grooming", "Grooming and Hygiene", Text),
                        ("eye-contact", "Eye Contact", Text),
                        ("psychomotor-activity", "Psychomotor Activity", Text),
                        ("attitude", "Attitude Towards Examiner", Text),
                        ("rapport-established", "Rapport Established", Flag),
                    ],
                ),
                section(
                    "Speech",
                    &[
                        ("speech-rate", "Rate", Text),
                        ("speech-volume", "Volume", Text),
                        ("speech-tone", "Tone", Text),
                        ("speech-notes", "Speech Notes", LongText),
                    ],
                ),
                section(
                    "Mood and Affect",
                    &[
                        ("mood", "Mood (subjective)", Text),
                        ("affect", "Affect (objective)", Text),
                        ("affect-congruent", "Affect Congruent with Mood", Flag),
                    ],
                ),
                section(
                    "Thought Process",
                    &[
                        ("thought-form", "Form of Thought", Text),
                        ("thought-process-notes", "Thought Process Notes", LongText),
                    ],
                ),
                section(
                    "Thought Content",
                    &[
                        ("preoccupations", "Preoccupations", LongText),
                        ("obsessions", "Obsessions and Compulsions", LongText),
                        ("delusions", "Delusions", LongText),
                    ],
                ),
                section(
                    "Perception",
                    &[
                        ("hallucinations", "Hallucinations", LongText),
                        ("illusions", "Illusions", Text),
                    ],
                ),
                section(
                    "Cognition",
                    &[
                        ("consciousness", "Level of Consciousness", Text),
                        ("orientation", "Orientation", Text),
                        ("attention", "Attention and Concentration", Text),
                        ("memory", "Memory", LongText),
                        ("abstract-thinking", "Abstract Thinking", Text),
                    ],
                ),
                section(
                    "Insight and Judgement",
                    &[
                        ("insight", "Insight", Text),
                        ("judgement", "Judgement", Text),
                    ],
                ),
                section(
                    "Risk Assessment",
                    &[
                        ("suicidal-ideation", "Suicidal Ideation", Flag),
                        ("homicidal-ideation", "Homicidal Ideation", Flag),
                        ("risk-notes", "Risk Notes", LongText),
                    ],
                ),
                section(
                    "Summary and Plan",
                    &[
                        ("provisional-diagnosis", "Provisional Diagnosis", LongText),
                        ("plan", "Management Plan", LongText),
                    ],
                ),
            ],
        }
    }
}

impl Default for FormSchema {
    fn default() -> Self {
        Self::mental_status_exam()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_schema_is_valid() {
        let schema = FormSchema::mental_status_exam();
        assert!(schema.validate().is_ok());
        assert_eq!(schema.sections[0].title, "Patient Information");
        assert_eq!(schema.keys().next(), Some("patient-name"));
    }

    #[test]
    fn test_field_lookup() {
        let schema = FormSchema::mental_status_exam();
        let field = schema.field("suicidal-ideation").unwrap();
        assert_eq!(field.kind, FieldKind::Flag);
        assert!(schema.field("no-such-field").is_none());
    }

    #[test]
    fn test_from_json_defaults_kind() {
        let json = r#"{"sections":[{"title":"Identity","fields":[
            {"key":"patient-name","label":"Name"},
            {"key":"consent","label":"Consent","kind":"flag"}
        ]}]}"#;
        let schema = FormSchema::from_json(json).unwrap();

        assert_eq!(schema.field("patient-name").unwrap().kind, FieldKind::Text);
        assert_eq!(schema.field("consent").unwrap().kind, FieldKind::Flag);
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let json = r#"{"sections":[
            {"title":"A","fields":[{"key":"age","label":"Age"}]},
            {"title":"B","fields":[{"key":"age","label":"Age again"}]}
        ]}"#;
        let result = FormSchema::from_json(json);
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_rejects_empty_schema() {
        let result = FormSchema::from_json(r#"{"sections":[]}"#);
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }
}
