//! Schema-ordered report layout for a record.

use serde::{Deserialize, Serialize};

use crate::models::{FieldValue, Record};
use crate::schema::FormSchema;

/// Title of the trailing section holding custom fields.
pub const CUSTOM_FIELDS_TITLE: &str = "Additional Fields";

/// A labelled value in a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportLine {
    pub label: String,
    pub value: String,
}

/// A titled group of lines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSection {
    pub title: String,
    pub lines: Vec<ReportLine>,
}

/// Everything a renderer needs to lay out one record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub record_id: String,
    pub observation_timestamp: String,
    pub sections: Vec<ReportSection>,
}

impl Report {
    /// Build the layout for a record.
    ///
    /// Sections and fields follow the schema. Blank or missing values are
    /// left out, as are sections left with no lines. Flags read `Yes`/`No`.
    /// Custom fields with a value follow in their own section.
    pub fn build(schema: &FormSchema, record: &Record) -> Self {
        let mut sections: Vec<ReportSection> = schema
            .sections
            .iter()
            .map(|section| ReportSection {
                title: section.title.clone(),
                lines: section
                    .fields
                    .iter()
                    .filter_map(|field| {
                        let value = record.fields.get(&field.key)?;
                        display_value(value).map(|value| ReportLine {
                            label: field.label.clone(),
                            value,
                        })
                    })
                    .collect(),
            })
            .filter(|section| !section.lines.is_empty())
            .collect();

        let custom_lines: Vec<ReportLine> = record
            .custom_fields
            .iter()
            .filter(|field| !field.value.trim().is_empty())
            .map(|field| ReportLine {
                label: if field.label.trim().is_empty() {
                    field.field_key.clone()
                } else {
                    field.label.clone()
                },
                value: field.value.clone(),
            })
            .collect();

        if !custom_lines.is_empty() {
            sections.push(ReportSection {
                title: CUSTOM_FIELDS_TITLE.to_string(),
                lines: custom_lines,
            });
        }

        Self {
            record_id: record.record_id.clone(),
            observation_timestamp: record.observation_timestamp.clone(),
            sections,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

fn display_value(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Flag(true) => Some("Yes".to_string()),
        FieldValue::Flag(false) => Some("No".to_string()),
        FieldValue::Text(text) if text.trim().is_empty() => None,
        FieldValue::Text(text) => Some(text.clone()),
    }
}
