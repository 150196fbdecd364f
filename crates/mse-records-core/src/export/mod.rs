//! Report export.
//!
//! A [`Report`] is the schema-ordered layout of one record. Renderers turn it
//! into bytes; text and HTML renderers ship here, PDF and DOCX encoders are
//! supplied by the host through [`ExportRenderer`].

mod html;
mod report;
mod text;

pub use html::*;
pub use report::*;
pub use text::*;

use thiserror::Error;

/// Export errors.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Render error: {0}")]
    Render(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Docx,
    Html,
    Text,
}

impl ExportFormat {
    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Html => "html",
            ExportFormat::Text => "txt",
        }
    }
}

/// Turns a report into a document.
pub trait ExportRenderer {
    /// Format this renderer produces.
    fn format(&self) -> ExportFormat;

    /// Render the report to document bytes.
    fn render(&self, report: &Report) -> ExportResult<Vec<u8>>;
}

/// Download filename for a report: `{record id or "MSE"}-Report.{ext}`.
pub fn report_filename(record_id: Option<&str>, format: ExportFormat) -> String {
    let stem = record_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or("MSE");
    format!("{}-Report.{}", stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_uses_record_id() {
        assert_eq!(report_filename(Some("JD34M"), ExportFormat::Pdf), "JD34M-Report.pdf");
        assert_eq!(report_filename(Some("JD34M"), ExportFormat::Docx), "JD34M-Report.docx");
    }

    #[test]
    fn test_filename_fallback() {
        assert_eq!(report_filename(None, ExportFormat::Pdf), "MSE-Report.pdf");
        assert_eq!(report_filename(Some(""), ExportFormat::Text), "MSE-Report.txt");
    }
}
