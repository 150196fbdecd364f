//! Plain-text report renderer.

use super::{ExportFormat, ExportRenderer, ExportResult, Report};

/// Default wrap width in columns.
pub const DEFAULT_TEXT_WIDTH: usize = 90;

/// Renders section titles followed by `Label: value` lines, word-wrapped.
#[derive(Debug, Clone)]
pub struct TextReportRenderer {
    width: usize,
}

impl TextReportRenderer {
    pub fn new() -> Self {
        Self::with_width(DEFAULT_TEXT_WIDTH)
    }

    /// Wrap at `width` columns (at least 20).
    pub fn with_width(width: usize) -> Self {
        Self {
            width: width.max(20),
        }
    }

    /// Render to a string.
    pub fn render_string(&self, report: &Report) -> String {
        let mut out = String::new();
        out.push_str("MENTAL STATUS EXAMINATION\n");
        out.push_str(&format!("Record: {}\n", report.record_id));
        if !report.observation_timestamp.is_empty() {
            out.push_str(&format!("Date: {}\n", report.observation_timestamp));
        }

        for section in &report.sections {
            out.push('\n');
            out.push_str(&section.title.to_uppercase());
            out.push('\n');
            for line in &section.lines {
                let text = format!("{}: {}", line.label, line.value);
                for wrapped in wrap(&text, self.width) {
                    out.push_str(&wrapped);
                    out.push('\n');
                }
            }
        }

        out
    }
}

impl Default for TextReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportRenderer for TextReportRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn render(&self, report: &Report) -> ExportResult<Vec<u8>> {
        Ok(self.render_string(report).into_bytes())
    }
}

/// Greedy word wrap. Existing line breaks are kept; words longer than the
/// width get a line of their own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = if current.is_empty() {
                word.chars().count()
            } else {
                current.chars().count() + 1 + word.chars().count()
            };

            if needed > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }

    lines
}
