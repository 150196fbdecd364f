//! HTML report renderer; the document hosts convert to DOCX.

use super::{ExportFormat, ExportRenderer, ExportResult, Report};

/// Renders one `<h2>` per section and one paragraph per line.
#[derive(Debug, Clone, Default)]
pub struct HtmlReportRenderer;

impl HtmlReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render to a string.
    pub fn render_string(&self, report: &Report) -> String {
        let mut html = String::from(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>MSE Report</title></head><body>",
        );
        html.push_str(&format!(
            "<h1>Mental Status Examination: {}</h1>",
            escape_html(&report.record_id)
        ));

        for section in &report.sections {
            html.push_str(&format!("<h2>{}</h2>", escape_html(&section.title)));
            for line in &section.lines {
                html.push_str(&format!(
                    "<p><strong>{}:</strong> {}</p>",
                    escape_html(&line.label),
                    escape_html(&line.value).replace('\n', "<br>")
                ));
            }
        }

        html.push_str("</body></html>");
        html
    }
}

impl ExportRenderer for HtmlReportRenderer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn render(&self, report: &Report) -> ExportResult<Vec<u8>> {
        Ok(self.render_string(report).into_bytes())
    }
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ReportLine, ReportSection};

    fn make_report(label: &str, value: &str) -> Report {
        Report {
            record_id: "JD34M".into(),
            observation_timestamp: String::new(),
            sections: vec![ReportSection {
                title: "Thought Content".into(),
                lines: vec![ReportLine {
                    label: label.into(),
                    value: value.into(),
                }],
            }],
        }
    }

    #[test]
    fn test_render_structure() {
        let html = HtmlReportRenderer::new().render_string(&make_report("Delusions", "None elicited"));
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h2>Thought Content</h2>"));
        assert!(html.contains("<p><strong>Delusions:</strong> None elicited</p>"));
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn test_escapes_markup_and_keeps_breaks() {
        let html = HtmlReportRenderer::new()
            .render_string(&make_report("Preoccupations", "<script>x</script>\nline two"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;<br>line two"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"a & "b" 'c'"#), "a &amp; &quot;b&quot; &#39;c&#39;");
    }
}
