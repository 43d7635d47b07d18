/// Report model shared by `inspect` and `frames`.
///
/// A report is a list of titled sections, each a list of name/value
/// pairs. Text output aligns the names; JSON output is the serde form of
/// the same structs, so both views always carry the same facts.
///
/// ```text
/// Format: mpeg audio
/// [mpeg audio frame @ 0]
///   version        MPEG Version 1
///   layer          Layer III
/// ```
use std::fmt::Write as _;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Report {
    pub format: String,
    pub sections: Vec<Section>,
}

#[derive(Debug, Serialize)]
pub struct Section {
    pub title: String,
    pub fields: Vec<Field>,
}

#[derive(Debug, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

impl Report {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            sections: Vec::new(),
        }
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    /// Render as aligned text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Format: {}", self.format);
        for section in &self.sections {
            let _ = writeln!(out, "[{}]", section.title);
            let width = section
                .fields
                .iter()
                .map(|f| f.name.len())
                .max()
                .unwrap_or(0);
            for field in &section.fields {
                let _ = writeln!(out, "  {:<width$}  {}", field.name, field.value);
            }
        }
        out
    }
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field, builder style.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: value.to_string(),
        });
        self
    }

    /// Append a field only when `value` is present.
    #[must_use]
    pub fn field_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.field(name, v),
            None => self,
        }
    }
}

/// `"yes"` / `"no"`.
pub fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

/// Space-separated flag names, `"none"` when empty.
pub fn flag_list(names: &[&str]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(" ")
    }
}

/// Milliseconds with three decimals, from a duration.
pub fn millis(d: std::time::Duration) -> String {
    let micros = d.as_micros();
    format!("{}.{:03} ms", micros / 1000, micros % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_aligns_names() {
        let mut report = Report::new("pdf");
        report.push(
            Section::new("pdf header")
                .field("version", "1.7")
                .field("line ending", "CRLF"),
        );
        assert_eq!(
            report.to_text(),
            "Format: pdf\n[pdf header]\n  version      1.7\n  line ending  CRLF\n"
        );
    }

    #[test]
    fn json_shape() {
        let mut report = Report::new("gzip");
        report.push(Section::new("gzip member header").field("os", "Unix"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["format"], "gzip");
        assert_eq!(json["sections"][0]["fields"][0]["value"], "Unix");
    }

    #[test]
    fn optional_fields_skipped() {
        let section = Section::new("x").field_opt("name", None::<&str>).field_opt("os", Some(3));
        assert_eq!(section.fields.len(), 1);
        assert_eq!(section.fields[0].value, "3");
    }
}
