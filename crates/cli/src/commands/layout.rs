use crate::OutputFormat;
use crate::util::CliResult;
use axmarker_core::RECORD_SIZE;
use axmarker_core::record::layout;
use serde::Serialize;
use std::fmt::Write;

#[derive(Serialize, Debug, PartialEq)]
struct FieldSummary {
    name: &'static str,
    offset: usize,
    size: usize,
}

#[derive(Serialize, Debug, PartialEq)]
struct LayoutSummary {
    size: usize,
    padding: usize,
    byte_order: &'static str,
    fields: Vec<FieldSummary>,
}

pub fn run(format: OutputFormat) -> CliResult<String> {
    let summary = LayoutSummary::current();
    let output = match format {
        OutputFormat::Text => render_layout_text(&summary),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    Ok(output)
}

impl LayoutSummary {
    fn current() -> Self {
        Self {
            size: RECORD_SIZE,
            padding: layout::padding(),
            byte_order: if cfg!(target_endian = "little") { "little" } else { "big" },
            fields: layout::fields()
                .iter()
                .map(|field| FieldSummary { name: field.name, offset: field.offset, size: field.size })
                .collect(),
        }
    }
}

fn render_layout_text(summary: &LayoutSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(
        &mut output,
        "TextMarkerRecord: {} bytes ({} padding, {}-endian)",
        summary.size, summary.padding, summary.byte_order
    );
    for field in &summary.fields {
        let _ = writeln!(&mut output, "  {:>2} +{}  {}", field.offset, field.size, field.name);
    }
    output.trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn fields_end_inside_record() {
        let summary = LayoutSummary::current();
        assert_eq!(summary.size, 40);
        assert_eq!(summary.padding, 11);
        assert!(summary.fields.iter().all(|field| field.offset + field.size <= summary.size));
    }

    #[rstest]
    fn text_lists_every_field() {
        let text = run(OutputFormat::Text).unwrap();
        assert!(text.starts_with("TextMarkerRecord: 40 bytes"));
        assert!(text.contains("32 +4  affinity"), "{text}");
        assert_eq!(text.lines().count(), 8);
    }

    #[rstest]
    fn json_is_valid() {
        let json = run(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["fields"][1]["name"], "node");
        assert_eq!(value["fields"][1]["offset"], 8);
    }
}
