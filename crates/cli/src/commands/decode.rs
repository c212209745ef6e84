use crate::OutputFormat;
use crate::util::{CliResult, parse_base64, parse_hex, to_hex, yes_no};
use anyhow::Context;
use axmarker_core::TextMarkerRecord;
use clap::{ArgGroup, Args};
use serde::Serialize;
use std::fmt::Write;

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("payload").required(true).args(["hex", "base64"])))]
pub struct DecodeArgs {
    #[arg(long = "hex", value_name = "HEX", help = "Payload as hex; whitespace and ':' are ignored.")]
    pub hex: Option<String>,
    #[arg(long = "base64", value_name = "BASE64", help = "Payload as standard base64.")]
    pub base64: Option<String>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct RecordSummary {
    #[serde(flatten)]
    pub(crate) record: TextMarkerRecord,
    pub(crate) node_is_null: bool,
    pub(crate) hex: String,
}

impl RecordSummary {
    pub(crate) fn new(record: TextMarkerRecord) -> Self {
        Self { record, node_is_null: record.node.is_null(), hex: to_hex(&record.to_bytes()) }
    }
}

pub fn run(args: &DecodeArgs) -> CliResult<String> {
    let bytes = read_payload(args)?;
    tracing::debug!(len = bytes.len(), "decoding payload");
    let record = TextMarkerRecord::from_bytes(&bytes).context("payload is not a text marker record")?;
    render_record(&RecordSummary::new(record), args.format)
}

fn read_payload(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    match (&args.hex, &args.base64) {
        (Some(hex), _) => parse_hex(hex),
        (None, Some(encoded)) => parse_base64(encoded),
        (None, None) => anyhow::bail!("decode requires --hex or --base64"),
    }
}

pub(crate) fn render_record(summary: &RecordSummary, format: OutputFormat) -> CliResult<String> {
    let output = match format {
        OutputFormat::Text => render_record_text(summary),
        OutputFormat::Json => serde_json::to_string_pretty(summary)?,
    };
    Ok(output)
}

fn render_record_text(summary: &RecordSummary) -> String {
    let record = &summary.record;
    let mut output = String::new();
    let _ = writeln!(&mut output, "ax_id: {}", record.ax_id);
    let null = if summary.node_is_null { " (null)" } else { "" };
    let _ = writeln!(&mut output, "node: {}{null}", record.node);
    let _ = writeln!(&mut output, "offset: {}", record.offset);
    let _ = writeln!(&mut output, "character_start_index: {}", record.character_start_index);
    let _ = writeln!(&mut output, "character_offset: {}", record.character_offset);
    let _ = writeln!(&mut output, "ignored: {}", yes_no(record.ignored));
    let _ = writeln!(&mut output, "affinity: {}", record.affinity);
    let _ = writeln!(&mut output, "hex: {}", summary.hex);
    output.trim_end().to_owned()
}
