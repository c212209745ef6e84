use crate::OutputFormat;
use crate::util::{CliResult, to_base64, to_hex};
use axmarker_core::{Affinity, AxId, NodeHandle, TextMarkerRecord};
use clap::Args;
use serde::Serialize;
use std::fmt::Write;

/// Field values of one marker payload. Shared by `encode` and `roundtrip`.
#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    #[arg(long = "ax-id", default_value_t = 0)]
    pub ax_id: u32,
    #[arg(long = "node", value_parser = parse_node, default_value = "0", help = "Node handle, decimal or 0x-prefixed hex.")]
    pub node: u64,
    #[arg(long = "offset", allow_negative_numbers = true, default_value_t = 0)]
    pub offset: i32,
    #[arg(long = "character-start-index", allow_negative_numbers = true, default_value_t = 0)]
    pub character_start_index: i32,
    #[arg(long = "character-offset", allow_negative_numbers = true, default_value_t = 0)]
    pub character_offset: i32,
    #[arg(long = "ignored")]
    pub ignored: bool,
    #[arg(long = "affinity", default_value_t = Affinity::Downstream, help = "upstream or downstream.")]
    pub affinity: Affinity,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl RecordArgs {
    pub fn record(&self) -> TextMarkerRecord {
        TextMarkerRecord::new(AxId(self.ax_id), NodeHandle(self.node), self.offset)
            .with_character_start_index(self.character_start_index)
            .with_character_offset(self.character_offset)
            .with_ignored(self.ignored)
            .with_affinity(self.affinity)
    }
}

fn parse_node(value: &str) -> Result<u64, String> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse(),
    };
    parsed.map_err(|err| format!("invalid node handle '{value}': {err}"))
}

#[derive(Serialize, Debug, PartialEq)]
struct EncodedSummary {
    record: TextMarkerRecord,
    hex: String,
    base64: String,
}

pub fn run(args: &RecordArgs) -> CliResult<String> {
    let record = args.record();
    let bytes = record.to_bytes();
    let summary = EncodedSummary { record, hex: to_hex(&bytes), base64: to_base64(&bytes) };
    let output = match args.format {
        OutputFormat::Text => render_encoded_text(&summary),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    Ok(output)
}

fn render_encoded_text(summary: &EncodedSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(&mut output, "record: {}", summary.record);
    let _ = writeln!(&mut output, "hex: {}", summary.hex);
    let _ = writeln!(&mut output, "base64: {}", summary.base64);
    output.trim_end().to_owned()
}
