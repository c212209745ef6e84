use crate::OutputFormat;
use crate::commands::decode::{RecordSummary, render_record};
use crate::commands::encode::RecordArgs;
use crate::util::{CliResult, yes_no};
use anyhow::Context;
use axmarker_core::{MarkerBackend, TextMarker, TextMarkerRange, TextMarkerRecord};
use serde::Serialize;
use std::fmt::Write;

#[derive(Serialize, Debug, PartialEq)]
struct RoundtripSummary {
    backend: &'static str,
    sent: TextMarkerRecord,
    received: TextMarkerRecord,
    matches: bool,
}

/// Creates a marker from `args`, wraps it in a single-point range and reads
/// the range start back.
pub fn run(backend: &'static dyn MarkerBackend, args: &RecordArgs) -> CliResult<String> {
    let backend_id = backend.descriptor().id;
    let sent = args.record();
    tracing::info!(backend = backend_id, record = %sent, "creating text marker");

    let marker = TextMarker::new(backend, &sent)
        .with_context(|| format!("creating a text marker on backend '{backend_id}'"))?;
    let range = TextMarkerRange::new(&marker, &marker).context("creating a text marker range")?;
    let start = range.start().context("copying the range start")?;
    let received = start.record().context("reading the range start")?;

    let summary = RoundtripSummary { backend: backend_id, sent, received, matches: sent == received };
    if !summary.matches {
        tracing::warn!(%sent, %received, "text marker payload changed in round trip");
    }

    let output = match args.format {
        OutputFormat::Text => render_roundtrip_text(&summary)?,
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    Ok(output)
}

fn render_roundtrip_text(summary: &RoundtripSummary) -> CliResult<String> {
    let mut output = String::new();
    let _ = writeln!(&mut output, "backend: {}", summary.backend);
    let _ = writeln!(
        &mut output,
        "{}",
        render_record(&RecordSummary::new(summary.received), OutputFormat::Text)?
    );
    let _ = writeln!(&mut output, "match: {}", yes_no(summary.matches));
    Ok(output.trim_end().to_owned())
}
