use crate::OutputFormat;
use crate::util::{CliResult, yes_no};
use axmarker_core::{BackendRegistry, MarkerBackend, MarkerConfig};
use serde::Serialize;
use std::fmt::Write;

#[derive(Serialize, Debug, PartialEq)]
struct BackendSummary {
    id: &'static str,
    name: &'static str,
    priority: i32,
    capabilities: Vec<&'static str>,
    availability: &'static str,
    reason: Option<String>,
}

#[derive(Serialize, Debug, PartialEq)]
struct StatusSummary {
    backends: Vec<BackendSummary>,
    selected: Option<&'static str>,
    selection_error: Option<String>,
    allow_private_api: bool,
}

/// Reports availability only; no backend primitive is invoked.
pub fn run(registry: &BackendRegistry, config: &MarkerConfig, format: OutputFormat) -> CliResult<String> {
    let summary = StatusSummary::collect(registry, config);
    let output = match format {
        OutputFormat::Text => render_status_text(&summary),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    Ok(output)
}

impl StatusSummary {
    fn collect(registry: &BackendRegistry, config: &MarkerConfig) -> Self {
        let (selected, selection_error) = match registry.select(config) {
            Ok(backend) => (Some(backend.descriptor().id), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            backends: registry.entries().iter().map(|backend| BackendSummary::from_backend(*backend)).collect(),
            selected,
            selection_error,
            allow_private_api: config.allow_private_api,
        }
    }
}

impl BackendSummary {
    fn from_backend(backend: &dyn MarkerBackend) -> Self {
        let descriptor = backend.descriptor();
        let availability = backend.availability();
        Self {
            id: descriptor.id,
            name: descriptor.display_name,
            priority: descriptor.priority,
            capabilities: descriptor.capabilities.iter_names().map(|(name, _)| name).collect(),
            availability: availability.label(),
            reason: availability.reason().map(str::to_owned),
        }
    }
}

fn render_status_text(summary: &StatusSummary) -> String {
    let mut output = String::new();
    let _ = writeln!(&mut output, "Backends:");
    for backend in &summary.backends {
        let marker = if summary.selected == Some(backend.id) { "*" } else { " " };
        let _ = write!(
            &mut output,
            " {marker} {} ({}) priority={} [{}]",
            backend.id,
            backend.name,
            backend.priority,
            backend.availability
        );
        if let Some(reason) = &backend.reason {
            let _ = write!(&mut output, ": {reason}");
        }
        let _ = writeln!(&mut output);
    }
    match (&summary.selected, &summary.selection_error) {
        (Some(id), _) => {
            let _ = writeln!(&mut output, "Selected: {id}");
        }
        (None, Some(err)) => {
            let _ = writeln!(&mut output, "Selected: none ({err})");
        }
        (None, None) => {
            let _ = writeln!(&mut output, "Selected: none");
        }
    }
    let _ = writeln!(&mut output, "Private API allowed: {}", yes_no(summary.allow_private_api));
    output.trim_end().to_owned()
}
