fn main() {
    if let Err(error) = axmarker_cli::run() {
        // The subscriber is installed by run() once arguments are parsed.
        tracing::error!(error = format!("{error:#}"), "axmarker failed");
        std::process::exit(1);
    }
}
