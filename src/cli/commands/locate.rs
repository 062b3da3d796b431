//! Locate command.

use std::path::Path;

use console::style;

use super::helpers::{highlight_service, read_pdf};
use crate::config::Settings;

/// Locate excerpts in a local PDF and print the result as JSON.
pub async fn cmd_locate(
    settings: &Settings,
    file: &Path,
    excerpts: Vec<String>,
    pretty: bool,
) -> anyhow::Result<()> {
    let pdf = read_pdf(file).await?;
    let service = highlight_service(settings)?;

    let result = service
        .locate_excerpts(pdf.bytes, &pdf.document_id, excerpts)
        .await?;

    if result.timed_out {
        eprintln!(
            "{} Search timed out after {}s; no regions reported",
            style("!").yellow(),
            settings.highlight.locate_timeout_secs
        );
    }

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", json);

    Ok(())
}
