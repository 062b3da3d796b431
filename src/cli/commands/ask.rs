//! Ask command.

use std::path::Path;

use console::style;

use super::helpers::{highlight_service, read_pdf};
use crate::config::Settings;
use crate::llm::LlmClient;
use crate::services::cited_pages;

/// Ask a question about a local PDF and print the cited answer.
pub async fn cmd_ask(
    settings: &Settings,
    file: &Path,
    question: &str,
    json: bool,
) -> anyhow::Result<()> {
    let pdf = read_pdf(file).await?;
    let service = highlight_service(settings)?;
    let client = LlmClient::new(settings.llm.clone());

    if !json {
        println!(
            "{} Asking {} about {}",
            style("→").cyan(),
            settings.llm.model,
            file.display()
        );
    }

    let answer = service
        .ask(pdf.bytes, &pdf.document_id, question, &client)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("\n{}", answer.answer);

    let cited = cited_pages(&answer.answer);
    if !cited.is_empty() {
        let pages: Vec<String> = cited.iter().map(|p| p.to_string()).collect();
        println!("\n{} Cited pages: {}", style("✓").green(), pages.join(", "));
    }
    if !answer.highlighted_pages.is_empty() {
        let pages: Vec<String> = answer
            .highlighted_pages
            .iter()
            .map(|p| p.to_string())
            .collect();
        let label = if answer.fallback {
            "Source pages (approximate)"
        } else {
            "Highlighted pages"
        };
        println!("  {}: {}", label, pages.join(", "));
    }
    if answer.timed_out {
        println!("  {} Excerpt search timed out", style("!").yellow());
    }

    for (i, source) in answer.sources.iter().enumerate() {
        println!("  {} {}", style(format!("[{}]", i + 1)).dim(), source);
    }

    Ok(())
}
