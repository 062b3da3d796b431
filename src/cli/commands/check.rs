//! Check command.

use console::style;

use crate::config::Settings;
use crate::llm::LlmClient;
use crate::pdf::{self, PdfBackendType};

/// Report PDF backend and LLM availability.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("PDF Backends").bold());
    println!("{}", "-".repeat(50));

    for backend_type in [PdfBackendType::Poppler, PdfBackendType::Mupdf] {
        let marker = if backend_type == settings.pdf_backend {
            " (configured)"
        } else {
            ""
        };
        match pdf::create_backend(backend_type) {
            Ok(backend) if backend.is_available() => {
                println!(
                    "  {:<15} {}{}",
                    backend_type.as_str(),
                    style("✓ available").green(),
                    marker
                );
            }
            Ok(backend) => {
                println!(
                    "  {:<15} {}{}",
                    backend_type.as_str(),
                    style("✗ not available").red(),
                    marker
                );
                println!("                  {}", style(backend.availability_hint()).dim());
            }
            Err(e) => {
                println!(
                    "  {:<15} {}{}",
                    backend_type.as_str(),
                    style("✗ not compiled in").red(),
                    marker
                );
                println!("                  {}", style(e).dim());
            }
        }
    }

    println!("\n{}", style("LLM").bold());
    println!("{}", "-".repeat(50));

    let client = LlmClient::new(settings.llm.clone());
    let config = client.config();
    println!("  {:<15} {}", "Provider", config.provider.as_str());
    println!("  {:<15} {}", "Endpoint", config.endpoint);
    println!("  {:<15} {}", "Model", config.model);

    if !config.enabled {
        println!("  {:<15} {}", "Status", style("○ disabled").yellow());
        return Ok(());
    }

    if !client.is_available().await {
        println!("  {:<15} {}", "Status", style("✗ unreachable").red());
        return Ok(());
    }
    println!("  {:<15} {}", "Status", style("✓ available").green());

    match client.list_models().await {
        Ok(models) => {
            let found = models.iter().any(|m| m == &config.model);
            if !found {
                println!(
                    "  {} Model {} not found on the server",
                    style("!").yellow(),
                    config.model
                );
            }
            for model in models {
                println!("    {}", model);
            }
        }
        Err(e) => println!("  {} Failed to list models: {}", style("✗").red(), e),
    }

    Ok(())
}
