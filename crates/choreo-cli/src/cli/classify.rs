//! `choreo classify`: ask the decision service for a severity and category.

use anyhow::{Context, Result};
use console::style;

use crate::state::AppState;

pub async fn classify(state: &AppState, title: &str, description: &str, json: bool) -> Result<()> {
    let collaborators = state.collaborators();
    let classification = collaborators
        .decision
        .classify(title, description, None)
        .await
        .context("Classification failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
        return Ok(());
    }

    println!();
    println!("  {} {}", style("Classified").bold(), style(title).cyan());
    println!(
        "  Severity:   {} ({})",
        style(classification.severity.as_str()).bold(),
        classification.severity.priority()
    );
    println!("  Category:   {}", classification.category);
    println!("  Confidence: {:.0}%", classification.confidence * 100.0);
    println!("  {}", style(&classification.reasoning).dim());
    println!();
    Ok(())
}
