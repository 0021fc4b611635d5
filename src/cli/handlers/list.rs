// src/cli/handlers/list.rs

use crate::{cli::args::ListArgs, cli::handlers::commons, models::SettingsConfig};
use anyhow::Result;
use clap::Parser;
use colored::*;
use dialoguer::console::measure_text_width;

/// Main entry point for the `list` command: prints every alias visible
/// across the configured sources as a sorted, aligned table.
pub fn handle(_context: Option<String>, args: Vec<String>, settings: &SettingsConfig) -> Result<()> {
    let list_args = ListArgs::try_parse_from(&args)?;

    let registry = commons::load_registry(&list_args.source, settings)?;
    if registry.is_empty() {
        println!("\nNo aliases are defined. Add a '<group>.aliases.yml' file to get started.");
        return Ok(());
    }

    let mut entries = registry.iter_qualified();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let max_len = entries
        .iter()
        .map(|(qualified, _, _)| measure_text_width(&format!("@{}", qualified)))
        .max()
        .unwrap_or(0);

    println!("\nKnown site aliases:");
    for (qualified, source, definition) in entries {
        let display_raw = format!("@{}", qualified);
        let padding = " ".repeat(max_len.saturating_sub(measure_text_width(&display_raw)));

        let summary = match (&definition.remote_host, &definition.root) {
            (Some(host), _) => match &definition.remote_user {
                Some(user) => format!("{}@{}", user, host),
                None => host.clone(),
            },
            (None, Some(root)) => root.clone(),
            (None, None) => "(incomplete)".red().to_string(),
        };

        println!(
            "  {}{}  {}  {}",
            format!("@{}", qualified).cyan(),
            padding,
            summary,
            format!("[{}]", source.origin.display()).dimmed()
        );
    }

    Ok(())
}
