// src/cli/handlers/status.rs

use crate::{cli::args::StatusArgs, cli::handlers::commons, models::SettingsConfig};
use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use dialoguer::console::measure_text_width;

/// Main entry point for the `status` command: shows the resolved record for
/// the target site, either as a labelled summary, a single raw field (for
/// scripting), or the full view including the path-alias and per-command
/// option tables.
pub fn handle(context: Option<String>, args: Vec<String>, settings: &SettingsConfig) -> Result<()> {
    let status_args = StatusArgs::try_parse_from(&args)?;

    let registry = commons::load_registry(&status_args.source, settings)?;
    let overrides = commons::overrides_from(&status_args.source);
    let target = commons::resolve_target_or_prompt(context.as_deref(), &registry, &overrides)?;
    let record = &target.record;

    // Single-item mode prints the bare value so it can be captured by scripts.
    if let Some(item) = &status_args.item {
        let value = match item.as_str() {
            "name" => Some(record.name.clone()),
            "root" => record.root.as_ref().map(|p| p.display().to_string()),
            "uri" => record.uri.clone(),
            "remote-host" => record.remote_host.clone(),
            "remote-user" => record.remote_user.clone(),
            "ssh-options" => record.ssh_options.clone(),
            other => {
                return Err(anyhow!(
                    "Unknown status item '{}'. Valid items: name, root, uri, remote-host, remote-user, ssh-options.",
                    other
                ));
            }
        };
        if let Some(value) = value {
            println!("{}", value);
        }
        return Ok(());
    }

    println!("\n{} {}", "Site:".bold(), record.name.cyan());

    let mut rows: Vec<(&str, String)> = Vec::new();
    if let Some(root) = &record.root {
        rows.push(("root", root.display().to_string()));
    }
    if let Some(uri) = &record.uri {
        rows.push(("uri", uri.clone()));
    }
    if !status_args.project {
        if let Some(host) = &record.remote_host {
            rows.push(("remote-host", host.clone()));
        }
        if let Some(user) = &record.remote_user {
            rows.push(("remote-user", user.clone()));
        }
        if let Some(options) = &record.ssh_options {
            rows.push(("ssh-options", options.clone()));
        }
    }

    let max_len = rows
        .iter()
        .map(|(label, _)| measure_text_width(label))
        .max()
        .unwrap_or(0);
    for (label, value) in &rows {
        let padding = " ".repeat(max_len.saturating_sub(measure_text_width(label)));
        println!("  {}:{} {}", label.green(), padding, value);
    }

    if status_args.full {
        print_paths(record);
        print_command_options(record);
    }

    Ok(())
}

fn print_paths(record: &crate::models::AliasRecord) {
    if record.paths.is_empty() {
        return;
    }
    println!("\n{}", "Path aliases:".bold());

    let mut sorted: Vec<_> = record.paths.iter().collect();
    sorted.sort_by_key(|(token, _)| *token);

    let max_len = sorted
        .iter()
        .map(|(token, _)| measure_text_width(&format!("%{}", token)))
        .max()
        .unwrap_or(0);
    for (token, concrete) in sorted {
        let display = format!("%{}", token);
        let padding = " ".repeat(max_len.saturating_sub(measure_text_width(&display)));
        println!("  {}{} -> {}", display.cyan(), padding, concrete);
    }
}

fn print_command_options(record: &crate::models::AliasRecord) {
    if record.command_options.is_empty() {
        return;
    }
    println!("\n{}", "Command options:".bold());

    let mut commands: Vec<_> = record.command_options.iter().collect();
    commands.sort_by_key(|(command, _)| *command);

    for (command, options) in commands {
        let mut pairs: Vec<_> = options.iter().collect();
        pairs.sort_by_key(|(key, _)| *key);
        let rendered = pairs
            .iter()
            .map(|(key, value)| format!("--{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {}: {}", command.cyan(), rendered);
    }
}
