// src/cli/handlers/exec.rs

use crate::{
    cli::args::ExecArgs,
    cli::handlers::commons,
    core::alias_resolver::{self, ResolvedTarget},
    models::{ExecutionOptions, SettingsConfig},
    system::dispatcher,
};
use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use rayon::prelude::*;
use std::time::Duration;

///
/// Main entry point for the `exec` command: runs an argv against the target
/// site(s). A comma-separated target list fans out in parallel, one worker
/// per site. The child's exit code becomes siterun's exit code.
///
pub fn handle(context: Option<String>, args: Vec<String>, settings: &SettingsConfig) -> Result<()> {
    let exec_args = ExecArgs::try_parse_from(&args)?;

    let registry = commons::load_registry(&exec_args.source, settings)?;
    let overrides = commons::overrides_from(&exec_args.source);
    let options = ExecutionOptions {
        simulate: exec_args.simulate,
        verbose: exec_args.verbose,
        timeout: exec_args.timeout.map(Duration::from_secs),
    };
    let fallback_ssh = settings.ssh_options.as_deref();

    let raw_targets: Vec<String> = match &context {
        Some(list) => list.split(',').map(str::to_string).collect(),
        None => vec![String::new()],
    };

    if let [single] = raw_targets.as_slice() {
        let reference = Some(single.as_str()).filter(|s| !s.is_empty());
        let target = commons::resolve_target_or_prompt(reference, &registry, &overrides)?;
        let outcome =
            dispatcher::dispatch(&target.record, &exec_args.command, &options, fallback_ssh)?;
        if outcome.exit_code != 0 {
            std::process::exit(outcome.exit_code);
        }
        return Ok(());
    }

    // Fan-out: resolve every target up front so a bad reference fails the
    // whole batch before anything is spawned.
    let targets: Vec<ResolvedTarget> = raw_targets
        .iter()
        .map(|raw| Ok(alias_resolver::resolve_target(raw, &registry, &overrides)?))
        .collect::<Result<_>>()?;

    println!(
        "{}",
        format!("┌─ Dispatching to {} sites in parallel...", targets.len()).dimmed()
    );

    let results: Vec<_> = targets
        .par_iter()
        .map(|target| {
            let outcome =
                dispatcher::dispatch(&target.record, &exec_args.command, &options, fallback_ssh);
            (target.record.name.clone(), outcome)
        })
        .collect();

    let mut errors = Vec::new();
    let mut first_nonzero = 0;
    for (name, result) in results {
        match result {
            Ok(outcome) if outcome.exit_code == 0 => {
                println!("{} {} {}", "├─".dimmed(), "✔".green(), name.cyan());
            }
            Ok(outcome) => {
                println!(
                    "{} {} {} (exit {})",
                    "├─".dimmed(),
                    "✖".red(),
                    name.cyan(),
                    outcome.exit_code
                );
                if first_nonzero == 0 {
                    first_nonzero = outcome.exit_code;
                }
            }
            Err(e) => {
                println!("{} {} {}", "├─".dimmed(), "✖".red(), name.cyan());
                errors.push(anyhow!("Dispatch to '{}' failed: {}", name, e));
            }
        }
    }
    println!("{}", "└─ End batch.".dimmed());

    if !errors.is_empty() {
        let details = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(anyhow!("{} dispatch(es) failed:\n{}", errors.len(), details));
    }
    if first_nonzero != 0 {
        std::process::exit(first_nonzero);
    }

    Ok(())
}
