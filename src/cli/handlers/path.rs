// src/cli/handlers/path.rs

use crate::{
    cli::args::PathArgs,
    cli::handlers::commons,
    core::path_evaluator,
    models::SettingsConfig,
};
use anyhow::{Result, anyhow};
use clap::Parser;

/// Main entry point for the `path` command: resolves a host path all the way
/// to a concrete filesystem path and prints it. Accepts either a combined
/// reference (`siterun path @live:%files/foo`) or a target plus path part
/// (`siterun @live path %files/foo`).
pub fn handle(context: Option<String>, args: Vec<String>, settings: &SettingsConfig) -> Result<()> {
    let path_args = PathArgs::try_parse_from(&args)?;

    let raw = match (context, path_args.path.clone()) {
        (Some(target), Some(tail)) => format!("{}:{}", target, tail),
        (Some(target), None) => target,
        (None, Some(reference)) => reference,
        (None, None) => {
            return Err(anyhow!(
                "Nothing to resolve. Provide a host path like '@live:%files/foo.txt'."
            ));
        }
    };

    let registry = commons::load_registry(&path_args.source, settings)?;
    let overrides = commons::overrides_from(&path_args.source);
    let mut target = commons::resolve_target_or_prompt(Some(&raw), &registry, &overrides)?;

    path_evaluator::evaluate(&mut target.host_path, &target.record);

    // The evaluator leaves unknown tokens in place; requiring the concrete
    // path is this command's job, so an unresolved token is fatal here.
    if let Some(token) = target.host_path.path_alias() {
        return Err(anyhow!(
            "Path alias '%{}' is not defined for '{}'.",
            token,
            target.record.name
        ));
    }

    match target.host_path.full_path(&target.record) {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => Err(anyhow!(
            "'{}' has no root to resolve a path against.",
            target.record.name
        )),
    }
}
