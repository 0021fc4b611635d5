// src/cli/handlers/commons.rs

// This module contains shared functions used by multiple handlers.

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Select, theme::ColorfulTheme};

use crate::{
    cli::args::SourceArgs,
    core::{
        alias_loader::AliasRegistry,
        alias_resolver::{self, ResolveError, ResolvedTarget},
        paths,
    },
    models::{AliasDefinition, SettingsConfig},
};

/// Builds the alias registry for one invocation: the `--alias-file` argument
/// (if any) ranks ahead of every configured directory.
pub fn load_registry(source: &SourceArgs, settings: &SettingsConfig) -> Result<AliasRegistry> {
    let alias_dirs = paths::alias_directories(settings)?;
    Ok(AliasRegistry::load(
        source.alias_file.as_deref(),
        &alias_dirs,
    )?)
}

/// Converts the per-invocation override flags into a definition layer that
/// the resolver merges on top of everything else.
pub fn overrides_from(source: &SourceArgs) -> AliasDefinition {
    AliasDefinition {
        root: source.root.clone(),
        uri: source.uri.clone(),
        ..Default::default()
    }
}

/// Resolves a target reference, falling back to an interactive picker when
/// the alias name is unknown but other aliases exist. Declining the picker
/// (or running without a terminal) reproduces the original lookup error.
pub fn resolve_target_or_prompt(
    raw: Option<&str>,
    registry: &AliasRegistry,
    overrides: &AliasDefinition,
) -> Result<ResolvedTarget> {
    let raw = raw.unwrap_or("");

    match alias_resolver::resolve_target(raw, registry, overrides) {
        Ok(target) => Ok(target),
        Err(ResolveError::AliasNotFound { name }) => {
            let candidates: Vec<String> = registry
                .iter_qualified()
                .into_iter()
                .map(|(qualified, _, _)| qualified)
                .collect();

            let not_found = || ResolveError::AliasNotFound { name: name.clone() };

            if candidates.is_empty() {
                return Err(not_found().into());
            }

            println!(
                "{}",
                format!("Alias '@{}' was not found.", name).yellow()
            );

            let selection = Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Pick a known site to continue with:")
                .items(&candidates)
                .default(0)
                .interact_opt();

            match selection {
                Ok(Some(index)) => {
                    let chosen = candidates.get(index).ok_or_else(not_found)?;
                    Ok(alias_resolver::resolve_target(
                        &format!("@{}", chosen),
                        registry,
                        overrides,
                    )?)
                }
                // Cancelled, or no terminal to ask on: surface the real error.
                Ok(None) | Err(_) => Err(not_found().into()),
            }
        }
        Err(e) => Err(e.into()),
    }
}
