// src/core/alias_resolver.rs

//! Turns a raw target reference (`@live`, `@staging.live:%files`, a bare
//! filesystem path) into a fully bound `AliasRecord` plus the leftover
//! `HostPath` tail. Resolution is side-effect free and idempotent: the
//! registry is never mutated, so concurrent resolutions are safe.

use crate::{
    constants::{ROOT_MARKER_DIR, ROOT_MARKER_FILE, SELF_ALIAS_NAME},
    core::{alias_loader::AliasRegistry, host_path::HostPath},
    models::{AliasDefinition, AliasRecord},
};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Alias '@{name}' was not found in any alias source.")]
    AliasNotFound { name: String },
    #[error("Alias '@{name}' is malformed: {reason}")]
    MalformedAlias { name: String, reason: String },
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
}

/// The result of binding a target reference: the merged record and the
/// still-unevaluated host path carrying any `%token` or literal tail.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub record: AliasRecord,
    pub host_path: HostPath,
}

/// Resolves a raw reference against the loaded registry.
///
/// Merge order for alias references: empty defaults < the group's `defaults`
/// entry < the site definition < `overrides` from the caller. Later layers
/// win on scalar keys; the two map keys merge leaf-wise. The record is
/// validated before it is returned, so a failed resolution never hands back
/// a partially constructed record.
pub fn resolve_target(
    raw: &str,
    registry: &AliasRegistry,
    overrides: &AliasDefinition,
) -> Result<ResolvedTarget, ResolveError> {
    let host_path = HostPath::parse(raw);

    let Some(reference) = host_path.alias_name() else {
        return Ok(ResolvedTarget {
            record: self_record(overrides)?,
            host_path,
        });
    };

    let (source, site, definition) =
        registry
            .find(reference)
            .ok_or_else(|| ResolveError::AliasNotFound {
                name: reference.to_string(),
            })?;

    let mut merged = AliasDefinition::default();
    if let Some(defaults) = &source.defaults {
        merged.merge_from(defaults);
    }
    merged.merge_from(definition);
    merged.merge_from(overrides);

    let qualified = format!("{}.{}", source.group, site);
    let record = AliasRecord::from_definition(qualified, merged);
    validate(&record)?;

    log::debug!("Resolved '@{}' to '{}'.", reference, record.name);
    Ok(ResolvedTarget { record, host_path })
}

/// Builds the synthetic record for the local installation: root discovered by
/// walking up from the current directory, caller overrides applied on top.
fn self_record(overrides: &AliasDefinition) -> Result<AliasRecord, ResolveError> {
    let cwd = env::current_dir()?;
    let root = detect_installation_root(&cwd).unwrap_or(cwd);

    let mut merged = AliasDefinition {
        root: Some(root.display().to_string()),
        ..Default::default()
    };
    merged.merge_from(overrides);

    let record = AliasRecord::from_definition(SELF_ALIAS_NAME.to_string(), merged);
    validate(&record)?;
    Ok(record)
}

/// Walks ancestor directories looking for an installation marker: a `sites`
/// directory (multisite layout) or a `siterun.yml` file.
pub fn detect_installation_root(start: &Path) -> Option<PathBuf> {
    let start = dunce::canonicalize(start).ok()?;
    start
        .ancestors()
        .find(|dir| dir.join(ROOT_MARKER_FILE).is_file() || dir.join(ROOT_MARKER_DIR).is_dir())
        .map(Path::to_path_buf)
}

fn validate(record: &AliasRecord) -> Result<(), ResolveError> {
    if !record.is_runnable() {
        return Err(ResolveError::MalformedAlias {
            name: record.name.clone(),
            reason: "it defines neither 'root' nor 'remote-host', so there is nothing to target"
                .to_string(),
        });
    }
    Ok(())
}

// MARK: --- UNIT TESTS ---
