// src/core/alias_loader.rs

//! Loading of alias definition files.
//!
//! Two on-disk formats feed the same normalized shape: modern YAML group
//! files (`<group>.aliases.yml`) and the legacy PHP format inherited from the
//! tool's predecessor (`<group>.aliases.php`, read-only). Each format is a
//! strategy behind the `AliasDefinitionLoader` trait; `AliasRegistry::load`
//! assembles the ordered view the resolver works against.

use crate::{
    constants::{ALIAS_FILE_SUFFIX, GROUP_DEFAULTS_KEY, LEGACY_ALIAS_FILE_SUFFIX},
    models::AliasDefinition,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read alias file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse alias file '{path}': {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Legacy alias file '{path}' (line {line}): {message}")]
    LegacySyntax {
        path: String,
        line: usize,
        message: String,
    },
    #[error("Alias file '{0}' has an unrecognized format.")]
    UnknownFormat(String),
}

/// The parsed content of one alias group file: the reserved `defaults` entry
/// (group-level settings) and the per-site definitions.
#[derive(Debug, Clone, Default)]
pub struct GroupFile {
    pub defaults: Option<AliasDefinition>,
    pub sites: BTreeMap<String, AliasDefinition>,
}

/// A format strategy: recognizes its files and parses them into `GroupFile`.
pub trait AliasDefinitionLoader {
    fn can_load(&self, path: &Path) -> bool;
    fn load(&self, path: &Path) -> Result<GroupFile, LoadError>;
}

// --- YAML Strategy ---

pub struct YamlAliasLoader;

impl AliasDefinitionLoader for YamlAliasLoader {
    fn can_load(&self, path: &Path) -> bool {
        matches_suffix(path, ALIAS_FILE_SUFFIX)
            || path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml")
    }

    fn load(&self, path: &Path) -> Result<GroupFile, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut sites: BTreeMap<String, AliasDefinition> =
            serde_yaml::from_str(&content).map_err(|e| LoadError::Yaml {
                path: path.display().to_string(),
                source: e,
            })?;
        let defaults = sites.remove(GROUP_DEFAULTS_KEY);
        Ok(GroupFile { defaults, sites })
    }
}

// --- Legacy PHP Strategy ---

/// Parses the historical `$aliases['name'] = array(...)` format. Scalar
/// values and one level of nested `array('k' => 'v')` maps are supported,
/// which covers the files this format was ever used for.
pub struct LegacyPhpAliasLoader;

impl AliasDefinitionLoader for LegacyPhpAliasLoader {
    fn can_load(&self, path: &Path) -> bool {
        matches_suffix(path, LEGACY_ALIAS_FILE_SUFFIX)
            || path.extension().is_some_and(|ext| ext == "php")
    }

    fn load(&self, path: &Path) -> Result<GroupFile, LoadError> {
        let content = fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        parse_legacy_aliases(&content, &path.display().to_string())
    }
}

/// One parsed value inside a legacy entry.
enum LegacyValue {
    Scalar(String),
    Map(Vec<(String, LegacyValue)>),
}

fn parse_legacy_aliases(content: &str, path: &str) -> Result<GroupFile, LoadError> {
    // Matches `$aliases['name'] = array(` up to and including the opening paren.
    let entry_re = Regex::new(r#"\$aliases\[\s*['"]([^'"]+)['"]\s*\]\s*=\s*array\s*\("#)
        .expect("static regex");

    let mut group = GroupFile::default();

    for captures in entry_re.captures_iter(content) {
        let whole = captures.get(0).expect("match 0 always present");
        let name = captures
            .get(1)
            .expect("entry name group")
            .as_str()
            .to_string();
        let line = line_of_offset(content, whole.start());

        let body_start = whole.end();
        let body = extract_balanced(content, body_start).ok_or_else(|| {
            LoadError::LegacySyntax {
                path: path.to_string(),
                line,
                message: format!("unterminated array() for alias '{}'", name),
            }
        })?;

        let entries = parse_legacy_entries(body, path, line)?;
        let definition = definition_from_legacy(entries, path, line)?;

        if name == GROUP_DEFAULTS_KEY {
            group.defaults = Some(definition);
        } else {
            group.sites.insert(name, definition);
        }
    }

    Ok(group)
}

/// Returns the text between the opening paren at `start` and its matching
/// close, quote-aware so parens inside string values do not confuse the scan.
fn extract_balanced(content: &str, start: usize) -> Option<&str> {
    let mut depth = 1usize;
    let mut in_quote: Option<char> = None;

    for (idx, ch) in content.get(start..)?.char_indices() {
        match (in_quote, ch) {
            (Some(q), c) if c == q => in_quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => in_quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth -= 1;
                if depth == 0 {
                    return content.get(start..start + idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits an array body into `'key' => value` items at depth zero and parses
/// each value as either a quoted scalar or a nested `array(...)`.
fn parse_legacy_entries(
    body: &str,
    path: &str,
    line: usize,
) -> Result<Vec<(String, LegacyValue)>, LoadError> {
    let mut entries = Vec::new();

    for item in split_top_level(body) {
        let item = item.trim().trim_end_matches(',').trim();
        if item.is_empty() {
            continue;
        }

        let (raw_key, raw_value) =
            item.split_once("=>")
                .ok_or_else(|| LoadError::LegacySyntax {
                    path: path.to_string(),
                    line,
                    message: format!("expected 'key' => value, found '{}'", item),
                })?;

        let key = unquote(raw_key.trim()).ok_or_else(|| LoadError::LegacySyntax {
            path: path.to_string(),
            line,
            message: format!("array key is not a quoted string: '{}'", raw_key.trim()),
        })?;

        let raw_value = raw_value.trim();
        let value = if let Some(rest) = raw_value.strip_prefix("array") {
            let rest = rest.trim_start();
            let inner = rest
                .strip_prefix('(')
                .and_then(|_| extract_balanced(rest, 1))
                .ok_or_else(|| LoadError::LegacySyntax {
                    path: path.to_string(),
                    line,
                    message: format!("malformed nested array for key '{}'", key),
                })?;
            LegacyValue::Map(parse_legacy_entries(inner, path, line)?)
        } else {
            LegacyValue::Scalar(unquote(raw_value).ok_or_else(|| LoadError::LegacySyntax {
                path: path.to_string(),
                line,
                message: format!("value for key '{}' is not a quoted string", key),
            })?)
        };

        entries.push((key, value));
    }

    Ok(entries)
}

/// Splits on commas that sit outside quotes and outside nested parens.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quote: Option<char> = None;
    let mut item_start = 0usize;

    for (idx, ch) in body.char_indices() {
        match (in_quote, ch) {
            (Some(q), c) if c == q => in_quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => in_quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(body.get(item_start..idx).unwrap_or(""));
                item_start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(body.get(item_start..).unwrap_or(""));
    parts
}

fn unquote(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let mut chars = raw.chars();
    let first = chars.next()?;
    if (first == '\'' || first == '"') && raw.len() >= 2 && raw.ends_with(first) {
        raw.get(1..raw.len() - 1).map(str::to_string)
    } else {
        None
    }
}

fn definition_from_legacy(
    entries: Vec<(String, LegacyValue)>,
    path: &str,
    line: usize,
) -> Result<AliasDefinition, LoadError> {
    let mut definition = AliasDefinition::default();

    for (key, value) in entries {
        match (key.as_str(), value) {
            ("root", LegacyValue::Scalar(v)) => definition.root = Some(v),
            ("uri", LegacyValue::Scalar(v)) => definition.uri = Some(v),
            ("remote-host", LegacyValue::Scalar(v)) => definition.remote_host = Some(v),
            ("remote-user", LegacyValue::Scalar(v)) => definition.remote_user = Some(v),
            ("ssh-options", LegacyValue::Scalar(v)) => definition.ssh_options = Some(v),
            ("path-aliases", LegacyValue::Map(map)) => {
                for (token, entry) in map {
                    let LegacyValue::Scalar(concrete) = entry else {
                        return Err(LoadError::LegacySyntax {
                            path: path.to_string(),
                            line,
                            message: format!("path alias '{}' must be a string", token),
                        });
                    };
                    // Historical files carried the '%' on the key itself.
                    let token = token.trim_start_matches('%').to_string();
                    definition.path_aliases.insert(token, concrete);
                }
            }
            // 'command-specific' is the historical spelling of the same key.
            ("command-options" | "command-specific", LegacyValue::Map(map)) => {
                for (command, entry) in map {
                    let LegacyValue::Map(options) = entry else {
                        return Err(LoadError::LegacySyntax {
                            path: path.to_string(),
                            line,
                            message: format!("options for command '{}' must be an array", command),
                        });
                    };
                    let target = definition.command_options.entry(command).or_default();
                    for (opt, opt_value) in options {
                        let LegacyValue::Scalar(v) = opt_value else {
                            return Err(LoadError::LegacySyntax {
                                path: path.to_string(),
                                line,
                                message: format!("option '{}' must be a string", opt),
                            });
                        };
                        target.insert(opt, v);
                    }
                }
            }
            (other, _) => {
                log::warn!("Ignoring unknown key '{}' in legacy alias file.", other);
            }
        }
    }

    Ok(definition)
}

fn line_of_offset(content: &str, offset: usize) -> usize {
    content
        .get(..offset)
        .map(|prefix| prefix.bytes().filter(|b| *b == b'\n').count() + 1)
        .unwrap_or(1)
}

// --- Registry Assembly ---

/// One loaded alias file, tagged with the group name derived from its file name.
#[derive(Debug, Clone)]
pub struct AliasSource {
    pub group: String,
    pub origin: PathBuf,
    pub defaults: Option<AliasDefinition>,
    pub sites: BTreeMap<String, AliasDefinition>,
}

/// The ordered, read-only view of every loaded alias source.
/// Earlier sources win name collisions; the registry is never mutated after
/// construction, so it is safe to share across resolution threads.
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    sources: Vec<AliasSource>,
}

impl AliasRegistry {
    /// Loads the registry in precedence order: the explicit file (if any)
    /// first, then YAML files from every alias directory, then legacy files
    /// from the same directories. Files within a directory are visited in
    /// name order so the precedence is stable across platforms.
    pub fn load(explicit_file: Option<&Path>, alias_dirs: &[PathBuf]) -> Result<Self, LoadError> {
        let yaml = YamlAliasLoader;
        let legacy = LegacyPhpAliasLoader;
        let mut sources = Vec::new();

        if let Some(path) = explicit_file {
            sources.push(load_source(path, &yaml, &legacy)?);
        }

        let mut yaml_files = Vec::new();
        let mut legacy_files = Vec::new();
        for dir in alias_dirs {
            for file in sorted_files(dir) {
                if matches_suffix(&file, ALIAS_FILE_SUFFIX) {
                    yaml_files.push(file);
                } else if matches_suffix(&file, LEGACY_ALIAS_FILE_SUFFIX) {
                    legacy_files.push(file);
                }
            }
        }

        for file in yaml_files.iter().chain(legacy_files.iter()) {
            sources.push(load_source(file, &yaml, &legacy)?);
        }

        log::debug!("Alias registry loaded from {} source file(s).", sources.len());
        Ok(Self { sources })
    }

    pub fn sources(&self) -> &[AliasSource] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.iter().all(|s| s.sites.is_empty())
    }

    /// Finds a definition by reference. A plain `name` matches the first
    /// source (in precedence order) defining a site of that name; a
    /// `group.name` reference restricts the search to that group.
    pub fn find(&self, reference: &str) -> Option<(&AliasSource, &str, &AliasDefinition)> {
        let (group, site) = match reference.split_once('.') {
            Some((group, site)) => (Some(group), site),
            None => (None, reference),
        };

        self.sources
            .iter()
            .filter(|source| group.is_none_or(|g| source.group == g))
            .find_map(|source| {
                source
                    .sites
                    .get_key_value(site)
                    .map(|(name, def)| (source, name.as_str(), def))
            })
    }

    /// Every visible alias as `(qualified_name, source, definition)`, in
    /// precedence order, with shadowed qualified names filtered out.
    pub fn iter_qualified(&self) -> Vec<(String, &AliasSource, &AliasDefinition)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for source in &self.sources {
            for (site, definition) in &source.sites {
                let qualified = format!("{}.{}", source.group, site);
                if seen.insert(qualified.clone()) {
                    out.push((qualified, source, definition));
                }
            }
        }
        out
    }
}

fn load_source(
    path: &Path,
    yaml: &YamlAliasLoader,
    legacy: &LegacyPhpAliasLoader,
) -> Result<AliasSource, LoadError> {
    let group = group_name_of(path);
    let file = if matches_suffix(path, LEGACY_ALIAS_FILE_SUFFIX) {
        legacy.load(path)?
    } else if yaml.can_load(path) {
        yaml.load(path)?
    } else if legacy.can_load(path) {
        legacy.load(path)?
    } else {
        return Err(LoadError::UnknownFormat(path.display().to_string()));
    };

    Ok(AliasSource {
        group,
        origin: path.to_path_buf(),
        defaults: file.defaults,
        sites: file.sites,
    })
}

/// The group a file defines: its file name with the alias suffix (or plain
/// extension) stripped. `staging.aliases.yml` -> `staging`.
fn group_name_of(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    for suffix in [ALIAS_FILE_SUFFIX, LEGACY_ALIAS_FILE_SUFFIX] {
        if let Some(stripped) = name.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(name)
}

fn matches_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().ends_with(suffix))
}

fn sorted_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const YAML_GROUP: &str = r#"
defaults:
  ssh-options: "-o PasswordAuthentication=no"
live:
  root: /srv/www/live
  uri: https://example.com
  remote-host: example.com
  remote-user: alice
  path-aliases:
    files: sites/default/files
stage:
  root: /srv/www/stage
"#;

    const LEGACY_GROUP: &str = r#"<?php
// Legacy alias file carried over unchanged.
$aliases['old'] = array(
  'root' => '/var/www/old',
  'uri' => 'https://old.example.com',
  'path-aliases' => array(
    '%files' => 'sites/old/files',
    '%dump-dir' => '/tmp/dumps',
  ),
  'command-specific' => array(
    'db-sync' => array(
      'sanitize' => 'yes',
    ),
  ),
);
"#;

    #[test]
    fn test_yaml_loader_extracts_defaults_and_sites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prod.aliases.yml");
        fs::write(&path, YAML_GROUP).expect("write alias file");

        let file = YamlAliasLoader.load(&path).expect("parse");
        assert!(file.defaults.is_some());
        assert_eq!(file.sites.len(), 2);
        let live = file.sites.get("live").expect("live entry");
        assert_eq!(live.remote_user.as_deref(), Some("alice"));
        assert_eq!(
            live.path_aliases.get("files").map(String::as_str),
            Some("sites/default/files")
        );
    }

    #[test]
    fn test_legacy_loader_parses_nested_arrays() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("old.aliases.php");
        fs::write(&path, LEGACY_GROUP).expect("write alias file");

        let file = LegacyPhpAliasLoader.load(&path).expect("parse");
        let old = file.sites.get("old").expect("old entry");
        assert_eq!(old.root.as_deref(), Some("/var/www/old"));
        // The '%' on legacy keys is stripped during normalization.
        assert_eq!(
            old.path_aliases.get("files").map(String::as_str),
            Some("sites/old/files")
        );
        assert_eq!(
            old.path_aliases.get("dump-dir").map(String::as_str),
            Some("/tmp/dumps")
        );
        let db_sync = old.command_options.get("db-sync").expect("command entry");
        assert_eq!(db_sync.get("sanitize").map(String::as_str), Some("yes"));
    }

    #[test]
    fn test_legacy_loader_rejects_unterminated_array() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.aliases.php");
        fs::write(&path, "<?php\n$aliases['x'] = array('root' => '/srv'").expect("write");

        let err = LegacyPhpAliasLoader.load(&path).expect_err("must fail");
        assert!(matches!(err, LoadError::LegacySyntax { .. }));
    }

    #[test]
    fn test_registry_precedence_explicit_file_wins() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dir_file = dir.path().join("prod.aliases.yml");
        fs::write(&dir_file, "live:\n  root: /from/dir\n").expect("write");

        let explicit_dir = tempfile::tempdir().expect("tempdir");
        let explicit = explicit_dir.path().join("override.aliases.yml");
        fs::write(&explicit, "live:\n  root: /from/explicit\n").expect("write");

        let registry =
            AliasRegistry::load(Some(&explicit), &[dir.path().to_path_buf()]).expect("load");

        let (_, _, def) = registry.find("live").expect("found");
        assert_eq!(def.root.as_deref(), Some("/from/explicit"));
        // The shadowed definition is still reachable by qualified name.
        let (_, _, def) = registry.find("prod.live").expect("found qualified");
        assert_eq!(def.root.as_deref(), Some("/from/dir"));
    }

    #[test]
    fn test_registry_yaml_ranks_above_legacy() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.aliases.php"), "<?php\n$aliases['live'] = array('root' => '/legacy');\n")
            .expect("write");
        fs::write(dir.path().join("z.aliases.yml"), "live:\n  root: /modern\n").expect("write");

        let registry = AliasRegistry::load(None, &[dir.path().to_path_buf()]).expect("load");
        let (_, _, def) = registry.find("live").expect("found");
        // 'z' sorts after 'a', yet the YAML source still wins.
        assert_eq!(def.root.as_deref(), Some("/modern"));
    }

    #[test]
    fn test_registry_unknown_name_is_absent() {
        let registry = AliasRegistry::default();
        assert!(registry.find("ghost").is_none());
    }

    #[test]
    fn test_group_name_derivation() {
        assert_eq!(group_name_of(Path::new("/x/staging.aliases.yml")), "staging");
        assert_eq!(group_name_of(Path::new("/x/old.aliases.php")), "old");
        assert_eq!(group_name_of(Path::new("/x/adhoc.yml")), "adhoc");
    }
}
