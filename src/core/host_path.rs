// src/core/host_path.rs

use crate::models::AliasRecord;
use std::fmt;
use std::path::{Path, PathBuf};

/// The part of a host path that follows the alias reference.
///
/// After parsing, the tail is exactly one of: nothing (bare alias reference),
/// a symbolic `%token` with an optional trailing suffix, or a literal path.
/// Evaluation rewrites a `PathAlias` tail into a `Literal` one in place, after
/// which the value is treated as resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPathTail {
    None,
    PathAlias { name: String, suffix: Option<String> },
    Literal(String),
}

/// A raw user-supplied target reference of the form `[@[group.]name][:path]`,
/// where `path` may start with a `%`-prefixed symbolic path-alias token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPath {
    alias: Option<String>,
    tail: HostPathTail,
}

impl HostPath {
    /// Parses a target reference. This never fails: a string without a leading
    /// `@` is a literal path targeting the local installation, and an unknown
    /// alias name is only detected later, at resolution time.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        let Some(reference) = raw.strip_prefix('@') else {
            return Self {
                alias: None,
                tail: if raw.is_empty() {
                    HostPathTail::None
                } else {
                    HostPathTail::Literal(raw.to_string())
                },
            };
        };

        let (name, tail_str) = match reference.split_once(':') {
            Some((name, tail)) => (name, Some(tail)),
            None => (reference, None),
        };

        Self {
            alias: Some(name.to_string()),
            tail: match tail_str {
                None | Some("") => HostPathTail::None,
                Some(tail) => match tail.strip_prefix('%') {
                    Some(token) => {
                        // `%files/sub/dir` keeps the trailing literal segments
                        // so they survive substitution.
                        let (name, suffix) = match token.split_once('/') {
                            Some((name, suffix)) => (name, Some(suffix.to_string())),
                            None => (token, None),
                        };
                        HostPathTail::PathAlias {
                            name: name.to_string(),
                            suffix,
                        }
                    }
                    None => HostPathTail::Literal(tail.to_string()),
                },
            },
        }
    }

    /// The alias reference (`live` or `staging.live`), without the `@`.
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The unresolved symbolic token, if the tail still carries one.
    pub fn path_alias(&self) -> Option<&str> {
        match &self.tail {
            HostPathTail::PathAlias { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The literal path tail, once resolved (or when parsed as literal).
    pub fn literal_path(&self) -> Option<&str> {
        match &self.tail {
            HostPathTail::Literal(path) => Some(path),
            _ => None,
        }
    }

    pub fn tail(&self) -> &HostPathTail {
        &self.tail
    }

    /// Substitutes the symbolic tail with a concrete path, re-attaching any
    /// trailing suffix. No-op when the tail is not symbolic.
    pub(crate) fn substitute_path_alias(&mut self, concrete: &str) {
        if let HostPathTail::PathAlias { suffix, .. } = &self.tail {
            let resolved = match suffix {
                Some(suffix) => format!("{}/{}", concrete.trim_end_matches('/'), suffix),
                None => concrete.to_string(),
            };
            self.tail = HostPathTail::Literal(resolved);
        }
    }

    /// Composes the concrete path for this host path against a bound record.
    ///
    /// Policy: a relative tail is joined under the record's `root`; an
    /// absolute tail stands alone. A bare alias reference yields the root
    /// itself. `None` when the tail still carries an unresolved token, or
    /// when there is neither a tail nor a root to point at.
    pub fn full_path(&self, record: &AliasRecord) -> Option<PathBuf> {
        match &self.tail {
            HostPathTail::PathAlias { .. } => None,
            HostPathTail::None => record.root.clone(),
            HostPathTail::Literal(path) => {
                if Path::new(path).is_absolute() {
                    Some(PathBuf::from(path))
                } else {
                    match &record.root {
                        Some(root) => Some(root.join(path)),
                        None => Some(PathBuf::from(path)),
                    }
                }
            }
        }
    }
}

impl fmt::Display for HostPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alias) = &self.alias {
            write!(f, "@{}", alias)?;
            match &self.tail {
                HostPathTail::None => Ok(()),
                HostPathTail::PathAlias { name, suffix } => {
                    write!(f, ":%{}", name)?;
                    if let Some(suffix) = suffix {
                        write!(f, "/{}", suffix)?;
                    }
                    Ok(())
                }
                HostPathTail::Literal(path) => write!(f, ":{}", path),
            }
        } else {
            match &self.tail {
                HostPathTail::Literal(path) => write!(f, "{}", path),
                _ => Ok(()),
            }
        }
    }
}

// MARK: --- UNIT TESTS ---
