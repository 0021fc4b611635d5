// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

// --- ALIAS FILE MODELS (What is read from definition files) ---

/// One alias entry as it appears in a definition file (YAML or legacy).
/// Every key is optional; layering decides what the final record looks like.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AliasDefinition {
    pub root: Option<String>,
    pub uri: Option<String>,
    #[serde(rename = "remote-host")]
    pub remote_host: Option<String>,
    #[serde(rename = "remote-user")]
    pub remote_user: Option<String>,
    #[serde(rename = "ssh-options")]
    pub ssh_options: Option<String>,
    #[serde(default, rename = "path-aliases")]
    pub path_aliases: HashMap<String, String>,
    #[serde(default, rename = "command-options")]
    pub command_options: HashMap<String, HashMap<String, String>>,
}

impl AliasDefinition {
    /// Applies `layer` on top of `self`. Scalar keys are overridden wholesale;
    /// the two map keys are merged leaf-wise, so a layer can override a single
    /// path alias without clobbering its siblings.
    pub fn merge_from(&mut self, layer: &Self) {
        if layer.root.is_some() {
            self.root = layer.root.clone();
        }
        if layer.uri.is_some() {
            self.uri = layer.uri.clone();
        }
        if layer.remote_host.is_some() {
            self.remote_host = layer.remote_host.clone();
        }
        if layer.remote_user.is_some() {
            self.remote_user = layer.remote_user.clone();
        }
        if layer.ssh_options.is_some() {
            self.ssh_options = layer.ssh_options.clone();
        }
        for (key, value) in &layer.path_aliases {
            self.path_aliases.insert(key.clone(), value.clone());
        }
        for (command, options) in &layer.command_options {
            let target = self.command_options.entry(command.clone()).or_default();
            for (key, value) in options {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

// --- IN-MEMORY MODELS (Our internal working representation) ---

/// The final, merged view of one target environment.
/// Constructed once per resolution and treated as read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRecord {
    /// Qualified name: `group.name`, or `self` for the synthetic local record.
    pub name: String,
    pub root: Option<PathBuf>,
    pub uri: Option<String>,
    pub remote_host: Option<String>,
    pub remote_user: Option<String>,
    pub ssh_options: Option<String>,
    /// Symbolic path-alias name -> concrete path (absolute, or relative to `root`).
    pub paths: HashMap<String, String>,
    /// Command name -> extra options injected when dispatching that command.
    pub command_options: HashMap<String, HashMap<String, String>>,
}

impl AliasRecord {
    pub fn from_definition(name: String, definition: AliasDefinition) -> Self {
        Self {
            name,
            root: definition.root.map(PathBuf::from),
            uri: definition.uri,
            remote_host: definition.remote_host,
            remote_user: definition.remote_user,
            ssh_options: definition.ssh_options,
            paths: definition.path_aliases,
            command_options: definition.command_options,
        }
    }

    /// A record with neither a root nor a remote host targets nothing.
    pub fn is_runnable(&self) -> bool {
        self.root.is_some() || self.remote_host.is_some()
    }

    /// `user@host` when a remote user is set, bare `host` otherwise.
    /// `None` for local records.
    pub fn remote_target(&self) -> Option<String> {
        let host = self.remote_host.as_deref()?;
        Some(match self.remote_user.as_deref() {
            Some(user) => format!("{}@{}", user, host),
            None => host.to_string(),
        })
    }
}

// --- SETTINGS MODELS (`settings.toml`) ---

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SettingsConfig {
    /// Extra directories scanned for alias files. `~` and env vars are expanded.
    #[serde(default)]
    pub alias_dirs: Vec<String>,
    /// Fallback SSH options used when a record carries none.
    pub ssh_options: Option<String>,
}

// --- DISPATCH MODELS ---

/// Caller-facing knobs for a single dispatch.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Print the composed command line and run nothing.
    pub simulate: bool,
    /// Log the command line before executing it.
    pub verbose: bool,
    /// Kill the child and fail when it runs longer than this.
    pub timeout: Option<Duration>,
}

/// What a finished (or simulated) dispatch hands back to the caller.
/// A non-zero `exit_code` is a result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub exit_code: i32,
    /// The fully composed command line, as it was (or would have been) run.
    pub command_line: String,
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn def(root: Option<&str>, host: Option<&str>) -> AliasDefinition {
        AliasDefinition {
            root: root.map(String::from),
            remote_host: host.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_scalar_keys_are_right_biased() {
        let mut base = def(Some("/srv/base"), Some("base.example.com"));
        let layer = def(Some("/srv/layer"), None);

        base.merge_from(&layer);

        // Present keys in the layer win; absent keys leave the base untouched.
        assert_eq!(base.root.as_deref(), Some("/srv/layer"));
        assert_eq!(base.remote_host.as_deref(), Some("base.example.com"));
    }

    #[test]
    fn test_merge_maps_are_leaf_wise() {
        let mut base = AliasDefinition::default();
        base.path_aliases
            .insert("files".to_string(), "sites/default/files".to_string());
        base.path_aliases
            .insert("dump-dir".to_string(), "/tmp/dumps".to_string());

        let mut layer = AliasDefinition::default();
        layer
            .path_aliases
            .insert("files".to_string(), "web/files".to_string());

        base.merge_from(&layer);

        // The overlapping leaf is overridden, the sibling survives.
        assert_eq!(base.path_aliases.get("files").map(String::as_str), Some("web/files"));
        assert_eq!(
            base.path_aliases.get("dump-dir").map(String::as_str),
            Some("/tmp/dumps")
        );
    }

    #[test]
    fn test_merge_command_options_deep() {
        let mut base = AliasDefinition::default();
        base.command_options.insert(
            "db-sync".to_string(),
            HashMap::from([
                ("sanitize".to_string(), "yes".to_string()),
                ("chunk".to_string(), "500".to_string()),
            ]),
        );

        let mut layer = AliasDefinition::default();
        layer.command_options.insert(
            "db-sync".to_string(),
            HashMap::from([("sanitize".to_string(), "no".to_string())]),
        );

        base.merge_from(&layer);

        let opts = base.command_options.get("db-sync").expect("entry kept");
        assert_eq!(opts.get("sanitize").map(String::as_str), Some("no"));
        assert_eq!(opts.get("chunk").map(String::as_str), Some("500"));
    }

    #[test]
    fn test_merge_is_associative() {
        let a = def(Some("/a"), None);
        let b = def(None, Some("b.example.com"));
        let c = def(Some("/c"), None);

        // (a <- b) <- c
        let mut left = a.clone();
        left.merge_from(&b);
        left.merge_from(&c);

        // a <- (b <- c)
        let mut bc = b.clone();
        bc.merge_from(&c);
        let mut right = a.clone();
        right.merge_from(&bc);

        assert_eq!(left, right);
    }

    #[test]
    fn test_record_runnable_invariant() {
        let nothing = AliasRecord::from_definition("dead.end".to_string(), AliasDefinition::default());
        assert!(!nothing.is_runnable());

        let local = AliasRecord::from_definition("dev.site".to_string(), def(Some("/srv/www"), None));
        assert!(local.is_runnable());

        let remote =
            AliasRecord::from_definition("live.site".to_string(), def(None, Some("example.com")));
        assert!(remote.is_runnable());
    }

    #[test]
    fn test_remote_target_formatting() {
        let mut definition = def(None, Some("example.com"));
        definition.remote_user = Some("alice".to_string());
        let record = AliasRecord::from_definition("live".to_string(), definition);
        assert_eq!(record.remote_target().as_deref(), Some("alice@example.com"));

        let record =
            AliasRecord::from_definition("live".to_string(), def(None, Some("example.com")));
        assert_eq!(record.remote_target().as_deref(), Some("example.com"));

        let record = AliasRecord::from_definition("dev".to_string(), def(Some("/srv"), None));
        assert_eq!(record.remote_target(), None);
    }
}
