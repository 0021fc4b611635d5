// src/core/path_evaluator.rs

use crate::{core::host_path::HostPath, models::AliasRecord};

/// Expands a symbolic `%token` tail in place against the record's path-alias
/// map, preserving any literal segments that followed the token.
///
/// This never fails. A host path without a symbolic tail is left untouched
/// (calling twice is a no-op), and an unknown token is also left in place:
/// answering it would take a round-trip to the target site, which is a
/// collaborator this component does not have. A caller that needs the
/// concrete path must check `HostPath::path_alias()` afterwards and fail
/// itself.
pub fn evaluate(host_path: &mut HostPath, record: &AliasRecord) {
    let Some(token) = host_path.path_alias() else {
        return;
    };

    match record.paths.get(token) {
        Some(concrete) => {
            let concrete = concrete.clone();
            host_path.substitute_path_alias(&concrete);
        }
        None => {
            log::debug!(
                "Path alias '%{}' is not defined on '{}'; leaving it unresolved.",
                token,
                record.name
            );
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{alias_loader::AliasRegistry, alias_resolver};
    use crate::models::{AliasDefinition, AliasRecord};
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    fn record_with_paths(paths: &[(&str, &str)]) -> AliasRecord {
        AliasRecord::from_definition(
            "prod.live".to_string(),
            AliasDefinition {
                root: Some("/srv/www/live".to_string()),
                path_aliases: paths
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<HashMap<_, _>>(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_evaluate_substitutes_token_and_suffix() {
        let record = record_with_paths(&[("files", "sites/default/files")]);
        let mut hp = HostPath::parse("@live:%files/foo.txt");

        evaluate(&mut hp, &record);

        assert_eq!(hp.path_alias(), None);
        assert_eq!(hp.literal_path(), Some("sites/default/files/foo.txt"));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let record = record_with_paths(&[("files", "sites/default/files")]);
        let mut hp = HostPath::parse("@live:%files");

        evaluate(&mut hp, &record);
        let after_first = hp.clone();
        evaluate(&mut hp, &record);

        assert_eq!(hp, after_first);
    }

    #[test]
    fn test_evaluate_without_token_is_noop() {
        let record = record_with_paths(&[]);
        let mut hp = HostPath::parse("@live:sites/default");
        let before = hp.clone();

        evaluate(&mut hp, &record);

        assert_eq!(hp, before);
    }

    #[test]
    fn test_evaluate_unknown_token_left_for_caller() {
        let record = record_with_paths(&[]);
        let mut hp = HostPath::parse("@live:%dump-dir");

        evaluate(&mut hp, &record);

        // Still unresolved; the caller decides whether that is fatal.
        assert_eq!(hp.path_alias(), Some("dump-dir"));
    }

    #[test]
    fn test_resolve_then_evaluate_end_to_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("prod.aliases.yml"),
            "live:\n  root: /srv/www/live\n  path-aliases:\n    files: sites/default/files\n",
        )
        .expect("write alias file");
        let registry =
            AliasRegistry::load(None, &[dir.path().to_path_buf()]).expect("load registry");

        let mut target = alias_resolver::resolve_target(
            "@live:%files/foo.txt",
            &registry,
            &AliasDefinition::default(),
        )
        .expect("resolve");

        evaluate(&mut target.host_path, &target.record);

        assert_eq!(
            target.host_path.full_path(&target.record),
            Some(PathBuf::from("/srv/www/live/sites/default/files/foo.txt"))
        );
    }
}
