// src/constants.rs

/// Suffix of modern, YAML alias definition files (e.g. `staging.aliases.yml`).
pub const ALIAS_FILE_SUFFIX: &str = ".aliases.yml";

/// Suffix of legacy alias definition files inherited from the PHP-era tool.
/// These are read-only; siterun never writes this format.
pub const LEGACY_ALIAS_FILE_SUFFIX: &str = ".aliases.php";

/// The name of the subdirectory (inside the siterun config dir) that is
/// scanned for alias definition files.
pub const ALIAS_DIR_NAME: &str = "aliases";

/// The name of the optional settings file (inside the siterun config dir).
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// Environment variable holding extra alias directories, separated like PATH.
pub const ALIAS_PATH_ENV_VAR: &str = "SITERUN_ALIAS_PATH";

/// Reserved entry name inside an alias file that holds group-level defaults.
pub const GROUP_DEFAULTS_KEY: &str = "defaults";

/// Name given to the synthetic record that targets the local installation.
pub const SELF_ALIAS_NAME: &str = "self";

/// Marker file that identifies an installation root during upward discovery.
pub const ROOT_MARKER_FILE: &str = "siterun.yml";

/// Marker directory that identifies an installation root (multisite layout).
pub const ROOT_MARKER_DIR: &str = "sites";
