// src/cli/args.rs
use clap::{Args, Parser};
use std::path::PathBuf;

/// Flags shared by every command: where aliases come from, plus per-invocation
/// record overrides.
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// Load aliases from this file first, ahead of the configured directories.
    #[arg(long, value_name = "FILE")]
    pub alias_file: Option<PathBuf>,

    /// Override the target's root path for this invocation.
    #[arg(long)]
    pub root: Option<String>,

    /// Override the target's URI for this invocation.
    #[arg(long)]
    pub uri: Option<String>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)] // Important: Prevents clap from expecting "status" as the first arg
pub struct StatusArgs {
    /// Show only this field of the resolved record (e.g. 'root', 'uri').
    pub item: Option<String>,

    /// Include the path-alias and per-command option tables.
    #[arg(long)]
    pub full: bool,

    /// Limit the output to the project fields (root and uri).
    #[arg(long)]
    pub project: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ExecArgs {
    /// Print the composed command line without running anything.
    #[arg(long, short = 's')]
    pub simulate: bool,

    /// Log the command line before executing it.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Kill the command when it runs longer than this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    #[command(flatten)]
    pub source: SourceArgs,

    /// The command to run against the target site.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct PathArgs {
    /// A host path to resolve (e.g. '@live:%files/foo.txt'). When the target
    /// is given separately, this is just the path part ('%files/foo.txt').
    pub path: Option<String>,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}
