use clap::Parser;

pub mod args;
pub mod handlers;

/// siterun: resolve site aliases and run commands against local or remote
/// site environments.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// The sequence of arguments passed to siterun: an optional `@target`
    /// (or filesystem path), an action, and the action's own arguments.
    #[arg()]
    pub args: Vec<String>,
}
