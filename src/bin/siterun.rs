// src/bin/siterun.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use siterun::{
    cli::{Cli, handlers},
    core::paths,
    models::SettingsConfig,
    system::dispatcher,
};

// --- Command Definition and Registry ---

/// Defines a system command, its aliases, and its handler signature.
/// The handler signature is kept consistent across all commands for
/// simplicity in the registry.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Option<String>, Vec<String>, &SettingsConfig) -> Result<()>,
}

/// The single source of truth for all system commands.
/// This declarative approach makes adding, removing, or modifying commands
/// trivial: to add a new command, add a new entry to this static array.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "exec",
        aliases: &["x"],
        handler: handlers::exec::handle,
    },
    CommandDefinition {
        name: "list",
        aliases: &["ls"],
        handler: handlers::list::handle,
    },
    CommandDefinition {
        name: "path",
        aliases: &[],
        handler: handlers::path::handle,
    },
    CommandDefinition {
        name: "status",
        aliases: &["st"],
        handler: handlers::status::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// The main entry point of the `siterun` application.
/// It sets up logging, parses arguments, dispatches to the correct handler,
/// and performs centralized error handling.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("\n{}: {}", "Error".red().bold(), e);

        // A timeout means the command was killed mid-flight; use the
        // conventional exit code so scripts can tell it apart.
        if let Some(dispatch_err) = e.downcast_ref::<dispatcher::DispatchError>()
            && matches!(dispatch_err, dispatcher::DispatchError::Timeout { .. })
        {
            std::process::exit(124);
        }
        std::process::exit(1);
    }
}

/// The main application dispatcher.
///
/// Grammar: `siterun [@target[,@target...]] <action> [args...]`. The first
/// argument is a target when it is an alias reference or looks like a
/// filesystem path; an unknown action is a shortcut for `exec`, so
/// `siterun @live git pull` dispatches `git pull` to `@live`.
fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let settings = paths::load_settings()?;
    let mut args = cli.args;

    if args.is_empty() {
        println!(
            "{} resolve site aliases and run commands against them.",
            "siterun:".bold()
        );
        println!("Usage: siterun [@target] <action> [args...]");
        println!("Actions: status (st), exec (x), path, list (ls)");
        return Ok(());
    }

    let arg1 = args.remove(0);

    let (context, action_name, action_args) = if is_target_reference(&arg1) {
        match args.first() {
            // Case: `siterun @live` (shortcut for `status`)
            None => (Some(arg1), "status".to_string(), Vec::new()),
            Some(maybe_action) if find_command(maybe_action).is_some() => {
                // Case: `siterun @live <action> [args...]`
                let action = args.remove(0);
                (Some(arg1), action, args)
            }
            // Case: `siterun @live <command...>` (shortcut for `exec`)
            Some(_) => (Some(arg1), "exec".to_string(), args),
        }
    } else if find_command(&arg1).is_some() {
        // Case: `siterun <action> [args...]` (targets the local site)
        (None, arg1, args)
    } else {
        // Case: `siterun <command...>` (shortcut for `exec` on the local site)
        let mut exec_args = vec![arg1];
        exec_args.extend(args);
        (None, "exec".to_string(), exec_args)
    };

    let command = find_command(&action_name)
        .ok_or_else(|| anyhow!("Internal error: action '{}' vanished from the registry.", action_name))?;
    (command.handler)(context, action_args, &settings)
}

/// A first argument is a target when it is an `@alias` reference or reads
/// like a filesystem path. Bare relative names are commands; point at a
/// directory explicitly (`./mysite`) to target it.
fn is_target_reference(arg: &str) -> bool {
    arg.starts_with('@')
        || arg.starts_with('.')
        || arg.starts_with('/')
        || arg.starts_with('~')
        || arg.contains('/')
        || arg.contains('\\')
}
