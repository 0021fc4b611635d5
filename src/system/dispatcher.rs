// src/system/dispatcher.rs

//! Executes a command line against a resolved target, transparently switching
//! between a local child process and an SSH-wrapped remote invocation.
//!
//! The composition step (`compose_argv`) is pure and split out so the exact
//! wire form, including the quoting of the remote inner command, can be
//! asserted in tests. Execution goes through the `ProcessRunner` seam; tests
//! inject a recording stub instead of spawning anything.

use crate::models::{AliasRecord, DispatchOutcome, ExecutionOptions};
use colored::Colorize;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{command}' could not be launched: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command '{command}' exceeded the {timeout:?} timeout and was killed.")]
    Timeout { command: String, timeout: Duration },
    #[error("Command '{command}' failed while waiting for completion: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("The ssh options string '{options}' could not be parsed.")]
    SshOptionsParse { options: String },
    #[error("Command arguments could not be quoted for the remote shell: {0}")]
    Quote(#[from] shlex::QuoteError),
}

/// The spawn seam. The real implementation runs a child process with
/// inherited stdio (output streams to the caller incrementally); tests swap
/// in a stub that records what would have run.
pub trait ProcessRunner {
    /// Runs `argv` to completion and returns the exit code. A non-zero exit
    /// code is a result, not an error; errors mean the command could not be
    /// run at all (spawn failure) or was killed on timeout.
    fn run(
        &self,
        argv: &[String],
        cwd: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<i32, DispatchError>;
}

/// Spawns real child processes via `std::process`.
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(
        &self,
        argv: &[String],
        cwd: Option<&Path>,
        timeout: Option<Duration>,
    ) -> Result<i32, DispatchError> {
        let (program, args) = argv.split_first().ok_or(DispatchError::EmptyCommand)?;
        let display = argv.join(" ");

        let mut command = StdCommand::new(program);
        command
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = cwd {
            command.current_dir(dunce::simplified(dir));
        }

        let mut child = command.spawn().map_err(|e| DispatchError::Launch {
            command: display.clone(),
            source: e,
        })?;

        let Some(limit) = timeout else {
            let status = child.wait().map_err(|e| DispatchError::Wait {
                command: display.clone(),
                source: e,
            })?;
            return Ok(exit_code_of(status));
        };

        // Poll-wait so the deadline can interrupt. On expiry the child is
        // killed and reaped before the error is returned; nothing is left
        // running.
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(exit_code_of(status)),
                Ok(None) => {
                    if started.elapsed() >= limit {
                        log::debug!(
                            "Timeout reached, killing child process (PID: {}).",
                            child.id()
                        );
                        if let Err(e) = child.kill() {
                            log::warn!("Failed to kill child process {}: {}", child.id(), e);
                        }
                        child.wait().ok();
                        return Err(DispatchError::Timeout {
                            command: display,
                            timeout: limit,
                        });
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    return Err(DispatchError::Wait {
                        command: display,
                        source: e,
                    });
                }
            }
        }
    }
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    // A child terminated by a signal has no code; report a plain failure.
    status.code().unwrap_or(1)
}

// --- Command Composition ---

/// Builds the argv that actually runs.
///
/// Local records pass the argv through unchanged (the working directory is
/// supplied separately at spawn time). Remote records wrap it as
/// `ssh [options...] [user@]host <inner>`, where `<inner>` is the
/// shlex-joined command, prefixed with `cd <quoted-root> && ` when the record
/// has a root. The shlex quoting is the fixed escaping policy: the inner line
/// survives the remote shell's parse exactly once.
pub fn compose_argv(
    record: &AliasRecord,
    argv: &[String],
    fallback_ssh_options: Option<&str>,
) -> Result<Vec<String>, DispatchError> {
    if argv.is_empty() {
        return Err(DispatchError::EmptyCommand);
    }

    let Some(host_target) = record.remote_target() else {
        return Ok(argv.to_vec());
    };

    let mut composed = vec!["ssh".to_string()];

    if let Some(options) = record.ssh_options.as_deref().or(fallback_ssh_options) {
        let parsed = shlex::split(options).ok_or_else(|| DispatchError::SshOptionsParse {
            options: options.to_string(),
        })?;
        composed.extend(parsed);
    }

    composed.push(host_target);

    let mut inner = shlex::try_join(argv.iter().map(String::as_str))?;
    if let Some(root) = &record.root {
        inner = format!(
            "cd {} && {}",
            shlex::try_quote(&root.to_string_lossy())?,
            inner
        );
    }
    composed.push(inner);

    Ok(composed)
}

/// Appends the record's per-command overrides (`--key=value`, sorted by key)
/// when the map carries an entry for the invoked program.
fn inject_command_options(record: &AliasRecord, argv: &[String]) -> Vec<String> {
    let mut argv = argv.to_vec();
    if let Some(program) = argv.first()
        && let Some(options) = record.command_options.get(program)
    {
        let mut pairs: Vec<_> = options.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in pairs {
            argv.push(format!("--{}={}", key, value));
        }
    }
    argv
}

// --- Dispatch ---

/// Runs `argv` against the resolved record with the real system runner.
pub fn dispatch(
    record: &AliasRecord,
    argv: &[String],
    options: &ExecutionOptions,
    fallback_ssh_options: Option<&str>,
) -> Result<DispatchOutcome, DispatchError> {
    dispatch_with_runner(record, argv, options, fallback_ssh_options, &SystemRunner)
}

/// The full dispatch pipeline: option injection, composition, simulate gate,
/// then execution through the given runner. In simulate mode the runner is
/// never touched and the outcome reports exit code 0.
pub fn dispatch_with_runner(
    record: &AliasRecord,
    argv: &[String],
    options: &ExecutionOptions,
    fallback_ssh_options: Option<&str>,
    runner: &dyn ProcessRunner,
) -> Result<DispatchOutcome, DispatchError> {
    let argv = inject_command_options(record, argv);
    let composed = compose_argv(record, &argv, fallback_ssh_options)?;
    let command_line = shlex::try_join(composed.iter().map(String::as_str))?;

    if options.simulate {
        println!(
            "{} {} {}",
            "[simulate]".yellow().bold(),
            record.name.cyan(),
            command_line
        );
        return Ok(DispatchOutcome {
            exit_code: 0,
            command_line,
        });
    }

    if options.verbose {
        log::info!("Dispatching to '{}': {}", record.name, command_line);
        println!("{} {}", "→".blue(), command_line.green());
    }

    // Remote commands change directory inside the SSH invocation; only local
    // ones use the spawn-time working directory.
    let cwd = if record.remote_host.is_none() {
        record.root.as_deref()
    } else {
        None
    };

    let exit_code = runner.run(&composed, cwd, options.timeout)?;
    Ok(DispatchOutcome {
        exit_code,
        command_line,
    })
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AliasDefinition;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn record(root: Option<&str>, host: Option<&str>, user: Option<&str>) -> AliasRecord {
        AliasRecord::from_definition(
            "prod.live".to_string(),
            AliasDefinition {
                root: root.map(String::from),
                remote_host: host.map(String::from),
                remote_user: user.map(String::from),
                ..Default::default()
            },
        )
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    /// Records every invocation instead of spawning anything.
    struct RecordingRunner {
        calls: RefCell<Vec<(Vec<String>, Option<PathBuf>)>>,
        exit_code: i32,
    }

    impl RecordingRunner {
        fn new(exit_code: i32) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                exit_code,
            }
        }
    }

    impl ProcessRunner for RecordingRunner {
        fn run(
            &self,
            argv: &[String],
            cwd: Option<&Path>,
            _timeout: Option<Duration>,
        ) -> Result<i32, DispatchError> {
            self.calls
                .borrow_mut()
                .push((argv.to_vec(), cwd.map(Path::to_path_buf)));
            Ok(self.exit_code)
        }
    }

    #[test]
    fn test_compose_local_is_passthrough() {
        let record = record(Some("/srv/www/live"), None, None);
        let composed = compose_argv(&record, &argv(&["git", "pull"]), None).expect("compose");
        assert_eq!(composed, argv(&["git", "pull"]));
    }

    #[test]
    fn test_compose_remote_minimal() {
        let record = record(None, Some("example.com"), Some("alice"));
        let composed = compose_argv(&record, &argv(&["status"]), None).expect("compose");
        assert_eq!(composed, argv(&["ssh", "alice@example.com", "status"]));
    }

    #[test]
    fn test_compose_remote_with_root_and_quoting() {
        let record = record(Some("/srv/www/live"), Some("example.com"), Some("alice"));
        let composed =
            compose_argv(&record, &argv(&["echo", "hello world"]), None).expect("compose");
        // shlex quotes with double quotes; this is the fixed escaping policy.
        assert_eq!(
            composed,
            argv(&[
                "ssh",
                "alice@example.com",
                "cd /srv/www/live && echo \"hello world\"",
            ])
        );
    }

    #[test]
    fn test_compose_remote_splits_ssh_options() {
        let mut record = record(None, Some("example.com"), None);
        record.ssh_options = Some("-p 2222 -o PasswordAuthentication=no".to_string());
        let composed = compose_argv(&record, &argv(&["status"]), None).expect("compose");
        assert_eq!(
            composed,
            argv(&[
                "ssh",
                "-p",
                "2222",
                "-o",
                "PasswordAuthentication=no",
                "example.com",
                "status",
            ])
        );
    }

    #[test]
    fn test_compose_fallback_ssh_options_used_when_record_has_none() {
        let record = record(None, Some("example.com"), None);
        let composed =
            compose_argv(&record, &argv(&["status"]), Some("-A")).expect("compose");
        assert_eq!(composed, argv(&["ssh", "-A", "example.com", "status"]));
    }

    #[test]
    fn test_compose_empty_argv_fails() {
        let record = record(Some("/srv"), None, None);
        assert!(matches!(
            compose_argv(&record, &[], None),
            Err(DispatchError::EmptyCommand)
        ));
    }

    #[test]
    fn test_simulate_never_touches_the_runner() {
        let record = record(None, Some("example.com"), Some("alice"));
        let runner = RecordingRunner::new(0);
        let options = ExecutionOptions {
            simulate: true,
            ..Default::default()
        };

        let outcome =
            dispatch_with_runner(&record, &argv(&["status"]), &options, None, &runner)
                .expect("dispatch");

        assert!(runner.calls.borrow().is_empty());
        assert_eq!(outcome.exit_code, 0);
        // The reported line is exactly the composed invocation.
        assert_eq!(outcome.command_line, "ssh alice@example.com status");
    }

    #[test]
    fn test_dispatch_local_uses_root_as_cwd() {
        let record = record(Some("/srv/www/live"), None, None);
        let runner = RecordingRunner::new(0);

        dispatch_with_runner(
            &record,
            &argv(&["git", "status"]),
            &ExecutionOptions::default(),
            None,
            &runner,
        )
        .expect("dispatch");

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        let (ran, cwd) = calls.first().expect("one call");
        assert_eq!(*ran, argv(&["git", "status"]));
        assert_eq!(cwd.as_deref(), Some(Path::new("/srv/www/live")));
    }

    #[test]
    fn test_dispatch_passes_exit_code_through() {
        let record = record(Some("/srv"), None, None);
        let runner = RecordingRunner::new(3);

        let outcome = dispatch_with_runner(
            &record,
            &argv(&["false"]),
            &ExecutionOptions::default(),
            None,
            &runner,
        )
        .expect("non-zero exit is a result, not an error");

        assert_eq!(outcome.exit_code, 3);
    }

    #[test]
    fn test_dispatch_injects_command_options_sorted() {
        let mut record = record(Some("/srv"), None, None);
        record.command_options.insert(
            "db-sync".to_string(),
            HashMap::from([
                ("sanitize".to_string(), "yes".to_string()),
                ("chunk".to_string(), "500".to_string()),
            ]),
        );
        let runner = RecordingRunner::new(0);

        dispatch_with_runner(
            &record,
            &argv(&["db-sync", "--source=@stage"]),
            &ExecutionOptions::default(),
            None,
            &runner,
        )
        .expect("dispatch");

        let calls = runner.calls.borrow();
        let (ran, _) = calls.first().expect("one call");
        assert_eq!(
            *ran,
            argv(&["db-sync", "--source=@stage", "--chunk=500", "--sanitize=yes"])
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_reports_real_exit_code() {
        let code = SystemRunner
            .run(&argv(&["sh", "-c", "exit 3"]), None, None)
            .expect("run");
        assert_eq!(code, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_launch_failure() {
        let err = SystemRunner
            .run(&argv(&["siterun-no-such-binary"]), None, None)
            .expect_err("must fail");
        assert!(matches!(err, DispatchError::Launch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_kills_on_timeout() {
        let started = Instant::now();
        let err = SystemRunner
            .run(
                &argv(&["sleep", "5"]),
                None,
                Some(Duration::from_millis(200)),
            )
            .expect_err("must time out");

        assert!(matches!(err, DispatchError::Timeout { .. }));
        // The child was killed and reaped well before its natural end.
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
