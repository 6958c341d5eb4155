use crate::error::{ReleaseError, Result};
use crate::exec::ResolvedCommand;
use std::io::Write;
use std::process::{Command, Stdio};

/// Runs external build tools
pub trait CommandRunner {
    /// Run a command to completion
    ///
    /// # Returns
    /// * `Ok(())` if the process exits with code 0
    /// * `Err(ExternalCommandFailure)` if it cannot be started or exits non-zero
    fn run(&mut self, command: &ResolvedCommand) -> Result<()>;
}

/// Spawns real processes, inheriting stdout and stderr
///
/// Blocks until the process exits. There is no timeout: a tool that never
/// exits blocks the release.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        SystemRunner
    }
}

impl CommandRunner for SystemRunner {
    fn run(&mut self, command: &ResolvedCommand) -> Result<()> {
        log::info!("running: {}", command.display());

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }
        cmd.stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        });

        let mut child = cmd.spawn().map_err(|e| {
            log::error!("failed to start '{}': {}", command.program, e);
            ReleaseError::command(format!("{} (failed to start: {})", command.display(), e), None)
        })?;

        // The pipe is closed at the end of the arm so the child sees EOF.
        let written = match (&command.stdin, child.stdin.take()) {
            (Some(input), Some(mut stdin)) => stdin.write_all(input.as_bytes()),
            _ => Ok(()),
        };

        let status = child.wait()?;
        if !status.success() {
            return Err(ReleaseError::command(command.display(), status.code()));
        }
        if let Err(e) = written {
            log::error!("cannot write stdin of '{}': {}", command.program, e);
            return Err(ReleaseError::command(
                format!("{} (writing stdin failed: {})", command.display(), e),
                None,
            ));
        }

        log::debug!("finished: {}", command.display());
        Ok(())
    }
}
