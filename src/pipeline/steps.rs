use crate::error::Result;
use crate::exec::{CommandRunner, ExternalCommand};
use crate::template::RenderContext;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One unit of work in the external build stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStep {
    /// Run an external tool and wait for it
    Run(ExternalCommand),
    /// Delete a directory tree if it exists
    RemoveDir(PathBuf),
    /// Create a directory and its parents
    CreateDir(PathBuf),
    /// Copy a single file, replacing the destination
    CopyFile { from: PathBuf, to: PathBuf },
    /// Copy a directory tree into `to`, creating it if needed
    CopyDir { from: PathBuf, to: PathBuf },
}

impl BuildStep {
    pub fn run(command: ExternalCommand) -> Self {
        BuildStep::Run(command)
    }

    /// Performs the step.
    pub fn execute<C: CommandRunner>(&self, runner: &mut C, ctx: &RenderContext<'_>) -> Result<()> {
        match self {
            BuildStep::Run(command) => {
                let resolved = command.resolve(ctx)?;
                runner.run(&resolved)
            }
            BuildStep::RemoveDir(dir) => {
                if dir.is_dir() {
                    fs::remove_dir_all(dir)?;
                    log::debug!("removed {}", dir.display());
                }
                Ok(())
            }
            BuildStep::CreateDir(dir) => Ok(fs::create_dir_all(dir)?),
            BuildStep::CopyFile { from, to } => {
                if let Some(parent) = to.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(from, to)?;
                log::debug!("copied {} to {}", from.display(), to.display());
                Ok(())
            }
            BuildStep::CopyDir { from, to } => copy_dir(from, to),
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::Run(command) => write!(f, "{}", command),
            BuildStep::RemoveDir(dir) => write!(f, "remove directory {}", dir.display()),
            BuildStep::CreateDir(dir) => write!(f, "create directory {}", dir.display()),
            BuildStep::CopyFile { from, to } => {
                write!(f, "copy {} to {}", from.display(), to.display())
            }
            BuildStep::CopyDir { from, to } => {
                write!(f, "copy {}/* to {}", from.display(), to.display())
            }
        }
    }
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)?;
    let mut copied = 0usize;

    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let relative = match entry.path().strip_prefix(from) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let destination = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &destination)?;
            copied += 1;
        }
    }

    log::debug!(
        "copied {} file(s) from {} to {}",
        copied,
        from.display(),
        to.display()
    );
    Ok(())
}
