//! External build tools
//!
//! The mobile app publisher, the web bundler and the container builder are
//! opaque processes. A build step describes one of them as an
//! [ExternalCommand] whose arguments are templates; the command is rendered
//! into a [ResolvedCommand] once the release version and credentials are known
//! and then handed to a [CommandRunner].
//!
//! - [runner::SystemRunner]: spawns real processes and waits for them
//! - [mock::RecordingRunner]: records commands for tests

pub mod mock;
pub mod runner;

pub use mock::RecordingRunner;
pub use runner::{CommandRunner, SystemRunner};

use crate::error::Result;
use crate::template::{self, RenderContext};
use std::fmt;
use std::path::{Path, PathBuf};

const MASK: &str = "***";

/// A single command-line argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Template rendered and shown as-is
    Text(String),
    /// Template rendered but masked whenever the command is displayed
    Secret(String),
}

impl Arg {
    pub fn text(template: impl Into<String>) -> Self {
        Arg::Text(template.into())
    }

    pub fn secret(template: impl Into<String>) -> Self {
        Arg::Secret(template.into())
    }

    fn display(&self) -> String {
        match self {
            Arg::Text(template) => quote(template),
            Arg::Secret(_) => MASK.to_string(),
        }
    }
}

fn quote(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// An external command before rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<Arg>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<Arg>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>) -> Self {
        ExternalCommand {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
        }
    }

    /// Appends plain template arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|a| Arg::Text(a.into())));
        self
    }

    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Feeds a (usually secret) value to the process on stdin
    pub fn stdin(mut self, input: Arg) -> Self {
        self.stdin = Some(input);
        self
    }

    /// Renders every template with the release context
    pub fn resolve(&self, ctx: &RenderContext<'_>) -> Result<ResolvedCommand> {
        let mut args = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            args.push(match arg {
                Arg::Text(t) | Arg::Secret(t) => template::render(t, ctx)?,
            });
        }

        let stdin = match &self.stdin {
            Some(Arg::Text(t)) | Some(Arg::Secret(t)) => Some(template::render(t, ctx)?),
            None => None,
        };

        let display_args: Vec<String> = self
            .args
            .iter()
            .zip(&args)
            .map(|(template, rendered)| match template {
                Arg::Text(_) => quote(rendered),
                Arg::Secret(_) => MASK.to_string(),
            })
            .collect();

        Ok(ResolvedCommand {
            program: self.program.clone(),
            args,
            cwd: self.cwd.clone(),
            stdin,
            display: join_display(&self.program, &display_args),
        })
    }
}

fn join_display(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(Arg::display).collect();
        write!(f, "{}", join_display(&self.program, &args))
    }
}

/// A rendered command ready to run
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<String>,
    display: String,
}

impl ResolvedCommand {
    /// Command line with secret arguments masked
    pub fn display(&self) -> &str {
        &self.display
    }
}

impl fmt::Debug for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCommand")
            .field("command", &self.display)
            .field("cwd", &self.cwd)
            .field("stdin", &self.stdin.as_ref().map(|_| MASK))
            .finish()
    }
}
