use crate::error::{ReleaseError, Result};
use crate::exec::{CommandRunner, ResolvedCommand};

type Effect = Box<dyn FnMut(&ResolvedCommand) -> std::io::Result<()>>;

/// Runner that records commands instead of spawning them
///
/// An optional effect simulates what a tool would leave on disk, and a
/// failing program name simulates a tool exiting non-zero.
#[derive(Default)]
pub struct RecordingRunner {
    commands: Vec<ResolvedCommand>,
    effect: Option<Effect>,
    fail_program: Option<(String, i32)>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `effect` for every recorded command
    pub fn with_effect<F>(mut self, effect: F) -> Self
    where
        F: FnMut(&ResolvedCommand) -> std::io::Result<()> + 'static,
    {
        self.effect = Some(Box::new(effect));
        self
    }

    /// Fail with `code` whenever `program` is run
    pub fn failing(mut self, program: impl Into<String>, code: i32) -> Self {
        self.fail_program = Some((program.into(), code));
        self
    }

    pub fn commands(&self) -> &[ResolvedCommand] {
        &self.commands
    }

    /// Displayed (masked) command lines, in run order
    pub fn command_lines(&self) -> Vec<String> {
        self.commands
            .iter()
            .map(|c| c.display().to_string())
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, command: &ResolvedCommand) -> Result<()> {
        self.commands.push(command.clone());

        if let Some((program, code)) = &self.fail_program {
            if *program == command.program {
                return Err(ReleaseError::command(command.display(), Some(*code)));
            }
        }

        if let Some(effect) = self.effect.as_mut() {
            effect(command)?;
        }
        Ok(())
    }
}
