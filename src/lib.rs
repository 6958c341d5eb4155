pub mod artifacts;
pub mod boundary;
pub mod config;
pub mod env;
pub mod error;
pub mod exec;
pub mod git;
pub mod package;
pub mod pipeline;
pub mod project;
pub mod publish;
pub mod target;
pub mod template;
pub mod ui;
pub mod version;

pub use error::{ReleaseError, Result};
