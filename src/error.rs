use thiserror::Error;

/// Unified error type for roadnik-release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version unavailable: {0}")]
    VersionUnavailable(String),

    #[error("Project file not found: {0}")]
    ProjectFileNotFound(String),

    #[error("Field '{field}' not found in {file}")]
    FieldNotFound { field: String, file: String },

    #[error("External command failed ({}): {command}", exit_status(.code))]
    ExternalCommandFailure { command: String, code: Option<i32> },

    #[error("No build output matched: {0}")]
    PatternMatchFailure(String),

    #[error("Ambiguous artifact pattern: {0}")]
    AmbiguousPattern(String),

    #[error("Tag already exists: {0}")]
    TagAlreadyExists(String),

    #[error("Push rejected: {0}")]
    PushRejected(String),

    #[error("Merge conflict: {0}")]
    MergeConflict(String),

    #[error("Repository state error: {0}")]
    RepositoryState(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

/// Convenience type alias for Results in roadnik-release
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a missing-configuration error with context
    pub fn missing(msg: impl Into<String>) -> Self {
        ReleaseError::MissingConfiguration(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        ReleaseError::VersionUnavailable(msg.into())
    }

    /// Create a repository state error with context
    pub fn repository(msg: impl Into<String>) -> Self {
        ReleaseError::RepositoryState(msg.into())
    }

    /// Create an external command failure for a displayed command line
    pub fn command(command: impl Into<String>, code: Option<i32>) -> Self {
        ReleaseError::ExternalCommandFailure {
            command: command.into(),
            code,
        }
    }

    /// Process exit code to report for this error.
    ///
    /// External tool failures propagate the tool's own code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReleaseError::ExternalCommandFailure {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}
