use std::fmt;
use std::path::PathBuf;

/// Non-fatal conditions met during a release.
/// These are reported to the user but do not stop the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// The artifact scan found nothing and the empty-scan policy is `skip`
    NoArtifactsMatched { dir: PathBuf, pattern: String },
    /// Trunk already contained every commit of the release branch
    TrunkAlreadyUpToDate { trunk: String, source: String },
    /// The release tag was created locally only
    TagNotPushed { tag: String, remote: String },
    /// Stash was requested but the working tree was clean
    NothingToStash,
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::NoArtifactsMatched { dir, pattern } => {
                write!(
                    f,
                    "No file in '{}' matches '{}'; no artifacts collected",
                    dir.display(),
                    pattern
                )
            }
            BoundaryWarning::TrunkAlreadyUpToDate { trunk, source } => {
                write!(f, "'{}' already contains '{}'", trunk, source)
            }
            BoundaryWarning::TagNotPushed { tag, remote } => {
                write!(f, "Tag '{}' was not pushed to '{}'", tag, remote)
            }
            BoundaryWarning::NothingToStash => write!(f, "No local changes to stash"),
        }
    }
}
