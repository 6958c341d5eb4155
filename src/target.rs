use std::collections::BTreeMap;
use std::fmt;

/// What a release produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Signed mobile packages collected into the artifacts directory
    MobilePackage,
    /// Self-contained server build zipped into one archive
    ServerPackage,
    /// Multi-architecture container image pushed to a registry
    ContainerImage,
}

impl TargetKind {
    pub fn name(&self) -> &'static str {
        match self {
            TargetKind::MobilePackage => "client",
            TargetKind::ServerPackage => "server",
            TargetKind::ContainerImage => "image",
        }
    }
}

/// A (selector, output kind) pair such as `net9.0-android` or `win-x64`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    selector: String,
    kind: TargetKind,
}

impl BuildTarget {
    pub fn new(selector: impl Into<String>, kind: TargetKind) -> Self {
        BuildTarget {
            selector: selector.into(),
            kind,
        }
    }

    /// Framework or runtime identifier passed to the build tool
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Looks up the artifact pattern for this target.
    ///
    /// Keys are selector suffixes (`android` matches `net9.0-android`); the
    /// longest matching suffix wins.
    pub fn artifact_pattern<'a>(&self, patterns: &'a BTreeMap<String, String>) -> Option<&'a str> {
        patterns
            .iter()
            .filter(|(suffix, _)| self.selector.ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(_, pattern)| pattern.as_str())
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.selector.is_empty() {
            write!(f, "{}", self.kind.name())
        } else {
            write!(f, "{} ({})", self.kind.name(), self.selector)
        }
    }
}
