//! Snapshot of the process environment.
//!
//! Credentials (signing passwords, registry logins) are read once at startup
//! into an [Environment] that is passed explicitly to the pipeline, so nothing
//! below `main` consults process-wide state.

use crate::error::{ReleaseError, Result};
use std::collections::HashMap;

/// Immutable set of environment variables available to a release
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Captures the current process environment
    pub fn from_process() -> Self {
        Environment {
            vars: std::env::vars().collect(),
        }
    }

    /// Builds an environment from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Environment {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of a variable; empty values count as unset
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Resolves every required variable into [Credentials].
    ///
    /// # Returns
    /// * `Err(MissingConfiguration)` - Listing every missing or empty variable
    pub fn require(&self, names: &[String]) -> Result<Credentials> {
        let missing: Vec<&str> = names
            .iter()
            .filter(|name| self.get(name).is_none())
            .map(|name| name.as_str())
            .collect();

        if !missing.is_empty() {
            return Err(ReleaseError::missing(format!(
                "environment variable(s) not set: {}",
                missing.join(", ")
            )));
        }

        let values = names
            .iter()
            .filter_map(|name| self.get(name).map(|v| (name.clone(), v.to_string())))
            .collect();
        Ok(Credentials { values })
    }
}

/// Required environment values resolved during pre-flight
#[derive(Clone, Default)]
pub struct Credentials {
    values: HashMap<String, String>,
}

impl Credentials {
    pub fn get(&self, name: &str) -> Result<&str> {
        self.values
            .get(name)
            .map(|v| v.as_str())
            .ok_or_else(|| ReleaseError::missing(format!("environment variable not set: {}", name)))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.values.keys().collect();
        names.sort();
        f.debug_struct("Credentials").field("names", &names).finish()
    }
}
