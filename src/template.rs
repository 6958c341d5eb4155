//! Placeholder expansion for configured strings.
//!
//! Command arguments, project field values and archive names may contain:
//!
//! - `{version}` - the full release version, e.g. `1.2.345`
//! - `{label}` - the branch-derived label, e.g. `1.2`
//! - `{commit_index}` - the commit ordinal, e.g. `345`
//! - `{env:NAME}` - a required environment value resolved during pre-flight
//!
//! Any other brace sequence is left untouched.

use crate::env::Credentials;
use crate::error::Result;
use crate::version::ReleaseVersion;
use regex::{Captures, Regex};

const PLACEHOLDER: &str = r"\{(version|label|commit_index|env:([A-Za-z_][A-Za-z0-9_]*))\}";

/// Values available while rendering a template
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub version: &'a ReleaseVersion,
    pub credentials: &'a Credentials,
}

impl<'a> RenderContext<'a> {
    pub fn new(version: &'a ReleaseVersion, credentials: &'a Credentials) -> Self {
        RenderContext {
            version,
            credentials,
        }
    }
}

/// Expands the placeholders of `template`.
///
/// # Returns
/// * `Err(MissingConfiguration)` - If an `{env:NAME}` value was not resolved
pub fn render(template: &str, ctx: &RenderContext<'_>) -> Result<String> {
    let pattern = Regex::new(PLACEHOLDER)?;
    let mut failure = None;

    let rendered = pattern.replace_all(template, |caps: &Captures<'_>| {
        if let Some(name) = caps.get(2) {
            match ctx.credentials.get(name.as_str()) {
                Ok(value) => value.to_string(),
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                }
            }
        } else {
            match &caps[1] {
                "version" => ctx.version.to_string(),
                "label" => ctx.version.label().to_string(),
                _ => ctx.version.commit_index().to_string(),
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(rendered.into_owned()),
    }
}
