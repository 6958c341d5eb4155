use crate::artifacts::EmptyScanPolicy;
use crate::error::{ReleaseError, Result};
use crate::git::Identity;
use crate::project::DEFAULT_PROJECT_EXTENSION;
use crate::version::DEFAULT_LABEL_PATTERN;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for in the working directory and the user config directory
pub const CONFIG_FILE_NAME: &str = "roadnik-release.toml";

/// Represents the complete configuration for roadnik-release.
///
/// Every section and field has a default matching the Roadnik repository
/// layout, so an empty or partial file is valid.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub paths: PathsConfig,
    pub client: ClientConfig,
    pub server: ServerConfig,
    pub image: ImageConfig,
}

/// Git settings shared by all profiles.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Remote that tags and trunk are pushed to
    pub remote: String,
    /// Branch that release branches are merged back into
    pub trunk: String,
    /// Committer for tags and merge commits; falls back to the repository's user.name/user.email
    pub identity: Option<IdentityConfig>,
    pub push_tag: bool,
    pub merge_back: bool,
    /// Stash the stamped project files before switching to trunk
    pub stash_before_merge: bool,
    /// Check the release branch out again after merging
    pub return_to_branch: bool,
    /// Regex extracting the version label from the branch name
    pub version_label_pattern: String,
    /// Extension of the project definition files that carry version fields
    pub project_extension: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            remote: "origin".to_string(),
            trunk: "main".to_string(),
            identity: None,
            push_tag: true,
            merge_back: true,
            stash_before_merge: true,
            return_to_branch: true,
            version_label_pattern: DEFAULT_LABEL_PATTERN.to_string(),
            project_extension: DEFAULT_PROJECT_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IdentityConfig {
    pub name: String,
    pub email: String,
}

impl From<&IdentityConfig> for Identity {
    fn from(config: &IdentityConfig) -> Self {
        Identity::new(config.name.clone(), config.email.clone())
    }
}

/// Build output and artifact locations, relative to the project root.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub output_dir: PathBuf,
    pub artifacts_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            output_dir: PathBuf::from("output"),
            artifacts_dir: PathBuf::from("artifacts"),
        }
    }
}

/// A project field to stamp and the template of its value.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct VersionField {
    pub name: String,
    pub value: String,
}

impl VersionField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        VersionField {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Web front-end bundled with npm.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WebAppConfig {
    /// Directory containing package.json
    pub source: PathBuf,
    /// Where the bundle is copied
    pub target: PathBuf,
    /// npm script producing the bundle
    pub script: String,
    /// Bundle directory under `<source>/dist`
    pub dist_subdir: String,
}

impl Default for WebAppConfig {
    fn default() -> Self {
        WebAppConfig {
            source: PathBuf::from("www"),
            target: PathBuf::from("www"),
            script: "build".to_string(),
            dist_subdir: "room".to_string(),
        }
    }
}

fn default_artifact_patterns() -> BTreeMap<String, String> {
    let mut patterns = BTreeMap::new();
    patterns.insert(
        "android".to_string(),
        r"-(Signed)\.apk$|-(Signed)\.aab$".to_string(),
    );
    patterns
}

/// `client` profile: signed mobile packages.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub project_dir: PathBuf,
    pub default_framework: String,
    pub configuration: String,
    /// Workload installed before publishing (`dotnet workload install <name>`)
    pub workload: Option<String>,
    /// Environment variable holding the signing key and store password
    pub signing_password_env: String,
    pub version_fields: Vec<VersionField>,
    /// Artifact patterns keyed by framework suffix
    pub artifact_patterns: BTreeMap<String, String>,
    pub recursive_scan: bool,
    pub on_empty_scan: EmptyScanPolicy,
    pub web: WebAppConfig,
    pub publish: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            project_dir: PathBuf::from("Roadnik.MAUI"),
            default_framework: "net9.0-android".to_string(),
            configuration: "Release".to_string(),
            workload: Some("maui".to_string()),
            signing_password_env: "ANDROID_SIGNING_KEY_PASSWORD".to_string(),
            version_fields: vec![
                VersionField::new("ApplicationDisplayVersion", "{version}"),
                VersionField::new("ApplicationVersion", "{commit_index}"),
            ],
            artifact_patterns: default_artifact_patterns(),
            recursive_scan: false,
            on_empty_scan: EmptyScanPolicy::Fail,
            web: WebAppConfig {
                source: PathBuf::from("www-vue"),
                target: PathBuf::from("Roadnik.MAUI/Resources/Raw/webApp"),
                ..WebAppConfig::default()
            },
            publish: true,
        }
    }
}

/// `server` profile: self-contained server zip.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub project_dir: PathBuf,
    pub default_platform: String,
    pub configuration: String,
    /// Web bundle; `target` is relative to the output directory
    pub web: WebAppConfig,
    /// Sample runtime settings copied verbatim into the package
    pub settings_file: Option<PathBuf>,
    /// Archive file name; `{platform}` and the version placeholders are expanded
    pub archive_name: String,
    pub version_fields: Vec<VersionField>,
    pub publish: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            project_dir: PathBuf::from("Roadnik"),
            default_platform: "win-x64".to_string(),
            configuration: "release".to_string(),
            web: WebAppConfig::default(),
            settings_file: Some(PathBuf::from("_settings.json")),
            archive_name: "server-{platform}.zip".to_string(),
            version_fields: Vec::new(),
            publish: false,
        }
    }
}

/// `image` profile: multi-architecture container image.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ImageConfig {
    pub project_dir: PathBuf,
    pub dockerfile: PathBuf,
    pub context: PathBuf,
    pub platforms: Vec<String>,
    pub repo_env: String,
    pub login_env: String,
    pub password_env: String,
    /// Tags pushed in addition to the release version
    pub extra_tags: Vec<String>,
    pub version_fields: Vec<VersionField>,
    pub publish: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            project_dir: PathBuf::from("Roadnik"),
            dockerfile: PathBuf::from("Roadnik/Dockerfile"),
            context: PathBuf::from("."),
            platforms: vec!["linux/amd64".to_string(), "linux/arm64".to_string()],
            repo_env: "DOCKER_REPO".to_string(),
            login_env: "DOCKER_LOGIN".to_string(),
            password_env: "DOCKER_PASSWORD".to_string(),
            extra_tags: vec!["latest".to_string()],
            version_fields: vec![VersionField::new("Version", "{version}")],
            publish: true,
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `roadnik-release.toml` in the project root
/// 3. `roadnik-release.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err(Config)` - If a file exists but cannot be read or parsed
pub fn load_config(config_path: Option<&Path>, root: &Path) -> Result<Config> {
    let path = if let Some(path) = config_path {
        Some(path.to_path_buf())
    } else if root.join(CONFIG_FILE_NAME).exists() {
        Some(root.join(CONFIG_FILE_NAME))
    } else {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    };

    let path = match path {
        Some(path) => path,
        None => {
            log::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
            return Ok(Config::default());
        }
    };

    let content = fs::read_to_string(&path)
        .map_err(|e| ReleaseError::config(format!("cannot read {}: {}", path.display(), e)))?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| ReleaseError::config(format!("cannot parse {}: {}", path.display(), e)))?;

    log::debug!("loaded configuration from {}", path.display());
    Ok(config)
}
