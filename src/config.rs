use std::path::{Path, PathBuf};

use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ExitError;
use crate::github::RepoId;

/// Config file name looked up in the working directory.
pub const CONFIG_TOML: &str = ".nxrelease.toml";

/// Find the config file: working directory first, then the user config dir.
/// Returns None if neither exists.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let local = dir.join(CONFIG_TOML);
    if local.exists() {
        return Some(local);
    }
    let user = user_config_path()?;
    user.exists().then_some(user)
}

/// `<config dir>/nxrelease/config.toml`, e.g. `~/.config/nxrelease/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nxrelease").join("config.toml"))
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    /// Pager command used for diffs (falls back to $PAGER, then `less -R`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pager: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GithubConfig {
    /// Repository in OWNER/NAME form
    #[serde(default = "default_repo")]
    pub repo: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            api_url: default_api_url(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BoardConfig {
    /// Name prefix shared by every release-notes board
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

/// Which branches and tags are shown as candidate window boundaries.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoryConfig {
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default = "default_release_branch_pattern")]
    pub release_branch_pattern: String,
    #[serde(default = "default_tag_pattern")]
    pub tag_pattern: String,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
            release_branch_pattern: default_release_branch_pattern(),
            tag_pattern: default_tag_pattern(),
            lookback_days: default_lookback_days(),
        }
    }
}

// Default value functions for serde
fn default_repo() -> String { "apache/incubator-nuttx".into() }
fn default_api_url() -> String { "https://api.github.com".into() }
fn default_timeout() -> u64 { 30 }
fn default_prefix() -> String { "Release Notes - ".into() }
fn default_branch() -> String { "master".into() }
fn default_release_branch_pattern() -> String { "^releases/".into() }
fn default_tag_pattern() -> String { r"^nuttx-\d+\.\d+\.\d+".into() }
fn default_lookback_days() -> u32 { 365 }

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse_toml(&contents)
    }

    /// Load from an explicit path, or discover one, or fall back to defaults.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ExitError::Config(format!("{} does not exist", path.display())).into());
            }
            return Self::load(path);
        }
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        match find_config(&cwd) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string.
    pub fn parse_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| ExitError::Config(format!("invalid {CONFIG_TOML}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (key, pattern) in [
            ("history.release_branch_pattern", &self.history.release_branch_pattern),
            ("history.tag_pattern", &self.history.tag_pattern),
        ] {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(ExitError::Config(format!("{key} is not a valid regex: {e}")).into());
            }
        }
        if self.board.prefix.trim().is_empty() {
            return Err(ExitError::Config("board.prefix must not be empty".to_string()).into());
        }
        Ok(())
    }

    /// Pick the repository: command-line value first, then the config file.
    pub fn repo(&self, cli: Option<&str>) -> anyhow::Result<RepoId> {
        let raw = cli.unwrap_or(&self.github.repo);
        raw.parse::<RepoId>()
            .map_err(|e| ExitError::Config(e.to_string()).into())
    }

    /// Pager command: config, then $PAGER, then `less -R`.
    pub fn pager_command(&self) -> String {
        self.pager
            .clone()
            .or_else(|| std::env::var("PAGER").ok().filter(|p| !p.trim().is_empty()))
            .unwrap_or_else(|| "less -R".to_string())
    }

    /// Serialize config to a TOML string with helpful comments.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        let raw = toml::to_string_pretty(self).context("serializing config to TOML")?;

        let mut doc: toml_edit::DocumentMut = raw
            .parse()
            .context("parsing generated TOML for comment injection")?;

        doc.decor_mut()
            .set_prefix("# nxrelease configuration\n# Command-line flags take precedence over these values.\n\n");

        fn set_table_comment(doc: &mut toml_edit::DocumentMut, key: &str, comment: &str) {
            if let Some(tbl) = doc.get_mut(key).and_then(|item| item.as_table_mut()) {
                tbl.decor_mut().set_prefix(comment);
            }
        }

        set_table_comment(&mut doc, "github", "# Repository and API endpoint\n");
        set_table_comment(&mut doc, "board", "\n# Release-notes boards are recognised by this name prefix\n");
        set_table_comment(
            &mut doc,
            "history",
            "\n# Branches and tags listed when choosing the merge window\n",
        );

        Ok(doc.to_string())
    }
}
