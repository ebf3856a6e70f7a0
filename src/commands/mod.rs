pub mod init_config;
pub mod releasenotes;
pub mod schema;
pub mod triage;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::board::BoardNaming;
use crate::config::Config;
use crate::error::ExitError;
use crate::github::GitHubClient;
use crate::ui::Screen;

/// Connection options shared by the interactive commands.
#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
    /// Repository as OWNER/NAME (default from config, else apache/incubator-nuttx)
    #[arg(long)]
    pub repo: Option<String>,
    /// Config file (default: ./.nxrelease.toml, then the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Everything an interactive command works with.
pub struct Session {
    pub config: Config,
    pub client: GitHubClient,
    pub naming: BoardNaming,
    pub screen: Screen,
}

impl ConnectArgs {
    pub fn open(&self) -> anyhow::Result<Session> {
        let config = Config::discover(self.config.as_deref())?;
        let repo = config.repo(self.repo.as_deref())?;
        let token = self
            .github_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ExitError::Config("no GitHub token: pass --github-token or set GITHUB_TOKEN".to_string())
            })?;
        tracing::debug!(%repo, "opening session");
        let client = GitHubClient::new(repo, token, &config.github)?;
        let naming = BoardNaming::new(&config.board.prefix);
        Ok(Session {
            config,
            client,
            naming,
            screen: Screen::new(),
        })
    }
}

/// Operator backed out of a prompt. Not an error.
fn cancelled(session: &Session) -> anyhow::Result<()> {
    tracing::debug!("cancelled at prompt");
    session.screen.line("Cancelled.");
    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn progress_bar(message: &str) -> ProgressBar {
    let style = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    ProgressBar::new(0)
        .with_style(style)
        .with_message(message.to_string())
}
