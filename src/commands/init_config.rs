use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::config::{self, Config};
use crate::error::ExitError;

#[derive(Debug, Args)]
pub struct InitConfigArgs {
    /// Where to write the file (default: the user config directory)
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl InitConfigArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let path = match &self.path {
            Some(p) => p.clone(),
            None => config::user_config_path()
                .unwrap_or_else(|| PathBuf::from(config::CONFIG_TOML)),
        };
        write_default(&path, self.force)?;
        println!("Wrote {}", path.display());
        Ok(())
    }
}

fn write_default(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        return Err(ExitError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ))
        .into());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let contents = Config::default().to_toml()?;
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
