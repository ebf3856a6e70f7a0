use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::Context;

/// External pager (e.g. `less -R`) fed through stdin.
pub struct Pager {
    program: String,
    args: Vec<String>,
}

impl Pager {
    /// Build from a command line such as `less -R` or `bat --style=plain`.
    pub fn new(command: &str) -> anyhow::Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("pager command is empty"))?
            .to_string();
        Ok(Self {
            program,
            args: parts.map(str::to_string).collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Show `text` in the pager and wait for the operator to close it.
    ///
    /// Returns `Ok(false)` when the pager is not installed so the caller can
    /// print the text instead.
    pub fn page(&self, text: &str) -> anyhow::Result<bool> {
        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(pager = %self.program, "pager not found");
                return Ok(false);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("spawning {}", self.program)));
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            // The operator may quit before reading everything.
            if let Err(e) = stdin.write_all(text.as_bytes())
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(anyhow::Error::new(e).context(format!("writing to {}", self.program)));
            }
        }
        child
            .wait()
            .with_context(|| format!("waiting for {}", self.program))?;
        Ok(true)
    }
}
