use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use ocm_auth::RedirectPrompt;

/// Prints the authorize URL to stderr and reads the pasted redirect URL from stdin.
pub struct StdinPrompt;

impl RedirectPrompt for StdinPrompt {
    fn redirect_url(&self, authorize_url: &str) -> Result<String> {
        let mut err = io::stderr().lock();
        writeln!(err, "Open this URL, log in and approve the app:")?;
        writeln!(err, "  {authorize_url}")?;
        write!(err, "Paste the full redirect URL: ")?;
        err.flush()?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read redirect url from stdin failed")?;

        let url = line.trim();
        if url.is_empty() {
            bail!("no redirect url entered");
        }
        Ok(url.to_string())
    }
}
