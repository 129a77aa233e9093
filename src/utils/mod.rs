use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::PathBuf;

pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Root of all persisted bridge state: `$NANOBOT_HOME`, else `~/.nanobot`.
pub fn get_nanobot_home() -> Result<PathBuf> {
    resolve_home(std::env::var_os("NANOBOT_HOME"))
}

fn resolve_home(override_dir: Option<OsString>) -> Result<PathBuf> {
    if let Some(home) = override_dir.filter(|h| !h.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    Ok(dirs::home_dir()
        .context("Could not determine home directory")?
        .join(".nanobot"))
}

#[cfg(test)]
mod tests;
