//! Local state directory (`~/.chronos`): config, OAuth client file, token
//! cache, and the audit log all live here by default.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub fn chronos_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".chronos"))
}

pub fn ensure_chronos_home() -> Result<PathBuf> {
    let dir = chronos_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}
