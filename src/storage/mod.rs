//! Storage layer
//!
//! Data-directory resolution and the detection history journal. All
//! persistence here is flat JSON files; the catalog module does its own
//! (read-only) loading.

pub mod history;

use anyhow::Result;
use std::path::{Path, PathBuf};

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "traytill", "TrayTill")
        .ok_or_else(|| anyhow::anyhow!("Could not determine application directories"))
}

/// Get the application data directory, creating it if needed
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = project_dirs()?.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

/// Get the configuration directory, creating it if needed
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}

/// Resolve a configured file path: absolute paths pass through, relative
/// ones land in the data directory (falling back to the working directory
/// when no data directory is available).
pub fn resolve_data_path(configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        return configured.to_path_buf();
    }
    match get_data_dir() {
        Ok(dir) => dir.join(configured),
        Err(_) => configured.to_path_buf(),
    }
}
