use std::path::PathBuf;

use anyhow::{Context, Result};

fn app_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join("podgrid"))
}

pub fn database_file_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join("podgrid.db"))
}

pub fn log_file_path() -> Result<PathBuf> {
    Ok(app_data_dir()?.join("podgrid.log"))
}
