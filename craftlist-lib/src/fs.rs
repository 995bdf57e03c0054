use std::{fs::create_dir_all, path::PathBuf};

use chrono::{DateTime, Local};
use xdg::BaseDirectories;

use crate::{Error, Result};

/// Returns the path to the craftlist configuration directory. If it doesn't exist when this
/// function is called, it will be created.
pub fn config_dir() -> Result<PathBuf> {
    ensure(xdg_prefix().get_config_home())
}

/// Returns the path to the craftlist data directory. If it doesn't exist when this function is
/// called, it will be created.
pub fn data_dir() -> Result<PathBuf> {
    ensure(xdg_prefix().get_data_home())
}

/// Where a database backup taken now is written when no path is given.
pub fn backup_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(backup_file_name(Local::now())))
}

fn backup_file_name(time: DateTime<Local>) -> String {
    format!("lists-{}.db.bak", time.format("%Y%m%d-%H%M%S"))
}

/// Returns the path to the craftlist state directory. If it doesn't exist when this function is
/// called, it will be created.
pub fn state_dir() -> Result<PathBuf> {
    ensure(xdg_prefix().get_state_home())
}

fn ensure(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = path.ok_or(Error::NoHome)?;

    create_dir_all(&path)?;

    Ok(path)
}

fn xdg_prefix() -> BaseDirectories {
    xdg::BaseDirectories::with_prefix("craftlist")
}
