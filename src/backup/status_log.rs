//! The `backup.log` status file kept next to the artifacts.
//!
//! Every line is `YYYY-mm-dd HH:MM:SS - <message>`. The file holds two
//! generations at most: once it grows past the configured size it is moved to
//! `backup.log.old` and a fresh empty log takes its place.

use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use bon::Builder;
use chrono::Local;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use validator::Validate;

pub static LOG_FILE_NAME: &str = "backup.log";
pub static ROTATED_LOG_FILE_NAME: &str = "backup.log.old";
static LINE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
static DEFAULT_MAX_SIZE_KB: u64 = 10240;

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Builder, CopyGetters)]
#[serde(deny_unknown_fields)]
#[getset(get_copy = "pub")]
pub struct LogRotationConfig {
    /// Rotate once the log reaches this many kilobytes
    #[validate(range(min = 1))]
    #[serde(default = "default_max_size_kb")]
    #[builder(default = default_max_size_kb())]
    max_size_kb: u64,
}

fn default_max_size_kb() -> u64 {
    DEFAULT_MAX_SIZE_KB
}

impl Default for LogRotationConfig {
    fn default() -> Self {
        Self {
            max_size_kb: DEFAULT_MAX_SIZE_KB,
        }
    }
}

#[derive(Debug, Getters)]
pub struct StatusLog {
    #[getset(get = "pub")]
    path: PathBuf,
    file: File,
}

impl StatusLog {
    /// Opens `<dir>/backup.log` for appending, creating it when missing
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(LOG_FILE_NAME);
        let file = open_append(&path)?;
        Ok(Self { path, file })
    }

    #[cfg(test)]
    pub(crate) fn replace_file(&mut self, file: File) {
        self.file = file;
    }

    pub fn rotated_path(&self) -> PathBuf {
        self.path.with_file_name(ROTATED_LOG_FILE_NAME)
    }

    /// Appends one timestamped line
    pub fn log<D: Display>(&mut self, msg: D) -> Result<()> {
        writeln!(self.file, "{} - {}", Local::now().format(LINE_TIME_FORMAT), msg)
            .map_err(Error::from)
            .with_msg(format!("Cannot write to log file {:?}", self.path))
    }

    /// Logs `msg` and echoes it on stdout with a success mark
    pub fn success<D: Display>(&mut self, msg: D) -> Result<()> {
        println!("\u{2714} {msg}");
        self.log(msg)
    }

    /// Logs `msg` and echoes it on stderr with a failure mark
    pub fn failure<D: Display>(&mut self, msg: D) -> Result<()> {
        eprintln!("\u{2718} {msg}");
        self.log(msg)
    }

    /// Current size in whole kilobytes
    pub fn size_kb(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len() / 1024)
    }

    /// Moves the log to `backup.log.old` and starts an empty one when it is too big
    ///
    /// A previous `.old` generation is replaced. Returns whether a rotation happened.
    pub fn rotate_if_needed(&mut self, config: &LogRotationConfig) -> Result<bool> {
        let size_kb = self.size_kb()?;
        if size_kb < config.max_size_kb {
            return Ok(false);
        }

        let rotated = self.rotated_path();
        tracing::info!(
            "Rotating log file {:?} ({} KB) to {:?}",
            self.path,
            size_kb,
            rotated
        );
        self.file.flush()?;
        std::fs::rename(&self.path, &rotated)
            .map_err(Error::from)
            .with_msg(format!("Cannot rotate log file {:?}", self.path))?;
        self.file = open_append(&self.path)?;
        Ok(true)
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(Error::from)
        .with_msg(format!("Cannot open log file {:?}", path))
}
