use crate::backup::file_ext::BACKUP_FILE_EXTS;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::read_dir;
use std::path::{Path, PathBuf};
use validator::Validate;

static DEFAULT_MAX_AGE: std::time::Duration = std::time::Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone, Validate, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Artifacts whose modification time is further in the past than this are deleted
    #[serde(with = "humantime_serde", default = "default_max_age")]
    pub max_age: std::time::Duration,
}

fn default_max_age() -> std::time::Duration {
    DEFAULT_MAX_AGE
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

impl RetentionConfig {
    pub fn get_delete<R, T, I>(&self, iter: I, now: DateTime<Utc>) -> impl Iterator<Item = R>
    where
        T: TimeZone,
        I: IntoIterator<Item = ItemWithDateTime<R, T>>,
    {
        let max_age = TimeDelta::from_std(self.max_age).unwrap_or(TimeDelta::MAX);
        iter.into_iter()
            .filter(move |r| now.signed_duration_since(r.date_time.to_utc()) > max_age)
            .map(|r| r.item)
    }

    /// Deletes every backup artifact directly under `dir` that is past `max_age`
    ///
    /// Only regular files with one of the artifact extensions are considered,
    /// whichever compression method created them. A file that cannot be
    /// removed is reported and skipped.
    pub fn remove_expired<P: AsRef<Path>>(
        &self,
        dir: P,
        now: DateTime<Utc>,
    ) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let globset = backup_file_globset()?;

        let candidates = read_dir(dir)
            .map_err(Error::from)
            .with_msg(format!("Cannot list backup directory {:?}", dir))?
            .filter_map(|r| r.ok())
            .filter(|de| de.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|de| globset.is_match(de.file_name()))
            .filter_map(|de| {
                let modified = de.metadata().and_then(|md| md.modified());
                match modified {
                    Ok(modified) => Some(ItemWithDateTime::from((
                        de.path(),
                        DateTime::<Utc>::from(modified),
                    ))),
                    Err(e) => {
                        tracing::warn!("Cannot read modification time of {:?}: {e}", de.path());
                        None
                    }
                }
            })
            .collect_vec();

        let removed = self
            .get_delete(candidates, now)
            .filter(|path| {
                tracing::info!("Removing out of retention file {:?}", path);
                match std::fs::remove_file(path) {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!("Failed to remove {:?}: {e}", path);
                        false
                    }
                }
            })
            .collect_vec();

        Ok(removed)
    }
}

/// Matches the file name of any artifact this tool can produce
pub fn backup_file_globset() -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for ext in BACKUP_FILE_EXTS {
        builder.add(Glob::new(&format!("*.{ext}"))?);
    }
    Ok(builder.build()?)
}

#[derive(Clone, Hash, Eq, PartialEq, Debug)]
pub struct ItemWithDateTime<R, T: TimeZone> {
    pub item: R,
    pub date_time: DateTime<T>,
}

impl<R, T: TimeZone> From<(R, DateTime<T>)> for ItemWithDateTime<R, T> {
    fn from(value: (R, DateTime<T>)) -> Self {
        Self {
            item: value.0,
            date_time: value.1,
        }
    }
}
