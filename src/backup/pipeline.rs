//! One backup run: validate, archive, verify, prune, rotate the log, ship.
//!
//! Every stage blocks until the previous one is done. Failures of the archive,
//! verification and remote stages are written to the status log and echoed on
//! the console before the error is returned; nothing already produced is
//! rolled back.

use crate::backup::archive::source::SourceTree;
use crate::backup::archive::{artifact_file_name, create_artifact, CompressionMethod};
use crate::backup::backup_config::BackupConfig;
use crate::backup::notifications::Notification;
use crate::backup::progress::progress_bar;
use crate::backup::remote::{RemoteTarget, RemoteTransport};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::status_log::StatusLog;
use chrono::{DateTime, Local};
use getset::{CopyGetters, Getters};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use validator::Validate;

/// What a successful run left behind
#[derive(Clone, Debug, Getters, CopyGetters)]
pub struct BackupOutcome {
    #[getset(get = "pub")]
    artifact: PathBuf,
    #[getset(get = "pub")]
    removed: Vec<PathBuf>,
    #[getset(get_copy = "pub")]
    log_rotated: bool,
    #[getset(get = "pub")]
    shipped_to: Option<RemoteTarget>,
}

/// Runs every stage once, `now` naming the artifact and anchoring retention
pub fn run_backup<T: RemoteTransport>(
    config: &BackupConfig,
    transport: &T,
    now: DateTime<Local>,
) -> Result<BackupOutcome> {
    config.validate()?;
    let mut log = StatusLog::open(config.dest_dir())?;

    if !config.source_dir().is_dir() {
        let err = Error::SourceNotFound(config.source_dir().clone());
        return Err(log_failure(&mut log, format!("Error: {err}"), err));
    }

    let remote = match config.remote().as_deref().map(str::parse::<RemoteTarget>) {
        Some(Err(err)) => return Err(log_failure(&mut log, format!("Error: {err}"), err)),
        Some(Ok(target)) => Some(target),
        None => None,
    };

    log.log(format!(
        "Starting backup of {:?} to {:?} ({})",
        config.source_dir(),
        config.dest_dir(),
        config.compression()
    ))?;

    let artifact = match archive_source(config, now) {
        Ok(artifact) => artifact,
        Err(err) => return Err(log_failure(&mut log, format!("Backup failed: {err}"), err)),
    };

    verify_artifact(&artifact, &mut log)?;

    let removed = config
        .settings()
        .retention()
        .remove_expired(config.dest_dir(), now.to_utc())?;
    tracing::info!("Removed {} expired backup(s)", removed.len());

    let log_rotated = log.rotate_if_needed(config.settings().log_rotation())?;

    if let Some(target) = &remote {
        ship(transport, &artifact, target, &mut log)?;
    }

    Ok(BackupOutcome {
        artifact,
        removed,
        log_rotated,
        shipped_to: remote,
    })
}

/// Sizes the source, then archives it with the configured method
///
/// The method string is parsed here rather than up front, so an unknown
/// method fails the same way an archiver error does.
fn archive_source(config: &BackupConfig, now: DateTime<Local>) -> Result<PathBuf> {
    let source = SourceTree::new(config.source_dir())?.excluding(config.dest_dir())?;
    let total_size = source.total_size()?;
    tracing::info!("Source {:?} holds {} bytes", source.dir(), total_size);

    let method: CompressionMethod = config.compression().parse()?;
    let format = method.archive_format(config.settings().xz());
    let out_path = config
        .dest_dir()
        .join(artifact_file_name(&source.base_name(), &now, &format));

    let progress = progress_bar(total_size, config.show_progress());
    let res = create_artifact(&format, &source, &out_path, &progress);
    progress.finish_and_clear();
    res
}

fn verify_artifact(artifact: &Path, log: &mut StatusLog) -> Result<()> {
    let non_empty = artifact
        .metadata()
        .map(|md| md.is_file() && md.len() > 0)
        .unwrap_or(false);

    if non_empty {
        log.success(format!("Backup successful: {}", artifact.display()))
    } else {
        Err(log_failure(
            log,
            format!("Backup verification failed: {}", artifact.display()),
            Error::VerificationFailed(artifact.to_path_buf()),
        ))
    }
}

fn ship<T: RemoteTransport>(
    transport: &T,
    artifact: &Path,
    target: &RemoteTarget,
    log: &mut StatusLog,
) -> Result<()> {
    if let Err(err) = transport.probe(target.host()) {
        tracing::error!("{err}");
        let msg = format!("Error: Remote host {} is unreachable", target.host());
        return Err(log_failure(log, msg, err));
    }

    match transport.transfer(artifact, target) {
        Ok(_) => log.success(format!("Backup copied to remote: {target}")),
        Err(err) => {
            tracing::error!("{err}");
            let msg = format!("Failed to copy backup to remote: {target}");
            Err(log_failure(log, msg, err))
        }
    }
}

/// Records `msg` as a failure and hands back `err`, with the log write error appended if that failed too
fn log_failure<D: Display>(log: &mut StatusLog, msg: D, err: Error) -> Error {
    match log.failure(msg) {
        Ok(_) => err,
        Err(log_err) => err.chain(log_err),
    }
}

/// Mails the outcome when an address was given and a notifier is configured
///
/// Never fails the run, problems are only traced.
pub fn notify_outcome(config: &BackupConfig, res: &Result<BackupOutcome>) {
    let Some(to) = config.email() else {
        return;
    };
    let Some(notifier) = config.settings().notification() else {
        tracing::warn!("No notification settings, not mailing {}", to);
        return;
    };

    let source = config.source_dir().display();
    let (topic, msg) = match res {
        Ok(outcome) => (
            format!("Backup succeeded: {source}"),
            format!("Created {}", outcome.artifact().display()),
        ),
        Err(err) => (format!("Backup failed: {source}"), err.to_string()),
    };

    if let Err(err) = notifier.send(to, topic, msg) {
        tracing::warn!("Notification failed: {err}");
    }
}
