//! # dir_backup
//!
//! One-shot directory backup: archive a source directory into a timestamped,
//! compressed file, prune old archives, keep a rotating status log and
//! optionally ship the result to a remote host over ssh.
//!
//! ## Features
//!
//! - **Formats**: `tar.gz`, `tar.bz2`, `tar.xz` (optionally multi-threaded) and `zip`
//! - **Retention**: archives older than seven days are removed from the destination
//! - **Status log**: `backup.log` in the destination, rotated to `backup.log.old`
//! - **Remote copy**: reachability probe with `ssh`, then `scp`
//! - **Notification**: optional SMTP mail with the run outcome
//!
//! ## Quick Start
//!
//! ```no_run
//! use dir_backup::backup::backup_config::{BackupConfig, Settings};
//! use dir_backup::backup::pipeline::run_backup;
//! use dir_backup::backup::remote::ssh::SshTransport;
//!
//! let settings = Settings::default();
//! let transport = SshTransport::new(settings.remote().clone());
//! let config = BackupConfig::builder()
//!     .source_dir("/srv/data")
//!     .dest_dir("/backups")
//!     .compression("xz")
//!     .settings(settings)
//!     .build();
//!
//! let outcome = run_backup(&config, &transport, chrono::Local::now())?;
//! println!("{}", outcome.artifact().display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backup;
