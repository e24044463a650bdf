use clap::Parser;
use dir_backup::backup::backup_config::{BackupConfig, Settings, DEFAULT_COMPRESSION};
use dir_backup::backup::pipeline::{notify_outcome, run_backup};
use dir_backup::backup::remote::ssh::SshTransport;
use lettre::message::Mailbox;
use std::path::PathBuf;
use std::process::exit;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Back up a directory into a timestamped archive, prune old ones and optionally copy it to a remote host
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory to back up
    #[arg(short, long)]
    source: PathBuf,

    /// Existing directory the archive is written to
    #[arg(short, long)]
    dest: PathBuf,

    /// Compression method: gzip, bzip2, xz or zip
    #[arg(short, long, default_value = DEFAULT_COMPRESSION)]
    compression: String,

    /// Remote destination for scp, e.g. user@host:/remote/path
    #[arg(short, long)]
    remote: Option<String>,

    /// Mail the outcome to this address (needs notification settings)
    #[arg(short, long)]
    email: Option<Mailbox>,

    /// YAML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Do not draw the progress bar
    #[arg(long)]
    no_progress: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            exit(if e.use_stderr() { 1 } else { 0 });
        }
    };
    init_tracing();

    let settings = match args.config.as_ref().map(Settings::load).transpose() {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };

    let transport = SshTransport::new(settings.remote().clone());
    let config = BackupConfig::builder()
        .source_dir(args.source)
        .dest_dir(args.dest)
        .compression(args.compression)
        .maybe_remote(args.remote)
        .maybe_email(args.email)
        .settings(settings)
        .show_progress(!args.no_progress)
        .build();

    let res = run_backup(&config, &transport, chrono::Local::now());
    notify_outcome(&config, &res);

    match res {
        Ok(outcome) => {
            tracing::info!("Backup finished: {:?}", outcome.artifact());
            exit(0)
        }
        Err(e) => {
            error!("{e}");
            exit(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_missing_required_args_exit_with_failure() {
        for argv in [
            vec!["dir_backup"],
            vec!["dir_backup", "-s", "/srv/data"],
            vec!["dir_backup", "-d", "/backups"],
        ] {
            let err = Args::try_parse_from(argv.clone()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
            assert!(err.use_stderr(), "{argv:?} should exit 1");
        }
    }

    #[test]
    fn test_help_and_version_exit_cleanly() {
        let help = Args::try_parse_from(["dir_backup", "--help"]).unwrap_err();
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
        assert!(!help.use_stderr());

        let version = Args::try_parse_from(["dir_backup", "--version"]).unwrap_err();
        assert_eq!(version.kind(), ErrorKind::DisplayVersion);
        assert!(!version.use_stderr());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["dir_backup", "-s", "/srv/data", "-d", "/backups"]).unwrap();
        assert_eq!(args.compression, "gzip");
        assert!(args.remote.is_none());
        assert!(args.email.is_none());
        assert!(args.config.is_none());
        assert!(!args.no_progress);
    }

    #[test]
    fn test_unknown_method_passes_parsing() {
        let args = Args::try_parse_from([
            "dir_backup", "-s", "/srv/data", "-d", "/backups", "-c", "rar", "-r", "u@nas:/b",
            "-e", "ops@example.com",
        ])
        .unwrap();
        assert_eq!(args.compression, "rar");
        assert_eq!(args.remote.as_deref(), Some("u@nas:/b"));
        assert_eq!(args.email.unwrap().email.to_string(), "ops@example.com");
    }

    #[test]
    fn test_malformed_email_is_usage_error() {
        let err = Args::try_parse_from(["dir_backup", "-s", "a", "-d", "b", "-e", "not an address"])
            .unwrap_err();
        assert!(err.use_stderr());
    }
}
