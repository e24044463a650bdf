use crate::backup::compress::xz::XzConfig;
use crate::backup::notifications::NotificationConfig;
use crate::backup::remote::RemoteConfig;
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::WithMsg;
use crate::backup::retention::RetentionConfig;
use crate::backup::status_log::LogRotationConfig;
use crate::backup::validate::validate_writable_dir;
use bon::Builder;
use getset::{CopyGetters, Getters};
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fs::File;
use std::path::{Path, PathBuf};
use validator::Validate;

pub static DEFAULT_COMPRESSION: &str = "gzip";

/// Tunables read from the optional YAML settings file
///
/// Every section may be left out, defaults reproduce the stock behaviour:
/// seven days of retention, log rotation at 10 MiB, five second probe timeout.
#[skip_serializing_none]
#[derive(Clone, Default, Debug, Serialize, Deserialize, Validate, Builder, Getters)]
#[serde(default, deny_unknown_fields)]
#[getset(get = "pub")]
pub struct Settings {
    #[builder(default)]
    retention: RetentionConfig,
    #[validate(nested)]
    #[builder(default)]
    log_rotation: LogRotationConfig,
    #[validate(nested)]
    #[builder(default)]
    remote: RemoteConfig,
    #[validate(nested)]
    #[builder(default)]
    xz: XzConfig,
    #[validate(nested)]
    notification: Option<NotificationConfig>,
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        File::open(path)
            .map_err(Error::from)
            .and_then(|f| serde_yml::from_reader::<_, Settings>(f).map_err(Error::from))
            .with_msg(format!("Parse YAML settings failed: {:?}", path))
            .and_then(|settings| {
                settings
                    .validate()
                    .map_err(Error::from)
                    .map(|_| settings)
                    .with_msg(format!("Settings validation failed: {:?}", path))
            })
    }
}

/// Everything one backup run needs
///
/// The compression method is kept as given and only parsed when the archive
/// step starts, so an unknown method is reported as a failed backup.
#[derive(Clone, Debug, Validate, Builder, Getters, CopyGetters)]
pub struct BackupConfig {
    #[getset(get = "pub")]
    #[builder(into)]
    source_dir: PathBuf,
    #[validate(custom(function = validate_writable_dir))]
    #[getset(get = "pub")]
    #[builder(into)]
    dest_dir: PathBuf,
    #[getset(get = "pub")]
    #[builder(default = DEFAULT_COMPRESSION.to_string(), into)]
    compression: String,
    #[getset(get = "pub")]
    #[builder(into)]
    remote: Option<String>,
    #[getset(get = "pub")]
    email: Option<Mailbox>,
    #[validate(nested)]
    #[getset(get = "pub")]
    #[builder(default)]
    settings: Settings,
    #[getset(get_copy = "pub")]
    #[builder(default = true)]
    show_progress: bool,
}
