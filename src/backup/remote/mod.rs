pub mod ssh;

use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use bon::Builder;
use derive_more::Display;
use getset::Getters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use validator::{Validate, ValidationError};

static DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A `user@host:/remote/path` copy destination
///
/// The host part is everything before the first `:`, the user included, which
/// is the form both `ssh` and `scp` take.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display("{spec}")]
pub struct RemoteTarget {
    spec: String,
    host_len: usize,
}

impl RemoteTarget {
    pub fn host(&self) -> &str {
        &self.spec[..self.host_len]
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }
}

impl FromStr for RemoteTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((host, _)) if !host.trim().is_empty() => Ok(Self {
                spec: s.to_string(),
                host_len: host.len(),
            }),
            _ => Err(Error::InvalidRemoteSpec(s.to_string())),
        }
    }
}

/// How the artifact leaves the machine
pub trait RemoteTransport {
    /// Checks that `host` accepts a non-interactive login
    fn probe(&self, host: &str) -> Result<()>;

    /// Copies `file` to `target`
    fn transfer(&self, file: &Path, target: &RemoteTarget) -> Result<()>;
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct RemoteConfig {
    /// Connect timeout of the reachability probe
    #[serde(with = "humantime_serde", default = "default_probe_timeout")]
    #[validate(custom(function = validate_probe_timeout))]
    #[builder(default = DEFAULT_PROBE_TIMEOUT)]
    probe_timeout: Duration,
    #[serde(default = "default_ssh_program")]
    #[validate(length(min = 1))]
    #[builder(default = default_ssh_program(), into)]
    ssh_program: String,
    #[serde(default = "default_scp_program")]
    #[validate(length(min = 1))]
    #[builder(default = default_scp_program(), into)]
    scp_program: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn default_probe_timeout() -> Duration {
    DEFAULT_PROBE_TIMEOUT
}

fn default_ssh_program() -> String {
    "ssh".to_string()
}

fn default_scp_program() -> String {
    "scp".to_string()
}

fn validate_probe_timeout(timeout: &Duration) -> std::result::Result<(), ValidationError> {
    if timeout.as_secs() == 0 {
        return Err(ValidationError::new("InvalidProbeTimeout")
            .with_message("probe_timeout must be at least one second".into()));
    }

    Ok(())
}
