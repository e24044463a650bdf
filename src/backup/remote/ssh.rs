use crate::backup::function_path;
use crate::backup::remote::{RemoteConfig, RemoteTarget, RemoteTransport};
use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::{WithDebugObjectAndFnName, WithMsg};
use function_name::named;
use std::path::Path;
use std::process::{Command, Stdio};

/// Ships artifacts with the system `ssh` and `scp` clients
///
/// Authentication is whatever the user's ssh setup provides (agent, keys,
/// `~/.ssh/config`); the probe runs in batch mode so it never prompts.
#[derive(Clone, Debug)]
pub struct SshTransport {
    config: RemoteConfig,
}

impl SshTransport {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }

    fn probe_command(&self, host: &str) -> Command {
        let mut cmd = Command::new(self.config.ssh_program());
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                self.config.probe_timeout().as_secs()
            ))
            .arg(host)
            .arg("exit")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    fn transfer_command(&self, file: &Path, target: &RemoteTarget) -> Command {
        let mut cmd = Command::new(self.config.scp_program());
        cmd.arg(file).arg(target.spec()).stdin(Stdio::null());
        cmd
    }
}

fn run(mut cmd: Command) -> Result<()> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    tracing::debug!("Running {:?}", cmd);
    let status = cmd
        .status()
        .map_err(Error::from)
        .with_msg(format!("Cannot run {:?}", program))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::command_failed(program, status))
    }
}

impl RemoteTransport for SshTransport {
    #[named]
    fn probe(&self, host: &str) -> Result<()> {
        tracing::info!("Probing remote host {}", host);
        run(self.probe_command(host))
            .map_err(|e| e.chain(Error::RemoteUnreachable(host.to_string())))
            .with_debug_object_and_fn_name(host.to_string(), function_path!())
    }

    #[named]
    fn transfer(&self, file: &Path, target: &RemoteTarget) -> Result<()> {
        tracing::info!("Copying {:?} to {}", file, target);
        run(self.transfer_command(file, target))
            .map_err(|e| {
                e.chain(Error::TransferFailed {
                    file: file.to_path_buf(),
                    remote: target.to_string(),
                })
            })
            .with_debug_object_and_fn_name(target.clone(), function_path!())
    }
}
