//! Child-process plumbing for the eos and xrdcopy binaries.
//!
//! Both binaries talk to the MGM themselves; this module only prepares the
//! environment, captures their output and maps exit codes onto the error
//! taxonomy. Dropping the returned future kills the child, so caller
//! cancellation propagates.

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::identity::UnixIdentity;
use crate::options::ClientOptions;

/// Exit code the binaries use for a missing entry.
const EXIT_NOT_FOUND: i32 = 2;
/// Exit code reported when the user is not allowed to enter the instance.
const EXIT_PERMISSION_DENIED: i32 = 22;

/// Runs the eos and xrdcopy binaries with the backend environment.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    opts: Arc<ClientOptions>,
}

impl CommandRunner {
    pub fn new(opts: Arc<ClientOptions>) -> Self {
        Self { opts }
    }

    /// Run `eos -r <uid> <gid> <args...>` and return its stdout.
    pub async fn eos(
        &self,
        identity: UnixIdentity,
        args: &[&str],
    ) -> Result<String, ClientError> {
        let mut cmd = Command::new(&self.opts.eos_binary);
        cmd.arg("-r")
            .arg(identity.uid.to_string())
            .arg(identity.gid.to_string())
            .args(args);
        self.run(cmd).await
    }

    /// Run `xrdcopy <args...>`.
    pub async fn xrdcopy(&self, args: &[&str]) -> Result<(), ClientError> {
        let mut cmd = Command::new(&self.opts.xrdcopy_binary);
        cmd.args(args);
        self.run(cmd).await.map(|_| ())
    }

    async fn run(&self, mut cmd: Command) -> Result<String, ClientError> {
        cmd.env_clear().env("EOS_MGM_URL", &self.opts.mgm_url);
        if self.opts.use_keytab {
            cmd.env("XrdSecPROTOCOL", &self.opts.sec_protocol);
            cmd.env("XrdSecSSSKT", &self.opts.keytab);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = ?cmd.as_std(), "spawning backend command");
        let output = cmd.output().await?;
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let code = output.status.code();
        info!(exit = ?code, "backend command finished");

        match code {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            Some(EXIT_NOT_FOUND) => Err(ClientError::NotFound(stderr)),
            Some(EXIT_PERMISSION_DENIED) => Err(ClientError::PermissionDenied(stderr)),
            Some(c) => Err(ClientError::Internal(format!(
                "command exited with status {c}: {stderr}"
            ))),
            None => Err(ClientError::Internal(format!(
                "command terminated by signal: {stderr}"
            ))),
        }
    }
}
