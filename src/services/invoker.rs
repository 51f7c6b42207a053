use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{timeout_at, Instant};

/// One external program run. Discarded once its output has been classified.
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout_ms: u64,
}

impl ProcessInvocation {
    pub fn new(command: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            timeout_ms,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[cfg(test)]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InvokeError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} timed out after {timeout_ms} ms")]
    Timeout { command: String, timeout_ms: u64 },
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf).await {
        tracing::warn!(bytes = buf.len(), "output pipe read failed, keeping partial text: {e}");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Kills the child's whole process group when dropped. The child leads its
/// own group, so anything it forked goes with it.
struct ProcessGroup {
    leader: Option<u32>,
}

impl ProcessGroup {
    fn kill(&mut self) {
        let Some(pgid) = self.leader.take() else {
            return;
        };
        #[cfg(unix)]
        {
            // ESRCH once every member has exited.
            if unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) } == 0 {
                tracing::debug!(pgid, "killed process group");
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Runs the program once under a hard deadline. The child and everything it
/// started are killed when the deadline passes, when it exits, or when the
/// returned future is dropped.
pub async fn invoke(inv: &ProcessInvocation) -> Result<ProcessOutput, InvokeError> {
    let mut cmd = Command::new(&inv.command);
    cmd.args(&inv.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    if let Some(cwd) = &inv.cwd {
        cmd.current_dir(cwd);
    }

    tracing::debug!(
        command = %inv.command,
        args = ?inv.args,
        timeout_ms = inv.timeout_ms,
        "spawning"
    );
    let mut child = cmd.spawn().map_err(|source| InvokeError::Spawn {
        command: inv.command.clone(),
        source,
    })?;
    let mut group = ProcessGroup { leader: child.id() };

    let deadline = Instant::now() + Duration::from_millis(inv.timeout_ms);
    let mut out_task = tokio::spawn(read_all(child.stdout.take()));
    let mut err_task = tokio::spawn(read_all(child.stderr.take()));

    let timed_out = || InvokeError::Timeout {
        command: inv.command.clone(),
        timeout_ms: inv.timeout_ms,
    };

    let waited = timeout_at(deadline, child.wait()).await;
    let status = match waited {
        Ok(Ok(status)) => status,
        Ok(Err(source)) => {
            out_task.abort();
            err_task.abort();
            return Err(InvokeError::Spawn {
                command: inv.command.clone(),
                source,
            });
        }
        Err(_) => {
            tracing::warn!(
                command = %inv.command,
                timeout_ms = inv.timeout_ms,
                "deadline passed, killing"
            );
            group.kill();
            let _ = child.kill().await;
            out_task.abort();
            err_task.abort();
            return Err(timed_out());
        }
    };

    // A leftover grandchild can hold the pipes open after the child exits.
    let collected = timeout_at(deadline, async {
        let stdout = (&mut out_task).await.unwrap_or_default();
        let stderr = (&mut err_task).await.unwrap_or_default();
        (stdout, stderr)
    })
    .await;
    let (stdout, stderr) = match collected {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(command = %inv.command, "output still open at deadline, killing");
            group.kill();
            out_task.abort();
            err_task.abort();
            return Err(timed_out());
        }
    };
    group.kill();

    tracing::debug!(command = %inv.command, exit_code = ?status.code(), "finished");
    Ok(ProcessOutput {
        stdout,
        stderr,
        exit_code: status.code(),
    })
}
