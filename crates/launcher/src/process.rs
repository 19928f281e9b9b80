//! Child process handle and supervision.

use crate::spec::LaunchSpec;
use async_trait::async_trait;
use nix::sys::signal::{self as nix_signal, Signal};
use nix::unistd::Pid;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use tokio::process::Child;
use tokio::signal::unix::{signal, SignalKind};
use tracing::debug;
use vardr_common::{Error, Logger, Result};

/// Handle on a spawned child process.
#[async_trait]
pub trait ChildHandle: Send {
    /// OS process id, `None` once the child has been reaped.
    fn pid(&self) -> Option<u32>;

    /// Wait for the child to exit and return its exit code.
    async fn wait(&mut self) -> Result<i32>;

    /// Deliver `signal` to the child.
    fn signal(&self, signal: Signal) -> Result<()>;
}

/// A child spawned from a [`LaunchSpec`].
#[derive(Debug)]
pub struct ProcessChild {
    child: Child,
    program: String,
}

impl ProcessChild {
    pub fn spawn(spec: &LaunchSpec) -> Result<Self> {
        let child = spec.to_command().spawn().map_err(|e| Error::Launch {
            program: spec.program().to_string(),
            reason: e.to_string(),
        })?;
        debug!(pid = ?child.id(), "Spawned {}", spec.program());
        Ok(Self {
            child,
            program: spec.program().to_string(),
        })
    }
}

#[async_trait]
impl ChildHandle for ProcessChild {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().await?;
        debug!("{} exited with {}", self.program, status);
        Ok(exit_code(status))
    }

    fn signal(&self, signal: Signal) -> Result<()> {
        let pid = self.pid().ok_or_else(|| {
            Error::Other(format!("{} has already exited", self.program))
        })?;
        let pid = i32::try_from(pid)
            .map_err(|_| Error::Other(format!("pid {} out of range", pid)))?;
        nix_signal::kill(Pid::from_raw(pid), signal)
            .map_err(|e| Error::Other(format!("cannot signal pid {}: {}", pid, e)))
    }
}

/// Exit code of a finished process. Death by signal maps to `128 + signo`,
/// the shell convention.
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

/// Wait for `child` to exit, forwarding termination signals to it.
///
/// SIGTERM, SIGINT, SIGHUP and SIGQUIT received by this process are passed
/// on; waiting continues until the child itself exits.
pub async fn supervise<C>(child: &mut C, log: &Logger) -> Result<i32>
where
    C: ChildHandle + ?Sized,
{
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut hup = signal(SignalKind::hangup())?;
    let mut quit = signal(SignalKind::quit())?;

    loop {
        let received = tokio::select! {
            code = child.wait() => return code,
            _ = term.recv() => Signal::SIGTERM,
            _ = int.recv() => Signal::SIGINT,
            _ = hup.recv() => Signal::SIGHUP,
            _ = quit.recv() => Signal::SIGQUIT,
        };

        log.info(format!("Received {}, forwarding to application", received));
        if let Err(e) = child.signal(received) {
            log.warn(format!("Could not forward {} to application: {}", received, e));
        }
    }
}

/// Spawn the child described by `spec` and wait for it.
///
/// Returns the child's exit code; spawn failures are errors.
pub async fn launch(spec: &LaunchSpec, log: &Logger) -> Result<i32> {
    log.info(format!("Running command: {}", spec.command_line()));
    let mut child = ProcessChild::spawn(spec)?;
    supervise(&mut child, log).await
}
