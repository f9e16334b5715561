use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{ConnectionError, Result};
use crate::line_prefixer::LinePrefixer;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything a launcher needs to start one worker.
///
/// The worker receives the endpoint as its only argument.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub component: String,
    pub endpoint: PathBuf,
    pub temp_dir: PathBuf,
    pub envs: Vec<(OsString, OsString)>,
}

impl WorkerCommand {
    /// Points the worker's temp-dir variables at `temp_dir`.
    pub fn new(
        component: impl Into<String>,
        endpoint: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        let temp_dir = temp_dir.into();
        let envs = ["TMPDIR", "TMP", "TEMP"]
            .into_iter()
            .map(|key| (OsString::from(key), temp_dir.clone().into_os_string()))
            .collect();
        Self {
            component: component.into(),
            endpoint: endpoint.into(),
            temp_dir,
            envs,
        }
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn env_value(&self, key: &str) -> Option<&OsString> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// A running worker as seen by the supervisor.
pub trait WorkerProcess {
    fn id(&self) -> Option<u32>;

    fn is_running(&mut self) -> bool;

    /// Wait up to `timeout` for the worker to exit. Returns whether it has.
    fn wait_for_exit(&mut self, timeout: Duration) -> bool;

    /// Ask the worker to stop. Returns `false` when the platform has no soft
    /// termination or the request could not be delivered.
    fn terminate(&mut self) -> bool;

    /// Stop the worker unconditionally.
    fn kill(&mut self) -> bool;

    /// Exit code once the worker has exited, if it exited normally.
    fn exit_code(&self) -> Option<i32>;
}

/// Starts workers for a [`ConnectionClient`](crate::ConnectionClient).
pub trait WorkerLauncher {
    fn launch(&mut self, command: &WorkerCommand) -> Result<Box<dyn WorkerProcess>>;
}

/// Launches a worker executable.
///
/// Worker stdout and stderr are read on background threads and forwarded to
/// `tracing` line by line with a `<component>.stdout: ` style prefix.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    program: PathBuf,
    envs: Vec<(OsString, OsString)>,
}

impl CommandLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            envs: Vec::new(),
        }
    }

    /// Extra environment for every worker this launcher starts. Values from
    /// the [`WorkerCommand`] take precedence.
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl WorkerLauncher for CommandLauncher {
    fn launch(&mut self, command: &WorkerCommand) -> Result<Box<dyn WorkerProcess>> {
        let mut child = Command::new(&self.program)
            .arg(&command.endpoint)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .envs(command.envs.iter().map(|(k, v)| (k, v)))
            .current_dir(&command.temp_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ConnectionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut forwarders = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            forwarders.push(forward_output(stdout, format!("{}.stdout: ", command.component)));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(forward_output(stderr, format!("{}.stderr: ", command.component)));
        }

        info!(
            pid = child.id(),
            program = ?self.program,
            endpoint = ?command.endpoint,
            "worker spawned"
        );
        Ok(Box::new(ChildProcess {
            child,
            status: None,
            forwarders,
        }))
    }
}

fn forward_output(mut source: impl Read + Send + 'static, prefix: String) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let mut prefixer = LinePrefixer::new(prefix);
        let mut chunk = [0u8; 4096];
        loop {
            match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    for line in prefixer.prefix(&chunk[..n]) {
                        info!("{line}");
                    }
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    debug!(prefix = prefixer.prefix_str(), error = %err, "worker output closed");
                    break;
                }
            }
        }
        if let Some(line) = prefixer.flush() {
            info!("{line}");
        }
    })
}

/// A worker started by [`CommandLauncher`].
pub struct ChildProcess {
    child: Child,
    status: Option<ExitStatus>,
    forwarders: Vec<JoinHandle<()>>,
}

impl ChildProcess {
    fn poll_status(&mut self) -> Option<ExitStatus> {
        if self.status.is_none() {
            match self.child.try_wait() {
                Ok(status) => self.status = status,
                Err(err) => warn!(pid = self.child.id(), error = %err, "failed to poll worker"),
            }
        }
        self.status
    }
}

impl WorkerProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn is_running(&mut self) -> bool {
        self.poll_status().is_none()
    }

    fn wait_for_exit(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.poll_status().is_some() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }
    }

    #[cfg(unix)]
    fn terminate(&mut self) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if self.poll_status().is_some() {
            return true;
        }
        let Ok(raw) = i32::try_from(self.child.id()) else {
            return false;
        };
        match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => true,
            // Already gone; the next status poll reaps it.
            Err(Errno::ESRCH) => true,
            Err(err) => {
                warn!(pid = raw, error = %err, "failed to send SIGTERM to worker");
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn terminate(&mut self) -> bool {
        false
    }

    fn kill(&mut self) -> bool {
        if self.poll_status().is_some() {
            return true;
        }
        match self.child.kill() {
            Ok(()) => true,
            Err(err) => {
                warn!(pid = self.child.id(), error = %err, "failed to kill worker");
                false
            }
        }
    }

    fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|status| status.code())
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.poll_status().is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
        for forwarder in self.forwarders.drain(..) {
            if forwarder.is_finished() {
                let _ = forwarder.join();
            }
        }
    }
}
