//! Tunnel process supervision.
//!
//! One [`TunnelSupervisor`] serves a whole run. Each call to
//! [`TunnelSupervisor::connect`] resolves the binary, materializes
//! credentials, spawns the process for one configuration, and watches its
//! merged output until a connected signature appears. The returned
//! [`TunnelSession`] owns the process and any transient credentials until
//! shutdown.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use surveyhop_core::{Settings, TunnelConfig, TunnelError, TunnelGuard, TunnelProvider};

use crate::classify::{LineClass, classify};
use crate::credentials::{CredentialFile, CredentialSource, provision};
use crate::resolve::resolve_binary;

/// How often the output/exit poll loop wakes up.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a signalled process gets to exit before it is killed.
const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Lifecycle of one tunnel process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    Starting,
    Connected,
    Terminating,
    Terminated,
    Failed,
}

/// How the tunnel binary is invoked.
///
/// Tunnel daemons need root to create their interface and rewrite routes,
/// so a non-root run goes through non-interactive sudo. A password prompt
/// would stall the whole cycle, `-n` turns it into an immediate failure
/// instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Run the binary directly (already root).
    Direct,
    /// Prefix with `sudo -n`.
    Sudo,
}

impl Launch {
    /// Pick based on the effective uid of this process.
    pub fn detect() -> Self {
        if nix::unistd::geteuid().is_root() {
            Launch::Direct
        } else {
            Launch::Sudo
        }
    }
}

/// Spawns and supervises tunnel processes, one at a time.
pub struct TunnelSupervisor {
    binary: PathBuf,
    auth_file: Option<PathBuf>,
    auth_username: Option<String>,
    auth_secret: Option<String>,
    connect_timeout: Duration,
    launch: Launch,
}

impl TunnelSupervisor {
    pub fn new(settings: &Settings) -> Self {
        Self::with_launch(settings, Launch::detect())
    }

    /// Supervisor with an explicit launch mode. Tests use this so results
    /// do not depend on the uid of the test runner.
    pub fn with_launch(settings: &Settings, launch: Launch) -> Self {
        Self {
            binary: settings.tunnel_bin.clone(),
            auth_file: settings.auth_file.clone(),
            auth_username: settings.auth_username.clone(),
            auth_secret: settings.auth_secret.clone(),
            connect_timeout: settings.connect_timeout,
            launch,
        }
    }

    /// Bring up the tunnel for one configuration.
    ///
    /// A missing binary or a broken credential setup surfaces before
    /// anything is spawned. After the spawn, the process output decides
    /// the result: a connected signature, an interactive auth prompt, an
    /// early exit, or the deadline. On any failure the half-started
    /// process is torn down before the error is returned.
    pub async fn connect(&self, config: &TunnelConfig) -> Result<TunnelSession, TunnelError> {
        let binary = resolve_binary(&self.binary)?;
        let source = CredentialSource::from_options(
            self.auth_file.as_deref(),
            self.auth_username.as_deref(),
            self.auth_secret.as_deref(),
        )?;
        let credentials = provision(&source)?;

        let mut command = match self.launch {
            Launch::Direct => Command::new(&binary),
            Launch::Sudo => {
                let mut command = Command::new("sudo");
                command.arg("-n").arg(&binary);
                command
            }
        };
        command
            .arg("--config")
            .arg(config.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(file) = &credentials {
            command.arg("--auth-user-pass").arg(file.path());
        }

        let elevation = match self.launch {
            Launch::Direct => "",
            Launch::Sudo => "sudo -n ",
        };
        info!(
            "Starting tunnel {} via {}{}",
            config.name(),
            elevation,
            binary.display()
        );
        let mut child = command.spawn()?;
        let lines = merge_output(&mut child);

        let mut session = TunnelSession {
            name: config.name().to_string(),
            child,
            lines,
            credentials,
            state: TunnelState::Starting,
            started_at: Instant::now(),
        };

        let has_credentials = session.credentials.is_some();
        match session
            .await_connected(self.connect_timeout, has_credentials)
            .await
        {
            Ok(()) => Ok(session),
            Err(e) => {
                session.state = TunnelState::Failed;
                session.shutdown().await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl TunnelProvider for TunnelSupervisor {
    async fn acquire(&self, config: &TunnelConfig) -> Result<Box<dyn TunnelGuard>, TunnelError> {
        let session = self.connect(config).await?;
        Ok(Box::new(session))
    }
}

/// Merge stdout and stderr into one line channel. The tunnel binary logs
/// to stdout while sudo and early failures land on stderr; the classifier
/// has to see both.
fn merge_output(child: &mut Child) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_pump(stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_pump(stderr, tx);
    }
    rx
}

fn spawn_pump<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

/// A supervised tunnel process and everything it owns.
///
/// The child is spawned with kill-on-drop and a transient credentials
/// file deletes itself when dropped, so even a panic cannot leave either
/// behind. The graceful path is [`shutdown`], which the runner always
/// awaits before moving to the next configuration.
///
/// [`shutdown`]: TunnelSession::shutdown
pub struct TunnelSession {
    name: String,
    child: Child,
    lines: mpsc::UnboundedReceiver<String>,
    credentials: Option<CredentialFile>,
    state: TunnelState,
    started_at: Instant,
}

impl TunnelSession {
    pub fn state(&self) -> TunnelState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the credentials file handed to the process, if any.
    pub fn auth_file(&self) -> Option<&Path> {
        self.credentials.as_ref().map(|c| c.path())
    }

    /// Watch process output until it connects, prompts, exits, or the
    /// deadline passes.
    async fn await_connected(
        &mut self,
        timeout: Duration,
        has_credentials: bool,
    ) -> Result<(), TunnelError> {
        let deadline = self.started_at + timeout;

        loop {
            // Drain buffered output before checking for an exit, so a
            // signature printed just before the process died still counts.
            while let Ok(line) = self.lines.try_recv() {
                debug!("[tunnel {}] {}", self.name, line);
                match classify(&line) {
                    LineClass::Connected => {
                        self.state = TunnelState::Connected;
                        info!(
                            "Tunnel {} connected after {:.1}s",
                            self.name,
                            self.started_at.elapsed().as_secs_f64()
                        );
                        return Ok(());
                    }
                    LineClass::AuthRequired if !has_credentials => {
                        warn!("Tunnel {} is asking for credentials", self.name);
                        return Err(TunnelError::AuthRequired);
                    }
                    _ => {}
                }
            }

            if let Some(status) = self.child.try_wait()? {
                return Err(TunnelError::Exited {
                    code: status.code(),
                });
            }

            if Instant::now() >= deadline {
                return Err(TunnelError::ConnectTimeout(timeout.as_secs()));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Tear the tunnel down: SIGTERM, a bounded wait, a hard kill if the
    /// process ignores the signal, then credentials cleanup. Failures are
    /// logged, never returned; teardown must finish no matter what.
    pub async fn shutdown(&mut self) {
        if self.state == TunnelState::Terminated {
            return;
        }
        let failed = self.state == TunnelState::Failed;
        if !failed {
            self.state = TunnelState::Terminating;
            info!("Stopping tunnel {}", self.name);
        }

        self.stop_process().await;

        if let Some(credentials) = self.credentials.take() {
            credentials.discard();
        }

        if !failed {
            self.state = TunnelState::Terminated;
            info!("Tunnel {} stopped", self.name);
        }
    }

    async fn stop_process(&mut self) {
        match self.child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to check tunnel {}: {}", self.name, e);
                return;
            }
        }

        if let Some(pid) = self.child.id() {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                warn!("Failed to signal tunnel {}: {}", self.name, e);
            } else {
                let deadline = Instant::now() + GRACE_PERIOD;
                while Instant::now() < deadline {
                    match self.child.try_wait() {
                        Ok(Some(status)) => {
                            debug!(
                                "Tunnel {} exited with code {:?}",
                                self.name,
                                status.code()
                            );
                            return;
                        }
                        Ok(None) => tokio::time::sleep(POLL_INTERVAL).await,
                        Err(_) => break,
                    }
                }
                warn!("Tunnel {} ignored SIGTERM, killing it", self.name);
            }
        }

        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill tunnel {}: {}", self.name, e);
        }
    }
}

#[async_trait]
impl TunnelGuard for TunnelSession {
    async fn release(mut self: Box<Self>) {
        self.shutdown().await;
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
