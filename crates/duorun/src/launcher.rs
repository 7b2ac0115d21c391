//! # Companion Launcher
//!
//! Starts the companion executable and waits for its readiness line.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::process::Stdio;

use duonet::Endpoints;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio::io::Lines;
use tokio::process::Child;
use tokio::process::ChildStdout;
use tokio::process::Command;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::SessionConfig;
use crate::error::Error;
use crate::error::Result;

/// A running companion process and the endpoints it announced.
#[derive(Debug)]
pub struct Companion {
    child: Child,
    endpoints: Endpoints,
    path: PathBuf,
}

impl Companion {
    pub async fn launch(config: &SessionConfig) -> Result<Self> {
        let path = config.locator.resolve()?;
        info!("Starting companion {}", path.display());

        let mut command = Command::new(&path);
        command
            .arg("--request-port")
            .arg(config.endpoints.request_port.to_string())
            .arg("--callback-port")
            .arg(config.endpoints.callback_port.to_string())
            .args(&config.companion_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| Error::ProcessLaunchFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let Some(stdout) = child.stdout.take() else {
            if let Err(e) = child.kill().await {
                debug!("Killing companion without stdout: {}", e);
            }
            return Err(Error::ProcessLaunchFailed {
                path,
                reason: "stdout was not captured".to_string(),
            });
        };
        let mut lines = BufReader::new(stdout).lines();

        let announced = tokio::time::timeout(config.startup_timeout, read_ready_line(&mut lines)).await;
        let endpoints = match announced {
            Ok(Ok(Some(endpoints))) => endpoints,
            Ok(Ok(None)) => {
                let status = child.wait().await.ok();
                return Err(Error::CompanionNotReady(format!(
                    "exited before announcing endpoints ({})",
                    describe_exit(status)
                )));
            }
            Ok(Err(e)) => {
                if let Err(kill_err) = child.kill().await {
                    debug!("Killing unreadable companion: {}", kill_err);
                }
                return Err(Error::CompanionNotReady(format!("cannot read stdout: {}", e)));
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    debug!("Killing silent companion: {}", e);
                }
                return Err(Error::CompanionNotReady(format!(
                    "no endpoints announced within {:?}",
                    config.startup_timeout
                )));
            }
        };

        let pid = child.id();
        info!("Companion {:?} listening on {}", pid, endpoints);
        tokio::spawn(forward_output(lines, pid));

        Ok(Self { child, endpoints, path })
    }

    pub fn endpoints(&self) -> Endpoints {
        self.endpoints
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// OS process id, or `None` once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// `Ok(None)` while the companion runs, its exit status once it has exited.
    pub fn try_exit_status(&mut self) -> Result<Option<ExitStatus>> {
        self.child.try_wait().map_err(|e| Error::ProcessQueryFailed(e.to_string()))
    }

    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child.wait().await.map_err(|e| Error::ProcessQueryFailed(e.to_string()))
    }

    /// Kills the companion and reaps it.
    pub async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("Cannot kill companion {}: {}", self.path.display(), e);
        }
    }
}

pub(crate) fn describe_exit(status: Option<ExitStatus>) -> String {
    match status.and_then(|s| s.code()) {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

async fn read_ready_line(lines: &mut Lines<BufReader<ChildStdout>>) -> std::io::Result<Option<Endpoints>> {
    while let Some(line) = lines.next_line().await? {
        if let Some(endpoints) = Endpoints::parse_ready_line(&line) {
            return Ok(Some(endpoints));
        }
        debug!("companion: {}", line);
    }
    Ok(None)
}

async fn forward_output(mut lines: Lines<BufReader<ChildStdout>>, pid: Option<u32>) {
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!("companion {:?}: {}", pid, line),
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading companion {:?} output: {}", pid, e);
                break;
            }
        }
    }
}
