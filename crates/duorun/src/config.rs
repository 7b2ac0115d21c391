//! # Session Configuration
//!
//! Where the companion lives, which ports it should listen on, and how long
//! the initiator is willing to wait for it.

use std::path::PathBuf;
use std::time::Duration;

use duonet::Endpoints;

use crate::error::Error;
use crate::error::Result;

/// File name of the companion executable, without platform suffix.
pub const DEFAULT_COMPANION_NAME: &str = "duo-companion";

/// How long a freshly launched companion has to announce its endpoints.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How the companion executable is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanionLocator {
    /// An explicit path.
    Path(PathBuf),
    /// A file in the same directory as `anchor`.
    SiblingOf { anchor: PathBuf, file_name: String },
    /// A file in the same directory as the running executable.
    SiblingOfCurrentExe(String),
}

impl CompanionLocator {
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            Self::Path(path) => Ok(path.clone()),
            Self::SiblingOf { anchor, file_name } => {
                let dir = anchor.parent().ok_or_else(|| Error::ProcessLaunchFailed {
                    path: anchor.clone(),
                    reason: "anchor has no parent directory".to_string(),
                })?;
                Ok(dir.join(file_name))
            }
            Self::SiblingOfCurrentExe(file_name) => {
                let exe = std::env::current_exe().map_err(|e| Error::ProcessLaunchFailed {
                    path: PathBuf::from(file_name),
                    reason: format!("cannot locate current executable: {}", e),
                })?;
                Self::SiblingOf { anchor: exe, file_name: file_name.clone() }.resolve()
            }
        }
    }
}

impl Default for CompanionLocator {
    fn default() -> Self {
        Self::SiblingOfCurrentExe(format!("{}{}", DEFAULT_COMPANION_NAME, std::env::consts::EXE_SUFFIX))
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub locator: CompanionLocator,
    /// Ports passed to the companion. Zero lets the companion pick.
    pub endpoints: Endpoints,
    /// Extra arguments appended after the port arguments.
    pub companion_args: Vec<String>,
    pub startup_timeout: Duration,
    /// `None` waits for a response indefinitely.
    pub exchange_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn new(locator: CompanionLocator) -> Self {
        Self {
            locator,
            endpoints: Endpoints::default(),
            companion_args: Vec::new(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            exchange_timeout: None,
        }
    }

    pub fn with_ports(mut self, request_port: u16, callback_port: u16) -> Self {
        self.endpoints = Endpoints::new(request_port, callback_port);
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.companion_args.push(arg.into());
        self
    }

    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn exchange_timeout(mut self, timeout: Duration) -> Self {
        self.exchange_timeout = Some(timeout);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(CompanionLocator::default())
    }
}
