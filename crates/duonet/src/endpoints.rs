//! # Endpoints
//!
//! The two loopback ports a companion listens on, and the readiness line it
//! prints on stdout once both are bound.
//!
//! ```text
//! DUO_READY request=54000 callback=54001
//! ```

use std::fmt;
use std::net::SocketAddr;

use crate::tcp::loopback;

/// Port for the request/response channel.
pub const DEFAULT_REQUEST_PORT: u16 = 54000;

/// Port for the callback channel.
pub const DEFAULT_CALLBACK_PORT: u16 = 54001;

/// First token of the readiness line.
pub const READY_PREFIX: &str = "DUO_READY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub request_port: u16,
    pub callback_port: u16,
}

impl Endpoints {
    pub fn new(request_port: u16, callback_port: u16) -> Self {
        Self { request_port, callback_port }
    }

    pub fn request_addr(&self) -> SocketAddr {
        loopback(self.request_port)
    }

    pub fn callback_addr(&self) -> SocketAddr {
        loopback(self.callback_port)
    }

    /// The line a companion prints once both listeners are bound.
    pub fn ready_line(&self) -> String {
        format!("{} request={} callback={}", READY_PREFIX, self.request_port, self.callback_port)
    }

    /// Parses a readiness line. Returns `None` for any other output.
    pub fn parse_ready_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        if parts.next()? != READY_PREFIX {
            return None;
        }

        let mut request = None;
        let mut callback = None;
        for part in parts {
            let (key, value) = part.split_once('=')?;
            match key {
                "request" => request = Some(value.parse().ok()?),
                "callback" => callback = Some(value.parse().ok()?),
                _ => {}
            }
        }

        Some(Self { request_port: request?, callback_port: callback? })
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_PORT, DEFAULT_CALLBACK_PORT)
    }
}

impl fmt::Display for Endpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request:{} callback:{}", self.request_port, self.callback_port)
    }
}
