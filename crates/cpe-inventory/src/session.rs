//! Session capability used by host workers.
//!
//! A [`Connector`] opens one management session per call; the worker that
//! opened a [`Session`] owns it exclusively and closes it before returning.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use cpe_core::SessionError;

/// Parameters for opening one session to one device.
#[derive(Clone)]
pub struct SessionParams {
    pub address: IpAddr,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Privileged secret this session is established with.
    pub privileged_secret: String,
    pub timeout: Duration,
}

impl fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParams")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("privileged_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Opens sessions to devices.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Session: Session;

    async fn open(&self, params: &SessionParams) -> Result<Self::Session, SessionError>;
}

/// An open management session to one device.
#[async_trait]
pub trait Session: Send + 'static {
    /// Enter privileged mode with `secret`.
    async fn enter_privileged(&mut self, secret: &str) -> Result<(), SessionError>;

    /// Run one command and return its output text.
    async fn run(&mut self, command: &str) -> Result<String, SessionError>;

    /// Close the session. Errors are not interesting at this point.
    async fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_params_debug_redacts_secrets() {
        let params = SessionParams {
            address: "10.0.0.1".parse().unwrap(),
            port: 23,
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            privileged_secret: "en-primary".to_string(),
            timeout: Duration::from_secs(10),
        };
        let printed = format!("{params:?}");
        assert!(printed.contains("admin"));
        assert!(printed.contains("10.0.0.1"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("en-primary"));
    }
}
