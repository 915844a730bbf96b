//! Remote execution.
//!
//! A [`Transport`] opens one [`Connection`] per target. The
//! [`ConnectionPool`] owns those connections for the whole run: it opens
//! them lazily, remembers targets that could not be reached and prefixes
//! every command with the target's environment.
//!
//! - [`SshTransport`] drives the system OpenSSH client
//! - [`MockTransport`] records commands for tests

pub mod mock;
pub mod pool;
pub mod ssh;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::targets::HostDescriptor;

pub use mock::{MockTransport, RemoteCall};
pub use pool::ConnectionPool;
pub use ssh::SshTransport;

/// What a remote command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Set when the command exited unsuccessfully.
    pub exit_error: Option<String>,
}

impl RemoteOutput {
    /// A successful output.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// A failed output.
    pub fn failed(stderr: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_error: Some(error.into()),
        }
    }
}

/// An open session with one target.
pub trait Connection {
    /// Run `command` after `prefix` (environment exports and `cd`).
    fn run(&mut self, command: &str, prefix: &str) -> Result<RemoteOutput>;

    /// Copy a local file or directory to the target.
    fn upload(&mut self, local: &Path, remote: &str) -> Result<RemoteOutput>;

    /// Copy a remote file or directory from the target.
    fn download(&mut self, remote: &str, local: &Path) -> Result<RemoteOutput>;

    /// Close the session.
    fn close(&mut self) -> Result<()>;
}

/// Opens connections.
pub trait Transport {
    /// Connect to target `name` at `host`, authenticating with `keys`.
    ///
    /// # Errors
    ///
    /// Returns `Unreachable` when the target cannot be reached.
    fn open(&self, name: &str, host: &HostDescriptor, keys: &[PathBuf]) -> Result<Box<dyn Connection>>;
}
