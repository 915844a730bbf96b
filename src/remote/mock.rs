//! Recording transport for tests.
//!
//! Clones share one recording. Commands get canned responses; without one,
//! `echo <text>` answers `<text>` and anything else answers nothing.
//!
//! # Example
//!
//! ```
//! use stagehand::remote::{ConnectionPool, MockTransport};
//! use stagehand::targets::TargetRegistry;
//!
//! let transport = MockTransport::new();
//! transport.respond("cat VERSION", "1.4.2");
//!
//! let mut registry = TargetRegistry::new();
//! registry.register("web1", "deploy@10.0.0.1").unwrap();
//!
//! let mut pool = ConnectionPool::new(Box::new(transport.clone()));
//! let out = pool.run(registry.get("web1").unwrap(), "cat VERSION").unwrap();
//!
//! assert_eq!(out.stdout, "1.4.2");
//! assert_eq!(transport.commands_for("web1"), vec!["cat VERSION"]);
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, StagehandError};
use crate::targets::HostDescriptor;

use super::{Connection, RemoteOutput, Transport};

/// One recorded remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    /// Target name.
    pub target: String,
    /// Command as issued by the task.
    pub command: String,
    /// Environment prefix the pool put in front of it.
    pub prefix: String,
}

#[derive(Debug, Default)]
struct Recording {
    calls: Vec<RemoteCall>,
    transfers: Vec<(String, String, String, String)>,
    uploads: HashMap<(String, String), String>,
    responses: HashMap<String, RemoteOutput>,
    unreachable: HashSet<String>,
    open_attempts: usize,
    opened: Vec<String>,
    closed: Vec<String>,
}

/// Transport that never touches the network.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Recording>>,
}

impl MockTransport {
    /// Create a transport where every target is reachable.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer `command` with `stdout`.
    pub fn respond(&self, command: &str, stdout: &str) {
        self.state()
            .responses
            .insert(command.to_string(), RemoteOutput::ok(stdout));
    }

    /// Answer `command` with a failure.
    pub fn fail(&self, command: &str, stderr: &str, error: &str) {
        self.state()
            .responses
            .insert(command.to_string(), RemoteOutput::failed(stderr, error));
    }

    /// Make opening a connection to `target` fail.
    pub fn set_unreachable(&self, target: &str) {
        self.state().unreachable.insert(target.to_string());
    }

    /// Every command, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    /// Commands run on `target`, in order.
    pub fn commands_for(&self, target: &str) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.target == target)
            .map(|c| c.command.clone())
            .collect()
    }

    /// Transfers as (target, direction, from, to).
    pub fn transfers(&self) -> Vec<(String, String, String, String)> {
        self.state().transfers.clone()
    }

    /// Text of the last file uploaded to `remote` on `target`.
    pub fn uploaded(&self, target: &str, remote: &str) -> Option<String> {
        self.state()
            .uploads
            .get(&(target.to_string(), remote.to_string()))
            .cloned()
    }

    /// How many times a connection was requested.
    pub fn open_attempts(&self) -> usize {
        self.state().open_attempts
    }

    /// Targets connected to, in order.
    pub fn opened(&self) -> Vec<String> {
        self.state().opened.clone()
    }

    /// Targets whose connection was closed, in order.
    pub fn closed(&self) -> Vec<String> {
        self.state().closed.clone()
    }
}

impl Transport for MockTransport {
    fn open(&self, name: &str, host: &HostDescriptor, _keys: &[PathBuf]) -> Result<Box<dyn Connection>> {
        let mut state = self.state();
        state.open_attempts += 1;
        if state.unreachable.contains(name) {
            return Err(StagehandError::Unreachable {
                target: name.to_string(),
                reason: format!("dial tcp {}:{}: connection refused", host.host, host.port),
            });
        }
        state.opened.push(name.to_string());
        Ok(Box::new(MockConnection {
            target: name.to_string(),
            recording: Arc::clone(&self.inner),
            closed: false,
        }))
    }
}

struct MockConnection {
    target: String,
    recording: Arc<Mutex<Recording>>,
    closed: bool,
}

impl MockConnection {
    fn state(&self) -> Result<MutexGuard<'_, Recording>> {
        if self.closed {
            return Err(StagehandError::ConnectionClosed {
                target: self.target.clone(),
            });
        }
        Ok(self.recording.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn transfer(&self, direction: &str, from: &str, to: &str) -> Result<RemoteOutput> {
        self.state()?.transfers.push((
            self.target.clone(),
            direction.to_string(),
            from.to_string(),
            to.to_string(),
        ));
        Ok(RemoteOutput::default())
    }
}

impl Connection for MockConnection {
    fn run(&mut self, command: &str, prefix: &str) -> Result<RemoteOutput> {
        let mut state = self.state()?;
        state.calls.push(RemoteCall {
            target: self.target.clone(),
            command: command.to_string(),
            prefix: prefix.to_string(),
        });
        let output = match state.responses.get(command) {
            Some(output) => output.clone(),
            None => RemoteOutput::ok(command.strip_prefix("echo ").unwrap_or_default()),
        };
        Ok(output)
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<RemoteOutput> {
        let contents = std::fs::read_to_string(local).ok();
        let output = self.transfer("upload", &local.display().to_string(), remote)?;
        if let Some(contents) = contents {
            self.state()?
                .uploads
                .insert((self.target.clone(), remote.to_string()), contents);
        }
        Ok(output)
    }

    fn download(&mut self, remote: &str, local: &Path) -> Result<RemoteOutput> {
        self.transfer("download", remote, &local.display().to_string())
    }

    fn close(&mut self) -> Result<()> {
        self.state()?.closed.push(self.target.clone());
        self.closed = true;
        Ok(())
    }
}
