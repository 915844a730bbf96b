//! One connection slot per target.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, StagehandError};
use crate::targets::Target;

use super::{Connection, RemoteOutput, Transport};

enum Slot {
    Open(Box<dyn Connection>),
    /// Opening failed; the target stays unreachable for the rest of the run.
    Failed(String),
}

#[derive(Debug, Default, Clone)]
struct TargetEnv {
    exports: Vec<(String, String)>,
    cwd: Option<String>,
}

/// Connections and per-target command environment for a run.
pub struct ConnectionPool {
    transport: Box<dyn Transport>,
    slots: HashMap<String, Slot>,
    env: HashMap<String, TargetEnv>,
}

impl ConnectionPool {
    /// Create an empty pool over `transport`.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            slots: HashMap::new(),
            env: HashMap::new(),
        }
    }

    /// Open the connection to `target` explicitly.
    ///
    /// # Errors
    ///
    /// `AlreadyConnected` if it is open, `Unreachable` if opening failed now
    /// or earlier in the run.
    pub fn connect(&mut self, target: &Target) -> Result<()> {
        match self.slots.get(target.name()) {
            Some(Slot::Open(_)) => Err(StagehandError::AlreadyConnected {
                target: target.name().to_string(),
            }),
            Some(Slot::Failed(reason)) => Err(unreachable(target.name(), reason)),
            None => self.open(target).map(|_| ()),
        }
    }

    /// The open connection to `target`, opening it on first use.
    fn connection(&mut self, target: &Target) -> Result<&mut Box<dyn Connection>> {
        if !self.slots.contains_key(target.name()) {
            return self.open(target);
        }
        match self.slots.get_mut(target.name()) {
            Some(Slot::Open(conn)) => Ok(conn),
            Some(Slot::Failed(reason)) => Err(unreachable(target.name(), reason)),
            None => Err(StagehandError::ConnectionClosed {
                target: target.name().to_string(),
            }),
        }
    }

    fn open(&mut self, target: &Target) -> Result<&mut Box<dyn Connection>> {
        tracing::debug!("connecting to {} ({})", target.name(), target.host());
        let slot = match self
            .transport
            .open(target.name(), target.host(), target.keys())
        {
            Ok(conn) => Slot::Open(conn),
            Err(e) => {
                tracing::warn!("cannot reach {}: {}", target.name(), e);
                Slot::Failed(e.to_string())
            }
        };
        let slot = self.slots.entry(target.name().to_string()).or_insert(slot);
        match slot {
            Slot::Open(conn) => Ok(conn),
            Slot::Failed(reason) => Err(unreachable(target.name(), reason)),
        }
    }

    /// Run `command` on `target` with its environment prefix.
    pub fn run(&mut self, target: &Target, command: &str) -> Result<RemoteOutput> {
        let prefix = self.prefix(target.name());
        self.connection(target)?.run(command, &prefix)
    }

    /// Copy `local` to `remote` on `target`.
    pub fn upload(&mut self, target: &Target, local: &Path, remote: &str) -> Result<RemoteOutput> {
        self.connection(target)?.upload(local, remote)
    }

    /// Copy `remote` on `target` to `local`.
    pub fn download(&mut self, target: &Target, remote: &str, local: &Path) -> Result<RemoteOutput> {
        self.connection(target)?.download(remote, local)
    }

    /// Set the directory later commands on `target` start in.
    pub fn set_cwd(&mut self, target: &str, path: impl Into<String>) {
        self.env.entry(target.to_string()).or_default().cwd = Some(path.into());
    }

    /// Export a variable for later commands on `target`.
    pub fn export(&mut self, target: &str, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let env = self.env.entry(target.to_string()).or_default();
        match env.exports.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => env.exports.push((name, value)),
        }
    }

    /// Shell text put before every command on `target`.
    pub fn prefix(&self, target: &str) -> String {
        let Some(env) = self.env.get(target) else {
            return String::new();
        };
        let mut prefix = String::new();
        for (name, value) in &env.exports {
            prefix.push_str(&format!("export {}={}; ", name, shell_quote(value)));
        }
        if let Some(cwd) = &env.cwd {
            prefix.push_str(&format!("cd {}; ", cwd));
        }
        prefix
    }

    /// Whether a connection to `target` is open.
    pub fn is_open(&self, target: &str) -> bool {
        matches!(self.slots.get(target), Some(Slot::Open(_)))
    }

    /// Whether `target` failed to connect during this run.
    pub fn is_unreachable(&self, target: &str) -> bool {
        matches!(self.slots.get(target), Some(Slot::Failed(_)))
    }

    /// Number of open connections.
    pub fn open_count(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, Slot::Open(_)))
            .count()
    }

    /// Close the connection to `target`.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` when there is no open connection.
    pub fn close(&mut self, target: &str) -> Result<()> {
        match self.slots.remove(target) {
            Some(Slot::Open(mut conn)) => conn.close(),
            Some(failed @ Slot::Failed(_)) => {
                self.slots.insert(target.to_string(), failed);
                Err(StagehandError::ConnectionClosed {
                    target: target.to_string(),
                })
            }
            None => Err(StagehandError::ConnectionClosed {
                target: target.to_string(),
            }),
        }
    }

    /// Close every open connection. Failures are logged, not returned.
    ///
    /// Returns how many connections were closed.
    pub fn close_all(&mut self) -> usize {
        let open: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, s)| matches!(s, Slot::Open(_)))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &open {
            if let Err(e) = self.close(name) {
                tracing::warn!("closing {}: {}", name, e);
            }
        }
        open.len()
    }
}

fn unreachable(target: &str, reason: &str) -> StagehandError {
    StagehandError::Unreachable {
        target: target.to_string(),
        reason: reason.to_string(),
    }
}

/// Single-quote `value` for a POSIX shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockTransport;
    use crate::targets::TargetRegistry;

    fn registry() -> TargetRegistry {
        let mut registry = TargetRegistry::new();
        registry.register("web1", "deploy@10.0.0.1").unwrap();
        registry.register("down", "deploy@10.0.0.99").unwrap();
        registry
    }

    #[test]
    fn opens_lazily_and_reuses() {
        let transport = MockTransport::new();
        let mut pool = ConnectionPool::new(Box::new(transport.clone()));
        let registry = registry();
        let web1 = registry.get("web1").unwrap();

        assert!(!pool.is_open("web1"));
        pool.run(web1, "uptime").unwrap();
        pool.run(web1, "whoami").unwrap();

        assert!(pool.is_open("web1"));
        assert_eq!(transport.opened(), vec!["web1".to_string()]);
        assert_eq!(transport.commands_for("web1"), vec!["uptime", "whoami"]);
    }

    #[test]
    fn explicit_reconnect_is_rejected() {
        let mut pool = ConnectionPool::new(Box::new(MockTransport::new()));
        let registry = registry();
        let web1 = registry.get("web1").unwrap();

        pool.connect(web1).unwrap();
        let err = pool.connect(web1).unwrap_err();
        assert!(matches!(err, StagehandError::AlreadyConnected { .. }));
    }

    #[test]
    fn failed_open_is_remembered() {
        let transport = MockTransport::new();
        transport.set_unreachable("down");
        let mut pool = ConnectionPool::new(Box::new(transport.clone()));
        let registry = registry();
        let down = registry.get("down").unwrap();

        assert!(matches!(
            pool.run(down, "uptime").unwrap_err(),
            StagehandError::Unreachable { .. }
        ));
        assert!(pool.is_unreachable("down"));

        // no second attempt
        assert!(pool.run(down, "uptime").is_err());
        assert_eq!(transport.open_attempts(), 1);
    }

    #[test]
    fn prefix_has_exports_then_cd() {
        let mut pool = ConnectionPool::new(Box::new(MockTransport::new()));
        pool.export("web1", "RAILS_ENV", "production");
        pool.export("web1", "GREETING", "it's");
        pool.set_cwd("web1", "/srv/app");
        pool.export("web1", "RAILS_ENV", "staging");

        assert_eq!(
            pool.prefix("web1"),
            "export RAILS_ENV='staging'; export GREETING='it'\\''s'; cd /srv/app; "
        );
        assert_eq!(pool.prefix("other"), "");
    }

    #[test]
    fn run_passes_prefix_to_connection() {
        let transport = MockTransport::new();
        let mut pool = ConnectionPool::new(Box::new(transport.clone()));
        let registry = registry();
        pool.set_cwd("web1", "/srv");
        pool.run(registry.get("web1").unwrap(), "ls").unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].prefix, "cd /srv; ");
        assert_eq!(calls[0].command, "ls");
    }

    #[test]
    fn close_all_closes_open_connections() {
        let transport = MockTransport::new();
        let mut pool = ConnectionPool::new(Box::new(transport.clone()));
        let registry = registry();
        pool.run(registry.get("web1").unwrap(), "uptime").unwrap();

        assert_eq!(pool.close_all(), 1);
        assert_eq!(pool.open_count(), 0);
        assert_eq!(transport.closed(), vec!["web1".to_string()]);
    }

    #[test]
    fn closing_twice_reports_closed() {
        let mut pool = ConnectionPool::new(Box::new(MockTransport::new()));
        let registry = registry();
        pool.connect(registry.get("web1").unwrap()).unwrap();
        pool.close("web1").unwrap();
        assert!(matches!(
            pool.close("web1").unwrap_err(),
            StagehandError::ConnectionClosed { .. }
        ));
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("a'b"), r"'a'\''b'");
    }
}
