//! OpenSSH transport.
//!
//! Each target gets a ControlMaster socket so every command reuses one
//! authenticated connection. File transfers go through `scp` over the same
//! socket.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{Result, StagehandError};
use crate::shell::{execute_program, CommandResult};
use crate::targets::HostDescriptor;

use super::{Connection, RemoteOutput, Transport};

/// Connects with the system `ssh` binary.
#[derive(Debug, Clone)]
pub struct SshTransport {
    socket_dir: PathBuf,
}

impl SshTransport {
    /// Create a transport that keeps control sockets in the temp directory.
    pub fn new() -> Self {
        Self {
            socket_dir: std::env::temp_dir(),
        }
    }

    /// Keep control sockets in `dir`.
    pub fn with_socket_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            socket_dir: dir.into(),
        }
    }

    /// Unix socket paths are capped near 104 bytes, so the target name is
    /// hashed into a fixed-width suffix.
    fn socket_for(&self, name: &str) -> PathBuf {
        let hash = Sha256::digest(name.as_bytes());
        self.socket_dir.join(format!(
            "stagehand-{}-{}.sock",
            std::process::id(),
            hex::encode(&hash[..6])
        ))
    }
}

impl Default for SshTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SshTransport {
    fn open(&self, name: &str, host: &HostDescriptor, keys: &[PathBuf]) -> Result<Box<dyn Connection>> {
        let socket = self.socket_for(name);
        let socket_arg = socket.display().to_string();
        let port = host.port.to_string();
        let destination = host.destination();

        let mut args: Vec<String> = vec![
            "-M".into(),
            "-S".into(),
            socket_arg,
            "-fN".into(),
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            "StrictHostKeyChecking=accept-new".into(),
            "-p".into(),
            port,
        ];
        for key in keys {
            args.push("-i".into());
            args.push(key.display().to_string());
        }
        if !keys.is_empty() {
            args.push("-o".into());
            args.push("IdentitiesOnly=yes".into());
        }
        args.push(destination);

        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let result = execute_program("ssh", &refs).map_err(|e| {
            StagehandError::Unreachable {
                target: name.to_string(),
                reason: e.to_string(),
            }
        })?;
        if !result.success {
            return Err(StagehandError::Unreachable {
                target: name.to_string(),
                reason: result.stderr.trim().to_string(),
            });
        }

        tracing::debug!("opened control socket {} for {}", socket.display(), name);
        Ok(Box::new(SshConnection {
            target: name.to_string(),
            host: host.clone(),
            socket,
            open: true,
        }))
    }
}

struct SshConnection {
    target: String,
    host: HostDescriptor,
    socket: PathBuf,
    open: bool,
}

impl SshConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(StagehandError::ConnectionClosed {
                target: self.target.clone(),
            })
        }
    }

    fn scp(&self, from: &str, to: &str) -> Result<RemoteOutput> {
        self.ensure_open()?;
        let control = format!("ControlPath={}", self.socket.display());
        let port = self.host.port.to_string();
        let args = ["-o", control.as_str(), "-P", port.as_str(), "-r", from, to];
        let result = execute_program("scp", &args)?;
        Ok(to_output(result))
    }

    fn remote_path(&self, path: &str) -> String {
        format!("{}:{}", self.host.destination(), path)
    }
}

impl Connection for SshConnection {
    fn run(&mut self, command: &str, prefix: &str) -> Result<RemoteOutput> {
        self.ensure_open()?;
        let socket = self.socket.display().to_string();
        let port = self.host.port.to_string();
        let destination = self.host.destination();
        let full = format!("{}{}", prefix, command);
        let args = [
            "-S",
            socket.as_str(),
            "-p",
            port.as_str(),
            destination.as_str(),
            "--",
            full.as_str(),
        ];
        let result = execute_program("ssh", &args)?;
        Ok(to_output(result))
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<RemoteOutput> {
        let to = self.remote_path(remote);
        self.scp(&local.display().to_string(), &to)
    }

    fn download(&mut self, remote: &str, local: &Path) -> Result<RemoteOutput> {
        let from = self.remote_path(remote);
        self.scp(&from, &local.display().to_string())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.open = false;
        let socket = self.socket.display().to_string();
        let destination = self.host.destination();
        let args = ["-S", socket.as_str(), "-O", "exit", destination.as_str()];
        let result = execute_program("ssh", &args)?;
        if !result.success {
            tracing::debug!("control socket for {}: {}", self.target, result.stderr.trim());
        }
        Ok(())
    }
}

impl Drop for SshConnection {
    fn drop(&mut self) {
        if self.open {
            let _ = self.close();
        }
    }
}

fn to_output(result: CommandResult) -> RemoteOutput {
    RemoteOutput {
        exit_error: result.exit_error(),
        stdout: result.stdout,
        stderr: result.stderr,
    }
}
