//! Host descriptors: `[ssh://][user@]host[:port]`.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StagehandError};

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDescriptor {
    /// Login user.
    pub user: String,
    /// Hostname or address.
    pub host: String,
    /// SSH port.
    pub port: u16,
}

impl HostDescriptor {
    /// Parse a descriptor.
    ///
    /// A missing user falls back to the invoking OS user (`USER`, then
    /// `USERNAME`), a missing port to 22.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let invalid = |reason: &str| StagehandError::InvalidHost {
            host: descriptor.to_string(),
            reason: reason.to_string(),
        };

        let rest = descriptor.trim();
        let rest = rest.strip_prefix("ssh://").unwrap_or(rest);

        let (user, rest) = match rest.rsplit_once('@') {
            Some((user, rest)) if !user.is_empty() => (user.to_string(), rest),
            Some(_) => return Err(invalid("empty user")),
            None => (current_user(), rest),
        };

        if rest.contains('/') {
            return Err(invalid("host must not contain '/'"));
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| invalid(&format!("bad port '{}'", port)))?;
                (host, port)
            }
            None => (rest, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        Ok(Self {
            user,
            host: host.to_string(),
            port,
        })
    }

    /// `user@host`, the form scp and ssh expect.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

impl FromStr for HostDescriptor {
    type Err = StagehandError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for HostDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "root".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_descriptor() {
        let host = HostDescriptor::parse("ssh://deploy@example.com:2222").unwrap();
        assert_eq!(host.user, "deploy");
        assert_eq!(host.host, "example.com");
        assert_eq!(host.port, 2222);
    }

    #[test]
    fn port_defaults_to_22() {
        let host = HostDescriptor::parse("deploy@10.0.0.1").unwrap();
        assert_eq!(host.port, DEFAULT_PORT);
    }

    #[test]
    fn user_defaults_to_os_user() {
        let host = HostDescriptor::parse("example.com").unwrap();
        assert_eq!(host.user, current_user());
        assert_eq!(host.host, "example.com");
    }

    #[test]
    fn rejects_slash_in_host() {
        let err = HostDescriptor::parse("deploy@example.com/path").unwrap_err();
        assert!(matches!(err, StagehandError::InvalidHost { .. }));
    }

    #[test]
    fn rejects_bad_port() {
        assert!(HostDescriptor::parse("deploy@example.com:ssh").is_err());
        assert!(HostDescriptor::parse("deploy@example.com:70000").is_err());
    }

    #[test]
    fn rejects_empty_parts() {
        assert!(HostDescriptor::parse("@example.com").is_err());
        assert!(HostDescriptor::parse("deploy@").is_err());
        assert!(HostDescriptor::parse("").is_err());
    }

    #[test]
    fn display_and_destination() {
        let host: HostDescriptor = "deploy@example.com".parse().unwrap();
        assert_eq!(host.destination(), "deploy@example.com");
        assert_eq!(host.to_string(), "deploy@example.com:22");
    }
}
