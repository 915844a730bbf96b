//! Declared targets, in registration order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{ConfigStore, ConfigValue};
use crate::error::Result;

use super::host::HostDescriptor;

/// A machine tasks can run against.
#[derive(Debug)]
pub struct Target {
    name: String,
    host: HostDescriptor,
    roles: Vec<String>,
    overlay: ConfigStore,
    keys: Vec<PathBuf>,
}

impl Target {
    /// Create a target with no roles, overlay or keys.
    pub fn new(name: impl Into<String>, host: HostDescriptor) -> Self {
        Self {
            name: name.into(),
            host,
            roles: Vec::new(),
            overlay: ConfigStore::new(),
            keys: Vec::new(),
        }
    }

    /// Target name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connection details.
    pub fn host(&self) -> &HostDescriptor {
        &self.host
    }

    /// Declared roles, in declaration order.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Check role membership. The target's own name counts as a role.
    pub fn has_role(&self, role: &str) -> bool {
        self.name == role || self.roles.iter().any(|r| r == role)
    }

    /// Config values that shadow the global store while this target is current.
    pub fn overlay(&self) -> &ConfigStore {
        &self.overlay
    }

    /// Private key files, in declaration order.
    pub fn keys(&self) -> &[PathBuf] {
        &self.keys
    }
}

/// Chained mutators returned by [`TargetRegistry::register`].
pub struct TargetBuilder<'a> {
    target: &'a mut Target,
}

impl TargetBuilder<'_> {
    /// Add a role (duplicates are ignored).
    pub fn add_role(self, role: impl Into<String>) -> Self {
        let role = role.into();
        if !self.target.roles.contains(&role) {
            self.target.roles.push(role);
        }
        self
    }

    /// Set an overlay value.
    pub fn set(self, name: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.target.overlay.set(name, value);
        self
    }

    /// Set a deferred overlay value.
    pub fn set_lazy<F, V>(self, name: impl Into<String>, producer: F) -> Self
    where
        F: FnOnce() -> V + Send + 'static,
        V: Into<ConfigValue>,
    {
        self.target.overlay.set_lazy(name, producer);
        self
    }

    /// Add a private key file used to authenticate.
    pub fn key(self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        if !self.target.keys.contains(&path) {
            self.target.keys.push(path);
        }
        self
    }

    /// Target being configured.
    pub fn target(&self) -> &Target {
        &*self.target
    }
}

/// All declared targets.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
    by_name: HashMap<String, usize>,
}

impl TargetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a target and return its builder.
    ///
    /// Re-registering a name replaces the old target in place, so
    /// registration order is kept.
    pub fn register(&mut self, name: &str, host: &str) -> Result<TargetBuilder<'_>> {
        let target = Target::new(name, HostDescriptor::parse(host)?);
        let index = match self.by_name.get(name) {
            Some(&index) => {
                tracing::debug!("target '{}' redeclared", name);
                self.targets[index] = target;
                index
            }
            None => {
                self.targets.push(target);
                self.by_name.insert(name.to_string(), self.targets.len() - 1);
                self.targets.len() - 1
            }
        };
        Ok(TargetBuilder {
            target: &mut self.targets[index],
        })
    }

    /// Builder for an already declared target.
    pub fn configure(&mut self, name: &str) -> Option<TargetBuilder<'_>> {
        let index = *self.by_name.get(name)?;
        Some(TargetBuilder {
            target: &mut self.targets[index],
        })
    }

    /// Look up a target by name.
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.by_name.get(name).map(|&i| &self.targets[i])
    }

    /// Check if a target exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.targets.iter().map(Target::name).collect()
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no target is declared.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets whose name or a role equals any entry, in registration order.
    ///
    /// Each target appears at most once however many entries it matches.
    pub fn matching(&self, entries: &[String]) -> Vec<&Target> {
        self.targets
            .iter()
            .filter(|t| entries.iter().any(|e| t.has_role(e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Lookup;

    fn registry() -> TargetRegistry {
        let mut registry = TargetRegistry::new();
        registry
            .register("p1", "deploy@10.0.0.1")
            .unwrap()
            .add_role("web")
            .add_role("db");
        registry
            .register("p2", "deploy@10.0.0.2")
            .unwrap()
            .add_role("web");
        registry.register("p3", "deploy@10.0.0.3").unwrap();
        registry
    }

    #[test]
    fn has_role_includes_own_name() {
        let registry = registry();
        let p1 = registry.get("p1").unwrap();
        assert!(p1.has_role("p1"));
        assert!(p1.has_role("web"));
        assert!(!p1.has_role("p2"));
    }

    #[test]
    fn matching_by_role_keeps_registration_order() {
        let registry = registry();
        let names: Vec<_> = registry
            .matching(&["web".to_string()])
            .iter()
            .map(|t| t.name())
            .collect();
        assert_eq!(names, vec!["p1", "p2"]);
    }

    #[test]
    fn matching_dedupes_targets() {
        let registry = registry();
        let matched = registry.matching(&["web".into(), "db".into(), "p1".into()]);
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn matching_nothing_is_empty() {
        let registry = registry();
        assert!(registry.matching(&["cache".to_string()]).is_empty());
    }

    #[test]
    fn roles_and_keys_are_deduplicated() {
        let mut registry = TargetRegistry::new();
        registry
            .register("a", "host")
            .unwrap()
            .add_role("web")
            .add_role("web")
            .key("~/.ssh/id_ed25519")
            .key("~/.ssh/id_ed25519");
        let a = registry.get("a").unwrap();
        assert_eq!(a.roles(), &["web".to_string()]);
        assert_eq!(a.keys().len(), 1);
    }

    #[test]
    fn overlay_values_live_on_the_target() {
        let mut registry = TargetRegistry::new();
        registry
            .register("p1", "host")
            .unwrap()
            .set("env", "special")
            .set_lazy("rev", || "abc");
        let overlay = registry.get("p1").unwrap().overlay();
        assert_eq!(overlay.lookup("env").unwrap().as_string(), "special");
        assert_eq!(overlay.lookup("rev").unwrap().as_string(), "abc");
    }

    #[test]
    fn redeclaring_replaces_in_place() {
        let mut registry = registry();
        registry.register("p1", "other@10.0.0.9").unwrap();
        assert_eq!(registry.names(), vec!["p1", "p2", "p3"]);
        let p1 = registry.get("p1").unwrap();
        assert_eq!(p1.host().user, "other");
        assert!(p1.roles().is_empty());
    }

    #[test]
    fn invalid_host_is_rejected() {
        let mut registry = TargetRegistry::new();
        assert!(registry.register("bad", "deploy@host/x").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn configure_reaches_existing_target() {
        let mut registry = registry();
        registry.configure("p3").unwrap().add_role("cache");
        assert!(registry.get("p3").unwrap().has_role("cache"));
        assert!(registry.configure("missing").is_none());
    }
}
