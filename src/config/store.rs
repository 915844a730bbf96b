//! Lazy, override-aware configuration store.
//!
//! Every name maps to a [`ConfigEntry`] holding either a literal or a
//! deferred producer. A producer runs on first read and its result replaces
//! it, so later reads return the very same value without side effects.
//!
//! Lookups go through the [`Lookup`] trait so a target overlay can shadow the
//! global store while that target is current (see [`Layered`]).

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Local};

use crate::error::Result;

use super::value::ConfigValue;

/// Deferred computation backing a lazily evaluated entry.
pub type Producer = Box<dyn FnOnce() -> ConfigValue + Send>;

/// A named configuration slot.
pub struct ConfigEntry {
    name: String,
    value: OnceLock<ConfigValue>,
    producer: Mutex<Option<Producer>>,
}

impl ConfigEntry {
    /// Create an entry that already holds its value.
    pub fn literal(name: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(value.into());
        Self {
            name: name.into(),
            value: cell,
            producer: Mutex::new(None),
        }
    }

    /// Create an entry whose value is computed on first access.
    pub fn deferred<F, V>(name: impl Into<String>, producer: F) -> Self
    where
        F: FnOnce() -> V + Send + 'static,
        V: Into<ConfigValue>,
    {
        Self {
            name: name.into(),
            value: OnceLock::new(),
            producer: Mutex::new(Some(Box::new(move || producer().into()))),
        }
    }

    /// Entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the value has been computed (always true for literals).
    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    /// The value, running the producer exactly once if it has not run yet.
    pub fn value(&self) -> &ConfigValue {
        self.value.get_or_init(|| {
            let producer = self
                .producer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            match producer {
                Some(produce) => produce(),
                None => {
                    // Only reachable when an earlier evaluation panicked.
                    tracing::warn!("config '{}' lost its producer; using empty value", self.name);
                    ConfigValue::Str(String::new())
                }
            }
        })
    }

    /// The value rendered as trimmed text.
    pub fn as_string(&self) -> String {
        self.value().as_string()
    }

    /// Read as an integer.
    pub fn try_int(&self) -> Result<i64> {
        self.value().try_int(&self.name)
    }

    /// Read as a boolean.
    pub fn try_bool(&self) -> Result<bool> {
        self.value().try_bool(&self.name)
    }

    /// Read as a list.
    pub fn try_list(&self) -> Result<&[String]> {
        self.value().try_list(&self.name)
    }

    /// Read as a timestamp.
    pub fn try_time(&self) -> Result<DateTime<Local>> {
        self.value().try_time(&self.name)
    }

    /// Read as an integer.
    ///
    /// # Panics
    ///
    /// Panics when the value is not an integer. A wrong cast is a bug in the
    /// task that declared or read the value; use [`try_int`](Self::try_int)
    /// to recover instead.
    pub fn int(&self) -> i64 {
        self.try_int().unwrap_or_else(|e| panic!("{}", e))
    }

    /// Read as a boolean.
    ///
    /// # Panics
    ///
    /// Panics when the value is not a boolean.
    pub fn bool(&self) -> bool {
        self.try_bool().unwrap_or_else(|e| panic!("{}", e))
    }

    /// Read as a list.
    ///
    /// # Panics
    ///
    /// Panics when the value is not a list.
    pub fn list(&self) -> &[String] {
        self.try_list().unwrap_or_else(|e| panic!("{}", e))
    }

    /// Read as a timestamp.
    ///
    /// # Panics
    ///
    /// Panics when the value is not a timestamp.
    pub fn time(&self) -> DateTime<Local> {
        self.try_time().unwrap_or_else(|e| panic!("{}", e))
    }
}

impl fmt::Debug for ConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigEntry")
            .field("name", &self.name)
            .field("value", &self.value.get())
            .finish()
    }
}

/// Anything that can resolve a config name to an entry.
pub trait Lookup {
    /// Find the entry for `name`.
    fn lookup(&self, name: &str) -> Option<&ConfigEntry>;

    /// Check if `name` resolves.
    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

/// A flat map of configuration entries.
///
/// Used both as the global store and as each target's overlay.
#[derive(Debug, Default)]
pub struct ConfigStore {
    entries: HashMap<String, ConfigEntry>,
}

impl ConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a literal value, replacing any previous entry.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ConfigValue>) {
        let name = name.into();
        self.entries
            .insert(name.clone(), ConfigEntry::literal(name, value));
    }

    /// Set a deferred value, replacing any previous entry.
    pub fn set_lazy<F, V>(&mut self, name: impl Into<String>, producer: F)
    where
        F: FnOnce() -> V + Send + 'static,
        V: Into<ConfigValue>,
    {
        let name = name.into();
        self.entries
            .insert(name.clone(), ConfigEntry::deferred(name, producer));
    }

    /// Get an entry.
    pub fn get(&self, name: &str) -> Option<&ConfigEntry> {
        self.entries.get(name)
    }

    /// Check if an entry exists.
    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Lookup for ConfigStore {
    fn lookup(&self, name: &str) -> Option<&ConfigEntry> {
        self.get(name)
    }
}

/// The global store seen through the current target's overlay.
#[derive(Debug, Clone, Copy)]
pub struct Layered<'a> {
    overlay: Option<&'a ConfigStore>,
    global: &'a ConfigStore,
}

impl<'a> Layered<'a> {
    /// Layer `overlay` (if any) above `global`.
    pub fn new(overlay: Option<&'a ConfigStore>, global: &'a ConfigStore) -> Self {
        Self { overlay, global }
    }
}

impl Lookup for Layered<'_> {
    fn lookup(&self, name: &str) -> Option<&ConfigEntry> {
        self.overlay
            .and_then(|o| o.get(name))
            .or_else(|| self.global.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn literal_entry_is_resolved() {
        let entry = ConfigEntry::literal("env", "prod");
        assert!(entry.is_resolved());
        assert_eq!(entry.as_string(), "prod");
    }

    #[test]
    fn producer_runs_once_and_returns_same_value() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let entry = ConfigEntry::deferred("rev", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "abc123"
        });

        assert!(!entry.is_resolved());
        let first = entry.value();
        let second = entry.value();

        assert!(std::ptr::eq(first, second));
        assert_eq!(first.as_string(), "abc123");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn producer_memoization_is_shared_across_threads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let entry = Arc::new(ConfigEntry::deferred("n", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            7
        }));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let entry = Arc::clone(&entry);
                std::thread::spawn(move || entry.int())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn store_get_returns_none_for_missing() {
        let store = ConfigStore::new();
        assert!(store.get("missing").is_none());
        assert!(!store.has("missing"));
    }

    #[test]
    fn store_set_replaces_previous_entry() {
        let mut store = ConfigStore::new();
        store.set("k", "one");
        store.set("k", "two");
        assert_eq!(store.get("k").unwrap().as_string(), "two");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn layered_prefers_overlay() {
        let mut global = ConfigStore::new();
        global.set("k", "g");
        let mut overlay = ConfigStore::new();
        overlay.set("k", "t");

        let with_target = Layered::new(Some(&overlay), &global);
        assert_eq!(with_target.lookup("k").unwrap().as_string(), "t");

        let without_target = Layered::new(None, &global);
        assert_eq!(without_target.lookup("k").unwrap().as_string(), "g");
    }

    #[test]
    fn layered_falls_back_to_global() {
        let mut global = ConfigStore::new();
        global.set("only_global", "yes");
        let overlay = ConfigStore::new();

        let layered = Layered::new(Some(&overlay), &global);
        assert!(layered.contains("only_global"));
        assert!(!layered.contains("nowhere"));
    }

    #[test]
    #[should_panic(expected = "is string, not int")]
    fn int_accessor_panics_on_wrong_type() {
        let entry = ConfigEntry::literal("port", "eighty");
        entry.int();
    }

    #[test]
    fn try_accessors_report_instead_of_panicking() {
        let entry = ConfigEntry::literal("flag", 1);
        assert!(entry.try_bool().is_err());
        assert_eq!(entry.try_int().unwrap(), 1);
    }

    #[test]
    fn names_are_sorted() {
        let mut store = ConfigStore::new();
        store.set("b", 1);
        store.set("a", 2);
        assert_eq!(store.names(), vec!["a", "b"]);
    }
}
