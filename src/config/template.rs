//! `{{ name }}` placeholder resolution.
//!
//! Any string handed to a print, local or remote helper may reference
//! configuration values with `{{ name }}` (whitespace tolerant, names made of
//! word characters, `.` and `/`).
//!
//! # Rules
//!
//! - A placeholder resolves to the entry's value rendered as text
//! - The resolved text is parsed again, so values may reference other values
//! - Unknown names are left in place untouched
//! - Expansion deeper than [`MAX_DEPTH`] is an error (self-referencing config)
//!
//! # Example
//!
//! ```
//! use stagehand::config::{parse, ConfigStore};
//!
//! let mut store = ConfigStore::new();
//! store.set("release", "/var/www/{{ app }}/current");
//! store.set("app", "shop");
//! assert_eq!(parse("cd {{release}}", &store).unwrap(), "cd /var/www/shop/current");
//! ```

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, StagehandError};

use super::store::Lookup;

/// Maximum nesting of placeholder expansion.
pub const MAX_DEPTH: usize = 32;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([\w./]+)\s*\}\}").unwrap());

/// Resolve every placeholder in `text` against `lookup`.
///
/// # Errors
///
/// Returns `TemplateDepthExceeded` when values keep referencing each other
/// past [`MAX_DEPTH`] levels.
pub fn parse(text: &str, lookup: &impl Lookup) -> Result<String> {
    expand(text, lookup, 0, text)
}

fn expand(text: &str, lookup: &impl Lookup, depth: usize, origin: &str) -> Result<String> {
    if !PLACEHOLDER.is_match(text) {
        return Ok(text.to_string());
    }
    if depth >= MAX_DEPTH {
        return Err(StagehandError::TemplateDepthExceeded {
            template: origin.to_string(),
            depth: MAX_DEPTH,
        });
    }

    let mut result = String::with_capacity(text.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        result.push_str(&text[last..whole.start()]);
        match lookup.lookup(name.as_str()) {
            Some(entry) => {
                let resolved = expand(&entry.as_string(), lookup, depth + 1, origin)?;
                result.push_str(&resolved);
            }
            None => result.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    result.push_str(&text[last..]);

    Ok(result)
}

/// Names referenced by placeholders in `text`, deduplicated and sorted.
pub fn placeholders(text: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Check if `text` contains any placeholder.
pub fn has_placeholders(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::store::{ConfigStore, Layered};

    fn store(pairs: &[(&str, &str)]) -> ConfigStore {
        let mut store = ConfigStore::new();
        for (k, v) in pairs {
            store.set(*k, *v);
        }
        store
    }

    #[test]
    fn literal_text_is_unchanged() {
        let s = store(&[]);
        assert_eq!(parse("hello world", &s).unwrap(), "hello world");
    }

    #[test]
    fn replaces_single_placeholder() {
        let s = store(&[("name", "world")]);
        assert_eq!(parse("hello {{name}}!", &s).unwrap(), "hello world!");
    }

    #[test]
    fn tolerates_whitespace_inside_braces() {
        let s = store(&[("env", "prod")]);
        assert_eq!(parse("echo {{  env }}", &s).unwrap(), "echo prod");
    }

    #[test]
    fn resolves_recursively() {
        let s = store(&[("a", "{{b}}"), ("b", "x")]);
        assert_eq!(parse("{{a}}", &s).unwrap(), "x");
    }

    #[test]
    fn names_may_contain_dots_and_slashes() {
        let s = store(&[("bin/mysql", "mysql -uroot"), ("db.name", "shop")]);
        assert_eq!(
            parse("{{bin/mysql}} {{db.name}}", &s).unwrap(),
            "mysql -uroot shop"
        );
    }

    #[test]
    fn unknown_names_are_left_verbatim() {
        let s = store(&[("known", "k")]);
        assert_eq!(
            parse("{{known}} {{ unknown }}", &s).unwrap(),
            "k {{ unknown }}"
        );
    }

    #[test]
    fn adjacent_placeholders() {
        let s = store(&[("a", "1"), ("b", "2")]);
        assert_eq!(parse("{{a}}{{b}}", &s).unwrap(), "12");
    }

    #[test]
    fn self_reference_hits_depth_cap() {
        let s = store(&[("loop", "again {{loop}}")]);
        let err = parse("{{loop}}", &s).unwrap_err();
        assert!(matches!(
            err,
            StagehandError::TemplateDepthExceeded { depth: MAX_DEPTH, .. }
        ));
    }

    #[test]
    fn mutual_reference_hits_depth_cap() {
        let s = store(&[("a", "{{b}}"), ("b", "{{a}}")]);
        assert!(parse("{{a}}", &s).is_err());
    }

    #[test]
    fn non_string_values_are_rendered() {
        let mut s = ConfigStore::new();
        s.set("port", 2222);
        s.set("debug", true);
        assert_eq!(parse("-p {{port}} {{debug}}", &s).unwrap(), "-p 2222 true");
    }

    #[test]
    fn overlay_values_take_part_in_recursion() {
        let global = store(&[("path", "/srv/{{env}}"), ("env", "prod")]);
        let overlay = store(&[("env", "staging")]);
        let layered = Layered::new(Some(&overlay), &global);
        assert_eq!(parse("{{path}}", &layered).unwrap(), "/srv/staging");
    }

    #[test]
    fn placeholders_lists_unique_names() {
        let names = placeholders("{{a}} {{ b }} {{a}}");
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn has_placeholders_detects_tokens() {
        assert!(has_placeholders("x {{y}}"));
        assert!(!has_placeholders("x {y}"));
        assert!(!has_placeholders("{{ has space }}"));
    }
}
