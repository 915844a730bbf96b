//! Configuration values, storage and template resolution.
//!
//! - Typed values in [`value`]
//! - The lazy, overlay-aware store in [`store`]
//! - `{{ name }}` resolution in [`template`]
//!
//! # Example
//!
//! ```
//! use stagehand::config::{ConfigStore, Layered, Lookup};
//!
//! let mut global = ConfigStore::new();
//! global.set("env", "prod");
//! let mut overlay = ConfigStore::new();
//! overlay.set("env", "special");
//!
//! let seen_from_target = Layered::new(Some(&overlay), &global);
//! assert_eq!(seen_from_target.lookup("env").unwrap().as_string(), "special");
//! ```

pub mod store;
pub mod template;
pub mod value;

pub use store::{ConfigEntry, ConfigStore, Layered, Lookup, Producer};
pub use template::{has_placeholders, parse, placeholders, MAX_DEPTH};
pub use value::ConfigValue;
