//! Targets: the machines tasks run against.
//!
//! - [`HostDescriptor`] parses `[ssh://][user@]host[:port]`
//! - [`TargetRegistry`] keeps declared targets with their roles, config
//!   overlay and keys, in registration order
//! - [`select`] and [`fan_out`] decide which targets a task body runs on

pub mod host;
pub mod registry;
pub mod selection;

pub use host::{HostDescriptor, DEFAULT_PORT};
pub use registry::{Target, TargetBuilder, TargetRegistry};
pub use selection::{fan_out, select, Selection, Selector};
