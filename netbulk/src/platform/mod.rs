//! Platform definitions for multi-vendor support.
//!
//! This module defines vendor-specific CLI behavior: prompt patterns,
//! configuration-mode entry/exit, commit semantics, paging setup, and the
//! output fragments that signal a rejected command.

mod definition;
mod registry;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use registry::{DEFAULT_PLATFORM, PlatformRegistry, platform_for_vendor};
