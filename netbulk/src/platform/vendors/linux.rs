//! Linux platform definition.
//!
//! The simplest platform: `$` (user) and `#` (root) shell prompts and no
//! configuration mode, so a configuration set is just a command sequence.

use crate::error::Result;
use crate::platform::PlatformDefinition;

/// Create the Linux platform definition.
pub fn platform() -> Result<PlatformDefinition> {
    Ok(
        PlatformDefinition::new("linux", r"[$#]\s*$", r"[$#]\s*$")?
            .with_failure_pattern("command not found")
            .with_failure_pattern("No such file or directory")
            .with_failure_pattern("Permission denied"),
    )
}
