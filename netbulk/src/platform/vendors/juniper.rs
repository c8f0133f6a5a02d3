//! Juniper JunOS platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>                    # operational mode
//! {master:0}
//! user@router>                    # operational mode on a VC member
//! [edit]
//! user@router#                    # configuration mode
//! ```
//!
//! Configuration is staged in the candidate datastore and applied with
//! `commit` before `exit configuration-mode`.

use crate::error::Result;
use crate::platform::PlatformDefinition;

/// Create the Juniper JunOS platform definition.
pub fn platform() -> Result<PlatformDefinition> {
    Ok(PlatformDefinition::new(
        "juniper_junos",
        r"(?m)^[\w\-@()/:.]{1,63}[>#]\s*$",
        r"(?m)^[\w\-@()/:.]{1,63}#\s*$",
    )?
    .with_config_enter("configure")
    .with_commit("commit")
    .with_config_exit("exit configuration-mode")
    .with_on_open_command("set cli screen-length 0")
    .with_on_open_command("set cli screen-width 511")
    .with_on_open_command("set cli complete-on-space off")
    .with_failure_pattern("unknown command")
    .with_failure_pattern("syntax error")
    .with_failure_pattern("error:")
    .with_failure_pattern("missing argument")
    .with_failure_pattern("is ambiguous")
    .with_failure_pattern("No valid completions")
    .with_failure_pattern("missing mandatory argument")
    .with_failure_pattern("invalid numeric value"))
}
