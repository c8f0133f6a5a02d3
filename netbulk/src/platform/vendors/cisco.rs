//! Cisco platform definitions: IOS/IOS-XE, IOS-XR and NX-OS.
//!
//! # Prompt Examples
//!
//! ```text
//! router>                          # IOS user exec
//! router#                          # IOS privileged exec
//! router(config-if)#               # IOS configuration sub-mode
//! RP/0/RSP0/CPU0:pe1#              # IOS-XR exec
//! RP/0/RSP0/CPU0:pe1(config)#      # IOS-XR configuration (candidate)
//! nexus(config-vlan)#              # NX-OS configuration
//! ```

use crate::error::Result;
use crate::platform::PlatformDefinition;

const IOS_PROMPT: &str = r"(?m)^[\w.\-@/:]{1,63}(?:\([\w.\-@/:+]{0,32}\))?[>#]\s*$";
const IOS_CONFIG_PROMPT: &str = r"(?m)^[\w.\-@/:]{1,63}\(config[\w.\-@/:+]{0,32}\)#\s*$";

const XR_PROMPT: &str = r"(?m)^[\w.\-@/:]{1,63}(?:\(config[\w.\-@/:+]{0,32}\))?#\s*$";

/// Create the Cisco IOS / IOS-XE platform definition.
pub fn ios() -> Result<PlatformDefinition> {
    Ok(
        PlatformDefinition::new("cisco_ios", IOS_PROMPT, IOS_CONFIG_PROMPT)?
            .with_config_enter("configure terminal")
            .with_config_exit("end")
            .with_on_open_command("terminal length 0")
            .with_on_open_command("terminal width 512")
            .with_failure_pattern("% Ambiguous command")
            .with_failure_pattern("% Incomplete command")
            .with_failure_pattern("% Invalid input detected")
            .with_failure_pattern("% Unknown command")
            .with_terminal_width(512),
    )
}

/// Create the Cisco IOS-XR platform definition.
///
/// IOS-XR edits a candidate configuration, so configuration sets end
/// with `commit` before leaving configuration mode.
pub fn xr() -> Result<PlatformDefinition> {
    Ok(
        PlatformDefinition::new("cisco_xr", XR_PROMPT, IOS_CONFIG_PROMPT)?
            .with_config_enter("configure terminal")
            .with_commit("commit")
            .with_config_exit("end")
            .with_on_open_command("terminal length 0")
            .with_on_open_command("terminal width 512")
            .with_failure_pattern("% Ambiguous command")
            .with_failure_pattern("% Incomplete command")
            .with_failure_pattern("% Invalid input detected")
            .with_failure_pattern("% Failed to commit")
            .with_terminal_width(512),
    )
}

/// Create the Cisco NX-OS platform definition.
pub fn nxos() -> Result<PlatformDefinition> {
    Ok(
        PlatformDefinition::new("cisco_nxos", IOS_PROMPT, IOS_CONFIG_PROMPT)?
            .with_config_enter("configure terminal")
            .with_config_exit("end")
            .with_on_open_command("terminal length 0")
            .with_on_open_command("terminal width 511")
            .with_failure_pattern("% Ambiguous command")
            .with_failure_pattern("% Incomplete command")
            .with_failure_pattern("% Invalid command")
            .with_failure_pattern("% Invalid input detected"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ios_prompts() {
        let platform = ios().unwrap();
        assert!(platform.prompt_pattern.is_match(b"router>"));
        assert!(platform.prompt_pattern.is_match(b"router#"));
        assert!(platform.prompt_pattern.is_match(b"output\nrouter(config-if)# "));
        assert!(!platform.prompt_pattern.is_match(b"Building configuration..."));

        assert!(platform.config_prompt_pattern.is_match(b"router(config)#"));
        assert!(platform.config_prompt_pattern.is_match(b"router(config-router)#"));
        assert!(!platform.config_prompt_pattern.is_match(b"router#"));
    }

    #[test]
    fn test_xr_prompts() {
        let platform = xr().unwrap();
        assert!(platform.prompt_pattern.is_match(b"RP/0/RSP0/CPU0:pe1#"));
        assert!(platform.config_prompt_pattern.is_match(b"RP/0/RSP0/CPU0:pe1(config)#"));
        assert_eq!(platform.commit_command.as_deref(), Some("commit"));
    }

    #[test]
    fn test_nxos_definition() {
        let platform = nxos().unwrap();
        assert_eq!(platform.name, "cisco_nxos");
        assert!(platform.prompt_pattern.is_match(b"nexus(config-vlan)#"));
        assert!(platform.commit_command.is_none());
    }
}
