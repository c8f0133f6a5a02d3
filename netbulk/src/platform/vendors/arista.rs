//! Arista EOS platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! switch>                            # exec mode
//! switch#                            # privilege_exec mode
//! switch(config)#                    # configuration mode
//! switch(config-if-Et1)#             # config sub-mode (interface)
//! ```

use crate::error::Result;
use crate::platform::PlatformDefinition;

/// Create the Arista EOS platform definition.
pub fn platform() -> Result<PlatformDefinition> {
    Ok(PlatformDefinition::new(
        "arista_eos",
        r"(?mi)^[\w.\-@/: ]{1,63}(?:\(config[\w.\-@/:+]{0,63}\))?[>#]\s?$",
        r"(?mi)^[\w.\-@/: ]{1,63}\(config[\w.\-@/:+]{0,63}\)#\s?$",
    )?
    .with_config_enter("configure terminal")
    .with_config_exit("end")
    .with_on_open_command("terminal length 0")
    .with_on_open_command("terminal width 32767")
    .with_failure_pattern("% Ambiguous command")
    .with_failure_pattern("% Error")
    .with_failure_pattern("% Incomplete command")
    .with_failure_pattern("% Invalid input")
    .with_failure_pattern("% Cannot commit")
    .with_failure_pattern("% Unavailable command")
    .with_terminal_width(32767))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arista_prompts() {
        let platform = platform().unwrap();
        assert!(platform.prompt_pattern.is_match(b"switch>"));
        assert!(platform.prompt_pattern.is_match(b"switch.lab#"));
        assert!(platform.config_prompt_pattern.is_match(b"switch(config-if-Et1)#"));
        assert!(!platform.config_prompt_pattern.is_match(b"switch#"));
    }
}
