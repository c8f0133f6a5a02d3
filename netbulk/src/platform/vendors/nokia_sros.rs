//! Nokia SR OS (MD-CLI) platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! [/]
//! A:admin@pe1#                     # operational mode
//! (pr)[/]
//! A:admin@pe1#                     # private candidate configuration
//! *(pr)[/configure router "Base"]
//! A:admin@pe1#                     # uncommitted changes present
//! ```
//!
//! Configuration sets run in a private candidate (`edit-config private`),
//! are committed, then leave with `quit-config`.

use crate::error::Result;
use crate::platform::PlatformDefinition;

/// Create the Nokia SR OS MD-CLI platform definition.
pub fn platform() -> Result<PlatformDefinition> {
    Ok(PlatformDefinition::new(
        "nokia_sros",
        r"(?mi)^!?\*?[abcd]:[\w._-]+@[\w\s_.-]+#\s?$",
        r"(?mi)^!?\*?\((?:ex|pr|gl|ex:bof)\)\[[^\]\n]*\]\n!?\*?[abcd]:[\w._-]+@[\w\s_.-]+#\s?$",
    )?
    .with_config_enter("edit-config private")
    .with_commit("commit")
    .with_config_exit("quit-config")
    .with_on_open_command("environment console width 512")
    .with_on_open_command("environment more false")
    .with_failure_pattern("MINOR:")
    .with_failure_pattern("MAJOR:")
    .with_failure_pattern("CRITICAL:")
    .with_failure_pattern("Error:")
    .with_failure_pattern("Bad Command:")
    .with_terminal_width(512))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operational_prompt() {
        let platform = platform().unwrap();
        assert!(platform.prompt_pattern.is_match(b"[/]\nA:admin@pe1#"));
        assert!(!platform.config_prompt_pattern.is_match(b"[/]\nA:admin@pe1#"));
    }

    #[test]
    fn test_private_candidate_prompt() {
        let platform = platform().unwrap();
        assert!(platform.config_prompt_pattern.is_match(b"(pr)[/]\nA:admin@pe1#"));
        assert!(
            platform
                .config_prompt_pattern
                .is_match(b"*(pr)[/configure router \"Base\"]\nA:admin@pe1# ")
        );
    }
}
