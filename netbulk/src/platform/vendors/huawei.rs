//! Huawei VRP platform definition.
//!
//! # Prompt Examples
//!
//! ```text
//! <HUAWEI>                 # user view
//! [HUAWEI]                 # system view
//! [HUAWEI-GigabitEthernet0/0/1]
//! [~HUAWEI]                # VRP8 two-stage commit view
//! ```

use crate::error::Result;
use crate::platform::PlatformDefinition;

/// Create the Huawei VRP platform definition.
pub fn platform() -> Result<PlatformDefinition> {
    Ok(PlatformDefinition::new(
        "huawei",
        r"(?m)^(?:<[\w\-.:/]{1,63}>|\[[~*]{0,2}[\w\-.:/]{1,63}\])\s*$",
        r"(?m)^\[[~*]{0,2}[\w\-.:/]{1,63}\]\s*$",
    )?
    .with_config_enter("system-view")
    .with_config_exit("return")
    .with_on_open_command("screen-length 0 temporary")
    .with_failure_pattern("Error:")
    .with_failure_pattern("Unrecognized command")
    .with_failure_pattern("Wrong parameter")
    .with_failure_pattern("Incomplete command"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_huawei_prompts() {
        let platform = platform().unwrap();
        assert!(platform.prompt_pattern.is_match(b"<HUAWEI>"));
        assert!(platform.prompt_pattern.is_match(b"[HUAWEI-GigabitEthernet0/0/1]"));
        assert!(platform.config_prompt_pattern.is_match(b"[~CE6850]"));
        assert!(!platform.config_prompt_pattern.is_match(b"<HUAWEI>"));
    }
}
