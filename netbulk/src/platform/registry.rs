//! Platform lookup by name and by vendor display name.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use log::warn;

use super::definition::PlatformDefinition;
use super::vendors;
use crate::error::{PlatformError, Result};

/// Platform used when neither the row nor the run names one.
pub const DEFAULT_PLATFORM: &str = "cisco_ios";

/// Vendor display names (as offered to operators) and their platform names.
const VENDOR_PLATFORMS: &[(&str, &str)] = &[
    ("Cisco IOS", "cisco_ios"),
    ("Cisco XR", "cisco_xr"),
    ("Cisco NX-OS", "cisco_nxos"),
    ("Juniper Junos", "juniper_junos"),
    ("Nokia SR OS", "nokia_sros"),
    ("Huawei VRP", "huawei"),
    ("Arista EOS", "arista_eos"),
];

/// Global platform registry.
static REGISTRY: LazyLock<RwLock<PlatformRegistry>> = LazyLock::new(|| {
    let mut registry = PlatformRegistry::new();
    registry.register_builtin_platforms();
    RwLock::new(registry)
});

/// Registry for platform definitions.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    platforms: HashMap<String, PlatformDefinition>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the global registry.
    pub fn global() -> &'static RwLock<PlatformRegistry> {
        &REGISTRY
    }

    /// Look up a platform in the global registry and clone it.
    pub fn lookup(name: &str) -> Result<PlatformDefinition> {
        let registry = Self::global()
            .read()
            .map_err(|_| PlatformError::InvalidDefinition {
                message: "platform registry lock poisoned".to_string(),
            })?;

        registry.get(name).cloned().ok_or_else(|| {
            PlatformError::UnknownPlatform {
                name: name.to_string(),
            }
            .into()
        })
    }

    fn register_builtin_platforms(&mut self) {
        let builtins = [
            vendors::cisco::ios(),
            vendors::cisco::xr(),
            vendors::cisco::nxos(),
            vendors::juniper::platform(),
            vendors::nokia_sros::platform(),
            vendors::huawei::platform(),
            vendors::arista::platform(),
            vendors::linux::platform(),
        ];

        for platform in builtins {
            match platform {
                Ok(platform) => self.register(platform),
                Err(e) => warn!("Skipping built-in platform: {e}"),
            }
        }
    }

    /// Register a platform definition, replacing any with the same name.
    pub fn register(&mut self, platform: PlatformDefinition) {
        self.platforms.insert(platform.name.clone(), platform);
    }

    /// Get a platform by name.
    pub fn get(&self, name: &str) -> Option<&PlatformDefinition> {
        self.platforms.get(name)
    }
}

/// Map a vendor selection to a platform name.
///
/// Accepts the vendor display names (`"Cisco XR"`) and platform names
/// themselves (`"cisco_xr"`). Returns `None` for anything else.
pub fn platform_for_vendor(vendor: &str) -> Option<&'static str> {
    let vendor = vendor.trim();
    VENDOR_PLATFORMS
        .iter()
        .find(|(display, platform)| {
            display.eq_ignore_ascii_case(vendor) || platform.eq_ignore_ascii_case(vendor)
        })
        .map(|(_, platform)| *platform)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = PlatformRegistry::global().read().unwrap();
        for name in [
            "cisco_ios",
            "cisco_xr",
            "cisco_nxos",
            "juniper_junos",
            "nokia_sros",
            "huawei",
            "arista_eos",
            "linux",
        ] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_lookup_unknown() {
        let err = PlatformRegistry::lookup("vyos").unwrap_err();
        assert!(err.to_string().contains("vyos"));
    }

    #[test]
    fn test_vendor_mapping() {
        assert_eq!(platform_for_vendor("Cisco XR"), Some("cisco_xr"));
        assert_eq!(platform_for_vendor("Huawei VRP"), Some("huawei"));
        assert_eq!(platform_for_vendor("juniper_junos"), Some("juniper_junos"));
        assert_eq!(platform_for_vendor("Mikrotik"), None);
    }
}
