//! # Bluetooth Permission Gating
//!
//! Discovery may only start once the platform lets the app scan. Newer
//! platforms (version 31 and later) grant this through a multi-permission
//! prompt; older ones through a request to enable the Bluetooth adapter.
//!
//! | Platform | Request | Granted when |
//! |----------|---------|--------------|
//! | >= 31 | scan + connect + fine location | scan and fine location granted |
//! | < 31 | enable Bluetooth adapter | user accepts |

use std::collections::HashMap;

use tracing::{debug, info};

/// First platform version using runtime Bluetooth permissions.
pub const RUNTIME_BLUETOOTH_PERMISSIONS: u32 = 31;

/// Runtime permissions discovery depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    BluetoothScan,
    BluetoothConnect,
    AccessFineLocation,
}

/// Result of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    Denied,
}

impl PermissionOutcome {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// The platform side of the permission flow.
pub trait PermissionHost {
    fn platform_version(&self) -> u32;

    /// Prompt for several permissions at once.
    fn request_permissions(&mut self, permissions: &[Permission]) -> HashMap<Permission, bool>;

    /// Ask the user to enable the Bluetooth adapter.
    fn request_enable_bluetooth(&mut self) -> bool;
}

/// Request whatever the platform needs before a Bluetooth scan.
pub fn request_bluetooth(host: &mut dyn PermissionHost) -> PermissionOutcome {
    let version = host.platform_version();

    let granted = if version >= RUNTIME_BLUETOOTH_PERMISSIONS {
        let answers = host.request_permissions(&[
            Permission::BluetoothScan,
            Permission::BluetoothConnect,
            Permission::AccessFineLocation,
        ]);
        debug!(?answers, "permission prompt answered");

        let allowed = |p: Permission| answers.get(&p).copied().unwrap_or(false);
        allowed(Permission::BluetoothScan) && allowed(Permission::AccessFineLocation)
    } else {
        host.request_enable_bluetooth()
    };

    if granted {
        info!(version, "Bluetooth access granted");
        PermissionOutcome::Granted
    } else {
        info!(version, "Bluetooth access denied");
        PermissionOutcome::Denied
    }
}

/// A host whose answers are fixed up front.
///
/// Used where no interactive platform exists (the CLI) and in tests.
#[derive(Debug, Clone)]
pub struct StaticPermissions {
    version: u32,
    grants: HashMap<Permission, bool>,
    enable_bluetooth: bool,
    prompts: usize,
}

impl StaticPermissions {
    /// Grant everything.
    pub fn granted(version: u32) -> Self {
        Self {
            version,
            grants: HashMap::from([
                (Permission::BluetoothScan, true),
                (Permission::BluetoothConnect, true),
                (Permission::AccessFineLocation, true),
            ]),
            enable_bluetooth: true,
            prompts: 0,
        }
    }

    /// Deny everything.
    pub fn denied(version: u32) -> Self {
        Self {
            version,
            grants: HashMap::new(),
            enable_bluetooth: false,
            prompts: 0,
        }
    }

    /// Override the answer for a single permission.
    pub fn with(mut self, permission: Permission, granted: bool) -> Self {
        self.grants.insert(permission, granted);
        self
    }

    /// Number of prompts shown so far.
    pub fn prompts(&self) -> usize {
        self.prompts
    }
}

impl PermissionHost for StaticPermissions {
    fn platform_version(&self) -> u32 {
        self.version
    }

    fn request_permissions(&mut self, permissions: &[Permission]) -> HashMap<Permission, bool> {
        self.prompts += 1;
        permissions
            .iter()
            .map(|&p| (p, self.grants.get(&p).copied().unwrap_or(false)))
            .collect()
    }

    fn request_enable_bluetooth(&mut self) -> bool {
        self.prompts += 1;
        self.enable_bluetooth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modern_platform_needs_scan_and_location() {
        let mut host = StaticPermissions::granted(33);
        assert!(request_bluetooth(&mut host).is_granted());

        let mut host = StaticPermissions::granted(33).with(Permission::BluetoothScan, false);
        assert_eq!(request_bluetooth(&mut host), PermissionOutcome::Denied);

        let mut host =
            StaticPermissions::granted(33).with(Permission::AccessFineLocation, false);
        assert_eq!(request_bluetooth(&mut host), PermissionOutcome::Denied);
    }

    #[test]
    fn test_connect_permission_is_not_required() {
        let mut host = StaticPermissions::granted(31).with(Permission::BluetoothConnect, false);
        assert!(request_bluetooth(&mut host).is_granted());
    }

    #[test]
    fn test_legacy_platform_uses_enable_flow() {
        let mut host = StaticPermissions::granted(30).with(Permission::BluetoothScan, false);
        assert!(request_bluetooth(&mut host).is_granted());
        assert_eq!(host.prompts(), 1);

        let mut host = StaticPermissions::denied(28);
        assert_eq!(request_bluetooth(&mut host), PermissionOutcome::Denied);
    }
}
