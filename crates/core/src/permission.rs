//! Per-add-on log viewing permissions.
//!
//! Each add-on may register an admin permission named after its id. Viewing
//! an add-on's logs requires that permission, unless it was never
//! registered, in which case access is open.

use std::collections::HashSet;

/// Prefix of every per-add-on log permission id.
pub const PERMISSION_PREFIX: &str = "sylLib_";

/// Longest permission key (in bytes) that fits after the prefix.
pub const MAX_PERMISSION_KEY_LEN: usize = 25;

/// Permission that unlocks the dashboard's high-priority log indicator.
pub const VIEW_LOGS_PERMISSION: &str = "viewLogs";

/// Lowercase the add-on id, replace `/` with `_` and cut it to
/// [`MAX_PERMISSION_KEY_LEN`] bytes without splitting a character.
pub fn format_addon_id_for_permission(addon_id: &str) -> String {
    let mut key = addon_id.replace('/', "_").to_lowercase();
    if key.len() > MAX_PERMISSION_KEY_LEN {
        let mut cut = MAX_PERMISSION_KEY_LEN;
        while !key.is_char_boundary(cut) {
            cut -= 1;
        }
        key.truncate(cut);
    }
    key
}

/// Full permission id guarding an add-on's logs.
pub fn permission_id_for_addon(addon_id: &str) -> String {
    format!("{PERMISSION_PREFIX}{}", format_addon_id_for_permission(addon_id))
}

/// Everything needed to decide admin permission checks for one user.
#[derive(Debug, Clone, Default)]
pub struct AdminPermissions {
    pub is_super_admin: bool,
    /// Every permission id known to the system.
    pub registered: HashSet<String>,
    /// Permission ids granted to this user.
    pub granted: HashSet<String>,
}

impl AdminPermissions {
    /// Standard check: super admins pass, everyone else needs the grant.
    pub fn has(&self, permission_id: &str) -> bool {
        self.is_super_admin || self.granted.contains(permission_id)
    }

    /// Whether this user may view logs belonging to `addon_id`.
    ///
    /// An add-on without a registered permission is visible to every admin.
    pub fn can_view_addon_logs(&self, addon_id: &str) -> bool {
        if self.is_super_admin {
            return true;
        }

        let permission_id = permission_id_for_addon(addon_id);
        if !self.registered.contains(&permission_id) {
            return true;
        }

        self.has(&permission_id)
    }
}
