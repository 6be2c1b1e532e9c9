//! Best-effort attribution of a log entry to an owning add-on.
//!
//! Callers should pass an explicit owner. When they don't, a [`CallChain`]
//! captured at the boundary can be walked outward to find the first frame
//! that belongs to an installed add-on other than this library. Anything
//! that cannot be attributed goes to [`HOST_PLATFORM_ADDON_ID`].

use std::collections::HashSet;

use crate::addon::{addon_id_from_namespace, same_addon, HOST_PLATFORM_ADDON_ID, LIBRARY_ADDON_ID};

/// One frame of a call chain, identified by its namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    pub namespace: String,
}

impl CallFrame {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

/// Capture the current module path as a [`CallFrame`].
#[macro_export]
macro_rules! call_frame {
    () => {
        $crate::attribution::CallFrame::new(module_path!())
    };
}

/// Frames from the logging call outward (innermost first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallChain {
    frames: Vec<CallFrame>,
}

impl CallChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next outer frame.
    pub fn push(mut self, frame: CallFrame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Build a chain from namespaces, innermost first.
    pub fn from_namespaces<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            frames: namespaces.into_iter().map(CallFrame::new).collect(),
        }
    }

    pub fn frames(&self) -> &[CallFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Lookup of installed add-on ids.
pub trait InstalledAddons {
    fn is_installed(&self, addon_id: &str) -> bool;
}

impl InstalledAddons for HashSet<String> {
    fn is_installed(&self, addon_id: &str) -> bool {
        self.contains(addon_id)
    }
}

/// Walk `chain` and return the first installed add-on that is not this
/// library, or the host platform sentinel.
pub fn resolve_owner(chain: &CallChain, installed: &impl InstalledAddons) -> String {
    chain
        .frames()
        .iter()
        .filter_map(|frame| addon_id_from_namespace(&frame.namespace))
        .filter(|addon_id| !same_addon(addon_id, LIBRARY_ADDON_ID))
        .find(|addon_id| installed.is_installed(addon_id))
        .unwrap_or_else(|| HOST_PLATFORM_ADDON_ID.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn direct_addon_caller_resolves_immediately() {
        let chain = CallChain::from_namespaces(["Vendor::Addon::controller", "host::router"]);
        assert_eq!(resolve_owner(&chain, &installed(&["Vendor/Addon"])), "Vendor/Addon");
    }

    #[test]
    fn library_helper_frames_are_skipped() {
        let chain = CallChain::from_namespaces([
            "Sylphian::Library::repository::log",
            "Sylphian\\Library\\Install\\Helper",
            "Vendor::Addon::setup",
        ]);
        assert_eq!(
            resolve_owner(&chain, &installed(&["Sylphian/Library", "Vendor/Addon"])),
            "Vendor/Addon"
        );
    }

    #[test]
    fn uninstalled_frames_are_passed_over() {
        let chain = CallChain::from_namespaces(["Ghost::Addon::x", "Vendor::Addon::y"]);
        assert_eq!(resolve_owner(&chain, &installed(&["Vendor/Addon"])), "Vendor/Addon");
    }

    #[test]
    fn no_matching_frame_falls_back_to_host_platform() {
        let chain = CallChain::from_namespaces(["main", "Sylphian::Library::logger", "Ghost::Addon"]);
        assert_eq!(
            resolve_owner(&chain, &installed(&["Sylphian/Library"])),
            HOST_PLATFORM_ADDON_ID
        );
    }

    #[test]
    fn empty_chain_falls_back_to_host_platform() {
        assert_eq!(resolve_owner(&CallChain::new(), &installed(&[])), HOST_PLATFORM_ADDON_ID);
    }

    #[test]
    fn chains_built_frame_by_frame() {
        let chain = CallChain::new().push(CallFrame::new("Acme::Maps::tile"));
        assert_eq!(resolve_owner(&chain, &installed(&["Acme/Maps"])), "Acme/Maps");
    }

    #[test]
    fn call_frame_macro_captures_module_path() {
        let frame = call_frame!();
        assert!(frame.namespace.ends_with("attribution::tests"));
    }
}
