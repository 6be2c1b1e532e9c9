//! Add-on identifiers.
//!
//! An add-on is identified by a `Vendor/Name` pair. Two ids are reserved:
//! the host platform itself (the sentinel owner for anything that cannot be
//! attributed) and this library.

/// Sentinel owner: the host platform.
pub const HOST_PLATFORM_ADDON_ID: &str = "XF";

/// The logging library's own add-on id.
pub const LIBRARY_ADDON_ID: &str = "Sylphian/Library";

/// Column limit for `addon_logs.addon_id`.
pub const MAX_ADDON_ID_LEN: usize = 50;

/// Derive a `Vendor/Name` add-on id from a namespace path.
///
/// Accepts `Vendor::Name::module`, `Vendor\Name\Class` and `Vendor/Name/x`
/// spellings. Returns `None` when the namespace has fewer than two segments.
pub fn addon_id_from_namespace(namespace: &str) -> Option<String> {
    let mut segments = namespace
        .split(|c| c == '\\' || c == '/' || c == ':')
        .filter(|s| !s.is_empty());

    let vendor = segments.next()?;
    let name = segments.next()?;
    Some(format!("{vendor}/{name}"))
}

/// Whether two add-on ids name the same add-on (case-insensitive).
pub fn same_addon(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_module_paths_map_to_vendor_and_name() {
        assert_eq!(
            addon_id_from_namespace("Vendor::Addon::controller::index").as_deref(),
            Some("Vendor/Addon")
        );
    }

    #[test]
    fn backslash_namespaces_map_to_vendor_and_name() {
        assert_eq!(
            addon_id_from_namespace("Vendor\\Addon\\Admin\\Controller").as_deref(),
            Some("Vendor/Addon")
        );
    }

    #[test]
    fn single_segment_has_no_addon() {
        assert_eq!(addon_id_from_namespace("main"), None);
        assert_eq!(addon_id_from_namespace(""), None);
    }

    #[test]
    fn same_addon_ignores_case() {
        assert!(same_addon("sylphian/library", LIBRARY_ADDON_ID));
        assert!(!same_addon("Vendor/Addon", LIBRARY_ADDON_ID));
    }
}
