//! Configuration access port trait.

/// Raw string access to a sectioned config. Typed parsing and range checks
/// live with the callers so a malformed value is an error, never a default.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Keys present in `section`, sorted. Empty when the section is absent.
    fn section_keys(&self, section: &str) -> Vec<String>;
}
