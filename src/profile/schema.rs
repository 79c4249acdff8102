//! Profile schema definitions.
//!
//! All types derive Serde traits; this is also the on-disk and
//! import/export representation, so field defaults are explicit
//! (a missing `enabled` key means enabled, by type, not by convention).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single header override within a profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderOverride {
    /// Header name as the user typed it (case preserved for display;
    /// uniqueness within a profile is case-insensitive).
    pub name: String,

    /// Header value to set.
    pub value: String,

    /// Whether this override participates in compilation.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// HTTP methods a profile can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// Lowercase name used in compiled rule conditions.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
            Self::Patch => "patch",
            Self::Head => "head",
            Self::Options => "options",
        }
    }
}

/// One named configuration of header overrides and filters.
///
/// Empty `targets` means "all domains"; empty `methods` means
/// "all methods". Domain lists hold the user-authored strings and are
/// parsed into patterns at compile time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Profile {
    /// Ordered, name-deduplicated header overrides.
    pub headers: Vec<HeaderOverride>,

    /// Target-domain allow list.
    pub targets: Vec<String>,

    /// Excluded-domain deny list; takes precedence over targets.
    pub excludes: Vec<String>,

    /// Method filter.
    pub methods: Vec<HttpMethod>,
}

/// All profiles plus the currently active one.
///
/// Invariants (maintained by the ops module): `active_profile` always
/// keys an existing entry and the map is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProfileStore {
    pub profiles: BTreeMap<String, Profile>,

    #[serde(rename = "activeProfile")]
    pub active_profile: String,
}

impl Default for ProfileStore {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert("Default".to_string(), Profile::default());
        Self {
            profiles,
            active_profile: "Default".to_string(),
        }
    }
}

impl ProfileStore {
    /// The currently active profile.
    pub fn active(&self) -> &Profile {
        // The invariant guarantees the key exists; fall back to an empty
        // profile rather than panic if a caller bypassed the ops layer.
        static EMPTY: std::sync::OnceLock<Profile> = std::sync::OnceLock::new();
        self.profiles
            .get(&self.active_profile)
            .unwrap_or_else(|| EMPTY.get_or_init(Profile::default))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_defaults_true_when_missing() {
        let h: HeaderOverride =
            serde_json::from_str(r#"{"name":"X-Debug","value":"1"}"#).unwrap();
        assert!(h.enabled);
    }

    #[test]
    fn test_method_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&HttpMethod::Get).unwrap(), r#""GET""#);
        let m: HttpMethod = serde_json::from_str(r#""POST""#).unwrap();
        assert_eq!(m, HttpMethod::Post);
        assert_eq!(m.wire_name(), "post");
    }

    #[test]
    fn test_default_store_has_default_profile() {
        let store = ProfileStore::default();
        assert_eq!(store.active_profile, "Default");
        assert!(store.profiles.contains_key("Default"));
        assert!(store.active().headers.is_empty());
    }
}
