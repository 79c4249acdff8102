//! Compiled rule types.
//!
//! Rules cross the interception-layer seam as plain data, so everything
//! here derives Serde. A rule is one match condition set plus an ordered
//! list of header mutations.

use serde::{Deserialize, Serialize};

/// Resource categories a rule can match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    MainFrame,
    SubFrame,
    Stylesheet,
    Script,
    Image,
    Font,
    Object,
    XmlHttpRequest,
    Ping,
    Media,
    Websocket,
    WebTransport,
    WebBundle,
    Other,
}

impl ResourceCategory {
    /// Every category; header-injection rules match all resource kinds.
    pub const ALL: [ResourceCategory; 14] = [
        Self::MainFrame,
        Self::SubFrame,
        Self::Stylesheet,
        Self::Script,
        Self::Image,
        Self::Font,
        Self::Object,
        Self::XmlHttpRequest,
        Self::Ping,
        Self::Media,
        Self::Websocket,
        Self::WebTransport,
        Self::WebBundle,
        Self::Other,
    ];
}

/// Match conditions for one rule (AND semantics across fields).
///
/// A rule restricts by `url_regex`, by `excluded_domains`, by both, or by
/// neither — but never relies on both fields to express the same
/// exclusion. When both are present, an excluded-domain hit vetoes a
/// regex match; the layer must enforce that precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleConditions {
    /// Resource categories this rule applies to.
    pub resource_categories: Vec<ResourceCategory>,

    /// Lowercase method names; `None` means all methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_methods: Option<Vec<String>>,

    /// Anchored URL regex; `None` means no target restriction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_regex: Option<String>,

    /// Domains (and their subdomains) this rule must never match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_domains: Option<Vec<String>>,
}

/// One header mutation: set the header to the value, overwriting any
/// existing value and adding it when absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderAction {
    pub name: String,
    pub value: String,
}

/// The unit installed into the interception layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompiledRule {
    /// Freshly allocated on every compilation pass, monotonic from 1.
    pub id: u32,

    pub priority: u32,

    pub conditions: RuleConditions,

    /// Applied in profile order.
    pub header_actions: Vec<HeaderAction>,
}
