//! Interception-layer seam.
//!
//! # Responsibilities
//! - Define the trait the rule applier installs rules through
//! - Define the install failure modes
//! - Provide the in-process layer implementation used by the daemon and
//!   the test suite
//!
//! # Design Decisions
//! - The layer only exposes "remove these ids, add these rules", not an
//!   atomic swap; see `memory` for the consequences
//! - Rules arrive as data; the layer owns regex compilation so a
//!   malformed pattern is rejected at install time, not per request

pub mod memory;

use thiserror::Error;

use crate::rules::CompiledRule;

/// Errors from rule installation.
#[derive(Debug, Error)]
pub enum RuleInstallError {
    /// A rule's URL regex failed to compile.
    #[error("rule {rule_id} has an invalid regex: {source}")]
    InvalidRegex {
        rule_id: u32,
        #[source]
        source: regex::Error,
    },

    /// Installing would exceed the layer's rule capacity.
    #[error("rule set of {requested} exceeds layer capacity of {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
}

/// The host facility that inspects outgoing requests and applies
/// installed rules.
pub trait InterceptLayer: Send + Sync {
    /// Snapshot of currently installed rules.
    fn active_rules(&self) -> Vec<CompiledRule>;

    /// Remove the given rule ids, then install the new rules.
    ///
    /// Not atomic: a failure after removal leaves the layer holding
    /// neither the old nor the new set.
    fn replace_rules(
        &self,
        remove_ids: &[u32],
        add: Vec<CompiledRule>,
    ) -> Result<(), RuleInstallError>;
}

/// An outgoing request as seen by the layer's matcher.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub url: String,
    pub method: String,
}

impl RequestContext {
    pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
        }
    }
}
