//! Profile-to-rule compilation.
//!
//! # Responsibilities
//! - Translate an active profile plus an enabled flag into the ordered
//!   rule set the interception layer should hold
//! - Choose the cheapest condition shape for the filters present
//!
//! # Design Decisions
//! - One rule per compilation, not one per header or per domain: a single
//!   rule keeps per-request evaluation cheap and avoids priority-ordering
//!   ambiguity between same-priority rules
//! - The common no-filter case short-circuits before any regex synthesis
//! - Exclusions are expressed once: either as the excluded-domain list
//!   alone, or alongside the target regex with layer-enforced precedence —
//!   never by rebuilding the regex to carve domains out

use tracing::debug;

use crate::pattern::{anchored_alternation, DomainPattern, PatternError};
use crate::profile::Profile;
use crate::rules::types::{CompiledRule, HeaderAction, ResourceCategory, RuleConditions};

/// Compile the rule set for a profile.
///
/// Returns an empty set when disabled or when no header override is
/// individually enabled, so the caller clears the layer.
pub fn compile(enabled: bool, profile: &Profile) -> Result<Vec<CompiledRule>, PatternError> {
    if !enabled {
        return Ok(Vec::new());
    }

    let actions: Vec<HeaderAction> = profile
        .headers
        .iter()
        .filter(|h| h.enabled)
        .map(|h| HeaderAction {
            name: h.name.clone(),
            value: h.value.clone(),
        })
        .collect();

    if actions.is_empty() {
        debug!("profile enabled but no active headers, compiling to empty set");
        return Ok(Vec::new());
    }

    let request_methods = if profile.methods.is_empty() {
        None
    } else {
        Some(
            profile
                .methods
                .iter()
                .map(|m| m.wire_name().to_string())
                .collect(),
        )
    };

    let mut conditions = RuleConditions {
        resource_categories: ResourceCategory::ALL.to_vec(),
        request_methods,
        url_regex: None,
        excluded_domains: None,
    };

    if !profile.targets.is_empty() {
        let targets = parse_all(&profile.targets)?;
        conditions.url_regex = Some(anchored_alternation(&targets));
    }
    if !profile.excludes.is_empty() {
        let excludes = parse_all(&profile.excludes)?;
        conditions.excluded_domains = Some(
            excludes
                .iter()
                .map(|p| p.exclusion_base().to_string())
                .collect(),
        );
    }

    let rules = vec![CompiledRule {
        id: 1,
        priority: 1,
        conditions,
        header_actions: actions,
    }];

    debug!(
        rules = rules.len(),
        targets = profile.targets.len(),
        excludes = profile.excludes.len(),
        "compiled rule set"
    );
    Ok(rules)
}

fn parse_all(raw: &[String]) -> Result<Vec<DomainPattern>, PatternError> {
    raw.iter().map(|d| DomainPattern::parse(d)).collect()
}
