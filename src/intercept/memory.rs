//! In-process interception layer.
//!
//! # Responsibilities
//! - Hold the installed rule table
//! - Validate and pre-compile URL regexes at install time
//! - Evaluate requests against installed rules, excluded domains taking
//!   precedence over a regex match
//! - Push match events to the session counter
//!
//! # Design Decisions
//! - Replacement is two-phase (remove, then insert). Between the phases
//!   there is a window during which no rules are active and traffic
//!   passes unmodified. That window is an accepted property of the
//!   replace-by-id interface, and the integration tests exercise the
//!   failure case that leaves the table empty.
//! - Match notifications go over an unbounded mpsc channel; the counter
//!   is read-mostly and tolerates lagging behind live traffic.

use std::sync::Arc;

use dashmap::DashMap;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

use crate::intercept::{InterceptLayer, RequestContext, RuleInstallError};
use crate::rules::{CompiledRule, HeaderAction};

/// Default rule capacity, mirroring typical dynamic-rule quotas in
/// request-interception hosts.
pub const DEFAULT_MAX_RULES: usize = 5_000;

struct InstalledRule {
    rule: CompiledRule,
    url_regex: Option<Regex>,
}

/// In-memory rule store and matcher.
pub struct MemoryLayer {
    rules: DashMap<u32, Arc<InstalledRule>>,
    capacity: usize,
    match_tx: mpsc::UnboundedSender<u32>,
}

impl MemoryLayer {
    /// Create a layer with the given rule capacity. Returns the layer and
    /// the receiver for rule-match notifications.
    pub fn new(capacity: usize) -> (Self, mpsc::UnboundedReceiver<u32>) {
        let (match_tx, match_rx) = mpsc::unbounded_channel();
        (
            Self {
                rules: DashMap::new(),
                capacity,
                match_tx,
            },
            match_rx,
        )
    }

    /// Evaluate a request against the installed rules and return the
    /// header mutations to apply, in rule-id then action order.
    ///
    /// Emits a match notification per matching rule.
    pub fn evaluate(&self, req: &RequestContext) -> Vec<HeaderAction> {
        let host = match extract_host(&req.url) {
            Some(h) => h,
            None => {
                warn!(url = %req.url, "unparseable request URL, no rules applied");
                return Vec::new();
            }
        };
        let method = req.method.to_lowercase();

        // Deterministic order for overlapping rules.
        let mut matched: Vec<Arc<InstalledRule>> = self
            .rules
            .iter()
            .filter(|entry| rule_matches(entry.value(), req, &host, &method))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        matched.sort_by_key(|r| r.rule.id);

        let mut actions = Vec::new();
        for installed in matched {
            let _ = self.match_tx.send(installed.rule.id);
            actions.extend(installed.rule.header_actions.iter().cloned());
        }
        actions
    }

    /// Number of installed rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl InterceptLayer for MemoryLayer {
    fn active_rules(&self) -> Vec<CompiledRule> {
        let mut rules: Vec<CompiledRule> =
            self.rules.iter().map(|e| e.value().rule.clone()).collect();
        rules.sort_by_key(|r| r.id);
        rules
    }

    fn replace_rules(
        &self,
        remove_ids: &[u32],
        add: Vec<CompiledRule>,
    ) -> Result<(), RuleInstallError> {
        // Phase 1: clear. From here until the insert below completes, the
        // table may be empty and requests pass through unmodified.
        for id in remove_ids {
            self.rules.remove(id);
        }

        let requested = self.rules.len() + add.len();
        if requested > self.capacity {
            return Err(RuleInstallError::CapacityExceeded {
                requested,
                capacity: self.capacity,
            });
        }

        // Validate every regex before inserting anything, so a bad rule
        // set never half-installs.
        let mut prepared = Vec::with_capacity(add.len());
        for rule in add {
            let url_regex = match &rule.conditions.url_regex {
                Some(pattern) => Some(Regex::new(pattern).map_err(|source| {
                    RuleInstallError::InvalidRegex {
                        rule_id: rule.id,
                        source,
                    }
                })?),
                None => None,
            };
            prepared.push(InstalledRule { rule, url_regex });
        }

        // Phase 2: install.
        let count = prepared.len();
        for installed in prepared {
            self.rules.insert(installed.rule.id, Arc::new(installed));
        }

        debug!(
            removed = remove_ids.len(),
            installed = count,
            active = self.rules.len(),
            "rule set replaced"
        );
        Ok(())
    }
}

fn rule_matches(installed: &InstalledRule, req: &RequestContext, host: &str, method: &str) -> bool {
    let conditions = &installed.rule.conditions;

    if let Some(methods) = &conditions.request_methods {
        if !methods.iter().any(|m| m == method) {
            return false;
        }
    }

    // Exclusion takes precedence over any regex match: an excluded entry
    // covers the domain itself and all of its subdomains.
    if let Some(excluded) = &conditions.excluded_domains {
        let hit = excluded
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{}", d)));
        if hit {
            return false;
        }
    }

    if let Some(re) = &installed.url_regex {
        if !re.is_match(&req.url) {
            return false;
        }
    }

    true
}

fn extract_host(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    parsed.host_str().map(|h| h.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleConditions;

    fn rule(id: u32, conditions: RuleConditions) -> CompiledRule {
        CompiledRule {
            id,
            priority: 1,
            conditions,
            header_actions: vec![HeaderAction {
                name: "X-Debug".to_string(),
                value: "1".to_string(),
            }],
        }
    }

    #[test]
    fn test_replace_then_evaluate() {
        let (layer, _rx) = MemoryLayer::new(10);
        layer
            .replace_rules(&[], vec![rule(1, RuleConditions::default())])
            .unwrap();

        let actions = layer.evaluate(&RequestContext::new("https://example.com/", "GET"));
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].name, "X-Debug");
    }

    #[test]
    fn test_excluded_domain_vetoes_regex_match() {
        let (layer, _rx) = MemoryLayer::new(10);
        let conditions = RuleConditions {
            url_regex: Some(r"^https?://(?:(?:[a-z0-9-]+\.)*example\.com)(?:/.*)?$".to_string()),
            excluded_domains: Some(vec!["ads.example.com".to_string()]),
            ..Default::default()
        };
        layer.replace_rules(&[], vec![rule(1, conditions)]).unwrap();

        let hit = layer.evaluate(&RequestContext::new("https://api.example.com/x", "GET"));
        assert_eq!(hit.len(), 1);

        let vetoed = layer.evaluate(&RequestContext::new("https://ads.example.com/x", "GET"));
        assert!(vetoed.is_empty());

        // Subdomains of the excluded entry are excluded too.
        let vetoed = layer.evaluate(&RequestContext::new("https://a.ads.example.com/", "GET"));
        assert!(vetoed.is_empty());
    }

    #[test]
    fn test_method_filter() {
        let (layer, _rx) = MemoryLayer::new(10);
        let conditions = RuleConditions {
            request_methods: Some(vec!["get".to_string(), "post".to_string()]),
            ..Default::default()
        };
        layer.replace_rules(&[], vec![rule(1, conditions)]).unwrap();

        assert!(!layer
            .evaluate(&RequestContext::new("https://example.com/", "GET"))
            .is_empty());
        assert!(layer
            .evaluate(&RequestContext::new("https://example.com/", "DELETE"))
            .is_empty());
    }

    #[test]
    fn test_invalid_regex_rejected_before_install() {
        let (layer, _rx) = MemoryLayer::new(10);
        let bad = RuleConditions {
            url_regex: Some("(unclosed".to_string()),
            ..Default::default()
        };
        let err = layer.replace_rules(&[], vec![rule(7, bad)]).unwrap_err();
        assert!(matches!(err, RuleInstallError::InvalidRegex { rule_id: 7, .. }));
        assert_eq!(layer.rule_count(), 0);
    }

    #[test]
    fn test_capacity_enforced() {
        let (layer, _rx) = MemoryLayer::new(1);
        let err = layer
            .replace_rules(
                &[],
                vec![rule(1, RuleConditions::default()), rule(2, RuleConditions::default())],
            )
            .unwrap_err();
        assert!(matches!(err, RuleInstallError::CapacityExceeded { .. }));
    }

    #[test]
    fn test_failed_install_leaves_table_cleared() {
        let (layer, _rx) = MemoryLayer::new(10);
        layer
            .replace_rules(&[], vec![rule(1, RuleConditions::default())])
            .unwrap();

        let bad = RuleConditions {
            url_regex: Some("(unclosed".to_string()),
            ..Default::default()
        };
        let result = layer.replace_rules(&[1], vec![rule(1, bad)]);
        assert!(result.is_err());
        // Post-clear, pre-install: rules are undefined until a retry.
        assert_eq!(layer.rule_count(), 0);
    }

    #[test]
    fn test_match_events_emitted() {
        let (layer, mut rx) = MemoryLayer::new(10);
        layer
            .replace_rules(&[], vec![rule(3, RuleConditions::default())])
            .unwrap();

        layer.evaluate(&RequestContext::new("https://example.com/", "GET"));
        assert_eq!(rx.try_recv().unwrap(), 3);
    }
}
