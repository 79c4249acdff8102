//! Domain pattern parsing and regex synthesis.
//!
//! # Responsibilities
//! - Parse user-authored domain strings (exact host or `*.base` wildcard)
//! - Match patterns against hostnames
//! - Synthesize regex fragments and anchored alternations for the
//!   interception layer's URL matcher
//!
//! # Design Decisions
//! - Hostnames are normalized to lowercase (per DNS/HTTP case rules)
//! - All regex metacharacters in user input are escaped, so a literal `.`
//!   never becomes a match-any wildcard
//! - Wildcard patterns match the base domain itself as well as subdomains
//! - Fragment order in an alternation equals input order; callers sort
//!   where reproducibility matters

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from domain pattern parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    /// The input string was empty.
    #[error("domain pattern must not be empty")]
    Empty,
}

/// A user-authored domain pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainPattern {
    /// Matches exactly one hostname.
    Exact(String),
    /// Matches the base domain and any dotted subdomain of it.
    WildcardSubdomain(String),
}

impl DomainPattern {
    /// Parse a raw domain string.
    ///
    /// A `*.` prefix yields a wildcard over the remainder; any other
    /// non-empty string is an exact host.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let raw = raw.trim().to_lowercase();
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }
        match raw.strip_prefix("*.") {
            Some(base) if !base.is_empty() => Ok(Self::WildcardSubdomain(base.to_string())),
            // "*." alone has no base to wildcard over; treat as exact.
            _ => Ok(Self::Exact(raw)),
        }
    }

    /// Returns true if this pattern matches the given hostname.
    pub fn matches(&self, hostname: &str) -> bool {
        let hostname = hostname.to_lowercase();
        match self {
            Self::Exact(host) => hostname == *host,
            Self::WildcardSubdomain(base) => {
                hostname == *base || hostname.ends_with(&format!(".{}", base))
            }
        }
    }

    /// Regex fragment matching this pattern's host portion.
    pub fn regex_fragment(&self) -> String {
        match self {
            Self::Exact(host) => regex::escape(host),
            Self::WildcardSubdomain(base) => {
                format!(r"(?:[a-z0-9-]+\.)*{}", regex::escape(base))
            }
        }
    }

    /// The domain entry used when this pattern appears in an exclusion
    /// list: wildcards reduce to their base, since excluding a base
    /// excludes all of its subdomains at the layer.
    pub fn exclusion_base(&self) -> &str {
        match self {
            Self::Exact(host) => host,
            Self::WildcardSubdomain(base) => base,
        }
    }
}

/// Join pattern fragments into a single anchored URL alternation.
///
/// The result matches `http` and `https` URLs whose host portion matches
/// any of the given patterns, with an optional path.
pub fn anchored_alternation(patterns: &[DomainPattern]) -> String {
    let fragments: Vec<String> = patterns.iter().map(|p| p.regex_fragment()).collect();
    format!(r"^https?://(?:{})(?:/.*)?$", fragments.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact() {
        let p = DomainPattern::parse("example.com").unwrap();
        assert_eq!(p, DomainPattern::Exact("example.com".to_string()));
        assert!(p.matches("example.com"));
        assert!(p.matches("EXAMPLE.COM"));
        assert!(!p.matches("api.example.com"));
        assert!(!p.matches("example.com.evil.com"));
    }

    #[test]
    fn test_parse_wildcard() {
        let p = DomainPattern::parse("*.example.com").unwrap();
        assert_eq!(p, DomainPattern::WildcardSubdomain("example.com".to_string()));
        assert!(p.matches("example.com"));
        assert!(p.matches("api.example.com"));
        assert!(p.matches("a.b.example.com"));
        assert!(!p.matches("notexample.com"));
    }

    #[test]
    fn test_parse_empty_rejected() {
        assert_eq!(DomainPattern::parse(""), Err(PatternError::Empty));
        assert_eq!(DomainPattern::parse("   "), Err(PatternError::Empty));
    }

    #[test]
    fn test_regex_fragment_escapes_metacharacters() {
        let p = DomainPattern::parse("a.b+c.com").unwrap();
        let frag = p.regex_fragment();
        assert!(frag.contains(r"\."));
        assert!(frag.contains(r"\+"));

        let re = regex::Regex::new(&frag).unwrap();
        assert!(re.is_match("a.b+c.com"));
        // Unescaped "." would make this match.
        assert!(!re.is_match("axb+c.com"));
    }

    #[test]
    fn test_anchored_alternation() {
        let patterns = vec![
            DomainPattern::parse("*.example.com").unwrap(),
            DomainPattern::parse("test.org").unwrap(),
        ];
        let re = regex::Regex::new(&anchored_alternation(&patterns)).unwrap();

        assert!(re.is_match("https://example.com/"));
        assert!(re.is_match("https://api.example.com/x"));
        assert!(re.is_match("http://test.org"));
        assert!(!re.is_match("https://notexample.com/"));
        assert!(!re.is_match("https://test.org.evil.com/"));
    }

    #[test]
    fn test_exclusion_base() {
        assert_eq!(
            DomainPattern::parse("*.example.com").unwrap().exclusion_base(),
            "example.com"
        );
        assert_eq!(
            DomainPattern::parse("ads.example.com").unwrap().exclusion_base(),
            "ads.example.com"
        );
    }
}
