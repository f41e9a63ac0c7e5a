//! Glob-style URL rules.
//!
//! A glob is turned into a regex by escaping every `.` and expanding every
//! `*` to `[^"'#]*`, so a wildcard never runs past the end of an HTML
//! attribute value or into a fragment. Everything else is passed through
//! as regex syntax (`\d+` in a glob means digits). Matching is against the
//! whole URL.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::selector::XpathSelector;
use crate::traits::Selector;

/// Declared URL rule: glob patterns plus an optional XPath restricting
/// where in a page matching links must be found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRule {
    #[serde(rename = "value")]
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_region: Option<String>,
}

impl UrlRule {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            source_region: None,
        }
    }

    pub fn source_region(mut self, xpath: impl Into<String>) -> Self {
        self.source_region = Some(xpath.into());
        self
    }
}

/// Translate one glob into its regex source, without anchors.
pub fn glob_to_regex(glob: &str) -> String {
    format!("({})", glob.replace('.', "\\.").replace('*', "[^\"'#]*"))
}

/// Compile one glob into a full-match regex.
pub fn compile_glob(glob: &str) -> Result<Regex, AppError> {
    Regex::new(&format!("^(?:{})$", glob_to_regex(glob)))
        .map_err(|e| AppError::invalid_selector(glob, e.to_string()))
}

/// A compiled set of URL patterns, matched as a disjunction.
pub struct UrlRuleSet {
    patterns: Vec<Regex>,
    source_region: Option<Box<dyn Selector>>,
    configured: bool,
}

impl UrlRuleSet {
    /// Rule set for pages whose content is extracted. Matches every URL
    /// when no rule is declared.
    pub fn target(rule: Option<&UrlRule>) -> Result<Self, AppError> {
        match rule {
            Some(rule) => Self::compile(rule),
            None => Ok(Self {
                patterns: vec![match_any()?],
                source_region: None,
                configured: false,
            }),
        }
    }

    /// Rule set for pages that are visited but not extracted. Matches
    /// nothing when no rule is declared.
    pub fn help(rule: Option<&UrlRule>) -> Result<Self, AppError> {
        match rule {
            Some(rule) => Self::compile(rule),
            None => Ok(Self {
                patterns: vec![],
                source_region: None,
                configured: false,
            }),
        }
    }

    fn compile(rule: &UrlRule) -> Result<Self, AppError> {
        // Blank globs contribute nothing, but the set still counts as configured.
        let patterns = rule
            .patterns
            .iter()
            .filter(|glob| !glob.trim().is_empty())
            .map(|glob| compile_glob(glob))
            .collect::<Result<Vec<_>, _>>()?;

        let source_region = match rule.source_region.as_deref().map(str::trim) {
            Some(region) if !region.is_empty() => {
                Some(Box::new(XpathSelector::new(region)?) as Box<dyn Selector>)
            }
            _ => None,
        };

        Ok(Self {
            patterns,
            source_region,
            configured: true,
        })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(url))
    }

    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    pub fn source_region(&self) -> Option<&dyn Selector> {
        self.source_region.as_deref()
    }

    /// True when the schema declared this rule, even if every glob was blank.
    pub fn is_configured(&self) -> bool {
        self.configured
    }
}

impl fmt::Debug for UrlRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlRuleSet")
            .field(
                "patterns",
                &self.patterns.iter().map(Regex::as_str).collect::<Vec<_>>(),
            )
            .field(
                "source_region",
                &self.source_region.as_ref().map(|s| s.expression()),
            )
            .field("configured", &self.configured)
            .finish()
    }
}

fn match_any() -> Result<Regex, AppError> {
    Regex::new("^(?:.*)$").map_err(|e| AppError::invalid_selector(".*", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_to_regex() {
        assert_eq!(glob_to_regex("http://x.test/q/*"), r#"(http://x\.test/q/[^"'#]*)"#);
        assert_eq!(
            glob_to_regex(r"http://www.oschina.net/question/\d+_\d+*"),
            r#"(http://www\.oschina\.net/question/\d+_\d+[^"'#]*)"#
        );
    }

    #[test]
    fn test_wildcard_excludes_quotes_and_fragment() {
        let rules = UrlRuleSet::target(Some(&UrlRule::new(["http://x.test/q/*"]))).unwrap();
        assert!(rules.matches("http://x.test/q/123"));
        assert!(rules.matches("http://x.test/q/"));
        assert!(!rules.matches("http://x.test/q/1\"2"));
        assert!(!rules.matches("http://x.test/q/1'2"));
        assert!(!rules.matches("http://x.test/q/1#top"));
    }

    #[test]
    fn test_dot_is_literal() {
        let rules = UrlRuleSet::target(Some(&UrlRule::new(["http://x.test/*"]))).unwrap();
        assert!(!rules.matches("http://xatest/a"));
    }

    #[test]
    fn test_full_match_not_search() {
        let rules = UrlRuleSet::target(Some(&UrlRule::new(["http://x.test/q/\\d+"]))).unwrap();
        assert!(rules.matches("http://x.test/q/42"));
        assert!(!rules.matches("http://x.test/q/42/comments"));
        assert!(!rules.matches("see http://x.test/q/42"));
    }

    #[test]
    fn test_any_pattern_matches() {
        let rule = UrlRule::new(["http://a.test/*", "http://b.test/*"]);
        let rules = UrlRuleSet::target(Some(&rule)).unwrap();
        assert!(rules.matches("http://b.test/page"));
        assert!(!rules.matches("http://c.test/page"));
    }

    #[test]
    fn test_default_target_matches_everything() {
        let rules = UrlRuleSet::target(None).unwrap();
        assert!(!rules.is_configured());
        assert!(rules.matches("http://anything/at/all"));
        assert!(rules.matches(""));
    }

    #[test]
    fn test_default_help_matches_nothing() {
        let rules = UrlRuleSet::help(None).unwrap();
        assert!(!rules.is_configured());
        assert!(rules.patterns().is_empty());
        assert!(!rules.matches("http://anything/"));
    }

    #[test]
    fn test_blank_help_is_configured_but_unmatchable() {
        let rules = UrlRuleSet::help(Some(&UrlRule::new([""]))).unwrap();
        assert!(rules.is_configured());
        assert!(rules.patterns().is_empty());
        assert!(!rules.matches(""));
        assert!(!rules.matches("http://anything/"));
    }

    #[test]
    fn test_source_region() {
        let rule = UrlRule::new(["http://x.test/*"]).source_region("//div[@class='pager']");
        let rules = UrlRuleSet::help(Some(&rule)).unwrap();
        assert_eq!(
            rules.source_region().map(|s| s.expression()),
            Some("//div[@class='pager']")
        );

        let rules = UrlRuleSet::help(Some(&UrlRule::new(["http://x.test/*"]))).unwrap();
        assert!(rules.source_region().is_none());
    }

    #[test]
    fn test_invalid_glob_is_an_error() {
        let err = UrlRuleSet::target(Some(&UrlRule::new(["http://x.test/(*"]))).unwrap_err();
        assert!(err.is_schema_error());
    }
}
