//! Keyword rules and the priority order used to match them.
//!
//! Rules come from a JSON file:
//!
//! ```json
//! { "rules": [ { "keyword": "주일 1부", "description": "1st service" } ] }
//! ```
//!
//! A [`RuleSet`] keeps its rules sorted by descending keyword length so the
//! most specific keyword wins. Equal lengths keep declaration order.

use std::cmp::Reverse;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlaysortError;
use crate::normalize::normalize;

/// A single keyword rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Rule {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    normalized: String,
}

/// Rules in match priority order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

#[derive(Deserialize)]
struct RuleFile {
    rules: Option<Vec<RawRule>>,
}

#[derive(Deserialize)]
struct RawRule {
    keyword: Option<String>,
    description: Option<String>,
}

impl RuleSet {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut rules: Vec<CompiledRule> = rules
            .into_iter()
            .map(|rule| CompiledRule {
                normalized: normalize(&rule.keyword),
                rule,
            })
            .collect();
        // `sort_by_key` is stable, which keeps declaration order on ties.
        rules.sort_by_key(|r| Reverse(r.rule.keyword.chars().count()));
        Self { rules }
    }

    /// Parse and validate a rules document.
    ///
    /// The document must have a top-level `rules` array and every rule a
    /// non-blank `keyword`.
    pub fn from_json(s: &str) -> Result<Self, PlaysortError> {
        let file: Option<RuleFile> =
            serde_json::from_str(s).map_err(|e| PlaysortError::Rules(e.to_string()))?;
        let raw = file
            .and_then(|f| f.rules)
            .ok_or_else(|| PlaysortError::Rules("'rules' key is missing".into()))?;

        let mut rules = Vec::with_capacity(raw.len());
        for (i, r) in raw.into_iter().enumerate() {
            match r.keyword {
                Some(keyword) if !keyword.trim().is_empty() => rules.push(Rule {
                    keyword,
                    description: r.description,
                }),
                Some(_) => {
                    return Err(PlaysortError::Rules(format!(
                        "rule at index {i} has an empty 'keyword'"
                    )))
                }
                None => {
                    return Err(PlaysortError::Rules(format!(
                        "rule at index {i} is missing 'keyword'"
                    )))
                }
            }
        }

        Ok(Self::new(rules))
    }

    /// Load and validate a rules file.
    pub fn load(path: &Path) -> Result<Self, PlaysortError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PlaysortError::Rules(format!("failed to read {}: {e}", path.display()))
        })?;
        let rules = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), count = rules.len(), "Loaded rules");
        Ok(rules)
    }

    /// The highest-priority rule whose keyword occurs in `title`, ignoring
    /// whitespace and case.
    pub fn match_title(&self, title: &str) -> Option<&Rule> {
        let title = normalize(title);
        self.rules
            .iter()
            .find(|r| title.contains(&r.normalized))
            .map(|r| &r.rule)
    }

    /// Rules in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|r| &r.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(rules: &RuleSet) -> Vec<&str> {
        rules.iter().map(|r| r.keyword.as_str()).collect()
    }

    #[test]
    fn test_sorted_longest_first() {
        let rules = RuleSet::new([Rule::new("주일"), Rule::new("주일 1부"), Rule::new("새벽")]);
        assert_eq!(keywords(&rules), vec!["주일 1부", "주일", "새벽"]);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let rules = RuleSet::new([Rule::new("bb"), Rule::new("a"), Rule::new("aa"), Rule::new("c")]);
        assert_eq!(keywords(&rules), vec!["bb", "aa", "a", "c"]);
    }

    #[test]
    fn test_longer_keyword_wins() {
        let rules = RuleSet::new([Rule::new("주일"), Rule::new("주일 1부")]);
        let matched = rules.match_title("예수산소망교회 주일1부예배").unwrap();
        assert_eq!(matched.keyword, "주일 1부");

        let matched = rules.match_title("주일 2부 예배").unwrap();
        assert_eq!(matched.keyword, "주일");
    }

    #[test]
    fn test_whitespace_and_case_insensitive() {
        let rules = RuleSet::new([Rule::new("주일 2부"), Rule::new("praise")]);
        assert_eq!(
            rules.match_title("주일2부예배(2026.01.11)").unwrap().keyword,
            "주일 2부"
        );
        assert_eq!(
            rules.match_title("Sunday Morning PRAISE").unwrap().keyword,
            "praise"
        );
    }

    #[test]
    fn test_empty_rule_set_never_matches() {
        let rules = RuleSet::default();
        assert!(rules.match_title("새벽예배").is_none());
        assert!(rules.match_title("").is_none());
    }

    #[test]
    fn test_from_json() {
        let rules = RuleSet::from_json(
            r#"{"rules": [{"keyword": "새벽", "description": "dawn"}, {"keyword": "주일"}]}"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        let first = rules.iter().next().unwrap();
        assert_eq!(first.description.as_deref(), Some("dawn"));
    }

    #[test]
    fn test_from_json_allows_empty_rules() {
        let rules = RuleSet::from_json(r#"{"rules": []}"#).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_missing_rules_key() {
        let err = RuleSet::from_json(r#"{"other_key": []}"#).unwrap_err();
        assert!(err.to_string().contains("'rules' key is missing"));

        let err = RuleSet::from_json("null").unwrap_err();
        assert!(err.to_string().contains("'rules' key is missing"));
    }

    #[test]
    fn test_missing_keyword() {
        let err = RuleSet::from_json(r#"{"rules": [{"no_keyword": "test"}]}"#).unwrap_err();
        assert!(err.to_string().contains("rule at index 0 is missing 'keyword'"));
    }

    #[test]
    fn test_blank_keyword() {
        let err = RuleSet::from_json(r#"{"rules": [{"keyword": "새벽"}, {"keyword": "  "}]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("rule at index 1 has an empty 'keyword'"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            RuleSet::from_json("{ rules: "),
            Err(PlaysortError::Rules(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = RuleSet::load(Path::new("/nonexistent/rules.json")).unwrap_err();
        assert!(matches!(err, PlaysortError::Rules(_)));
    }
}
