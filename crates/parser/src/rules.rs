use serde::{Deserialize, Serialize};
use smsbook_core::{Money, TransactionKind};

use crate::util::similarity;

/// A user rule that overrides the category a pattern would assign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    pub category: String,
    /// Only apply to this kind of transaction.
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    #[serde(default)]
    pub amount_min: Option<Money>,
    #[serde(default)]
    pub amount_max: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(try_from = "String", into = "String")]
pub enum MatchType {
    #[default]
    Contains,
    Exact,
    Regex,
    Fuzzy {
        threshold: f32,
    },
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(MatchType::Contains),
            "exact" => Ok(MatchType::Exact),
            "regex" => Ok(MatchType::Regex),
            s if s.starts_with("fuzzy:") => {
                let threshold = s[6..]
                    .parse::<f32>()
                    .map_err(|_| "Invalid fuzzy threshold".to_string())?;
                Ok(MatchType::Fuzzy { threshold })
            }
            other => Err(format!("Unknown match type: '{other}'")),
        }
    }
}

impl TryFrom<String> for MatchType {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MatchType> for String {
    fn from(m: MatchType) -> Self {
        match m {
            MatchType::Contains => "contains".to_string(),
            MatchType::Exact => "exact".to_string(),
            MatchType::Regex => "regex".to_string(),
            MatchType::Fuzzy { threshold } => format!("fuzzy:{threshold}"),
        }
    }
}

/// The fields a rule can look at.
#[derive(Debug, Clone)]
pub struct CategorizableTransaction<'a> {
    pub description: &'a str,
    pub kind: TransactionKind,
    pub amount: Money,
}

/// Internal pairing of a rule with its precompiled regex (if applicable).
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: CategoryRule,
    compiled_regex: Option<regex::Regex>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryRuleEngine {
    rules: Vec<CompiledRule>,
}

#[derive(Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<CategoryRule>,
}

impl CategoryRuleEngine {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .map(|rule| {
                let compiled_regex = if let MatchType::Regex = &rule.match_type {
                    match regex::Regex::new(&format!("(?i){}", rule.pattern)) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            tracing::warn!(rule = %rule.name, "ignoring rule with invalid regex: {e}");
                            None
                        }
                    }
                } else {
                    None
                };
                CompiledRule { rule, compiled_regex }
            })
            .collect();
        // Highest priority first; ties keep declaration order.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Self { rules: compiled }
    }

    /// Parse `[[rules]]` tables.
    pub fn from_toml(toml_content: &str) -> Result<Self, toml::de::Error> {
        let file: RuleFile = toml::from_str(toml_content)?;
        Ok(Self::new(file.rules))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn find_matching_rule(&self, tx: &CategorizableTransaction<'_>) -> Option<&CategoryRule> {
        self.rules
            .iter()
            .find(|cr| self.rule_matches(cr, tx))
            .map(|cr| &cr.rule)
    }

    fn rule_matches(&self, cr: &CompiledRule, tx: &CategorizableTransaction<'_>) -> bool {
        let rule = &cr.rule;

        if rule.kind.is_some_and(|k| k != tx.kind) {
            return false;
        }
        if rule.amount_min.is_some_and(|min| tx.amount < min) {
            return false;
        }
        if rule.amount_max.is_some_and(|max| tx.amount > max) {
            return false;
        }

        let text = tx.description.to_lowercase();
        let pattern = rule.pattern.to_lowercase();

        match &rule.match_type {
            MatchType::Contains => text.contains(&pattern),
            MatchType::Exact => text == pattern,
            MatchType::Regex => cr
                .compiled_regex
                .as_ref()
                .is_some_and(|re| re.is_match(tx.description)),
            MatchType::Fuzzy { threshold } => similarity(&text, &pattern) >= *threshold,
        }
    }
}
