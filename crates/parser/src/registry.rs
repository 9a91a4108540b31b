use regex::Regex;
use serde::{Deserialize, Serialize};
use smsbook_core::{Intent, Provider};
use thiserror::Error;

// ── Pattern building blocks ───────────────────────────────────────────────────
//
// Patterns are written against normalized text (lower-case, single spaces) and
// may use these placeholders. `{end}` and `{tail}` are expanded first because
// they contain other placeholders.

const PLACEHOLDERS: &[(&str, &str)] = &[
    (
        "{end}",
        r"(?:\s*\+?\d{9,13})?(?:\s+on\s+{date}|\s+(?:on|at|new|from|via)\b|\s*[.,]|$)",
    ),
    (
        "{tail}",
        r"(?:.*?balance\s*(?:is\s*)?{cur}{balance})?(?:.*?(?:cost|fee)[,:]?\s*{cur}{fee})?",
    ),
    ("{party}", r"(?P<counterpart>[^.,\d]+?)"),
    ("{cur}", r"(?:(?:kshs|ksh|kes)\.?\s?)?"),
    ("{amount}", r"(?P<amount>\d[\d,]*(?:\.\d+)?)"),
    ("{balance}", r"(?P<balance>\d[\d,]*(?:\.\d+)?)"),
    ("{fee}", r"(?P<fee>\d[\d,]*(?:\.\d+)?)"),
    ("{date}", r"(?P<date>\d{1,2}/\d{1,2}/\d{2,4})"),
];

/// Built-in catalog: (provider, intent, pattern, confidence, description prefix).
/// Order within a provider is precedence order.
pub const BUILTIN_PATTERNS: &[(Provider, Intent, &str, f32, &str)] = &[
    (
        Provider::MobileMoneyA,
        Intent::Sent,
        r"(?:you have )?sent {cur}{amount} to {party}{end}{tail}",
        0.90,
        "M-Pesa sent to",
    ),
    (
        Provider::MobileMoneyA,
        Intent::Received,
        r"(?:you have )?received {cur}{amount} from {party}{end}{tail}",
        0.90,
        "M-Pesa received from",
    ),
    (
        Provider::MobileMoneyA,
        Intent::Withdraw,
        r"(?:you have withdrawn|withdraw) {cur}{amount} from (?:\d+ - )?{party}{end}{tail}",
        0.85,
        "Cash withdrawal from",
    ),
    (
        Provider::MobileMoneyA,
        Intent::Deposit,
        r"(?:you have deposited|deposit(?:ed)?|give) {cur}{amount}(?: cash)? (?:to|into|at) {party}{end}{tail}",
        0.85,
        "Cash deposit via",
    ),
    (
        Provider::MobileMoneyA,
        Intent::Paybill,
        r"(?:you have )?paid {cur}{amount} to {party}(?:\s+(?:for )?account(?: no\.?)?\s*(?P<account_ref>[a-z0-9-]+))?{end}{tail}",
        0.80,
        "Payment to",
    ),
    (
        Provider::MobileMoneyA,
        Intent::Paybill,
        r"{cur}{amount} sent to {party} for account (?P<account_ref>[a-z0-9-]+){end}{tail}",
        0.80,
        "Payment to",
    ),
    (
        Provider::MobileMoneyA,
        Intent::Buygoods,
        r"(?:you have )?paid {cur}{amount} for {party}{end}{tail}",
        0.80,
        "Purchase from",
    ),
    (
        Provider::MobileMoneyA,
        Intent::Buygoods,
        r"{cur}{amount} paid to {party}{end}{tail}",
        0.80,
        "Purchase from",
    ),
    (
        Provider::MobileMoneyB,
        Intent::Sent,
        r"(?:you have )?sent {cur}{amount} to {party}{end}{tail}",
        0.80,
        "Airtel Money sent to",
    ),
    (
        Provider::MobileMoneyB,
        Intent::Received,
        r"(?:you have )?received {cur}{amount} from {party}{end}{tail}",
        0.80,
        "Airtel Money received from",
    ),
    (
        Provider::Bank,
        Intent::Debit,
        r"(?:account|acc|a/c)\s*(?:no\.?\s*)?[x*]*(?P<account_ref>\d{4,})\s*(?:has been\s*)?debited\s*(?:with\s*)?{cur}{amount}(?:\s*on\s*{date})?{tail}",
        0.85,
        "Bank account debit",
    ),
    (
        Provider::Bank,
        Intent::Credit,
        r"(?:account|acc|a/c)\s*(?:no\.?\s*)?[x*]*(?P<account_ref>\d{4,})\s*(?:has been\s*)?credited\s*(?:with\s*)?{cur}{amount}(?:\s*on\s*{date})?{tail}",
        0.85,
        "Bank account credit",
    ),
    (
        Provider::Bank,
        Intent::Transfer,
        r"(?:transfer|sent) (?:of )?{cur}{amount} to {party}{end}{tail}",
        0.75,
        "Bank transfer to",
    ),
];

// ── Provider keywords ─────────────────────────────────────────────────────────

re!(re_mobile_money_a, r"\bm-?pesa\b");
re!(re_mobile_money_b, r"\bairtel\s?money\b");
re!(re_bank, r"\b(?:account|acc|a/c)\b");

/// Keyword that routes a message to a provider's patterns.
fn provider_keyword(provider: Provider) -> &'static Regex {
    match provider {
        Provider::MobileMoneyA => re_mobile_money_a(),
        Provider::MobileMoneyB => re_mobile_money_b(),
        Provider::Bank => re_bank(),
    }
}

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid {provider} {intent} pattern: {source}")]
    InvalidRegex {
        provider: Provider,
        intent: Intent,
        #[source]
        source: regex::Error,
    },
    #[error("{provider} {intent} pattern has no `amount` capture")]
    MissingAmount { provider: Provider, intent: Intent },
    #[error("{provider} {intent} pattern confidence {confidence} is outside 0.0–1.0")]
    ConfidenceOutOfRange {
        provider: Provider,
        intent: Intent,
        confidence: f32,
    },
}

/// Declarative form of an intent pattern, as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpec {
    pub provider: Provider,
    pub intent: Intent,
    pub regex: String,
    pub confidence: f32,
    pub description: String,
}

/// A compiled intent pattern.
#[derive(Debug, Clone)]
pub struct IntentPattern {
    pub provider: Provider,
    pub intent: Intent,
    pub matcher: Regex,
    pub confidence: f32,
    pub description: String,
}

impl IntentPattern {
    pub fn compile(spec: &PatternSpec) -> Result<Self, RegistryError> {
        if !(0.0..=1.0).contains(&spec.confidence) {
            return Err(RegistryError::ConfidenceOutOfRange {
                provider: spec.provider,
                intent: spec.intent,
                confidence: spec.confidence,
            });
        }
        let matcher = Regex::new(&expand(&spec.regex)).map_err(|source| {
            RegistryError::InvalidRegex {
                provider: spec.provider,
                intent: spec.intent,
                source,
            }
        })?;
        if !matcher.capture_names().any(|n| n == Some("amount")) {
            return Err(RegistryError::MissingAmount {
                provider: spec.provider,
                intent: spec.intent,
            });
        }
        Ok(Self {
            provider: spec.provider,
            intent: spec.intent,
            matcher,
            confidence: spec.confidence,
            description: spec.description.clone(),
        })
    }
}

#[derive(Debug, Clone)]
struct ProviderProfile {
    provider: Provider,
    keyword: &'static Regex,
    patterns: Vec<IntentPattern>,
}

/// Ordered, provider-keyed pattern catalog. Read-only once built.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    profiles: Vec<ProviderProfile>,
}

impl PatternRegistry {
    /// The built-in catalog followed by `extra` patterns, which are tried after
    /// the built-ins of their provider.
    pub fn new(extra: &[PatternSpec]) -> Result<Self, RegistryError> {
        let builtin = BUILTIN_PATTERNS.iter().map(|(provider, intent, regex, confidence, description)| {
            PatternSpec {
                provider: *provider,
                intent: *intent,
                regex: (*regex).to_string(),
                confidence: *confidence,
                description: (*description).to_string(),
            }
        });
        let specs: Vec<PatternSpec> = builtin.chain(extra.iter().cloned()).collect();

        let mut profiles = Vec::with_capacity(Provider::DETECTION_ORDER.len());
        for provider in Provider::DETECTION_ORDER {
            let patterns = specs
                .iter()
                .filter(|s| s.provider == provider)
                .map(IntentPattern::compile)
                .collect::<Result<Vec<_>, _>>()?;
            profiles.push(ProviderProfile {
                provider,
                keyword: provider_keyword(provider),
                patterns,
            });
        }
        Ok(Self { profiles })
    }

    /// Built-in catalog only.
    pub fn builtin() -> Self {
        Self::new(&[]).expect("built-in patterns are valid")
    }

    /// First provider, in detection order, whose keyword occurs in `text`.
    pub fn detect_provider(&self, text: &str) -> Option<Provider> {
        self.profiles
            .iter()
            .find(|p| p.keyword.is_match(text))
            .map(|p| p.provider)
    }

    pub fn patterns(&self, provider: Provider) -> &[IntentPattern] {
        self.profiles
            .iter()
            .find(|p| p.provider == provider)
            .map(|p| p.patterns.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.profiles.iter().map(|p| p.patterns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn expand(pattern: &str) -> String {
    PLACEHOLDERS
        .iter()
        .fold(pattern.to_string(), |acc, (token, body)| acc.replace(token, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(provider: Provider, intent: Intent, regex: &str, confidence: f32) -> PatternSpec {
        PatternSpec {
            provider,
            intent,
            regex: regex.to_string(),
            confidence,
            description: "Custom".to_string(),
        }
    }

    #[test]
    fn builtin_compiles() {
        let r = PatternRegistry::builtin();
        assert_eq!(r.len(), BUILTIN_PATTERNS.len());
        assert!(!r.patterns(Provider::Bank).is_empty());
    }

    #[test]
    fn sent_precedes_paybill() {
        let r = PatternRegistry::builtin();
        let intents: Vec<Intent> = r.patterns(Provider::MobileMoneyA).iter().map(|p| p.intent).collect();
        let sent = intents.iter().position(|i| *i == Intent::Sent).unwrap();
        let paybill = intents.iter().position(|i| *i == Intent::Paybill).unwrap();
        assert!(sent < paybill);
    }

    #[test]
    fn expand_replaces_nested_placeholders() {
        let expanded = expand("{end}{tail}");
        assert!(!expanded.contains("{date}"));
        assert!(!expanded.contains("{cur}"));
        assert!(expanded.contains("(?P<date>"));
        assert!(expanded.contains("(?P<balance>"));
        assert!(expanded.contains("(?P<fee>"));
    }

    #[test]
    fn detect_mobile_money_before_bank() {
        let r = PatternRegistry::builtin();
        let text = "confirmed. ksh1,500.00 sent to kplc prepaid for account 37172. new m-pesa balance";
        assert_eq!(r.detect_provider(text), Some(Provider::MobileMoneyA));
        assert_eq!(
            r.detect_provider("you have received 500 from john. airtel money balance 20 acc"),
            Some(Provider::MobileMoneyB)
        );
        assert_eq!(r.detect_provider("acc no. 1234 debited"), Some(Provider::Bank));
    }

    #[test]
    fn bank_keyword_needs_whole_word() {
        let r = PatternRegistry::builtin();
        assert_eq!(r.detect_provider("your order was accepted"), None);
        assert_eq!(r.detect_provider("a/c 1234 credited"), Some(Provider::Bank));
    }

    #[test]
    fn extra_patterns_follow_builtins() {
        let extra = [spec(Provider::Bank, Intent::Debit, r"withdrawal of {cur}{amount}", 0.6)];
        let r = PatternRegistry::new(&extra).unwrap();
        let bank = r.patterns(Provider::Bank);
        assert_eq!(bank.last().unwrap().confidence, 0.6);
        assert_eq!(r.len(), BUILTIN_PATTERNS.len() + 1);
    }

    #[test]
    fn rejects_pattern_without_amount() {
        let extra = [spec(Provider::Bank, Intent::Debit, r"debited", 0.5)];
        assert!(matches!(
            PatternRegistry::new(&extra),
            Err(RegistryError::MissingAmount { .. })
        ));
    }

    #[test]
    fn rejects_invalid_regex() {
        let extra = [spec(Provider::Bank, Intent::Debit, r"(?P<amount>\d+", 0.5)];
        assert!(matches!(
            PatternRegistry::new(&extra),
            Err(RegistryError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn rejects_confidence_out_of_range() {
        let extra = [spec(Provider::Bank, Intent::Debit, r"{amount}", 1.5)];
        assert!(matches!(
            PatternRegistry::new(&extra),
            Err(RegistryError::ConfidenceOutOfRange { .. })
        ));
    }
}
