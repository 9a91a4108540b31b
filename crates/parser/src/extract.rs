use regex::Captures as RegexCaptures;
use smsbook_core::Provider;

use crate::registry::{IntentPattern, PatternRegistry};
use crate::types::{Captures, SegmentError, StructuralMatch};

// ── Compiled regex cache ─────────────────────────────────────────────────────

re!(re_reference_label,
    r"\b(?:transaction id|trans(?:action)? ref|ref(?:erence)?(?: no\.?)?)\s*[:.]?\s*([a-z0-9]{6,})\b");
re!(re_leading_code,
    r"^([a-z0-9]{10})\.? confirmed\b");

// ── Public extraction API ─────────────────────────────────────────────────────

/// Classifies a normalized message and pulls its fields out.
pub struct FieldExtractor<'a> {
    registry: &'a PatternRegistry,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(registry: &'a PatternRegistry) -> Self {
        Self { registry }
    }

    /// Detect the provider, then return the first of its patterns that matches.
    pub fn extract(&self, normalized: &str) -> Result<StructuralMatch, SegmentError> {
        let provider = self
            .registry
            .detect_provider(normalized)
            .ok_or(SegmentError::NoProviderMatch)?;
        self.extract_for(provider, normalized)
            .ok_or(SegmentError::NoIntentMatch { provider })
    }

    /// Try `provider`'s patterns in registry order. `None` when nothing matches.
    pub fn extract_for(&self, provider: Provider, normalized: &str) -> Option<StructuralMatch> {
        self.registry
            .patterns(provider)
            .iter()
            .enumerate()
            .find_map(|(rank, pattern)| {
                let caps = pattern.matcher.captures(normalized)?;
                Some(build_match(rank, pattern, &caps, normalized))
            })
    }
}

fn build_match(
    rank: usize,
    pattern: &IntentPattern,
    caps: &RegexCaptures<'_>,
    normalized: &str,
) -> StructuralMatch {
    let group = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
    };

    StructuralMatch {
        provider: pattern.provider,
        intent: pattern.intent,
        confidence: pattern.confidence,
        description: pattern.description.clone(),
        rank,
        captures: Captures {
            amount: group("amount").unwrap_or_default(),
            counterpart: group("counterpart"),
            date: group("date"),
            balance: group("balance"),
            fee: group("fee"),
            account_ref: group("account_ref"),
        },
        reference: extract_reference(normalized),
    }
}

/// Provider transaction code: a labeled reference, or the ten-character code
/// M-Pesa puts in front of "confirmed".
pub fn extract_reference(normalized: &str) -> Option<String> {
    let code = re_reference_label()
        .captures(normalized)
        .or_else(|| re_leading_code().captures(normalized))?
        .get(1)?
        .as_str();
    // A reference always carries at least one digit; plain words are labels.
    code.chars()
        .any(|c| c.is_ascii_digit())
        .then(|| code.to_uppercase())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
