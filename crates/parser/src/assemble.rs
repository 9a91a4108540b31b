use chrono::{Local, NaiveDate, NaiveDateTime};
use smsbook_core::{Counterpart, Intent, Money, ParsedTransaction, TransactionId};

use crate::hash;
use crate::rules::{CategorizableTransaction, CategoryRuleEngine};
use crate::types::{RawMessage, StructuralMatch};

/// Clock reading taken once at the start of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub started_at: NaiveDateTime,
}

impl RunContext {
    pub fn now() -> Self {
        Self::at(Local::now().naive_local())
    }

    pub fn at(started_at: NaiveDateTime) -> Self {
        Self { started_at }
    }

    pub fn millis(&self) -> i64 {
        self.started_at.and_utc().timestamp_millis()
    }

    pub fn today(&self) -> NaiveDate {
        self.started_at.date()
    }
}

pub fn default_category(intent: Intent) -> &'static str {
    match intent {
        Intent::Sent | Intent::Received => "Transfer",
        Intent::Paybill => "Bills",
        Intent::Buygoods => "Shopping",
        Intent::Withdraw | Intent::Deposit => "Cash",
        Intent::Debit | Intent::Credit | Intent::Transfer => "Bank Transfer",
    }
}

/// `d/m/yy` or `d/m/yyyy`. Two-digit years are in the 2000s.
pub fn parse_message_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split('/');
    let day: u32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let year_raw = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let year: i32 = match year_raw.len() {
        2 => 2000 + year_raw.parse::<i32>().ok()?,
        4 => year_raw.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns a structural match into a finished transaction.
pub struct TransactionAssembler<'a> {
    run: RunContext,
    rules: &'a CategoryRuleEngine,
}

impl<'a> TransactionAssembler<'a> {
    pub fn new(run: RunContext, rules: &'a CategoryRuleEngine) -> Self {
        Self { run, rules }
    }

    pub fn assemble(
        &self,
        m: &StructuralMatch,
        amount: Money,
        message: &RawMessage<'_>,
        normalized: &str,
    ) -> ParsedTransaction {
        let kind = m.intent.kind();
        let counterpart_name = m.captures.counterpart.as_deref().map(title_case);

        let description = match &counterpart_name {
            Some(name) => format!("{} {}", m.description, name),
            None => m.description.clone(),
        };

        let category = self
            .rules
            .find_matching_rule(&CategorizableTransaction {
                description: &description,
                kind,
                amount,
            })
            .map(|rule| rule.category.clone())
            .unwrap_or_else(|| default_category(m.intent).to_string());

        let date = m
            .captures
            .date
            .as_deref()
            .and_then(parse_message_date)
            .unwrap_or_else(|| self.run.today());

        ParsedTransaction {
            id: TransactionId::for_run(self.run.millis(), message.index),
            kind,
            intent: m.intent,
            amount,
            description,
            category,
            method: m.provider,
            date,
            confidence: m.confidence,
            counterpart: counterpart_name.map(|name| Counterpart::for_kind(kind, name)),
            account_ref: m.captures.account_ref.clone(),
            reference: m.reference.clone(),
            fingerprint: hash::fingerprint(normalized),
            raw_message: message.text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{CategoryRule, MatchType};
    use crate::types::Captures;
    use smsbook_core::{Provider, TransactionKind};

    fn run() -> RunContext {
        RunContext::at(
            NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    fn sent_match(counterpart: Option<&str>, date: Option<&str>) -> StructuralMatch {
        StructuralMatch {
            provider: Provider::MobileMoneyA,
            intent: Intent::Sent,
            confidence: 0.9,
            description: "M-Pesa sent to".to_string(),
            rank: 0,
            captures: Captures {
                amount: "1,200.00".to_string(),
                counterpart: counterpart.map(str::to_string),
                date: date.map(str::to_string),
                ..Captures::default()
            },
            reference: Some("QA12B3C4D5".to_string()),
        }
    }

    #[test]
    fn assembles_sent_transaction() {
        let rules = CategoryRuleEngine::default();
        let asm = TransactionAssembler::new(run(), &rules);
        let raw = "Confirmed. You have sent Ksh1,200.00 to JOHN DOE on 15/1/24.";
        let msg = RawMessage { index: 3, text: raw };
        let tx = asm.assemble(
            &sent_match(Some("john doe"), Some("15/1/24")),
            Money::from_cents(120_000),
            &msg,
            "confirmed.",
        );

        assert_eq!(tx.id.as_str(), format!("{}-3", run().millis()));
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.category, "Transfer");
        assert_eq!(tx.description, "M-Pesa sent to John Doe");
        assert_eq!(tx.recipient(), Some("John Doe"));
        assert_eq!(tx.sender(), None);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(tx.confidence, 0.9);
        assert_eq!(tx.reference.as_deref(), Some("QA12B3C4D5"));
        assert_eq!(tx.raw_message, raw);
        assert_eq!(tx.fingerprint, hash::fingerprint("confirmed."));
    }

    #[test]
    fn missing_counterpart_and_date() {
        let rules = CategoryRuleEngine::default();
        let asm = TransactionAssembler::new(run(), &rules);
        let msg = RawMessage { index: 0, text: "x" };
        let tx = asm.assemble(&sent_match(None, None), Money::from_cents(100), &msg, "x");
        assert_eq!(tx.description, "M-Pesa sent to");
        assert_eq!(tx.counterpart, None);
        assert_eq!(tx.date, run().today());
    }

    #[test]
    fn category_rule_overrides_default() {
        let rules = CategoryRuleEngine::new(vec![CategoryRule {
            name: "family".to_string(),
            priority: 0,
            pattern: "john doe".to_string(),
            match_type: MatchType::Contains,
            category: "Family".to_string(),
            kind: None,
            amount_min: None,
            amount_max: None,
        }]);
        let asm = TransactionAssembler::new(run(), &rules);
        let msg = RawMessage { index: 0, text: "x" };
        let tx = asm.assemble(&sent_match(Some("john doe"), None), Money::from_cents(100), &msg, "x");
        assert_eq!(tx.category, "Family");
    }

    #[test]
    fn categories_per_intent() {
        assert_eq!(default_category(Intent::Received), "Transfer");
        assert_eq!(default_category(Intent::Paybill), "Bills");
        assert_eq!(default_category(Intent::Buygoods), "Shopping");
        assert_eq!(default_category(Intent::Deposit), "Cash");
        assert_eq!(default_category(Intent::Transfer), "Bank Transfer");
    }

    #[test]
    fn message_dates() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day);
        assert_eq!(parse_message_date("15/1/24"), d(2024, 1, 15));
        assert_eq!(parse_message_date("15/01/2024"), d(2024, 1, 15));
        assert_eq!(parse_message_date("1/2/2023"), d(2023, 2, 1));
        assert_eq!(parse_message_date("32/1/24"), None);
        assert_eq!(parse_message_date("1/13/24"), None);
        assert_eq!(parse_message_date("1/1/024"), None);
        assert_eq!(parse_message_date("1/1"), None);
    }

    #[test]
    fn title_cases_words() {
        assert_eq!(title_case("john doe"), "John Doe");
        assert_eq!(title_case("123456 - jane agent shop"), "123456 - Jane Agent Shop");
        assert_eq!(title_case(""), "");
    }
}
