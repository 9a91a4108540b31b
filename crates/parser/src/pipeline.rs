use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use smsbook_core::{Money, ParsedTransaction, TransactionId};
use thiserror::Error;

use crate::amount::parse_amount;
use crate::assemble::{RunContext, TransactionAssembler};
use crate::config::{EngineConfig, ParseLimits};
use crate::dedup::DuplicateMatch;
use crate::extract::FieldExtractor;
use crate::normalize::normalize;
use crate::registry::{PatternRegistry, RegistryError};
use crate::rules::CategoryRuleEngine;
use crate::selection::SelectionSet;
use crate::split::split_messages;
use crate::types::{RawMessage, SegmentError, SkippedSegment};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input is {size} bytes, limit is {limit}")]
    InputTooLarge { size: usize, limit: usize },
    #[error("Input holds {count} messages, limit is {limit}")]
    TooManySegments { count: usize, limit: usize },
    #[error("Pattern registry: {0}")]
    Registry(#[from] RegistryError),
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ParseReport {
    /// In input order.
    pub transactions: Vec<ParsedTransaction>,
    pub selection: SelectionSet,
    pub skipped: Vec<SkippedSegment>,
    pub segment_count: usize,
}

impl ParseReport {
    /// The splitter found nothing to look at.
    pub fn is_empty_input(&self) -> bool {
        self.segment_count == 0
    }

    pub fn selected(&self) -> Vec<&ParsedTransaction> {
        self.selection.selected_subset(&self.transactions)
    }

    /// Pairs of `(first occurrence, repeat)` for messages pasted more than once.
    pub fn repeated(&self) -> Vec<(TransactionId, TransactionId)> {
        let mut first_seen: HashMap<&str, &TransactionId> = HashMap::new();
        let mut pairs = Vec::new();
        for tx in &self.transactions {
            match first_seen.get(tx.fingerprint.as_str()) {
                Some(original) => pairs.push(((*original).clone(), tx.id.clone())),
                None => {
                    first_seen.insert(&tx.fingerprint, &tx.id);
                }
            }
        }
        pairs
    }

    pub fn deselect_duplicates(&mut self, matches: &[DuplicateMatch]) {
        for m in matches {
            self.selection.deselect(&m.transaction_id);
        }
    }

    pub fn summary(&self) -> String {
        match self.transactions.len() {
            _ if self.is_empty_input() => "Nothing to parse".to_string(),
            0 => "No transactions could be parsed".to_string(),
            1 => "1 transaction found".to_string(),
            n => format!("{n} transactions found"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Idle,
    Splitting,
    PerMessageClassifying,
    Aggregating,
    Done,
}

impl PipelineState {
    fn advance(&mut self, next: PipelineState) {
        tracing::debug!(from = ?*self, to = ?next, "pipeline state");
        *self = next;
    }
}

/// Entry point: text in, reviewable transactions out.
#[derive(Debug, Default)]
pub struct ParsingPipeline {
    registry: PatternRegistry,
    rules: CategoryRuleEngine,
    limits: ParseLimits,
}

impl ParsingPipeline {
    pub fn new(registry: PatternRegistry, rules: CategoryRuleEngine) -> Self {
        Self {
            registry,
            rules,
            limits: ParseLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ParseLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, PipelineError> {
        let registry = PatternRegistry::new(&config.patterns)?;
        let rules = CategoryRuleEngine::new(config.category_rules.clone());
        Ok(Self::new(registry, rules).with_limits(config.limits))
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Never fails; segments that cannot be parsed are reported in `skipped`.
    pub fn parse(&self, blob: &str) -> ParseReport {
        self.parse_at(blob, RunContext::now().started_at)
    }

    pub fn parse_at(&self, blob: &str, started_at: NaiveDateTime) -> ParseReport {
        let mut state = PipelineState::Idle;
        state.advance(PipelineState::Splitting);
        let segments = split_messages(blob);
        self.run(state, &segments, RunContext::at(started_at))
    }

    /// Like [`parse`](Self::parse), but refuses input beyond the configured limits
    /// before any result is produced.
    pub fn try_parse(&self, blob: &str) -> Result<ParseReport, PipelineError> {
        self.try_parse_at(blob, RunContext::now().started_at)
    }

    pub fn try_parse_at(&self, blob: &str, started_at: NaiveDateTime) -> Result<ParseReport, PipelineError> {
        if let Some(limit) = self.limits.max_input_bytes {
            if blob.len() > limit {
                return Err(PipelineError::InputTooLarge { size: blob.len(), limit });
            }
        }

        let mut state = PipelineState::Idle;
        state.advance(PipelineState::Splitting);
        let segments = split_messages(blob);

        if let Some(limit) = self.limits.max_segments {
            if segments.len() > limit {
                return Err(PipelineError::TooManySegments { count: segments.len(), limit });
            }
        }

        Ok(self.run(state, &segments, RunContext::at(started_at)))
    }

    fn run(&self, mut state: PipelineState, segments: &[String], run: RunContext) -> ParseReport {
        state.advance(PipelineState::PerMessageClassifying);
        let extractor = FieldExtractor::new(&self.registry);
        let assembler = TransactionAssembler::new(run, &self.rules);

        let mut transactions = Vec::new();
        let mut skipped = Vec::new();
        for (index, text) in segments.iter().enumerate() {
            let message = RawMessage { index, text: text.as_str() };
            match Self::process_segment(&extractor, &assembler, &message) {
                Ok(tx) => transactions.push(tx),
                Err(reason) => {
                    tracing::debug!(index, %reason, "skipping segment");
                    skipped.push(SkippedSegment { index, reason });
                }
            }
        }

        state.advance(PipelineState::Aggregating);
        let selection = SelectionSet::select_all(transactions.iter().map(|tx| &tx.id));
        let report = ParseReport {
            transactions,
            selection,
            skipped,
            segment_count: segments.len(),
        };
        tracing::info!(
            segments = report.segment_count,
            parsed = report.transactions.len(),
            skipped = report.skipped.len(),
            "{}",
            report.summary()
        );

        state.advance(PipelineState::Done);
        report
    }

    fn process_segment(
        extractor: &FieldExtractor<'_>,
        assembler: &TransactionAssembler<'_>,
        message: &RawMessage<'_>,
    ) -> Result<ParsedTransaction, SegmentError> {
        let normalized = normalize(message.text);
        let m = extractor.extract(&normalized)?;
        let amount = parse_amount(&m.captures.amount)?;
        if amount.is_zero() {
            return Err(SegmentError::ZeroAmount);
        }
        Ok(assembler.assemble(&m, Money::from_decimal(amount), message, &normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::AmountFormatError;
    use crate::dedup::{DuplicateDetector, LedgerEntry};
    use chrono::NaiveDate;
    use smsbook_core::{Intent, Provider, TransactionKind};

    const MPESA_SENT: &str = "Confirmed. You have sent Ksh1,200.00 to JOHN DOE 254712345678 on 15/1/24 at 2:30 PM. New M-PESA balance is Ksh15,800.50. Transaction cost Ksh11.00.";
    const MPESA_RECEIVED: &str = "Confirmed. You have received Ksh5,000.00 from MARY WANJIKU 254701234567 on 15/1/24 at 10:15 AM. New M-PESA balance is Ksh17,000.50.";
    const BANK_DEBIT: &str = "Account No. ****1234 has been debited with KSh2,500.00 on 15/01/2024.";
    const OTP: &str = "Your OTP is 123456. Do not share it.";

    fn started() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn parse(blob: &str) -> ParseReport {
        ParsingPipeline::default().parse_at(blob, started())
    }

    #[test]
    fn mpesa_sent_scenario() {
        let report = parse(MPESA_SENT);
        assert_eq!(report.transactions.len(), 1);
        let tx = &report.transactions[0];
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.amount, Money::from_cents(120_000));
        assert_eq!(tx.method, Provider::MobileMoneyA);
        assert_eq!(tx.category, "Transfer");
        assert_eq!(tx.confidence, 0.9);
        assert_eq!(tx.description, "M-Pesa sent to John Doe");
        assert_eq!(tx.raw_message, MPESA_SENT);
    }

    #[test]
    fn bank_debit_scenario() {
        let report = parse(BANK_DEBIT);
        let tx = &report.transactions[0];
        assert_eq!(tx.kind, TransactionKind::Expense);
        assert_eq!(tx.amount, Money::from_cents(250_000));
        assert_eq!(tx.method, Provider::Bank);
        assert_eq!(tx.category, "Bank Transfer");
        assert_eq!(tx.confidence, 0.85);
        assert_eq!(tx.description, "Bank account debit");
        assert_eq!(tx.account_ref.as_deref(), Some("1234"));
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn received_then_unrecognized() {
        let report = parse(&format!("{MPESA_RECEIVED}\n\n{OTP}"));
        assert_eq!(report.segment_count, 2);
        assert_eq!(report.transactions.len(), 1);
        let tx = &report.transactions[0];
        assert_eq!(tx.kind, TransactionKind::Income);
        assert_eq!(tx.sender(), Some("Mary Wanjiku"));
        assert!(tx.id.as_str().ends_with("-0"));
        assert_eq!(
            report.skipped,
            vec![SkippedSegment { index: 1, reason: SegmentError::NoProviderMatch }]
        );
    }

    #[test]
    fn order_follows_input() {
        let report = parse(&format!("{BANK_DEBIT}\n---\n{OTP}\n\n{MPESA_SENT}\n===\n{MPESA_RECEIVED}"));
        let intents: Vec<Intent> = report.transactions.iter().map(|t| t.intent).collect();
        assert_eq!(intents, vec![Intent::Debit, Intent::Sent, Intent::Received]);
        let ids: Vec<&str> = report.transactions.iter().map(|t| t.id.as_str()).collect();
        let millis = RunContext::at(started()).millis();
        assert_eq!(
            ids,
            vec![format!("{millis}-0"), format!("{millis}-2"), format!("{millis}-3")]
        );
    }

    #[test]
    fn deterministic_fields() {
        let blob = format!("{MPESA_SENT}\n\n{BANK_DEBIT}");
        let pipeline = ParsingPipeline::default();
        let a = pipeline.parse(&blob);
        let b = pipeline.parse(&blob);
        for (x, y) in a.transactions.iter().zip(&b.transactions) {
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.amount, y.amount);
            assert_eq!(x.category, y.category);
            assert_eq!(x.confidence, y.confidence);
            assert_eq!(x.description, y.description);
            assert_eq!(x.fingerprint, y.fingerprint);
        }
        assert_eq!(a.transactions.len(), b.transactions.len());
    }

    #[test]
    fn everything_selected_after_parse() {
        let report = parse(&format!("{MPESA_SENT}\n\n{MPESA_RECEIVED}\n\n{BANK_DEBIT}"));
        assert_eq!(report.selection.len(), 3);
        assert!(report.transactions.iter().all(|t| report.selection.is_selected(&t.id)));
        assert_eq!(report.selected().len(), 3);
        assert_eq!(report.summary(), "3 transactions found");
    }

    #[test]
    fn no_false_positives() {
        let report = parse("Hello there\n\nYour OTP is 1234\n\nMeeting at 10");
        assert!(report.transactions.is_empty());
        assert!(report.selection.is_empty());
        assert_eq!(report.skipped.len(), 3);
        assert_eq!(report.summary(), "No transactions could be parsed");
    }

    #[test]
    fn provider_keyword_without_pattern() {
        let report = parse("M-PESA services will be unavailable tonight.");
        assert_eq!(
            report.skipped[0].reason,
            SegmentError::NoIntentMatch { provider: Provider::MobileMoneyA }
        );
    }

    #[test]
    fn zero_amount_is_skipped() {
        let report = parse("Confirmed. You have sent Ksh0.00 to JOHN DOE on 1/1/24. New M-PESA balance is Ksh10.00.");
        assert!(report.transactions.is_empty());
        assert_eq!(report.skipped[0].reason, SegmentError::ZeroAmount);
    }

    #[test]
    fn too_many_decimals_is_skipped() {
        let report = parse("Confirmed. You have sent Ksh1.234 to JOHN DOE on 1/1/24. New M-PESA balance is Ksh10.00.");
        assert!(report.transactions.is_empty());
        assert!(matches!(
            report.skipped[0].reason,
            SegmentError::AmountFormat { error: AmountFormatError::Precision(_) }
        ));
    }

    #[test]
    fn empty_input() {
        for blob in ["", "   \n\n \n", "---\n==="] {
            let report = parse(blob);
            assert!(report.is_empty_input());
            assert!(report.transactions.is_empty());
            assert_eq!(report.summary(), "Nothing to parse");
        }
    }

    #[test]
    fn missing_date_uses_run_date() {
        let report = parse("You have paid Ksh80.00 for AIRTIME on M-PESA.");
        assert_eq!(report.transactions[0].date, started().date());
    }

    #[test]
    fn repeated_message_is_reported() {
        let again = MPESA_SENT.replace(". ", ".  ").to_uppercase();
        let report = parse(&format!("{MPESA_SENT}\n\n{BANK_DEBIT}\n\n{again}"));
        let pairs = report.repeated();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, report.transactions[0].id);
        assert_eq!(pairs[0].1, report.transactions[2].id);
        // Still selected; the host decides.
        assert_eq!(report.selection.len(), 3);
    }

    #[test]
    fn ledger_duplicates_can_be_deselected() {
        let mut report = parse(&format!("{MPESA_SENT}\n\n{BANK_DEBIT}"));
        let ledger = [LedgerEntry {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            amount: Money::from_cents(250_000),
            description: "Bank account debit".to_string(),
            reference: None,
        }];
        let matches = DuplicateDetector::default().find_duplicates(&report.transactions, &ledger);
        assert_eq!(matches.len(), 1);
        report.deselect_duplicates(&matches);
        let kept = report.selected();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].intent, Intent::Sent);
    }

    #[test]
    fn input_size_limit() {
        let pipeline = ParsingPipeline::default().with_limits(ParseLimits {
            max_input_bytes: Some(10),
            max_segments: None,
        });
        let err = pipeline.try_parse(MPESA_SENT).unwrap_err();
        assert!(matches!(err, PipelineError::InputTooLarge { limit: 10, .. }));
    }

    #[test]
    fn segment_limit() {
        let pipeline = ParsingPipeline::default().with_limits(ParseLimits {
            max_input_bytes: None,
            max_segments: Some(1),
        });
        let err = pipeline
            .try_parse_at(&format!("{MPESA_SENT}\n\n{BANK_DEBIT}"), started())
            .unwrap_err();
        assert!(matches!(err, PipelineError::TooManySegments { count: 2, limit: 1 }));
        assert!(pipeline.try_parse_at(MPESA_SENT, started()).is_ok());
    }

    #[test]
    fn config_adds_patterns_and_rules() {
        let config = EngineConfig::from_toml_str(
            r#"
            [[patterns]]
            provider = "bank"
            intent = "debit"
            regex = 'card purchase of {cur}{amount} at {party}{end}'
            confidence = 0.7
            description = "Card purchase at"

            [[category_rules]]
            name = "groceries"
            pattern = "naivas"
            category = "Groceries"
            "#,
        )
        .unwrap();
        let pipeline = ParsingPipeline::from_config(&config).unwrap();
        let report = pipeline.parse_at(
            "Card purchase of KES 1,250.00 at NAIVAS WESTLANDS. Account 5566.",
            started(),
        );
        let tx = &report.transactions[0];
        assert_eq!(tx.description, "Card purchase at Naivas Westlands");
        assert_eq!(tx.category, "Groceries");
        assert_eq!(tx.confidence, 0.7);
    }

    #[test]
    fn bad_config_pattern_is_rejected() {
        let config = EngineConfig::from_toml_str(
            r#"
            [[patterns]]
            provider = "bank"
            intent = "debit"
            regex = 'no amount here'
            confidence = 0.5
            description = "x"
            "#,
        )
        .unwrap();
        assert!(matches!(
            ParsingPipeline::from_config(&config),
            Err(PipelineError::Registry(_))
        ));
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ParsingPipeline>();
    }
}
