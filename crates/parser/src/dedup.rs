use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use smsbook_core::{Money, ParsedTransaction, TransactionId};

use crate::config::DedupConfig;
use crate::util::similarity;

/// A transaction the host has already persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub amount: Money,
    pub description: String,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchType {
    /// Both sides carry the same provider transaction code.
    Reference,
    Exact,
    Fuzzy { score: f32 },
}

/// A candidate that looks like something already in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateMatch {
    pub transaction_id: TransactionId,
    /// Position of the matched entry in the ledger slice.
    pub ledger_index: usize,
    pub match_type: MatchType,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    pub date_window_days: i64,
    pub similarity_threshold: f32,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::from_config(&DedupConfig::default())
    }
}

impl DuplicateDetector {
    pub fn new(date_window_days: i64, similarity_threshold: f32) -> Self {
        Self {
            date_window_days,
            similarity_threshold,
        }
    }

    pub fn from_config(config: &DedupConfig) -> Self {
        Self::new(config.date_window_days, config.similarity_threshold)
    }

    /// Best ledger match per candidate. Candidates without one are left out.
    pub fn find_duplicates(
        &self,
        candidates: &[ParsedTransaction],
        ledger: &[LedgerEntry],
    ) -> Vec<DuplicateMatch> {
        candidates
            .iter()
            .filter_map(|tx| self.find_best_match(tx, ledger))
            .collect()
    }

    fn find_best_match(&self, tx: &ParsedTransaction, ledger: &[LedgerEntry]) -> Option<DuplicateMatch> {
        let (ledger_index, match_type, confidence) = ledger
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                self.score_pair(tx, entry)
                    .map(|(match_type, confidence)| (i, match_type, confidence))
            })
            // First of equally good entries wins.
            .fold(None, |best: Option<(usize, MatchType, f32)>, cur| match best {
                Some(b) if b.2 >= cur.2 => Some(b),
                _ => Some(cur),
            })?;

        Some(DuplicateMatch {
            transaction_id: tx.id.clone(),
            ledger_index,
            match_type,
            confidence,
        })
    }

    fn score_pair(&self, tx: &ParsedTransaction, entry: &LedgerEntry) -> Option<(MatchType, f32)> {
        if let (Some(a), Some(b)) = (&tx.reference, &entry.reference) {
            if a.eq_ignore_ascii_case(b) {
                return Some((MatchType::Reference, 1.0));
            }
        }

        if tx.amount != entry.amount {
            return None;
        }

        let date_diff = (tx.date - entry.date).num_days().abs();
        if date_diff > self.date_window_days {
            return None;
        }

        let desc_score = similarity(
            &tx.description.to_lowercase(),
            &entry.description.to_lowercase(),
        );

        if date_diff == 0 && desc_score >= self.similarity_threshold {
            return Some((MatchType::Exact, 1.0));
        }

        let date_score = 1.0 - (date_diff as f32 / (self.date_window_days + 1) as f32);
        let score = (date_score + desc_score) / 2.0;

        (score >= self.similarity_threshold).then_some((MatchType::Fuzzy { score }, score))
    }
}
