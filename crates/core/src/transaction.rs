use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;
use super::provider::{Intent, Provider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Income => write!(f, "income"),
            TransactionKind::Expense => write!(f, "expense"),
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(format!("Unknown transaction kind: '{other}'")),
        }
    }
}

/// Identity of a candidate within one pipeline run. Not durable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub String);

impl TransactionId {
    /// `<run timestamp millis>-<segment index>`
    pub fn for_run(run_millis: i64, sequence_index: usize) -> Self {
        TransactionId(format!("{run_millis}-{sequence_index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        TransactionId(s.to_string())
    }
}

/// The other party named in a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "role", content = "name")]
pub enum Counterpart {
    Recipient(String),
    Sender(String),
}

impl Counterpart {
    pub fn for_kind(kind: TransactionKind, name: String) -> Self {
        match kind {
            TransactionKind::Income => Counterpart::Sender(name),
            TransactionKind::Expense => Counterpart::Recipient(name),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Counterpart::Recipient(n) | Counterpart::Sender(n) => n,
        }
    }
}

/// A structured transaction produced from one message, pending user review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub intent: Intent,
    pub amount: Money,
    pub description: String,
    pub category: String,
    pub method: Provider,
    pub date: NaiveDate,
    /// Static score of the pattern that matched (0.0–1.0).
    pub confidence: f32,
    pub counterpart: Option<Counterpart>,
    pub account_ref: Option<String>,
    /// Provider transaction code, upper-cased.
    pub reference: Option<String>,
    /// SHA-256 hex of the normalized message text.
    pub fingerprint: String,
    pub raw_message: String,
}

impl ParsedTransaction {
    pub fn recipient(&self) -> Option<&str> {
        match &self.counterpart {
            Some(Counterpart::Recipient(n)) => Some(n),
            _ => None,
        }
    }

    pub fn sender(&self) -> Option<&str> {
        match &self.counterpart {
            Some(Counterpart::Sender(n)) => Some(n),
            _ => None,
        }
    }

    /// Amount with the sign of its kind: negative for expenses.
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => Money::zero() - self.amount,
        }
    }
}
