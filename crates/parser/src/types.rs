use serde::Serialize;
use smsbook_core::{Intent, Provider};
use thiserror::Error;

use crate::amount::AmountFormatError;

/// One segment of the pasted text. Lives only for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage<'a> {
    /// Position of the segment in the input.
    pub index: usize,
    pub text: &'a str,
}

/// Raw group captures of a matched pattern. Absent groups stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Captures {
    pub amount: String,
    pub counterpart: Option<String>,
    pub date: Option<String>,
    pub balance: Option<String>,
    pub fee: Option<String>,
    pub account_ref: Option<String>,
}

/// The first pattern of a provider that matched a normalized message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralMatch {
    pub provider: Provider,
    pub intent: Intent,
    /// Confidence declared by the matching pattern.
    pub confidence: f32,
    /// Description prefix declared by the matching pattern.
    pub description: String,
    /// Position of the pattern in its provider's list.
    pub rank: usize,
    pub captures: Captures,
    /// Provider transaction code found anywhere in the message.
    pub reference: Option<String>,
}

/// Why a segment produced no transaction. Never escalates past its segment.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SegmentError {
    #[error("No provider keyword found")]
    NoProviderMatch,
    #[error("No {provider} pattern matched")]
    NoIntentMatch { provider: Provider },
    #[error("Invalid amount: {error}")]
    AmountFormat { error: AmountFormatError },
    #[error("Amount is zero")]
    ZeroAmount,
}

impl From<AmountFormatError> for SegmentError {
    fn from(error: AmountFormatError) -> Self {
        SegmentError::AmountFormat { error }
    }
}

/// A segment that was dropped from the results, with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSegment {
    pub index: usize,
    #[serde(flatten)]
    pub reason: SegmentError,
}
