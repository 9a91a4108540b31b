//! Turns pasted mobile-money and bank SMS text into reviewable transactions.

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static regex::Regex {
            static R: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            R.get_or_init(|| regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub mod amount;
pub mod assemble;
pub mod config;
pub mod dedup;
pub mod extract;
pub mod hash;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod rules;
pub mod selection;
pub mod split;
pub mod types;
pub(crate) mod util;

pub use amount::{parse_amount, AmountFormatError};
pub use assemble::{RunContext, TransactionAssembler};
pub use config::{ConfigError, DedupConfig, EngineConfig, ParseLimits};
pub use dedup::{DuplicateDetector, DuplicateMatch, LedgerEntry, MatchType};
pub use extract::FieldExtractor;
pub use hash::fingerprint;
pub use normalize::normalize;
pub use pipeline::{ParseReport, ParsingPipeline, PipelineError};
pub use registry::{IntentPattern, PatternRegistry, PatternSpec, RegistryError};
pub use rules::{CategorizableTransaction, CategoryRule, CategoryRuleEngine, MatchType as RuleMatchType};
pub use selection::SelectionSet;
pub use split::split_messages;
pub use types::{Captures, RawMessage, SegmentError, SkippedSegment, StructuralMatch};
