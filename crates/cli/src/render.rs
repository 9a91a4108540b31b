use std::fmt::Write as _;

use serde::Serialize;
use smsbook_core::{ParsedTransaction, TransactionId};
use smsbook_parser::{DuplicateMatch, ParseReport};

#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    report: &'a ParseReport,
    repeated: Vec<(TransactionId, TransactionId)>,
    duplicates: &'a [DuplicateMatch],
}

pub fn json(report: &ParseReport, duplicates: &[DuplicateMatch], selected_only: bool) -> serde_json::Result<String> {
    if selected_only {
        return serde_json::to_string_pretty(&report.selected());
    }
    serde_json::to_string_pretty(&JsonOutput {
        report,
        repeated: report.repeated(),
        duplicates,
    })
}

pub fn table(report: &ParseReport, duplicates: &[DuplicateMatch], selected_only: bool) -> String {
    let rows: Vec<&ParsedTransaction> = if selected_only {
        report.selected()
    } else {
        report.transactions.iter().collect()
    };

    let mut out = String::new();
    if !rows.is_empty() {
        let _ = writeln!(
            out,
            "    {:<18} {:<10} {:<7} {:>12}  {:<12} {:<14} {:>4}  DESCRIPTION",
            "ID", "DATE", "KIND", "AMOUNT", "METHOD", "CATEGORY", "CONF"
        );
    }
    for tx in rows {
        let mark = if report.selection.is_selected(&tx.id) { "[x]" } else { "[ ]" };
        let _ = writeln!(
            out,
            "{mark} {:<18} {:<10} {:<7} {:>12}  {:<12} {:<14} {:>4.2}  {}",
            tx.id.as_str(),
            tx.date.to_string(),
            tx.kind.to_string(),
            tx.amount.to_string(),
            tx.method.display_name(),
            tx.category,
            tx.confidence,
            tx.description
        );
    }

    for (original, repeat) in report.repeated() {
        let _ = writeln!(out, "note: {repeat} repeats {original}");
    }
    for m in duplicates {
        let _ = writeln!(
            out,
            "note: {} looks recorded already (ledger entry {}, confidence {:.2})",
            m.transaction_id, m.ledger_index, m.confidence
        );
    }
    for s in &report.skipped {
        let _ = writeln!(out, "skipped message {}: {}", s.index + 1, s.reason);
    }

    let _ = writeln!(
        out,
        "{} ({} selected)",
        report.summary(),
        report.selection.len()
    );
    out
}
