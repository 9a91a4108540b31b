use std::collections::BTreeSet;

use serde::Serialize;
use smsbook_core::{ParsedTransaction, TransactionId};

/// Which candidates of a run the user intends to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionSet {
    ids: BTreeSet<TransactionId>,
    #[serde(skip)]
    known: BTreeSet<TransactionId>,
}

impl SelectionSet {
    /// Every candidate starts selected.
    pub fn select_all<'a>(ids: impl IntoIterator<Item = &'a TransactionId>) -> Self {
        let known: BTreeSet<TransactionId> = ids.into_iter().cloned().collect();
        Self {
            ids: known.clone(),
            known,
        }
    }

    pub fn is_selected(&self, id: &TransactionId) -> bool {
        self.ids.contains(id)
    }

    /// Flip one id. Ids that are not part of the run are ignored.
    /// Returns the new state.
    pub fn toggle(&mut self, id: &TransactionId) -> bool {
        if !self.known.contains(id) {
            return false;
        }
        if !self.ids.remove(id) {
            self.ids.insert(id.clone());
        }
        self.is_selected(id)
    }

    pub fn deselect(&mut self, id: &TransactionId) {
        self.ids.remove(id);
    }

    pub fn select(&mut self, id: &TransactionId) {
        if self.known.contains(id) {
            self.ids.insert(id.clone());
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The selected transactions, in their original order.
    pub fn selected_subset<'a>(&self, transactions: &'a [ParsedTransaction]) -> Vec<&'a ParsedTransaction> {
        transactions
            .iter()
            .filter(|tx| self.is_selected(&tx.id))
            .collect()
    }
}
