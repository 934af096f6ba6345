//! The goods ledger.

use std::collections::BTreeMap;

/// A named good and its on-hand quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Good {
    pub name: String,
    pub qty: i64,
}

/// Ledger of goods held by this depot, keyed by name.
///
/// Quantities are signed: withdrawing a good we never held leaves a negative
/// balance on the books. Records are never removed, they persist at zero or
/// below and are merely filtered from snapshots.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    goods: BTreeMap<String, i64>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `qty` units of `good` arriving. Inserts the record if absent.
    pub fn deliver(&mut self, good: &str, qty: i64) {
        let entry = self.goods.entry(good.to_owned()).or_insert(0);
        *entry = entry.saturating_add(qty);
    }

    /// Record `qty` units of `good` leaving. Inserts a negative record if
    /// the good was not on the books.
    pub fn withdraw(&mut self, good: &str, qty: i64) {
        let entry = self.goods.entry(good.to_owned()).or_insert(0);
        *entry = entry.saturating_sub(qty);
    }

    /// Current balance of `good`, zero if it was never recorded.
    pub fn balance(&self, good: &str) -> i64 {
        self.goods.get(good).copied().unwrap_or(0)
    }

    /// Copy of all records with a non-zero balance, in name order.
    pub fn snapshot(&self) -> Vec<Good> {
        self.goods
            .iter()
            .filter(|(_, &qty)| qty != 0)
            .map(|(name, &qty)| Good {
                name: name.clone(),
                qty,
            })
            .collect()
    }
}

impl FromIterator<(String, i64)> for Inventory {
    fn from_iter<T: IntoIterator<Item = (String, i64)>>(iter: T) -> Self {
        let mut inventory = Self::new();
        for (good, qty) in iter {
            let entry = inventory.goods.entry(good).or_insert(0);
            *entry = entry.saturating_add(qty);
        }
        inventory
    }
}
