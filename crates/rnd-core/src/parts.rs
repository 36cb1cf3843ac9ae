//! Part definitions, purchases, and the experimental part registry.
//!
//! A part is "experimental" while at least one owner (typically a part-test
//! contract) holds it. Owners mark and unmark independently and in any
//! order, so the registry counts owners with a saturating counter instead
//! of trusting callers to pair their calls.

use crate::error::CatalogError;
use crate::id::{PartId, TechId};
use crate::mode::GameMode;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ---------------------------------------------------------------------------
// Part catalog
// ---------------------------------------------------------------------------

/// A part the player can build with once its tech node is researched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailablePart {
    pub id: PartId,
    pub title: String,
    /// Tech node that unlocks the part. `None` for parts that need no research.
    pub tech_required: Option<TechId>,
    /// Funds needed to purchase the part after research (career only).
    pub entry_cost: u32,
    /// Contract objective tags this part satisfies ("Antenna", "Generator").
    pub contract_objectives: Vec<String>,
}

/// All part definitions, frozen after loading.
#[derive(Debug, Clone, Default)]
pub struct PartCatalog {
    parts: HashMap<PartId, AvailablePart>,
    order: Vec<PartId>,
}

impl PartCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, part: AvailablePart) -> Result<(), CatalogError> {
        if self.parts.contains_key(&part.id) {
            return Err(CatalogError::DuplicatePart(part.id));
        }
        self.order.push(part.id.clone());
        self.parts.insert(part.id.clone(), part);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&AvailablePart> {
        self.parts.get(id)
    }

    /// Parts in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &AvailablePart> {
        self.order.iter().filter_map(|id| self.parts.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Owner counting
// ---------------------------------------------------------------------------

/// Number of owners holding a flag. Never negative: releasing an unheld
/// flag leaves it at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct OwnerCount(u32);

impl OwnerCount {
    pub const ZERO: OwnerCount = OwnerCount(0);

    pub fn new(count: u32) -> Self {
        Self(count)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_held(self) -> bool {
        self.0 > 0
    }

    pub fn acquire(self) -> OwnerCount {
        OwnerCount(self.0.saturating_add(1))
    }

    /// Returns the new count and whether an owner was actually released.
    pub fn release(self) -> (OwnerCount, bool) {
        match self.0.checked_sub(1) {
            Some(n) => (OwnerCount(n), true),
            None => (self, false),
        }
    }
}

// ---------------------------------------------------------------------------
// ExperimentalParts
// ---------------------------------------------------------------------------

/// Reference-counted "experimental" flags per part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentalParts {
    owners: HashMap<PartId, OwnerCount>,
}

impl ExperimentalParts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an owner for `part`.
    pub fn mark(&mut self, part: &PartId) {
        let count = self.owners.entry(part.clone()).or_default();
        *count = count.acquire();
    }

    /// Drop an owner for `part`. Unmatched calls are ignored.
    pub fn unmark(&mut self, part: &PartId) {
        let Some(count) = self.owners.get_mut(part.as_str()) else {
            tracing::warn!(target: "rnd", part = %part, "unmark without a matching mark");
            return;
        };
        let (next, released) = count.release();
        if !released {
            tracing::warn!(target: "rnd", part = %part, "unmark without a matching mark");
        }
        if next.is_held() {
            *count = next;
        } else {
            self.owners.remove(part.as_str());
        }
    }

    pub fn is_experimental(&self, part: &str) -> bool {
        self.owner_count(part).is_held()
    }

    pub fn owner_count(&self, part: &str) -> OwnerCount {
        self.owners.get(part).copied().unwrap_or_default()
    }

    /// Currently held flags, for persistence.
    pub fn records(&self) -> BTreeMap<String, u32> {
        self.owners
            .iter()
            .filter(|(_, c)| c.is_held())
            .map(|(id, c)| (id.to_string(), c.get()))
            .collect()
    }

    pub fn restore(&mut self, records: &BTreeMap<String, u32>) {
        self.owners = records
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(id, n)| (PartId::from(id.as_str()), OwnerCount::new(*n)))
            .collect();
    }

    pub fn clear(&mut self) {
        self.owners.clear();
    }
}

// ---------------------------------------------------------------------------
// PurchasedParts
// ---------------------------------------------------------------------------

/// Parts the player has bought after researching them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchasedParts {
    purchased: BTreeSet<PartId>,
}

impl PurchasedParts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn purchase(&mut self, part: &PartId) {
        self.purchased.insert(part.clone());
    }

    /// True for purchased parts, and for every part in modes that do not
    /// track purchases.
    pub fn is_purchased(&self, part: &str, mode: GameMode) -> bool {
        !mode.tracks_purchases() || self.purchased.contains(part)
    }

    pub fn records(&self) -> BTreeSet<String> {
        self.purchased.iter().map(|p| p.to_string()).collect()
    }

    pub fn restore(&mut self, records: &BTreeSet<String>) {
        self.purchased = records.iter().map(|p| PartId::from(p.as_str())).collect();
    }

    pub fn clear(&mut self) {
        self.purchased.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mk1pod, mk1pod_part};

    #[test]
    fn owner_count_saturates_at_zero() {
        let (count, released) = OwnerCount::ZERO.release();
        assert_eq!(count, OwnerCount::ZERO);
        assert!(!released);

        let (count, released) = OwnerCount::ZERO.acquire().release();
        assert_eq!(count, OwnerCount::ZERO);
        assert!(released);
    }

    #[test]
    fn two_marks_three_unmarks() {
        let mut parts = ExperimentalParts::new();
        let pod = mk1pod();
        parts.mark(&pod);
        parts.mark(&pod);
        assert!(parts.is_experimental("mk1pod"));

        parts.unmark(&pod);
        assert!(parts.is_experimental("mk1pod"));
        parts.unmark(&pod);
        assert!(!parts.is_experimental("mk1pod"));
        parts.unmark(&pod);
        assert!(!parts.is_experimental("mk1pod"));
        assert_eq!(parts.owner_count("mk1pod"), OwnerCount::ZERO);
    }

    #[test]
    fn unmark_before_mark_does_not_bank_credit() {
        let mut parts = ExperimentalParts::new();
        let pod = mk1pod();
        parts.unmark(&pod);
        parts.mark(&pod);
        assert!(parts.is_experimental("mk1pod"));
    }

    #[test]
    fn zero_count_entries_are_pruned() {
        let mut parts = ExperimentalParts::new();
        let pod = mk1pod();
        parts.mark(&pod);
        parts.unmark(&pod);
        assert!(parts.records().is_empty());
    }

    #[test]
    fn records_round_trip() {
        let mut parts = ExperimentalParts::new();
        parts.mark(&mk1pod());
        parts.mark(&mk1pod());
        parts.mark(&PartId::from("solarPanels5"));
        let records = parts.records();

        let mut restored = ExperimentalParts::new();
        restored.restore(&records);
        assert_eq!(restored, parts);
        assert_eq!(restored.owner_count("mk1pod").get(), 2);
    }

    #[test]
    fn purchases_only_tracked_in_career() {
        let mut purchased = PurchasedParts::new();
        assert!(!purchased.is_purchased("mk1pod", GameMode::Career));
        assert!(purchased.is_purchased("mk1pod", GameMode::Science));
        assert!(purchased.is_purchased("mk1pod", GameMode::Sandbox));
        purchased.purchase(&mk1pod());
        assert!(purchased.is_purchased("mk1pod", GameMode::Career));
    }

    #[test]
    fn catalog_rejects_duplicates() {
        let mut catalog = PartCatalog::new();
        catalog.register(mk1pod_part()).unwrap();
        assert!(matches!(catalog.register(mk1pod_part()), Err(CatalogError::DuplicatePart(_))));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("mk1pod").is_some());
    }
}
