//! The science balance and affordability checks.
//!
//! The balance belongs to the host's economy subsystem; the engine reaches
//! it through [`CurrencyLedger`]. [`ScienceLedger`] is the in-process
//! implementation used when the host delegates the balance entirely.

use crate::mode::GameMode;
use serde::{Deserialize, Serialize};

/// Why the balance changed. Mirrors the host's transaction reasons that
/// touch science.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionReason {
    ScienceTransmission,
    VesselRecovery,
    ContractReward,
    TechResearch,
    Cheating,
    Other,
}

impl TransactionReason {
    pub fn label(self) -> &'static str {
        match self {
            TransactionReason::ScienceTransmission => "Science Transmission",
            TransactionReason::VesselRecovery => "Vessel Recovery",
            TransactionReason::ContractReward => "Contract Reward",
            TransactionReason::TechResearch => "Tech Research",
            TransactionReason::Cheating => "Cheating",
            TransactionReason::Other => "Other",
        }
    }
}

/// Reader/writer for the science balance.
pub trait CurrencyLedger {
    fn balance(&self) -> f64;

    fn credit(&mut self, amount: f64, reason: TransactionReason);

    fn debit(&mut self, amount: f64, reason: TransactionReason);
}

/// In-memory science balance with a transaction log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScienceLedger {
    balance: f64,
    #[serde(skip)]
    history: Vec<(TransactionReason, f64)>,
}

impl ScienceLedger {
    pub fn new(balance: f64) -> Self {
        Self {
            balance,
            history: Vec::new(),
        }
    }

    /// Signed amounts applied since creation, oldest first.
    pub fn history(&self) -> &[(TransactionReason, f64)] {
        &self.history
    }
}

impl CurrencyLedger for ScienceLedger {
    fn balance(&self) -> f64 {
        self.balance
    }

    fn credit(&mut self, amount: f64, reason: TransactionReason) {
        if !amount.is_finite() {
            tracing::warn!(target: "rnd", amount, "ignoring non-finite credit");
            return;
        }
        self.balance += amount;
        self.history.push((reason, amount));
    }

    fn debit(&mut self, amount: f64, reason: TransactionReason) {
        if !amount.is_finite() {
            tracing::warn!(target: "rnd", amount, "ignoring non-finite debit");
            return;
        }
        self.balance -= amount;
        self.history.push((reason, -amount));
    }
}

/// Whether `balance` covers `amount`.
///
/// Always true when the mode disables science. Otherwise both sides are
/// rounded to whole points independently, half to even as the host's
/// ledger rounds, so values a hair apart do not flap at the boundary.
pub fn can_afford(balance: f64, amount: f64, mode: GameMode) -> bool {
    if !mode.science_enabled() {
        return true;
    }
    balance.round_ties_even() >= amount.round_ties_even()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_and_debit_move_balance() {
        let mut ledger = ScienceLedger::new(10.0);
        ledger.credit(5.0, TransactionReason::ScienceTransmission);
        ledger.debit(12.0, TransactionReason::TechResearch);
        assert_eq!(ledger.balance(), 3.0);
        assert_eq!(ledger.history().len(), 2);
        assert_eq!(ledger.history()[1], (TransactionReason::TechResearch, -12.0));
    }

    #[test]
    fn non_finite_amounts_ignored() {
        let mut ledger = ScienceLedger::new(1.0);
        ledger.credit(f64::NAN, TransactionReason::Other);
        ledger.debit(f64::INFINITY, TransactionReason::Other);
        assert_eq!(ledger.balance(), 1.0);
        assert!(ledger.history().is_empty());
    }

    #[test]
    fn rounding_prevents_boundary_flapping() {
        assert!(can_afford(44.6, 45.0, GameMode::Career));
        assert!(can_afford(45.0, 45.4, GameMode::Career));
        assert!(!can_afford(44.4, 45.0, GameMode::Career));
    }

    #[test]
    fn rounding_is_half_to_even() {
        // 44.5 rounds down to 44, 45.5 rounds up to 46.
        assert!(!can_afford(44.5, 45.0, GameMode::Career));
        assert!(can_afford(45.5, 46.0, GameMode::Science));
    }

    #[test]
    fn sandbox_always_affords() {
        assert!(can_afford(0.0, 1_000_000.0, GameMode::Sandbox));
    }
}
