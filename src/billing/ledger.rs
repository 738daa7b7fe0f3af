//! Credit ledger: carry-forward of surplus energy (and optionally money)
//! across billing periods.
//!
//! The ledger is a pure step function `(balance, net) -> entry` folded over
//! closed periods in sequence order. Speculative costing of the open period
//! calls the same step on a copy of the carried balance, so it can never
//! alter the historical balance.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::tariff::{FixedReason, Tariff, TariffBreakdown};

/// Which balances the ledger tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LedgerMode {
    /// Energy credit only (kWh).
    #[default]
    #[serde(rename = "energy")]
    Energy,
    /// Energy credit plus a parallel monetary credit.
    #[serde(rename = "energy+cash")]
    EnergyAndCash,
}

impl fmt::Display for LedgerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Energy => "energy",
            Self::EnergyAndCash => "energy+cash",
        })
    }
}

/// What happens when positive net exceeds the available energy credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Apply the whole balance and bill tiers on the remaining net.
    #[default]
    PartialOffset,
    /// Bill tiers on the full net and drop the balance.
    Forfeit,
}

impl fmt::Display for ShortfallPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PartialOffset => "partial_offset",
            Self::Forfeit => "forfeit",
        })
    }
}

/// Running credit balances threaded through the period fold.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CreditBalance {
    /// Banked surplus energy (kWh, never negative).
    pub energy_kwh: f64,
    /// Banked monetary credit (never negative; always zero in energy mode).
    pub cash: f64,
}

impl CreditBalance {
    /// Balance holding only energy credit.
    pub fn energy(energy_kwh: f64) -> Self {
        Self {
            energy_kwh,
            cash: 0.0,
        }
    }
}

/// Outcome of applying one period's net consumption to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    /// Net consumption presented to the ledger (kWh, signed).
    pub net_kwh: f64,
    /// Net left to be priced after energy credit (kWh, >= 0).
    pub billed_kwh: f64,
    /// Energy credit consumed this period (kWh).
    pub credit_applied_kwh: f64,
    /// Energy credit banked this period (kWh).
    pub credit_earned_kwh: f64,
    /// Energy credit dropped under [`ShortfallPolicy::Forfeit`] (kWh).
    pub credit_forfeited_kwh: f64,
    /// Tariff costing of the period.
    pub bill: TariffBreakdown,
    /// Monetary credit consumed against the bill.
    pub cash_applied: f64,
    /// Monetary credit banked this period.
    pub cash_earned: f64,
    /// Bill total minus monetary credit applied.
    pub amount_due: f64,
    /// Balances after this period.
    pub balance_after: CreditBalance,
}

/// Credit ledger parametrized by mode and shortfall policy.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditLedger {
    tariff: Tariff,
    mode: LedgerMode,
    shortfall: ShortfallPolicy,
}

impl CreditLedger {
    /// Creates a ledger pricing periods with `tariff`.
    pub fn new(tariff: Tariff, mode: LedgerMode, shortfall: ShortfallPolicy) -> Self {
        Self {
            tariff,
            mode,
            shortfall,
        }
    }

    /// Ledger mode chosen at construction.
    pub fn mode(&self) -> LedgerMode {
        self.mode
    }

    /// Shortfall policy chosen at construction.
    pub fn shortfall(&self) -> ShortfallPolicy {
        self.shortfall
    }

    /// Applies one period's net consumption to `balance`.
    ///
    /// Pure: the returned entry's `balance_after` depends only on `balance`
    /// and `net_kwh`.
    pub fn step(&self, balance: CreditBalance, net_kwh: f64) -> LedgerEntry {
        let mut energy = balance.energy_kwh;
        let mut applied = 0.0;
        let mut earned = 0.0;
        let mut forfeited = 0.0;

        let (billed_kwh, bill) = if net_kwh <= 0.0 {
            earned = -net_kwh;
            energy += earned;
            (0.0, self.tariff.cost(net_kwh))
        } else if energy >= net_kwh {
            applied = net_kwh;
            energy -= net_kwh;
            (0.0, self.tariff.fixed(net_kwh, FixedReason::CoveredByCredit))
        } else {
            let billed = match self.shortfall {
                ShortfallPolicy::PartialOffset => {
                    applied = energy;
                    net_kwh - energy
                }
                ShortfallPolicy::Forfeit => {
                    forfeited = energy;
                    net_kwh
                }
            };
            energy = 0.0;
            (billed, self.tariff.cost(billed))
        };

        let mut cash = balance.cash;
        let mut cash_applied = 0.0;
        let mut cash_earned = 0.0;
        if self.mode == LedgerMode::EnergyAndCash {
            if net_kwh <= 0.0 {
                cash_earned = bill.total;
                cash += cash_earned;
            } else {
                cash_applied = cash.min(bill.total);
                cash -= cash_applied;
            }
        }

        LedgerEntry {
            net_kwh,
            billed_kwh,
            credit_applied_kwh: applied,
            credit_earned_kwh: earned,
            credit_forfeited_kwh: forfeited,
            amount_due: bill.total - cash_applied,
            bill,
            cash_applied,
            cash_earned,
            balance_after: CreditBalance {
                energy_kwh: energy,
                cash,
            },
        }
    }

    /// Folds a sequence of period nets left to right from `initial`.
    ///
    /// Returns the final balance and one entry per net.
    pub fn fold<I>(&self, initial: CreditBalance, nets: I) -> (CreditBalance, Vec<LedgerEntry>)
    where
        I: IntoIterator<Item = f64>,
    {
        nets.into_iter()
            .fold((initial, Vec::new()), |(balance, mut entries), net| {
                let entry = self.step(balance, net);
                let next = entry.balance_after;
                entries.push(entry);
                (next, entries)
            })
    }
}

impl Default for CreditLedger {
    fn default() -> Self {
        Self::new(
            Tariff::default(),
            LedgerMode::default(),
            ShortfallPolicy::default(),
        )
    }
}
