//! Randomized checks of the credit ledger fold.

mod common;

use bimestre::billing::engine::BillingEngine;
use bimestre::billing::ledger::{CreditBalance, CreditLedger, LedgerMode, ShortfallPolicy};
use bimestre::billing::tariff::Tariff;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common::{day, reading};

const EPS: f64 = 1e-9;

fn random_nets(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.random_range(-400.0..600.0)).collect()
}

fn all_ledgers() -> Vec<CreditLedger> {
    let mut out = Vec::new();
    for mode in [LedgerMode::Energy, LedgerMode::EnergyAndCash] {
        for shortfall in [ShortfallPolicy::PartialOffset, ShortfallPolicy::Forfeit] {
            out.push(CreditLedger::new(Tariff::default(), mode, shortfall));
        }
    }
    out
}

#[test]
fn balances_never_go_negative() {
    let mut rng = StdRng::seed_from_u64(7);
    for ledger in all_ledgers() {
        for _ in 0..50 {
            let nets = random_nets(&mut rng, 12);
            let (_, entries) = ledger.fold(CreditBalance::default(), nets);
            for e in &entries {
                assert!(e.balance_after.energy_kwh >= 0.0, "{e:?}");
                assert!(e.balance_after.cash >= -EPS, "{e:?}");
                assert!(e.amount_due >= -EPS, "{e:?}");
                assert!(e.billed_kwh >= 0.0, "{e:?}");
            }
        }
    }
}

#[test]
fn step_depends_only_on_balance_and_net() {
    let mut rng = StdRng::seed_from_u64(42);
    let ledger = CreditLedger::default();
    for _ in 0..200 {
        let balance = CreditBalance::energy(rng.random_range(0.0..300.0));
        let net = rng.random_range(-300.0..300.0);
        assert_eq!(ledger.step(balance, net), ledger.step(balance, net));
    }
}

#[test]
fn fold_is_a_left_to_right_chain_of_steps() {
    let mut rng = StdRng::seed_from_u64(11);
    for ledger in all_ledgers() {
        let nets = random_nets(&mut rng, 20);
        let (final_balance, entries) = ledger.fold(CreditBalance::default(), nets.clone());

        let mut balance = CreditBalance::default();
        for (net, entry) in nets.iter().zip(&entries) {
            let stepped = ledger.step(balance, *net);
            assert_eq!(&stepped, entry);
            balance = stepped.balance_after;
        }
        assert_eq!(balance, final_balance);
    }
}

#[test]
fn energy_credit_is_conserved() {
    let mut rng = StdRng::seed_from_u64(3);
    for ledger in all_ledgers() {
        let nets = random_nets(&mut rng, 30);
        let (balance, entries) = ledger.fold(CreditBalance::default(), nets);
        let earned: f64 = entries.iter().map(|e| e.credit_earned_kwh).sum();
        let applied: f64 = entries.iter().map(|e| e.credit_applied_kwh).sum();
        let forfeited: f64 = entries.iter().map(|e| e.credit_forfeited_kwh).sum();
        assert!((earned - applied - forfeited - balance.energy_kwh).abs() < 1e-6);
    }
}

#[test]
fn tariff_total_is_monotone_for_positive_net() {
    let tariff = Tariff::default();
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..500 {
        let a = rng.random_range(0.001..1000.0);
        let b = rng.random_range(0.001..1000.0);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        assert!(tariff.cost(lo).total <= tariff.cost(hi).total + EPS);
    }
}

#[test]
fn engine_results_match_manual_fold() {
    let mut rng = StdRng::seed_from_u64(2025);
    let mut drawn = 1000.0;
    let mut injected = 500.0;
    let mut readings = vec![reading(1, day(1), drawn, injected, true)];
    for i in 1..=8u64 {
        drawn += rng.random_range(50.0..400.0);
        injected += rng.random_range(0.0..350.0);
        readings.push(reading(i + 1, day(1 + 60 * i), drawn, injected, true));
    }

    let out = BillingEngine::default().recompute(&readings, day(1 + 60 * 8));
    assert_eq!(out.results.len(), 8);
    assert!(out.results.iter().all(|r| !r.is_open));

    let nets: Vec<f64> = out.results.iter().map(|r| r.net_consumption_kwh).collect();
    let (carried, entries) = CreditLedger::default().fold(CreditBalance::default(), nets);
    for (result, entry) in out.results.iter().zip(&entries) {
        assert_eq!(result.credit_remaining_kwh, entry.balance_after.energy_kwh);
        assert_eq!(result.estimated_cost, entry.bill.total);
    }
    assert_eq!(out.carried, carried);
}
