//! Property tests for the accrual ledger.
//!
//! Each test states one behavior the ledger guarantees and checks it through
//! the public API only: settlement idempotence, sub-additive rounding,
//! zero-principal gaps, rate-epoch splitting, account independence, claim
//! exactness, and the same guarantees holding up under threads.

use std::sync::atomic::{AtomicU64, Ordering};

use fixed_yield_protocol::accrual::{interest, AccountState, AccrualLedger, Amount, LedgerError, RateSchedule};
use fixed_yield_protocol::config::{days, SECONDS_PER_DAY};
use fixed_yield_protocol::units::parse_units;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Genesis used by most tests: 2024-01-01T00:00:00Z.
const T0: u64 = 1_704_067_200;

fn tokens(s: &str) -> Amount {
    parse_units(s, 18).unwrap()
}

fn ledger() -> AccrualLedger {
    AccrualLedger::new(T0, 500)
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

#[test]
fn settle_twice_at_same_time_changes_nothing() {
    let ledger = ledger();
    ledger.deposit("alice", tokens("1000"), T0).unwrap();
    ledger.settle("alice", T0 + days(17)).unwrap();
    let once = ledger.snapshot();
    ledger.settle("alice", T0 + days(17)).unwrap();
    assert_eq!(ledger.snapshot(), once);
}

#[test]
fn split_settlement_never_exceeds_single_settlement() {
    let p = tokens("123.456789");
    // Awkward, non-round split points so truncation actually bites.
    for split in [1, 7, 3_601, 86_399, days(13) + 17, days(100) - 1] {
        let whole = {
            let mut acct = AccountState::new(T0);
            let s = RateSchedule::new(T0, 733);
            acct.deposit(&s, p, T0).unwrap();
            acct.settle(&s, T0 + days(200)).unwrap();
            acct.accrued_unclaimed
        };
        let split_total = {
            let mut acct = AccountState::new(T0);
            let s = RateSchedule::new(T0, 733);
            acct.deposit(&s, p, T0).unwrap();
            acct.settle(&s, T0 + split).unwrap();
            acct.settle(&s, T0 + days(200)).unwrap();
            acct.accrued_unclaimed
        };
        assert!(split_total <= whole, "split at {split}: {split_total} > {whole}");
        // Two truncations lose strictly less than two base units.
        assert!(whole - split_total < 2, "split at {split} lost too much");
    }
}

#[test]
fn many_tiny_settlements_stay_below_one_big_one() {
    let ledger = ledger();
    ledger.deposit("alice", 1_000_000, T0).unwrap();
    ledger.deposit("bob", 1_000_000, T0).unwrap();
    for hour in 1..=24 * 30 {
        ledger.settle("alice", T0 + hour * 3_600).unwrap();
    }
    ledger.settle("bob", T0 + days(30)).unwrap();
    let alice = ledger.account("alice").unwrap().accrued_unclaimed;
    let bob = ledger.account("bob").unwrap().accrued_unclaimed;
    assert!(alice <= bob);
}

// ---------------------------------------------------------------------------
// Principal changes
// ---------------------------------------------------------------------------

#[test]
fn zero_principal_gap_preserves_interest() {
    let p1 = tokens("50");
    let p2 = tokens("80");
    let expected = interest(p1, 500, days(10)).unwrap() + interest(p2, 500, days(5)).unwrap();

    for gap in [0, 1, days(1), days(400)] {
        let ledger = ledger();
        let t1 = T0 + days(10);
        let t2 = t1 + gap;
        ledger.deposit("alice", p1, T0).unwrap();
        ledger.withdraw("alice", p1, t1).unwrap();
        ledger.deposit("alice", p2, t2).unwrap();
        assert_eq!(
            ledger.pending_reward("alice", t2 + days(5)).unwrap(),
            expected,
            "gap of {gap}s"
        );
    }
}

#[test]
fn staggered_deposits_accrue_for_their_own_holding_periods() {
    let ledger = ledger();
    ledger.deposit("alice", tokens("100"), T0).unwrap();
    ledger.deposit("alice", tokens("200"), T0 + days(10)).unwrap();

    let pending = ledger.pending_reward("alice", T0 + days(20)).unwrap();
    let expected = interest(tokens("100"), 500, days(10)).unwrap()
        + interest(tokens("300"), 500, days(10)).unwrap();
    assert_eq!(pending, expected);
    // Pricing all 300 over the whole 20 days would overpay.
    assert!(pending < interest(tokens("300"), 500, days(20)).unwrap());
    // Same thing in the "first principal 20d + second principal 10d" form,
    // give or take one base unit of truncation.
    let alt = interest(tokens("100"), 500, days(20)).unwrap() + interest(tokens("200"), 500, days(10)).unwrap();
    assert!(pending.abs_diff(alt) <= 1);
}

#[test]
fn over_withdrawal_is_rejected_whole() {
    let ledger = ledger();
    ledger.deposit("alice", tokens("10"), T0).unwrap();
    let before = ledger.account("alice").unwrap();
    let err = ledger.withdraw("alice", tokens("10.000000000000000001"), T0 + days(3)).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientPrincipal { .. }));
    // Not even the settlement was committed.
    assert_eq!(ledger.account("alice").unwrap(), before);
}

// ---------------------------------------------------------------------------
// Rate changes
// ---------------------------------------------------------------------------

#[test]
fn rate_change_splits_next_settlement() {
    let p = tokens("1000");
    let ledger = ledger();
    ledger.deposit("alice", p, T0).unwrap();
    ledger.set_rate(T0 + days(40), 1_200).unwrap();

    let t2 = T0 + days(95);
    let expected = interest(p, 500, days(40)).unwrap() + interest(p, 1_200, days(55)).unwrap();
    assert_eq!(ledger.pending_reward("alice", t2).unwrap(), expected);
    ledger.settle("alice", t2).unwrap();
    assert_eq!(ledger.account("alice").unwrap().accrued_unclaimed, expected);
}

#[test]
fn rate_change_leaves_settled_interest_alone() {
    let p = tokens("1000");
    let ledger = ledger();
    ledger.deposit("alice", p, T0).unwrap();
    ledger.settle("alice", T0 + days(30)).unwrap();
    let realized = ledger.account("alice").unwrap().accrued_unclaimed;

    ledger.set_rate(T0 + days(30), 0).unwrap();
    assert_eq!(ledger.pending_reward("alice", T0 + days(300)).unwrap(), realized);
}

#[test]
fn several_rate_changes_while_account_sleeps() {
    let p = tokens("2500");
    let ledger = ledger();
    ledger.deposit("alice", p, T0).unwrap();
    let rates = [(days(3), 900), (days(9), 100), (days(9), 250), (days(21), 0), (days(30), 700)];
    for (at, bps) in rates {
        ledger.set_rate(T0 + at, bps).unwrap();
    }
    let expected = interest(p, 500, days(3)).unwrap()
        + interest(p, 900, days(6)).unwrap()
        + interest(p, 250, days(12)).unwrap()
        + interest(p, 700, days(10)).unwrap();
    assert_eq!(ledger.claim("alice", T0 + days(40)).unwrap(), expected);
}

// ---------------------------------------------------------------------------
// Independence and claims
// ---------------------------------------------------------------------------

#[test]
fn operations_on_one_account_never_touch_another() {
    let ledger = ledger();
    ledger.deposit("bob", tokens("7"), T0).unwrap();
    let bob = ledger.account("bob").unwrap();

    ledger.deposit("alice", tokens("100"), T0 + days(1)).unwrap();
    ledger.withdraw("alice", tokens("40"), T0 + days(2)).unwrap();
    ledger.claim("alice", T0 + days(3)).unwrap();
    ledger.settle("alice", T0 + days(4)).unwrap();
    let _ = ledger.withdraw("alice", tokens("1000"), T0 + days(5));

    assert_eq!(ledger.account("bob").unwrap(), bob);
}

#[test]
fn claim_pays_exactly_what_pending_reported() {
    let ledger = ledger();
    ledger.deposit("alice", tokens("313.37"), T0).unwrap();
    ledger.set_rate(T0 + days(11), 650).unwrap();

    let now = T0 + days(47) + 1_234;
    let pending = ledger.pending_reward("alice", now).unwrap();
    assert!(pending > 0);
    assert_eq!(ledger.claim("alice", now).unwrap(), pending);
    assert_eq!(ledger.account("alice").unwrap().accrued_unclaimed, 0);
    assert_eq!(ledger.pending_reward("alice", now).unwrap(), 0);
}

#[test]
fn two_hundred_tokens_for_sixty_days_at_five_percent() {
    let ledger = ledger();
    ledger.deposit("alice", tokens("200"), T0).unwrap();

    let now = T0 + 60 * SECONDS_PER_DAY;
    let pending = ledger.pending_reward("alice", now).unwrap();
    // 200 * 0.05 * 60 / 365 = 1.643835616438356164...
    assert_eq!(pending, 1_643_835_616_438_356_164);
    assert!(pending > tokens("0.15"));

    assert_eq!(ledger.claim("alice", now).unwrap(), pending);
    assert_eq!(ledger.pending_reward("alice", now).unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Time and restore
// ---------------------------------------------------------------------------

#[test]
fn time_never_runs_backwards_for_an_account() {
    let ledger = ledger();
    ledger.deposit("alice", tokens("1"), T0 + days(5)).unwrap();
    for op in [
        ledger.deposit("alice", 1, T0 + days(4)),
        ledger.withdraw("alice", 1, T0 + days(4)),
        ledger.settle("alice", T0 + days(4)),
    ] {
        assert!(matches!(op, Err(LedgerError::InvalidArgument(_))));
    }
    assert!(matches!(
        ledger.pending_reward("alice", T0 + days(4)),
        Err(LedgerError::InvalidArgument(_))
    ));
}

#[test]
fn restored_ledger_continues_where_it_left_off() {
    let ledger = ledger();
    ledger.deposit("alice", tokens("10"), T0).unwrap();
    ledger.set_rate(T0 + days(2), 800).unwrap();
    ledger.deposit("bob", tokens("20"), T0 + days(3)).unwrap();

    let json = serde_json::to_string(&ledger.snapshot()).unwrap();
    let restored = AccrualLedger::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();

    // A rate change in the past is still refused after a restore.
    assert!(restored.set_rate(T0 + days(1), 1).is_err());
    for who in ["alice", "bob"] {
        assert_eq!(
            restored.claim(who, T0 + days(90)).unwrap(),
            ledger.claim(who, T0 + days(90)).unwrap()
        );
    }
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn parallel_accounts_match_sequential_result() {
    let parallel = ledger();
    let sequential = ledger();
    let users: Vec<String> = (0..16).map(|i| format!("user-{i}")).collect();

    let run = |ledger: &AccrualLedger, user: &str| {
        for step in 0..50u64 {
            let now = T0 + step * 3_600;
            ledger.deposit(user, tokens("1.5"), now).unwrap();
            if step % 3 == 0 {
                ledger.withdraw(user, tokens("1"), now).unwrap();
            }
            if step % 7 == 0 {
                ledger.claim(user, now).unwrap();
            }
        }
    };

    std::thread::scope(|scope| {
        for user in &users {
            let ledger = &parallel;
            scope.spawn(move || run(ledger, user));
        }
    });
    for user in &users {
        run(&sequential, user);
    }

    assert_eq!(parallel.snapshot(), sequential.snapshot());
}

#[test]
fn same_account_hammered_from_many_threads() {
    let ledger = ledger();
    let clock = AtomicU64::new(T0);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..200 {
                    let now = clock.fetch_add(60, Ordering::SeqCst) + 60;
                    let _ = ledger.deposit("alice", 1_000, now);
                }
            });
        }
    });

    // Some deposits may lose the race for a later timestamp; every one that
    // succeeded is reflected exactly once.
    let acct = ledger.account("alice").unwrap();
    assert_eq!(acct.principal % 1_000, 0);
    assert!(acct.principal >= 1_000);
    assert!(acct.principal <= 8 * 200 * 1_000);
}

#[test]
fn rate_changes_race_with_settlements_without_going_back_in_time() {
    let ledger = ledger();
    for i in 0..8 {
        ledger.deposit(&format!("user-{i}"), tokens("100"), T0).unwrap();
    }

    std::thread::scope(|scope| {
        for i in 0..8 {
            let ledger = &ledger;
            scope.spawn(move || {
                let user = format!("user-{i}");
                for d in 1..=30 {
                    ledger.settle(&user, T0 + days(d)).unwrap();
                }
            });
        }
        scope.spawn(|| {
            for d in 1..=30 {
                // Either lands at or after every settlement so far, or is
                // refused; never retroactive.
                let _ = ledger.set_rate(T0 + days(d), 500 + d as u32);
            }
        });
    });

    let epochs = ledger.epochs();
    assert!(epochs.windows(2).all(|w| w[0].start_time <= w[1].start_time));
    assert!(ledger.high_water() >= T0 + days(30));
}
