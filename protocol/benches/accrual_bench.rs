// Accrual benchmarks for the fixed-yield ledger.
//
// Covers the interest formula, settlement across rate logs of growing
// length, and deposit/claim throughput with many accounts in one ledger.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use fixed_yield_protocol::accrual::{interest, AccountState, AccrualLedger, RateSchedule};
use fixed_yield_protocol::config::days;

const E: u128 = 1_000_000_000_000_000_000;

fn bench_interest(c: &mut Criterion) {
    c.bench_function("accrual/interest", |b| {
        b.iter(|| interest(criterion::black_box(1_234 * E), 500, days(60)));
    });
}

fn bench_settle_across_epochs(c: &mut Criterion) {
    let mut group = c.benchmark_group("accrual/settle_epochs");

    for epochs in [1u64, 16, 256, 4_096] {
        let mut schedule = RateSchedule::new(0, 500);
        for i in 1..epochs {
            schedule.append(i * 3_600, 100 + (i % 900) as u32).unwrap();
        }
        let mut acct = AccountState::new(0);
        acct.deposit(&schedule, 1_000 * E, 0).unwrap();
        let end = epochs * 3_600 + 1;

        group.throughput(Throughput::Elements(epochs));
        group.bench_with_input(BenchmarkId::from_parameter(epochs), &epochs, |b, _| {
            b.iter(|| {
                let mut a = acct.clone();
                a.settle(&schedule, end).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_settle_recent_window(c: &mut Criterion) {
    // Long log, but the account only crosses the last two epochs. Cost
    // should be dominated by the binary search, not the log length.
    let mut schedule = RateSchedule::new(0, 500);
    for i in 1..10_000u64 {
        schedule.append(i * 60, 500 + (i % 7) as u32).unwrap();
    }
    let mut acct = AccountState::new(0);
    acct.deposit(&schedule, E, 0).unwrap();
    acct.settle(&schedule, 9_998 * 60 + 30).unwrap();

    c.bench_function("accrual/settle_recent_window", |b| {
        b.iter(|| {
            let mut a = acct.clone();
            a.settle(&schedule, 10_000 * 60).unwrap()
        });
    });
}

fn bench_ledger_deposit_claim(c: &mut Criterion) {
    let mut group = c.benchmark_group("accrual/ledger_deposit_claim");

    for accounts in [10usize, 1_000, 10_000] {
        let ledger = AccrualLedger::new(0, 500);
        let ids: Vec<String> = (0..accounts).map(|i| format!("user-{i}")).collect();
        for id in &ids {
            ledger.deposit(id, 100 * E, 0).unwrap();
        }

        group.throughput(Throughput::Elements(accounts as u64));
        group.bench_with_input(BenchmarkId::from_parameter(accounts), &ids, |b, ids| {
            let mut now = 0;
            b.iter(|| {
                now += 1;
                for id in ids {
                    ledger.deposit(id, E, now).unwrap();
                    ledger.claim(id, now).unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_interest,
    bench_settle_across_epochs,
    bench_settle_recent_window,
    bench_ledger_deposit_claim,
);
criterion_main!(benches);
