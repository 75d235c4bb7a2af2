//! Performance benchmarks for the finance engine.
//!
//! Covers ledger posting, daily summary recompute against a growing ledger,
//! and budget adherence evaluation.
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use chrono::{Days, NaiveDate};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use uuid::Uuid;

use daycare_finance::engine::FinanceEngine;
use daycare_finance::models::{
    Budget, BudgetPeriod, Category, TransactionDraft, TransactionType,
};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn draft(day: u64) -> TransactionDraft {
    TransactionDraft::new(
        base_date().checked_add_days(Days::new(day % 31)).unwrap(),
        TransactionType::Expense,
        "utilities",
        Decimal::new(12345, 2),
    )
}

/// Creates an engine holding `count` transactions spread over March.
fn create_engine_with(count: u64) -> FinanceEngine {
    let engine = FinanceEngine::builder().build().unwrap();
    for i in 0..count {
        engine.post_transaction(draft(i)).unwrap();
    }
    engine
}

fn bench_post_transaction(c: &mut Criterion) {
    let engine = FinanceEngine::builder().build().unwrap();
    let mut i = 0u64;

    c.bench_function("post_transaction", |b| {
        b.iter(|| {
            i += 1;
            black_box(engine.post_transaction(black_box(draft(i))).unwrap())
        })
    });
}

fn bench_summary_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("daily_summary");

    for count in [100u64, 1_000, 10_000] {
        let engine = create_engine_with(count);
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(BenchmarkId::new("recompute", count), &engine, |b, engine| {
            b.iter(|| black_box(engine.daily_summary(black_box(base_date()))))
        });
        group.bench_with_input(BenchmarkId::new("cached", count), &engine, |b, engine| {
            b.iter(|| black_box(engine.cached_summary(black_box(base_date()))))
        });
    }

    group.finish();
}

fn bench_budget_adherence(c: &mut Criterion) {
    let engine = create_engine_with(1_000);
    engine
        .register_budget(Budget {
            id: Uuid::new_v4(),
            category: Category::Utilities,
            amount: Decimal::new(1_000_000, 2),
            period: BudgetPeriod::Monthly,
            start_date: base_date(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            threshold_percent: Decimal::new(80, 0),
        })
        .unwrap();

    c.bench_function("budget_adherence_1000", |b| {
        b.iter(|| {
            black_box(
                engine
                    .budget_adherence(Category::Utilities, black_box(base_date()))
                    .unwrap(),
            )
        })
    });
}

criterion_group!(
    benches,
    bench_post_transaction,
    bench_summary_recompute,
    bench_budget_adherence
);
criterion_main!(benches);
