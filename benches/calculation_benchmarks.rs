//! Performance benchmarks for the Premium Engine.
//!
//! Covers the pure monthly calculation, a single request through the HTTP
//! router, and bulk runs over growing organizations.
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use premium_engine::api::{AppState, create_router};
use premium_engine::calculation::{calculate_monthly, select_effective_tables};
use premium_engine::config::ConfigLoader;
use premium_engine::lifecycle::CalculationLifecycleManager;
use premium_engine::models::{LeaveCollectionMethod, MonthlyInputs, Period};
use premium_engine::store::InMemoryStore;

use axum::{body::Body, http::Request};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tower::ServiceExt;

fn load_config() -> ConfigLoader {
    ConfigLoader::load("./config/sample_org").expect("Failed to load config")
}

fn period() -> Period {
    Period::new(2025, 4).expect("valid period")
}

/// Creates a store with `count` extra employees spread across the grade table.
fn create_store_with_employees(count: usize) -> Arc<InMemoryStore> {
    let config = load_config();
    let store = InMemoryStore::from_config(&config).expect("Failed to seed store");
    let template = config.config().employees()[0].clone();

    for i in 0..count {
        let mut employee = template.clone();
        employee.id = format!("emp_bench_{:04}", i);
        employee.employee_number = format!("B{:04}", i);
        employee.standard_reward = Some(Decimal::from(200_000 + (i as i64 % 40) * 20_000));
        store.add_employee(employee).expect("Failed to add employee");
    }
    Arc::new(store)
}

/// Benchmark: pure monthly calculation from frozen inputs.
fn bench_single_monthly_calculation(c: &mut Criterion) {
    let config = load_config();
    let rate_table = select_effective_tables(&config.rate_rows(), "org_001", period())
        .expect("rate table");
    let inputs = MonthlyInputs {
        employee_number: "E001".to_string(),
        period: period(),
        standard_reward: Decimal::from(300_000),
        birth_date: NaiveDate::from_ymd_opt(1978, 11, 20).expect("valid date"),
        dependent_count: 1,
        leave_records: vec![],
        collection_method: LeaveCollectionMethod::Postpaid,
        rate_table,
        proration: None,
        deferred_history: vec![],
    };

    c.bench_function("single_monthly_calculation", |b| {
        b.iter(|| black_box(calculate_monthly(black_box(&inputs))))
    });
}

/// Benchmark: one monthly calculation request through the router.
fn bench_single_monthly_request(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = create_store_with_employees(0);
    let state = AppState::new(CalculationLifecycleManager::new(store));
    let router = create_router(state);
    let body = serde_json::json!({
        "employee_id": "emp_001",
        "year": 2025,
        "month": 4,
        "actor": "bench"
    })
    .to_string();

    c.bench_function("single_monthly_request", |b| {
        b.to_async(&rt).iter(|| async {
            let router = router.clone();
            let response = router
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri("/calculations/monthly")
                        .header("Content-Type", "application/json")
                        .body(Body::from(body.clone()))
                        .unwrap(),
                )
                .await
                .unwrap();
            black_box(response)
        })
    });
}

/// Benchmark: bulk monthly runs to understand scaling behavior.
fn bench_bulk_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk_monthly");
    // Large organizations take long per iteration
    group.sample_size(10);

    for employee_count in [10usize, 100, 1000].iter() {
        let manager = CalculationLifecycleManager::new(create_store_with_employees(*employee_count));
        let cancel = AtomicBool::new(false);

        group.throughput(Throughput::Elements(*employee_count as u64));
        group.bench_with_input(
            BenchmarkId::new("employees", employee_count),
            employee_count,
            |b, _| {
                b.iter(|| {
                    let outcome = manager
                        .run_monthly_bulk("org_001", period(), "bench", &cancel)
                        .unwrap();
                    black_box(outcome)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_monthly_calculation,
    bench_single_monthly_request,
    bench_bulk_scaling,
);
criterion_main!(benches);
