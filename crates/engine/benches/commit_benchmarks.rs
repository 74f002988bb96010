//! Commit-path benchmarks: how fast the coordinator turns intents into
//! committed (ledger entry, stock event, audit record) triples.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use shopledger_audit::Operator;
use shopledger_core::{BusinessId, EmployeeId, Money, ProductId};
use shopledger_engine::{
    BusinessSpec, ConsistencyEngine, SaleIntent, SaleLine, StockAdjustment, Tender,
};
use shopledger_inventory::ProductSpec;

fn seeded_engine() -> (ConsistencyEngine, BusinessId, ProductId, Operator) {
    shopledger_observability::init();
    let engine = ConsistencyEngine::new();
    let operator = Operator::new(EmployeeId::new(), "bench");
    let business = engine
        .register_business(BusinessSpec::new("Bench Mart", "USD"), &operator)
        .unwrap();
    let product = engine
        .create_product(
            business.id,
            ProductSpec::new("Widget", "W-1", Money::from_minor(150), Money::from_minor(300)),
            &operator,
        )
        .unwrap();
    engine
        .adjust_stock(
            business.id,
            StockAdjustment {
                product_id: product.id,
                delta_qty: 1_000_000,
                unit_cost: Money::ZERO,
                reason: "bench seed".to_string(),
                quantity_only: true,
                operator: operator.clone(),
            },
        )
        .unwrap();
    (engine, business.id, product.id, operator)
}

fn bench_adjust_stock(c: &mut Criterion) {
    let (engine, business, product_id, operator) = seeded_engine();
    c.bench_function("adjust_stock_shrinkage", |b| {
        b.iter(|| {
            engine
                .adjust_stock(
                    business,
                    StockAdjustment {
                        product_id,
                        delta_qty: -1,
                        unit_cost: Money::from_minor(150),
                        reason: "bench shrinkage".to_string(),
                        quantity_only: false,
                        operator: operator.clone(),
                    },
                )
                .unwrap()
        })
    });
}

fn bench_record_sale(c: &mut Criterion) {
    let (engine, business, product_id, operator) = seeded_engine();
    c.bench_function("record_sale_single_line", |b| {
        b.iter(|| {
            engine
                .record_sale(
                    business,
                    SaleIntent {
                        lines: vec![SaleLine { product_id, quantity: 1, unit_price: None }],
                        tender: Tender::Cash,
                        note: None,
                        operator: operator.clone(),
                    },
                )
                .unwrap()
        })
    });
}

fn bench_ledger_replay(c: &mut Criterion) {
    c.bench_function("general_ledger_query_after_1000_commits", |b| {
        b.iter_batched(
            || {
                let (engine, business, product_id, operator) = seeded_engine();
                for _ in 0..1000 {
                    engine
                        .adjust_stock(
                            business,
                            StockAdjustment {
                                product_id,
                                delta_qty: -1,
                                unit_cost: Money::from_minor(150),
                                reason: "bench".to_string(),
                                quantity_only: false,
                                operator: operator.clone(),
                            },
                        )
                        .unwrap();
                }
                (engine, business)
            },
            |(engine, business)| engine.general_ledger(business),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_adjust_stock, bench_record_sale, bench_ledger_replay);
criterion_main!(benches);
