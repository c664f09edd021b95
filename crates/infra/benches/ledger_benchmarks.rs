use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use minimart_core::{ProductId, UserId};
use minimart_infra::{
    AdjustmentService, InMemoryAuditSink, InMemoryLedgerStore, LowStockEvaluator, StockProjection,
};
use minimart_inventory::{AdjustStock, Direction, MovementType, Quantity};
use minimart_products::Product;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn adjust(product_id: i64, direction: Direction, quantity: i64) -> AdjustStock {
    AdjustStock {
        product_id: ProductId::from_raw(product_id),
        direction,
        quantity: Quantity::new(quantity).unwrap(),
        movement_type: MovementType::Adjust,
        reason: None,
        notes: None,
        acting_user: Some(UserId::from_raw(1)),
    }
}

/// Store with `products` products and `history` movements spread across them.
fn seeded(rt: &Runtime, products: i64, history: i64) -> Arc<InMemoryLedgerStore> {
    let store = Arc::new(InMemoryLedgerStore::new());
    for id in 1..=products {
        store
            .upsert_product(
                Product::new(ProductId::from_raw(id), format!("Product {id}"), format!("SKU-{id}"))
                    .with_low_stock_threshold(5),
            )
            .unwrap();
    }
    let service = AdjustmentService::new(
        store.clone(),
        InMemoryAuditSink::new(),
        Duration::from_secs(5),
    );
    rt.block_on(async {
        for n in 0..history {
            let product_id = n % products + 1;
            service
                .adjust(adjust(product_id, Direction::In, 1 + n % 7))
                .await
                .unwrap();
        }
    });
    store
}

fn bench_current_stock(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("current_stock");

    for history in [100i64, 1_000, 10_000] {
        let store = seeded(&rt, 1, history);
        let projection = StockProjection::new(store);
        group.throughput(Throughput::Elements(history as u64));
        group.bench_with_input(BenchmarkId::from_parameter(history), &history, |b, _| {
            b.iter(|| {
                rt.block_on(projection.current_stock(black_box(ProductId::from_raw(1))))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_listings(c: &mut Criterion) {
    let rt = runtime();
    let store = seeded(&rt, 200, 5_000);
    let projection = StockProjection::new(store.clone());
    let evaluator = LowStockEvaluator::new(store);

    let mut group = c.benchmark_group("listings");
    group.bench_function("list_with_stock", |b| {
        b.iter(|| rt.block_on(projection.list_with_stock()).unwrap())
    });
    group.bench_function("list_low_stock", |b| {
        b.iter(|| rt.block_on(evaluator.list_low_stock()).unwrap())
    });
    group.finish();
}

fn bench_adjust(c: &mut Criterion) {
    let rt = runtime();
    let store = seeded(&rt, 1, 0);
    let service = AdjustmentService::new(store, InMemoryAuditSink::new(), Duration::from_secs(5));

    let mut group = c.benchmark_group("adjust");
    group.throughput(Throughput::Elements(1));
    group.bench_function("in_1", |b| {
        b.iter(|| {
            rt.block_on(service.adjust(black_box(adjust(1, Direction::In, 1))))
                .unwrap()
        })
    });
    group.finish();
}

criterion_group!(benches, bench_current_stock, bench_listings, bench_adjust);
criterion_main!(benches);
