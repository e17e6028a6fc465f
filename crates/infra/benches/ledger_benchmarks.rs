use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{NaiveDate, Utc};
use larder_core::{Aggregate, AggregateRoot, IngredientId, MenuItemId, OrderId, Quantity};
use larder_infra::{InMemoryLedgerStore, LedgerStore};
use larder_inventory::{InventoryLedger, LedgerId, Requirement};

/// Ledger with one ingredient spread over `lots` one-unit lots.
fn ledger_with_lots(lots: u32) -> (InventoryLedger, IngredientId) {
    let mut ledger = InventoryLedger::new(LedgerId::new());
    let flour = ledger
        .register_ingredient("Flour", "kg", Quantity::units(1), Utc::now())
        .unwrap();
    let base = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    for i in 0..lots {
        let expiry = base.checked_add_days(chrono::Days::new(u64::from(i))).unwrap();
        ledger
            .receive_lot(flour, Quantity::units(1), expiry, "dry store", Utc::now())
            .unwrap();
    }
    (ledger, flour)
}

fn requirement(ingredient_id: IngredientId, units: u32) -> Vec<Requirement> {
    vec![Requirement {
        ingredient_id,
        menu_item_id: MenuItemId::new(),
        quantity: Quantity::units(units),
    }]
}

fn bench_reservation_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("reserve_consumption");

    for lots in [10u32, 100, 1000].iter() {
        let (ledger, flour) = ledger_with_lots(*lots);
        group.throughput(Throughput::Elements(u64::from(*lots)));
        group.bench_with_input(BenchmarkId::new("drain_all_lots", lots), lots, |b, &lots| {
            b.iter(|| {
                let mut ledger = ledger.clone();
                black_box(
                    ledger
                        .reserve_consumption(OrderId::new(), requirement(flour, lots), Utc::now())
                        .unwrap(),
                )
            });
        });
        group.bench_with_input(BenchmarkId::new("rejected_short", lots), lots, |b, &lots| {
            b.iter(|| {
                let mut ledger = ledger.clone();
                black_box(
                    ledger
                        .reserve_consumption(OrderId::new(), requirement(flour, lots + 1), Utc::now())
                        .unwrap_err(),
                )
            });
        });
    }

    group.finish();
}

fn bench_threshold_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("check_thresholds");

    for ingredients in [10u32, 100, 1000].iter() {
        let mut ledger = InventoryLedger::new(LedgerId::new());
        for i in 0..*ingredients {
            ledger
                .register_ingredient(format!("ingredient-{i}"), "kg", Quantity::units(i % 3), Utc::now())
                .unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(ingredients), &ledger, |b, ledger| {
            b.iter(|| black_box(ledger.check_thresholds().count()));
        });
    }

    group.finish();
}

fn bench_store_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_commit");
    group.sample_size(200);

    group.bench_function("receive_then_reserve", |b| {
        let store = InMemoryLedgerStore::new(LedgerId::new());
        let flour = larder_infra::transact(&store, 0, |ledger| {
            let id = IngredientId::new();
            let events = ledger.execute(&larder_inventory::LedgerCommand::RegisterIngredient(
                larder_inventory::RegisterIngredient {
                    ingredient_id: id,
                    name: "Flour".to_string(),
                    unit: "kg".to_string(),
                    threshold: Quantity::ZERO,
                    occurred_at: Utc::now(),
                },
            ))?;
            Ok::<_, larder_infra::ServiceError>((id, events))
        })
        .unwrap();
        let expiry = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();

        b.iter(|| {
            larder_infra::transact(&store, 0, |ledger| {
                    let mut events = ledger.execute(&larder_inventory::LedgerCommand::ReceiveLot(
                    larder_inventory::ReceiveLot {
                        lot_id: larder_core::LotId::new(),
                        ingredient_id: flour,
                        quantity: Quantity::units(1),
                        expiry_date: expiry,
                        storage_location: "dry store".to_string(),
                        occurred_at: Utc::now(),
                    },
                ))?;
                events.extend(ledger.execute(
                    &larder_inventory::LedgerCommand::ReserveConsumption(
                        larder_inventory::ReserveConsumption {
                            order_id: OrderId::new(),
                            requirements: requirement(flour, 1),
                            occurred_at: Utc::now(),
                        },
                    ),
                )?);
                Ok::<_, larder_infra::ServiceError>(((), events))
            })
            .unwrap();
            black_box(store.load().unwrap().version())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_reservation_latency,
    bench_threshold_check,
    bench_store_commit
);
criterion_main!(benches);
