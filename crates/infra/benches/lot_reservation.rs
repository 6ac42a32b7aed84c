use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use stockyard_core::{Money, PartyId};
use stockyard_inventory::ImportLotId;
use stockyard_infra::{
    CodePrefixes, CreateMovementRequest, EnvelopeBus, InMemoryStore, ReceiveLotRequest,
    RegisterProduct, Stockyard,
};
use stockyard_movements::{MovementKind, NewMovementLine};
use stockyard_products::ProductId;

fn setup(lot_quantity: i64) -> (Stockyard<InMemoryStore, EnvelopeBus>, ProductId, ImportLotId) {
    let app = Stockyard::in_memory(CodePrefixes::default());
    let product = app
        .catalog
        .register_product(RegisterProduct {
            code: "BENCH-001".to_string(),
            name: "Bench product".to_string(),
            unit_price: Money::new(100).unwrap(),
            min_stock: None,
            max_stock: None,
            category_id: None,
            supplier_id: None,
        })
        .unwrap();
    let lot = app
        .lots
        .receive_lot(ReceiveLotRequest {
            product_id: product.id_typed(),
            quantity: lot_quantity,
            unit_price: Money::new(80).unwrap(),
            import_code: "PN-BENCH".to_string(),
            imports_date: Utc::now(),
        })
        .unwrap();
    (app, product.id_typed(), lot.id_typed())
}

fn bench_reserve_from_lot(c: &mut Criterion) {
    let mut group = c.benchmark_group("reserve_from_lot");
    group.throughput(Throughput::Elements(1));

    group.bench_function("single_unit", |b| {
        let (app, _, lot) = setup(i64::MAX / 2);
        b.iter(|| {
            black_box(app.lots.reserve_from_lot(lot, 1, None).unwrap());
        });
    });

    group.finish();
}

fn bench_export_confirmation(c: &mut Criterion) {
    let mut group = c.benchmark_group("export_confirmation");

    for lines in [1usize, 10, 50] {
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            let (app, product_id, lot) = setup(1_000_000_000);
            // Stock on hand must cover the exports too.
            let import = app
                .movements
                .create(CreateMovementRequest {
                    kind: MovementKind::SupplierImport,
                    counterparty_id: PartyId::new(),
                    note: None,
                    lines: vec![NewMovementLine {
                        product_id,
                        selected_lot_id: None,
                        unit_price: Money::new(80).unwrap(),
                        quantity: 1_000_000_000,
                    }],
                })
                .unwrap();
            app.movements.confirm(import.id_typed()).unwrap();

            b.iter(|| {
                let order = app
                    .movements
                    .create(CreateMovementRequest {
                        kind: MovementKind::InternalExport,
                        counterparty_id: PartyId::new(),
                        note: None,
                        lines: (0..lines)
                            .map(|_| NewMovementLine {
                                product_id,
                                selected_lot_id: Some(lot),
                                unit_price: Money::new(100).unwrap(),
                                quantity: 1,
                            })
                            .collect(),
                    })
                    .unwrap();
                black_box(app.movements.confirm(order.id_typed()).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_available_lots(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_available_lots");

    for lots in [10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(lots), &lots, |b, &lots| {
            let (app, product_id, _) = setup(1);
            for i in 0..lots {
                app.lots
                    .receive_lot(ReceiveLotRequest {
                        product_id,
                        quantity: 10,
                        unit_price: Money::ZERO,
                        import_code: format!("PN-{i:05}"),
                        imports_date: Utc::now(),
                    })
                    .unwrap();
            }
            b.iter(|| black_box(app.lots.list_available_lots(product_id).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_reserve_from_lot,
    bench_export_confirmation,
    bench_available_lots
);
criterion_main!(benches);
