use criterion::{criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use sim_core::{BudgetConfig, DecadeSplit, GrowthTable, Product, ProductId};
use std::collections::BTreeMap;

fn bench_projection_table(c: &mut Criterion) {
    let rates: BTreeMap<u32, Decimal> = (2..=12).map(|m| (m, Decimal::new(5, 0))).collect();
    let config = BudgetConfig {
        growth_table: GrowthTable::new(rates).unwrap(),
        decade_splits: vec![
            DecadeSplit::new(Decimal::new(40, 0), Decimal::new(35, 0), Decimal::new(25, 0));
            12
        ],
    };
    let products: Vec<Product> = (0..50)
        .map(|i| Product {
            id: ProductId(format!("p{i}")),
            name: format!("Product {i}"),
            base_quantity: Decimal::new(2650 + i, 0),
        })
        .collect();
    c.bench_function("projection_table_50_products", |b| {
        b.iter(|| {
            let _ = sim_runtime::projection_table(&products, &config);
        })
    });
}

criterion_group!(benches, bench_projection_table);
criterion_main!(benches);
