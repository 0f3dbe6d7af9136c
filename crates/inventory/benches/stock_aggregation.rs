use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use stockwise_core::{InventoryItemId, LocationId, VariantId};
use stockwise_inventory::{
    plan_adjustment, summarize, AdjustmentRequest, InventoryRecord, LocationLevel, Variant,
};

fn variant_with(records: usize, locations: usize) -> Variant {
    let mut v = Variant::new(VariantId::parse("variant_bench").unwrap());
    v.inventory_items = (0..records)
        .map(|r| {
            InventoryRecord::new(
                InventoryItemId::parse(format!("iitem_{r}")).unwrap(),
                (0..locations)
                    .map(|l| {
                        LocationLevel::stocked(LocationId::parse(format!("sloc_{l}")).unwrap(), 25)
                    })
                    .collect(),
            )
        })
        .collect();
    v
}

fn bench_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");

    for locations in [1usize, 8, 64] {
        let variant = variant_with(4, locations);
        group.throughput(Throughput::Elements((4 * locations) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(locations), &variant, |b, v| {
            b.iter(|| summarize(black_box(v)))
        });
    }

    group.finish();
}

fn bench_plan_adjustment(c: &mut Criterion) {
    let variant = variant_with(1, 1);
    let request = AdjustmentRequest::new(VariantId::parse("variant_bench").unwrap(), 3).unwrap();

    c.bench_function("plan_adjustment", |b| {
        b.iter(|| plan_adjustment(black_box(&variant), black_box(&request)))
    });
}

criterion_group!(benches, bench_summarize, bench_plan_adjustment);
criterion_main!(benches);
