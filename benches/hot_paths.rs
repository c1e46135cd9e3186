//! Benchmarks for the per-interaction paths: name normalization, the
//! boundary join, cause aggregation and map rasterization.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use risk_atlas::data::{Boundaries, DetailRecord, RiskRecord, Table};
use risk_atlas::join::enrich;
use risk_atlas::map::{MapRenderer, Viewport};
use risk_atlas::query::{top_causes, Filter};
use risk_atlas::region::normalize;

const CAUSES: [&str; 6] = ["Stroke", "Diabetes", "Tuberculosis", "Pneumonia", "Hypertension", "Accident"];

fn region_name(i: usize) -> String {
    if i % 3 == 0 {
        format!("Kota Region {i}")
    } else {
        format!("Kab.  Region   {i}")
    }
}

/// A grid of square regions, `side` x `side`, 0.1° apart
fn build_boundaries(side: usize) -> Boundaries {
    let features = (0..side * side)
        .map(|i| {
            let lon = 106.0 + (i % side) as f64 * 0.1;
            let lat = -8.0 + (i / side) as f64 * 0.1;
            let ring = vec![
                vec![lon, lat],
                vec![lon + 0.1, lat],
                vec![lon + 0.1, lat + 0.1],
                vec![lon, lat + 0.1],
                vec![lon, lat],
            ];
            let mut props = JsonObject::new();
            props.insert("KABKOT".into(), JsonValue::from(region_name(i).to_uppercase()));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
                id: None,
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();

    Boundaries::new(
        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        },
        "KABKOT",
    )
}

fn build_risk(count: usize) -> Vec<RiskRecord> {
    (0..count)
        .map(|i| RiskRecord {
            region_name: region_name(i),
            year: 2023,
            death_category: None,
            cluster: (i % 5) as u8,
            risk_label: "Medium".into(),
            total_deaths: (i * 7) as f64,
        })
        .collect()
}

fn build_detail(regions: usize) -> Table<DetailRecord> {
    let records = (0..regions * 40)
        .map(|i| DetailRecord {
            region_name: region_name(i % regions),
            year: 2022 + (i % 2) as i32,
            death_category: None,
            cause: CAUSES[i % CAUSES.len()].into(),
            death_count: Some((i % 13) as f64),
        })
        .collect();
    Table {
        records,
        has_category: false,
    }
}

fn bench_normalize(c: &mut Criterion) {
    let names: Vec<String> = (0..1_000).map(region_name).collect();
    c.bench_function("normalize_1000", |b| {
        b.iter(|| {
            for name in &names {
                black_box(normalize(black_box(name)));
            }
        });
    });
}

fn bench_enrich(c: &mut Criterion) {
    let mut group = c.benchmark_group("enrich");

    for side in [5, 20, 50] {
        let boundaries = build_boundaries(side);
        let risk = build_risk(side * side);
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &side, |b, _| {
            b.iter(|| black_box(enrich(&boundaries, &risk)).matched);
        });
    }

    group.finish();
}

fn bench_top_causes(c: &mut Criterion) {
    let detail = build_detail(30);
    let filter = Filter {
        year: 2023,
        category: None,
    };
    let key = normalize(&region_name(4));
    c.bench_function("top_causes_1200_rows", |b| {
        b.iter(|| black_box(top_causes(&detail, &filter, black_box(&key))));
    });
}

fn bench_render(c: &mut Criterion) {
    let side = 20;
    let enriched = enrich(&build_boundaries(side), &build_risk(side * side));
    let renderer = MapRenderer::new(&enriched);
    let bounds = renderer.bounds().unwrap_or((106.0, -8.0, 108.0, -6.0));
    let viewport = Viewport::fit(bounds, 240, 160);

    c.bench_function("render_400_regions", |b| {
        b.iter(|| {
            let layers = renderer.render(120, 40, black_box(&viewport), None, Some(3));
            black_box(layers.borders.glyphs().count())
        });
    });
}

criterion_group!(benches, bench_normalize, bench_enrich, bench_top_causes, bench_render);
criterion_main!(benches);
