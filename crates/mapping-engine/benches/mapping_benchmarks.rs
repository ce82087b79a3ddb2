//! Benchmarks for mapping construction.
//!
//! Run with: cargo bench --package mapping-engine --bench mapping_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nalgebra::Point3;
use rand::Rng;

use exchange_common::{GridGeometry, MappingMethod};
use mapping_engine::{build_mapping, MappingCache, MappingKey};
use mesh_codec::Mesh;

/// Random triangles of roughly `size` cells scattered over the grid.
fn random_mesh(geometry: &GridGeometry, triangles: usize, size: f64) -> Mesh {
    let mut rng = rand::thread_rng();
    let span_x = geometry.x_max() - geometry.xllcorner;
    let span_y = geometry.y_max() - geometry.yllcorner;
    let edge = size * geometry.cellsize;

    let facet: Vec<[Point3<f64>; 3]> = (0..triangles)
        .map(|_| {
            let x = geometry.xllcorner + rng.gen_range(0.0..span_x);
            let y = geometry.yllcorner + rng.gen_range(0.0..span_y);
            [
                Point3::new(x, y, 0.0),
                Point3::new(x + edge * rng.gen_range(0.2..1.0), y, 0.0),
                Point3::new(x, y + edge * rng.gen_range(0.2..1.0), 0.0),
            ]
        })
        .collect();
    Mesh::from_facets(vec![facet])
}

fn bench_build_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_mapping");
    let geometry = GridGeometry::new(400, 300, 0.0, 0.0, 10.0).unwrap();

    for triangles in [1_000usize, 10_000, 50_000] {
        let mesh = random_mesh(&geometry, triangles, 2.5);
        group.throughput(Throughput::Elements(triangles as u64));

        for (name, method, parallel) in [
            ("surface_serial", MappingMethod::Surface, false),
            ("surface_parallel", MappingMethod::Surface, true),
            ("barycenter", MappingMethod::Barycenter, false),
        ] {
            group.bench_with_input(BenchmarkId::new(name, triangles), &mesh, |b, mesh| {
                b.iter(|| build_mapping(black_box(mesh), &geometry, method, parallel))
            });
        }
    }

    group.finish();
}

fn bench_mapping_key(c: &mut Criterion) {
    let geometry = GridGeometry::new(400, 300, 0.0, 0.0, 10.0).unwrap();
    let mesh = random_mesh(&geometry, 50_000, 2.5);

    c.bench_function("mapping_key_50k", |b| {
        b.iter(|| MappingKey::new(MappingMethod::Surface, &geometry, black_box(&mesh)))
    });

    c.bench_function("cache_hit_50k", |b| {
        let mut cache = MappingCache::new(4);
        let key = MappingKey::new(MappingMethod::Surface, &geometry, &mesh);
        cache.get_or_build(key, || build_mapping(&mesh, &geometry, MappingMethod::Surface, true));
        b.iter(|| cache.get(black_box(&key)))
    });
}

criterion_group!(benches, bench_build_mapping, bench_mapping_key);
criterion_main!(benches);
