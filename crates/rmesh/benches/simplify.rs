//! Benchmarks for `decimate_to_triangles` against a subdivided icosphere at
//! a few target ratios. Not part of correctness testing; tracks
//! performance regressions in the collapse loop.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Point3;
use rmesh::mesh::Trimesh;
use rmesh::simplify::SimplifierConfig;

/// A crude but adequately dense icosphere stand-in: subdivide an
/// octahedron `subdivisions` times, projecting new vertices onto the unit
/// sphere at each level. Good enough to exercise the collapse loop at a
/// realistic triangle density without pulling in a mesh-generation crate
/// the engine itself has no other use for.
fn subdivided_sphere(subdivisions: usize) -> Trimesh {
    let mut vertices: Vec<Point3<f64>> = vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(-1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, -1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(0.0, 0.0, -1.0),
    ];
    let mut faces: Vec<(usize, usize, usize)> = vec![
        (0, 2, 4),
        (2, 1, 4),
        (1, 3, 4),
        (3, 0, 4),
        (2, 0, 5),
        (1, 2, 5),
        (3, 1, 5),
        (0, 3, 5),
    ];

    for _ in 0..subdivisions {
        let mut midpoint_cache = std::collections::HashMap::new();
        let mut next_faces = Vec::with_capacity(faces.len() * 4);

        let mut midpoint = |vertices: &mut Vec<Point3<f64>>, a: usize, b: usize| -> usize {
            let key = (a.min(b), a.max(b));
            if let Some(&idx) = midpoint_cache.get(&key) {
                return idx;
            }
            let mid = nalgebra::Point3::from((vertices[a].coords + vertices[b].coords).normalize());
            vertices.push(mid);
            let idx = vertices.len() - 1;
            midpoint_cache.insert(key, idx);
            idx
        };

        for &(a, b, c) in &faces {
            let ab = midpoint(&mut vertices, a, b);
            let bc = midpoint(&mut vertices, b, c);
            let ca = midpoint(&mut vertices, c, a);
            next_faces.push((a, ab, ca));
            next_faces.push((b, bc, ab));
            next_faces.push((c, ca, bc));
            next_faces.push((ab, bc, ca));
        }
        faces = next_faces;
    }

    Trimesh::new(vertices, faces, None, None).unwrap()
}

fn bench_decimate(c: &mut Criterion) {
    let mesh = subdivided_sphere(5);
    let original = mesh.faces.len();
    let config = SimplifierConfig::default();

    let mut group = c.benchmark_group("decimate_to_triangles");
    for ratio in [0.5, 0.25, 0.1] {
        let target = ((original as f64) * ratio) as usize;
        group.bench_with_input(BenchmarkId::from_parameter(ratio), &target, |b, &target| {
            b.iter(|| mesh.simplify(target, &config).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decimate);
criterion_main!(benches);
