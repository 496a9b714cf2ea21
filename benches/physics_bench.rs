use std::{hint::black_box, sync::Arc};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use forward_physics::{
    collision::CollisionDispatcher,
    core::mesh::TriangleMesh,
    render::{BaseMaterial, Camera, RenderCommandExtractor, ShaderId, Vertex},
    scene::MeshRenderer,
    AssetRegistry, ColliderDesc, CollisionShape, Entity, ForwardRenderer, Material, Mesh,
    PhysicsSystem, RecordingBackend, RendererConfig, Scene, ShapeKind, Transform, UVec2, Vec3,
};

const DT: f32 = 1.0 / 60.0;

/// A floor plus `body_count` falling trigger spheres in a loose column grid.
fn prepare_physics(body_count: usize) -> (PhysicsSystem, Scene) {
    let mut scene = Scene::new();
    scene.spawn(
        Entity::new("floor")
            .with_collider(ColliderDesc::new(ShapeKind::Box, Vec3::new(200.0, 1.0, 200.0))),
    );
    for i in 0..body_count {
        let position = Vec3::new((i % 32) as f32 * 1.5, 2.0 + (i / 32) as f32 * 1.5, 0.0);
        scene.spawn(
            Entity::new(format!("body{i}"))
                .with_position(position)
                .with_collider(ColliderDesc::new(ShapeKind::Sphere, Vec3::splat(0.5)).with_mass(1.0)),
        );
    }

    let mut physics = PhysicsSystem::new();
    physics.initialize(Vec3::new(0.0, -9.81, 0.0));
    physics.register_world_colliders(&scene, &AssetRegistry::new());
    (physics, scene)
}

fn bench_physics_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("physics_update");
    for &count in &[128usize, 512, 2048] {
        group.bench_with_input(BenchmarkId::new("update", count), &count, |b, &count| {
            let (mut physics, mut scene) = prepare_physics(count);
            b.iter(|| black_box(physics.update(black_box(DT), &mut scene)))
        });
    }
    group.finish();
}

fn generate_grid_mesh(resolution: usize) -> (Vec<Vec3>, Vec<[u32; 3]>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for y in 0..=resolution {
        for x in 0..=resolution {
            vertices.push(Vec3::new(x as f32, 0.0, y as f32));
        }
    }
    let width = resolution + 1;
    for y in 0..resolution {
        for x in 0..resolution {
            let i = y * width + x;
            let a = i as u32;
            let b = (i + 1) as u32;
            let c = (i + width) as u32;
            let d = (i + width + 1) as u32;
            indices.push([a, b, c]);
            indices.push([b, d, c]);
        }
    }
    (vertices, indices)
}

fn bench_mesh_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_builder");
    for &res in &[16usize, 32, 64] {
        group.bench_with_input(BenchmarkId::new("build", res), &res, |b, &res| {
            let (vertices, indices) = generate_grid_mesh(res);
            b.iter(|| {
                let mesh = TriangleMesh::builder(vertices.clone(), indices.clone()).build();
                black_box(mesh)
            })
        });
    }
    group.finish();
}

fn bench_mesh_contacts(c: &mut Criterion) {
    let (vertices, indices) = generate_grid_mesh(64);
    let terrain = CollisionShape::TriangleMesh(TriangleMesh::builder(vertices, indices).build());
    let sphere = CollisionShape::Sphere { radius: 0.5 };
    let boxed = CollisionShape::Box {
        half_extents: Vec3::splat(0.5),
    };
    let dispatcher = CollisionDispatcher::new();
    let resting = Transform::from_position(Vec3::new(20.3, 0.45, 31.7));

    let mut group = c.benchmark_group("mesh_contacts");
    group.bench_function("sphere_vs_terrain", |b| {
        b.iter(|| black_box(dispatcher.collide(&sphere, &resting, &terrain, &Transform::IDENTITY)))
    });
    group.bench_function("box_vs_terrain", |b| {
        b.iter(|| black_box(dispatcher.collide(&boxed, &resting, &terrain, &Transform::IDENTITY)))
    });
    group.finish();
}

fn prepare_render_scene(object_count: usize) -> Scene {
    let mesh = Arc::new(Mesh::sphere((16, 16)));
    let opaque = Arc::new(Material::Base(BaseMaterial::new(ShaderId(1))));
    let mut glass = BaseMaterial::new(ShaderId(2));
    glass.transparent = true;
    let glass = Arc::new(Material::Base(glass));

    let mut scene = Scene::new();
    scene.spawn(Entity::new("camera").with_camera(Camera::default()));
    for i in 0..object_count {
        let material = if i % 4 == 0 { glass.clone() } else { opaque.clone() };
        scene.spawn(
            Entity::new(format!("object{i}"))
                .with_position(Vec3::new((i % 16) as f32, (i / 16 % 16) as f32, -(i as f32) * 0.25))
                .with_mesh_renderer(MeshRenderer::new(mesh.clone(), material)),
        );
    }
    scene
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for &count in &[256usize, 1024] {
        let scene = prepare_render_scene(count);
        group.bench_with_input(BenchmarkId::new("extract", count), &scene, |b, scene| {
            b.iter(|| black_box(RenderCommandExtractor::extract(scene)))
        });
        group.bench_with_input(BenchmarkId::new("frame", count), &scene, |b, scene| {
            let assets = AssetRegistry::new();
            let mut backend = RecordingBackend::new();
            let mut renderer = ForwardRenderer::new();
            let config = RendererConfig {
                sky: Some("sky.jpg".into()),
                ..RendererConfig::default()
            };
            if renderer.initialize(UVec2::new(1280, 720), &config, &mut backend).is_err() {
                return;
            }
            b.iter(|| {
                let stats = renderer.render(scene, &assets, &mut backend);
                backend.take_commands();
                black_box(stats)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_physics_update,
    bench_mesh_builder,
    bench_mesh_contacts,
    bench_render
);
criterion_main!(benches);
