use std::sync::{Arc, Mutex};
use std::thread;

use forward_physics::{
    AssetRegistry, AssetResolver, ColliderDesc, DynamicsWorld, Entity, Mesh, PhysicsSystem, Scene,
    ShapeKind, Vec3,
};

#[test]
fn test_physics_types_are_sync_and_send() {
    fn assert_sync_send<T: Sync + Send>() {}
    assert_sync_send::<PhysicsSystem>();
    assert_sync_send::<DynamicsWorld>();
    assert_sync_send::<AssetRegistry>();
    assert_sync_send::<Scene>();
}

#[test]
fn test_shared_physics_system_across_threads() {
    let mut scene = Scene::new();
    let ball = scene.spawn(
        Entity::new("ball")
            .with_position(Vec3::new(0.0, 20.0, 0.0))
            .with_collider(ColliderDesc::new(ShapeKind::Sphere, Vec3::splat(0.5)).with_mass(1.0).trigger()),
    );
    let mut physics = PhysicsSystem::new();
    physics.initialize(Vec3::new(0.0, -9.81, 0.0));
    physics.register_collider(ball, &scene, &AssetRegistry::new()).unwrap();

    let shared = Arc::new(Mutex::new((physics, scene)));
    let mut handles = vec![];
    for _ in 0..4 {
        let shared = Arc::clone(&shared);
        handles.push(thread::spawn(move || {
            let mut guard = shared.lock().unwrap();
            let (physics, scene) = &mut *guard;
            physics.update(1.0 / 60.0, scene)
        }));
    }

    let steps: u32 = handles.into_iter().map(|handle| handle.join().unwrap()).sum();
    assert_eq!(steps, 4);

    let guard = shared.lock().unwrap();
    let y = guard.1.entity(ball).unwrap().local_transform.position.y;
    assert!(y < 20.0, "ball should start falling, y = {y}");
}

#[test]
fn test_asset_registry_shared_between_loaders() {
    let assets = Arc::new(AssetRegistry::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let assets = Arc::clone(&assets);
            thread::spawn(move || {
                assets.insert_mesh(format!("mesh{i}"), Mesh::new(Vec::new(), Vec::new()));
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!((0..4).all(|i| assets.mesh(&format!("mesh{i}")).is_some()));
}
