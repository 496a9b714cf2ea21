use forward_physics::{
    core::{mesh::TriangleMesh, types::Transform},
    AssetRegistry, ColliderDesc, CollisionShape, DynamicsWorld, Entity, PhysicsSystem,
    RigidBodyTriad, Scene, ShapeKind, Vec3,
};

const DT: f32 = 1.0 / 60.0;

#[test]
fn trigger_overlap_is_reported_without_touching_velocity() {
    let mut scene = Scene::new();
    let zone = scene.spawn(Entity::new("zone").with_collider(
        ColliderDesc::new(ShapeKind::Box, Vec3::splat(4.0)).trigger(),
    ));
    let player = scene.spawn(
        Entity::new("player")
            .with_position(Vec3::new(0.5, 0.0, 0.0))
            .with_collider(ColliderDesc::new(ShapeKind::Box, Vec3::ONE).with_mass(70.0)),
    );

    let mut physics = PhysicsSystem::new();
    physics.initialize(Vec3::new(0.0, -9.81, 0.0));
    let assets = AssetRegistry::new();
    let zone = physics.register_collider(zone, &scene, &assets).unwrap();
    let player = physics.register_collider(player, &scene, &assets).unwrap();
    physics
        .body_mut(player)
        .unwrap()
        .body_mut()
        .set_linear_velocity(Vec3::new(1.0, 0.0, 0.0));

    assert_eq!(physics.update(DT, &mut scene), 1);

    let velocity = physics.body(player).unwrap().body().linear_velocity();
    assert!((velocity - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5, "{velocity:?}");

    let events = physics.collision_events();
    assert_eq!(events.len(), 1);
    let event = events[0];
    assert!(event.trigger);
    assert!(
        (event.collider_a == zone && event.collider_b == player)
            || (event.collider_a == player && event.collider_b == zone)
    );
}

#[test]
fn character_is_stopped_by_static_wall() {
    let mut scene = Scene::new();
    let wall = scene.spawn(
        Entity::new("wall")
            .with_position(Vec3::new(3.0, 0.0, 0.0))
            .with_collider(ColliderDesc::new(ShapeKind::Box, Vec3::new(1.0, 4.0, 4.0))),
    );
    let player = scene.spawn(
        Entity::new("player").with_collider(ColliderDesc::new(ShapeKind::Box, Vec3::ONE).with_mass(70.0)),
    );

    let mut physics = PhysicsSystem::new();
    physics.initialize(Vec3::new(0.0, -9.81, 0.0));
    let assets = AssetRegistry::new();
    physics.register_collider(wall, &scene, &assets).unwrap();
    let handle = physics.register_collider(player, &scene, &assets).unwrap();

    for _ in 0..120 {
        physics
            .body_mut(handle)
            .unwrap()
            .body_mut()
            .set_linear_velocity(Vec3::new(2.0, 0.0, 0.0));
        physics.update(DT, &mut scene);
    }

    let x = scene.entity(player).unwrap().local_transform.position.x;
    assert!(x > 1.5 && x < 2.1, "player at x = {x}");
    let body = physics.body(handle).unwrap().body();
    assert_eq!(body.angular_velocity(), Vec3::ZERO);
}

#[test]
fn box_comes_to_rest_on_triangle_mesh() {
    let vertices = vec![
        Vec3::new(-10.0, 0.0, -10.0),
        Vec3::new(10.0, 0.0, -10.0),
        Vec3::new(10.0, 0.0, 10.0),
        Vec3::new(-10.0, 0.0, 10.0),
    ];
    let floor = TriangleMesh::builder(vertices, vec![[0, 2, 1], [0, 3, 2]]).build();

    let mut world = DynamicsWorld::default();
    world.add_rigid_body(RigidBodyTriad::from_shape(
        CollisionShape::TriangleMesh(floor),
        0.0,
        Transform::IDENTITY,
        false,
    ));
    let cube = world.add_rigid_body(RigidBodyTriad::from_shape(
        CollisionShape::Box {
            half_extents: Vec3::splat(0.5),
        },
        1.0,
        Transform::from_position(Vec3::new(0.0, 2.0, 0.0)),
        true,
    ));

    for _ in 0..180 {
        world.step_simulation(DT, 10, DT);
    }

    let y = world.body(cube).unwrap().body().transform.position.y;
    assert!(y > 0.2 && y < 1.0, "cube at y = {y}");
}

#[test]
fn removed_collider_no_longer_collides() {
    let mut scene = Scene::new();
    let zone = scene.spawn(Entity::new("zone").with_collider(
        ColliderDesc::new(ShapeKind::Sphere, Vec3::splat(2.0)).trigger(),
    ));
    let crate_entity = scene.spawn(
        Entity::new("crate").with_collider(ColliderDesc::new(ShapeKind::Box, Vec3::ONE).with_mass(5.0)),
    );

    let mut physics = PhysicsSystem::new();
    physics.initialize(Vec3::ZERO);
    let assets = AssetRegistry::new();
    let zone = physics.register_collider(zone, &scene, &assets).unwrap();
    physics.register_collider(crate_entity, &scene, &assets).unwrap();

    physics.update(DT, &mut scene);
    assert_eq!(physics.collision_events().len(), 1);

    assert!(physics.remove_collider(zone));
    physics.update(DT, &mut scene);
    assert!(physics.collision_events().is_empty());
    assert_eq!(physics.tracked_count(), 1);
}
