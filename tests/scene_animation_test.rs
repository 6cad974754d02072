use approx::assert_relative_eq;
use cgmath::Vector3;
use toon_flight::{
    data_structures::{instance::{Instance, euler_to_quaternion}, scene_graph::SceneNode},
    scene::SceneState,
};

use crate::common::test_utils::{aircraft, seeded_config};

mod common;

#[test]
fn should_sway_and_roll_with_the_sine_of_wall_clock_time() {
    let config = seeded_config();
    let mut scene = SceneState::new(&config);
    scene.on_model_loaded(Ok(aircraft()));

    for t in [0.0, 0.25, 1.0, 2.5, 1_760_000_000.123] {
        scene.run_frame(t);
        let pose = scene
            .model_node()
            .and_then(|node| node.get_local_transform(0))
            .expect("model is in the scene");

        let wave = f64::sin(t);
        assert_relative_eq!(pose.position.z, (wave * 0.5) as f32, epsilon = 1e-6);
        assert_relative_eq!(pose.position.y, -1.0);
        assert_relative_eq!(pose.position.x, 0.0);

        let expected = euler_to_quaternion(Vector3::new(
            0.0,
            std::f32::consts::FRAC_PI_2,
            (wave * 0.2) as f32,
        ));
        assert_relative_eq!(pose.rotation.s, expected.s, epsilon = 1e-6);
        assert_relative_eq!(pose.rotation.v.x, expected.v.x, epsilon = 1e-6);
        assert_relative_eq!(pose.rotation.v.y, expected.v.y, epsilon = 1e-6);
        assert_relative_eq!(pose.rotation.v.z, expected.v.z, epsilon = 1e-6);
        assert_eq!(pose.scale, Vector3::new(1.0, 1.0, 1.0));
    }
}

#[test]
fn should_tick_without_model_before_it_loaded() {
    let mut scene = SceneState::new(&seeded_config());
    let nodes_before = scene.graph.len();

    for tick in 0..120 {
        scene.run_frame(tick as f64 / 60.0);
    }

    assert!(scene.model.is_pending());
    assert!(scene.model_node().is_none());
    assert_eq!(scene.graph.len(), nodes_before);
    // the rest of the scene keeps moving
    assert_relative_eq!(scene.ground_offset().x, -0.012, epsilon = 1e-5);
}

#[test]
fn should_wrap_clouds_past_the_upper_bound() {
    let mut scene = SceneState::new(&seeded_config());
    let clouds = scene.graph.get_mut(scene.clouds).expect("clouds exist");
    clouds.set_local_transform(0, Instance::from(Vector3::new(4.995, 1.0, 2.0)));
    clouds.set_local_transform(1, Instance::from(Vector3::new(5.0, 0.0, 0.0)));
    clouds.set_local_transform(2, Instance::from(Vector3::new(4.985, 0.0, 0.0)));

    scene.run_frame(0.0);

    let positions = scene.cloud_positions();
    assert_eq!(positions[0].x, -5.0);
    assert_eq!(positions[0].y, 1.0);
    assert_eq!(positions[0].z, 2.0);
    assert_eq!(positions[1].x, -5.0);
    assert_eq!(positions[2].x, 4.985f32 + 0.01);
}

#[test]
fn should_not_guard_the_lower_cloud_bound() {
    let mut scene = SceneState::new(&seeded_config());
    let clouds = scene.graph.get_mut(scene.clouds).expect("clouds exist");
    clouds.set_local_transform(0, Instance::from(Vector3::new(-7.0, 0.0, 0.0)));

    scene.run_frame(0.0);

    assert_eq!(scene.cloud_positions()[0].x, -7.0f32 + 0.01);
}

#[test]
fn should_move_clouds_by_accumulated_steps() {
    let mut scene = SceneState::new(&seeded_config());
    let start = scene.cloud_positions();
    let ticks = 250;

    for tick in 0..ticks {
        scene.run_frame(tick as f64);
    }

    for (cloud, start) in scene.cloud_positions().iter().zip(start) {
        let mut expected = start.x;
        for _ in 0..ticks {
            expected += 0.01;
            if expected > 5.0 {
                expected = -5.0;
            }
        }
        assert_eq!(cloud.x, expected);
        assert_eq!(cloud.y, start.y);
        assert_eq!(cloud.z, start.z);
    }
}

#[test]
fn should_place_ten_clouds_inside_the_spread() {
    let scene = SceneState::new(&seeded_config());
    let positions = scene.cloud_positions();

    assert_eq!(positions.len(), 10);
    for position in positions {
        for axis in [position.x, position.y, position.z] {
            assert!((-5.0..5.0).contains(&axis), "{} is out of range", axis);
        }
    }
}

#[test]
fn should_reproduce_cloud_layout_from_seed() {
    let config = seeded_config();
    assert_eq!(
        SceneState::new(&config).cloud_positions(),
        SceneState::new(&config).cloud_positions()
    );
}

#[test]
fn should_scroll_ground_texture_by_accumulation() {
    let mut scene = SceneState::new(&seeded_config());
    let mut expected = scene.ground_offset().x;
    assert_eq!(expected, 0.0);

    for tick in 0..1000 {
        scene.run_frame(tick as f64);
        expected -= 0.0001;
        assert_eq!(scene.ground_offset().x, expected);
    }
    assert_eq!(scene.ground_offset().y, 0.0);
    let repeat = scene
        .textures
        .get(scene.ground_texture)
        .map(|slot| slot.transform.repeat)
        .expect("ground texture exists");
    assert_eq!(repeat, cgmath::Vector2::new(3.0, 3.0));
}

#[test]
fn should_keep_scrolling_far_from_the_origin() {
    let mut scene = SceneState::new(&seeded_config());
    scene
        .textures
        .get_mut(scene.ground_texture)
        .expect("ground texture exists")
        .transform
        .offset
        .x = -2048.0;

    for tick in 0..1000 {
        scene.run_frame(tick as f64);
    }

    assert_relative_eq!(scene.ground_offset().x, -2048.1, epsilon = 1e-9);
}

#[test]
fn should_not_drift_over_a_long_flight() {
    let mut scene = SceneState::new(&seeded_config());
    let ticks = 200_000;

    for tick in 0..ticks {
        scene.run_frame(tick as f64);
    }

    assert_relative_eq!(scene.ground_offset().x, -0.0001 * ticks as f64, epsilon = 1e-8);
}

#[test]
fn should_propagate_world_transforms_to_model_meshes() {
    let mut scene = SceneState::new(&seeded_config());
    scene.on_model_loaded(Ok(aircraft()));
    scene.run_frame(0.0);

    let model = scene.model_node().expect("model is in the scene");
    // model root -> "Scene" -> fuselage -> propeller container
    let propeller = &model.get_children()[0].get_children()[0].get_children()[0];
    let world = propeller.get_world_transforms();
    assert_eq!(world.len(), 1);
    // the propeller sits 2 units along the fuselage's z, which the root turns towards +x
    assert_relative_eq!(world[0].position.x, 2.0, epsilon = 1e-5);
    assert_relative_eq!(world[0].position.y, -1.0, epsilon = 1e-5);
    assert_relative_eq!(world[0].position.z, 0.0, epsilon = 1e-5);
}
