use std::sync::Arc;

use toon_flight::{
    data_structures::{
        material::{Material, ToonMaterial},
        texture::TextureHandle,
    },
    scene::{Load, SceneState},
};

use crate::common::test_utils::{aircraft, mesh_materials, seeded_config};

mod common;

fn texture_name(scene: &SceneState, handle: Option<TextureHandle>) -> Option<String> {
    handle.and_then(|handle| scene.textures.get(handle).map(|slot| slot.name.clone()))
}

#[test]
fn should_replace_every_model_material_with_toon() {
    let mut scene = SceneState::new(&seeded_config());
    scene.on_model_loaded(Ok(aircraft()));

    let model = scene.model_node().expect("model is in the scene");
    let materials = mesh_materials(model);
    let names: Vec<&str> = materials.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["fuselage", "propeller#0", "propeller#1"]);

    for (name, material) in &materials {
        let Material::Toon(toon) = material else {
            panic!("{} is not toon shaded: {:?}", name, material);
        };
        assert_eq!(toon.colour, [1.0; 4], "{} keeps its base colour", name);
    }

    let maps: Vec<Option<String>> = materials
        .iter()
        .map(|(_, material)| texture_name(&scene, material.map()))
        .collect();
    assert_eq!(
        maps,
        [Some("body".to_string()), None, Some("propeller".to_string())]
    );
}

#[test]
fn should_keep_the_model_images_loaded() {
    let mut scene = SceneState::new(&seeded_config());
    let textures_before = scene.textures.len();
    scene.on_model_loaded(Ok(aircraft()));

    assert_eq!(scene.textures.len(), textures_before + 2);
    let model = scene.model_node().expect("model is in the scene");
    for (_, material) in mesh_materials(model) {
        if let Some(map) = material.map() {
            let slot = scene.textures.get(map).expect("map points into the store");
            assert!(slot.image.is_loaded());
        }
    }
}

#[test]
fn should_leave_the_static_scene_untouched() {
    let mut scene = SceneState::new(&seeded_config());
    scene.on_model_loaded(Ok(aircraft()));

    let ground = scene.graph.get(scene.ground).and_then(|node| node.as_mesh());
    assert_eq!(
        ground.map(|mesh| &mesh.material),
        Some(&Material::Toon(ToonMaterial {
            colour: [1.0; 4],
            map: Some(scene.ground_texture),
        }))
    );
    let sky = scene.graph.get(scene.sky).and_then(|node| node.as_mesh());
    assert!(matches!(sky.map(|mesh| &mesh.material), Some(Material::Basic(_))));
    assert_eq!(scene.graph.len(), 4);
}

#[test]
fn should_keep_model_absent_when_loading_fails() {
    let mut scene = SceneState::new(&seeded_config());
    scene.on_model_loaded(Err(anyhow::anyhow!("spitfire.gltf: not found")));

    assert!(matches!(&scene.model, Load::Failed(reason) if reason.contains("not found")));
    assert!(scene.model_node().is_none());
    assert_eq!(scene.graph.len(), 3);

    // frames keep running without the model
    scene.run_frame(1.0);
    assert!(scene.model_node().is_none());
}

#[test]
fn should_ignore_a_second_model_load() {
    let mut scene = SceneState::new(&seeded_config());
    scene.on_model_loaded(Ok(aircraft()));
    let key = scene.model.as_loaded().map(|model| model.key);

    scene.on_model_loaded(Ok(aircraft()));
    scene.on_model_loaded(Err(anyhow::anyhow!("late failure")));

    assert_eq!(scene.graph.len(), 4);
    assert_eq!(scene.model.as_loaded().map(|model| model.key), key);
}

#[test]
fn should_request_model_and_both_textures() {
    let scene = SceneState::new(&seeded_config());
    let requests = scene.asset_requests();

    assert_eq!(
        requests,
        [
            toon_flight::scene::AssetRequest::Model("spitfire.gltf".to_string()),
            toon_flight::scene::AssetRequest::Texture(scene.ground_texture, "farmland.jpg".to_string()),
            toon_flight::scene::AssetRequest::Texture(scene.sky_texture, "sky.jpg".to_string()),
        ]
    );
}

#[test]
fn should_complete_texture_loads_in_any_order() {
    let mut scene = SceneState::new(&seeded_config());
    let pixel = Arc::new(image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 128, 0, 255])));

    scene.on_texture_loaded(scene.sky_texture, Err(anyhow::anyhow!("sky.jpg: 404")));
    scene.on_texture_loaded(scene.ground_texture, Ok(pixel.clone()));

    let ground = scene.textures.get(scene.ground_texture).expect("ground slot");
    assert_eq!(ground.image.as_loaded(), Some(&pixel));
    let sky = scene.textures.get(scene.sky_texture).expect("sky slot");
    assert!(matches!(&sky.image, Load::Failed(reason) if reason.contains("404")));

    // unknown handles are ignored
    scene.on_texture_loaded(TextureHandle(99), Ok(pixel));
    assert_eq!(scene.textures.len(), 2);
}
