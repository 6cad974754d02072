use std::sync::Arc;

use cgmath::Vector3;
use toon_flight::{
    SceneConfig,
    config::CloudConfig,
    data_structures::{
        instance::Instance,
        material::{Material, StandardMaterial},
        model::Geometry,
        scene_graph::{SceneNode, traverse},
        texture::{TextureHandle, WrapMode},
    },
    resources::{ImageData, MeshData, ModelData, NodeData, mesh},
    scene::Load,
};

/// The default scene with a fixed cloud layout.
pub fn seeded_config() -> SceneConfig {
    SceneConfig {
        clouds: CloudConfig {
            seed: Some(7),
            ..SceneConfig::default().clouds
        },
        ..SceneConfig::default()
    }
}

pub fn triangle(name: &str) -> Geometry {
    let mut geometry = mesh::plane(name, 1.0, 1.0);
    geometry.indices.truncate(3);
    geometry
}

pub fn standard(map: Option<usize>, normal_map: Option<usize>) -> Material {
    Material::Standard(StandardMaterial {
        colour: [0.5, 0.25, 0.125, 1.0],
        map: map.map(TextureHandle),
        normal_map: normal_map.map(TextureHandle),
        metalness: 0.3,
        roughness: 0.6,
    })
}

pub fn loaded_image(name: &str) -> ImageData {
    ImageData {
        name: name.to_string(),
        wrap_s: WrapMode::Repeat,
        wrap_t: WrapMode::Repeat,
        image: Load::Loaded(Arc::new(image::RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([10, 20, 30, 255]),
        ))),
    }
}

/**
 * A small aircraft: a fuselage with one textured primitive and a propeller
 * child with two primitives, one textured and one plain.
 */
pub fn aircraft() -> ModelData {
    let propeller = NodeData {
        name: "propeller".to_string(),
        transform: Instance::from(Vector3::new(0.0, 0.0, 2.0)),
        meshes: vec![
            MeshData {
                geometry: triangle("hub"),
                material: standard(None, None),
            },
            MeshData {
                geometry: triangle("blades"),
                material: standard(Some(1), None),
            },
        ],
        children: vec![],
    };
    let fuselage = NodeData {
        name: "fuselage".to_string(),
        transform: Instance::default(),
        meshes: vec![MeshData {
            geometry: triangle("fuselage"),
            material: standard(Some(0), Some(1)),
        }],
        children: vec![propeller],
    };
    ModelData {
        root: NodeData {
            name: "Scene".to_string(),
            transform: Instance::default(),
            meshes: vec![],
            children: vec![fuselage],
        },
        images: vec![loaded_image("body"), loaded_image("propeller")],
    }
}

/// Materials of every mesh below `root`, in traversal order.
pub fn mesh_materials(root: &dyn SceneNode) -> Vec<(String, Material)> {
    let mut materials = Vec::new();
    traverse(root, &mut |node| {
        if let Some(mesh) = node.as_mesh() {
            materials.push((node.name().to_string(), mesh.material.clone()));
        }
    });
    materials
}
