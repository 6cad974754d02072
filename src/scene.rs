//! Scene setup, asset load completion and the per-frame transition.
//!
//! [`SceneState`] owns everything that changes while the scene runs. It never
//! touches the GPU, so the whole animation can be driven and inspected without
//! a window:
//!
//! 1. [`SceneState::new`] builds the static scene (ground, sky, clouds) and
//!    leaves the model and both textures pending.
//! 2. [`SceneState::asset_requests`] lists what has to be fetched. Loads
//!    complete in any order through [`SceneState::on_model_loaded`] and
//!    [`SceneState::on_texture_loaded`].
//! 3. [`SceneState::run_frame`] advances the animation by one tick.

use std::sync::Arc;

use cgmath::Vector3;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    config::{SceneConfig, srgb_hex_to_linear},
    data_structures::{
        instance::Instance,
        material::{BasicMaterial, Material, Side, ToonMaterial},
        model::GeometryStore,
        scene_graph::{
            ContainerNode, MeshNode, NodeKey, SceneGraph, SceneNode, apply_toon_shading,
        },
        texture::{TextureHandle, TextureSlot, TextureStore, TextureTransform, WrapMode},
    },
    resources::{MeshData, ModelData, NodeData, mesh},
};

/// Completion state of an asynchronously loaded resource.
#[derive(Clone, Debug, PartialEq)]
pub enum Load<T> {
    Pending,
    Loaded(T),
    Failed(String),
}

impl<T> Load<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Load::Pending)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Load::Loaded(_))
    }

    pub fn as_loaded(&self) -> Option<&T> {
        match self {
            Load::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<anyhow::Result<T>> for Load<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(value) => Load::Loaded(value),
            Err(e) => Load::Failed(format!("{:#}", e)),
        }
    }
}

/// The loaded model's root node and the resting pose its flight wobble is based on.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatedModel {
    pub key: NodeKey,
    pub position: Vector3<f32>,
    /// Euler angles in radians, XYZ order.
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

/// A file the scene is waiting for.
#[derive(Clone, Debug, PartialEq)]
pub enum AssetRequest {
    Model(String),
    Texture(TextureHandle, String),
}

pub fn wall_clock_seconds() -> f64 {
    instant::SystemTime::now()
        .duration_since(instant::SystemTime::UNIX_EPOCH)
        .map(|since_epoch| since_epoch.as_secs_f64())
        .unwrap_or_default()
}

pub struct SceneState {
    pub config: SceneConfig,
    pub graph: SceneGraph,
    pub geometries: GeometryStore,
    pub textures: TextureStore,
    pub ground: NodeKey,
    pub sky: NodeKey,
    pub clouds: NodeKey,
    pub ground_texture: TextureHandle,
    pub sky_texture: TextureHandle,
    pub model: Load<AnimatedModel>,
}

impl SceneState {
    pub fn new(config: &SceneConfig) -> Self {
        let mut graph = SceneGraph::default();
        let mut geometries = GeometryStore::default();
        let mut textures = TextureStore::default();

        // Ground
        let mut ground_slot = TextureSlot::pending(&config.ground.texture).with_wrap(WrapMode::Repeat);
        ground_slot.transform = TextureTransform {
            repeat: cgmath::Vector2::new(config.ground.texture_repeat, config.ground.texture_repeat),
            ..Default::default()
        };
        let ground_texture = textures.insert(ground_slot);
        let ground_geometry = geometries.insert(mesh::plane(
            "ground",
            config.ground.size[0],
            config.ground.size[1],
        ));
        let mut ground = MeshNode::new(
            "ground",
            ground_geometry,
            Material::Toon(ToonMaterial {
                map: Some(ground_texture),
                ..Default::default()
            }),
        );
        // lay the plane flat, facing up
        ground.set_local_transform(
            0,
            Instance::from_euler(
                Vector3::new(0.0, config.ground.height, 0.0),
                Vector3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0),
                Vector3::new(1.0, 1.0, 1.0),
            ),
        );
        let ground = graph.insert(Box::new(ground));

        // Sky
        let sky_texture = textures.insert(TextureSlot::pending(&config.sky.texture));
        let sky_geometry = geometries.insert(mesh::uv_sphere(
            "sky",
            config.sky.radius,
            config.sky.width_segments,
            config.sky.height_segments,
        ));
        let sky = graph.insert(Box::new(MeshNode::new(
            "sky",
            sky_geometry,
            Material::Basic(BasicMaterial {
                colour: [1.0; 4],
                map: Some(sky_texture),
                side: Side::Back,
            }),
        )));

        // Clouds
        let seed = config
            .clouds
            .seed
            .unwrap_or_else(|| (wall_clock_seconds() * 1000.0) as u64);
        let mut rng = StdRng::seed_from_u64(seed);
        let spread = config.clouds.spread;
        let cloud_instances = (0..config.clouds.count)
            .map(|_| {
                Instance::from(Vector3::new(
                    rng.gen_range(-spread..spread),
                    rng.gen_range(-spread..spread),
                    rng.gen_range(-spread..spread),
                ))
            })
            .collect();
        let cloud_geometry = geometries.insert(mesh::uv_sphere(
            "cloud",
            config.clouds.radius,
            config.clouds.segments,
            config.clouds.segments,
        ));
        let [r, g, b] = srgb_hex_to_linear(config.clouds.colour);
        let clouds = graph.insert(Box::new(MeshNode::with_instances(
            "clouds",
            cloud_geometry,
            Material::Toon(ToonMaterial {
                colour: [r, g, b, 1.0],
                map: None,
            }),
            cloud_instances,
        )));
        log::info!(
            "scene set up with {} clouds (seed {})",
            config.clouds.count,
            seed
        );

        let mut state = Self {
            config: config.clone(),
            graph,
            geometries,
            textures,
            ground,
            sky,
            clouds,
            ground_texture,
            sky_texture,
            model: Load::Pending,
        };
        state.graph.update_world_transforms();
        state
    }

    /// Everything that has to be fetched before the scene is complete.
    pub fn asset_requests(&self) -> Vec<AssetRequest> {
        vec![
            AssetRequest::Model(self.config.model.file.clone()),
            AssetRequest::Texture(self.ground_texture, self.config.ground.texture.clone()),
            AssetRequest::Texture(self.sky_texture, self.config.sky.texture.clone()),
        ]
    }

    /**
     * Completes the model load.
     *
     * On success the model's images join the texture store, the node tree is
     * added below a root node posed by the config and every mesh in it switches
     * to toon shading. On failure the model stays absent. Only the first
     * completion counts; later ones are logged and dropped.
     */
    pub fn on_model_loaded(&mut self, result: anyhow::Result<ModelData>) {
        if !self.model.is_pending() {
            log::warn!(
                "model {} finished loading again, keeping the first result",
                self.config.model.file
            );
            return;
        }
        let data = match result {
            Ok(data) => data,
            Err(e) => {
                log::error!("Could not load model {}: {:#}", self.config.model.file, e);
                self.model = Load::Failed(format!("{:#}", e));
                return;
            }
        };

        let handles: Vec<TextureHandle> = data
            .images
            .into_iter()
            .map(|image| {
                self.textures.insert(TextureSlot {
                    name: image.name,
                    wrap_s: image.wrap_s,
                    wrap_t: image.wrap_t,
                    transform: TextureTransform::default(),
                    image: image.image,
                })
            })
            .collect();

        let pose = &self.config.model;
        let (position, rotation, scale) = (
            Vector3::from(pose.position),
            Vector3::from(pose.rotation),
            Vector3::from(pose.scale),
        );
        let mut root = ContainerNode::new(&pose.file, 1);
        root.set_local_transform(0, Instance::from_euler(position, rotation, scale));
        root.add_child(self.build_node(data.root, &handles));

        let toon_meshes = apply_toon_shading(&mut root);
        log::info!(
            "model {} added with {} toon shaded meshes",
            self.config.model.file,
            toon_meshes
        );

        let key = self.graph.insert(Box::new(root));
        self.model = Load::Loaded(AnimatedModel {
            key,
            position,
            rotation,
            scale,
        });
        self.graph.update_world_transforms();
    }

    /// A node with exactly one primitive becomes a mesh node, anything else a
    /// container with one mesh child per primitive.
    fn build_node(&mut self, node: NodeData, handles: &[TextureHandle]) -> Box<dyn SceneNode> {
        let NodeData {
            name,
            transform,
            mut meshes,
            children,
        } = node;
        let mut primitive_node = |mesh: MeshData, name: &str| {
            let mut material = mesh.material;
            material.remap_textures(|handle| handles.get(handle.0).copied());
            let geometry = self.geometries.insert(mesh.geometry);
            MeshNode::new(name, geometry, material)
        };

        let mut scene_node: Box<dyn SceneNode> = if meshes.len() == 1 {
            match meshes.pop() {
                Some(mesh) => Box::new(primitive_node(mesh, &name)),
                None => Box::new(ContainerNode::new(&name, 1)),
            }
        } else {
            let mut container = ContainerNode::new(&name, 1);
            for (idx, mesh) in meshes.into_iter().enumerate() {
                container.add_child(Box::new(primitive_node(mesh, &format!("{}#{}", name, idx))));
            }
            Box::new(container)
        };
        scene_node.set_local_transform(0, transform);
        for child in children {
            let child = self.build_node(child, handles);
            scene_node.add_child(child);
        }
        scene_node
    }

    /// Completes a texture load. A failed texture keeps rendering blank.
    pub fn on_texture_loaded(
        &mut self,
        handle: TextureHandle,
        result: anyhow::Result<Arc<image::RgbaImage>>,
    ) {
        let Some(slot) = self.textures.get_mut(handle) else {
            log::warn!("texture {:?} finished loading but is unknown", handle);
            return;
        };
        if let Err(e) = &result {
            log::error!("Could not load texture {}: {:#}", slot.name, e);
        }
        slot.image = Load::from(result);
    }

    /**
     * Advances the scene by one tick at wall-clock time `time_secs`:
     *
     * - the model (once loaded) sways along z by `sin(t)` times the sway
     *   amplitude and rolls by `sin(t)` times the roll amplitude,
     * - the ground texture scrolls by one step along u,
     * - every cloud drifts one step along +x and jumps back once past the
     *   wrap bound.
     *
     * The steps are per tick, so the speed follows the frame rate.
     */
    pub fn run_frame(&mut self, time_secs: f64) {
        if let Load::Loaded(model) = &self.model {
            let wave = time_secs.sin();
            let mut position = model.position;
            position.z = (wave * self.config.model.sway_amplitude as f64) as f32;
            let mut rotation = model.rotation;
            rotation.z = (wave * self.config.model.roll_amplitude as f64) as f32;
            let pose = Instance::from_euler(position, rotation, model.scale);
            if let Some(node) = self.graph.get_mut(model.key) {
                node.set_local_transform(0, pose);
            }
        }

        if let Some(slot) = self.textures.get_mut(self.ground_texture) {
            slot.transform.offset.x -= self.config.ground.scroll_step;
        }

        let clouds = &self.config.clouds;
        if let Some(node) = self.graph.get_mut(self.clouds) {
            node.set_local_transform_all(&mut |cloud| {
                cloud.position.x += clouds.step;
                if cloud.position.x > clouds.wrap_max {
                    cloud.position.x = clouds.wrap_to;
                }
            });
        }

        self.graph.update_world_transforms();
    }

    pub fn model_node(&self) -> Option<&dyn SceneNode> {
        let model = self.model.as_loaded()?;
        self.graph.get(model.key).map(|node| node.as_ref())
    }

    pub fn cloud_positions(&self) -> Vec<Vector3<f32>> {
        self.graph
            .get(self.clouds)
            .and_then(|node| node.as_mesh())
            .map(|clouds| clouds.local_transforms().map(|cloud| cloud.position).collect())
            .unwrap_or_default()
    }

    pub fn ground_offset(&self) -> cgmath::Vector2<f64> {
        self.textures
            .get(self.ground_texture)
            .map(|slot| slot.transform.offset)
            .unwrap_or(cgmath::Vector2::new(0.0, 0.0))
    }
}
