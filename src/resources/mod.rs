use std::{path::Path, sync::Arc};

use crate::{
    config::AssetSource,
    data_structures::{
        instance::Instance,
        material::{Material, StandardMaterial},
        model::{Geometry, ModelVertex},
        texture::{Texture, TextureHandle, WrapMode},
    },
    scene::Load,
};

/**
 * This module contains all logic for loading meshes and textures from external
 * files as well as generating procedural geometry.
 *
 * Loaders only produce CPU-side data. They can run on any thread or task and
 * hand their results to the scene on the main thread.
 */
pub mod mesh;
pub mod texture;

pub use texture::{load_binary, load_image};

/// An image referenced by a model. `Failed` images render blank.
#[derive(Debug)]
pub struct ImageData {
    pub name: String,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub image: Load<Arc<image::RgbaImage>>,
}

/// One drawable primitive with the material it was authored with.
///
/// Texture handles inside the material index [`ModelData::images`].
#[derive(Debug)]
pub struct MeshData {
    pub geometry: Geometry,
    pub material: Material,
}

#[derive(Debug)]
pub struct NodeData {
    pub name: String,
    pub transform: Instance,
    pub meshes: Vec<MeshData>,
    pub children: Vec<NodeData>,
}

impl NodeData {
    pub fn mesh_count(&self) -> usize {
        self.meshes.len() + self.children.iter().map(NodeData::mesh_count).sum::<usize>()
    }
}

/// A loaded model: the node tree of its default scene plus all of its images.
#[derive(Debug)]
pub struct ModelData {
    pub root: NodeData,
    pub images: Vec<ImageData>,
}

fn relative_to(model_file: &str, uri: &str) -> String {
    match Path::new(model_file).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(uri).to_string_lossy().into_owned(),
        _ => uri.to_string(),
    }
}

/// Media type of a `data:` uri, e.g. `image/png`.
fn data_uri_mime(uri: &str) -> Option<&str> {
    let header = uri.strip_prefix("data:")?.split_once(',')?.0;
    header.split(';').next().filter(|mime| !mime.is_empty())
}

/// Reads what a GLTF uri refers to. `data:` uris are decoded in place, other
/// uris are percent-decoded and fetched relative to the model file.
pub async fn load_uri(source: &AssetSource, model_file: &str, uri: &str) -> anyhow::Result<Vec<u8>> {
    use base64::Engine;

    if let Some(data) = uri.strip_prefix("data:") {
        let (header, payload) = data
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("malformed data uri in {}", model_file))?;
        if !header.ends_with(";base64") {
            anyhow::bail!("only base64 data uris are supported, {} uses {:?}", model_file, header);
        }
        return Ok(base64::engine::general_purpose::STANDARD.decode(payload)?);
    }
    let path = urlencoding::decode(uri)?;
    load_binary(source, &relative_to(model_file, &path)).await
}

fn wrap_mode(mode: gltf::texture::WrappingMode) -> WrapMode {
    match mode {
        gltf::texture::WrappingMode::ClampToEdge => WrapMode::ClampToEdge,
        gltf::texture::WrappingMode::MirroredRepeat => WrapMode::MirroredRepeat,
        gltf::texture::WrappingMode::Repeat => WrapMode::Repeat,
    }
}

/// Loads a `.gltf` (with buffers and images either embedded as data uris or
/// resolved next to it) or a binary `.glb` file.
pub async fn load_model(source: &AssetSource, file_name: &str) -> anyhow::Result<ModelData> {
    let gltf_bytes = load_binary(source, file_name).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_bytes)?;

    // Load buffers, external ones concurrently
    let blob = gltf.blob.as_deref();
    let buffer_data: Vec<Vec<u8>> =
        futures::future::try_join_all(gltf.buffers().map(|buffer| async move {
            match buffer.source() {
                gltf::buffer::Source::Bin => blob
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| anyhow::anyhow!("{} references a missing binary chunk", file_name)),
                gltf::buffer::Source::Uri(uri) => load_uri(source, file_name, uri).await,
            }
        }))
        .await?;

    // Load images. A broken image leaves its textures blank instead of failing the model.
    let mut images = Vec::new();
    for image in gltf.images() {
        let name = image
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}#image{}", file_name, image.index()));
        let decoded = match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let bytes = buffer_data
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(view.offset()..view.offset() + view.length()));
                match bytes {
                    Some(bytes) => Texture::decode(bytes, mime_type.split('/').last()),
                    None => Err(anyhow::anyhow!("buffer view out of range")),
                }
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                let format = match mime_type.or_else(|| data_uri_mime(uri)) {
                    Some(mime) => mime.split('/').last(),
                    None => Path::new(uri).extension().and_then(|ext| ext.to_str()),
                };
                match load_uri(source, file_name, uri).await {
                    Ok(bytes) => Texture::decode(&bytes, format),
                    Err(e) => Err(e),
                }
            }
        };
        let image = match decoded {
            Ok(rgba) => Load::Loaded(Arc::new(rgba)),
            Err(e) => {
                log::error!("Image {} of {} could not be loaded: {}", name, file_name, e);
                Load::Failed(e.to_string())
            }
        };
        images.push(ImageData {
            name,
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            image,
        });
    }

    // Load materials
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let map = pbr.base_color_texture().map(|info| {
            let texture = info.texture();
            let index = texture.source().index();
            if let Some(image) = images.get_mut(index) {
                let sampler = texture.sampler();
                image.wrap_s = wrap_mode(sampler.wrap_s());
                image.wrap_t = wrap_mode(sampler.wrap_t());
            }
            TextureHandle(index)
        });
        let normal_map = material
            .normal_texture()
            .map(|normal| TextureHandle(normal.texture().source().index()));
        materials.push(Material::Standard(StandardMaterial {
            colour: pbr.base_color_factor(),
            map,
            normal_map,
            metalness: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
        }));
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .ok_or_else(|| anyhow::anyhow!("{} contains no scene", file_name))?;
    let children = scene
        .nodes()
        .map(|node| to_node_data(node, &buffer_data, &materials))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let root = NodeData {
        name: scene.name().unwrap_or(file_name).to_string(),
        transform: Instance::default(),
        meshes: Vec::new(),
        children,
    };
    log::info!(
        "loaded model {} with {} meshes and {} images",
        file_name,
        root.mesh_count(),
        images.len()
    );

    Ok(ModelData { root, images })
}

fn to_node_data(
    node: gltf::scene::Node,
    buffer_data: &[Vec<u8>],
    materials: &[Material],
) -> anyhow::Result<NodeData> {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node{}", node.index()));
    let mut meshes = Vec::new();
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of mesh {:?}: only triangle lists are supported.",
                    primitive.index(),
                    mesh.name()
                );
                continue;
            }
            let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));

            let mut vertices: Vec<ModelVertex> = match reader.read_positions() {
                Some(positions) => positions
                    .map(|position| ModelVertex {
                        position,
                        ..Default::default()
                    })
                    .collect(),
                None => {
                    log::warn!("Primitive {} of mesh {:?} has no positions.", primitive.index(), mesh.name());
                    continue;
                }
            };
            let has_normals = match reader.read_normals() {
                Some(normals) => {
                    vertices
                        .iter_mut()
                        .zip(normals)
                        .for_each(|(vertex, normal)| vertex.normal = normal);
                    true
                }
                None => false,
            };
            if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                vertices
                    .iter_mut()
                    .zip(tex_coords)
                    .for_each(|(vertex, tex_coord)| vertex.tex_coords = tex_coord);
            }
            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..vertices.len() as u32).collect(),
            };

            let mut geometry = Geometry {
                name: mesh.name().unwrap_or("unknown_mesh").to_string(),
                vertices,
                indices,
            };
            if !has_normals {
                mesh::compute_vertex_normals(&mut geometry);
            }
            let material = primitive
                .material()
                .index()
                .and_then(|idx| materials.get(idx))
                .cloned()
                .unwrap_or_else(|| Material::Standard(StandardMaterial::default()));
            meshes.push(MeshData { geometry, material });
        }
    }

    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Instance {
        position: translation.into(),
        // GLTF stores quaternions as [x, y, z, w]
        rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };
    let children = node
        .children()
        .map(|child| to_node_data(child, buffer_data, materials))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(NodeData {
        name,
        transform,
        meshes,
        children,
    })
}
