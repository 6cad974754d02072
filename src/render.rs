//! Render composition and pipeline batching.
//!
//! Scene nodes describe what to draw with [`Instanced`] entries. [`Render`]
//! sorts them into per-pipeline batches, and [`SceneRenderer`] keeps the GPU
//! side (meshes, textures, instance buffers, material bind groups) in step with
//! the CPU scene before drawing it.
//!
//! # Key types
//!
//! - [`Render<'a>`] describes which pipeline an object is drawn with
//! - [`Instanced<'a>`] is one geometry with one material and its world transforms
//! - [`SceneRenderer`] owns the GPU caches and records the frame
//!

use std::collections::HashMap;

use crate::{
    context::Context,
    data_structures::{
        instance::{Instance, InstanceRaw},
        material::Material,
        model::{DrawModel, GeometryHandle, Mesh},
        scene_graph::SceneGraph,
        texture::{Texture, TextureHandle, TextureStore},
    },
    scene::{Load, SceneState},
};

/// Data for instanced object rendering: geometry, material and world transforms.
///
/// `id` identifies the scene node the entry came from, so GPU buffers can be
/// reused from frame to frame.
pub struct Instanced<'a> {
    pub id: u32,
    pub geometry: GeometryHandle,
    pub material: &'a Material,
    pub instances: Vec<Instance>,
}

/// Specifies how scene objects should be rendered.
///
/// - `None` renders nothing
/// - `Toon(Instanced)` renders with the cel-shading pipeline
/// - `Basic(Instanced)` renders unlit, front or back faces depending on the material
/// - `Composed(Vec<Render>)` recursively renders a composition of multiple renders
pub enum Render<'a> {
    None,
    Toon(Instanced<'a>),
    Basic(Instanced<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(self, toons: &mut Vec<Instanced<'a>>, basics: &mut Vec<Instanced<'a>>) {
        match self {
            Render::Toon(instanced) => toons.push(instanced),
            Render::Basic(instanced) => basics.push(instanced),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(toons, basics)),
            Render::None => (),
        }
    }
}

impl<'a> From<Instanced<'a>> for Render<'a> {
    fn from(instanced: Instanced<'a>) -> Self {
        if instanced.material.is_toon() {
            Render::Toon(instanced)
        } else {
            Render::Basic(instanced)
        }
    }
}

impl<'a> From<&'a SceneGraph> for Render<'a> {
    fn from(graph: &'a SceneGraph) -> Self {
        Render::Composed(graph.get_render().into_iter().map(Render::from).collect())
    }
}

/**
 * The raw material is stored in a uniform buffer next to the colour map.
 *
 * The UV transform belongs to the texture, so nodes sharing a texture also
 * share its scrolling.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub colour: [f32; 4],
    pub uv_offset: [f32; 2],
    pub uv_repeat: [f32; 2],
}

impl MaterialUniform {
    pub fn new(material: &Material, textures: &TextureStore) -> Self {
        let transform = material
            .map()
            .and_then(|handle| textures.get(handle))
            .map(|slot| slot.transform)
            .unwrap_or_default();
        Self {
            colour: material.colour(),
            uv_offset: wrapped_offset(transform.offset),
            uv_repeat: transform.repeat.into(),
        }
    }
}

/// Fractional part of a UV offset, in `[0, 1)` per axis.
///
/// Repeat addressing makes whole-number shifts invisible, so this keeps the
/// uploaded value small however long the offset has been accumulating.
pub fn wrapped_offset(offset: cgmath::Vector2<f64>) -> [f32; 2] {
    [
        offset.x.rem_euclid(1.0) as f32,
        offset.y.rem_euclid(1.0) as f32,
    ]
}

/// Texture lookup for material bind groups. Missing maps fall back to the blank texture.
struct MaterialMaps<'r> {
    blank: &'r Texture,
    sampler: &'r wgpu::Sampler,
    textures: &'r HashMap<TextureHandle, Texture>,
}

impl MaterialMaps<'_> {
    fn bind_group(&self, ctx: &Context, material: &Material, material_buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        let texture = material
            .map()
            .and_then(|handle| self.textures.get(&handle))
            .unwrap_or(self.blank);
        let sampler = texture.sampler.as_ref().unwrap_or(self.sampler);
        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &ctx.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: material_buffer.as_entire_binding(),
                },
            ],
            label: Some("material_bind_group"),
        })
    }
}

struct NodeResources {
    instance_buffer: wgpu::Buffer,
    capacity: usize,
    amount: u32,
    material: Material,
    map_ready: bool,
    material_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// GPU mirror of a [`SceneState`].
///
/// Everything is created lazily the first frame it is needed: meshes per
/// geometry, textures once their image arrived and buffers per scene node.
pub struct SceneRenderer {
    blank: Texture,
    default_sampler: wgpu::Sampler,
    meshes: HashMap<GeometryHandle, Mesh>,
    textures: HashMap<TextureHandle, Texture>,
    nodes: HashMap<u32, NodeResources>,
}

impl SceneRenderer {
    pub fn new(ctx: &Context) -> Self {
        Self {
            blank: Texture::create_blank(&ctx.device, &ctx.queue),
            default_sampler: ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            }),
            meshes: HashMap::new(),
            textures: HashMap::new(),
            nodes: HashMap::new(),
        }
    }

    fn upload_textures(&mut self, ctx: &Context, textures: &TextureStore) {
        for idx in 0..textures.len() {
            let handle = TextureHandle(idx);
            if self.textures.contains_key(&handle) {
                continue;
            }
            if let Some(slot) = textures.get(handle) {
                if let Load::Loaded(image) = &slot.image {
                    let texture = Texture::from_rgba(
                        &ctx.device,
                        &ctx.queue,
                        image,
                        Some(&slot.name),
                        slot.wrap_s,
                        slot.wrap_t,
                    );
                    log::debug!("uploaded texture {}", slot.name);
                    self.textures.insert(handle, texture);
                }
            }
        }
    }

    fn prepare_node(&mut self, ctx: &Context, textures: &TextureStore, instanced: &Instanced) {
        let raws: Vec<InstanceRaw> = instanced.instances.iter().map(Instance::to_raw).collect();
        let uniform = MaterialUniform::new(instanced.material, textures);
        let map_ready = instanced
            .material
            .map()
            .is_some_and(|handle| self.textures.contains_key(&handle));
        let maps = MaterialMaps {
            blank: &self.blank,
            sampler: &self.default_sampler,
            textures: &self.textures,
        };

        match self.nodes.get_mut(&instanced.id) {
            Some(node) if node.capacity >= raws.len() => {
                ctx.queue
                    .write_buffer(&node.instance_buffer, 0, bytemuck::cast_slice(&raws));
                node.amount = raws.len() as u32;
                ctx.queue
                    .write_buffer(&node.material_buffer, 0, bytemuck::cast_slice(&[uniform]));
                // rebuilt when the material was swapped or its colour map finished loading
                if node.material != *instanced.material || node.map_ready != map_ready {
                    node.bind_group = maps.bind_group(ctx, instanced.material, &node.material_buffer);
                    node.material = instanced.material.clone();
                    node.map_ready = map_ready;
                }
            }
            _ => {
                use wgpu::util::DeviceExt;

                let instance_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Instance Buffer"),
                    contents: bytemuck::cast_slice(&raws),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });
                let material_buffer = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Material Buffer"),
                    contents: bytemuck::cast_slice(&[uniform]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = maps.bind_group(ctx, instanced.material, &material_buffer);
                self.nodes.insert(
                    instanced.id,
                    NodeResources {
                        instance_buffer,
                        capacity: raws.len(),
                        amount: raws.len() as u32,
                        material: instanced.material.clone(),
                        map_ready,
                        material_buffer,
                        bind_group,
                    },
                );
            }
        }
    }

    /// Brings the GPU caches up to date with `scene`.
    pub fn prepare(&mut self, ctx: &Context, scene: &SceneState) {
        self.upload_textures(ctx, &scene.textures);
        for instanced in scene.graph.get_render() {
            if instanced.instances.is_empty() {
                continue;
            }
            if !self.meshes.contains_key(&instanced.geometry) {
                match scene.geometries.get(instanced.geometry) {
                    Some(geometry) => {
                        self.meshes
                            .insert(instanced.geometry, geometry.to_mesh(&ctx.device));
                    }
                    None => {
                        log::warn!("node {} refers to a missing geometry", instanced.id);
                        continue;
                    }
                }
            }
            self.prepare_node(ctx, &scene.textures, &instanced);
        }
    }

    /// Records the draw calls for `scene` into an already configured render pass.
    pub fn draw<'pass>(
        &'pass self,
        ctx: &'pass Context,
        scene: &SceneState,
        render_pass: &mut wgpu::RenderPass<'pass>,
    ) {
        let mut toons: Vec<Instanced> = Vec::new();
        let mut basics: Vec<Instanced> = Vec::new();
        Render::from(&scene.graph).set_pipelines(&mut toons, &mut basics);

        let batches = toons
            .iter()
            .map(|instanced| (&ctx.pipelines.toon, instanced))
            .chain(
                basics
                    .iter()
                    .map(|instanced| (ctx.pipelines.for_material(instanced.material), instanced)),
            );
        for (pipeline, instanced) in batches {
            let (Some(node), Some(mesh)) = (
                self.nodes.get(&instanced.id),
                self.meshes.get(&instanced.geometry),
            ) else {
                continue;
            };
            if node.amount == 0 {
                log::warn!("you attempted to render something with zero instances");
                continue;
            }
            render_pass.set_pipeline(pipeline);
            render_pass.set_vertex_buffer(1, node.instance_buffer.slice(..));
            render_pass.draw_mesh_instanced(
                mesh,
                &node.bind_group,
                0..node.amount,
                &ctx.camera.bind_group,
                &ctx.light.bind_group,
                &ctx.fog.bind_group,
            );
        }
    }

    /// Renders one frame of `scene` into `view`.
    pub fn render(&mut self, ctx: &Context, scene: &SceneState, view: &wgpu::TextureView, depth: &wgpu::TextureView) {
        self.prepare(ctx, scene);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            self.draw(ctx, scene, &mut render_pass);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Renders `scene` off-screen and reads the pixels back.
    #[cfg(feature = "integration-tests")]
    pub async fn render_to_image(&mut self, ctx: &Context, scene: &SceneState) -> anyhow::Result<image::RgbaImage> {
        let (width, height) = (ctx.config.width, ctx.config.height);
        let extent = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let target = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Golden Image Test Output Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ctx.config.format,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        self.render(ctx, scene, &view, &ctx.depth_texture.view);

        // Rows of a texture-to-buffer copy are aligned to 256 bytes
        let unpadded_row = 4 * width;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row = unpadded_row.div_ceil(align) * align;
        let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            size: (padded_row * height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            label: None,
            mapped_at_creation: false,
        });
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(height),
                },
            },
            extent,
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
        let buffer_slice = output_buffer.slice(..);
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            tx.send(result).ok();
        });
        ctx.device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(std::time::Duration::from_secs(3)),
        })?;
        rx.receive()
            .await
            .ok_or_else(|| anyhow::anyhow!("readback channel closed"))??;

        let data = buffer_slice.get_mapped_range();
        let pixels: Vec<u8> = data
            .chunks(padded_row as usize)
            .flat_map(|row| row[..unpadded_row as usize].iter().copied())
            .collect();
        drop(data);
        output_buffer.unmap();
        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow::anyhow!("readback has the wrong size"))
    }
}
