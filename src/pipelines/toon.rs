use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::{SceneLayouts, mk_render_pipeline},
};

/**
 * Cel shading from the scene's directional light with a two-step ramp:
 * surfaces facing away from the light get 70% of the light's irradiance,
 * everything else the full amount. Fog is applied on top.
 */
pub fn mk_toon_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    layouts: &SceneLayouts,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = layouts.pipeline_layout(device, "Toon Pipeline Layout");
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Toon Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("toon.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        format,
        Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        }),
        Some(Texture::DEPTH_FORMAT),
        Some(wgpu::Face::Back),
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
