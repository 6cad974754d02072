//! Linear distance fog.
//!
//! Fragments blend towards the fog colour with `smoothstep(near, far, depth)`
//! where depth is the view-space distance along the camera axis. Everything in
//! the scene is fogged, including the sky dome.

use wgpu::util::DeviceExt;

use crate::config::{FogConfig, srgb_hex_to_linear};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FogUniform {
    pub colour: [f32; 3],
    pub near: f32,
    pub far: f32,
    // WGSL rounds the struct size up to 32 bytes
    _padding: [f32; 3],
}

impl FogUniform {
    pub fn new(config: &FogConfig) -> Self {
        Self {
            colour: srgb_hex_to_linear(config.colour),
            near: config.near,
            far: config.far,
            _padding: [0.0; 3],
        }
    }
}

#[derive(Debug)]
pub struct FogResources {
    pub uniform: FogUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl FogResources {
    pub fn new(device: &wgpu::Device, config: &FogConfig) -> Self {
        let uniform = FogUniform::new(config);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fog Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("fog_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("fog_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}
