//! Render pipelines and the scene-wide uniforms they read.
//!
//! Every pipeline uses the same four bind groups: material (0), camera (1),
//! light (2) and fog (3). Four is the most WebGL2 allows.

pub mod basic;
pub mod fog;
pub mod light;
pub mod toon;

use crate::data_structures::material::{Material, Side};

#[derive(Debug)]
pub struct Pipelines {
    pub toon: wgpu::RenderPipeline,
    pub basic: wgpu::RenderPipeline,
    pub basic_back: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        layouts: &basic::SceneLayouts,
    ) -> Self {
        Self {
            toon: toon::mk_toon_pipeline(device, format, layouts),
            basic: basic::mk_basic_pipeline(device, format, layouts, Side::Front),
            basic_back: basic::mk_basic_pipeline(device, format, layouts, Side::Back),
        }
    }

    /// Standard materials have no pipeline of their own and draw unlit.
    pub fn for_material(&self, material: &Material) -> &wgpu::RenderPipeline {
        match (material, material.side()) {
            (Material::Toon(_), _) => &self.toon,
            (_, Side::Back) => &self.basic_back,
            (_, Side::Front) => &self.basic,
        }
    }
}
