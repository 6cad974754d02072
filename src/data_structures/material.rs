//! Material descriptors.
//!
//! Materials are plain values attached to mesh nodes. The renderer turns them
//! into bind groups and rebuilds those whenever a node's material changes.

use crate::data_structures::texture::TextureHandle;

/// Which faces of a mesh are drawn.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Side {
    #[default]
    Front,
    /// Only inward-facing triangles, used for the sky dome seen from inside.
    Back,
}

/// Physically based material as it comes out of a GLTF file.
#[derive(Clone, Debug, PartialEq)]
pub struct StandardMaterial {
    pub colour: [f32; 4],
    pub map: Option<TextureHandle>,
    pub normal_map: Option<TextureHandle>,
    pub metalness: f32,
    pub roughness: f32,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            colour: [1.0; 4],
            map: None,
            normal_map: None,
            metalness: 1.0,
            roughness: 1.0,
        }
    }
}

/// Two-band cel shading lit by the scene's directional light.
#[derive(Clone, Debug, PartialEq)]
pub struct ToonMaterial {
    pub colour: [f32; 4],
    pub map: Option<TextureHandle>,
}

impl Default for ToonMaterial {
    fn default() -> Self {
        Self {
            colour: [1.0; 4],
            map: None,
        }
    }
}

/// Unlit material.
#[derive(Clone, Debug, PartialEq)]
pub struct BasicMaterial {
    pub colour: [f32; 4],
    pub map: Option<TextureHandle>,
    pub side: Side,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Material {
    Standard(StandardMaterial),
    Toon(ToonMaterial),
    Basic(BasicMaterial),
}

impl Material {
    pub fn map(&self) -> Option<TextureHandle> {
        match self {
            Material::Standard(m) => m.map,
            Material::Toon(m) => m.map,
            Material::Basic(m) => m.map,
        }
    }

    pub fn colour(&self) -> [f32; 4] {
        match self {
            Material::Standard(m) => m.colour,
            Material::Toon(m) => m.colour,
            Material::Basic(m) => m.colour,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Material::Basic(m) => m.side,
            _ => Side::Front,
        }
    }

    /**
     * The toon override keeps only the colour map. Base colour factors, normal
     * maps, metalness and roughness are dropped and the colour resets to white.
     */
    pub fn to_toon(&self) -> Material {
        Material::Toon(ToonMaterial {
            colour: [1.0; 4],
            map: self.map(),
        })
    }

    /// Rewrites every texture handle of the material. Handles mapped to `None` are dropped.
    pub fn remap_textures(&mut self, remap: impl Fn(TextureHandle) -> Option<TextureHandle>) {
        match self {
            Material::Standard(m) => {
                m.map = m.map.and_then(&remap);
                m.normal_map = m.normal_map.and_then(&remap);
            }
            Material::Toon(m) => m.map = m.map.and_then(&remap),
            Material::Basic(m) => m.map = m.map.and_then(&remap),
        }
    }

    pub fn is_toon(&self) -> bool {
        matches!(self, Material::Toon(_))
    }
}
