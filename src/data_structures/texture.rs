//! Textures: CPU-side slots with addressing and transform, and GPU textures.
//!
//! A [`TextureSlot`] exists from the moment a texture is requested. Its image
//! arrives later (or never, if loading fails); until then the renderer samples
//! a blank white texture. The slot's [`TextureTransform`] can be animated
//! independently of the image.

use std::{borrow::Cow, sync::Arc};

use anyhow::*;
use image::GenericImageView;

use crate::scene::Load;

/// Handle into a [`TextureStore`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub usize);

/// Addressing mode for texture coordinates outside `[0, 1]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

impl From<WrapMode> for wgpu::AddressMode {
    fn from(wrap: WrapMode) -> Self {
        match wrap {
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// UV transform applied in the shader: `uv * repeat + offset`.
///
/// The offset accumulates in `f64` for as long as the scene runs. Only its
/// fractional part reaches the GPU.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TextureTransform {
    pub offset: cgmath::Vector2<f64>,
    pub repeat: cgmath::Vector2<f32>,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            offset: cgmath::Vector2::new(0.0, 0.0),
            repeat: cgmath::Vector2::new(1.0, 1.0),
        }
    }
}

#[derive(Debug)]
pub struct TextureSlot {
    pub name: String,
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub transform: TextureTransform,
    pub image: Load<Arc<image::RgbaImage>>,
}

impl TextureSlot {
    pub fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            wrap_s: WrapMode::default(),
            wrap_t: WrapMode::default(),
            transform: TextureTransform::default(),
            image: Load::Pending,
        }
    }

    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap_s = wrap;
        self.wrap_t = wrap;
        self
    }
}

#[derive(Debug, Default)]
pub struct TextureStore {
    slots: Vec<TextureSlot>,
}

impl TextureStore {
    pub fn insert(&mut self, slot: TextureSlot) -> TextureHandle {
        self.slots.push(slot);
        TextureHandle(self.slots.len() - 1)
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureSlot> {
        self.slots.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: TextureHandle) -> Option<&mut TextureSlot> {
        self.slots.get_mut(handle.0)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// A 1x1 opaque white texture, bound wherever a material has no map or its
    /// image has not arrived yet.
    pub fn create_blank(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
        let blank = image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255]));
        Self::from_rgba(
            device,
            queue,
            &blank,
            Some("blank texture"),
            WrapMode::Repeat,
            WrapMode::Repeat,
        )
    }

    /// Decode raw image file bytes (PNG, JPEG, ...) into RGBA pixels.
    ///
    /// `format` is an optional file extension hint. If None, the format is guessed.
    pub fn decode(bytes: &[u8], format: Option<&str>) -> Result<image::RgbaImage> {
        let img = match format.and_then(image::ImageFormat::from_extension) {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => image::load_from_memory_with_format(bytes, fmt)?,
        };
        let (width, height) = img.dimensions();
        log::debug!("decoded {}x{} image", width, height);
        Ok(img.to_rgba8())
    }

    /// Shrinks `rgba` so neither side exceeds `max_dimension`, keeping the
    /// aspect ratio. Images that already fit are borrowed unchanged.
    pub fn fit_to_limit(rgba: &image::RgbaImage, max_dimension: u32) -> Cow<'_, image::RgbaImage> {
        let (width, height) = rgba.dimensions();
        let largest = width.max(height);
        if max_dimension == 0 || largest <= max_dimension {
            return Cow::Borrowed(rgba);
        }
        let scale = max_dimension as f64 / largest as f64;
        let side = |length: u32| ((length as f64 * scale).round() as u32).clamp(1, max_dimension);
        Cow::Owned(image::imageops::resize(
            rgba,
            side(width),
            side(height),
            image::imageops::FilterType::Triangle,
        ))
    }

    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &image::RgbaImage,
        label: Option<&str>,
        wrap_s: WrapMode,
        wrap_t: WrapMode,
    ) -> Self {
        let limit = device.limits().max_texture_dimension_2d;
        let rgba = Self::fit_to_limit(rgba, limit);
        if let Cow::Owned(_) = rgba {
            log::warn!(
                "texture {} is larger than {} pixels, downscaled to {:?}",
                label.unwrap_or("unnamed"),
                limit,
                rgba.dimensions()
            );
        }
        let dimensions = rgba.dimensions();

        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            &rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wrap_s.into(),
            address_mode_v: wrap_t.into(),
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        }));

        Self {
            texture,
            view,
            sampler,
        }
    }
}
