//! Scene configuration.
//!
//! All constants that shape the scene live in [`SceneConfig`]. The defaults
//! reproduce the flying-spitfire scene; tests and embedders can override single
//! fields with struct update syntax.

use std::path::PathBuf;

/// Converts a `0xRRGGBB` sRGB colour into linear RGB components.
///
/// Colours in the config are authored in sRGB like on the web. Shaders and the
/// clear colour work in linear space and the sRGB surface encodes on write.
pub fn srgb_hex_to_linear(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let c = ((hex >> shift) & 0xFF) as f32 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    [channel(16), channel(8), channel(0)]
}

/// Where asset files are fetched from.
///
/// On native targets this is a directory on disk. On the web the root is a
/// path below the page origin.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetSource {
    pub root: PathBuf,
}

impl AssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for AssetSource {
    fn default() -> Self {
        Self::new("assets")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fovy_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub colour: u32,
    pub intensity: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FogConfig {
    pub colour: u32,
    pub near: f32,
    pub far: f32,
}

/// Resting pose of the loaded model and the amplitude of its flight wobble.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    pub file: String,
    pub position: [f32; 3],
    /// Euler angles in radians, XYZ order.
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub sway_amplitude: f32,
    pub roll_amplitude: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroundConfig {
    pub texture: String,
    pub size: [f32; 2],
    pub height: f32,
    pub texture_repeat: f32,
    pub scroll_step: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkyConfig {
    pub texture: String,
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CloudConfig {
    pub count: usize,
    pub radius: f32,
    pub segments: u32,
    pub colour: u32,
    /// Start positions are drawn uniformly from `[-spread, spread)` on every axis.
    pub spread: f32,
    pub step: f32,
    pub wrap_max: f32,
    pub wrap_to: f32,
    /// Fixed seed for reproducible cloud layouts. The wall clock seeds otherwise.
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneConfig {
    pub assets: AssetSource,
    pub clear_colour: u32,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub fog: FogConfig,
    pub model: ModelConfig,
    pub ground: GroundConfig,
    pub sky: SkyConfig,
    pub clouds: CloudConfig,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            assets: AssetSource::default(),
            clear_colour: 0x87BEFC,
            camera: CameraConfig {
                position: [0.0, 0.0, 5.0],
                target: [0.0, 0.0, 0.0],
                fovy_degrees: 75.0,
                znear: 0.1,
                zfar: 1000.0,
            },
            light: LightConfig {
                position: [0.0, 1.0, 0.0],
                colour: 0xFFFFFF,
                intensity: 4.0,
            },
            fog: FogConfig {
                colour: 0xBCD6F3,
                near: 100.0,
                far: 140.0,
            },
            model: ModelConfig {
                file: "spitfire.gltf".to_string(),
                position: [0.0, -1.0, 0.0],
                rotation: [0.0, std::f32::consts::FRAC_PI_2, 0.0],
                scale: [1.0, 1.0, 1.0],
                sway_amplitude: 0.5,
                roll_amplitude: 0.2,
            },
            ground: GroundConfig {
                texture: "farmland.jpg".to_string(),
                size: [300.0, 300.0],
                height: -50.0,
                texture_repeat: 3.0,
                scroll_step: 0.0001,
            },
            sky: SkyConfig {
                texture: "sky.jpg".to_string(),
                radius: 500.0,
                width_segments: 60,
                height_segments: 40,
            },
            clouds: CloudConfig {
                count: 10,
                radius: 1.0,
                segments: 32,
                colour: 0xFFFFFF,
                spread: 5.0,
                step: 0.01,
                wrap_max: 5.0,
                wrap_to: -5.0,
                seed: None,
            },
        }
    }
}
