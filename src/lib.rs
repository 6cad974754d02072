//! toon-flight
//!
//! A single decorative 3D scene rendered with wgpu on native targets and in the
//! browser (WASM + WebGL2): a toon-shaded aircraft gently bobbing in place,
//! clouds drifting past it, a scrolling farmland ground plane, a sky dome and
//! linear fog.
//!
//! The scene state is an explicit [`scene::SceneState`] value. Asset loading
//! completes asynchronously into it, and every frame the event loop advances it
//! with [`scene::SceneState::run_frame`] before handing it to the renderer.
//!
//! High-level modules
//! - `camera`: perspective camera, projection and orbit controller
//! - `config`: every tunable constant of the scene in one place
//! - `context`: GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, materials, instances, textures and the scene graph
//! - `flow`: the winit event loop driving loads, frames and resizes
//! - `pipelines`: toon and sky pipelines plus light and fog uniforms
//! - `render`: walks the scene graph and draws it
//! - `resources`: asset loaders and procedural geometry
//! - `scene`: scene setup, load completion and the per-frame transition
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

pub use config::SceneConfig;
pub use flow::run;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point. The canvas is appended to the page body by the event loop.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run(SceneConfig::default()).map_err(|e| JsValue::from_str(&e.to_string()))
}
