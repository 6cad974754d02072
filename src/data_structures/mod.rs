//! Engine data structures: geometry, materials, textures, scene graphs, and instances.
//!
//! - `model` contains vertex layouts, CPU geometry and GPU meshes
//! - `material` contains the standard, toon and basic material descriptors
//! - `texture` contains texture slots, addressing modes and GPU texture creation
//! - `instance` holds per-instance transformation data
//! - `scene_graph` enables hierarchical scene organization

pub mod instance;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
