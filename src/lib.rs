//! turntable
//!
//! Renders one glTF model on a slowly turning stand: a grey floor, an axes
//! helper, a directional and an ambient light, and a perspective camera with
//! damped orbit controls. Runs natively in a winit window and on the web in a
//! `<canvas>` through WebGL2.
//!
//! High-level modules
//! - `asset`: write-once slot the loaded model goes into
//! - `camera`: camera, projection and the uniform that carries them to the GPU
//! - `clock`: injectable clocks and the frame timer
//! - `config`: every scene constant in one place
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `controls`: orbit controls with damping
//! - `data_structures`: meshes, materials, instances, textures and the scene graph
//! - `flow`: the application event loop
//! - `frame`: the per-frame tick
//! - `pipelines`: the lit mesh and line pipelines
//! - `render`: render composition for efficient pipeline reuse
//! - `resize`: viewport changes and the surface layout they produce
//! - `resources`: glTF loading and built-in geometry
//! - `scene`: the static scene
//!

pub mod asset;
pub mod camera;
pub mod clock;
pub mod config;
pub mod context;
pub mod controls;
pub mod data_structures;
pub mod flow;
pub mod frame;
pub mod pipelines;
pub mod render;
pub mod resize;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use config::SceneConfig;
pub use flow::{run, run_with};
pub use winit::event::WindowEvent;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
