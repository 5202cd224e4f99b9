//! # Meshview
//!
//! **A small wgpu viewer that spins one textured mesh.**
//!
//! The mesh turns about its Y axis while the camera stays put. Two shading
//! programs are compiled at startup and share the same vertex buffers:
//! the textured primary program and a debug view that paints surface
//! normals as colour.
//!
//! ## Keys
//!
//! | Key    | Action                            |
//! |--------|-----------------------------------|
//! | `N`    | switch to/from debug normals      |
//! | `F11`  | save `screenshot_<unix secs>.png` |
//! | `Esc`  | quit                              |
//!
//! Every key fires once per press, however long it is held.
//!
//! ## Layout
//!
//! Everything a frame decides lives in [`AppState`] and needs no GPU, so it
//! can be driven from tests. The `meshview` binary owns the window, feeds
//! [`AppState::advance`] and records the result through [`MeshPass`].

mod app;
mod assets;
mod camera;
mod cli;
mod geometry;
mod gpu;
mod input;
mod mesh;
mod mesh_pass;
mod readback;
mod screenshot;
mod shading;
mod texture;
mod transform;

pub use app::{AppState, EXIT_KEY, FrameActions, FrameInput, SCREENSHOT_KEY, TOGGLE_NORMALS_KEY};
pub use assets::{AssetError, ShaderSources, load_image_rgba, load_shader_text};
pub use camera::{Camera, Projection};
pub use cli::{Cli, ViewerConfig, normalize_args};
pub use geometry::{GeometryError, MeshData};
pub use gpu::{GpuContext, GpuError};
pub use input::{Input, KeyState, KeyToggle};
pub use mesh::Mesh;
pub use mesh_pass::{MeshPass, PassRecorder};
pub use readback::read_surface;
pub use screenshot::{
    Framebuffer, RowOrigin, ScreenshotError, capture, screenshot_file_name, write_png,
};
pub use shading::{
    MatrixUniforms, ProgramHandle, ShadingBackend, ShadingProgram, ShadingSelector,
    ShadingVariant, UniformLocation,
};
pub use texture::{Texture, TextureBuffer, TextureError};
pub use transform::{
    FrameMatrices, ModelTransform, ROTATION_RATE, compose_model_matrix,
    compose_projection_matrix, compose_view_matrix, rotation_step,
};

// Re-export math and keyboard types used in the public API.
pub use glam::{Mat4, Vec3};
pub use winit::keyboard::KeyCode;
