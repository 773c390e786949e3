//! `tinyrast`: a software rasterizing 3D renderer for framebuffer targets.
//!
//! Built for constrained environments: a microcontroller pushing pixels to a
//! TFT panel, a headless test rig, or any place where "the GPU" is a `Vec`
//! of pixels. Geometry goes in as single triangles/quads, indexed arrays or
//! packed chain-encoded meshes; shaded pixels come out, with optional
//! per-pixel depth testing.
//!
//! The pipeline per primitive:
//!
//! ```text
//! model space → model-view → back-face cull → project → coarse clip test
//!             → Phong shade (flat or per-vertex) → rasterize → depth test
//! ```
//!
//! Design points worth knowing before use:
//!
//! * **Coarse clipping only.** Primitives that would cross a frustum plane
//!   are dropped whole instead of clipped. Keep geometry inside the frustum.
//! * **Y flip baked in.** The stored projection matrix already accounts for
//!   the raster target's downward Y; getters hand back the matrix as set.
//! * **Strictly single-threaded.** Draw calls run to completion on the
//!   caller's thread; separate renderers with disjoint targets may run on
//!   separate threads.
//! * **Everything borrowed.** Raster target, depth buffer, mesh arrays and
//!   textures stay caller-owned.

pub mod color;
pub mod image;
pub mod light;
pub mod math;
pub mod mesh;
pub mod renderer;
pub mod shader;

pub use color::{Pixel, Rgb, Rgb565, Rgb888, Rgba8888};
pub use image::Image;
pub use mesh::{BoundingBox, Material, Mesh3};
pub use renderer::{DrawError, Renderer, MAX_VIEWPORT};
pub use shader::Shader;

pub use glam;
