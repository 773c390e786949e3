//! Small additions on top of `glam`.
//!
//! `glam` already covers the vector/matrix algebra the pipeline needs
//! (`Mat4::orthographic_rh_gl`, `Mat4::perspective_rh_gl`,
//! `Mat4::look_at_rh`, `transform_point3` / `transform_vector3`). This module
//! holds the two pieces it lacks: an asymmetric-frustum constructor and the
//! Y-row flip the renderer bakes into its stored projection matrix.

use glam::{Mat4, Vec4};

/// Perspective projection for an asymmetric frustum, glFrustum-style.
///
/// Maps the view-space frustum with the given near-plane window onto clip
/// space, storing `-z` in `w`. The camera looks down −Z, Y up.
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let a = (right + left) / (right - left);
    let b = (top + bottom) / (top - bottom);
    let c = -(far + near) / (far - near);
    let d = -2.0 * far * near / (far - near);
    Mat4::from_cols(
        Vec4::new(2.0 * near / (right - left), 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near / (top - bottom), 0.0, 0.0),
        Vec4::new(a, b, c, -1.0),
        Vec4::new(0.0, 0.0, d, 0.0),
    )
}

/// Negate the Y row of a matrix.
///
/// The raster target's Y axis grows downward while NDC Y grows upward; the
/// renderer applies this flip once when a projection matrix is set instead of
/// per vertex. The function is its own inverse.
#[inline]
pub fn invert_y_axis(m: Mat4) -> Mat4 {
    let mut m = m;
    m.x_axis.y = -m.x_axis.y;
    m.y_axis.y = -m.y_axis.y;
    m.z_axis.y = -m.z_axis.y;
    m.w_axis.y = -m.w_axis.y;
    m
}
