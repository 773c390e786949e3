//! Edge-function triangle rasterizer.
//!
//! Vertices arrive in NDC with the Y flip already baked into the projection
//! matrix, so screen Y simply grows with NDC Y here. The `w` slot of a
//! projected vertex carries `1/w` (perspective) or `2 − z` (orthographic);
//! both are linear in screen space, so the depth value is a plain barycentric
//! blend and larger values mean nearer. Color and texture coordinates use
//! perspective-correct weights except in orthographic mode, where affine
//! interpolation is exact.
//!
//! Fill rule: top-left. A pixel center exactly on a shared edge belongs to
//! at most one of the two triangles, so strips and fans never double-write
//! or leave seams.

use glam::{Vec2, Vec4};

use crate::color::{Pixel, Rgb};
use crate::image::Image;
use crate::shader::Shader;

/// One projected vertex, ready for rasterization.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RasterVertex {
    /// NDC position; `w` is the interpolation/depth slot described above.
    pub pos: Vec4,
    /// Per-vertex Phong color (Gouraud), light-only when texturing.
    pub color: Rgb,
    pub uv: Vec2,
}

/// Per-primitive constants.
pub(crate) struct Uniforms<'u, P> {
    /// Face color for flat shading, light-only when texturing.
    pub face_color: Rgb,
    pub texture: Option<&'u Image<P>>,
}

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Top-left rule for a directed edge `a -> b` of a positively wound triangle.
#[inline]
fn top_left(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    (d.y == 0.0 && d.x > 0.0) || d.y < 0.0
}

#[inline]
fn accepts(w: f32, a: Vec2, b: Vec2) -> bool {
    if w != 0.0 {
        w > 0.0
    } else {
        top_left(a, b)
    }
}

/// Rasterize one triangle into `target`.
///
/// `ox`/`oy` position the target inside the viewport (tile rendering); the
/// depth buffer, when present, is indexed in target-local coordinates.
#[allow(clippy::too_many_arguments)]
pub(crate) fn triangle<P, const LX: usize, const LY: usize, const ZBUFFER: bool, const ORTHO: bool>(
    target: &mut Image<P>,
    depth: &mut [f32],
    shader: Shader,
    v0: &RasterVertex,
    v1: &RasterVertex,
    v2: &RasterVertex,
    ox: i32,
    oy: i32,
    uni: &Uniforms<P>,
) where
    P: Pixel,
{
    let to_screen = |p: Vec4| {
        Vec2::new(
            (p.x + 1.0) * 0.5 * LX as f32,
            (p.y + 1.0) * 0.5 * LY as f32,
        )
    };

    let a = to_screen(v0.pos);
    let mut b = to_screen(v1.pos);
    let mut c = to_screen(v2.pos);
    let (mut v1, mut v2) = (v1, v2);

    // Canonical positive winding; zero area draws nothing.
    let area = edge(a, b, c);
    if area == 0.0 {
        return;
    }
    if area < 0.0 {
        std::mem::swap(&mut b, &mut c);
        std::mem::swap(&mut v1, &mut v2);
    }
    let area = area.abs();
    let inv_area = 1.0 / area;

    // Bounding box clipped to the part of the viewport the target covers.
    let min_x = a.x.min(b.x).min(c.x).floor() as i32;
    let max_x = a.x.max(b.x).max(c.x).ceil() as i32;
    let min_y = a.y.min(b.y).min(c.y).floor() as i32;
    let max_y = a.y.max(b.y).max(c.y).ceil() as i32;

    let x_start = min_x.max(ox);
    let x_end = max_x.min(ox + target.width() as i32);
    let y_start = min_y.max(oy);
    let y_end = max_y.min(oy + target.height() as i32);
    if x_start >= x_end || y_start >= y_end {
        return;
    }

    let gouraud = shader.contains(Shader::GOURAUD);
    let textured = shader.contains(Shader::TEXTURE);

    // Edge values at the first pixel center, stepped incrementally.
    let start = Vec2::new(x_start as f32 + 0.5, y_start as f32 + 0.5);
    let mut row0 = edge(b, c, start);
    let mut row1 = edge(c, a, start);
    let mut row2 = edge(a, b, start);
    let (dx0, dy0) = (-(c.y - b.y), c.x - b.x);
    let (dx1, dy1) = (-(a.y - c.y), a.x - c.x);
    let (dx2, dy2) = (-(b.y - a.y), b.x - a.x);

    let tw = target.width() as i32;

    for y in y_start..y_end {
        let mut w0 = row0;
        let mut w1 = row1;
        let mut w2 = row2;
        for x in x_start..x_end {
            if accepts(w0, b, c) && accepts(w1, c, a) && accepts(w2, a, b) {
                let l0 = w0 * inv_area;
                let l1 = w1 * inv_area;
                let l2 = w2 * inv_area;

                // Depth slot is linear in screen space in both modes.
                let z = l0 * v0.pos.w + l1 * v1.pos.w + l2 * v2.pos.w;

                let ix = x - ox;
                let iy = y - oy;
                let visible = if ZBUFFER {
                    let idx = (iy * tw + ix) as usize;
                    if z > depth[idx] {
                        depth[idx] = z;
                        true
                    } else {
                        false
                    }
                } else {
                    true
                };

                if visible {
                    // Attribute weights: perspective-correct unless ORTHO.
                    let (k0, k1, k2) = if ORTHO {
                        (l0, l1, l2)
                    } else {
                        let p0 = l0 * v0.pos.w;
                        let p1 = l1 * v1.pos.w;
                        let p2 = l2 * v2.pos.w;
                        let inv = 1.0 / (p0 + p1 + p2);
                        (p0 * inv, p1 * inv, p2 * inv)
                    };

                    let light = if gouraud {
                        v0.color * k0 + v1.color * k1 + v2.color * k2
                    } else {
                        uni.face_color
                    };

                    let color = match (textured, uni.texture) {
                        (true, Some(tex)) => {
                            let u = k0 * v0.uv.x + k1 * v1.uv.x + k2 * v2.uv.x;
                            let v = k0 * v0.uv.y + k1 * v1.uv.y + k2 * v2.uv.y;
                            tex.sample(u, v) * light
                        }
                        _ => light,
                    };

                    target.set(ix as usize, iy as usize, P::from_rgb(color));
                }
            }
            w0 += dx0;
            w1 += dx1;
            w2 += dx2;
        }
        row0 += dy0;
        row1 += dy1;
        row2 += dy2;
    }
}
