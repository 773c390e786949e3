//! Per-primitive pipeline: transform → cull → project → clip-test → shade.
//!
//! A [`Pass`] is a short-lived view of the renderer built once per draw call.
//! It owns a *copy* of the derived-state cache so a mesh material override
//! can edit premultiplied terms freely; the renderer's own cache is never
//! touched by drawing, only by setters.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::color::{Pixel, Rgb};
use crate::image::Image;
use crate::light::{phong, PowTable};
use crate::shader::Shader;

use super::raster::{self, RasterVertex, Uniforms};
use super::Derived;

/// Everything one draw call needs, with borrows already split off the
/// renderer.
pub(crate) struct Pass<'s, P, const LX: usize, const LY: usize, const ZBUFFER: bool, const ORTHO: bool>
{
    pub target: &'s mut Image<P>,
    /// Empty when `ZBUFFER` is off; validated to `>= LX·LY` otherwise.
    pub depth: &'s mut [f32],
    pub texture: Option<&'s Image<P>>,
    /// Projection with the Y flip baked in.
    pub proj: Mat4,
    pub cache: Derived,
    pub pow: &'s mut PowTable,
    pub culling: f32,
    pub ox: i32,
    pub oy: i32,
    pub shader: Shader,
    pub face_color: Rgb,
}

impl<P, const LX: usize, const LY: usize, const ZBUFFER: bool, const ORTHO: bool>
    Pass<'_, P, LX, LY, ZBUFFER, ORTHO>
where
    P: Pixel,
{
    /// Loose NDC bound for the coarse clip test: primitives may overhang the
    /// unit square by the rasterizer's safe coordinate range, so only
    /// grossly out-of-frame geometry is dropped.
    #[inline]
    pub(crate) fn clip_bound() -> f32 {
        2048.0 / LX.max(LY) as f32
    }

    /// Project a view-space point into NDC and load the interpolation slot.
    #[inline]
    pub(crate) fn project(&self, q: Vec3) -> Vec4 {
        let mut s = self.proj * q.extend(1.0);
        if ORTHO {
            s.w = 2.0 - s.z;
        } else {
            let iw = 1.0 / s.w;
            s.x *= iw;
            s.y *= iw;
            s.z *= iw;
            s.w = iw;
        }
        s
    }

    /// Coarse clip test for one vertex: anything behind (or on) the camera
    /// plane or outside the loose bound rejects the whole primitive.
    #[inline]
    pub(crate) fn rejects(&self, view_z: f32, s: Vec4) -> bool {
        let bound = Self::clip_bound();
        view_z >= 0.0
            || s.x < -bound
            || s.x > bound
            || s.y < -bound
            || s.y > bound
            || s.z < -1.0
            || s.z > 1.0
    }

    /// Signed culling factor for a face normal: positive means the face is
    /// wound away from the camera under the current convention.
    #[inline]
    fn camera_dot(face_n: Vec3, q0: Vec3) -> f32 {
        if ORTHO {
            face_n.dot(Vec3::NEG_Z)
        } else {
            face_n.dot(q0)
        }
    }

    /// Diffuse/specular sign: when culling is disabled both facings render
    /// and supplied normals belong to the counter-clockwise side, so lighting
    /// flips for the other one.
    #[inline]
    fn normal_sign(&self, cu: f32) -> f32 {
        if self.culling != 0.0 {
            1.0
        } else if cu > 0.0 {
            -1.0
        } else {
            1.0
        }
    }

    #[inline]
    pub(crate) fn shade_vertex(&self, normal: Vec3, sign: f32) -> Rgb {
        let n = self.cache.model_view.transform_vector3(normal);
        phong(
            &self.cache.terms,
            self.pow,
            sign * n.dot(self.cache.light_inorm),
            sign * n.dot(self.cache.half_inorm),
            self.shader.contains(Shader::TEXTURE),
        )
    }

    /// Flat-shade the face: one Phong evaluation on the (normalized) face
    /// normal, flipped toward the camera when it points away.
    #[inline]
    pub(crate) fn shade_face(&mut self, face_n: Vec3, cu: f32) {
        let sign = if cu > 0.0 { -1.0 } else { 1.0 };
        let n = face_n.normalize_or_zero();
        self.face_color = phong(
            &self.cache.terms,
            self.pow,
            sign * n.dot(self.cache.light),
            sign * n.dot(self.cache.half),
            self.shader.contains(Shader::TEXTURE),
        );
    }

    #[inline]
    pub(crate) fn rasterize(&mut self, v0: &RasterVertex, v1: &RasterVertex, v2: &RasterVertex) {
        let uni = Uniforms {
            face_color: self.face_color,
            texture: self.texture,
        };
        raster::triangle::<P, LX, LY, ZBUFFER, ORTHO>(
            self.target,
            self.depth,
            self.shader,
            v0,
            v1,
            v2,
            self.ox,
            self.oy,
            &uni,
        );
    }

    /// Draw one triangle given model-space attributes.
    pub(crate) fn triangle(
        &mut self,
        p: [Vec3; 3],
        normals: Option<[Vec3; 3]>,
        uvs: Option<[Vec2; 3]>,
    ) {
        let mv = self.cache.model_view;
        let q = [
            mv.transform_point3(p[0]),
            mv.transform_point3(p[1]),
            mv.transform_point3(p[2]),
        ];

        let face_n = (q[1] - q[0]).cross(q[2] - q[0]);
        let cu = Self::camera_dot(face_n, q[0]);
        if cu * self.culling > 0.0 {
            return;
        }

        let s = [self.project(q[0]), self.project(q[1]), self.project(q[2])];
        if self.rejects(q[0].z, s[0]) || self.rejects(q[1].z, s[1]) || self.rejects(q[2].z, s[2]) {
            // Straddling primitives are dropped whole rather than clipped.
            return;
        }

        let mut v = [RasterVertex::default(); 3];
        for i in 0..3 {
            v[i].pos = s[i];
        }

        match (self.shader.contains(Shader::GOURAUD), normals) {
            (true, Some(n)) => {
                let sign = self.normal_sign(cu);
                for i in 0..3 {
                    v[i].color = self.shade_vertex(n[i], sign);
                }
            }
            _ => self.shade_face(face_n, cu),
        }

        if self.shader.contains(Shader::TEXTURE) {
            if let Some(t) = uvs {
                for i in 0..3 {
                    v[i].uv = t[i];
                }
            }
        }

        self.rasterize(&v[0], &v[1], &v[2]);
    }

    /// Draw one coplanar quad as the triangles (0,1,2) and (0,2,3).
    ///
    /// Culling is decided once on (0,1,2); coplanarity makes the decision
    /// identical for the second triangle. A clip rejection on any of the
    /// four corners drops the whole quad.
    pub(crate) fn quad(
        &mut self,
        p: [Vec3; 4],
        normals: Option<[Vec3; 4]>,
        uvs: Option<[Vec2; 4]>,
    ) {
        let mv = self.cache.model_view;
        let q0 = mv.transform_point3(p[0]);
        let q1 = mv.transform_point3(p[1]);
        let q2 = mv.transform_point3(p[2]);

        let face_n = (q1 - q0).cross(q2 - q0);
        let cu = Self::camera_dot(face_n, q0);
        if cu * self.culling > 0.0 {
            return;
        }

        let q3 = mv.transform_point3(p[3]);
        let q = [q0, q1, q2, q3];
        let s = [
            self.project(q0),
            self.project(q1),
            self.project(q2),
            self.project(q3),
        ];
        for i in 0..4 {
            if self.rejects(q[i].z, s[i]) {
                return;
            }
        }

        let mut v = [RasterVertex::default(); 4];
        for i in 0..4 {
            v[i].pos = s[i];
        }

        match (self.shader.contains(Shader::GOURAUD), normals) {
            (true, Some(n)) => {
                let sign = self.normal_sign(cu);
                for i in 0..4 {
                    v[i].color = self.shade_vertex(n[i], sign);
                }
            }
            _ => self.shade_face(face_n, cu),
        }

        if self.shader.contains(Shader::TEXTURE) {
            if let Some(t) = uvs {
                for i in 0..4 {
                    v[i].uv = t[i];
                }
            }
        }

        let [v0, v1, v2, v3] = v;
        self.rasterize(&v0, &v1, &v2);
        self.rasterize(&v0, &v2, &v3);
    }
}
