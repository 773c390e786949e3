//! Packed-mesh traversal: chain decoding with vertex-attribute reuse.
//!
//! A chain shares two vertices between consecutive triangles, so the walk
//! keeps three slots and only ever loads one new vertex per successor
//! record. Transform happens eagerly (the face normal needs all three view
//! positions for culling) but projection and shading are deferred until a
//! triangle actually survives culling, and survive across swaps; the
//! `fresh` flag marks slots whose attributes still need computing.

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::color::{Pixel, Rgb};
use crate::mesh::{BoundingBox, Mesh3};
use crate::shader::Shader;

use super::pipeline::Pass;
use super::raster::RasterVertex;

/// One of the three traversal slots.
#[derive(Clone, Copy, Default)]
struct Slot {
    /// Position after the model-view transform.
    view: Vec3,
    /// Projected position, valid once `fresh` is cleared.
    pos: Vec4,
    color: Rgb,
    uv: Vec2,
    normal_idx: usize,
    uv_idx: usize,
    /// Attributes (projection, shading, texcoord) not computed yet.
    fresh: bool,
}

/// Forward-only reader over the face stream. Running off the end of a
/// malformed stream simply ends the walk.
struct Stream<'a> {
    words: &'a [u16],
    at: usize,
}

impl Stream<'_> {
    #[inline]
    fn next(&mut self) -> Option<u16> {
        let w = self.words.get(self.at).copied();
        self.at += 1;
        w
    }
}

impl<P, const LX: usize, const LY: usize, const ZBUFFER: bool, const ORTHO: bool>
    Pass<'_, P, LX, LY, ZBUFFER, ORTHO>
where
    P: Pixel,
{
    /// Project a model-space point through `m` for the bounding-box tests,
    /// forcing points behind the camera out of the z range.
    fn project_corner(&self, m: &Mat4, p: Vec3) -> Vec4 {
        let mut s = *m * p.extend(1.0);
        if !ORTHO {
            let iw = 1.0 / s.w;
            s.x *= iw;
            s.y *= iw;
            s.z *= iw;
            s.w = iw;
            if s.w <= 0.0 {
                s.z = -2.0;
            }
        }
        s
    }

    /// Whole-mesh discard: true when all eight projected box corners fall
    /// outside the same frustum plane. The planes for x/y are widened to the
    /// part of the viewport the target covers, plus a one-pixel guard band.
    fn discard_mesh(&self, bounds: &BoundingBox, m: &Mat4) -> bool {
        if bounds.is_unset() {
            return false;
        }

        let ilx = 2.0 / LX as f32;
        let x_lo = (self.ox - 1) as f32 * ilx - 1.0;
        let x_hi = (self.ox + self.target.width() as i32 + 1) as f32 * ilx - 1.0;
        let ily = 2.0 / LY as f32;
        let y_lo = (self.oy - 1) as f32 * ily - 1.0;
        let y_hi = (self.oy + self.target.height() as i32 + 1) as f32 * ily - 1.0;

        // One bit per plane; a corner inside a plane clears its bit.
        let mut planes = 0x3f_u32;
        for corner in bounds.corners() {
            let s = self.project_corner(m, corner);
            if s.x >= x_lo {
                planes &= !0x01;
            }
            if s.x <= x_hi {
                planes &= !0x02;
            }
            if s.y >= y_lo {
                planes &= !0x04;
            }
            if s.y <= y_hi {
                planes &= !0x08;
            }
            if s.z >= -1.0 {
                planes &= !0x10;
            }
            if s.z <= 1.0 {
                planes &= !0x20;
            }
            if planes == 0 {
                return false;
            }
        }
        true
    }

    /// True when some box corner leaves the loose clip bound, in which case
    /// every triangle of the mesh must be clip-tested individually.
    fn clip_test_needed(&self, bounds: &BoundingBox, m: &Mat4) -> bool {
        let bound = Self::clip_bound();
        bounds.corners().iter().any(|&corner| {
            let s = self.project_corner(m, corner);
            s.x <= -bound
                || s.x >= bound
                || s.y <= -bound
                || s.y >= bound
                || s.z <= -1.0
                || s.z >= 1.0
        })
    }

    /// Read the optional texcoord/normal index words of a record. The stream
    /// carries them whenever the mesh has the corresponding attribute array;
    /// they are only kept when the shader uses them.
    fn read_indices(
        stream: &mut Stream<'_>,
        slot: &mut Slot,
        has_uv: bool,
        has_normal: bool,
        shader: Shader,
    ) -> Option<()> {
        if has_uv {
            let t = stream.next()?;
            if shader.contains(Shader::TEXTURE) {
                slot.uv_idx = t as usize;
            }
        }
        if has_normal {
            let n = stream.next()?;
            if shader.contains(Shader::GOURAUD) {
                slot.normal_idx = n as usize;
            }
        }
        Some(())
    }

    /// Read one full vertex record, returning the vertex index.
    fn read_record(
        stream: &mut Stream<'_>,
        slot: &mut Slot,
        has_uv: bool,
        has_normal: bool,
        shader: Shader,
    ) -> Option<u16> {
        let vid = stream.next()?;
        Self::read_indices(stream, slot, has_uv, has_normal, shader)?;
        Some(vid)
    }

    /// Walk and draw one mesh. The shader mask and material override are
    /// already applied by the caller.
    pub(crate) fn mesh(&mut self, mesh: &Mesh3<'_, P>) {
        let full = self.proj * self.cache.model_view;

        if self.discard_mesh(&mesh.bounds, &full) {
            return;
        }
        let clip_tests = mesh.bounds.is_unset() || self.clip_test_needed(&mesh.bounds, &full);

        let gouraud = self.shader.contains(Shader::GOURAUD);
        let textured = self.shader.contains(Shader::TEXTURE);
        let has_uv = mesh.texcoords.is_some();
        let has_normal = mesh.normals.is_some();
        let verts = mesh.vertices;
        let normals = mesh.normals.unwrap_or(&[]);
        let uvs = mesh.texcoords.unwrap_or(&[]);
        let mv = self.cache.model_view;

        let mut stream = Stream {
            words: mesh.faces,
            at: 0,
        };
        let mut slots = [Slot::default(); 3];
        // Logical roles: i0/i1 are the retained pair, i2 the newest vertex.
        let (mut i0, mut i1, mut i2) = (0_usize, 1, 2);

        'chains: loop {
            let mut left = match stream.next() {
                Some(0) | None => break,
                Some(n) => n,
            };

            // First triangle of the chain: three full records.
            for &i in &[i0, i1, i2] {
                let Some(vid) =
                    Self::read_record(&mut stream, &mut slots[i], has_uv, has_normal, self.shader)
                else {
                    break 'chains;
                };
                let Some(&p) = verts.get(vid as usize) else {
                    break 'chains;
                };
                slots[i].view = mv.transform_point3(p);
                slots[i].fresh = true;
            }

            loop {
                let (q0, q1, q2) = (slots[i0].view, slots[i1].view, slots[i2].view);
                let face_n = (q1 - q0).cross(q2 - q0);
                let cu = if ORTHO {
                    face_n.dot(Vec3::NEG_Z)
                } else {
                    face_n.dot(q0)
                };

                let mut skip = cu * self.culling > 0.0;

                if !skip {
                    // The newest slot always needs projecting; retained
                    // slots only when their attributes went stale.
                    slots[i2].pos = self.project(q2);
                    let mut outside = clip_tests && self.rejects(q2.z, slots[i2].pos);
                    if slots[i0].fresh {
                        slots[i0].pos = self.project(q0);
                        outside |= clip_tests && self.rejects(q0.z, slots[i0].pos);
                    }
                    if slots[i1].fresh {
                        slots[i1].pos = self.project(q1);
                        outside |= clip_tests && self.rejects(q1.z, slots[i1].pos);
                    }
                    skip = outside;
                }

                if !skip {
                    if gouraud {
                        let sign = if self.culling != 0.0 {
                            1.0
                        } else if cu > 0.0 {
                            -1.0
                        } else {
                            1.0
                        };
                        for &i in &[i0, i1, i2] {
                            if slots[i].fresh {
                                let n = normals
                                    .get(slots[i].normal_idx)
                                    .copied()
                                    .unwrap_or(Vec3::Z);
                                slots[i].color = self.shade_vertex(n, sign);
                            }
                        }
                    } else {
                        self.shade_face(face_n, cu);
                    }

                    if textured {
                        for &i in &[i0, i1, i2] {
                            if slots[i].fresh {
                                slots[i].uv =
                                    uvs.get(slots[i].uv_idx).copied().unwrap_or(Vec2::ZERO);
                            }
                        }
                    }

                    slots[i0].fresh = false;
                    slots[i1].fresh = false;
                    slots[i2].fresh = false;

                    let (v0, v1, v2) = (
                        RasterVertex {
                            pos: slots[i0].pos,
                            color: slots[i0].color,
                            uv: slots[i0].uv,
                        },
                        RasterVertex {
                            pos: slots[i1].pos,
                            color: slots[i1].color,
                            uv: slots[i1].uv,
                        },
                        RasterVertex {
                            pos: slots[i2].pos,
                            color: slots[i2].color,
                            uv: slots[i2].uv,
                        },
                    );
                    self.rasterize(&v0, &v1, &v2);
                }

                left -= 1;
                if left == 0 {
                    break;
                }

                // Successor: bit 15 picks which retained slot to retire.
                let Some(word) = stream.next() else {
                    break 'chains;
                };
                if word & 0x8000 != 0 {
                    std::mem::swap(&mut i0, &mut i2);
                } else {
                    std::mem::swap(&mut i1, &mut i2);
                }
                if Self::read_indices(
                    &mut stream,
                    &mut slots[i2],
                    has_uv,
                    has_normal,
                    self.shader,
                )
                .is_none()
                {
                    break 'chains;
                }
                let Some(&p) = verts.get((word & 0x7fff) as usize) else {
                    break 'chains;
                };
                slots[i2].view = mv.transform_point3(p);
                slots[i2].fresh = true;
            }
        }
    }
}
