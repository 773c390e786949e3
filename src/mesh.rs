//! Packed mesh container.
//!
//! A [`Mesh3`] borrows its attribute arrays (FLASH-resident
//! statics on an embedded target, `Vec`s in tests) and describes faces as a
//! run-length stream of triangle chains:
//!
//! ```text
//! stream  := chain*  0
//! chain   := N  rec  rec  rec  (succ){N-1}        N > 0 triangles
//! rec     := vid [tid] [nid]                      tid iff texcoords, nid iff normals
//! succ    := vid' [tid] [nid]                     vid' bit 15: which slot to retire
//! ```
//!
//! Each successor record contributes one new vertex and keeps two from the
//! previous triangle, so transform/projection/shading work is shared along
//! the chain exactly like a triangle strip.

use glam::{Vec2, Vec3};

use crate::color::Rgb;
use crate::image::Image;

/// Axis-aligned bounds in model space, used for whole-mesh discard and for
/// deciding whether per-triangle clip tests can be skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub xmin: f32,
    pub xmax: f32,
    pub ymin: f32,
    pub ymax: f32,
    pub zmin: f32,
    pub zmax: f32,
}

impl BoundingBox {
    /// All-zero box: "not filled in", discard test is skipped.
    #[inline]
    pub fn is_unset(&self) -> bool {
        *self == BoundingBox::default()
    }

    /// The eight corners, for projection against the frustum planes.
    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.xmin, self.ymin, self.zmin),
            Vec3::new(self.xmin, self.ymin, self.zmax),
            Vec3::new(self.xmin, self.ymax, self.zmin),
            Vec3::new(self.xmin, self.ymax, self.zmax),
            Vec3::new(self.xmax, self.ymin, self.zmin),
            Vec3::new(self.xmax, self.ymin, self.zmax),
            Vec3::new(self.xmax, self.ymax, self.zmin),
            Vec3::new(self.xmax, self.ymax, self.zmax),
        ]
    }
}

/// Per-mesh material, applied when a draw call opts into it.
#[derive(Clone, Copy, Debug)]
pub struct Material {
    pub color: Rgb,
    pub ambient_strength: f32,
    pub diffuse_strength: f32,
    pub specular_strength: f32,
    pub specular_exponent: i32,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            color: Rgb::new(0.75, 0.75, 0.75),
            ambient_strength: 0.15,
            diffuse_strength: 0.7,
            specular_strength: 0.5,
            specular_exponent: 16,
        }
    }
}

/// A packed indexed mesh. All storage is borrowed; the renderer never owns
/// or mutates mesh data.
#[derive(Clone, Copy)]
pub struct Mesh3<'a, P> {
    /// Model-space positions. An empty slice makes draw calls skip the mesh.
    pub vertices: &'a [Vec3],
    /// Unit normals; their presence adds a normal index to every face record.
    pub normals: Option<&'a [Vec3]>,
    /// Texture coordinates; their presence adds a texcoord index likewise.
    pub texcoords: Option<&'a [Vec2]>,
    /// Texture image, power-of-two dimensions.
    pub texture: Option<&'a Image<P>>,
    /// Face stream in the chain grammar above, terminated by a 0 word.
    pub faces: &'a [u16],
    pub bounds: BoundingBox,
    pub material: Material,
    /// Next mesh drawn as part of the same call, if any.
    pub next: Option<&'a Mesh3<'a, P>>,
}

impl<'a, P> Mesh3<'a, P> {
    /// A minimal untextured, unshaded mesh over `vertices` and `faces`.
    pub fn untextured(vertices: &'a [Vec3], faces: &'a [u16]) -> Self {
        Mesh3 {
            vertices,
            normals: None,
            texcoords: None,
            texture: None,
            faces,
            bounds: BoundingBox::default(),
            material: Material::default(),
            next: None,
        }
    }
}
