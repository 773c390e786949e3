//! Renderer context: all scene/model state plus the derived-value cache.
//!
//! The context owns nothing heavy: the raster target, the depth buffer and
//! all mesh data stay with the caller and are only borrowed for the frame.
//! Every setter eagerly recomputes the derived values downstream of it
//! (model-view matrix, view-space light, half-vector, premultiplied material
//! terms), so draw calls never touch the cache and a setter called twice
//! with the same argument leaves state bit-for-bit identical.
//!
//! Compile-time knobs mirror the draw loop's inner branches:
//!
//! * `LX`, `LY`: viewport size; NDC maps to `[0,LX-1]×[0,LY-1]`.
//! * `ZBUFFER`: per-pixel depth testing (requires an attached buffer).
//! * `ORTHO`: orthographic projection, skips the perspective divide.

mod mesh_walk;
mod pipeline;
mod raster;

use glam::{Mat4, Vec2, Vec3};
use thiserror::Error;

use crate::color::{Pixel, Rgb};
use crate::image::Image;
use crate::light::{LightTerms, PowTable};
use crate::math::{frustum, invert_y_axis};
use crate::mesh::{Material, Mesh3};
use crate::shader::Shader;

use pipeline::Pass;

/// Largest supported viewport extent in either direction.
pub const MAX_VIEWPORT: usize = 2048;

/// Failures a draw call can report. Degenerate, culled or out-of-frame
/// geometry is *not* an error; those draws succeed and touch no pixel.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawError {
    /// No raster target attached.
    #[error("no raster target attached")]
    NoTarget,
    /// Depth testing enabled but the buffer is missing or smaller than the
    /// viewport.
    #[error("depth buffer missing or smaller than the viewport")]
    NoDepthBuffer,
    /// Required attribute arrays are missing, inconsistent in length or
    /// indexed out of range, or texturing was requested without an image.
    #[error("missing or out-of-range geometry arrays")]
    BadGeometry,
}

/// Values derived from the user state, recomputed by setters only.
///
/// The dependency graph is a small DAG: view/model feed the model-view
/// matrix and the normal rescale factor; the world light feeds the
/// view-space light and half-vector; light/material colors feed the
/// premultiplied Phong terms.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Derived {
    pub model_view: Mat4,
    /// `1 / ‖model_view · ẑ‖`, which compensates normal rescaling so dot products
    /// with transformed, non-renormalized normals stay correct.
    pub inorm: f32,
    /// Light direction in view space, inverted (surface → source), unit.
    pub light: Vec3,
    pub light_inorm: Vec3,
    /// Half-vector between the light and the +Z view direction stand-in.
    pub half: Vec3,
    pub half_inorm: Vec3,
    pub terms: LightTerms,
}

/// Software 3D renderer over a borrowed raster target.
///
/// ```
/// use tinyrast::{Image, Renderer, Rgba8888, Shader};
/// use glam::Vec3;
///
/// let mut fb = Image::<Rgba8888>::new(128, 128);
/// let mut zb = vec![0.0_f32; 128 * 128];
/// let mut r = Renderer::<Rgba8888, 128, 128, true, false>::new();
/// r.set_target(&mut fb);
/// r.set_depth_buffer(&mut zb);
/// r.draw_triangle(
///     Shader::FLAT,
///     [
///         Vec3::new(-1.0, -1.0, -2.0),
///         Vec3::new(1.0, -1.0, -2.0),
///         Vec3::new(0.0, 1.0, -2.0),
///     ],
///     None,
///     None,
///     None,
/// )
/// .unwrap();
/// ```
pub struct Renderer<'t, P, const LX: usize, const LY: usize, const ZBUFFER: bool, const ORTHO: bool>
{
    target: Option<&'t mut Image<P>>,
    depth: Option<&'t mut [f32]>,
    ox: i32,
    oy: i32,

    /// Projection as used internally: Y row negated.
    proj: Mat4,
    view: Mat4,
    model: Mat4,

    /// Light direction in world space (the direction light travels).
    light_dir: Vec3,
    ambient_color: Rgb,
    diffuse_color: Rgb,
    specular_color: Rgb,

    material: Material,
    /// +1 culls clockwise faces, −1 counter-clockwise, 0 disables culling.
    culling: f32,

    cache: Derived,
    pow: PowTable,
}

impl<'t, P, const LX: usize, const LY: usize, const ZBUFFER: bool, const ORTHO: bool>
    Renderer<'t, P, LX, LY, ZBUFFER, ORTHO>
where
    P: Pixel,
{
    const VIEWPORT_OK: () = assert!(
        LX >= 1 && LX <= MAX_VIEWPORT && LY >= 1 && LY <= MAX_VIEWPORT,
        "viewport dimensions must lie in 1..=2048"
    );

    /// A renderer with usable defaults: 45° perspective (or a 32×24 ortho
    /// window), identity view/model, white light from (−1,−1,−1), silver
    /// material, counter-clockwise front faces.
    pub fn new() -> Self {
        let () = Self::VIEWPORT_OK;

        let mut r = Renderer {
            target: None,
            depth: None,
            ox: 0,
            oy: 0,
            proj: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            light_dir: Vec3::new(-1.0, -1.0, -1.0),
            ambient_color: Rgb::WHITE,
            diffuse_color: Rgb::WHITE,
            specular_color: Rgb::WHITE,
            material: Material::default(),
            culling: 1.0,
            cache: Derived::default(),
            pow: PowTable::new(Material::default().specular_exponent),
        };

        let proj = if ORTHO {
            Mat4::orthographic_rh_gl(-16.0, 16.0, -12.0, 12.0, 1.0, 1000.0)
        } else {
            Mat4::perspective_rh_gl(45f32.to_radians(), 1.5, 1.0, 1000.0)
        };
        r.set_projection(proj);
        r.set_look_at(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        r.set_model(Mat4::IDENTITY);
        r.set_light(
            Vec3::new(-1.0, -1.0, -1.0),
            Rgb::WHITE,
            Rgb::WHITE,
            Rgb::WHITE,
        );
        r.set_material(Material::default());
        r
    }

    /* ---------------- attachments & viewport placement ---------------- */

    /// Attach the image drawn onto. May be smaller than the viewport; see
    /// [`set_offset`](Self::set_offset) for tile rendering.
    pub fn set_target(&mut self, target: &'t mut Image<P>) {
        self.target = Some(target);
    }

    /// Detach the raster target; subsequent draws fail with
    /// [`DrawError::NoTarget`].
    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// The attached target, for reading pixels back.
    pub fn target(&self) -> Option<&Image<P>> {
        self.target.as_deref()
    }

    /// The attached target, e.g. for clearing between frames while it stays
    /// attached.
    pub fn target_mut(&mut self) -> Option<&mut Image<P>> {
        self.target.as_deref_mut()
    }

    /// Position of the target inside the viewport. Drawing only touches the
    /// sub-rectangle the target covers, so a full frame can be rendered in
    /// tiles smaller than the viewport. Clear the depth buffer after moving
    /// the offset.
    pub fn set_offset(&mut self, ox: i32, oy: i32) {
        self.ox = ox.clamp(0, MAX_VIEWPORT as i32);
        self.oy = oy.clamp(0, MAX_VIEWPORT as i32);
    }

    /* ---------------------------- projection --------------------------- */

    /// Set the view-to-clip projection. The camera looks down −Z with Y up;
    /// the matrix is stored with its Y row negated so the rasterizer's
    /// downward Y needs no per-vertex flip.
    pub fn set_projection(&mut self, m: Mat4) {
        self.proj = invert_y_axis(m);
    }

    /// The projection matrix as supplied (flip undone).
    pub fn projection(&self) -> Mat4 {
        invert_y_axis(self.proj)
    }

    /* ------------------------------ scene ------------------------------ */

    /// Set the world-to-view matrix and rebuild everything that hangs off
    /// it: model-view, the normal rescale factor and the view-space light.
    pub fn set_view(&mut self, m: Mat4) {
        self.view = m;
        self.cache.model_view = self.view * self.model;
        self.cache.inorm = 1.0 / self.cache.model_view.transform_vector3(Vec3::Z).length();
        self.relight();
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Point the camera: standard look-at in world coordinates.
    pub fn set_look_at(&mut self, eye: Vec3, center: Vec3, up: Vec3) {
        self.set_view(Mat4::look_at_rh(eye, center, up));
    }

    /// Direction the light travels, in world space. It is rotated into view
    /// space here so the light stays fixed relative to the world, not the
    /// camera.
    pub fn set_light_direction(&mut self, dir: Vec3) {
        self.light_dir = dir;
        self.relight();
    }

    pub fn set_light_ambient(&mut self, color: Rgb) {
        self.ambient_color = color;
        self.cache.terms.ambient = color * self.material.ambient_strength;
    }

    pub fn set_light_diffuse(&mut self, color: Rgb) {
        self.diffuse_color = color;
        self.cache.terms.diffuse = color * self.material.diffuse_strength;
    }

    pub fn set_light_specular(&mut self, color: Rgb) {
        self.specular_color = color;
        self.cache.terms.specular = color * self.material.specular_strength;
    }

    /// All light parameters at once.
    pub fn set_light(&mut self, dir: Vec3, ambient: Rgb, diffuse: Rgb, specular: Rgb) {
        self.set_light_direction(dir);
        self.set_light_ambient(ambient);
        self.set_light_diffuse(diffuse);
        self.set_light_specular(specular);
    }

    fn relight(&mut self) {
        let c = &mut self.cache;
        c.light = (-self.view.transform_vector3(self.light_dir)).normalize();
        c.light_inorm = c.light * c.inorm;
        c.half = (Vec3::Z + c.light).normalize();
        c.half_inorm = c.half * c.inorm;
    }

    /* ------------------------------ model ------------------------------ */

    /// Set the local-to-world matrix for the object being drawn.
    pub fn set_model(&mut self, m: Mat4) {
        self.model = m;
        self.cache.model_view = self.view * self.model;
        self.cache.inorm = 1.0 / self.cache.model_view.transform_vector3(Vec3::Z).length();
        self.cache.light_inorm = self.cache.light * self.cache.inorm;
        self.cache.half_inorm = self.cache.half * self.cache.inorm;
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    /// Base color used whenever texturing is off.
    pub fn set_material_color(&mut self, color: Rgb) {
        self.material.color = color;
        self.cache.terms.object = color;
    }

    /// Strengths clamp to [0, 10]; values above 1 emulate emissive surfaces.
    pub fn set_material_ambient_strength(&mut self, s: f32) {
        self.material.ambient_strength = s.clamp(0.0, 10.0);
        self.cache.terms.ambient = self.ambient_color * self.material.ambient_strength;
    }

    pub fn set_material_diffuse_strength(&mut self, s: f32) {
        self.material.diffuse_strength = s.clamp(0.0, 10.0);
        self.cache.terms.diffuse = self.diffuse_color * self.material.diffuse_strength;
    }

    pub fn set_material_specular_strength(&mut self, s: f32) {
        self.material.specular_strength = s.clamp(0.0, 10.0);
        self.cache.terms.specular = self.specular_color * self.material.specular_strength;
    }

    /// Specular exponent, clamped to [0, 100]; 0 disables the highlight.
    /// The pow table is rebuilt lazily on the next draw.
    pub fn set_material_specular_exponent(&mut self, e: i32) {
        self.material.specular_exponent = e.clamp(0, 100);
    }

    /// All material parameters at once.
    pub fn set_material(&mut self, m: Material) {
        self.set_material_color(m.color);
        self.set_material_ambient_strength(m.ambient_strength);
        self.set_material_diffuse_strength(m.diffuse_strength);
        self.set_material_specular_strength(m.specular_strength);
        self.set_material_specular_exponent(m.specular_exponent);
    }

    /// Winding convention: `> 0` front faces are counter-clockwise (clockwise
    /// faces culled), `< 0` the reverse, `0` draws both sides.
    pub fn set_culling(&mut self, w: i32) {
        self.culling = w.signum() as f32;
    }

    /* --------------------------- draw methods -------------------------- */

    fn check_attachments(&self) -> Result<(), DrawError> {
        if self.target.is_none() {
            return Err(DrawError::NoTarget);
        }
        if ZBUFFER {
            match &self.depth {
                Some(z) if z.len() >= LX * LY => {}
                _ => return Err(DrawError::NoDepthBuffer),
            }
        }
        Ok(())
    }

    /// Split the borrows one draw call needs off the renderer.
    /// `check_attachments` must have succeeded first.
    fn begin_pass<'s>(
        &'s mut self,
        shader: Shader,
        texture: Option<&'s Image<P>>,
    ) -> Option<Pass<'s, P, LX, LY, ZBUFFER, ORTHO>> {
        Some(Pass {
            target: self.target.as_deref_mut()?,
            depth: self.depth.as_deref_mut().unwrap_or(&mut []),
            texture,
            proj: self.proj,
            cache: self.cache,
            pow: &mut self.pow,
            culling: self.culling,
            ox: self.ox,
            oy: self.oy,
            shader,
            face_color: Rgb::BLACK,
        })
    }

    /// Effective shader for a single primitive: flags with missing inputs
    /// are masked off; texturing with coordinates but no image is an error.
    fn mask_shader<const N: usize>(
        shader: Shader,
        normals: Option<&[Vec3; N]>,
        uvs: Option<&[Vec2; N]>,
        texture: Option<&Image<P>>,
    ) -> Result<Shader, DrawError> {
        let mut s = shader;
        if normals.is_none() {
            s -= Shader::GOURAUD;
        }
        if s.contains(Shader::TEXTURE) {
            match (uvs, texture) {
                (Some(_), Some(_)) => {}
                (Some(_), None) => return Err(DrawError::BadGeometry),
                (None, _) => s -= Shader::TEXTURE,
            }
        }
        Ok(s)
    }

    /// Draw a single triangle. Vertices are model-space, in the winding
    /// order matching the culling convention; normals must be unit length.
    pub fn draw_triangle(
        &mut self,
        shader: Shader,
        vertices: [Vec3; 3],
        normals: Option<[Vec3; 3]>,
        uvs: Option<[Vec2; 3]>,
        texture: Option<&Image<P>>,
    ) -> Result<(), DrawError> {
        self.check_attachments()?;
        let shader = Self::mask_shader(shader, normals.as_ref(), uvs.as_ref(), texture)?;
        self.pow.rebuild(self.material.specular_exponent);
        if let Some(mut pass) = self.begin_pass(shader, texture) {
            pass.triangle(vertices, normals, uvs);
        }
        Ok(())
    }

    /// Draw a single coplanar quad, split internally into two triangles.
    pub fn draw_quad(
        &mut self,
        shader: Shader,
        vertices: [Vec3; 4],
        normals: Option<[Vec3; 4]>,
        uvs: Option<[Vec2; 4]>,
        texture: Option<&Image<P>>,
    ) -> Result<(), DrawError> {
        self.check_attachments()?;
        let shader = Self::mask_shader(shader, normals.as_ref(), uvs.as_ref(), texture)?;
        self.pow.rebuild(self.material.specular_exponent);
        if let Some(mut pass) = self.begin_pass(shader, texture) {
            pass.quad(vertices, normals, uvs);
        }
        Ok(())
    }

    /// Validate an index stream against its attribute array. `Ok(true)` when
    /// both are present and consistent, `Ok(false)` when absent (caller
    /// masks the shader flag).
    fn check_indexed<T>(
        indices: Option<&[u16]>,
        values: Option<&[T]>,
        count: usize,
    ) -> Result<bool, DrawError> {
        match (indices, values) {
            (Some(idx), Some(vals)) => {
                if idx.len() != count || idx.iter().any(|&i| i as usize >= vals.len()) {
                    return Err(DrawError::BadGeometry);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Draw an indexed triangle list: `indices` holds three vertex indices
    /// per triangle. Normal/texcoord index arrays, when given, run parallel
    /// to `indices`; absent ones mask off the corresponding shader flag.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_triangles(
        &mut self,
        shader: Shader,
        indices: &[u16],
        vertices: &[Vec3],
        normal_indices: Option<&[u16]>,
        normals: Option<&[Vec3]>,
        uv_indices: Option<&[u16]>,
        uvs: Option<&[Vec2]>,
        texture: Option<&Image<P>>,
    ) -> Result<(), DrawError> {
        self.check_attachments()?;
        if vertices.is_empty() || indices.len() % 3 != 0 {
            return Err(DrawError::BadGeometry);
        }
        if indices.iter().any(|&i| i as usize >= vertices.len()) {
            return Err(DrawError::BadGeometry);
        }

        let mut shader = shader;
        if !Self::check_indexed(normal_indices, normals, indices.len())? {
            shader -= Shader::GOURAUD;
        }
        if !Self::check_indexed(uv_indices, uvs, indices.len())? || texture.is_none() {
            shader -= Shader::TEXTURE;
        }

        self.pow.rebuild(self.material.specular_exponent);
        let gouraud = shader.contains(Shader::GOURAUD);
        let textured = shader.contains(Shader::TEXTURE);
        let Some(mut pass) = self.begin_pass(shader, texture) else {
            return Ok(());
        };
        for t in 0..indices.len() / 3 {
            let at = |idx: &[u16], k: usize| idx[3 * t + k] as usize;
            let v = [
                vertices[at(indices, 0)],
                vertices[at(indices, 1)],
                vertices[at(indices, 2)],
            ];
            let n = match (gouraud, normal_indices, normals) {
                (true, Some(ni), Some(ns)) => {
                    Some([ns[at(ni, 0)], ns[at(ni, 1)], ns[at(ni, 2)]])
                }
                _ => None,
            };
            let uv = match (textured, uv_indices, uvs) {
                (true, Some(ti), Some(ts)) => {
                    Some([ts[at(ti, 0)], ts[at(ti, 1)], ts[at(ti, 2)]])
                }
                _ => None,
            };
            pass.triangle(v, n, uv);
        }
        Ok(())
    }

    /// Draw an indexed quad list: four indices per (coplanar) quad.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_quads(
        &mut self,
        shader: Shader,
        indices: &[u16],
        vertices: &[Vec3],
        normal_indices: Option<&[u16]>,
        normals: Option<&[Vec3]>,
        uv_indices: Option<&[u16]>,
        uvs: Option<&[Vec2]>,
        texture: Option<&Image<P>>,
    ) -> Result<(), DrawError> {
        self.check_attachments()?;
        if vertices.is_empty() || indices.len() % 4 != 0 {
            return Err(DrawError::BadGeometry);
        }
        if indices.iter().any(|&i| i as usize >= vertices.len()) {
            return Err(DrawError::BadGeometry);
        }

        let mut shader = shader;
        if !Self::check_indexed(normal_indices, normals, indices.len())? {
            shader -= Shader::GOURAUD;
        }
        if !Self::check_indexed(uv_indices, uvs, indices.len())? || texture.is_none() {
            shader -= Shader::TEXTURE;
        }

        self.pow.rebuild(self.material.specular_exponent);
        let gouraud = shader.contains(Shader::GOURAUD);
        let textured = shader.contains(Shader::TEXTURE);
        let Some(mut pass) = self.begin_pass(shader, texture) else {
            return Ok(());
        };
        for q in 0..indices.len() / 4 {
            let at = |idx: &[u16], k: usize| idx[4 * q + k] as usize;
            let v = [
                vertices[at(indices, 0)],
                vertices[at(indices, 1)],
                vertices[at(indices, 2)],
                vertices[at(indices, 3)],
            ];
            let n = match (gouraud, normal_indices, normals) {
                (true, Some(ni), Some(ns)) => Some([
                    ns[at(ni, 0)],
                    ns[at(ni, 1)],
                    ns[at(ni, 2)],
                    ns[at(ni, 3)],
                ]),
                _ => None,
            };
            let uv = match (textured, uv_indices, uvs) {
                (true, Some(ti), Some(ts)) => Some([
                    ts[at(ti, 0)],
                    ts[at(ti, 1)],
                    ts[at(ti, 2)],
                    ts[at(ti, 3)],
                ]),
                _ => None,
            };
            pass.quad(v, n, uv);
        }
        Ok(())
    }

    /// Draw a packed mesh, the fastest path for static geometry.
    ///
    /// With `use_mesh_material` the mesh's own material overrides the
    /// renderer's for the duration of the call; with `draw_chained` every
    /// mesh reachable through `next` links is drawn too. Meshes without a
    /// vertex array are skipped silently.
    pub fn draw_mesh(
        &mut self,
        shader: Shader,
        mesh: &Mesh3<'_, P>,
        use_mesh_material: bool,
        draw_chained: bool,
    ) -> Result<(), DrawError> {
        self.check_attachments()?;

        let mut current = Some(mesh);
        while let Some(m) = current {
            if !m.vertices.is_empty() {
                let mut s = shader;
                if m.normals.is_none() {
                    s -= Shader::GOURAUD;
                }
                if m.texcoords.is_none() || m.texture.is_none() {
                    s -= Shader::TEXTURE;
                }
                let exponent = if use_mesh_material {
                    m.material.specular_exponent
                } else {
                    self.material.specular_exponent
                };
                self.pow.rebuild(exponent);

                let override_terms = use_mesh_material.then(|| LightTerms {
                    ambient: self.ambient_color * m.material.ambient_strength,
                    diffuse: self.diffuse_color * m.material.diffuse_strength,
                    specular: self.specular_color * m.material.specular_strength,
                    object: m.material.color,
                });
                if let Some(mut pass) = self.begin_pass(s, m.texture) {
                    if let Some(terms) = override_terms {
                        pass.cache.terms = terms;
                    }
                    pass.mesh(m);
                }
            }
            current = if draw_chained { m.next } else { None };
        }
        Ok(())
    }
}

impl<P, const LX: usize, const LY: usize, const ZBUFFER: bool, const ORTHO: bool> Default
    for Renderer<'_, P, LX, LY, ZBUFFER, ORTHO>
where
    P: Pixel,
{
    fn default() -> Self {
        Self::new()
    }
}

/* ----------------- methods gated on the compile-time knobs ------------- */

impl<'t, P, const LX: usize, const LY: usize, const ORTHO: bool>
    Renderer<'t, P, LX, LY, true, ORTHO>
where
    P: Pixel,
{
    /// Attach the depth buffer; it must hold at least `LX·LY` floats.
    pub fn set_depth_buffer(&mut self, depth: &'t mut [f32]) {
        self.depth = Some(depth);
    }

    /// Zero the attached depth buffer. Call once per frame, before the first
    /// draw: zero means "infinitely far" since stored depth grows toward the
    /// camera. The buffer is deliberately not cleared between draw calls so
    /// several objects can share one scene.
    pub fn clear_depth_buffer(&mut self) {
        if let Some(z) = self.depth.as_deref_mut() {
            z.fill(0.0);
        }
    }
}

impl<P, const LX: usize, const LY: usize, const ZBUFFER: bool>
    Renderer<'_, P, LX, LY, ZBUFFER, true>
where
    P: Pixel,
{
    /// Orthographic projection over the given box, glOrtho-style.
    pub fn set_ortho(&mut self, l: f32, r: f32, b: f32, t: f32, near: f32, far: f32) {
        self.set_projection(Mat4::orthographic_rh_gl(l, r, b, t, near, far));
    }
}

impl<P, const LX: usize, const LY: usize, const ZBUFFER: bool>
    Renderer<'_, P, LX, LY, ZBUFFER, false>
where
    P: Pixel,
{
    /// Perspective projection from an asymmetric near-plane window,
    /// glFrustum-style.
    pub fn set_frustum(&mut self, l: f32, r: f32, b: f32, t: f32, near: f32, far: f32) {
        self.set_projection(frustum(l, r, b, t, near, far));
    }

    /// Perspective projection from a vertical field of view (radians) and
    /// aspect ratio.
    pub fn set_perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.set_projection(Mat4::perspective_rh_gl(fov_y, aspect, near, far));
    }
}
