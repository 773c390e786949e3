use bitflags::bitflags;

bitflags! {
    /// Shading options accepted by every draw call.
    ///
    /// `GOURAUD` overrides `FLAT` when both are set; `TEXTURE` combines with
    /// either. Flags whose required inputs are missing (no normals, no
    /// texture coordinates or image) are masked off by the draw call rather
    /// than reported as errors.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Shader: u32 {
        /// One Phong evaluation per face, using the cross-product normal.
        const FLAT    = 0x01;
        /// One Phong evaluation per vertex, interpolated across the face.
        const GOURAUD = 0x02;
        /// Perspective-correct texture sampling, modulated by the lighting.
        const TEXTURE = 0x04;
    }
}

impl Default for Shader {
    fn default() -> Self {
        Shader::FLAT
    }
}
