//! Owned 2-D pixel array, used both as render target and as texture.
//!
//! The renderer borrows an `Image` for the duration of a frame; it never
//! allocates or frees one itself. Texture images must have power-of-two
//! dimensions so the sampler can wrap with a mask instead of a modulo.

use crate::color::{Pixel, Rgb};

/// Row-major pixel buffer.
#[derive(Clone, Debug)]
pub struct Image<P> {
    width: usize,
    height: usize,
    data: Vec<P>,
}

impl<P: Pixel> Image<P> {
    /// Allocate a `width` × `height` image filled with the default pixel.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![P::default(); width * height],
        }
    }

    /// Wrap an existing buffer. Returns `None` when the length does not match
    /// the dimensions.
    pub fn from_vec(width: usize, height: usize, data: Vec<P>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[P] {
        &self.data
    }

    /// Fill the whole image with one pixel value.
    pub fn clear(&mut self, px: P) {
        self.data.fill(px);
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> P {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, px: P) {
        self.data[y * self.width + x] = px;
    }

    /// True when both dimensions are powers of two (texture requirement).
    pub fn pow2_dims(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Nearest-neighbour sample at normalized coordinates, wrapping.
    ///
    /// Callers guarantee power-of-two dimensions; the wrap is a mask.
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> Rgb {
        let x = (u * self.width as f32) as i64 as usize & (self.width - 1);
        let y = (v * self.height as f32) as i64 as usize & (self.height - 1);
        self.get(x, y).to_rgb()
    }
}
