//! Phong lighting evaluator.
//!
//! The specular term needs `pow(n_dot_h, exponent)` per vertex (or per face),
//! which is far too slow on the microcontrollers this renderer targets. A
//! 16-entry table sampled over the top of the curve with linear interpolation
//! replaces it; everything below the table's reach contributes no visible
//! highlight and evaluates to zero.

use crate::color::Rgb;

const POW_TABLE_SIZE: usize = 16;

/// Precomputed `pow(x, exponent)` over `[1 − min(e,8)/e, 1]`.
///
/// Rebuilt lazily whenever the exponent changes; `exponent == 0` disables the
/// specular term entirely.
#[derive(Clone, Debug)]
pub struct PowTable {
    exponent: i32,
    factor: f32,
    table: [f32; POW_TABLE_SIZE],
}

impl PowTable {
    pub fn new(exponent: i32) -> Self {
        let mut t = PowTable {
            exponent: -1,
            factor: 0.0,
            table: [0.0; POW_TABLE_SIZE],
        };
        t.rebuild(exponent);
        t
    }

    #[inline]
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Recompute the table for `exponent`. No-op when it already matches.
    pub fn rebuild(&mut self, exponent: i32) {
        if self.exponent == exponent {
            return;
        }
        self.exponent = exponent;
        if exponent <= 0 {
            self.factor = 0.0;
            self.table = [0.0; POW_TABLE_SIZE];
            return;
        }
        let e = exponent as f32;
        // Sample only where the curve still matters: exponents >= 8 push all
        // visible contribution into the top 8/e of the interval.
        let reach = e.min(8.0);
        self.factor = e * POW_TABLE_SIZE as f32 / reach;
        for (k, slot) in self.table.iter_mut().enumerate() {
            let x = 1.0 - (reach * k as f32) / (e * POW_TABLE_SIZE as f32);
            *slot = x.powf(e);
        }
    }

    /// Approximate `pow(x, exponent)` for `x` in [0, 1].
    #[inline]
    pub fn eval(&self, x: f32) -> f32 {
        let pos = (1.0 - x) * self.factor;
        let idx = pos as usize;
        if idx >= POW_TABLE_SIZE - 1 {
            return 0.0;
        }
        self.table[idx] + (pos - idx as f32) * (self.table[idx + 1] - self.table[idx])
    }
}

/// Premultiplied light terms: everything the per-vertex evaluation needs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LightTerms {
    /// Ambient light color × material ambient strength.
    pub ambient: Rgb,
    /// Diffuse light color × material diffuse strength.
    pub diffuse: Rgb,
    /// Specular light color × material specular strength.
    pub specular: Rgb,
    /// Material base color, applied only when texturing is off.
    pub object: Rgb,
}

/// Phong evaluation for one normal.
///
/// `n_dot_l` and `n_dot_h` come in pre-scaled by the model-view norm-inverse,
/// so non-renormalized transformed normals behave like unit ones. With
/// `textured` set the base color is left out; the rasterizer multiplies the
/// sampled texel in later.
#[inline]
pub fn phong(terms: &LightTerms, pow: &PowTable, n_dot_l: f32, n_dot_h: f32, textured: bool) -> Rgb {
    let mut col = terms.ambient;
    col += terms.diffuse * n_dot_l.max(0.0);
    col += terms.specular * pow.eval(n_dot_h.max(0.0));
    if !textured {
        col = col * terms.object;
    }
    col.clamp()
}
