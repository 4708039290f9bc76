//! Dense 3D texel storage with format-exact quantization.
//!
//! A [`PixelBuffer`] holds every texel as four `f64` channel values in
//! semantic order (R, G, B, A; or depth, stencil for combined formats). Each
//! write is quantized to the buffer's [`PixelFormat`], so a buffer never
//! holds more precision than its format can represent. Two read views are
//! offered: [`pixel`](PixelBuffer::pixel) (float values, integers as whole
//! numbers) and [`pixel_int`](PixelBuffer::pixel_int) (the stored code).
//!
//! ```
//! use zenblit::{Extent3, PixelBuffer, PixelFormat};
//!
//! let mut buf = PixelBuffer::new(PixelFormat::RGBA8_UNORM, Extent3::new(2, 2, 1));
//! buf.set_pixel(1, 0, 0, [0.5, 0.0, 1.0, 1.0]);
//! assert_eq!(buf.pixel_int(1, 0, 0), [128, 0, 255, 255]);
//! ```

use alloc::vec;
use alloc::vec::Vec;

use num_traits::Float;

use crate::error::VerifyError;
use crate::format::{Aspect, ChannelClass, ChannelOrder, ChannelType, PixelFormat, swizzle_bgr};
use crate::region::{Box3, Extent3};

/// Value of channels a format doesn't store.
pub const DEFAULT_TEXEL: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

/// How one semantic channel is stored.
#[derive(Copy, Clone, Debug, PartialEq)]
enum Quant {
    Absent,
    Unorm(u32),
    Snorm(u32),
    Uint(u32),
    Sint(u32),
    Half,
    Float,
    Float64,
    /// Unsigned float with the given mantissa bits and a 5-bit exponent.
    SmallFloat(u32),
    /// Shared-exponent 9-bit mantissa.
    SharedExp,
}

fn quant_table(format: &PixelFormat) -> [Quant; 4] {
    let bits = format.bit_depth();
    let mantissa = format.mantissa_bit_depth();
    let class = format.class();
    core::array::from_fn(|c| {
        let b = bits[c];
        if b == 0 {
            return Quant::Absent;
        }
        if format.order == ChannelOrder::Ds && c == 1 {
            return Quant::Uint(8);
        }
        match (format.ty, class) {
            (ChannelType::Half, _) => Quant::Half,
            (ChannelType::Float | ChannelType::Float32Uint8, _) => Quant::Float,
            (ChannelType::Float64, _) => Quant::Float64,
            (ChannelType::Ufloat11_11_10, _) => Quant::SmallFloat(mantissa[c]),
            (ChannelType::Ufloat999E5, _) => Quant::SharedExp,
            (_, ChannelClass::UnsignedNormalized) => Quant::Unorm(b),
            (_, ChannelClass::SignedNormalized) => Quant::Snorm(b),
            (_, ChannelClass::UnsignedInteger) => Quant::Uint(b),
            (_, ChannelClass::SignedInteger) => Quant::Sint(b),
            (_, ChannelClass::FloatingPoint) => Quant::Float,
        }
    })
}

fn unorm_max(bits: u32) -> f64 {
    ((1u64 << bits) - 1) as f64
}

fn snorm_max(bits: u32) -> f64 {
    ((1u64 << (bits - 1)) - 1) as f64
}

fn sanitize(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v }
}

fn quantize_small_float(v: f64, mantissa: u32) -> f64 {
    let v = sanitize(v);
    if v <= 0.0 {
        return 0.0;
    }
    let max = (2.0 - 2f64.powi(-(mantissa as i32))) * 32768.0;
    let v = v.min(max);
    // Denormals share the smallest normal exponent.
    let e = v.log2().floor().max(-14.0);
    let step = 2f64.powf(e - mantissa as f64);
    (v / step).round() * step
}

/// Quantize RGB to the shared-exponent 9-9-9-5 encoding.
fn quantize_shared_exp(rgb: [f64; 3]) -> [f64; 3] {
    const MANTISSA: i32 = 9;
    const BIAS: i32 = 15;
    const MAX: f64 = 511.0 / 512.0 * 65536.0;
    let c = rgb.map(|v| sanitize(v).clamp(0.0, MAX));
    let max_c = c[0].max(c[1]).max(c[2]);
    if max_c == 0.0 {
        return [0.0; 3];
    }
    let mut exp = (max_c.log2().floor() as i32).max(-BIAS - 1) + 1 + BIAS;
    let mut scale = 2f64.powi(exp - BIAS - MANTISSA);
    if (max_c / scale).round() >= 512.0 {
        exp += 1;
        scale = 2f64.powi(exp - BIAS - MANTISSA);
    }
    c.map(|v| (v / scale).round() * scale)
}

fn quantize_channel(q: Quant, v: f64, default: f64) -> f64 {
    match q {
        Quant::Absent => default,
        Quant::Unorm(b) => {
            let m = unorm_max(b);
            (sanitize(v).clamp(0.0, 1.0) * m).round() / m
        }
        Quant::Snorm(b) => {
            let m = snorm_max(b);
            (sanitize(v).clamp(-1.0, 1.0) * m).round() / m
        }
        Quant::Uint(b) => sanitize(v).round().clamp(0.0, unorm_max(b)),
        Quant::Sint(b) => {
            let half = (1u64 << (b - 1)) as f64;
            sanitize(v).round().clamp(-half, half - 1.0)
        }
        Quant::Half => half::f16::from_f64(v).to_f64(),
        Quant::Float => v as f32 as f64,
        Quant::Float64 => v,
        Quant::SmallFloat(m) => quantize_small_float(v, m),
        // Handled per pixel.
        Quant::SharedExp => v,
    }
}

fn code_of(q: Quant, v: f64) -> i64 {
    match q {
        Quant::Unorm(b) => (v * unorm_max(b)).round() as i64,
        Quant::Snorm(b) => (v * snorm_max(b)).round() as i64,
        _ => v.round() as i64,
    }
}

fn value_of(q: Quant, code: i64) -> f64 {
    match q {
        Quant::Unorm(b) => code as f64 / unorm_max(b),
        Quant::Snorm(b) => (code as f64 / snorm_max(b)).max(-1.0),
        _ => code as f64,
    }
}

fn low_bits(bits: u32) -> u128 {
    (1u128 << bits) - 1
}

fn sign_extend(raw: u128, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((raw as u64) << shift) as i64 >> shift
}

/// Bit pattern of an unsigned float with a 5-bit exponent.
fn encode_small_float(v: f64, mantissa: u32) -> u32 {
    if v.is_nan() || v <= 0.0 {
        return 0;
    }
    let e = v.log2().floor() as i32;
    if e < -14 {
        return (v / 2f64.powi(-14 - mantissa as i32)).round() as u32;
    }
    let one = 1u32 << mantissa;
    let m = ((v / 2f64.powi(e) - 1.0) * one as f64).round() as u32;
    // Rounding may carry into the exponent.
    let (e, m) = if m >= one { (e + 1, 0) } else { (e, m) };
    (((e + 15) as u32) << mantissa) | m
}

fn decode_small_float(raw: u32, mantissa: u32) -> f64 {
    let exp = (raw >> mantissa) & 0x1f;
    let m = (raw & ((1 << mantissa) - 1)) as f64 / 2f64.powi(mantissa as i32);
    match exp {
        0 => m * 2f64.powi(-14),
        0x1f if m == 0.0 => f64::INFINITY,
        0x1f => f64::NAN,
        e => (1.0 + m) * 2f64.powi(e as i32 - 15),
    }
}

fn shared_exponent(max_c: f64) -> i32 {
    let exp = (max_c.log2().floor() as i32).max(-16) + 16;
    if (max_c / 2f64.powi(exp - 24)).round() >= 512.0 {
        exp + 1
    } else {
        exp
    }
}

fn encode_shared_exp(rgb: [f64; 3]) -> u128 {
    let max_c = rgb[0].max(rgb[1]).max(rgb[2]);
    if max_c.is_nan() || max_c <= 0.0 {
        return 0;
    }
    let exp = shared_exponent(max_c);
    let scale = 2f64.powi(exp - 24);
    let m = rgb.map(|v| (v / scale).round() as u128 & 0x1ff);
    m[0] | (m[1] << 9) | (m[2] << 18) | ((exp as u128) << 27)
}

fn decode_shared_exp(raw: u128) -> [f64; 3] {
    let scale = 2f64.powi(((raw >> 27) & 0x1f) as i32 - 24);
    core::array::from_fn(|c| ((raw >> (9 * c)) & 0x1ff) as f64 * scale)
}

fn encode_component(q: Quant, v: f64, bits: u32) -> u128 {
    match q {
        Quant::Absent | Quant::SharedExp => 0,
        Quant::Half => half::f16::from_f64(v).to_bits() as u128,
        Quant::Float => (v as f32).to_bits() as u128,
        Quant::Float64 => v.to_bits() as u128,
        Quant::SmallFloat(m) => encode_small_float(v, m) as u128,
        // Negative codes sign-extend, then get cut to the component width.
        _ => code_of(q, v) as u128 & low_bits(bits),
    }
}

fn decode_component(q: Quant, raw: u128, bits: u32) -> f64 {
    match q {
        Quant::Absent | Quant::SharedExp => 0.0,
        Quant::Half => half::f16::from_bits(raw as u16).to_f64(),
        Quant::Float => f32::from_bits(raw as u32) as f64,
        Quant::Float64 => f64::from_bits(raw as u64),
        Quant::SmallFloat(m) => decode_small_float(raw as u32, m),
        Quant::Snorm(_) | Quant::Sint(_) => value_of(q, sign_extend(raw, bits)),
        Quant::Unorm(_) | Quant::Uint(_) => value_of(q, raw as i64),
    }
}

/// Decode one sRGB-encoded channel to linear.
pub fn srgb_to_linear(cs: f64) -> f64 {
    if cs <= 0.04045 {
        cs / 12.92
    } else {
        ((cs + 0.055) / 1.055).powf(2.4)
    }
}

/// Encode one linear channel to sRGB, clamping to `[0, 1]`.
pub fn linear_to_srgb(cl: f64) -> f64 {
    if cl.is_nan() || cl <= 0.0 {
        0.0
    } else if cl < 0.0031308 {
        12.92 * cl
    } else if cl < 1.0 {
        1.055 * cl.powf(0.41666) - 0.055
    } else {
        1.0
    }
}

/// Decode the color channels of an sRGB texel, leaving alpha alone.
pub fn srgb_texel_to_linear(t: [f64; 4]) -> [f64; 4] {
    [
        srgb_to_linear(t[0]),
        srgb_to_linear(t[1]),
        srgb_to_linear(t[2]),
        t[3],
    ]
}

/// Encode the color channels of a linear texel to sRGB, leaving alpha alone.
pub fn linear_texel_to_srgb(t: [f64; 4]) -> [f64; 4] {
    [
        linear_to_srgb(t[0]),
        linear_to_srgb(t[1]),
        linear_to_srgb(t[2]),
        t[3],
    ]
}

/// Dense `width × height × depth` texel array with a format.
///
/// For flat array images the depth axis holds array layers.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    format: PixelFormat,
    extent: Extent3,
    quant: [Quant; 4],
    texels: Vec<[f64; 4]>,
}

impl PixelBuffer {
    /// A buffer with every texel at [`DEFAULT_TEXEL`].
    pub fn new(format: PixelFormat, extent: Extent3) -> Self {
        Self::filled(format, extent, DEFAULT_TEXEL)
    }

    /// A buffer with every texel set to `value` (quantized).
    pub fn filled(format: PixelFormat, extent: Extent3, value: [f64; 4]) -> Self {
        let quant = quant_table(&format);
        let texel = quantize(&quant, value);
        Self {
            format,
            extent,
            quant,
            texels: vec![texel; extent.texel_count()],
        }
    }

    /// Build a buffer from per-texel values, x fastest then y then z.
    pub fn from_texels(
        format: PixelFormat,
        extent: Extent3,
        mut texels: Vec<[f64; 4]>,
    ) -> Result<Self, VerifyError> {
        if texels.len() != extent.texel_count() {
            return Err(VerifyError::DataLength {
                expected: extent.texel_count(),
                actual: texels.len(),
            });
        }
        let quant = quant_table(&format);
        for t in texels.iter_mut() {
            *t = quantize(&quant, *t);
        }
        Ok(Self {
            format,
            extent,
            quant,
            texels,
        })
    }

    /// Build a buffer by evaluating `f(x, y, z)` for every texel.
    pub fn from_fn(
        format: PixelFormat,
        extent: Extent3,
        mut f: impl FnMut(u32, u32, u32) -> [f64; 4],
    ) -> Self {
        let quant = quant_table(&format);
        let mut texels = Vec::with_capacity(extent.texel_count());
        for z in 0..extent.depth {
            for y in 0..extent.height {
                for x in 0..extent.width {
                    texels.push(quantize(&quant, f(x, y, z)));
                }
            }
        }
        Self {
            format,
            extent,
            quant,
            texels,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn extent(&self) -> Extent3 {
        self.extent
    }

    /// All texels, x fastest.
    pub fn texels(&self) -> &[[f64; 4]] {
        &self.texels
    }

    fn index(&self, x: u32, y: u32, z: u32) -> usize {
        debug_assert!(x < self.extent.width && y < self.extent.height && z < self.extent.depth);
        ((z as usize * self.extent.height as usize) + y as usize) * self.extent.width as usize
            + x as usize
    }

    /// Float view of a texel. Integer channels read as whole numbers.
    pub fn pixel(&self, x: u32, y: u32, z: u32) -> [f64; 4] {
        self.texels[self.index(x, y, z)]
    }

    /// Float view with sRGB color channels decoded to linear.
    pub fn pixel_linear(&self, x: u32, y: u32, z: u32) -> [f64; 4] {
        let t = self.pixel(x, y, z);
        if self.format.srgb {
            srgb_texel_to_linear(t)
        } else {
            t
        }
    }

    /// Stored integer view: the UNORM/SNORM code, the integer value, or the
    /// rounded value for float channels.
    pub fn pixel_int(&self, x: u32, y: u32, z: u32) -> [i64; 4] {
        let t = self.pixel(x, y, z);
        core::array::from_fn(|c| code_of(self.quant[c], t[c]))
    }

    /// Write a texel, quantizing it to the format.
    pub fn set_pixel(&mut self, x: u32, y: u32, z: u32, value: [f64; 4]) {
        let i = self.index(x, y, z);
        self.texels[i] = quantize(&self.quant, value);
    }

    /// Write a linear-space texel, encoding it to sRGB first when the format
    /// is sRGB.
    pub fn set_pixel_linear(&mut self, x: u32, y: u32, z: u32, value: [f64; 4]) {
        let value = if self.format.srgb {
            linear_texel_to_srgb(value)
        } else {
            value
        };
        self.set_pixel(x, y, z, value);
    }

    /// Write a texel from stored codes (see [`pixel_int`](Self::pixel_int)).
    pub fn set_pixel_int(&mut self, x: u32, y: u32, z: u32, code: [i64; 4]) {
        let value = core::array::from_fn(|c| value_of(self.quant[c], code[c]));
        self.set_pixel(x, y, z, value);
    }

    /// The texel as it sits in memory: a little-endian word of
    /// [`texel_size`](PixelFormat::texel_size) bytes, components placed per
    /// [`component_shifts`](PixelFormat::component_shifts).
    pub fn texel_bits(&self, x: u32, y: u32, z: u32) -> u128 {
        let order = self.format.order;
        let quant = swizzle_bgr(order, self.quant);
        let t = swizzle_bgr(order, self.pixel(x, y, z));
        if quant[0] == Quant::SharedExp {
            return encode_shared_exp([t[0], t[1], t[2]]);
        }
        let shifts = self.format.component_shifts();
        let bits = self.format.memory_bit_depth();
        (0..4).fold(0, |acc, c| acc | (encode_component(quant[c], t[c], bits[c]) << shifts[c]))
    }

    /// Write a texel from its in-memory bit pattern (see
    /// [`texel_bits`](Self::texel_bits)).
    ///
    /// Patterns the buffer can't hold are quantized like any other write:
    /// NaN and infinity in small floats, and the most negative SNORM code,
    /// which reads back as `-1.0`.
    pub fn set_texel_bits(&mut self, x: u32, y: u32, z: u32, raw: u128) {
        let order = self.format.order;
        let quant = swizzle_bgr(order, self.quant);
        let value = if quant[0] == Quant::SharedExp {
            let [r, g, b] = decode_shared_exp(raw);
            [r, g, b, DEFAULT_TEXEL[3]]
        } else {
            let shifts = self.format.component_shifts();
            let bits = self.format.memory_bit_depth();
            core::array::from_fn(|c| {
                if bits[c] == 0 {
                    return DEFAULT_TEXEL[c];
                }
                decode_component(quant[c], (raw >> shifts[c]) & low_bits(bits[c]), bits[c])
            })
        };
        self.set_pixel(x, y, z, swizzle_bgr(order, value));
    }

    /// Set every texel to `value`.
    pub fn fill(&mut self, value: [f64; 4]) {
        let t = quantize(&self.quant, value);
        self.texels.fill(t);
    }

    /// Whether `b` lies inside this buffer.
    pub fn contains_box(&self, b: &Box3) -> bool {
        b.fits_within(self.extent)
    }

    pub(crate) fn check_box(&self, b: &Box3) -> Result<(), VerifyError> {
        if self.contains_box(b) {
            Ok(())
        } else {
            Err(VerifyError::RegionOutOfBounds {
                min: [b.min.x, b.min.y, b.min.z],
                max: [b.max.x, b.max.y, b.max.z],
                extent: self.extent,
            })
        }
    }

    /// Copy of the texels inside `b`, as a buffer of `b`'s extent.
    pub fn sub_buffer(&self, b: &Box3) -> Result<Self, VerifyError> {
        self.check_box(b)?;
        let e = b.extent();
        let mut texels = Vec::with_capacity(e.texel_count());
        for z in 0..e.depth {
            for y in 0..e.height {
                for x in 0..e.width {
                    texels.push(self.pixel(
                        b.min.x as u32 + x,
                        b.min.y as u32 + y,
                        b.min.z as u32 + z,
                    ));
                }
            }
        }
        Ok(Self {
            format: self.format,
            extent: e,
            quant: self.quant,
            texels,
        })
    }

    /// One aspect viewed as its own buffer.
    ///
    /// Combined depth/stencil buffers split into a depth-only buffer (depth
    /// in channel 0) and an 8-bit stencil buffer (stencil in channel 0).
    pub fn aspect(&self, aspect: Aspect) -> Result<Self, VerifyError> {
        let format = self.aspect_format(aspect)?;
        if format == self.format {
            return Ok(self.clone());
        }
        let channel = aspect_channel(aspect);
        let quant = quant_table(&format);
        let texels = self
            .texels
            .iter()
            .map(|t| quantize(&quant, [t[channel], 0.0, 0.0, 1.0]))
            .collect();
        Ok(Self {
            format,
            extent: self.extent,
            quant,
            texels,
        })
    }

    /// Overwrite one aspect from a single-aspect buffer of the same extent.
    pub fn write_aspect(&mut self, aspect: Aspect, src: &PixelBuffer) -> Result<(), VerifyError> {
        let format = self.aspect_format(aspect)?;
        if src.format != format {
            return Err(VerifyError::FormatMismatch {
                expected: format,
                actual: src.format,
            });
        }
        if src.extent != self.extent {
            return Err(VerifyError::ExtentMismatch {
                expected: self.extent,
                actual: src.extent,
            });
        }
        if format == self.format {
            self.texels.clone_from(&src.texels);
            return Ok(());
        }
        let channel = aspect_channel(aspect);
        for (dst, s) in self.texels.iter_mut().zip(&src.texels) {
            let mut t = *dst;
            t[channel] = s[0];
            *dst = quantize(&self.quant, t);
        }
        Ok(())
    }

    fn aspect_format(&self, aspect: Aspect) -> Result<PixelFormat, VerifyError> {
        self.format
            .aspect_format(aspect)
            .ok_or(VerifyError::MissingAspect {
                format: self.format,
                aspect,
            })
    }
}

fn aspect_channel(aspect: Aspect) -> usize {
    match aspect {
        Aspect::Stencil => 1,
        _ => 0,
    }
}

fn quantize(quant: &[Quant; 4], value: [f64; 4]) -> [f64; 4] {
    let mut out: [f64; 4] =
        core::array::from_fn(|c| quantize_channel(quant[c], value[c], DEFAULT_TEXEL[c]));
    if quant[0] == Quant::SharedExp {
        let [r, g, b] = quantize_shared_exp([value[0], value[1], value[2]]);
        out[0] = r;
        out[1] = g;
        out[2] = b;
    }
    out
}
