//! Per-channel error bounds derived from pixel formats.
//!
//! Each comparison strategy asks for a [`Threshold`]: a float bound (compared
//! against float views), an integer bound (compared against stored codes), or
//! [`Threshold::Incompatible`] when the source and destination can't be
//! compared numerically at all.
//!
//! ```
//! use zenblit::{Compression, FilterMode, PixelFormat, Threshold, ToleranceConfig, filtered_threshold};
//!
//! let cfg = ToleranceConfig::default();
//! let t = filtered_threshold(
//!     &PixelFormat::RGBA8_UINT,
//!     &PixelFormat::RGBA8_UNORM,
//!     FilterMode::Linear,
//!     Compression::NONE,
//!     &cfg,
//! );
//! assert_eq!(t, Threshold::Incompatible);
//! ```

use num_traits::Float;

use crate::format::{ChannelClass, ChannelType, CompressedFamily, CompressedFormat, PixelFormat, swizzle_bgr};
use crate::resample::FilterMode;

/// Float error bound per channel. Masked-out channels never fail.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ToleranceVector {
    pub values: [f64; 4],
    pub mask: [bool; 4],
}

impl ToleranceVector {
    /// All channels checked.
    pub const fn new(values: [f64; 4]) -> Self {
        Self {
            values,
            mask: [true; 4],
        }
    }

    /// Same bound on every channel.
    pub const fn splat(v: f64) -> Self {
        Self::new([v; 4])
    }

    pub fn with_mask(mut self, mask: [bool; 4]) -> Self {
        self.mask = mask;
        self
    }

    /// Whether `a` and `b` agree within the bound on every checked channel.
    pub fn accepts(&self, a: [f64; 4], b: [f64; 4]) -> bool {
        (0..4).all(|c| !self.mask[c] || (a[c] - b[c]).abs() <= self.values[c])
    }

    fn zip(self, other: Self, f: impl Fn(f64, f64) -> f64) -> Self {
        Self {
            values: core::array::from_fn(|c| f(self.values[c], other.values[c])),
            mask: core::array::from_fn(|c| self.mask[c] && other.mask[c]),
        }
    }

    fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            values: self.values.map(f),
            mask: self.mask,
        }
    }
}

/// Integer error bound per channel, in stored-code steps.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IntToleranceVector {
    pub values: [u64; 4],
    pub mask: [bool; 4],
}

impl IntToleranceVector {
    pub const fn new(values: [u64; 4]) -> Self {
        Self {
            values,
            mask: [true; 4],
        }
    }

    pub fn with_mask(mut self, mask: [bool; 4]) -> Self {
        self.mask = mask;
        self
    }

    /// Whether `a` and `b` agree within the bound on every checked channel.
    pub fn accepts(&self, a: [i64; 4], b: [i64; 4]) -> bool {
        (0..4).all(|c| !self.mask[c] || a[c].abs_diff(b[c]) <= self.values[c])
    }
}

/// Outcome of tolerance derivation for a source/destination pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Threshold {
    Float(ToleranceVector),
    Int(IntToleranceVector),
    /// Integer-backed and non-integer-backed formats were mixed. Comparison
    /// must fail unconditionally.
    Incompatible,
}

/// Which sides of a blit involve block-compressed data.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Compression {
    pub src: Option<CompressedFormat>,
    pub dst: Option<CompressedFormat>,
}

impl Compression {
    pub const NONE: Self = Self {
        src: None,
        dst: None,
    };

    pub const fn src(format: CompressedFormat) -> Self {
        Self {
            src: Some(format),
            dst: None,
        }
    }

    pub const fn dst(format: CompressedFormat) -> Self {
        Self {
            src: None,
            dst: Some(format),
        }
    }

    pub fn is_none(&self) -> bool {
        self.src.is_none() && self.dst.is_none()
    }
}

/// Extra error absorbed when a side is block compressed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CompressedEpsilon {
    /// Added to each side's bound on the nearest path.
    pub nearest: f64,
    /// Added once to the combined bound on the filtered path.
    pub filtered: f64,
}

impl Default for CompressedEpsilon {
    fn default() -> Self {
        Self {
            nearest: 0.04,
            filtered: 0.06,
        }
    }
}

/// Tunable constants for tolerance derivation.
///
/// Defaults match the values hardware conformance suites are validated
/// against. Setters consume and return `self`.
///
/// ```
/// use zenblit::{CompressedEpsilon, CompressedFamily, ToleranceConfig};
///
/// let cfg = ToleranceConfig::new()
///     .epsilon(CompressedFamily::Astc, CompressedEpsilon { nearest: 0.05, filtered: 0.08 })
///     .cubic_multiplier(2.0);
/// assert_eq!(cfg.epsilon_for(CompressedFamily::Astc).filtered, 0.08);
/// assert_eq!(cfg.epsilon_for(CompressedFamily::Bc).filtered, 0.06);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ToleranceConfig {
    etc: CompressedEpsilon,
    eac: CompressedEpsilon,
    astc: CompressedEpsilon,
    bc: CompressedEpsilon,
    cubic_multiplier: f64,
    srgb_multiplier: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            etc: CompressedEpsilon::default(),
            eac: CompressedEpsilon::default(),
            astc: CompressedEpsilon::default(),
            bc: CompressedEpsilon::default(),
            cubic_multiplier: 1.5,
            srgb_multiplier: 2.0,
        }
    }
}

impl ToleranceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the compressed epsilon for one family.
    pub fn epsilon(mut self, family: CompressedFamily, eps: CompressedEpsilon) -> Self {
        *self.epsilon_mut(family) = eps;
        self
    }

    /// Multiplier applied to the combined filtered bound for cubic filtering.
    pub fn cubic_multiplier(mut self, m: f64) -> Self {
        self.cubic_multiplier = m;
        self
    }

    /// Multiplier applied to an sRGB source's bound on the filtered path.
    pub fn srgb_multiplier(mut self, m: f64) -> Self {
        self.srgb_multiplier = m;
        self
    }

    pub fn epsilon_for(&self, family: CompressedFamily) -> CompressedEpsilon {
        match family {
            CompressedFamily::Etc => self.etc,
            CompressedFamily::Eac => self.eac,
            CompressedFamily::Astc => self.astc,
            CompressedFamily::Bc => self.bc,
        }
    }

    fn epsilon_mut(&mut self, family: CompressedFamily) -> &mut CompressedEpsilon {
        match family {
            CompressedFamily::Etc => &mut self.etc,
            CompressedFamily::Eac => &mut self.eac,
            CompressedFamily::Astc => &mut self.astc,
            CompressedFamily::Bc => &mut self.bc,
        }
    }

    fn filter_multiplier(&self, filter: FilterMode) -> f64 {
        match filter {
            FilterMode::Cubic => self.cubic_multiplier,
            _ => 1.0,
        }
    }
}

/// Error of converting to a float with `bits` of mantissa.
///
/// `clamp(1 / max(2^bits - 1, 1), 0, 1)`, or `1.0` when the channel has no
/// bits.
pub fn float_conversion_error(bits: u32) -> f64 {
    if bits == 0 {
        return 1.0;
    }
    let max = (2f64.powi(bits.min(32) as i32) - 1.0).max(1.0);
    (1.0 / max).clamp(0.0, 1.0)
}

/// One quantization step of a normalized channel: `range / (2^bits - 1)`.
pub fn fixed_point_step(bits: u32, signed: bool) -> f64 {
    if bits == 0 {
        return 1.0;
    }
    let range = if signed { 2.0 } else { 1.0 };
    range / (2f64.powi(bits as i32) - 1.0)
}

/// Float-path bound for a format, in semantic channel order.
///
/// Lossy packed encodings carry hand-tuned overrides; everything else is
/// derived from the mantissa bit depth.
pub fn format_threshold(format: &PixelFormat) -> ToleranceVector {
    let memory_order = match format.ty {
        ChannelType::Half => [0.005; 4],
        ChannelType::Float | ChannelType::Float64 => [0.001; 4],
        ChannelType::Ufloat11_11_10 => [0.02, 0.02, 0.0625, 1.0],
        ChannelType::Ufloat999E5 => [0.05, 0.05, 0.05, 1.0],
        ChannelType::Unorm1010102 => [0.002, 0.002, 0.002, 0.3],
        ChannelType::Unorm8 => [0.008; 4],
        _ => format.memory_mantissa_bit_depth().map(float_conversion_error),
    };
    ToleranceVector::new(swizzle_bgr(format.order, memory_order)).with_mask(format.channel_mask())
}

/// Quantization step of each channel of a normalized format.
pub fn fixed_point_threshold(format: &PixelFormat) -> ToleranceVector {
    let signed = format.class() == ChannelClass::SignedNormalized;
    ToleranceVector::new(format.bit_depth().map(|b| fixed_point_step(b, signed)))
        .with_mask(format.channel_mask())
}

/// [`format_threshold`] for float formats, [`fixed_point_threshold`]
/// otherwise.
pub fn float_or_fixed_threshold(format: &PixelFormat) -> ToleranceVector {
    if format.is_float() {
        format_threshold(format)
    } else {
        fixed_point_threshold(format)
    }
}

/// Bound for decoded block-compressed data.
///
/// BC6H uses a fixed constant; every other format is one quantization step
/// of its effective per-channel precision.
pub fn compressed_threshold(format: &CompressedFormat) -> ToleranceVector {
    match format {
        CompressedFormat::Bc6hSfloat => return ToleranceVector::splat(0.01),
        CompressedFormat::Bc6hUfloat => return ToleranceVector::splat(0.005),
        _ => {}
    }
    let signed = format.is_signed();
    ToleranceVector::new(format.bit_depth().map(|b| fixed_point_step(b, signed)))
}

/// Integer lookup precision for the nearest path: `max(src/8, dst/8, 1)`
/// steps per channel, checked where the destination has bits.
pub fn int_nearest_precision(src: &PixelFormat, dst: &PixelFormat) -> IntToleranceVector {
    let s = src.bit_depth();
    let d = dst.bit_depth();
    IntToleranceVector::new(core::array::from_fn(|c| {
        (s[c] as u64 / 8).max(d[c] as u64 / 8).max(1)
    }))
    .with_mask(dst.channel_mask())
}

/// Stored-code bound for filtered blits into non-float destinations.
///
/// `1 + max((2^dst - 1) / clamp(2^src - 1, 1, 256), 1)`: a narrow source
/// expanded into a wide destination may land anywhere in a block of codes.
pub fn filtered_int_threshold(src: &PixelFormat, dst: &PixelFormat) -> IntToleranceVector {
    let s = src.bit_depth();
    let d = dst.bit_depth();
    IntToleranceVector::new(core::array::from_fn(|c| {
        let dst_max = (1u64 << d[c].min(63)) - 1;
        let src_max = ((1u64 << s[c].min(63)) - 1).clamp(1, 256);
        1 + (dst_max / src_max).max(1)
    }))
    .with_mask(dst.channel_mask())
}

fn classes_compatible(src: &PixelFormat, dst: &PixelFormat) -> bool {
    src.is_integer() == dst.is_integer()
}

/// Threshold for a filtered (linear or cubic) blit.
pub fn filtered_threshold(
    src: &PixelFormat,
    dst: &PixelFormat,
    filter: FilterMode,
    compression: Compression,
    cfg: &ToleranceConfig,
) -> Threshold {
    if !classes_compatible(src, dst) {
        return Threshold::Incompatible;
    }
    let multiplier = cfg.filter_multiplier(filter);

    if let Some(c) = compression.src {
        let dst_diff = match compression.dst {
            Some(d) => compressed_threshold(&d),
            None => format_threshold(dst),
        };
        let eps = cfg.epsilon_for(c.family()).filtered;
        let t = compressed_threshold(&c)
            .zip(dst_diff, |a, b| (a + b) * multiplier + eps)
            .with_mask(dst.channel_mask());
        return Threshold::Float(t);
    }

    if dst.is_float() {
        let srgb = if src.srgb { cfg.srgb_multiplier } else { 1.0 };
        let mut src_diff = format_threshold(src).map(|v| v * srgb);
        src_diff.mask = [true; 4];
        let dst_diff = match compression.dst {
            Some(d) => compressed_threshold(&d),
            None => format_threshold(dst),
        };
        let mut t = src_diff.zip(dst_diff, |a, b| (a + b) * multiplier);
        if let Some(d) = compression.dst {
            let eps = cfg.epsilon_for(d.family()).filtered;
            t = t.map(|v| v + eps);
        }
        Threshold::Float(t.with_mask(dst.channel_mask()))
    } else {
        Threshold::Int(filtered_int_threshold(src, dst))
    }
}

/// Threshold for a nearest-filtered blit.
pub fn nearest_threshold(
    src: &PixelFormat,
    dst: &PixelFormat,
    compression: Compression,
    cfg: &ToleranceConfig,
) -> Threshold {
    if !classes_compatible(src, dst) {
        return Threshold::Incompatible;
    }
    if dst.is_integer() {
        return Threshold::Int(int_nearest_precision(src, dst));
    }
    let side = |format: &PixelFormat, compressed: Option<CompressedFormat>| match compressed {
        Some(c) => {
            let eps = cfg.epsilon_for(c.family()).nearest;
            compressed_threshold(&c).map(|v| v + eps)
        }
        None => {
            let mut t = float_or_fixed_threshold(format);
            t.mask = [true; 4];
            t
        }
    };
    let s = side(src, compression.src);
    let d = side(dst, compression.dst);
    Threshold::Float(s.zip(d, f64::max).with_mask(dst.channel_mask()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ChannelOrder;
    use proptest::prelude::*;
    use rstest::rstest;

    fn cfg() -> ToleranceConfig {
        ToleranceConfig::default()
    }

    fn float(t: Threshold) -> ToleranceVector {
        match t {
            Threshold::Float(v) => v,
            other => panic!("expected float threshold, got {other:?}"),
        }
    }

    fn int(t: Threshold) -> IntToleranceVector {
        match t {
            Threshold::Int(v) => v,
            other => panic!("expected int threshold, got {other:?}"),
        }
    }

    #[rstest]
    #[case(PixelFormat::RGBA16_SFLOAT, [0.005; 4])]
    #[case(PixelFormat::RGBA32_SFLOAT, [0.001; 4])]
    #[case(PixelFormat::R64_SFLOAT, [0.001; 4])]
    #[case(PixelFormat::B10G11R11_UFLOAT, [0.02, 0.02, 0.0625, 1.0])]
    #[case(PixelFormat::E5B9G9R9_UFLOAT, [0.05, 0.05, 0.05, 1.0])]
    #[case(PixelFormat::A2B10G10R10_UNORM, [0.002, 0.002, 0.002, 0.3])]
    #[case(PixelFormat::RGBA8_UNORM, [0.008; 4])]
    #[case(PixelFormat::RGBA16_UNORM, [1.0 / 65535.0; 4])]
    #[case(PixelFormat::RGBA8_SNORM, [1.0 / 127.0; 4])]
    #[case(PixelFormat::R5G6B5_UNORM, [1.0 / 31.0, 1.0 / 63.0, 1.0 / 31.0, 1.0])]
    fn format_thresholds(#[case] format: PixelFormat, #[case] expected: [f64; 4]) {
        assert_eq!(format_threshold(&format).values, expected);
    }

    #[test]
    fn packed_overrides_follow_bgr_order() {
        let bgr = PixelFormat::new(ChannelOrder::Bgr, ChannelType::Ufloat11_11_10);
        assert_eq!(format_threshold(&bgr).values, [0.0625, 0.02, 0.02, 1.0]);
        let b565 = format_threshold(&PixelFormat::B5G6R5_UNORM).values;
        assert_eq!(b565[0], 1.0 / 31.0);
        assert_eq!(b565[1], 1.0 / 63.0);
    }

    #[rstest]
    #[case(PixelFormat::RGBA8_UNORM, [1.0 / 255.0; 4])]
    #[case(PixelFormat::RGBA8_SNORM, [2.0 / 255.0; 4])]
    #[case(PixelFormat::RGB8_UNORM, [1.0 / 255.0, 1.0 / 255.0, 1.0 / 255.0, 1.0])]
    #[case(PixelFormat::RGBA16_SFLOAT, [0.005; 4])]
    fn float_or_fixed(#[case] format: PixelFormat, #[case] expected: [f64; 4]) {
        assert_eq!(float_or_fixed_threshold(&format).values, expected);
    }

    #[test]
    fn rgb_format_masks_alpha() {
        let t = fixed_point_threshold(&PixelFormat::RGB8_UNORM);
        assert_eq!(t.mask, [true, true, true, false]);
        assert!(t.accepts([0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0]));
        assert!(!t.accepts([0.0, 0.0, 0.0, 0.0], [0.01, 0.0, 0.0, 0.0]));
    }

    #[rstest]
    #[case(CompressedFormat::EacSignedR11, [2.0 / 127.0, 1.0, 1.0, 1.0])]
    #[case(CompressedFormat::EacRg11, [1.0 / 255.0, 1.0 / 255.0, 1.0, 1.0])]
    #[case(CompressedFormat::Etc2Rgb8A1, [1.0 / 255.0, 1.0 / 255.0, 1.0 / 255.0, 1.0])]
    #[case(CompressedFormat::Bc1Rgb, [1.0 / 31.0, 1.0 / 63.0, 1.0 / 31.0, 1.0])]
    #[case(CompressedFormat::Bc7, [1.0 / 31.0, 1.0 / 31.0, 1.0 / 31.0, 1.0])]
    #[case(CompressedFormat::Bc5Snorm, [2.0 / 127.0, 2.0 / 127.0, 1.0, 1.0])]
    #[case(CompressedFormat::Bc6hSfloat, [0.01; 4])]
    #[case(CompressedFormat::Bc6hUfloat, [0.005; 4])]
    fn compressed_thresholds(#[case] format: CompressedFormat, #[case] expected: [f64; 4]) {
        assert_eq!(compressed_threshold(&format).values, expected);
    }

    #[rstest]
    #[case(PixelFormat::RGBA8_UINT, PixelFormat::RGBA8_UINT, [1; 4])]
    #[case(PixelFormat::RGBA16_UINT, PixelFormat::RGBA8_UINT, [2; 4])]
    #[case(PixelFormat::RGBA32_SINT, PixelFormat::RGBA16_SINT, [4; 4])]
    fn int_nearest(#[case] src: PixelFormat, #[case] dst: PixelFormat, #[case] expected: [u64; 4]) {
        assert_eq!(int_nearest_precision(&src, &dst).values, expected);
        assert_eq!(int(nearest_threshold(&src, &dst, Compression::NONE, &cfg())).values, expected);
    }

    #[rstest]
    #[case(PixelFormat::RGBA8_UNORM, PixelFormat::RGBA8_UNORM, [2; 4])]
    #[case(PixelFormat::RGBA8_UNORM, PixelFormat::RGBA16_UNORM, [258; 4])]
    #[case(PixelFormat::RGBA16_UNORM, PixelFormat::RGBA8_UNORM, [2; 4])]
    #[case(PixelFormat::R5G6B5_UNORM, PixelFormat::RGBA8_UNORM, [9, 5, 9, 256])]
    fn filtered_int(#[case] src: PixelFormat, #[case] dst: PixelFormat, #[case] expected: [u64; 4]) {
        assert_eq!(filtered_int_threshold(&src, &dst).values, expected);
    }

    #[rstest]
    #[case(PixelFormat::RGBA8_UINT, PixelFormat::RGBA8_UNORM)]
    #[case(PixelFormat::RGBA8_UNORM, PixelFormat::RGBA16_SINT)]
    #[case(PixelFormat::RGBA32_SFLOAT, PixelFormat::RGBA32_UINT)]
    fn mixed_integer_classes_are_incompatible(#[case] src: PixelFormat, #[case] dst: PixelFormat) {
        for filter in [FilterMode::Linear, FilterMode::Cubic] {
            assert_eq!(
                filtered_threshold(&src, &dst, filter, Compression::NONE, &cfg()),
                Threshold::Incompatible
            );
        }
        assert_eq!(
            nearest_threshold(&src, &dst, Compression::NONE, &cfg()),
            Threshold::Incompatible
        );
    }

    #[test]
    fn filtered_float_destination() {
        let t = float(filtered_threshold(
            &PixelFormat::RGBA8_SRGB,
            &PixelFormat::RGBA16_SFLOAT,
            FilterMode::Linear,
            Compression::NONE,
            &cfg(),
        ));
        assert_eq!(t.values, [0.008 * 2.0 + 0.005; 4]);

        let t = float(filtered_threshold(
            &PixelFormat::RGBA8_UNORM,
            &PixelFormat::RGBA32_SFLOAT,
            FilterMode::Cubic,
            Compression::NONE,
            &cfg(),
        ));
        assert_eq!(t.values, [(0.008 + 0.001) * 1.5; 4]);
    }

    #[test]
    fn filtered_unorm_destination_uses_codes() {
        let t = filtered_threshold(
            &PixelFormat::RGBA8_UNORM,
            &PixelFormat::RGBA8_UNORM,
            FilterMode::Linear,
            Compression::NONE,
            &cfg(),
        );
        assert_eq!(int(t).values, [2; 4]);
    }

    #[test]
    fn compressed_source_adds_epsilon() {
        let t = float(filtered_threshold(
            &PixelFormat::RGBA8_UNORM,
            &PixelFormat::RGBA16_SFLOAT,
            FilterMode::Linear,
            Compression::src(CompressedFormat::Etc2EacRgba8),
            &cfg(),
        ));
        assert!((t.values[0] - (1.0 / 255.0 + 0.005 + 0.06)).abs() < 1e-12);

        let t = float(nearest_threshold(
            &PixelFormat::RGBA8_UNORM,
            &PixelFormat::RGBA8_UNORM,
            Compression::src(CompressedFormat::Bc1Rgb),
            &cfg(),
        ));
        assert!((t.values[1] - (1.0 / 63.0 + 0.04)).abs() < 1e-12);
        assert!((t.values[3] - 1.04).abs() < 1e-12);
    }

    #[test]
    fn compressed_epsilon_is_configurable_per_family() {
        let cfg = ToleranceConfig::new().epsilon(
            CompressedFamily::Bc,
            CompressedEpsilon {
                nearest: 0.0,
                filtered: 0.1,
            },
        );
        let t = float(nearest_threshold(
            &PixelFormat::RGBA8_UNORM,
            &PixelFormat::RGBA8_UNORM,
            Compression::src(CompressedFormat::Bc7),
            &cfg,
        ));
        assert_eq!(t.values[0], 1.0 / 31.0);

        let astc = CompressedFormat::Astc {
            block_width: 4,
            block_height: 4,
            srgb: false,
        };
        let t = float(nearest_threshold(
            &PixelFormat::RGBA8_UNORM,
            &PixelFormat::RGBA8_UNORM,
            Compression::src(astc),
            &cfg,
        ));
        assert!((t.values[0] - (1.0 / 255.0 + 0.04)).abs() < 1e-12);
    }

    #[test]
    fn nearest_float_takes_the_wider_side() {
        let t = float(nearest_threshold(
            &PixelFormat::RGBA16_UNORM,
            &PixelFormat::RGB8_UNORM,
            Compression::NONE,
            &cfg(),
        ));
        assert_eq!(t.values[0], 1.0 / 255.0);
        assert_eq!(t.mask, [true, true, true, false]);
    }

    const FILTER_PAIRS: &[(PixelFormat, PixelFormat)] = &[
        (PixelFormat::RGBA8_UNORM, PixelFormat::RGBA16_SFLOAT),
        (PixelFormat::RGBA8_SRGB, PixelFormat::RGBA32_SFLOAT),
        (PixelFormat::B10G11R11_UFLOAT, PixelFormat::B10G11R11_UFLOAT),
        (PixelFormat::RGBA16_UNORM, PixelFormat::RGBA8_UNORM),
        (PixelFormat::RGBA8_UINT, PixelFormat::RGBA16_UINT),
    ];

    proptest! {
        #[test]
        fn fixed_point_tolerance_never_grows_with_bits(bits in 1u32..32, signed in any::<bool>()) {
            prop_assert!(fixed_point_step(bits + 1, signed) <= fixed_point_step(bits, signed));
        }

        #[test]
        fn float_tolerance_never_grows_with_mantissa(bits in 0u32..40) {
            prop_assert!(float_conversion_error(bits + 1) <= float_conversion_error(bits));
        }

        #[test]
        fn cubic_dominates_linear(idx in 0usize..FILTER_PAIRS.len()) {
            let (src, dst) = FILTER_PAIRS[idx];
            let linear = filtered_threshold(&src, &dst, FilterMode::Linear, Compression::NONE, &cfg());
            let cubic = filtered_threshold(&src, &dst, FilterMode::Cubic, Compression::NONE, &cfg());
            match (linear, cubic) {
                (Threshold::Float(l), Threshold::Float(c)) => {
                    for ch in 0..4 {
                        prop_assert!(c.values[ch] >= l.values[ch]);
                    }
                }
                (Threshold::Int(l), Threshold::Int(c)) => prop_assert!(c.values >= l.values),
                other => prop_assert!(false, "unexpected pair {:?}", other),
            }
        }
    }
}
