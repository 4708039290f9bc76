//! Texel-level acceptance checks.
//!
//! Two strategies, picked by filter mode:
//!
//! - [`compare_nearest`] checks every destination texel against the source
//!   texel it must have been nearest-sampled from, allowing for coordinate
//!   rounding at texel boundaries.
//! - [`compare_filtered`] checks every texel against the clamped reference
//!   and, failing that, the unclamped one.
//!
//! [`compare_exact`] handles plain copies. All three keep going after the
//! first mismatch and paint an RGB8 error mask: green where a texel passed,
//! red where it failed.

use num_traits::Float;

use crate::buffer::PixelBuffer;
use crate::error::VerifyError;
use crate::format::{ChannelClass, ChannelType, CompressedFormat, PixelFormat};
use crate::region::{Extent3, NormalizedRegion};
use crate::resample::ReferenceSet;
use crate::tolerance::{IntToleranceVector, Threshold, ToleranceVector};

/// Format of error masks.
pub const ERROR_MASK_FORMAT: PixelFormat = PixelFormat::RGB8_UNORM;
/// Mask color of a texel that passed (or wasn't checked).
pub const MASK_OK: [f64; 4] = [0.0, 1.0, 0.0, 1.0];
/// Mask color of a texel that failed.
pub const MASK_ERROR: [f64; 4] = [1.0, 0.0, 0.0, 1.0];

/// Accurate bits of a normalized lookup coordinate.
const COORD_BITS: u32 = 22;
/// Sub-texel precision bits of an unnormalized coordinate.
const SUBTEXEL_BITS: u32 = 16;

/// Why a comparison was refused outright.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// One side is integer-backed and the other isn't.
    MixedIntegerClass,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    /// Never compared; always a failure.
    Rejected(Rejection),
}

/// Result of one comparison.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonOutcome {
    pub verdict: Verdict,
    /// `None` when the comparison was rejected.
    pub error_mask: Option<PixelBuffer>,
    pub mismatches: usize,
}

impl ComparisonOutcome {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    pub fn rejected(reason: Rejection) -> Self {
        log::warn!("comparison rejected: {reason:?}");
        Self {
            verdict: Verdict::Rejected(reason),
            error_mask: None,
            mismatches: 0,
        }
    }

    /// A passing outcome with an all-green mask over `extent`.
    pub(crate) fn clean(extent: Extent3) -> Self {
        Self {
            verdict: Verdict::Pass,
            error_mask: Some(PixelBuffer::filled(ERROR_MASK_FORMAT, extent, MASK_OK)),
            mismatches: 0,
        }
    }

    /// Combine outcomes of checks over disjoint parts of one image.
    ///
    /// A rejection on either side rejects the whole; otherwise masks are
    /// unioned and mismatch counts summed.
    pub fn merge(self, other: Self) -> Self {
        let verdict = match (self.verdict, other.verdict) {
            (Verdict::Rejected(r), _) | (_, Verdict::Rejected(r)) => {
                return Self {
                    verdict: Verdict::Rejected(r),
                    error_mask: None,
                    mismatches: 0,
                };
            }
            (Verdict::Pass, Verdict::Pass) => Verdict::Pass,
            _ => Verdict::Fail,
        };
        let error_mask = match (self.error_mask, other.error_mask) {
            (Some(mut a), Some(b)) => {
                let e = a.extent();
                for z in 0..e.depth {
                    for y in 0..e.height {
                        for x in 0..e.width {
                            if b.pixel(x, y, z) == MASK_ERROR {
                                a.set_pixel(x, y, z, MASK_ERROR);
                            }
                        }
                    }
                }
                Some(a)
            }
            (a, b) => a.or(b),
        };
        Self {
            verdict,
            error_mask,
            mismatches: self.mismatches + other.mismatches,
        }
    }
}

struct ErrorMask {
    mask: PixelBuffer,
    mismatches: usize,
}

impl ErrorMask {
    fn for_result(result: &PixelBuffer) -> Self {
        Self {
            mask: PixelBuffer::filled(ERROR_MASK_FORMAT, result.extent(), MASK_OK),
            mismatches: 0,
        }
    }

    fn record(&mut self, x: u32, y: u32, z: u32, ok: bool) {
        if !ok {
            self.mask.set_pixel(x, y, z, MASK_ERROR);
            self.mismatches += 1;
        }
    }

    fn finish(self, what: &str) -> ComparisonOutcome {
        let verdict = if self.mismatches == 0 {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        log::debug!("{what}: {verdict:?}, {} mismatching texels", self.mismatches);
        ComparisonOutcome {
            verdict,
            error_mask: Some(self.mask),
            mismatches: self.mismatches,
        }
    }
}

fn check_same_shape(expected: &PixelBuffer, actual: &PixelBuffer) -> Result<(), VerifyError> {
    if expected.extent() != actual.extent() {
        return Err(VerifyError::ExtentMismatch {
            expected: expected.extent(),
            actual: actual.extent(),
        });
    }
    if expected.format() != actual.format() {
        return Err(VerifyError::FormatMismatch {
            expected: expected.format(),
            actual: actual.format(),
        });
    }
    Ok(())
}

/// Rounding error of a float with `bits` accurate mantissa bits at `v`.
fn float_coord_error(v: f64, bits: u32) -> f64 {
    if v == 0.0 || !v.is_finite() {
        return 0.0;
    }
    let exp = v.abs().log2().floor();
    let garbage = 2f64.powi(23 - bits as i32) - 1.0;
    2f64.powf(exp) * garbage / 2f64.powi(23)
}

/// Range of texels a nearest lookup at normalized `coord` may legally hit.
fn nearest_candidates(coord: f64, size: u32) -> (u32, u32) {
    let size_f = size as f64;
    let err = float_coord_error(coord, COORD_BITS);
    let fixed = 1.0 / 2f64.powi(SUBTEXEL_BITS as i32);
    let lo = ((coord - err) * size_f - fixed).floor() as i64;
    let hi = ((coord + err) * size_f + fixed).floor() as i64;
    let last = size.saturating_sub(1) as i64;
    (lo.clamp(0, last) as u32, hi.clamp(0, last) as u32)
}

/// Normalized source coordinates for every destination texel of a region.
fn for_each_region_texel(
    region: &NormalizedRegion,
    src_size: [u32; 3],
    mut f: impl FnMut([u32; 3], [f64; 3]),
) {
    let scale = region.scale();
    let de = region.dst.extent();
    let se = region.src.extent();
    for z in 0..de.depth {
        for y in 0..de.height {
            for x in 0..de.width {
                let p = [x, y, z];
                let norm: [f64; 3] = core::array::from_fn(|a| {
                    let t = (p[a] as f64 + 0.5) * scale[a];
                    let v = if region.mirror.axis(a) {
                        se.axis(a) as f64 - t
                    } else {
                        t
                    };
                    (v + region.src.min.axis(a) as f64) / src_size[a].max(1) as f64
                });
                let dst: [u32; 3] = core::array::from_fn(|a| p[a] + region.dst.min.axis(a) as u32);
                f(dst, norm);
            }
        }
    }
}

fn check_regions(
    source: &PixelBuffer,
    result: &PixelBuffer,
    regions: &[NormalizedRegion],
) -> Result<(), VerifyError> {
    for r in regions {
        source.check_box(&r.src)?;
        result.check_box(&r.dst)?;
    }
    Ok(())
}

/// Representable range of a destination channel class, applied to source
/// values before the float nearest lookup.
fn destination_domain(format: &PixelFormat) -> (f64, f64) {
    match (format.class(), format.ty) {
        (ChannelClass::UnsignedNormalized, _) => (0.0, 1.0),
        (ChannelClass::SignedNormalized, _) => (-1.0, 1.0),
        (_, ChannelType::Ufloat11_11_10 | ChannelType::Ufloat999E5) => (0.0, f64::INFINITY),
        _ => (f64::NEG_INFINITY, f64::INFINITY),
    }
}

fn integer_range(format: &PixelFormat) -> [(i64, i64); 4] {
    let bits = format.bit_depth();
    let signed = format.class() == ChannelClass::SignedInteger;
    bits.map(|b| match (b, signed) {
        (0, _) => (i64::MIN, i64::MAX),
        (b, true) => (-(1i64 << (b.min(63) - 1)), (1i64 << (b.min(63) - 1)) - 1),
        (b, false) => (0, ((1u64 << b.min(63)) - 1) as i64),
    })
}

/// Nearest-filter check of `result` against `source` over `regions`.
///
/// Texels outside every region are not checked.
///
/// ```
/// use zenblit::*;
///
/// let extent = Extent3::new(4, 4, 1);
/// let src = PixelBuffer::from_fn(PixelFormat::RGBA8_UNORM, extent, |x, y, _| {
///     [x as f64 / 4.0, y as f64 / 4.0, 0.0, 1.0]
/// });
/// let region = normalize(&CopyRegion::whole(extent, extent), ImageKind::Flat, ImageKind::Flat);
/// let t = nearest_threshold(&src.format(), &src.format(), Compression::NONE, &ToleranceConfig::default());
/// let outcome = compare_nearest(&src, &src, &[region], &t).unwrap();
/// assert!(outcome.passed());
/// ```
pub fn compare_nearest(
    source: &PixelBuffer,
    result: &PixelBuffer,
    regions: &[NormalizedRegion],
    threshold: &Threshold,
) -> Result<ComparisonOutcome, VerifyError> {
    check_regions(source, result, regions)?;
    match threshold {
        Threshold::Incompatible => Ok(ComparisonOutcome::rejected(Rejection::MixedIntegerClass)),
        Threshold::Float(t) => Ok(nearest_float(source, result, regions, t)),
        Threshold::Int(t) => Ok(nearest_int(source, result, regions, t)),
    }
}

fn nearest_lookup(
    source: &PixelBuffer,
    norm: [f64; 3],
    mut accept: impl FnMut(u32, u32, u32) -> bool,
) -> bool {
    let e = source.extent();
    let (x0, x1) = nearest_candidates(norm[0], e.width);
    let (y0, y1) = nearest_candidates(norm[1], e.height);
    let (z0, z1) = nearest_candidates(norm[2], e.depth);
    (z0..=z1).any(|z| (y0..=y1).any(|y| (x0..=x1).any(|x| accept(x, y, z))))
}

fn nearest_float(
    source: &PixelBuffer,
    result: &PixelBuffer,
    regions: &[NormalizedRegion],
    t: &ToleranceVector,
) -> ComparisonOutcome {
    let (lo, hi) = destination_domain(&result.format());
    let e = source.extent();
    let mut mask = ErrorMask::for_result(result);
    for region in regions {
        for_each_region_texel(region, [e.width, e.height, e.depth], |d, norm| {
            let got = result.pixel_linear(d[0], d[1], d[2]);
            let ok = nearest_lookup(source, norm, |x, y, z| {
                let expected = source.pixel_linear(x, y, z).map(|v| v.clamp(lo, hi));
                t.accepts(expected, got)
            });
            mask.record(d[0], d[1], d[2], ok);
        });
    }
    mask.finish("nearest float compare")
}

fn nearest_int(
    source: &PixelBuffer,
    result: &PixelBuffer,
    regions: &[NormalizedRegion],
    t: &IntToleranceVector,
) -> ComparisonOutcome {
    let range = integer_range(&result.format());
    let e = source.extent();
    let mut mask = ErrorMask::for_result(result);
    for region in regions {
        for_each_region_texel(region, [e.width, e.height, e.depth], |d, norm| {
            let got = result.pixel_int(d[0], d[1], d[2]);
            let ok = nearest_lookup(source, norm, |x, y, z| {
                let raw = source.pixel_int(x, y, z);
                let expected = core::array::from_fn(|c| raw[c].clamp(range[c].0, range[c].1));
                t.accepts(expected, got)
            });
            mask.record(d[0], d[1], d[2], ok);
        });
    }
    mask.finish("nearest int compare")
}

/// Filtered-blit check of `result` against a [`ReferenceSet`].
///
/// Every texel of the image is checked, so texels no region wrote must still
/// match the destination's prior contents carried in the references.
pub fn compare_filtered(
    result: &PixelBuffer,
    references: &ReferenceSet,
    threshold: &Threshold,
) -> Result<ComparisonOutcome, VerifyError> {
    for r in references.iter() {
        check_same_shape(r, result)?;
    }
    let t = match threshold {
        Threshold::Incompatible => {
            return Ok(ComparisonOutcome::rejected(Rejection::MixedIntegerClass));
        }
        t => t,
    };
    let e = result.extent();
    let mut mask = ErrorMask::for_result(result);
    let mut via_unclamped = 0usize;
    for z in 0..e.depth {
        for y in 0..e.height {
            for x in 0..e.width {
                let within = |r: &PixelBuffer| match t {
                    Threshold::Float(v) => v.accepts(r.pixel(x, y, z), result.pixel(x, y, z)),
                    Threshold::Int(v) => v.accepts(r.pixel_int(x, y, z), result.pixel_int(x, y, z)),
                    Threshold::Incompatible => false,
                };
                let ok = if within(&references.clamped) {
                    true
                } else if references.unclamped.as_ref().is_some_and(|u| within(u)) {
                    via_unclamped += 1;
                    true
                } else {
                    false
                };
                mask.record(x, y, z, ok);
            }
        }
    }
    if via_unclamped > 0 {
        log::debug!("{via_unclamped} texels matched only the unclamped reference");
    }
    Ok(mask.finish("filtered compare"))
}

/// Depth tolerance of an exact copy check.
pub const EXACT_DEPTH_THRESHOLD: f64 = 0.1;

/// Exact check for plain, non-scaling copies.
///
/// Depth/stencil formats allow [`EXACT_DEPTH_THRESHOLD`] on depth and
/// nothing on stencil. Every other format must match bit for bit.
pub fn compare_exact(expected: &PixelBuffer, result: &PixelBuffer) -> Result<ComparisonOutcome, VerifyError> {
    check_same_shape(expected, result)?;
    let format = result.format();
    let e = result.extent();
    let mut mask = ErrorMask::for_result(result);
    let ds = format.has_depth() || format.has_stencil();
    for z in 0..e.depth {
        for y in 0..e.height {
            for x in 0..e.width {
                let ok = if ds {
                    let (a, b) = (expected.pixel(x, y, z), result.pixel(x, y, z));
                    // Stencil-only formats keep stencil in channel 0.
                    let (depth, stencil) = match (format.has_depth(), format.has_stencil()) {
                        (true, true) => (Some(0), Some(1)),
                        (true, false) => (Some(0), None),
                        _ => (None, Some(0)),
                    };
                    depth.is_none_or(|c| (a[c] - b[c]).abs() <= EXACT_DEPTH_THRESHOLD)
                        && stencil.is_none_or(|c| a[c] == b[c])
                } else {
                    expected.texel_bits(x, y, z) == result.texel_bits(x, y, z)
                };
                mask.record(x, y, z, ok);
            }
        }
    }
    Ok(mask.finish("exact compare"))
}

/// Inclusive value range applied to every channel of a buffer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ValueClamp {
    pub min: f64,
    pub max: f64,
}

impl ValueClamp {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Copy of `buf` with every channel clamped.
    pub fn apply(&self, buf: &PixelBuffer) -> PixelBuffer {
        PixelBuffer::from_fn(buf.format(), buf.extent(), |x, y, z| {
            buf.pixel(x, y, z).map(|v| v.clamp(self.min, self.max))
        })
    }
}

/// Clamps applied before a nearest check of decoded compressed data.
///
/// Decoded block data may exceed what the destination can hold; hardware
/// clamps on conversion while the software reference doesn't.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CompressedClamps {
    pub source: Option<ValueClamp>,
    pub result: Option<ValueClamp>,
}

fn is_unsigned_destination(dst: &PixelFormat) -> bool {
    dst.class() == ChannelClass::UnsignedNormalized
        || matches!(dst.ty, ChannelType::Ufloat11_11_10 | ChannelType::Ufloat999E5)
}

/// Source/result clamps for a nearest blit from `format` into `dst`.
pub fn compressed_nearest_clamps(format: &CompressedFormat, dst: &PixelFormat) -> CompressedClamps {
    let mut source = None;
    let mut result = None;
    let mut min = -1.0;
    if format.is_bc6h() {
        if dst.ty == ChannelType::Ufloat11_11_10 {
            if *format == CompressedFormat::Bc6hSfloat {
                min = 0.0;
            }
            source = Some(());
            result = Some(ValueClamp::new(-1.0, 1.0));
        } else if !matches!(dst.ty, ChannelType::Float | ChannelType::Half) {
            source = Some(());
        }
    }
    if is_unsigned_destination(dst) && format.is_signed() {
        source = Some(());
        min = 0.0;
    }
    CompressedClamps {
        source: source.map(|()| ValueClamp::new(min, 1.0)),
        result,
    }
}

/// Clamp applied to result and references for a filtered blit from
/// `format` into `dst`. Only BC6H sources need one.
pub fn compressed_filtered_clamp(format: &CompressedFormat, dst: &PixelFormat) -> Option<ValueClamp> {
    if !format.is_bc6h() {
        return None;
    }
    match dst.ty {
        ChannelType::Float | ChannelType::Half => Some(ValueClamp::new(-10.0, 10.0)),
        ChannelType::Ufloat11_11_10 => Some(ValueClamp::new(0.0, 1.0)),
        _ => None,
    }
}

/// [`compare_nearest`] for a source decoded from `format`.
pub fn compare_nearest_compressed(
    source: &PixelBuffer,
    result: &PixelBuffer,
    regions: &[NormalizedRegion],
    threshold: &Threshold,
    format: &CompressedFormat,
) -> Result<ComparisonOutcome, VerifyError> {
    let clamps = compressed_nearest_clamps(format, &result.format());
    let clamped_source = clamps.source.map(|c| c.apply(source));
    let clamped_result = clamps.result.map(|c| c.apply(result));
    compare_nearest(
        clamped_source.as_ref().unwrap_or(source),
        clamped_result.as_ref().unwrap_or(result),
        regions,
        threshold,
    )
}

/// [`compare_filtered`] for a source decoded from `format`.
pub fn compare_filtered_compressed(
    result: &PixelBuffer,
    references: &ReferenceSet,
    threshold: &Threshold,
    format: &CompressedFormat,
) -> Result<ComparisonOutcome, VerifyError> {
    let Some(clamp) = compressed_filtered_clamp(format, &result.format()) else {
        return compare_filtered(result, references, threshold);
    };
    let refs = ReferenceSet {
        clamped: clamp.apply(&references.clamped),
        unclamped: references.unclamped.as_ref().map(|u| clamp.apply(u)),
    };
    compare_filtered(&clamp.apply(result), &refs, threshold)
}
