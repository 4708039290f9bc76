//! One-call verification of a blit or copy.
//!
//! [`BlitCheck`] normalizes the submitted regions, derives the threshold,
//! builds references when the filter needs them and picks the comparison
//! strategy. Combined depth/stencil destinations are verified per aspect.
//!
//! ```
//! use zenblit::*;
//!
//! let src = PixelBuffer::from_fn(PixelFormat::RGBA8_UNORM, Extent3::new(4, 4, 1), |x, y, _| {
//!     [x as f64 / 3.0, y as f64 / 3.0, 0.0, 1.0]
//! });
//! let dst = PixelBuffer::new(PixelFormat::RGBA8_UNORM, Extent3::new(8, 8, 1));
//! let region = CopyRegion::whole(src.extent(), dst.extent());
//!
//! let check = BlitCheck::new(FilterMode::Linear);
//! let rendered = check.references(&src, &dst, &[region]).unwrap();
//! let report = check.verify(&src, &dst, &rendered.clamped, &[region]).unwrap();
//! assert!(report.passed());
//! ```

use alloc::borrow::Cow;
use alloc::vec::Vec;

use crate::buffer::PixelBuffer;
use crate::compare::{
    ComparisonOutcome, compare_exact, compare_filtered, compare_filtered_compressed, compare_nearest,
    compare_nearest_compressed,
};
use crate::error::VerifyError;
use crate::format::Aspect;
use crate::region::{CopyRegion, ImageKind, NormalizedRegion, normalize};
use crate::resample::{FilterMode, ReferenceSet, generate_references};
use crate::tolerance::{Compression, ToleranceConfig, filtered_threshold, nearest_threshold};

/// Per-aspect outcomes of one verification.
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationReport {
    pub aspects: Vec<(Aspect, ComparisonOutcome)>,
}

impl VerificationReport {
    /// Whether every aspect passed.
    pub fn passed(&self) -> bool {
        self.aspects.iter().all(|(_, o)| o.passed())
    }

    pub fn outcome(&self, aspect: Aspect) -> Option<&ComparisonOutcome> {
        self.aspects.iter().find(|(a, _)| *a == aspect).map(|(_, o)| o)
    }
}

/// How a blit was issued.
///
/// Setters consume and return `self`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BlitCheck {
    pub src_kind: ImageKind,
    pub dst_kind: ImageKind,
    pub filter: FilterMode,
    pub compression: Compression,
    pub config: ToleranceConfig,
}

impl BlitCheck {
    pub fn new(filter: FilterMode) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn src_kind(mut self, kind: ImageKind) -> Self {
        self.src_kind = kind;
        self
    }

    pub fn dst_kind(mut self, kind: ImageKind) -> Self {
        self.dst_kind = kind;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn config(mut self, config: ToleranceConfig) -> Self {
        self.config = config;
        self
    }

    fn normalized(&self, regions: &[CopyRegion]) -> Vec<NormalizedRegion> {
        regions
            .iter()
            .map(|r| normalize(r, self.src_kind, self.dst_kind))
            .collect()
    }

    /// The references this check would compare against.
    pub fn references(
        &self,
        source: &PixelBuffer,
        dst_initial: &PixelBuffer,
        regions: &[CopyRegion],
    ) -> Result<ReferenceSet, VerifyError> {
        generate_references(source, dst_initial, &self.normalized(regions), self.filter)
    }

    /// Verify `result` as the outcome of blitting `regions` of `source` onto
    /// `dst_initial`.
    ///
    /// For compressed sides, buffers hold the decoded data and
    /// [`compression`](Self::compression) names the block format.
    pub fn verify(
        &self,
        source: &PixelBuffer,
        dst_initial: &PixelBuffer,
        result: &PixelBuffer,
        regions: &[CopyRegion],
    ) -> Result<VerificationReport, VerifyError> {
        check_destination(dst_initial, result)?;
        let regions = self.normalized(regions);
        let mut aspects = Vec::with_capacity(2);
        for &aspect in result.format().aspects() {
            let filter = match aspect {
                Aspect::Stencil => FilterMode::Nearest,
                _ => self.filter,
            };
            let src = aspect_view(source, aspect)?;
            let init = aspect_view(dst_initial, aspect)?;
            let res = aspect_view(result, aspect)?;
            let outcome = self.check_aspect(&src, &init, &res, &regions, filter)?;
            log::debug!(
                "{aspect:?} aspect, {} regions, {filter:?}: {:?}",
                regions.len(),
                outcome.verdict
            );
            aspects.push((aspect, outcome));
        }
        Ok(VerificationReport { aspects })
    }

    fn check_aspect(
        &self,
        source: &PixelBuffer,
        dst_initial: &PixelBuffer,
        result: &PixelBuffer,
        regions: &[NormalizedRegion],
        filter: FilterMode,
    ) -> Result<ComparisonOutcome, VerifyError> {
        let (src_format, dst_format) = (source.format(), result.format());
        if filter == FilterMode::Nearest {
            let t = nearest_threshold(&src_format, &dst_format, self.compression, &self.config);
            return match self.compression.src {
                Some(c) => compare_nearest_compressed(source, result, regions, &t, &c),
                None => compare_nearest(source, result, regions, &t),
            };
        }
        let t = filtered_threshold(&src_format, &dst_format, filter, self.compression, &self.config);
        let refs = generate_references(source, dst_initial, regions, filter)?;
        match self.compression.src {
            Some(c) => compare_filtered_compressed(result, &refs, &t, &c),
            None => compare_filtered(result, &refs, &t),
        }
    }
}

fn check_destination(dst_initial: &PixelBuffer, result: &PixelBuffer) -> Result<(), VerifyError> {
    if dst_initial.format() != result.format() {
        return Err(VerifyError::FormatMismatch {
            expected: dst_initial.format(),
            actual: result.format(),
        });
    }
    if dst_initial.extent() != result.extent() {
        return Err(VerifyError::ExtentMismatch {
            expected: dst_initial.extent(),
            actual: result.extent(),
        });
    }
    Ok(())
}

fn aspect_view(buf: &PixelBuffer, aspect: Aspect) -> Result<Cow<'_, PixelBuffer>, VerifyError> {
    if buf.format().aspect_format(aspect) == Some(buf.format()) {
        Ok(Cow::Borrowed(buf))
    } else {
        buf.aspect(aspect).map(Cow::Owned)
    }
}

/// Verify a plain image copy: `regions` of `source` copied unscaled onto
/// `dst_initial`.
///
/// A copy moves texel bits untouched, so source and destination formats may
/// differ as long as their texels are the same size; the expected image
/// reinterprets the source bits in the destination format. Every texel of
/// `result` must then match bit for bit, depth within
/// [`EXACT_DEPTH_THRESHOLD`](crate::EXACT_DEPTH_THRESHOLD).
pub fn verify_copy(
    source: &PixelBuffer,
    dst_initial: &PixelBuffer,
    result: &PixelBuffer,
    regions: &[CopyRegion],
    kind: ImageKind,
) -> Result<ComparisonOutcome, VerifyError> {
    check_destination(dst_initial, result)?;
    if source.format().texel_size() != result.format().texel_size() {
        return Err(VerifyError::FormatMismatch {
            expected: result.format(),
            actual: source.format(),
        });
    }
    let mut expected = dst_initial.clone();
    for region in regions {
        let n = normalize(region, kind, kind);
        source.check_box(&n.src)?;
        expected.check_box(&n.dst)?;
        let e = n.src.extent();
        if e != n.dst.extent() {
            return Err(VerifyError::ExtentMismatch {
                expected: e,
                actual: n.dst.extent(),
            });
        }
        let (s, d) = (n.src.min, n.dst.min);
        for z in 0..e.depth {
            for y in 0..e.height {
                for x in 0..e.width {
                    let bits = source.texel_bits(s.x as u32 + x, s.y as u32 + y, s.z as u32 + z);
                    expected.set_texel_bits(d.x as u32 + x, d.y as u32 + y, d.z as u32 + z, bits);
                }
            }
        }
    }
    log::debug!(
        "copy {:?} -> {:?}, {} regions",
        source.format(),
        result.format(),
        regions.len()
    );
    compare_exact(&expected, result)
}
