//! Verification of generated mip chains.
//!
//! Level `i`'s reference is rebuilt from the regions that write it. Source
//! levels already verified earlier in the pass are read from the *captured*
//! chain, so a small filtering divergence at one level is not compounded
//! into the next. Every level is compared even after one fails.
//!
//! ```
//! use zenblit::*;
//!
//! let base = PixelBuffer::from_fn(PixelFormat::RGBA8_UNORM, Extent3::new(8, 8, 1), |x, y, _| {
//!     [x as f64 / 8.0, y as f64 / 8.0, 0.5, 1.0]
//! });
//! let regions = mip_regions(base.extent(), 3, ImageKind::Flat);
//! let params = ChainParams::new(FilterMode::Linear);
//! let ideal = ideal_chain(&base, &regions, 3, &params).unwrap();
//!
//! let outcome = verify_chain(&MipChain::new(&ideal, &ideal, &regions), &params).unwrap();
//! assert!(outcome.passed());
//! assert_eq!(outcome.levels.len(), 3);
//! ```

use alloc::vec::Vec;

use crate::buffer::PixelBuffer;
use crate::compare::{
    ComparisonOutcome, compare_exact, compare_filtered, compare_filtered_compressed, compare_nearest,
    compare_nearest_compressed,
};
use crate::error::VerifyError;
use crate::region::{CopyRegion, Extent3, ImageKind, NormalizedRegion, normalize};
use crate::resample::{FilterMode, ReferenceSet, apply_region};
use crate::tolerance::{Compression, ToleranceConfig, filtered_threshold, nearest_threshold};

/// Extent of mip `level` of an image whose level 0 is `base`.
///
/// Flat images keep their layer count; volumes halve depth too.
pub fn level_extent(base: Extent3, level: u32, kind: ImageKind) -> Extent3 {
    let halve = |v: u32| (v >> level.min(31)).max(1);
    let depth = match kind {
        ImageKind::Flat => base.depth,
        ImageKind::Volume => halve(base.depth),
    };
    Extent3::new(halve(base.width), halve(base.height), depth)
}

/// Regions of a conventional mip generation: every level blitted whole from
/// the one above it.
pub fn mip_regions(base: Extent3, level_count: u32, kind: ImageKind) -> Vec<CopyRegion> {
    (1..level_count)
        .map(|level| {
            let src = level_extent(base, level - 1, kind);
            let dst = level_extent(base, level, kind);
            let region = CopyRegion::whole(src, dst).mip_levels(level - 1, level);
            match kind {
                ImageKind::Flat => region.src_layers(0, base.depth).dst_layers(0, base.depth),
                ImageKind::Volume => region,
            }
        })
        .collect()
}

/// How the chain was generated.
///
/// Setters consume and return `self`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ChainParams {
    pub filter: FilterMode,
    pub kind: ImageKind,
    pub compression: Compression,
    pub config: ToleranceConfig,
}

impl ChainParams {
    pub fn new(filter: FilterMode) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn kind(mut self, kind: ImageKind) -> Self {
        self.kind = kind;
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
}

/// Captured levels, their ideal renderings, and the regions that produced
/// them.
#[derive(Copy, Clone, Debug)]
pub struct MipChain<'a> {
    pub captured: &'a [PixelBuffer],
    pub ideal: &'a [PixelBuffer],
    pub regions: &'a [CopyRegion],
}

impl<'a> MipChain<'a> {
    pub const fn new(captured: &'a [PixelBuffer], ideal: &'a [PixelBuffer], regions: &'a [CopyRegion]) -> Self {
        Self {
            captured,
            ideal,
            regions,
        }
    }

    /// Source data for a region reading `src_level` while verifying `level`.
    fn source(&self, src_level: usize, level: usize) -> &'a PixelBuffer {
        if src_level < level {
            &self.captured[src_level]
        } else {
            &self.ideal[src_level]
        }
    }
}

/// Verdict for one level.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelOutcome {
    pub level: u32,
    pub outcome: ComparisonOutcome,
    /// The clamped reference the level was judged against.
    pub reference: PixelBuffer,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChainOutcome {
    pub levels: Vec<LevelOutcome>,
}

impl ChainOutcome {
    /// Whether every level passed.
    pub fn passed(&self) -> bool {
        self.levels.iter().all(|l| l.outcome.passed())
    }

    pub fn failed_levels(&self) -> impl Iterator<Item = u32> + '_ {
        self.levels.iter().filter(|l| !l.outcome.passed()).map(|l| l.level)
    }
}

fn normalize_chain(
    regions: &[CopyRegion],
    kind: ImageKind,
    levels: usize,
) -> Result<Vec<NormalizedRegion>, VerifyError> {
    regions
        .iter()
        .map(|r| {
            for level in [r.src.subresource.mip_level, r.dst.subresource.mip_level] {
                if level as usize >= levels {
                    return Err(VerifyError::LevelOutOfRange { level, levels });
                }
            }
            Ok(normalize(r, kind, kind))
        })
        .collect()
}

fn writes_level(region: &NormalizedRegion, level: usize) -> bool {
    region.dst_subresource.mip_level as usize == level
}

/// Build the ideal chain from `base` by applying every region in level
/// order, each reading the ideal data of its source level.
///
/// Level 0 is `base` itself. Levels start zeroed. A region whose source level
/// isn't built yet fails with [`VerifyError::LevelOutOfRange`].
pub fn ideal_chain(
    base: &PixelBuffer,
    regions: &[CopyRegion],
    level_count: u32,
    params: &ChainParams,
) -> Result<Vec<PixelBuffer>, VerifyError> {
    let levels = level_count as usize;
    if levels == 0 {
        return Ok(Vec::new());
    }
    let regions = normalize_chain(regions, params.kind, levels)?;
    let mut chain = Vec::with_capacity(levels);
    chain.push(base.clone());
    for level in 1..levels {
        let extent = level_extent(base.extent(), level as u32, params.kind);
        let mut refs = ReferenceSet {
            clamped: PixelBuffer::new(base.format(), extent),
            unclamped: None,
        };
        for r in regions.iter().filter(|r| writes_level(r, level)) {
            let src_level = r.src_subresource.mip_level;
            let src = chain.get(src_level as usize).ok_or(VerifyError::LevelOutOfRange {
                level: src_level,
                levels: level,
            })?;
            apply_region(&mut refs, src, r, params.filter)?;
        }
        chain.push(refs.clamped);
    }
    Ok(chain)
}

/// Verify every level of `chain`.
///
/// Levels no region writes are checked exactly against their ideal data.
pub fn verify_chain(chain: &MipChain<'_>, params: &ChainParams) -> Result<ChainOutcome, VerifyError> {
    let levels = chain.captured.len();
    if chain.ideal.len() != levels {
        return Err(VerifyError::ChainLength {
            captured: levels,
            ideal: chain.ideal.len(),
        });
    }
    let regions = normalize_chain(chain.regions, params.kind, levels)?;
    let mut outcomes = Vec::with_capacity(levels);
    for level in 0..levels {
        let writers: Vec<&NormalizedRegion> = regions.iter().filter(|r| writes_level(r, level)).collect();
        let (outcome, reference) = if writers.is_empty() {
            let ideal = &chain.ideal[level];
            (compare_exact(ideal, &chain.captured[level])?, ideal.clone())
        } else {
            verify_level(chain, level, &writers, params)?
        };
        log::debug!(
            "mip level {level}: {:?} from {} regions, {} mismatching texels",
            outcome.verdict,
            writers.len(),
            outcome.mismatches
        );
        outcomes.push(LevelOutcome {
            level: level as u32,
            outcome,
            reference,
        });
    }
    Ok(ChainOutcome { levels: outcomes })
}

fn verify_level(
    chain: &MipChain<'_>,
    level: usize,
    writers: &[&NormalizedRegion],
    params: &ChainParams,
) -> Result<(ComparisonOutcome, PixelBuffer), VerifyError> {
    let result = &chain.captured[level];
    let ideal = &chain.ideal[level];
    let mut refs = ReferenceSet {
        clamped: ideal.clone(),
        unclamped: (params.filter != FilterMode::Nearest).then(|| ideal.clone()),
    };
    for r in writers {
        let src = chain.source(r.src_subresource.mip_level as usize, level);
        apply_region(&mut refs, src, r, params.filter)?;
    }

    let compressed = params.compression.src;
    let outcome = if params.filter == FilterMode::Nearest {
        let mut merged = ComparisonOutcome::clean(result.extent());
        for r in writers {
            let src = chain.source(r.src_subresource.mip_level as usize, level);
            let t = nearest_threshold(&src.format(), &result.format(), params.compression, &params.config);
            let region = core::slice::from_ref(*r);
            let outcome = match compressed {
                Some(c) => compare_nearest_compressed(src, result, region, &t, &c)?,
                None => compare_nearest(src, result, region, &t)?,
            };
            merged = merged.merge(outcome);
        }
        merged
    } else {
        let src_format = writers
            .first()
            .map_or(result.format(), |r| chain.source(r.src_subresource.mip_level as usize, level).format());
        let t = filtered_threshold(
            &src_format,
            &result.format(),
            params.filter,
            params.compression,
            &params.config,
        );
        match compressed {
            Some(c) => compare_filtered_compressed(result, &refs, &t, &c)?,
            None => compare_filtered(result, &refs, &t)?,
        }
    };
    Ok((outcome, refs.clamped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{MASK_ERROR, Verdict};
    use crate::format::PixelFormat;
    use crate::resample::generate_references;
    use alloc::vec;

    fn base(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::from_fn(PixelFormat::RGBA8_UNORM, Extent3::new(w, h, 1), |x, y, _| {
            [x as f64 / w as f64, y as f64 / h as f64, ((x + y) % 3) as f64 / 2.0, 1.0]
        })
    }

    #[test]
    fn level_extents_halve_and_floor_at_one() {
        let e = Extent3::new(16, 4, 8);
        assert_eq!(level_extent(e, 0, ImageKind::Flat), e);
        assert_eq!(level_extent(e, 2, ImageKind::Flat), Extent3::new(4, 1, 8));
        assert_eq!(level_extent(e, 3, ImageKind::Volume), Extent3::new(2, 1, 1));
        assert_eq!(level_extent(e, 40, ImageKind::Volume), Extent3::new(1, 1, 1));
    }

    #[test]
    fn mip_regions_chain_consecutive_levels() {
        let regions = mip_regions(Extent3::new(8, 8, 1), 4, ImageKind::Flat);
        assert_eq!(regions.len(), 3);
        let last = normalize(&regions[2], ImageKind::Flat, ImageKind::Flat);
        assert_eq!(last.src_subresource.mip_level, 2);
        assert_eq!(last.dst_subresource.mip_level, 3);
        assert_eq!(last.src.extent(), Extent3::new(2, 2, 1));
        assert_eq!(last.dst.extent(), Extent3::new(1, 1, 1));
    }

    #[test]
    fn ideal_chain_starts_from_base() {
        let b = base(8, 8);
        let regions = mip_regions(b.extent(), 3, ImageKind::Flat);
        let chain = ideal_chain(&b, &regions, 3, &ChainParams::new(FilterMode::Linear)).unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0], b);
        assert_eq!(chain[2].extent(), Extent3::new(2, 2, 1));
    }

    #[test]
    fn corrupted_level_fails_alone() {
        let b = base(8, 8);
        let regions = mip_regions(b.extent(), 3, ImageKind::Flat);
        let params = ChainParams::new(FilterMode::Linear);
        let ideal = ideal_chain(&b, &regions, 3, &params).unwrap();
        let mut captured = ideal.clone();
        captured[2].set_pixel(1, 1, 0, [1.0, 0.0, 1.0, 0.0]);

        let outcome = verify_chain(&MipChain::new(&captured, &ideal, &regions), &params).unwrap();
        assert!(!outcome.passed());
        assert_eq!(outcome.failed_levels().collect::<Vec<_>>(), vec![2]);
        let l2 = &outcome.levels[2].outcome;
        assert_eq!(l2.verdict, Verdict::Fail);
        assert_eq!(l2.mismatches, 1);
        let Some(mask) = &l2.error_mask else {
            panic!("failed level keeps its mask");
        };
        assert_eq!(mask.pixel(1, 1, 0), MASK_ERROR);
    }

    #[test]
    fn level_reference_reads_captured_previous_level() {
        let b = base(8, 8);
        let regions = mip_regions(b.extent(), 3, ImageKind::Flat);
        let params = ChainParams::new(FilterMode::Linear);
        let ideal = ideal_chain(&b, &regions, 3, &params).unwrap();

        let mut captured = ideal.clone();
        captured[1].set_pixel(0, 0, 0, [1.0, 1.0, 1.0, 1.0]);
        let down = normalize(&regions[1], ImageKind::Flat, ImageKind::Flat);
        let from_captured = generate_references(
            &captured[1],
            &PixelBuffer::new(PixelFormat::RGBA8_UNORM, Extent3::new(2, 2, 1)),
            &[down],
            FilterMode::Linear,
        )
        .unwrap();
        captured[2] = from_captured.clamped.clone();
        assert_ne!(captured[2], ideal[2]);

        let outcome = verify_chain(&MipChain::new(&captured, &ideal, &regions), &params).unwrap();
        assert_eq!(outcome.failed_levels().collect::<Vec<_>>(), vec![1]);
        assert_eq!(outcome.levels[2].reference, from_captured.clamped);
    }

    #[test]
    fn nearest_chain_passes_and_flags_corruption() {
        let b = base(8, 4);
        let regions = mip_regions(b.extent(), 3, ImageKind::Flat);
        let params = ChainParams::new(FilterMode::Nearest);
        let ideal = ideal_chain(&b, &regions, 3, &params).unwrap();
        let outcome = verify_chain(&MipChain::new(&ideal, &ideal, &regions), &params).unwrap();
        assert!(outcome.passed());

        let mut captured = ideal.clone();
        captured[1].set_pixel(0, 0, 0, [0.0, 0.0, 0.0, 0.0]);
        let outcome = verify_chain(&MipChain::new(&captured, &ideal, &regions), &params).unwrap();
        assert_eq!(outcome.failed_levels().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn unwritten_levels_compare_against_ideal() {
        let b = base(4, 4);
        let ideal = vec![b.clone()];
        let mut captured = vec![b];
        let params = ChainParams::default();
        assert!(verify_chain(&MipChain::new(&captured, &ideal, &[]), &params).unwrap().passed());

        captured[0].set_pixel(0, 0, 0, [0.5, 0.5, 0.5, 0.5]);
        let outcome = verify_chain(&MipChain::new(&captured, &ideal, &[]), &params).unwrap();
        assert_eq!(outcome.levels[0].outcome.mismatches, 1);
    }

    #[test]
    fn structural_errors() {
        let b = base(4, 4);
        let ideal = vec![b.clone(), b.clone()];
        let captured = vec![b.clone()];
        let params = ChainParams::default();
        assert_eq!(
            verify_chain(&MipChain::new(&captured, &ideal, &[]), &params),
            Err(VerifyError::ChainLength { captured: 1, ideal: 2 })
        );

        let regions = [CopyRegion::whole(b.extent(), b.extent()).mip_levels(0, 5)];
        assert_eq!(
            verify_chain(&MipChain::new(&ideal, &ideal, &regions), &params),
            Err(VerifyError::LevelOutOfRange { level: 5, levels: 2 })
        );

        let backwards = [CopyRegion::whole(b.extent(), b.extent()).mip_levels(2, 1)];
        assert_eq!(
            ideal_chain(&b, &backwards, 3, &params),
            Err(VerifyError::LevelOutOfRange { level: 2, levels: 1 })
        );
    }
}
