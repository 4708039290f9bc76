//! Software emulation of a GPU blit.
//!
//! Hardware may treat the edge of a source sub-region two ways: clamp
//! sampling at the sub-region's edge, or keep sampling the whole source image
//! beyond it. Both are legal, so filtered blits produce two references:
//! [`blit_clamped`] and [`blit_unclamped`]. Nearest blits only need the
//! clamped one.
//!
//! Filtering happens in linear space: sRGB sources are decoded on read and
//! values are re-encoded only when written into an sRGB destination.
//!
//! Combined depth/stencil data is resampled per aspect. Stencil always uses
//! nearest sampling regardless of the requested filter.

use num_traits::Float;

use crate::buffer::PixelBuffer;
use crate::error::VerifyError;
use crate::format::Aspect;
use crate::region::{Box3, MirrorFlags, NormalizedRegion};

/// Resampling kernel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// Floor to the containing texel.
    #[default]
    Nearest,
    /// Bilinear, or trilinear for volume images.
    Linear,
    /// Catmull-Rom over a 4-texel footprint per axis.
    Cubic,
}

/// Up to four texel indices along one axis with their weights.
#[derive(Copy, Clone, Debug)]
struct Taps {
    idx: [u32; 4],
    weight: [f64; 4],
    len: usize,
}

impl Taps {
    fn single(i: u32) -> Self {
        Self {
            idx: [i, 0, 0, 0],
            weight: [1.0, 0.0, 0.0, 0.0],
            len: 1,
        }
    }

    fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        (0..self.len).map(|i| (self.idx[i], self.weight[i]))
    }
}

fn catmull_rom(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

fn taps(filter: FilterMode, coord: f64, size: u32) -> Taps {
    let last = size.saturating_sub(1) as i64;
    let clamp = |i: i64| i.clamp(0, last) as u32;
    match filter {
        FilterMode::Nearest => Taps::single(clamp(coord.floor() as i64)),
        FilterMode::Linear => {
            let c = coord - 0.5;
            let i0 = c.floor();
            let t = c - i0;
            let i0 = i0 as i64;
            Taps {
                idx: [clamp(i0), clamp(i0 + 1), 0, 0],
                weight: [1.0 - t, t, 0.0, 0.0],
                len: 2,
            }
        }
        FilterMode::Cubic => {
            let c = coord - 0.5;
            let i0 = c.floor();
            let t = c - i0;
            let i0 = i0 as i64;
            Taps {
                idx: [clamp(i0 - 1), clamp(i0), clamp(i0 + 1), clamp(i0 + 2)],
                weight: catmull_rom(t),
                len: 4,
            }
        }
    }
}

/// Clamp-to-edge sampler over unnormalized texel coordinates.
///
/// ```
/// use zenblit::{Extent3, FilterMode, PixelBuffer, PixelFormat, Sampler};
///
/// let src = PixelBuffer::from_fn(PixelFormat::R32_SFLOAT, Extent3::new(2, 1, 1), |x, _, _| {
///     [x as f64, 0.0, 0.0, 1.0]
/// });
/// let s = Sampler::new(FilterMode::Linear);
/// assert_eq!(s.sample(&src, [1.0, 0.5, 0.5])[0], 0.5);
/// assert_eq!(s.sample(&src, [-3.0, 0.5, 0.5])[0], 0.0);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Sampler {
    pub filter: FilterMode,
}

impl Sampler {
    pub const fn new(filter: FilterMode) -> Self {
        Self { filter }
    }

    /// Sample `src` at `coord` (texel units, texel centers at `i + 0.5`).
    ///
    /// Returns linear-space values. Single-slice buffers never filter along z.
    pub fn sample(&self, src: &PixelBuffer, coord: [f64; 3]) -> [f64; 4] {
        let e = src.extent();
        let tx = taps(self.filter, coord[0], e.width);
        let ty = taps(self.filter, coord[1], e.height);
        let tz = if e.depth <= 1 {
            Taps::single(0)
        } else {
            taps(self.filter, coord[2], e.depth)
        };
        if self.filter == FilterMode::Nearest {
            return src.pixel_linear(tx.idx[0], ty.idx[0], tz.idx[0]);
        }
        let mut acc = [0.0; 4];
        for (z, wz) in tz.iter() {
            for (y, wy) in ty.iter() {
                for (x, wx) in tx.iter() {
                    let w = wx * wy * wz;
                    if w == 0.0 {
                        continue;
                    }
                    let t = src.pixel_linear(x, y, z);
                    for c in 0..4 {
                        acc[c] += w * t[c];
                    }
                }
            }
        }
        acc
    }
}

fn axis_scale(src: u32, dst: u32) -> f64 {
    if dst == 0 { 0.0 } else { src as f64 / dst as f64 }
}

/// Resample all of `src` into `dst_box` of `dst`, sampling clamped to the
/// edges of `src`.
///
/// `src` is the source sub-region on its own. Destination texel `x` samples
/// at `(x + 0.5) * scale`; on mirrored axes the result lands at the reflected
/// destination index.
pub fn blit_clamped(
    dst: &mut PixelBuffer,
    dst_box: &Box3,
    src: &PixelBuffer,
    filter: FilterMode,
    mirror: MirrorFlags,
) -> Result<(), VerifyError> {
    dst.check_box(dst_box)?;
    let de = dst_box.extent();
    let se = src.extent();
    let scale = [
        axis_scale(se.width, de.width),
        axis_scale(se.height, de.height),
        axis_scale(se.depth, de.depth),
    ];
    let sampler = Sampler::new(filter);
    let size = [de.width, de.height, de.depth];
    for z in 0..de.depth {
        for y in 0..de.height {
            for x in 0..de.width {
                let p = [x, y, z];
                let coord: [f64; 3] = core::array::from_fn(|a| (p[a] as f64 + 0.5) * scale[a]);
                let v = sampler.sample(src, coord);
                let out: [u32; 3] = core::array::from_fn(|a| {
                    let i = if mirror.axis(a) { size[a] - 1 - p[a] } else { p[a] };
                    i + dst_box.min.axis(a) as u32
                });
                dst.set_pixel_linear(out[0], out[1], out[2], v);
            }
        }
    }
    Ok(())
}

/// Resample `src_box` of the whole `src` into `dst_box` of `dst`, letting
/// the filter footprint reach past the region's edges.
///
/// Mirrored axes reflect the source coordinate about the region instead of
/// the destination index.
pub fn blit_unclamped(
    dst: &mut PixelBuffer,
    dst_box: &Box3,
    src: &PixelBuffer,
    src_box: &Box3,
    filter: FilterMode,
    mirror: MirrorFlags,
) -> Result<(), VerifyError> {
    dst.check_box(dst_box)?;
    src.check_box(src_box)?;
    let de = dst_box.extent();
    let se = src_box.extent();
    let scale = [
        axis_scale(se.width, de.width),
        axis_scale(se.height, de.height),
        axis_scale(se.depth, de.depth),
    ];
    let sampler = Sampler::new(filter);
    for z in 0..de.depth {
        for y in 0..de.height {
            for x in 0..de.width {
                let p = [x, y, z];
                let coord: [f64; 3] = core::array::from_fn(|a| {
                    let offset = src_box.min.axis(a) as f64;
                    let t = (p[a] as f64 + 0.5) * scale[a];
                    if mirror.axis(a) {
                        se.axis(a) as f64 + offset - t
                    } else {
                        offset + t
                    }
                });
                let v = sampler.sample(src, coord);
                dst.set_pixel_linear(
                    x + dst_box.min.x as u32,
                    y + dst_box.min.y as u32,
                    z + dst_box.min.z as u32,
                    v,
                );
            }
        }
    }
    Ok(())
}

/// The legitimate renderings of a blit.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceSet {
    /// Sampling clamped at each source region's edge.
    pub clamped: PixelBuffer,
    /// Sampling from the whole source. `None` for nearest blits.
    pub unclamped: Option<PixelBuffer>,
}

impl ReferenceSet {
    /// The references in the order they are checked.
    pub fn iter(&self) -> impl Iterator<Item = &PixelBuffer> {
        core::iter::once(&self.clamped).chain(self.unclamped.as_ref())
    }
}

fn effective_filter(aspect: Aspect, filter: FilterMode) -> FilterMode {
    match aspect {
        Aspect::Stencil => FilterMode::Nearest,
        _ => filter,
    }
}

/// Apply one normalized region to the references, aspect by aspect.
pub fn apply_region(
    refs: &mut ReferenceSet,
    src: &PixelBuffer,
    region: &NormalizedRegion,
    filter: FilterMode,
) -> Result<(), VerifyError> {
    src.check_box(&region.src)?;
    if region.dst.is_empty() || region.src.is_empty() {
        return Ok(());
    }
    let dst_format = refs.clamped.format();
    let single_aspect = dst_format.aspects().len() == 1 && src.format().aspects() == dst_format.aspects();
    for &aspect in dst_format.aspects() {
        let f = effective_filter(aspect, filter);
        if single_aspect {
            let sub = src.sub_buffer(&region.src)?;
            blit_clamped(&mut refs.clamped, &region.dst, &sub, f, region.mirror)?;
            if let Some(u) = refs.unclamped.as_mut() {
                blit_unclamped(u, &region.dst, src, &region.src, f, region.mirror)?;
            }
            continue;
        }
        let src_aspect = src.aspect(aspect)?;
        let sub = src_aspect.sub_buffer(&region.src)?;
        let mut clamped = refs.clamped.aspect(aspect)?;
        blit_clamped(&mut clamped, &region.dst, &sub, f, region.mirror)?;
        refs.clamped.write_aspect(aspect, &clamped)?;
        if let Some(u) = refs.unclamped.as_mut() {
            let mut unclamped = u.aspect(aspect)?;
            blit_unclamped(&mut unclamped, &region.dst, &src_aspect, &region.src, f, region.mirror)?;
            u.write_aspect(aspect, &unclamped)?;
        }
    }
    Ok(())
}

/// Build the references for a set of regions.
///
/// Both references start as copies of the destination's prior contents and
/// receive every region in order. The unclamped reference is only built for
/// filtered blits.
pub fn generate_references(
    src: &PixelBuffer,
    dst_initial: &PixelBuffer,
    regions: &[NormalizedRegion],
    filter: FilterMode,
) -> Result<ReferenceSet, VerifyError> {
    let mut refs = ReferenceSet {
        clamped: dst_initial.clone(),
        unclamped: (filter != FilterMode::Nearest).then(|| dst_initial.clone()),
    };
    for (i, region) in regions.iter().enumerate() {
        log::trace!(
            "reference region {i}: src {:?} -> dst {:?}, mirror {:?}, {filter:?}",
            region.src,
            region.dst,
            region.mirror
        );
        apply_region(&mut refs, src, region, filter)?;
    }
    Ok(refs)
}
