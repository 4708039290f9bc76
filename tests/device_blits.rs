//! Simulated device blits vs the verifier.
//!
//! The simulated device resamples the way hardware does: single-precision
//! coordinates, texel-center addressing, clamp-to-edge at either the region
//! or the image boundary, results rounded into the destination format. It
//! shares no code with the reference resampler.
//!
//! A correct device must pass every region in the grid. Each deliberately
//! broken device must be caught on at least one.

use zenblit::*;

// ---- Device simulation ----

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Bug {
    None,
    /// Blits as if no corners were descending.
    IgnoreMirror,
    /// Reads one source texel to the right.
    OffByOne,
    /// Never writes the last destination row.
    SkipLastRow,
}

/// Where the filter footprint is clamped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Edge {
    Region,
    Image,
}

#[derive(Copy, Clone, Debug)]
struct Device {
    filter: FilterMode,
    edge: Edge,
    bug: Bug,
}

impl Device {
    fn new(filter: FilterMode) -> Self {
        Self {
            filter,
            edge: Edge::Region,
            bug: Bug::None,
        }
    }

    fn edge(mut self, edge: Edge) -> Self {
        self.edge = edge;
        self
    }

    fn bug(mut self, bug: Bug) -> Self {
        self.bug = bug;
        self
    }

    /// Run one 2D blit, returning the destination after it.
    fn blit(&self, src: &PixelBuffer, dst: &PixelBuffer, region: &CopyRegion) -> PixelBuffer {
        let n = normalize(region, ImageKind::Flat, ImageKind::Flat);
        let (se, de) = (n.src.extent(), n.dst.extent());
        let mirror = if self.bug == Bug::IgnoreMirror {
            MirrorFlags::NONE
        } else {
            n.mirror
        };
        let rows = if self.bug == Bug::SkipLastRow {
            de.height - 1
        } else {
            de.height
        };
        let mut out = dst.clone();
        for y in 0..rows {
            for x in 0..de.width {
                let p = [x, y];
                let coord: [f32; 2] = core::array::from_fn(|a| {
                    let scale = se.axis(a) as f32 / de.axis(a) as f32;
                    let mut t = (p[a] as f32 + 0.5) * scale;
                    if mirror.axis(a) {
                        t = se.axis(a) as f32 - t;
                    }
                    if a == 0 && self.bug == Bug::OffByOne {
                        t += 1.0;
                    }
                    t + n.src.min.axis(a) as f32
                });
                let v = self.sample(src, &n.src, coord);
                out.set_pixel_linear(x + n.dst.min.x as u32, y + n.dst.min.y as u32, n.dst.min.z as u32, v);
            }
        }
        out
    }

    fn bounds(&self, src: &PixelBuffer, region: &Box3, axis: usize) -> (i64, i64) {
        match self.edge {
            Edge::Region => (region.min.axis(axis) as i64, region.max.axis(axis) as i64 - 1),
            Edge::Image => (0, src.extent().axis(axis) as i64 - 1),
        }
    }

    fn sample(&self, src: &PixelBuffer, region: &Box3, coord: [f32; 2]) -> [f64; 4] {
        let bx = self.bounds(src, region, 0);
        let by = self.bounds(src, region, 1);
        let fetch = |x: i64, y: i64| -> [f32; 4] {
            let x = x.clamp(bx.0, bx.1) as u32;
            let y = y.clamp(by.0, by.1) as u32;
            src.pixel_linear(x, y, region.min.z as u32).map(|v| v as f32)
        };
        let texel = match self.filter {
            FilterMode::Nearest => fetch(coord[0].floor() as i64, coord[1].floor() as i64),
            _ => {
                let (u, v) = (coord[0] - 0.5, coord[1] - 0.5);
                let (x0, y0) = (u.floor(), v.floor());
                let (fx, fy) = (u - x0, v - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);
                let t00 = fetch(x0, y0);
                let t10 = fetch(x0 + 1, y0);
                let t01 = fetch(x0, y0 + 1);
                let t11 = fetch(x0 + 1, y0 + 1);
                core::array::from_fn(|c| {
                    let top = t00[c] * (1.0 - fx) + t10[c] * fx;
                    let bottom = t01[c] * (1.0 - fx) + t11[c] * fx;
                    top * (1.0 - fy) + bottom * fy
                })
            }
        };
        texel.map(f64::from)
    }
}

// ---- Inputs ----

fn o(x: i32, y: i32) -> Offset3 {
    Offset3::new(x, y, 0)
}

fn blit(src: [(i32, i32); 2], dst: [(i32, i32); 2]) -> CopyRegion {
    let far = |(x, y): (i32, i32)| Offset3::new(x, y, 1);
    CopyRegion::blit([o(src[0].0, src[0].1), far(src[1])], [o(dst[0].0, dst[0].1), far(dst[1])])
}

/// Every texel distinct in at least one channel, with smooth ramps so
/// filtered results stay well inside the format.
fn source(format: PixelFormat) -> PixelBuffer {
    PixelBuffer::from_fn(format, Extent3::new(16, 12, 1), |x, y, _| {
        [x as f64 / 15.0, y as f64 / 11.0, ((x * 7 + y * 3) % 16) as f64 / 15.0, 1.0]
    })
}

fn destination(format: PixelFormat) -> PixelBuffer {
    PixelBuffer::filled(format, Extent3::new(24, 24, 1), [1.0, 0.0, 1.0, 1.0])
}

/// Scaled, shrunk, odd-ratio, offset and mirrored regions.
fn region_grid() -> Vec<CopyRegion> {
    vec![
        blit([(0, 0), (16, 12)], [(0, 0), (16, 12)]),
        blit([(0, 0), (16, 12)], [(0, 0), (24, 24)]),
        blit([(0, 0), (16, 12)], [(4, 4), (12, 10)]),
        blit([(3, 1), (8, 12)], [(2, 5), (15, 22)]),
        blit([(16, 0), (0, 12)], [(0, 0), (16, 12)]),
        blit([(0, 12), (16, 0)], [(24, 0), (0, 24)]),
        blit([(2, 2), (14, 10)], [(20, 20), (3, 1)]),
        blit([(5, 0), (6, 12)], [(0, 0), (7, 9)]),
    ]
}

fn verify(device: Device, format: PixelFormat, region: &CopyRegion) -> VerificationReport {
    let src = source(format);
    let dst = destination(format);
    let result = device.blit(&src, &dst, region);
    BlitCheck::new(device.filter)
        .verify(&src, &dst, &result, core::slice::from_ref(region))
        .unwrap()
}

// ---- Tests ----

#[test]
fn correct_nearest_device_passes_every_region() {
    for format in [PixelFormat::RGBA8_UNORM, PixelFormat::RGBA8_SRGB, PixelFormat::RGBA16_SFLOAT] {
        for region in region_grid() {
            let report = verify(Device::new(FilterMode::Nearest), format, &region);
            assert!(report.passed(), "{format:?} {region:?}: {report:?}");
        }
    }
}

#[test]
fn correct_linear_device_passes_with_either_edge_behavior() {
    for edge in [Edge::Region, Edge::Image] {
        for format in [PixelFormat::RGBA8_UNORM, PixelFormat::RGBA8_SRGB, PixelFormat::RGBA32_SFLOAT] {
            for region in region_grid() {
                let device = Device::new(FilterMode::Linear).edge(edge);
                let report = verify(device, format, &region);
                assert!(report.passed(), "{edge:?} {format:?} {region:?}");
            }
        }
    }
}

#[test]
fn broken_devices_are_caught() {
    for filter in [FilterMode::Nearest, FilterMode::Linear] {
        for bug in [Bug::IgnoreMirror, Bug::OffByOne, Bug::SkipLastRow] {
            let device = Device::new(filter).bug(bug);
            let caught = region_grid()
                .iter()
                .any(|r| !verify(device, PixelFormat::RGBA8_UNORM, r).passed());
            assert!(caught, "{filter:?} device with {bug:?} passed every region");
        }
    }
}

#[test]
fn skipped_row_is_painted_in_the_mask() {
    let device = Device::new(FilterMode::Nearest).bug(Bug::SkipLastRow);
    let region = blit([(0, 0), (16, 12)], [(0, 0), (16, 12)]);
    let report = verify(device, PixelFormat::RGBA8_UNORM, &region);
    let outcome = report.outcome(Aspect::Color).unwrap();
    assert_eq!(outcome.mismatches, 16);
    let mask = outcome.error_mask.as_ref().unwrap();
    for x in 0..16 {
        assert_eq!(mask.pixel(x, 11, 0), MASK_ERROR);
        assert_eq!(mask.pixel(x, 10, 0), MASK_OK);
    }
}

#[test]
fn nearest_device_into_wider_format() {
    let src = source(PixelFormat::RGBA8_UNORM);
    let dst = destination(PixelFormat::RGBA16_UNORM);
    for region in region_grid() {
        let result = Device::new(FilterMode::Nearest).blit(&src, &dst, &region);
        let report = BlitCheck::new(FilterMode::Nearest)
            .verify(&src, &dst, &result, &[region])
            .unwrap();
        assert!(report.passed(), "{region:?}");
    }
}

#[test]
fn device_built_mip_chain_verifies() {
    let base = PixelBuffer::from_fn(PixelFormat::RGBA8_UNORM, Extent3::new(16, 16, 1), |x, y, _| {
        [x as f64 / 15.0, y as f64 / 15.0, ((x ^ y) % 4) as f64 / 3.0, 1.0]
    });
    let regions = mip_regions(base.extent(), 4, ImageKind::Flat);
    let device = Device::new(FilterMode::Linear);
    let mut captured = vec![base.clone()];
    for (level, region) in regions.iter().enumerate() {
        let extent = level_extent(base.extent(), level as u32 + 1, ImageKind::Flat);
        let next = device.blit(&captured[level], &PixelBuffer::new(base.format(), extent), region);
        captured.push(next);
    }
    let params = ChainParams::new(FilterMode::Linear);
    let ideal = ideal_chain(&base, &regions, 4, &params).unwrap();
    let outcome = verify_chain(&MipChain::new(&captured, &ideal, &regions), &params).unwrap();
    assert!(outcome.passed(), "failed levels: {:?}", outcome.failed_levels().collect::<Vec<_>>());

    captured[3].set_pixel(0, 1, 0, [0.0, 0.0, 0.0, 0.0]);
    let outcome = verify_chain(&MipChain::new(&captured, &ideal, &regions), &params).unwrap();
    assert_eq!(outcome.failed_levels().collect::<Vec<_>>(), vec![3]);
}
