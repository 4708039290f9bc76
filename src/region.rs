//! Copy/blit region geometry: corner canonicalization and mirror detection.
//!
//! A blit region is submitted as two corner offsets per image. A corner pair
//! given in descending order on an axis means the blit is mirrored on that
//! axis. [`normalize`] turns a submitted [`CopyRegion`] into ascending
//! [`Box3`]s plus the effective [`MirrorFlags`] a resampler must apply.
//!
//! ```
//! use zenblit::{CopyRegion, ImageKind, MirrorFlags, Offset3, normalize};
//!
//! let region = CopyRegion::blit(
//!     [Offset3::new(0, 0, 0), Offset3::new(32, 32, 1)],
//!     [Offset3::new(64, 0, 0), Offset3::new(0, 64, 1)],
//! );
//! let n = normalize(&region, ImageKind::Flat, ImageKind::Flat);
//! assert_eq!(n.mirror, MirrorFlags::X);
//! assert_eq!(n.dst.min, Offset3::new(0, 0, 0));
//! assert_eq!(n.dst.max, Offset3::new(64, 64, 1));
//! ```

/// A signed texel offset in 3D image space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Offset3 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Offset3 {
    /// Create a new offset.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Component for axis 0 (x), 1 (y) or 2 (z).
    pub fn axis(self, axis: usize) -> i32 {
        match axis {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => panic!("axis {axis} out of range"),
        }
    }

    fn with_axis(mut self, axis: usize, value: i32) -> Self {
        match axis {
            0 => self.x = value,
            1 => self.y = value,
            2 => self.z = value,
            _ => panic!("axis {axis} out of range"),
        }
        self
    }
}

/// Width × height × depth in texels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Extent3 {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3 {
    /// Create a new extent.
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Number of texels covered.
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    /// Extent along axis 0, 1 or 2.
    pub fn axis(&self, axis: usize) -> u32 {
        match axis {
            0 => self.width,
            1 => self.height,
            2 => self.depth,
            _ => panic!("axis {axis} out of range"),
        }
    }
}

/// Per-axis mirroring of a blit, as a 3-bit set {X, Y, Z}.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MirrorFlags(u8);

impl MirrorFlags {
    /// No mirroring.
    pub const NONE: Self = Self(0);
    /// Mirrored along x.
    pub const X: Self = Self(1);
    /// Mirrored along y.
    pub const Y: Self = Self(2);
    /// Mirrored along z.
    pub const Z: Self = Self(4);
    /// Mirrored along all three axes.
    pub const ALL: Self = Self(7);

    /// Flag for a single axis (0 = x, 1 = y, 2 = z).
    pub const fn for_axis(axis: usize) -> Self {
        Self(1 << axis)
    }

    /// Raw bit representation.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build from raw bits. Bits above z are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 7)
    }

    /// Whether no axis is mirrored.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every axis in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the given axis is mirrored.
    pub const fn axis(self, axis: usize) -> bool {
        self.0 & (1 << axis) != 0
    }

    /// Set union.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Per-axis XOR. Mirroring on exactly one side flips sampling direction;
    /// mirroring on both sides cancels out.
    pub const fn xor(self, other: Self) -> Self {
        Self(self.0 ^ other.0)
    }

    /// Flags for a corner pair: an axis is mirrored when `c0 > c1`.
    ///
    /// Zero-extent axes never report a mirror.
    pub fn from_corners(c0: Offset3, c1: Offset3) -> Self {
        let mut bits = 0;
        for axis in 0..3 {
            let (a, b) = (c0.axis(axis), c1.axis(axis));
            if a != b && a > b {
                bits |= 1 << axis;
            }
        }
        Self(bits)
    }
}

impl core::ops::BitXor for MirrorFlags {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        self.xor(rhs)
    }
}

impl core::ops::BitOr for MirrorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Axis-aligned 3D box with ascending corners. `max` is exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Box3 {
    pub min: Offset3,
    pub max: Offset3,
}

impl Box3 {
    /// Create a box. Corners must already be ascending.
    pub const fn new(min: Offset3, max: Offset3) -> Self {
        Self { min, max }
    }

    /// Box at the origin covering `extent`.
    pub const fn from_extent(extent: Extent3) -> Self {
        Self {
            min: Offset3::new(0, 0, 0),
            max: Offset3::new(extent.width as i32, extent.height as i32, extent.depth as i32),
        }
    }

    /// Ascending box spanned by two corners given in any order.
    pub fn from_corners(c0: Offset3, c1: Offset3) -> Self {
        Self {
            min: Offset3::new(c0.x.min(c1.x), c0.y.min(c1.y), c0.z.min(c1.z)),
            max: Offset3::new(c0.x.max(c1.x), c0.y.max(c1.y), c0.z.max(c1.z)),
        }
    }

    /// Size of the box.
    pub fn extent(&self) -> Extent3 {
        Extent3::new(
            (self.max.x - self.min.x).unsigned_abs(),
            (self.max.y - self.min.y).unsigned_abs(),
            (self.max.z - self.min.z).unsigned_abs(),
        )
    }

    /// Whether any axis has zero extent.
    pub fn is_empty(&self) -> bool {
        self.extent().texel_count() == 0
    }

    /// Whether the box lies within `(0, 0, 0)..extent`.
    pub fn fits_within(&self, extent: Extent3) -> bool {
        self.min.x >= 0
            && self.min.y >= 0
            && self.min.z >= 0
            && self.max.x <= extent.width as i32
            && self.max.y <= extent.height as i32
            && self.max.z <= extent.depth as i32
    }

    /// Corner pair with the corners swapped on every flagged axis.
    ///
    /// Applying the same flags to the result's [`Box3::from_corners`] again
    /// yields the original corners.
    pub fn mirrored(&self, flags: MirrorFlags) -> [Offset3; 2] {
        let mut c0 = self.min;
        let mut c1 = self.max;
        for axis in 0..3 {
            if flags.axis(axis) {
                let (a, b) = (c0.axis(axis), c1.axis(axis));
                c0 = c0.with_axis(axis, b);
                c1 = c1.with_axis(axis, a);
            }
        }
        [c0, c1]
    }
}

/// Mip level and array layer range addressed by one side of a copy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Subresource {
    pub mip_level: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl Subresource {
    /// Mip level `mip_level`, single layer 0.
    pub const fn level(mip_level: u32) -> Self {
        Self {
            mip_level,
            base_array_layer: 0,
            layer_count: 1,
        }
    }

    /// Layer range `base..base + count` of mip level 0.
    pub const fn layers(base_array_layer: u32, layer_count: u32) -> Self {
        Self {
            mip_level: 0,
            base_array_layer,
            layer_count,
        }
    }
}

impl Default for Subresource {
    fn default() -> Self {
        Self::level(0)
    }
}

/// How the z axis of an image is addressed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageKind {
    /// 1D/2D images, optionally arrayed: z comes from the subresource's
    /// array layer range.
    #[default]
    Flat,
    /// 3D images: z comes from the corner offsets.
    Volume,
}

/// One side of a copy region as submitted: two corners plus a subresource.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageBox {
    pub corners: [Offset3; 2],
    pub subresource: Subresource,
}

impl ImageBox {
    /// Corner pair on mip level 0, layer 0.
    pub const fn new(c0: Offset3, c1: Offset3) -> Self {
        Self {
            corners: [c0, c1],
            subresource: Subresource::level(0),
        }
    }

    /// Replace the subresource.
    pub fn subresource(mut self, subresource: Subresource) -> Self {
        self.subresource = subresource;
        self
    }

    /// Flat images take z from the layer range, so their z corners never mirror.
    fn mirror_flags(&self, kind: ImageKind) -> MirrorFlags {
        let flags = MirrorFlags::from_corners(self.corners[0], self.corners[1]);
        match kind {
            ImageKind::Flat => MirrorFlags::from_bits(flags.bits() & !MirrorFlags::Z.bits()),
            ImageKind::Volume => flags,
        }
    }

    fn resolve(&self, kind: ImageKind) -> Box3 {
        let mut b = Box3::from_corners(self.corners[0], self.corners[1]);
        if kind == ImageKind::Flat {
            b.min.z = self.subresource.base_array_layer as i32;
            b.max.z = (self.subresource.base_array_layer + self.subresource.layer_count) as i32;
        }
        b
    }
}

/// A source/destination box pair as submitted to a copy or blit command.
///
/// Corners may be descending per axis; descending corners encode mirroring.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CopyRegion {
    pub src: ImageBox,
    pub dst: ImageBox,
}

impl CopyRegion {
    /// Blit between two corner pairs on mip level 0.
    pub const fn blit(src: [Offset3; 2], dst: [Offset3; 2]) -> Self {
        Self {
            src: ImageBox::new(src[0], src[1]),
            dst: ImageBox::new(dst[0], dst[1]),
        }
    }

    /// Unscaled, unmirrored copy of `extent` texels from `src_offset` to `dst_offset`.
    pub fn copy(src_offset: Offset3, dst_offset: Offset3, extent: Extent3) -> Self {
        let far = |o: Offset3| {
            Offset3::new(
                o.x + extent.width as i32,
                o.y + extent.height as i32,
                o.z + extent.depth as i32,
            )
        };
        Self::blit([src_offset, far(src_offset)], [dst_offset, far(dst_offset)])
    }

    /// Whole-image blit from `src` extent onto `dst` extent.
    pub fn whole(src: Extent3, dst: Extent3) -> Self {
        let s = Box3::from_extent(src);
        let d = Box3::from_extent(dst);
        Self::blit([s.min, s.max], [d.min, d.max])
    }

    /// Set the source and destination mip levels.
    pub fn mip_levels(mut self, src_level: u32, dst_level: u32) -> Self {
        self.src.subresource.mip_level = src_level;
        self.dst.subresource.mip_level = dst_level;
        self
    }

    /// Set the destination array layer range.
    pub fn dst_layers(mut self, base_array_layer: u32, layer_count: u32) -> Self {
        self.dst.subresource.base_array_layer = base_array_layer;
        self.dst.subresource.layer_count = layer_count;
        self
    }

    /// Set the source array layer range.
    pub fn src_layers(mut self, base_array_layer: u32, layer_count: u32) -> Self {
        self.src.subresource.base_array_layer = base_array_layer;
        self.src.subresource.layer_count = layer_count;
        self
    }
}

/// A region rewritten with ascending corners and explicit mirroring.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NormalizedRegion {
    /// Ascending source box.
    pub src: Box3,
    /// Ascending destination box.
    pub dst: Box3,
    /// Effective mirroring: source flags XOR destination flags.
    pub mirror: MirrorFlags,
    pub src_subresource: Subresource,
    pub dst_subresource: Subresource,
}

impl NormalizedRegion {
    /// Per-axis source-texels-per-destination-texel ratio.
    pub fn scale(&self) -> [f64; 3] {
        let s = self.src.extent();
        let d = self.dst.extent();
        core::array::from_fn(|axis| {
            let de = d.axis(axis);
            if de == 0 {
                0.0
            } else {
                s.axis(axis) as f64 / de as f64
            }
        })
    }

    /// Whether source and destination have the same extent and no mirroring.
    pub fn is_identity_scale(&self) -> bool {
        self.mirror.is_empty() && self.src.extent() == self.dst.extent()
    }

    /// The canonical form as a submittable region: ascending corners on
    /// both sides, same subresources.
    pub fn canonical(&self) -> CopyRegion {
        CopyRegion {
            src: ImageBox {
                corners: [self.src.min, self.src.max],
                subresource: self.src_subresource,
            },
            dst: ImageBox {
                corners: [self.dst.min, self.dst.max],
                subresource: self.dst_subresource,
            },
        }
    }
}

/// Canonicalize a submitted region.
///
/// Mirror flags are computed per side from the raw corners, then XORed. Both
/// boxes are rewritten ascending. On [`ImageKind::Flat`] images the z range is
/// taken from the subresource's array layers and z is never mirrored.
pub fn normalize(region: &CopyRegion, src_kind: ImageKind, dst_kind: ImageKind) -> NormalizedRegion {
    let mirror = region.src.mirror_flags(src_kind) ^ region.dst.mirror_flags(dst_kind);
    NormalizedRegion {
        src: region.src.resolve(src_kind),
        dst: region.dst.resolve(dst_kind),
        mirror,
        src_subresource: region.src.subresource,
        dst_subresource: region.dst.subresource,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn o(x: i32, y: i32, z: i32) -> Offset3 {
        Offset3::new(x, y, z)
    }

    #[test]
    fn ascending_region_has_no_mirror() {
        let r = CopyRegion::blit([o(0, 0, 0), o(16, 16, 1)], [o(0, 0, 0), o(32, 32, 1)]);
        let n = normalize(&r, ImageKind::Flat, ImageKind::Flat);
        assert!(n.mirror.is_empty());
        assert_eq!(n.scale(), [0.5, 0.5, 1.0]);
    }

    #[test]
    fn destination_mirror_x() {
        let r = CopyRegion::blit([o(0, 0, 0), o(16, 16, 1)], [o(16, 0, 0), o(0, 16, 1)]);
        let n = normalize(&r, ImageKind::Flat, ImageKind::Flat);
        assert_eq!(n.mirror, MirrorFlags::X);
        assert_eq!(n.dst, Box3::new(o(0, 0, 0), o(16, 16, 1)));
    }

    #[test]
    fn source_mirror_y() {
        let r = CopyRegion::blit([o(0, 16, 0), o(16, 0, 1)], [o(0, 0, 0), o(16, 16, 1)]);
        let n = normalize(&r, ImageKind::Flat, ImageKind::Flat);
        assert_eq!(n.mirror, MirrorFlags::Y);
        assert_eq!(n.src, Box3::new(o(0, 0, 0), o(16, 16, 1)));
    }

    #[test]
    fn mirror_on_both_sides_cancels() {
        let r = CopyRegion::blit([o(16, 16, 0), o(0, 0, 1)], [o(32, 0, 0), o(0, 32, 1)]);
        let n = normalize(&r, ImageKind::Flat, ImageKind::Flat);
        assert_eq!(n.mirror, MirrorFlags::Y);
    }

    #[test]
    fn zero_extent_axis_never_mirrors() {
        let flags = MirrorFlags::from_corners(o(4, 3, 0), o(0, 3, 0));
        assert_eq!(flags, MirrorFlags::X);
    }

    #[test]
    fn volume_mirror_z() {
        let r = CopyRegion::blit([o(0, 0, 0), o(8, 8, 8)], [o(0, 0, 8), o(8, 8, 0)]);
        let n = normalize(&r, ImageKind::Volume, ImageKind::Volume);
        assert_eq!(n.mirror, MirrorFlags::Z);
        assert_eq!(n.dst.extent(), Extent3::new(8, 8, 8));
    }

    #[test]
    fn flat_destination_uses_layer_range() {
        let r = CopyRegion::blit([o(0, 0, 0), o(8, 8, 4)], [o(0, 0, 0), o(8, 8, 1)]).dst_layers(2, 4);
        let n = normalize(&r, ImageKind::Volume, ImageKind::Flat);
        assert_eq!(n.dst.min.z, 2);
        assert_eq!(n.dst.max.z, 6);
        assert_eq!(n.src.extent().depth, 4);
        assert!(n.mirror.is_empty());
    }

    #[test]
    fn flat_side_ignores_reversed_z_corners() {
        let r = CopyRegion::blit([o(0, 0, 1), o(8, 8, 0)], [o(8, 0, 0), o(0, 8, 1)]);
        let n = normalize(&r, ImageKind::Flat, ImageKind::Flat);
        assert_eq!(n.mirror, MirrorFlags::X);
        assert_eq!(n.src.extent().depth, 1);

        // The same corners on a volume source still mirror z.
        let n = normalize(&r, ImageKind::Volume, ImageKind::Flat);
        assert_eq!(n.mirror, MirrorFlags::X | MirrorFlags::Z);
    }

    #[test]
    fn copy_constructor_is_identity_scale() {
        let r = CopyRegion::copy(o(2, 2, 0), o(10, 0, 0), Extent3::new(4, 5, 1));
        let n = normalize(&r, ImageKind::Flat, ImageKind::Flat);
        assert!(n.is_identity_scale());
        assert_eq!(n.dst, Box3::new(o(10, 0, 0), o(14, 5, 1)));
    }

    #[test]
    fn flag_algebra() {
        assert_eq!(MirrorFlags::X ^ MirrorFlags::X, MirrorFlags::NONE);
        assert_eq!(MirrorFlags::X | MirrorFlags::Y | MirrorFlags::Z, MirrorFlags::ALL);
        assert!(MirrorFlags::ALL.contains(MirrorFlags::Y));
        assert!(!MirrorFlags::X.contains(MirrorFlags::Y));
        assert_eq!(MirrorFlags::from_bits(0xff), MirrorFlags::ALL);
        assert_eq!(MirrorFlags::for_axis(2), MirrorFlags::Z);
    }

    fn offset_strategy() -> impl Strategy<Value = Offset3> {
        (-64i32..64, -64i32..64, -8i32..8).prop_map(|(x, y, z)| Offset3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn renormalizing_canonical_form_is_a_no_op(
            s0 in offset_strategy(), s1 in offset_strategy(),
            d0 in offset_strategy(), d1 in offset_strategy(),
        ) {
            let r = CopyRegion::blit([s0, s1], [d0, d1]);
            let n = normalize(&r, ImageKind::Volume, ImageKind::Volume);
            let again = normalize(&n.canonical(), ImageKind::Volume, ImageKind::Volume);
            prop_assert_eq!(again.src, n.src);
            prop_assert_eq!(again.dst, n.dst);
            prop_assert!(again.mirror.is_empty());
        }

        #[test]
        fn mirroring_twice_restores_box(c0 in offset_strategy(), c1 in offset_strategy(), bits in 0u8..8) {
            let flags = MirrorFlags::from_bits(bits);
            let b = Box3::from_corners(c0, c1);
            let once = b.mirrored(flags);
            let twice = Box3::from_corners(once[0], once[1]).mirrored(flags);
            prop_assert_eq!(twice, once);
            prop_assert_eq!(Box3::from_corners(once[0], once[1]), b);
        }

        #[test]
        fn reversing_both_sides_cancels(
            s0 in offset_strategy(), s1 in offset_strategy(),
            d0 in offset_strategy(), d1 in offset_strategy(),
            axis in 0usize..3,
        ) {
            let forward = normalize(&CopyRegion::blit([s0, s1], [d0, d1]), ImageKind::Volume, ImageKind::Volume);
            let flip = MirrorFlags::for_axis(axis);
            let sb = Box3::from_corners(s0, s1);
            let db = Box3::from_corners(d0, d1);
            // Force both sides descending on `axis`, ascending elsewhere.
            let src = sb.mirrored(flip);
            let dst = db.mirrored(flip);
            let both = normalize(&CopyRegion::blit(src, dst), ImageKind::Volume, ImageKind::Volume);
            prop_assert!(!both.mirror.axis(axis));
            prop_assert_eq!(both.src, forward.src);
            prop_assert_eq!(both.dst, forward.dst);
        }
    }
}
