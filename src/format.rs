//! Pixel format descriptors and the static format tables behind them.
//!
//! A [`PixelFormat`] is a channel order, a storage [`ChannelType`] and an sRGB
//! flag. Everything else (numeric [`ChannelClass`], per-channel bit depth,
//! mantissa precision) is looked up in immutable tables indexed by the
//! channel type.
//!
//! Bit depths are reported in *semantic* order (R, G, B, A; or depth,
//! stencil for combined formats). Packed types list their components in
//! memory order; [`swizzle_bgr`] maps memory order to semantic order for
//! BGR/BGRA layouts.

/// Which channels a format carries and in what memory order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    R,
    Rg,
    Rgb,
    Rgba,
    Bgr,
    Bgra,
    /// Depth only.
    D,
    /// Stencil only.
    S,
    /// Combined depth and stencil.
    Ds,
}

impl ChannelOrder {
    /// Number of stored components.
    pub const fn component_count(self) -> usize {
        match self {
            Self::R | Self::D | Self::S => 1,
            Self::Rg | Self::Ds => 2,
            Self::Rgb | Self::Bgr => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }

    /// Whether memory order is blue-first.
    pub const fn is_bgr(self) -> bool {
        matches!(self, Self::Bgr | Self::Bgra)
    }
}

/// Numeric interpretation of a format's channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelClass {
    /// Fixed point in `[0, 1]`.
    UnsignedNormalized,
    /// Fixed point in `[-1, 1]`.
    SignedNormalized,
    UnsignedInteger,
    SignedInteger,
    FloatingPoint,
}

impl ChannelClass {
    /// Whether values are stored and compared as plain integers.
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::UnsignedInteger | Self::SignedInteger)
    }

    /// Whether values are normalized fixed point.
    pub const fn is_fixed_point(self) -> bool {
        matches!(self, Self::UnsignedNormalized | Self::SignedNormalized)
    }
}

/// Storage type of a format's components.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelType {
    Unorm8,
    Unorm16,
    Unorm24,
    Snorm8,
    Snorm16,
    Uint8,
    Uint16,
    Uint32,
    Sint8,
    Sint16,
    Sint32,
    /// IEEE 754 binary16.
    Half,
    Float,
    Float64,
    /// 5-6-5 packed normalized.
    Unorm565,
    /// 10-10-10-2 packed normalized.
    Unorm1010102,
    /// 11-11-10 packed unsigned float.
    Ufloat11_11_10,
    /// Shared-exponent 9-9-9 mantissas, 5-bit exponent.
    Ufloat999E5,
    /// 24-bit normalized depth with 8-bit stencil.
    Unorm24Uint8,
    /// 32-bit float depth with 8-bit stencil.
    Float32Uint8,
}

struct TypeInfo {
    class: ChannelClass,
    /// Component bits in memory order.
    bits: [u8; 4],
    /// Mantissa (significant) bits in memory order.
    mantissa: [u8; 4],
}

const fn uniform(class: ChannelClass, bits: u8, mantissa: u8) -> TypeInfo {
    TypeInfo {
        class,
        bits: [bits; 4],
        mantissa: [mantissa; 4],
    }
}

use ChannelClass::*;

/// Indexed by `ChannelType as usize`.
static TYPE_TABLE: [TypeInfo; 20] = [
    uniform(UnsignedNormalized, 8, 8),  // Unorm8
    uniform(UnsignedNormalized, 16, 16), // Unorm16
    uniform(UnsignedNormalized, 24, 24), // Unorm24
    uniform(SignedNormalized, 8, 7),    // Snorm8
    uniform(SignedNormalized, 16, 15),  // Snorm16
    uniform(UnsignedInteger, 8, 8),     // Uint8
    uniform(UnsignedInteger, 16, 16),   // Uint16
    uniform(UnsignedInteger, 32, 32),   // Uint32
    uniform(SignedInteger, 8, 7),       // Sint8
    uniform(SignedInteger, 16, 15),     // Sint16
    uniform(SignedInteger, 32, 31),     // Sint32
    uniform(FloatingPoint, 16, 10),     // Half
    uniform(FloatingPoint, 32, 23),     // Float
    uniform(FloatingPoint, 64, 52),     // Float64
    TypeInfo {
        class: UnsignedNormalized,
        bits: [5, 6, 5, 0],
        mantissa: [5, 6, 5, 0],
    }, // Unorm565
    TypeInfo {
        class: UnsignedNormalized,
        bits: [10, 10, 10, 2],
        mantissa: [10, 10, 10, 2],
    }, // Unorm1010102
    TypeInfo {
        class: FloatingPoint,
        bits: [11, 11, 10, 0],
        mantissa: [6, 6, 5, 0],
    }, // Ufloat11_11_10
    TypeInfo {
        class: FloatingPoint,
        bits: [9, 9, 9, 0],
        mantissa: [9, 9, 9, 0],
    }, // Ufloat999E5
    TypeInfo {
        class: UnsignedNormalized,
        bits: [24, 8, 0, 0],
        mantissa: [24, 8, 0, 0],
    }, // Unorm24Uint8
    TypeInfo {
        class: FloatingPoint,
        bits: [32, 8, 0, 0],
        mantissa: [23, 8, 0, 0],
    }, // Float32Uint8
];

impl ChannelType {
    fn info(self) -> &'static TypeInfo {
        &TYPE_TABLE[self as usize]
    }

    /// Numeric class. Combined depth/stencil types report their depth class.
    pub fn class(self) -> ChannelClass {
        self.info().class
    }

    /// Whether the type packs several components with differing widths.
    pub const fn is_packed(self) -> bool {
        matches!(
            self,
            Self::Unorm565
                | Self::Unorm1010102
                | Self::Ufloat11_11_10
                | Self::Ufloat999E5
                | Self::Unorm24Uint8
                | Self::Float32Uint8
        )
    }

    /// Whether the type is a combined depth/stencil storage type.
    pub const fn is_depth_stencil(self) -> bool {
        matches!(self, Self::Unorm24Uint8 | Self::Float32Uint8)
    }
}

/// Which logical part of an image is addressed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Aspect {
    Color,
    Depth,
    Stencil,
}

/// Map a memory-order vector to semantic (R, G, B, A) order.
///
/// BGR/BGRA layouts swap the first and third components; every other order
/// is returned unchanged.
pub fn swizzle_bgr<T: Copy>(order: ChannelOrder, v: [T; 4]) -> [T; 4] {
    if order.is_bgr() {
        [v[2], v[1], v[0], v[3]]
    } else {
        v
    }
}

/// Immutable description of a pixel format.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    pub order: ChannelOrder,
    pub ty: ChannelType,
    /// Color channels are sRGB encoded.
    pub srgb: bool,
}

impl PixelFormat {
    /// Create a format descriptor.
    pub const fn new(order: ChannelOrder, ty: ChannelType) -> Self {
        Self {
            order,
            ty,
            srgb: false,
        }
    }

    /// Create an sRGB-encoded format descriptor.
    pub const fn srgb(order: ChannelOrder, ty: ChannelType) -> Self {
        Self {
            order,
            ty,
            srgb: true,
        }
    }

    pub const R8_UNORM: Self = Self::new(ChannelOrder::R, ChannelType::Unorm8);
    pub const R8_SNORM: Self = Self::new(ChannelOrder::R, ChannelType::Snorm8);
    pub const RG8_UNORM: Self = Self::new(ChannelOrder::Rg, ChannelType::Unorm8);
    pub const RG8_SNORM: Self = Self::new(ChannelOrder::Rg, ChannelType::Snorm8);
    pub const RGB8_UNORM: Self = Self::new(ChannelOrder::Rgb, ChannelType::Unorm8);
    pub const RGB8_SRGB: Self = Self::srgb(ChannelOrder::Rgb, ChannelType::Unorm8);
    pub const RGBA8_UNORM: Self = Self::new(ChannelOrder::Rgba, ChannelType::Unorm8);
    pub const RGBA8_SNORM: Self = Self::new(ChannelOrder::Rgba, ChannelType::Snorm8);
    pub const RGBA8_UINT: Self = Self::new(ChannelOrder::Rgba, ChannelType::Uint8);
    pub const RGBA8_SINT: Self = Self::new(ChannelOrder::Rgba, ChannelType::Sint8);
    pub const RGBA8_SRGB: Self = Self::srgb(ChannelOrder::Rgba, ChannelType::Unorm8);
    pub const BGRA8_UNORM: Self = Self::new(ChannelOrder::Bgra, ChannelType::Unorm8);
    pub const BGRA8_SRGB: Self = Self::srgb(ChannelOrder::Bgra, ChannelType::Unorm8);
    pub const R16_UNORM: Self = Self::new(ChannelOrder::R, ChannelType::Unorm16);
    pub const R16_SNORM: Self = Self::new(ChannelOrder::R, ChannelType::Snorm16);
    pub const RG16_UNORM: Self = Self::new(ChannelOrder::Rg, ChannelType::Unorm16);
    pub const RG16_SNORM: Self = Self::new(ChannelOrder::Rg, ChannelType::Snorm16);
    pub const R16_SFLOAT: Self = Self::new(ChannelOrder::R, ChannelType::Half);
    pub const RGBA16_UNORM: Self = Self::new(ChannelOrder::Rgba, ChannelType::Unorm16);
    pub const RGBA16_SNORM: Self = Self::new(ChannelOrder::Rgba, ChannelType::Snorm16);
    pub const RGBA16_UINT: Self = Self::new(ChannelOrder::Rgba, ChannelType::Uint16);
    pub const RGBA16_SINT: Self = Self::new(ChannelOrder::Rgba, ChannelType::Sint16);
    pub const RGBA16_SFLOAT: Self = Self::new(ChannelOrder::Rgba, ChannelType::Half);
    pub const R32_SFLOAT: Self = Self::new(ChannelOrder::R, ChannelType::Float);
    pub const RGBA32_UINT: Self = Self::new(ChannelOrder::Rgba, ChannelType::Uint32);
    pub const RGBA32_SINT: Self = Self::new(ChannelOrder::Rgba, ChannelType::Sint32);
    pub const RGBA32_SFLOAT: Self = Self::new(ChannelOrder::Rgba, ChannelType::Float);
    pub const R64_SFLOAT: Self = Self::new(ChannelOrder::R, ChannelType::Float64);
    pub const R5G6B5_UNORM: Self = Self::new(ChannelOrder::Rgb, ChannelType::Unorm565);
    pub const B5G6R5_UNORM: Self = Self::new(ChannelOrder::Bgr, ChannelType::Unorm565);
    pub const A2B10G10R10_UNORM: Self = Self::new(ChannelOrder::Rgba, ChannelType::Unorm1010102);
    pub const A2R10G10B10_UNORM: Self = Self::new(ChannelOrder::Bgra, ChannelType::Unorm1010102);
    pub const B10G11R11_UFLOAT: Self = Self::new(ChannelOrder::Rgb, ChannelType::Ufloat11_11_10);
    pub const E5B9G9R9_UFLOAT: Self = Self::new(ChannelOrder::Rgb, ChannelType::Ufloat999E5);
    pub const D16_UNORM: Self = Self::new(ChannelOrder::D, ChannelType::Unorm16);
    pub const X8_D24_UNORM: Self = Self::new(ChannelOrder::D, ChannelType::Unorm24);
    pub const D32_SFLOAT: Self = Self::new(ChannelOrder::D, ChannelType::Float);
    pub const S8_UINT: Self = Self::new(ChannelOrder::S, ChannelType::Uint8);
    pub const D24_UNORM_S8_UINT: Self = Self::new(ChannelOrder::Ds, ChannelType::Unorm24Uint8);
    pub const D32_SFLOAT_S8_UINT: Self = Self::new(ChannelOrder::Ds, ChannelType::Float32Uint8);

    /// Numeric class of the channels. Stencil-only formats are unsigned
    /// integer; combined depth/stencil formats report the depth class.
    pub fn class(&self) -> ChannelClass {
        match self.order {
            ChannelOrder::S => ChannelClass::UnsignedInteger,
            _ => self.ty.class(),
        }
    }

    /// Whether the channels are stored as plain integers.
    pub fn is_integer(&self) -> bool {
        self.class().is_integer()
    }

    /// Whether the channels are floating point.
    pub fn is_float(&self) -> bool {
        self.class() == ChannelClass::FloatingPoint
    }

    pub fn has_depth(&self) -> bool {
        matches!(self.order, ChannelOrder::D | ChannelOrder::Ds)
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self.order, ChannelOrder::S | ChannelOrder::Ds)
    }

    pub fn is_combined_depth_stencil(&self) -> bool {
        self.order == ChannelOrder::Ds
    }

    /// Per-component bits in memory order, zero for absent components.
    pub fn memory_bit_depth(&self) -> [u32; 4] {
        self.per_component(self.ty.info().bits)
    }

    /// Per-component mantissa bits in memory order, zero for absent components.
    pub fn memory_mantissa_bit_depth(&self) -> [u32; 4] {
        self.per_component(self.ty.info().mantissa)
    }

    /// Per-channel bits in semantic order, zero for absent channels.
    pub fn bit_depth(&self) -> [u32; 4] {
        swizzle_bgr(self.order, self.memory_bit_depth())
    }

    /// Per-channel mantissa bits in semantic order.
    pub fn mantissa_bit_depth(&self) -> [u32; 4] {
        swizzle_bgr(self.order, self.memory_mantissa_bit_depth())
    }

    /// Bytes per texel in memory.
    pub fn texel_size(&self) -> usize {
        let count = self.order.component_count();
        match self.ty {
            ChannelType::Unorm565 => 2,
            ChannelType::Unorm1010102
            | ChannelType::Ufloat11_11_10
            | ChannelType::Ufloat999E5
            | ChannelType::Unorm24Uint8 => 4,
            ChannelType::Float32Uint8 => 8,
            // X8_D24 style: each 24-bit component padded to 32.
            ChannelType::Unorm24 => 4 * count,
            _ => count * self.ty.info().bits[0] as usize / 8,
        }
    }

    /// Bit offset of each component within a little-endian texel word, in
    /// memory order.
    ///
    /// Byte-aligned types and the LSB-first packed types place the first
    /// component lowest. 5-6-5 and 24/8 depth/stencil put it highest. The
    /// shared exponent of 9-9-9-5 sits above the mantissas at bit 27.
    pub fn component_shifts(&self) -> [u32; 4] {
        match self.ty {
            ChannelType::Unorm565 => [11, 5, 0, 0],
            ChannelType::Unorm24Uint8 => [8, 0, 0, 0],
            ChannelType::Unorm24 => [0, 32, 64, 96],
            _ => {
                let bits = self.memory_bit_depth();
                let mut shifts = [0; 4];
                for c in 1..4 {
                    shifts[c] = shifts[c - 1] + bits[c - 1];
                }
                shifts
            }
        }
    }

    /// Channels that carry data, in semantic order.
    pub fn channel_mask(&self) -> [bool; 4] {
        self.bit_depth().map(|b| b != 0)
    }

    fn per_component(&self, bits: [u8; 4]) -> [u32; 4] {
        let count = self.order.component_count();
        let single = match (self.order, self.ty.is_depth_stencil()) {
            (ChannelOrder::S, _) => Some(8),
            (ChannelOrder::D, true) => Some(bits[0]),
            _ => None,
        };
        core::array::from_fn(|i| match single {
            Some(b) if i == 0 => b as u32,
            Some(_) => 0,
            None if i < count => bits[i] as u32,
            None => 0,
        })
    }

    /// Aspects stored by this format.
    pub fn aspects(&self) -> &'static [Aspect] {
        match self.order {
            ChannelOrder::D => &[Aspect::Depth],
            ChannelOrder::S => &[Aspect::Stencil],
            ChannelOrder::Ds => &[Aspect::Depth, Aspect::Stencil],
            _ => &[Aspect::Color],
        }
    }

    /// Format of a single aspect viewed on its own, or `None` when the
    /// aspect isn't stored.
    ///
    /// The stencil aspect is always 8-bit unsigned integer; the depth aspect
    /// of a combined format is its depth storage type.
    pub fn aspect_format(&self, aspect: Aspect) -> Option<PixelFormat> {
        match (aspect, self.order) {
            (Aspect::Color, ChannelOrder::D | ChannelOrder::S | ChannelOrder::Ds) => None,
            (Aspect::Color, _) => Some(*self),
            (Aspect::Depth, ChannelOrder::D) => Some(*self),
            (Aspect::Depth, ChannelOrder::Ds) => Some(Self::new(
                ChannelOrder::D,
                match self.ty {
                    ChannelType::Float32Uint8 => ChannelType::Float,
                    _ => ChannelType::Unorm24,
                },
            )),
            (Aspect::Stencil, ChannelOrder::S | ChannelOrder::Ds) => Some(Self::S8_UINT),
            _ => None,
        }
    }
}

/// Block-compression family of a [`CompressedFormat`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompressedFamily {
    Etc,
    Eac,
    Astc,
    Bc,
}

/// Block-compressed formats whose decompressed data can be verified.
///
/// Decompression itself happens outside this crate; these values only drive
/// tolerance selection.
#[non_exhaustive]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompressedFormat {
    Etc1Rgb8,
    Etc2Rgb8,
    Etc2Srgb8,
    Etc2Rgb8A1,
    Etc2Srgb8A1,
    Etc2EacRgba8,
    Etc2EacSrgb8A8,
    EacR11,
    EacSignedR11,
    EacRg11,
    EacSignedRg11,
    /// ASTC LDR with the given block footprint.
    Astc { block_width: u8, block_height: u8, srgb: bool },
    Bc1Rgb,
    Bc1RgbSrgb,
    Bc1Rgba,
    Bc1RgbaSrgb,
    Bc2,
    Bc2Srgb,
    Bc3,
    Bc3Srgb,
    Bc4Unorm,
    Bc4Snorm,
    Bc5Unorm,
    Bc5Snorm,
    Bc6hUfloat,
    Bc6hSfloat,
    Bc7,
    Bc7Srgb,
}

impl CompressedFormat {
    /// Compression family.
    pub fn family(&self) -> CompressedFamily {
        use CompressedFormat::*;
        match self {
            Etc1Rgb8 | Etc2Rgb8 | Etc2Srgb8 | Etc2Rgb8A1 | Etc2Srgb8A1 | Etc2EacRgba8
            | Etc2EacSrgb8A8 => CompressedFamily::Etc,
            EacR11 | EacSignedR11 | EacRg11 | EacSignedRg11 => CompressedFamily::Eac,
            Astc { .. } => CompressedFamily::Astc,
            _ => CompressedFamily::Bc,
        }
    }

    /// Block footprint in texels.
    pub fn block_size(&self) -> (u32, u32) {
        match self {
            Self::Astc {
                block_width,
                block_height,
                ..
            } => (*block_width as u32, *block_height as u32),
            _ => (4, 4),
        }
    }

    /// Whether decoded values are signed (range `[-1, 1]`).
    pub fn is_signed(&self) -> bool {
        use CompressedFormat::*;
        matches!(
            self,
            EacSignedR11 | EacSignedRg11 | Bc4Snorm | Bc5Snorm | Bc6hSfloat
        )
    }

    /// Whether the format is one of the BC6H HDR float formats.
    pub fn is_bc6h(&self) -> bool {
        matches!(self, Self::Bc6hUfloat | Self::Bc6hSfloat)
    }

    /// Whether color channels are sRGB encoded.
    pub fn is_srgb(&self) -> bool {
        use CompressedFormat::*;
        match self {
            Astc { srgb, .. } => *srgb,
            Etc2Srgb8 | Etc2Srgb8A1 | Etc2EacSrgb8A8 | Bc1RgbSrgb | Bc1RgbaSrgb | Bc2Srgb
            | Bc3Srgb | Bc7Srgb => true,
            _ => false,
        }
    }

    /// Effective per-channel precision of decoded texels, used for
    /// tolerance derivation. BC6H has none (its tolerance is a constant).
    pub fn bit_depth(&self) -> [u32; 4] {
        use CompressedFormat::*;
        match self {
            EacSignedR11 | Bc4Snorm => [7, 0, 0, 0],
            EacR11 | Bc4Unorm => [8, 0, 0, 0],
            EacSignedRg11 | Bc5Snorm => [7, 7, 0, 0],
            EacRg11 | Bc5Unorm => [8, 8, 0, 0],
            Etc1Rgb8 | Etc2Rgb8 | Etc2Srgb8 => [8, 8, 8, 0],
            Etc2Rgb8A1 | Etc2Srgb8A1 => [8, 8, 8, 1],
            Etc2EacRgba8 | Etc2EacSrgb8A8 | Astc { .. } => [8, 8, 8, 8],
            Bc1Rgb | Bc1RgbSrgb | Bc2 | Bc2Srgb | Bc3 | Bc3Srgb => [5, 6, 5, 0],
            Bc1Rgba | Bc1RgbaSrgb | Bc7 | Bc7Srgb => [5, 5, 5, 1],
            Bc6hUfloat | Bc6hSfloat => [0, 0, 0, 0],
        }
    }

    /// Uncompressed format an external decoder produces for this format.
    pub fn decompressed_format(&self) -> PixelFormat {
        use CompressedFormat::*;
        match self {
            EacR11 => PixelFormat::R16_UNORM,
            EacSignedR11 => PixelFormat::R16_SNORM,
            EacRg11 => PixelFormat::RG16_UNORM,
            EacSignedRg11 => PixelFormat::RG16_SNORM,
            Bc4Unorm => PixelFormat::R8_UNORM,
            Bc4Snorm => PixelFormat::R8_SNORM,
            Bc5Unorm => PixelFormat::RG8_UNORM,
            Bc5Snorm => PixelFormat::RG8_SNORM,
            Bc6hUfloat | Bc6hSfloat => PixelFormat::RGBA16_SFLOAT,
            f if f.is_srgb() => PixelFormat::RGBA8_SRGB,
            _ => PixelFormat::RGBA8_UNORM,
        }
    }
}
