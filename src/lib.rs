//! Verification of GPU blit and copy results against software references.
//!
//! Given the source image, the destination's prior contents, the submitted
//! copy regions and the captured result, decide whether the result is an
//! acceptable rendering of the blit. Tolerances are derived from the formats
//! involved; filtered blits are checked against references resampled in
//! software; mip chains are verified level by level.
//!
//! `no_std` compatible (needs `alloc`).
//!
//! # Modules
//!
//! - [`region`]: copy regions, mirror flags, normalization to ascending boxes
//! - [`format`]: pixel and block-compressed format descriptors
//! - [`buffer`]: quantizing texel storage
//! - [`tolerance`]: per-format and per-blit error bounds
//! - [`resample`]: nearest/linear/cubic reference blits
//! - [`compare`]: nearest, filtered and exact acceptance checks
//! - [`mip`]: level-by-level mip chain verification
//! - [`verify`]: one-call blit and copy verification
//!
//! ```
//! use zenblit::*;
//!
//! let src = PixelBuffer::from_fn(PixelFormat::RGBA8_UNORM, Extent3::new(4, 4, 1), |x, y, _| {
//!     [x as f64 / 3.0, y as f64 / 3.0, 0.0, 1.0]
//! });
//! let dst = PixelBuffer::new(PixelFormat::RGBA8_UNORM, src.extent());
//!
//! // Mirrored along x: corners given right-to-left.
//! let region = CopyRegion::blit(
//!     [Offset3::new(4, 0, 0), Offset3::new(0, 4, 1)],
//!     [Offset3::new(0, 0, 0), Offset3::new(4, 4, 1)],
//! );
//! let check = BlitCheck::new(FilterMode::Nearest);
//!
//! // The unflipped source is not a valid result.
//! assert!(!check.verify(&src, &dst, &src, &[region]).unwrap().passed());
//!
//! let flipped = PixelBuffer::from_fn(src.format(), src.extent(), |x, y, z| src.pixel(3 - x, y, z));
//! assert!(check.verify(&src, &dst, &flipped, &[region]).unwrap().passed());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod buffer;
pub mod compare;
pub mod error;
pub mod format;
pub mod mip;
pub mod region;
pub mod resample;
pub mod tolerance;
pub mod verify;

pub use buffer::{DEFAULT_TEXEL, PixelBuffer, linear_to_srgb, srgb_to_linear};
pub use compare::{
    CompressedClamps, ComparisonOutcome, ERROR_MASK_FORMAT, EXACT_DEPTH_THRESHOLD, MASK_ERROR, MASK_OK,
    Rejection, ValueClamp, Verdict, compare_exact, compare_filtered, compare_filtered_compressed,
    compare_nearest, compare_nearest_compressed, compressed_filtered_clamp, compressed_nearest_clamps,
};
pub use error::VerifyError;
pub use format::{
    Aspect, ChannelClass, ChannelOrder, ChannelType, CompressedFamily, CompressedFormat, PixelFormat,
};
pub use mip::{
    ChainOutcome, ChainParams, LevelOutcome, MipChain, ideal_chain, level_extent, mip_regions,
    verify_chain,
};
pub use region::{
    Box3, CopyRegion, Extent3, ImageBox, ImageKind, MirrorFlags, NormalizedRegion, Offset3,
    Subresource, normalize,
};
pub use resample::{FilterMode, ReferenceSet, Sampler, blit_clamped, blit_unclamped, generate_references};
pub use tolerance::{
    CompressedEpsilon, Compression, IntToleranceVector, Threshold, ToleranceConfig, ToleranceVector,
    filtered_threshold, nearest_threshold,
};
pub use verify::{BlitCheck, VerificationReport, verify_copy};
