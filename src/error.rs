//! Structural contract violations.
//!
//! These are caller bugs (mismatched buffers, out-of-range regions), reported
//! before any texel is compared. Tolerance failures and illegal format
//! combinations are verdicts, not errors; see [`Verdict`](crate::Verdict).

use crate::format::{Aspect, PixelFormat};
use crate::region::Extent3;

/// Verification setup error.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum VerifyError {
    /// Result and reference have different dimensions.
    #[error("extent mismatch: expected {expected:?}, got {actual:?}")]
    ExtentMismatch { expected: Extent3, actual: Extent3 },
    /// Result and reference have different formats.
    #[error("format mismatch: expected {expected:?}, got {actual:?}")]
    FormatMismatch {
        expected: PixelFormat,
        actual: PixelFormat,
    },
    /// Texel data supplied to a buffer doesn't cover its extent.
    #[error("buffer data holds {actual} texels, extent needs {expected}")]
    DataLength { expected: usize, actual: usize },
    /// A region reaches outside the image it addresses.
    #[error("region {min:?}..{max:?} lies outside image extent {extent:?}")]
    RegionOutOfBounds {
        min: [i32; 3],
        max: [i32; 3],
        extent: Extent3,
    },
    /// A region names a mip level the chain doesn't have.
    #[error("mip level {level} out of range for a {levels}-level chain")]
    LevelOutOfRange { level: u32, levels: usize },
    /// Captured and ideal chains have different level counts.
    #[error("chain has {captured} captured levels but {ideal} ideal levels")]
    ChainLength { captured: usize, ideal: usize },
    /// The format has no such aspect.
    #[error("format {format:?} has no {aspect:?} aspect")]
    MissingAspect { format: PixelFormat, aspect: Aspect },
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn messages_name_the_offending_values() {
        let e = VerifyError::LevelOutOfRange { level: 4, levels: 3 };
        assert_eq!(e.to_string(), "mip level 4 out of range for a 3-level chain");

        let e = VerifyError::MissingAspect {
            format: PixelFormat::RGBA8_UNORM,
            aspect: Aspect::Stencil,
        };
        assert!(e.to_string().contains("Stencil"));
    }
}
