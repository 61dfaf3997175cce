//  Copyright 2022. The Corvus Developers
//
//  Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
//  following conditions are met:
//
//  1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
//  disclaimer.
//
//  2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
//  following disclaimer in the documentation and/or other materials provided with the distribution.
//
//  3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
//  products derived from this software without specific prior written permission.
//
//  THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
//  INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
//  DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
//  SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
//  SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
//  WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
//  USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::fmt::{self, Display, Formatter};

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::proof_of_work::Target;

/// The 32-bit floating-point style encoding of a 256-bit proof-of-work target, as carried in the
/// `bits` field of every block header.
///
/// The top byte is a base-256 exponent, the low 23 bits are the mantissa and bit 23 is a sign bit
/// that is never valid in a target.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompactTarget(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CompactTargetError {
    #[error("Compact target {0:#010x} encodes a negative value")]
    Negative(u32),
    #[error("Compact target {0:#010x} overflows 256 bits")]
    Overflow(u32),
}

impl CompactTarget {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Expands the compact encoding into the full 256-bit target.
    ///
    /// Fails when the sign bit is set with a non-zero mantissa, or when the exponent would shift
    /// mantissa bits beyond the 256-bit range.
    pub fn expand(self) -> Result<Target, CompactTargetError> {
        let exponent = self.0 >> 24;
        let mantissa = self.0 & 0x007f_ffff;
        if self.0 & 0x0080_0000 != 0 && mantissa != 0 {
            return Err(CompactTargetError::Negative(self.0));
        }
        if mantissa != 0 &&
            (exponent > 34 || (mantissa > 0xff && exponent > 33) || (mantissa > 0xffff && exponent > 32))
        {
            return Err(CompactTargetError::Overflow(self.0));
        }
        let value = if exponent <= 3 {
            U256::from(mantissa >> (8 * (3 - exponent)))
        } else {
            U256::from(mantissa) << (8 * (exponent - 3))
        };
        Ok(Target::new(value))
    }

    /// Compresses a 256-bit target into the canonical compact encoding.
    ///
    /// `from_target(target).expand()` loses precision below the top three mantissa bytes;
    /// expanding and re-compressing a canonical encoding is lossless.
    pub fn from_target(target: &Target) -> Self {
        let value = target.as_u256();
        let mut size = (value.bits() + 7) / 8;
        let mut compact = if size <= 3 {
            value.low_u64() << (8 * (3 - size))
        } else {
            (value >> (8 * (size - 3))).low_u64()
        };
        // The sign bit may not be used by the mantissa; borrow another exponent byte instead.
        if compact & 0x0080_0000 != 0 {
            compact >>= 8;
            size += 1;
        }
        Self(compact as u32 | ((size as u32) << 24))
    }
}

impl Display for CompactTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Debug for CompactTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "CompactTarget({:#010x})", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn expand_hex(bits: u32) -> String {
        format!("{}", CompactTarget::from_bits(bits).expand().unwrap())
    }

    #[test]
    fn it_expands_known_encodings() {
        assert_eq!(
            expand_hex(0x1d00_ffff),
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(
            expand_hex(0x1b04_04cb),
            "00000000000404cb000000000000000000000000000000000000000000000000"
        );
        assert_eq!(
            expand_hex(0x0100_0012),
            "0000000000000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(
            expand_hex(0x0200_1234),
            "0000000000000000000000000000000000000000000000000000000000000012"
        );
    }

    #[test]
    fn it_rejects_negative_and_overflowing_encodings() {
        assert_eq!(
            CompactTarget::from_bits(0x01fe_dcba).expand(),
            Err(CompactTargetError::Negative(0x01fe_dcba))
        );
        assert_eq!(
            CompactTarget::from_bits(0x0480_0001).expand(),
            Err(CompactTargetError::Negative(0x0480_0001))
        );
        assert_eq!(
            CompactTarget::from_bits(0xff12_3456).expand(),
            Err(CompactTargetError::Overflow(0xff12_3456))
        );
        assert_eq!(
            CompactTarget::from_bits(0x2300_ffff).expand(),
            Err(CompactTargetError::Overflow(0x2300_ffff))
        );
    }

    #[test]
    fn compress_of_expand_is_identity_for_canonical_encodings() {
        for bits in [
            0x1d00_ffffu32,
            0x1c3f_ffc0,
            0x1b04_04cb,
            0x207f_ffff,
            0x1e03_77ae,
            0x0212_3400,
            0x0400_8000,
            0x1800_9abc,
        ] {
            let target = CompactTarget::from_bits(bits).expand().unwrap();
            assert_eq!(CompactTarget::from_target(&target).bits(), bits, "bits = {:#010x}", bits);
        }
    }

    #[test]
    fn compress_moves_high_mantissa_bit_into_exponent() {
        // 0x80 in the top mantissa byte would read as a sign; the exponent grows instead.
        let target = Target::new(U256::from(0x0080_0000u64));
        assert_eq!(CompactTarget::from_target(&target).bits(), 0x0400_8000);
    }
}
