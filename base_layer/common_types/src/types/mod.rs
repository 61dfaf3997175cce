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

use std::{
    convert::TryFrom,
    fmt,
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// The length, in bytes, of every hash used by the base layer.
pub const BLOCK_HASH_LENGTH: usize = 32;

/// A block hash. The newtype alias exists so that call sites document what the hash identifies.
pub type BlockHash = FixedHash;

#[derive(Debug, thiserror::Error)]
#[error("Invalid size: expected {expected} bytes, got {actual}")]
pub struct FixedHashSizeError {
    expected: usize,
    actual: usize,
}

/// A fixed 32-byte hash value.
///
/// Bytes are stored exactly as they appear on the wire. Formatting renders the raw bytes as
/// lowercase hex without any reordering.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FixedHash([u8; BLOCK_HASH_LENGTH]);

impl FixedHash {
    /// The all-zero hash, used as the null previous-output reference and as the previous block
    /// hash of the genesis header.
    pub const fn zero() -> Self {
        Self([0u8; BLOCK_HASH_LENGTH])
    }

    pub const fn new(bytes: [u8; BLOCK_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; BLOCK_HASH_LENGTH] {
        &self.0
    }

    pub const fn into_array(self) -> [u8; BLOCK_HASH_LENGTH] {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; BLOCK_HASH_LENGTH]
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, FixedHashParseError> {
        let bytes = hex::decode(s)?;
        let hash = Self::try_from(bytes.as_slice())?;
        Ok(hash)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FixedHashParseError {
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error(transparent)]
    InvalidSize(#[from] FixedHashSizeError),
}

impl From<[u8; BLOCK_HASH_LENGTH]> for FixedHash {
    fn from(bytes: [u8; BLOCK_HASH_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for FixedHash {
    type Error = FixedHashSizeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array = <[u8; BLOCK_HASH_LENGTH]>::try_from(bytes).map_err(|_| FixedHashSizeError {
            expected: BLOCK_HASH_LENGTH,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }
}

impl AsRef<[u8]> for FixedHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for FixedHash {
    type Err = FixedHashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Display for FixedHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for FixedHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "FixedHash({})", self.to_hex())
    }
}
