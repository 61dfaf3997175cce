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

use std::fmt::{Display, Formatter};

use corvus_common_types::BlockHash;
use serde::{Deserialize, Serialize};

use crate::{
    proof_of_work::{sha256d, CompactTarget},
    wire::{ByteReader, ByteWriter, WireError},
};

/// Serialized size of a block header.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// A block header.
///
/// The header is an immutable value type; its identity is the double SHA-256 of the 80-byte
/// serialization. Callers that need the hash repeatedly keep it alongside the header (see
/// `HeaderContext`) rather than recomputing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: BlockHash,
    pub merkle_root: BlockHash,
    /// Unix seconds.
    pub timestamp: u32,
    pub bits: CompactTarget,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn hash(&self) -> BlockHash {
        sha256d(&self.to_bytes())
    }

    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut w = ByteWriter::with_capacity(BLOCK_HEADER_SIZE);
        self.consensus_encode(&mut w);
        let mut bytes = [0u8; BLOCK_HEADER_SIZE];
        bytes.copy_from_slice(w.as_bytes());
        bytes
    }

    pub fn consensus_encode(&self, w: &mut ByteWriter) {
        w.write_i32(self.version);
        w.write_hash(&self.prev_block);
        w.write_hash(&self.merkle_root);
        w.write_u32(self.timestamp);
        w.write_u32(self.bits.bits());
        w.write_u32(self.nonce);
    }

    pub fn consensus_decode(r: &mut ByteReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            version: r.read_i32()?,
            prev_block: r.read_hash()?,
            merkle_root: r.read_hash()?,
            timestamp: r.read_u32()?,
            bits: CompactTarget::from_bits(r.read_u32()?),
            nonce: r.read_u32()?,
        })
    }
}

impl Display for BlockHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "header v{} (prev {}, time {}, bits {})",
            self.version, self.prev_block, self.timestamp, self.bits
        )
    }
}
