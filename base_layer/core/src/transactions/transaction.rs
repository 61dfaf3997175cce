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
    proof_of_work::sha256d,
    wire::{ByteReader, ByteWriter, WireError},
};

/// Marker byte pair introducing the segregated-witness transaction serialization.
const WITNESS_MARKER: u8 = 0x00;
const WITNESS_FLAG: u8 = 0x01;

/// Reference to the output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: BlockHash,
    pub index: u32,
}

impl OutPoint {
    /// The outpoint a coinbase input carries: all-zero hash and an all-ones index.
    pub const fn null() -> Self {
        Self {
            hash: BlockHash::zero(),
            index: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.index == u32::MAX && self.hash.is_zero()
    }

    pub fn consensus_encode(&self, w: &mut ByteWriter) {
        w.write_hash(&self.hash);
        w.write_u32(self.index);
    }

    pub fn consensus_decode(r: &mut ByteReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            hash: r.read_hash()?,
            index: r.read_u32()?,
        })
    }
}

impl Display for OutPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.hash, self.index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub prev_output: OutPoint,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
    /// Witness stack for this input. Empty for non-witness spends.
    pub witness: Vec<Vec<u8>>,
}

impl TxInput {
    // Outpoint (36) + empty script (1) + sequence (4).
    const MIN_ENCODED_SIZE: usize = 41;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Value in satoshis. Signed so that out-of-range wire values survive decoding and are
    /// rejected by the transaction ruleset rather than the codec.
    pub value: i64,
    pub pubkey_script: Vec<u8>,
}

impl TxOutput {
    // Value (8) + empty script (1).
    const MIN_ENCODED_SIZE: usize = 9;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// True when this transaction has the coinbase shape: a single input spending the null
    /// outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].prev_output.is_null()
    }

    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(|input| !input.witness.is_empty())
    }

    /// The witness-stripped transaction id.
    pub fn txid(&self) -> BlockHash {
        let mut w = ByteWriter::with_capacity(self.base_size());
        self.consensus_encode(&mut w, false);
        sha256d(w.as_bytes())
    }

    /// The witness-inclusive transaction id. Identical to [`txid`](Self::txid) when no input
    /// carries witness data.
    pub fn wtxid(&self) -> BlockHash {
        if !self.has_witness() {
            return self.txid();
        }
        let mut w = ByteWriter::with_capacity(self.total_size());
        self.consensus_encode(&mut w, true);
        sha256d(w.as_bytes())
    }

    /// Serialized size without witness data.
    pub fn base_size(&self) -> usize {
        let mut w = ByteWriter::new();
        self.consensus_encode(&mut w, false);
        w.len()
    }

    /// Serialized size including witness data, when present.
    pub fn total_size(&self) -> usize {
        let mut w = ByteWriter::new();
        self.consensus_encode(&mut w, true);
        w.len()
    }

    /// Block weight contribution: non-witness bytes count four times, witness bytes once.
    pub fn weight(&self) -> u64 {
        3 * self.base_size() as u64 + self.total_size() as u64
    }

    pub fn consensus_encode(&self, w: &mut ByteWriter, include_witness: bool) {
        let include_witness = include_witness && self.has_witness();
        w.write_i32(self.version);
        if include_witness {
            w.write_u8(WITNESS_MARKER);
            w.write_u8(WITNESS_FLAG);
        }
        w.write_compact_size(self.inputs.len() as u64);
        for input in &self.inputs {
            input.prev_output.consensus_encode(w);
            w.write_var_bytes(&input.signature_script);
            w.write_u32(input.sequence);
        }
        w.write_compact_size(self.outputs.len() as u64);
        for output in &self.outputs {
            w.write_i64(output.value);
            w.write_var_bytes(&output.pubkey_script);
        }
        if include_witness {
            for input in &self.inputs {
                w.write_compact_size(input.witness.len() as u64);
                for item in &input.witness {
                    w.write_var_bytes(item);
                }
            }
        }
        w.write_u32(self.lock_time);
    }

    pub fn consensus_decode(r: &mut ByteReader<'_>) -> Result<Self, WireError> {
        let version = r.read_i32()?;
        let mut witness_format = false;
        if r.peek_u8()? == WITNESS_MARKER {
            r.read_u8()?;
            if r.read_u8()? != WITNESS_FLAG {
                return Err(WireError::InvalidEncoding("unknown transaction witness flag"));
            }
            witness_format = true;
        }

        let input_count = r.read_count(TxInput::MIN_ENCODED_SIZE)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TxInput {
                prev_output: OutPoint::consensus_decode(r)?,
                signature_script: r.read_var_bytes()?,
                sequence: r.read_u32()?,
                witness: Vec::new(),
            });
        }

        let output_count = r.read_count(TxOutput::MIN_ENCODED_SIZE)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TxOutput {
                value: r.read_i64()?,
                pubkey_script: r.read_var_bytes()?,
            });
        }

        if witness_format {
            let mut any_witness = false;
            for input in &mut inputs {
                let item_count = r.read_count(1)?;
                let mut stack = Vec::with_capacity(item_count);
                for _ in 0..item_count {
                    stack.push(r.read_var_bytes()?);
                }
                any_witness |= !stack.is_empty();
                input.witness = stack;
            }
            // The witness serialization of a witness-free transaction is ambiguous with the
            // legacy layout and must not be produced.
            if !any_witness {
                return Err(WireError::InvalidEncoding("witness marker without witness data"));
            }
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time: r.read_u32()?,
        })
    }
}
