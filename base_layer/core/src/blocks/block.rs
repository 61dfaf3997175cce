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
    blocks::BlockHeader,
    transactions::Transaction,
    wire::{ByteReader, ByteWriter, WireError},
};

/// A full block: header plus ordered transaction list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first().filter(|tx| tx.is_coinbase())
    }

    pub fn has_witness(&self) -> bool {
        self.transactions.iter().any(Transaction::has_witness)
    }

    /// Serialized size without any witness data.
    pub fn stripped_size(&self) -> usize {
        let mut w = ByteWriter::new();
        self.consensus_encode(&mut w, false);
        w.len()
    }

    /// Full serialized size.
    pub fn total_size(&self) -> usize {
        let mut w = ByteWriter::new();
        self.consensus_encode(&mut w, true);
        w.len()
    }

    /// Block weight: non-witness bytes count four times, witness bytes once.
    pub fn weight(&self) -> u64 {
        3 * self.stripped_size() as u64 + self.total_size() as u64
    }

    pub fn consensus_encode(&self, w: &mut ByteWriter, include_witness: bool) {
        self.header.consensus_encode(w);
        w.write_compact_size(self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.consensus_encode(w, include_witness);
        }
    }

    pub fn consensus_decode(r: &mut ByteReader<'_>) -> Result<Self, WireError> {
        let header = BlockHeader::consensus_decode(r)?;
        // A serialized transaction is at least 10 bytes.
        let tx_count = r.read_count(10)?;
        let mut transactions = Vec::with_capacity(tx_count);
        for _ in 0..tx_count {
            transactions.push(Transaction::consensus_decode(r)?);
        }
        Ok(Self { header, transactions })
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "block {} ({} transaction(s))", self.hash(), self.transactions.len())
    }
}
