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

//! Merkle tree commitments over block transactions.

use corvus_common_types::{BlockHash, FixedHash};

use crate::{proof_of_work::sha256d_concat, transactions::Transaction};

/// Script prefix tagging the coinbase output that carries the witness commitment:
/// `OP_RETURN OP_PUSH36 0xaa21a9ed`.
pub const WITNESS_COMMITMENT_PREFIX: [u8; 6] = [0x6a, 0x24, 0xaa, 0x21, 0xa9, 0xed];
/// Total size of a witness commitment script: the prefix plus the 32-byte commitment.
pub const WITNESS_COMMITMENT_SCRIPT_SIZE: usize = 38;

/// Computes the merkle root of a list of hashes.
///
/// Odd levels duplicate their last entry, matching the historical consensus algorithm. An empty
/// list yields the zero hash; a single entry is its own root.
pub fn merkle_root_from_hashes(mut hashes: Vec<FixedHash>) -> FixedHash {
    if hashes.is_empty() {
        return FixedHash::zero();
    }
    while hashes.len() > 1 {
        if hashes.len() % 2 != 0 {
            let last = hashes[hashes.len() - 1];
            hashes.push(last);
        }
        hashes = hashes
            .chunks_exact(2)
            .map(|pair| sha256d_concat(pair[0].as_bytes(), pair[1].as_bytes()))
            .collect();
    }
    hashes[0]
}

/// The transaction merkle root committed to by a block header.
pub fn block_merkle_root(transactions: &[Transaction]) -> BlockHash {
    merkle_root_from_hashes(transactions.iter().map(Transaction::txid).collect())
}

/// The witness merkle root: wtxids of all transactions, with the coinbase entry pinned to the
/// zero hash.
pub fn witness_merkle_root(transactions: &[Transaction]) -> BlockHash {
    let hashes = transactions
        .iter()
        .enumerate()
        .map(|(i, tx)| if i == 0 { FixedHash::zero() } else { tx.wtxid() })
        .collect();
    merkle_root_from_hashes(hashes)
}

/// The witness commitment: double SHA-256 of the witness merkle root concatenated with the
/// witness nonce from the coinbase input witness.
pub fn witness_commitment(witness_root: &BlockHash, witness_nonce: &[u8]) -> BlockHash {
    sha256d_concat(witness_root.as_bytes(), witness_nonce)
}
