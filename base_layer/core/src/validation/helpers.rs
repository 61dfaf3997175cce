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

//! Shared checks used by the consensus rulesets.

use crate::{
    blocks::{
        merkle::{witness_commitment, witness_merkle_root, WITNESS_COMMITMENT_PREFIX, WITNESS_COMMITMENT_SCRIPT_SIZE},
        Block,
    },
    transactions::Transaction,
    validation::BlockError,
};

/// Lock times below this value are block heights; above, Unix timestamps.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// Non-witness bytes count this many times towards block weight and sigop cost.
pub const WITNESS_SCALE_FACTOR: u64 = 4;

const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_CHECKSIG: u8 = 0xac;
const OP_CHECKSIGVERIFY: u8 = 0xad;
const OP_CHECKMULTISIG: u8 = 0xae;
const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;

/// Median of a set of timestamps: sort a copy and take the middle element.
pub fn median_timestamp(timestamps: &[u32]) -> u32 {
    if timestamps.is_empty() {
        return 0;
    }
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();
    sorted[sorted.len() / 2]
}

/// Minimal script-number serialization: little-endian magnitude with the sign carried in the
/// high bit of the last byte.
pub fn encode_script_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut bytes = Vec::new();
    while magnitude > 0 {
        bytes.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }
    let last = *bytes.last().expect("non-zero value yields at least one byte");
    if last & 0x80 != 0 {
        bytes.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        *bytes.last_mut().expect("non-empty") |= 0x80;
    }
    bytes
}

/// Checks the BIP34 commitment: the coinbase signature script must begin with a minimal push of
/// the block height.
pub fn check_coinbase_height_commitment(block: &Block, height: u64) -> Result<(), BlockError> {
    let coinbase = block.coinbase().ok_or(BlockError::BadCoinBase)?;
    let script = &coinbase.inputs[0].signature_script;
    let num = encode_script_num(height as i64);
    let mut expected = Vec::with_capacity(num.len() + 1);
    expected.push(num.len() as u8);
    expected.extend_from_slice(&num);
    if script.len() < expected.len() || script[..expected.len()] != expected[..] {
        return Err(BlockError::BadCoinBaseHeight);
    }
    Ok(())
}

/// Counts the legacy signature operations in a raw script byte stream. Push data is skipped;
/// CHECKSIG variants count one, CHECKMULTISIG variants twenty. A truncated push ends the scan.
pub fn count_legacy_sigops(script: &[u8]) -> u64 {
    let mut count = 0u64;
    let mut i = 0usize;
    while i < script.len() {
        let op = script[i];
        match op {
            0x01..=0x4b => i += 1 + op as usize,
            OP_PUSHDATA1 => {
                let len = script.get(i + 1).copied().unwrap_or(0) as usize;
                i += 2 + len;
            },
            OP_PUSHDATA2 => {
                let len = match script.get(i + 1..i + 3) {
                    Some(bytes) => u16::from_le_bytes([bytes[0], bytes[1]]) as usize,
                    None => break,
                };
                i += 3 + len;
            },
            OP_PUSHDATA4 => {
                let len = match script.get(i + 1..i + 5) {
                    Some(bytes) => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize,
                    None => break,
                };
                i += 5 + len;
            },
            OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                count += 1;
                i += 1;
            },
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                count += 20;
                i += 1;
            },
            _ => i += 1,
        }
    }
    count
}

/// Total sigop cost of a block: legacy sigops in every signature and pubkey script, scaled by
/// the witness factor.
pub fn block_sigops_cost(block: &Block) -> u64 {
    let legacy: u64 = block
        .transactions
        .iter()
        .map(|tx| {
            tx.inputs
                .iter()
                .map(|input| count_legacy_sigops(&input.signature_script))
                .sum::<u64>() +
                tx.outputs
                    .iter()
                    .map(|output| count_legacy_sigops(&output.pubkey_script))
                    .sum::<u64>()
        })
        .sum();
    legacy * WITNESS_SCALE_FACTOR
}

/// A transaction is final when its lock time has passed (heights compare against the block
/// height, timestamps against the median time past) or every input opts out via a final
/// sequence number.
pub fn is_final_transaction(tx: &Transaction, height: u64, median_time_past: u32) -> bool {
    if tx.lock_time == 0 {
        return true;
    }
    let cutoff = if tx.lock_time < LOCKTIME_THRESHOLD {
        height
    } else {
        u64::from(median_time_past)
    };
    if u64::from(tx.lock_time) < cutoff {
        return true;
    }
    tx.inputs.iter().all(|input| input.sequence == u32::MAX)
}

/// Verifies the BIP141 witness commitment.
///
/// A block with witness data must carry a commitment output in its coinbase; when one is
/// present, the coinbase input witness must be a single 32-byte nonce and the committed hash
/// must match the recomputed witness merkle root.
pub fn check_witness_commitment(block: &Block) -> Result<(), BlockError> {
    let coinbase = block.coinbase().ok_or(BlockError::BadCoinBase)?;
    let commitment_script = coinbase
        .outputs
        .iter()
        .rev()
        .map(|output| &output.pubkey_script)
        .find(|script| script.len() >= WITNESS_COMMITMENT_SCRIPT_SIZE && script[..6] == WITNESS_COMMITMENT_PREFIX);

    let script = match commitment_script {
        Some(script) => script,
        None => {
            return if block.has_witness() {
                Err(BlockError::UnexpectedWitness)
            } else {
                Ok(())
            };
        },
    };

    let witness = &coinbase.inputs[0].witness;
    if witness.len() != 1 || witness[0].len() != 32 {
        return Err(BlockError::BadWitnessNonce);
    }
    let root = witness_merkle_root(&block.transactions);
    let commitment = witness_commitment(&root, &witness[0]);
    if script[6..WITNESS_COMMITMENT_SCRIPT_SIZE] != commitment.as_bytes()[..] {
        return Err(BlockError::BadWitnessMerkle);
    }
    Ok(())
}
