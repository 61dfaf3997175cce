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

//! Builders shared by the integration tests: deterministic regtest header chains and blocks.
#![allow(dead_code)]

use corvus_common_types::BlockHash;
use corvus_core::{
    blocks::{genesis_block::get_genesis_header, merkle::block_merkle_root, Block, BlockHeader},
    chain_storage::{HeaderContext, HeaderTimechain, Locator},
    consensus::Network,
    proof_of_work::CompactTarget,
    transactions::{OutPoint, Transaction, TxInput, TxOutput},
};

pub const REGTEST_BITS: u32 = 0x207f_ffff;

/// Grinds the nonce until the header meets its own target. Cheap at regtest difficulty.
pub fn mine(mut header: BlockHeader) -> BlockHeader {
    let target = header.bits.expand().unwrap();
    while !target.is_met_by(&header.hash()) {
        header.nonce += 1;
    }
    header
}

pub fn mine_child_with_merkle(parent_hash: BlockHash, parent_time: u32, merkle_root: BlockHash) -> BlockHeader {
    mine(BlockHeader {
        version: 4,
        prev_block: parent_hash,
        merkle_root,
        timestamp: parent_time + 600,
        bits: CompactTarget::from_bits(REGTEST_BITS),
        nonce: 0,
    })
}

pub fn mine_child(parent_hash: BlockHash, parent_time: u32) -> BlockHeader {
    mine_child_with_merkle(parent_hash, parent_time, BlockHash::zero())
}

/// A chain of `len` mined regtest headers starting at the genesis header.
pub fn mined_chain(len: usize) -> Vec<BlockHeader> {
    let genesis = get_genesis_header(Network::RegTest);
    let mut headers = Vec::with_capacity(len);
    let mut prev_hash = genesis.hash();
    let mut prev_time = genesis.timestamp;
    for _ in 0..len {
        let header = mine_child(prev_hash, prev_time);
        prev_hash = header.hash();
        prev_time = header.timestamp;
        headers.push(header);
    }
    headers
}

/// Adds a mined header under the given parent context, returning the child context.
pub fn add_header(timechain: &HeaderTimechain, parent: Locator, parent_ctx: &HeaderContext, header: BlockHeader) -> HeaderContext {
    let context = parent_ctx.child(header, header.hash());
    timechain.add(parent, header, context.clone()).unwrap();
    context
}

/// Extends the canonical tip with `count` mined headers, returning their contexts.
pub fn extend_chain(timechain: &HeaderTimechain, count: usize) -> Vec<HeaderContext> {
    let mut contexts = Vec::with_capacity(count);
    let mut parent_ctx = timechain.tip_context();
    for _ in 0..count {
        let header = mine_child(parent_ctx.hash(), parent_ctx.timestamp());
        let parent = Locator::Chain(parent_ctx.height());
        parent_ctx = add_header(timechain, parent, &parent_ctx, header);
        contexts.push(parent_ctx.clone());
    }
    contexts
}

/// A minimal valid regtest coinbase for the given height (no BIP34 commitment needed below
/// regtest's activation height of 500).
pub fn simple_coinbase(height: u64) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TxInput {
            prev_output: OutPoint::null(),
            signature_script: vec![0x01, height as u8],
            sequence: u32::MAX,
            witness: Vec::new(),
        }],
        outputs: vec![TxOutput {
            value: 50 * 100_000_000,
            pubkey_script: vec![0x51],
        }],
        lock_time: 0,
    }
}

/// Builds a full block on `parent`, mines its header and returns it with its context inputs.
pub fn build_block(parent_hash: BlockHash, parent_time: u32, height: u64) -> Block {
    let transactions = vec![simple_coinbase(height)];
    let merkle_root = block_merkle_root(&transactions);
    let header = mine_child_with_merkle(parent_hash, parent_time, merkle_root);
    Block { header, transactions }
}
