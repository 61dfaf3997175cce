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

//! The hard-coded genesis headers for each supported network.

use corvus_common_types::BlockHash;
use once_cell::sync::Lazy;

use crate::{blocks::BlockHeader, consensus::Network, proof_of_work::CompactTarget};

/// Merkle root of the genesis coinbase, shared by all networks (raw wire byte order).
static GENESIS_MERKLE_ROOT: Lazy<BlockHash> = Lazy::new(|| {
    BlockHash::from_hex("3ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a")
        .expect("the genesis merkle root constant is valid hex")
});

/// Hash of the mainnet genesis header (raw wire byte order).
pub static MAINNET_GENESIS_HASH: Lazy<BlockHash> = Lazy::new(|| {
    BlockHash::from_hex("6fe28c0ab6f1b372c1a6a246ae63f74f931e8365e15a089c68d6190000000000")
        .expect("the genesis hash constant is valid hex")
});

/// Returns the genesis header for the given network.
pub fn get_genesis_header(network: Network) -> BlockHeader {
    let (timestamp, bits, nonce) = match network {
        Network::MainNet => (1_231_006_505, 0x1d00_ffff, 2_083_236_893),
        Network::TestNet => (1_296_688_602, 0x1d00_ffff, 414_098_458),
        Network::RegTest => (1_296_688_602, 0x207f_ffff, 2),
        Network::Signet => (1_598_918_400, 0x1e03_77ae, 52_613_770),
    };
    BlockHeader {
        version: 1,
        prev_block: BlockHash::zero(),
        merkle_root: *GENESIS_MERKLE_ROOT,
        timestamp,
        bits: CompactTarget::from_bits(bits),
        nonce,
    }
}
