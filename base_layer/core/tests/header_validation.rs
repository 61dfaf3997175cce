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

mod helpers;

use corvus_common_types::BlockHash;
use corvus_core::{
    blocks::{genesis_block::get_genesis_header, BlockHeader},
    chain_storage::HeaderContext,
    consensus::{ConsensusConstants, ConsensusConstantsBuilder, Network},
    proof_of_work::CompactTarget,
    validation::{mocks::MockAncestryView, validate_header, HeaderError, HeaderValidationContext},
};
use helpers::mine;

/// Mainnet retarget rules at a provable difficulty: same 2016-block schedule, but a regtest
/// strength proof-of-work limit so candidates can actually be mined in a test.
fn retarget_constants() -> ConsensusConstants {
    ConsensusConstantsBuilder::new(Network::MainNet)
        .with_pow_limit_bits(CompactTarget::from_bits(0x207f_ffff))
        .build()
}

/// Fabricates a parent context at `height` by walking unmined headers from genesis. Contexts do
/// not validate, so this is cheap; only the candidate under test needs real proof-of-work.
fn parent_context_at(height: u64, bits: u32, final_timestamp: u32) -> HeaderContext {
    let genesis = get_genesis_header(Network::MainNet);
    let mut ctx = HeaderContext::genesis(genesis);
    for h in 1..=height {
        let timestamp = if h == height { final_timestamp } else { final_timestamp.saturating_sub((height - h) as u32) };
        let header = BlockHeader {
            version: 4,
            prev_block: ctx.hash(),
            merkle_root: BlockHash::zero(),
            timestamp,
            bits: CompactTarget::from_bits(bits),
            nonce: h as u32,
        };
        let hash = header.hash();
        ctx = ctx.child(header, hash);
    }
    ctx
}

#[test]
fn a_quarter_length_period_must_quadruple_difficulty() {
    let constants = retarget_constants();
    let first_timestamp = 1_600_000_000u32;
    // The period ran in one quarter of the scheduled two weeks.
    let parent_timestamp = first_timestamp + constants.difficulty_adjustment_timespan() / 4;
    let parent = parent_context_at(2015, 0x207f_ffff, parent_timestamp);

    // Ancestry for the candidate at height 2016: the rule reads the timestamp at height 0.
    let mut timestamps = vec![first_timestamp; 2015];
    timestamps.push(parent_timestamp);
    let view = MockAncestryView::new(timestamps);

    // 0x207fffff quartered recompresses to 0x201fffff.
    let correct = mine(BlockHeader {
        version: 4,
        prev_block: parent.hash(),
        merkle_root: BlockHash::zero(),
        timestamp: parent_timestamp + 600,
        bits: CompactTarget::from_bits(0x201f_ffff),
        nonce: 0,
    });
    let ctx = HeaderValidationContext {
        header: &correct,
        hash: correct.hash(),
        height: 2016,
        parent: &parent,
        ancestry: &view,
        constants: &constants,
        current_time: parent_timestamp + 700,
    };
    assert!(validate_header(&ctx).is_ok());

    // Keeping the old bits across the boundary is a bad transition.
    let stale = mine(BlockHeader {
        bits: CompactTarget::from_bits(0x207f_ffff),
        ..correct
    });
    let ctx = HeaderValidationContext {
        header: &stale,
        hash: stale.hash(),
        height: 2016,
        parent: &parent,
        ancestry: &view,
        constants: &constants,
        current_time: parent_timestamp + 700,
    };
    assert_eq!(validate_header(&ctx), Err(HeaderError::BadDifficultyTransition));
}

#[test]
fn median_time_past_boundary_is_exclusive() {
    let constants = ConsensusConstants::for_network(Network::RegTest);
    let parent = parent_context_at_regtest(11, 20);
    // Ancestor timestamps 10..=20: the median is 15.
    let view = MockAncestryView::new((10..=20).collect());

    for (timestamp, expected) in [(15u32, Err(HeaderError::TimestampTooEarly)), (16, Ok(()))] {
        let candidate = mine(BlockHeader {
            version: 4,
            prev_block: parent.hash(),
            merkle_root: BlockHash::zero(),
            timestamp,
            bits: CompactTarget::from_bits(helpers::REGTEST_BITS),
            nonce: 0,
        });
        let ctx = HeaderValidationContext {
            header: &candidate,
            hash: candidate.hash(),
            height: 12,
            parent: &parent,
            ancestry: &view,
            constants: &constants,
            current_time: 10_000,
        };
        assert_eq!(validate_header(&ctx), expected, "timestamp = {}", timestamp);
    }
}

fn parent_context_at_regtest(height: u64, final_timestamp: u32) -> HeaderContext {
    let genesis = get_genesis_header(Network::RegTest);
    let mut ctx = HeaderContext::genesis(genesis);
    for h in 1..=height {
        let timestamp = if h == height { final_timestamp } else { h as u32 + 8 };
        let header = BlockHeader {
            version: 4,
            prev_block: ctx.hash(),
            merkle_root: BlockHash::zero(),
            timestamp,
            bits: CompactTarget::from_bits(helpers::REGTEST_BITS),
            nonce: h as u32,
        };
        let hash = header.hash();
        ctx = ctx.child(header, hash);
    }
    ctx
}
