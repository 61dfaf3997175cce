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

//! The ordered header ruleset. Rules are plain function values evaluated in order; the first
//! failure short-circuits and nothing is mutated.

use crate::{
    consensus::{Bip, Network},
    proof_of_work::calc_next_required_target,
    validation::{HeaderError, HeaderValidationContext},
};

pub type HeaderRuleFn = fn(&HeaderValidationContext<'_>) -> Result<(), HeaderError>;

/// A single rule, optionally gated on a BIP activation height.
pub struct HeaderRule {
    pub check: HeaderRuleFn,
    pub activation: Option<Bip>,
}

/// The header ruleset, in evaluation order.
pub const HEADER_RULESET: &[HeaderRule] = &[
    HeaderRule {
        check: check_previous_hash,
        activation: None,
    },
    HeaderRule {
        check: check_proof_of_work,
        activation: None,
    },
    HeaderRule {
        check: check_difficulty_transition,
        activation: None,
    },
    HeaderRule {
        check: check_median_time_past,
        activation: None,
    },
    HeaderRule {
        check: check_timestamp_current,
        activation: None,
    },
    HeaderRule {
        check: check_version,
        activation: None,
    },
];

/// Runs the full ruleset against one candidate header.
pub fn validate_header(ctx: &HeaderValidationContext<'_>) -> Result<(), HeaderError> {
    for rule in HEADER_RULESET {
        if let Some(bip) = rule.activation {
            if !ctx.constants.is_bip_enabled_at(bip, ctx.height) {
                continue;
            }
        }
        (rule.check)(ctx)?;
    }
    Ok(())
}

fn check_previous_hash(ctx: &HeaderValidationContext<'_>) -> Result<(), HeaderError> {
    if ctx.header.prev_block != ctx.parent.hash() {
        return Err(HeaderError::ParentNotFound);
    }
    Ok(())
}

fn check_proof_of_work(ctx: &HeaderValidationContext<'_>) -> Result<(), HeaderError> {
    let target = ctx.header.bits.expand().map_err(|_| HeaderError::InvalidProofOfWork)?;
    if target > ctx.constants.pow_target_limit() {
        return Err(HeaderError::InvalidProofOfWork);
    }
    if !target.is_met_by(&ctx.hash) {
        return Err(HeaderError::InvalidProofOfWork);
    }
    Ok(())
}

fn check_difficulty_transition(ctx: &HeaderValidationContext<'_>) -> Result<(), HeaderError> {
    let constants = ctx.constants;
    let expected = if constants.is_retarget_height(ctx.height) {
        let first_height = ctx.height - constants.difficulty_adjustment_interval();
        let first_timestamp = ctx
            .ancestry
            .timestamp_at(first_height)
            .ok_or(HeaderError::BadDifficultyTransition)?;
        calc_next_required_target(ctx.parent.header().bits, first_timestamp, ctx.parent.timestamp(), constants)
            .map_err(|_| HeaderError::BadDifficultyTransition)?
    } else if constants.allow_min_difficulty() && constants.network() != Network::MainNet {
        // Min-difficulty exception: after a gap of twice the target spacing, a block may use
        // the network's minimum difficulty. Kept off the mainnet path.
        if ctx.header.timestamp > ctx.parent.timestamp().saturating_add(2 * constants.target_spacing_secs()) {
            constants.pow_limit_bits()
        } else {
            ctx.parent.header().bits
        }
    } else {
        ctx.parent.header().bits
    };
    if ctx.header.bits != expected {
        return Err(HeaderError::BadDifficultyTransition);
    }
    Ok(())
}

fn check_median_time_past(ctx: &HeaderValidationContext<'_>) -> Result<(), HeaderError> {
    let timestamps = ctx.ancestry.last_n_timestamps(ctx.constants.median_timestamp_count());
    let median = super::helpers::median_timestamp(&timestamps);
    if ctx.header.timestamp <= median {
        return Err(HeaderError::TimestampTooEarly);
    }
    Ok(())
}

fn check_timestamp_current(ctx: &HeaderValidationContext<'_>) -> Result<(), HeaderError> {
    let limit = u64::from(ctx.current_time) + u64::from(ctx.constants.future_time_limit_secs());
    if u64::from(ctx.header.timestamp) > limit {
        return Err(HeaderError::TimestampTooLate);
    }
    Ok(())
}

fn check_version(ctx: &HeaderValidationContext<'_>) -> Result<(), HeaderError> {
    if ctx.header.version < ctx.constants.bips().minimum_header_version_at(ctx.height) {
        return Err(HeaderError::BadVersion);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use corvus_common_types::BlockHash;

    use super::*;
    use crate::{
        blocks::{genesis_block::get_genesis_header, BlockHeader},
        chain_storage::HeaderContext,
        consensus::ConsensusConstants,
        proof_of_work::CompactTarget,
        validation::mocks::MockAncestryView,
    };

    fn regtest() -> ConsensusConstants {
        ConsensusConstants::for_network(Network::RegTest)
    }

    /// Grinds the nonce until the header meets its own target. Trivial on regtest.
    fn mine(mut header: BlockHeader) -> BlockHeader {
        let target = header.bits.expand().unwrap();
        while !target.is_met_by(&header.hash()) {
            header.nonce += 1;
        }
        header
    }

    fn valid_child(parent: &HeaderContext) -> BlockHeader {
        mine(BlockHeader {
            version: 4,
            prev_block: parent.hash(),
            merkle_root: BlockHash::zero(),
            timestamp: parent.timestamp() + 600,
            bits: parent.header().bits,
            nonce: 0,
        })
    }

    fn run(header: &BlockHeader, parent: &HeaderContext, constants: &ConsensusConstants) -> Result<(), HeaderError> {
        let view = MockAncestryView::new(vec![parent.timestamp()]);
        let ctx = HeaderValidationContext {
            header,
            hash: header.hash(),
            height: parent.height() + 1,
            parent,
            ancestry: &view,
            constants,
            current_time: header.timestamp + 60,
        };
        validate_header(&ctx)
    }

    #[test]
    fn a_well_formed_child_passes() {
        let constants = regtest();
        let genesis = HeaderContext::genesis(get_genesis_header(Network::RegTest));
        let header = valid_child(&genesis);
        assert!(run(&header, &genesis, &constants).is_ok());
    }

    #[test]
    fn wrong_parent_hash_fails_first() {
        let constants = regtest();
        let genesis = HeaderContext::genesis(get_genesis_header(Network::RegTest));
        let mut header = valid_child(&genesis);
        header.prev_block = BlockHash::from([9u8; 32]);
        assert_eq!(run(&header, &genesis, &constants), Err(HeaderError::ParentNotFound));
    }

    #[test]
    fn hash_above_target_is_invalid_proof_of_work() {
        // Mainnet-strength target is unreachable by a few nonce increments.
        let constants = ConsensusConstants::for_network(Network::MainNet);
        let genesis = HeaderContext::genesis(get_genesis_header(Network::MainNet));
        let header = BlockHeader {
            version: 4,
            prev_block: genesis.hash(),
            merkle_root: BlockHash::zero(),
            timestamp: genesis.timestamp() + 600,
            bits: genesis.header().bits,
            nonce: 1,
        };
        assert_eq!(run(&header, &genesis, &constants), Err(HeaderError::InvalidProofOfWork));
    }

    #[test]
    fn target_above_the_network_limit_is_rejected() {
        let constants = ConsensusConstants::for_network(Network::MainNet);
        let genesis = HeaderContext::genesis(get_genesis_header(Network::MainNet));
        let mut header = valid_child(&genesis);
        // Trivially easy bits: every hash passes, but the target exceeds the limit.
        header.bits = CompactTarget::from_bits(0x207f_ffff);
        assert_eq!(run(&header, &genesis, &constants), Err(HeaderError::InvalidProofOfWork));
    }

    #[test]
    fn changing_bits_off_schedule_is_a_bad_transition() {
        let constants = regtest();
        let genesis = HeaderContext::genesis(get_genesis_header(Network::RegTest));
        let mut header = valid_child(&genesis);
        header.bits = CompactTarget::from_bits(0x207f_fffe);
        let header = mine(header);
        assert_eq!(run(&header, &genesis, &constants), Err(HeaderError::BadDifficultyTransition));
    }

    #[test]
    fn timestamp_at_or_below_the_median_is_too_early() {
        let constants = regtest();
        let genesis = HeaderContext::genesis(get_genesis_header(Network::RegTest));
        // Ancestors 10..=20; median 15.
        let view = MockAncestryView::new((10..=20).collect());
        let mut header = valid_child(&genesis);

        header.timestamp = 15;
        let header_early = mine(header);
        let ctx = HeaderValidationContext {
            header: &header_early,
            hash: header_early.hash(),
            height: 11,
            parent: &genesis,
            ancestry: &view,
            constants: &constants,
            current_time: 1_000_000,
        };
        // Parent-hash, PoW and difficulty rules pass; the median rule rejects.
        assert_eq!(validate_header(&ctx), Err(HeaderError::TimestampTooEarly));

        header.timestamp = 16;
        let header_ok = mine(header);
        let ctx = HeaderValidationContext {
            header: &header_ok,
            hash: header_ok.hash(),
            height: 11,
            parent: &genesis,
            ancestry: &view,
            constants: &constants,
            current_time: 1_000_000,
        };
        assert!(validate_header(&ctx).is_ok());
    }

    #[test]
    fn far_future_timestamps_are_too_late() {
        let constants = regtest();
        let genesis = HeaderContext::genesis(get_genesis_header(Network::RegTest));
        let mut header = valid_child(&genesis);
        header.timestamp = genesis.timestamp() + 600;
        let header = mine(header);
        let view = MockAncestryView::new(vec![genesis.timestamp()]);
        let ctx = HeaderValidationContext {
            header: &header,
            hash: header.hash(),
            height: 1,
            parent: &genesis,
            ancestry: &view,
            constants: &constants,
            // Wall clock more than two hours behind the header.
            current_time: header.timestamp - 7201,
        };
        assert_eq!(validate_header(&ctx), Err(HeaderError::TimestampTooLate));
    }

    #[test]
    fn retired_versions_are_rejected_after_activation() {
        let constants = regtest();
        let genesis = HeaderContext::genesis(get_genesis_header(Network::RegTest));
        let view = MockAncestryView::new(vec![genesis.timestamp()]);
        let mut header = valid_child(&genesis);
        header.version = 3;
        let header = mine(header);
        // Regtest retires version 3 at height 1351.
        let ctx = HeaderValidationContext {
            header: &header,
            hash: header.hash(),
            height: 1351,
            parent: &genesis,
            ancestry: &view,
            constants: &constants,
            current_time: header.timestamp + 60,
        };
        assert_eq!(validate_header(&ctx), Err(HeaderError::BadVersion));
    }
}
