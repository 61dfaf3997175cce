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

use primitive_types::U256;

use crate::{
    consensus::ConsensusConstants,
    proof_of_work::{CompactTarget, CompactTargetError, Target},
};

/// Calculates the compact target required for the first block of a new difficulty period.
///
/// `period_first_timestamp` is the timestamp of the first block of the period that just ended and
/// `parent_timestamp` that of its last block. The observed duration is clamped to one quarter and
/// four times the scheduled duration, the parent target is scaled proportionally and the result
/// is capped at the network's target limit before being re-compressed.
pub fn calc_next_required_target(
    parent_bits: CompactTarget,
    period_first_timestamp: u32,
    parent_timestamp: u32,
    constants: &ConsensusConstants,
) -> Result<CompactTarget, CompactTargetError> {
    if constants.no_retargeting() {
        return Ok(parent_bits);
    }

    let scheduled = u64::from(constants.difficulty_adjustment_timespan());
    // A period that apparently ran backwards clamps to the lower bound, the same as a very
    // fast one.
    let observed = u64::from(parent_timestamp.saturating_sub(period_first_timestamp));
    let observed = observed.clamp(scheduled / 4, scheduled * 4);

    let parent_target = parent_bits.expand()?.as_u256();
    let scaled = match parent_target.checked_mul(U256::from(observed)) {
        Some(product) => product / U256::from(scheduled),
        // Multiply-first overflows only near the 256-bit limit; dividing first loses precision
        // below the compact mantissa and is therefore observationally identical.
        None => (parent_target / U256::from(scheduled)) * U256::from(observed),
    };

    let limit = constants.pow_target_limit().as_u256();
    let next = Target::new(scaled.min(limit));
    Ok(CompactTarget::from_target(&next))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::consensus::Network;

    fn constants() -> ConsensusConstants {
        ConsensusConstants::for_network(Network::MainNet)
    }

    #[test]
    fn steady_period_keeps_the_target() {
        let bits = CompactTarget::from_bits(0x1b04_04cb);
        let first = 1_000_000;
        let last = first + constants().difficulty_adjustment_timespan();
        let next = calc_next_required_target(bits, first, last, &constants()).unwrap();
        assert_eq!(next, bits);
    }

    #[test]
    fn quarter_period_quadruples_difficulty() {
        // A period finishing in a quarter of the scheduled time clamps at the lower bound and
        // the target shrinks four-fold: 0x1d00ffff -> 0x1c3fffc0.
        let bits = CompactTarget::from_bits(0x1d00_ffff);
        let first = 1_000_000;
        let last = first + constants().difficulty_adjustment_timespan() / 4;
        let next = calc_next_required_target(bits, first, last, &constants()).unwrap();
        assert_eq!(next.bits(), 0x1c3f_ffc0);
    }

    #[test]
    fn slow_period_is_capped_at_the_target_limit() {
        // Quadrupling the maximum target must not exceed the network limit.
        let bits = CompactTarget::from_bits(0x1d00_ffff);
        let first = 1_000_000;
        let last = first + constants().difficulty_adjustment_timespan() * 8;
        let next = calc_next_required_target(bits, first, last, &constants()).unwrap();
        assert_eq!(next.bits(), 0x1d00_ffff);
    }

    #[test]
    fn backwards_period_clamps_to_the_lower_bound() {
        let bits = CompactTarget::from_bits(0x1d00_ffff);
        let next = calc_next_required_target(bits, 2_000_000, 1_000_000, &constants()).unwrap();
        assert_eq!(next.bits(), 0x1c3f_ffc0);
    }

    #[test]
    fn no_retargeting_passes_the_parent_bits_through() {
        let regtest = ConsensusConstants::for_network(Network::RegTest);
        let bits = CompactTarget::from_bits(0x207f_ffff);
        let next = calc_next_required_target(bits, 0, u32::MAX, &regtest).unwrap();
        assert_eq!(next, bits);
    }
}
