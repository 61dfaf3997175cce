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

use serde::{Deserialize, Serialize};

use crate::{
    consensus::{Bip, BipActivations, Network},
    proof_of_work::{CompactTarget, Target},
};

/// The fixed consensus parameters of a network.
///
/// These never change at runtime; per-height variation (BIP activation) is resolved through
/// [`BipActivations`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConsensusConstants {
    network: Network,
    /// Number of blocks between difficulty retargets.
    difficulty_adjustment_interval: u64,
    /// Scheduled seconds between blocks.
    target_spacing_secs: u32,
    /// Scheduled seconds per difficulty period (`interval * spacing`).
    difficulty_adjustment_timespan: u32,
    pow_limit_bits: CompactTarget,
    /// Testnet rule allowing a minimum-difficulty block after a long block gap.
    allow_min_difficulty: bool,
    /// Regtest rule disabling retargeting entirely.
    no_retargeting: bool,
    /// Maximum seconds a header timestamp may lie in the future of wall-clock time.
    future_time_limit_secs: u32,
    /// Number of ancestor timestamps contributing to the median time past.
    median_timestamp_count: usize,
    max_block_serialized_size: usize,
    max_block_weight: u64,
    max_block_sigops_cost: u64,
    /// Total monetary supply cap in satoshis.
    max_money: i64,
    coinbase_script_min_size: usize,
    coinbase_script_max_size: usize,
    bips: BipActivations,
}

impl ConsensusConstants {
    pub fn for_network(network: Network) -> Self {
        ConsensusConstantsBuilder::new(network).build()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn difficulty_adjustment_interval(&self) -> u64 {
        self.difficulty_adjustment_interval
    }

    pub fn target_spacing_secs(&self) -> u32 {
        self.target_spacing_secs
    }

    pub fn difficulty_adjustment_timespan(&self) -> u32 {
        self.difficulty_adjustment_timespan
    }

    pub fn is_retarget_height(&self, height: u64) -> bool {
        height % self.difficulty_adjustment_interval == 0
    }

    pub fn pow_limit_bits(&self) -> CompactTarget {
        self.pow_limit_bits
    }

    /// The fully expanded maximum target (lowest difficulty) this network accepts.
    pub fn pow_target_limit(&self) -> Target {
        self.pow_limit_bits
            .expand()
            .expect("the network proof-of-work limit is a valid compact target")
    }

    pub fn allow_min_difficulty(&self) -> bool {
        self.allow_min_difficulty
    }

    pub fn no_retargeting(&self) -> bool {
        self.no_retargeting
    }

    pub fn future_time_limit_secs(&self) -> u32 {
        self.future_time_limit_secs
    }

    pub fn median_timestamp_count(&self) -> usize {
        self.median_timestamp_count
    }

    pub fn max_block_serialized_size(&self) -> usize {
        self.max_block_serialized_size
    }

    pub fn max_block_weight(&self) -> u64 {
        self.max_block_weight
    }

    pub fn max_block_sigops_cost(&self) -> u64 {
        self.max_block_sigops_cost
    }

    pub fn max_money(&self) -> i64 {
        self.max_money
    }

    pub fn coinbase_script_size_range(&self) -> (usize, usize) {
        (self.coinbase_script_min_size, self.coinbase_script_max_size)
    }

    pub fn bips(&self) -> &BipActivations {
        &self.bips
    }

    pub fn is_bip_enabled_at(&self, bip: Bip, height: u64) -> bool {
        self.bips.is_enabled_at(bip, height)
    }
}

/// Builder for [`ConsensusConstants`]. Production code uses the per-network defaults; tests
/// override individual parameters.
pub struct ConsensusConstantsBuilder {
    inner: ConsensusConstants,
}

impl ConsensusConstantsBuilder {
    pub fn new(network: Network) -> Self {
        let (pow_limit_bits, allow_min_difficulty, no_retargeting) = match network {
            Network::MainNet => (CompactTarget::from_bits(0x1d00_ffff), false, false),
            Network::TestNet => (CompactTarget::from_bits(0x1d00_ffff), true, false),
            Network::RegTest => (CompactTarget::from_bits(0x207f_ffff), true, true),
            Network::Signet => (CompactTarget::from_bits(0x1e03_77ae), false, false),
        };
        let difficulty_adjustment_interval = 2016;
        let target_spacing_secs = 600;
        Self {
            inner: ConsensusConstants {
                network,
                difficulty_adjustment_interval,
                target_spacing_secs,
                difficulty_adjustment_timespan: difficulty_adjustment_interval as u32 * target_spacing_secs,
                pow_limit_bits,
                allow_min_difficulty,
                no_retargeting,
                future_time_limit_secs: 7200,
                median_timestamp_count: 11,
                max_block_serialized_size: 1_000_000,
                max_block_weight: 4_000_000,
                max_block_sigops_cost: 80_000,
                max_money: 2_100_000_000_000_000,
                coinbase_script_min_size: 2,
                coinbase_script_max_size: 100,
                bips: BipActivations::for_network(network),
            },
        }
    }

    pub fn with_difficulty_adjustment(mut self, interval: u64, spacing_secs: u32) -> Self {
        self.inner.difficulty_adjustment_interval = interval;
        self.inner.target_spacing_secs = spacing_secs;
        self.inner.difficulty_adjustment_timespan = interval as u32 * spacing_secs;
        self
    }

    pub fn with_pow_limit_bits(mut self, bits: CompactTarget) -> Self {
        self.inner.pow_limit_bits = bits;
        self
    }

    pub fn with_no_retargeting(mut self, no_retargeting: bool) -> Self {
        self.inner.no_retargeting = no_retargeting;
        self
    }

    pub fn with_allow_min_difficulty(mut self, allow: bool) -> Self {
        self.inner.allow_min_difficulty = allow;
        self
    }

    pub fn with_bip_activations(mut self, bips: BipActivations) -> Self {
        self.inner.bips = bips;
        self
    }

    pub fn build(self) -> ConsensusConstants {
        self.inner
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mainnet_defaults() {
        let constants = ConsensusConstants::for_network(Network::MainNet);
        assert_eq!(constants.difficulty_adjustment_interval(), 2016);
        assert_eq!(constants.difficulty_adjustment_timespan(), 1_209_600);
        assert_eq!(constants.pow_limit_bits().bits(), 0x1d00_ffff);
        assert!(!constants.allow_min_difficulty());
        assert!(!constants.no_retargeting());
        assert!(constants.is_retarget_height(2016 * 3));
        assert!(!constants.is_retarget_height(2016 * 3 + 1));
    }

    #[test]
    fn regtest_never_retargets() {
        let constants = ConsensusConstants::for_network(Network::RegTest);
        assert!(constants.no_retargeting());
        assert!(constants.allow_min_difficulty());
        assert_eq!(constants.pow_limit_bits().bits(), 0x207f_ffff);
    }
}
