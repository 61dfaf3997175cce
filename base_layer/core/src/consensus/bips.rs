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

use serde::{Deserialize, Serialize};

use crate::consensus::Network;

/// Height-gated consensus flags. Each BIP activates at a fixed, per-network block height and
/// stays active for every later height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bip {
    /// Coinbase scriptSig must commit to the block height.
    Bip34,
    /// Strict DER signatures.
    Bip66,
    /// OP_CHECKLOCKTIMEVERIFY.
    Bip65,
    /// Segregated witness: witness commitments and block weight.
    Bip141,
}

impl Display for Bip {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Bip::Bip34 => "BIP34",
            Bip::Bip66 => "BIP66",
            Bip::Bip65 => "BIP65",
            Bip::Bip141 => "BIP141",
        };
        f.write_str(name)
    }
}

/// Activation heights for the supported BIPs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BipActivations {
    bip34_height: u64,
    bip66_height: u64,
    bip65_height: u64,
    bip141_height: u64,
}

impl BipActivations {
    pub const fn for_network(network: Network) -> Self {
        match network {
            Network::MainNet => Self {
                bip34_height: 227_931,
                bip66_height: 363_725,
                bip65_height: 388_381,
                bip141_height: 481_824,
            },
            Network::TestNet => Self {
                bip34_height: 21_111,
                bip66_height: 330_776,
                bip65_height: 581_885,
                bip141_height: 834_624,
            },
            Network::RegTest => Self {
                bip34_height: 500,
                bip66_height: 1251,
                bip65_height: 1351,
                bip141_height: 0,
            },
            Network::Signet => Self {
                bip34_height: 1,
                bip66_height: 1,
                bip65_height: 1,
                bip141_height: 1,
            },
        }
    }

    pub const fn is_enabled_at(&self, bip: Bip, height: u64) -> bool {
        let activation = match bip {
            Bip::Bip34 => self.bip34_height,
            Bip::Bip66 => self.bip66_height,
            Bip::Bip65 => self.bip65_height,
            Bip::Bip141 => self.bip141_height,
        };
        height >= activation
    }

    /// The lowest header version that is still acceptable at the given height.
    ///
    /// Versions 0 and 1 are retired when BIP34 activates, version 2 when BIP66 activates and
    /// version 3 when BIP65 activates.
    pub const fn minimum_header_version_at(&self, height: u64) -> i32 {
        if self.is_enabled_at(Bip::Bip65, height) {
            4
        } else if self.is_enabled_at(Bip::Bip66, height) {
            3
        } else if self.is_enabled_at(Bip::Bip34, height) {
            2
        } else {
            1
        }
    }
}
