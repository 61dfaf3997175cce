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

use std::fmt::{self, Display, Formatter};

use corvus_common_types::FixedHash;
use primitive_types::U256;

use crate::proof_of_work::AccumulatedWork;

/// A fully expanded 256-bit proof-of-work target.
///
/// A header satisfies the target when its hash, interpreted as a little-endian 256-bit integer,
/// is numerically less than or equal to the target.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Target(U256);

impl Target {
    pub fn new(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_met_by(&self, hash: &FixedHash) -> bool {
        U256::from_little_endian(hash.as_bytes()) <= self.0
    }

    /// The expected number of hash evaluations needed to find a block at this target,
    /// `2^256 / (target + 1)`.
    ///
    /// Computed as `(!target / (target + 1)) + 1`, which is equivalent and avoids 257-bit
    /// arithmetic. Any target produced by [`CompactTarget::expand`] is strictly below `U256::MAX`,
    /// so the increment cannot overflow.
    ///
    /// [`CompactTarget::expand`]: crate::proof_of_work::CompactTarget::expand
    pub fn block_work(&self) -> AccumulatedWork {
        let target = self.0;
        AccumulatedWork::new((!target / (target + U256::one())) + U256::one())
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut bytes = [0u8; 32];
        self.0.to_big_endian(&mut bytes);
        f.write_str(&hex::encode(bytes))
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Target({})", self)
    }
}
