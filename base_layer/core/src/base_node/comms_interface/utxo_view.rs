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

use bitflags::bitflags;

use crate::{blocks::Block, transactions::Transaction, validation::BlockError};

bitflags! {
    /// Properties of the output a spend consumes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FundingFlags: u8 {
        /// The funding output was created by a coinbase transaction.
        const COINBASE = 0b0000_0001;
    }
}

/// One input of one non-coinbase transaction, joined with the unspent output it consumes.
pub struct SpendRecord<'a> {
    pub funding_height: u64,
    pub funding_flags: FundingFlags,
    /// Value of the funding output in satoshis.
    pub amount: i64,
    pub pubkey_script: &'a [u8],
    /// The spending transaction.
    pub tx: &'a Transaction,
    /// Index of the spending input within `tx`.
    pub spend_input_index: usize,
}

/// The sole channel through which the block-validation pipeline reads unspent-output data. The
/// store behind it is a collaborator concern.
pub trait UnspentOutputsView: Send + Sync {
    /// Enumerates a [`SpendRecord`] for every input of every non-coinbase transaction in
    /// `block`, in block order. The first error from `f` (or from resolving a spend) aborts the
    /// enumeration.
    fn for_each_spend(
        &self,
        block: &Block,
        f: &mut dyn FnMut(&SpendRecord<'_>) -> Result<(), BlockError>,
    ) -> Result<(), BlockError>;

    /// Whether the funding data needed to enumerate `block`'s spends is available yet. The
    /// validation pipeline defers a block while this is false and other work is queued.
    fn spends_ready(&self, _block: &Block, _height: u64) -> bool {
        true
    }
}
