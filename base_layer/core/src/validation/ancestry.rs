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

use corvus_common_types::BlockHash;

use crate::{
    blocks::{Block, BlockHeader},
    chain_storage::{HeaderContext, HeaderTree, Locator},
    consensus::ConsensusConstants,
};

/// An immutable view of the ancestor chain below a candidate block.
///
/// Consensus rules never touch timechain storage directly; they read ancestor timestamps through
/// this trait, resolved along the candidate's own ancestry rather than the canonical tip, so a
/// fork candidate is judged against its actual parents.
pub trait HeaderAncestryView {
    /// Number of ancestors, equal to the candidate's height.
    fn length(&self) -> u64;

    /// Timestamp of the ancestor at `height`, which must be below the candidate.
    fn timestamp_at(&self, height: u64) -> Option<u32>;

    /// The most recent ancestor timestamps, oldest first, capped at `n` and at the number of
    /// ancestors that exist.
    fn last_n_timestamps(&self, n: usize) -> Vec<u32>;
}

/// The production view: walks a [`HeaderTree`] from the candidate's parent towards genesis.
pub struct TimechainAncestryView<'a> {
    tree: &'a HeaderTree,
    parent: Locator,
    parent_height: u64,
}

impl<'a> TimechainAncestryView<'a> {
    pub fn new(tree: &'a HeaderTree, parent: Locator, parent_height: u64) -> Self {
        Self {
            tree,
            parent,
            parent_height,
        }
    }
}

impl HeaderAncestryView for TimechainAncestryView<'_> {
    fn length(&self) -> u64 {
        self.parent_height + 1
    }

    fn timestamp_at(&self, height: u64) -> Option<u32> {
        if height > self.parent_height {
            return None;
        }
        self.tree
            .get_ancestor_at_height(self.parent, height)
            .map(|header| header.timestamp)
    }

    fn last_n_timestamps(&self, n: usize) -> Vec<u32> {
        let mut timestamps: Vec<u32> = self
            .tree
            .ancestors(self.parent)
            .take(n)
            .map(|header| header.timestamp)
            .collect();
        timestamps.reverse();
        timestamps
    }
}

/// Everything a header rule may consult.
pub struct HeaderValidationContext<'a> {
    pub header: &'a BlockHeader,
    /// The candidate's hash, computed once by the caller.
    pub hash: BlockHash,
    pub height: u64,
    pub parent: &'a HeaderContext,
    pub ancestry: &'a dyn HeaderAncestryView,
    pub constants: &'a ConsensusConstants,
    /// Wall-clock Unix seconds, captured at the sync boundary so rules stay pure.
    pub current_time: u32,
}

/// Everything a contextual block rule may consult.
pub struct BlockValidationContext<'a> {
    pub block: &'a Block,
    pub height: u64,
    pub ancestry: &'a dyn HeaderAncestryView,
    pub constants: &'a ConsensusConstants,
}
