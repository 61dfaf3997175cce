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
use log::*;

use crate::{
    blocks::BlockHeader,
    chain_storage::{ChainContext, ContextPolicy, Key},
    common::RollingVec,
    proof_of_work::AccumulatedWork,
    validation::helpers::median_timestamp,
};

const LOG_TARGET: &str = "c::cs::header_context";

/// Number of ancestor timestamps contributing to the median time past.
pub const MEDIAN_TIMESTAMP_WINDOW: usize = 11;

/// Everything derived about a header once its place in the tree is known: identity, height,
/// accumulated branch work and the median time past of its ancestors.
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderContext {
    header: BlockHeader,
    hash: BlockHash,
    height: u64,
    total_work: AccumulatedWork,
    median_time_past: u32,
    /// Timestamps of the most recent headers up to and including this one, oldest first. Feeds
    /// the median time past of descendants.
    prev_timestamps: RollingVec<u32>,
}

impl HeaderContext {
    pub fn genesis(header: BlockHeader) -> Self {
        let hash = header.hash();
        Self {
            hash,
            height: 0,
            total_work: header_work(&header),
            median_time_past: header.timestamp,
            prev_timestamps: RollingVec::from_items(MEDIAN_TIMESTAMP_WINDOW, [header.timestamp]),
            header,
        }
    }

    /// Derives the context of a child header. `hash` is passed in because callers have already
    /// computed it during validation.
    pub fn child(&self, header: BlockHeader, hash: BlockHash) -> Self {
        let mut prev_timestamps = self.prev_timestamps.clone();
        prev_timestamps.push(header.timestamp);
        Self {
            hash,
            height: self.height + 1,
            total_work: self.total_work + header_work(&header),
            median_time_past: median_timestamp(self.prev_timestamps.as_slice()),
            prev_timestamps,
            header,
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn hash(&self) -> BlockHash {
        self.hash
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn total_work(&self) -> AccumulatedWork {
        self.total_work
    }

    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    pub fn median_time_past(&self) -> u32 {
        self.median_time_past
    }

    pub fn key(&self) -> Key {
        Key {
            height: self.height,
            hash: self.hash,
        }
    }
}

impl ChainContext for HeaderContext {
    fn hash(&self) -> BlockHash {
        self.hash
    }

    fn height(&self) -> u64 {
        self.height
    }

    fn total_work(&self) -> AccumulatedWork {
        self.total_work
    }
}

fn header_work(header: &BlockHeader) -> AccumulatedWork {
    match header.bits.expand() {
        Ok(target) => target.block_work(),
        Err(err) => {
            // A header reaches a context only after proof-of-work validation; invalid bits here
            // are an internal invariant violation.
            debug_assert!(false, "stored header has invalid bits: {}", err);
            error!(target: LOG_TARGET, "Fatal: stored header has invalid bits: {}", err);
            AccumulatedWork::zero()
        },
    }
}

/// Context policy for the header timechain.
pub struct HeaderContextPolicy;

impl ContextPolicy<BlockHeader, HeaderContext> for HeaderContextPolicy {
    fn extend(&self, parent: &HeaderContext, child_data: &BlockHeader, child_hash: BlockHash) -> HeaderContext {
        parent.child(*child_data, child_hash)
    }

    fn rewind(&self, child: &HeaderContext, parent_data: &BlockHeader, parent_hash: BlockHash) -> HeaderContext {
        let mut prev_timestamps = child.prev_timestamps.clone();
        prev_timestamps.pop();
        // The timestamp that rolled off the window eleven headers ago is unrecoverable here; a
        // rewound context carries a shortened window. Consensus reads timestamps through the
        // ancestry view, which walks the actual ancestors.
        let median_time_past = if prev_timestamps.len() > 1 {
            median_timestamp(&prev_timestamps.as_slice()[..prev_timestamps.len() - 1])
        } else {
            parent_data.timestamp
        };
        HeaderContext {
            header: *parent_data,
            hash: parent_hash,
            height: child.height.saturating_sub(1),
            total_work: child
                .total_work
                .checked_sub(header_work(&child.header))
                .unwrap_or_default(),
            median_time_past,
            prev_timestamps,
        }
    }
}
