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

use crate::proof_of_work::AccumulatedWork;

/// A cheap snapshot of where the canonical chain currently ends. Published through an atomic
/// container so readers never need the structural lock for a tip glance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainMetadata {
    best_block: BlockHash,
    best_height: u64,
    accumulated_work: AccumulatedWork,
}

impl ChainMetadata {
    pub fn new(best_block: BlockHash, best_height: u64, accumulated_work: AccumulatedWork) -> Self {
        Self {
            best_block,
            best_height,
            accumulated_work,
        }
    }

    pub fn best_block(&self) -> &BlockHash {
        &self.best_block
    }

    pub fn best_height(&self) -> u64 {
        self.best_height
    }

    pub fn accumulated_work(&self) -> AccumulatedWork {
        self.accumulated_work
    }
}
