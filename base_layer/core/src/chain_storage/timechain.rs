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

use std::sync::Arc;

use corvus_common_types::BlockHash;
use log::*;

use crate::{
    blocks::{genesis_block::get_genesis_header, BlockHeader},
    chain_storage::{
        sidecar::{SidecarHandle, SidecarStore, SidecarSync, StructuralUpdate},
        ChainMetadata,
        ChainStorageError,
        ChainTree,
        HeaderContext,
        HeaderContextPolicy,
        Key,
        Locator,
        TreeInsertion,
    },
    common::{SharedMutex, SharedMutexReadGuard, SingleWriter},
    consensus::{ConsensusConstants, Network},
};

const LOG_TARGET: &str = "c::cs::timechain";

/// How far below the tip a fork may sit before opportunistic pruning erases it.
const DEFAULT_PRUNE_KEEP_DEPTH: u64 = 288;

/// The concrete tree type the timechain is built on.
pub type HeaderTree = ChainTree<BlockHeader, HeaderContext, HeaderContextPolicy>;

struct TimechainInner {
    tree: HeaderTree,
    sidecars: Vec<Arc<dyn SidecarSync>>,
}

/// The block-header tree plus its coupled sidecars.
///
/// All structural state lives behind one writer-preferring mutex: reads share it, mutation takes
/// it exclusively and fans every change out to the registered sidecars before releasing, so a
/// reader always observes the tree and all sidecars either before or after a mutation, never in
/// between. Sidecar values have per-sidecar metadata locks, always taken after the structural
/// lock.
pub struct HeaderTimechain {
    structural: SharedMutex<TimechainInner>,
    metadata: SingleWriter<ChainMetadata>,
    constants: ConsensusConstants,
    prune_keep_depth: u64,
}

impl HeaderTimechain {
    /// Creates a timechain for `network` with its genesis header preloaded at height 0.
    pub fn new(network: Network) -> Self {
        Self::with_constants(ConsensusConstants::for_network(network))
    }

    pub fn with_constants(constants: ConsensusConstants) -> Self {
        let genesis = get_genesis_header(constants.network());
        let context = HeaderContext::genesis(genesis);
        let metadata = ChainMetadata::new(context.hash(), 0, context.total_work());
        info!(
            target: LOG_TARGET,
            "Initialized {} timechain at genesis {}",
            constants.network(),
            context.hash()
        );
        Self {
            structural: SharedMutex::new(TimechainInner {
                tree: ChainTree::with_genesis(HeaderContextPolicy, genesis, context),
                sidecars: Vec::new(),
            }),
            metadata: SingleWriter::new(metadata),
            constants,
            prune_keep_depth: DEFAULT_PRUNE_KEEP_DEPTH,
        }
    }

    pub fn constants(&self) -> &ConsensusConstants {
        &self.constants
    }

    /// The published tip snapshot. Never takes the structural lock.
    pub fn metadata(&self) -> Arc<ChainMetadata> {
        self.metadata.snapshot()
    }

    /// Opens shared read access to the tree. The returned guard holds the structural lock; drop
    /// it promptly.
    pub fn read(&self) -> TimechainReadAccess<'_> {
        TimechainReadAccess {
            guard: self.structural.read(),
        }
    }

    pub fn tip_context(&self) -> HeaderContext {
        self.read()
            .tree()
            .chain_tip_context()
            .cloned()
            .expect("the timechain always contains at least its genesis header")
    }

    /// Inserts a validated header under `parent` and mirrors the mutation into every registered
    /// sidecar before the structural lock is released.
    pub fn add(
        &self,
        parent: Locator,
        header: BlockHeader,
        context: HeaderContext,
    ) -> Result<TreeInsertion, ChainStorageError> {
        let mut inner = self.structural.write();
        let insertion = inner.tree.add(parent, header, context)?;
        let update = StructuralUpdate {
            parent,
            child_hash: insertion.key.hash,
            child_height: insertion.key.height,
            moved_to_forest: insertion.moved_to_forest.clone(),
        };
        for sidecar in &inner.sidecars {
            sidecar.apply(&update);
        }
        inner.tree.prune_forest(self.prune_keep_depth);
        for sidecar in &inner.sidecars {
            sidecar.prune(self.prune_keep_depth);
        }

        let tip = inner
            .tree
            .chain_tip_context()
            .expect("the timechain always contains at least its genesis header");
        let snapshot = ChainMetadata::new(tip.hash(), tip.height(), tip.total_work());
        // Structural lock before metadata lock, per the locking order.
        *self.metadata.edit() = snapshot;
        Ok(insertion)
    }

    /// Registers a new sidecar, replaying the complete existing structure into it under the
    /// structural write lock. Every node starts at `default_value`.
    pub fn register_sidecar<T>(&self, default_value: T) -> SidecarHandle<T>
    where T: Clone + Send + Sync + 'static {
        let mut inner = self.structural.write();
        let store = Arc::new(SidecarStore::new(default_value));
        store.replay(&inner.tree);
        let erased: Arc<dyn SidecarSync> = store.clone();
        inner.sidecars.push(erased);
        debug!(target: LOG_TARGET, "Registered sidecar #{}", inner.sidecars.len());
        SidecarHandle { store }
    }

    /// Reads a sidecar value at (height, hash): structural shared lock, then the sidecar's
    /// metadata shared lock.
    pub fn sidecar_get<T>(&self, handle: &SidecarHandle<T>, height: u64, hash: BlockHash) -> Option<T>
    where T: Clone + Send + Sync {
        let _structural = self.structural.read();
        handle.store.get(height, hash)
    }

    /// Writes a sidecar value at (height, hash): structural shared lock, then the sidecar's
    /// metadata exclusive lock. Returns false when no such node exists.
    pub fn sidecar_set<T>(&self, handle: &SidecarHandle<T>, height: u64, hash: BlockHash, value: T) -> bool
    where T: Clone + Send + Sync {
        let _structural = self.structural.read();
        handle.store.set(height, hash, value)
    }
}

/// Shared read access to the timechain structure. Holds the structural lock for its lifetime.
pub struct TimechainReadAccess<'a> {
    guard: SharedMutexReadGuard<'a, TimechainInner>,
}

impl TimechainReadAccess<'_> {
    pub fn tree(&self) -> &HeaderTree {
        &self.guard.tree
    }

    /// Pins (height, hash) to a locator valid for as long as this read access is held. Across
    /// reorgs the same key resolves to whatever form the node currently has, or `None` once
    /// pruned.
    pub fn find_stable(&self, height: u64, hash: BlockHash) -> Option<Locator> {
        self.tree().make_locator(Key { height, hash })
    }

    pub fn resolve_hash(&self, hash: &BlockHash) -> Option<Locator> {
        self.tree().resolve_hash(hash)
    }

    pub fn context_at(&self, locator: Locator) -> Option<HeaderContext> {
        self.tree().context_at(locator)
    }
}
