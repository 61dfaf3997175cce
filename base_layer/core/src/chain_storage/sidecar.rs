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
    blocks::BlockHeader,
    chain_storage::{
        ChainContext,
        ChainTree,
        ContextPolicy,
        HeaderContext,
        HeaderContextPolicy,
        Key,
        Locator,
    },
    common::SharedMutex,
    proof_of_work::AccumulatedWork,
};

const LOG_TARGET: &str = "c::cs::sidecar";

/// A structural mutation of the master timechain, in pre-mutation coordinates, for sidecars to
/// mirror. Applying updates in emission order reproduces the master's structure exactly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuralUpdate {
    pub parent: Locator,
    pub child_hash: BlockHash,
    pub child_height: u64,
    /// Chain hashes the master demoted to its forest; non-empty exactly when the add reorged.
    pub moved_to_forest: Vec<BlockHash>,
}

/// Context carried by sidecar tree nodes: pure structure, no work. A sidecar branch never
/// outweighs its chain, so promotion only ever happens on explicit instruction from the master.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidecarContext {
    hash: BlockHash,
    height: u64,
}

impl ChainContext for SidecarContext {
    fn hash(&self) -> BlockHash {
        self.hash
    }

    fn height(&self) -> u64 {
        self.height
    }

    fn total_work(&self) -> AccumulatedWork {
        AccumulatedWork::zero()
    }
}

/// Sidecar policy: structure bookkeeping only, values travel with the node data.
pub struct SidecarContextPolicy;

impl<T> ContextPolicy<T, SidecarContext> for SidecarContextPolicy {
    fn extend(&self, parent: &SidecarContext, _child_data: &T, child_hash: BlockHash) -> SidecarContext {
        SidecarContext {
            hash: child_hash,
            height: parent.height + 1,
        }
    }

    fn rewind(&self, child: &SidecarContext, _parent_data: &T, parent_hash: BlockHash) -> SidecarContext {
        SidecarContext {
            hash: parent_hash,
            height: child.height.saturating_sub(1),
        }
    }
}

/// The structure-mirroring interface every sidecar exposes to its timechain, independent of the
/// value type it stores.
pub(crate) trait SidecarSync: Send + Sync {
    fn apply(&self, update: &StructuralUpdate);
    fn prune(&self, max_keep_depth: u64);
}

/// Value storage for one sidecar: a [`ChainTree`] with the same shape as the master timechain,
/// holding one `T` per node. Structure changes arrive under the timechain's structural lock;
/// value reads and writes take this store's own metadata lock.
pub(crate) struct SidecarStore<T> {
    default_value: T,
    tree: SharedMutex<ChainTree<T, SidecarContext, SidecarContextPolicy>>,
}

impl<T> SidecarStore<T>
where
    T: Clone + Send + Sync,
{
    pub fn new(default_value: T) -> Self {
        Self {
            default_value,
            tree: SharedMutex::new(ChainTree::new(SidecarContextPolicy)),
        }
    }

    /// Rebuilds this (empty) sidecar to match `master`: the chain in height order, then the
    /// forest in parents-before-children order. Every node starts at the default value.
    pub fn replay(&self, master: &ChainTree<BlockHeader, HeaderContext, HeaderContextPolicy>) {
        let mut tree = self.tree.write();
        debug_assert!(tree.is_empty(), "sidecar replay expects an empty store");
        for key in master.chain_keys() {
            if key.height == 0 {
                *tree = ChainTree::with_genesis(SidecarContextPolicy, self.default_value.clone(), SidecarContext {
                    hash: key.hash,
                    height: 0,
                });
            } else {
                self.apply_to(&mut tree, Locator::Chain(key.height - 1), key);
            }
        }
        for (key, parent) in master.forest_topological() {
            self.apply_to(&mut tree, parent, key);
        }
        debug!(
            target: LOG_TARGET,
            "Replayed {} chain node(s) and {} forest node(s) into a new sidecar",
            tree.chain_len(),
            tree.forest_len()
        );
    }

    fn apply_to(
        &self,
        tree: &mut ChainTree<T, SidecarContext, SidecarContextPolicy>,
        parent: Locator,
        key: Key,
    ) {
        let context = SidecarContext {
            hash: key.hash,
            height: key.height,
        };
        if let Err(err) = tree.add(parent, self.default_value.clone(), context) {
            // The master committed this exact mutation; a sidecar failing to mirror it is an
            // internal invariant violation.
            debug_assert!(false, "sidecar failed to mirror structural update: {}", err);
            error!(target: LOG_TARGET, "Fatal: sidecar failed to mirror structural update: {}", err);
        }
    }

    pub fn get(&self, height: u64, hash: BlockHash) -> Option<T> {
        let tree = self.tree.read();
        let locator = tree.make_locator(Key { height, hash })?;
        tree.get(locator).cloned()
    }

    /// Sets the value at (height, hash). Returns false when the node does not exist.
    pub fn set(&self, height: u64, hash: BlockHash, value: T) -> bool {
        let mut tree = self.tree.write();
        let locator = match tree.make_locator(Key { height, hash }) {
            Some(locator) => locator,
            None => return false,
        };
        match tree.get_mut(locator) {
            Some(slot) => {
                *slot = value;
                true
            },
            None => false,
        }
    }
}

impl<T> SidecarSync for SidecarStore<T>
where
    T: Clone + Send + Sync,
{
    fn apply(&self, update: &StructuralUpdate) {
        let mut tree = self.tree.write();
        let context = SidecarContext {
            hash: update.child_hash,
            height: update.child_height,
        };
        if let Err(err) = tree.add(update.parent, self.default_value.clone(), context) {
            debug_assert!(false, "sidecar failed to mirror structural update: {}", err);
            error!(target: LOG_TARGET, "Fatal: sidecar failed to mirror structural update: {}", err);
            return;
        }
        if !update.moved_to_forest.is_empty() {
            // The master reorged on this add; mirror the promotion explicitly since sidecar
            // contexts carry no work.
            match tree.promote_branch(update.child_hash) {
                Ok(moved) => debug_assert_eq!(moved, update.moved_to_forest),
                Err(err) => {
                    debug_assert!(false, "sidecar failed to mirror reorg: {}", err);
                    error!(target: LOG_TARGET, "Fatal: sidecar failed to mirror reorg: {}", err);
                },
            }
        }
    }

    fn prune(&self, max_keep_depth: u64) {
        self.tree.write().prune_forest(max_keep_depth);
    }
}

/// Typed handle to a registered sidecar, issued by
/// [`HeaderTimechain::register_sidecar`](crate::chain_storage::HeaderTimechain::register_sidecar).
/// The handle recovers the concrete value type that the timechain's registry erases.
pub struct SidecarHandle<T> {
    pub(crate) store: Arc<SidecarStore<T>>,
}

impl<T> Clone for SidecarHandle<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}
