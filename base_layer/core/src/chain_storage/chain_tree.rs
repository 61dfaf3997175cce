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

use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
};

use corvus_common_types::BlockHash;
use log::*;

use crate::{chain_storage::ChainStorageError, proof_of_work::AccumulatedWork};

const LOG_TARGET: &str = "c::cs::chain_tree";

/// The stable (height, hash) pair identifying a node across reorgs. This is the form handed to
/// external collaborators; [`Locator`] is the internal addressing scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    pub height: u64,
    pub hash: BlockHash,
}

/// Internal address of a node: a height on the canonical (heaviest) chain, or the hash of a
/// forest node. A locator is only meaningful against a particular structural state of the tree;
/// a reorg may move a node from one form to the other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Locator {
    Chain(u64),
    Fork(BlockHash),
}

impl Display for Locator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Chain(height) => write!(f, "chain height {}", height),
            Locator::Fork(hash) => write!(f, "fork node {}", hash),
        }
    }
}

/// Per-node derived state carried alongside the user data. The tree only requires what it needs
/// to keep the heaviest branch canonical: identity, height and accumulated work.
pub trait ChainContext: Clone {
    fn hash(&self) -> BlockHash;
    fn height(&self) -> u64;
    fn total_work(&self) -> AccumulatedWork;
}

/// Rebuilds contexts when nodes move between the chain and the forest during a reorg.
///
/// `extend` derives a child context from its parent's; `rewind` derives a parent context from
/// its child's. The pair keeps the tree agnostic of the context representation.
pub trait ContextPolicy<D, C> {
    fn extend(&self, parent: &C, child_data: &D, child_hash: BlockHash) -> C;
    fn rewind(&self, child: &C, parent_data: &D, parent_hash: BlockHash) -> C;
}

struct ForestNode<D, C> {
    data: D,
    context: C,
    /// `None` for a branch root, which attaches to the chain entry at `root_height`.
    parent: Option<BlockHash>,
    children: Vec<BlockHash>,
    /// Height of the chain entry the branch containing this node forks from. Shared by every
    /// node of a branch; used for pruning by fork depth.
    root_height: u64,
}

/// Result of a successful [`ChainTree::add`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeInsertion {
    /// Where the node landed after any reorg.
    pub key: Key,
    /// Chain entries demoted to the forest by a reorg, in ascending height order. Empty when the
    /// add did not change the canonical chain's tail.
    pub moved_to_forest: Vec<BlockHash>,
}

/// A deep, narrow tree: the canonical (heaviest) branch is a dense array indexed by height and
/// only near-tip divergence lives in a hash-keyed forest.
///
/// Invariants, holding whenever control leaves this type:
/// - the chain is a strict parent→child sequence starting at genesis;
/// - every forest branch attaches to a chain entry (no orphans);
/// - the chain tip carries at least as much accumulated work as any forest leaf;
/// - a hash appears at most once across chain and forest.
pub struct ChainTree<D, C, P> {
    chain: Vec<D>,
    chain_hashes: Vec<BlockHash>,
    chain_index: HashMap<BlockHash, u64>,
    chain_tip_context: Option<C>,
    forest: HashMap<BlockHash, ForestNode<D, C>>,
    min_root_height: Option<u64>,
    policy: P,
}

impl<D, C, P> ChainTree<D, C, P>
where
    C: ChainContext,
    P: ContextPolicy<D, C>,
{
    pub fn new(policy: P) -> Self {
        Self {
            chain: Vec::new(),
            chain_hashes: Vec::new(),
            chain_index: HashMap::new(),
            chain_tip_context: None,
            forest: HashMap::new(),
            min_root_height: None,
            policy,
        }
    }

    pub fn with_genesis(policy: P, data: D, context: C) -> Self {
        let mut tree = Self::new(policy);
        let hash = context.hash();
        tree.chain.push(data);
        tree.chain_hashes.push(hash);
        tree.chain_index.insert(hash, 0);
        tree.chain_tip_context = Some(context);
        tree
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn chain_len(&self) -> u64 {
        self.chain.len() as u64
    }

    pub fn chain_tip_height(&self) -> Option<u64> {
        self.chain.len().checked_sub(1).map(|h| h as u64)
    }

    pub fn chain_tip_context(&self) -> Option<&C> {
        self.chain_tip_context.as_ref()
    }

    pub fn chain_tip_key(&self) -> Option<Key> {
        let height = self.chain_tip_height()?;
        Some(Key {
            height,
            hash: self.chain_hashes[height as usize],
        })
    }

    pub fn forest_len(&self) -> usize {
        self.forest.len()
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.chain_index.contains_key(hash) || self.forest.contains_key(hash)
    }

    pub fn hash_at_height(&self, height: u64) -> Option<BlockHash> {
        self.chain_hashes.get(height as usize).copied()
    }

    /// Resolves a known hash into its current locator.
    pub fn resolve_hash(&self, hash: &BlockHash) -> Option<Locator> {
        if let Some(height) = self.chain_index.get(hash) {
            return Some(Locator::Chain(*height));
        }
        if self.forest.contains_key(hash) {
            return Some(Locator::Fork(*hash));
        }
        None
    }

    /// Resolves a (height, hash) key into a locator, verifying that the hash actually sits at
    /// that height in the current structure.
    pub fn make_locator(&self, key: Key) -> Option<Locator> {
        match self.resolve_hash(&key.hash)? {
            Locator::Chain(height) if height == key.height => Some(Locator::Chain(height)),
            Locator::Chain(_) => None,
            Locator::Fork(hash) => {
                let node = self.forest.get(&hash)?;
                (node.context.height() == key.height).then_some(Locator::Fork(hash))
            },
        }
    }

    pub fn get(&self, locator: Locator) -> Option<&D> {
        match locator {
            Locator::Chain(height) => self.chain.get(height as usize),
            Locator::Fork(hash) => self.forest.get(&hash).map(|node| &node.data),
        }
    }

    pub fn get_mut(&mut self, locator: Locator) -> Option<&mut D> {
        match locator {
            Locator::Chain(height) => self.chain.get_mut(height as usize),
            Locator::Fork(hash) => self.forest.get_mut(&hash).map(|node| &mut node.data),
        }
    }

    /// Returns the context of the node at `locator`.
    ///
    /// Forest nodes and the chain tip store their contexts; for interior chain entries the
    /// context is rebuilt by rewinding the tip context down the chain, which costs one policy
    /// step per height of depth.
    pub fn context_at(&self, locator: Locator) -> Option<C> {
        match locator {
            Locator::Fork(hash) => self.forest.get(&hash).map(|node| node.context.clone()),
            Locator::Chain(height) => {
                let tip_height = self.chain_tip_height()?;
                if height > tip_height {
                    return None;
                }
                let mut ctx = self.chain_tip_context.clone()?;
                for h in ((height + 1)..=tip_height).rev() {
                    let parent_data = &self.chain[h as usize - 1];
                    let parent_hash = self.chain_hashes[h as usize - 1];
                    ctx = self.policy.rewind(&ctx, parent_data, parent_hash);
                }
                Some(ctx)
            },
        }
    }

    /// Returns the chain tip if the hash matches it, otherwise a matching forest node.
    pub fn find_tip_or_forks(&self, hash: &BlockHash) -> Option<(Key, &C)> {
        if let Some(key) = self.chain_tip_key() {
            if key.hash == *hash {
                let ctx = self.chain_tip_context.as_ref()?;
                return Some((key, ctx));
            }
        }
        let node = self.forest.get(hash)?;
        Some((
            Key {
                height: node.context.height(),
                hash: *hash,
            },
            &node.context,
        ))
    }

    fn resolve_parent_height(&self, parent: &Locator) -> Option<u64> {
        match parent {
            Locator::Chain(height) => (*height < self.chain_len()).then_some(*height),
            Locator::Fork(hash) => self.forest.get(hash).map(|node| node.context.height()),
        }
    }

    fn heaviest_chain_work(&self) -> AccumulatedWork {
        self.chain_tip_context
            .as_ref()
            .map(ChainContext::total_work)
            .unwrap_or_default()
    }

    /// Inserts a node under `parent`.
    ///
    /// Extending the chain tip is O(1). Any other parent creates (or extends) a forest branch;
    /// if the new node then carries more accumulated work than the chain tip, the branch is
    /// promoted and the displaced chain tail is demoted into the forest, reported through
    /// [`TreeInsertion::moved_to_forest`].
    pub fn add(&mut self, parent: Locator, data: D, context: C) -> Result<TreeInsertion, ChainStorageError> {
        let child_hash = context.hash();
        let child_height = context.height();
        if self.contains(&child_hash) {
            return Err(ChainStorageError::DuplicateHash(child_hash));
        }
        let parent_height = self
            .resolve_parent_height(&parent)
            .ok_or(ChainStorageError::ParentNotFound(parent))?;
        if child_height != parent_height + 1 {
            return Err(ChainStorageError::HeightMismatch {
                parent_height,
                child_height,
            });
        }

        let is_tip_extension = matches!(parent, Locator::Chain(height) if Some(height) == self.chain_tip_height());
        if is_tip_extension {
            self.chain.push(data);
            self.chain_hashes.push(child_hash);
            self.chain_index.insert(child_hash, child_height);
            self.chain_tip_context = Some(context);
            return Ok(TreeInsertion {
                key: Key {
                    height: child_height,
                    hash: child_hash,
                },
                moved_to_forest: Vec::new(),
            });
        }

        let (parent_link, root_height) = match parent {
            Locator::Chain(height) => (None, height),
            Locator::Fork(hash) => {
                let node = self
                    .forest
                    .get(&hash)
                    .expect("resolve_parent_height verified the fork node exists");
                (Some(hash), node.root_height)
            },
        };
        let takes_over = context.total_work() > self.heaviest_chain_work();
        self.forest.insert(child_hash, ForestNode {
            data,
            context,
            parent: parent_link,
            children: Vec::new(),
            root_height,
        });
        if let Some(parent_hash) = parent_link {
            self.forest
                .get_mut(&parent_hash)
                .expect("parent fork node exists")
                .children
                .push(child_hash);
        }
        self.min_root_height = Some(self.min_root_height.map_or(root_height, |m| m.min(root_height)));

        let moved_to_forest = if takes_over {
            debug!(
                target: LOG_TARGET,
                "Fork node {} at height {} outweighs the chain tip, promoting its branch", child_hash, child_height
            );
            self.promote_branch(child_hash)?
        } else {
            Vec::new()
        };

        Ok(TreeInsertion {
            key: Key {
                height: child_height,
                hash: child_hash,
            },
            moved_to_forest,
        })
    }

    /// Promotes the forest branch ending at `leaf_hash` to be the canonical chain.
    ///
    /// The chain is rewound to the fork point, the displaced tail is demoted into the forest
    /// (with contexts rebuilt through the policy), and the branch is stitched into the chain.
    /// Returns the demoted hashes in ascending height order.
    pub fn promote_branch(&mut self, leaf_hash: BlockHash) -> Result<Vec<BlockHash>, ChainStorageError> {
        // Walk up to the branch root, collecting the promotion path.
        let mut path = Vec::new();
        let mut fork_height = 0;
        let mut cursor = Some(leaf_hash);
        while let Some(hash) = cursor {
            let node = self.forest.get(&hash).ok_or_else(|| ChainStorageError::ValueNotFound {
                entity: "forest node",
                field: "hash",
                value: hash.to_hex(),
            })?;
            path.push(hash);
            fork_height = node.root_height;
            cursor = node.parent;
        }
        path.reverse();

        let old_tip_height = self.chain_tip_height().ok_or_else(|| {
            ChainStorageError::InvalidOperation("cannot promote a branch of an empty tree".to_string())
        })?;
        debug_assert!(fork_height < old_tip_height || self.chain_len() == fork_height + 1);

        // Demote the displaced chain tail, highest entry first, rebuilding each context by
        // rewinding from the tip.
        let mut ctx = self
            .chain_tip_context
            .clone()
            .ok_or_else(|| ChainStorageError::InvalidOperation("tree has no tip context".to_string()))?;
        let mut demoted = Vec::new();
        for height in ((fork_height + 1)..=old_tip_height).rev() {
            let data = self.chain.pop().expect("chain holds every height up to the tip");
            let hash = self.chain_hashes.pop().expect("chain hashes mirror the chain");
            self.chain_index.remove(&hash);
            let node_ctx = ctx.clone();
            if height > fork_height + 1 {
                let parent_data = &self.chain[height as usize - 1];
                let parent_hash = self.chain_hashes[height as usize - 1];
                ctx = self.policy.rewind(&node_ctx, parent_data, parent_hash);
            }
            demoted.push((hash, data, node_ctx));
        }
        demoted.reverse();

        let moved: Vec<BlockHash> = demoted.iter().map(|(hash, _, _)| *hash).collect();
        let mut previous = None;
        for (hash, data, node_ctx) in demoted {
            self.forest.insert(hash, ForestNode {
                data,
                context: node_ctx,
                parent: previous,
                children: Vec::new(),
                root_height: fork_height,
            });
            previous = Some(hash);
        }
        for pair in moved.windows(2) {
            self.forest
                .get_mut(&pair[0])
                .expect("demoted node was just inserted")
                .children
                .push(pair[1]);
        }

        // Forest branches that attached to a demoted chain entry now hang off its forest node.
        let to_reparent: Vec<(BlockHash, u64)> = self
            .forest
            .iter()
            .filter(|(hash, node)| {
                node.parent.is_none() && node.root_height > fork_height && !moved.contains(*hash) && !path.contains(*hash)
            })
            .map(|(hash, node)| (*hash, node.root_height))
            .collect();
        for (root, attach_height) in to_reparent {
            let new_parent = moved[(attach_height - fork_height - 1) as usize];
            self.forest
                .get_mut(&root)
                .expect("reparented root exists")
                .parent = Some(new_parent);
            self.forest
                .get_mut(&new_parent)
                .expect("demoted node exists")
                .children
                .push(root);
            self.set_subtree_root_height(root, fork_height);
        }

        // Stitch the promoted path into the chain and re-root its off-path children.
        let mut tip_ctx = None;
        for (offset, hash) in path.iter().enumerate() {
            let node = self
                .forest
                .remove(hash)
                .expect("promotion path nodes are forest residents");
            let new_chain_height = fork_height + 1 + offset as u64;
            debug_assert_eq!(node.context.height(), new_chain_height);
            self.chain.push(node.data);
            self.chain_hashes.push(*hash);
            self.chain_index.insert(*hash, new_chain_height);
            for child in node.children {
                if !path.contains(&child) {
                    if let Some(child_node) = self.forest.get_mut(&child) {
                        child_node.parent = None;
                    }
                    self.set_subtree_root_height(child, new_chain_height);
                }
            }
            tip_ctx = Some(node.context);
        }
        if let Some(ctx) = tip_ctx {
            self.chain_tip_context = Some(ctx);
        }
        self.recompute_min_root_height();

        info!(
            target: LOG_TARGET,
            "Reorged to branch tip {} at height {} ({} chain entr(ies) demoted)",
            leaf_hash,
            self.chain_tip_height().unwrap_or_default(),
            moved.len()
        );
        Ok(moved)
    }

    fn set_subtree_root_height(&mut self, start: BlockHash, root_height: u64) {
        let mut stack = vec![start];
        while let Some(hash) = stack.pop() {
            if let Some(node) = self.forest.get_mut(&hash) {
                node.root_height = root_height;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    fn recompute_min_root_height(&mut self) {
        self.min_root_height = self
            .forest
            .values()
            .filter(|node| node.parent.is_none())
            .map(|node| node.root_height)
            .min();
    }

    /// Erases every forest branch forking more than `max_keep_depth` below the chain tip.
    pub fn prune_forest(&mut self, max_keep_depth: u64) {
        let tip_height = match self.chain_tip_height() {
            Some(height) => height,
            None => return,
        };
        let cutoff = match tip_height.checked_sub(max_keep_depth) {
            Some(cutoff) => cutoff,
            None => return,
        };
        if self.min_root_height.map_or(true, |min| min >= cutoff) {
            return;
        }
        let stale_roots: Vec<BlockHash> = self
            .forest
            .iter()
            .filter(|(_, node)| node.parent.is_none() && node.root_height < cutoff)
            .map(|(hash, _)| *hash)
            .collect();
        let mut erased = 0;
        for root in stale_roots {
            erased += self.erase_subtree(root);
        }
        self.recompute_min_root_height();
        debug!(
            target: LOG_TARGET,
            "Pruned {} stale forest node(s) below height {}", erased, cutoff
        );
    }

    fn erase_subtree(&mut self, start: BlockHash) -> usize {
        let mut erased = 0;
        let mut stack = vec![start];
        while let Some(hash) = stack.pop() {
            if let Some(node) = self.forest.remove(&hash) {
                erased += 1;
                stack.extend(node.children);
            }
        }
        erased
    }

    /// Walks up from `start` until reaching `height`, returning the data there.
    pub fn get_ancestor_at_height(&self, start: Locator, height: u64) -> Option<&D> {
        match start {
            Locator::Chain(from) => (height <= from).then(|| self.chain.get(height as usize)).flatten(),
            Locator::Fork(hash) => {
                let mut cursor = hash;
                loop {
                    let node = self.forest.get(&cursor)?;
                    let node_height = node.context.height();
                    if node_height == height {
                        return Some(&node.data);
                    }
                    if node_height < height {
                        return None;
                    }
                    match node.parent {
                        Some(parent) => cursor = parent,
                        None => {
                            return (height <= node.root_height)
                                .then(|| self.chain.get(height as usize))
                                .flatten()
                        },
                    }
                }
            },
        }
    }

    /// A forward iterator over ancestors, one step towards genesis per item, starting at (and
    /// including) `start` and ending at genesis.
    pub fn ancestors(&self, start: Locator) -> Ancestors<'_, D, C, P> {
        Ancestors {
            tree: self,
            cursor: Cursor::from_locator(start),
            end_height: None,
        }
    }

    /// Like [`ancestors`](Self::ancestors) but stopping before `end_height`: the walk yields
    /// heights down to `end_height + 1`.
    pub fn ancestors_to_height(&self, start: Locator, end_height: u64) -> Ancestors<'_, D, C, P> {
        Ancestors {
            tree: self,
            cursor: Cursor::from_locator(start),
            end_height: Some(end_height),
        }
    }

    /// Keys of the canonical chain, genesis first.
    pub fn chain_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.chain_hashes.iter().enumerate().map(|(height, hash)| Key {
            height: height as u64,
            hash: *hash,
        })
    }

    /// Every forest node with the locator of its parent, ordered parents-before-children.
    /// Replaying `add` in this order reproduces the forest exactly.
    pub fn forest_topological(&self) -> Vec<(Key, Locator)> {
        let mut ordered = Vec::with_capacity(self.forest.len());
        let mut stack: Vec<BlockHash> = self
            .forest
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(hash, _)| *hash)
            .collect();
        while let Some(hash) = stack.pop() {
            let node = &self.forest[&hash];
            let parent = match node.parent {
                Some(parent_hash) => Locator::Fork(parent_hash),
                None => Locator::Chain(node.root_height),
            };
            ordered.push((
                Key {
                    height: node.context.height(),
                    hash,
                },
                parent,
            ));
            stack.extend(node.children.iter().copied());
        }
        ordered
    }
}

#[derive(Clone, Copy)]
enum Cursor {
    Forest(BlockHash),
    Chain(u64),
    Done,
}

impl Cursor {
    fn from_locator(locator: Locator) -> Self {
        match locator {
            Locator::Chain(height) => Cursor::Chain(height),
            Locator::Fork(hash) => Cursor::Forest(hash),
        }
    }
}

/// Lazy, finite, non-restartable ancestor walk. See [`ChainTree::ancestors`].
pub struct Ancestors<'a, D, C, P> {
    tree: &'a ChainTree<D, C, P>,
    cursor: Cursor,
    end_height: Option<u64>,
}

impl<'a, D, C, P> Iterator for Ancestors<'a, D, C, P>
where
    C: ChainContext,
    P: ContextPolicy<D, C>,
{
    type Item = &'a D;

    fn next(&mut self) -> Option<&'a D> {
        let tree = self.tree;
        match self.cursor {
            Cursor::Done => None,
            Cursor::Forest(hash) => {
                let node = tree.forest.get(&hash)?;
                let height = node.context.height();
                if self.is_past_end(height) {
                    self.cursor = Cursor::Done;
                    return None;
                }
                self.cursor = match node.parent {
                    Some(parent) => Cursor::Forest(parent),
                    None => Cursor::Chain(node.root_height),
                };
                Some(&node.data)
            },
            Cursor::Chain(height) => {
                if self.is_past_end(height) {
                    self.cursor = Cursor::Done;
                    return None;
                }
                let data = tree.chain.get(height as usize)?;
                self.cursor = match height.checked_sub(1) {
                    Some(next) => Cursor::Chain(next),
                    None => Cursor::Done,
                };
                Some(data)
            },
        }
    }
}

impl<D, C, P> Ancestors<'_, D, C, P> {
    fn is_past_end(&self, height: u64) -> bool {
        self.end_height.map_or(false, |end| height <= end)
    }
}

#[cfg(test)]
mod test {
    use primitive_types::U256;

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct TestContext {
        hash: BlockHash,
        height: u64,
        work: AccumulatedWork,
    }

    impl ChainContext for TestContext {
        fn hash(&self) -> BlockHash {
            self.hash
        }

        fn height(&self) -> u64 {
            self.height
        }

        fn total_work(&self) -> AccumulatedWork {
            self.work
        }
    }

    struct TestPolicy;

    impl ContextPolicy<u8, TestContext> for TestPolicy {
        fn extend(&self, parent: &TestContext, _data: &u8, hash: BlockHash) -> TestContext {
            TestContext {
                hash,
                height: parent.height + 1,
                work: parent.work + AccumulatedWork::new(U256::one()),
            }
        }

        fn rewind(&self, child: &TestContext, _parent_data: &u8, parent_hash: BlockHash) -> TestContext {
            TestContext {
                hash: parent_hash,
                height: child.height - 1,
                work: child.work.checked_sub(AccumulatedWork::new(U256::one())).unwrap_or_default(),
            }
        }
    }

    fn hash(tag: u8) -> BlockHash {
        BlockHash::from([tag; 32])
    }

    fn ctx(tag: u8, height: u64, work: u64) -> TestContext {
        TestContext {
            hash: hash(tag),
            height,
            work: AccumulatedWork::new(U256::from(work)),
        }
    }

    fn tree_with_chain(len: u64) -> ChainTree<u8, TestContext, TestPolicy> {
        let mut tree = ChainTree::with_genesis(TestPolicy, 0u8, ctx(0, 0, 1));
        for height in 1..len {
            tree.add(Locator::Chain(height - 1), height as u8, ctx(height as u8, height, height + 1))
                .unwrap();
        }
        tree
    }

    #[test]
    fn tip_extension_is_linear() {
        let tree = tree_with_chain(5);
        assert_eq!(tree.chain_len(), 5);
        assert_eq!(tree.chain_tip_height(), Some(4));
        assert_eq!(tree.forest_len(), 0);
        assert_eq!(tree.chain_tip_context().unwrap().hash, hash(4));
        // chain_len == tip height + 1 after any sequence of adds
        assert_eq!(tree.chain_len(), tree.chain_tip_height().unwrap() + 1);
    }

    #[test]
    fn add_rejects_bad_parents_heights_and_duplicates() {
        let mut tree = tree_with_chain(3);
        let err = tree.add(Locator::Chain(9), 9, ctx(9, 10, 10)).unwrap_err();
        assert!(matches!(err, ChainStorageError::ParentNotFound(_)));

        let err = tree.add(Locator::Fork(hash(77)), 9, ctx(9, 1, 10)).unwrap_err();
        assert!(matches!(err, ChainStorageError::ParentNotFound(_)));

        let err = tree.add(Locator::Chain(2), 9, ctx(9, 5, 10)).unwrap_err();
        assert_eq!(err, ChainStorageError::HeightMismatch {
            parent_height: 2,
            child_height: 5,
        });

        let err = tree.add(Locator::Chain(1), 2, ctx(2, 2, 1)).unwrap_err();
        assert_eq!(err, ChainStorageError::DuplicateHash(hash(2)));
    }

    #[test]
    fn sub_tip_fork_stays_in_the_forest_until_it_outweighs_the_chain() {
        // Chain: G(1) .. 3(4). Fork from height 1 with light work.
        let mut tree = tree_with_chain(4);
        let insertion = tree.add(Locator::Chain(1), 10, ctx(10, 2, 3)).unwrap();
        assert!(insertion.moved_to_forest.is_empty());
        assert_eq!(tree.forest_len(), 1);
        assert_eq!(tree.chain_tip_height(), Some(3));
        assert_eq!(tree.resolve_hash(&hash(10)), Some(Locator::Fork(hash(10))));
    }

    #[test]
    fn heavier_fork_triggers_a_reorg_and_reports_the_demoted_tail() {
        // Chain: G, 1, 2, 3 with works 1..4. Fork of 2', 3', 4' from height 1.
        let mut tree = tree_with_chain(4);
        tree.add(Locator::Chain(1), 20, ctx(20, 2, 3)).unwrap();
        tree.add(Locator::Fork(hash(20)), 21, ctx(21, 3, 4)).unwrap();
        let insertion = tree.add(Locator::Fork(hash(21)), 22, ctx(22, 4, 5)).unwrap();

        // The old tail (heights 2 and 3) moved to the forest, ascending order.
        assert_eq!(insertion.moved_to_forest, vec![hash(2), hash(3)]);
        assert_eq!(tree.chain_tip_height(), Some(4));
        assert_eq!(tree.chain_tip_context().unwrap().hash, hash(22));
        assert_eq!(tree.hash_at_height(2), Some(hash(20)));
        assert_eq!(tree.hash_at_height(3), Some(hash(21)));
        // Demoted entries are reachable as forest nodes.
        assert_eq!(tree.resolve_hash(&hash(2)), Some(Locator::Fork(hash(2))));
        assert_eq!(tree.resolve_hash(&hash(3)), Some(Locator::Fork(hash(3))));
        // The chain tip outweighs every forest context.
        let tip_work = tree.chain_tip_context().unwrap().work;
        for (key, _) in tree.forest_topological() {
            let node_work = tree.context_at(Locator::Fork(key.hash)).unwrap().work;
            assert!(tip_work >= node_work);
        }
    }

    #[test]
    fn reorg_back_to_the_original_branch() {
        let mut tree = tree_with_chain(4);
        tree.add(Locator::Chain(1), 20, ctx(20, 2, 3)).unwrap();
        tree.add(Locator::Fork(hash(20)), 21, ctx(21, 3, 4)).unwrap();
        tree.add(Locator::Fork(hash(21)), 22, ctx(22, 4, 5)).unwrap();
        // Extend the demoted original branch until it wins again.
        tree.add(Locator::Fork(hash(3)), 4, ctx(4, 4, 5)).unwrap();
        let insertion = tree.add(Locator::Fork(hash(4)), 5, ctx(5, 5, 6)).unwrap();
        assert_eq!(insertion.moved_to_forest, vec![hash(20), hash(21), hash(22)]);
        assert_eq!(tree.chain_tip_height(), Some(5));
        assert_eq!(tree.hash_at_height(2), Some(hash(2)));
        assert_eq!(tree.hash_at_height(3), Some(hash(3)));
    }

    #[test]
    fn ancestor_walk_crosses_from_forest_into_chain() {
        let mut tree = tree_with_chain(4);
        tree.add(Locator::Chain(1), 20, ctx(20, 2, 3)).unwrap();
        tree.add(Locator::Fork(hash(20)), 21, ctx(21, 3, 3)).unwrap();

        let walked: Vec<u8> = tree.ancestors(Locator::Fork(hash(21))).copied().collect();
        assert_eq!(walked, vec![21, 20, 1, 0]);

        let walked: Vec<u8> = tree.ancestors_to_height(Locator::Fork(hash(21)), 1).copied().collect();
        assert_eq!(walked, vec![21, 20]);

        assert_eq!(tree.get_ancestor_at_height(Locator::Fork(hash(21)), 1), Some(&1));
        assert_eq!(tree.get_ancestor_at_height(Locator::Fork(hash(21)), 2), Some(&20));
        assert_eq!(tree.get_ancestor_at_height(Locator::Chain(3), 0), Some(&0));
    }

    #[test]
    fn prune_erases_deep_forks_only() {
        let mut tree = tree_with_chain(10);
        // Shallow fork at height 8, deep fork at height 1.
        tree.add(Locator::Chain(8), 30, ctx(30, 9, 1)).unwrap();
        tree.add(Locator::Chain(1), 31, ctx(31, 2, 1)).unwrap();
        assert_eq!(tree.forest_len(), 2);

        tree.prune_forest(5);
        assert_eq!(tree.forest_len(), 1);
        assert!(tree.resolve_hash(&hash(31)).is_none());
        assert_eq!(tree.resolve_hash(&hash(30)), Some(Locator::Fork(hash(30))));
    }

    #[test]
    fn make_locator_verifies_the_height() {
        let mut tree = tree_with_chain(3);
        tree.add(Locator::Chain(1), 20, ctx(20, 2, 1)).unwrap();
        assert_eq!(
            tree.make_locator(Key { height: 1, hash: hash(1) }),
            Some(Locator::Chain(1))
        );
        assert!(tree.make_locator(Key { height: 2, hash: hash(1) }).is_none());
        assert_eq!(
            tree.make_locator(Key { height: 2, hash: hash(20) }),
            Some(Locator::Fork(hash(20)))
        );
        assert!(tree.make_locator(Key { height: 1, hash: hash(99) }).is_none());
    }

    #[test]
    fn context_at_rebuilds_interior_chain_contexts() {
        let tree = tree_with_chain(6);
        let rebuilt = tree.context_at(Locator::Chain(2)).unwrap();
        assert_eq!(rebuilt.height, 2);
        assert_eq!(rebuilt.hash, hash(2));
        // TestPolicy rewind subtracts one unit per step: tip work 6 at height 5 -> 3 at height 2.
        assert_eq!(rebuilt.work, AccumulatedWork::new(U256::from(3u64)));
    }
}
