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

mod helpers;

use corvus_core::{
    chain_storage::{HeaderTimechain, Locator},
    consensus::Network,
};
use helpers::{add_header, extend_chain, mine_child};

#[test]
fn linear_extension_of_a_full_retarget_period() {
    let timechain = HeaderTimechain::new(Network::RegTest);
    extend_chain(&timechain, 2015);

    let access = timechain.read();
    let tree = access.tree();
    assert_eq!(tree.chain_len(), 2016);
    assert_eq!(tree.chain_tip_height(), Some(2015));
    assert_eq!(tree.forest_len(), 0);
    assert_eq!(timechain.metadata().best_height(), 2015);
}

#[test]
fn depth_two_reorg_moves_the_old_tail_into_the_forest() {
    // Chain: G, A, B, C.
    let timechain = HeaderTimechain::new(Network::RegTest);
    let contexts = extend_chain(&timechain, 3);
    let (a, b, c) = (&contexts[0], &contexts[1], &contexts[2]);

    // Competing fork from A: B', C', D'. Same per-block work, so D' wins on length.
    let b2 = mine_child(a.hash(), a.timestamp() + 60);
    let b2_ctx = a.child(b2, b2.hash());
    timechain.add(Locator::Chain(1), b2, b2_ctx.clone()).unwrap();

    let c2 = mine_child(b2_ctx.hash(), b2_ctx.timestamp());
    let c2_ctx = b2_ctx.child(c2, c2.hash());
    timechain.add(Locator::Fork(b2.hash()), c2, c2_ctx.clone()).unwrap();

    let d2 = mine_child(c2_ctx.hash(), c2_ctx.timestamp());
    let d2_ctx = c2_ctx.child(d2, d2.hash());
    let insertion = timechain.add(Locator::Fork(c2.hash()), d2, d2_ctx.clone()).unwrap();

    // The old tail B, C moved into the forest, ascending order.
    assert_eq!(insertion.moved_to_forest, vec![b.hash(), c.hash()]);

    let access = timechain.read();
    let tree = access.tree();
    assert_eq!(tree.chain_tip_height(), Some(4));
    assert_eq!(tree.hash_at_height(1), Some(a.hash()));
    assert_eq!(tree.hash_at_height(2), Some(b2.hash()));
    assert_eq!(tree.hash_at_height(3), Some(c2.hash()));
    assert_eq!(tree.hash_at_height(4), Some(d2.hash()));
    assert_eq!(tree.resolve_hash(&b.hash()), Some(Locator::Fork(b.hash())));
    assert_eq!(tree.resolve_hash(&c.hash()), Some(Locator::Fork(c.hash())));

    // The demoted nodes keep their (height, hash) identity.
    assert_eq!(access.find_stable(2, b.hash()), Some(Locator::Fork(b.hash())));
    assert_eq!(access.find_stable(2, b2.hash()), Some(Locator::Chain(2)));
}

#[test]
fn the_chain_tip_always_carries_the_most_work() {
    let timechain = HeaderTimechain::new(Network::RegTest);
    let contexts = extend_chain(&timechain, 6);

    // A handful of competing forks of different depths.
    for fork_point in [2usize, 4] {
        let mut parent_ctx = contexts[fork_point].clone();
        let mut parent = Locator::Chain(parent_ctx.height());
        for i in 0..2 {
            let header = mine_child(parent_ctx.hash(), parent_ctx.timestamp() + 30 * (i + 1));
            parent_ctx = add_header(&timechain, parent, &parent_ctx, header);
            parent = Locator::Fork(parent_ctx.hash());
        }
    }

    let access = timechain.read();
    let tree = access.tree();
    let tip_work = tree.chain_tip_context().unwrap().total_work();
    for (key, _) in tree.forest_topological() {
        let ctx = tree.context_at(Locator::Fork(key.hash)).unwrap();
        assert!(tip_work >= ctx.total_work(), "forest leaf {} outweighs the tip", key.hash);
    }
    // Chain length always tracks the tip height.
    assert_eq!(tree.chain_len(), tree.chain_tip_height().unwrap() + 1);
}
