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
fn registration_replays_one_hundred_existing_headers() {
    let timechain = HeaderTimechain::new(Network::RegTest);
    let contexts = extend_chain(&timechain, 100);

    let handle = timechain.register_sidecar(0u64);
    for ctx in &contexts {
        assert_eq!(
            timechain.sidecar_get(&handle, ctx.height(), ctx.hash()),
            Some(0),
            "missing sidecar node at height {}",
            ctx.height()
        );
    }
    // The genesis node replays too.
    let genesis = {
        let access = timechain.read();
        access.tree().hash_at_height(0).unwrap()
    };
    assert_eq!(timechain.sidecar_get(&handle, 0, genesis), Some(0));
}

#[test]
fn sidecar_values_survive_a_reorg_with_the_structure() {
    let timechain = HeaderTimechain::new(Network::RegTest);
    let handle = timechain.register_sidecar(0u32);
    let contexts = extend_chain(&timechain, 3);
    let (a, b, c) = (&contexts[0], &contexts[1], &contexts[2]);

    // Tag the soon-to-be-demoted entries.
    assert!(timechain.sidecar_set(&handle, b.height(), b.hash(), 22));
    assert!(timechain.sidecar_set(&handle, c.height(), c.hash(), 33));

    // Fork from A and outgrow the chain.
    let mut parent_ctx = a.clone();
    let mut parent = Locator::Chain(a.height());
    let mut fork_contexts = Vec::new();
    for i in 0..3 {
        let header = mine_child(parent_ctx.hash(), parent_ctx.timestamp() + 60 + i);
        parent_ctx = add_header(&timechain, parent, &parent_ctx, header);
        parent = Locator::Fork(parent_ctx.hash());
        fork_contexts.push(parent_ctx.clone());
    }

    // The sidecar mirrored the reorg: the promoted branch is on-chain in both trees.
    {
        let access = timechain.read();
        let tree = access.tree();
        assert_eq!(tree.chain_tip_height(), Some(4));
        assert_eq!(tree.hash_at_height(2), Some(fork_contexts[0].hash()));
    }
    for ctx in &fork_contexts {
        assert_eq!(timechain.sidecar_get(&handle, ctx.height(), ctx.hash()), Some(0));
    }
    // The demoted entries keep their values, now addressed as forest nodes.
    assert_eq!(timechain.sidecar_get(&handle, b.height(), b.hash()), Some(22));
    assert_eq!(timechain.sidecar_get(&handle, c.height(), c.hash()), Some(33));

    // Values on the re-promoted structure stay writable.
    assert!(timechain.sidecar_set(&handle, fork_contexts[2].height(), fork_contexts[2].hash(), 44));
    assert_eq!(
        timechain.sidecar_get(&handle, fork_contexts[2].height(), fork_contexts[2].hash()),
        Some(44)
    );
}

#[test]
fn multiple_sidecars_mirror_independently() {
    let timechain = HeaderTimechain::new(Network::RegTest);
    let counts = timechain.register_sidecar(0u8);
    extend_chain(&timechain, 5);
    let labels = timechain.register_sidecar(String::new());

    let tip = timechain.tip_context();
    assert_eq!(timechain.sidecar_get(&counts, tip.height(), tip.hash()), Some(0));
    assert_eq!(timechain.sidecar_get(&labels, tip.height(), tip.hash()), Some(String::new()));

    assert!(timechain.sidecar_set(&labels, tip.height(), tip.hash(), "tip".to_string()));
    assert_eq!(
        timechain.sidecar_get(&labels, tip.height(), tip.hash()),
        Some("tip".to_string())
    );
    assert_eq!(timechain.sidecar_get(&counts, tip.height(), tip.hash()), Some(0));
}
