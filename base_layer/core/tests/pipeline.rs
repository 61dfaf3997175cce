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

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use corvus_core::{
    base_node::{
        comms_interface::{SpendRecord, UnspentOutputsView},
        sync::BlockValidationPipeline,
    },
    blocks::Block,
    chain_storage::{HeaderTimechain, Locator},
    common::Timeout,
    consensus::Network,
    validation::BlockError,
};
use helpers::build_block;

/// A view with no spends whose enumeration time shrinks as heights grow, so higher blocks
/// finish evaluation first and retirement order is genuinely exercised.
struct InverseDelayView;

impl UnspentOutputsView for InverseDelayView {
    fn for_each_spend(
        &self,
        block: &Block,
        _f: &mut dyn FnMut(&SpendRecord<'_>) -> Result<(), BlockError>,
    ) -> Result<(), BlockError> {
        // Height is recoverable from the coinbase script the test builder wrote.
        let height = u64::from(block.transactions[0].inputs[0].signature_script[1]);
        std::thread::sleep(Duration::from_millis(30 * (6 - height.min(6))));
        Ok(())
    }
}

#[test]
fn out_of_order_evaluation_retires_in_ascending_height_order() {
    let timechain = Arc::new(HeaderTimechain::new(Network::RegTest));

    // Build five blocks on the canonical chain and record their headers first.
    let mut blocks = Vec::new();
    let mut parent_ctx = timechain.tip_context();
    for height in 1..=5u64 {
        let block = build_block(parent_ctx.hash(), parent_ctx.timestamp(), height);
        let header = block.header;
        let context = parent_ctx.child(header, header.hash());
        timechain
            .add(Locator::Chain(parent_ctx.height()), header, context.clone())
            .unwrap();
        parent_ctx = context;
        blocks.push(Arc::new(block));
    }

    let retired: Arc<Mutex<Vec<(u64, bool)>>> = Arc::new(Mutex::new(Vec::new()));
    let pipeline = {
        let retired = retired.clone();
        BlockValidationPipeline::new(
            timechain,
            Arc::new(InverseDelayView),
            Arc::new(move |_block, height, result| {
                retired.lock().unwrap().push((height, result.is_ok()));
            }),
        )
    };

    // Submit shuffled; lower heights evaluate slower than higher ones.
    for height in [5u64, 3, 4, 2, 1] {
        pipeline.submit(blocks[height as usize - 1].clone(), height).unwrap();
    }

    assert!(pipeline.wait(Timeout::after(Duration::from_secs(30))), "pipeline never drained");
    let retired = retired.lock().unwrap();
    let heights: Vec<u64> = retired.iter().map(|(height, _)| *height).collect();
    assert_eq!(heights, vec![1, 2, 3, 4, 5]);
    assert!(retired.iter().all(|(_, ok)| *ok), "all blocks should validate: {:?}", retired);
}

#[test]
fn results_keep_their_heights_under_repeated_waits() {
    let timechain = Arc::new(HeaderTimechain::new(Network::RegTest));
    let mut parent_ctx = timechain.tip_context();
    let mut blocks = Vec::new();
    for height in 1..=3u64 {
        let block = build_block(parent_ctx.hash(), parent_ctx.timestamp(), height);
        let header = block.header;
        let context = parent_ctx.child(header, header.hash());
        timechain
            .add(Locator::Chain(parent_ctx.height()), header, context.clone())
            .unwrap();
        parent_ctx = context;
        blocks.push(Arc::new(block));
    }

    let retired: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
    let pipeline = {
        let retired = retired.clone();
        BlockValidationPipeline::new(
            timechain,
            Arc::new(InverseDelayView),
            Arc::new(move |_block, height, _result| {
                retired.lock().unwrap().push(height);
            }),
        )
    };

    pipeline.submit(blocks[0].clone(), 1).unwrap();
    assert!(pipeline.wait(Timeout::after(Duration::from_secs(30))));
    pipeline.submit(blocks[2].clone(), 3).unwrap();
    pipeline.submit(blocks[1].clone(), 2).unwrap();
    assert!(pipeline.wait(Timeout::after(Duration::from_secs(30))));

    assert_eq!(*retired.lock().unwrap(), vec![1, 2, 3]);
}
