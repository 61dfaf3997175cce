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
    cmp::Reverse,
    collections::BinaryHeap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Condvar,
        Mutex,
        MutexGuard,
        PoisonError,
    },
    thread,
    thread::JoinHandle,
};

use log::*;

use crate::{
    base_node::{
        comms_interface::UnspentOutputsView,
        sync::block_sync::{BlockSyncError, BlockValidationError},
    },
    blocks::Block,
    chain_storage::HeaderTimechain,
    common::{Timeout, WaitingQueue},
    validation::{validate_block, BlockValidationContext, TimechainAncestryView},
};

const LOG_TARGET: &str = "c::bn::block_sync";

/// Default number of validation worker threads.
pub const DEFAULT_PIPELINE_DEPTH: usize = 8;

/// Invoked once per submitted block, in strictly ascending height order starting at 1.
///
/// The callback runs with the retirement mutex held: it must return promptly and must not
/// acquire timechain locks.
pub type BlockValidatedCallback = Arc<dyn Fn(Arc<Block>, u64, Result<(), BlockValidationError>) + Send + Sync>;

struct BlockJob {
    block: Arc<Block>,
    height: u64,
}

struct CompletedBlock {
    height: u64,
    block: Arc<Block>,
    result: Result<(), BlockValidationError>,
}

impl PartialEq for CompletedBlock {
    fn eq(&self, other: &Self) -> bool {
        self.height == other.height
    }
}

impl Eq for CompletedBlock {}

impl PartialOrd for CompletedBlock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompletedBlock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.height.cmp(&other.height)
    }
}

struct RetireState {
    completed: BinaryHeap<Reverse<CompletedBlock>>,
    next_complete_height: u64,
}

struct PipelineShared {
    queue: WaitingQueue<BlockJob>,
    timechain: Arc<HeaderTimechain>,
    utxo_view: Arc<dyn UnspentOutputsView>,
    retire: Mutex<RetireState>,
    active_count: AtomicUsize,
    idle_lock: Mutex<()>,
    idle_cv: Condvar,
    callback: BlockValidatedCallback,
}

impl PipelineShared {
    fn lock_retire(&self) -> MutexGuard<'_, RetireState> {
        self.retire.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A bounded pool of OS threads validating blocks, possibly out of height order, with strictly
/// in-order result retirement.
///
/// Workers evaluate whatever the queue hands them; finished results park in a min-heap until
/// every lower height has been retired, so the completion callback observes heights 1, 2, 3, …
/// regardless of evaluation order. Stopping the pipeline abandons undelivered results without
/// invoking the callback.
pub struct BlockValidationPipeline {
    shared: Arc<PipelineShared>,
    workers: Vec<JoinHandle<()>>,
}

impl BlockValidationPipeline {
    pub fn new(
        timechain: Arc<HeaderTimechain>,
        utxo_view: Arc<dyn UnspentOutputsView>,
        callback: BlockValidatedCallback,
    ) -> Self {
        Self::with_depth(timechain, utxo_view, callback, DEFAULT_PIPELINE_DEPTH)
    }

    pub fn with_depth(
        timechain: Arc<HeaderTimechain>,
        utxo_view: Arc<dyn UnspentOutputsView>,
        callback: BlockValidatedCallback,
        pipeline_depth: usize,
    ) -> Self {
        let shared = Arc::new(PipelineShared {
            queue: WaitingQueue::new(),
            timechain,
            utxo_view,
            retire: Mutex::new(RetireState {
                completed: BinaryHeap::new(),
                next_complete_height: 1,
            }),
            active_count: AtomicUsize::new(0),
            idle_lock: Mutex::new(()),
            idle_cv: Condvar::new(),
            callback,
        });
        let workers = (0..pipeline_depth.max(1))
            .map(|i| {
                let shared = shared.clone();
                thread::Builder::new()
                    .name(format!("block-validate-{}", i))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn a block-validation worker thread")
            })
            .collect();
        Self { shared, workers }
    }

    /// Schedules `block` for validation. Genesis is never validated through the pipeline.
    pub fn submit(&self, block: Arc<Block>, height: u64) -> Result<(), BlockSyncError> {
        if height == 0 {
            return Err(BlockSyncError::GenesisSubmission);
        }
        self.shared.active_count.fetch_add(1, Ordering::SeqCst);
        if !self.shared.queue.push(BlockJob { block, height }) {
            self.shared.active_count.fetch_sub(1, Ordering::SeqCst);
            return Err(BlockSyncError::PipelineShutDown);
        }
        Ok(())
    }

    pub fn active_count(&self) -> usize {
        self.shared.active_count.load(Ordering::SeqCst)
    }

    /// Blocks until every submitted block has been retired, or the timeout expires. Returns
    /// whether the pipeline drained.
    pub fn wait(&self, timeout: Timeout) -> bool {
        let mut idle = self.shared.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.shared.active_count.load(Ordering::SeqCst) == 0 {
                return true;
            }
            match timeout.remaining() {
                None => {
                    idle = self
                        .shared
                        .idle_cv
                        .wait(idle)
                        .unwrap_or_else(PoisonError::into_inner);
                },
                Some(remaining) if remaining.is_zero() => return false,
                Some(remaining) => {
                    let (guard, _result) = self
                        .shared
                        .idle_cv
                        .wait_timeout(idle, remaining)
                        .unwrap_or_else(PoisonError::into_inner);
                    idle = guard;
                },
            }
        }
    }
}

impl Drop for BlockValidationPipeline {
    fn drop(&mut self) {
        self.shared.queue.stop();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: Arc<PipelineShared>) {
    while let Some(job) = shared.queue.wait_pop() {
        // Cooperative deferral: when this block's funding data is not yet available and there is
        // other work to do, send it to the back of the queue.
        if !shared.utxo_view.spends_ready(&job.block, job.height) && !shared.queue.is_empty() {
            trace!(target: LOG_TARGET, "Deferring block at height {}", job.height);
            shared.queue.push(job);
            continue;
        }

        let result = evaluate(&shared, &job);
        if let Err(err) = &result {
            debug!(
                target: LOG_TARGET,
                "Block at height {} failed validation: {}", job.height, err
            );
        }

        {
            let mut retire = shared.lock_retire();
            retire.completed.push(Reverse(CompletedBlock {
                height: job.height,
                block: job.block,
                result,
            }));
        }
        // Opportunistic retirement: if another worker is already draining, leave it to them.
        if let Ok(retire) = shared.retire.try_lock() {
            retire_ready(&shared, retire);
        }
    }
}

fn retire_ready(shared: &PipelineShared, mut retire: MutexGuard<'_, RetireState>) {
    while retire
        .completed
        .peek()
        .map_or(false, |Reverse(top)| top.height == retire.next_complete_height)
    {
        let Reverse(item) = retire.completed.pop().expect("peek observed an item");
        (shared.callback)(item.block, item.height, item.result);
        retire.next_complete_height += 1;
        if shared.active_count.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Last in-flight block retired; wake anyone in wait().
            let _idle = shared.idle_lock.lock().unwrap_or_else(PoisonError::into_inner);
            shared.idle_cv.notify_all();
        }
    }
}

fn evaluate(shared: &PipelineShared, job: &BlockJob) -> Result<(), BlockValidationError> {
    {
        let access = shared.timechain.read();
        let tree = access.tree();
        let prev_hash = job.block.header.prev_block;
        let parent = tree
            .resolve_hash(&prev_hash)
            .ok_or(BlockValidationError::UnknownParent(prev_hash))?;
        let parent_ctx = tree
            .context_at(parent)
            .ok_or(BlockValidationError::UnknownParent(prev_hash))?;
        if parent_ctx.height() + 1 != job.height {
            return Err(BlockValidationError::HeightMismatch {
                given: job.height,
                parent: parent_ctx.height(),
            });
        }
        let ancestry = TimechainAncestryView::new(tree, parent, parent_ctx.height());
        let ctx = BlockValidationContext {
            block: &job.block,
            height: job.height,
            ancestry: &ancestry,
            constants: shared.timechain.constants(),
        };
        validate_block(&ctx)?;
    }
    // The structural lock is released before the UTXO enumeration; the view owns its own
    // synchronization.
    shared
        .utxo_view
        .for_each_spend(&job.block, &mut |_spend| Ok(()))
        .map_err(BlockValidationError::from)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{base_node::comms_interface::SpendRecord, consensus::Network, validation::BlockError};

    struct NullView;

    impl UnspentOutputsView for NullView {
        fn for_each_spend(
            &self,
            _block: &Block,
            _f: &mut dyn FnMut(&SpendRecord<'_>) -> Result<(), BlockError>,
        ) -> Result<(), BlockError> {
            Ok(())
        }
    }

    #[test]
    fn genesis_submission_is_rejected() {
        let timechain = Arc::new(HeaderTimechain::new(Network::RegTest));
        let pipeline = BlockValidationPipeline::new(timechain.clone(), Arc::new(NullView), Arc::new(|_, _, _| {}));
        let genesis = Arc::new(Block {
            header: crate::blocks::genesis_block::get_genesis_header(Network::RegTest),
            transactions: Vec::new(),
        });
        assert_eq!(pipeline.submit(genesis, 0), Err(BlockSyncError::GenesisSubmission));
    }

    #[test]
    fn an_idle_pipeline_waits_out_immediately() {
        let timechain = Arc::new(HeaderTimechain::new(Network::RegTest));
        let pipeline = BlockValidationPipeline::new(timechain, Arc::new(NullView), Arc::new(|_, _, _| {}));
        assert!(pipeline.wait(Timeout::immediate()));
        assert_eq!(pipeline.active_count(), 0);
    }
}
