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
    sync::Arc,
    thread,
    thread::JoinHandle,
};

use corvus_common_types::{BlockHash, PeerId};
use log::*;

use crate::{
    base_node::comms_interface::{GetHeadersRequest, HeadersMessage, MAX_BLOCK_HEADERS_PER_MSG},
    blocks::BlockHeader,
    chain_storage::{ChainStorageError, HeaderTimechain, Locator},
    common::WaitingQueue,
    validation::{validate_header, HeaderError, HeaderValidationContext, TimechainAncestryView},
};

const LOG_TARGET: &str = "c::bn::header_sync";

/// Invoked when a peer's batch fails validation, with the offending header and the rule error.
/// The peer's remaining queued work has already been discarded when this fires; dropping the
/// connection is the receiver's business.
pub type HeaderSyncErrorCallback = Arc<dyn Fn(PeerId, &BlockHeader, HeaderError) + Send + Sync>;

/// One downloaded header batch awaiting validation.
pub struct HeaderBatch {
    pub peer: PeerId,
    pub headers: Vec<BlockHeader>,
    pub on_error: HeaderSyncErrorCallback,
}

/// The header-sync worker: a single background thread consuming downloaded header batches,
/// validating them in order and extending the timechain.
///
/// A peer that ever submits an invalid header has its entire remaining queue discarded; the
/// error callback then tells the comms collaborator to drop the connection.
pub struct HeaderSynchronizer {
    timechain: Arc<HeaderTimechain>,
    queue: Arc<WaitingQueue<HeaderBatch>>,
    worker: Option<JoinHandle<()>>,
}

impl HeaderSynchronizer {
    pub fn new(timechain: Arc<HeaderTimechain>) -> Self {
        let queue = Arc::new(WaitingQueue::new());
        let worker = {
            let timechain = timechain.clone();
            let queue = queue.clone();
            thread::Builder::new()
                .name("header-sync".to_string())
                .spawn(move || worker_loop(timechain, queue))
                .expect("failed to spawn the header-sync worker thread")
        };
        Self {
            timechain,
            queue,
            worker: Some(worker),
        }
    }

    /// Builds a `getheaders` request anchored at the current heaviest tip, with the standard
    /// exponentially thinning block locator. Returns `None` once the synchronizer has been shut
    /// down.
    pub fn initiate(&self, peer: PeerId) -> Option<GetHeadersRequest> {
        if self.queue.is_stopped() {
            return None;
        }
        let request = GetHeadersRequest::from_locator(self.build_locator());
        debug!(
            target: LOG_TARGET,
            "Initiating header sync with {} ({} locator hash(es))",
            peer,
            request.locator_hashes.len()
        );
        Some(request)
    }

    /// Enqueues a received batch for the worker. When the batch is full, returns a follow-up
    /// request anchored at the last received header so the peer keeps streaming.
    pub fn on_headers(
        &self,
        peer: PeerId,
        message: HeadersMessage,
        on_error: HeaderSyncErrorCallback,
    ) -> Option<GetHeadersRequest> {
        let follow_up_anchor = if message.headers.len() == MAX_BLOCK_HEADERS_PER_MSG {
            message.headers.last().map(BlockHeader::hash)
        } else {
            None
        };
        let accepted = self.queue.push(HeaderBatch {
            peer,
            headers: message.headers,
            on_error,
        });
        if !accepted {
            debug!(target: LOG_TARGET, "Dropping header batch from {}: queue stopped", peer);
            return None;
        }
        follow_up_anchor.map(|anchor| GetHeadersRequest::from_locator(vec![anchor]))
    }

    pub fn pending_batches(&self) -> usize {
        self.queue.len()
    }

    fn build_locator(&self) -> Vec<BlockHash> {
        let access = self.timechain.read();
        let tree = access.tree();
        let tip_height = tree.chain_tip_height().unwrap_or(0);
        let mut hashes = Vec::new();
        let mut step = 1u64;
        let mut height = tip_height;
        loop {
            if let Some(hash) = tree.hash_at_height(height) {
                hashes.push(hash);
            }
            if height == 0 {
                break;
            }
            // Dense for the last ten, then exponentially sparser back to genesis.
            if hashes.len() >= 10 {
                step = step.saturating_mul(2);
            }
            height = height.saturating_sub(step);
        }
        hashes
    }
}

impl Drop for HeaderSynchronizer {
    fn drop(&mut self) {
        self.queue.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_loop(timechain: Arc<HeaderTimechain>, queue: Arc<WaitingQueue<HeaderBatch>>) {
    debug!(target: LOG_TARGET, "Header-sync worker started");
    while let Some(batch) = queue.wait_pop() {
        let peer = batch.peer;
        let count = batch.headers.len();
        match process_batch(&timechain, &batch) {
            Ok(()) => {
                debug!(target: LOG_TARGET, "Processed {} header(s) from {}", count, peer);
            },
            Err((header, err)) => {
                warn!(
                    target: LOG_TARGET,
                    "Header {} from {} failed validation: {}; discarding the peer's queued work",
                    header.hash(),
                    peer,
                    err
                );
                let dropped = queue.erase_if(|item| item.peer == peer);
                if dropped > 0 {
                    debug!(target: LOG_TARGET, "Discarded {} queued batch(es) from {}", dropped, peer);
                }
                (batch.on_error)(peer, &header, err);
            },
        }
    }
    debug!(target: LOG_TARGET, "Header-sync worker stopped");
}

fn process_batch(timechain: &HeaderTimechain, batch: &HeaderBatch) -> Result<(), (BlockHeader, HeaderError)> {
    let first = match batch.headers.first() {
        Some(header) => header,
        None => return Ok(()),
    };
    let mut parent = {
        let access = timechain.read();
        match access.resolve_hash(&first.prev_block) {
            Some(locator) => locator,
            None => return Err((*first, HeaderError::ParentNotFound)),
        }
    };

    for header in &batch.headers {
        let hash = header.hash();
        match step_one_header(timechain, parent, header, hash) {
            Ok(next_parent) => parent = next_parent,
            Err(err) => return Err((*header, err)),
        }
    }
    Ok(())
}

/// Validates one header against its parent and adds it to the timechain. Returns the locator of
/// the added (or already-present) header for use as the next parent.
fn step_one_header(
    timechain: &HeaderTimechain,
    parent: Locator,
    header: &BlockHeader,
    hash: BlockHash,
) -> Result<Locator, HeaderError> {
    let context = {
        let access = timechain.read();
        let tree = access.tree();
        if let Some(existing) = tree.resolve_hash(&hash) {
            // Peers occasionally resend headers we already hold; skip rather than punish.
            debug!(target: LOG_TARGET, "Skipping known header {}", hash);
            return Ok(existing);
        }
        let parent_ctx = tree.context_at(parent).ok_or(HeaderError::ParentNotFound)?;
        let ancestry = TimechainAncestryView::new(tree, parent, parent_ctx.height());
        let ctx = HeaderValidationContext {
            header,
            hash,
            height: parent_ctx.height() + 1,
            parent: &parent_ctx,
            ancestry: &ancestry,
            constants: timechain.constants(),
            current_time: chrono::Utc::now().timestamp() as u32,
        };
        validate_header(&ctx)?;
        parent_ctx.child(*header, hash)
    };

    match timechain.add(parent, *header, context) {
        Ok(insertion) => {
            if !insertion.moved_to_forest.is_empty() {
                info!(
                    target: LOG_TARGET,
                    "Header {} at height {} reorged the chain ({} entr(ies) demoted)",
                    hash,
                    insertion.key.height,
                    insertion.moved_to_forest.len()
                );
            }
        },
        // Lost a race against another producer for the same header; treat as present.
        Err(ChainStorageError::DuplicateHash(_)) => {},
        Err(err) => {
            // The header was validated against this exact parent; a storage rejection here is an
            // internal invariant violation, not the peer's fault.
            debug_assert!(false, "timechain rejected a validated header: {}", err);
            error!(target: LOG_TARGET, "Fatal: timechain rejected a validated header: {}", err);
        },
    }

    let access = timechain.read();
    access.resolve_hash(&hash).ok_or(HeaderError::ParentNotFound)
}
