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

//! Interfaces consumed from (and offered to) the external comms collaborators: the message sum
//! type, the dispatch trait, peer handles, and the unspent-output view.

mod utxo_view;

use std::sync::Arc;

use corvus_common_types::{BlockHash, PeerId};

use crate::{
    blocks::{Block, BlockHeader},
    wire::envelope::PROTOCOL_VERSION,
};
pub use utxo_view::{FundingFlags, SpendRecord, UnspentOutputsView};

/// The maximum number of headers carried by a single `headers` message. A full batch signals
/// that the peer has more to give.
pub const MAX_BLOCK_HEADERS_PER_MSG: usize = 2000;

/// A `getheaders` request: block-locator hashes from newest to oldest, and a stop hash (zero
/// means "as many as allowed").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetHeadersRequest {
    pub version: i32,
    pub locator_hashes: Vec<BlockHash>,
    pub stop_hash: BlockHash,
}

impl GetHeadersRequest {
    pub fn from_locator(locator_hashes: Vec<BlockHash>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            locator_hashes,
            stop_hash: BlockHash::zero(),
        }
    }
}

/// A `headers` message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadersMessage {
    pub headers: Vec<BlockHeader>,
}

/// The messages the core exchanges with the dispatch collaborator, as a tagged sum. Parsing the
/// wire payloads into these variants is the collaborator's concern.
#[derive(Clone, Debug)]
pub enum NodeMessage {
    GetHeaders(GetHeadersRequest),
    Headers(HeadersMessage),
    Block(Box<Block>),
}

impl NodeMessage {
    pub fn command(&self) -> &'static str {
        match self {
            NodeMessage::GetHeaders(_) => "getheaders",
            NodeMessage::Headers(_) => "headers",
            NodeMessage::Block(_) => "block",
        }
    }
}

/// Outbound message delivery, implemented by the peer-socket collaborator.
pub trait Broadcaster: Send + Sync {
    fn send_to_one(&self, peer: PeerId, message: NodeMessage);
    fn send_to_all(&self, message: NodeMessage);
}

/// A live peer as the core sees it. Identity is the id; connection state is an observable.
pub trait PeerHandle: Send + Sync {
    fn id(&self) -> PeerId;
    fn is_handshake_complete(&self) -> bool;
    fn protocol_version(&self) -> i32;
}

pub type SharedPeer = Arc<dyn PeerHandle>;

/// The peer table, implemented by the connection-manager collaborator. Lookups by id only;
/// `drop_connection` is the sync layer's lever against misbehaving peers.
pub trait PeerRegistry: Send + Sync {
    fn get(&self, peer: PeerId) -> Option<SharedPeer>;
    fn drop_connection(&self, peer: PeerId);
}

/// Per-message dispatch with forwarding defaults: implementors override the variants they care
/// about, everything else lands in [`on_default`](Self::on_default).
pub trait NodeEventHandler {
    fn on_peer_connect(&mut self, _peer: PeerId) {}

    fn on_handshake_complete(&mut self, _peer: PeerId) {}

    /// Called once per iteration of the collaborator's poll loop.
    fn on_loop(&mut self) {}

    fn on_message(&mut self, peer: PeerId, message: &NodeMessage) {
        match message {
            NodeMessage::GetHeaders(request) => self.on_get_headers(peer, request),
            NodeMessage::Headers(headers) => self.on_headers(peer, headers),
            NodeMessage::Block(block) => self.on_block(peer, block),
        }
    }

    fn on_get_headers(&mut self, peer: PeerId, _request: &GetHeadersRequest) {
        self.on_default(peer)
    }

    fn on_headers(&mut self, peer: PeerId, _headers: &HeadersMessage) {
        self.on_default(peer)
    }

    fn on_block(&mut self, peer: PeerId, _block: &Block) {
        self.on_default(peer)
    }

    fn on_default(&mut self, _peer: PeerId) {}
}

#[cfg(test)]
mod test {
    use super::*;

    struct Recorder {
        seen: Vec<&'static str>,
    }

    impl NodeEventHandler for Recorder {
        fn on_headers(&mut self, _peer: PeerId, _headers: &HeadersMessage) {
            self.seen.push("headers");
        }

        fn on_default(&mut self, _peer: PeerId) {
            self.seen.push("default");
        }
    }

    #[test]
    fn unhandled_messages_forward_to_the_default() {
        let mut handler = Recorder { seen: Vec::new() };
        let peer = PeerId::new(1);
        handler.on_message(peer, &NodeMessage::Headers(HeadersMessage { headers: Vec::new() }));
        handler.on_message(peer, &NodeMessage::GetHeaders(GetHeadersRequest::from_locator(Vec::new())));
        assert_eq!(handler.seen, vec!["headers", "default"]);
    }
}
