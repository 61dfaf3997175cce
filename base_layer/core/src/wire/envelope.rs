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

use std::fmt::{self, Display, Formatter};

use crate::{
    consensus::Network,
    proof_of_work::sha256d,
    wire::{ByteReader, ByteWriter, WireError},
};

/// Size of the fixed message header: magic, command, payload length and checksum.
pub const MESSAGE_HEADER_SIZE: usize = 24;
/// The largest payload a peer may send in a single message.
pub const MAX_MESSAGE_PAYLOAD_SIZE: usize = 4_000_000;

/// The protocol version this node speaks.
pub const PROTOCOL_VERSION: i32 = 70015;
/// The lowest protocol version this node will talk to.
pub const MIN_PROTOCOL_VERSION: i32 = 70014;
/// `sendcmpct` is only understood from this version onward.
pub const SENDCMPCT_MIN_PROTOCOL_VERSION: i32 = 70014;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Message magic {actual:#010x} does not match the network magic {expected:#010x}")]
    BadMagic { expected: u32, actual: u32 },
    #[error("Declared payload length {0} exceeds the message size limit")]
    OversizedPayload(u32),
    #[error("Payload checksum mismatch")]
    BadChecksum,
    #[error("Message command is not NUL-padded ASCII")]
    BadCommand,
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// A message command name: up to twelve ASCII characters, NUL-padded on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageCommand([u8; 12]);

impl MessageCommand {
    pub fn new(name: &str) -> Self {
        debug_assert!(name.len() <= 12 && name.is_ascii(), "invalid command name: {}", name);
        let mut bytes = [0u8; 12];
        let len = name.len().min(12);
        bytes[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self(bytes)
    }

    pub fn from_wire(bytes: [u8; 12]) -> Result<Self, EnvelopeError> {
        let name_len = bytes.iter().position(|&b| b == 0).unwrap_or(12);
        // Padding must be all-NUL and the name printable ASCII.
        if bytes[name_len..].iter().any(|&b| b != 0) || !bytes[..name_len].iter().all(u8::is_ascii_graphic) {
            return Err(EnvelopeError::BadCommand);
        }
        Ok(Self(bytes))
    }

    pub fn as_str(&self) -> &str {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(12);
        std::str::from_utf8(&self.0[..len]).unwrap_or("")
    }

    pub const fn as_wire_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

impl Display for MessageCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for MessageCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "MessageCommand({})", self.as_str())
    }
}

/// The fixed 24-byte header framing every peer-to-peer message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    pub magic: u32,
    pub command: MessageCommand,
    pub payload_length: u32,
    pub checksum: [u8; 4],
}

impl MessageHeader {
    /// Builds the header framing `payload` for transmission on `network`.
    pub fn for_payload(network: Network, command: &str, payload: &[u8]) -> Self {
        Self {
            magic: network.wire_magic(),
            command: MessageCommand::new(command),
            payload_length: payload.len() as u32,
            checksum: payload_checksum(payload),
        }
    }

    pub fn consensus_encode(&self, w: &mut ByteWriter) {
        w.write_u32(self.magic);
        w.write_bytes(self.command.as_wire_bytes());
        w.write_u32(self.payload_length);
        w.write_bytes(&self.checksum);
    }

    pub fn consensus_decode(r: &mut ByteReader<'_>) -> Result<Self, EnvelopeError> {
        let magic = r.read_u32()?;
        let mut command_bytes = [0u8; 12];
        command_bytes.copy_from_slice(r.read_bytes(12)?);
        let command = MessageCommand::from_wire(command_bytes)?;
        let payload_length = r.read_u32()?;
        let mut checksum = [0u8; 4];
        checksum.copy_from_slice(r.read_bytes(4)?);
        Ok(Self {
            magic,
            command,
            payload_length,
            checksum,
        })
    }

    /// Validates the header against the expected network and the received payload bytes.
    pub fn verify(&self, network: Network, payload: &[u8]) -> Result<(), EnvelopeError> {
        if self.magic != network.wire_magic() {
            return Err(EnvelopeError::BadMagic {
                expected: network.wire_magic(),
                actual: self.magic,
            });
        }
        if self.payload_length as usize > MAX_MESSAGE_PAYLOAD_SIZE {
            return Err(EnvelopeError::OversizedPayload(self.payload_length));
        }
        if self.payload_length as usize != payload.len() || self.checksum != payload_checksum(payload) {
            return Err(EnvelopeError::BadChecksum);
        }
        Ok(())
    }
}

/// First four bytes of the double SHA-256 of the payload.
pub fn payload_checksum(payload: &[u8]) -> [u8; 4] {
    let hash = sha256d(payload);
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&hash.as_bytes()[..4]);
    checksum
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_round_trips() {
        let payload = b"ping pong";
        let header = MessageHeader::for_payload(Network::MainNet, "headers", payload);
        let mut w = ByteWriter::new();
        header.consensus_encode(&mut w);
        assert_eq!(w.len(), MESSAGE_HEADER_SIZE);

        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        let decoded = MessageHeader::consensus_decode(&mut r).unwrap();
        assert_eq!(decoded, header);
        decoded.verify(Network::MainNet, payload).unwrap();
    }

    #[test]
    fn wrong_network_magic_is_rejected() {
        let header = MessageHeader::for_payload(Network::TestNet, "ping", b"");
        match header.verify(Network::MainNet, b"") {
            Err(EnvelopeError::BadMagic { expected, actual }) => {
                assert_eq!(expected, 0xD9B4_BEF9);
                assert_eq!(actual, 0x0709_110B);
            },
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn corrupted_payload_fails_the_checksum() {
        let header = MessageHeader::for_payload(Network::MainNet, "block", b"payload");
        assert_eq!(header.verify(Network::MainNet, b"payloae"), Err(EnvelopeError::BadChecksum));
    }

    #[test]
    fn non_nul_padding_is_rejected() {
        let mut bytes = *MessageCommand::new("verack").as_wire_bytes();
        bytes[11] = b'x';
        assert_eq!(MessageCommand::from_wire(bytes), Err(EnvelopeError::BadCommand));
    }
}
