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

use std::time::{Duration, Instant};

/// A wall-clock deadline.
///
/// `Infinite` and `Immediate` are first-class values so that "wait forever" and "poll once"
/// flow through the same APIs as ordinary timeouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeout {
    deadline: Option<Instant>,
}

impl Timeout {
    pub fn after(duration: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + duration),
        }
    }

    pub const fn infinite() -> Self {
        Self { deadline: None }
    }

    pub fn immediate() -> Self {
        Self {
            deadline: Some(Instant::now()),
        }
    }

    pub const fn is_infinite(&self) -> bool {
        self.deadline.is_none()
    }

    pub fn is_expired(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Time left until the deadline; `None` for an infinite timeout.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn remaining_ms(&self) -> Option<u128> {
        self.remaining().map(|d| d.as_millis())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn immediate_is_already_expired() {
        assert!(Timeout::immediate().is_expired());
        assert_eq!(Timeout::immediate().remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn infinite_never_expires() {
        let t = Timeout::infinite();
        assert!(!t.is_expired());
        assert!(t.remaining().is_none());
        assert!(t.is_infinite());
    }

    #[test]
    fn finite_deadline_counts_down() {
        let t = Timeout::after(Duration::from_secs(60));
        assert!(!t.is_expired());
        let remaining = t.remaining().unwrap();
        assert!(remaining <= Duration::from_secs(60) && remaining > Duration::from_secs(59));
    }
}
