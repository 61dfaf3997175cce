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
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

/// A blocking FIFO work queue with cooperative shutdown.
///
/// `stop` is idempotent: it discards pending items, releases every blocked `wait_pop` with
/// `None`, and makes all further pushes and pops no-ops. Consumers treat `None` from `wait_pop`
/// as the signal to exit.
pub struct WaitingQueue<T> {
    inner: Mutex<State<T>>,
    items_cv: Condvar,
}

struct State<T> {
    items: VecDeque<T>,
    stopped: bool,
}

impl<T> Default for WaitingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WaitingQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(State {
                items: VecDeque::new(),
                stopped: false,
            }),
            items_cv: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item. Returns false (dropping the item) when the queue is stopped.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.lock();
        if state.stopped {
            return false;
        }
        state.items.push_back(item);
        self.items_cv.notify_one();
        true
    }

    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.lock();
        if state.stopped {
            return None;
        }
        state.items.pop_front()
    }

    /// Blocks until an item is available or the queue is stopped.
    pub fn wait_pop(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if state.stopped {
                return None;
            }
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            state = self.items_cv.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Removes every queued item matching the predicate, returning how many were removed.
    pub fn erase_if<F>(&self, mut pred: F) -> usize
    where F: FnMut(&T) -> bool {
        let mut state = self.lock();
        let before = state.items.len();
        state.items.retain(|item| !pred(item));
        before - state.items.len()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Stops the queue, discarding pending items and releasing all waiters.
    pub fn stop(&self) {
        let mut state = self.lock();
        if state.stopped {
            return;
        }
        state.stopped = true;
        state.items.clear();
        self.items_cv.notify_all();
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread, time::Duration};

    use super::*;

    #[test]
    fn push_pop_is_fifo() {
        let queue = WaitingQueue::new();
        assert!(queue.push(1));
        assert!(queue.push(2));
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn wait_pop_blocks_until_an_item_arrives() {
        let queue = Arc::new(WaitingQueue::new());
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.wait_pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.push(42);
        assert_eq!(consumer.join().unwrap(), Some(42));
    }

    #[test]
    fn stop_releases_blocked_waiters_and_is_idempotent() {
        let queue: Arc<WaitingQueue<u32>> = Arc::new(WaitingQueue::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || queue.wait_pop())
            })
            .collect();
        thread::sleep(Duration::from_millis(20));
        queue.stop();
        queue.stop();
        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), None);
        }
        assert!(!queue.push(1));
        assert_eq!(queue.try_pop(), None);
        assert!(queue.is_stopped());
    }

    #[test]
    fn erase_if_removes_matching_items() {
        let queue = WaitingQueue::new();
        for i in 0..10 {
            queue.push(i);
        }
        let removed = queue.erase_if(|i| i % 2 == 0);
        assert_eq!(removed, 5);
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.try_pop(), Some(1));
    }
}
