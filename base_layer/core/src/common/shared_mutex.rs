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
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
};

/// A read/write mutex that prefers writers: once a writer is waiting, new readers block until
/// the writer has acquired and released the lock. This keeps a steady stream of readers from
/// starving structural mutations.
///
/// Poisoning is deliberately ignored; a panic while holding the lock is fatal to the process
/// anyway (consensus state may not be half-mutated).
pub struct SharedMutex<T> {
    state: Mutex<LockState>,
    readers_cv: Condvar,
    writers_cv: Condvar,
    value: UnsafeCell<T>,
}

#[derive(Default)]
struct LockState {
    readers: usize,
    writer_active: bool,
    writers_waiting: usize,
}

// Readers hand out &T across threads and writers move T; the usual RwLock bounds apply.
unsafe impl<T: Send> Send for SharedMutex<T> {}
unsafe impl<T: Send + Sync> Sync for SharedMutex<T> {}

impl<T> SharedMutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            readers_cv: Condvar::new(),
            writers_cv: Condvar::new(),
            value: UnsafeCell::new(value),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires shared read access, blocking while a writer is active or waiting.
    pub fn read(&self) -> SharedMutexReadGuard<'_, T> {
        let mut state = self.lock_state();
        while state.writer_active || state.writers_waiting > 0 {
            state = self.readers_cv.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.readers += 1;
        SharedMutexReadGuard { lock: self }
    }

    /// Acquires exclusive write access, blocking until all readers have drained.
    pub fn write(&self) -> SharedMutexWriteGuard<'_, T> {
        let mut state = self.lock_state();
        state.writers_waiting += 1;
        while state.writer_active || state.readers > 0 {
            state = self.writers_cv.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.writers_waiting -= 1;
        state.writer_active = true;
        SharedMutexWriteGuard { lock: self }
    }
}

pub struct SharedMutexReadGuard<'a, T> {
    lock: &'a SharedMutex<T>,
}

impl<T> Deref for SharedMutexReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Readers hold shared access; no writer can be active.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> Drop for SharedMutexReadGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.lock.lock_state();
        state.readers -= 1;
        if state.readers == 0 && state.writers_waiting > 0 {
            self.lock.writers_cv.notify_one();
        }
    }
}

pub struct SharedMutexWriteGuard<'a, T> {
    lock: &'a SharedMutex<T>,
}

impl<T> Deref for SharedMutexWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SharedMutexWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // The writer holds exclusive access.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for SharedMutexWriteGuard<'_, T> {
    fn drop(&mut self) {
        let mut state = self.lock.lock_state();
        state.writer_active = false;
        if state.writers_waiting > 0 {
            self.lock.writers_cv.notify_one();
        } else {
            self.lock.readers_cv.notify_all();
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn readers_share_and_writers_exclude() {
        let lock = Arc::new(SharedMutex::new(0u64));
        let concurrent_readers = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let lock = lock.clone();
            let counter = concurrent_readers.clone();
            handles.push(thread::spawn(move || {
                let guard = lock.read();
                let seen = counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                counter.fetch_sub(1, Ordering::SeqCst);
                (*guard, seen)
            }));
        }
        let saw_overlap = handles.into_iter().any(|h| h.join().unwrap().1 > 0);
        assert!(saw_overlap, "readers never overlapped");

        let writers: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                thread::spawn(move || {
                    let mut guard = lock.write();
                    let old = *guard;
                    thread::sleep(Duration::from_millis(1));
                    *guard = old + 1;
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }
        assert_eq!(*lock.read(), 8);
    }

    #[test]
    fn a_waiting_writer_blocks_new_readers() {
        let lock = Arc::new(SharedMutex::new(0u64));
        let reader = lock.read();

        let writer = {
            let lock = lock.clone();
            thread::spawn(move || {
                *lock.write() = 7;
            })
        };
        // Give the writer time to enqueue.
        thread::sleep(Duration::from_millis(20));

        let late_reader = {
            let lock = lock.clone();
            thread::spawn(move || *lock.read())
        };
        thread::sleep(Duration::from_millis(20));
        drop(reader);

        writer.join().unwrap();
        // The late reader must observe the writer's value: it could not sneak in ahead.
        assert_eq!(late_reader.join().unwrap(), 7);
    }
}
