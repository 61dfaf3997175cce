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
    ops::{Deref, DerefMut},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// A container whose readers take cheap atomic snapshots and whose single writer publishes
/// complete replacement values.
///
/// `snapshot` never blocks on a writer preparing an update: the published `Arc` is swapped in
/// one step when the edit guard drops, so readers see either the old or the new value, never a
/// partial edit.
pub struct SingleWriter<T> {
    current: Mutex<Arc<T>>,
    writer: Mutex<()>,
}

impl<T: Clone> SingleWriter<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: Mutex::new(Arc::new(value)),
            writer: Mutex::new(()),
        }
    }

    /// Returns the currently published value.
    pub fn snapshot(&self) -> Arc<T> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Starts an edit on a copy of the current value. The copy is published atomically when the
    /// guard is dropped. Concurrent `edit` calls serialize.
    pub fn edit(&self) -> SingleWriterGuard<'_, T> {
        let permit = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let value = T::clone(&self.snapshot());
        SingleWriterGuard {
            owner: self,
            value: Some(value),
            _permit: permit,
        }
    }

    fn publish(&self, value: T) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(value);
    }
}

pub struct SingleWriterGuard<'a, T: Clone> {
    owner: &'a SingleWriter<T>,
    value: Option<T>,
    _permit: MutexGuard<'a, ()>,
}

impl<T: Clone> Deref for SingleWriterGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value.as_ref().expect("value is present until drop")
    }
}

impl<T: Clone> DerefMut for SingleWriterGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("value is present until drop")
    }
}

impl<T: Clone> Drop for SingleWriterGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.owner.publish(value);
        }
    }
}
