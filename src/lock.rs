//! Reentrant-read / exclusive-write lock.
//!
//! Readers may nest freely on one thread. A writer excludes every other
//! thread and may take nested reads (and nested writes) itself. A thread that
//! holds only reads may not upgrade: `write_lock()` returns
//! [`Error::Concurrency`] instead of deadlocking.
//!
//! Blocking is unbounded and not fair; there is no timeout.

use std::thread::{self, ThreadId};

use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use tracing::{trace, warn};

use crate::{Error, Result};

/// Lock guarding one graph store.
///
/// A lock built with [`GraphLock::disabled`] accepts every call and holds
/// nothing.
pub struct GraphLock {
    enabled: bool,
    state: Mutex<LockState>,
    released: Condvar,
}

#[derive(Default, Debug)]
struct LockState {
    writer: Option<ThreadId>,
    write_holds: u32,
    readers: HashMap<ThreadId, u32>,
    /// Bumped per thread by `read_unlock_all`; guards from an older epoch
    /// no longer own a hold.
    epochs: HashMap<ThreadId, u64>,
}

impl GraphLock {
    pub fn new() -> Self {
        Self::with_enabled(true)
    }

    /// Pass-through lock for stores that opted out of locking.
    pub fn disabled() -> Self {
        Self::with_enabled(false)
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Acquire a read hold, blocking while another thread writes.
    pub fn read_lock(&self) {
        self.acquire_read();
    }

    /// Take one read hold and return the calling thread's epoch.
    fn acquire_read(&self) -> u64 {
        if !self.enabled {
            return 0;
        }
        let me = thread::current().id();
        let mut state = self.state.lock();
        while matches!(state.writer, Some(w) if w != me) {
            self.released.wait(&mut state);
        }
        *state.readers.entry(me).or_insert(0) += 1;
        state.epochs.get(&me).copied().unwrap_or(0)
    }

    /// Release one read hold of the calling thread.
    pub fn read_unlock(&self) {
        if !self.enabled {
            return;
        }
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.readers.get_mut(&me) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                state.readers.remove(&me);
                self.released.notify_all();
            }
            None => warn!("lock.read_unlock.unbalanced"),
        }
    }

    /// Release every read hold of the calling thread at once.
    ///
    /// Used when an iterator is abandoned mid-traversal. Guards taken before
    /// the call are disowned: dropping them later releases nothing.
    pub fn read_unlock_all(&self) {
        if !self.enabled {
            return;
        }
        let me = thread::current().id();
        let mut state = self.state.lock();
        *state.epochs.entry(me).or_insert(0) += 1;
        if let Some(count) = state.readers.remove(&me) {
            trace!(count, "lock.read_unlock_all");
            self.released.notify_all();
        }
    }

    /// Acquire the exclusive hold.
    ///
    /// Blocks until no other thread holds anything. Fails when the calling
    /// thread holds reads without already being the writer.
    pub fn write_lock(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.writer == Some(me) {
            state.write_holds += 1;
            return Ok(());
        }
        if state.readers.get(&me).copied().unwrap_or(0) > 0 {
            return Err(Error::Concurrency(
                "cannot acquire the write lock while holding a read lock".into(),
            ));
        }
        while state.writer.is_some() || !state.readers.is_empty() {
            self.released.wait(&mut state);
        }
        state.writer = Some(me);
        state.write_holds = 1;
        Ok(())
    }

    pub fn write_unlock(&self) {
        if !self.enabled {
            return;
        }
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.writer != Some(me) {
            warn!("lock.write_unlock.not_owner");
            return;
        }
        state.write_holds -= 1;
        if state.write_holds == 0 {
            state.writer = None;
            self.released.notify_all();
        }
    }

    /// Fails unless the calling thread holds the write lock.
    pub fn check_hold_write_lock(&self) -> Result<()> {
        if self.is_write_locked_by_current_thread() {
            Ok(())
        } else {
            Err(Error::Concurrency("operation requires the write lock".into()))
        }
    }

    pub fn is_write_locked_by_current_thread(&self) -> bool {
        if !self.enabled {
            return true;
        }
        self.state.lock().writer == Some(thread::current().id())
    }

    /// Read holds of the calling thread.
    pub fn read_hold_count(&self) -> u32 {
        if !self.enabled {
            return 0;
        }
        let me = thread::current().id();
        self.state.lock().readers.get(&me).copied().unwrap_or(0)
    }

    /// Number of threads currently holding reads.
    pub fn reader_threads(&self) -> usize {
        self.state.lock().readers.len()
    }

    pub fn read(&self) -> ReadGuard<'_> {
        let epoch = self.acquire_read();
        ReadGuard { lock: self, epoch }
    }

    pub fn write(&self) -> Result<WriteGuard<'_>> {
        self.write_lock()?;
        Ok(WriteGuard { lock: self })
    }
}

impl Default for GraphLock {
    fn default() -> Self {
        Self::new()
    }
}

/// Read hold released on drop.
///
/// A guard disowned by [`GraphLock::read_unlock_all`] releases nothing, so
/// holds taken after that call survive its drop.
pub struct ReadGuard<'a> {
    lock: &'a GraphLock,
    epoch: u64,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        if !self.lock.enabled {
            return;
        }
        let me = thread::current().id();
        let mut state = self.lock.state.lock();
        if state.epochs.get(&me).copied().unwrap_or(0) != self.epoch {
            return;
        }
        if let Some(count) = state.readers.get_mut(&me) {
            if *count > 1 {
                *count -= 1;
            } else {
                state.readers.remove(&me);
                self.lock.released.notify_all();
            }
        }
    }
}

/// Write hold released on drop.
pub struct WriteGuard<'a> {
    lock: &'a GraphLock,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.lock.write_unlock();
    }
}
