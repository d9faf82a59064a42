//! Checkout/return pool for reusable request-scoped objects.
//!
//! # Responsibilities
//! - Hand out recycled objects instead of allocating per request
//! - Return each object exactly once, when its guard is dropped
//! - Bound the number of idle objects kept around
//!
//! # Design Decisions
//! - The guard borrows the pool, so an object cannot outlive the call that
//!   checked it out and cannot be touched after it went back
//! - Objects that fail `reset` (e.g. grew too large) are dropped, not parked
//! - Idle objects sit in a lock-free bounded queue; a return that finds the
//!   queue full drops the object

use std::fmt;
use std::ops::{Deref, DerefMut};
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::observability::metrics;

/// Pool of reusable objects.
pub struct ObjectPool<T> {
    idle: ArrayQueue<T>,
    create: fn() -> T,
    reset: Box<dyn Fn(&mut T) -> bool + Send + Sync>,
    outstanding: AtomicUsize,
}

impl<T> ObjectPool<T> {
    /// Create a pool keeping at most `capacity` idle objects (at least one).
    ///
    /// `reset` prepares a returned object for reuse and returns false when
    /// the object should be discarded instead.
    pub fn new<R>(capacity: usize, create: fn() -> T, reset: R) -> Self
    where
        R: Fn(&mut T) -> bool + Send + Sync + 'static,
    {
        Self {
            idle: ArrayQueue::new(capacity.max(1)),
            create,
            reset: Box::new(reset),
            outstanding: AtomicUsize::new(0),
        }
    }

    /// Check out an object, recycling an idle one when available.
    pub fn checkout(&self) -> Pooled<'_, T> {
        let item = self.idle.pop().unwrap_or_else(self.create);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Pooled {
            pool: self,
            item: Some(item),
        }
    }

    fn release(&self, mut item: T) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        if !(self.reset)(&mut item) {
            return;
        }
        // A full queue hands the item back; dropping it frees the memory.
        let _ = self.idle.push(item);
        metrics::record_pool_idle(self.idle.len());
    }

    /// Number of idle objects ready for reuse.
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    /// Number of objects currently checked out.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("capacity", &self.idle.capacity())
            .field("idle", &self.idle())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// Exclusive handle on a checked-out object. Returns it to the pool on drop.
pub struct Pooled<'a, T> {
    pool: &'a ObjectPool<T>,
    item: Option<T>,
}

impl<T> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.item {
            Some(item) => item,
            None => unreachable!("pooled object used after release"),
        }
    }
}

impl<T> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.item {
            Some(item) => item,
            None => unreachable!("pooled object used after release"),
        }
    }
}

impl<T> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}
