//! Execution context handed to running handlers
//!
//! Each lineage owns one [`Context`]. Handlers use it to reshape the
//! lineage's pending queue, swap the record wholesale, and reach the
//! extensions shared by the whole run.

use crate::core::{
    extensions::Extensions,
    handler::{HandlerRef, IntoHandlers},
    outcome::Outcome,
    record::Record,
};
use crate::execution::{
    compose::{Branch, Parallel, Series},
    engine::Lineage,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

pub struct Context {
    queue: Mutex<VecDeque<HandlerRef>>,
    children: Mutex<Vec<Lineage>>,
    rebased: Mutex<Option<Record>>,
    extensions: Extensions,
}

impl Context {
    pub(crate) fn new(queue: impl IntoIterator<Item = HandlerRef>, extensions: Extensions) -> Self {
        Self {
            queue: Mutex::new(queue.into_iter().collect()),
            children: Mutex::new(Vec::new()),
            rebased: Mutex::new(None),
            extensions,
        }
    }

    /// Queue handlers to run right after the current one, in the given order
    pub fn next(&self, handlers: impl IntoHandlers) -> &Self {
        let mut queue = self.queue.lock();
        for handler in handlers.into_handlers().into_iter().rev() {
            queue.push_front(handler);
        }
        self
    }

    /// Queue handlers to run after everything already queued
    pub fn push(&self, handlers: impl IntoHandlers) -> &Self {
        self.queue.lock().extend(handlers.into_handlers());
        self
    }

    /// Replace the lineage's record once the current handler returns.
    ///
    /// Not safe inside [`Parallel`]: sibling handlers rebasing the same
    /// lineage race, and the last one wins.
    pub fn rebase(&self, record: Record) {
        *self.rebased.lock() = Some(record);
    }

    /// Mark a record as a replacement rather than a partial to merge
    pub fn detached(&self, record: Record) -> Outcome {
        Outcome::Replace(record)
    }

    /// Services shared by every lineage of this run
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn series(&self, handlers: impl IntoHandlers) -> Series {
        Series::new(handlers)
    }

    pub fn parallel(&self, handlers: impl IntoHandlers) -> Parallel {
        Parallel::new(handlers)
    }

    pub fn branch(&self, handlers: impl IntoHandlers) -> Branch {
        Branch::new(handlers)
    }

    /// Number of handlers still queued on this lineage
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub(crate) fn dequeue(&self) -> Option<HandlerRef> {
        self.queue.lock().pop_front()
    }

    pub(crate) fn queued(&self) -> Vec<HandlerRef> {
        self.queue.lock().iter().cloned().collect()
    }

    /// Start a child lineage; the newest child is consumed first
    pub(crate) fn spawn(&self, record: Record, queue: Vec<HandlerRef>) {
        let child = Lineage::new(record, queue, self.extensions.clone());
        self.children.lock().insert(0, child);
    }

    /// Start a child lineage running `head` first, then a copy of this
    /// lineage's current queue
    pub(crate) fn fork(&self, record: Record, head: HandlerRef) {
        let mut queue = Vec::with_capacity(self.pending() + 1);
        queue.push(head);
        queue.extend(self.queued());
        self.spawn(record, queue);
    }

    pub(crate) fn take_rebase(&self) -> Option<Record> {
        self.rebased.lock().take()
    }

    pub(crate) fn take_children(&self) -> Vec<Lineage> {
        std::mem::take(&mut *self.children.lock())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("pending", &self.pending())
            .field("children", &self.children.lock().len())
            .field("extensions", &self.extensions)
            .finish()
    }
}
