//! The intrusive, append-only task registry.
//!
//! Mirrors the original scheduler's `p_head`/`p_tail` linked list: tasks are appended
//! exactly once and are never removed individually — the whole registry is reset at
//! once by [`Registry::clear`] during scheduler teardown. Appending requires the
//! port lock (taken by the caller, see [`crate::sched::Scheduler::attach_task`]);
//! traversal does not, because the list only ever grows at the tail and a reader
//! that misses a just-attached node will see it on the next pass.

use core::sync::atomic::{AtomicPtr, Ordering};

use crate::task::Task;

/// Singly-linked, append-only registry of tasks rooted at `head`.
pub struct Registry {
    head: AtomicPtr<Task>,
    tail: AtomicPtr<Task>,
}

impl Registry {
    pub const fn new() -> Registry {
        Registry {
            head: AtomicPtr::new(core::ptr::null_mut()),
            tail: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    /// Appends `task` to the registry.
    ///
    /// # Safety / concurrency
    /// The caller must hold the port lock for the duration of this call: it mutates
    /// `head`/`tail`, and (when the registry is non-empty) the outgoing tail's `next`
    /// pointer, none of which are safe to race against a second concurrent attach.
    pub(crate) fn attach(&self, task: &'static Task) {
        let p: *mut Task = task as *const Task as *mut Task;
        task.next.store(core::ptr::null_mut(), Ordering::Release);

        let tail = self.tail.load(Ordering::Acquire);
        if tail.is_null() {
            self.head.store(p, Ordering::Release);
        } else {
            // SAFETY: `tail` was stored by a previous `attach` call and is always a
            // valid `&'static Task` for the registry's lifetime (tasks are never
            // freed individually).
            unsafe { (*tail).next.store(p, Ordering::Release) };
        }
        self.tail.store(p, Ordering::Release);
    }

    /// Resets every registered task to `Uninit` and empties the registry.
    ///
    /// # Safety / concurrency
    /// The caller must hold the port lock: this walks and then clears `head`/`tail`.
    pub(crate) fn clear(&self) {
        let mut cur = self.head.load(Ordering::Acquire);
        while !cur.is_null() {
            // SAFETY: every non-null node in the list is a live `&'static Task`.
            let task = unsafe { &*cur };
            task.reset_uninit();
            cur = task.next.load(Ordering::Acquire);
        }
        self.head.store(core::ptr::null_mut(), Ordering::Release);
        self.tail.store(core::ptr::null_mut(), Ordering::Release);
    }

    /// Read-only traversal of the registry. Does not require the port lock: see the
    /// module documentation for why this is sound.
    pub(crate) fn iter(&self) -> RegistryIter<'_> {
        RegistryIter {
            next: self.head.load(Ordering::Acquire),
            _registry: self,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire).is_null()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

pub(crate) struct RegistryIter<'a> {
    next: *mut Task,
    _registry: &'a Registry,
}

impl<'a> Iterator for RegistryIter<'a> {
    type Item = &'static Task;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.is_null() {
            return None;
        }
        // SAFETY: every non-null link in the registry points at a live `&'static
        // Task`; nodes are never removed or freed, only appended.
        let task: &'static Task = unsafe { &*self.next };
        self.next = task.next.load(Ordering::Acquire);
        Some(task)
    }
}
