//! Sliding dedup window over recently seen event ids.
//!
//! Interleaved filter responses can re-deliver events that an earlier page
//! already carried, and the upstream sometimes hands back the same
//! continuation token for different data. The window remembers the last
//! `capacity` ids so a whole re-delivered page is suppressed while memory
//! stays bounded regardless of how long a session runs.

use std::collections::{HashSet, VecDeque};

use crate::query::MAX_EVENTS_PER_CALL;

#[derive(Debug, Clone)]
pub struct SeenWindow {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl SeenWindow {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity.min(MAX_EVENTS_PER_CALL)),
            members: HashSet::with_capacity(capacity.min(MAX_EVENTS_PER_CALL)),
            capacity,
        }
    }

    /// Window sized to one full upstream page.
    pub fn for_page_size() -> Self {
        Self::new(MAX_EVENTS_PER_CALL)
    }

    pub fn seen(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    /// Insert `id`, evicting the oldest entry when full. Re-recording an id
    /// already in the window is a no-op.
    pub fn record(&mut self, id: &str) {
        if self.members.contains(id) {
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.members.insert(id.to_string());
    }

    /// Record `id` and report whether it was new.
    pub fn check_and_record(&mut self, id: &str) -> bool {
        if self.seen(id) {
            return false;
        }
        self.record(id);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ids currently held, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl Default for SeenWindow {
    fn default() -> Self {
        Self::for_page_size()
    }
}
