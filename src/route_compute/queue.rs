use std::cmp::Ordering;

/// Ordering and position bookkeeping supplied by the owner of the queued
/// elements.
///
/// `compare` returning `Ordering::Less` means `a` is served before `b`.
/// `set_position` is invoked every time an element moves to a new slot, and
/// with `None` once it leaves the queue, so owners can later call
/// [`PriorityQueue::update`] with the element's current index.
pub trait QueueKeys<T> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
    fn set_position(&mut self, item: &T, position: Option<usize>);
}

/// Array-backed binary heap with decrease-key and increase-key support.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    items: Vec<T>,
}

impl<T: Copy> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> PriorityQueue<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    /// Empties the queue, keeping its allocation.
    pub fn clear<K: QueueKeys<T>>(&mut self, keys: &mut K) {
        for item in self.items.drain(..) {
            keys.set_position(&item, None);
        }
    }

    pub fn enqueue<K: QueueKeys<T>>(&mut self, item: T, keys: &mut K) {
        let index = self.items.len();
        self.items.push(item);
        keys.set_position(&item, Some(index));
        self.sift_up(index, keys);
    }

    pub fn dequeue<K: QueueKeys<T>>(&mut self, keys: &mut K) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        let top = self.items.swap_remove(0);
        keys.set_position(&top, None);
        if let Some(first) = self.items.first().copied() {
            keys.set_position(&first, Some(0));
            self.sift_down(0, keys);
        }
        Some(top)
    }

    /// Restores heap order around `index` after its element's key changed in
    /// either direction. Out-of-range indices are ignored.
    pub fn update<K: QueueKeys<T>>(&mut self, index: usize, keys: &mut K) {
        if index >= self.items.len() {
            return;
        }
        let settled = self.sift_up(index, keys);
        if settled == index {
            self.sift_down(index, keys);
        }
    }

    fn sift_up<K: QueueKeys<T>>(&mut self, mut index: usize, keys: &mut K) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if keys.compare(&self.items[index], &self.items[parent]) != Ordering::Less {
                break;
            }
            self.swap(index, parent, keys);
            index = parent;
        }
        index
    }

    fn sift_down<K: QueueKeys<T>>(&mut self, mut index: usize, keys: &mut K) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut best = left;
            if right < len
                && keys.compare(&self.items[right], &self.items[left]) == Ordering::Less
            {
                best = right;
            }
            if keys.compare(&self.items[best], &self.items[index]) != Ordering::Less {
                break;
            }
            self.swap(index, best, keys);
            index = best;
        }
    }

    fn swap<K: QueueKeys<T>>(&mut self, a: usize, b: usize, keys: &mut K) {
        self.items.swap(a, b);
        keys.set_position(&self.items[a], Some(a));
        keys.set_position(&self.items[b], Some(b));
    }
}
