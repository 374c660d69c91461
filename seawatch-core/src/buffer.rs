//! Per-Source Observation History
//!
//! Each track keeps the last few raw reports from every sensor source in a
//! `CircularBuffer`. The anomaly detector looks up the newest report of
//! another source there; nothing else reads it.
//!
//! Capacity is a const generic, so a vessel that reports every second costs
//! the same memory as one that reports every ten minutes. Once full, each
//! push evicts the oldest report:
//!
//! ```text
//! capacity 4, after pushing r1..r6
//!
//!   slots   [ r5 | r6 | r3 | r4 ]
//!                       ↑ oldest (head = 2)
//!   logical  r3, r4, r5, r6
//! ```
//!
//! ```rust
//! use seawatch_core::buffer::CircularBuffer;
//!
//! let mut history: CircularBuffer<u64, 4> = CircularBuffer::new();
//! for t in [1_000, 2_000, 3_000, 4_000, 5_000] {
//!     history.push(t);
//! }
//!
//! assert_eq!(history.len(), 4);
//! assert_eq!(history.last(), Some(&5_000));
//! assert_eq!(history.iter().next(), Some(&2_000));
//! ```

/// Ring of the newest `N` entries
///
/// `head` is the slot of the oldest entry; the newest sits `len - 1` slots
/// after it, wrapping at `N`.
#[derive(Debug, Clone, PartialEq)]
pub struct CircularBuffer<T, const N: usize> {
    slots: [Option<T>; N],
    head: usize,
    len: usize,
}

impl<T, const N: usize> CircularBuffer<T, N> {
    /// Empty buffer
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
            head: 0,
            len: 0,
        }
    }

    /// Append an entry, evicting the oldest once full
    pub fn push(&mut self, item: T) {
        if N == 0 {
            return;
        }
        if self.len == N {
            self.slots[self.head] = Some(item);
            self.head = (self.head + 1) % N;
        } else {
            self.slots[(self.head + self.len) % N] = Some(item);
            self.len += 1;
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once `N` entries are held
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Fixed capacity `N`
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Entry by age: 0 is the oldest, `len() - 1` the newest
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.slots[(self.head + index) % N].as_ref()
    }

    /// Newest entry
    pub fn last(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter { buffer: self, front: 0, back: self.len }
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

impl<T, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Oldest-first iterator over a `CircularBuffer`
pub struct Iter<'a, T, const N: usize> {
    buffer: &'a CircularBuffer<T, N>,
    front: usize,
    back: usize,
}

impl<'a, T, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.front += 1;
        self.buffer.get(self.front - 1)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<'a, T, const N: usize> DoubleEndedIterator for Iter<'a, T, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        self.buffer.get(self.back)
    }
}

impl<'a, T, const N: usize> ExactSizeIterator for Iter<'a, T, N> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let history: CircularBuffer<u64, 5> = CircularBuffer::new();
        assert!(history.is_empty());
        assert_eq!(history.last(), None);
        assert_eq!(history.iter().count(), 0);
        assert_eq!(history.capacity(), 5);
    }

    #[test]
    fn keeps_newest_entries() {
        let mut history = CircularBuffer::<u32, 3>::new();
        for i in 0..5 {
            history.push(i);
        }

        assert!(history.is_full());
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(history.get(0), Some(&2));
        assert_eq!(history.last(), Some(&4));
        assert_eq!(history.get(3), None);
    }

    #[test]
    fn iterates_both_ways() {
        let mut history = CircularBuffer::<u32, 4>::new();
        for i in 0..6 {
            history.push(i);
        }

        let newest_first: Vec<u32> = history.iter().rev().copied().collect();
        assert_eq!(newest_first, vec![5, 4, 3, 2]);
        assert_eq!(history.iter().len(), 4);
    }

    #[test]
    fn holds_owned_values() {
        let mut history = CircularBuffer::<String, 2>::new();
        for name in ["a", "b", "c"] {
            history.push(name.to_string());
        }
        assert_eq!(history.get(0).map(String::as_str), Some("b"));

        history.clear();
        assert!(history.is_empty());
        history.push("d".to_string());
        assert_eq!(history.last().map(String::as_str), Some("d"));
    }
}
