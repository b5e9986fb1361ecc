// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-size record batching.

/// Accumulates items into batches of `batch_size`.
///
/// Items are numbered from 1 as they arrive. The item whose number is a
/// multiple of the batch size completes the batch it belongs to.
#[derive(Debug)]
pub struct BatchBuffer<T> {
    items: Vec<T>,
    batch_size: usize,
    seen: u64,
}

impl<T> BatchBuffer<T> {
    /// Create a buffer. A zero batch size is treated as 1.
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            items: Vec::with_capacity(batch_size),
            batch_size,
            seen: 0,
        }
    }

    /// Add an item.
    ///
    /// Returns `Some(batch)` when this item completes a batch.
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.items.push(item);
        self.seen += 1;
        if self.seen % self.batch_size as u64 == 0 {
            Some(self.flush())
        } else {
            None
        }
    }

    /// Take the accumulated items.
    pub fn flush(&mut self) -> Vec<T> {
        std::mem::replace(&mut self.items, Vec::with_capacity(self.batch_size))
    }

    /// Items pushed since creation.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_buffer_returns_none_until_full() {
        let mut buf = BatchBuffer::new(3);
        assert!(buf.push(1).is_none());
        assert!(buf.push(2).is_none());
        assert_eq!(buf.len(), 2);

        let batch = buf.push(3).expect("should flush at 3");
        assert_eq!(batch, vec![1, 2, 3]);
        assert!(buf.is_empty());
        assert_eq!(buf.seen(), 3);
    }

    #[test]
    fn test_batch_buffer_tail_flush() {
        let mut buf = BatchBuffer::new(2);
        let batches: Vec<Vec<i32>> = (1..=5).filter_map(|i| buf.push(i)).collect();
        assert_eq!(batches, vec![vec![1, 2], vec![3, 4]]);
        assert_eq!(buf.flush(), vec![5]);
        assert!(buf.flush().is_empty());
    }

    #[test]
    fn test_batch_size_one_flushes_every_item() {
        let mut buf = BatchBuffer::new(0);
        assert_eq!(buf.push("a"), Some(vec!["a"]));
        assert_eq!(buf.push("b"), Some(vec!["b"]));
    }
}
