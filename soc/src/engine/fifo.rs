//! Bounded first-in, first-out queues for operand and result streams.
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Debug, Display, Formatter};

/// A push was rejected because the queue was full.  The rejected item
/// is handed back to the caller.
#[derive(Debug, PartialEq, Eq)]
pub struct FifoFull<T>(pub T);

impl<T> Display for FifoFull<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str("queue is full")
    }
}

impl<T: Debug> Error for FifoFull<T> {}

#[derive(Debug, Clone)]
pub struct BoundedFifo<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedFifo<T> {
    pub fn new(capacity: usize) -> BoundedFifo<T> {
        BoundedFifo {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Number of further items which can be pushed.
    pub fn free(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    pub fn push(&mut self, item: T) -> Result<(), FifoFull<T>> {
        if self.is_full() {
            Err(FifoFull(item))
        } else {
            self.items.push_back(item);
            Ok(())
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Look at the item which will be popped after `n` other pops.
    pub fn peek(&self, n: usize) -> Option<&T> {
        self.items.get(n)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_fifo_empty() {
        let mut q: BoundedFifo<u32> = BoundedFifo::new(2);
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);
        assert_eq!(q.peek(0), None);
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_fifo_rejects_push_when_full() {
        let mut q = BoundedFifo::new(2);
        assert_eq!(q.push(1), Ok(()));
        assert_eq!(q.push(2), Ok(()));
        assert!(q.is_full());
        assert_eq!(q.free(), 0);
        assert_eq!(q.push(3), Err(FifoFull(3)));
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.push(3), Ok(()));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
    }

    #[proptest]
    fn fifo_preserves_order(items: Vec<u32>) {
        let mut q = BoundedFifo::new(items.len());
        for item in items.iter() {
            assert!(q.push(*item).is_ok());
        }
        let popped: Vec<u32> = std::iter::from_fn(|| q.pop()).collect();
        assert_eq!(popped, items);
    }
}
