//! Fixed-capacity FIFO ring used between the mixer and the sink writer

use crate::error::{FloraMixError, Result};

/// Bounded circular FIFO over `Copy` elements.
///
/// Writes are all-or-nothing: a write that does not fit fails without
/// consuming anything. Reads drain as much as is available and fill the
/// rest of the destination with the element default, so the consumer
/// always gets a full block.
pub struct CircularBuffer<T: Copy + Default> {
    storage: Vec<T>,
    head: usize,
    size: usize,
}

impl<T: Copy + Default> CircularBuffer<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(FloraMixError::Configuration(
                "Ring capacity must be greater than 0".into(),
            ));
        }
        Ok(Self {
            storage: vec![T::default(); capacity],
            head: 0,
            size: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size == self.capacity()
    }

    pub fn has_space_for(&self, count: usize) -> bool {
        self.size + count <= self.capacity()
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.size = 0;
    }

    /// Appends all of `data`, or fails without writing anything.
    pub fn write_all(&mut self, data: &[T]) -> Result<()> {
        if !self.has_space_for(data.len()) {
            return Err(FloraMixError::RingBuffer(format!(
                "Not enough space: {} free, {} needed",
                self.capacity() - self.size,
                data.len()
            )));
        }
        let capacity = self.capacity();
        let mut tail = (self.head + self.size) % capacity;
        for &element in data {
            self.storage[tail] = element;
            tail = (tail + 1) % capacity;
        }
        self.size += data.len();
        Ok(())
    }

    /// Pops up to `out.len()` elements into `out` and default-fills the
    /// remainder. Returns how many real elements were read.
    pub fn read_into(&mut self, out: &mut [T]) -> usize {
        let count = out.len().min(self.size);
        let capacity = self.capacity();
        for slot in out.iter_mut().take(count) {
            *slot = self.storage[self.head];
            self.head = (self.head + 1) % capacity;
        }
        self.size -= count;
        for slot in out.iter_mut().skip(count) {
            *slot = T::default();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_capacity() {
        assert!(CircularBuffer::<u8>::new(0).is_err());
    }

    #[test]
    fn fifo_order_is_preserved() {
        let mut ring = CircularBuffer::new(4).unwrap();
        ring.write_all(&[1u8, 2, 3]).unwrap();
        let mut out = [0u8; 2];
        assert_eq!(ring.read_into(&mut out), 2);
        assert_eq!(out, [1, 2]);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn oversized_write_fails_without_side_effects() {
        let mut ring = CircularBuffer::new(4).unwrap();
        ring.write_all(&[1u8, 2]).unwrap();
        assert!(ring.write_all(&[3u8, 4, 5]).is_err());
        assert_eq!(ring.len(), 2);
        let mut out = [0u8; 2];
        ring.read_into(&mut out);
        assert_eq!(out, [1, 2]);
    }

    #[test]
    fn wraps_around_the_storage_edge() {
        let mut ring = CircularBuffer::new(4).unwrap();
        ring.write_all(&[1u8, 2, 3]).unwrap();
        let mut out = [0u8; 2];
        ring.read_into(&mut out);
        ring.write_all(&[4u8, 5, 6]).unwrap();
        assert!(ring.is_full());

        let mut drained = [0u8; 4];
        assert_eq!(ring.read_into(&mut drained), 4);
        assert_eq!(drained, [3, 4, 5, 6]);
        assert!(ring.is_empty());
    }

    #[test]
    fn short_read_pads_with_default() {
        let mut ring = CircularBuffer::new(8).unwrap();
        ring.write_all(&[7u8, 8]).unwrap();
        let mut out = [0xffu8; 5];
        assert_eq!(ring.read_into(&mut out), 2);
        assert_eq!(out, [7, 8, 0, 0, 0]);
    }
}
