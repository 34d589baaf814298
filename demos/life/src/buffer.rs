//! A strict two-buffer ping-pong rotation: exactly two generations are kept
//! live at a time, one written while the other is read.

use tessera::{Error, Result};

/// Holds exactly two values of `T` and alternates which one is "current" on
/// each [`DoubleBuffer::swap`].
///
/// Only two-buffer rotation is supported; there is no `get_new`-style
/// generalization to other container sizes.
#[derive(Debug, Clone)]
pub struct DoubleBuffer<T> {
    slots: [T; 2],
    current: usize,
}

impl<T> DoubleBuffer<T> {
    /// Build a double buffer from exactly two initial values.
    pub fn new(a: T, b: T) -> Self {
        Self {
            slots: [a, b],
            current: 0,
        }
    }

    /// Build a double buffer from a two-element container, failing with
    /// [`Error::InvariantViolation`] for any other size.
    pub fn from_vec(mut items: Vec<T>) -> Result<Self> {
        if items.len() != 2 {
            return Err(Error::InvariantViolation(format!(
                "DoubleBuffer requires exactly 2 elements, got {}",
                items.len()
            )));
        }
        let b = items.pop().unwrap();
        let a = items.pop().unwrap();
        Ok(Self::new(a, b))
    }

    /// The generation currently considered "live".
    pub fn current(&self) -> &T {
        &self.slots[self.current]
    }

    /// The other generation, written while `current` is read.
    pub fn next(&self) -> &T {
        &self.slots[1 - self.current]
    }

    /// Mutable access to the generation being written.
    pub fn next_mut(&mut self) -> &mut T {
        &mut self.slots[1 - self.current]
    }

    /// Promote the written generation to current.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_alternates_current_and_next() {
        let mut buf = DoubleBuffer::new(false, true);
        assert_eq!(*buf.current(), false);
        assert_eq!(*buf.next(), true);

        *buf.next_mut() = false;
        buf.swap();
        assert_eq!(*buf.current(), false);
    }

    #[test]
    fn from_vec_rejects_non_pair_input() {
        assert!(DoubleBuffer::from_vec(vec![1]).is_err());
        assert!(DoubleBuffer::from_vec(vec![1, 2, 3]).is_err());
        assert!(DoubleBuffer::from_vec(vec![1, 2]).is_ok());
    }
}
