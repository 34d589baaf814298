//! The Game of Life tile payload: a double-buffered cell state plus the
//! wire hooks that ship a virtual mirror's state across ranks.

use mpi::request::WaitGuard;
use mpi::traits::*;
use tessera::{PayloadHandle, Result, TilePayload};

use crate::buffer::DoubleBuffer;

/// One cell's alive/dead state, double-buffered across the current and next
/// simulation step.
#[derive(Debug, Clone)]
pub struct LifeCell {
    generations: DoubleBuffer<bool>,
}

impl LifeCell {
    /// A cell starting in the given state, dead in both generations
    /// initially.
    pub fn new(alive: bool) -> Self {
        Self {
            generations: DoubleBuffer::new(alive, false),
        }
    }

    /// Whether this cell is alive in the current generation.
    pub fn is_alive(&self) -> bool {
        *self.generations.current()
    }

    /// Compute this step's next state from the alive count of its eight
    /// (toroidal) neighbors and stage it in the write buffer.
    pub fn stage_next(&mut self, alive_neighbors: usize) {
        let alive = self.is_alive();
        let next = matches!((alive, alive_neighbors), (true, 2) | (true, 3) | (false, 3));
        *self.generations.next_mut() = next;
    }

    /// Promote the staged generation to current.
    pub fn advance(&mut self) {
        self.generations.swap();
    }
}

impl Default for LifeCell {
    fn default() -> Self {
        Self::new(false)
    }
}

impl TilePayload for LifeCell {
    fn send_payload<C: Communicator>(
        &self,
        comm: &C,
        dest_rank: i32,
        tag: i32,
    ) -> Result<Vec<PayloadHandle>> {
        let byte = self.is_alive() as u8;
        mpi::request::scope(|scope| {
            let _ = WaitGuard::from(
                comm.process_at_rank(dest_rank)
                    .immediate_send_with_tag(scope, &byte, tag),
            );
        });
        Ok(vec![PayloadHandle::completed()])
    }

    fn recv_payload<C: Communicator>(
        &mut self,
        comm: &C,
        source_rank: i32,
        tag: i32,
    ) -> Result<Vec<PayloadHandle>> {
        let (byte, _status) = comm
            .process_at_rank(source_rank)
            .receive_with_tag::<u8>(tag);
        *self.generations.next_mut() = byte != 0;
        self.generations.swap();
        Ok(vec![PayloadHandle::completed()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn birth_rule_revives_dead_cell_with_three_neighbors() {
        let mut cell = LifeCell::new(false);
        cell.stage_next(3);
        cell.advance();
        assert!(cell.is_alive());
    }

    #[test]
    fn survival_rule_keeps_live_cell_with_two_or_three_neighbors() {
        let mut cell = LifeCell::new(true);
        cell.stage_next(2);
        cell.advance();
        assert!(cell.is_alive());
    }

    #[test]
    fn overpopulation_and_underpopulation_kill_a_live_cell() {
        let mut under = LifeCell::new(true);
        under.stage_next(1);
        under.advance();
        assert!(!under.is_alive());

        let mut over = LifeCell::new(true);
        over.stage_next(4);
        over.advance();
        assert!(!over.is_alive());
    }
}
