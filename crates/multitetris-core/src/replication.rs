use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::player::NetworkId;
use crate::shapes::BrickColor;

/// One occupied cell in a board snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotCell {
    pub x: i32,
    pub y: i32,
    pub color: BrickColor,
}

/// Full board state as broadcast by its owner.
///
/// Snapshots carry no sequence number: every snapshot is a complete
/// overwrite, so the latest one to arrive wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub player_id: NetworkId,
    pub active_cells: Vec<SnapshotCell>,
    pub score: u64,
}

impl BoardSnapshot {
    pub fn capture(board: &Board, player_id: NetworkId) -> Self {
        Self {
            player_id,
            active_cells: board.snapshot_active_cells(),
            score: board.score(),
        }
    }

    /// Overwrite a mirrored board with this snapshot, score included.
    pub fn apply_to(&self, board: &mut Board) {
        board.apply_snapshot(&self.active_cells);
        board.set_score(self.score);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    /// No mirrored board exists for this player.
    UnknownPlayer(NetworkId),
    /// The snapshot names the local player, whose board is never overwritten.
    LocalPlayer,
    /// No match is running.
    NoMatch,
}

impl std::fmt::Display for ReplicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownPlayer(id) => write!(f, "no mirrored board for player {id}"),
            Self::LocalPlayer => write!(f, "snapshot targets the local board"),
            Self::NoMatch => write!(f, "no match in progress"),
        }
    }
}

impl std::error::Error for ReplicationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{fill_cells, seeded_config};

    #[test]
    fn capture_then_apply_copies_cells_and_score() {
        let mut source = Board::new(&seeded_config(1));
        fill_cells(&mut source, &[(0, 19), (1, 19), (5, 5)]);
        source.set_score(27);

        let snap = BoardSnapshot::capture(&source, 4);
        assert_eq!(snap.player_id, 4);
        assert_eq!(snap.active_cells.len(), 3);

        let mut mirror = Board::new(&seeded_config(2));
        snap.apply_to(&mut mirror);
        assert_eq!(mirror.snapshot_active_cells(), source.snapshot_active_cells());
        assert_eq!(mirror.score(), 27);
    }

    #[test]
    fn later_snapshot_wins() {
        let mut mirror = Board::new(&seeded_config(3));
        let first = BoardSnapshot {
            player_id: 1,
            active_cells: vec![SnapshotCell {
                x: 0,
                y: 0,
                color: BrickColor::default(),
            }],
            score: 10,
        };
        let second = BoardSnapshot {
            player_id: 1,
            active_cells: vec![],
            score: 4,
        };
        first.apply_to(&mut mirror);
        second.apply_to(&mut mirror);
        assert_eq!(mirror.occupied_count(), 0);
        assert_eq!(mirror.score(), 4);
    }
}
