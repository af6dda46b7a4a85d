pub mod board;
pub mod config;
pub mod controller;
pub mod geometry;
pub mod identity;
pub mod lobby;
pub mod net;
pub mod player;
pub mod replication;
pub mod session;
pub mod shapes;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::board::Board;
    use crate::config::BoardConfig;
    use crate::lobby::{Lobby, LobbyId};
    use crate::player::{NetworkId, Player};
    use crate::replication::SnapshotCell;
    use crate::shapes::BrickColor;

    /// Default 10x20 board config with a fixed seed.
    pub fn seeded_config(seed: u64) -> BoardConfig {
        BoardConfig {
            seed: Some(seed),
            ..BoardConfig::default()
        }
    }

    /// Add scenery cells at `positions`, keeping whatever is already on the
    /// board. Any falling brick becomes scenery.
    pub fn fill_cells(board: &mut Board, positions: &[(i32, i32)]) {
        let mut cells = board.snapshot_active_cells();
        cells.extend(positions.iter().map(|&(x, y)| SnapshotCell {
            x,
            y,
            color: BrickColor::default(),
        }));
        board.apply_snapshot(&cells);
    }

    /// Fill `row` completely except for the columns in `gaps`.
    pub fn fill_row_except(board: &mut Board, row: i32, gaps: &[i32]) {
        let positions: Vec<(i32, i32)> = (0..board.cols())
            .filter(|x| !gaps.contains(x))
            .map(|x| (x, row))
            .collect();
        fill_cells(board, &positions);
    }

    pub fn make_player(name: &str, network_id: NetworkId) -> Player {
        Player::remote(name, network_id)
    }

    /// Build a lobby with members joined in the given order.
    pub fn make_lobby(id: LobbyId, public: bool, members: &[(&str, NetworkId)]) -> Lobby {
        let mut lobby = Lobby::new(id, format!("Lobby {id}"), public);
        for (name, network_id) in members {
            lobby.add_member(make_player(name, *network_id));
        }
        lobby
    }
}
