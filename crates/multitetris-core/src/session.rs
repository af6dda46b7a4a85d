use std::collections::BTreeMap;

use crate::board::Board;
use crate::config::BoardConfig;
use crate::lobby::{Lobby, LobbyId};
use crate::player::{NetworkId, Player};
use crate::replication::{BoardSnapshot, ReplicationError};

/// Mirror of another player's board, driven only by their snapshots.
#[derive(Debug)]
pub struct RemoteBoard {
    pub player: Player,
    pub board: Board,
}

/// A running match: the local board plus one mirror per other member.
///
/// One player reaching game over does not end the match for anyone else.
#[derive(Debug)]
pub struct MatchSession {
    lobby_id: Option<LobbyId>,
    local_id: NetworkId,
    local: Board,
    remotes: BTreeMap<NetworkId, RemoteBoard>,
}

impl MatchSession {
    /// Create boards for every member of `lobby` and spawn the first local brick.
    pub fn start(lobby: &Lobby, local_id: NetworkId, config: &BoardConfig) -> Self {
        let mut local = Board::new(config);
        local.start();

        let mirror_config = BoardConfig {
            seed: Some(0),
            ..config.clone()
        };
        let remotes = lobby
            .members()
            .iter()
            .filter(|p| p.network_id != local_id)
            .map(|p| {
                (
                    p.network_id,
                    RemoteBoard {
                        player: p.clone(),
                        board: Board::new(&mirror_config),
                    },
                )
            })
            .collect();

        tracing::info!(
            lobby_id = lobby.id(),
            players = lobby.len(),
            "Match started"
        );

        Self {
            lobby_id: Some(lobby.id()),
            local_id,
            local,
            remotes,
        }
    }

    /// A local-only match with no peers.
    pub fn single_player(config: &BoardConfig) -> Self {
        let mut local = Board::new(config);
        local.start();
        Self {
            lobby_id: None,
            local_id: 0,
            local,
            remotes: BTreeMap::new(),
        }
    }

    pub fn lobby_id(&self) -> Option<LobbyId> {
        self.lobby_id
    }

    pub fn local_id(&self) -> NetworkId {
        self.local_id
    }

    pub fn local(&self) -> &Board {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut Board {
        &mut self.local
    }

    pub fn remote(&self, network_id: NetworkId) -> Option<&RemoteBoard> {
        self.remotes.get(&network_id)
    }

    pub fn remotes(&self) -> impl Iterator<Item = &RemoteBoard> {
        self.remotes.values()
    }

    /// Snapshot of the local board for broadcasting.
    pub fn local_snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::capture(&self.local, self.local_id)
    }

    /// Overwrite the sender's mirrored board with their snapshot.
    pub fn apply_remote(&mut self, snapshot: &BoardSnapshot) -> Result<(), ReplicationError> {
        if snapshot.player_id == self.local_id {
            return Err(ReplicationError::LocalPlayer);
        }
        let remote = self
            .remotes
            .get_mut(&snapshot.player_id)
            .ok_or(ReplicationError::UnknownPlayer(snapshot.player_id))?;
        snapshot.apply_to(&mut remote.board);
        Ok(())
    }

    /// Refresh mirrored player details after a lobby update.
    pub fn refresh_players(&mut self, lobby: &Lobby) {
        self.remotes
            .retain(|id, _| lobby.is_member(*id));
        for member in lobby.members() {
            if let Some(remote) = self.remotes.get_mut(&member.network_id) {
                remote.player = member.clone();
            }
        }
    }

    /// Scores of every board, local first.
    pub fn standings(&self) -> Vec<(NetworkId, u64)> {
        std::iter::once((self.local_id, self.local.score()))
            .chain(
                self.remotes
                    .iter()
                    .map(|(id, r)| (*id, r.board.score())),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::SnapshotCell;
    use crate::shapes::BrickColor;
    use crate::test_helpers::{make_lobby, seeded_config};

    #[test]
    fn start_creates_mirror_per_peer() {
        let lobby = make_lobby(1, true, &[("A", 1), ("B", 2), ("C", 3)]);
        let session = MatchSession::start(&lobby, 2, &seeded_config(1));
        assert_eq!(session.lobby_id(), Some(1));
        assert!(session.local().current_brick().is_some());
        let mut ids: Vec<_> = session.remotes().map(|r| r.player.network_id).collect();
        ids.sort();
        assert_eq!(ids, vec![1, 3]);
        assert!(session.remote(2).is_none());
    }

    #[test]
    fn apply_remote_updates_only_sender() {
        let lobby = make_lobby(1, true, &[("A", 1), ("B", 2), ("C", 3)]);
        let mut session = MatchSession::start(&lobby, 1, &seeded_config(1));
        let snap = BoardSnapshot {
            player_id: 2,
            active_cells: vec![SnapshotCell {
                x: 0,
                y: 19,
                color: BrickColor::default(),
            }],
            score: 4,
        };
        session.apply_remote(&snap).unwrap();

        let b = &session.remote(2).unwrap().board;
        assert_eq!(b.occupied_count(), 1);
        assert_eq!(b.score(), 4);
        assert_eq!(session.remote(3).unwrap().board.occupied_count(), 0);
    }

    #[test]
    fn apply_remote_rejects_unknown_and_local() {
        let lobby = make_lobby(1, true, &[("A", 1), ("B", 2)]);
        let mut session = MatchSession::start(&lobby, 1, &seeded_config(1));
        let local_before = session.local().snapshot_active_cells();

        let mut snap = BoardSnapshot {
            player_id: 1,
            active_cells: vec![],
            score: 0,
        };
        assert_eq!(
            session.apply_remote(&snap),
            Err(ReplicationError::LocalPlayer)
        );
        assert_eq!(session.local().snapshot_active_cells(), local_before);

        snap.player_id = 99;
        assert_eq!(
            session.apply_remote(&snap),
            Err(ReplicationError::UnknownPlayer(99))
        );
    }

    #[test]
    fn one_game_over_does_not_end_match() {
        let lobby = make_lobby(1, true, &[("A", 1), ("B", 2)]);
        let mut session = MatchSession::start(&lobby, 1, &seeded_config(8));
        while !session.local().is_game_over() {
            session.local_mut().tick();
        }
        assert!(!session.remote(2).unwrap().board.is_game_over());
        assert!(!session.local_snapshot().active_cells.is_empty());
    }

    #[test]
    fn refresh_drops_departed_players() {
        let mut lobby = make_lobby(1, true, &[("A", 1), ("B", 2), ("C", 3)]);
        let mut session = MatchSession::start(&lobby, 1, &seeded_config(1));
        lobby.remove_member(3);
        session.refresh_players(&lobby);
        assert!(session.remote(3).is_none());
        assert!(session.remote(2).is_some());
        assert_eq!(session.standings().len(), 2);
    }

    #[test]
    fn single_player_has_no_peers() {
        let session = MatchSession::single_player(&seeded_config(4));
        assert_eq!(session.lobby_id(), None);
        assert_eq!(session.remotes().count(), 0);
        assert!(session.local().current_brick().is_some());
    }
}
