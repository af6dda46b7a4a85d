use std::collections::BTreeMap;

use multitetris_core::lobby::{Lobby, LobbyId, LobbySummary};
use multitetris_core::player::{NetworkId, Player};

/// Result of a player leaving a lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The lobby still exists; this is its new state.
    Updated(LobbySummary),
    /// The lobby emptied and was torn down.
    Destroyed(LobbyId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    UnknownLobby(LobbyId),
    NotMember {
        lobby_id: LobbyId,
        network_id: NetworkId,
    },
    LobbyFull(LobbyId),
    TooManyLobbies(usize),
}

impl std::fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLobby(id) => write!(f, "lobby {id} does not exist"),
            Self::NotMember {
                lobby_id,
                network_id,
            } => write!(f, "player {network_id} is not in lobby {lobby_id}"),
            Self::LobbyFull(id) => write!(f, "lobby {id} is full"),
            Self::TooManyLobbies(max) => write!(f, "lobby limit of {max} reached"),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Authoritative set of lobbies. Owned by the hub task; never shared.
#[derive(Debug)]
pub struct LobbyDirectory {
    lobbies: BTreeMap<LobbyId, Lobby>,
    next_id: LobbyId,
    max_members: usize,
    max_lobbies: usize,
}

impl LobbyDirectory {
    pub fn new(max_members: usize, max_lobbies: usize) -> Self {
        Self {
            lobbies: BTreeMap::new(),
            next_id: 1,
            max_members,
            max_lobbies,
        }
    }

    /// Seed the persistent public lobbies, named "Public lobby 1..n".
    /// Stops early at the lobby limit.
    pub fn create_public_lobbies(&mut self, count: usize) -> Vec<LobbyId> {
        (1..=count)
            .map_while(|i| self.create_lobby(format!("Public lobby {i}"), true).ok())
            .collect()
    }

    /// The directory never holds more than `max_lobbies` lobbies, which keeps
    /// the full `lobby_list` reply within one frame.
    pub fn create_lobby(
        &mut self,
        name: impl Into<String>,
        public: bool,
    ) -> Result<LobbyId, DirectoryError> {
        if self.lobbies.len() >= self.max_lobbies {
            return Err(DirectoryError::TooManyLobbies(self.max_lobbies));
        }
        let id = self.next_id;
        self.next_id += 1;
        let lobby = Lobby::new(id, name, public);
        tracing::debug!(lobby_id = id, name = lobby.name(), public, "Lobby created");
        self.lobbies.insert(id, lobby);
        Ok(id)
    }

    pub fn get(&self, lobby_id: LobbyId) -> Option<&Lobby> {
        self.lobbies.get(&lobby_id)
    }

    /// Add `player` to a lobby. Joining a lobby twice is a no-op.
    pub fn join(&mut self, player: Player, lobby_id: LobbyId) -> Result<LobbySummary, DirectoryError> {
        let lobby = self
            .lobbies
            .get_mut(&lobby_id)
            .ok_or(DirectoryError::UnknownLobby(lobby_id))?;
        if !lobby.is_member(player.network_id) && lobby.len() >= self.max_members {
            return Err(DirectoryError::LobbyFull(lobby_id));
        }
        let network_id = player.network_id;
        if lobby.add_member(player) {
            tracing::info!(
                lobby_id,
                player_id = network_id,
                admin = ?lobby.admin(),
                "Player joined lobby"
            );
        }
        Ok(lobby.summary())
    }

    /// Remove a member. Admin passes to the earliest remaining member; an
    /// emptied private lobby is destroyed.
    pub fn leave(
        &mut self,
        network_id: NetworkId,
        lobby_id: LobbyId,
    ) -> Result<LeaveOutcome, DirectoryError> {
        let lobby = self
            .lobbies
            .get_mut(&lobby_id)
            .ok_or(DirectoryError::UnknownLobby(lobby_id))?;
        if lobby.remove_member(network_id).is_none() {
            return Err(DirectoryError::NotMember {
                lobby_id,
                network_id,
            });
        }
        tracing::info!(lobby_id, player_id = network_id, admin = ?lobby.admin(), "Player left lobby");

        if lobby.should_destroy() {
            self.lobbies.remove(&lobby_id);
            tracing::info!(lobby_id, "Lobby destroyed");
            return Ok(LeaveOutcome::Destroyed(lobby_id));
        }
        Ok(LeaveOutcome::Updated(lobby.summary()))
    }

    /// Validate a match start request and return the lobby to notify.
    pub fn start_match(
        &self,
        lobby_id: LobbyId,
        requester: NetworkId,
    ) -> Result<LobbySummary, DirectoryError> {
        let lobby = self
            .lobbies
            .get(&lobby_id)
            .ok_or(DirectoryError::UnknownLobby(lobby_id))?;
        if !lobby.is_member(requester) {
            return Err(DirectoryError::NotMember {
                lobby_id,
                network_id: requester,
            });
        }
        Ok(lobby.summary())
    }

    /// Remove a player from every lobby they belong to.
    pub fn disconnect(&mut self, network_id: NetworkId) -> Vec<LeaveOutcome> {
        self.leave_where(network_id, |_| true)
    }

    /// Remove a player from every lobby except `keep`.
    pub fn leave_others(&mut self, network_id: NetworkId, keep: LobbyId) -> Vec<LeaveOutcome> {
        self.leave_where(network_id, |id| id != keep)
    }

    fn leave_where(
        &mut self,
        network_id: NetworkId,
        pred: impl Fn(LobbyId) -> bool,
    ) -> Vec<LeaveOutcome> {
        let joined: Vec<LobbyId> = self
            .lobbies
            .values()
            .filter(|l| pred(l.id()) && l.is_member(network_id))
            .map(Lobby::id)
            .collect();
        joined
            .into_iter()
            .filter_map(|lobby_id| self.leave(network_id, lobby_id).ok())
            .collect()
    }

    /// Refresh a player's details in every lobby they belong to.
    pub fn update_player(&mut self, player: &Player) -> Vec<LobbySummary> {
        self.lobbies
            .values_mut()
            .filter_map(|lobby| lobby.update_member(player).then(|| lobby.summary()))
            .collect()
    }

    pub fn summaries(&self) -> Vec<LobbySummary> {
        self.lobbies.values().map(Lobby::summary).collect()
    }

    /// (lobby count, total lobby memberships)
    pub fn stats(&self) -> (usize, usize) {
        let members = self.lobbies.values().map(Lobby::len).sum();
        (self.lobbies.len(), members)
    }
}
