use serde::{Deserialize, Serialize};

use crate::player::{NetworkId, Player};

/// Server-assigned lobby identifier.
pub type LobbyId = u64;

/// A named group of players that can start a match together.
///
/// Members are kept in join order. The admin, when set, is always one of the
/// members.
#[derive(Debug, Clone)]
pub struct Lobby {
    id: LobbyId,
    name: String,
    public: bool,
    members: Vec<Player>,
    admin: Option<NetworkId>,
}

/// Wire and API view of a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbySummary {
    pub id: LobbyId,
    pub name: String,
    pub public: bool,
    pub members: Vec<Player>,
    pub admin: Option<NetworkId>,
}

impl Lobby {
    pub fn new(id: LobbyId, name: impl Into<String>, public: bool) -> Self {
        Self {
            id,
            name: name.into(),
            public,
            members: Vec::new(),
            admin: None,
        }
    }

    /// Rebuild a lobby from a summary received over the wire.
    pub fn from_summary(summary: &LobbySummary) -> Self {
        let mut lobby = Self::new(summary.id, summary.name.clone(), summary.public);
        lobby.apply_summary(summary);
        lobby
    }

    pub fn id(&self) -> LobbyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn admin(&self) -> Option<NetworkId> {
        self.admin
    }

    pub fn members(&self) -> &[Player] {
        &self.members
    }

    pub fn member(&self, network_id: NetworkId) -> Option<&Player> {
        self.members.iter().find(|p| p.network_id == network_id)
    }

    pub fn is_member(&self, network_id: NetworkId) -> bool {
        self.member(network_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Add a member unless one with the same network id is already present.
    /// The first member of an admin-less lobby becomes admin.
    pub fn add_member(&mut self, player: Player) -> bool {
        if self.is_member(player.network_id) {
            return false;
        }
        if self.admin.is_none() {
            self.admin = Some(player.network_id);
        }
        self.members.push(player);
        true
    }

    /// Remove a member. If the admin left, the earliest-joined remaining
    /// member takes over; an empty lobby has no admin.
    pub fn remove_member(&mut self, network_id: NetworkId) -> Option<Player> {
        let index = self
            .members
            .iter()
            .position(|p| p.network_id == network_id)?;
        let removed = self.members.remove(index);
        if self.admin == Some(network_id) {
            self.admin = self.members.first().map(|p| p.network_id);
        }
        Some(removed)
    }

    /// Replace a member's details (name, account) in place.
    pub fn update_member(&mut self, player: &Player) -> bool {
        match self
            .members
            .iter_mut()
            .find(|p| p.network_id == player.network_id)
        {
            Some(existing) => {
                *existing = player.clone();
                true
            },
            None => false,
        }
    }

    /// Empty private lobbies are torn down; public ones persist.
    pub fn should_destroy(&self) -> bool {
        !self.public && self.members.is_empty()
    }

    pub fn summary(&self) -> LobbySummary {
        LobbySummary {
            id: self.id,
            name: self.name.clone(),
            public: self.public,
            members: self.members.clone(),
            admin: self.admin,
        }
    }

    /// Reconcile a local mirror with the server's view: members missing
    /// locally are added, members absent from the summary are dropped, and
    /// member details are refreshed. Local flags on kept members survive.
    pub fn apply_summary(&mut self, summary: &LobbySummary) {
        self.name = summary.name.clone();
        self.public = summary.public;

        self.members
            .retain(|p| summary.members.iter().any(|s| s.network_id == p.network_id));
        for incoming in &summary.members {
            match self
                .members
                .iter_mut()
                .find(|p| p.network_id == incoming.network_id)
            {
                Some(existing) => {
                    existing.name = incoming.name.clone();
                    if incoming.account.is_some() {
                        existing.account = incoming.account.clone();
                    }
                },
                None => self.members.push(incoming.clone()),
            }
        }
        // Keep the server's ordering so admin hand-over picks the same player.
        self.members.sort_by_key(|p| {
            summary
                .members
                .iter()
                .position(|s| s.network_id == p.network_id)
        });

        self.admin = summary.admin.filter(|id| self.is_member(*id));
    }
}
