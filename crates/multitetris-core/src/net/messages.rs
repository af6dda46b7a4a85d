use serde::{Deserialize, Serialize};

use crate::lobby::{LobbyId, LobbySummary};
use crate::player::NetworkId;
use crate::replication::{BoardSnapshot, SnapshotCell};

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    LobbyListRequest = 0x01,
    PlayerJoinsLobby = 0x02,
    PlayerLeavesLobby = 0x03,
    PlayerStartedMatch = 0x04,
    SendDataToOtherPlayers = 0x05,
    PlayerAccountLink = 0x06,
    CreateLobby = 0x07,
    PlayerSetName = 0x08,

    // Server -> Client
    PlayerInit = 0x10,
    LobbyList = 0x11,
    JoinLobby = 0x12,
    UpdateLobbies = 0x13,
    MatchStarted = 0x14,
    ReceiveDataFromOtherPlayers = 0x15,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::LobbyListRequest),
            0x02 => Some(Self::PlayerJoinsLobby),
            0x03 => Some(Self::PlayerLeavesLobby),
            0x04 => Some(Self::PlayerStartedMatch),
            0x05 => Some(Self::SendDataToOtherPlayers),
            0x06 => Some(Self::PlayerAccountLink),
            0x07 => Some(Self::CreateLobby),
            0x08 => Some(Self::PlayerSetName),
            0x10 => Some(Self::PlayerInit),
            0x11 => Some(Self::LobbyList),
            0x12 => Some(Self::JoinLobby),
            0x13 => Some(Self::UpdateLobbies),
            0x14 => Some(Self::MatchStarted),
            0x15 => Some(Self::ReceiveDataFromOtherPlayers),
            _ => None,
        }
    }

    /// Stable action name used in logs and the HTTP API.
    pub fn action(self) -> &'static str {
        match self {
            Self::LobbyListRequest | Self::LobbyList => "lobby_list",
            Self::PlayerJoinsLobby => "player_joins_lobby",
            Self::PlayerLeavesLobby => "player_leaves_lobby",
            Self::PlayerStartedMatch => "player_started_match",
            Self::SendDataToOtherPlayers => "send_data_to_other_players",
            Self::PlayerAccountLink => "player_account_link",
            Self::CreateLobby => "create_lobby",
            Self::PlayerSetName => "player_set_name",
            Self::PlayerInit => "PlayerInit",
            Self::JoinLobby => "join_lobby",
            Self::UpdateLobbies => "update_lobbies",
            Self::MatchStarted => "match_started",
            Self::ReceiveDataFromOtherPlayers => "receive_data_from_other_players",
        }
    }

    pub fn is_client_to_server(self) -> bool {
        (self as u8) < 0x10
    }
}

// ============================================================================
// Client -> Server
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyListRequestMsg {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoinsLobbyMsg {
    pub lobby_id: LobbyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeavesLobbyMsg {
    pub lobby_id: LobbyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStartedMatchMsg {
    pub lobby_id: LobbyId,
}

/// Board snapshot pushed by its owner for relay to the rest of the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendDataMsg {
    pub lobby_id: LobbyId,
    pub player_id: NetworkId,
    pub active_cells: Vec<SnapshotCell>,
    pub score: u64,
}

impl SendDataMsg {
    pub fn from_snapshot(lobby_id: LobbyId, snapshot: BoardSnapshot) -> Self {
        Self {
            lobby_id,
            player_id: snapshot.player_id,
            active_cells: snapshot.active_cells,
            score: snapshot.score,
        }
    }

    /// The relayed form sent to the other lobby members.
    pub fn into_relay(self) -> ReceiveDataMsg {
        ReceiveDataMsg {
            player_id: self.player_id,
            active_cells: self.active_cells,
            score: self.score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAccountLinkMsg {
    pub account_id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLobbyMsg {
    pub lobby_name: String,
    pub public: bool,
}

/// Sets the name other players see until an account is linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetNameMsg {
    pub display_name: String,
}

/// All messages a client can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    LobbyListRequest(LobbyListRequestMsg),
    PlayerJoinsLobby(PlayerJoinsLobbyMsg),
    PlayerLeavesLobby(PlayerLeavesLobbyMsg),
    PlayerStartedMatch(PlayerStartedMatchMsg),
    SendDataToOtherPlayers(SendDataMsg),
    PlayerAccountLink(PlayerAccountLinkMsg),
    CreateLobby(CreateLobbyMsg),
    PlayerSetName(PlayerSetNameMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::LobbyListRequest(_) => MessageType::LobbyListRequest,
            Self::PlayerJoinsLobby(_) => MessageType::PlayerJoinsLobby,
            Self::PlayerLeavesLobby(_) => MessageType::PlayerLeavesLobby,
            Self::PlayerStartedMatch(_) => MessageType::PlayerStartedMatch,
            Self::SendDataToOtherPlayers(_) => MessageType::SendDataToOtherPlayers,
            Self::PlayerAccountLink(_) => MessageType::PlayerAccountLink,
            Self::CreateLobby(_) => MessageType::CreateLobby,
            Self::PlayerSetName(_) => MessageType::PlayerSetName,
        }
    }
}

// ============================================================================
// Server -> Client
// ============================================================================

/// First message on every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInitMsg {
    pub network_id: NetworkId,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyListMsg {
    pub lobbies: Vec<LobbySummary>,
}

/// Confirmation sent to a player who joined a lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinLobbyMsg {
    pub lobby: LobbySummary,
}

/// Directory changes fanned out to every connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLobbiesMsg {
    pub lobbies: Vec<LobbySummary>,
    pub removed: Vec<LobbyId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStartedMsg {
    pub lobby: LobbySummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveDataMsg {
    pub player_id: NetworkId,
    pub active_cells: Vec<SnapshotCell>,
    pub score: u64,
}

impl ReceiveDataMsg {
    pub fn into_snapshot(self) -> BoardSnapshot {
        BoardSnapshot {
            player_id: self.player_id,
            active_cells: self.active_cells,
            score: self.score,
        }
    }
}

/// All messages the server can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    PlayerInit(PlayerInitMsg),
    LobbyList(LobbyListMsg),
    JoinLobby(JoinLobbyMsg),
    UpdateLobbies(UpdateLobbiesMsg),
    MatchStarted(MatchStartedMsg),
    ReceiveDataFromOtherPlayers(ReceiveDataMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::PlayerInit(_) => MessageType::PlayerInit,
            Self::LobbyList(_) => MessageType::LobbyList,
            Self::JoinLobby(_) => MessageType::JoinLobby,
            Self::UpdateLobbies(_) => MessageType::UpdateLobbies,
            Self::MatchStarted(_) => MessageType::MatchStarted,
            Self::ReceiveDataFromOtherPlayers(_) => MessageType::ReceiveDataFromOtherPlayers,
        }
    }
}
