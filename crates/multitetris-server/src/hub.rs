use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

use multitetris_core::lobby::{LobbyId, LobbySummary};
use multitetris_core::net::messages::{
    ClientMessage, CreateLobbyMsg, JoinLobbyMsg, LobbyListMsg, MatchStartedMsg,
    PlayerAccountLinkMsg, PlayerInitMsg, PlayerSetNameMsg, SendDataMsg, ServerMessage,
    UpdateLobbiesMsg,
};
use multitetris_core::net::protocol::{PROTOCOL_VERSION, encode_server_message};
use multitetris_core::player::{AccountLink, NetworkId, Player};

use crate::config::LobbiesConfig;
use crate::directory::{LeaveOutcome, LobbyDirectory};

/// Longest account id accepted in an account link.
const MAX_ACCOUNT_ID_LEN: usize = 128;

/// Requests handled by the hub task, in arrival order.
#[derive(Debug)]
pub enum HubCommand {
    Connect {
        network_id: NetworkId,
        tx: mpsc::Sender<Bytes>,
    },
    Message {
        network_id: NetworkId,
        msg: ClientMessage,
    },
    Disconnect {
        network_id: NetworkId,
    },
    ListLobbies {
        reply: oneshot::Sender<Vec<LobbySummary>>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

pub type HubSender = mpsc::UnboundedSender<HubCommand>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HubStats {
    pub players: usize,
    pub lobbies: usize,
    pub lobby_members: usize,
}

struct Connection {
    tx: mpsc::Sender<Bytes>,
    player: Player,
}

/// Owns the lobby directory and every connected player's outbound channel.
pub struct Hub {
    directory: LobbyDirectory,
    connections: HashMap<NetworkId, Connection>,
    max_name_len: usize,
}

impl Hub {
    pub fn new(config: &LobbiesConfig) -> Self {
        let mut directory = LobbyDirectory::new(config.max_members, config.max_lobbies);
        directory.create_public_lobbies(config.public_lobby_count);
        Self {
            directory,
            connections: HashMap::new(),
            max_name_len: config.max_name_len,
        }
    }

    pub fn directory(&self) -> &LobbyDirectory {
        &self.directory
    }

    pub fn stats(&self) -> HubStats {
        let (lobbies, lobby_members) = self.directory.stats();
        HubStats {
            players: self.connections.len(),
            lobbies,
            lobby_members,
        }
    }

    pub fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Connect { network_id, tx } => self.connect(network_id, tx),
            HubCommand::Message { network_id, msg } => self.dispatch(network_id, msg),
            HubCommand::Disconnect { network_id } => self.disconnect(network_id),
            HubCommand::ListLobbies { reply } => {
                let _ = reply.send(self.directory.summaries());
            },
            HubCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            },
        }
    }

    fn connect(&mut self, network_id: NetworkId, tx: mpsc::Sender<Bytes>) {
        let player = Player::remote(Player::default_name(network_id), network_id);
        self.connections.insert(network_id, Connection { tx, player });
        tracing::info!(player_id = network_id, "Player connected");
        self.send_to(
            network_id,
            &ServerMessage::PlayerInit(PlayerInitMsg {
                network_id,
                protocol_version: PROTOCOL_VERSION,
            }),
        );
    }

    fn disconnect(&mut self, network_id: NetworkId) {
        if self.connections.remove(&network_id).is_none() {
            return;
        }
        let outcomes = self.directory.disconnect(network_id);
        tracing::info!(
            player_id = network_id,
            lobbies_left = outcomes.len(),
            "Player disconnected"
        );
        if !outcomes.is_empty() {
            self.broadcast_outcomes(outcomes);
        }
    }

    fn dispatch(&mut self, network_id: NetworkId, msg: ClientMessage) {
        let Some(player) = self.connections.get(&network_id).map(|c| c.player.clone()) else {
            tracing::debug!(player_id = network_id, "Message from unknown connection");
            return;
        };

        match msg {
            ClientMessage::LobbyListRequest(_) => {
                self.send_to(
                    network_id,
                    &ServerMessage::LobbyList(LobbyListMsg {
                        lobbies: self.directory.summaries(),
                    }),
                );
            },
            ClientMessage::PlayerJoinsLobby(join) => self.join(player, join.lobby_id),
            ClientMessage::PlayerLeavesLobby(leave) => {
                match self.directory.leave(network_id, leave.lobby_id) {
                    Ok(outcome) => self.broadcast_outcomes(vec![outcome]),
                    Err(e) => tracing::warn!(player_id = network_id, error = %e, "Leave ignored"),
                }
            },
            ClientMessage::PlayerStartedMatch(start) => {
                match self.directory.start_match(start.lobby_id, network_id) {
                    Ok(lobby) => {
                        tracing::info!(
                            player_id = network_id,
                            lobby_id = lobby.id,
                            players = lobby.members.len(),
                            "Match started"
                        );
                        let members: Vec<NetworkId> =
                            lobby.members.iter().map(|p| p.network_id).collect();
                        let msg = ServerMessage::MatchStarted(MatchStartedMsg { lobby });
                        self.send_to_many(&members, &msg);
                    },
                    Err(e) => {
                        tracing::warn!(player_id = network_id, error = %e, "Match start ignored")
                    },
                }
            },
            ClientMessage::SendDataToOtherPlayers(data) => self.relay(network_id, data),
            ClientMessage::PlayerAccountLink(link) => self.link_account(network_id, link),
            ClientMessage::CreateLobby(create) => self.create_lobby(player, create),
            ClientMessage::PlayerSetName(set) => self.set_name(network_id, set),
        }
    }

    /// Join a lobby, leaving whichever lobby the player was in before.
    fn join(&mut self, player: Player, lobby_id: LobbyId) {
        let network_id = player.network_id;
        let lobby = match self.directory.join(player, lobby_id) {
            Ok(lobby) => lobby,
            Err(e) => {
                tracing::warn!(player_id = network_id, error = %e, "Join ignored");
                return;
            },
        };
        self.send_to(
            network_id,
            &ServerMessage::JoinLobby(JoinLobbyMsg {
                lobby: lobby.clone(),
            }),
        );

        let mut lobbies = vec![lobby];
        let mut removed = Vec::new();
        for outcome in self.directory.leave_others(network_id, lobby_id) {
            match outcome {
                LeaveOutcome::Updated(summary) => lobbies.push(summary),
                LeaveOutcome::Destroyed(id) => removed.push(id),
            }
        }
        self.broadcast_update(lobbies, removed);
    }

    fn create_lobby(&mut self, player: Player, create: CreateLobbyMsg) {
        let Some(name) = self.validate_name(&create.lobby_name) else {
            tracing::warn!(player_id = player.network_id, "Rejected lobby name");
            return;
        };
        match self.directory.create_lobby(name, create.public) {
            Ok(lobby_id) => self.join(player, lobby_id),
            Err(e) => {
                tracing::warn!(player_id = player.network_id, error = %e, "Lobby creation refused")
            },
        }
    }

    fn set_name(&mut self, network_id: NetworkId, set: PlayerSetNameMsg) {
        let Some(name) = self.validate_name(&set.display_name) else {
            tracing::warn!(player_id = network_id, "Rejected display name");
            return;
        };
        let Some(conn) = self.connections.get_mut(&network_id) else {
            return;
        };
        conn.player.name = name;
        let player = conn.player.clone();
        tracing::debug!(player_id = network_id, name = %player.name, "Player renamed");
        self.publish_player(&player);
    }

    fn link_account(&mut self, network_id: NetworkId, link: PlayerAccountLinkMsg) {
        let Some(name) = self.validate_name(&link.display_name) else {
            tracing::warn!(player_id = network_id, "Rejected display name");
            return;
        };
        if link.account_id.is_empty()
            || link.account_id.len() > MAX_ACCOUNT_ID_LEN
            || link.account_id.chars().any(char::is_control)
        {
            tracing::warn!(player_id = network_id, "Rejected account id");
            return;
        }
        let Some(conn) = self.connections.get_mut(&network_id) else {
            return;
        };
        conn.player.name = name;
        conn.player.account = Some(AccountLink {
            account_id: link.account_id,
            id_token: String::new(),
        });
        let player = conn.player.clone();
        tracing::info!(
            player_id = network_id,
            account_id = player.account_id().unwrap_or_default(),
            "Account linked"
        );
        self.publish_player(&player);
    }

    /// Push a player's new details into every lobby they are in.
    fn publish_player(&mut self, player: &Player) {
        let updated = self.directory.update_player(player);
        if !updated.is_empty() {
            self.broadcast_update(updated, Vec::new());
        }
    }

    /// Forward a board snapshot to the sender's lobby peers.
    fn relay(&self, network_id: NetworkId, data: SendDataMsg) {
        if data.player_id != network_id {
            tracing::warn!(
                player_id = network_id,
                claimed = data.player_id,
                "Dropped snapshot with foreign player id"
            );
            return;
        }
        let Some(lobby) = self.directory.get(data.lobby_id) else {
            tracing::debug!(player_id = network_id, lobby_id = data.lobby_id, "Snapshot for unknown lobby");
            return;
        };
        if !lobby.is_member(network_id) {
            tracing::warn!(
                player_id = network_id,
                lobby_id = data.lobby_id,
                "Dropped snapshot from non-member"
            );
            return;
        }

        let peers: Vec<NetworkId> = lobby
            .members()
            .iter()
            .map(|p| p.network_id)
            .filter(|id| *id != network_id)
            .collect();
        let msg = ServerMessage::ReceiveDataFromOtherPlayers(data.into_relay());
        self.send_to_many(&peers, &msg);
    }

    fn validate_name(&self, raw: &str) -> Option<String> {
        let name = raw.trim();
        if name.is_empty()
            || name.chars().count() > self.max_name_len
            || name.chars().any(char::is_control)
        {
            return None;
        }
        Some(name.to_string())
    }

    fn broadcast_outcomes(&self, outcomes: Vec<LeaveOutcome>) {
        let mut lobbies = Vec::new();
        let mut removed = Vec::new();
        for outcome in outcomes {
            match outcome {
                LeaveOutcome::Updated(summary) => lobbies.push(summary),
                LeaveOutcome::Destroyed(id) => removed.push(id),
            }
        }
        self.broadcast_update(lobbies, removed);
    }

    fn broadcast_update(&self, lobbies: Vec<LobbySummary>, removed: Vec<LobbyId>) {
        let msg = ServerMessage::UpdateLobbies(UpdateLobbiesMsg { lobbies, removed });
        let Ok(data) = encode_server_message(&msg) else {
            tracing::error!("Failed to encode lobby update");
            return;
        };
        let data = Bytes::from(data);
        for (id, conn) in &self.connections {
            try_deliver(*id, &conn.tx, &data);
        }
    }

    fn send_to(&self, network_id: NetworkId, msg: &ServerMessage) {
        self.send_to_many(&[network_id], msg);
    }

    fn send_to_many(&self, recipients: &[NetworkId], msg: &ServerMessage) {
        if recipients.is_empty() {
            return;
        }
        let data = match encode_server_message(msg) {
            Ok(d) => Bytes::from(d),
            Err(e) => {
                tracing::error!(error = %e, msg_type = ?msg.message_type(), "Failed to encode");
                return;
            },
        };
        for id in recipients {
            if let Some(conn) = self.connections.get(id) {
                try_deliver(*id, &conn.tx, &data);
            }
        }
    }
}

fn try_deliver(network_id: NetworkId, tx: &mpsc::Sender<Bytes>, data: &Bytes) {
    if tx.try_send(data.clone()).is_err() {
        tracing::debug!(player_id = network_id, "Dropped message for slow or closed client");
    }
}

/// Run the hub on its own task. The directory lives for as long as any
/// sender does.
pub fn spawn_hub(mut hub: Hub) -> HubSender {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(cmd) = rx.recv().await {
            hub.handle(cmd);
        }
        tracing::info!("Hub channel closed, stopping");
    });
    tx
}
