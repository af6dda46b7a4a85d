//! Client-side state: the lobby mirror, the player's identity and the
//! running match. Pure state transitions; the runner owns all I/O.

use std::collections::BTreeMap;

use multitetris_core::board::BoardEvent;
use multitetris_core::config::BoardConfig;
use multitetris_core::controller::MoveOutcome;
use multitetris_core::identity::{AuthError, Profile};
use multitetris_core::lobby::{Lobby, LobbyId, LobbySummary};
use multitetris_core::net::messages::{
    ClientMessage, CreateLobbyMsg, LobbyListRequestMsg, PlayerAccountLinkMsg, PlayerJoinsLobbyMsg,
    PlayerLeavesLobbyMsg, PlayerSetNameMsg, PlayerStartedMatchMsg, SendDataMsg, ServerMessage,
};
use multitetris_core::player::{NetworkId, Player};
use multitetris_core::session::MatchSession;

use crate::input::Command;

/// Notifications for whatever renders the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Connected { network_id: NetworkId },
    LobbiesChanged,
    JoinedLobby(LobbyId),
    LeftLobby(LobbyId),
    MatchStarted { lobby_id: Option<LobbyId> },
    BoardChanged,
    RowsCleared { count: u32, score: u64 },
    RemoteUpdated(NetworkId),
    GameOver { score: u64 },
    AccountLinked { display_name: String },
    AuthFailed(AuthError),
}

#[derive(Debug)]
pub struct ClientSession {
    player: Player,
    lobbies: BTreeMap<LobbyId, Lobby>,
    current_lobby: Option<LobbyId>,
    game: Option<MatchSession>,
    board_config: BoardConfig,
}

impl ClientSession {
    pub fn new(player_name: impl Into<String>, board_config: BoardConfig) -> Self {
        Self {
            player: Player::local(player_name),
            lobbies: BTreeMap::new(),
            current_lobby: None,
            game: None,
            board_config,
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn network_id(&self) -> NetworkId {
        self.player.network_id
    }

    pub fn lobbies(&self) -> impl Iterator<Item = &Lobby> {
        self.lobbies.values()
    }

    pub fn lobby(&self, lobby_id: LobbyId) -> Option<&Lobby> {
        self.lobbies.get(&lobby_id)
    }

    pub fn current_lobby(&self) -> Option<&Lobby> {
        self.current_lobby.and_then(|id| self.lobbies.get(&id))
    }

    pub fn game(&self) -> Option<&MatchSession> {
        self.game.as_ref()
    }

    /// Whether the local board is still being played.
    pub fn is_playing(&self) -> bool {
        self.game
            .as_ref()
            .is_some_and(|g| !g.local().is_game_over())
    }

    // ------------------------------------------------------------------
    // Server messages
    // ------------------------------------------------------------------

    pub fn handle_server(&mut self, msg: ServerMessage) -> Vec<ClientEvent> {
        match msg {
            ServerMessage::PlayerInit(init) => {
                self.player.network_id = init.network_id;
                tracing::info!(network_id = init.network_id, "Connected to server");
                vec![ClientEvent::Connected {
                    network_id: init.network_id,
                }]
            },
            ServerMessage::LobbyList(list) => {
                self.lobbies = list
                    .lobbies
                    .iter()
                    .map(|s| (s.id, self.mirror_lobby(s)))
                    .collect();
                vec![ClientEvent::LobbiesChanged]
            },
            ServerMessage::JoinLobby(join) => {
                let lobby_id = join.lobby.id;
                self.upsert_lobby(&join.lobby);
                let mut events = Vec::new();
                if let Some(previous) = self.current_lobby.replace(lobby_id)
                    && previous != lobby_id
                {
                    // The server moved us out of the previous lobby.
                    self.end_match_in(previous);
                    events.push(ClientEvent::LeftLobby(previous));
                }
                events.push(ClientEvent::JoinedLobby(lobby_id));
                events
            },
            ServerMessage::UpdateLobbies(update) => {
                let mut events = Vec::new();
                for summary in &update.lobbies {
                    self.upsert_lobby(summary);
                    if self.current_lobby == Some(summary.id) {
                        if !summary.members.iter().any(|p| p.network_id == self.network_id()) {
                            self.current_lobby = None;
                            events.push(ClientEvent::LeftLobby(summary.id));
                        } else if let Some(game) = self.game.as_mut()
                            && game.lobby_id() == Some(summary.id)
                            && let Some(lobby) = self.lobbies.get(&summary.id)
                        {
                            game.refresh_players(lobby);
                        }
                    }
                }
                for id in &update.removed {
                    self.lobbies.remove(id);
                    if self.current_lobby == Some(*id) {
                        self.current_lobby = None;
                        events.push(ClientEvent::LeftLobby(*id));
                    }
                }
                events.push(ClientEvent::LobbiesChanged);
                events
            },
            ServerMessage::MatchStarted(started) => {
                if let Some(current) = self.current_lobby
                    && current != started.lobby.id
                {
                    tracing::debug!(
                        lobby_id = started.lobby.id,
                        current,
                        "Match start for another lobby ignored"
                    );
                    return Vec::new();
                }
                self.upsert_lobby(&started.lobby);
                let Some(lobby) = self.lobbies.get(&started.lobby.id) else {
                    return Vec::new();
                };
                let game = MatchSession::start(lobby, self.network_id(), &self.board_config);
                self.current_lobby = Some(lobby.id());
                self.game = Some(game);
                let mut events = vec![ClientEvent::MatchStarted {
                    lobby_id: Some(started.lobby.id),
                }];
                events.extend(self.drain_board_events());
                events
            },
            ServerMessage::ReceiveDataFromOtherPlayers(data) => {
                let Some(game) = self.game.as_mut() else {
                    tracing::debug!(player_id = data.player_id, "Snapshot with no match running");
                    return Vec::new();
                };
                let snapshot = data.into_snapshot();
                match game.apply_remote(&snapshot) {
                    Ok(()) => vec![ClientEvent::RemoteUpdated(snapshot.player_id)],
                    Err(e) => {
                        tracing::debug!(player_id = snapshot.player_id, error = %e, "Snapshot ignored");
                        Vec::new()
                    },
                }
            },
        }
    }

    /// Build a local mirror, marking our own entry as local.
    fn mirror_lobby(&self, summary: &LobbySummary) -> Lobby {
        let mut lobby = Lobby::from_summary(summary);
        mark_local(&mut lobby, self.network_id());
        lobby
    }

    fn upsert_lobby(&mut self, summary: &LobbySummary) {
        let network_id = self.network_id();
        let lobby = self
            .lobbies
            .entry(summary.id)
            .or_insert_with(|| Lobby::new(summary.id, summary.name.clone(), summary.public));
        lobby.apply_summary(summary);
        mark_local(lobby, network_id);
    }

    // ------------------------------------------------------------------
    // Local play
    // ------------------------------------------------------------------

    /// Start an offline game.
    pub fn start_single_player(&mut self) -> Vec<ClientEvent> {
        self.game = Some(MatchSession::single_player(&self.board_config));
        let mut events = vec![ClientEvent::MatchStarted { lobby_id: None }];
        events.extend(self.drain_board_events());
        events
    }

    /// Apply a gameplay command to the local board.
    pub fn apply_command(&mut self, command: Command) -> (Option<MoveOutcome>, Vec<ClientEvent>) {
        let Some(game) = self.game.as_mut() else {
            return (None, Vec::new());
        };
        let outcome = command.apply(game.local_mut());
        (Some(outcome), self.drain_board_events())
    }

    /// One gravity step.
    pub fn tick(&mut self) -> Vec<ClientEvent> {
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        game.local_mut().tick();
        self.drain_board_events()
    }

    fn drain_board_events(&mut self) -> Vec<ClientEvent> {
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        let mut events = Vec::new();
        let mut changed = false;
        for event in game.local_mut().take_events() {
            match event {
                BoardEvent::Changed | BoardEvent::Locked { .. } => changed = true,
                BoardEvent::RowsCleared { count, score } => {
                    events.push(ClientEvent::RowsCleared { count, score })
                },
                BoardEvent::GameOver { score } => events.push(ClientEvent::GameOver { score }),
            }
        }
        if changed {
            events.insert(0, ClientEvent::BoardChanged);
        }
        events
    }

    // ------------------------------------------------------------------
    // Outbound requests
    // ------------------------------------------------------------------

    /// Snapshot of the local board for the current networked match.
    pub fn snapshot_message(&self) -> Option<ClientMessage> {
        let game = self.game.as_ref()?;
        let lobby_id = game.lobby_id()?;
        Some(ClientMessage::SendDataToOtherPlayers(SendDataMsg::from_snapshot(
            lobby_id,
            game.local_snapshot(),
        )))
    }

    pub fn lobby_list_request(&self) -> ClientMessage {
        ClientMessage::LobbyListRequest(LobbyListRequestMsg::default())
    }

    pub fn join_request(&self, lobby_id: LobbyId) -> ClientMessage {
        ClientMessage::PlayerJoinsLobby(PlayerJoinsLobbyMsg { lobby_id })
    }

    /// Leave the current lobby. Also tears down any match it hosts.
    pub fn leave_request(&mut self) -> Option<ClientMessage> {
        let lobby_id = self.current_lobby.take()?;
        self.end_match_in(lobby_id);
        Some(ClientMessage::PlayerLeavesLobby(PlayerLeavesLobbyMsg {
            lobby_id,
        }))
    }

    fn end_match_in(&mut self, lobby_id: LobbyId) {
        if self
            .game
            .as_ref()
            .is_some_and(|g| g.lobby_id() == Some(lobby_id))
        {
            self.game = None;
        }
    }

    /// Tell the server the configured player name.
    pub fn name_request(&self) -> ClientMessage {
        ClientMessage::PlayerSetName(PlayerSetNameMsg {
            display_name: self.player.name.clone(),
        })
    }

    pub fn start_request(&self) -> Option<ClientMessage> {
        let lobby_id = self.current_lobby?;
        Some(ClientMessage::PlayerStartedMatch(PlayerStartedMatchMsg {
            lobby_id,
        }))
    }

    pub fn create_request(&self, name: &str, public: bool) -> ClientMessage {
        ClientMessage::CreateLobby(CreateLobbyMsg {
            lobby_name: name.to_string(),
            public,
        })
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Attach a profile and build the message that tells the server.
    pub fn link_account(&mut self, profile: &Profile) -> (ClientMessage, ClientEvent) {
        self.player.link_profile(profile);
        tracing::info!(account_id = %profile.account_id, "Account linked");
        (
            ClientMessage::PlayerAccountLink(PlayerAccountLinkMsg {
                account_id: profile.account_id.clone(),
                display_name: profile.display_name.clone(),
            }),
            ClientEvent::AccountLinked {
                display_name: profile.display_name.clone(),
            },
        )
    }

    pub fn auth_failed(&self, error: AuthError) -> ClientEvent {
        tracing::warn!(error = %error, "Authentication failed");
        ClientEvent::AuthFailed(error)
    }
}

fn mark_local(lobby: &mut Lobby, network_id: NetworkId) {
    if let Some(me) = lobby.member(network_id) {
        let mut me = me.clone();
        me.is_local = true;
        lobby.update_member(&me);
    }
}
