//! The client's cooperative event loop. One task owns the session and
//! serializes gravity, snapshots, server frames and local commands.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use multitetris_core::identity::{AuthError, IdentityProvider, Profile};
use multitetris_core::net::messages::{ClientMessage, ServerMessage};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::input::ClientCommand;
use crate::net::ServerConnection;
use crate::session::{ClientEvent, ClientSession};

/// Receives every client event along with the session it came from.
pub trait Renderer {
    fn render(&mut self, session: &ClientSession, event: &ClientEvent);
}

pub struct Runner<P, R> {
    session: ClientSession,
    conn: Option<ServerConnection>,
    identity: Option<P>,
    renderer: R,
    gravity: Duration,
    snapshot_interval: Duration,
}

impl<P: IdentityProvider, R: Renderer> Runner<P, R> {
    pub fn new(
        config: &ClientConfig,
        conn: Option<ServerConnection>,
        identity: Option<P>,
        renderer: R,
    ) -> Self {
        Self {
            session: ClientSession::new(config.player_name.clone(), config.board.clone()),
            conn,
            identity,
            renderer,
            gravity: Duration::from_millis(config.gravity_interval_ms),
            snapshot_interval: Duration::from_millis(config.snapshot_interval_ms),
        }
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Run until `commands` closes or a Quit arrives. Losing the server
    /// connection is an error.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<ClientCommand>,
    ) -> Result<(), ClientError> {
        let mut gravity = tokio::time::interval(self.gravity);
        gravity.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut snapshots = tokio::time::interval(self.snapshot_interval);
        snapshots.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = gravity.tick() => {
                    if self.session.is_playing() {
                        let events = self.session.tick();
                        self.dispatch(events).await;
                    }
                },
                _ = snapshots.tick() => {
                    if let Some(msg) = self.session.snapshot_message() {
                        self.send(msg);
                    }
                },
                msg = recv_server(&mut self.conn) => match msg {
                    Some(msg) => self.on_server(msg).await,
                    None => {
                        tracing::warn!("Server connection lost");
                        return Err(ClientError::Disconnected);
                    },
                },
                cmd = commands.recv() => match cmd {
                    None | Some(ClientCommand::Quit) => break,
                    Some(cmd) => self.on_command(cmd).await,
                },
            }
        }

        if let Some(msg) = self.session.leave_request() {
            self.send(msg);
        }
        Ok(())
    }

    async fn on_server(&mut self, msg: ServerMessage) {
        let events = self.session.handle_server(msg);
        if events
            .iter()
            .any(|e| matches!(e, ClientEvent::Connected { .. }))
        {
            let name = self.session.name_request();
            self.send(name);
            let request = self.session.lobby_list_request();
            self.send(request);
        }
        self.dispatch(events).await;
    }

    pub async fn on_command(&mut self, cmd: ClientCommand) {
        match cmd {
            ClientCommand::Play(command) => {
                let (_, events) = self.session.apply_command(command);
                self.dispatch(events).await;
            },
            ClientCommand::Solo => {
                let events = self.session.start_single_player();
                self.dispatch(events).await;
            },
            ClientCommand::ListLobbies => {
                let msg = self.session.lobby_list_request();
                self.send(msg);
            },
            ClientCommand::Join(lobby_id) => {
                let msg = self.session.join_request(lobby_id);
                self.send(msg);
            },
            ClientCommand::Leave => {
                if let Some(msg) = self.session.leave_request() {
                    self.send(msg);
                }
            },
            ClientCommand::Create { name, public } => {
                let msg = self.session.create_request(&name, public);
                self.send(msg);
            },
            ClientCommand::Start => {
                if let Some(msg) = self.session.start_request() {
                    self.send(msg);
                }
            },
            ClientCommand::Login { email, password } => {
                let result = match &self.identity {
                    Some(identity) => Some(identity.login(&email, &password).await),
                    None => None,
                };
                self.finish_auth(result).await;
            },
            ClientCommand::Register {
                email,
                password,
                display_name,
            } => {
                let result = match &self.identity {
                    Some(identity) => Some(identity.register(&email, &password, &display_name).await),
                    None => None,
                };
                self.finish_auth(result).await;
            },
            ClientCommand::Show => {
                self.renderer.render(&self.session, &ClientEvent::BoardChanged);
            },
            ClientCommand::Quit => {},
        }
    }

    async fn finish_auth(
        &mut self,
        result: Option<Result<Profile, AuthError>>,
    ) {
        let event = match result {
            None => {
                tracing::warn!("No identity service configured");
                return;
            },
            Some(Ok(profile)) => {
                let (msg, event) = self.session.link_account(&profile);
                self.send(msg);
                event
            },
            Some(Err(e)) => self.session.auth_failed(e),
        };
        self.dispatch(vec![event]).await;
    }

    async fn dispatch(&mut self, events: Vec<ClientEvent>) {
        for event in events {
            if let ClientEvent::GameOver { score } = event {
                self.submit_highscore(score).await;
            }
            self.renderer.render(&self.session, &event);
        }
    }

    async fn submit_highscore(&mut self, score: u64) {
        let Some(identity) = &self.identity else {
            return;
        };
        let Some(account) = self.session.player().account.clone() else {
            return;
        };
        if let Err(e) = identity.submit_highscore(&account, score).await {
            tracing::warn!(error = %e, score, "Failed to submit highscore");
            let event = self.session.auth_failed(e);
            self.renderer.render(&self.session, &event);
        }
    }

    fn send(&self, msg: ClientMessage) {
        match &self.conn {
            Some(conn) => {
                conn.send(msg);
            },
            None => tracing::debug!(
                action = msg.message_type().action(),
                "Offline, message not sent"
            ),
        }
    }
}

async fn recv_server(conn: &mut Option<ServerConnection>) -> Option<ServerMessage> {
    match conn {
        Some(conn) => conn.inbound.recv().await,
        None => std::future::pending().await,
    }
}
